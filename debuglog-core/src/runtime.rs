//! 运行时指标：环境描述、内存快照、已运行时间

use serde::Serialize;
use std::time::Instant;
use sysinfo::{Pid, System};

/// 运行环境描述
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvInfo {
    pub name: String,
    pub version: String,
    pub platform: String,
    pub architecture: String,
    /// 可执行文件路径
    pub path: String,
    pub pid: u32,
}

impl EnvInfo {
    pub fn collect() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            platform: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            path: std::env::current_exe()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            pid: std::process::id(),
        }
    }

    /// 各字段值以 `, ` 连接
    pub fn summary(&self) -> String {
        [
            self.name.as_str(),
            self.version.as_str(),
            self.platform.as_str(),
            self.architecture.as_str(),
            self.path.as_str(),
            &self.pid.to_string(),
        ]
        .join(", ")
    }
}

/// 同一内存量的三种单位
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MemoryField {
    pub bytes: u64,
    pub kilobytes: f64,
    pub megabytes: f64,
}

impl MemoryField {
    pub fn from_bytes(bytes: u64) -> Self {
        let kilobytes = bytes as f64 / 1024.0;
        Self {
            bytes,
            kilobytes: round_to(kilobytes, 2),
            megabytes: round_to(kilobytes / 1024.0, 2),
        }
    }
}

/// 当前进程的内存占用
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MemorySnapshot {
    /// 常驻内存
    pub resident: MemoryField,
    #[serde(rename = "virtual")]
    pub virtual_memory: MemoryField,
}

impl MemorySnapshot {
    /// 读取失败时返回 None
    pub fn collect() -> Option<Self> {
        let pid = Pid::from_u32(std::process::id());
        let mut system = System::new();
        if !system.refresh_process(pid) {
            tracing::debug!(pid = pid.as_u32(), "process memory unavailable");
            return None;
        }
        system.process(pid).map(|process| Self {
            resident: MemoryField::from_bytes(process.memory()),
            virtual_memory: MemoryField::from_bytes(process.virtual_memory()),
        })
    }
}

/// `get_data()` 的返回值
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeData {
    pub env: EnvInfo,
    pub memory: Option<MemorySnapshot>,
    /// 自管线启动以来的秒数（三位小数）
    pub execution_time_passed: f64,
}

impl RuntimeData {
    pub fn collect(started: Instant) -> Self {
        Self {
            env: EnvInfo::collect(),
            memory: MemorySnapshot::collect(),
            execution_time_passed: elapsed_seconds(started),
        }
    }
}

/// 自 `started` 以来的秒数，保留三位小数
pub fn elapsed_seconds(started: Instant) -> f64 {
    round_to(started.elapsed().as_secs_f64(), 3)
}

fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}
