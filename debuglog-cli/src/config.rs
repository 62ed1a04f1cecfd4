//! CLI 配置
//!
//! 内部诊断（`tracing`）的级别配置，与写入日志文件的记录无关。

use tracing::Level;

/// 诊断输出的目标
pub const CORE_TARGET: &str = "debuglog_core";
pub const CLI_TARGET: &str = "debuglog";

/// CLI 诊断配置
#[derive(Debug, Clone)]
pub struct DiagnosticsConfig {
    pub global: Level,
    pub core: Option<Level>,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            global: Level::WARN,
            core: None,
        }
    }
}

impl DiagnosticsConfig {
    /// `-v` 的次数：0 = warn, 1 = info, 2 = debug, 3+ = trace
    pub fn from_verbosity(count: u8) -> Self {
        let global = match count {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self { global, core: None }
    }

    pub fn with_core(mut self, level: Level) -> Self {
        self.core = Some(level);
        self
    }

    /// Get log level for a specific target
    pub fn level_for(&self, target: &str) -> Level {
        match target {
            CORE_TARGET => self.core.unwrap_or(self.global),
            _ => self.global,
        }
    }
}
