//! CLI 诊断日志初始化
//!
//! 基于 `tracing-subscriber`，输出到 stderr，避免与 stdout 上的命令结果混在一起。

use crate::config::{DiagnosticsConfig, CLI_TARGET, CORE_TARGET};
use std::io;
use tracing_subscriber::{
    filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

/// 诊断输出格式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// 彩色格式化（开发使用）
    Pretty,
    /// 紧凑格式
    Compact,
    /// JSON 格式（工具集成）
    Json,
}

/// 使用指定格式和诊断配置初始化
pub fn init(config: &DiagnosticsConfig, format: LogFormat) {
    let targets = Targets::new()
        .with_default(config.global)
        .with_target(CORE_TARGET, config.level_for(CORE_TARGET))
        .with_target(CLI_TARGET, config.global);

    let layer = create_format_layer(format, io::stderr).with_filter(targets);
    if tracing_subscriber::registry().with(layer).try_init().is_err() {
        eprintln!("diagnostics subscriber already installed");
    }
}

/// Create formatter layer based on format
fn create_format_layer<W, F>(
    format: LogFormat,
    make_writer: F,
) -> Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync>
where
    W: io::Write + Send + Sync + 'static,
    F: Fn() -> W + Send + Sync + 'static,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_target(true)
            .with_timer(fmt::time::time())
            .with_writer(make_writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .without_time()
            .with_writer(make_writer)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_timer(fmt::time::time())
            .with_writer(make_writer)
            .boxed(),
    }
}
