//! debuglog-core - 结构化日志与错误增强引擎
//!
//! 组成（由底向上）：
//! - **序列化器**：把任意 [`Value`] 图转换为无环 JSON，回引用输出 `"[Circular]"`
//! - **调用栈解析**：把 `at fn (file:line:col)` 文本解析为 [`StackFrame`]，并可格式化回文本
//! - **错误码目录**：`DLE1001`..`DLE5003`，未知错误码回退到 `DLE1005`
//! - **增强错误**：[`EnrichedError`] 携带时间戳、调用栈与上下文，可与 JSON 互转
//! - **事件总线**：同步发布/订阅，监听器运行期间抑制重入
//! - **日志管线**：[`Logger`] 写入 `<目录>/<YYYY-MM-DD>.log`
//!
//! # 快速开始
//!
//! ```ignore
//! use debuglog_core::{info, Logger, LoggerConfig, Value};
//!
//! let logger = Logger::init(LoggerConfig::new().with_log_directory("logs"))?;
//! info!(logger, "server ready on port", 8080)?;
//! logger.log_error(&[Value::from("error"), Value::from(logger.error("Boom", "it broke"))])?;
//! ```
//!
//! # 命名规范
//!
//! 代码中禁止使用 `_` 开头的变量名。

mod macros;

pub mod catalog;
pub mod enriched;
pub mod event_bus;
pub mod lifecycle;
pub mod logger;
pub mod record;
pub mod runtime;
pub mod serializer;
pub mod stacktrace;
pub mod value;

pub use catalog::{CatalogMessage, ErrorCatalogEntry, ErrorCategory};
pub use debuglog_config::{ConfigError, LoggerConfig};
pub use enriched::{EnrichedError, Message};
pub use event_bus::{listener, EventBus, EventKind, Listener};
pub use lifecycle::{install_panic_hook, record_panic, ExitGuard};
pub use logger::{ConsoleSink, Logger, StdConsole};
pub use record::{ConsoleTag, Level, LogRecord};
pub use runtime::{EnvInfo, MemoryField, MemorySnapshot, RuntimeData};
pub use serializer::serialize;
pub use stacktrace::{FormatOptions, StackFrame};
pub use value::{Key, NativeError, Throwable, TypedArray, Value};

/// 结果类型
pub type Result<T> = std::result::Result<T, Error>;

/// 错误类型
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 日志目录或文件不可写
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 解析失败
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// 配置无效
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 调用方要求抛出的增强错误
    #[error("{0}")]
    Raised(Box<EnrichedError>),
}

impl Error {
    /// 被抛出的增强错误
    pub fn raised(&self) -> Option<&EnrichedError> {
        match self {
            Error::Raised(error) => Some(&**error),
            _ => None,
        }
    }
}

impl From<EnrichedError> for Error {
    fn from(error: EnrichedError) -> Self {
        Error::Raised(Box::new(error))
    }
}
