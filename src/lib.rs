//! Debuglog - structured logging and error enrichment
//!
//! Facade over the workspace crates:
//!
//! ```text
//! debuglog-config/  - LoggerConfig (JSON file + DEBUGLOG_* environment)
//! debuglog-core/    - serializer, stack parser, error catalog, EnrichedError, event bus, Logger
//! debuglog-cli/     - `debuglog` binary
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use debuglog::{info, LoggerConfig, Value};
//!
//! let logger = debuglog::init_with_hooks(LoggerConfig::new().with_log_directory("logs"))?;
//! info!(logger, "listening on", 8080)?;
//! logger.log_error(&[Value::from("error"), Value::from(logger.error("Boom", "it broke"))])?;
//! ```

pub use debuglog_config as config;
pub use debuglog_core::{
    catalog, enriched, event_bus, lifecycle, logger, record, runtime, serializer, stacktrace,
    value,
};

pub use debuglog_config::{ConfigError, LoggerConfig};
pub use debuglog_core::{
    install_panic_hook, listener, record_panic, serialize, ConsoleSink, ConsoleTag, EnrichedError,
    Error, EventBus, EventKind, ExitGuard, FormatOptions, Level, Listener, LogRecord, Logger,
    Message, NativeError, Result, RuntimeData, StackFrame, StdConsole, Throwable, Value,
};
pub use debuglog_core::{debug, error, info, warning};

/// Create the process-wide logger
pub fn init(config: LoggerConfig) -> Result<&'static Logger> {
    Logger::init(config)
}

/// Create the process-wide logger, route panics through `log_error`
/// and echo tagged records to stdout/stderr
pub fn init_with_hooks(config: LoggerConfig) -> Result<&'static Logger> {
    let logger = Logger::init(config)?;
    install_panic_hook(logger);
    logger.set_console_sink(StdConsole);
    Ok(logger)
}
