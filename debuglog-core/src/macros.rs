//! 日志宏
//!
//! 每个参数经 `Value::from` 转换，返回管线调用的 `Result<Option<String>>`。

/// 记录 info 级别日志
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $logger.log(&[$($crate::Value::from($arg)),+])
    };
}

/// 记录 debug 级别日志
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $logger.log_debug(&[$($crate::Value::from($arg)),+])
    };
}

/// 记录 warning 级别日志
#[macro_export]
macro_rules! warning {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $logger.log_warning(&[$($crate::Value::from($arg)),+])
    };
}

/// 记录 error 级别日志
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $logger.log_error(&[$($crate::Value::from($arg)),+])
    };
}
