//! 进程生命周期钩子
//!
//! - [`install_panic_hook`]：未捕获的 panic 经 [`record_panic`] 写入日志，再交给原有钩子
//! - [`ExitGuard`]：离开作用域时写入收尾记录

use crate::enriched::EnrichedError;
use crate::logger::Logger;
use crate::stacktrace;
use crate::value::Value;
use crate::Result;
use std::any::Any;

/// panic 对应的错误名
pub const PANIC_ERROR_NAME: &str = "PanicError";

/// 安装 panic 钩子；原有钩子在记录之后照常执行
pub fn install_panic_hook(logger: &'static Logger) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let message = panic_message(info.payload());
        let location = info
            .location()
            .map(|loc| (loc.file(), loc.line(), loc.column()));
        if let Err(err) = record_panic(logger, &message, location) {
            tracing::error!(error = %err, "failed to record panic");
        }
        previous(info);
    }));
}

/// 经 `log_error` 记录一次 panic
///
/// 监听器内部的 panic 不带控制台标签，以免走"只透传不落盘"的重入分支。
pub fn record_panic(
    logger: &Logger,
    message: &str,
    location: Option<(&str, u32, u32)>,
) -> Result<Option<String>> {
    let error = Value::from(panic_error(message, location, logger.stack_cap()));
    if logger.bus().is_reentrant() {
        logger.log_error(&[error])
    } else {
        logger.log_error(&[Value::from("error"), error])
    }
}

/// panic 负载的文本
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

/// 构造 panic 错误；panic 位置作为第一个栈帧
pub fn panic_error(
    message: &str,
    location: Option<(&str, u32, u32)>,
    cap: usize,
) -> EnrichedError {
    let mut raw = String::from(PANIC_ERROR_NAME);
    if let Some((file, line, column)) = location {
        raw.push_str(&format!("\n    at panic ({file}:{line}:{column})"));
    }
    for frame in stacktrace::capture(2).lines().skip(1) {
        raw.push('\n');
        raw.push_str(frame);
    }
    EnrichedError::with_raw_stack(PANIC_ERROR_NAME, message, &raw, cap)
}

/// 作用域结束时调用 [`Logger::shutdown`]
#[must_use = "the exit record is written when the guard is dropped"]
pub struct ExitGuard<'a> {
    logger: &'a Logger,
    code: Option<i32>,
}

impl<'a> ExitGuard<'a> {
    pub fn new(logger: &'a Logger) -> Self {
        Self { logger, code: None }
    }

    /// 设置退出码
    pub fn set_code(&mut self, code: i32) {
        self.code = Some(code);
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }
}

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.logger.shutdown(self.code) {
            tracing::error!(error = %err, "failed to write exit record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::{listener, EventKind};
    use crate::stacktrace::StackFrame;
    use debuglog_config::LoggerConfig;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn read_log(dir: &TempDir) -> String {
        let entry = std::fs::read_dir(dir.path()).unwrap().next().unwrap().unwrap();
        std::fs::read_to_string(entry.path()).unwrap()
    }

    #[test]
    fn test_panic_message() {
        let text: Box<dyn Any + Send> = Box::new("static text");
        assert_eq!(panic_message(text.as_ref()), "static text");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");
        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(other.as_ref()), "Box<dyn Any>");
    }

    #[test]
    fn test_panic_error_location_first() {
        let error = panic_error("index out of bounds", Some(("src/main.rs", 12, 9)), 15);
        assert_eq!(error.name(), PANIC_ERROR_NAME);
        assert_eq!(error.render_message(&[]), "index out of bounds");
        assert_eq!(
            error.stack_frames().first(),
            Some(&StackFrame::location("panic", "src/main.rs", 12, 9))
        );

        let capped = panic_error("x", Some(("a.rs", 1, 1)), 1);
        assert_eq!(capped.stack_frames().len(), 1);
    }

    #[test]
    fn test_record_panic_echoes_to_console() {
        let dir = TempDir::new().unwrap();
        let logger = Logger::new(&LoggerConfig::new().with_log_directory(dir.path()));

        let shown = record_panic(&logger, "boom", Some(("src/main.rs", 3, 5)))
            .unwrap()
            .unwrap();
        assert!(shown.contains("error: 'boom' +"));

        let text = read_log(&dir);
        assert!(text.contains("error: 'boom' +"));
        assert!(text.contains(r#"traceback: {"name":"PanicError""#));
    }

    #[test]
    fn test_record_panic_inside_listener_is_persisted() {
        let dir = TempDir::new().unwrap();
        let logger = Arc::new(Logger::new(
            &LoggerConfig::new().with_log_directory(dir.path()),
        ));
        let weak = Arc::downgrade(&logger);
        let returned = Arc::new(Mutex::new(Vec::new()));
        let results = Arc::clone(&returned);
        logger.on(
            EventKind::FileLog,
            listener(move |_args: &[&str]| {
                if let Some(logger) = weak.upgrade() {
                    let shown =
                        record_panic(&logger, "listener failed", Some(("src/lib.rs", 9, 1)));
                    results.lock().unwrap().push(shown.unwrap());
                }
            }),
        );

        logger.log(&[Value::from("origin")]).unwrap();

        assert_eq!(*returned.lock().unwrap(), vec![None]);
        let text = read_log(&dir);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("error: listener failed +"));
        assert!(lines[2].contains(r#"traceback: {"name":"PanicError","message":"listener failed""#));
    }

    #[test]
    fn test_exit_guard_writes_closing_record() {
        let dir = TempDir::new().unwrap();
        let logger = Logger::new(&LoggerConfig::new().with_log_directory(dir.path()));
        {
            let mut guard = ExitGuard::new(&logger);
            guard.set_code(0);
            assert_eq!(guard.code(), Some(0));
        }
        let text = read_log(&dir);
        assert!(text.contains("Script execution finished with code: 0. +"));
        assert!(text.ends_with("ms\n\n"));
    }
}
