//! 日志记录定义

use chrono::NaiveDateTime;
use core::fmt;

/// 行首时间格式 `YYYY-MM-DD HH:MM:SS`
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 日志文件名使用的日期格式 `YYYY-MM-DD`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 日志级别
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Level {
    /// 一般信息
    Info,
    /// 调试信息
    Debug,
    /// 错误
    Error,
    /// 警告
    Warning,
    /// 错误的结构化展开（紧随 error 记录）
    Traceback,
}

impl Level {
    /// 将级别转换为字符串
    pub const fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Debug => "debug",
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Traceback => "traceback",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 控制台来源标签
///
/// 适配层拦截的控制台输出函数名，是一个封闭集合。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConsoleTag {
    Log,
    Error,
    Debug,
    Info,
    Trace,
}

impl ConsoleTag {
    /// 全部可识别的标签
    pub const ALL: [ConsoleTag; 5] = [
        ConsoleTag::Log,
        ConsoleTag::Error,
        ConsoleTag::Debug,
        ConsoleTag::Info,
        ConsoleTag::Trace,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ConsoleTag::Log => "log",
            ConsoleTag::Error => "error",
            ConsoleTag::Debug => "debug",
            ConsoleTag::Info => "info",
            ConsoleTag::Trace => "trace",
        }
    }

    /// 精确匹配标签名（区分大小写）
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.as_str() == name)
    }

    /// 该标签对应的原始输出是否走错误流
    pub const fn is_error_stream(&self) -> bool {
        matches!(self, ConsoleTag::Error | ConsoleTag::Trace)
    }
}

impl fmt::Display for ConsoleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 单条日志记录
///
/// 每次管线调用生成，写入后不再修改。
#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    /// 墙钟时间（本地时区）
    pub timestamp: NaiveDateTime,
    /// 日志级别
    pub level: Level,
    /// 已格式化的消息体
    pub message: String,
    /// 控制台来源标签（仅在需要透传时存在）
    pub console_tag: Option<ConsoleTag>,
    /// 距上一次调用的毫秒数
    pub delta_ms: u128,
}

impl LogRecord {
    /// 创建新记录
    pub fn new(timestamp: NaiveDateTime, level: Level, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            level,
            message: message.into(),
            console_tag: None,
            delta_ms: 0,
        }
    }

    pub fn with_tag(mut self, tag: Option<ConsoleTag>) -> Self {
        self.console_tag = tag;
        self
    }

    pub fn with_delta(mut self, delta_ms: u128) -> Self {
        self.delta_ms = delta_ms;
        self
    }

    /// 消息体：带标签时加单引号，并在末尾换行符之前追加 `+<N>ms`
    pub fn body(&self) -> String {
        let message = match self.console_tag {
            Some(_) => format!("'{}'", self.message),
            None => self.message.clone(),
        };
        append_with_trailing_newlines(&message, &format!("+{}ms", self.delta_ms))
    }

    /// 格式化为一行 `[YYYY-MM-DD HH:MM:SS] <level>: <body>`
    pub fn format(&self) -> String {
        format!(
            "[{}] {}: {}",
            self.timestamp.format(DATE_TIME_FORMAT),
            self.level,
            self.body()
        )
    }

    /// 记录所属日志文件名 `YYYY-MM-DD.log`
    pub fn file_name(&self) -> String {
        format!("{}.log", self.timestamp.format(DATE_FORMAT))
    }
}

/// 在尾部换行符之前追加内容（前面的文本会去掉首尾空白）
pub fn append_with_trailing_newlines(text: &str, suffix: &str) -> String {
    let head = text.trim_end_matches('\n');
    let newlines = &text[head.len()..];
    format!("{} {}{}", head.trim(), suffix, newlines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(h, m, s))
            .unwrap()
    }

    #[test]
    fn test_level_as_str() {
        assert_eq!(Level::Info.as_str(), "info");
        assert_eq!(Level::Warning.to_string(), "warning");
        assert_eq!(Level::Traceback.to_string(), "traceback");
    }

    #[test]
    fn test_console_tag_from_name() {
        assert_eq!(ConsoleTag::from_name("error"), Some(ConsoleTag::Error));
        assert_eq!(ConsoleTag::from_name("trace"), Some(ConsoleTag::Trace));
        assert_eq!(ConsoleTag::from_name("Error"), None);
        assert_eq!(ConsoleTag::from_name("warn"), None);
        assert_eq!(ConsoleTag::from_name(""), None);
    }

    #[test]
    fn test_console_tag_streams() {
        assert!(ConsoleTag::Error.is_error_stream());
        assert!(ConsoleTag::Trace.is_error_stream());
        assert!(!ConsoleTag::Log.is_error_stream());
        assert!(!ConsoleTag::Debug.is_error_stream());
    }

    #[test]
    fn test_record_format() {
        let record = LogRecord::new(at(8, 5, 3), Level::Info, "server ready").with_delta(12);
        assert_eq!(record.format(), "[2024-03-09 08:05:03] info: server ready +12ms");
    }

    #[test]
    fn test_record_format_tagged() {
        let record = LogRecord::new(at(23, 59, 59), Level::Error, "it broke")
            .with_tag(Some(ConsoleTag::Error));
        assert_eq!(record.format(), "[2024-03-09 23:59:59] error: 'it broke' +0ms");
    }

    #[test]
    fn test_record_file_name() {
        let record = LogRecord::new(at(0, 0, 0), Level::Debug, "x");
        assert_eq!(record.file_name(), "2024-03-09.log");
    }

    #[test]
    fn test_append_before_trailing_newlines() {
        assert_eq!(append_with_trailing_newlines("done\n", "+3ms"), "done +3ms\n");
        assert_eq!(append_with_trailing_newlines("done\n\n", "+3ms"), "done +3ms\n\n");
        assert_eq!(append_with_trailing_newlines("  padded  ", "+1ms"), "padded +1ms");
        assert_eq!(append_with_trailing_newlines("", "+0ms"), " +0ms");
    }
}
