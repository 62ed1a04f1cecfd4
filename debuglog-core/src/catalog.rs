//! 错误码目录
//!
//! 静态的 code -> (name, message) 映射。按数字区间分组：
//!
//! | 区间 | 类别 |
//! |------|------|
//! | 1000-1999 | 通用 |
//! | 2000-2999 | I/O |
//! | 3000-3999 | 网络 |
//! | 4000-4999 | 数据库 |
//! | 5000-5999 | 集成适配层 |
//!
//! 未知错误码解析为 [`FALLBACK_CODE`]，查找永不失败。

use core::fmt;

/// 回退错误码
pub const FALLBACK_CODE: &str = "DLE1005";

/// 重复构造单例
pub const SINGLETON_CODE: &str = "DLE5001";

/// 目录中的消息：字面量或模板
#[derive(Clone, Copy)]
pub enum CatalogMessage {
    Literal(&'static str),
    Template(fn(&[&str]) -> String),
}

impl CatalogMessage {
    pub fn render(&self, args: &[&str]) -> String {
        match self {
            CatalogMessage::Literal(text) => (*text).to_string(),
            CatalogMessage::Template(template) => template(args),
        }
    }
}

impl fmt::Debug for CatalogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogMessage::Literal(text) => f.debug_tuple("Literal").field(text).finish(),
            CatalogMessage::Template(_) => write!(f, "Template({:?})", self.render(&[])),
        }
    }
}

/// 错误类别（由错误码数字区间决定）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    General,
    Io,
    Network,
    Database,
    Integration,
    Unclassified,
}

impl ErrorCategory {
    /// `DLE2001` -> Io
    pub fn from_code(code: &str) -> Self {
        let digits = code.trim_start_matches(|c: char| !c.is_ascii_digit());
        match digits.parse::<u32>().map(|n| n / 1000) {
            Ok(1) => ErrorCategory::General,
            Ok(2) => ErrorCategory::Io,
            Ok(3) => ErrorCategory::Network,
            Ok(4) => ErrorCategory::Database,
            Ok(5) => ErrorCategory::Integration,
            _ => ErrorCategory::Unclassified,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::General => "general",
            ErrorCategory::Io => "io",
            ErrorCategory::Network => "network",
            ErrorCategory::Database => "database",
            ErrorCategory::Integration => "integration",
            ErrorCategory::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 目录条目
#[derive(Clone, Copy, Debug)]
pub struct ErrorCatalogEntry {
    pub code: &'static str,
    pub name: &'static str,
    pub message: CatalogMessage,
}

impl ErrorCatalogEntry {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code)
    }

    pub fn render(&self, args: &[&str]) -> String {
        self.message.render(args)
    }
}

const fn literal(code: &'static str, name: &'static str, text: &'static str) -> ErrorCatalogEntry {
    ErrorCatalogEntry {
        code,
        name,
        message: CatalogMessage::Literal(text),
    }
}

const fn template(
    code: &'static str,
    name: &'static str,
    render: fn(&[&str]) -> String,
) -> ErrorCatalogEntry {
    ErrorCatalogEntry {
        code,
        name,
        message: CatalogMessage::Template(render),
    }
}

const UNKNOWN: ErrorCatalogEntry = literal(FALLBACK_CODE, "UnknownError", "Unknown error");

/// 回退条目
pub static FALLBACK_ENTRY: ErrorCatalogEntry = UNKNOWN;

static CATALOG: &[ErrorCatalogEntry] = &[
    // 通用
    literal("DLE1001", "ValidationError", "Validation error"),
    literal("DLE1002", "MissingFieldError", "Missing required field"),
    template("DLE1003", "TypeMismatchError", type_mismatch),
    literal("DLE1004", "InvalidFormatError", "Invalid input format"),
    UNKNOWN,
    literal("DLE1010", "ConfigurationError", "Configuration error"),
    literal("DLE1011", "DependencyNotFoundError", "Dependency not found"),
    literal("DLE1012", "UnsupportedOperationError", "Unsupported operation"),
    // I/O
    template("DLE2001", "FileNotFoundError", file_not_found),
    template("DLE2002", "FileReadError", file_read),
    template("DLE2003", "FileWriteError", file_write),
    literal("DLE2004", "PermissionError", "Insufficient permissions"),
    literal("DLE2005", "PathError", "Path not accessible"),
    literal("DLE2010", "DiskSpaceError", "Disk space error"),
    template("DLE2011", "UnsupportedFileFormatError", format_not_supported),
    // 网络
    literal("DLE3001", "ConnectionError", "Connection failed"),
    literal("DLE3002", "TimeoutError", "Connection timeout"),
    literal("DLE3003", "DNSError", "DNS resolution error"),
    literal("DLE3004", "ProtocolError", "Protocol mismatch"),
    literal("DLE3005", "NetworkUnreachableError", "Network unreachable"),
    literal("DLE3010", "RemoteHostError", "Remote host not responding"),
    literal("DLE3011", "SSLHandshakeError", "SSL/TLS handshake failure"),
    // 数据库
    literal("DLE4001", "DatabaseConnectionError", "Database connection failed"),
    literal("DLE4002", "QuerySyntaxError", "Query syntax error"),
    literal("DLE4003", "DataIntegrityError", "Data integrity violation"),
    literal("DLE4004", "TransactionError", "Transaction rollback"),
    literal("DLE4005", "RecordNotFoundError", "Record not found"),
    literal("DLE4010", "DatabaseTimeoutError", "Database timeout"),
    literal("DLE4011", "DatabasePermissionError", "Database permission denied"),
    // 集成适配层
    literal(SINGLETON_CODE, "SingletonError", "Instance already exists"),
    literal(
        "DLE5002",
        "EmptyOptionsObjectError",
        "Making a request with empty `options` is not supported",
    ),
    template("DLE5003", "ModuleOverwriteError", module_overwrite),
];

/// 按错误码查找，未知错误码返回回退条目
pub fn lookup(code: &str) -> &'static ErrorCatalogEntry {
    find(code).unwrap_or(&FALLBACK_ENTRY)
}

/// 精确查找
pub fn find(code: &str) -> Option<&'static ErrorCatalogEntry> {
    CATALOG.iter().find(|entry| entry.code == code)
}

pub fn fallback() -> &'static ErrorCatalogEntry {
    &FALLBACK_ENTRY
}

/// 全部条目（按错误码升序）
pub fn entries() -> impl Iterator<Item = &'static ErrorCatalogEntry> {
    CATALOG.iter()
}

// 空字符串视为未提供
fn arg<'a>(args: &[&'a str], index: usize) -> Option<&'a str> {
    args.get(index).copied().filter(|a| !a.is_empty())
}

fn quoted(args: &[&str]) -> String {
    arg(args, 0).map(|a| format!(" '{a}'")).unwrap_or_default()
}

fn type_mismatch(args: &[&str]) -> String {
    match (arg(args, 0), arg(args, 1)) {
        (Some(expected), Some(actual)) => format!("Type mismatch ({expected}/{actual})."),
        _ => "Type mismatch".to_string(),
    }
}

fn file_not_found(args: &[&str]) -> String {
    format!("File{} not found.", quoted(args))
}

fn file_read(args: &[&str]) -> String {
    format!("File{} read error.", quoted(args))
}

fn file_write(args: &[&str]) -> String {
    format!("File{} write error.", quoted(args))
}

fn format_not_supported(args: &[&str]) -> String {
    format!("File{} format not supported.", quoted(args))
}

fn module_overwrite(args: &[&str]) -> String {
    format!(
        "Module's request already overridden for protocol{}.",
        quoted(args)
    )
}
