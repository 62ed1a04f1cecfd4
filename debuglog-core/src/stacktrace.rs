//! 调用栈文本解析与格式化
//!
//! 输入是 `at <function> (<file>:<line>:<column>)` 风格的多行文本，第一行为标题行。
//! 每行按两种语法依次匹配：
//!
//! 1. `at <function> (<file>:<line>:<column>)`
//! 2. `at <file>:<line>:<column>`（无函数名，记为 `<anonymous>`）
//!
//! 都不匹配的行原样保留为 [`StackFrame::Raw`]。

use core::fmt;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// 默认保留的栈帧数
pub const DEFAULT_MAX_ENTRIES: usize = 15;

/// 无函数名时使用的占位名
pub const ANONYMOUS: &str = "<anonymous>";

static WITH_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*at\s+(.*?)\s+\((.*?):(\d+):(\d+)\)").expect("stack grammar must compile")
});

static WITHOUT_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*at\s+(.*?):(\d+):(\d+)").expect("stack grammar must compile")
});

/// 单个栈帧
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StackFrame {
    /// 已识别的位置
    Location {
        function: String,
        file: String,
        line: u32,
        column: u32,
    },
    /// 无法识别的原始行（已去除首尾空白）
    Raw { raw: String },
}

impl StackFrame {
    pub fn location(
        function: impl Into<String>,
        file: impl Into<String>,
        line: u32,
        column: u32,
    ) -> Self {
        StackFrame::Location {
            function: function.into(),
            file: file.into(),
            line,
            column,
        }
    }

    pub fn raw(text: impl Into<String>) -> Self {
        StackFrame::Raw { raw: text.into() }
    }

    /// 解析单行；两种语法都不匹配时返回 Raw
    pub fn parse_line(line: &str) -> Self {
        if let Some(caps) = WITH_FUNCTION.captures(line) {
            if let (Ok(line_no), Ok(column)) = (caps[3].parse(), caps[4].parse()) {
                let function = match &caps[1] {
                    "" => ANONYMOUS,
                    name => name,
                };
                return StackFrame::location(function, &caps[2], line_no, column);
            }
        }
        if let Some(caps) = WITHOUT_FUNCTION.captures(line) {
            if let (Ok(line_no), Ok(column)) = (caps[2].parse(), caps[3].parse()) {
                return StackFrame::location(ANONYMOUS, &caps[1], line_no, column);
            }
        }
        StackFrame::raw(line.trim())
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, StackFrame::Raw { .. })
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackFrame::Location {
                function,
                file,
                line,
                column,
            } => write!(f, "at {function} ({file}:{line}:{column})"),
            StackFrame::Raw { raw } => write!(f, "at {raw}"),
        }
    }
}

/// 格式化选项
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatOptions {
    /// 最多输出的栈帧数
    pub max_entries: usize,
    /// 每行前缀空格数
    pub indent: usize,
    /// 行分隔符
    pub delimiter: String,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            indent: 0,
            delimiter: "\n".to_string(),
        }
    }
}

impl FormatOptions {
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }
}

/// 解析原始调用栈文本（丢弃标题行与空行）
pub fn parse(text: &str) -> Vec<StackFrame> {
    text.lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(StackFrame::parse_line)
        .collect()
}

/// 将栈帧格式化为文本
pub fn format(frames: &[StackFrame], options: &FormatOptions) -> String {
    let pad = " ".repeat(options.indent);
    frames
        .iter()
        .take(options.max_entries)
        .map(|frame| format!("{pad}{frame}"))
        .collect::<Vec<_>>()
        .join(&options.delimiter)
}

/// 先解析再格式化
pub fn format_raw(text: &str, options: &FormatOptions) -> String {
    format(&parse(text), options)
}

/// 捕获当前调用栈，渲染为可被 [`parse`] 消费的文本
///
/// `skip` 为需要跳过的最内层帧数（`capture` 自身算一帧）。
/// 没有符号信息的帧被丢弃；有名字但没有源码位置的帧只输出名字，解析后成为 Raw 帧。
#[inline(never)]
pub fn capture(skip: usize) -> String {
    let trace = backtrace::Backtrace::new();
    let mut lines = Vec::new();

    for frame in trace.frames() {
        for symbol in frame.symbols() {
            let Some(name) = symbol.name() else {
                continue;
            };
            let name = format!("{name:#}");
            if name.starts_with("backtrace::") {
                continue;
            }
            let line = match (symbol.filename(), symbol.lineno()) {
                (Some(file), Some(line_no)) => format!(
                    "    at {} ({}:{}:{})",
                    name,
                    file.display(),
                    line_no,
                    symbol.colno().unwrap_or(0)
                ),
                _ => format!("    {name}"),
            };
            lines.push(line);
        }
    }

    let mut text = String::from("Error");
    for line in lines.into_iter().skip(skip) {
        text.push('\n');
        text.push_str(&line);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Error\n    at foo (/tmp/a.js:10:5)\n    at bar (/tmp/b.js:2:1)";

    #[test]
    fn test_parse_named_frames() {
        let frames = parse(SAMPLE);
        assert_eq!(
            frames,
            vec![
                StackFrame::location("foo", "/tmp/a.js", 10, 5),
                StackFrame::location("bar", "/tmp/b.js", 2, 1),
            ]
        );
    }

    #[test]
    fn test_parse_anonymous_frame() {
        let frames = parse("TypeError: x\n    at /srv/app/index.js:44:12");
        assert_eq!(
            frames,
            vec![StackFrame::location(ANONYMOUS, "/srv/app/index.js", 44, 12)]
        );
    }

    #[test]
    fn test_parse_raw_fallback() {
        let frames = parse("Error\n    at native\n  something odd  ");
        assert_eq!(
            frames,
            vec![StackFrame::raw("at native"), StackFrame::raw("something odd")]
        );
        assert!(frames.iter().all(StackFrame::is_raw));
    }

    #[test]
    fn test_parse_header_only() {
        assert!(parse("Error: nothing here").is_empty());
        assert!(parse("").is_empty());
    }

    #[test]
    fn test_parse_function_with_spaces() {
        let frame = StackFrame::parse_line(
            "    at <T as core::ops::Fn>::call (/src/lib.rs:7:9)",
        );
        assert_eq!(
            frame,
            StackFrame::location("<T as core::ops::Fn>::call", "/src/lib.rs", 7, 9)
        );
    }

    #[test]
    fn test_parse_line_number_overflow_is_raw() {
        let frame = StackFrame::parse_line("at f (/a.js:99999999999:1)");
        assert!(frame.is_raw());
    }

    #[test]
    fn test_format_defaults() {
        let text = format_raw(SAMPLE, &FormatOptions::default());
        assert_eq!(
            text,
            "at foo (/tmp/a.js:10:5)\nat bar (/tmp/b.js:2:1)"
        );
    }

    #[test]
    fn test_format_options() {
        let options = FormatOptions::default()
            .with_max_entries(1)
            .with_indent(3)
            .with_delimiter(",");
        assert_eq!(format_raw(SAMPLE, &options), "   at foo (/tmp/a.js:10:5)");

        let options = FormatOptions::default().with_indent(2).with_delimiter(" | ");
        assert_eq!(
            format_raw(SAMPLE, &options),
            "  at foo (/tmp/a.js:10:5) |   at bar (/tmp/b.js:2:1)"
        );
    }

    #[test]
    fn test_format_raw_frame() {
        let frames = vec![StackFrame::raw("main")];
        assert_eq!(format(&frames, &FormatOptions::default()), "at main");
    }

    #[test]
    fn test_format_is_deterministic() {
        let options = FormatOptions::default().with_indent(4);
        let first = format_raw(SAMPLE, &options);
        for _ in 0..3 {
            assert_eq!(format_raw(SAMPLE, &options), first);
        }
    }

    #[test]
    fn test_frame_serializes_like_wire_format() {
        let located = serde_json::to_value(StackFrame::location("f", "/a.rs", 1, 2)).unwrap();
        assert_eq!(
            located,
            serde_json::json!({ "function": "f", "file": "/a.rs", "line": 1, "column": 2 })
        );
        let raw = serde_json::to_value(StackFrame::raw("main")).unwrap();
        assert_eq!(raw, serde_json::json!({ "raw": "main" }));
    }

    #[test]
    fn test_capture_is_parseable() {
        let text = capture(0);
        assert!(text.starts_with("Error"));
        // 捕获结果必须能被解析器消费（不 panic 即可，符号信息取决于构建配置）
        let frames = parse(&text);
        let rendered = format(&frames, &FormatOptions::default());
        assert_eq!(rendered, format(&parse(&text), &FormatOptions::default()));
    }
}
