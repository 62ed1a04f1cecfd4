//! CLI 格式化输出
//!
//! 提供命令行友好的错误显示和源码上下文打印。

use debuglog_core::{Error, StackFrame};

/// 打印错误；增强错误额外显示最内层栈帧所在的源码
pub fn print_error(e: &Error) {
    eprintln!("❌ {}", e);

    let Some(error) = e.raised() else {
        return;
    };
    let top = error.stack_frames().iter().find_map(|frame| match frame {
        StackFrame::Location {
            file, line, column, ..
        } => Some((file.as_str(), *line as usize, *column as usize)),
        StackFrame::Raw { .. } => None,
    });

    if let Some((file, line, column)) = top {
        if let Ok(source) = std::fs::read_to_string(file) {
            print_source_context(&source, line, column);
        }
    }
}

/// 打印源代码上下文（显示错误行前后几行）
pub fn print_source_context(source: &str, error_line: usize, error_col: usize) {
    for line in source_context(source, error_line, error_col) {
        eprintln!("{}", line);
    }
}

fn source_context(source: &str, error_line: usize, error_col: usize) -> Vec<String> {
    const CONTEXT_LINES: usize = 3; // 错误行前后显示的上下文行数

    let lines: Vec<&str> = source.lines().collect();
    let total_lines = lines.len();

    if error_line == 0 || error_line > total_lines {
        return Vec::new();
    }

    let start_line = error_line.saturating_sub(CONTEXT_LINES).max(1);
    let end_line = (error_line + CONTEXT_LINES).min(total_lines);
    let width = end_line.to_string().len();
    let separator = "-".repeat(width + 1);

    let mut out = vec![format!("{}|--", separator)];
    for line_idx in start_line..=end_line {
        out.push(format!("{:>width$} | {}", line_idx, lines[line_idx - 1]));
        if line_idx == error_line {
            // 指向错误列的标记
            out.push(format!(
                "{} | {}^",
                " ".repeat(width),
                " ".repeat(error_col.saturating_sub(1))
            ));
        }
    }
    out.push(format!("{}|--", separator));
    out
}
