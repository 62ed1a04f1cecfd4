//! 测试辅助工具

use debuglog::Value;
use std::path::Path;

/// 读取目录下今天的日志文件（逐行）
pub fn read_today(dir: &Path) -> Vec<String> {
    let name = format!("{}.log", chrono::Local::now().format("%Y-%m-%d"));
    std::fs::read_to_string(dir.join(name))
        .unwrap_or_default()
        .lines()
        .map(String::from)
        .collect()
}

/// 去掉 `[YYYY-MM-DD HH:MM:SS] ` 前缀
pub fn strip_timestamp(line: &str) -> &str {
    line.get(22..).unwrap_or("")
}

/// `{ a: 1, self: <self> }`
pub fn self_referencing_object() -> Value {
    let obj = Value::object_from([("a", 1)]);
    obj.insert("self", obj.clone());
    obj
}
