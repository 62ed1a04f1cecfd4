//! 环安全序列化器
//!
//! 深度优先遍历 [`Value`] 图，输出 `serde_json::Value`。每次顶层调用持有一个按身份
//! 记录的已访问集合，再次遇到同一引用时输出 `"[Circular]"`，因此输出一定无环。
//!
//! | 输入 | 输出 |
//! |------|------|
//! | 标量 / null | 原样 |
//! | BigInt / 函数 / 符号 | 文本形式 |
//! | 字节缓冲区 | UTF-8 文本（有损解码） |
//! | 日期 | ISO-8601 |
//! | 数组 / Set / 定长数值数组 | 序列 |
//! | Map | `[key, value]` 对的序列 |
//! | 错误 | `{name, message, stack, ...fields}` |
//! | 对象 | 逐键递归，符号键转为文本 |

use crate::stacktrace::{self, FormatOptions};
use crate::value::{Throwable, Value};
use chrono::SecondsFormat;
use serde_json::{Map, Value as Json};
use std::collections::HashSet;
use std::sync::Arc;

/// 环上的回引用
pub const CIRCULAR: &str = "[Circular]";

/// 无法读取的值（容器锁已中毒）
pub const CIRCULAR_OBJECT: &str = "[Circular Object]";

/// 序列化任意值
pub fn serialize(value: &Value) -> Json {
    Serializer::default().visit(value)
}

/// 日志参数的文本形式：字符串原样，标量取显示形式，其余为缩进 JSON
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Str(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(n) => n.to_string(),
        Value::BigInt(i) => i.to_string(),
        Value::Symbol(desc) => format!("Symbol({desc})"),
        Value::Function(text) => text.clone(),
        Value::Date(at) => at.to_rfc3339_opts(SecondsFormat::Millis, true),
        other => serde_json::to_string_pretty(&serialize(other))
            .unwrap_or_else(|_| CIRCULAR_OBJECT.to_string()),
    }
}

#[derive(Default)]
struct Serializer {
    visited: HashSet<usize>,
}

impl Serializer {
    fn visit(&mut self, value: &Value) -> Json {
        if let Some(id) = value.identity() {
            if !self.visited.insert(id) {
                return Json::String(CIRCULAR.to_string());
            }
        }

        match value {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(n) => serde_json::Number::from_f64(*n)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::BigInt(i) => Json::String(i.to_string()),
            Value::Str(s) => Json::String(s.clone()),
            Value::Symbol(desc) => Json::String(format!("Symbol({desc})")),
            Value::Function(text) => Json::String(text.clone()),
            Value::Bytes(data) => Json::String(String::from_utf8_lossy(data).into_owned()),
            Value::Date(at) => Json::String(at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Value::TypedArray(array) => array.to_json(),
            Value::Array(items) | Value::Set(items) => match items.read() {
                Ok(items) => Json::Array(items.iter().map(|item| self.visit(item)).collect()),
                Err(_) => unreadable("sequence"),
            },
            Value::Map(entries) => match entries.read() {
                Ok(entries) => Json::Array(
                    entries
                        .iter()
                        .map(|(k, v)| Json::Array(vec![self.visit(k), self.visit(v)]))
                        .collect(),
                ),
                Err(_) => unreadable("map"),
            },
            Value::Object(map) => match map.read() {
                Ok(map) => {
                    let mut out = Map::with_capacity(map.len());
                    for (key, item) in map.iter() {
                        out.insert(key.to_text(), self.visit(item));
                    }
                    Json::Object(out)
                }
                Err(_) => unreadable("object"),
            },
            Value::Error(error) => self.visit_error(error),
        }
    }

    fn visit_error(&mut self, error: &Arc<dyn Throwable>) -> Json {
        let stack = stacktrace::format(
            &error.stack_frames(),
            &FormatOptions::default().with_delimiter(","),
        );

        let mut out = Map::new();
        out.insert("name".to_string(), Json::String(error.name()));
        out.insert("message".to_string(), Json::String(error.message()));
        out.insert("stack".to_string(), Json::String(stack));
        for (key, field) in error.fields() {
            let field = self.visit(&field);
            out.insert(key, field);
        }
        Json::Object(out)
    }
}

fn unreadable(kind: &str) -> Json {
    tracing::warn!(kind, "container lock poisoned during serialization");
    Json::String(CIRCULAR_OBJECT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Key, NativeError, TypedArray};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_self_reference() {
        let obj = Value::object_from([("a", 1)]);
        obj.insert("self", obj.clone());
        assert_eq!(serialize(&obj), json!({ "a": 1, "self": "[Circular]" }));
    }

    #[test]
    fn test_indirect_cycle() {
        let parent = Value::object();
        let child = Value::array(vec![Value::from("x"), parent.clone()]);
        parent.insert("children", child);
        assert_eq!(
            serialize(&parent),
            json!({ "children": ["x", "[Circular]"] })
        );
    }

    #[test]
    fn test_visited_scoped_per_call() {
        let obj = Value::object_from([("k", "v")]);
        assert_eq!(serialize(&obj), json!({ "k": "v" }));
        assert_eq!(serialize(&obj), json!({ "k": "v" }));
    }

    #[test]
    fn test_scalars() {
        assert_eq!(serialize(&Value::Null), Json::Null);
        assert_eq!(serialize(&Value::from(true)), json!(true));
        assert_eq!(serialize(&Value::from(2.5)), json!(2.5));
        assert_eq!(serialize(&Value::from(f64::INFINITY)), Json::Null);
        assert_eq!(serialize(&Value::BigInt(1 << 80)), json!("1208925819614629174706176"));
    }

    #[test]
    fn test_textual_forms() {
        let date = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let obj = Value::object_from([
            ("when", Value::date(date)),
            ("cb", Value::function("function cb() {}")),
            ("buf", Value::bytes(b"hello".to_vec())),
            ("big", Value::BigInt(42)),
        ]);
        obj.insert(Key::Symbol("tag".into()), "sym");
        assert_eq!(
            serialize(&obj),
            json!({
                "when": "2024-01-02T03:04:05.000Z",
                "cb": "function cb() {}",
                "buf": "hello",
                "big": "42",
                "Symbol(tag)": "sym",
            })
        );
    }

    #[test]
    fn test_collections() {
        let map = Value::map(vec![(Value::from("k"), Value::array(vec![Value::from(1)]))]);
        assert_eq!(serialize(&map), json!([["k", [1]]]));

        let set = Value::set(vec![Value::from(1), Value::from("two")]);
        assert_eq!(serialize(&set), json!([1, "two"]));

        let typed = Value::from(TypedArray::U32(vec![1, 2, 3]));
        assert_eq!(serialize(&typed), json!([1, 2, 3]));
    }

    #[test]
    fn test_error_branch() {
        let error = NativeError::named("TypeError", "bad input");
        let json = serialize(&Value::error(error));
        assert_eq!(json["name"], "TypeError");
        assert_eq!(json["message"], "bad input");
        assert!(json["stack"].is_string());
    }

    #[test]
    fn test_poisoned_container_marker() {
        let list = Value::array(vec![Value::from(1)]);
        if let Value::Array(items) = &list {
            let shared = Arc::clone(items);
            let joined = std::thread::spawn(move || {
                let guard = shared.write().unwrap();
                panic!("poison while holding {:?}", guard.len());
            })
            .join();
            assert!(joined.is_err());
        }
        let outer = Value::object_from([("ok", Value::from(1)), ("list", list)]);
        assert_eq!(
            serialize(&outer),
            json!({ "ok": 1, "list": "[Circular Object]" })
        );
    }

    #[test]
    fn test_to_text() {
        assert_eq!(to_text(&Value::from("plain")), "plain");
        assert_eq!(to_text(&Value::from(3)), "3");
        assert_eq!(to_text(&Value::from(1.0)), "1");
        assert_eq!(to_text(&Value::Null), "null");
        assert_eq!(to_text(&Value::array(vec![Value::from(1)])), "[\n  1\n]");
    }
}
