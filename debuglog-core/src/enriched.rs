//! 增强错误
//!
//! [`EnrichedError`] 在构造时捕获时间戳与调用栈，携带可合并的上下文字段，
//! 可与 JSON 互相转换：
//!
//! ```text
//! { "name": ..., "message": ..., "timestamp": ISO-8601, "stack": ..., ...上下文字段 }
//! ```
//!
//! 从 JSON 重建时，与保留字段同名的键改存为 `<key>-original`。

use crate::catalog::{self, CatalogMessage};
use crate::serializer::serialize;
use crate::stacktrace::{self, FormatOptions, StackFrame};
use crate::value::{Throwable, Value};
use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use core::fmt;
use debuglog_config::DEFAULT_STACK_CAP;
use indexmap::IndexMap;
use std::sync::{Arc, PoisonError};

/// 保留字段，构造时由错误自身填充
pub const RESERVED_KEYS: [&str; 4] = ["name", "message", "timestamp", "stack"];

type TemplateFn = dyn Fn(&[&str]) -> String + Send + Sync;

/// 错误消息：字面量或模板
///
/// 唯一的渲染入口是 [`Message::render`]；无参数渲染就是以空参数列表调用。
#[derive(Clone)]
pub enum Message {
    Literal(String),
    Template(Arc<TemplateFn>),
}

impl Message {
    pub fn template<F>(render: F) -> Self
    where
        F: Fn(&[&str]) -> String + Send + Sync + 'static,
    {
        Message::Template(Arc::new(render))
    }

    pub fn render(&self, args: &[&str]) -> String {
        match self {
            Message::Literal(text) => text.clone(),
            Message::Template(render) => render(args),
        }
    }

    pub fn is_template(&self) -> bool {
        matches!(self, Message::Template(_))
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Literal(text) => f.debug_tuple("Literal").field(text).finish(),
            Message::Template(_) => f.write_str("Template(..)"),
        }
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::Literal(text.to_string())
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::Literal(text)
    }
}

impl From<CatalogMessage> for Message {
    fn from(message: CatalogMessage) -> Self {
        match message {
            CatalogMessage::Literal(text) => Message::Literal(text.to_string()),
            CatalogMessage::Template(render) => Message::Template(Arc::new(render)),
        }
    }
}

/// 携带调用栈、时间戳与上下文的错误
#[derive(Clone, Debug)]
pub struct EnrichedError {
    name: String,
    message: Message,
    timestamp: DateTime<Utc>,
    frames: Vec<StackFrame>,
    context: IndexMap<String, Value>,
}

impl EnrichedError {
    /// 捕获当前调用栈（最多 15 帧）
    #[inline(never)]
    pub fn new(name: impl Into<String>, message: impl Into<Message>) -> Self {
        Self::with_stack_cap(name, message, DEFAULT_STACK_CAP)
    }

    #[inline(never)]
    pub fn with_stack_cap(
        name: impl Into<String>,
        message: impl Into<Message>,
        cap: usize,
    ) -> Self {
        Self::with_raw_stack(name, message, &stacktrace::capture(2), cap)
    }

    /// 使用调用方提供的调用栈文本
    pub fn with_raw_stack(
        name: impl Into<String>,
        message: impl Into<Message>,
        raw_stack: &str,
        cap: usize,
    ) -> Self {
        let name = name.into();
        let message = message.into();
        let timestamp = Utc::now();
        let mut frames = stacktrace::parse(raw_stack);
        frames.truncate(cap);

        let stack = stacktrace::format(&frames, &FormatOptions::default().with_max_entries(cap));
        let mut context = IndexMap::new();
        context.insert("name".to_string(), Value::from(name.clone()));
        context.insert("message".to_string(), Value::from(message.render(&[])));
        context.insert("timestamp".to_string(), Value::Date(timestamp));
        context.insert("stack".to_string(), Value::from(stack));

        Self {
            name,
            message,
            timestamp,
            frames,
            context,
        }
    }

    /// 合并上下文；对象按键合并（同名覆盖），其它值包装为 `{data: value}`
    pub fn add_data(&mut self, data: impl Into<Value>) -> &mut Self {
        match data.into() {
            Value::Object(map) => {
                let entries = map.read().unwrap_or_else(PoisonError::into_inner);
                for (key, value) in entries.iter() {
                    self.context.insert(key.to_text(), value.clone());
                }
            }
            other => {
                self.context.insert("data".to_string(), other);
            }
        }
        self
    }

    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.add_data(data);
        self
    }

    pub fn data(&self) -> &IndexMap<String, Value> {
        &self.context
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn render_message(&self, args: &[&str]) -> String {
        self.message.render(args)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn stack_frames(&self) -> &[StackFrame] {
        &self.frames
    }

    /// 上下文的 JSON 文本
    pub fn to_json(&self) -> String {
        let object = Value::object_from(
            self.context
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        serialize(&object).to_string()
    }

    /// 从 JSON 重建
    ///
    /// 非法 JSON 返回 [`Error::Json`]；`should_throw` 为真时以 [`Error::Raised`] 返回重建的错误。
    pub fn from_json(json: &str, should_throw: bool) -> Result<Self> {
        let fields = match serde_json::from_str::<serde_json::Value>(json)? {
            serde_json::Value::Object(map) => map,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };

        let name = fields
            .get("name")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("Error")
            .to_string();
        let message = fields
            .get("message")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("")
            .to_string();

        let mut error = Self::new(name, message);
        // 保留键以 `<key>-original` 重新附加，值取自 JSON 本身
        for (key, value) in fields {
            let key = if RESERVED_KEYS.contains(&key.as_str()) {
                format!("{key}-original")
            } else {
                key
            };
            error.context.insert(key, Value::from_json(value));
        }

        error.raise_if(should_throw)
    }

    /// 从错误码构造（未知错误码回退到 `DLE1005`），上下文附带请求的 `code`
    pub fn from_error_code(code: &str, should_throw: bool) -> Result<Self> {
        Self::from_code(code).raise_if(should_throw)
    }

    /// 不抛出的 [`EnrichedError::from_error_code`]
    pub fn from_code(code: &str) -> Self {
        let entry = catalog::lookup(code);
        let mut error = Self::new(entry.name, entry.message);
        error.context.insert("code".to_string(), Value::from(code));
        error
    }

    fn raise_if(self, should_throw: bool) -> Result<Self> {
        if should_throw {
            Err(Error::Raised(Box::new(self)))
        } else {
            Ok(self)
        }
    }
}

impl fmt::Display for EnrichedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stack = stacktrace::format(&self.frames, &FormatOptions::default().with_indent(3));
        write!(
            f,
            "Error: {}, Message: {}, Time: {}, Stack:\n{}",
            self.name,
            self.message.render(&[]),
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            stack
        )
    }
}

impl std::error::Error for EnrichedError {}

impl Throwable for EnrichedError {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn message(&self) -> String {
        self.message.render(&[])
    }

    fn stack_frames(&self) -> Vec<StackFrame> {
        self.frames.clone()
    }

    fn fields(&self) -> Vec<(String, Value)> {
        self.context
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

impl From<EnrichedError> for Value {
    fn from(error: EnrichedError) -> Self {
        Value::error(error)
    }
}
