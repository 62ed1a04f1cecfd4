//! 运行时值模型
//!
//! 日志参数和错误上下文都以 [`Value`] 表示。容器类型（数组、对象、Map、Set）是
//! `Arc<RwLock<..>>` 共享句柄，因此可以构造任意对象图，包括自引用的环。
//! 容器的身份由分配地址决定，序列化器据此检测环。

use crate::stacktrace::{self, StackFrame};
use chrono::{DateTime, Utc};
use core::fmt;
use indexmap::IndexMap;
use std::sync::{Arc, PoisonError, RwLock};

/// 共享可变容器
pub type Shared<T> = Arc<RwLock<T>>;

/// 对象键
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Str(String),
    /// 符号键，携带描述文本
    Symbol(String),
}

impl Key {
    /// 键的文本形式，符号键为 `Symbol(<desc>)`
    pub fn to_text(&self) -> String {
        match self {
            Key::Str(s) => s.clone(),
            Key::Symbol(desc) => format!("Symbol({desc})"),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

/// 定长数值数组
#[derive(Clone, Debug, PartialEq)]
pub enum TypedArray {
    U8(Vec<u8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl TypedArray {
    pub fn len(&self) -> usize {
        match self {
            TypedArray::U8(v) => v.len(),
            TypedArray::I16(v) => v.len(),
            TypedArray::I32(v) => v.len(),
            TypedArray::U32(v) => v.len(),
            TypedArray::F32(v) => v.len(),
            TypedArray::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 展开为普通数字序列；非有限浮点数变为 null
    pub fn to_json(&self) -> serde_json::Value {
        fn float(n: f64) -> serde_json::Value {
            serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null)
        }

        let items: Vec<serde_json::Value> = match self {
            TypedArray::U8(v) => v.iter().map(|n| (*n).into()).collect(),
            TypedArray::I16(v) => v.iter().map(|n| (*n).into()).collect(),
            TypedArray::I32(v) => v.iter().map(|n| (*n).into()).collect(),
            TypedArray::U32(v) => v.iter().map(|n| (*n).into()).collect(),
            TypedArray::F32(v) => v.iter().map(|n| float(f64::from(*n))).collect(),
            TypedArray::F64(v) => v.iter().map(|n| float(*n)).collect(),
        };
        serde_json::Value::Array(items)
    }
}

/// 可抛出的错误
///
/// [`crate::EnrichedError`] 与 [`NativeError`] 实现此 trait，序列化器对其做结构化展开。
pub trait Throwable: Send + Sync + fmt::Debug {
    /// 错误名
    fn name(&self) -> String;

    /// 以空参数渲染的消息
    fn message(&self) -> String;

    /// 已解析的调用栈
    fn stack_frames(&self) -> Vec<StackFrame> {
        Vec::new()
    }

    /// 除 name/message/stack 以外的自有字段
    fn fields(&self) -> Vec<(String, Value)> {
        Vec::new()
    }
}

/// 包装任意 `std::error::Error` 的可抛出值
#[derive(Clone, Debug)]
pub struct NativeError {
    name: String,
    message: String,
    frames: Vec<StackFrame>,
}

impl NativeError {
    /// 以错误类型名作为 name，并捕获当前调用栈
    pub fn new<E: std::error::Error + ?Sized>(error: &E) -> Self {
        Self::named(short_type_name::<E>(), error.to_string())
    }

    pub fn named(name: impl Into<String>, message: impl Into<String>) -> Self {
        let mut frames = stacktrace::parse(&stacktrace::capture(2));
        frames.truncate(debuglog_config::DEFAULT_STACK_CAP);
        Self {
            name: name.into(),
            message: message.into(),
            frames,
        }
    }
}

impl Throwable for NativeError {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn message(&self) -> String {
        self.message.clone()
    }

    fn stack_frames(&self) -> Vec<StackFrame> {
        self.frames.clone()
    }
}

/// `std::io::Error` -> `Error`
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// 运行时值
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// 任意精度整数，始终以文本输出
    BigInt(i128),
    Str(String),
    /// 符号，携带描述文本
    Symbol(String),
    /// 函数，携带源码文本
    Function(String),
    /// 字节缓冲区
    Bytes(Vec<u8>),
    Date(DateTime<Utc>),
    TypedArray(TypedArray),
    Array(Shared<Vec<Value>>),
    Object(Shared<IndexMap<Key, Value>>),
    Map(Shared<Vec<(Value, Value)>>),
    Set(Shared<Vec<Value>>),
    Error(Arc<dyn Throwable>),
}

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Arc::new(RwLock::new(items)))
    }

    /// 空对象
    pub fn object() -> Self {
        Value::Object(Arc::new(RwLock::new(IndexMap::new())))
    }

    pub fn object_from<K, V, I>(entries: I) -> Self
    where
        K: Into<Key>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Value::Object(Arc::new(RwLock::new(map)))
    }

    pub fn map(entries: Vec<(Value, Value)>) -> Self {
        Value::Map(Arc::new(RwLock::new(entries)))
    }

    pub fn set(items: Vec<Value>) -> Self {
        Value::Set(Arc::new(RwLock::new(items)))
    }

    pub fn function(text: impl Into<String>) -> Self {
        Value::Function(text.into())
    }

    pub fn symbol(desc: impl Into<String>) -> Self {
        Value::Symbol(desc.into())
    }

    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(data.into())
    }

    pub fn date(at: DateTime<Utc>) -> Self {
        Value::Date(at)
    }

    pub fn error<T: Throwable + 'static>(error: T) -> Self {
        Value::Error(Arc::new(error))
    }

    /// 向对象插入键值；非对象返回 false
    pub fn insert(&self, key: impl Into<Key>, value: impl Into<Value>) -> bool {
        match self {
            Value::Object(map) => {
                map.write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(key.into(), value.into());
                true
            }
            _ => false,
        }
    }

    /// 向数组或 Set 追加元素；其它类型返回 false
    pub fn push(&self, value: impl Into<Value>) -> bool {
        match self {
            Value::Array(items) | Value::Set(items) => {
                items
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(value.into());
                true
            }
            _ => false,
        }
    }

    /// 读取对象的字符串键
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(map) => map.read().ok()?.get(&Key::from(key)).cloned(),
            _ => None,
        }
    }

    /// 引用类型的身份（分配地址），标量返回 None
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Array(items) | Value::Set(items) => Some(Arc::as_ptr(items) as *const () as usize),
            Value::Object(map) => Some(Arc::as_ptr(map) as *const () as usize),
            Value::Map(entries) => Some(Arc::as_ptr(entries) as *const () as usize),
            Value::Error(error) => Some(Arc::as_ptr(error) as *const () as usize),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_throwable(&self) -> Option<&Arc<dyn Throwable>> {
        match self {
            Value::Error(error) => Some(error),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// 从 JSON 构造；超出 i64 的整数变为 BigInt
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::BigInt(i128::from(u))
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => {
                Value::object_from(map.into_iter().map(|(k, v)| (k, Value::from_json(v))))
            }
        }
    }
}

// 只打印一层，避免在环上无限递归
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(n) => write!(f, "Float({n})"),
            Value::BigInt(i) => write!(f, "BigInt({i})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Symbol(desc) => write!(f, "Symbol({desc:?})"),
            Value::Function(text) => write!(f, "Function({text:?})"),
            Value::Bytes(data) => write!(f, "Bytes(len={})", data.len()),
            Value::Date(at) => write!(f, "Date({at})"),
            Value::TypedArray(array) => write!(f, "TypedArray(len={})", array.len()),
            Value::Array(items) => write!(f, "Array@{:p}", Arc::as_ptr(items)),
            Value::Object(map) => write!(f, "Object@{:p}", Arc::as_ptr(map)),
            Value::Map(entries) => write!(f, "Map@{:p}", Arc::as_ptr(entries)),
            Value::Set(items) => write!(f, "Set@{:p}", Arc::as_ptr(items)),
            Value::Error(error) => write!(f, "Error({}: {})", error.name(), error.message()),
        }
    }
}

macro_rules! impl_from_small_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Value::Int(i64::from(n))
                }
            }
        )*
    };
}

impl_from_small_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        i64::try_from(n)
            .map(Value::Int)
            .unwrap_or(Value::BigInt(i128::from(n)))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::from(n as u64)
    }
}

impl From<i128> for Value {
    fn from(n: i128) -> Self {
        Value::BigInt(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Float(f64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Str(s.clone())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(at: DateTime<Utc>) -> Self {
        Value::Date(at)
    }
}

impl From<TypedArray> for Value {
    fn from(array: TypedArray) -> Self {
        Value::TypedArray(array)
    }
}

impl From<Arc<dyn Throwable>> for Value {
    fn from(error: Arc<dyn Throwable>) -> Self {
        Value::Error(error)
    }
}

impl From<NativeError> for Value {
    fn from(error: NativeError) -> Self {
        Value::error(error)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from_json(json)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}
