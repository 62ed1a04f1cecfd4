//! 同步事件总线
//!
//! 监听器按订阅顺序同步调用。调用监听器期间，发起分发的线程处于"重入"状态：
//! 该线程上的嵌套 `emit` 被抑制，日志管线也据此避免"写入日志 -> 监听器再写日志"的
//! 无限反馈。其他线程不受影响。

use core::fmt;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, ThreadId};

/// 监听器，参数为事件携带的文本
pub type Listener = Arc<dyn Fn(&[&str]) + Send + Sync>;

/// 包装闭包为监听器
pub fn listener<F>(callback: F) -> Listener
where
    F: Fn(&[&str]) + Send + Sync + 'static,
{
    Arc::new(callback)
}

/// 内置事件通道
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// 写入日志文件，参数：文件路径、写入文本
    FileLog,
    /// 控制台透传，参数：来源标签、写入文本
    ConsoleLog,
    /// 模块加载（由外部适配层使用）
    ModuleCall,
}

impl EventKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventKind::FileLog => "filelog",
            EventKind::ConsoleLog => "consolelog",
            EventKind::ModuleCall => "modulecall",
        }
    }
}

impl AsRef<str> for EventKind {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 事件总线
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<HashMap<String, Vec<Listener>>>,
    dispatching: Mutex<HashSet<ThreadId>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 订阅事件
    pub fn on(&self, event: impl AsRef<str>, listener: Listener) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event.as_ref().to_string())
            .or_default()
            .push(listener);
    }

    /// 按身份移除监听器，返回是否有监听器被移除
    pub fn off(&self, event: impl AsRef<str>, listener: &Listener) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let Some(registered) = listeners.get_mut(event.as_ref()) else {
            return false;
        };
        let before = registered.len();
        registered.retain(|existing| !Arc::ptr_eq(existing, listener));
        before != registered.len()
    }

    /// 同步分发事件，返回被调用的监听器数
    ///
    /// 重入期间（即本线程上某个监听器正在运行）直接返回 0。
    pub fn emit(&self, event: impl AsRef<str>, args: &[&str]) -> usize {
        let event = event.as_ref();
        if self.is_reentrant() {
            tracing::trace!(event, "nested emit suppressed");
            return 0;
        }

        // 快照：监听器内部可以安全地 on/off
        let snapshot: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .cloned()
            .unwrap_or_default();

        for callback in &snapshot {
            let guard = DispatchGuard::enter(&self.dispatching);
            callback(args);
            drop(guard);
        }
        snapshot.len()
    }

    /// 当前线程是否正在运行某个监听器
    pub fn is_reentrant(&self) -> bool {
        self.dispatching
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&thread::current().id())
    }

    pub fn listener_count(&self, event: impl AsRef<str>) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event.as_ref())
            .map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        let mut counts: Vec<(&String, usize)> =
            listeners.iter().map(|(event, list)| (event, list.len())).collect();
        counts.sort();
        f.debug_struct("EventBus")
            .field("listeners", &counts)
            .field("dispatching", &self.is_reentrant())
            .finish()
    }
}

/// 监听器运行期间登记当前线程，退出（包括 panic 展开）时注销
struct DispatchGuard<'a> {
    threads: &'a Mutex<HashSet<ThreadId>>,
    id: ThreadId,
}

impl<'a> DispatchGuard<'a> {
    fn enter(threads: &'a Mutex<HashSet<ThreadId>>) -> Self {
        let id = thread::current().id();
        threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        Self { threads, id }
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}
