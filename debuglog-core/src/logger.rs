//! 日志管线
//!
//! 每次调用：识别来源标签 -> 拼接消息体 -> 计算与上次调用的时间差 -> 写入当日日志文件
//! -> 发出 `filelog` 事件 -> （带标签时）发出 `consolelog` 事件并透传给控制台。
//!
//! 进程内只有一个 [`Logger`]，通过 [`Logger::init`] 或 [`Logger::global`] 获取。

use crate::catalog::SINGLETON_CODE;
use crate::enriched::EnrichedError;
use crate::event_bus::{EventBus, EventKind, Listener};
use crate::record::{ConsoleTag, Level, LogRecord};
use crate::runtime::{self, EnvInfo, RuntimeData};
use crate::serializer::{serialize, to_text};
use crate::value::{Throwable, Value};
use crate::{Error, Result};
use chrono::{Local, NaiveDateTime};
use debuglog_config::LoggerConfig;
use once_cell::sync::OnceCell;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

static INSTANCE: OnceCell<Logger> = OnceCell::new();

/// 控制台透传目标
pub trait ConsoleSink: Send + Sync {
    fn write(&self, tag: ConsoleTag, text: &str);
}

impl<T: ConsoleSink + ?Sized> ConsoleSink for Arc<T> {
    fn write(&self, tag: ConsoleTag, text: &str) {
        (**self).write(tag, text);
    }
}

/// 标准输出/标准错误（error、trace 走标准错误）
pub struct StdConsole;

impl ConsoleSink for StdConsole {
    fn write(&self, tag: ConsoleTag, text: &str) {
        if tag.is_error_stream() {
            eprintln!("{text}");
        } else {
            println!("{text}");
        }
    }
}

#[derive(Default)]
struct Clock {
    last_call: Option<Instant>,
    last_wall: Option<NaiveDateTime>,
}

impl Clock {
    /// 返回（距上次调用的毫秒数，不回退的墙钟时间）
    fn tick(&mut self) -> (u128, NaiveDateTime) {
        let now = Instant::now();
        let delta = self
            .last_call
            .map_or(0, |last| now.duration_since(last).as_millis());
        self.last_call = Some(now);

        let wall = Local::now().naive_local();
        let wall = match self.last_wall {
            Some(previous) if previous > wall => previous,
            _ => wall,
        };
        self.last_wall = Some(wall);
        (delta, wall)
    }
}

/// 日志管线
pub struct Logger {
    debug: AtomicBool,
    directory: RwLock<PathBuf>,
    stack_cap: usize,
    bus: EventBus,
    started: Instant,
    clock: Mutex<Clock>,
    console: RwLock<Option<Box<dyn ConsoleSink>>>,
}

impl Logger {
    pub(crate) fn new(config: &LoggerConfig) -> Self {
        Self {
            debug: AtomicBool::new(config.debug),
            directory: RwLock::new(config.resolved_directory()),
            stack_cap: config.stack_cap,
            bus: EventBus::new(),
            started: Instant::now(),
            clock: Mutex::new(Clock::default()),
            console: RwLock::new(None),
        }
    }

    /// 构造进程内唯一实例；重复调用返回 `DLE5001` SingletonError
    pub fn init(config: LoggerConfig) -> Result<&'static Logger> {
        let mut created = false;
        let logger = INSTANCE.get_or_init(|| {
            created = true;
            Logger::started(&config)
        });
        if created {
            Ok(logger)
        } else {
            Err(Error::Raised(Box::new(EnrichedError::from_code(
                SINGLETON_CODE,
            ))))
        }
    }

    /// 获取实例，尚未初始化时按环境变量（或默认配置）构造
    pub fn global() -> &'static Logger {
        INSTANCE.get_or_init(|| {
            let config = LoggerConfig::from_env().unwrap_or_else(|err| {
                tracing::warn!(error = %err, "ignoring invalid environment configuration");
                LoggerConfig::default()
            });
            Logger::started(&config)
        })
    }

    /// 已初始化的实例
    pub fn get() -> Option<&'static Logger> {
        INSTANCE.get()
    }

    fn started(config: &LoggerConfig) -> Self {
        let logger = Logger::new(config);
        if let Err(err) = logger.log(&[Value::from("Logger::instance_created > Logger started.")]) {
            tracing::warn!(error = %err, "failed to write startup record");
        }
        logger
    }

    /// info 级别
    pub fn log(&self, args: &[Value]) -> Result<Option<String>> {
        self.dispatch(Level::Info, args)
    }

    /// debug 级别：总是写入文件，只有开启 debug 时才透传控制台
    pub fn log_debug(&self, args: &[Value]) -> Result<Option<String>> {
        self.dispatch(Level::Debug, args)
    }

    pub fn log_warning(&self, args: &[Value]) -> Result<Option<String>> {
        self.dispatch(Level::Warning, args)
    }

    /// error 级别：可抛出值不进入消息体，而是各写一条 traceback 记录
    pub fn log_error(&self, args: &[Value]) -> Result<Option<String>> {
        self.dispatch(Level::Error, args)
    }

    /// 适配层入口：显式给出来源标签
    pub fn console(&self, tag: ConsoleTag, args: &[Value]) -> Result<Option<String>> {
        let level = match tag {
            ConsoleTag::Log | ConsoleTag::Info => Level::Info,
            ConsoleTag::Debug => Level::Debug,
            ConsoleTag::Error | ConsoleTag::Trace => Level::Error,
        };
        self.process(level, Some(tag), args)
    }

    fn dispatch(&self, level: Level, args: &[Value]) -> Result<Option<String>> {
        match args.split_first() {
            Some((Value::Str(first), rest)) => match ConsoleTag::from_name(first) {
                Some(tag) => self.process(level, Some(tag), rest),
                None => self.process(level, None, args),
            },
            _ => self.process(level, None, args),
        }
    }

    fn process(
        &self,
        level: Level,
        tag: Option<ConsoleTag>,
        args: &[Value],
    ) -> Result<Option<String>> {
        let mut throwables: Vec<Arc<dyn Throwable>> = Vec::new();
        let mut parts = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Value::Error(error) if level == Level::Error => throwables.push(Arc::clone(error)),
                other => parts.push(to_text(other)),
            }
        }
        let mut body = parts.join(" ");
        if body.is_empty() {
            if let Some(first) = throwables.first() {
                body = first.message();
            }
        }

        // 调试关闭时 debug 记录的标签作废，按无标签记录落盘
        let tag = tag.filter(|_| level != Level::Debug || self.is_debug());

        // 监听器触发的调用：带标签的只透传，不落盘
        if let Some(tag) = tag.filter(|_| self.bus.is_reentrant()) {
            self.forward(tag, &body);
            return Ok(Some(body));
        }

        let (delta, wall) = self.tick();
        let record = LogRecord::new(wall, level, body)
            .with_tag(tag)
            .with_delta(delta);
        let line = record.format();
        self.persist(&record.file_name(), &line)?;

        for error in &throwables {
            let expanded = serialize(&Value::Error(Arc::clone(error))).to_string();
            let traceback = LogRecord::new(wall, Level::Traceback, expanded);
            self.persist(&traceback.file_name(), &traceback.format())?;
        }

        match tag {
            Some(tag) => {
                self.bus.emit(EventKind::ConsoleLog, &[tag.as_str(), &line]);
                self.forward(tag, &line);
                Ok(Some(line))
            }
            None => Ok(None),
        }
    }

    fn tick(&self) -> (u128, NaiveDateTime) {
        self.clock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tick()
    }

    /// 追加一行到 `<directory>/<file_name>` 并发出 `filelog`
    fn persist(&self, file_name: &str, line: &str) -> Result<PathBuf> {
        let path = append_line(&self.log_directory(), file_name, line)?;
        let shown = path.display().to_string();
        self.bus.emit(EventKind::FileLog, &[&shown, line]);
        Ok(path)
    }

    fn forward(&self, tag: ConsoleTag, text: &str) {
        let console = self.console.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(sink) = console.as_ref() {
            sink.write(tag, text);
        }
    }

    pub fn set_debug(&self, debug: bool) {
        self.debug.store(debug, Ordering::Relaxed);
    }

    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    pub fn set_log_directory(&self, directory: impl Into<PathBuf>) {
        *self.directory.write().unwrap_or_else(PoisonError::into_inner) = directory.into();
    }

    pub fn log_directory(&self) -> PathBuf {
        self.directory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 新建 [`EnrichedError`] 时使用的栈帧上限
    pub fn stack_cap(&self) -> usize {
        self.stack_cap
    }

    /// 按配置的栈帧上限构造错误
    pub fn error(
        &self,
        name: impl Into<String>,
        message: impl Into<crate::Message>,
    ) -> EnrichedError {
        EnrichedError::with_stack_cap(name, message, self.stack_cap)
    }

    pub fn set_console_sink(&self, sink: impl ConsoleSink + 'static) {
        *self.console.write().unwrap_or_else(PoisonError::into_inner) = Some(Box::new(sink));
    }

    pub fn clear_console_sink(&self) {
        *self.console.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn on(&self, event: impl AsRef<str>, listener: Listener) {
        self.bus.on(event, listener);
    }

    pub fn off(&self, event: impl AsRef<str>, listener: &Listener) -> bool {
        self.bus.off(event, listener)
    }

    /// 环境、内存与已运行时间
    pub fn get_data(&self) -> RuntimeData {
        RuntimeData::collect(self.started)
    }

    /// 自启动以来的秒数（三位小数）
    pub fn execution_time(&self) -> f64 {
        runtime::elapsed_seconds(self.started)
    }

    /// 进程正常结束时写入收尾记录，末尾留一个空行
    pub fn shutdown(&self, code: Option<i32>) -> Result<()> {
        if self.is_debug() {
            let summary = EnvInfo::collect().summary();
            self.log(&[Value::from(format!("ENV::information > '{summary}'."))])?;
        }
        self.log(&[Value::from(format!(
            "Logger::script_exit > {:.3}s.",
            self.execution_time()
        ))])?;
        let closing = match code {
            Some(code) => format!("Logger::script_exit > Script execution finished with code: {code}.\n"),
            None => "Logger::script_exit > Script execution finished.\n".to_string(),
        };
        self.log(&[Value::from(closing)])?;
        Ok(())
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("debug", &self.is_debug())
            .field("directory", &self.log_directory())
            .field("stack_cap", &self.stack_cap)
            .field("bus", &self.bus)
            .finish()
    }
}

/// 创建目录（如不存在）并追加一行
fn append_line(directory: &Path, file_name: &str, line: &str) -> Result<PathBuf> {
    fs::create_dir_all(directory)?;
    let path = directory.join(file_name);
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    writeln!(file, "{line}")?;
    Ok(path)
}
