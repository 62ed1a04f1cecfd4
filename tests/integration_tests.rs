//! 集成测试 - 端到端日志与错误增强

mod common;

use common::{read_today, self_referencing_object, strip_timestamp};
use debuglog::catalog;
use debuglog::stacktrace::{self, ANONYMOUS};
use debuglog::{
    listener, serialize, ConsoleSink, ConsoleTag, EnrichedError, Error, EventKind, FormatOptions,
    Logger, LoggerConfig, StackFrame, Value,
};
use serde_json::json;
use std::sync::{Arc, Mutex};

const RAW: &str = "Error\n    at foo (/tmp/a.js:10:5)\n    at bar (/tmp/b.js:2:1)";

#[test]
fn test_serialize_cycle() {
    assert_eq!(
        serialize(&self_referencing_object()),
        json!({ "a": 1, "self": "[Circular]" })
    );
}

#[test]
fn test_serialize_nested_error_context() {
    let context = self_referencing_object();
    let error = EnrichedError::with_raw_stack("Boom", "it broke", RAW, 15).with_data(
        Value::object_from([("request", context.clone())]),
    );
    context.insert("error", Value::from(error));

    let json = serialize(&context);
    assert_eq!(json["self"], "[Circular]");
    assert_eq!(json["error"]["name"], "Boom");
    assert_eq!(json["error"]["request"], "[Circular]");
}

#[test]
fn test_parse_scenario() {
    let frames = stacktrace::parse(RAW);
    assert_eq!(
        frames,
        vec![
            StackFrame::location("foo", "/tmp/a.js", 10, 5),
            StackFrame::location("bar", "/tmp/b.js", 2, 1),
        ]
    );
}

#[test]
fn test_parse_mixed_grammars() {
    let text = "TypeError: x is not a function\n    at Object.<anonymous> (/srv/app.js:3:9)\n    at /srv/lib.js:7:2\n    at native code";
    let frames = stacktrace::parse(text);
    assert_eq!(frames[0], StackFrame::location("Object.<anonymous>", "/srv/app.js", 3, 9));
    assert_eq!(frames[1], StackFrame::location(ANONYMOUS, "/srv/lib.js", 7, 2));
    assert_eq!(frames[2], StackFrame::raw("at native code"));
}

#[test]
fn test_format_idempotent() {
    let options = FormatOptions::default().with_indent(2).with_delimiter(";");
    let once = stacktrace::format_raw(RAW, &options);
    let twice = stacktrace::format_raw(RAW, &options);
    assert_eq!(once, twice);
    assert_eq!(once, "  at foo (/tmp/a.js:10:5);  at bar (/tmp/b.js:2:1)");
}

#[test]
fn test_catalog_fallback_never_fails() {
    let entry = catalog::lookup("NOT-A-REAL-CODE");
    assert_eq!(entry.name, "UnknownError");
    assert_eq!(entry.code, catalog::FALLBACK_CODE);
}

#[test]
fn test_from_error_code_unknown() {
    let error = EnrichedError::from_error_code("ZZZZ-UNKNOWN", false).unwrap();
    assert_eq!(error.name(), "UnknownError");
    assert_eq!(error.render_message(&[]), "Unknown error");
    assert_eq!(error.get("code").and_then(Value::as_str), Some("ZZZZ-UNKNOWN"));
}

#[test]
fn test_json_round_trip() {
    let original = EnrichedError::new("Boom", "it broke");
    let rebuilt = EnrichedError::from_json(&original.to_json(), false).unwrap();
    assert_eq!(
        rebuilt.get("name").and_then(Value::as_str),
        original.get("name").and_then(Value::as_str)
    );

    let mut custom = EnrichedError::new("Boom", "it broke");
    custom.add_data(Value::object_from([("name", "custom")]));
    let rebuilt = EnrichedError::from_json(&custom.to_json(), false).unwrap();
    assert_eq!(rebuilt.get("name").and_then(Value::as_str), Some("custom"));
    assert_eq!(rebuilt.get("name-original").and_then(Value::as_str), Some("custom"));
}

#[test]
fn test_from_json_rejects_malformed() {
    assert!(matches!(
        EnrichedError::from_json("not json", false),
        Err(Error::Json(_))
    ));
}

#[derive(Default)]
struct Recorder(Mutex<Vec<(ConsoleTag, String)>>);

impl ConsoleSink for Recorder {
    fn write(&self, tag: ConsoleTag, text: &str) {
        self.0.lock().unwrap().push((tag, text.to_string()));
    }
}

// 单例在整个测试进程内只能初始化一次，相关断言集中在这里
#[test]
fn test_singleton_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let logger = debuglog::init(LoggerConfig::new().with_log_directory(dir.path())).unwrap();
    let console = Arc::new(Recorder::default());
    logger.set_console_sink(Arc::clone(&console));

    // 重复初始化
    match Logger::init(LoggerConfig::default()) {
        Err(Error::Raised(error)) => assert_eq!(error.name(), "SingletonError"),
        other => panic!("Expected SingletonError, got {:?}", other.map(|_| ())),
    }
    assert!(std::ptr::eq(Logger::global(), logger));

    let lines = read_today(dir.path());
    assert_eq!(
        strip_timestamp(&lines[0]),
        "info: Logger::instance_created > Logger started. +0ms"
    );

    // 事件
    let files = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&files);
    let on_file = listener(move |args: &[&str]| {
        sink.lock().unwrap().push(args[1].to_string());
    });
    logger.on(EventKind::FileLog, Arc::clone(&on_file));

    // 调试门控
    logger
        .log_debug(&[Value::from("debug"), Value::from("secret")])
        .unwrap();
    assert!(console.0.lock().unwrap().is_empty());
    logger.set_debug(true);
    logger
        .log_debug(&[Value::from("debug"), Value::from("secret")])
        .unwrap();
    assert_eq!(console.0.lock().unwrap().len(), 1);
    logger.set_debug(false);

    // 带标签的错误
    let error = EnrichedError::with_raw_stack("Boom", "it broke", RAW, 15);
    let echoed = logger
        .log_error(&[Value::from("error"), Value::from(error)])
        .unwrap()
        .unwrap();
    assert!(strip_timestamp(&echoed).starts_with("error: 'it broke' +"));
    assert_eq!(console.0.lock().unwrap().len(), 2);

    assert!(logger.off(EventKind::FileLog, &on_file));
    logger.log(&[Value::from("after off")]).unwrap();

    let written = files.lock().unwrap().clone();
    // debug x2, error + traceback
    assert_eq!(written.len(), 4);
    assert_eq!(written[2], echoed);
    assert!(strip_timestamp(&written[3]).starts_with("traceback: {"));

    let lines = read_today(dir.path());
    assert_eq!(lines.len(), 6);
    assert!(strip_timestamp(&lines[5]).starts_with("info: after off +"));

    // 运行时数据
    let first = logger.get_data();
    let second = logger.get_data();
    assert!(second.execution_time_passed >= first.execution_time_passed);
    assert_eq!(first.env.pid, std::process::id());
}
