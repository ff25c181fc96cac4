use log::Level;
use serde_json::Value;

pub trait FactsEmitter: Send + Sync {
    fn emit(&self, subsystem: &str, event: &str, decision: &str, fields: Value);
}

pub trait AuditSink: Send + Sync {
    fn log(&self, level: Level, msg: &str);
}

/// No-op sink for tests and callers that do not collect facts.
#[derive(Default, Clone, Copy, Debug)]
pub struct JsonlSink;

impl FactsEmitter for JsonlSink {
    fn emit(&self, _subsystem: &str, _event: &str, _decision: &str, _fields: Value) {}
}

impl AuditSink for JsonlSink {
    fn log(&self, _level: Level, _msg: &str) {}
}

/// Forwards facts and audit lines to the `log` facade.
///
/// Facts land on the `lunyard::facts` target as one JSON object per line, with
/// failures at `Warn` so they survive a default `info` filter.
#[derive(Default, Clone, Copy, Debug)]
pub struct LogFacts;

impl FactsEmitter for LogFacts {
    fn emit(&self, subsystem: &str, event: &str, decision: &str, fields: Value) {
        let level = if decision == "failure" {
            Level::Warn
        } else {
            Level::Info
        };
        log::log!(target: "lunyard::facts", level, "{subsystem}.{event} {fields}");
    }
}

impl AuditSink for LogFacts {
    fn log(&self, level: Level, msg: &str) {
        log::log!(target: "lunyard::audit", level, "{msg}");
    }
}
