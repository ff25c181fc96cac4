// Audit helpers that emit structured facts across Lunyard operations.
//
// Side-effects:
// - Emits JSON facts via `FactsEmitter` for `preflight`, `lock.acquire`, `transition.step`,
//   `callback`, `cleanup`, `postflight`, `inspect`, `rebind` and `edit`.
// - Ensures a minimal envelope is present on every fact: `schema_version`, `ts`, `run_id`,
//   `partition`, `stage`, `decision`.
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::errors::{exit_code_for, id_str, ErrorId};
use crate::logging::{now_iso, FactsEmitter};

pub(crate) const SCHEMA_VERSION: i64 = 1;

const SUBSYSTEM: &str = "lunyard";

pub(crate) fn new_run_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) struct AuditCtx<'a> {
    pub facts: &'a dyn FactsEmitter,
    pub run_id: String,
    pub partition: Option<String>,
}

impl<'a> AuditCtx<'a> {
    pub(crate) fn new(facts: &'a dyn FactsEmitter, partition: Option<&str>) -> Self {
        Self {
            facts,
            run_id: new_run_id(),
            partition: partition.map(str::to_string),
        }
    }
}

/// Stage for typed audit emission.
#[derive(Clone, Copy, Debug)]
pub enum Stage {
    Preflight,
    LockAcquire,
    TransitionStep,
    Callback,
    Cleanup,
    Postflight,
    Inspect,
    Rebind,
    Edit,
}

impl Stage {
    const fn as_event(self) -> &'static str {
        match self {
            Stage::Preflight => "preflight",
            Stage::LockAcquire => "lock.acquire",
            Stage::TransitionStep => "transition.step",
            Stage::Callback => "callback",
            Stage::Cleanup => "cleanup",
            Stage::Postflight => "postflight",
            Stage::Inspect => "inspect",
            Stage::Rebind => "rebind",
            Stage::Edit => "edit",
        }
    }
}

/// Decision severity for audit events.
#[derive(Clone, Copy, Debug)]
pub enum Decision {
    Success,
    Failure,
    Warn,
}

impl Decision {
    const fn as_str(self) -> &'static str {
        match self {
            Decision::Success => "success",
            Decision::Failure => "failure",
            Decision::Warn => "warn",
        }
    }
}

/// Builder facade over audit emission with a centralized envelope.
pub struct StageLogger<'a> {
    ctx: &'a AuditCtx<'a>,
}

impl<'a> StageLogger<'a> {
    pub(crate) fn new(ctx: &'a AuditCtx<'a>) -> Self {
        Self { ctx }
    }

    pub fn preflight(&'a self) -> EventBuilder<'a> { EventBuilder::new(self.ctx, Stage::Preflight) }
    pub fn lock_acquire(&'a self) -> EventBuilder<'a> { EventBuilder::new(self.ctx, Stage::LockAcquire) }
    pub fn step(&'a self) -> EventBuilder<'a> { EventBuilder::new(self.ctx, Stage::TransitionStep) }
    pub fn callback(&'a self) -> EventBuilder<'a> { EventBuilder::new(self.ctx, Stage::Callback) }
    pub fn cleanup(&'a self) -> EventBuilder<'a> { EventBuilder::new(self.ctx, Stage::Cleanup) }
    pub fn postflight(&'a self) -> EventBuilder<'a> { EventBuilder::new(self.ctx, Stage::Postflight) }
    pub fn inspect(&'a self) -> EventBuilder<'a> { EventBuilder::new(self.ctx, Stage::Inspect) }
    pub fn rebind(&'a self) -> EventBuilder<'a> { EventBuilder::new(self.ctx, Stage::Rebind) }
    pub fn edit(&'a self) -> EventBuilder<'a> { EventBuilder::new(self.ctx, Stage::Edit) }
}

pub struct EventBuilder<'a> {
    ctx: &'a AuditCtx<'a>,
    stage: Stage,
    fields: serde_json::Map<String, Value>,
}

impl<'a> EventBuilder<'a> {
    fn new(ctx: &'a AuditCtx<'a>, stage: Stage) -> Self {
        let mut fields = serde_json::Map::new();
        fields.insert("stage".to_string(), json!(stage.as_event()));
        Self { ctx, stage, fields }
    }

    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn merge(mut self, extra: Value) -> Self {
        if let Some(obj) = extra.as_object() {
            for (k, v) in obj {
                self.fields.insert(k.clone(), v.clone());
            }
        }
        self
    }

    pub fn error_id(mut self, id: ErrorId) -> Self {
        self.fields.insert("error_id".into(), json!(id_str(id)));
        self.fields.insert("exit_code".into(), json!(exit_code_for(id)));
        self
    }

    pub fn emit(self, decision: Decision) {
        let mut fields = self.fields;
        fields.entry("schema_version").or_insert(json!(SCHEMA_VERSION));
        fields.entry("ts").or_insert_with(|| json!(now_iso()));
        fields.entry("run_id").or_insert(json!(self.ctx.run_id));
        fields
            .entry("partition")
            .or_insert(json!(self.ctx.partition));
        fields.entry("decision").or_insert(json!(decision.as_str()));
        self.ctx.facts.emit(
            SUBSYSTEM,
            self.stage.as_event(),
            decision.as_str(),
            Value::Object(fields),
        );
    }

    pub fn emit_success(self) { self.emit(Decision::Success) }
    pub fn emit_failure(self) { self.emit(Decision::Failure) }
    pub fn emit_warn(self) { self.emit(Decision::Warn) }
}
