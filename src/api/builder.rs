use crate::adapters::{LockManager, ModeIndicator, SystemOps};
use crate::config::Config;
use crate::logging::{AuditSink, FactsEmitter};

/// Builder for constructing a Lunyard with ergonomic chaining.
/// Mirrors `Lunyard::new(...).with_*` but avoids duplication at call sites.
pub struct ApiBuilder<E: FactsEmitter, A: AuditSink> {
    facts: E,
    audit: A,
    config: Config,
    lock: Option<Box<dyn LockManager>>,
    system: Option<Box<dyn SystemOps>>,
    mode: Option<Box<dyn ModeIndicator>>,
}

impl<E: FactsEmitter, A: AuditSink> ApiBuilder<E, A> {
    pub fn new(facts: E, audit: A, config: Config) -> Self {
        Self {
            facts,
            audit,
            config,
            lock: None,
            system: None,
            mode: None,
        }
    }

    #[must_use]
    pub fn with_lock_manager(mut self, lock: Box<dyn LockManager>) -> Self {
        self.lock = Some(lock);
        self
    }

    #[must_use]
    pub fn with_system(mut self, system: Box<dyn SystemOps>) -> Self {
        self.system = Some(system);
        self
    }

    #[must_use]
    pub fn with_mode_indicator(mut self, mode: Box<dyn ModeIndicator>) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn build(self) -> super::Lunyard<E, A> {
        let mut api = super::Lunyard::new(self.facts, self.audit, self.config);
        if let Some(lock) = self.lock {
            api = api.with_lock_manager(lock);
        }
        if let Some(system) = self.system {
            api = api.with_system(system);
        }
        if let Some(mode) = self.mode {
            api = api.with_mode_indicator(mode);
        }
        api
    }
}
