// Facade for the orchestrator; operations live in the submodules under src/api/.

use std::time::Duration;

use crate::adapters::{
    FileLockManager, GadgetModeIndicator, LinuxSystem, LockManager, ModeIndicator, SystemOps,
};
use crate::config::Config;
use crate::gadget::ConfigFs;
use crate::logging::{AuditSink, FactsEmitter};
use crate::types::{GadgetState, OpError, OperationResult, PresentMode, ProgressStatus, WriteWindow};

mod builder;
mod edit;
pub mod errors;
pub mod executor;
mod inspect;
mod lock;
mod progress;
mod quick_edit;
mod rebind;

pub use builder::ApiBuilder;
pub use executor::{run_with_timeout, ExecOutcome};
pub use quick_edit::QuickEditOptions;

/// Transient read-write access orchestrator for USB-gadget backed partitions.
///
/// One value owns the partition table and every collaborator. All transitions,
/// against any partition, are serialized through the lock manager.
pub struct Lunyard<E: FactsEmitter, A: AuditSink> {
    facts: E,
    audit: A,
    config: Config,
    configfs: ConfigFs,
    lock: Box<dyn LockManager>,
    system: Box<dyn SystemOps>,
    mode: Box<dyn ModeIndicator>,
}

impl<E: FactsEmitter, A: AuditSink> Lunyard<E, A> {
    /// Production wiring: file lock at `config.lock_path`, Linux system adapter and
    /// a mode indicator derived from the gadget binding.
    pub fn new(facts: E, audit: A, config: Config) -> Self {
        let lock = Box::new(FileLockManager::new(config.lock_path.clone()));
        let system = Box::new(LinuxSystem::from_config(&config));
        let mode = Box::new(GadgetModeIndicator::from_config(&config));
        Self {
            facts,
            audit,
            configfs: ConfigFs::new(&config.configfs_root),
            config,
            lock,
            system,
            mode,
        }
    }

    pub fn builder(facts: E, audit: A, config: Config) -> ApiBuilder<E, A> {
        ApiBuilder::new(facts, audit, config)
    }

    #[must_use]
    pub fn with_lock_manager(mut self, lock: Box<dyn LockManager>) -> Self {
        self.lock = lock;
        self
    }

    #[must_use]
    pub fn with_system(mut self, system: Box<dyn SystemOps>) -> Self {
        self.system = system;
        self
    }

    #[must_use]
    pub fn with_mode_indicator(mut self, mode: Box<dyn ModeIndicator>) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open a read-write window on `partition`, run `op` in it and restore read-only service.
    pub fn quick_edit<F>(&self, partition: &str, op: F, opts: QuickEditOptions) -> OperationResult
    where
        F: FnOnce(&WriteWindow) -> Result<String, OpError> + Send + 'static,
    {
        quick_edit::run(self, partition, op, opts)
    }

    /// Audit gadget and mount state, repairing LUN backings that can be repaired.
    pub fn check_and_recover_gadget_state(&self) -> GadgetState {
        inspect::run(self)
    }

    /// Force the host to re-enumerate the device.
    pub fn rebind(&self, delay: Duration) -> OperationResult {
        rebind::run(self, delay)
    }

    /// Cheap read-only poll of the transition lock.
    pub fn check_operation_in_progress(&self) -> ProgressStatus {
        progress::run(self)
    }

    /// Run `op` the way the current mode requires: through a quick-edit window when
    /// presenting, directly against the read-write mount when in edit mode.
    pub fn edit<F>(&self, partition: &str, op: F, opts: QuickEditOptions) -> OperationResult
    where
        F: FnOnce(&WriteWindow) -> Result<String, OpError> + Send + 'static,
    {
        edit::run(self, partition, op, opts)
    }

    pub fn current_mode(&self) -> PresentMode {
        self.mode.current_mode()
    }
}
