//! The capability set every processing module exposes to the core.
//!
//! This is deliberately a trait, not a base class: any type that implements
//! the methods below is a module. The trait is object-safe so modules can be
//! stored behind `dyn Module` in the registry.

use std::collections::BTreeMap;

use serde_json::Value;

/// Whether a module is generally available or still gated behind an
/// opt-in environment signal (see [`crate::sequencer`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseStatus {
    Ga,
    Preview,
}

impl Default for ReleaseStatus {
    fn default() -> Self {
        Self::Ga
    }
}

/// Outcome of a module's `initialize` call.
pub type InitResult = Result<(), String>;

/// Outcome status of a single `execute` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Success,
    Error,
    Skipped,
}

/// The result a module hands back from `execute`.
///
/// Carries outcome counts plus an optional free-form `data` payload other
/// modules may read from the shared [`ExecutionContext`] on later steps.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    pub message: String,
    pub files_processed: u64,
    pub files_modified: u64,
    pub execution_time: f64,
    pub error_message: Option<String>,
    pub data: Option<Value>,
}

impl ExecutionResult {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Success,
            message: message.into(),
            files_processed: 0,
            files_modified: 0,
            execution_time: 0.0,
            error_message: None,
            data: None,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status: ExecutionStatus::Error,
            message: message.clone(),
            files_processed: 0,
            files_modified: 0,
            execution_time: 0.0,
            error_message: Some(message),
            data: None,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

/// Per-step context handed to a module's `execute`.
///
/// Modules may read but must not mutate keys they did not write; the engine
/// does not enforce this at the type level, it is a contract convention
/// mirrored from the source toolkit's context map.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    pub directory: String,
    pub files: Vec<String>,
    pub recursive: bool,
    /// Results exposed by earlier modules in this workflow, keyed by module name.
    pub prior_results: BTreeMap<String, Value>,
}

/// The polymorphic capability set every processing module exposes.
///
/// Implementations must be `Send + Sync` so they can live in the registry's
/// shared map across the single-threaded step loop without extra wrapping.
pub trait Module: Send + Sync {
    /// Stable, unique name. Used as the node identity in the dependency graph.
    fn name(&self) -> &str;

    /// Semantic version string.
    fn version(&self) -> &str;

    /// Module names that must be initialized before this one.
    fn dependencies(&self) -> &[String];

    /// GA by default; override to `Preview` to require opt-in gating.
    fn release_status(&self) -> ReleaseStatus {
        ReleaseStatus::Ga
    }

    /// Idempotent setup. Receives the effective merged config for this module.
    ///
    /// # Errors
    ///
    /// Returns an error message if the module cannot initialize with the given config.
    fn initialize(&self, config: &BTreeMap<String, Value>) -> InitResult;

    /// Run one step of work over `context`, returning outcome counts.
    ///
    /// Implementations should not panic; any panic that does escape is caught
    /// at the engine boundary and converted into a failure result.
    fn execute(&self, context: &ExecutionContext) -> ExecutionResult;

    /// Release any resources. Must tolerate being called after a failed
    /// `initialize`, including being called without a prior `initialize` at all.
    fn cleanup(&self) {}
}
