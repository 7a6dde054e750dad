//! Structured error taxonomy for the core.
//!
//! Kinds follow the taxonomy in the project's design documents: configuration,
//! dependency, state, module, and user errors. Every variant carries enough
//! context (module name, path, cycle path) to satisfy the determinism and
//! naming properties asserted in tests.

use thiserror::Error;

/// All errors the core can surface.
#[derive(Debug, Error)]
pub enum CoreError {
    // --- Configuration errors ---
    #[error("developer config at {path} is malformed: {source}")]
    MalformedDevConfig {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("user config at {path} is malformed: {source}")]
    MalformedUserConfig {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("developer config is missing required field `{field}`")]
    MissingDevConfigField { field: &'static str },

    #[error("duplicate module registration for `{name}`")]
    DuplicateModule { name: String },

    #[error("module `{name}` is not implemented by any registered provider")]
    UnknownModule { name: String },

    // --- Dependency errors ---
    #[error("module `{module}` depends on unknown module `{depends_on}`")]
    MissingDependency { module: String, depends_on: String },

    #[error("circular dependency detected: {}", path.join(" -> "))]
    CircularDependency { path: Vec<String> },

    #[error("module `{name}` demoted to FAILED because dependency `{depends_on}` is DISABLED")]
    DependencyDisabled { name: String, depends_on: String },

    // --- State errors ---
    #[error("workflow state at {path} could not be written: {source}")]
    StateWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("workflow state at {path} is corrupted and no valid backup was found")]
    StateCorruption { path: String },

    #[error("workflow state at {path} declares schema version {found}, newer than supported {supported}")]
    UnsupportedSchemaVersion {
        path: String,
        found: u32,
        supported: u32,
    },

    // --- Module errors ---
    #[error("module `{module}` failed to initialize: {message}")]
    ModuleInitFailed { module: String, message: String },

    #[error("module `{module}` failed during execution: {message}")]
    ModuleExecutionFailed { module: String, message: String },

    // --- User errors ---
    #[error("directory `{path}` does not exist or is not readable")]
    InvalidDirectory { path: String },

    #[error("directory `{path}` could not be resolved to an absolute path: {source}")]
    DirectoryResolution {
        path: String,
        #[source]
        source: crate::paths::HomeDirError,
    },

    #[error("workflow `{name}` was not found in the store")]
    UnknownWorkflow { name: String },

    #[error("workflow `{name}` already exists")]
    WorkflowAlreadyExists { name: String },

    #[error("destructive command requires explicit confirmation")]
    ConfirmationRequired,

    // --- Planning / wrapping ---
    #[error("workflow planning failed: {0}")]
    WorkflowPlanning(String),

    #[error("step for module `{module}` failed: {message}")]
    WorkflowExecution { module: String, message: String },
}

/// Convenience alias used throughout the core.
pub type CoreResult<T> = Result<T, CoreError>;
