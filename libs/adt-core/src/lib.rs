//! Module sequencing and workflow orchestration core for the AsciiDoc-for-DITA toolkit.
//!
//! This crate implements the dependency-resolving scheduler (see
//! [`sequencer`]) and the persistent workflow engine (see [`workflow`]) that
//! drive the toolkit's content-processing modules. The modules themselves,
//! the CLI's argument parsing, and file I/O utilities live outside this
//! crate; it consumes them only through [`contract::Module`].

pub mod config;
pub mod contract;
pub mod error;
pub mod paths;
pub mod progress;
pub mod registry;
pub mod sequencer;
pub mod workflow;

pub use config::{CliOverrides, DevConfig, ModuleDeclaration, UserConfig};
pub use contract::{ExecutionContext, ExecutionResult, Module, ReleaseStatus};
pub use error::{CoreError, CoreResult};
pub use progress::{progress, ProgressReport};
pub use registry::{ModuleRegistry, Registrator};
pub use sequencer::{ModuleResolution, ModuleState, Sequencer, SequencingResult};
pub use workflow::{WorkflowEngine, WorkflowState, WorkflowStatus, WorkflowStore};
