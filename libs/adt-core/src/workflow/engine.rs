//! The orchestrator: creates, resumes, steps, and cleans up workflows,
//! driving one module at a time through the sequencer's planned order (C7).

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::path::Path;

use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

use crate::config::{CliOverrides, DevConfig, UserConfig};
use crate::contract::{ExecutionContext, ExecutionResult};
use crate::error::{CoreError, CoreResult};
use crate::registry::ModuleRegistry;
use crate::sequencer::Sequencer;
use crate::workflow::state::{WorkflowState, WorkflowStatus};
use crate::workflow::store::WorkflowStore;

const DIRECTORY_CONFIG_MODULE: &str = "DirectoryConfig";
const CANDIDATE_EXTENSIONS: &[&str] = &["adoc", "asciidoc"];

/// Orchestrates the module list the sequencer plans, one step at a time.
///
/// A single engine instance corresponds to one process's view of the config
/// layers (developer config, user config, CLI overrides); those are fixed
/// for the engine's lifetime, matching how the CLI loads them once at
/// startup and reuses them across `journey` subcommands.
pub struct WorkflowEngine {
    registry: ModuleRegistry,
    store: WorkflowStore,
    dev_config: DevConfig,
    user_config: UserConfig,
    cli_overrides: CliOverrides,
    /// Modules already initialized this process run, keyed by (workflow, module).
    initialized: Mutex<std::collections::BTreeSet<(String, String)>>,
    /// Last successful result payload per (workflow, module), used to seed
    /// later steps' context. Not persisted; lost across process restart,
    /// which mirrors the data model not carrying `data` into on-disk state.
    results_cache: Mutex<BTreeMap<(String, String), Value>>,
}

impl WorkflowEngine {
    #[must_use]
    pub fn new(
        registry: ModuleRegistry,
        store: WorkflowStore,
        dev_config: DevConfig,
        user_config: UserConfig,
        cli_overrides: CliOverrides,
    ) -> Self {
        Self {
            registry,
            store,
            dev_config,
            user_config,
            cli_overrides,
            initialized: Mutex::new(std::collections::BTreeSet::new()),
            results_cache: Mutex::new(BTreeMap::new()),
        }
    }

    /// The underlying state store, for hosts that need to enumerate
    /// workflows without going through a specific workflow operation.
    #[must_use]
    pub fn store(&self) -> &WorkflowStore {
        &self.store
    }

    fn sequencing(&self) -> crate::sequencer::SequencingResult {
        Sequencer::new(&self.registry, &self.dev_config).resolve(&self.user_config, &self.cli_overrides)
    }

    /// Create a new workflow over `directory`, planning its module list via
    /// the sequencer and persisting the initial state.
    ///
    /// `directory` is resolved to an absolute path before being stored, so a
    /// resumed workflow discovers the same tree regardless of the resuming
    /// process's current working directory.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::WorkflowAlreadyExists`], [`CoreError::DirectoryResolution`],
    /// [`CoreError::InvalidDirectory`], or [`CoreError::WorkflowPlanning`] if sequencing failed.
    pub fn start_workflow(&self, name: &str, directory: &str) -> CoreResult<WorkflowState> {
        if self.store.exists(name) {
            return Err(CoreError::WorkflowAlreadyExists {
                name: name.to_string(),
            });
        }

        let absolute = crate::paths::normalize_path(directory).map_err(|source| {
            CoreError::DirectoryResolution {
                path: directory.to_string(),
                source,
            }
        })?;
        if !absolute.is_dir() {
            return Err(CoreError::InvalidDirectory {
                path: absolute.display().to_string(),
            });
        }

        let sequencing = self.sequencing();
        if !sequencing.is_ok() {
            return Err(CoreError::WorkflowPlanning(sequencing.errors.join("; ")));
        }

        let enabled = sequencing.enabled_order();
        let directory = absolute.display().to_string();
        let mut state = WorkflowState::new(name, &directory, &enabled);
        state.files_discovered = discover_candidate_files(&absolute);

        self.store.save(&state)?;
        tracing::info!(workflow = name, modules = enabled.len(), "workflow started");
        Ok(state)
    }

    /// Load a previously created workflow. The persisted module list and
    /// order are authoritative and are not re-planned, to preserve
    /// reproducibility across a possibly changed developer config.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownWorkflow`] if no such workflow exists.
    pub fn resume_workflow(&self, name: &str) -> CoreResult<WorkflowState> {
        self.store.load(name)
    }

    /// Run exactly one step: initialize (if needed) and execute the next
    /// pending or failed module, persisting the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ModuleInitFailed`] or [`CoreError::WorkflowExecution`]
    /// if the module's initialization or execution fails; the workflow is
    /// left in a retryable `failed` state for that module either way.
    pub fn execute_next(&self, workflow: &mut WorkflowState) -> CoreResult<ExecutionResult> {
        let Some(module_name) = workflow.next_module().map(str::to_string) else {
            workflow.status = WorkflowStatus::Completed;
            self.store.save(workflow)?;
            return Ok(ExecutionResult::success("workflow already complete"));
        };

        let step_id = Uuid::new_v4();
        let _span = tracing::info_span!("execute_next", workflow = %workflow.name, module = %module_name, step = %step_id).entered();

        let module = match self.registry.get(&module_name) {
            Some(module) => module,
            None => {
                let message = format!("module `{module_name}` is not registered");
                workflow.mark_failed(&module_name, message.clone());
                self.store.save(workflow)?;
                return Err(CoreError::UnknownModule { name: module_name });
            }
        };

        let sequencing = self.sequencing();
        let effective_config = sequencing
            .resolutions
            .iter()
            .find(|r| r.name == module_name)
            .map(|r| r.effective_config.clone())
            .unwrap_or_default();

        let init_key = (workflow.name.clone(), module_name.clone());
        let needs_init = !self.initialized.lock().contains(&init_key);
        if needs_init {
            if let Err(message) = module.initialize(&effective_config) {
                workflow.mark_failed(&module_name, message.clone());
                self.store.save(workflow)?;
                return Err(CoreError::ModuleInitFailed {
                    module: module_name,
                    message,
                });
            }
            self.initialized.lock().insert(init_key);
        }

        let context = self.build_context(workflow, &module_name);

        workflow.mark_started(&module_name);
        self.store.save(workflow)?;

        let result = match std::panic::catch_unwind(AssertUnwindSafe(|| module.execute(&context))) {
            Ok(result) => result,
            Err(panic) => ExecutionResult::error(panic_message(&panic)),
        };

        if module_name == DIRECTORY_CONFIG_MODULE && result.is_success() {
            self.apply_directory_config_outputs(workflow, &result);
        }

        if let Some(data) = &result.data {
            self.results_cache
                .lock()
                .insert((workflow.name.clone(), module_name.clone()), data.clone());
        }

        if result.is_success() {
            workflow.mark_completed(&module_name, &result);
            self.store.save(workflow)?;
            tracing::debug!(module = %module_name, "module completed");
            Ok(result)
        } else {
            let message = result
                .error_message
                .clone()
                .unwrap_or_else(|| result.message.clone());
            workflow.mark_failed(&module_name, message.clone());
            self.store.save(workflow)?;
            tracing::warn!(module = %module_name, retry_count = workflow.module(&module_name).map_or(0, |m| m.retry_count), "module failed");
            Err(CoreError::WorkflowExecution {
                module: module_name,
                message,
            })
        }
    }

    fn apply_directory_config_outputs(&self, workflow: &mut WorkflowState, result: &ExecutionResult) {
        let Some(data) = &result.data else {
            return;
        };
        if let Some(files) = data.get("files_discovered").and_then(Value::as_array) {
            workflow.files_discovered = files
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
        }
        if let Some(dc) = data.get("directory_config") {
            workflow.directory_config = Some(dc.clone());
        }
    }

    fn build_context(&self, workflow: &WorkflowState, module_name: &str) -> ExecutionContext {
        let cache = self.results_cache.lock();
        let prior_results: BTreeMap<String, Value> = workflow
            .modules
            .iter()
            .filter(|(name, state)| {
                name != module_name && state.status == crate::workflow::state::ModuleStatus::Completed
            })
            .filter_map(|(name, _)| {
                cache
                    .get(&(workflow.name.clone(), name.clone()))
                    .map(|v| (name.clone(), v.clone()))
            })
            .collect();

        ExecutionContext {
            directory: workflow.directory.clone(),
            files: workflow.files_discovered.clone(),
            recursive: true,
            prior_results,
        }
    }

    /// Remove a workflow's persisted state. The caller must have already
    /// obtained explicit confirmation for destructive cleanup; the engine
    /// never deletes without `confirmed = true`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfirmationRequired`] if `confirmed` is false.
    pub fn cleanup_workflow(&self, name: &str, confirmed: bool) -> CoreResult<()> {
        if !confirmed {
            return Err(CoreError::ConfirmationRequired);
        }
        self.store.cleanup(name)
    }

    /// Remove every completed workflow. Requires explicit confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfirmationRequired`] if `confirmed` is false.
    pub fn cleanup_completed(&self, confirmed: bool) -> CoreResult<Vec<String>> {
        if !confirmed {
            return Err(CoreError::ConfirmationRequired);
        }
        let mut removed = Vec::new();
        for name in self.store.list_names() {
            if let Ok(state) = self.store.load(&name) {
                if state.status == WorkflowStatus::Completed {
                    self.store.cleanup(&name)?;
                    removed.push(name);
                }
            }
        }
        Ok(removed)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "module panicked with a non-string payload".to_string()
    }
}

fn discover_candidate_files(directory: &Path) -> Vec<String> {
    walkdir::WalkDir::new(directory)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| CANDIDATE_EXTENSIONS.contains(&ext))
        })
        .map(|entry| entry.path().display().to_string())
        .collect()
}
