//! Cross-component scenarios exercising the sequencer, state store, and
//! workflow engine together, mirroring the six concrete walkthroughs the
//! core's design documents call out.

use std::collections::BTreeMap;
use std::sync::Arc;

use adt_core::config::{CliOverrides, DevConfig, ModuleDeclaration, UserConfig};
use adt_core::contract::{ExecutionContext, ExecutionResult, ExecutionStatus, Module, ReleaseStatus};
use adt_core::registry::ModuleRegistry;
use adt_core::sequencer::Sequencer;
use adt_core::workflow::{WorkflowEngine, WorkflowState, WorkflowStatus, WorkflowStore};

struct ScriptedModule {
    name: &'static str,
    deps: Vec<String>,
    release_status: ReleaseStatus,
}

impl Module for ScriptedModule {
    fn name(&self) -> &str {
        self.name
    }
    fn version(&self) -> &str {
        "1.0.0"
    }
    fn dependencies(&self) -> &[String] {
        &self.deps
    }
    fn release_status(&self) -> ReleaseStatus {
        self.release_status
    }
    fn initialize(&self, _config: &BTreeMap<String, serde_json::Value>) -> Result<(), String> {
        Ok(())
    }
    fn execute(&self, _context: &ExecutionContext) -> ExecutionResult {
        ExecutionResult {
            status: ExecutionStatus::Success,
            message: format!("{} ran", self.name),
            files_processed: 1,
            files_modified: 0,
            execution_time: 0.01,
            error_message: None,
            data: None,
        }
    }
}

fn declare(name: &str, required: bool) -> ModuleDeclaration {
    ModuleDeclaration {
        name: name.to_string(),
        required,
        additional_dependencies: Vec::new(),
        config: BTreeMap::new(),
    }
}

#[test]
fn linear_chain_sequences_in_dependency_order() {
    let registry = ModuleRegistry::new();
    registry
        .register(Arc::new(ScriptedModule {
            name: "A",
            deps: vec![],
            release_status: ReleaseStatus::Ga,
        }))
        .unwrap();
    registry
        .register(Arc::new(ScriptedModule {
            name: "B",
            deps: vec!["A".to_string()],
            release_status: ReleaseStatus::Ga,
        }))
        .unwrap();
    registry
        .register(Arc::new(ScriptedModule {
            name: "C",
            deps: vec!["B".to_string()],
            release_status: ReleaseStatus::Ga,
        }))
        .unwrap();

    let dev_config = DevConfig {
        version: "1".to_string(),
        modules: vec![declare("A", true), declare("B", true), declare("C", true)],
        global_config: BTreeMap::new(),
    };

    let sequencer = Sequencer::new(&registry, &dev_config);
    let result = sequencer.resolve(&UserConfig::default(), &CliOverrides::default());

    assert!(result.is_ok());
    assert_eq!(result.enabled_order(), vec!["A", "B", "C"]);
    let orders: Vec<i64> = result.resolutions.iter().map(|r| r.init_order).collect();
    assert_eq!(orders, vec![0, 1, 2]);
}

#[test]
fn cycle_blocks_sequencing_with_no_partial_plan() {
    let registry = ModuleRegistry::new();
    registry
        .register(Arc::new(ScriptedModule {
            name: "A",
            deps: vec!["B".to_string()],
            release_status: ReleaseStatus::Ga,
        }))
        .unwrap();
    registry
        .register(Arc::new(ScriptedModule {
            name: "B",
            deps: vec!["A".to_string()],
            release_status: ReleaseStatus::Ga,
        }))
        .unwrap();

    let dev_config = DevConfig {
        version: "1".to_string(),
        modules: vec![declare("A", true), declare("B", true)],
        global_config: BTreeMap::new(),
    };

    let sequencer = Sequencer::new(&registry, &dev_config);
    let result = sequencer.resolve(&UserConfig::default(), &CliOverrides::default());

    assert!(result.resolutions.is_empty());
    assert!(!result.errors.is_empty());
    assert!(result.errors[0].contains('A'));
    assert!(result.errors[0].contains('B'));
}

#[test]
fn missing_dependency_names_the_offender_and_dependency() {
    let registry = ModuleRegistry::new();
    registry
        .register(Arc::new(ScriptedModule {
            name: "A",
            deps: vec!["Z".to_string()],
            release_status: ReleaseStatus::Ga,
        }))
        .unwrap();

    let dev_config = DevConfig {
        version: "1".to_string(),
        modules: vec![declare("A", true)],
        global_config: BTreeMap::new(),
    };

    let sequencer = Sequencer::new(&registry, &dev_config);
    let result = sequencer.resolve(&UserConfig::default(), &CliOverrides::default());

    assert!(result.resolutions.is_empty());
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains('A') && result.errors[0].contains('Z'));
}

#[test]
fn interrupted_workflow_resumes_at_the_next_pending_module() {
    let registry = ModuleRegistry::new();
    registry
        .register(Arc::new(ScriptedModule {
            name: "A",
            deps: vec![],
            release_status: ReleaseStatus::Ga,
        }))
        .unwrap();
    registry
        .register(Arc::new(ScriptedModule {
            name: "B",
            deps: vec!["A".to_string()],
            release_status: ReleaseStatus::Ga,
        }))
        .unwrap();
    registry
        .register(Arc::new(ScriptedModule {
            name: "C",
            deps: vec!["B".to_string()],
            release_status: ReleaseStatus::Ga,
        }))
        .unwrap();

    let dev_config = DevConfig {
        version: "1".to_string(),
        modules: vec![declare("A", true), declare("B", true), declare("C", true)],
        global_config: BTreeMap::new(),
    };

    let store_dir = tempfile::tempdir().unwrap();
    let docs_dir = tempfile::tempdir().unwrap();

    let engine = WorkflowEngine::new(
        registry,
        WorkflowStore::new(store_dir.path().to_path_buf()),
        dev_config,
        UserConfig::default(),
        CliOverrides::default(),
    );

    let mut workflow = engine
        .start_workflow("w1", docs_dir.path().to_str().unwrap())
        .unwrap();
    engine.execute_next(&mut workflow).unwrap();

    // A fresh engine over the same store directory simulates a new process.
    let resumed_registry = ModuleRegistry::new();
    resumed_registry
        .register(Arc::new(ScriptedModule {
            name: "A",
            deps: vec![],
            release_status: ReleaseStatus::Ga,
        }))
        .unwrap();
    resumed_registry
        .register(Arc::new(ScriptedModule {
            name: "B",
            deps: vec!["A".to_string()],
            release_status: ReleaseStatus::Ga,
        }))
        .unwrap();
    resumed_registry
        .register(Arc::new(ScriptedModule {
            name: "C",
            deps: vec!["B".to_string()],
            release_status: ReleaseStatus::Ga,
        }))
        .unwrap();
    let resumed_dev_config = DevConfig {
        version: "1".to_string(),
        modules: vec![declare("A", true), declare("B", true), declare("C", true)],
        global_config: BTreeMap::new(),
    };
    let resumed_engine = WorkflowEngine::new(
        resumed_registry,
        WorkflowStore::new(store_dir.path().to_path_buf()),
        resumed_dev_config,
        UserConfig::default(),
        CliOverrides::default(),
    );

    let mut resumed = resumed_engine.resume_workflow("w1").unwrap();
    assert_eq!(
        resumed.module("A").unwrap().status,
        adt_core::workflow::ModuleStatus::Completed
    );
    assert_eq!(
        resumed.module("B").unwrap().status,
        adt_core::workflow::ModuleStatus::Pending
    );

    resumed_engine.execute_next(&mut resumed).unwrap();
    assert_eq!(
        resumed.module("B").unwrap().status,
        adt_core::workflow::ModuleStatus::Completed
    );
    assert_eq!(resumed.status, WorkflowStatus::Active);
}

#[test]
fn store_round_trips_full_workflow_state() {
    let store_dir = tempfile::tempdir().unwrap();
    let store = WorkflowStore::new(store_dir.path().to_path_buf());

    let mut state = WorkflowState::new("w1", "/tmp/docs", &["A".to_string(), "B".to_string()]);
    state.mark_started("A");
    state.mark_completed(
        "A",
        &ExecutionResult {
            status: ExecutionStatus::Success,
            message: "ok".to_string(),
            files_processed: 3,
            files_modified: 1,
            execution_time: 0.5,
            error_message: None,
            data: None,
        },
    );

    store.save(&state).unwrap();
    let loaded = store.load("w1").unwrap();

    assert_eq!(loaded.name, state.name);
    assert_eq!(loaded.module_names(), state.module_names());
    assert_eq!(loaded.module("A").unwrap().status, state.module("A").unwrap().status);
    assert_eq!(
        loaded.module("A").unwrap().files_processed,
        state.module("A").unwrap().files_processed
    );
}
