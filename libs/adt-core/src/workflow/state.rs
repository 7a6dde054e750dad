//! In-memory model of a single workflow: its module list, per-module
//! execution records, discovered files, and derived status (C5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::contract::ExecutionResult as ModuleExecutionResult;

/// Status of a single module within a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Per-module execution record inside a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleExecutionState {
    pub status: ModuleStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub execution_time: Option<f64>,
    #[serde(default)]
    pub files_processed: u64,
    #[serde(default)]
    pub files_modified: u64,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl Default for ModuleExecutionState {
    fn default() -> Self {
        Self {
            status: ModuleStatus::Pending,
            started_at: None,
            completed_at: None,
            execution_time: None,
            files_processed: 0,
            files_modified: 0,
            retry_count: 0,
            error_message: None,
        }
    }
}

/// Overall status of a workflow, derived from its module statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Active,
    Completed,
    Failed,
    Archived,
}

/// Schema metadata persisted alongside a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowMetadata {
    #[serde(default = "current_schema_version")]
    pub version: u32,
    #[serde(default)]
    pub tool_version: String,
}

impl Default for WorkflowMetadata {
    fn default() -> Self {
        Self {
            version: current_schema_version(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[must_use]
pub fn current_schema_version() -> u32 {
    1
}

/// A persistent, stateful run of the enabled module sequence over a directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub name: String,
    pub directory: String,
    pub status: WorkflowStatus,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    /// Insertion-ordered module list; order is frozen for the workflow's lifetime.
    #[serde(with = "ordered_module_map")]
    pub modules: Vec<(String, ModuleExecutionState)>,
    #[serde(default)]
    pub files_discovered: Vec<String>,
    #[serde(default)]
    pub directory_config: Option<Value>,
    #[serde(default)]
    pub metadata: WorkflowMetadata,
}

impl WorkflowState {
    #[must_use]
    pub fn new(name: impl Into<String>, directory: impl Into<String>, module_order: &[String]) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            directory: directory.into(),
            status: WorkflowStatus::Active,
            created_at: now,
            last_activity_at: now,
            modules: module_order
                .iter()
                .map(|name| (name.clone(), ModuleExecutionState::default()))
                .collect(),
            files_discovered: Vec::new(),
            directory_config: None,
            metadata: WorkflowMetadata::default(),
        }
    }

    fn module_mut(&mut self, name: &str) -> Option<&mut ModuleExecutionState> {
        self.modules
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, state)| state)
    }

    #[must_use]
    pub fn module(&self, name: &str) -> Option<&ModuleExecutionState> {
        self.modules.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    /// Transition a module to `running` and stamp `started_at`.
    pub fn mark_started(&mut self, name: &str) {
        let now = Utc::now();
        if let Some(state) = self.module_mut(name) {
            state.status = ModuleStatus::Running;
            state.started_at = Some(now);
        }
        self.last_activity_at = now;
    }

    /// Transition a module to `completed`, recording outcome counts and
    /// resetting its retry counter, then recompute workflow status.
    pub fn mark_completed(&mut self, name: &str, result: &ModuleExecutionResult) {
        let now = Utc::now();
        if let Some(state) = self.module_mut(name) {
            state.status = ModuleStatus::Completed;
            state.completed_at = Some(now);
            state.execution_time = Some(result.execution_time);
            state.files_processed = result.files_processed;
            state.files_modified = result.files_modified;
            state.retry_count = 0;
            state.error_message = None;
        }
        self.last_activity_at = now;
        self.recompute_status();
    }

    /// Transition a module to `failed`, incrementing its retry counter.
    pub fn mark_failed(&mut self, name: &str, error: impl Into<String>) {
        let now = Utc::now();
        let error = error.into();
        if let Some(state) = self.module_mut(name) {
            state.status = ModuleStatus::Failed;
            state.retry_count += 1;
            state.error_message = Some(error);
        }
        self.last_activity_at = now;
    }

    /// The next module to run: the first in insertion order whose status is
    /// not `completed`. A `failed` module is returned again, as it is the
    /// next candidate for retry. Returns `None` once everything is complete.
    #[must_use]
    pub fn next_module(&self) -> Option<&str> {
        self.modules
            .iter()
            .find(|(_, state)| state.status != ModuleStatus::Completed)
            .map(|(name, _)| name.as_str())
    }

    fn recompute_status(&mut self) {
        if self
            .modules
            .iter()
            .all(|(_, state)| state.status == ModuleStatus::Completed)
        {
            self.status = WorkflowStatus::Completed;
        }
    }

    #[must_use]
    pub fn module_names(&self) -> Vec<String> {
        self.modules.iter().map(|(name, _)| name.clone()).collect()
    }
}

/// Serializes the module list as a JSON object (`name -> state`) rather than
/// an array of pairs, matching the on-disk shape described for workflow
/// state files, while deserializing back in document order so the frozen
/// initialization order survives a save/load round trip.
mod ordered_module_map {
    use super::ModuleExecutionState;
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S>(
        modules: &[(String, ModuleExecutionState)],
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(modules.len()))?;
        for (name, state) in modules {
            map.serialize_entry(name, state)?;
        }
        map.end()
    }

    struct OrderedMapVisitor;

    impl<'de> Visitor<'de> for OrderedMapVisitor {
        type Value = Vec<(String, ModuleExecutionState)>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a map of module name to execution state")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((key, value)) = access.next_entry()? {
                entries.push((key, value));
            }
            Ok(entries)
        }
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<Vec<(String, ModuleExecutionState)>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(OrderedMapVisitor)
    }
}
