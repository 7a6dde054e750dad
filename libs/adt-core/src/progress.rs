//! Pure derivation of completion metrics from a [`WorkflowState`] (C8).
//!
//! No I/O: given a snapshot, compute totals and a next-action hint.

use chrono::{DateTime, Utc};

use crate::workflow::state::{ModuleStatus, WorkflowState};

/// A point-in-time summary of a workflow's progress.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    pub total_modules: usize,
    pub completed_modules: usize,
    pub failed_modules: usize,
    pub pending_modules: usize,
    pub running_modules: usize,
    pub completion_percentage: f64,
    pub current_module: Option<String>,
    pub processed_files: u64,
    pub modified_files: u64,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

#[must_use]
pub fn progress(workflow: &WorkflowState) -> ProgressReport {
    let total_modules = workflow.modules.len();
    let mut completed_modules = 0;
    let mut failed_modules = 0;
    let mut pending_modules = 0;
    let mut running_modules = 0;
    let mut processed_files = 0u64;
    let mut modified_files = 0u64;

    for (_, state) in &workflow.modules {
        match state.status {
            ModuleStatus::Completed => completed_modules += 1,
            ModuleStatus::Failed => failed_modules += 1,
            ModuleStatus::Pending => pending_modules += 1,
            ModuleStatus::Running => running_modules += 1,
        }
        processed_files += state.files_processed;
        modified_files += state.files_modified;
    }

    let completion_percentage = if total_modules == 0 {
        0.0
    } else {
        #[allow(clippy::cast_precision_loss)]
        let ratio = completed_modules as f64 / total_modules as f64;
        100.0 * ratio
    };

    ProgressReport {
        total_modules,
        completed_modules,
        failed_modules,
        pending_modules,
        running_modules,
        completion_percentage,
        current_module: workflow.next_module().map(str::to_string),
        processed_files,
        modified_files,
        started_at: workflow.created_at,
        last_activity_at: workflow.last_activity_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{ExecutionResult, ExecutionStatus};

    fn result() -> ExecutionResult {
        ExecutionResult {
            status: ExecutionStatus::Success,
            message: "done".to_string(),
            files_processed: 4,
            files_modified: 1,
            execution_time: 0.2,
            error_message: None,
            data: None,
        }
    }

    #[test]
    fn progress_reflects_status_counts_and_sums() {
        let mut workflow = WorkflowState::new("w1", "/tmp/docs", &["A".to_string(), "B".to_string()]);
        workflow.mark_completed("A", &result());

        let report = progress(&workflow);
        assert_eq!(report.total_modules, 2);
        assert_eq!(report.completed_modules, 1);
        assert_eq!(report.pending_modules, 1);
        assert!((report.completion_percentage - 50.0).abs() < f64::EPSILON);
        assert_eq!(report.processed_files, 4);
        assert_eq!(report.current_module.as_deref(), Some("B"));
    }

    #[test]
    fn progress_is_zero_percent_for_empty_module_list() {
        let workflow = WorkflowState::new("w1", "/tmp/docs", &[]);
        let report = progress(&workflow);
        assert_eq!(report.total_modules, 0);
        assert!((report.completion_percentage - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn completed_modules_never_decreases_across_transitions() {
        let mut workflow = WorkflowState::new("w1", "/tmp/docs", &["A".to_string(), "B".to_string()]);
        let before = progress(&workflow).completed_modules;
        workflow.mark_started("A");
        let during = progress(&workflow).completed_modules;
        workflow.mark_completed("A", &result());
        let after = progress(&workflow).completed_modules;
        assert!(before <= during);
        assert!(during <= after);
    }
}
