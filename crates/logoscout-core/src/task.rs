use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of one task (one domain) as it moves through the stages.
///
/// Transitions are strictly Extracting → Transforming → Loading, with Failed
/// reachable from any of them. Completion is implicit: a task whose active
/// stage was closed without a failure is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Extracting,
    Transforming,
    Loading,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Extracting => "extracting",
            TaskStatus::Transforming => "transforming",
            TaskStatus::Loading => "loading",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "extracting" => Ok(TaskStatus::Extracting),
            "transforming" => Ok(TaskStatus::Transforming),
            "loading" => Ok(TaskStatus::Loading),
            "failed" => Ok(TaskStatus::Failed),
            _ => Err(format!("Unknown task status: {}", s)),
        }
    }
}

/// Overall pipeline state for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    Idle,
    Running,
    Complete,
}

impl PipelineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::Idle => "idle",
            PipelineStatus::Running => "running",
            PipelineStatus::Complete => "complete",
        }
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counts reported after a run. `dispatched` can fall short of `total` when
/// the run is interrupted before every domain is admitted to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub dispatched: usize,
    pub completed: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_roundtrip() {
        for status in [
            TaskStatus::Extracting,
            TaskStatus::Transforming,
            TaskStatus::Loading,
            TaskStatus::Failed,
        ] {
            let s = status.as_str();
            let parsed: TaskStatus = s.parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(!TaskStatus::Extracting.is_terminal());
        assert!(!TaskStatus::Transforming.is_terminal());
        assert!(!TaskStatus::Loading.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }

    #[test]
    fn test_pipeline_status_display() {
        assert_eq!(PipelineStatus::Idle.to_string(), "idle");
        assert_eq!(PipelineStatus::Running.to_string(), "running");
        assert_eq!(PipelineStatus::Complete.to_string(), "complete");
    }
}
