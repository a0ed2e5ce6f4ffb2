use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use crate::task::TaskStatus;

/// Read-only view of one task's ledger entry.
///
/// Stage durations are signed seconds: a negative value marks the stage in
/// which the task failed, so a report can distinguish "took N seconds and
/// failed" from "took N seconds and succeeded".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskMetrics {
    pub extracting_secs: f64,
    pub transforming_secs: f64,
    pub loading_secs: f64,
    pub status: Option<TaskStatus>,
}

impl TaskMetrics {
    pub fn is_failed(&self) -> bool {
        self.status == Some(TaskStatus::Failed)
    }
}

#[derive(Debug)]
struct TaskRecord {
    extracting_secs: f64,
    transforming_secs: f64,
    loading_secs: f64,
    status: Option<TaskStatus>,
    last_start: Instant,
}

impl TaskRecord {
    fn new() -> Self {
        Self {
            extracting_secs: 0.0,
            transforming_secs: 0.0,
            loading_secs: 0.0,
            status: None,
            last_start: Instant::now(),
        }
    }

    /// Record `secs` as the duration of the stage named by `status`.
    fn close_stage(&mut self, status: TaskStatus, secs: f64) {
        match status {
            TaskStatus::Extracting => self.extracting_secs = secs,
            TaskStatus::Transforming => self.transforming_secs = secs,
            TaskStatus::Loading => self.loading_secs = secs,
            // Failed is terminal; there is no stage slot to close.
            TaskStatus::Failed => {}
        }
    }

    fn snapshot(&self) -> TaskMetrics {
        TaskMetrics {
            extracting_secs: self.extracting_secs,
            transforming_secs: self.transforming_secs,
            loading_secs: self.loading_secs,
            status: self.status,
        }
    }
}

/// Per-task timing/state ledger: one entry per accepted task, keyed by the
/// task's domain string.
///
/// Records are created by `start` and retained until the run ends. Entries
/// are logically owned by one task each, but the map itself is shared by all
/// workers, so every operation locks it.
///
/// `set_status` and `end` on a key that was never started panic: the
/// orchestrator is the only caller, and an unknown key there is a programming
/// defect, not a task-level failure.
#[derive(Debug, Default)]
pub struct MetricsTracker {
    tasks: Mutex<HashMap<String, TaskRecord>>,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track the start of a task. Creates the record if the key is new, then
    /// records `status` as current. A repeated `start` with the task's
    /// current status is a logged no-op, same as `set_status`.
    pub fn start(&self, key: &str, status: TaskStatus) {
        let mut tasks = self.tasks.lock().unwrap();
        let record = tasks
            .entry(key.to_string())
            .or_insert_with(TaskRecord::new);
        Self::transition(key, record, status);
    }

    /// Move a task to a new status, closing out the previous stage's
    /// duration. No-op with a diagnostic when `status` is already current.
    pub fn set_status(&self, key: &str, status: TaskStatus) {
        let mut tasks = self.tasks.lock().unwrap();
        let record = tasks
            .get_mut(key)
            .unwrap_or_else(|| panic!("no metrics record for task '{key}'"));
        Self::transition(key, record, status);
    }

    /// Close out the active stage without assigning a new status: the task is
    /// done with its final stage.
    pub fn end(&self, key: &str) {
        let mut tasks = self.tasks.lock().unwrap();
        let record = tasks
            .get_mut(key)
            .unwrap_or_else(|| panic!("no metrics record for task '{key}'"));
        let elapsed = record.last_start.elapsed().as_secs_f64();
        if let Some(current) = record.status {
            record.close_stage(current, elapsed);
        }
        record.last_start = Instant::now();
    }

    /// Mark a task failed: the active stage's duration is recorded negated
    /// and the status becomes `Failed`. Unknown keys are tolerated with a
    /// diagnostic (the task may have died before being tracked).
    pub fn failed(&self, key: &str) {
        let mut tasks = self.tasks.lock().unwrap();
        let Some(record) = tasks.get_mut(key) else {
            tracing::debug!(%key, "failed called for unknown task, ignoring");
            return;
        };
        let elapsed = record.last_start.elapsed().as_secs_f64();
        if let Some(current) = record.status {
            record.close_stage(current, -elapsed);
        }
        record.last_start = Instant::now();
        record.status = Some(TaskStatus::Failed);
    }

    /// View of a single task's metrics, if tracked.
    pub fn get(&self, key: &str) -> Option<TaskMetrics> {
        self.tasks.lock().unwrap().get(key).map(TaskRecord::snapshot)
    }

    /// View of every tracked task.
    pub fn snapshot(&self) -> HashMap<String, TaskMetrics> {
        self.tasks
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.snapshot()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().unwrap().is_empty()
    }

    fn transition(key: &str, record: &mut TaskRecord, status: TaskStatus) {
        if record.status == Some(status) {
            tracing::debug!(%key, %status, "status already current, ignoring");
            return;
        }
        let elapsed = record.last_start.elapsed().as_secs_f64();
        if let Some(previous) = record.status {
            record.close_stage(previous, elapsed);
        }
        record.last_start = Instant::now();
        record.status = Some(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_machine_records_in_call_order() {
        let tracker = MetricsTracker::new();
        tracker.start("example.com", TaskStatus::Extracting);
        tracker.set_status("example.com", TaskStatus::Transforming);
        tracker.end("example.com");

        let m = tracker.get("example.com").unwrap();
        assert!(m.extracting_secs >= 0.0);
        assert!(m.transforming_secs >= 0.0);
        assert_eq!(m.status, Some(TaskStatus::Transforming));
        assert!(!m.is_failed());
    }

    #[test]
    fn test_duplicate_status_is_noop() {
        let tracker = MetricsTracker::new();
        tracker.start("example.com", TaskStatus::Extracting);
        let before = tracker.get("example.com").unwrap();
        tracker.set_status("example.com", TaskStatus::Extracting);
        let after = tracker.get("example.com").unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_duplicate_start_is_noop() {
        let tracker = MetricsTracker::new();
        tracker.start("example.com", TaskStatus::Extracting);
        tracker.start("example.com", TaskStatus::Extracting);
        assert_eq!(tracker.len(), 1);
        let m = tracker.get("example.com").unwrap();
        assert_eq!(m.status, Some(TaskStatus::Extracting));
        assert_eq!(m.extracting_secs, 0.0);
    }

    #[test]
    fn test_failed_records_negative_duration() {
        let tracker = MetricsTracker::new();
        tracker.start("example.com", TaskStatus::Extracting);
        tracker.set_status("example.com", TaskStatus::Transforming);
        tracker.failed("example.com");

        let m = tracker.get("example.com").unwrap();
        assert!(m.extracting_secs >= 0.0);
        assert!(m.transforming_secs <= 0.0);
        assert!(m.is_failed());
    }

    #[test]
    fn test_failed_unknown_key_is_tolerated() {
        let tracker = MetricsTracker::new();
        tracker.failed("never-started.com");
        assert!(tracker.is_empty());
    }

    #[test]
    #[should_panic(expected = "no metrics record")]
    fn test_set_status_unknown_key_panics() {
        let tracker = MetricsTracker::new();
        tracker.set_status("never-started.com", TaskStatus::Transforming);
    }

    #[test]
    #[should_panic(expected = "no metrics record")]
    fn test_end_unknown_key_panics() {
        let tracker = MetricsTracker::new();
        tracker.end("never-started.com");
    }

    #[test]
    fn test_snapshot_covers_all_tasks() {
        let tracker = MetricsTracker::new();
        tracker.start("a.com", TaskStatus::Extracting);
        tracker.start("b.com", TaskStatus::Extracting);
        tracker.failed("b.com");

        let all = tracker.snapshot();
        assert_eq!(all.len(), 2);
        assert!(!all["a.com"].is_failed());
        assert!(all["b.com"].is_failed());
    }
}
