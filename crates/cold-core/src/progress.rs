use crate::magnitude::{format_magnitude, group_thousands};
use crate::snapshot::{ClusterSnapshot, WorkerStatus};

pub const RATE_SUFFIX: &str = "/sec";

/// Cluster-wide figures derived from one snapshot. Built fresh from whatever
/// snapshot is held; never carried over between snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterProgress {
    pub aggregate_rate: f64,
    pub programs_run: u64,
    pub solved: usize,
    pub unsolved: usize,
    pub solutions: usize,
    pub workers: usize,
    pub cores: u64,
}

impl ClusterProgress {
    pub fn from_snapshot(snapshot: &ClusterSnapshot) -> Self {
        Self {
            aggregate_rate: aggregate_rate(&snapshot.workers),
            programs_run: snapshot.programs_run,
            solved: snapshot.solved.len(),
            unsolved: snapshot.unsolved.len(),
            solutions: snapshot.solutions.len(),
            workers: snapshot.workers.len(),
            cores: snapshot
                .workers
                .iter()
                .map(|worker| u64::from(worker.cores))
                .sum(),
        }
    }

    pub fn rate_label(&self) -> String {
        rate_label(self.aggregate_rate)
    }

    pub fn programs_run_label(&self) -> String {
        group_thousands(self.programs_run)
    }

    /// Share of the unit universe already exhausted, in percent. `None` while
    /// the universe is empty.
    pub fn completion_percent(&self) -> Option<f64> {
        let total = self.solved + self.unsolved;
        if total == 0 {
            return None;
        }
        Some(self.solved as f64 * 100.0 / total as f64)
    }
}

pub fn aggregate_rate(workers: &[WorkerStatus]) -> f64 {
    workers.iter().map(|worker| worker.run_rate).sum()
}

/// Rate with the `/sec` suffix; empty when the rate is exactly zero.
///
/// Positive rates under one program per second show as `<1/sec` so a slow
/// cluster never reads as idle.
pub fn rate_label(rate: f64) -> String {
    if rate.is_nan() || rate <= 0.0 {
        return String::new();
    }
    if rate < 1.0 {
        return format!("<1{RATE_SUFFIX}");
    }
    format!("{}{RATE_SUFFIX}", format_magnitude(rate.floor() as u64))
}

impl WorkerStatus {
    pub fn rate_label(&self) -> String {
        rate_label(self.run_rate)
    }

    pub fn programs_run_label(&self) -> String {
        group_thousands(self.programs_run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::ClusterStatus;
    use crate::snapshot::SolvedUnit;

    fn worker(id: &str, run_rate: f64) -> WorkerStatus {
        WorkerStatus {
            worker_id: id.to_string(),
            cores: 4,
            run_rate,
            programs_run: 3000,
            combinations_completed: 0,
            status: "solving".to_string(),
        }
    }

    fn snapshot(workers: Vec<WorkerStatus>) -> ClusterSnapshot {
        ClusterSnapshot {
            status: ClusterStatus::Running,
            workers,
            programs_run: 3000,
            unsolved: vec!["2".to_string(), "3".to_string(), "4".to_string()],
            solved: vec![SolvedUnit {
                unit: "1".to_string(),
                programs_run: 3000,
            }],
            solutions: Vec::new(),
            solver: None,
        }
    }

    #[test]
    fn single_worker_scenario() {
        let progress = ClusterProgress::from_snapshot(&snapshot(vec![worker("1", 1500.0)]));
        assert_eq!(progress.rate_label(), "1k/sec");
        assert_eq!(progress.programs_run_label(), "3,000");
        assert_eq!(progress.solved, 1);
        assert_eq!(progress.unsolved, 3);
        assert_eq!(progress.completion_percent(), Some(25.0));
    }

    #[test]
    fn aggregate_is_sum_of_worker_rates() {
        let workers = vec![worker("1", 1200.0), worker("2", 800.5), worker("3", 0.0)];
        assert_eq!(aggregate_rate(&workers), 2000.5);
        let progress = ClusterProgress::from_snapshot(&snapshot(workers));
        assert_eq!(progress.rate_label(), "2k/sec");
        assert_eq!(progress.workers, 3);
        assert_eq!(progress.cores, 12);
    }

    #[test]
    fn no_workers_means_zero_rate_and_empty_label() {
        let progress = ClusterProgress::from_snapshot(&snapshot(Vec::new()));
        assert_eq!(progress.aggregate_rate, 0.0);
        assert_eq!(progress.rate_label(), "");

        let idle = vec![worker("1", 0.0), worker("2", 0.0)];
        assert_eq!(rate_label(aggregate_rate(&idle)), "");
    }

    #[test]
    fn small_positive_rate_is_not_suppressed() {
        assert_eq!(rate_label(0.25), "<1/sec");
        assert_eq!(worker("1", 0.5).rate_label(), "<1/sec");
        assert_eq!(worker("1", 999.9).rate_label(), "999/sec");
    }

    #[test]
    fn empty_universe_has_no_percentage() {
        let mut empty = snapshot(Vec::new());
        empty.unsolved.clear();
        empty.solved.clear();
        assert_eq!(ClusterProgress::from_snapshot(&empty).completion_percent(), None);
    }
}
