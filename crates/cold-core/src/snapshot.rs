use crate::lifecycle::ClusterStatus;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

/// Full cluster state as reported by the controller on every exchange.
///
/// Every field is required on the wire except `solver`, which controllers may
/// echo back after a `reset`. A body missing any other field is rejected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterSnapshot {
    pub status: ClusterStatus,
    pub workers: Vec<WorkerStatus>,
    pub programs_run: u64,
    #[serde(deserialize_with = "deserialize_ids")]
    pub unsolved: Vec<String>,
    pub solved: Vec<SolvedUnit>,
    pub solutions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerStatus {
    #[serde(deserialize_with = "deserialize_id")]
    pub worker_id: String,
    pub cores: u32,
    pub run_rate: f64,
    pub programs_run: u64,
    #[serde(default, alias = "assemblies_completed")]
    pub combinations_completed: u64,
    #[serde(default)]
    pub status: String,
}

/// A unit of search work that has been exhausted, with the number of programs
/// it took.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SolvedUnit {
    #[serde(
        alias = "combination",
        alias = "assembly",
        deserialize_with = "deserialize_id"
    )]
    pub unit: String,
    #[serde(alias = "programs_completed")]
    pub programs_run: u64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SnapshotError {
    #[error("worker {worker_id} reported more than once")]
    DuplicateWorker { worker_id: String },
    #[error("worker {worker_id} reported invalid run rate {rate}")]
    InvalidRate { worker_id: String, rate: f64 },
    #[error("unit {unit} is both solved and unsolved")]
    OverlappingUnit { unit: String },
}

impl ClusterSnapshot {
    /// Checks the invariants the console relies on: unique worker ids,
    /// non-negative rates, and disjoint solved/unsolved units.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let mut seen = HashSet::new();
        for worker in &self.workers {
            if !seen.insert(worker.worker_id.as_str()) {
                return Err(SnapshotError::DuplicateWorker {
                    worker_id: worker.worker_id.clone(),
                });
            }
            if !worker.run_rate.is_finite() || worker.run_rate < 0.0 {
                return Err(SnapshotError::InvalidRate {
                    worker_id: worker.worker_id.clone(),
                    rate: worker.run_rate,
                });
            }
        }

        let unsolved: HashSet<&str> = self.unsolved.iter().map(String::as_str).collect();
        if let Some(overlap) = self
            .solved
            .iter()
            .find(|solved| unsolved.contains(solved.unit.as_str()))
        {
            return Err(SnapshotError::OverlappingUnit {
                unit: overlap.unit.clone(),
            });
        }
        Ok(())
    }

    pub fn worker(&self, worker_id: &str) -> Option<&WorkerStatus> {
        self.workers
            .iter()
            .find(|worker| worker.worker_id == worker_id)
    }
}

/// Controllers identify workers and units by either strings or integers.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let val = Value::deserialize(deserializer)?;
    id_from_value(val).map_err(serde::de::Error::custom)
}

fn deserialize_ids<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values: Vec<Value> = Vec::deserialize(deserializer)?;
    values
        .into_iter()
        .map(|val| id_from_value(val).map_err(serde::de::Error::custom))
        .collect()
}

fn id_from_value(val: Value) -> Result<String, &'static str> {
    match val {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err("expected string or number for id"),
    }
}
