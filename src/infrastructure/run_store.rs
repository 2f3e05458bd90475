//! Recorded-run stores: in memory, optionally loaded from and saved to a
//! JSON file.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;

use crate::domain::models::RecordedRun;
use crate::domain::ports::{HarnessError, RunStore};

/// Relative slack when comparing budgets.
const BUDGET_TOLERANCE: f64 = 1e-9;

/// Runs grouped by task id.
#[derive(Debug, Default)]
pub struct InMemoryRunStore {
    runs: RwLock<HashMap<String, Vec<RecordedRun>>>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding `runs`, grouped by their task.
    pub fn from_runs(runs: impl IntoIterator<Item = RecordedRun>) -> Self {
        let mut grouped: HashMap<String, Vec<RecordedRun>> = HashMap::new();
        for run in runs {
            grouped.entry(run.task_id.clone()).or_default().push(run);
        }
        Self {
            runs: RwLock::new(grouped),
        }
    }

    /// Record one more run.
    pub async fn insert(&self, run: RecordedRun) {
        self.runs
            .write()
            .await
            .entry(run.task_id.clone())
            .or_default()
            .push(run);
    }

    /// Load runs from a JSON array of recorded runs.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read run store {}", path.display()))?;
        let runs: Vec<RecordedRun> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse run store {}", path.display()))?;
        Ok(Self::from_runs(runs))
    }

    /// Write every run as a JSON array, sorted by task and solver.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut runs: Vec<RecordedRun> = self.runs.read().await.values().flatten().cloned().collect();
        runs.sort_by(|a, b| {
            (a.task_id.as_str(), a.solver.as_str())
                .cmp(&(b.task_id.as_str(), b.solver.as_str()))
                .then(a.budget.total_cmp(&b.budget))
        });
        let json = serde_json::to_string_pretty(&runs).context("Failed to serialize runs")?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write run store {}", path.display()))
    }
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn lookup(
        &self,
        task_id: &str,
        solver: &str,
        min_budget: f64,
    ) -> Result<Option<RecordedRun>, HarnessError> {
        let runs = self.runs.read().await;
        let best = runs.get(task_id).and_then(|task_runs| {
            task_runs
                .iter()
                .filter(|run| run.solver == solver)
                .filter(|run| run.budget >= min_budget * (1.0 - BUDGET_TOLERANCE))
                .min_by(|a, b| a.budget.total_cmp(&b.budget))
                .cloned()
        });
        Ok(best)
    }

    async fn runs_for_task(&self, task_id: &str) -> Result<Vec<RecordedRun>, HarnessError> {
        Ok(self.runs.read().await.get(task_id).cloned().unwrap_or_default())
    }

    async fn task_ids(&self) -> Result<Vec<String>, HarnessError> {
        let mut ids: Vec<String> = self.runs.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Outcome;

    fn run(task: &str, solver: &str, budget: f64, cost: f64) -> RecordedRun {
        RecordedRun {
            task_id: task.to_string(),
            solver: solver.to_string(),
            budget,
            cost,
            outcome: Outcome::positive(None),
        }
    }

    #[tokio::test]
    async fn test_lookup_prefers_smallest_sufficient_budget() {
        let store = InMemoryRunStore::from_runs(vec![
            run("t", "foo", 64.0, 50.0),
            run("t", "foo", 16.0, 10.0),
            run("t", "foo", 32.0, 20.0),
            run("t", "bar", 20.0, 1.0),
        ]);
        let found = store.lookup("t", "foo", 20.0).await.unwrap().unwrap();
        assert!((found.budget - 32.0).abs() < f64::EPSILON);
        assert!(store.lookup("t", "foo", 100.0).await.unwrap().is_none());
        assert!(store.lookup("u", "foo", 1.0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.json");
        let store = InMemoryRunStore::new();
        store.insert(run("b", "foo", 10.0, 2.5)).await;
        store.insert(run("a", "foo", 10.0, 3.0)).await;
        store.save_json(&path).await.unwrap();

        let loaded = InMemoryRunStore::load_json(&path).await.unwrap();
        assert_eq!(loaded.task_ids().await.unwrap(), vec!["a", "b"]);
        assert_eq!(loaded.runs_for_task("b").await.unwrap(), vec![run("b", "foo", 10.0, 2.5)]);
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(InMemoryRunStore::load_json(dir.path().join("nope.json")).await.is_err());
    }
}
