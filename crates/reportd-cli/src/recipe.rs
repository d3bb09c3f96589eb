//! Recipe - JSON で書かれた「どの artifact をどのコマンドで作るか」
//!
//! ```json
//! {
//!   "ignore_missing_deps": false,
//!   "jobs": [
//!     { "targets": ["out/report.html"], "deps": ["data/metrics.json"], "command": "make report" }
//!   ]
//! }
//! ```
//!
//! Relative paths resolve against the working directory. The file is re-read
//! every cycle, so edits take effect without a restart.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reportd_core::app::artifacts_exist;
use reportd_core::domain::RegenerateError;
use reportd_core::impls::{LocalArtifactStore, run_shell};
use reportd_core::{Scheduler, TaskKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("cannot read recipe {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid recipe {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("job #{index} has no targets")]
    NoTargets { index: usize },
}

impl From<RecipeError> for RegenerateError {
    fn from(err: RecipeError) -> Self {
        RegenerateError::Other(err.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recipe {
    /// Post jobs even when some of their deps do not exist yet.
    pub ignore_missing_deps: bool,
    pub jobs: Vec<RecipeJob>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeJob {
    pub targets: Vec<PathBuf>,
    #[serde(default)]
    pub deps: Vec<PathBuf>,
    pub command: String,
}

impl Recipe {
    pub fn load(path: &Path) -> Result<Self, RecipeError> {
        let text = fs::read_to_string(path).map_err(|source| RecipeError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let recipe: Recipe = serde_json::from_str(&text).map_err(|source| RecipeError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(index) = recipe.jobs.iter().position(|job| job.targets.is_empty()) {
            return Err(RecipeError::NoTargets { index });
        }
        Ok(recipe)
    }
}

/// Regenerator that posts every recipe job whose deps are in place.
#[derive(Debug, Clone)]
pub struct RecipeRegenerator {
    recipe: PathBuf,
    artifacts: LocalArtifactStore,
}

impl RecipeRegenerator {
    pub fn new(recipe: impl Into<PathBuf>) -> Self {
        Self {
            recipe: recipe.into(),
            artifacts: LocalArtifactStore::new(),
        }
    }
}

#[async_trait]
impl reportd_core::ports::Regenerator for RecipeRegenerator {
    async fn regenerate(
        &self,
        workdir: &Path,
        scheduler: &Scheduler,
    ) -> Result<(), RegenerateError> {
        let recipe = Recipe::load(&workdir.join(&self.recipe))?;

        for job in recipe.jobs {
            let deps: Vec<PathBuf> = job.deps.iter().map(|dep| workdir.join(dep)).collect();
            if !recipe.ignore_missing_deps && !artifacts_exist(&self.artifacts, &deps) {
                tracing::debug!(command = %job.command, "deps not ready");
                continue;
            }

            let key = match TaskKey::new(job.targets.iter().map(|target| workdir.join(target))) {
                Ok(key) => key,
                Err(err) => {
                    tracing::warn!(error = %err, command = %job.command, "invalid targets");
                    continue;
                }
            };

            let command = job.command;
            let cwd = workdir.to_path_buf();
            let outcome = scheduler.post(&key, move || run_shell(&command, Some(&cwd)))?;
            tracing::debug!(key = %key, ?outcome, "posted");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reportd_core::domain::StatusTag;
    use reportd_core::impls::MemoryEventSink;
    use reportd_core::ports::{EventSink, Regenerator};
    use reportd_core::{PostOutcome, SchedulerConfig, TaskState};
    use std::sync::Arc;

    fn write_recipe(dir: &Path, recipe: &str) {
        fs::write(dir.join("reportd.json"), recipe).unwrap();
    }

    #[test]
    fn load_applies_defaults() {
        let dir = tempfile::tempdir().unwrap();
        write_recipe(
            dir.path(),
            r#"{ "jobs": [ { "targets": ["a.txt"], "command": "touch a.txt" } ] }"#,
        );

        let recipe = Recipe::load(&dir.path().join("reportd.json")).unwrap();
        assert!(!recipe.ignore_missing_deps);
        assert_eq!(recipe.jobs.len(), 1);
        assert!(recipe.jobs[0].deps.is_empty());
    }

    #[test]
    fn load_rejects_jobs_without_targets() {
        let dir = tempfile::tempdir().unwrap();
        write_recipe(
            dir.path(),
            r#"{ "jobs": [ { "targets": ["a"], "command": "true" }, { "targets": [], "command": "true" } ] }"#,
        );

        let err = Recipe::load(&dir.path().join("reportd.json")).unwrap_err();
        assert!(matches!(err, RecipeError::NoTargets { index: 1 }));
    }

    #[test]
    fn load_reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reportd.json");
        assert!(matches!(Recipe::load(&path), Err(RecipeError::Read { .. })));

        write_recipe(dir.path(), "{ not json");
        assert!(matches!(Recipe::load(&path), Err(RecipeError::Parse { .. })));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn posts_only_jobs_whose_deps_exist() {
        let dir = tempfile::tempdir().unwrap();
        write_recipe(
            dir.path(),
            r#"{
                "jobs": [
                    { "targets": ["ready.txt"], "deps": ["input.txt"], "command": "cp input.txt ready.txt" },
                    { "targets": ["blocked.txt"], "deps": ["missing.txt"], "command": "touch blocked.txt" }
                ]
            }"#,
        );
        fs::write(dir.path().join("input.txt"), "metrics").unwrap();

        let sink = Arc::new(MemoryEventSink::new());
        let scheduler = Scheduler::builder(SchedulerConfig::with_workers(2))
            .events(Arc::clone(&sink) as Arc<dyn EventSink>)
            .build()
            .unwrap();

        RecipeRegenerator::new("reportd.json")
            .regenerate(dir.path(), &scheduler)
            .await
            .unwrap();
        scheduler.wait().await;

        let ready = dir.path().join("ready.txt");
        let blocked = dir.path().join("blocked.txt");
        assert_eq!(fs::read_to_string(&ready).unwrap(), "metrics");
        assert!(!blocked.exists());
        assert!(sink.tags_for(&ready).contains(&StatusTag::Create));
        assert!(sink.tags_for(&blocked).is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ignore_missing_deps_posts_everything() {
        let dir = tempfile::tempdir().unwrap();
        write_recipe(
            dir.path(),
            r#"{
                "ignore_missing_deps": true,
                "jobs": [ { "targets": ["out.txt"], "deps": ["missing.txt"], "command": "touch out.txt" } ]
            }"#,
        );

        let scheduler = Scheduler::builder(SchedulerConfig::with_workers(1))
            .events(Arc::new(MemoryEventSink::new()))
            .build()
            .unwrap();
        RecipeRegenerator::new("reportd.json")
            .regenerate(dir.path(), &scheduler)
            .await
            .unwrap();
        scheduler.wait().await;

        assert!(dir.path().join("out.txt").exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failing_command_is_recorded_and_retried_next_cycle() {
        let dir = tempfile::tempdir().unwrap();
        write_recipe(
            dir.path(),
            r#"{ "jobs": [ { "targets": ["out.txt"], "command": "exit 3" } ] }"#,
        );
        let sink = Arc::new(MemoryEventSink::new());
        let scheduler = Scheduler::builder(SchedulerConfig::with_workers(1))
            .events(Arc::clone(&sink) as Arc<dyn EventSink>)
            .build()
            .unwrap();
        let regenerator = RecipeRegenerator::new("reportd.json");
        let out = dir.path().join("out.txt");
        let key = TaskKey::single(&out).unwrap();

        regenerator.regenerate(dir.path(), &scheduler).await.unwrap();
        let handle = scheduler.handle(&key).unwrap();
        assert_eq!(handle.wait().await, TaskState::Failed);

        write_recipe(
            dir.path(),
            r#"{ "jobs": [ { "targets": ["out.txt"], "command": "touch out.txt" } ] }"#,
        );
        regenerator.regenerate(dir.path(), &scheduler).await.unwrap();
        scheduler.wait().await;

        assert!(out.exists());
        assert_eq!(scheduler.status_of(&key), Some(TaskState::Succeeded));
        let tags = sink.tags_for(&out);
        assert!(tags.contains(&StatusTag::Fail));
        assert!(tags.contains(&StatusTag::Requeue));
        assert_eq!(
            scheduler.post(&key, || Ok(())).unwrap(),
            PostOutcome::Skipped
        );
    }
}
