//! Scenario file parsing and validation.
//!
//! Scenarios are TOML files describing one simulator: its outer timeout, the
//! ordered task chain, and optional remark overrides. See `scenarios/` for
//! examples.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use tracing::debug;

use crate::core::budget::BudgetStrategy;
use crate::core::remarks::RemarkTemplates;
use crate::run::Simulator;
use crate::task::{SleepTask, Task};

/// A parsed scenario file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ScenarioFile {
    pub simulator: SimulatorSpec,
    #[serde(default)]
    pub remarks: RemarkTemplates,
    #[serde(default)]
    pub tasks: Vec<TaskSpec>,
}

/// Simulator metadata.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SimulatorSpec {
    pub name: String,
    /// Outer timeout in milliseconds. `0` runs untimed.
    #[serde(default)]
    pub timeout_ms: u64,
}

/// One call in the chain, in execution order.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TaskSpec {
    pub name: String,
    pub latency_ms: u64,
    /// Absent for an unmonitored call.
    #[serde(default)]
    pub budget: Option<BudgetSpec>,
}

/// Budget strategy configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BudgetSpec {
    /// A fraction of the parent's remaining budget.
    Weighted {
        threshold_ms: u64,
        weight: f64,
        #[serde(default)]
        priority: bool,
    },
    /// The same timeout regardless of the parent.
    Fixed { timeout_ms: u64 },
}

impl ScenarioFile {
    /// Load and validate a scenario file from the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("read scenario {}", path.display()))?;
        let scenario: ScenarioFile = toml::from_str(&contents)
            .with_context(|| format!("parse scenario {}", path.display()))?;
        scenario
            .validate()
            .with_context(|| format!("validate scenario {}", path.display()))?;
        debug!(name = %scenario.simulator.name, tasks = scenario.tasks.len(), "scenario loaded");
        Ok(scenario)
    }

    pub fn parse_str(contents: &str) -> Result<Self> {
        let scenario: ScenarioFile = toml::from_str(contents).context("parse scenario")?;
        scenario.validate()?;
        Ok(scenario)
    }

    fn validate(&self) -> Result<()> {
        if self.simulator.name.trim().is_empty() {
            bail!("simulator.name must be non-empty");
        }
        if self.tasks.is_empty() {
            bail!("tasks must be a non-empty array");
        }
        for (index, task) in self.tasks.iter().enumerate() {
            task.validate()
                .with_context(|| format!("tasks[{}] invalid", index))?;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.simulator.timeout_ms)
    }

    /// Build a ready-to-run simulator from this scenario.
    pub fn to_simulator(&self) -> Simulator {
        let tasks: Vec<Box<dyn Task>> = self
            .tasks
            .iter()
            .map(|spec| Box::new(spec.to_task(&self.remarks)) as Box<dyn Task>)
            .collect();
        Simulator::new(self.simulator.name.clone(), self.timeout(), tasks)
            .with_remarks(self.remarks.clone())
    }
}

impl TaskSpec {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("task name must be non-empty");
        }
        if let Some(BudgetSpec::Weighted { weight, .. }) = &self.budget
            && !weight.is_finite()
        {
            bail!("weighted budget for {} must have a finite weight", self.name);
        }
        Ok(())
    }

    fn to_task(&self, remarks: &RemarkTemplates) -> SleepTask {
        let latency = Duration::from_millis(self.latency_ms);
        let task = match &self.budget {
            None => SleepTask::unmonitored(self.name.clone(), latency),
            Some(spec) => SleepTask::new(self.name.clone(), latency, spec.to_strategy()),
        };
        task.with_remarks(remarks.clone())
    }
}

impl BudgetSpec {
    pub fn to_strategy(&self) -> BudgetStrategy {
        match self {
            BudgetSpec::Weighted {
                threshold_ms,
                weight,
                priority,
            } => BudgetStrategy::weighted(Duration::from_millis(*threshold_ms), *weight, *priority),
            BudgetSpec::Fixed { timeout_ms } => {
                BudgetStrategy::fixed(Duration::from_millis(*timeout_ms))
            }
        }
    }
}

/// A scenario found on disk, keyed by file stem.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredScenario {
    pub id: String,
    pub path: PathBuf,
    pub scenario: ScenarioFile,
}

/// Discover and load all scenario files from a directory.
///
/// Returns scenarios sorted by id (file stem). Only `.toml` files are read.
pub fn discover_scenarios(dir: &Path) -> Result<Vec<DiscoveredScenario>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("read scenarios dir {}", dir.display()))?
    {
        let entry = entry.context("read scenario entry")?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
            continue;
        }
        let id = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| anyhow!("scenario file name is not utf-8: {}", path.display()))?
            .to_string();
        let scenario = ScenarioFile::load(&path)?;
        found.push(DiscoveredScenario { id, path, scenario });
    }
    found.sort_by(|left, right| left.id.cmp(&right.id));
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE: &str = r#"
[simulator]
name = "my simulator"
timeout_ms = 100

[[tasks]]
name = "func 1"
latency_ms = 10
budget = { type = "weighted", threshold_ms = 30, weight = 0.2 }

[[tasks]]
name = "func 4"
latency_ms = 50
budget = { type = "weighted", threshold_ms = 30, weight = 0.6, priority = true }

[[tasks]]
name = "func 5"
latency_ms = 30
budget = { type = "fixed", timeout_ms = 30 }

[[tasks]]
name = "legacy"
latency_ms = 5
"#;

    #[test]
    fn parses_valid_scenario() {
        let scenario = ScenarioFile::parse_str(REFERENCE).expect("scenario parses");
        assert_eq!(scenario.simulator.name, "my simulator");
        assert_eq!(scenario.timeout(), Duration::from_millis(100));
        assert_eq!(scenario.tasks.len(), 4);
        assert_eq!(
            scenario.tasks[1].budget,
            Some(BudgetSpec::Weighted {
                threshold_ms: 30,
                weight: 0.6,
                priority: true,
            })
        );
        assert_eq!(scenario.tasks[3].budget, None);
        assert_eq!(scenario.remarks, RemarkTemplates::default());
    }

    #[test]
    fn builds_simulator_in_task_order() {
        let scenario = ScenarioFile::parse_str(REFERENCE).expect("scenario parses");
        let simulator = scenario.to_simulator();
        let names: Vec<&str> = simulator.tasks().iter().map(|task| task.name()).collect();
        assert_eq!(names, vec!["func 1", "func 4", "func 5", "legacy"]);
        assert_eq!(simulator.timeout(), Duration::from_millis(100));
    }

    #[test]
    fn missing_timeout_means_untimed() {
        let input = r#"
[simulator]
name = "untimed"

[[tasks]]
name = "only"
latency_ms = 1
"#;
        let scenario = ScenarioFile::parse_str(input).expect("scenario parses");
        assert_eq!(scenario.timeout(), Duration::ZERO);
    }

    #[test]
    fn accepts_degenerate_weight() {
        let input = r#"
[simulator]
name = "degenerate"
timeout_ms = 10

[[tasks]]
name = "starved"
latency_ms = 1
budget = { type = "weighted", threshold_ms = 0, weight = -1.0 }
"#;
        ScenarioFile::parse_str(input).expect("negative weight is accepted");
    }

    #[test]
    fn rejects_empty_task_list() {
        let input = r#"
[simulator]
name = "empty"
timeout_ms = 10
"#;
        let err = ScenarioFile::parse_str(input).expect_err("no tasks");
        assert!(err.to_string().contains("tasks"));
    }

    #[test]
    fn rejects_blank_task_name() {
        let input = r#"
[simulator]
name = "blank"

[[tasks]]
name = "  "
latency_ms = 1
"#;
        let err = ScenarioFile::parse_str(input).expect_err("blank name");
        assert!(format!("{err:#}").contains("task name"));
    }

    #[test]
    fn rejects_unknown_budget_type() {
        let input = r#"
[simulator]
name = "unknown"

[[tasks]]
name = "odd"
latency_ms = 1
budget = { type = "adaptive", timeout_ms = 3 }
"#;
        let _err = ScenarioFile::parse_str(input).expect_err("unknown budget type");
    }

    #[test]
    fn partial_remark_overrides_keep_defaults() {
        let input = r#"
[simulator]
name = "custom"

[remarks]
simulator_timeout = "skipped"

[[tasks]]
name = "only"
latency_ms = 1
"#;
        let scenario = ScenarioFile::parse_str(input).expect("scenario parses");
        assert_eq!(scenario.remarks.simulator_timeout, "skipped");
        assert_eq!(scenario.remarks.overrun, RemarkTemplates::default().overrun);
    }

    #[tokio::test(start_paused = true)]
    async fn remark_overrides_reach_tasks_and_simulator() {
        let input = r#"
[simulator]
name = "custom"
timeout_ms = 50

[remarks]
overrun = "{latency} blew through {budget}"
simulator_timeout = "never reached"

[[tasks]]
name = "slow"
latency_ms = 30
budget = { type = "fixed", timeout_ms = 10 }

[[tasks]]
name = "hog"
latency_ms = 60

[[tasks]]
name = "tail"
latency_ms = 1
"#;
        let scenario = ScenarioFile::parse_str(input).expect("scenario parses");

        let result = scenario.to_simulator().run().await;

        let remarks: Vec<&str> = result
            .records
            .iter()
            .map(|record| record.remark.as_str())
            .collect();
        assert_eq!(remarks, vec!["30ms blew through 10ms", "", "never reached"]);
        assert!(result.records[0].overran);
        assert_eq!(result.skipped, 1);
    }

    #[test]
    fn discovers_toml_files_sorted_by_stem() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("b.toml"), REFERENCE).expect("write b");
        fs::write(temp.path().join("a.toml"), REFERENCE).expect("write a");
        fs::write(temp.path().join("notes.md"), "ignored").expect("write notes");

        let found = discover_scenarios(temp.path()).expect("discover");
        let ids: Vec<&str> = found.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn missing_dir_discovers_nothing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let found = discover_scenarios(&temp.path().join("missing")).expect("discover");
        assert!(found.is_empty());
    }
}
