//! Remark templates attached to task records.

use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::core::durations::{format_delta, format_duration};

const BUDGET_PLACEHOLDER: &str = "{budget}";
const LATENCY_PLACEHOLDER: &str = "{latency}";
const UNBOUNDED: &str = "unbounded";

/// Note templates for task records.
///
/// `{budget}` and `{latency}` are substituted when a remark is rendered.
/// Missing fields keep their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RemarkTemplates {
    /// A task with a budget strategy ran without any parent context.
    pub nil_context: String,
    /// The derived deadline fired before the work finished.
    pub overrun: String,
    /// The work finished inside its derived budget.
    pub within_budget: String,
    /// The outer deadline ran out before the task got a turn.
    pub simulator_timeout: String,
}

impl Default for RemarkTemplates {
    fn default() -> Self {
        Self {
            nil_context: "nil context".to_string(),
            overrun: "budget {budget} < latency {latency}".to_string(),
            within_budget: "budget {budget}".to_string(),
            simulator_timeout: "simulator timeout exceeded".to_string(),
        }
    }
}

impl RemarkTemplates {
    pub fn overrun(&self, budget: Option<TimeDelta>, latency: Duration) -> String {
        render(&self.overrun, budget, latency)
    }

    pub fn within_budget(&self, budget: Option<TimeDelta>, latency: Duration) -> String {
        render(&self.within_budget, budget, latency)
    }
}

fn render(template: &str, budget: Option<TimeDelta>, latency: Duration) -> String {
    let budget = budget.map_or_else(|| UNBOUNDED.to_string(), format_delta);
    template
        .replace(BUDGET_PLACEHOLDER, &budget)
        .replace(LATENCY_PLACEHOLDER, &format_duration(latency))
}
