//! Task-plan parsing.
//!
//! The architect writes `contracts/task-plan.yaml` in one of two shapes: a
//! bare sequence of entries, or a mapping with a `tasks:` key. Both produce
//! the same task set.

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TaskPlanEntry {
    pub id: String,
    pub role: String,
    pub description: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TaskPlanWrapper {
    #[serde(default)]
    tasks: Vec<TaskPlanEntry>,
}

/// Parse a task plan, accepting both the bare-list and `{tasks: [...]}`
/// shapes. An empty plan is an error.
pub fn parse_task_plan(raw: &str) -> Result<Vec<TaskPlanEntry>> {
    let raw = strip_code_fences(raw);

    if let Ok(entries) = serde_yaml::from_str::<Vec<TaskPlanEntry>>(raw) {
        if !entries.is_empty() {
            return Ok(entries);
        }
    }

    let wrapped: TaskPlanWrapper = serde_yaml::from_str(raw)?;
    if wrapped.tasks.is_empty() {
        return Err(Error::EmptyTaskPlan);
    }
    Ok(wrapped.tasks)
}

/// Assistants sometimes wrap YAML output in markdown code fences; strip them
/// before parsing.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("yaml") on the opening fence line
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => return trimmed,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}
