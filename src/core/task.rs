//! Task data model for the orchestration DAG.
//!
//! Tasks are the units of work handed to agents. Each task tracks its
//! status, dependencies, artifact directories, rejection feedback, and the
//! tmux pane it runs in.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A task fails permanently after this many review rejections.
pub const MAX_ATTEMPTS: u32 = 3;

/// Unique identifier for a task within a graph.
///
/// Ids are human-chosen strings: the orchestrator's seed tasks use fixed
/// names, the rest come from the architect's task plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task status in its lifecycle.
///
/// `pending` on insertion, `running` once dispatched to a pane, `completed`
/// when the sentinel fires or the pane dies. A reviewer rejection sends the
/// task back to `pending` until attempts run out, then `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Rejected,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Rejected => "rejected",
        };
        write!(f, "{}", s)
    }
}

/// The closed set of agent roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Architect,
    Backend,
    Frontend,
    Database,
    Migrator,
    Reviewer,
    Integrator,
}

impl AgentRole {
    /// Parse a role name from a task-plan entry. The architect never
    /// appears in plans; it is seeded by the orchestrator.
    pub fn from_plan(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "backend" => Some(Self::Backend),
            "frontend" => Some(Self::Frontend),
            "database" => Some(Self::Database),
            "reviewer" => Some(Self::Reviewer),
            "integrator" => Some(Self::Integrator),
            "migrator" => Some(Self::Migrator),
            _ => None,
        }
    }

    /// Roles whose output gets an auto-paired reviewer.
    pub fn produces_code(&self) -> bool {
        matches!(self, Self::Backend | Self::Frontend | Self::Database)
    }

    /// Subdirectories the role reads as context.
    pub fn artifact_dirs(&self) -> &'static [&'static str] {
        match self {
            Self::Backend | Self::Frontend | Self::Database | Self::Migrator => &["contracts"],
            Self::Reviewer => &["contracts", "code/backend"],
            Self::Integrator => &["contracts", "code/backend", "code/frontend"],
            Self::Architect => &[],
        }
    }

    /// The single subdirectory the role writes results and the sentinel to.
    /// The architect's output dir depends on its mode and is set per task.
    pub fn output_dir(&self) -> &'static str {
        match self {
            Self::Backend => "code/backend",
            Self::Frontend => "code/frontend",
            Self::Database => "schemas",
            Self::Reviewer => "reviews",
            Self::Integrator => "code/integrated",
            Self::Migrator => "code/migrated",
            Self::Architect => "",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Architect => "architect",
            Self::Backend => "backend",
            Self::Frontend => "frontend",
            Self::Database => "database",
            Self::Migrator => "migrator",
            Self::Reviewer => "reviewer",
            Self::Integrator => "integrator",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single task in the orchestration DAG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub role: AgentRole,
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<TaskId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifact_dirs: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub output_dir: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub result: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub feedback: String,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pane_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
}

impl Task {
    /// Create a pending task with no dependencies or directories.
    pub fn new(id: impl Into<TaskId>, role: AgentRole, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            description: description.into(),
            status: TaskStatus::Pending,
            depends_on: Vec::new(),
            artifact_dirs: Vec::new(),
            output_dir: String::new(),
            result: String::new(),
            error: String::new(),
            feedback: String::new(),
            attempts: 0,
            review_task_id: None,
            pane_id: None,
            started_at: None,
        }
    }

    pub fn with_depends_on(mut self, deps: Vec<TaskId>) -> Self {
        self.depends_on = deps;
        self
    }

    pub fn with_artifact_dirs(mut self, dirs: Vec<String>) -> Self {
        self.artifact_dirs = dirs;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<String>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_review_task(mut self, id: TaskId) -> Self {
        self.review_task_id = Some(id);
        self
    }

    /// Transition to running, recording the pane and wall-clock start.
    pub fn start(&mut self, pane_id: impl Into<String>) {
        self.status = TaskStatus::Running;
        self.pane_id = Some(pane_id.into());
        self.started_at = Some(Utc::now().timestamp());
    }

    pub fn complete(&mut self) {
        self.status = TaskStatus::Completed;
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = TaskStatus::Failed;
        self.error = error.into();
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status, TaskStatus::Completed | TaskStatus::Failed)
    }
}
