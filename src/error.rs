use crate::core::task::TaskId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Tmux error: {0}")]
    Tmux(String),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Task already exists: {0}")]
    TaskExists(TaskId),

    #[error("Dependency {dep} not found for task {task}")]
    DependencyNotFound { task: TaskId, dep: TaskId },

    #[error("Dependency from {from} to {to} would create a cycle")]
    DependencyCycle { from: TaskId, to: TaskId },

    #[error("Task plan is empty")]
    EmptyTaskPlan,

    #[error("Task {id} failed: {error}")]
    TaskFailed { id: TaskId, error: String },

    #[error("One or more tasks failed permanently")]
    TasksFailed,

    #[error("Deadlock: no running or ready tasks, but not all completed")]
    Deadlock,

    #[error("Exceeded max polling iterations ({0})")]
    MaxWavesExceeded(u32),

    #[error("Orchestration cancelled")]
    Cancelled,

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Task join error: {0}")]
    TaskJoin(String),
}

pub type Result<T> = std::result::Result<T, Error>;
