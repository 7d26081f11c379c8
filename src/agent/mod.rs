//! Role adapters that launch a Claude Code session in a tmux pane.
//!
//! Each adapter assembles a prompt from a role system prompt plus context
//! gathered from the artifact store, writes it to a temp file, and starts
//! the assistant with an initial message pointing at that file. The
//! assistant is trusted to write its outputs and touch the sentinel.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::artifact::ArtifactStore;
use crate::core::task::{AgentRole, Task, TaskId};
use crate::tmux::{shell_escape, Tmux};
use crate::{Error, Result};

mod architect;
mod backend;
mod database;
mod frontend;
mod reviewer;

pub use architect::Architect;
pub use backend::Backend;
pub use database::Database;
pub use frontend::Frontend;
pub use reviewer::Reviewer;

/// Directory containing the per-role system prompt files.
pub const PROMPT_DIR: &str = "prompts";

/// Launches an assistant session in a tmux pane for a given task.
#[async_trait]
pub trait Agent: Send + Sync {
    fn role(&self) -> AgentRole;
    async fn launch(&self, session: &str, task: &Task) -> Result<String>;
}

/// The standard adapter set, one per registered role.
pub fn default_agents(store: ArtifactStore) -> Vec<Box<dyn Agent>> {
    vec![
        Box::new(Architect::new(store.clone())),
        Box::new(Backend::new(store.clone())),
        Box::new(Frontend::new(store.clone())),
        Box::new(Database::new(store.clone())),
        Box::new(Reviewer::new(store)),
    ]
}

/// Key the adapters by role for dispatch.
pub fn agents_by_role(agents: Vec<Box<dyn Agent>>) -> HashMap<AgentRole, Box<dyn Agent>> {
    agents.into_iter().map(|a| (a.role(), a)).collect()
}

/// Read a role system prompt from the prompts directory.
pub fn load_prompt(name: &str) -> Result<String> {
    let path = Path::new(PROMPT_DIR).join(format!("{}.md", name));
    fs::read_to_string(&path)
        .map_err(|e| Error::Prompt(format!("load prompt {}: {}", path.display(), e)))
}

/// Stable temp directory for prompt files.
pub fn prompt_scratch_dir() -> PathBuf {
    std::env::temp_dir().join("cathedral-swarm")
}

/// Write a task's prompt to a temp file and return the path.
pub fn write_prompt_file(task_id: &TaskId, prompt_text: &str) -> Result<PathBuf> {
    let dir = prompt_scratch_dir();
    fs::create_dir_all(&dir)?;
    let path = dir.join(format!("{}.md", task_id));
    fs::write(&path, prompt_text)?;
    Ok(path)
}

/// Launch the assistant in interactive mode in a named window, then send a
/// short "read that file" instruction to auto-submit while keeping the full
/// TUI.
pub(crate) async fn launch_interactive(
    session: &str,
    task_id: &TaskId,
    system_prompt: &str,
    prompt_text: &str,
) -> Result<String> {
    let prompt_path = write_prompt_file(task_id, prompt_text)?;

    let cmd = format!(
        "claude --append-system-prompt {} --allowedTools Edit Read Write Bash Glob Grep",
        shell_escape(system_prompt)
    );
    let initial_msg = format!(
        "Read and follow all instructions in {}",
        prompt_path.display()
    );

    Tmux::new_auto_window(session, task_id.as_str(), &cmd, &initial_msg).await
}

/// Rejection guidance appended to a code-role prompt on retry attempts.
pub(crate) fn feedback_block(task: &Task) -> String {
    if task.feedback.is_empty() {
        return String::new();
    }
    format!(
        "\n\n--- PREVIOUS ATTEMPT WAS REJECTED ---\nAttempt {}/{}. Reviewer feedback:\n{}\n\nFix the issues listed above.",
        task.attempts + 1,
        crate::core::task::MAX_ATTEMPTS,
        task.feedback
    )
}
