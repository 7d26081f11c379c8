use async_trait::async_trait;

use crate::agent::{feedback_block, launch_interactive, load_prompt, Agent};
use crate::artifact::ArtifactStore;
use crate::core::task::{AgentRole, Task};
use crate::Result;

pub struct Database {
    store: ArtifactStore,
}

impl Database {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Agent for Database {
    fn role(&self) -> AgentRole {
        AgentRole::Database
    }

    async fn launch(&self, session: &str, task: &Task) -> Result<String> {
        let system = load_prompt("database")?;
        let contract_ctx = self.store.read_dir("contracts")?;

        let mut prompt = format!(
            r#"Task: {}

Architect artifacts:
{}

Before making interface decisions, check artifacts/shared-context/ for decisions from other agents.
Write your own key decisions (table shapes, migration names) to artifacts/shared-context/.

Write all schema and migration files to artifacts/schemas/ directory ONLY. Do NOT modify any file outside artifacts/.
When completely finished, run: touch artifacts/schemas/.done
Then STOP."#,
            task.description, contract_ctx
        );
        prompt.push_str(&feedback_block(task));

        launch_interactive(session, &task.id, &system, &prompt).await
    }
}
