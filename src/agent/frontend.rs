use async_trait::async_trait;

use crate::agent::{feedback_block, launch_interactive, load_prompt, Agent};
use crate::artifact::ArtifactStore;
use crate::core::task::{AgentRole, Task};
use crate::Result;

pub struct Frontend {
    store: ArtifactStore,
}

impl Frontend {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Agent for Frontend {
    fn role(&self) -> AgentRole {
        AgentRole::Frontend
    }

    async fn launch(&self, session: &str, task: &Task) -> Result<String> {
        let system = load_prompt("frontend")?;
        let contract_ctx = self.store.read_dir("contracts")?;

        let mut prompt = format!(
            r#"Task: {}

Architect artifacts:
{}

Before making interface decisions, check artifacts/shared-context/ for decisions from other agents.
Write your own key decisions (component interfaces, API client shapes) to artifacts/shared-context/.

Write all code files to artifacts/code/frontend/ directory ONLY. Do NOT modify any file outside artifacts/.
When completely finished, run: touch artifacts/code/frontend/.done
Then STOP."#,
            task.description, contract_ctx
        );
        prompt.push_str(&feedback_block(task));

        launch_interactive(session, &task.id, &system, &prompt).await
    }
}
