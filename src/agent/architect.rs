//! The architect runs in two modes, distinguished by task id: design writes
//! the contracts and the task plan; validate checks that the implementations
//! honor those contracts.

use async_trait::async_trait;

use crate::agent::{launch_interactive, load_prompt, Agent};
use crate::artifact::ArtifactStore;
use crate::core::task::{AgentRole, Task};
use crate::orchestration::ARCHITECT_VALIDATE;
use crate::Result;

pub struct Architect {
    store: ArtifactStore,
}

impl Architect {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }

    async fn launch_validation(
        &self,
        session: &str,
        task: &Task,
        system: &str,
    ) -> Result<String> {
        let contract_ctx = self.store.read_dir("contracts")?;
        let code_ctx = self.read_code_artifacts();

        let prompt = format!(
            r#"You are validating that all sub-agent implementations honor the original contracts.

=== Original Contracts ===
{contract_ctx}

=== Implemented Code ===
{code_ctx}

Check for:
1. API contract mismatches (endpoints, request/response shapes)
2. Data model inconsistencies between backend and frontend
3. Missing or incompatible interfaces between components

If everything is coherent, write "APPROVED" to artifacts/reviews/architect-validate.md
If there are issues, write "REJECTED:" followed by specific issues and which task(s) need rework to artifacts/reviews/architect-validate.md

After writing, run: touch artifacts/reviews/.done
Then STOP."#
        );

        launch_interactive(session, &task.id, system, &prompt).await
    }

    fn read_code_artifacts(&self) -> String {
        let mut result = String::new();
        for dir in ["code/backend", "code/frontend", "schemas"] {
            // dir may not exist if no agent produced it
            if let Ok(content) = self.store.read_dir(dir) {
                result.push_str(&content);
            }
        }
        result
    }
}

#[async_trait]
impl Agent for Architect {
    fn role(&self) -> AgentRole {
        AgentRole::Architect
    }

    async fn launch(&self, session: &str, task: &Task) -> Result<String> {
        let system = load_prompt("architect")?;

        if task.id.as_str() == ARCHITECT_VALIDATE {
            return self.launch_validation(session, task, &system).await;
        }

        let prompt = format!(
            r#"Design the architecture for: {}

Write exactly three files to artifacts/contracts/: api-contract.yaml, data-model.yaml, task-plan.yaml.
Do NOT write code or files anywhere else — only artifacts/contracts/.
After writing all three files, run: touch artifacts/contracts/.done
Then STOP. Do not implement anything. Your job ends at design."#,
            task.description
        );

        launch_interactive(session, &task.id, &system, &prompt).await
    }
}
