use async_trait::async_trait;

use crate::agent::{launch_interactive, load_prompt, Agent};
use crate::artifact::ArtifactStore;
use crate::core::task::{AgentRole, Task};
use crate::Result;

pub struct Reviewer {
    store: ArtifactStore,
}

impl Reviewer {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }

    fn build_review_context(&self, dirs: &[String]) -> Result<String> {
        let mut ctx = String::new();
        for dir in dirs {
            ctx.push_str(&self.store.read_dir(dir)?);
        }
        Ok(ctx)
    }
}

#[async_trait]
impl Agent for Reviewer {
    fn role(&self) -> AgentRole {
        AgentRole::Reviewer
    }

    async fn launch(&self, session: &str, task: &Task) -> Result<String> {
        let system = load_prompt("reviewer")?;
        let code_ctx = self.build_review_context(&task.artifact_dirs)?;

        let prompt = format!(
            r#"Review this code and write your verdict to artifacts/reviews/{}.md ONLY. Do NOT modify any file outside artifacts/.
Your verdict file must start with either APPROVED or REJECTED: followed by specific, actionable feedback.
When completely finished, run: touch artifacts/reviews/.done
Then STOP.

{}"#,
            task.id, code_ctx
        );

        launch_interactive(session, &task.id, &system, &prompt).await
    }
}
