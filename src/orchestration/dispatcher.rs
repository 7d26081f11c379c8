//! Dispatcher: routes ready tasks to their role adapters.
//!
//! Launches are capped at a total running-task ceiling and staggered,
//! because the external TUIs are fragile during their initialization window;
//! staggering prevents input races and reduces CPU contention.

use std::collections::HashMap;
use std::time::Duration;

use crate::agent::{agents_by_role, Agent};
use crate::artifact::ArtifactStore;
use crate::core::graph::TaskGraph;
use crate::core::task::{AgentRole, Task};
use crate::{swlog, swlog_warn, Result};

/// Ceiling on concurrently running tasks.
pub const MAX_CONCURRENT: usize = 4;

/// Delay between launches within one wave.
pub const STAGGER_DELAY: Duration = Duration::from_secs(3);

pub struct Dispatcher {
    session: String,
    agents: HashMap<AgentRole, Box<dyn Agent>>,
    store: ArtifactStore,
    max_concurrent: usize,
    stagger: Duration,
}

impl Dispatcher {
    pub fn new(
        session: impl Into<String>,
        agents: Vec<Box<dyn Agent>>,
        store: ArtifactStore,
    ) -> Self {
        Self::with_limits(session, agents, store, MAX_CONCURRENT, STAGGER_DELAY)
    }

    /// Constructor with explicit capacity and stagger, for callers that need
    /// different timing (and for tests).
    pub fn with_limits(
        session: impl Into<String>,
        agents: Vec<Box<dyn Agent>>,
        store: ArtifactStore,
        max_concurrent: usize,
        stagger: Duration,
    ) -> Self {
        Self {
            session: session.into(),
            agents: agents_by_role(agents),
            store,
            max_concurrent,
            stagger,
        }
    }

    /// Launch ready tasks, in insertion order, up to the concurrency
    /// ceiling. A single launch failure marks that task failed and the wave
    /// continues with the rest.
    pub async fn launch_ready(&self, graph: &TaskGraph) -> Result<()> {
        let slots = self.max_concurrent.saturating_sub(graph.running_count());
        if slots == 0 {
            return Ok(());
        }

        let mut ready = graph.ready_tasks();
        if ready.is_empty() {
            return Ok(());
        }
        ready.truncate(slots);

        swlog!(
            "[dispatch] launching {} task(s) ({} slots available)",
            ready.len(),
            slots
        );

        for (i, task) in ready.iter().enumerate() {
            // Stagger after the first launch so each TUI can start before
            // the next
            if i > 0 {
                tokio::time::sleep(self.stagger).await;
            }
            self.launch_task(graph, task).await?;
        }
        Ok(())
    }

    async fn launch_task(&self, graph: &TaskGraph, task: &Task) -> Result<()> {
        let Some(agent) = self.agents.get(&task.role) else {
            swlog_warn!(
                "[dispatch] skipping task {}: no agent for role {}",
                task.id,
                task.role
            );
            graph.mark_failed(&task.id, format!("no agent for role {}", task.role))?;
            return Ok(());
        };

        // A sentinel left over from a previous attempt would complete the
        // relaunched task instantly.
        if !task.output_dir.is_empty() {
            let _ = self.store.clear_sentinel(&task.output_dir);
        }

        match agent.launch(&self.session, task).await {
            Ok(pane_id) => {
                graph.mark_running(&task.id, pane_id.as_str())?;
                swlog!(
                    "[dispatch] -> {} ({}) in pane {}",
                    task.id,
                    task.role,
                    pane_id
                );
            }
            Err(e) => {
                swlog_warn!("[dispatch] failed to launch task {}: {}", task.id, e);
                graph.mark_failed(&task.id, e.to_string())?;
            }
        }
        Ok(())
    }
}
