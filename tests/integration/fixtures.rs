//! Shared helpers for the integration suite.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tempfile::TempDir;

use cathedral_swarm::agent::Agent;
use cathedral_swarm::artifact::ArtifactStore;
use cathedral_swarm::core::task::{AgentRole, Task};
use cathedral_swarm::orchestration::{Dispatcher, Orchestrator};
use cathedral_swarm::Result;

pub struct TestEnv {
    // Held so the artifact tree outlives the test body.
    pub _dir: TempDir,
    pub store: ArtifactStore,
}

pub fn test_env() -> TestEnv {
    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::new(dir.path());
    store.ensure_layout().unwrap();
    TestEnv { _dir: dir, store }
}

/// A record of one stub launch: which task, and when.
#[derive(Debug, Clone)]
pub struct LaunchRecord {
    pub task_id: String,
    pub at: Instant,
}

/// Stands in for a tmux-hosted assistant: returns a synthetic pane id
/// immediately and records the launch.
pub struct StubAgent {
    role: AgentRole,
    counter: Arc<AtomicUsize>,
    pub launches: Arc<Mutex<Vec<LaunchRecord>>>,
}

impl StubAgent {
    pub fn new(role: AgentRole) -> Self {
        Self {
            role,
            counter: Arc::new(AtomicUsize::new(0)),
            launches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn shared(role: AgentRole, launches: Arc<Mutex<Vec<LaunchRecord>>>) -> Self {
        Self {
            role,
            counter: Arc::new(AtomicUsize::new(0)),
            launches,
        }
    }
}

#[async_trait]
impl Agent for StubAgent {
    fn role(&self) -> AgentRole {
        self.role
    }

    async fn launch(&self, _session: &str, task: &Task) -> Result<String> {
        self.launches.lock().unwrap().push(LaunchRecord {
            task_id: task.id.as_str().to_string(),
            at: Instant::now(),
        });
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("%{}", n))
    }
}

/// An orchestrator over a temp artifact tree with stub agents for every
/// code role plus the reviewer, and a short stagger so tests stay fast.
pub fn stub_orchestrator(env: &TestEnv) -> Orchestrator {
    let agents: Vec<Box<dyn Agent>> = vec![
        Box::new(StubAgent::new(AgentRole::Backend)),
        Box::new(StubAgent::new(AgentRole::Frontend)),
        Box::new(StubAgent::new(AgentRole::Database)),
        Box::new(StubAgent::new(AgentRole::Reviewer)),
    ];
    let dispatcher = Dispatcher::with_limits(
        "test-session",
        agents,
        env.store.clone(),
        4,
        Duration::from_millis(1),
    );
    Orchestrator::with_dispatcher(dispatcher, env.store.clone())
}
