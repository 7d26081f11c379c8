//! Concurrency ceiling and stagger behavior of the dispatcher.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cathedral_swarm::agent::Agent;
use cathedral_swarm::core::graph::TaskGraph;
use cathedral_swarm::core::task::{AgentRole, Task, TaskId, TaskStatus};
use cathedral_swarm::orchestration::Dispatcher;

use crate::fixtures::{test_env, StubAgent};

fn five_ready_backend_tasks() -> TaskGraph {
    let graph = TaskGraph::new();
    for id in ["b1", "b2", "b3", "b4", "b5"] {
        graph
            .add_task(
                Task::new(id, AgentRole::Backend, "build something")
                    .with_output_dir("code/backend"),
            )
            .unwrap();
    }
    graph
}

#[tokio::test]
async fn ceiling_caps_first_wave_at_four() {
    let env = test_env();
    let agent = StubAgent::new(AgentRole::Backend);
    let launches = agent.launches.clone();
    let dispatcher = Dispatcher::with_limits(
        "test-session",
        vec![Box::new(agent) as Box<dyn Agent>],
        env.store.clone(),
        4,
        Duration::from_millis(1),
    );

    let graph = five_ready_backend_tasks();
    dispatcher.launch_ready(&graph).await.unwrap();

    assert_eq!(graph.running_count(), 4);
    assert_eq!(
        graph.get(&TaskId::from("b5")).unwrap().status,
        TaskStatus::Pending
    );

    // Launches happen in insertion order
    let order: Vec<String> = launches
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.task_id.clone())
        .collect();
    assert_eq!(order, vec!["b1", "b2", "b3", "b4"]);

    // Completing one task frees one slot for the fifth
    graph
        .set_status(&TaskId::from("b1"), TaskStatus::Completed)
        .unwrap();
    dispatcher.launch_ready(&graph).await.unwrap();
    assert_eq!(
        graph.get(&TaskId::from("b5")).unwrap().status,
        TaskStatus::Running
    );
}

#[tokio::test]
async fn launches_within_a_wave_are_staggered() {
    let env = test_env();
    let stagger = Duration::from_millis(100);
    let launches = Arc::new(Mutex::new(Vec::new()));
    let agent = StubAgent::shared(AgentRole::Backend, launches.clone());
    let dispatcher = Dispatcher::with_limits(
        "test-session",
        vec![Box::new(agent) as Box<dyn Agent>],
        env.store.clone(),
        4,
        stagger,
    );

    let graph = five_ready_backend_tasks();
    dispatcher.launch_ready(&graph).await.unwrap();

    let records = launches.lock().unwrap();
    assert_eq!(records.len(), 4);
    for pair in records.windows(2) {
        let gap = pair[1].at.duration_since(pair[0].at);
        assert!(
            gap >= stagger,
            "consecutive launches only {:?} apart",
            gap
        );
    }
}

#[tokio::test]
async fn every_running_task_gets_a_distinct_pane() {
    let env = test_env();
    let dispatcher = Dispatcher::with_limits(
        "test-session",
        vec![Box::new(StubAgent::new(AgentRole::Backend)) as Box<dyn Agent>],
        env.store.clone(),
        4,
        Duration::from_millis(1),
    );

    let graph = five_ready_backend_tasks();
    dispatcher.launch_ready(&graph).await.unwrap();

    let mut panes: Vec<String> = graph
        .tasks()
        .into_iter()
        .filter_map(|t| t.pane_id)
        .collect();
    assert_eq!(panes.len(), 4);
    panes.sort();
    panes.dedup();
    assert_eq!(panes.len(), 4);

    // Running tasks all carry a start stamp
    for t in graph.tasks() {
        if t.status == TaskStatus::Running {
            assert!(t.started_at.is_some());
        }
    }
}
