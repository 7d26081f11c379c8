//! Expanding the architect's task plan and driving a single backend task
//! through dispatch, reaping, and review.

use cathedral_swarm::core::task::{AgentRole, Task, TaskId, TaskStatus};
use cathedral_swarm::orchestration::ARCHITECT_DESIGN;
use cathedral_swarm::Error;

use crate::fixtures::{stub_orchestrator, test_env};

fn seed_completed_design(orch: &cathedral_swarm::orchestration::Orchestrator) {
    orch.graph()
        .add_task(
            Task::new(ARCHITECT_DESIGN, AgentRole::Architect, "build a todo app")
                .with_output_dir("contracts"),
        )
        .unwrap();
    orch.graph()
        .set_status(&TaskId::from(ARCHITECT_DESIGN), TaskStatus::Completed)
        .unwrap();
}

#[test]
fn expansion_wires_reviewers_for_every_code_role() {
    let env = test_env();
    env.store
        .write(
            "contracts",
            "task-plan.yaml",
            r#"tasks:
  - id: b1
    role: backend
    description: Build the REST API
  - id: f1
    role: frontend
    description: Build the UI
    depends_on: [b1]
  - id: d1
    role: database
    description: Design the schema
"#,
        )
        .unwrap();

    let mut orch = stub_orchestrator(&env);
    seed_completed_design(&orch);
    orch.expand_task_plan().unwrap();

    // design + 3 code tasks + 3 paired reviewers
    assert_eq!(orch.graph().len(), 7);

    for (code, output_dir) in [
        ("b1", "code/backend"),
        ("f1", "code/frontend"),
        ("d1", "schemas"),
    ] {
        let task = orch.graph().get(&TaskId::from(code)).unwrap();
        let review_id = TaskId::from(format!("review-{}", code));
        assert_eq!(task.output_dir, output_dir);
        assert_eq!(task.review_task_id, Some(review_id.clone()));

        let review = orch.graph().get(&review_id).unwrap();
        assert_eq!(review.role, AgentRole::Reviewer);
        assert_eq!(review.depends_on, vec![TaskId::from(code)]);
        assert_eq!(review.review_task_id, Some(TaskId::from(code)));
        assert_eq!(
            review.artifact_dirs,
            vec![output_dir.to_string(), "contracts".to_string()]
        );
    }

    // f1 keeps its explicit dependency instead of the default
    let f1 = orch.graph().get(&TaskId::from("f1")).unwrap();
    assert_eq!(f1.depends_on, vec![TaskId::from("b1")]);
}

#[test]
fn expansion_rejects_unknown_dependency_before_dispatch() {
    let env = test_env();
    env.store
        .write(
            "contracts",
            "task-plan.yaml",
            "- id: b1\n  role: backend\n  description: API\n  depends_on: [nonexistent]\n",
        )
        .unwrap();

    let mut orch = stub_orchestrator(&env);
    seed_completed_design(&orch);

    let err = orch.expand_task_plan().unwrap_err();
    assert!(matches!(err, Error::DependencyNotFound { .. }));
    // Nothing was inserted beyond the seed task
    assert_eq!(orch.graph().len(), 1);
}

#[tokio::test]
async fn single_task_flows_through_build_and_review() {
    let env = test_env();
    env.store
        .write(
            "contracts",
            "task-plan.yaml",
            "- id: b1\n  role: backend\n  description: Build the REST API\n",
        )
        .unwrap();

    let mut orch = stub_orchestrator(&env);
    seed_completed_design(&orch);
    orch.expand_task_plan().unwrap();

    // Wave 1: only b1 is ready (its reviewer depends on it)
    orch.dispatcher().launch_ready(orch.graph()).await.unwrap();
    assert_eq!(
        orch.graph().get(&TaskId::from("b1")).unwrap().status,
        TaskStatus::Running
    );
    assert_eq!(
        orch.graph().get(&TaskId::from("review-b1")).unwrap().status,
        TaskStatus::Pending
    );

    // The agent writes its output and touches the sentinel
    env.store.write("code/backend", "main.rs", "fn main() {}").unwrap();
    env.store.write("code/backend", ".done", "").unwrap();
    orch.reap_finished();
    assert_eq!(
        orch.graph().get(&TaskId::from("b1")).unwrap().status,
        TaskStatus::Completed
    );

    // Wave 2: the paired reviewer becomes ready
    orch.dispatcher().launch_ready(orch.graph()).await.unwrap();
    assert_eq!(
        orch.graph().get(&TaskId::from("review-b1")).unwrap().status,
        TaskStatus::Running
    );

    // The reviewer approves
    env.store
        .write("reviews", "review-b1.md", "APPROVED")
        .unwrap();
    env.store.write("reviews", ".done", "").unwrap();
    orch.reap_finished();
    orch.process_reviews();

    assert!(orch.graph().all_completed());
    let b1 = orch.graph().get(&TaskId::from("b1")).unwrap();
    assert_eq!(b1.attempts, 0);
}
