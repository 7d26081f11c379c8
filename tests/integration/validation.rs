//! Whole-graph validation rejection: every code task re-enters the
//! build+review cycle with the validator's feedback.

use cathedral_swarm::core::task::{AgentRole, Task, TaskId, TaskStatus};
use cathedral_swarm::orchestration::{Orchestrator, ARCHITECT_VALIDATE};

use crate::fixtures::{stub_orchestrator, test_env};

/// Two reviewed-and-approved code tasks plus the terminal validation task,
/// as the graph looks when the validator's verdict comes back.
fn seed_validated_graph(orch: &Orchestrator) {
    for (code, review) in [("b1", "review-b1"), ("f1", "review-f1")] {
        let role = if code == "b1" {
            AgentRole::Backend
        } else {
            AgentRole::Frontend
        };
        orch.graph()
            .add_task(
                Task::new(code, role, "implement")
                    .with_output_dir(role.output_dir())
                    .with_review_task(TaskId::from(review)),
            )
            .unwrap();
        orch.graph()
            .add_task(
                Task::new(review, AgentRole::Reviewer, "review")
                    .with_depends_on(vec![TaskId::from(code)])
                    .with_output_dir("reviews")
                    .with_review_task(TaskId::from(code)),
            )
            .unwrap();
        orch.graph()
            .set_status(&TaskId::from(code), TaskStatus::Completed)
            .unwrap();
        orch.graph()
            .set_status(&TaskId::from(review), TaskStatus::Completed)
            .unwrap();
        orch.graph()
            .set_result(&TaskId::from(review), "approved")
            .unwrap();
    }

    orch.graph()
        .add_task(
            Task::new(ARCHITECT_VALIDATE, AgentRole::Architect, "validate")
                .with_depends_on(vec![TaskId::from("review-b1"), TaskId::from("review-f1")])
                .with_output_dir("reviews"),
        )
        .unwrap();
    orch.graph()
        .set_status(&TaskId::from(ARCHITECT_VALIDATE), TaskStatus::Completed)
        .unwrap();
}

#[test]
fn rejection_resets_code_tasks_reviewers_and_validator() {
    let env = test_env();
    let mut orch = stub_orchestrator(&env);
    seed_validated_graph(&orch);

    orch.apply_validation_rejection("backend endpoint returns wrong shape");

    for code in ["b1", "f1"] {
        let task = orch.graph().get(&TaskId::from(code)).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.attempts, 1);
        assert_eq!(task.feedback, "backend endpoint returns wrong shape");
    }
    for review in ["review-b1", "review-f1"] {
        let task = orch.graph().get(&TaskId::from(review)).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.result.is_empty());
    }
    let validate = orch.graph().get(&TaskId::from(ARCHITECT_VALIDATE)).unwrap();
    assert_eq!(validate.status, TaskStatus::Pending);

    // Only the code tasks are dispatchable; reviewers and the validator
    // wait on their dependencies
    let ready: Vec<String> = orch
        .graph()
        .ready_tasks()
        .iter()
        .map(|t| t.id.as_str().to_string())
        .collect();
    assert_eq!(ready, vec!["b1", "f1"]);
}

#[test]
fn three_rejection_rounds_exhaust_every_code_task() {
    let env = test_env();
    let mut orch = stub_orchestrator(&env);
    seed_validated_graph(&orch);

    for round in 1..=3u32 {
        orch.apply_validation_rejection("still incoherent");
        if round < 3 {
            // Simulate the rework round completing before the next verdict
            for id in ["b1", "f1", "review-b1", "review-f1", ARCHITECT_VALIDATE] {
                orch.graph()
                    .set_status(&TaskId::from(id), TaskStatus::Completed)
                    .unwrap();
            }
        }
    }

    for code in ["b1", "f1"] {
        let task = orch.graph().get(&TaskId::from(code)).unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error, "rejected 3 times, giving up");
    }
    assert!(orch.graph().has_failed());
}
