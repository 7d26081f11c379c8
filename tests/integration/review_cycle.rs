//! Bounded-retry review cycles: rejection feedback flows back to the code
//! task until it is approved or attempts run out.

use cathedral_swarm::core::task::{AgentRole, Task, TaskId, TaskStatus, MAX_ATTEMPTS};
use cathedral_swarm::orchestration::Orchestrator;

use crate::fixtures::{stub_orchestrator, test_env, TestEnv};

/// Seed a completed backend task and its completed paired reviewer, as the
/// reaper would leave them after both sentinels fired.
fn seed_reviewed_pair(orch: &Orchestrator) {
    orch.graph()
        .add_task(
            Task::new("b1", AgentRole::Backend, "Build the REST API")
                .with_output_dir("code/backend"),
        )
        .unwrap();
    orch.graph()
        .add_task(
            Task::new("review-b1", AgentRole::Reviewer, "Review code produced by task b1")
                .with_depends_on(vec![TaskId::from("b1")])
                .with_artifact_dirs(vec!["code/backend".into(), "contracts".into()])
                .with_output_dir("reviews")
                .with_review_task(TaskId::from("b1")),
        )
        .unwrap();
    orch.graph()
        .set_review_task(&TaskId::from("b1"), &TaskId::from("review-b1"))
        .unwrap();
    mark_pair_completed(orch);
}

/// Simulate one build+review round: both tasks ran and completed.
fn mark_pair_completed(orch: &Orchestrator) {
    orch.graph()
        .set_status(&TaskId::from("b1"), TaskStatus::Completed)
        .unwrap();
    orch.graph()
        .set_status(&TaskId::from("review-b1"), TaskStatus::Completed)
        .unwrap();
}

fn write_review(env: &TestEnv, content: &str) {
    env.store.write("reviews", "review-b1.md", content).unwrap();
}

#[test]
fn rejected_twice_then_approved() {
    let env = test_env();
    let mut orch = stub_orchestrator(&env);
    seed_reviewed_pair(&orch);

    for (round, feedback) in [(1, "missing error handling"), (2, "still no 404 handling")] {
        write_review(&env, &format!("REJECTED: {}", feedback));
        orch.process_reviews();

        let b1 = orch.graph().get(&TaskId::from("b1")).unwrap();
        assert_eq!(b1.status, TaskStatus::Pending, "round {}", round);
        assert_eq!(b1.attempts, round);
        assert_eq!(b1.feedback, feedback);
        assert_eq!(
            orch.graph().get(&TaskId::from("review-b1")).unwrap().status,
            TaskStatus::Pending
        );

        // Next round: both run again and complete
        mark_pair_completed(&orch);
    }

    write_review(&env, "APPROVED");
    orch.process_reviews();

    let b1 = orch.graph().get(&TaskId::from("b1")).unwrap();
    assert_eq!(b1.status, TaskStatus::Completed);
    assert_eq!(b1.attempts, 2);
    assert_eq!(
        orch.graph().get(&TaskId::from("review-b1")).unwrap().status,
        TaskStatus::Completed
    );
}

#[test]
fn rejected_three_times_fails_permanently() {
    let env = test_env();
    let mut orch = stub_orchestrator(&env);
    seed_reviewed_pair(&orch);

    for round in 1..=MAX_ATTEMPTS {
        write_review(&env, "REJECTED: fundamentally wrong");
        orch.process_reviews();

        let b1 = orch.graph().get(&TaskId::from("b1")).unwrap();
        if round < MAX_ATTEMPTS {
            assert_eq!(b1.status, TaskStatus::Pending);
            mark_pair_completed(&orch);
        } else {
            assert_eq!(b1.status, TaskStatus::Failed);
            assert_eq!(b1.error, "rejected 3 times, giving up");
        }
    }

    assert!(orch.graph().has_failed());
    assert!(!orch.graph().all_completed());
}

#[test]
fn whole_review_body_is_feedback_when_marker_missing() {
    let env = test_env();
    let mut orch = stub_orchestrator(&env);
    seed_reviewed_pair(&orch);

    write_review(&env, "This does not compile and the endpoints are wrong.\n");
    orch.process_reviews();

    let b1 = orch.graph().get(&TaskId::from("b1")).unwrap();
    assert_eq!(b1.status, TaskStatus::Pending);
    assert_eq!(
        b1.feedback,
        "This does not compile and the endpoints are wrong.\n"
    );
}

#[test]
fn reviewer_rerun_sees_preserved_attempts() {
    let env = test_env();
    let mut orch = stub_orchestrator(&env);
    seed_reviewed_pair(&orch);

    write_review(&env, "REJECTED: redo it");
    orch.process_reviews();

    // The retried code task keeps its attempt count through the reset
    let b1 = orch.graph().get(&TaskId::from("b1")).unwrap();
    assert_eq!(b1.attempts, 1);

    // The reviewer's next run is gated on the code task completing again
    let ready: Vec<String> = orch
        .graph()
        .ready_tasks()
        .iter()
        .map(|t| t.id.as_str().to_string())
        .collect();
    assert!(ready.contains(&"b1".to_string()));
    assert!(!ready.contains(&"review-b1".to_string()));
}
