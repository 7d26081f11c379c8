//! Orchestration engine: dispatching, polling, review and validation loops.

pub mod dispatcher;
pub mod orchestrator;
pub mod plan;
pub mod verdict;

pub use dispatcher::{Dispatcher, MAX_CONCURRENT, STAGGER_DELAY};
pub use orchestrator::{
    Orchestrator, ARCHITECT_DESIGN, ARCHITECT_VALIDATE, MAX_WAVES, POLL_INTERVAL,
};
pub use plan::{parse_task_plan, TaskPlanEntry};
pub use verdict::{extract_feedback, parse_verdict, Verdict};
