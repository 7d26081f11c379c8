//! The five-phase control loop.
//!
//! design → expand plan → build+review → validate → done. The orchestrator
//! owns the graph, the reaper, the review processor, the user-retry prompt,
//! and the rolling event log shown under the DAG table. Completion is
//! discovered by polling sentinels: the workers are interactive TUIs whose
//! output cannot be parsed and whose exit is not coupled to task success.

use std::io::{stdout, Write as _};
use std::time::Duration;

use chrono::Utc;
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use tokio_util::sync::CancellationToken;

use crate::agent::Agent;
use crate::artifact::ArtifactStore;
use crate::core::graph::TaskGraph;
use crate::core::task::{AgentRole, Task, TaskId, TaskStatus, MAX_ATTEMPTS};
use crate::orchestration::dispatcher::Dispatcher;
use crate::orchestration::plan::parse_task_plan;
use crate::orchestration::verdict::{extract_feedback, parse_verdict, Verdict};
use crate::tmux::Tmux;
use crate::{swlog, swlog_debug, swlog_warn, util, Error, Result};

/// Id of the seed task that produces the contracts and the task plan.
pub const ARCHITECT_DESIGN: &str = "architect-design";
/// Id of the terminal task that judges cross-agent coherence.
pub const ARCHITECT_VALIDATE: &str = "architect-validate";

/// Cadence of the supervisory loop. Sentinel completion is observed no
/// later than one interval after the file appears.
pub const POLL_INTERVAL: Duration = Duration::from_secs(3);
/// Upper bound on build+review loop iterations.
pub const MAX_WAVES: u32 = 50;

const MAX_EVENTS: usize = 10;

pub struct Orchestrator {
    dispatcher: Dispatcher,
    graph: TaskGraph,
    store: ArtifactStore,
    events: Vec<String>,
}

impl Orchestrator {
    pub fn new(
        session: impl Into<String>,
        agents: Vec<Box<dyn Agent>>,
        store: ArtifactStore,
    ) -> Self {
        let session = session.into();
        Self::with_dispatcher(Dispatcher::new(session, agents, store.clone()), store)
    }

    /// Constructor taking a pre-built dispatcher, for callers that need
    /// non-default capacity or stagger timing.
    pub fn with_dispatcher(dispatcher: Dispatcher, store: ArtifactStore) -> Self {
        Self {
            dispatcher,
            graph: TaskGraph::new(),
            store,
            events: Vec::new(),
        }
    }

    /// The task graph, for external inspection.
    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Execute the full five-phase orchestration.
    pub async fn run(&mut self, cancel: &CancellationToken, goal: &str) -> Result<()> {
        swlog!("[orchestrator] goal: {}", goal);

        // Phase 1: launch the architect to design contracts and the plan
        self.log_event("phase 1: architect design");
        let design = Task::new(ARCHITECT_DESIGN, AgentRole::Architect, goal)
            .with_output_dir("contracts");
        self.graph.add_task(design)?;
        self.dispatcher.launch_ready(&self.graph).await?;
        self.poll_until_done(cancel, &TaskId::from(ARCHITECT_DESIGN))
            .await?;

        // Expand the architect's task plan into the DAG
        self.expand_task_plan()?;
        self.log_event(format!(
            "task plan expanded, {} total tasks",
            self.graph.len()
        ));

        // Phases 2+3: poll loop for sub-agents and reviewers
        self.log_event("phase 2-3: build + review");
        self.poll_loop(cancel).await?;

        // Phase 4: architect reviews cross-agent coherence
        self.log_event("phase 4: architect validation");
        self.run_validation(cancel).await?;

        // Phase 5: nothing to assemble; artifacts are in place
        self.log_event("all phases complete");
        Ok(())
    }

    /// Read `contracts/task-plan.yaml` and insert its entries, auto-wiring a
    /// paired reviewer for every code-producing task.
    pub fn expand_task_plan(&mut self) -> Result<()> {
        let raw = self.store.read("contracts", "task-plan.yaml")?;
        let entries = parse_task_plan(&raw)?;

        for entry in entries {
            let Some(role) = AgentRole::from_plan(&entry.role) else {
                swlog_warn!(
                    "[orchestrator] skipping unknown role {:?} in task plan",
                    entry.role
                );
                continue;
            };

            let deps: Vec<TaskId> = if entry.depends_on.is_empty() {
                vec![TaskId::from(ARCHITECT_DESIGN)]
            } else {
                entry
                    .depends_on
                    .iter()
                    .map(|d| TaskId::from(d.as_str()))
                    .collect()
            };

            let id = TaskId::from(entry.id.as_str());
            let task = Task::new(id.clone(), role, entry.description)
                .with_depends_on(deps)
                .with_artifact_dirs(
                    role.artifact_dirs().iter().map(|s| s.to_string()).collect(),
                )
                .with_output_dir(role.output_dir());
            self.graph.add_task(task)?;

            if !role.produces_code() {
                continue;
            }

            let review_id = TaskId::from(format!("review-{}", id));
            let review_task = Task::new(
                review_id.clone(),
                AgentRole::Reviewer,
                format!("Review code produced by task {}", id),
            )
            .with_depends_on(vec![id.clone()])
            .with_artifact_dirs(vec![
                role.output_dir().to_string(),
                "contracts".to_string(),
            ])
            .with_output_dir("reviews")
            .with_review_task(id.clone());
            self.graph.add_task(review_task)?;
            self.graph.set_review_task(&id, &review_id)?;
        }

        Ok(())
    }

    /// Block until the named task reaches a terminal status.
    async fn poll_until_done(
        &mut self,
        cancel: &CancellationToken,
        task_id: &TaskId,
    ) -> Result<()> {
        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            self.render_dag();
            self.reap_finished();

            let task = self
                .graph
                .get(task_id)
                .ok_or_else(|| Error::TaskNotFound(task_id.clone()))?;

            match task.status {
                TaskStatus::Completed => return Ok(()),
                TaskStatus::Failed => {
                    return Err(Error::TaskFailed {
                        id: task_id.clone(),
                        error: task.error,
                    })
                }
                _ => {}
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// The main orchestration loop for the build+review phases.
    async fn poll_loop(&mut self, cancel: &CancellationToken) -> Result<()> {
        for wave in 1..=MAX_WAVES {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            swlog_debug!("[orchestrator] wave {}", wave);

            self.render_dag();
            self.reap_finished();
            self.process_reviews();

            if self.graph.all_completed() {
                swlog!("[orchestrator] all tasks completed");
                self.render_dag();
                return Ok(());
            }

            // On permanent failure, ask the user for feedback instead of
            // exiting
            if self.graph.has_failed() {
                self.render_dag();
                if !self.prompt_user_for_retry().await? {
                    return Err(Error::TasksFailed);
                }
                continue;
            }

            // Launch any newly-ready tasks
            self.dispatcher.launch_ready(&self.graph).await?;

            // Nothing running, nothing ready, not all completed: stuck
            if self.graph.running_count() == 0
                && self.graph.ready_tasks().is_empty()
                && !self.graph.all_completed()
            {
                return Err(Error::Deadlock);
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }

        Err(Error::MaxWavesExceeded(MAX_WAVES))
    }

    /// Spawn the architect in validation mode and act on its verdict.
    /// Rejection sends every code task through another build→review cycle;
    /// per-task attempts bound the number of rounds.
    async fn run_validation(&mut self, cancel: &CancellationToken) -> Result<()> {
        let val_id = TaskId::from(ARCHITECT_VALIDATE);
        let review_deps = self.review_task_ids();

        let task = Task::new(
            val_id.clone(),
            AgentRole::Architect,
            "Validate that all implementations honor the original contracts",
        )
        .with_depends_on(review_deps)
        .with_output_dir("reviews");
        self.graph.add_task(task)?;

        loop {
            self.dispatcher.launch_ready(&self.graph).await?;
            self.poll_until_done(cancel, &val_id).await?;

            let verdict_text = self
                .store
                .read("reviews", &format!("{}.md", ARCHITECT_VALIDATE))?;

            if parse_verdict(&verdict_text) == Verdict::Approved {
                self.log_event("architect validation: APPROVED");
                return Ok(());
            }

            let feedback = extract_feedback(&verdict_text);
            self.log_event("architect validation: REJECTED, re-entering build/review");
            self.apply_validation_rejection(&feedback);

            self.poll_loop(cancel).await?;
        }
    }

    /// Force every code task through another build+review cycle with the
    /// validator's feedback: each is rejected (attempts bumped), its paired
    /// reviewer reset, and the validation task itself reset to pending.
    pub fn apply_validation_rejection(&mut self, feedback: &str) {
        for t in self.graph.tasks() {
            if !t.role.produces_code() {
                continue;
            }
            let _ = self.graph.reject_task(&t.id, feedback);
            if let Some(review_id) = &t.review_task_id {
                let _ = self.graph.reset_to_pending(review_id);
            }
        }
        let _ = self
            .graph
            .reset_to_pending(&TaskId::from(ARCHITECT_VALIDATE));
    }

    fn review_task_ids(&self) -> Vec<TaskId> {
        self.graph
            .tasks()
            .into_iter()
            .filter(|t| t.role == AgentRole::Reviewer)
            .map(|t| t.id)
            .collect()
    }

    /// Check running tasks for completion, sentinel file first, pane death
    /// second. A task that wrote its outputs before its TUI terminated still
    /// counts even if the pane was reaped first. Completion does not mean
    /// success; reviewers and the validator decide that.
    pub fn reap_finished(&mut self) {
        for t in self.graph.tasks() {
            if t.status != TaskStatus::Running {
                continue;
            }

            if !t.output_dir.is_empty() && self.store.sentinel_exists(&t.output_dir) {
                let _ = self.graph.set_status(&t.id, TaskStatus::Completed);
                self.log_event(format!("task {} completed (sentinel)", t.id));
                continue;
            }

            if let Some(pane_id) = t.pane_id.as_deref() {
                if !Tmux::is_pane_alive(pane_id) {
                    let _ = self.graph.set_status(&t.id, TaskStatus::Completed);
                    self.log_event(format!("task {} completed (pane {} exited)", t.id, pane_id));
                }
            }
        }
    }

    /// Check completed reviewer tasks and either approve or reject the code
    /// task they reviewed.
    pub fn process_reviews(&mut self) {
        for t in self.graph.tasks() {
            if t.role != AgentRole::Reviewer || t.status != TaskStatus::Completed {
                continue;
            }
            let Some(code_id) = t.review_task_id.clone() else {
                continue;
            };
            let Some(reviewed) = self.graph.get(&code_id) else {
                continue;
            };
            if reviewed.status != TaskStatus::Completed {
                continue;
            }

            // Unreadable review file: the reviewer may still be writing it;
            // try again next tick
            let review_content = match self.store.read("reviews", &format!("{}.md", t.id)) {
                Ok(content) => content,
                Err(e) => {
                    swlog_warn!("[orchestrator] could not read review for {}: {}", t.id, e);
                    continue;
                }
            };

            if parse_verdict(&review_content) == Verdict::Approved {
                self.log_event(format!("review APPROVED: {}", code_id));
                continue;
            }

            let feedback = extract_feedback(&review_content);
            self.log_event(format!(
                "review REJECTED: {} (attempt {}/{})",
                code_id,
                reviewed.attempts + 1,
                MAX_ATTEMPTS
            ));

            let _ = self.graph.reject_task(&code_id, feedback);
            let _ = self.graph.reset_to_pending(&t.id);
        }
    }

    /// Show failed tasks and ask for feedback. Returns true if the user
    /// provided feedback and the failed tasks were reset for retry. This is
    /// the only path that zeroes attempts.
    async fn prompt_user_for_retry(&mut self) -> Result<bool> {
        println!("--- Failed Tasks ---");
        for t in self.graph.tasks() {
            if t.status != TaskStatus::Failed {
                continue;
            }
            println!("  {}: {}", t.id, t.error);
        }
        println!();
        print!("Enter feedback to retry failed tasks (or 'q' to quit): ");
        let _ = stdout().flush();

        let line = util::blocking(|| {
            let mut buf = String::new();
            std::io::stdin().read_line(&mut buf)?;
            Ok(buf)
        })
        .await?;
        let input = line.trim().to_string();

        if input.is_empty() || input == "q" {
            return Ok(false);
        }

        for t in self.graph.tasks() {
            if t.status != TaskStatus::Failed {
                continue;
            }
            self.graph.reset_for_retry(&t.id, input.clone())?;
            self.log_event(format!("user retry: {}", t.id));

            // Also reset the paired task if one exists
            if let Some(linked) = &t.review_task_id {
                let _ = self.graph.reset_to_pending(linked);
            }
        }

        Ok(true)
    }

    fn log_event(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        swlog!("[orchestrator] {}", msg);
        self.events.push(msg);
        if self.events.len() > MAX_EVENTS {
            let excess = self.events.len() - MAX_EVENTS;
            self.events.drain(..excess);
        }
    }

    /// Render the DAG status table: clear screen, one row per task in
    /// insertion order, recent events underneath.
    fn render_dag(&self) {
        let mut out = stdout();
        let _ = execute!(out, Clear(ClearType::All), MoveTo(0, 0));

        println!("=== Cathedral Swarm ===");
        println!();
        println!(
            "{:<30} {:<12} {:<8} {:<10}",
            "Task", "Status", "Pane", "Duration"
        );
        println!("{}", "-".repeat(65));

        let now = Utc::now().timestamp();
        for t in self.graph.tasks() {
            let pane = t.pane_id.as_deref().unwrap_or("-");
            let dur = match t.started_at {
                Some(start) => format_elapsed(now.saturating_sub(start)),
                None => "-".to_string(),
            };
            println!(
                "{:<30} {:<12} {:<8} {:<10}",
                t.id.as_str(),
                t.status.to_string(),
                pane,
                dur
            );
        }

        if !self.events.is_empty() {
            println!();
            println!("--- Events ---");
            for e in &self.events {
                println!("  {}", e);
            }
        }
        println!();
    }
}

fn format_elapsed(secs: i64) -> String {
    if secs >= 60 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}
