//! Thread-safe task DAG with insertion-order enumeration.
//!
//! The graph is the only shared mutable object in a run. Dependencies must
//! already exist when a task is inserted, which keeps the graph acyclic by
//! construction; edge insertion is still cycle-checked. All reads take the
//! shared lock, all mutations the exclusive lock, and no operation suspends.

use std::collections::HashMap;

use parking_lot::RwLock;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::core::task::{Task, TaskId, TaskStatus, MAX_ATTEMPTS};
use crate::error::{Error, Result};

struct Dag {
    /// Nodes are tasks, edges point from a dependency to its dependent.
    graph: DiGraph<Task, ()>,
    /// TaskId to NodeIndex for fast lookups.
    index: HashMap<TaskId, NodeIndex>,
    /// Insertion order of task ids, the canonical enumeration order.
    order: Vec<TaskId>,
}

impl Dag {
    fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn node(&self, id: &TaskId) -> Result<NodeIndex> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| Error::TaskNotFound(id.clone()))
    }

    fn task(&self, id: &TaskId) -> Result<&Task> {
        let idx = self.node(id)?;
        Ok(&self.graph[idx])
    }

    fn task_mut(&mut self, id: &TaskId) -> Result<&mut Task> {
        let idx = self.node(id)?;
        Ok(&mut self.graph[idx])
    }

    fn deps_resolved(&self, idx: NodeIndex) -> bool {
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .all(|dep| self.graph[dep].status == TaskStatus::Completed)
    }
}

pub struct TaskGraph {
    inner: RwLock<Dag>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Dag::new()),
        }
    }

    /// Insert a task. Fails without mutating the graph if the id already
    /// exists or any dependency has not been inserted yet.
    pub fn add_task(&self, mut task: Task) -> Result<()> {
        let mut dag = self.inner.write();

        if dag.index.contains_key(&task.id) {
            return Err(Error::TaskExists(task.id));
        }
        for dep in &task.depends_on {
            if !dag.index.contains_key(dep) {
                return Err(Error::DependencyNotFound {
                    task: task.id.clone(),
                    dep: dep.clone(),
                });
            }
        }

        task.status = TaskStatus::Pending;
        let id = task.id.clone();
        let deps = task.depends_on.clone();
        let idx = dag.graph.add_node(task);
        dag.index.insert(id.clone(), idx);
        dag.order.push(id.clone());

        for dep in &deps {
            let dep_idx = dag.index[dep];
            let edge = dag.graph.add_edge(dep_idx, idx, ());
            if is_cyclic_directed(&dag.graph) {
                dag.graph.remove_edge(edge);
                dag.graph.remove_node(idx);
                dag.index.remove(&id);
                dag.order.pop();
                return Err(Error::DependencyCycle {
                    from: dep.clone(),
                    to: id,
                });
            }
        }
        Ok(())
    }

    /// Pending tasks whose dependencies are all completed, in insertion
    /// order. The order is the deterministic tie-break when several tasks
    /// become ready in the same wave.
    pub fn ready_tasks(&self) -> Vec<Task> {
        let dag = self.inner.read();
        dag.order
            .iter()
            .filter_map(|id| {
                let idx = *dag.index.get(id)?;
                let task = &dag.graph[idx];
                if task.status == TaskStatus::Pending && dag.deps_resolved(idx) {
                    Some(task.clone())
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn get(&self, id: &TaskId) -> Option<Task> {
        let dag = self.inner.read();
        dag.task(id).ok().cloned()
    }

    /// All tasks in insertion order.
    pub fn tasks(&self) -> Vec<Task> {
        let dag = self.inner.read();
        dag.order
            .iter()
            .filter_map(|id| dag.task(id).ok().cloned())
            .collect()
    }

    pub fn set_status(&self, id: &TaskId, status: TaskStatus) -> Result<()> {
        self.update(id, |t| t.status = status)
    }

    pub fn set_result(&self, id: &TaskId, result: impl Into<String>) -> Result<()> {
        let result = result.into();
        self.update(id, |t| t.result = result)
    }

    pub fn set_error(&self, id: &TaskId, error: impl Into<String>) -> Result<()> {
        let error = error.into();
        self.update(id, |t| t.error = error)
    }

    pub fn set_feedback(&self, id: &TaskId, feedback: impl Into<String>) -> Result<()> {
        let feedback = feedback.into();
        self.update(id, |t| t.feedback = feedback)
    }

    pub fn set_pane_id(&self, id: &TaskId, pane_id: impl Into<String>) -> Result<()> {
        let pane_id = pane_id.into();
        self.update(id, |t| t.pane_id = Some(pane_id))
    }

    /// Wire the mutual back-edge between a code task and its reviewer.
    pub fn set_review_task(&self, id: &TaskId, review_id: &TaskId) -> Result<()> {
        let review_id = review_id.clone();
        self.update(id, |t| t.review_task_id = Some(review_id))
    }

    /// Transition to running, recording the pane id and start time.
    pub fn mark_running(&self, id: &TaskId, pane_id: impl Into<String>) -> Result<()> {
        let pane_id = pane_id.into();
        self.update(id, |t| t.start(pane_id))
    }

    /// Mark a task as failed with an error message.
    pub fn mark_failed(&self, id: &TaskId, error: impl Into<String>) -> Result<()> {
        let error = error.into();
        self.update(id, |t| t.fail(error))
    }

    /// Record a rejection: bump attempts, store the feedback, and either
    /// send the task back to pending or, once attempts run out, fail it.
    pub fn reject_task(&self, id: &TaskId, feedback: impl Into<String>) -> Result<()> {
        let feedback = feedback.into();
        self.update(id, |t| {
            t.attempts += 1;
            t.feedback = feedback;
            if t.attempts >= MAX_ATTEMPTS {
                t.status = TaskStatus::Failed;
                t.error = format!("rejected {} times, giving up", t.attempts);
            } else {
                t.status = TaskStatus::Pending;
            }
        })
    }

    /// User-driven retry: the only path that zeroes attempts.
    pub fn reset_for_retry(&self, id: &TaskId, feedback: impl Into<String>) -> Result<()> {
        let feedback = feedback.into();
        self.update(id, |t| {
            t.attempts = 0;
            t.status = TaskStatus::Pending;
            t.error.clear();
            t.feedback = feedback;
        })
    }

    /// Send a task back to pending with its result cleared, so it re-runs
    /// after whatever it depends on is retried.
    pub fn reset_to_pending(&self, id: &TaskId) -> Result<()> {
        self.update(id, |t| {
            t.status = TaskStatus::Pending;
            t.result.clear();
        })
    }

    pub fn all_completed(&self) -> bool {
        let dag = self.inner.read();
        dag.graph
            .node_weights()
            .all(|t| t.status == TaskStatus::Completed)
    }

    pub fn has_failed(&self) -> bool {
        let dag = self.inner.read();
        dag.graph
            .node_weights()
            .any(|t| t.status == TaskStatus::Failed)
    }

    pub fn running_count(&self) -> usize {
        let dag = self.inner.read();
        dag.graph
            .node_weights()
            .filter(|t| t.status == TaskStatus::Running)
            .count()
    }

    pub fn len(&self) -> usize {
        self.inner.read().graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn update<F: FnOnce(&mut Task)>(&self, id: &TaskId, f: F) -> Result<()> {
        let mut dag = self.inner.write();
        f(dag.task_mut(id)?);
        Ok(())
    }
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dag = self.inner.read();
        f.debug_struct("TaskGraph")
            .field("tasks", &dag.graph.node_count())
            .field("dependencies", &dag.graph.edge_count())
            .finish()
    }
}
