/// In-memory task dependency graph: cycle detection, blocking closure, and
/// critical-path computation over a user's tasks.
use crate::domain::{CanonicalTaskKind, DependencyType, Task, TaskDependency, TaskStatus};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct CriticalPath {
    /// Task ids along the longest incomplete chain, leaf first, ending at
    /// the final-submit task.
    pub task_ids: Vec<i64>,
    pub total_hours: f64,
    pub available_hours: f64,
    /// Whether the chain no longer fits in the remaining study time.
    pub exceeds_available: bool,
}

pub struct TaskGraph {
    tasks: HashMap<i64, Task>,
    /// task_id → its prerequisites (depends-on edges).
    prerequisites: HashMap<i64, Vec<(i64, DependencyType)>>,
    /// task_id → tasks that depend on it.
    dependents: HashMap<i64, Vec<(i64, DependencyType)>>,
}

impl TaskGraph {
    pub fn new(tasks: Vec<Task>, dependencies: Vec<TaskDependency>) -> Self {
        let tasks: HashMap<i64, Task> = tasks.into_iter().map(|t| (t.id, t)).collect();
        let mut prerequisites: HashMap<i64, Vec<(i64, DependencyType)>> = HashMap::new();
        let mut dependents: HashMap<i64, Vec<(i64, DependencyType)>> = HashMap::new();

        for dep in dependencies {
            prerequisites
                .entry(dep.task_id)
                .or_default()
                .push((dep.depends_on_task_id, dep.dependency_type));
            dependents
                .entry(dep.depends_on_task_id)
                .or_default()
                .push((dep.task_id, dep.dependency_type));
        }

        Self {
            tasks,
            prerequisites,
            dependents,
        }
    }

    pub fn get(&self, task_id: i64) -> Option<&Task> {
        self.tasks.get(&task_id)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Whether adding edge `task → depends_on` would close a cycle, i.e.
    /// `task` is already reachable from `depends_on` via depends-on edges.
    pub fn would_create_cycle(&self, task_id: i64, depends_on_task_id: i64) -> bool {
        if task_id == depends_on_task_id {
            return true;
        }
        let mut stack = vec![depends_on_task_id];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == task_id {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(prereqs) = self.prerequisites.get(&current) {
                stack.extend(prereqs.iter().map(|(id, _)| *id));
            }
        }
        false
    }

    /// Any cycle currently in the graph, as the list of task ids involved.
    pub fn find_cycle(&self) -> Option<Vec<i64>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let mut color: HashMap<i64, Color> =
            self.tasks.keys().map(|id| (*id, Color::White)).collect();

        fn visit(
            node: i64,
            prerequisites: &HashMap<i64, Vec<(i64, DependencyType)>>,
            color: &mut HashMap<i64, Color>,
            path: &mut Vec<i64>,
        ) -> Option<Vec<i64>> {
            color.insert(node, Color::Gray);
            path.push(node);
            if let Some(prereqs) = prerequisites.get(&node) {
                for (next, _) in prereqs {
                    match color.get(next) {
                        Some(Color::Gray) => {
                            let start = path.iter().position(|id| id == next).unwrap_or(0);
                            return Some(path[start..].to_vec());
                        }
                        Some(Color::White) => {
                            if let Some(cycle) = visit(*next, prerequisites, color, path) {
                                return Some(cycle);
                            }
                        }
                        _ => {}
                    }
                }
            }
            color.insert(node, Color::Black);
            path.pop();
            None
        }

        let ids: Vec<i64> = self.tasks.keys().copied().collect();
        for id in ids {
            if color.get(&id) == Some(&Color::White) {
                let mut path = Vec::new();
                if let Some(cycle) = visit(id, &self.prerequisites, &mut color, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    /// Hard (blocks-type) prerequisites of a task that are not yet
    /// complete or skipped.
    pub fn unmet_hard_prerequisites(&self, task_id: i64) -> Vec<i64> {
        self.prerequisites
            .get(&task_id)
            .map(|prereqs| {
                prereqs
                    .iter()
                    .filter(|(_, dep_type)| *dep_type == DependencyType::Blocks)
                    .filter(|(id, _)| {
                        self.tasks
                            .get(id)
                            .map(|t| !t.status.satisfies_dependency())
                            .unwrap_or(false)
                    })
                    .map(|(id, _)| *id)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Effective status: `blocked` iff at least one blocks-type predecessor
    /// is not complete/skipped; otherwise the stored status.
    pub fn effective_status(&self, task_id: i64) -> Option<TaskStatus> {
        let task = self.tasks.get(&task_id)?;
        if task.status.is_open() && !self.unmet_hard_prerequisites(task_id).is_empty() {
            Some(TaskStatus::Blocked)
        } else {
            Some(task.status)
        }
    }

    /// All tasks whose dependency closure is unsatisfied.
    pub fn blocked_task_ids(&self) -> Vec<i64> {
        let mut blocked: Vec<i64> = self
            .tasks
            .keys()
            .filter(|id| self.effective_status(**id) == Some(TaskStatus::Blocked))
            .copied()
            .collect();
        blocked.sort_unstable();
        blocked
    }

    /// Tasks that stopped being blocked by `completed_id` completing. The
    /// graph must already reflect the completion: a dependent counts when
    /// the completed task was among its hard prerequisites and none remain
    /// unmet.
    pub fn unblocked_by_completion(&self, completed_id: i64) -> Vec<i64> {
        self.dependents
            .get(&completed_id)
            .map(|deps| {
                deps.iter()
                    .filter(|(_, dep_type)| *dep_type == DependencyType::Blocks)
                    .filter(|(dependent, _)| {
                        self.unmet_hard_prerequisites(*dependent).is_empty()
                    })
                    .map(|(dependent, _)| *dependent)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Sum of estimated hours over incomplete, non-skipped tasks.
    pub fn remaining_hours(&self) -> f64 {
        self.tasks
            .values()
            .filter(|t| t.status.is_open())
            .map(|t| t.estimated_hours)
            .sum()
    }

    /// Longest incomplete chain (by estimated hours) ending at the
    /// final-submit task, following hard edges only. Advisory edges never
    /// extend the path.
    pub fn critical_path(
        &self,
        deadline: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        productive_hours_per_day: f64,
    ) -> Option<CriticalPath> {
        let final_task = self
            .tasks
            .values()
            .find(|t| t.canonical_kind == CanonicalTaskKind::FinalSubmit)?;

        // Longest-path DP over the prerequisite DAG.
        fn longest(
            node: i64,
            graph: &TaskGraph,
            memo: &mut HashMap<i64, (f64, Vec<i64>)>,
        ) -> (f64, Vec<i64>) {
            if let Some(cached) = memo.get(&node) {
                return cached.clone();
            }
            let own_hours = graph
                .tasks
                .get(&node)
                .filter(|t| t.status.is_open())
                .map(|t| t.estimated_hours)
                .unwrap_or(0.0);

            let mut best: (f64, Vec<i64>) = (0.0, Vec::new());
            if let Some(prereqs) = graph.prerequisites.get(&node) {
                for (prereq, dep_type) in prereqs {
                    if *dep_type != DependencyType::Blocks {
                        continue;
                    }
                    let candidate = longest(*prereq, graph, memo);
                    if candidate.0 > best.0 {
                        best = candidate;
                    }
                }
            }

            let mut path = best.1;
            path.push(node);
            let result = (best.0 + own_hours, path);
            memo.insert(node, result.clone());
            result
        }

        let mut memo = HashMap::new();
        let (total_hours, task_ids) = longest(final_task.id, self, &mut memo);

        let available_hours = match deadline {
            Some(deadline) => {
                let hours = (deadline - now).num_minutes() as f64 / 60.0;
                (hours / 24.0 * productive_hours_per_day).max(0.0)
            }
            None => f64::INFINITY,
        };

        Some(CriticalPath {
            task_ids,
            total_hours,
            available_hours,
            exceeds_available: total_hours > available_hours,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
