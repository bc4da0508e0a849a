// ABOUTME: Dependency graph over the tasks of a plan
// ABOUTME: Provides dependency queries, transitive dependents and cycle detection via petgraph

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::NodeIndex;
use petgraph::{Direction, Graph};
use std::collections::{HashMap, HashSet, VecDeque};

use super::model::Plan;

pub struct DependencyGraph {
    graph: Graph<String, ()>,
    task_indices: HashMap<String, NodeIndex>,
    order: Vec<String>,
}

impl DependencyGraph {
    /// Build the graph from a plan.
    ///
    /// Edges run from dependency to dependent. References to unknown tasks are
    /// left out; reporting them is the validator's job.
    pub fn from_plan(plan: &Plan) -> Self {
        let mut graph = Graph::new();
        let mut task_indices = HashMap::new();
        let mut order = Vec::with_capacity(plan.tasks.len());

        for task in &plan.tasks {
            if task_indices.contains_key(&task.id) {
                continue;
            }
            let node_index = graph.add_node(task.id.clone());
            task_indices.insert(task.id.clone(), node_index);
            order.push(task.id.clone());
        }

        for task in &plan.tasks {
            let task_node = task_indices[&task.id];

            for dependency in &task.dependencies {
                if let Some(&dep_node) = task_indices.get(dependency) {
                    graph.update_edge(dep_node, task_node, ());
                }
            }
        }

        Self {
            graph,
            task_indices,
            order,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Direct dependencies of a task
    pub fn get_dependencies(&self, task_id: &str) -> Vec<String> {
        self.neighbors(task_id, Direction::Incoming)
    }

    /// Tasks that depend directly on the given task
    pub fn get_dependents(&self, task_id: &str) -> Vec<String> {
        self.neighbors(task_id, Direction::Outgoing)
    }

    /// Every task reachable from `task_id` along dependent edges
    pub fn transitive_dependents(&self, task_id: &str) -> Vec<String> {
        let Some(&start) = self.task_indices.get(task_id) else {
            return Vec::new();
        };

        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            for neighbor in self.graph.neighbors_directed(current, Direction::Outgoing) {
                if neighbor != start && visited.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }

        self.order
            .iter()
            .filter(|id| visited.contains(&self.task_indices[*id]))
            .cloned()
            .collect()
    }

    /// Tasks without dependencies, in plan order
    pub fn get_root_tasks(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|id| {
                self.graph
                    .neighbors_directed(self.task_indices[*id], Direction::Incoming)
                    .next()
                    .is_none()
            })
            .cloned()
            .collect()
    }

    /// A dependency-respecting order of all tasks, or the tasks that sit on a cycle
    pub fn topological_order(&self) -> Result<Vec<String>, Vec<String>> {
        match toposort(&self.graph, None) {
            Ok(nodes) => Ok(nodes.into_iter().map(|n| self.graph[n].clone()).collect()),
            Err(_) => Err(self.cyclic_tasks()),
        }
    }

    pub fn has_cycle(&self) -> bool {
        toposort(&self.graph, None).is_err()
    }

    fn cyclic_tasks(&self) -> Vec<String> {
        let mut on_cycle = HashSet::new();

        for component in tarjan_scc(&self.graph) {
            let is_cycle = component.len() > 1
                || component
                    .first()
                    .map(|&n| self.graph.contains_edge(n, n))
                    .unwrap_or(false);

            if is_cycle {
                on_cycle.extend(component);
            }
        }

        self.order
            .iter()
            .filter(|id| on_cycle.contains(&self.task_indices[*id]))
            .cloned()
            .collect()
    }

    fn neighbors(&self, task_id: &str, direction: Direction) -> Vec<String> {
        let Some(&node_idx) = self.task_indices.get(task_id) else {
            return Vec::new();
        };

        let neighbors: HashSet<NodeIndex> =
            self.graph.neighbors_directed(node_idx, direction).collect();

        self.order
            .iter()
            .filter(|id| neighbors.contains(&self.task_indices[*id]))
            .cloned()
            .collect()
    }
}
