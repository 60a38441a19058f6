//! Dependency graph over task names.
//!
//! Design:
//! - Forward edges: task -> tasks it depends on (must run first)
//! - Reverse edges: task -> tasks that depend on it
//! - Invariant: edges and reverse_edges are kept in sync
//! - Every node has a registration position; iteration always follows it,
//!   so cycle reports and orderings are reproducible

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::domain::TaskName;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Dependency graph for tracking task ordering constraints.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Nodes in registration order.
    nodes: Vec<TaskName>,
    positions: HashMap<TaskName, usize>,

    /// Forward edges: task -> tasks it depends on
    edges: HashMap<TaskName, HashSet<TaskName>>,

    /// Reverse edges: task -> tasks waiting for it
    reverse_edges: HashMap<TaskName, HashSet<TaskName>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node; returns its position. Re-adding keeps the first position.
    pub fn add_node(&mut self, name: TaskName) -> usize {
        if let Some(&pos) = self.positions.get(&name) {
            return pos;
        }
        let pos = self.nodes.len();
        self.positions.insert(name.clone(), pos);
        self.nodes.push(name);
        pos
    }

    /// Add a dependency: `task` depends on `depends_on`.
    ///
    /// `add_dependency(b, a)` means "B runs after A":
    /// - edges: B -> {A}
    /// - reverse_edges: A -> {B}
    pub fn add_dependency(&mut self, task: TaskName, depends_on: TaskName) {
        self.add_node(task.clone());
        self.add_node(depends_on.clone());
        self.edges
            .entry(task.clone())
            .or_default()
            .insert(depends_on.clone());
        self.reverse_edges.entry(depends_on).or_default().insert(task);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn position(&self, name: &TaskName) -> usize {
        self.positions.get(name).copied().unwrap_or(usize::MAX)
    }

    fn sorted(&self, set: Option<&HashSet<TaskName>>) -> Vec<TaskName> {
        let mut names: Vec<TaskName> = set.map(|s| s.iter().cloned().collect()).unwrap_or_default();
        names.sort_by_key(|n| self.position(n));
        names
    }

    pub fn has_dependencies(&self, task: &TaskName) -> bool {
        self.edges.get(task).is_some_and(|deps| !deps.is_empty())
    }

    /// Dependencies of `task` in registration order.
    pub fn get_dependencies(&self, task: &TaskName) -> Vec<TaskName> {
        self.sorted(self.edges.get(task))
    }

    /// Tasks waiting for `task`, in registration order.
    pub fn get_waiting_tasks(&self, task: &TaskName) -> Vec<TaskName> {
        self.sorted(self.reverse_edges.get(task))
    }

    /// Detect a cycle with a three-color depth-first search.
    ///
    /// Returns the first cycle found, closed by repeating its first member
    /// (`[A, B, A]`), or `None` if the graph is acyclic.
    pub fn detect_cycle(&self) -> Option<Vec<TaskName>> {
        let mut colors = vec![Color::White; self.nodes.len()];
        let mut path = Vec::new();

        for start in 0..self.nodes.len() {
            if colors[start] == Color::White
                && let Some(cycle) = self.dfs_cycle(start, &mut colors, &mut path)
            {
                return Some(cycle);
            }
        }
        None
    }

    fn dfs_cycle(&self, node: usize, colors: &mut [Color], path: &mut Vec<usize>) -> Option<Vec<TaskName>> {
        colors[node] = Color::Gray;
        path.push(node);

        for dep in self.get_dependencies(&self.nodes[node]) {
            let dep = self.position(&dep);
            match colors[dep] {
                Color::Gray => {
                    let from = path.iter().position(|&n| n == dep).unwrap_or(0);
                    let mut cycle: Vec<TaskName> =
                        path[from..].iter().map(|&n| self.nodes[n].clone()).collect();
                    cycle.push(self.nodes[dep].clone());
                    return Some(cycle);
                }
                Color::White => {
                    if let Some(cycle) = self.dfs_cycle(dep, colors, path) {
                        return Some(cycle);
                    }
                }
                Color::Black => {}
            }
        }

        colors[node] = Color::Black;
        path.pop();
        None
    }

    /// Topological order (Kahn), ties broken by registration position.
    ///
    /// On failure returns the members of a cycle.
    pub fn topological_order(&self) -> Result<Vec<TaskName>, Vec<TaskName>> {
        let mut indegree: Vec<usize> = self
            .nodes
            .iter()
            .map(|n| self.edges.get(n).map_or(0, HashSet::len))
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = indegree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(pos, _)| Reverse(pos))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(Reverse(pos)) = ready.pop() {
            let name = &self.nodes[pos];
            order.push(name.clone());
            for waiting in self.get_waiting_tasks(name) {
                let w = self.position(&waiting);
                indegree[w] -= 1;
                if indegree[w] == 0 {
                    ready.push(Reverse(w));
                }
            }
        }

        if order.len() == self.nodes.len() {
            return Ok(order);
        }
        Err(self.detect_cycle().unwrap_or_else(|| {
            self.nodes
                .iter()
                .filter(|n| !order.contains(n))
                .cloned()
                .collect()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(s: &str) -> TaskName {
        TaskName::from(s)
    }

    #[test]
    fn new_graph_is_empty() {
        let graph = DependencyGraph::new();
        assert!(graph.is_empty());
        assert!(!graph.has_dependencies(&n("a")));
    }

    #[test]
    fn add_dependency_creates_both_edges() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(n("b"), n("a")); // B depends on A

        assert!(graph.has_dependencies(&n("b")));
        assert!(!graph.has_dependencies(&n("a")));
        assert_eq!(graph.get_dependencies(&n("b")), vec![n("a")]);
        assert_eq!(graph.get_waiting_tasks(&n("a")), vec![n("b")]);
    }

    #[test]
    fn dependencies_follow_registration_order() {
        let mut graph = DependencyGraph::new();
        for name in ["z", "y", "x", "c"] {
            graph.add_node(n(name));
        }
        graph.add_dependency(n("c"), n("x"));
        graph.add_dependency(n("c"), n("z"));
        graph.add_dependency(n("c"), n("y"));

        assert_eq!(graph.get_dependencies(&n("c")), vec![n("z"), n("y"), n("x")]);
    }

    #[test]
    fn detect_simple_cycle() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(n("a"), n("b"));
        graph.add_dependency(n("b"), n("a"));

        assert_eq!(graph.detect_cycle(), Some(vec![n("a"), n("b"), n("a")]));
    }

    #[test]
    fn detect_self_dependency() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(n("a"), n("a"));
        assert_eq!(graph.detect_cycle(), Some(vec![n("a"), n("a")]));
    }

    #[test]
    fn detect_longer_cycle() {
        let mut graph = DependencyGraph::new();
        // B -> C -> D -> B, reachable from A
        graph.add_dependency(n("b"), n("a"));
        graph.add_dependency(n("c"), n("b"));
        graph.add_dependency(n("d"), n("c"));
        graph.add_dependency(n("b"), n("d"));

        let cycle = graph.detect_cycle().unwrap();
        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 4);
        assert!(!cycle.contains(&n("a")));
    }

    #[test]
    fn dag_with_diamond_has_no_cycle() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(n("b"), n("a"));
        graph.add_dependency(n("c"), n("b"));
        graph.add_dependency(n("c"), n("a"));

        assert!(graph.detect_cycle().is_none());
    }

    #[test]
    fn complex_dag_with_cross_edges() {
        let mut graph = DependencyGraph::new();
        //     A
        //    / \
        //   B   C
        //   |\ /|
        //   | X |
        //   |/ \|
        //   D   E
        graph.add_dependency(n("b"), n("a"));
        graph.add_dependency(n("c"), n("a"));
        graph.add_dependency(n("d"), n("b"));
        graph.add_dependency(n("e"), n("b"));
        graph.add_dependency(n("d"), n("c"));
        graph.add_dependency(n("e"), n("c"));

        assert!(graph.detect_cycle().is_none());
        assert_eq!(
            graph.topological_order().unwrap(),
            vec![n("a"), n("b"), n("c"), n("d"), n("e")]
        );
    }

    #[test]
    fn topological_order_breaks_ties_by_registration() {
        let mut graph = DependencyGraph::new();
        for name in ["c", "b", "a"] {
            graph.add_node(n(name));
        }
        assert_eq!(graph.topological_order().unwrap(), vec![n("c"), n("b"), n("a")]);

        graph.add_dependency(n("c"), n("a"));
        assert_eq!(graph.topological_order().unwrap(), vec![n("b"), n("a"), n("c")]);
    }

    #[test]
    fn topological_order_reports_cycle() {
        let mut graph = DependencyGraph::new();
        graph.add_node(n("free"));
        graph.add_dependency(n("a"), n("b"));
        graph.add_dependency(n("b"), n("a"));

        let members = graph.topological_order().unwrap_err();
        assert!(members.contains(&n("a")) && members.contains(&n("b")));
        assert!(!members.contains(&n("free")));
    }
}
