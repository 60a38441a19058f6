//! Dependency resolver - turns a task catalog into one total run order.
//!
//! Edges: `dep -> task` for every pre-dependency, `task -> dep` for every
//! post-dependency. The order is a topological sort with ties broken by
//! registration order, so the same catalog always yields the same order.
//! Nothing is persisted; the order is re-derived on every run.

mod graph;

pub use graph::DependencyGraph;

use crate::domain::{ConfigError, TaskName};
use crate::task::TaskCatalog;

/// Build the dependency graph of `catalog`, rejecting unknown names.
pub fn build_graph(catalog: &TaskCatalog) -> Result<DependencyGraph, ConfigError> {
    let mut graph = DependencyGraph::new();
    for task in catalog.iter() {
        graph.add_node(task.name());
    }

    let require = |task: &TaskName, dep: &TaskName| {
        if catalog.contains(dep) {
            Ok(())
        } else {
            Err(ConfigError::UnknownDependency {
                task: task.clone(),
                missing: dep.clone(),
            })
        }
    };

    for task in catalog.iter() {
        let name = task.name();
        for pre in task.pre_dependencies() {
            require(&name, &pre)?;
            graph.add_dependency(name.clone(), pre);
        }
        for post in task.post_dependencies() {
            require(&name, &post)?;
            graph.add_dependency(post, name.clone());
        }
    }
    Ok(graph)
}

/// Resolve the run order of `catalog`.
pub fn resolve(catalog: &TaskCatalog) -> Result<Vec<TaskName>, ConfigError> {
    build_graph(catalog)?
        .topological_order()
        .map_err(|members| ConfigError::CyclicDependency { members })
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use rstest::rstest;

    use super::*;
    use crate::domain::{Outcome, TaskError, task_names};
    use crate::task::{Task, TaskContext};

    struct Declared {
        name: String,
        pre: Vec<TaskName>,
        post: Vec<TaskName>,
    }

    #[async_trait]
    impl Task for Declared {
        fn name(&self) -> TaskName {
            self.name.as_str().into()
        }

        fn pre_dependencies(&self) -> Vec<TaskName> {
            self.pre.clone()
        }

        fn post_dependencies(&self) -> Vec<TaskName> {
            self.post.clone()
        }

        async fn migrate(&self, _ctx: &TaskContext) -> Result<Outcome, TaskError> {
            Ok(Outcome::Ok)
        }
    }

    /// `"b<a c>d"`: task b runs after a, task c runs before d.
    fn catalog(layout: &str) -> TaskCatalog {
        let mut catalog = TaskCatalog::new();
        for item in layout.split_whitespace() {
            let mut task = Declared {
                name: String::new(),
                pre: Vec::new(),
                post: Vec::new(),
            };
            let mut rest = item;
            let end = rest.find(['<', '>']).unwrap_or(rest.len());
            task.name = rest[..end].to_string();
            rest = &rest[end..];
            while let Some(marker) = rest.chars().next() {
                let body = &rest[1..];
                let end = body.find(['<', '>']).unwrap_or(body.len());
                let dep = TaskName::from(&body[..end]);
                if marker == '<' {
                    task.pre.push(dep);
                } else {
                    task.post.push(dep);
                }
                rest = &body[end..];
            }
            catalog.register(task).unwrap();
        }
        catalog
    }

    #[rstest]
    #[case::independent("a b", &["a", "b"])]
    #[case::pre_dependency("b<a a", &["a", "b"])]
    #[case::post_dependency("b a>b", &["a", "b"])]
    #[case::chain("idx<tables data<idx tables", &["tables", "idx", "data"])]
    #[case::ties_keep_registration("z m<a a", &["z", "a", "m"])]
    #[case::mixed("c<a b>c a", &["b", "a", "c"])]
    fn resolves_order(#[case] layout: &str, #[case] expected: &[&str]) {
        assert_eq!(resolve(&catalog(layout)).unwrap(), task_names(expected));
    }

    #[test]
    fn resolution_is_reproducible() {
        let layout = "d<b<c c<a b<a a";
        let first = resolve(&catalog(layout)).unwrap();
        for _ in 0..10 {
            assert_eq!(resolve(&catalog(layout)).unwrap(), first);
        }
        assert_eq!(first, task_names(&["a", "c", "b", "d"]));
    }

    #[test]
    fn cycle_is_reported_with_members() {
        let err = resolve(&catalog("a<b b<a")).unwrap_err();
        match err {
            ConfigError::CyclicDependency { members } => {
                assert!(members.contains(&"a".into()) && members.contains(&"b".into()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[rstest]
    #[case::through_post("a>b b>a")]
    #[case::self_dependency("a<a")]
    #[case::three_tasks("a<c b<a c<b free")]
    fn cycles_are_rejected(#[case] layout: &str) {
        let err = resolve(&catalog(layout)).unwrap_err();
        assert!(matches!(err, ConfigError::CyclicDependency { .. }));
    }

    #[rstest]
    #[case::pre("a<missing")]
    #[case::post("a>missing")]
    fn unknown_dependency(#[case] layout: &str) {
        let err = resolve(&catalog(layout)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownDependency { task, missing }
                if task.as_str() == "a" && missing.as_str() == "missing"
        ));
    }
}
