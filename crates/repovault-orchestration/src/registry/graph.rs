//! Topological ordering and cycle detection over entity dependencies

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{OrchestrationError, Result};

/// Produces a dependency-respecting order over `dependencies`, a map
/// from entity name to the names it depends on.
///
/// Ties are broken alphabetically, so identical inputs always yield the
/// identical order. When a cycle exists no partial order is returned;
/// the error names every entity that could not be placed, which covers
/// the cycle itself plus anything downstream of it.
pub fn topological_sort(dependencies: &BTreeMap<String, Vec<String>>) -> Result<Vec<String>> {
    let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for (entity, deps) in dependencies {
        in_degree.entry(entity.as_str()).or_insert(0);
        for dep in deps {
            if !dependencies.contains_key(dep.as_str()) {
                return Err(OrchestrationError::configuration(format!(
                    "entity `{entity}` depends on unknown entity `{dep}`"
                )));
            }
            *in_degree.entry(entity.as_str()).or_insert(0) += 1;
            dependents
                .entry(dep.as_str())
                .or_default()
                .push(entity.as_str());
        }
    }

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(name, _)| *name)
        .collect();
    let mut order = Vec::with_capacity(dependencies.len());

    while let Some(&next) = ready.iter().next() {
        ready.remove(next);
        order.push(next.to_string());

        if let Some(children) = dependents.get(next) {
            for child in children {
                if let Some(degree) = in_degree.get_mut(child) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(child);
                    }
                }
            }
        }
    }

    if order.len() != dependencies.len() {
        let unplaced: Vec<String> = in_degree
            .iter()
            .filter(|(_, degree)| **degree > 0)
            .map(|(name, _)| name.to_string())
            .collect();
        return Err(OrchestrationError::cycle(unplaced));
    }

    Ok(order)
}

/// Collects every entity that directly or transitively depends on `root`
pub fn transitive_dependents(
    dependencies: &BTreeMap<String, Vec<String>>,
    root: &str,
) -> BTreeSet<String> {
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (entity, deps) in dependencies {
        for dep in deps {
            dependents
                .entry(dep.as_str())
                .or_default()
                .push(entity.as_str());
        }
    }

    let mut found = BTreeSet::new();
    let mut stack = vec![root];
    while let Some(current) = stack.pop() {
        if let Some(children) = dependents.get(current) {
            for &child in children {
                if found.insert(child.to_string()) {
                    stack.push(child);
                }
            }
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(name, deps)| {
                (
                    name.to_string(),
                    deps.iter().map(|d| d.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_sort_places_dependencies_first() {
        let deps = graph(&[
            ("comments", &["issues"]),
            ("issues", &["labels"]),
            ("labels", &[]),
        ]);

        let order = topological_sort(&deps).unwrap();
        assert_eq!(order, vec!["labels", "issues", "comments"]);
    }

    #[test]
    fn test_sort_breaks_ties_alphabetically() {
        let deps = graph(&[("zebra", &[]), ("alpha", &[]), ("mango", &[])]);

        let order = topological_sort(&deps).unwrap();
        assert_eq!(order, vec!["alpha", "mango", "zebra"]);
    }

    #[test]
    fn test_sort_is_deterministic_for_diamonds() {
        let deps = graph(&[
            ("base", &[]),
            ("left", &["base"]),
            ("right", &["base"]),
            ("top", &["left", "right"]),
        ]);

        let first = topological_sort(&deps).unwrap();
        let second = topological_sort(&deps).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, vec!["base", "left", "right", "top"]);
    }

    #[test]
    fn test_sort_rejects_cycles_without_partial_order() {
        let deps = graph(&[("a", &["b"]), ("b", &["a"]), ("c", &[])]);

        let error = topological_sort(&deps).unwrap_err();
        match error {
            OrchestrationError::Cycle { members } => {
                assert_eq!(members, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected cycle error, got {other}"),
        }
    }

    #[test]
    fn test_sort_rejects_self_dependency() {
        let deps = graph(&[("a", &["a"])]);

        let error = topological_sort(&deps).unwrap_err();
        assert!(error.to_string().contains('a'));
    }

    #[test]
    fn test_sort_rejects_unknown_dependency() {
        let deps = graph(&[("issues", &["labels"])]);

        let error = topological_sort(&deps).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Configuration error: entity `issues` depends on unknown entity `labels`"
        );
    }

    #[test]
    fn test_transitive_dependents_walks_the_closure() {
        let deps = graph(&[
            ("labels", &[]),
            ("issues", &["labels"]),
            ("comments", &["issues"]),
            ("pull_requests", &["labels"]),
            ("releases", &[]),
        ]);

        let dependents = transitive_dependents(&deps, "labels");
        let names: Vec<&str> = dependents.iter().map(String::as_str).collect();
        assert_eq!(names, vec!["comments", "issues", "pull_requests"]);

        assert!(transitive_dependents(&deps, "releases").is_empty());
    }
}
