//! Stateless validation of pipeline step lists.
//!
//! Rules are checked in order:
//!
//! 1. Every step has a non-empty `id`
//! 2. Every step has a non-empty `type`
//! 3. Step ids are unique within the pipeline
//! 4. Every `depends_on` entry names a step in the list
//! 5. The dependency graph is acyclic
//!
//! Issues accumulate so callers see everything wrong at once; cycle
//! detection is skipped while the graph is structurally broken, since it
//! needs resolvable references to walk. An empty step list is valid here —
//! `pipeline.create` separately requires at least one step.
//!
//! Cycle detection is depth-first search with a recursion stack, reporting
//! the exact cycle path (`a -> b -> a`) for debugging.

use std::collections::{HashMap, HashSet};

use crate::pipeline::types::Step;

/// Outcome of validating a step list. `valid` iff `issues` is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepValidation {
    pub valid: bool,
    pub issues: Vec<String>,
}

/// Validates a step list. Pure and deterministic; multiple rules may fire.
pub fn validate_steps(steps: &[Step]) -> StepValidation {
    let mut issues = Vec::new();

    for (index, step) in steps.iter().enumerate() {
        if step.id.is_empty() {
            issues.push(format!("step {} has an empty id", index));
        }
        if step.step_type.is_empty() {
            issues.push(format!(
                "step {} has an empty type",
                if step.id.is_empty() {
                    index.to_string()
                } else {
                    format!("'{}'", step.id)
                }
            ));
        }
    }

    let mut seen_ids = HashSet::new();
    for step in steps {
        if !step.id.is_empty() && !seen_ids.insert(step.id.as_str()) {
            issues.push(format!("duplicate step id: '{}'", step.id));
        }
    }

    let mut unresolved = false;
    for step in steps {
        for dependency in &step.depends_on {
            if !seen_ids.contains(dependency.as_str()) {
                issues.push(format!(
                    "step '{}' depends on '{}' which does not exist",
                    step.id, dependency
                ));
                unresolved = true;
            }
        }
    }

    // Cycle detection needs a resolvable graph.
    if issues.is_empty() || !unresolved {
        if let Some(cycle) = find_cycle(steps) {
            issues.push(format!(
                "circular dependency detected: {}",
                cycle.join(" -> ")
            ));
        }
    }

    StepValidation {
        valid: issues.is_empty(),
        issues,
    }
}

/// DFS with a recursion stack; returns the cycle path when one exists.
fn find_cycle(steps: &[Step]) -> Option<Vec<String>> {
    // Adjacency list: step -> steps it depends on. Walking dependency
    // edges finds the same cycles as walking dependent edges.
    let mut graph: HashMap<&str, Vec<&str>> = HashMap::new();
    for step in steps {
        graph.insert(
            step.id.as_str(),
            step.depends_on.iter().map(String::as_str).collect(),
        );
    }

    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    for step in steps {
        if !visited.contains(step.id.as_str()) {
            if let Some(cycle) = dfs_cycle(
                step.id.as_str(),
                &graph,
                &mut visited,
                &mut rec_stack,
                &mut path,
            ) {
                return Some(cycle);
            }
        }
    }
    None
}

fn dfs_cycle<'a>(
    node: &'a str,
    graph: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    rec_stack: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    visited.insert(node);
    rec_stack.insert(node);
    path.push(node);

    if let Some(neighbors) = graph.get(node) {
        for &neighbor in neighbors {
            if !visited.contains(neighbor) {
                if let Some(cycle) = dfs_cycle(neighbor, graph, visited, rec_stack, path) {
                    return Some(cycle);
                }
            } else if rec_stack.contains(neighbor) {
                // Back edge: extract the cycle from where it starts.
                let cycle_start = path.iter().position(|n| *n == neighbor).unwrap_or(0);
                let mut cycle: Vec<String> =
                    path[cycle_start..].iter().map(|n| n.to_string()).collect();
                cycle.push(neighbor.to_string());
                return Some(cycle);
            }
        }
    }

    rec_stack.remove(node);
    path.pop();
    None
}
