//! Dependency resolution into execution batches.
//!
//! Steps are partitioned into an ordered list of batches. Every step in a
//! batch depends only on steps in strictly earlier batches, so a batch can
//! run concurrently once its predecessors have settled.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{ChainError, Result};
use crate::steps::Step;

/// A set of steps with no dependencies among themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionBatch {
    /// Zero-based position of the batch in the run.
    pub index: usize,
    /// Steps in declaration order.
    pub steps: Vec<Step>,
}

impl ExecutionBatch {
    /// Ids of the steps in this batch.
    pub fn ids(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Represents the dependency relationships between steps.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Step ids in declaration order.
    order: Vec<String>,
    /// Map of step id to its declared dependencies.
    dependencies: HashMap<String, Vec<String>>,
    /// Whether any step declared `after`, even with no ids.
    declared: bool,
}

impl DependencyGraph {
    /// Build the graph for a list of normalized steps.
    ///
    /// Dependencies on unknown ids are accepted here and surface as stuck
    /// steps during batching.
    pub fn from_steps(steps: &[Step]) -> Result<Self> {
        let mut order = Vec::with_capacity(steps.len());
        let mut dependencies = HashMap::with_capacity(steps.len());

        for step in steps {
            if dependencies
                .insert(step.id.clone(), step.dependencies().to_vec())
                .is_some()
            {
                return Err(ChainError::DuplicateStepId {
                    id: step.id.clone(),
                });
            }
            order.push(step.id.clone());
        }

        Ok(Self {
            order,
            dependencies,
            declared: steps.iter().any(Step::declares_dependencies),
        })
    }

    /// Get the declared dependencies of a step.
    pub fn dependencies_of(&self, step: &str) -> Option<&[String]> {
        self.dependencies.get(step).map(Vec::as_slice)
    }

    /// Whether any step declared `after`. An empty declaration counts.
    pub fn has_dependencies(&self) -> bool {
        self.declared
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Check if a step is ready to run given completed steps.
    pub fn is_ready(&self, step: &str, completed: &HashSet<String>) -> bool {
        match self.dependencies.get(step) {
            None => true,
            Some(deps) => deps.iter().all(|d| completed.contains(d)),
        }
    }

    /// Returns groups of step ids that can execute in parallel.
    ///
    /// When no step declares `after`, every step forms its own group, in
    /// declaration order. Otherwise each group holds the not-yet-scheduled
    /// steps whose dependencies are all satisfied by previous groups.
    ///
    /// Returns `Dependency` naming every unscheduled step when no further
    /// step can become ready, with the cycle path if one exists.
    pub fn parallel_groups(&self) -> Result<Vec<Vec<String>>> {
        if !self.has_dependencies() {
            return Ok(self.order.iter().map(|id| vec![id.clone()]).collect());
        }

        let mut groups: Vec<Vec<String>> = Vec::new();
        let mut completed: HashSet<String> = HashSet::new();

        while completed.len() < self.order.len() {
            let ready: Vec<String> = self
                .order
                .iter()
                .filter(|s| !completed.contains(*s))
                .filter(|s| self.is_ready(s, &completed))
                .cloned()
                .collect();

            if ready.is_empty() {
                let stuck: Vec<String> = self
                    .order
                    .iter()
                    .filter(|s| !completed.contains(*s))
                    .cloned()
                    .collect();
                let cycle = self.find_cycle();
                if let Some(path) = &cycle {
                    debug!(cycle = %path.join(" -> "), "dependency cycle");
                }
                return Err(ChainError::Dependency { stuck, cycle });
            }

            completed.extend(ready.iter().cloned());
            groups.push(ready);
        }

        Ok(groups)
    }

    /// Find a cycle in the graph, returning the path if one exists.
    ///
    /// The path starts and ends with the same id, e.g. `[a, b, a]`.
    /// Dependencies on unknown ids are skipped.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut finished: HashSet<&str> = HashSet::new();

        for start in &self.order {
            if finished.contains(start.as_str()) {
                continue;
            }

            // Current path, each entry with the index of its next dependency.
            let mut walk: Vec<(&str, usize)> = vec![(start.as_str(), 0)];
            while let Some(top) = walk.last_mut() {
                let node = top.0;
                let Some(dep) = self
                    .dependencies_of(node)
                    .and_then(|deps| deps.get(top.1))
                else {
                    finished.insert(node);
                    walk.pop();
                    continue;
                };
                top.1 += 1;

                if let Some(pos) = walk.iter().position(|(id, _)| *id == dep.as_str()) {
                    let mut cycle: Vec<String> =
                        walk[pos..].iter().map(|(id, _)| id.to_string()).collect();
                    cycle.push(dep.clone());
                    return Some(cycle);
                }
                if self.dependencies.contains_key(dep) && !finished.contains(dep.as_str()) {
                    walk.push((dep.as_str(), 0));
                }
            }
        }

        None
    }
}

/// Resolve normalized steps into ordered execution batches.
///
/// # Errors
///
/// Returns `DuplicateStepId` if two steps share an id, `Dependency` if the
/// graph has a cycle or a dependency on an unknown id, and
/// `DuplicateOutputKey` if two steps of one batch write the same key.
pub fn resolve_batches(steps: &[Step]) -> Result<Vec<ExecutionBatch>> {
    let graph = DependencyGraph::from_steps(steps)?;
    let groups = graph.parallel_groups()?;

    let by_id: HashMap<&str, &Step> = steps.iter().map(|s| (s.id.as_str(), s)).collect();

    let batches: Vec<ExecutionBatch> = groups
        .into_iter()
        .enumerate()
        .map(|(index, ids)| ExecutionBatch {
            index,
            steps: ids
                .iter()
                .filter_map(|id| by_id.get(id.as_str()).map(|s| (*s).clone()))
                .collect(),
        })
        .collect();

    for batch in &batches {
        validate_batch_outputs(batch)?;
    }

    debug!(
        batches = batches.len(),
        plan = ?batches.iter().map(|b| b.ids()).collect::<Vec<_>>(),
        "resolved execution batches"
    );

    Ok(batches)
}

/// Reject batches in which two steps write the same ledger key.
fn validate_batch_outputs(batch: &ExecutionBatch) -> Result<()> {
    let mut writers: HashMap<&str, Vec<String>> = HashMap::new();
    for step in &batch.steps {
        writers
            .entry(step.output_key.as_str())
            .or_default()
            .push(step.id.clone());
    }

    for step in &batch.steps {
        if let Some(ids) = writers.get(step.output_key.as_str()) {
            if ids.len() > 1 {
                return Err(ChainError::DuplicateOutputKey {
                    key: step.output_key.clone(),
                    batch: batch.index,
                    steps: ids.clone(),
                });
            }
        }
    }

    Ok(())
}
