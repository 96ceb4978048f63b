//! Step normalization.
//!
//! Turns the heterogeneous list of [`StepSpec`]s a caller declares into
//! canonical [`Step`] records. Positional defaults use one-based indices:
//! the third declared step without an id becomes `step3`.

use crate::config::{StepDescriptor, StepSpec};

use super::{OutputSpec, Step};

/// Normalize a list of step specs, preserving order.
pub fn normalize_steps(specs: &[StepSpec]) -> Vec<Step> {
    specs
        .iter()
        .enumerate()
        .map(|(index, spec)| Step::from_spec(spec, index))
        .collect()
}

impl Step {
    /// Build the canonical step for the declaration at zero-based `index`.
    pub fn from_spec(spec: &StepSpec, index: usize) -> Self {
        match spec {
            StepSpec::Prompt(prompt) => Self::new(positional_id(index), prompt.clone()),
            StepSpec::Descriptor(descriptor) => Self::from_descriptor(descriptor, index),
        }
    }

    fn from_descriptor(descriptor: &StepDescriptor, index: usize) -> Self {
        let id = descriptor
            .id
            .clone()
            .unwrap_or_else(|| positional_id(index));
        let output_key = descriptor.output.clone().unwrap_or_else(|| id.clone());

        Self {
            id,
            prompt: descriptor.prompt.clone(),
            output_key,
            output: match &descriptor.schema {
                Some(schema) => OutputSpec::Structured(schema.clone()),
                None => OutputSpec::Freeform,
            },
            executor: descriptor.model.clone(),
            depends_on: descriptor.after.clone(),
        }
    }
}

fn positional_id(index: usize) -> String {
    format!("step{}", index + 1)
}
