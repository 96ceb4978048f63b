//! Iterative critique and refinement.
//!
//! Produces `v1` from the prompt, then for every iteration `n` a critique
//! `critique{n}` of `v{n}` and an improved `v{n+1}`.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::config::StepDescriptor;
use crate::error::Result;
use crate::provider::Executor;
use crate::runner::Chain;
use crate::state::CostSummary;
use crate::steps::Schema;

use super::{take_entry, text_input};

/// Inputs for [`iterative_refinement`].
pub struct RefinementConfig {
    /// Prompt for the first version.
    pub prompt: String,
    /// Schema every version must follow.
    pub schema: Schema,
    pub executor: Arc<dyn Executor>,
    /// Critique/refine rounds; values below 1 run one round.
    pub iterations: usize,
    /// Aspects the critique should focus on.
    pub critique_focus: Vec<String>,
}

/// One version and the critique written about it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefinementIteration {
    pub output: Value,
    pub critique: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefinementResult {
    #[serde(rename = "final")]
    pub final_output: Value,
    pub iterations: Vec<RefinementIteration>,
    pub cost: CostSummary,
    pub duration: String,
}

fn rounds(config: &RefinementConfig) -> usize {
    config.iterations.max(1)
}

/// Build the refinement chain without running it.
pub fn refinement_chain(config: &RefinementConfig) -> Chain {
    let focus = if config.critique_focus.is_empty() {
        String::new()
    } else {
        format!("\nFocus critique on: {}", config.critique_focus.join(", "))
    };

    let mut builder = Chain::builder()
        .default_executor(Arc::clone(&config.executor))
        .step(
            StepDescriptor::new("{{input.text}}")
                .with_id("generate-v1")
                .with_schema(config.schema.clone())
                .with_output("v1"),
        );

    let mut previous_step = "generate-v1".to_string();
    for version in 1..=rounds(config) {
        let critique_id = format!("critique-v{}", version);
        let refine_id = format!("refine-v{}", version);

        builder = builder
            .step(
                StepDescriptor::new(format!(
                    "Critically analyze this output and identify specific improvements:\n\n\
                     Output:\n{{{{v{version}}}}}\n{focus}\n\n\
                     Provide specific, actionable feedback.",
                ))
                .with_id(critique_id.clone())
                .with_output(format!("critique{}", version))
                .after([previous_step.clone()]),
            )
            .step(
                StepDescriptor::new(format!(
                    "Improve this output based on the critique:\n\n\
                     Original:\n{{{{v{version}}}}}\n\n\
                     Critique:\n{{{{critique{version}}}}}\n\n\
                     Generate improved version.",
                ))
                .with_id(refine_id.clone())
                .with_schema(config.schema.clone())
                .with_output(format!("v{}", version + 1))
                .after([critique_id]),
            );

        previous_step = refine_id;
    }

    builder.build()
}

/// Generate a first version, then critique and refine it.
pub async fn iterative_refinement(config: RefinementConfig) -> Result<RefinementResult> {
    let chain = refinement_chain(&config);
    let mut result = chain.run(text_input(&config.prompt)).await?;
    let rounds = rounds(&config);

    let mut iterations = Vec::with_capacity(rounds + 1);
    for version in 1..=rounds + 1 {
        let Some(output) = result.state.get(&format!("v{}", version)).cloned() else {
            continue;
        };
        let critique = match result.state.get(&format!("critique{}", version)) {
            Some(Value::String(text)) if version <= rounds => text.clone(),
            _ => "Final version".to_string(),
        };
        iterations.push(RefinementIteration { output, critique });
    }

    Ok(RefinementResult {
        final_output: take_entry(&mut result, &format!("v{}", rounds + 1))?,
        iterations,
        cost: result.cost,
        duration: result.duration,
    })
}
