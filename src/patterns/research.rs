//! Multi-aspect research synthesis.
//!
//! Every aspect is analyzed by its own step; the aspect steps share the
//! first batch and run concurrently. A final structured step synthesizes
//! all analyses.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::config::StepDescriptor;
use crate::error::{ChainError, Result};
use crate::provider::Executor;
use crate::runner::Chain;
use crate::state::CostSummary;
use crate::steps::Schema;

use super::{take_entry, text_input};

/// Inputs for [`research_synthesis`].
pub struct ResearchConfig {
    /// Subject of the research.
    pub input: String,
    /// Aspects to analyze, e.g. `market`, `competitors`, `risks`.
    pub aspects: Vec<String>,
    pub executor: Arc<dyn Executor>,
    /// Schema of the synthesis.
    pub synthesis_schema: Schema,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResearchResult {
    pub synthesis: Value,
    /// Analysis text per aspect, keyed by aspect name.
    pub aspect_analysis: BTreeMap<String, String>,
    pub cost: CostSummary,
    pub duration: String,
}

/// Ledger key for an aspect; anything outside `[A-Za-z0-9_]` becomes `_`.
fn aspect_key(aspect: &str) -> String {
    let slug: String = aspect
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("aspect_{}", slug)
}

/// Build the research chain without running it.
pub fn research_chain(config: &ResearchConfig) -> Chain {
    let mut builder = Chain::builder().default_executor(Arc::clone(&config.executor));
    let mut analysis_ids = Vec::with_capacity(config.aspects.len());

    for aspect in &config.aspects {
        let id = format!("analyze-{}", aspect);
        builder = builder.step(
            StepDescriptor::new(format!(
                "Analyze the {aspect} aspect of this:\n\n{{{{input.text}}}}\n\n\
                 Provide detailed analysis focusing specifically on {aspect}.",
            ))
            .with_id(id.clone())
            .with_output(aspect_key(aspect)),
        );
        analysis_ids.push(id);
    }

    let context: Vec<String> = config
        .aspects
        .iter()
        .map(|aspect| format!("{}: {{{{{}}}}}", aspect, aspect_key(aspect)))
        .collect();

    builder
        .step(
            StepDescriptor::new(format!(
                "Synthesize all analyses into a comprehensive output:\n\n{}\n\n\
                 Create a unified, structured analysis.",
                context.join("\n\n")
            ))
            .with_id("synthesize")
            .with_schema(config.synthesis_schema.clone())
            .with_output("synthesis")
            .after(analysis_ids),
        )
        .build()
}

/// Analyze every aspect concurrently, then synthesize.
pub async fn research_synthesis(config: ResearchConfig) -> Result<ResearchResult> {
    let chain = research_chain(&config);
    let mut result = chain.run(text_input(&config.input)).await?;

    let mut aspect_analysis = BTreeMap::new();
    for aspect in &config.aspects {
        let key = aspect_key(aspect);
        let analysis = match take_entry(&mut result, &key)? {
            Value::String(text) => text,
            other => {
                return Err(ChainError::UnexpectedOutput {
                    key,
                    message: format!("expected text analysis, got {}", other),
                })
            }
        };
        aspect_analysis.insert(aspect.clone(), analysis);
    }

    Ok(ResearchResult {
        synthesis: take_entry(&mut result, "synthesis")?,
        aspect_analysis,
        cost: result.cost,
        duration: result.duration,
    })
}
