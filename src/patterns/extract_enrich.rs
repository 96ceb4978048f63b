//! Extract, enrich, then structure.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::config::StepDescriptor;
use crate::error::Result;
use crate::provider::Executor;
use crate::runner::Chain;
use crate::state::CostSummary;
use crate::steps::Schema;

use super::{bullet_section, take_entry, text_input};

/// Inputs for [`extract_enrich_structure`].
pub struct ExtractEnrichConfig {
    /// Source text to extract from.
    pub input: String,
    /// Schema of the first, basic extraction.
    pub base_schema: Schema,
    /// Extra guidance for the enrichment step.
    pub enrichment_rules: Vec<String>,
    /// Schema of the final structured output.
    pub final_schema: Schema,
    pub executor: Arc<dyn Executor>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractEnrichResult {
    #[serde(rename = "final")]
    pub final_output: Value,
    pub extracted: Value,
    pub enriched: Value,
    pub cost: CostSummary,
    pub duration: String,
}

/// Build the three-step chain without running it.
pub fn extract_enrich_chain(config: &ExtractEnrichConfig) -> Chain {
    let rules = bullet_section("Enrichment rules", &config.enrichment_rules);

    Chain::builder()
        .default_executor(Arc::clone(&config.executor))
        .step(
            StepDescriptor::new("Extract basic information from this text:\n\n{{input.text}}")
                .with_id("extract")
                .with_schema(config.base_schema.clone())
                .with_output("extracted"),
        )
        .step(
            StepDescriptor::new(format!(
                "Enrich this data with additional context and inferences:\n\n\
                 Data:\n{{{{extracted}}}}\n{}\n\n\
                 Add missing information through logical inference.",
                rules
            ))
            .with_id("enrich")
            .with_output("enriched")
            .after(["extract"]),
        )
        .step(
            StepDescriptor::new(
                "Structure this into final format:\n\n\
                 Extracted:\n{{extracted}}\n\n\
                 Enriched:\n{{enriched}}\n\n\
                 Create final structured output.",
            )
            .with_id("structure")
            .with_schema(config.final_schema.clone())
            .with_output("final")
            .after(["extract", "enrich"]),
        )
        .build()
}

/// Extract basic facts, enrich them, then produce the final structure.
pub async fn extract_enrich_structure(config: ExtractEnrichConfig) -> Result<ExtractEnrichResult> {
    let chain = extract_enrich_chain(&config);
    let mut result = chain.run(text_input(&config.input)).await?;

    Ok(ExtractEnrichResult {
        final_output: take_entry(&mut result, "final")?,
        extracted: take_entry(&mut result, "extracted")?,
        enriched: take_entry(&mut result, "enriched")?,
        cost: result.cost,
        duration: result.duration,
    })
}
