//! Generate, evaluate and refine variants.
//!
//! The first step over-generates so the evaluation has more to choose
//! from; the final step writes `count` refined variants inspired by the
//! best-scoring ones.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::StepDescriptor;
use crate::error::{ChainError, Result};
use crate::provider::Executor;
use crate::runner::Chain;
use crate::state::CostSummary;
use crate::steps::Schema;

use super::{bullet_section, take_entry, text_input};

/// Inputs for [`generate_variants`].
pub struct VariantsConfig {
    /// Text to produce variants of.
    pub input: String,
    /// Number of final variants.
    pub count: usize,
    pub executor: Arc<dyn Executor>,
    pub style: Option<String>,
    pub constraints: Vec<String>,
}

/// Score given to one generated variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantEvaluation {
    #[serde(rename = "variant")]
    pub text: String,
    /// 0 to 100.
    pub score: f64,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantsResult {
    /// Refined variants.
    pub variants: Vec<String>,
    /// Every evaluated first-round variant.
    pub all_variants: Vec<VariantEvaluation>,
    pub cost: CostSummary,
    pub duration: String,
}

#[derive(Deserialize)]
struct VariantList {
    variants: Vec<String>,
}

#[derive(Deserialize)]
struct EvaluationList {
    evaluations: Vec<VariantEvaluation>,
}

/// Size of the first, over-generated round.
fn initial_count(count: usize) -> usize {
    (count * 2).max(10)
}

fn variants_schema(count: usize) -> Schema {
    Schema::new(json!({
        "type": "object",
        "properties": {
            "variants": {
                "type": "array",
                "items": {"type": "string"},
                "minItems": count.saturating_sub(2),
                "maxItems": count + 2
            }
        },
        "required": ["variants"]
    }))
}

fn evaluations_schema(count: usize) -> Schema {
    Schema::new(json!({
        "type": "object",
        "properties": {
            "evaluations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "variant": {"type": "string"},
                        "score": {"type": "number", "minimum": 0, "maximum": 100},
                        "reasoning": {"type": "string"}
                    },
                    "required": ["variant", "score", "reasoning"]
                },
                "minItems": count.saturating_sub(2),
                "maxItems": count + 2
            }
        },
        "required": ["evaluations"]
    }))
}

/// Style and constraint lines, seeded into the ledger rather than the template.
fn guidance(config: &VariantsConfig) -> String {
    let style = config
        .style
        .as_ref()
        .map(|s| format!("\nStyle: {}", s))
        .unwrap_or_default();
    format!("{}{}", style, bullet_section("Constraints", &config.constraints))
}

/// Build the variants chain without running it.
pub fn variants_chain(config: &VariantsConfig) -> Chain {
    let initial = initial_count(config.count);
    let count = config.count;

    Chain::builder()
        .default_executor(Arc::clone(&config.executor))
        .step(
            StepDescriptor::new(format!(
                "Generate {initial} diverse variants of this:\n\n\
                 Original:\n{{{{input.text}}}}\n{{{{input.guidance}}}}\n\n\
                 Focus on creating variety - try different angles, tones, and approaches.",
            ))
            .with_id("generate-initial")
            .with_schema(variants_schema(initial))
            .with_output("initial"),
        )
        .step(
            StepDescriptor::new(
                "Evaluate these variants and score each one:\n\n\
                 Original: {{input.text}}\n{{input.guidance}}\n\n\
                 Variants:\n{{initial.variants}}\n\n\
                 Score each variant (0-100) based on:\n\
                 - How well it matches the style\n\
                 - Whether it meets constraints\n\
                 - Creativity and appeal\n\
                 - Clarity\n\n\
                 Return evaluation for each variant.",
            )
            .with_id("evaluate")
            .with_schema(evaluations_schema(initial))
            .with_output("evaluated")
            .after(["generate-initial"]),
        )
        .step(
            StepDescriptor::new(format!(
                "Based on the evaluation, generate {count} final variants.\n\n\
                 Top performing variants (use as inspiration):\n{{{{evaluated.evaluations}}}}\n\n\
                 Generate {count} refined variants that:\n\
                 - Take the best elements from top-scoring variants\n\
                 - Maintain the style and constraints\n\
                 - Push quality even higher",
            ))
            .with_id("refine")
            .with_schema(variants_schema(count))
            .with_output("final")
            .after(["evaluate"]),
        )
        .build()
}

fn parse_entry<T: serde::de::DeserializeOwned>(key: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| ChainError::UnexpectedOutput {
        key: key.to_string(),
        message: e.to_string(),
    })
}

/// Over-generate variants, score them, then write refined finalists.
pub async fn generate_variants(config: VariantsConfig) -> Result<VariantsResult> {
    let chain = variants_chain(&config);
    let mut input = text_input(&config.input);
    input.insert("guidance".to_string(), Value::String(guidance(&config)));

    let mut result = chain.run(input).await?;
    let finalists: VariantList = parse_entry("final", take_entry(&mut result, "final")?)?;
    let evaluated: EvaluationList = parse_entry("evaluated", take_entry(&mut result, "evaluated")?)?;

    Ok(VariantsResult {
        variants: finalists.variants,
        all_variants: evaluated.evaluations,
        cost: result.cost,
        duration: result.duration,
    })
}
