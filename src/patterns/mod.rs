//! Ready-made chain patterns.
//!
//! Each pattern builds a [`Chain`](crate::runner::Chain) from a small config,
//! runs it and reshapes the ledger into a typed result:
//!
//! - [`extract_enrich_structure`] - extract, enrich, then structure
//! - [`iterative_refinement`] - generate, then critique and refine
//! - [`research_synthesis`] - analyze aspects in parallel, then synthesize
//! - [`generate_variants`] - generate, evaluate, then refine variants
//!
//! Caller-provided text is seeded into the ledger under `input` and reached
//! through placeholders, so braces in user text are never interpolated.

pub mod extract_enrich;
pub mod refinement;
pub mod research;
pub mod variant;

use serde_json::{Map, Value};

use crate::error::{ChainError, Result};
use crate::runner::RunResult;

pub use extract_enrich::{
    extract_enrich_chain, extract_enrich_structure, ExtractEnrichConfig, ExtractEnrichResult,
};
pub use refinement::{
    iterative_refinement, refinement_chain, RefinementConfig, RefinementIteration,
    RefinementResult,
};
pub use research::{research_chain, research_synthesis, ResearchConfig, ResearchResult};
pub use variant::{
    generate_variants, variants_chain, VariantEvaluation, VariantsConfig, VariantsResult,
};

/// Ledger input holding a single `text` field.
fn text_input(text: &str) -> Map<String, Value> {
    let mut input = Map::new();
    input.insert("text".to_string(), Value::String(text.to_string()));
    input
}

/// Render `items` as a titled bullet list, or nothing when empty.
fn bullet_section(title: &str, items: &[String]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let bullets: Vec<String> = items.iter().map(|item| format!("- {}", item)).collect();
    format!("\n{}:\n{}", title, bullets.join("\n"))
}

/// Take a required entry out of a run's state.
fn take_entry(result: &mut RunResult, key: &str) -> Result<Value> {
    match result.state.remove(key) {
        Some(Value::Null) | None => Err(ChainError::UnexpectedOutput {
            key: key.to_string(),
            message: "no value was written".to_string(),
        }),
        Some(value) => Ok(value),
    }
}
