//! Integration tests for the ready-made chain patterns.

use promptchain::patterns::{
    extract_enrich_structure, generate_variants, iterative_refinement, research_synthesis,
    ExtractEnrichConfig, RefinementConfig, ResearchConfig, VariantsConfig,
};
use promptchain::provider::{MockExecutor, MockResponse, Usage};
use promptchain::steps::Schema;
use promptchain::ChainError;
use serde_json::json;
use std::sync::Arc;

fn object_schema() -> Schema {
    Schema::new(json!({"type": "object"}))
}

#[tokio::test]
async fn extract_enrich_structure_reports_every_stage() {
    let mock = Arc::new(
        MockExecutor::new("mock")
            .respond_to("Extract basic", MockResponse::object(json!({"company": "Acme"})))
            .respond_to("Enrich this", MockResponse::text("Acme sells anvils"))
            .respond_to("Structure this", MockResponse::object(json!({"company": "Acme", "sector": "tools"}))),
    );

    let result = extract_enrich_structure(ExtractEnrichConfig {
        input: "Acme Corp, founded 1949".to_string(),
        base_schema: object_schema(),
        enrichment_rules: vec![],
        final_schema: object_schema(),
        executor: mock,
    })
    .await
    .unwrap();

    let serialized = serde_json::to_value(&result).unwrap();
    assert_eq!(serialized["final"], json!({"company": "Acme", "sector": "tools"}));
    assert_eq!(serialized["enriched"], json!("Acme sells anvils"));
}

#[tokio::test]
async fn refinement_runs_requested_rounds() {
    let mock = Arc::new(
        MockExecutor::new("mock")
            .respond_to("Critically analyze", MockResponse::text("be bolder"))
            .with_default_response(MockResponse::object(json!({"copy": "Go"}))),
    );

    let result = iterative_refinement(RefinementConfig {
        prompt: "Write ad copy".to_string(),
        schema: object_schema(),
        executor: mock.clone(),
        iterations: 3,
        critique_focus: vec![],
    })
    .await
    .unwrap();

    // generate + 3 x (critique, refine)
    assert_eq!(mock.calls().len(), 7);
    assert_eq!(result.iterations.len(), 4);
    assert_eq!(result.iterations[3].critique, "Final version");
}

#[tokio::test]
async fn research_runs_aspects_before_synthesis() {
    let mock = Arc::new(
        MockExecutor::new("mock")
            .respond_to("Synthesize", MockResponse::object(json!({"verdict": "go"})))
            .with_default_response(MockResponse::text("analysis"))
            .with_usage(Usage::new(10, 10)),
    );

    let result = research_synthesis(ResearchConfig {
        input: "A bakery subscription".to_string(),
        aspects: vec!["market".into(), "competitors".into(), "risks".into()],
        executor: mock.clone(),
        synthesis_schema: object_schema(),
    })
    .await
    .unwrap();

    let prompts = mock.prompts();
    assert_eq!(prompts.len(), 4);
    assert!(prompts[3].starts_with("Synthesize"));
    assert_eq!(result.aspect_analysis.len(), 3);
    assert_eq!(result.synthesis, json!({"verdict": "go"}));
    assert_eq!(result.cost.total_units, 80);
}

#[tokio::test]
async fn variants_fail_on_malformed_output() {
    let mock = Arc::new(MockExecutor::new("mock").with_default_response(MockResponse::object(json!({}))));

    let err = generate_variants(VariantsConfig {
        input: "Fresh bread daily".to_string(),
        count: 3,
        executor: mock,
        style: None,
        constraints: vec![],
    })
    .await
    .unwrap_err();

    assert!(matches!(err, ChainError::UnexpectedOutput { .. }));
}
