//! Integration tests for the config module public API.

use promptchain::config::{
    extract_placeholders, interpolate, load_definition, parse_definition, ChainDefinition,
    StepDescriptor, StepSpec,
};
use promptchain::runner::resolve_batches;
use promptchain::state::Pricing;
use promptchain::steps::{normalize_steps, OutputSpec, Schema};
use promptchain::ChainError;
use schemars::JsonSchema;
use serde_json::{json, Map};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[test]
fn public_api_is_accessible() {
    let _definition = ChainDefinition::default();
    let _spec: StepSpec = "hello".into();
    let _pricing = Pricing::default();
}

#[test]
fn definition_workflow() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("chain.yml");
    fs::write(
        &path,
        r#"
steps:
  - "Extract facts from {{input.text}}"
  - id: summary
    prompt: "Summarize {{step1}}"
    after: [step1]
    schema:
      type: object
      required: [summary]
"#,
    )
    .unwrap();

    let definition = load_definition(&path).unwrap();
    let steps = normalize_steps(&definition.steps);

    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].id, "step1");
    assert_eq!(steps[0].output_key, "step1");
    assert_eq!(steps[1].id, "summary");
    assert_eq!(steps[1].dependencies(), ["step1"]);
    assert!(steps[1].output.is_structured());
    assert!(definition.pricing.is_none());
}

fn planned_ids(yaml: &str) -> promptchain::Result<Vec<Vec<String>>> {
    let definition = parse_definition(yaml, Path::new("chain.yml"))?;
    let batches = resolve_batches(&normalize_steps(&definition.steps))?;
    Ok(batches
        .iter()
        .map(|b| b.ids().into_iter().map(String::from).collect())
        .collect())
}

#[test]
fn empty_after_list_runs_independent_steps_together() {
    let yaml = "steps:\n  - id: a\n    prompt: x\n    after: []\n  - id: b\n    prompt: y\n";
    assert_eq!(planned_ids(yaml).unwrap(), vec![vec!["a", "b"]]);
}

#[test]
fn empty_after_string_declares_nothing() {
    let yaml = "steps:\n  - id: a\n    prompt: x\n    after: \"\"\n  - id: b\n    prompt: y\n";
    assert_eq!(planned_ids(yaml).unwrap(), vec![vec!["a"], vec!["b"]]);
}

#[test]
fn invalid_yaml_reports_parse_error() {
    let err = parse_definition("steps: [unterminated", Path::new("chain.yml")).unwrap_err();
    assert!(matches!(err, ChainError::DefinitionParse { .. }));
}

#[test]
fn descriptors_built_in_code_match_yaml() {
    let yaml = parse_definition(
        "steps:\n  - id: b\n    prompt: \"{{a}}\"\n    after: a\n    model: fast\n",
        Path::new("chain.yml"),
    )
    .unwrap();

    let built: StepSpec = StepDescriptor::new("{{a}}")
        .with_id("b")
        .after(["a"])
        .with_model("fast")
        .into();

    assert_eq!(yaml.steps, vec![built]);
}

#[derive(JsonSchema)]
#[allow(dead_code)]
struct Contact {
    name: String,
    email: Option<String>,
}

#[test]
fn schema_from_rust_type() {
    let schema = Schema::of::<Contact>();
    assert_eq!(schema.as_value()["properties"]["name"]["type"], "string");

    let steps = normalize_steps(&[StepDescriptor::new("Find contact")
        .with_schema(schema.clone())
        .into()]);
    assert_eq!(steps[0].output, OutputSpec::Structured(schema));
}

#[test]
fn interpolation_renders_paths() {
    let mut state = Map::new();
    state.insert("user".into(), json!({"name": "Ana", "tags": ["a", "b"]}));

    let template = "Hi {{user.name}}, tags {{user.tags}}, missing {{user.age}}";
    assert_eq!(extract_placeholders(template).len(), 3);
    assert_eq!(
        interpolate(template, &state),
        "Hi Ana, tags [\n  \"a\",\n  \"b\"\n], missing {{user.age}}"
    );
}
