//! Canonical step record.
//!
//! A [`Step`] is what every declared [`StepSpec`](crate::config::StepSpec)
//! becomes after normalization. It is built once per run and never mutated
//! afterwards.

use super::Schema;

/// What kind of value a step produces.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputSpec {
    /// Free text.
    Freeform,
    /// An object conforming to the given schema.
    Structured(Schema),
}

impl OutputSpec {
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }
}

/// A fully normalized step ready for scheduling.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Step id, unique within a run.
    pub id: String,

    /// Prompt template with `{{path}}` placeholders.
    pub prompt: String,

    /// Ledger key the step's output is written under.
    pub output_key: String,

    /// Freeform or structured output.
    pub output: OutputSpec,

    /// Named executor overriding the chain default.
    pub executor: Option<String>,

    /// Ids of steps that must complete first, if `after` was declared.
    pub depends_on: Option<Vec<String>>,
}

impl Step {
    /// Create a freeform step with no dependencies whose output key is its id.
    pub fn new(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            output_key: id.clone(),
            id,
            prompt: prompt.into(),
            output: OutputSpec::Freeform,
            executor: None,
            depends_on: None,
        }
    }

    /// Whether the step declared `after`, even with no ids.
    pub fn declares_dependencies(&self) -> bool {
        self.depends_on.is_some()
    }

    /// Ids of steps that must complete first.
    pub fn dependencies(&self) -> &[String] {
        self.depends_on.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_step_writes_under_its_id() {
        let step = Step::new("summary", "Summarize {{input.text}}");
        assert_eq!(step.output_key, "summary");
        assert_eq!(step.output, OutputSpec::Freeform);
        assert!(!step.declares_dependencies());
        assert!(step.dependencies().is_empty());
    }

    #[test]
    fn empty_declaration_counts_as_declared() {
        let mut step = Step::new("a", "prompt");
        step.depends_on = Some(Vec::new());
        assert!(step.declares_dependencies());
        assert!(step.dependencies().is_empty());
    }

    #[test]
    fn structured_output_is_detected() {
        let spec = OutputSpec::Structured(Schema::new(json!({"type": "object"})));
        assert!(spec.is_structured());
        assert!(!OutputSpec::Freeform.is_structured());
    }
}
