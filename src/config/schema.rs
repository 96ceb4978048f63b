//! Chain definition schema.
//!
//! These types describe a chain as a caller writes it, either in code or in
//! a YAML file. A step may be a bare prompt string or a full descriptor:
//!
//! ```yaml
//! model: fast
//! streaming: false
//! steps:
//!   - "Summarize: {{input.text}}"
//!   - id: critique
//!     prompt: "Critique this summary: {{step1}}"
//!     after: step1
//! ```

use serde::{Deserialize, Deserializer, Serialize};

use crate::state::Pricing;
use crate::steps::Schema;

/// A complete chain definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainDefinition {
    /// Name of the default executor for steps that do not pick one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Stream freeform steps through the chunk sink.
    #[serde(default, skip_serializing_if = "is_false")]
    pub streaming: bool,

    /// Rates used for cost accounting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<Pricing>,

    /// Steps in declaration order.
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

/// One step as declared: a bare prompt or a descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepSpec {
    /// A plain prompt; id and output key are positional.
    Prompt(String),
    /// A full step descriptor.
    Descriptor(StepDescriptor),
}

impl From<&str> for StepSpec {
    fn from(prompt: &str) -> Self {
        Self::Prompt(prompt.to_string())
    }
}

impl From<String> for StepSpec {
    fn from(prompt: String) -> Self {
        Self::Prompt(prompt)
    }
}

impl From<StepDescriptor> for StepSpec {
    fn from(descriptor: StepDescriptor) -> Self {
        Self::Descriptor(descriptor)
    }
}

/// Structured description of a single step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepDescriptor {
    /// Step id (defaults to `step{position}`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Prompt template
    pub prompt: String,

    /// Ledger key for the output (defaults to the id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Schema for structured output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,

    /// Steps that must complete before this one. Declaring `after` at all,
    /// even as an empty list, switches the chain to dependency batching.
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Option::is_none"
    )]
    pub after: Option<Vec<String>>,

    /// Named executor overriding the chain default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl StepDescriptor {
    /// Create a descriptor with only a prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Declare dependencies on the given step ids.
    ///
    /// An empty list still counts as a declaration.
    pub fn after<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.after
            .get_or_insert_with(Vec::new)
            .extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

fn is_false(v: &bool) -> bool {
    !v
}

/// Accept either `after: step1` or `after: [step1, step2]`.
///
/// An empty string declares nothing; an empty list is still a declaration.
fn one_or_many<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => None,
        Some(OneOrMany::One(id)) if id.is_empty() => None,
        Some(OneOrMany::One(id)) => Some(vec![id]),
        Some(OneOrMany::Many(ids)) => Some(ids),
    })
}
