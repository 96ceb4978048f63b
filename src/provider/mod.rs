//! Generation provider port.
//!
//! The chain never talks to a model API directly. Every step is executed
//! through an [`Executor`], which wraps whatever generation backend the
//! caller uses and reports usage for cost accounting.
//!
//! # Example
//!
//! ```
//! use promptchain::provider::{Executor, MockExecutor, MockResponse};
//!
//! # futures::executor::block_on(async {
//! let executor = MockExecutor::new("mock")
//!     .respond_to("capital", MockResponse::text("Lisbon"));
//!
//! let generation = executor.generate_text("What is the capital of Portugal?").await.unwrap();
//! assert_eq!(generation.text, "Lisbon");
//! # });
//! ```

pub mod mock;

use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::steps::Schema;

pub use mock::{MockCall, MockCallKind, MockExecutor, MockResponse};

/// Units consumed by a single generation call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Units read by the provider (prompt tokens).
    pub input_units: u64,
    /// Units produced by the provider (completion tokens).
    pub output_units: u64,
}

impl Usage {
    pub fn new(input_units: u64, output_units: u64) -> Self {
        Self {
            input_units,
            output_units,
        }
    }

    /// Total units consumed in both directions.
    pub fn total(&self) -> u64 {
        self.input_units + self.output_units
    }
}

/// Result of a plain text generation.
#[derive(Debug, Clone, PartialEq)]
pub struct TextGeneration {
    pub text: String,
    pub usage: Usage,
}

/// Result of a schema-constrained generation.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredGeneration {
    /// Parsed object conforming to the requested schema.
    pub object: Value,
    pub usage: Usage,
}

/// One item of a streamed text generation.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamPart {
    /// A chunk of generated text, in emission order.
    Delta(String),
    /// Final usage report, if the provider sends one.
    Finish(Usage),
}

/// Stream of parts produced by [`Executor::stream_text`].
pub type TextStream = BoxStream<'static, anyhow::Result<StreamPart>>;

/// A generation backend a step can run against.
///
/// Implementations must be shareable across the concurrently running steps
/// of a batch.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Human-readable executor name, used in logs.
    fn name(&self) -> &str;

    /// Turn a prompt into text.
    async fn generate_text(&self, prompt: &str) -> anyhow::Result<TextGeneration>;

    /// Turn a prompt into an object conforming to `schema`.
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &Schema,
    ) -> anyhow::Result<StructuredGeneration>;

    /// Turn a prompt into a stream of text chunks.
    ///
    /// The default implementation generates the full text and emits it as a
    /// single chunk followed by its usage.
    async fn stream_text(&self, prompt: &str) -> anyhow::Result<TextStream> {
        let generation = self.generate_text(prompt).await?;
        let parts = vec![
            Ok(StreamPart::Delta(generation.text)),
            Ok(StreamPart::Finish(generation.usage)),
        ];
        Ok(Box::pin(stream::iter(parts)))
    }
}
