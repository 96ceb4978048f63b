//! Scripted executor for testing.
//!
//! `MockExecutor` implements the [`Executor`] trait and records every call
//! for later assertion. Responses are matched by substring against the
//! rendered prompt, so tests stay independent of the order in which
//! concurrent steps reach the executor.
//!
//! # Example
//!
//! ```
//! use promptchain::provider::{Executor, MockExecutor, MockResponse};
//! use serde_json::json;
//!
//! let executor = MockExecutor::new("mock")
//!     .respond_to("Extract", MockResponse::object(json!({"name": "Ana"})))
//!     .respond_to("Summarize", MockResponse::text("short summary"));
//!
//! # futures::executor::block_on(async {
//! let summary = executor.generate_text("Summarize this").await.unwrap();
//! assert_eq!(summary.text, "short summary");
//! assert_eq!(executor.prompts(), vec!["Summarize this".to_string()]);
//! # });
//! ```

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use futures::stream;
use serde_json::Value;

use super::{Executor, StreamPart, StructuredGeneration, TextGeneration, TextStream, Usage};
use crate::steps::Schema;

/// A canned response returned by [`MockExecutor`].
#[derive(Debug, Clone, PartialEq)]
pub enum MockResponse {
    /// Plain text, served to text and streaming calls.
    Text(String),
    /// Structured object, served to structured calls.
    Object(Value),
    /// Provider failure with the given message.
    Fail(String),
}

impl MockResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn object(value: Value) -> Self {
        Self::Object(value)
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(message.into())
    }
}

/// Which capability a recorded call used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockCallKind {
    Text,
    Structured,
    Stream,
}

/// A call captured by [`MockExecutor`].
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub kind: MockCallKind,
    pub prompt: String,
    /// Schema passed to structured calls.
    pub schema: Option<Schema>,
}

/// Mock executor implementation for testing.
#[derive(Debug)]
pub struct MockExecutor {
    name: String,
    responses: Vec<(String, MockResponse)>,
    default_response: Option<MockResponse>,
    usage: Usage,
    chunk_size: usize,
    calls: Mutex<Vec<MockCall>>,
}

impl MockExecutor {
    /// Create a mock with no scripted responses and zero usage.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: Vec::new(),
            default_response: None,
            usage: Usage::default(),
            chunk_size: 4,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Respond with `response` to any prompt containing `needle`.
    ///
    /// Needles are checked in registration order; the first match wins.
    pub fn respond_to(mut self, needle: impl Into<String>, response: MockResponse) -> Self {
        self.responses.push((needle.into(), response));
        self
    }

    /// Fallback response for prompts no needle matches.
    pub fn with_default_response(mut self, response: MockResponse) -> Self {
        self.default_response = Some(response);
        self
    }

    /// Usage reported by every call.
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }

    /// Number of characters per streamed chunk.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// All captured calls, in arrival order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Prompts of all captured calls, in arrival order.
    pub fn prompts(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.prompt).collect()
    }

    fn record(&self, kind: MockCallKind, prompt: &str, schema: Option<&Schema>) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(MockCall {
                kind,
                prompt: prompt.to_string(),
                schema: schema.cloned(),
            });
    }

    fn lookup(&self, prompt: &str) -> anyhow::Result<&MockResponse> {
        self.responses
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, response)| response)
            .or(self.default_response.as_ref())
            .ok_or_else(|| anyhow::anyhow!("{}: no scripted response for prompt: {}", self.name, prompt))
    }

    fn text_for(&self, prompt: &str) -> anyhow::Result<String> {
        match self.lookup(prompt)? {
            MockResponse::Text(text) => Ok(text.clone()),
            MockResponse::Object(value) => Ok(value.to_string()),
            MockResponse::Fail(message) => Err(anyhow::anyhow!("{}", message)),
        }
    }

    fn chunks(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        chars
            .chunks(self.chunk_size)
            .map(|c| c.iter().collect())
            .collect()
    }
}

#[async_trait]
impl Executor for MockExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_text(&self, prompt: &str) -> anyhow::Result<TextGeneration> {
        self.record(MockCallKind::Text, prompt, None);
        Ok(TextGeneration {
            text: self.text_for(prompt)?,
            usage: self.usage,
        })
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &Schema,
    ) -> anyhow::Result<StructuredGeneration> {
        self.record(MockCallKind::Structured, prompt, Some(schema));
        let object = match self.lookup(prompt)? {
            MockResponse::Object(value) => value.clone(),
            MockResponse::Text(text) => serde_json::from_str(text)?,
            MockResponse::Fail(message) => anyhow::bail!("{}", message),
        };
        Ok(StructuredGeneration {
            object,
            usage: self.usage,
        })
    }

    async fn stream_text(&self, prompt: &str) -> anyhow::Result<TextStream> {
        self.record(MockCallKind::Stream, prompt, None);
        let text = self.text_for(prompt)?;
        let mut parts: Vec<anyhow::Result<StreamPart>> = self
            .chunks(&text)
            .into_iter()
            .map(|c| Ok(StreamPart::Delta(c)))
            .collect();
        parts.push(Ok(StreamPart::Finish(self.usage)));
        Ok(Box::pin(stream::iter(parts)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;

    #[tokio::test]
    async fn first_matching_needle_wins() {
        let mock = MockExecutor::new("mock")
            .respond_to("alpha", MockResponse::text("first"))
            .respond_to("alpha beta", MockResponse::text("second"));

        let result = mock.generate_text("alpha beta").await.unwrap();
        assert_eq!(result.text, "first");
    }

    #[tokio::test]
    async fn unmatched_prompt_uses_default_response() {
        let mock = MockExecutor::new("mock").with_default_response(MockResponse::text("fallback"));

        let result = mock.generate_text("anything").await.unwrap();
        assert_eq!(result.text, "fallback");
    }

    #[tokio::test]
    async fn unmatched_prompt_without_default_fails() {
        let mock = MockExecutor::new("mock");
        let err = mock.generate_text("anything").await.unwrap_err();
        assert!(err.to_string().contains("no scripted response"));
    }

    #[tokio::test]
    async fn scripted_failure_surfaces_message() {
        let mock = MockExecutor::new("mock").respond_to("boom", MockResponse::fail("quota exceeded"));
        let err = mock.generate_text("boom").await.unwrap_err();
        assert_eq!(err.to_string(), "quota exceeded");
    }

    #[tokio::test]
    async fn structured_call_parses_text_response_as_json() {
        let mock = MockExecutor::new("mock").respond_to("x", MockResponse::text(r#"{"a":1}"#));
        let schema = Schema::new(json!({"type": "object"}));

        let result = mock.generate_structured("x", &schema).await.unwrap();
        assert_eq!(result.object, json!({"a": 1}));
        assert_eq!(mock.calls()[0].schema, Some(schema));
    }

    #[tokio::test]
    async fn stream_splits_text_into_chunks_then_usage() {
        let mock = MockExecutor::new("mock")
            .respond_to("hi", MockResponse::text("abcdefghij"))
            .with_chunk_size(4)
            .with_usage(Usage::new(1, 2));

        let parts: Vec<_> = mock
            .stream_text("hi")
            .await
            .unwrap()
            .map(|p| p.unwrap())
            .collect()
            .await;

        assert_eq!(
            parts,
            vec![
                StreamPart::Delta("abcd".into()),
                StreamPart::Delta("efgh".into()),
                StreamPart::Delta("ij".into()),
                StreamPart::Finish(Usage::new(1, 2)),
            ]
        );
        assert_eq!(mock.calls()[0].kind, MockCallKind::Stream);
    }
}
