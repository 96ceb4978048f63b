//! Promptchain - Dependency-aware prompt chain orchestration.
//!
//! A chain is an ordered list of prompt steps. Steps read earlier results
//! through `{{path}}` placeholders, declare dependencies with `after`, and
//! write their output into a per-run ledger. Independent steps run
//! concurrently; usage reported by executors is turned into a cost summary.
//!
//! # Modules
//!
//! - [`config`] - Chain definitions, YAML loading and interpolation
//! - [`error`] - Error types and result aliases
//! - [`patterns`] - Ready-made multi-step chains
//! - [`provider`] - The executor port and a scripted mock
//! - [`runner`] - Dependency resolution and chain execution
//! - [`state`] - The run ledger and cost accounting
//! - [`steps`] - Step records and normalization
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use promptchain::config::StepDescriptor;
//! use promptchain::provider::{MockExecutor, MockResponse};
//! use promptchain::Chain;
//! use serde_json::{json, Map};
//!
//! let executor = Arc::new(
//!     MockExecutor::new("mock")
//!         .respond_to("Translate", MockResponse::text("Olá mundo"))
//!         .respond_to("Count", MockResponse::text("2")),
//! );
//!
//! let chain = Chain::builder()
//!     .default_executor(executor)
//!     .step(StepDescriptor::new("Translate {{input.text}}").with_id("translate"))
//!     .step(
//!         StepDescriptor::new("Count the words in {{translate}}")
//!             .with_output("output")
//!             .after(["translate"]),
//!     )
//!     .build();
//!
//! let mut input = Map::new();
//! input.insert("text".into(), json!("Hello world"));
//!
//! # futures::executor::block_on(async {
//! let result = chain.run(input).await.unwrap();
//! assert_eq!(result.output, json!("2"));
//! assert_eq!(result.state["translate"], json!("Olá mundo"));
//! # });
//! ```

pub mod config;
pub mod error;
pub mod patterns;
pub mod provider;
pub mod runner;
pub mod state;
pub mod steps;

pub use error::{ChainError, Result};
pub use provider::Executor;
pub use runner::{Chain, ChainBuilder, RunResult};
