//! Error types for chain operations.
//!
//! This module defines [`ChainError`], the error type returned by every
//! fallible operation in the crate, and a [`Result`] type alias.
//!
//! # Error Handling Strategy
//!
//! - Graph and configuration problems are detected before any step executes
//! - Provider failures arrive as `anyhow::Error` and are surfaced unchanged
//! - The first failure aborts the run; nothing is recovered silently

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for chain operations.
#[derive(Debug, Error)]
pub enum ChainError {
    /// A step has no executor it can run with.
    #[error("No executor configured for step '{step}': {message}")]
    Configuration { step: String, message: String },

    /// A chain definition names an executor that was never registered.
    #[error("Unknown executor: {name}")]
    UnknownExecutor { name: String },

    /// Cyclic or missing dependency in the step graph.
    ///
    /// `cycle` holds one cycle path, first id repeated at the end, when the
    /// stuck steps contain a cycle.
    #[error("Circular or missing dependency detected. Remaining steps: {}", .stuck.join(", "))]
    Dependency {
        stuck: Vec<String>,
        cycle: Option<Vec<String>>,
    },

    /// Two steps share an id after normalization.
    #[error("Duplicate step id: {id}")]
    DuplicateStepId { id: String },

    /// Two steps in the same batch write the same ledger key.
    #[error("Steps {} in batch {batch} all write output key '{key}'", .steps.join(", "))]
    DuplicateOutputKey {
        key: String,
        batch: usize,
        steps: Vec<String>,
    },

    /// A pattern found a ledger entry missing or in an unexpected shape.
    #[error("Unexpected output under '{key}': {message}")]
    UnexpectedOutput { key: String, message: String },

    /// Chain definition file not found.
    #[error("Chain definition not found: {path}")]
    DefinitionNotFound { path: PathBuf },

    /// Chain definition could not be parsed.
    #[error("Failed to parse chain definition at {path}: {message}")]
    DefinitionParse { path: PathBuf, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure reported by the generation provider.
    #[error(transparent)]
    Execution(#[from] anyhow::Error),
}

/// Result type alias for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_names_step() {
        let err = ChainError::Configuration {
            step: "summarize".into(),
            message: "no default executor".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("summarize"));
        assert!(msg.contains("no default executor"));
    }

    #[test]
    fn unknown_executor_displays_name() {
        let err = ChainError::UnknownExecutor {
            name: "large".into(),
        };
        assert_eq!(err.to_string(), "Unknown executor: large");
    }

    #[test]
    fn dependency_error_lists_every_stuck_step() {
        let err = ChainError::Dependency {
            stuck: vec!["a".into(), "b".into()],
            cycle: Some(vec!["a".into(), "b".into(), "a".into()]),
        };
        assert_eq!(
            err.to_string(),
            "Circular or missing dependency detected. Remaining steps: a, b"
        );
    }

    #[test]
    fn duplicate_output_key_displays_key_and_steps() {
        let err = ChainError::DuplicateOutputKey {
            key: "summary".into(),
            batch: 1,
            steps: vec!["left".into(), "right".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("summary"));
        assert!(msg.contains("left, right"));
    }

    #[test]
    fn definition_parse_error_displays_path_and_message() {
        let err = ChainError::DefinitionParse {
            path: PathBuf::from("/chains/research.yml"),
            message: "invalid syntax".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/chains/research.yml"));
        assert!(msg.contains("invalid syntax"));
    }

    #[test]
    fn execution_error_is_transparent() {
        let err: ChainError = anyhow::anyhow!("rate limited").into();
        assert!(matches!(err, ChainError::Execution(_)));
        assert_eq!(err.to_string(), "rate limited");
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: ChainError = io_err.into();
        assert!(matches!(err, ChainError::Io(_)));
    }
}
