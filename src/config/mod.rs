//! Chain definitions and prompt interpolation.
//!
//! - Definition types in [`schema`]
//! - YAML loading in [`loader`]
//! - `{{path}}` interpolation in [`interpolation`]
//!
//! # Example
//!
//! ```
//! use promptchain::config::load_definition;
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! let path = temp.path().join("chain.yml");
//! fs::write(&path, "model: fast\nsteps:\n  - \"Summarize {{input.text}}\"\n").unwrap();
//!
//! let definition = load_definition(&path).unwrap();
//! assert_eq!(definition.model, Some("fast".to_string()));
//! assert_eq!(definition.steps.len(), 1);
//! ```

pub mod interpolation;
pub mod loader;
pub mod schema;

pub use interpolation::{
    extract_placeholders, interpolate, parse_template, render_value, resolve_path,
    unresolved_placeholders, Segment,
};
pub use loader::{load_definition, parse_definition};
pub use schema::{ChainDefinition, StepDescriptor, StepSpec};
