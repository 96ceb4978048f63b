//! Step records and normalization.
//!
//! - [`Step`] - A canonical step ready for scheduling
//! - [`OutputSpec`] - Freeform or schema-constrained output
//! - [`Schema`] - JSON Schema handle for structured output
//! - [`normalize_steps`] - Canonicalize declared step specs
//!
//! # Example
//!
//! ```
//! use promptchain::config::{StepDescriptor, StepSpec};
//! use promptchain::steps::normalize_steps;
//!
//! let specs: Vec<StepSpec> = vec![
//!     "Extract the facts from {{input.text}}".into(),
//!     StepDescriptor::new("Summarize {{step1}}").after(["step1"]).into(),
//! ];
//!
//! let steps = normalize_steps(&specs);
//! assert_eq!(steps[0].id, "step1");
//! assert_eq!(steps[1].id, "step2");
//! assert_eq!(steps[1].dependencies(), ["step1"]);
//! ```

pub mod normalize;
pub mod resolved;
pub mod schema;

pub use normalize::normalize_steps;
pub use resolved::{OutputSpec, Step};
pub use schema::Schema;
