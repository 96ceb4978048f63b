//! Run-scoped state.
//!
//! Every run owns one [`StateLedger`], seeded with the caller's input and
//! discarded when the run ends. Nothing persists across runs.

pub mod ledger;

pub use ledger::{format_duration, CostSummary, Pricing, Snapshot, StateLedger};
