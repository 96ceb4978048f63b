//! Step scheduling and chain execution.

pub mod chain;
pub mod dependency;

pub use chain::{
    Chain, ChainBuilder, ChainConfig, ChunkSink, RunPhase, RunProgress, RunResult,
};
pub use dependency::{resolve_batches, DependencyGraph, ExecutionBatch};
