//! Chain execution.
//!
//! A [`Chain`] owns a list of declared steps and the executors they run
//! with. Each call to [`Chain::run`] creates a fresh ledger seeded with the
//! caller's input, resolves the steps into batches and executes the batches
//! in order. Steps inside a batch run concurrently and render their prompts
//! against the ledger as it stood when the batch started.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::try_join_all;
use futures::StreamExt;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::{interpolate, ChainDefinition, StepSpec};
use crate::error::{ChainError, Result};
use crate::provider::{Executor, StreamPart, Usage};
use crate::state::{format_duration, CostSummary, Pricing, Snapshot, StateLedger};
use crate::steps::{normalize_steps, OutputSpec, Step};

use super::dependency::{resolve_batches, ExecutionBatch};

/// Receives streamed chunks as `(chunk, step_id)`, in emission order.
pub type ChunkSink = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Lifecycle phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Normalizing,
    Resolving,
    /// Executing the batch with this index.
    Executing(usize),
    Completed,
    Failed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Normalizing => write!(f, "normalizing"),
            Self::Resolving => write!(f, "resolving"),
            Self::Executing(index) => write!(f, "executing batch {}", index),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Progress events emitted during a run.
#[derive(Debug)]
pub enum RunProgress<'a> {
    /// The run entered a new phase.
    Phase(RunPhase),
    /// A batch is about to start.
    BatchStarting {
        index: usize,
        total: usize,
        steps: Vec<&'a str>,
    },
    /// Every step of a batch completed.
    BatchFinished { index: usize, elapsed: Duration },
}

/// Everything needed to build a [`Chain`].
#[derive(Default)]
pub struct ChainConfig {
    /// Executor used by steps that do not name one.
    pub default_executor: Option<Arc<dyn Executor>>,

    /// Executors that steps can select by name.
    pub executors: HashMap<String, Arc<dyn Executor>>,

    /// Steps in declaration order.
    pub steps: Vec<StepSpec>,

    /// Stream freeform steps through `on_chunk`.
    pub streaming: bool,

    /// Sink for streamed chunks.
    pub on_chunk: Option<ChunkSink>,

    /// Rates used for cost accounting.
    pub pricing: Pricing,
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    /// The `output` entry if one was written, else the last written entry.
    pub output: Value,
    /// Every ledger entry, including the seeded `input`.
    pub state: Snapshot,
    /// Accumulated cost.
    pub cost: CostSummary,
    /// Accumulated step time, e.g. `"3.2s"`.
    pub duration: String,
    /// Accumulated step time.
    #[serde(skip)]
    pub elapsed: Duration,
}

/// An executable chain of steps.
pub struct Chain {
    config: ChainConfig,
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("steps", &self.config.steps)
            .field("executors", &self.config.executors.keys().collect::<Vec<_>>())
            .field("has_default_executor", &self.config.default_executor.is_some())
            .field("streaming", &self.config.streaming)
            .field("pricing", &self.config.pricing)
            .finish()
    }
}

impl Chain {
    pub fn new(config: ChainConfig) -> Self {
        Self { config }
    }

    /// Create a new chain builder.
    pub fn builder() -> ChainBuilder {
        ChainBuilder::new()
    }

    /// Build a chain from a definition, binding executor names to `executors`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownExecutor` if the definition's default model is not in
    /// `executors`. Unknown step-level models are reported when the step runs.
    pub fn from_definition(
        definition: &ChainDefinition,
        executors: HashMap<String, Arc<dyn Executor>>,
    ) -> Result<Self> {
        let default_executor = match &definition.model {
            Some(name) => Some(
                executors
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ChainError::UnknownExecutor { name: name.clone() })?,
            ),
            None => None,
        };

        Ok(Self::new(ChainConfig {
            default_executor,
            executors,
            steps: definition.steps.clone(),
            streaming: definition.streaming,
            on_chunk: None,
            pricing: definition.pricing.unwrap_or_default(),
        }))
    }

    /// Attach a chunk sink, replacing any existing one.
    pub fn with_chunk_sink(mut self, sink: ChunkSink) -> Self {
        self.config.on_chunk = Some(sink);
        self
    }

    /// Declared steps.
    pub fn steps(&self) -> &[StepSpec] {
        &self.config.steps
    }

    /// Normalize and resolve the steps without executing anything.
    pub fn plan(&self) -> Result<Vec<ExecutionBatch>> {
        resolve_batches(&normalize_steps(&self.config.steps))
    }

    /// Run the chain with `input` seeded under the `input` key.
    pub async fn run(&self, input: Map<String, Value>) -> Result<RunResult> {
        self.run_with_progress(input, |_| {}).await
    }

    /// Run the chain with a progress callback.
    pub async fn run_with_progress(
        &self,
        input: Map<String, Value>,
        mut on_progress: impl FnMut(RunProgress<'_>),
    ) -> Result<RunResult> {
        on_progress(RunProgress::Phase(RunPhase::Idle));
        let ledger = StateLedger::with_pricing(self.config.pricing);
        ledger.write("input", Value::Object(input));

        on_progress(RunProgress::Phase(RunPhase::Normalizing));
        let steps = normalize_steps(&self.config.steps);
        debug!(steps = steps.len(), "normalized steps");

        on_progress(RunProgress::Phase(RunPhase::Resolving));
        let batches = match resolve_batches(&steps) {
            Ok(batches) => batches,
            Err(e) => {
                warn!(error = %e, "chain aborted before execution");
                on_progress(RunProgress::Phase(RunPhase::Failed));
                return Err(e);
            }
        };

        info!(
            steps = steps.len(),
            batches = batches.len(),
            streaming = self.config.streaming,
            "chain run starting"
        );

        let total = batches.len();
        for batch in &batches {
            on_progress(RunProgress::Phase(RunPhase::Executing(batch.index)));
            on_progress(RunProgress::BatchStarting {
                index: batch.index,
                total,
                steps: batch.ids(),
            });

            let started = Instant::now();
            if let Err(e) = self.execute_batch(batch, &ledger).await {
                warn!(batch = batch.index, error = %e, "chain aborted");
                on_progress(RunProgress::Phase(RunPhase::Failed));
                return Err(e);
            }

            on_progress(RunProgress::BatchFinished {
                index: batch.index,
                elapsed: started.elapsed(),
            });
        }

        let output = ledger
            .read("output")
            .or_else(|| ledger.last_written().map(|(_, value)| value))
            .unwrap_or(Value::Null);
        let cost = ledger.cost();
        let elapsed = ledger.elapsed();

        info!(
            total_cost = cost.total_cost,
            total_units = cost.total_units,
            duration = %format_duration(elapsed),
            "chain run completed"
        );
        on_progress(RunProgress::Phase(RunPhase::Completed));

        Ok(RunResult {
            output,
            state: ledger.snapshot(),
            cost,
            duration: format_duration(elapsed),
            elapsed,
        })
    }

    /// Launch every step of the batch and wait for all of them.
    ///
    /// The first failure drops the steps still in flight.
    async fn execute_batch(&self, batch: &ExecutionBatch, ledger: &StateLedger) -> Result<()> {
        let snapshot = ledger.snapshot();
        try_join_all(
            batch
                .steps
                .iter()
                .map(|step| self.execute_step(step, &snapshot, ledger)),
        )
        .await?;
        Ok(())
    }

    async fn execute_step(
        &self,
        step: &Step,
        snapshot: &Snapshot,
        ledger: &StateLedger,
    ) -> Result<()> {
        let started = Instant::now();
        let prompt = interpolate(&step.prompt, snapshot);
        let executor = self.executor_for(step)?;

        debug!(step = %step.id, executor = executor.name(), "step starting");

        let (value, usage) = match &step.output {
            OutputSpec::Structured(schema) => {
                let generation = executor.generate_structured(&prompt, schema).await?;
                (generation.object, Some(generation.usage))
            }
            OutputSpec::Freeform if self.config.streaming => {
                let (text, usage) = self.stream_step(step, executor, &prompt).await?;
                (Value::String(text), usage)
            }
            OutputSpec::Freeform => {
                let generation = executor.generate_text(&prompt).await?;
                (Value::String(generation.text), Some(generation.usage))
            }
        };

        ledger.write(step.output_key.clone(), value);
        if let Some(usage) = usage {
            ledger.add_usage(usage);
        }
        let elapsed = started.elapsed();
        ledger.add_elapsed(elapsed);

        debug!(
            step = %step.id,
            output = %step.output_key,
            elapsed_ms = elapsed.as_millis() as u64,
            "step finished"
        );
        Ok(())
    }

    /// Forward every chunk to the sink, then return the assembled text.
    async fn stream_step(
        &self,
        step: &Step,
        executor: &dyn Executor,
        prompt: &str,
    ) -> Result<(String, Option<Usage>)> {
        let mut stream = executor.stream_text(prompt).await?;
        let mut text = String::new();
        let mut usage = None;

        while let Some(part) = stream.next().await {
            match part? {
                StreamPart::Delta(chunk) => {
                    if let Some(sink) = &self.config.on_chunk {
                        sink(&chunk, &step.id);
                    }
                    text.push_str(&chunk);
                }
                StreamPart::Finish(final_usage) => usage = Some(final_usage),
            }
        }

        Ok((text, usage))
    }

    /// Step-level executor by name, else the chain default.
    fn executor_for(&self, step: &Step) -> Result<&dyn Executor> {
        match &step.executor {
            Some(name) => self
                .config
                .executors
                .get(name)
                .map(|e| e.as_ref())
                .ok_or_else(|| ChainError::Configuration {
                    step: step.id.clone(),
                    message: format!("executor '{}' is not registered", name),
                }),
            None => self
                .config
                .default_executor
                .as_deref()
                .ok_or_else(|| ChainError::Configuration {
                    step: step.id.clone(),
                    message: "no step executor and no chain default".to_string(),
                }),
        }
    }
}

/// Builder for constructing a [`Chain`].
#[derive(Default)]
pub struct ChainBuilder {
    config: ChainConfig,
}

impl ChainBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor used by steps that do not name one.
    pub fn default_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.config.default_executor = Some(executor);
        self
    }

    /// Register an executor that steps can select by name.
    pub fn executor(mut self, name: impl Into<String>, executor: Arc<dyn Executor>) -> Self {
        self.config.executors.insert(name.into(), executor);
        self
    }

    /// Append a step.
    pub fn step(mut self, step: impl Into<StepSpec>) -> Self {
        self.config.steps.push(step.into());
        self
    }

    /// Append several steps.
    pub fn steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StepSpec>,
    {
        self.config.steps.extend(steps.into_iter().map(Into::into));
        self
    }

    pub fn streaming(mut self, streaming: bool) -> Self {
        self.config.streaming = streaming;
        self
    }

    /// Sink receiving `(chunk, step_id)` for every streamed chunk.
    pub fn on_chunk(mut self, sink: impl Fn(&str, &str) + Send + Sync + 'static) -> Self {
        self.config.on_chunk = Some(Arc::new(sink));
        self
    }

    pub fn pricing(mut self, pricing: Pricing) -> Self {
        self.config.pricing = pricing;
        self
    }

    /// Build the chain.
    pub fn build(self) -> Chain {
        Chain::new(self.config)
    }
}
