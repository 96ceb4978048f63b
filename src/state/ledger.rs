//! Run-scoped state ledger.
//!
//! The ledger holds every value written during a run, keyed by output key,
//! together with running cost and duration totals. It is shared by all
//! steps of a batch, so every operation takes `&self` and serializes
//! through a single mutex.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::trace;

use crate::provider::Usage;

/// Full copy of the ledger's entries at one point in time.
pub type Snapshot = Map<String, Value>;

/// Two-tier rate used to price usage, per 1000 units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    /// Cost of 1000 input units.
    pub input_per_1k: f64,
    /// Cost of 1000 output units.
    pub output_per_1k: f64,
}

impl Pricing {
    pub fn new(input_per_1k: f64, output_per_1k: f64) -> Self {
        Self {
            input_per_1k,
            output_per_1k,
        }
    }

    /// Price a single usage record.
    pub fn cost_of(&self, usage: Usage) -> f64 {
        (usage.input_units as f64 / 1000.0) * self.input_per_1k
            + (usage.output_units as f64 / 1000.0) * self.output_per_1k
    }
}

impl Default for Pricing {
    fn default() -> Self {
        Self::new(0.003, 0.015)
    }
}

/// Accumulated cost of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CostSummary {
    /// Total cost in the pricing's currency.
    pub total_cost: f64,
    /// Total input and output units reported by executors.
    pub total_units: u64,
}

#[derive(Debug)]
struct Entry {
    value: Value,
    seq: u64,
}

#[derive(Debug, Default)]
struct LedgerInner {
    entries: HashMap<String, Entry>,
    writes: u64,
    cost: CostSummary,
    elapsed: Duration,
}

/// Concurrency-safe keyed store of step outputs plus cost and duration.
#[derive(Debug, Default)]
pub struct StateLedger {
    pricing: Pricing,
    inner: Mutex<LedgerInner>,
}

impl StateLedger {
    /// Create an empty ledger with default pricing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty ledger that prices usage with `pricing`.
    pub fn with_pricing(pricing: Pricing) -> Self {
        Self {
            pricing,
            inner: Mutex::default(),
        }
    }

    pub fn pricing(&self) -> Pricing {
        self.pricing
    }

    fn lock(&self) -> MutexGuard<'_, LedgerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn write(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        let mut inner = self.lock();
        inner.writes += 1;
        let seq = inner.writes;
        trace!(key = %key, seq, "ledger write");
        inner.entries.insert(key, Entry { value, seq });
    }

    /// Read the current value under `key`.
    pub fn read(&self, key: &str) -> Option<Value> {
        self.lock().entries.get(key).map(|e| e.value.clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Number of writes performed so far.
    pub fn write_count(&self) -> u64 {
        self.lock().writes
    }

    /// Copy of every entry.
    pub fn snapshot(&self) -> Snapshot {
        self.lock()
            .entries
            .iter()
            .map(|(k, e)| (k.clone(), e.value.clone()))
            .collect()
    }

    /// The entry written most recently, by write order.
    pub fn last_written(&self) -> Option<(String, Value)> {
        self.lock()
            .entries
            .iter()
            .max_by_key(|(_, e)| e.seq)
            .map(|(k, e)| (k.clone(), e.value.clone()))
    }

    /// Fold a usage record into the running cost.
    pub fn add_usage(&self, usage: Usage) {
        let cost = self.pricing.cost_of(usage);
        let mut inner = self.lock();
        inner.cost.total_cost += cost;
        inner.cost.total_units += usage.total();
    }

    /// Add wall-clock time spent in a step.
    pub fn add_elapsed(&self, elapsed: Duration) {
        self.lock().elapsed += elapsed;
    }

    pub fn cost(&self) -> CostSummary {
        self.lock().cost
    }

    /// Total step time accumulated so far.
    pub fn elapsed(&self) -> Duration {
        self.lock().elapsed
    }

    /// Total step time, formatted as seconds with one decimal.
    pub fn duration(&self) -> String {
        format_duration(self.elapsed())
    }
}

/// Format a duration as seconds with one decimal, e.g. `"3.2s"`.
pub fn format_duration(d: Duration) -> String {
    format!("{:.1}s", d.as_secs_f64())
}
