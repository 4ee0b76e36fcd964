//! In-memory, per-identity attention history.
//!
//! Each identity owns a rolling window of at most `window` records; the
//! oldest record is evicted when a new one arrives at capacity. The store is
//! a cheap-to-clone handle, so one instance created at startup can be handed
//! to every session and query handler.

use crate::{constants::DEFAULT_WINDOW_SIZE, Error, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// One score observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionRecord {
    /// Attention score in `[0, 1]`
    pub score: f64,
    /// Caller-supplied timestamp, stored verbatim
    pub timestamp: String,
}

/// Thread-safe store of per-identity score histories
#[derive(Debug, Clone)]
pub struct AttentionStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    histories: RwLock<HashMap<String, VecDeque<AttentionRecord>>>,
    window: usize,
}

impl AttentionStore {
    /// Create a store with the default window size
    #[must_use]
    pub fn new() -> Self {
        Self::build(DEFAULT_WINDOW_SIZE)
    }

    /// Create a store keeping at most `window` records per identity
    ///
    /// # Errors
    ///
    /// Returns an error if `window` is zero.
    pub fn with_window(window: usize) -> Result<Self> {
        if window == 0 {
            return Err(Error::InvalidInput("Window size must be greater than 0".to_string()));
        }
        Ok(Self::build(window))
    }

    fn build(window: usize) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                histories: RwLock::new(HashMap::new()),
                window,
            }),
        }
    }

    /// Maximum records kept per identity
    #[must_use]
    pub fn window(&self) -> usize {
        self.inner.window
    }

    /// Append a record, evicting the oldest one if the history is full
    ///
    /// # Errors
    ///
    /// Returns an error if `score` is not a number in `[0, 1]`; nothing is
    /// stored in that case.
    pub fn record(&self, id: &str, score: f64, timestamp: impl Into<String>) -> Result<()> {
        if !(0.0..=1.0).contains(&score) {
            return Err(Error::InvalidInput(format!("Score must be between 0.0 and 1.0, got {score}")));
        }

        let record = AttentionRecord {
            score,
            timestamp: timestamp.into(),
        };
        let window = self.inner.window;

        let mut histories = self.inner.histories.write();
        let history = histories
            .entry(id.to_string())
            .or_insert_with(|| VecDeque::with_capacity(window));

        if history.len() >= window {
            history.pop_front();
        }
        history.push_back(record);
        Ok(())
    }

    /// Up to the last `n` records for `id`, oldest first. Unknown ids yield
    /// an empty vector.
    #[must_use]
    pub fn get_latest(&self, id: &str, n: usize) -> Vec<AttentionRecord> {
        let histories = self.inner.histories.read();
        histories.get(id).map_or_else(Vec::new, |history| {
            let skip = history.len().saturating_sub(n);
            history.iter().skip(skip).cloned().collect()
        })
    }

    /// Most recent record of every known identity
    #[must_use]
    pub fn get_all_latest(&self) -> HashMap<String, Option<AttentionRecord>> {
        self.inner
            .histories
            .read()
            .iter()
            .map(|(id, history)| (id.clone(), history.back().cloned()))
            .collect()
    }

    /// All known identities, in no particular order
    #[must_use]
    pub fn get_identities(&self) -> Vec<String> {
        self.inner.histories.read().keys().cloned().collect()
    }

    /// Number of records currently held for `id`
    #[must_use]
    pub fn history_len(&self, id: &str) -> usize {
        self.inner.histories.read().get(id).map_or(0, VecDeque::len)
    }

    /// Number of known identities
    #[must_use]
    pub fn identity_count(&self) -> usize {
        self.inner.histories.read().len()
    }
}

impl Default for AttentionStore {
    fn default() -> Self {
        Self::new()
    }
}
