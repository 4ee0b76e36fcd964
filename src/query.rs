//! Read-only query surface over the store.
//!
//! Response types serialize to the shapes served by the dashboard API:
//! `{"student_id": .., "scores": [..]}` for a history,
//! `{"<id>": {"score": .., "timestamp": ..}}` for the latest snapshot and
//! `{"students": [..]}` for the identity list. Transport is left to the
//! caller.

use crate::{
    constants::DEFAULT_QUERY_LIMIT,
    store::{AttentionRecord, AttentionStore},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// History of one identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoresResponse {
    /// Identity queried
    #[serde(rename = "student_id")]
    pub identity: String,
    /// Records, oldest first
    pub scores: Vec<AttentionRecord>,
}

/// Known identities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentitiesResponse {
    /// Identities, sorted
    #[serde(rename = "students")]
    pub identities: Vec<String>,
}

/// Query handler bound to a store
#[derive(Debug, Clone)]
pub struct QueryService {
    store: AttentionStore,
    default_limit: usize,
}

impl QueryService {
    /// Create a query service with the default history limit
    #[must_use]
    pub fn new(store: AttentionStore) -> Self {
        Self::with_default_limit(store, DEFAULT_QUERY_LIMIT)
    }

    /// Create a query service returning `default_limit` records when a
    /// history query carries no limit
    #[must_use]
    pub fn with_default_limit(store: AttentionStore, default_limit: usize) -> Self {
        Self { store, default_limit }
    }

    /// Last `limit` records of `identity`, oldest first
    #[must_use]
    pub fn scores(&self, identity: &str, limit: Option<usize>) -> ScoresResponse {
        ScoresResponse {
            identity: identity.to_string(),
            scores: self.store.get_latest(identity, limit.unwrap_or(self.default_limit)),
        }
    }

    /// Most recent record per identity
    #[must_use]
    pub fn latest(&self) -> HashMap<String, Option<AttentionRecord>> {
        self.store.get_all_latest()
    }

    /// All known identities
    #[must_use]
    pub fn identities(&self) -> IdentitiesResponse {
        let mut identities = self.store.get_identities();
        identities.sort_unstable();
        IdentitiesResponse { identities }
    }
}
