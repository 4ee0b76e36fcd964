//! Ingestion protocol for per-identity score channels.
//!
//! ## Protocol
//!
//! A session is bound to one identity. Each inbound message is JSON text:
//!
//! - `{"score": 0.8, "timestamp": "2026-02-23T20:25:00Z"}`
//!
//! `score` defaults to `0.0` and `timestamp` to `""` when absent. Anything
//! else (invalid JSON, a non-object, wrong field types, a score outside
//! `[0, 1]`) is rejected: the message is logged and dropped, no ack is sent,
//! and the session keeps running.
//!
//! Every accepted message is recorded and acknowledged with
//! `{"ack": true, "score": 0.8}`.

use crate::{store::AttentionStore, Error, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Validated ingestion payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestMessage {
    /// Attention score in `[0, 1]`
    #[serde(default)]
    pub score: f64,
    /// Opaque timestamp
    #[serde(default)]
    pub timestamp: String,
}

impl IngestMessage {
    /// Parse and validate a raw message
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedMessage`] if the payload does not match the
    /// schema or the score is out of range.
    pub fn parse(raw: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| Error::MalformedMessage(e.to_string()))?;

        // Derived deserializers also accept sequences; only objects are valid here
        if !value.is_object() {
            return Err(Error::MalformedMessage("expected a JSON object".to_string()));
        }

        let message: Self = serde_json::from_value(value).map_err(|e| Error::MalformedMessage(e.to_string()))?;

        if !(0.0..=1.0).contains(&message.score) {
            return Err(Error::MalformedMessage(format!(
                "score must be between 0.0 and 1.0, got {}",
                message.score
            )));
        }

        Ok(message)
    }
}

/// Acknowledgment sent for every recorded message
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    /// Always `true`
    pub ack: bool,
    /// Echo of the recorded score
    pub score: f64,
}

impl Ack {
    fn recorded(score: f64) -> Self {
        Self { ack: true, score }
    }
}

/// Message counters of one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Messages received
    pub received: usize,
    /// Messages recorded and acknowledged
    pub recorded: usize,
    /// Messages rejected as malformed
    pub rejected: usize,
}

/// Ingestion session for one identity
#[derive(Debug)]
pub struct IngestSession {
    identity: String,
    store: AttentionStore,
    summary: SessionSummary,
}

impl IngestSession {
    /// Open a session writing into `store` under `identity`
    pub fn new(identity: impl Into<String>, store: AttentionStore) -> Self {
        Self {
            identity: identity.into(),
            store,
            summary: SessionSummary::default(),
        }
    }

    /// Identity this session records under
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Counters so far
    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        self.summary
    }

    /// Validate, record and acknowledge one raw message
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedMessage`] for invalid payloads; nothing is
    /// recorded in that case.
    pub fn handle(&mut self, raw: &str) -> Result<Ack> {
        self.summary.received += 1;

        let message = match IngestMessage::parse(raw) {
            Ok(message) => message,
            Err(e) => {
                self.summary.rejected += 1;
                return Err(e);
            }
        };

        self.store.record(&self.identity, message.score, message.timestamp.as_str())?;
        self.summary.recorded += 1;
        log::info!("[{}] score={:.2}  ts={}", self.identity, message.score, message.timestamp);

        Ok(Ack::recorded(message.score))
    }

    /// Drive the session until either side closes.
    ///
    /// Messages are handled strictly in receipt order. The session ends when
    /// `inbound` is closed or `outbound` has no receiver left.
    pub async fn run(mut self, mut inbound: mpsc::Receiver<String>, outbound: mpsc::Sender<String>) -> SessionSummary {
        log::info!("[{}] Session opened", self.identity);

        while let Some(raw) = inbound.recv().await {
            let ack = match self.handle(&raw) {
                Ok(ack) => ack,
                Err(e) => {
                    log::warn!("[{}] Bad payload: {} raw={:?}", self.identity, e, raw);
                    continue;
                }
            };

            let reply = match serde_json::to_string(&ack) {
                Ok(reply) => reply,
                Err(e) => {
                    log::error!("[{}] Failed to encode ack: {}", self.identity, e);
                    continue;
                }
            };

            if outbound.send(reply).await.is_err() {
                log::info!("[{}] Peer stopped receiving acks", self.identity);
                break;
            }
        }

        log::info!(
            "[{}] Session closed ({} received, {} recorded, {} rejected)",
            self.identity,
            self.summary.received,
            self.summary.recorded,
            self.summary.rejected
        );
        self.summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_message() {
        let message = IngestMessage::parse(r#"{"score": 0.75, "timestamp": "2026-02-23T20:25:00Z"}"#).unwrap();
        assert_eq!(message.score, 0.75);
        assert_eq!(message.timestamp, "2026-02-23T20:25:00Z");
    }

    #[test]
    fn test_missing_fields_default() {
        let message = IngestMessage::parse(r#"{"timestamp": "t"}"#).unwrap();
        assert_eq!(message.score, 0.0);

        let message = IngestMessage::parse("{}").unwrap();
        assert_eq!(message.score, 0.0);
        assert_eq!(message.timestamp, "");
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let message = IngestMessage::parse(r#"{"score": 1, "timestamp": "t", "frame": 12}"#).unwrap();
        assert_eq!(message.score, 1.0);
    }

    #[test]
    fn test_malformed_messages_rejected() {
        for raw in [
            "not json",
            "",
            "42",
            "[0.5]",
            r#"{"score": "0.5"}"#,
            r#"{"score": null}"#,
            r#"{"score": 0.5, "timestamp": 17}"#,
            r#"{"score": 1.5}"#,
            r#"{"score": -0.1}"#,
        ] {
            let result = IngestMessage::parse(raw);
            assert!(matches!(result, Err(Error::MalformedMessage(_))), "accepted {raw:?}");
        }
    }

    #[test]
    fn test_ack_json_shape() {
        let json = serde_json::to_value(Ack::recorded(0.5)).unwrap();
        assert_eq!(json, serde_json::json!({"ack": true, "score": 0.5}));
    }

    #[test]
    fn test_handle_records_and_counts() {
        let store = AttentionStore::new();
        let mut session = IngestSession::new("student", store.clone());

        let ack = session.handle(r#"{"score": 0.4, "timestamp": "t0"}"#).unwrap();
        assert_eq!(ack, Ack { ack: true, score: 0.4 });
        assert!(session.handle("garbage").is_err());

        assert_eq!(
            session.summary(),
            SessionSummary {
                received: 2,
                recorded: 1,
                rejected: 1
            }
        );
        assert_eq!(store.get_latest("student", 10).len(), 1);
    }

    #[tokio::test]
    async fn test_run_survives_bad_payload() {
        let store = AttentionStore::new();
        let (in_tx, in_rx) = mpsc::channel(8);
        let (out_tx, mut out_rx) = mpsc::channel(8);

        let session = tokio::spawn(IngestSession::new("s1", store.clone()).run(in_rx, out_tx));

        in_tx.send(r#"{"score": 0.9, "timestamp": "a"}"#.to_string()).await.unwrap();
        in_tx.send("{broken".to_string()).await.unwrap();
        in_tx.send(r#"{"score": 0.3, "timestamp": "b"}"#.to_string()).await.unwrap();
        drop(in_tx);

        let first: Ack = serde_json::from_str(&out_rx.recv().await.unwrap()).unwrap();
        let second: Ack = serde_json::from_str(&out_rx.recv().await.unwrap()).unwrap();
        assert_eq!(first.score, 0.9);
        assert_eq!(second.score, 0.3);

        let summary = session.await.unwrap();
        assert_eq!(summary.recorded, 2);
        assert_eq!(summary.rejected, 1);
        assert!(out_rx.recv().await.is_none());

        let timestamps: Vec<_> = store.get_latest("s1", 10).into_iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_run_stops_when_peer_drops_acks() {
        let store = AttentionStore::new();
        let (in_tx, in_rx) = mpsc::channel(8);
        let (out_tx, out_rx) = mpsc::channel(8);
        drop(out_rx);

        in_tx.send(r#"{"score": 0.5}"#.to_string()).await.unwrap();
        let summary = IngestSession::new("s2", store.clone()).run(in_rx, out_tx).await;

        // The message was recorded before the ack failed
        assert_eq!(summary.recorded, 1);
        assert_eq!(store.history_len("s2"), 1);
    }
}
