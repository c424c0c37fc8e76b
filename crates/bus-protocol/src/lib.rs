//! bus-protocol: the envelope that carries every frame hub<->worker.
//!
//! All frames are JSON-on-wire. `payload` is always a flat UTF-8 string —
//! nested structures are stringified by the caller so the envelope itself
//! never nests.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Placeholder payload emitted when an internal helper has nothing to return.
pub const EMPTY_MESSAGE: &str = "";

/// Whether an envelope carries a normal payload or an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeType {
    Normal,
    Error,
}

impl Default for EnvelopeType {
    fn default() -> Self {
        Self::Normal
    }
}

/// The tagged message structure carried on the bus.
///
/// `root` is preserved across a request/reply pair: a reply built from a
/// parent envelope copies the parent's `root` verbatim (or, if there is no
/// parent, `root` is set equal to `id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Envelope {
    pub id: String,
    pub root: String,
    pub source: String,
    pub action: String,
    pub payload: String,
    #[serde(rename = "responseTo", default, skip_serializing_if = "String::is_empty")]
    pub response_to: String,
    #[serde(default)]
    pub tracing: HashMap<String, String>,
    #[serde(rename = "type", default)]
    pub kind: EnvelopeType,
}

impl Envelope {
    /// Build a fresh root request envelope with a newly minted id.
    pub fn new_request(source: impl Into<String>, action: impl Into<String>, payload: impl Into<String>) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        Self {
            root: id.clone(),
            id,
            source: source.into(),
            action: action.into(),
            payload: payload.into(),
            response_to: String::new(),
            tracing: HashMap::new(),
            kind: EnvelopeType::Normal,
        }
    }

    /// Build a reply envelope, copying the parent's `root` and `tracing`.
    ///
    /// When `parent` is `None` the new envelope's `root` equals its own `id`.
    pub fn reply_to(parent: Option<&Envelope>, source: impl Into<String>, action: impl Into<String>, payload: impl Into<String>) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        let (root, tracing) = match parent {
            Some(p) => (p.root.clone(), p.tracing.clone()),
            None => (id.clone(), HashMap::new()),
        };
        Self {
            id,
            root,
            source: source.into(),
            action: action.into(),
            payload: payload.into(),
            response_to: String::new(),
            tracing,
            kind: EnvelopeType::Normal,
        }
    }

    /// Build an error reply, same semantics as `reply_to` but `kind = Error`
    /// and `action = "error"`.
    pub fn error_reply(parent: Option<&Envelope>, source: impl Into<String>, payload: impl Into<String>) -> Self {
        let mut env = Self::reply_to(parent, source, "error", payload);
        env.kind = EnvelopeType::Error;
        env
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, EnvelopeType::Error)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

pub mod error_codes {
    pub const TIMEOUT: &str = "timeout exceeded";
    pub const UNKNOWN_REQUEST: &str = "unknown request";
    pub const UNKNOWN_STATE_PREFIX: &str = "unknown state";
}
