//! Error Types
//!
//! None of these errors are fatal. A failed sync leaves the presentation state
//! exactly as it was, and the render path keeps drawing whatever it holds.

use thiserror::Error;

use crate::sync::AssetRef;

/// Failures of the remote data sync pipeline
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The asset could not be resolved to bytes (timeout, unreachable peer,
    /// unknown reference)
    #[error("Asset transport unavailable for {asset}: {reason}")]
    TransportUnavailable {
        /// The reference that could not be resolved
        asset: AssetRef,
        /// Human readable cause
        reason: String,
    },

    /// The resolved bytes are not a supported image
    #[error("Failed to decode icon: {0}")]
    DecodeFailure(String),

    /// A data-change payload is missing a field or carries an unusable value
    #[error("Malformed event on topic {topic}: {detail}")]
    MalformedEvent {
        /// Topic the event arrived on
        topic: String,
        /// What was wrong with it
        detail: String,
    },
}

impl SyncError {
    /// Build a `TransportUnavailable` error for an asset
    pub fn transport(asset: &AssetRef, reason: impl Into<String>) -> Self {
        Self::TransportUnavailable {
            asset: asset.clone(),
            reason: reason.into(),
        }
    }

    /// Short machine friendly label, used as a structured log field
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TransportUnavailable { .. } => "transport_unavailable",
            Self::DecodeFailure(_) => "decode_failure",
            Self::MalformedEvent { .. } => "malformed_event",
        }
    }
}

/// Failures of the engine handle itself
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The scheduling task is no longer running
    #[error("Engine scheduler has stopped")]
    Stopped,

    /// A data event was dropped by the sync pipeline
    #[error(transparent)]
    Sync(#[from] SyncError),
}
