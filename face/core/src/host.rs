//! Host Boundary
//!
//! Traits for the collaborators the core consumes but does not implement:
//! the redraw signal, asset resolution, image decoding and the wall clock.
//! Implementations live in the host (see `face-daemon` for a headless one).

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use crate::error::SyncError;
use crate::presentation::IconImage;
use crate::sync::AssetRef;

/// Outbound "please repaint" signal
///
/// Fire-and-forget. The host decides when to actually repaint and may merge
/// several requests into one frame; callers must not assume one request
/// equals one repaint.
pub trait RedrawSink: Send + Sync {
    /// Ask the host for a repaint
    fn request_redraw(&self);
}

/// Resolves an opaque asset reference to raw bytes
///
/// This is the only call in the core allowed to wait on external I/O. The
/// pipeline bounds it with its own timeout, so implementations need not.
#[async_trait]
pub trait AssetResolver: Send + Sync {
    /// Fetch the bytes behind `asset`
    ///
    /// # Errors
    ///
    /// Returns `SyncError::TransportUnavailable` when the transport cannot
    /// deliver the asset.
    async fn resolve(&self, asset: &AssetRef) -> Result<Vec<u8>, SyncError>;
}

/// Decodes image bytes and scales them to a square icon
pub trait IconDecoder: Send + Sync {
    /// Decode `bytes` and scale to `size` x `size` pixels
    ///
    /// # Errors
    ///
    /// Returns `SyncError::DecodeFailure` for corrupt or unsupported data.
    fn decode_and_scale(&self, bytes: &[u8], size: u32) -> Result<IconImage, SyncError>;
}

/// Source of wall-clock time
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;

    /// Milliseconds since the Unix epoch, used for tick alignment
    fn now_millis(&self) -> u64 {
        u64::try_from(self.now().timestamp_millis()).unwrap_or(0)
    }
}

/// The system wall clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Interruption filter levels reported by the host
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptionFilter {
    /// Every notification interrupts
    #[default]
    All,
    /// Only priority notifications interrupt
    Priority,
    /// Only alarms interrupt
    Alarms,
    /// Nothing interrupts
    None,
}

impl InterruptionFilter {
    /// The face treats only a total filter as muted
    #[must_use]
    pub fn is_muted(self) -> bool {
        matches!(self, Self::None)
    }
}

/// A [`RedrawSink`] that coalesces requests into a single pending wake-up
///
/// Any number of `request_redraw` calls between two `notified().await`s wake
/// the waiter once.
#[derive(Debug, Default)]
pub struct RedrawSignal {
    notify: Notify,
    requested: AtomicU64,
}

impl RedrawSignal {
    /// Create a signal with no pending request
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the next (possibly coalesced) redraw request
    pub async fn notified(&self) {
        self.notify.notified().await;
    }

    /// Total number of requests made so far
    #[must_use]
    pub fn requested(&self) -> u64 {
        self.requested.load(Ordering::SeqCst)
    }
}

impl RedrawSink for RedrawSignal {
    fn request_redraw(&self) {
        self.requested.fetch_add(1, Ordering::SeqCst);
        // notify_one stores a permit when nobody is waiting, so a request
        // made between two frames is not lost.
        self.notify.notify_one();
    }
}
