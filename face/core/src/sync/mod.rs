//! Remote Data Sync Pipeline
//!
//! Reacts to push-style data-change events from the companion transport.
//! The cheap part (temperature text) is committed synchronously; the icon is
//! resolved, decoded and scaled by a background fetch task that publishes the
//! finished image in one commit.
//!
//! # Ordering
//!
//! Each event with an asset starts its own fetch. Superseded fetches are not
//! cancelled: whichever completes last is what the face shows, even if it was
//! requested first. Set [`SyncConfig::discard_stale_icons`] to drop
//! completions older than the icon already on screen instead.

mod decode;
mod fetch;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::SyncError;
use crate::host::{AssetResolver, Clock, IconDecoder, RedrawSink};
use crate::presentation::{PresentationStore, Temperatures};

pub use decode::ImageIconDecoder;
use fetch::FetchContext;

/// Topic the weather companion publishes on
pub const WEATHER_TOPIC: &str = "weather-data";
/// Field names accepted for the forecast high
pub const HIGH_FIELDS: [&str; 2] = ["high", "high-temp"];
/// Field names accepted for the forecast low
pub const LOW_FIELDS: [&str; 2] = ["low", "low-temp"];
/// Largest accepted icon edge, in pixels
pub const MAX_ICON_SIZE: u32 = 1024;

/// Opaque handle to remote image bytes
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetRef(String);

impl AssetRef {
    /// Wrap a transport-specific reference
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// The raw reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A field value as delivered by the transport
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Text value
    Text(String),
    /// Raw bytes, expected to be UTF-8 for text fields
    Bytes(Vec<u8>),
}

impl FieldValue {
    /// Interpret the value as text
    fn to_text(&self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text.clone()),
            Self::Bytes(bytes) => String::from_utf8(bytes.clone()).ok(),
        }
    }
}

/// Kind of data change
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataEventKind {
    /// The item was created or updated
    #[default]
    Changed,
    /// The item was removed
    Deleted,
}

/// A data-change notification from the transport
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEvent {
    /// Changed or deleted
    #[serde(default)]
    pub kind: DataEventKind,
    /// Topic (path) of the changed item
    pub topic: String,
    /// Named values carried by the item
    #[serde(default)]
    pub fields: HashMap<String, FieldValue>,
    /// Attached image asset, if any
    #[serde(default)]
    pub asset: Option<AssetRef>,
}

impl DataEvent {
    /// A `Changed` event on `topic` with no fields
    pub fn changed(topic: impl Into<String>) -> Self {
        Self {
            kind: DataEventKind::Changed,
            topic: topic.into(),
            ..Self::default()
        }
    }

    /// Add a text field
    #[must_use]
    pub fn with_text(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields
            .insert(key.into(), FieldValue::Text(value.into()));
        self
    }

    /// Add a bytes field
    #[must_use]
    pub fn with_bytes(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.fields
            .insert(key.into(), FieldValue::Bytes(value.into()));
        self
    }

    /// Attach an asset
    #[must_use]
    pub fn with_asset(mut self, asset: AssetRef) -> Self {
        self.asset = Some(asset);
        self
    }
}

/// One icon fetch, created per event that carries an asset
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncRequest {
    /// Increasing per pipeline, in arrival order
    pub id: u64,
    /// What to fetch
    pub asset: AssetRef,
    /// When the event arrived
    pub requested_at: DateTime<Utc>,
}

/// Handle to a running icon fetch
#[derive(Debug)]
pub struct FetchHandle {
    /// The request being served
    pub request: SyncRequest,
    handle: JoinHandle<Result<bool, SyncError>>,
}

impl FetchHandle {
    /// Wait for the fetch to finish
    ///
    /// Returns whether the icon was published (`false` when discarded as
    /// stale).
    ///
    /// # Errors
    ///
    /// Returns the fetch failure, or `DecodeFailure` if the task panicked.
    pub async fn join(self) -> Result<bool, SyncError> {
        self.handle
            .await
            .map_err(|e| SyncError::DecodeFailure(format!("fetch task failed: {e}")))?
    }
}

/// What happened to an inbound event
#[derive(Debug)]
pub enum SyncOutcome {
    /// Not a weather event, or a deletion
    Ignored,
    /// Temperatures committed, with a fetch if the event carried an asset
    Applied {
        /// The background icon fetch, if one was started
        fetch: Option<FetchHandle>,
    },
}

/// Pipeline settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    /// Topic to react to; a leading `/` is ignored on both sides
    pub topic: String,
    /// Upper bound on resolving one asset
    pub asset_timeout: Duration,
    /// Edge length of the square display icon, in pixels
    pub icon_size: u32,
    /// Drop icons older than the one already shown
    pub discard_stale_icons: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            topic: WEATHER_TOPIC.to_string(),
            asset_timeout: Duration::from_millis(500),
            icon_size: 40,
            discard_stale_icons: false,
        }
    }
}

/// Handles data-change events and runs icon fetches
pub struct SyncPipeline {
    config: SyncConfig,
    store: PresentationStore,
    redraw: Arc<dyn RedrawSink>,
    resolver: Arc<dyn AssetResolver>,
    decoder: Arc<dyn IconDecoder>,
    clock: Arc<dyn Clock>,
    runtime: Handle,
    next_id: AtomicU64,
    in_flight: Arc<AtomicUsize>,
}

impl SyncPipeline {
    /// Create a pipeline that spawns fetches on `runtime`
    #[must_use]
    pub fn new(
        config: SyncConfig,
        store: PresentationStore,
        redraw: Arc<dyn RedrawSink>,
        resolver: Arc<dyn AssetResolver>,
        decoder: Arc<dyn IconDecoder>,
        clock: Arc<dyn Clock>,
        runtime: Handle,
    ) -> Self {
        Self {
            config,
            store,
            redraw,
            resolver,
            decoder,
            clock,
            runtime,
            next_id: AtomicU64::new(1),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Pipeline settings
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Number of fetches currently running
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Handle one data-change event
    ///
    /// Never blocks: temperatures are committed before returning and the icon
    /// fetch, if any, runs in the background.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::MalformedEvent` when a weather event lacks a
    /// temperature; nothing is committed and no fetch is started.
    pub fn on_data_event(&self, event: DataEvent) -> Result<SyncOutcome, SyncError> {
        if event.kind != DataEventKind::Changed || !self.matches_topic(&event.topic) {
            tracing::trace!(topic = %event.topic, kind = ?event.kind, "Ignoring data event");
            return Ok(SyncOutcome::Ignored);
        }

        let temperatures = match extract_temperatures(&event) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(topic = %event.topic, error = %e, "Dropping malformed data event");
                return Err(e);
            }
        };

        tracing::info!(
            high = %temperatures.high,
            low = %temperatures.low,
            has_asset = event.asset.is_some(),
            "Weather data received"
        );

        self.store.set_temperatures(temperatures);
        self.redraw.request_redraw();

        let fetch = event.asset.map(|asset| self.start_fetch(asset));
        Ok(SyncOutcome::Applied { fetch })
    }

    fn matches_topic(&self, topic: &str) -> bool {
        topic.trim_start_matches('/') == self.config.topic.trim_start_matches('/')
    }

    fn start_fetch(&self, asset: AssetRef) -> FetchHandle {
        let request = SyncRequest {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            asset,
            requested_at: self.clock.now(),
        };

        let ctx = FetchContext {
            store: self.store.clone(),
            redraw: Arc::clone(&self.redraw),
            resolver: Arc::clone(&self.resolver),
            decoder: Arc::clone(&self.decoder),
            timeout: self.config.asset_timeout,
            icon_size: self.config.icon_size,
            discard_stale: self.config.discard_stale_icons,
            in_flight: Arc::clone(&self.in_flight),
        };

        let in_flight = ctx.begin();
        tracing::debug!(
            request_id = request.id,
            asset = %request.asset,
            in_flight,
            "Starting icon fetch"
        );

        let handle = self.runtime.spawn(fetch::run(ctx, request.clone()));
        FetchHandle { request, handle }
    }
}

impl fmt::Debug for SyncPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncPipeline")
            .field("config", &self.config)
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

/// Pull both temperatures out of a weather event
fn extract_temperatures(event: &DataEvent) -> Result<Temperatures, SyncError> {
    let field = |names: &[&str], label: &str| -> Result<String, SyncError> {
        let value = names
            .iter()
            .find_map(|name| event.fields.get(*name))
            .ok_or_else(|| SyncError::MalformedEvent {
                topic: event.topic.clone(),
                detail: format!("missing field {label}"),
            })?;
        value.to_text().ok_or_else(|| SyncError::MalformedEvent {
            topic: event.topic.clone(),
            detail: format!("field {label} is not valid UTF-8"),
        })
    };

    Ok(Temperatures {
        high: field(&HIGH_FIELDS, "high")?,
        low: field(&LOW_FIELDS, "low")?,
    })
}
