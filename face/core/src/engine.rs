//! Engine
//!
//! Wires the presentation store, the scheduler task and the sync pipeline
//! together and exposes the host callbacks. Every callback is synchronous
//! and returns immediately; ordering between schedule callbacks is preserved
//! by the scheduler's channel.

use std::sync::Arc;

use chrono::FixedOffset;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::FaceConfig;
use crate::error::EngineError;
use crate::host::{AssetResolver, Clock, IconDecoder, InterruptionFilter, RedrawSink};
use crate::presentation::{PresentationSnapshot, PresentationStore};
use crate::schedule::{HardwareProperties, HostSignal, Scheduler, TimerStatus};
use crate::sync::{DataEvent, SyncOutcome, SyncPipeline};

/// Host-provided collaborators
#[derive(Clone)]
pub struct Collaborators {
    /// Where redraw requests go
    pub redraw: Arc<dyn RedrawSink>,
    /// Asset transport
    pub resolver: Arc<dyn AssetResolver>,
    /// Image decoder
    pub decoder: Arc<dyn IconDecoder>,
    /// Wall clock
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// A running watch face engine
pub struct Engine {
    store: PresentationStore,
    signals: mpsc::UnboundedSender<HostSignal>,
    status: watch::Receiver<TimerStatus>,
    sync: SyncPipeline,
    scheduler: Option<JoinHandle<()>>,
}

impl Engine {
    /// Start the engine
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn start(config: &FaceConfig, collaborators: Collaborators) -> Self {
        let store = PresentationStore::new(config.palette);

        let (scheduler, status) = Scheduler::new(
            config.schedule,
            store.clone(),
            Arc::clone(&collaborators.redraw),
            Arc::clone(&collaborators.clock),
        );
        let (signals, rx) = mpsc::unbounded_channel();
        let scheduler = tokio::spawn(scheduler.run(rx));

        let sync = SyncPipeline::new(
            config.sync.clone(),
            store.clone(),
            collaborators.redraw,
            collaborators.resolver,
            collaborators.decoder,
            collaborators.clock,
            tokio::runtime::Handle::current(),
        );

        tracing::info!(
            topic = %config.sync.topic,
            icon_size = config.sync.icon_size,
            "Face engine started"
        );

        Self {
            store,
            signals,
            status,
            sync,
            scheduler: Some(scheduler),
        }
    }

    fn send(&self, signal: HostSignal) -> Result<(), EngineError> {
        self.signals.send(signal).map_err(|_| EngineError::Stopped)
    }

    /// The face became visible or hidden
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Stopped` after shutdown.
    pub fn on_visibility_changed(&self, visible: bool) -> Result<(), EngineError> {
        self.send(HostSignal::VisibilityChanged(visible))
    }

    /// The display entered or left ambient mode
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Stopped` after shutdown.
    pub fn on_ambient_mode_changed(&self, ambient: bool) -> Result<(), EngineError> {
        self.send(HostSignal::AmbientModeChanged(ambient))
    }

    /// The interruption filter changed
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Stopped` after shutdown.
    pub fn on_interruption_filter_changed(
        &self,
        filter: InterruptionFilter,
    ) -> Result<(), EngineError> {
        self.send(HostSignal::InterruptionFilterChanged {
            muted: filter.is_muted(),
        })
    }

    /// The host reported display hardware properties
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Stopped` after shutdown.
    pub fn on_hardware_properties(
        &self,
        properties: HardwareProperties,
    ) -> Result<(), EngineError> {
        self.send(HostSignal::HardwareProperties(properties))
    }

    /// The host's own minute tick
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Stopped` after shutdown.
    pub fn on_time_tick(&self) -> Result<(), EngineError> {
        self.send(HostSignal::TimeTick)
    }

    /// The device time zone changed
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Stopped` after shutdown.
    pub fn on_time_zone_changed(&self, offset: FixedOffset) -> Result<(), EngineError> {
        self.send(HostSignal::TimeZoneChanged(offset))
    }

    /// A data item changed on the companion transport
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Stopped` after shutdown, and
    /// `EngineError::Sync` wrapping `MalformedEvent` when the event was
    /// dropped.
    pub fn on_data_changed(&self, event: DataEvent) -> Result<SyncOutcome, EngineError> {
        if self.scheduler.is_none() {
            return Err(EngineError::Stopped);
        }
        Ok(self.sync.on_data_event(event)?)
    }

    /// Latest presentation state
    #[must_use]
    pub fn snapshot(&self) -> Arc<PresentationSnapshot> {
        self.store.snapshot()
    }

    /// Shared store, for render drivers
    #[must_use]
    pub fn store(&self) -> &PresentationStore {
        &self.store
    }

    /// Current timer status
    #[must_use]
    pub fn timer_status(&self) -> TimerStatus {
        *self.status.borrow()
    }

    /// Subscribe to timer status changes
    #[must_use]
    pub fn watch_timer(&self) -> watch::Receiver<TimerStatus> {
        self.status.clone()
    }

    /// Fetches still running
    #[must_use]
    pub fn fetches_in_flight(&self) -> usize {
        self.sync.in_flight()
    }

    /// Stop the scheduler
    ///
    /// Signals already sent are applied first. Fetches in flight are not
    /// cancelled and may still publish into the store.
    pub async fn shutdown(&mut self) {
        let Some(task) = self.scheduler.take() else {
            return;
        };

        let (closed, _) = mpsc::unbounded_channel();
        drop(std::mem::replace(&mut self.signals, closed));

        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Scheduler task ended abnormally");
        }
        tracing::info!("Face engine stopped");
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("status", &*self.status.borrow())
            .field("sync", &self.sync)
            .finish_non_exhaustive()
    }
}
