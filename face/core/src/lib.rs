//! Face Core - Render Scheduling and Remote Data Sync for the Sunshine watch face
//!
//! This crate decides *when* a small, power-constrained display must be
//! repainted and keeps remote weather data (temperature text plus an icon)
//! in sync without ever blocking the render path. It has no knowledge of
//! pixels, fonts or the wire transport; those are supplied by the host
//! through the traits in [`host`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                              Host                                 │
//! │   visibility / ambient / filter / hardware        data events     │
//! └──────────────┬───────────────────────────────────────┬───────────┘
//!                │ HostSignal (ordered)                  │ DataEvent
//! ┌──────────────┴──────────────┐         ┌──────────────┴───────────┐
//! │         Scheduler           │         │       SyncPipeline        │
//! │  ScheduleState::apply       │         │  temperatures (sync)      │
//! │  single deadline, aligned   │         │  fetch task (background)  │
//! └──────────────┬──────────────┘         └──────────────┬───────────┘
//!                │ publish                                │ publish
//!        ┌───────┴────────────────────────────────────────┴───────┐
//!        │                 PresentationStore                      │
//!        │        RwLock<Arc<PresentationSnapshot>>               │
//!        └───────────────────────────┬────────────────────────────┘
//!                                    │ snapshot()
//!                         ┌──────────┴──────────┐
//!                         │ RenderDriver / Pass │ <── RedrawSignal
//!                         └─────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Engine`]: wires everything together and exposes the host callbacks
//! - [`PresentationStore`]: the consistency boundary shared by every actor
//! - [`ScheduleState`]: the pure render scheduling state machine
//! - [`SyncPipeline`]: reacts to data-change events and fetches icons
//! - [`FrameModel`]: what a render pass needs to paint one frame
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use face_core::{Collaborators, Engine, FaceConfig, ImageIconDecoder, RedrawSignal, SystemClock};
//!
//! #[tokio::main]
//! async fn main() {
//!     let redraw = Arc::new(RedrawSignal::new());
//!     let collaborators = Collaborators {
//!         redraw: redraw.clone(),
//!         resolver: Arc::new(MyTransport::connect()),
//!         decoder: Arc::new(ImageIconDecoder),
//!         clock: Arc::new(SystemClock),
//!     };
//!     let engine = Engine::start(&FaceConfig::default(), collaborators);
//!
//!     engine.on_visibility_changed(true).unwrap();
//!     // redraw.notified().await, then paint engine.snapshot()
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod presentation;
pub mod render;
pub mod schedule;
pub mod style;
pub mod sync;

pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, FaceConfig, FaceToml,
};
pub use engine::{Collaborators, Engine};
pub use error::{EngineError, SyncError};
pub use host::{
    AssetResolver, Clock, IconDecoder, InterruptionFilter, RedrawSignal, RedrawSink, SystemClock,
};
pub use presentation::{
    DisplayFlags, DisplayMode, IconImage, PresentationSnapshot, PresentationStore, Temperatures,
};
pub use render::{FrameModel, FrameOptions, RenderDriver, RenderPass};
pub use schedule::{
    next_tick_delay, HardwareProperties, HostSignal, ScheduleState, SchedulePeriods, Scheduler,
    TimerEffect, TimerPhase, TimerStatus, Transition,
};
pub use style::{Palette, RenderStyle, Rgb, Weight};
pub use sync::{
    AssetRef, DataEvent, DataEventKind, FetchHandle, FieldValue, ImageIconDecoder, SyncConfig,
    SyncOutcome, SyncPipeline, SyncRequest, MAX_ICON_SIZE,
};
