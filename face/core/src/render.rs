//! Render Pass Boundary
//!
//! The core does not draw. It composes a [`FrameModel`] from the latest
//! snapshot and the current time, and hands it to a host-provided
//! [`RenderPass`]. [`RenderDriver`] is the loop that does this whenever a
//! redraw is requested.

use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use tokio::sync::watch;

use crate::host::{Clock, RedrawSignal};
use crate::presentation::{IconImage, PresentationSnapshot, PresentationStore};
use crate::style::RenderStyle;

/// Frame composition settings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameOptions {
    /// Show hours 00-23 instead of 01-12
    pub hour_format_24: bool,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            hour_format_24: true,
        }
    }
}

/// Everything one frame shows, already formatted
#[derive(Clone, Debug, PartialEq)]
pub struct FrameModel {
    /// Two-digit hour
    pub hour: String,
    /// Two-digit minute
    pub minute: String,
    /// Two-digit second, interactive mode only
    pub second: Option<String>,
    /// Full weekday name
    pub day_of_week: String,
    /// Short date line
    pub date: String,
    /// `high low`, when any temperature is known
    pub temperature: Option<String>,
    /// Icon to draw, if it should be visible
    pub icon: Option<Arc<IconImage>>,
    /// Colors, weights, alpha and anti-aliasing for this frame
    pub style: RenderStyle,
    /// Snapshot revision the frame was composed from
    pub revision: u64,
}

impl FrameModel {
    /// Compose a frame for `now` from `snapshot`
    #[must_use]
    pub fn compose(
        snapshot: &PresentationSnapshot,
        now: DateTime<Utc>,
        options: &FrameOptions,
    ) -> Self {
        let local = now.with_timezone(&snapshot.utc_offset);
        let flags = snapshot.flags;

        let hour = if options.hour_format_24 {
            local.hour()
        } else {
            local.hour12().1
        };

        let second = (!flags.mode.is_ambient()).then(|| two_digits(local.second()));

        let temperature = (!snapshot.temperatures.is_empty()).then(|| {
            format!(
                "{} {}",
                snapshot.temperatures.high, snapshot.temperatures.low
            )
        });

        let icon_hidden = snapshot.style.icon_alpha == 0
            || (flags.mode.is_ambient() && flags.low_bit_ambient);
        let icon = if icon_hidden {
            None
        } else {
            snapshot.icon.clone()
        };

        Self {
            hour: two_digits(hour),
            minute: two_digits(local.minute()),
            second,
            day_of_week: local.format("%A").to_string(),
            date: local.format("%b %d %Y").to_string(),
            temperature,
            icon,
            style: snapshot.style,
            revision: snapshot.revision,
        }
    }

    /// `HH:MM` or `HH:MM:SS`
    #[must_use]
    pub fn time_text(&self) -> String {
        match &self.second {
            Some(second) => format!("{}:{}:{second}", self.hour, self.minute),
            None => format!("{}:{}", self.hour, self.minute),
        }
    }
}

fn two_digits(value: u32) -> String {
    format!("{value:02}")
}

/// Paints frames; implemented by the host
pub trait RenderPass: Send {
    /// Paint one frame
    fn paint(&mut self, frame: &FrameModel);
}

/// Paints a frame each time a redraw is requested
///
/// Bursts of requests that arrive while a frame is being painted collapse
/// into one follow-up frame.
pub struct RenderDriver<P> {
    store: PresentationStore,
    signal: Arc<RedrawSignal>,
    clock: Arc<dyn Clock>,
    options: FrameOptions,
    pass: P,
    frames: u64,
}

impl<P: RenderPass> RenderDriver<P> {
    /// Create a driver painting into `pass`
    pub fn new(
        store: PresentationStore,
        signal: Arc<RedrawSignal>,
        clock: Arc<dyn Clock>,
        options: FrameOptions,
        pass: P,
    ) -> Self {
        Self {
            store,
            signal,
            clock,
            options,
            pass,
            frames: 0,
        }
    }

    /// Paint one frame right now, outside the redraw loop
    ///
    /// Hosts call this when they demand a repaint themselves.
    pub fn paint_now(&mut self) {
        let snapshot = self.store.snapshot();
        let now = self.clock.now();
        let frame = FrameModel::compose(&snapshot, now, &self.options);
        self.pass.paint(&frame);
        self.frames = self.frames.saturating_add(1);
    }

    /// Frames painted so far
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Paint on every redraw request until `shutdown` becomes `true`, then
    /// hand the render pass back
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> P {
        tracing::debug!("Render driver started");
        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                () = self.signal.notified() => self.paint_now(),
            }
        }
        tracing::debug!(frames = self.frames, "Render driver stopped");
        self.pass
    }
}

impl<P> std::fmt::Debug for RenderDriver<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderDriver")
            .field("options", &self.options)
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}
