//! Scheduler Task
//!
//! The single scheduling task. It owns the [`ScheduleState`] and the only
//! pending deadline, applies host signals in the order they were sent and
//! fires the tick when the deadline passes.
//!
//! Signals and fires are handled in one `select!` loop biased toward signals,
//! so a `Stop` that is processed before the deadline guarantees the stale fire
//! never runs: there is no separate timer thread to race with.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use super::{
    next_tick_delay, HostSignal, SchedulePeriods, ScheduleState, TimerEffect, TimerPhase,
    TimerStatus,
};
use crate::host::{Clock, RedrawSink};
use crate::presentation::PresentationStore;

/// Drives the render schedule
pub struct Scheduler {
    state: ScheduleState,
    periods: SchedulePeriods,
    deadline: Option<Instant>,
    fires: u64,
    store: PresentationStore,
    redraw: Arc<dyn RedrawSink>,
    clock: Arc<dyn Clock>,
    status_tx: watch::Sender<TimerStatus>,
}

impl Scheduler {
    /// Create a scheduler and a receiver for its timer status
    #[must_use]
    pub fn new(
        periods: SchedulePeriods,
        store: PresentationStore,
        redraw: Arc<dyn RedrawSink>,
        clock: Arc<dyn Clock>,
    ) -> (Self, watch::Receiver<TimerStatus>) {
        let initial = TimerStatus {
            period: periods.interactive,
            ..TimerStatus::default()
        };
        let (status_tx, status_rx) = watch::channel(initial);
        let scheduler = Self {
            state: ScheduleState::default(),
            periods,
            deadline: None,
            fires: 0,
            store,
            redraw,
            clock,
            status_tx,
        };
        (scheduler, status_rx)
    }

    /// Current scheduling state
    #[must_use]
    pub fn state(&self) -> ScheduleState {
        self.state
    }

    /// Current timer status
    #[must_use]
    pub fn status(&self) -> TimerStatus {
        TimerStatus {
            phase: if self.deadline.is_some() {
                TimerPhase::Ticking
            } else {
                TimerPhase::Idle
            },
            period: self.state.period(&self.periods),
            fires: self.fires,
        }
    }

    /// Pending deadline, if the timer is running
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Apply one host signal
    pub fn apply(&mut self, signal: HostSignal) {
        let transition = self.state.apply(&signal, &self.periods);

        if matches!(signal, HostSignal::HardwareProperties(_)) && self.state.hardware.is_some() {
            tracing::debug!("Ignoring repeated hardware properties report");
        }
        if let HostSignal::TimeZoneChanged(offset) = signal {
            self.store.set_utc_offset(offset);
        }

        self.state = transition.next;

        if transition.restyle {
            self.store.apply_display_flags(self.state.display_flags());
        }

        match transition.effect {
            TimerEffect::Start => self.deadline = Some(Instant::now()),
            TimerEffect::Stop => self.deadline = None,
            TimerEffect::None => {}
        }

        if transition.redraw {
            self.redraw.request_redraw();
        }

        tracing::debug!(
            ?signal,
            visible = self.state.visible,
            mode = ?self.state.mode,
            muted = self.state.muted,
            effect = ?transition.effect,
            "Applied host signal"
        );

        self.publish_status();
    }

    /// Handle the deadline passing: one redraw, then re-arm on the next
    /// period boundary
    pub fn fire(&mut self) {
        self.redraw.request_redraw();
        self.fires = self.fires.saturating_add(1);

        if self.state.phase() == TimerPhase::Ticking {
            let period_ms =
                u64::try_from(self.state.period(&self.periods).as_millis()).unwrap_or(u64::MAX);
            let delay = next_tick_delay(self.clock.now_millis(), period_ms);
            self.deadline = Some(Instant::now() + delay);
            tracing::trace!(delay_ms = delay.as_millis(), "Tick");
        } else {
            self.deadline = None;
        }

        self.publish_status();
    }

    /// Run until the signal channel closes
    pub async fn run(mut self, mut signals: mpsc::UnboundedReceiver<HostSignal>) {
        tracing::info!(
            interactive_ms = self.periods.interactive.as_millis(),
            muted_ms = self.periods.muted.as_millis(),
            "Starting render scheduler"
        );

        loop {
            let deadline = self.deadline;
            tokio::select! {
                biased;

                signal = signals.recv() => match signal {
                    Some(signal) => self.apply(signal),
                    None => break,
                },

                () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                    if deadline.is_some() => self.fire(),
            }
        }

        self.deadline = None;
        self.publish_status();
        tracing::info!(fires = self.fires, "Render scheduler stopped");
    }

    fn publish_status(&self) {
        let status = self.status();
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("state", &self.state)
            .field("periods", &self.periods)
            .field("deadline", &self.deadline)
            .field("fires", &self.fires)
            .finish_non_exhaustive()
    }
}
