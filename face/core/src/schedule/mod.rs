//! Render Scheduling State Machine
//!
//! Decides whether the face must keep repainting on its own and how often.
//! The decision is a pure function of `(visible, mode, muted)` and the host
//! signal being applied; it returns the next state plus a [`TimerEffect`] for
//! the driver in [`timer`] to carry out.
//!
//! # States
//!
//! - `Idle`: no timer pending
//! - `Ticking`: a single fire is pending, every `period` aligned to the wall
//!   clock
//!
//! The timer is `Ticking` iff the face is visible and interactive. Ambient
//! mode always forces `Idle`; the host's own once-a-minute time tick keeps
//! the display fresh there.

pub mod timer;

use std::time::Duration;

use chrono::FixedOffset;

use crate::presentation::{DisplayFlags, DisplayMode};

pub use timer::Scheduler;

/// Default tick period while interactive
pub const INTERACTIVE_PERIOD: Duration = Duration::from_millis(1000);
/// Tick period while interruptions are muted
pub const MUTED_PERIOD: Duration = Duration::from_millis(60_000);

/// Tick periods for the two interruption states
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulePeriods {
    /// Period when not muted
    pub interactive: Duration,
    /// Period when muted
    pub muted: Duration,
}

impl Default for SchedulePeriods {
    fn default() -> Self {
        Self {
            interactive: INTERACTIVE_PERIOD,
            muted: MUTED_PERIOD,
        }
    }
}

/// Hardware capabilities reported once by the host
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HardwareProperties {
    /// Fewer color bits in ambient mode; anti-aliasing must be off there
    pub low_bit_ambient: bool,
    /// The panel needs burn-in protection
    pub burn_in_protection: bool,
}

/// Lifecycle callbacks from the host, applied strictly in arrival order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostSignal {
    /// The face became visible or hidden
    VisibilityChanged(bool),
    /// The device entered (`true`) or left ambient mode
    AmbientModeChanged(bool),
    /// The interruption filter changed
    InterruptionFilterChanged {
        /// Whether all interruptions are now filtered
        muted: bool,
    },
    /// Hardware capabilities became known
    HardwareProperties(HardwareProperties),
    /// Host minute tick (delivered in ambient mode too)
    TimeTick,
    /// The local time zone changed
    TimeZoneChanged(FixedOffset),
}

/// Whether the timer is running
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TimerPhase {
    /// No fire pending
    #[default]
    Idle,
    /// A fire is pending
    Ticking,
}

/// What the driver must do to its timer after a transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerEffect {
    /// Cancel anything pending and fire immediately
    Start,
    /// Cancel anything pending
    Stop,
    /// Leave the timer alone
    None,
}

/// Observable timer state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerStatus {
    /// Running or not
    pub phase: TimerPhase,
    /// Effective tick period
    pub period: Duration,
    /// Number of fires so far
    pub fires: u64,
}

impl Default for TimerStatus {
    fn default() -> Self {
        Self {
            phase: TimerPhase::Idle,
            period: INTERACTIVE_PERIOD,
            fires: 0,
        }
    }
}

/// The scheduler's view of the host
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScheduleState {
    /// Host reports the face as visible
    pub visible: bool,
    /// Interactive or ambient
    pub mode: DisplayMode,
    /// Interruptions filtered
    pub muted: bool,
    /// First hardware report, if any; later reports are ignored
    pub hardware: Option<HardwareProperties>,
}

/// Result of applying one host signal
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    /// State after the signal
    pub next: ScheduleState,
    /// Timer action
    pub effect: TimerEffect,
    /// Render-affecting flags changed and must be recommitted
    pub restyle: bool,
    /// The signal itself warrants a repaint
    pub redraw: bool,
}

impl ScheduleState {
    /// Timer phase implied by this state
    #[must_use]
    pub fn phase(&self) -> TimerPhase {
        if self.visible && self.mode == DisplayMode::Interactive {
            TimerPhase::Ticking
        } else {
            TimerPhase::Idle
        }
    }

    /// Effective tick period
    #[must_use]
    pub fn period(&self, periods: &SchedulePeriods) -> Duration {
        if self.muted {
            periods.muted
        } else {
            periods.interactive
        }
    }

    /// Render-affecting flags for the presentation store
    #[must_use]
    pub fn display_flags(&self) -> DisplayFlags {
        let hardware = self.hardware.unwrap_or_default();
        DisplayFlags {
            mode: self.mode,
            low_bit_ambient: hardware.low_bit_ambient,
            burn_in_protection: hardware.burn_in_protection,
            muted: self.muted,
        }
    }

    /// Apply one signal
    #[must_use]
    pub fn apply(self, signal: &HostSignal, periods: &SchedulePeriods) -> Transition {
        let mut next = self;
        let mut redraw = false;

        match *signal {
            HostSignal::VisibilityChanged(visible) => next.visible = visible,
            HostSignal::AmbientModeChanged(in_ambient) => {
                next.mode = DisplayMode::from_ambient(in_ambient);
                redraw = next.mode != self.mode;
            }
            HostSignal::InterruptionFilterChanged { muted } => {
                next.muted = muted;
                redraw = muted != self.muted;
            }
            HostSignal::HardwareProperties(properties) => {
                if self.hardware.is_none() {
                    next.hardware = Some(properties);
                }
            }
            HostSignal::TimeTick | HostSignal::TimeZoneChanged(_) => redraw = true,
        }

        let restyle = next.display_flags() != self.display_flags();
        let effect = match (self.phase(), next.phase()) {
            (TimerPhase::Idle, TimerPhase::Ticking) => TimerEffect::Start,
            (TimerPhase::Ticking, TimerPhase::Idle) => TimerEffect::Stop,
            (TimerPhase::Ticking, TimerPhase::Ticking)
                if next.period(periods) != self.period(periods) =>
            {
                TimerEffect::Start
            }
            _ => TimerEffect::None,
        };

        Transition {
            next,
            effect,
            restyle,
            redraw: redraw || restyle,
        }
    }
}

/// Delay until the next period boundary
///
/// Returns `period - (now mod period)`, which is always in `1..=period`
/// milliseconds, so ticks land on boundaries instead of drifting by the cost
/// of each redraw.
#[must_use]
pub fn next_tick_delay(now_ms: u64, period_ms: u64) -> Duration {
    let period_ms = period_ms.max(1);
    Duration::from_millis(period_ms - now_ms % period_ms)
}
