//! Shared Presentation State
//!
//! The only state touched by more than one actor: the scheduler writes the
//! display flags, the sync pipeline writes temperatures and the icon, and the
//! render pass reads all of it.
//!
//! # Consistency
//!
//! The store holds an `Arc<PresentationSnapshot>`. Writers build the complete
//! next snapshot from the current one and swap the pointer while holding the
//! write lock; readers clone the pointer under a read lock held for a single
//! reference-count increment. A reader therefore sees either the old or the
//! new snapshot in full, never a mix, and keeps its copy valid for as long as
//! it paints (a replaced icon stays alive until the last frame using it is
//! done).
//!
//! No transformation logic lives here beyond re-deriving the [`RenderStyle`]
//! whenever the display flags change, which keeps flags and style in the same
//! commit.

use std::sync::Arc;

use chrono::{FixedOffset, Offset, Utc};
use parking_lot::RwLock;

use crate::error::SyncError;
use crate::style::{Palette, RenderStyle};

/// Display power mode. Exactly one holds at any time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DisplayMode {
    /// Normal, frequently refreshed display
    #[default]
    Interactive,
    /// Low-power display with reduced refresh and simplified rendering
    Ambient,
}

impl DisplayMode {
    /// Map the host's `in_ambient` flag to a mode
    #[must_use]
    pub fn from_ambient(in_ambient: bool) -> Self {
        if in_ambient {
            Self::Ambient
        } else {
            Self::Interactive
        }
    }

    /// Whether this is the ambient mode
    #[must_use]
    pub fn is_ambient(self) -> bool {
        matches!(self, Self::Ambient)
    }
}

/// Mode flags that affect rendering, always committed together
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DisplayFlags {
    /// Interactive or ambient
    pub mode: DisplayMode,
    /// Reduced color depth in ambient mode
    pub low_bit_ambient: bool,
    /// Panel requires burn-in protection
    pub burn_in_protection: bool,
    /// Interruptions are filtered out entirely
    pub muted: bool,
}

/// Temperature text, empty until the first successful sync
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Temperatures {
    /// Forecast high, already formatted by the companion (e.g. `72°`)
    pub high: String,
    /// Forecast low, already formatted by the companion (e.g. `54°`)
    pub low: String,
}

impl Temperatures {
    /// Create a temperature pair
    pub fn new(high: impl Into<String>, low: impl Into<String>) -> Self {
        Self {
            high: high.into(),
            low: low.into(),
        }
    }

    /// Whether no data has been synced yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.high.is_empty() && self.low.is_empty()
    }
}

/// A decoded, display-sized icon in RGBA8
#[derive(Clone, PartialEq, Eq)]
pub struct IconImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl IconImage {
    /// Wrap raw RGBA8 pixels
    ///
    /// # Errors
    ///
    /// Returns `SyncError::DecodeFailure` if the buffer length does not match
    /// the dimensions or the image is empty.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, SyncError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(4));
        if !expected.is_some_and(|len| len != 0 && rgba.len() == len) {
            return Err(SyncError::DecodeFailure(format!(
                "pixel buffer of {} bytes does not match {width}x{height} RGBA",
                rgba.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    /// Width in pixels
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 pixels, row-major
    #[must_use]
    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }
}

impl std::fmt::Debug for IconImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IconImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.len())
            .finish()
    }
}

/// Everything the render pass reads, as one immutable value
#[derive(Clone, Debug)]
pub struct PresentationSnapshot {
    /// Mode flags
    pub flags: DisplayFlags,
    /// Style derived from `flags`
    pub style: RenderStyle,
    /// Latest synced temperatures
    pub temperatures: Temperatures,
    /// Latest decoded icon, absent until the first successful fetch
    pub icon: Option<Arc<IconImage>>,
    /// Id of the sync request that produced `icon`
    pub icon_request: Option<u64>,
    /// Offset used to turn wall-clock instants into local time
    pub utc_offset: FixedOffset,
    /// Incremented on every commit
    pub revision: u64,
}

impl PresentationSnapshot {
    fn initial(palette: &Palette) -> Self {
        let flags = DisplayFlags::default();
        Self {
            flags,
            style: RenderStyle::derive(
                flags.mode,
                flags.low_bit_ambient,
                flags.burn_in_protection,
                flags.muted,
                palette,
            ),
            temperatures: Temperatures::default(),
            icon: None,
            icon_request: None,
            utc_offset: Utc.fix(),
            revision: 0,
        }
    }
}

/// Shared handle to the current presentation snapshot
#[derive(Clone)]
pub struct PresentationStore {
    current: Arc<RwLock<Arc<PresentationSnapshot>>>,
    palette: Arc<Palette>,
}

impl PresentationStore {
    /// Create a store with the initial (interactive, empty) snapshot
    #[must_use]
    pub fn new(palette: Palette) -> Self {
        let initial = PresentationSnapshot::initial(&palette);
        Self {
            current: Arc::new(RwLock::new(Arc::new(initial))),
            palette: Arc::new(palette),
        }
    }

    /// The current snapshot. Cheap; holds no lock once returned.
    #[must_use]
    pub fn snapshot(&self) -> Arc<PresentationSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Commit a new snapshot built from the current one
    ///
    /// `build` runs under the write lock so concurrent writers never lose each
    /// other's updates. Returning `None` leaves the store untouched. Returns
    /// whether a new snapshot was published.
    pub fn publish<F>(&self, build: F) -> bool
    where
        F: FnOnce(&PresentationSnapshot) -> Option<PresentationSnapshot>,
    {
        let mut slot = self.current.write();
        match build(&slot) {
            Some(mut next) => {
                next.revision = slot.revision.wrapping_add(1);
                *slot = Arc::new(next);
                true
            }
            None => false,
        }
    }

    /// Replace both temperatures in one commit
    pub fn set_temperatures(&self, temperatures: Temperatures) -> bool {
        self.publish(|current| {
            if current.temperatures == temperatures {
                return None;
            }
            let mut next = current.clone();
            next.temperatures = temperatures;
            Some(next)
        })
    }

    /// Replace the icon as a unit
    ///
    /// With `discard_stale` set, an icon from a request older than the one
    /// already displayed is dropped and `false` is returned.
    pub fn replace_icon(&self, icon: IconImage, request_id: u64, discard_stale: bool) -> bool {
        self.publish(|current| {
            if discard_stale && current.icon_request.is_some_and(|applied| applied > request_id) {
                return None;
            }
            let mut next = current.clone();
            next.icon = Some(Arc::new(icon));
            next.icon_request = Some(request_id);
            Some(next)
        })
    }

    /// Commit new display flags and the style derived from them
    pub fn apply_display_flags(&self, flags: DisplayFlags) -> bool {
        let palette = Arc::clone(&self.palette);
        self.publish(|current| {
            if current.flags == flags {
                return None;
            }
            let mut next = current.clone();
            next.flags = flags;
            next.style = RenderStyle::derive(
                flags.mode,
                flags.low_bit_ambient,
                flags.burn_in_protection,
                flags.muted,
                &palette,
            );
            Some(next)
        })
    }

    /// Change the local time offset
    pub fn set_utc_offset(&self, offset: FixedOffset) -> bool {
        self.publish(|current| {
            if current.utc_offset == offset {
                return None;
            }
            let mut next = current.clone();
            next.utc_offset = offset;
            Some(next)
        })
    }

    /// Palette the style is derived from
    #[must_use]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }
}

impl Default for PresentationStore {
    fn default() -> Self {
        Self::new(Palette::default())
    }
}

impl std::fmt::Debug for PresentationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresentationStore")
            .field("revision", &self.snapshot().revision)
            .finish_non_exhaustive()
    }
}
