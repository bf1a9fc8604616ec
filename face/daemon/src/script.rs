//! Scripted host events
//!
//! A script is JSON lines. Each line is one host callback or data event,
//! optionally delayed by `at_ms` from daemon start:
//!
//! ```text
//! {"event": "hardware", "low_bit_ambient": true}
//! {"event": "visibility", "visible": true}
//! {"at_ms": 1500, "event": "data", "topic": "weather-data", "fields": {"high": "72°", "low": "54°"}, "asset": "sun.png"}
//! {"at_ms": 5000, "event": "ambient", "ambient": true}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use std::collections::HashMap;

use chrono::FixedOffset;
use face_core::{
    AssetRef, DataEvent, DataEventKind, FieldValue, HardwareProperties, InterruptionFilter,
};
use serde::Deserialize;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};

/// Errors reading a script
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The underlying reader failed
    #[error("Failed to read script: {0}")]
    Io(#[from] std::io::Error),

    /// A line is not a valid script event
    #[error("Invalid script event on line {line}: {source}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// The JSON error
        source: serde_json::Error,
    },

    /// A time zone offset outside +/-24h
    #[error("Invalid time zone offset on line {line}: {minutes} minutes")]
    InvalidOffset {
        /// 1-based line number
        line: usize,
        /// The rejected offset
        minutes: i32,
    },
}

/// One scheduled script entry
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ScriptLine {
    /// Delay from daemon start
    #[serde(default)]
    pub at_ms: u64,

    /// What to deliver
    #[serde(flatten)]
    pub action: ScriptAction,
}

/// Host callbacks and data events a script can deliver
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptAction {
    /// Face shown or hidden
    Visibility {
        /// Whether the face is visible
        visible: bool,
    },
    /// Ambient mode entered or left
    Ambient {
        /// Whether the display is in ambient mode
        ambient: bool,
    },
    /// Interruption filter changed
    InterruptionFilter {
        /// New filter level
        filter: InterruptionFilter,
    },
    /// Display hardware properties
    Hardware {
        /// Display supports fewer bits in ambient mode
        #[serde(default)]
        low_bit_ambient: bool,
        /// Display needs burn-in protection
        #[serde(default)]
        burn_in_protection: bool,
    },
    /// Host minute tick
    TimeTick,
    /// Time zone changed
    TimeZone {
        /// Offset east of UTC in minutes
        offset_minutes: i32,
    },
    /// A companion data item changed
    Data {
        /// Item topic
        topic: String,
        /// Text fields
        #[serde(default)]
        fields: HashMap<String, String>,
        /// Attached asset
        #[serde(default)]
        asset: Option<String>,
        /// Deliver as a deletion instead of a change
        #[serde(default)]
        deleted: bool,
    },
}

impl ScriptAction {
    /// Short name for logging
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Visibility { .. } => "visibility",
            Self::Ambient { .. } => "ambient",
            Self::InterruptionFilter { .. } => "interruption_filter",
            Self::Hardware { .. } => "hardware",
            Self::TimeTick => "time_tick",
            Self::TimeZone { .. } => "time_zone",
            Self::Data { .. } => "data",
        }
    }

    /// Hardware properties carried by a `hardware` line
    #[must_use]
    pub fn hardware(&self) -> Option<HardwareProperties> {
        match *self {
            Self::Hardware {
                low_bit_ambient,
                burn_in_protection,
            } => Some(HardwareProperties {
                low_bit_ambient,
                burn_in_protection,
            }),
            _ => None,
        }
    }

    /// Data event carried by a `data` line
    #[must_use]
    pub fn data_event(&self) -> Option<DataEvent> {
        match self {
            Self::Data {
                topic,
                fields,
                asset,
                deleted,
            } => Some(DataEvent {
                kind: if *deleted {
                    DataEventKind::Deleted
                } else {
                    DataEventKind::Changed
                },
                topic: topic.clone(),
                fields: fields
                    .iter()
                    .map(|(k, v)| (k.clone(), FieldValue::Text(v.clone())))
                    .collect(),
                asset: asset.as_ref().map(AssetRef::new),
            }),
            _ => None,
        }
    }
}

/// Convert a scripted offset to a chrono offset
pub fn offset_from_minutes(line: usize, minutes: i32) -> Result<FixedOffset, ScriptError> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or(ScriptError::InvalidOffset { line, minutes })
}

/// Reads script lines one at a time from any async reader
pub struct ScriptReader<R> {
    lines: Lines<BufReader<R>>,
    line: usize,
}

impl<R: AsyncRead + Unpin> ScriptReader<R> {
    /// Wrap a reader
    pub fn new(reader: R) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
            line: 0,
        }
    }

    /// Line number of the entry last returned
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Next entry, or `None` at end of input
    ///
    /// # Errors
    ///
    /// Returns an error on read failure or an unparseable line.
    pub async fn next_line(&mut self) -> Result<Option<ScriptLine>, ScriptError> {
        while let Some(raw) = self.lines.next_line().await? {
            self.line += 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let parsed = serde_json::from_str(trimmed).map_err(|source| ScriptError::Parse {
                line: self.line,
                source,
            })?;
            return Ok(Some(parsed));
        }
        Ok(None)
    }
}
