use std::time::Duration;

use crate::error::{RenderError, Result};

/// Frame timing snapshot handed to effects with every target.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct FrameTime {
    /// Time since the previous accepted frame, in seconds (clamped).
    pub dt: f32,

    /// Capture timestamp of this frame.
    pub timestamp: Duration,

    /// Monotonic frame counter over accepted frames.
    pub frame_index: u64,
}

/// Tracks capture timestamps and rejects ordering inversions.
///
/// Delta time is clamped to avoid pathological values when the camera stalls
/// (app backgrounded, exposure change) or delivers bursts.
#[derive(Debug, Clone)]
pub struct FrameTimeline {
    last: Option<Duration>,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameTimeline {
    /// Creates a timeline with default clamps.
    ///
    /// Clamp rationale:
    /// - minimum keeps dt non-zero for frames delivered back to back
    /// - maximum keeps animated effects stable after long stalls
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    /// Creates a timeline with custom delta-time clamps.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: None,
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    pub fn last_timestamp(&self) -> Option<Duration> {
        self.last
    }

    /// Accepts `timestamp` if it is strictly newer than the last accepted one.
    ///
    /// A rejected frame leaves the timeline untouched and yields `FrameOrder`.
    pub fn observe(&mut self, timestamp: Duration) -> Result<FrameTime> {
        let dt = match self.last {
            Some(previous) if timestamp <= previous => {
                return Err(RenderError::FrameOrder {
                    previous,
                    current: timestamp,
                });
            }
            Some(previous) => (timestamp - previous).clamp(self.dt_min, self.dt_max),
            None => self.dt_min,
        };

        self.last = Some(timestamp);

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            timestamp,
            frame_index: self.frame_index,
        };

        self.frame_index = self.frame_index.wrapping_add(1);

        Ok(ft)
    }
}

impl Default for FrameTimeline {
    fn default() -> Self {
        Self::new()
    }
}
