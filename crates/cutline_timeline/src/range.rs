// SPDX-License-Identifier: MIT OR Apache-2.0
//! Derived timeline ranges.
//!
//! A clip's visible placement is always recomputed from the clip and its
//! operations, never stored.

use crate::clip::Clip;
use crate::operation::{OperationList, OperationMap};
use serde::{Deserialize, Serialize};

/// Where a clip sits on the timeline and which source seconds it shows
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelineRange {
    /// Source in point, within the clip's trim bounds
    pub trim_start: f64,
    /// Source out point, within the clip's trim bounds
    pub trim_end: f64,
    /// Effective playback rate
    pub speed_rate: f64,
    /// Timeline seconds occupied
    pub visible_duration: f64,
    /// Timeline start
    pub start: f64,
    /// Timeline end
    pub end: f64,
}

impl TimelineRange {
    /// Whether `time` lies strictly inside the range with `margin` on both sides
    pub fn straddles(&self, time: f64, margin: f64) -> bool {
        time > self.start + margin && time < self.end - margin
    }

    /// Source seconds shown
    pub fn trimmed_length(&self) -> f64 {
        (self.trim_end - self.trim_start).max(0.0)
    }
}

/// Resolve the range of `clip` under `ops`.
///
/// Stale trim points are clamped into the clip's trim bounds and a missing,
/// disabled or non-positive speed counts as 1.0.
pub fn resolve_range(clip: &Clip, ops: Option<&OperationList>) -> TimelineRange {
    let lo = clip.trim_bound_start;
    let hi = clip.trim_bound_end.max(lo);

    let (raw_start, raw_end) = ops.and_then(OperationList::trim).unwrap_or((lo, hi));
    let trim_start = raw_start.clamp(lo, hi);
    let trim_end = raw_end.clamp(trim_start, hi);

    let speed_rate = ops.map_or(1.0, OperationList::speed_rate);
    let speed_rate = if speed_rate.is_finite() && speed_rate > 0.0 {
        speed_rate
    } else {
        1.0
    };

    let visible_duration = (trim_end - trim_start).max(0.0) / speed_rate;
    let start = clip.start_time;

    TimelineRange {
        trim_start,
        trim_end,
        speed_rate,
        visible_duration,
        start,
        end: start + visible_duration,
    }
}

/// Resolve a clip's range by looking its operations up in `ops`
pub fn range_of(clip: &Clip, ops: &OperationMap) -> TimelineRange {
    resolve_range(clip, ops.get(&clip.id))
}

/// Map timeline seconds to source seconds, clamped to the trimmed range
pub fn timeline_time_to_media_time(clip: &Clip, ops: Option<&OperationList>, time: f64) -> f64 {
    let range = resolve_range(clip, ops);
    let media = range.trim_start + (time - range.start) * range.speed_rate;
    media.clamp(range.trim_start, range.trim_end)
}

/// Map source seconds to timeline seconds; inverse of [`timeline_time_to_media_time`]
pub fn media_time_to_timeline_time(clip: &Clip, ops: Option<&OperationList>, media: f64) -> f64 {
    let range = resolve_range(clip, ops);
    let media = media.clamp(range.trim_start, range.trim_end);
    range.start + (media - range.trim_start) / range.speed_rate
}

/// Latest clip end over the whole timeline, or 0 with no clips
pub fn timeline_duration(clips: &[Clip], ops: &OperationMap) -> f64 {
    clips
        .iter()
        .map(|clip| range_of(clip, ops).end)
        .fold(0.0, f64::max)
}

/// Format seconds as `HH:MM:SS.mmm`
pub fn format_timecode(seconds: f64) -> String {
    let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis / 60_000) % 60;
    let secs = (total_millis / 1000) % 60;
    let millis = total_millis % 1000;
    format!("{hours:02}:{minutes:02}:{secs:02}.{millis:03}")
}
