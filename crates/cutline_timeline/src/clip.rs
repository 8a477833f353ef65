// SPDX-License-Identifier: MIT OR Apache-2.0
//! Clip definitions for the timeline.

use crate::link::GroupId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Tolerance used for all overlap and equality comparisons on timeline seconds.
pub const EPSILON: f64 = 0.0001;

/// Minimum width a clip occupies while resolving placements.
pub const MIN_CLIP_DURATION: f64 = 0.01;

/// Unique identifier for a clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClipId(pub Uuid);

impl ClipId {
    /// Create a new random clip ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClipId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Kind of track a clip lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TrackKind {
    /// Video stream lane
    Video,
    /// Audio stream lane
    Audio,
}

impl TrackKind {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Video => "Video",
            Self::Audio => "Audio",
        }
    }

    /// Stream specifier suffix used when referencing an input stream
    pub fn stream_specifier(&self) -> &'static str {
        match self {
            Self::Video => "v",
            Self::Audio => "a",
        }
    }
}

/// Probed technical metadata for a media file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Container duration in seconds
    pub duration: f64,
    /// Frame width in pixels (0 when there is no video)
    pub width: u32,
    /// Frame height in pixels (0 when there is no video)
    pub height: u32,
    /// Frames per second (0 when unknown)
    pub fps: f64,
    /// Video codec name
    pub video_codec: Option<String>,
    /// Pixel format name
    pub pixel_format: Option<String>,
    /// Audio codec name
    pub audio_codec: Option<String>,
    /// Audio sample rate in Hz (0 when there is no audio)
    pub sample_rate: u32,
    /// File size in bytes
    pub file_size: u64,
    /// Whether a video stream is present
    pub has_video: bool,
    /// Whether an audio stream is present
    pub has_audio: bool,
}

/// One placed media segment on one lane.
///
/// `duration` is the full probed duration of the source and never changes.
/// `trim_bound_start..trim_bound_end` is the part of the source this clip
/// instance may reference; it narrows when the clip is split. Trim points
/// and speed live in the clip's operation list, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    /// Unique clip ID
    pub id: ClipId,
    /// Group shared with sibling clips (A/V of one import, halves of a split)
    pub group_id: GroupId,
    /// Source media path
    pub file_path: PathBuf,
    /// Track kind
    pub track: TrackKind,
    /// Lane number within the track kind
    pub track_index: u32,
    /// Position on the timeline in seconds
    pub start_time: f64,
    /// Full source duration in seconds
    pub duration: f64,
    /// First usable source second
    pub trim_bound_start: f64,
    /// Last usable source second
    pub trim_bound_end: f64,
    /// Probed metadata
    pub media_info: MediaInfo,
}

impl Clip {
    /// Create a clip spanning the whole source
    pub fn new(
        file_path: impl Into<PathBuf>,
        track: TrackKind,
        group_id: GroupId,
        media_info: MediaInfo,
    ) -> Self {
        let duration = media_info.duration.max(0.0);
        Self {
            id: ClipId::new(),
            group_id,
            file_path: file_path.into(),
            track,
            track_index: 0,
            start_time: 0.0,
            duration,
            trim_bound_start: 0.0,
            trim_bound_end: duration,
            media_info,
        }
    }

    /// Place the clip at a timeline position
    pub fn with_start(mut self, start_time: f64) -> Self {
        self.start_time = start_time.max(0.0);
        self
    }

    /// Place the clip on a lane
    pub fn with_track_index(mut self, track_index: u32) -> Self {
        self.track_index = track_index;
        self
    }

    /// Restrict the usable source range
    pub fn with_trim_bounds(mut self, start: f64, end: f64) -> Self {
        self.trim_bound_start = start;
        self.trim_bound_end = end;
        self.normalize();
        self
    }

    /// Clamp position and bounds back into `0 <= start <= end <= duration`
    pub fn normalize(&mut self) {
        if !self.start_time.is_finite() || self.start_time < 0.0 {
            self.start_time = 0.0;
        }
        self.duration = self.duration.max(0.0);
        self.trim_bound_start = self.trim_bound_start.clamp(0.0, self.duration);
        self.trim_bound_end = self.trim_bound_end.clamp(self.trim_bound_start, self.duration);
    }

    /// Width of the usable source range
    pub fn bound_length(&self) -> f64 {
        self.trim_bound_end - self.trim_bound_start
    }

    /// Lane key `(track, track_index)`
    pub fn lane(&self) -> (TrackKind, u32) {
        (self.track, self.track_index)
    }

    /// Whether the clip is on a video lane
    pub fn is_video(&self) -> bool {
        self.track == TrackKind::Video
    }

    /// Whether the clip is on an audio lane
    pub fn is_audio(&self) -> bool {
        self.track == TrackKind::Audio
    }
}
