// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline model for Cutline.
//!
//! This crate holds the pure, I/O-free half of the editor:
//! - Clips placed on video/audio lanes
//! - Per-clip edit operations (trim, speed, volume, pitch)
//! - Derived timeline ranges and time mapping
//! - Lane overlap resolution with linked-group propagation
//! - Drag snapping with hysteresis
//! - Playhead advancement
//!
//! ## Architecture
//!
//! Clips never embed their operations or back-pointers to their groups.
//! Operations live in an id-keyed [`OperationMap`] and groups are found by
//! scanning for a shared [`GroupId`], so whole timelines clone cheaply.

pub mod clip;
pub mod link;
pub mod operation;
pub mod overlap;
pub mod playback;
pub mod range;
pub mod snap;

pub use clip::{Clip, ClipId, MediaInfo, TrackKind, EPSILON, MIN_CLIP_DURATION};
pub use link::{linked_audio_target, linked_members, GroupId, LinkedGroups};
pub use operation::{
    Operation, OperationId, OperationKind, OperationList, OperationMap, OperationParams,
    PITCH_RANGE, SPEED_RANGE, VOLUME_RANGE,
};
pub use overlap::{find_overlaps, resolve_overlaps, ResolveReport};
pub use playback::{LoopRange, PlaybackController, PlaybackState};
pub use range::{
    format_timecode, media_time_to_timeline_time, range_of, resolve_range,
    timeline_duration, timeline_time_to_media_time, TimelineRange,
};
pub use snap::{SnapEdge, SnapEngine, SnapResult, SnapTargets, SNAP_ENTER_PX, SNAP_EXIT_PX};
