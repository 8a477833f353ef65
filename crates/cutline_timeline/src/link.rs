// SPDX-License-Identifier: MIT OR Apache-2.0
//! Linked groups binding sibling clips together.

use crate::clip::{Clip, ClipId, TrackKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Group ID shared by sibling clips
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub Uuid);

impl GroupId {
    /// Create a new random group ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-group "moves and trims together" flags.
///
/// Groups without an entry are linked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkedGroups {
    flags: IndexMap<GroupId, bool>,
}

impl LinkedGroups {
    /// Create an empty flag table
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the group moves together
    pub fn is_linked(&self, group: GroupId) -> bool {
        self.flags.get(&group).copied().unwrap_or(true)
    }

    /// Set the flag for a group
    pub fn set(&mut self, group: GroupId, linked: bool) {
        self.flags.insert(group, linked);
    }

    /// Forget a group
    pub fn remove(&mut self, group: GroupId) {
        self.flags.shift_remove(&group);
    }

    /// Drop flags for groups that no clip references any more
    pub fn retain_groups(&mut self, clips: &[Clip]) {
        self.flags
            .retain(|group, _| clips.iter().any(|c| c.group_id == *group));
    }

    /// Iterate over explicit flags
    pub fn iter(&self) -> impl Iterator<Item = (GroupId, bool)> + '_ {
        self.flags.iter().map(|(g, l)| (*g, *l))
    }

    /// Number of explicit flags
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Whether there are no explicit flags
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

/// All clips sharing `clip`'s group when that group is linked, else just `clip`.
///
/// The clip itself is always first.
pub fn linked_members(clips: &[Clip], linked: &LinkedGroups, clip_id: ClipId) -> Vec<ClipId> {
    let Some(clip) = clips.iter().find(|c| c.id == clip_id) else {
        return Vec::new();
    };

    let mut members = vec![clip.id];
    if linked.is_linked(clip.group_id) {
        members.extend(
            clips
                .iter()
                .filter(|c| c.group_id == clip.group_id && c.id != clip.id)
                .map(|c| c.id),
        );
    }
    members
}

/// Audio clip that volume/pitch edits of `clip_id` should target.
///
/// An audio clip targets itself; a video clip targets the first audio
/// sibling of its group while the group is linked.
pub fn linked_audio_target(
    clips: &[Clip],
    linked: &LinkedGroups,
    clip_id: ClipId,
) -> Option<ClipId> {
    let clip = clips.iter().find(|c| c.id == clip_id)?;
    if clip.track == TrackKind::Audio {
        return Some(clip.id);
    }
    if !linked.is_linked(clip.group_id) {
        return None;
    }
    clips
        .iter()
        .find(|c| c.group_id == clip.group_id && c.track == TrackKind::Audio)
        .map(|c| c.id)
}
