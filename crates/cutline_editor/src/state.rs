// SPDX-License-Identifier: MIT OR Apache-2.0
//! Project state management.
//!
//! [`Project`] is the single writer of timeline state. Every mutating
//! command runs through [`Project::edit`], which snapshots the previous
//! state into history, clears redo, and afterwards recomputes the timeline
//! duration and clamps the playhead. Edit commands live in `edit`,
//! `clipboard` and `merge` as further `impl Project` blocks.

use crate::clipboard::Clipboard;
use crate::error::EditRejection;
use crate::history::{History, HistoryError, HistoryStats};
use cutline_timeline::{
    linked_audio_target, linked_members, range_of, resolve_overlaps, timeline_duration, Clip,
    ClipId, GroupId, LinkedGroups, MediaInfo, OperationKind, OperationList, OperationMap,
    OperationParams, PlaybackController, ResolveReport, SnapTargets, TimelineRange, TrackKind,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Selection mode for multi-select operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectMode {
    /// Replace current selection
    #[default]
    Set,
    /// Add to current selection (Shift+Click)
    Add,
    /// Remove from current selection (Ctrl+Click)
    Remove,
    /// Toggle in current selection (Ctrl+Shift+Click)
    Toggle,
}

/// Clip selection state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Currently selected clips, in selection order
    pub clips: Vec<ClipId>,
}

impl Selection {
    /// Create a new empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a selection with the given clips
    pub fn with_clips(clips: impl Into<Vec<ClipId>>) -> Self {
        Self { clips: clips.into() }
    }

    /// Check if a clip is selected
    pub fn contains(&self, id: &ClipId) -> bool {
        self.clips.contains(id)
    }

    /// Add a clip to the selection (idempotent)
    pub fn add(&mut self, id: ClipId) {
        if !self.contains(&id) {
            self.clips.push(id);
        }
    }

    /// Remove a clip from the selection
    pub fn remove(&mut self, id: &ClipId) {
        self.clips.retain(|c| c != id);
    }

    /// Toggle a clip in the selection
    pub fn toggle(&mut self, id: ClipId) {
        if self.contains(&id) {
            self.remove(&id);
        } else {
            self.add(id);
        }
    }

    /// Clear the selection
    pub fn clear(&mut self) {
        self.clips.clear();
    }

    /// Check if the selection is empty
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Get the number of selected clips
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Iterate over selected clips
    pub fn iter(&self) -> impl Iterator<Item = &ClipId> {
        self.clips.iter()
    }

    /// Get the primary (last) selected clip
    pub fn primary(&self) -> Option<&ClipId> {
        self.clips.last()
    }

    /// Selected ids in a canonical order, for comparing selections
    pub fn sorted(&self) -> Vec<ClipId> {
        let mut ids = self.clips.clone();
        ids.sort();
        ids
    }
}

/// Number of lanes per track kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackCounts {
    /// Video lanes
    pub video: u32,
    /// Audio lanes
    pub audio: u32,
}

impl TrackCounts {
    /// Lane count for `kind`
    pub fn get(&self, kind: TrackKind) -> u32 {
        match kind {
            TrackKind::Video => self.video,
            TrackKind::Audio => self.audio,
        }
    }

    fn get_mut(&mut self, kind: TrackKind) -> &mut u32 {
        match kind {
            TrackKind::Video => &mut self.video,
            TrackKind::Audio => &mut self.audio,
        }
    }
}

impl Default for TrackCounts {
    fn default() -> Self {
        Self { video: 1, audio: 1 }
    }
}

/// Deep copy of everything undo restores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    /// Clips in list order
    pub clips: Vec<Clip>,
    /// Operations by clip
    pub operations: OperationMap,
    /// Selection
    pub selection: Selection,
    /// Link flags by group
    pub linked_groups: LinkedGroups,
    /// Cached timeline duration
    pub timeline_duration: f64,
    /// Lanes per track kind
    pub track_counts: TrackCounts,
    /// Playhead
    pub current_time: f64,
    /// Group created by a split mapped to the group it came from
    pub group_lineage: IndexMap<GroupId, GroupId>,
}

/// The editable project
#[derive(Debug)]
pub struct Project {
    pub(crate) clips: Vec<Clip>,
    pub(crate) operations: OperationMap,
    pub(crate) selection: Selection,
    pub(crate) linked_groups: LinkedGroups,
    pub(crate) timeline_duration: f64,
    pub(crate) track_counts: TrackCounts,
    pub(crate) current_time: f64,
    pub(crate) group_lineage: IndexMap<GroupId, GroupId>,
    pub(crate) clipboard: Option<Clipboard>,
    playing: bool,
    history: History,
}

impl Project {
    /// Create an empty project
    pub fn new() -> Self {
        Self::with_history(History::new())
    }

    /// Create an empty project keeping at most `depth` undo steps
    pub fn with_history_depth(depth: usize) -> Self {
        Self::with_history(History::with_max_depth(depth))
    }

    fn with_history(history: History) -> Self {
        Self {
            clips: Vec::new(),
            operations: OperationMap::new(),
            selection: Selection::new(),
            linked_groups: LinkedGroups::new(),
            timeline_duration: 0.0,
            track_counts: TrackCounts::default(),
            current_time: 0.0,
            group_lineage: IndexMap::new(),
            clipboard: None,
            playing: false,
            history,
        }
    }

    // ---- Queries ---------------------------------------------------------

    /// Clips in list order
    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    /// Get a clip by ID
    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == id)
    }

    pub(crate) fn clip_mut(&mut self, id: ClipId) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|c| c.id == id)
    }

    /// Operations of every clip
    pub fn operations(&self) -> &OperationMap {
        &self.operations
    }

    /// Operations of one clip
    pub fn operations_for(&self, id: ClipId) -> Option<&OperationList> {
        self.operations.get(&id)
    }

    /// Derived range of a clip
    pub fn range(&self, id: ClipId) -> Option<TimelineRange> {
        self.clip(id).map(|clip| range_of(clip, &self.operations))
    }

    /// Current selection
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Link flags
    pub fn linked_groups(&self) -> &LinkedGroups {
        &self.linked_groups
    }

    /// End of the last clip
    pub fn timeline_duration(&self) -> f64 {
        self.timeline_duration
    }

    /// Lanes per track kind
    pub fn track_counts(&self) -> TrackCounts {
        self.track_counts
    }

    /// Playhead position
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Split-created groups mapped to their origin group
    pub fn group_lineage(&self) -> &IndexMap<GroupId, GroupId> {
        &self.group_lineage
    }

    /// Group a clip originally came from, following split lineage
    pub fn origin_group(&self, group: GroupId) -> GroupId {
        self.group_lineage.get(&group).copied().unwrap_or(group)
    }

    /// Whether playback is running
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Snap candidates for dragging `exclude`
    pub fn snap_targets(&self, exclude: Option<ClipId>) -> SnapTargets {
        SnapTargets::collect(&self.clips, &self.operations, self.current_time, exclude)
    }

    /// Copy of the clips and operations an export should read
    pub fn export_source(&self) -> (Vec<Clip>, OperationMap) {
        (self.clips.clone(), self.operations.clone())
    }

    /// Deep copy of the undoable state
    pub fn snapshot(&self) -> ProjectSnapshot {
        ProjectSnapshot {
            clips: self.clips.clone(),
            operations: self.operations.clone(),
            selection: self.selection.clone(),
            linked_groups: self.linked_groups.clone(),
            timeline_duration: self.timeline_duration,
            track_counts: self.track_counts,
            current_time: self.current_time,
            group_lineage: self.group_lineage.clone(),
        }
    }

    fn restore(&mut self, snapshot: ProjectSnapshot) {
        self.clips = snapshot.clips;
        self.operations = snapshot.operations;
        self.selection = snapshot.selection;
        self.linked_groups = snapshot.linked_groups;
        self.timeline_duration = snapshot.timeline_duration;
        self.track_counts = snapshot.track_counts;
        self.current_time = snapshot.current_time;
        self.group_lineage = snapshot.group_lineage;
    }

    // ---- Edit plumbing ---------------------------------------------------

    /// Run a mutating command.
    ///
    /// `apply` returns whether it changed anything; it must not touch state
    /// when it returns `false`. Changed state is recorded in history.
    pub(crate) fn edit(
        &mut self,
        description: &str,
        apply: impl FnOnce(&mut Self) -> bool,
    ) -> bool {
        let before = self.snapshot();
        if !apply(self) {
            return false;
        }
        if let Err(err) = self.history.record(description, &before) {
            tracing::warn!("Could not record history for {description}: {err}");
        }
        self.finish_edit();
        tracing::debug!("{description}");
        true
    }

    /// Restore derived state after a mutation
    fn finish_edit(&mut self) {
        for clip in &mut self.clips {
            clip.normalize();
        }

        let ids: HashSet<ClipId> = self.clips.iter().map(|c| c.id).collect();
        self.operations.retain(|id, _| ids.contains(id));
        for clip in &self.clips {
            self.operations
                .entry(clip.id)
                .or_insert_with(|| OperationList::for_clip(clip))
                .ensure_complete(clip.trim_bound_start, clip.trim_bound_end);

            let lanes = self.track_counts.get_mut(clip.track);
            *lanes = (*lanes).max(clip.track_index + 1);
        }

        self.selection.clips.retain(|id| ids.contains(id));
        self.linked_groups.retain_groups(&self.clips);
        let groups: HashSet<GroupId> = self.clips.iter().map(|c| c.group_id).collect();
        self.group_lineage.retain(|group, _| groups.contains(group));

        self.timeline_duration = timeline_duration(&self.clips, &self.operations);
        self.current_time = self.current_time.clamp(0.0, self.timeline_duration);
    }

    pub(crate) fn resolve(&mut self, active: &HashSet<ClipId>) -> ResolveReport {
        resolve_overlaps(&mut self.clips, &self.operations, &self.linked_groups, active)
    }

    pub(crate) fn linked_members(&self, id: ClipId) -> Vec<ClipId> {
        linked_members(&self.clips, &self.linked_groups, id)
    }

    // ---- History ---------------------------------------------------------

    /// Undo the last edit; returns whether anything was undone
    pub fn undo(&mut self) -> bool {
        let current = self.snapshot();
        match self.history.undo(&current) {
            Ok(previous) => {
                self.restore(previous);
                self.playing = false;
                tracing::info!("Undo");
                true
            }
            Err(HistoryError::NothingToUndo) => false,
            Err(err) => {
                tracing::warn!("Undo failed: {err}");
                false
            }
        }
    }

    /// Redo the last undone edit; returns whether anything was redone
    pub fn redo(&mut self) -> bool {
        let current = self.snapshot();
        match self.history.redo(&current) {
            Ok(next) => {
                self.restore(next);
                self.playing = false;
                tracing::info!("Redo");
                true
            }
            Err(HistoryError::NothingToRedo) => false,
            Err(err) => {
                tracing::warn!("Redo failed: {err}");
                false
            }
        }
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Description of the edit undo would revert
    pub fn undo_description(&self) -> Option<&str> {
        self.history.undo_description()
    }

    /// History statistics
    pub fn history_stats(&self) -> HistoryStats {
        self.history.stats()
    }

    // ---- Import ----------------------------------------------------------

    /// Append probed media at the end of the timeline.
    ///
    /// Each file yields one clip per stream, sharing a fresh group. Files
    /// without streams or duration are skipped. Returns the new clip ids.
    pub fn import_media(&mut self, media: Vec<(PathBuf, MediaInfo)>) -> Vec<ClipId> {
        let mut added = Vec::new();
        self.edit("Import media", |project| {
            let mut cursor = project.timeline_duration;
            for (path, info) in media {
                let has_length = info.duration.is_finite() && info.duration > 0.0;
                if !has_length || !(info.has_video || info.has_audio) {
                    tracing::warn!("Skipping {:?}: no usable streams", path);
                    continue;
                }

                let group = GroupId::new();
                let streams = [
                    (info.has_video, TrackKind::Video),
                    (info.has_audio, TrackKind::Audio),
                ];
                for (present, track) in streams {
                    if !present {
                        continue;
                    }
                    let clip =
                        Clip::new(path.clone(), track, group, info.clone()).with_start(cursor);
                    project.operations.insert(clip.id, OperationList::for_clip(&clip));
                    added.push(clip.id);
                    project.clips.push(clip);
                }
                cursor += info.duration;
            }

            if added.is_empty() {
                return false;
            }
            let active: HashSet<ClipId> = added.iter().copied().collect();
            project.resolve(&active);
            true
        });

        if !added.is_empty() {
            tracing::info!("Imported {} clips", added.len());
        }
        added
    }

    // ---- Parameter setters -----------------------------------------------

    /// Set the trim points of one clip (media seconds, clamped to its bounds)
    pub fn set_trim(&mut self, id: ClipId, start_time: f64, end_time: f64) -> bool {
        let Some(clip) = self.clip(id) else {
            return false;
        };
        if !start_time.is_finite() || !end_time.is_finite() {
            return false;
        }
        let start_time = start_time.clamp(clip.trim_bound_start, clip.trim_bound_end);
        let end_time = end_time.clamp(start_time, clip.trim_bound_end);

        self.edit("Set trim", |project| {
            let Some(ops) = project.operations.get_mut(&id) else {
                return false;
            };
            let changed = ops.set_params(OperationParams::Trim { start_time, end_time })
                | ops.set_enabled(OperationKind::Trim, true);
            if changed {
                project.resolve(&HashSet::from([id]));
            }
            changed
        })
    }

    /// Set the speed of a clip and every linked sibling
    pub fn set_speed(&mut self, id: ClipId, rate: f64) -> bool {
        if !rate.is_finite() {
            return false;
        }
        let members = self.linked_members(id);
        if members.is_empty() {
            return false;
        }

        self.edit("Set speed", |project| {
            let mut changed = false;
            for member in &members {
                if let Some(ops) = project.operations.get_mut(member) {
                    changed |= ops.set_params(OperationParams::Speed { rate });
                    changed |= ops.set_enabled(OperationKind::Speed, true);
                }
            }
            if changed {
                project.resolve(&members.iter().copied().collect());
            }
            changed
        })
    }

    /// Set the volume of the clip's audio
    pub fn set_volume(&mut self, id: ClipId, percent: f64) -> Result<bool, EditRejection> {
        self.set_audio_param(id, "Set volume", OperationParams::Volume { percent })
    }

    /// Set the pitch of the clip's audio
    pub fn set_pitch(&mut self, id: ClipId, percent: f64) -> Result<bool, EditRejection> {
        self.set_audio_param(id, "Set pitch", OperationParams::Pitch { percent })
    }

    fn set_audio_param(
        &mut self,
        id: ClipId,
        description: &str,
        params: OperationParams,
    ) -> Result<bool, EditRejection> {
        if self.clip(id).is_none() {
            return Ok(false);
        }
        let target = self.audio_target(id)?;
        let kind = params.kind();

        Ok(self.edit(description, |project| {
            let Some(ops) = project.operations.get_mut(&target) else {
                return false;
            };
            ops.set_params(params) | ops.set_enabled(kind, true)
        }))
    }

    fn audio_target(&self, id: ClipId) -> Result<ClipId, EditRejection> {
        linked_audio_target(&self.clips, &self.linked_groups, id)
            .ok_or(EditRejection::NoLinkedAudio)
    }

    /// Enable or disable one operation.
    ///
    /// Speed follows the linked group; volume and pitch go to the linked
    /// audio clip.
    pub fn toggle_operation(
        &mut self,
        id: ClipId,
        kind: OperationKind,
        enabled: bool,
    ) -> Result<bool, EditRejection> {
        if self.clip(id).is_none() {
            return Ok(false);
        }
        let targets = match kind {
            OperationKind::Trim => vec![id],
            OperationKind::Speed => self.linked_members(id),
            OperationKind::Volume | OperationKind::Pitch => {
                vec![self.audio_target(id)?]
            }
        };

        let verb = if enabled { "Enable" } else { "Disable" };
        Ok(self.edit(&format!("{verb} {}", kind.name()), |project| {
            let mut changed = false;
            for target in &targets {
                if let Some(ops) = project.operations.get_mut(target) {
                    changed |= ops.set_enabled(kind, enabled);
                }
            }
            if changed && kind.affects_placement() {
                project.resolve(&targets.iter().copied().collect());
            }
            changed
        }))
    }

    // ---- Groups and lanes ------------------------------------------------

    /// Link or unlink a group; affects future moves and trims only
    pub fn set_group_linked(&mut self, group: GroupId, linked: bool) -> bool {
        let exists = self.clips.iter().any(|c| c.group_id == group);
        if !exists || self.linked_groups.is_linked(group) == linked {
            return false;
        }
        let description = if linked { "Link group" } else { "Unlink group" };
        self.edit(description, |project| {
            project.linked_groups.set(group, linked);
            true
        })
    }

    /// Add a lane to `kind`; returns its index
    pub fn add_lane(&mut self, kind: TrackKind) -> u32 {
        let index = self.track_counts.get(kind);
        self.edit("Add lane", |project| {
            *project.track_counts.get_mut(kind) += 1;
            true
        });
        index
    }

    /// Drop trailing lanes that hold no clips (one lane always remains)
    pub fn remove_empty_lanes(&mut self) -> bool {
        let used = |kind: TrackKind| {
            self.clips
                .iter()
                .filter(|c| c.track == kind)
                .map(|c| c.track_index + 1)
                .max()
                .unwrap_or(1)
        };
        let compacted = TrackCounts {
            video: used(TrackKind::Video),
            audio: used(TrackKind::Audio),
        };
        if compacted == self.track_counts {
            return false;
        }
        self.edit("Remove empty lanes", |project| {
            project.track_counts = compacted;
            true
        })
    }

    // ---- Selection, playhead, playback (not recorded) ---------------------

    /// Select clips using `mode`; unknown ids are ignored
    pub fn select(&mut self, ids: &[ClipId], mode: SelectMode) {
        let known: Vec<ClipId> = ids
            .iter()
            .copied()
            .filter(|id| self.clip(*id).is_some())
            .collect();
        match mode {
            SelectMode::Set => {
                self.selection.clear();
                for id in known {
                    self.selection.add(id);
                }
            }
            SelectMode::Add => {
                for id in known {
                    self.selection.add(id);
                }
            }
            SelectMode::Remove => {
                for id in &known {
                    self.selection.remove(id);
                }
            }
            SelectMode::Toggle => {
                for id in known {
                    self.selection.toggle(id);
                }
            }
        }
    }

    /// Clear the selection
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Select every clip
    pub fn select_all(&mut self) {
        self.selection = Selection::with_clips(self.clips.iter().map(|c| c.id).collect::<Vec<_>>());
    }

    /// Move the playhead, clamped to the timeline
    pub fn set_current_time(&mut self, time: f64) {
        if time.is_finite() {
            self.current_time = time.clamp(0.0, self.timeline_duration);
        }
    }

    /// Start playback from the playhead
    pub fn play(&mut self) {
        self.playing = true;
    }

    /// Pause playback
    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Advance the playhead by one frame of wall time.
    ///
    /// `controller` computes the new time; the project only takes it through
    /// the playhead setter. Returns whether the playhead moved.
    pub fn tick_playback(
        &mut self,
        controller: &mut PlaybackController,
        delta_seconds: f64,
    ) -> bool {
        if !self.playing {
            controller.pause();
            return false;
        }
        if !controller.is_playing() {
            let start = if self.current_time >= self.timeline_duration {
                0.0
            } else {
                self.current_time
            };
            controller.seek(start);
            controller.play();
        }

        let moved = match controller.tick(delta_seconds, self.timeline_duration) {
            Some(time) => {
                self.set_current_time(time);
                true
            }
            None => false,
        };
        self.playing = controller.is_playing();
        moved
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}
