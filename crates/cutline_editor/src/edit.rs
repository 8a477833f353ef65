// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline edit commands: move, edge trim, split and delete.

use crate::state::Project;
use cutline_timeline::{
    range_of, timeline_time_to_media_time, ClipId, GroupId, OperationKind, OperationList,
    OperationParams, EPSILON, MIN_CLIP_DURATION,
};
use std::collections::{HashMap, HashSet};

/// Shortest visible length an edge trim leaves, in timeline seconds
pub const MIN_TRIM_VISIBLE: f64 = 0.05;

/// Which edge of a clip is dragged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimEdge {
    /// Left edge: changes the in point and the start position
    Start,
    /// Right edge: changes the out point
    End,
}

/// Requested placement of a dragged clip
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveRequest {
    /// New timeline start of the dragged clip
    pub start_time: Option<f64>,
    /// New lane of the dragged clip
    pub track_index: Option<u32>,
}

impl MoveRequest {
    /// Move along the timeline
    pub fn to(start_time: f64) -> Self {
        Self {
            start_time: Some(start_time),
            track_index: None,
        }
    }

    /// Also change lane
    pub fn on_lane(mut self, track_index: u32) -> Self {
        self.track_index = Some(track_index);
        self
    }
}

struct TrimPlan {
    id: ClipId,
    start: f64,
    end: f64,
    applied: f64,
}

impl Project {
    /// Clips that travel with `clip_id` when it is dragged.
    ///
    /// That is its linked group, plus every selected clip's linked group when
    /// the drag starts on a multi-selection.
    pub fn drag_set(&self, clip_id: ClipId) -> HashSet<ClipId> {
        let members = self.linked_members(clip_id);
        let with_selection =
            self.selection.len() > 1 && members.iter().any(|id| self.selection.contains(id));

        let mut set: HashSet<ClipId> = members.into_iter().collect();
        if with_selection {
            for id in self.selection.iter() {
                set.extend(self.linked_members(*id));
            }
        }
        set
    }

    /// Move a clip and everything that travels with it.
    ///
    /// The shared delta is clamped so no moved clip starts before zero. A
    /// lane change applies to the dragged clip only; dropping it one past
    /// the last lane adds a lane.
    pub fn move_clip(&mut self, clip_id: ClipId, request: MoveRequest) -> bool {
        let Some(clip) = self.clip(clip_id) else {
            return false;
        };
        let kind = clip.track;
        let old_index = clip.track_index;
        let old_start = clip.start_time;

        let lanes = self.track_counts.get(kind);
        let index_change = request
            .track_index
            .map(|index| index.min(lanes))
            .filter(|index| *index != old_index);

        let moving = self.drag_set(clip_id);
        let earliest = self
            .clips
            .iter()
            .filter(|c| moving.contains(&c.id))
            .map(|c| c.start_time)
            .fold(f64::INFINITY, f64::min);

        let mut delta = request
            .start_time
            .filter(|t| t.is_finite())
            .map_or(0.0, |t| t.max(0.0) - old_start);
        if earliest.is_finite() {
            delta = delta.max(-earliest);
        }
        if delta.abs() <= EPSILON && index_change.is_none() {
            return false;
        }

        self.edit("Move clip", |project| {
            if delta.abs() > EPSILON {
                for clip in project.clips.iter_mut().filter(|c| moving.contains(&c.id)) {
                    clip.start_time = (clip.start_time + delta).max(0.0);
                }
            }
            if let Some(index) = index_change {
                if let Some(clip) = project.clip_mut(clip_id) {
                    clip.track_index = index;
                }
            }
            project.resolve(&moving);
            true
        })
    }

    /// Drag one edge of a clip by `delta` timeline seconds.
    ///
    /// Linked siblings get the same delta, each clamped to its own bounds
    /// and to [`MIN_TRIM_VISIBLE`]. A start-edge trim shifts every member by
    /// the dragged clip's applied delta so the content stays in place.
    pub fn trim_edge(&mut self, clip_id: ClipId, edge: TrimEdge, delta: f64) -> bool {
        if !delta.is_finite() || delta.abs() <= EPSILON {
            return false;
        }
        let members = self.linked_members(clip_id);
        if members.is_empty() {
            return false;
        }

        let plans: Vec<TrimPlan> = members
            .iter()
            .filter_map(|id| self.clip(*id))
            .map(|clip| {
                let range = range_of(clip, &self.operations);
                let rate = range.speed_rate;
                let min_length = (MIN_TRIM_VISIBLE * rate).min(clip.bound_length());
                match edge {
                    TrimEdge::Start => {
                        let start = (range.trim_start + delta * rate)
                            .min(range.trim_end - min_length)
                            .max(clip.trim_bound_start);
                        TrimPlan {
                            id: clip.id,
                            start,
                            end: range.trim_end,
                            applied: (start - range.trim_start) / rate,
                        }
                    }
                    TrimEdge::End => {
                        let end = (range.trim_end + delta * rate)
                            .max(range.trim_start + min_length)
                            .min(clip.trim_bound_end);
                        TrimPlan {
                            id: clip.id,
                            start: range.trim_start,
                            end,
                            applied: (end - range.trim_end) / rate,
                        }
                    }
                }
            })
            .collect();

        // The dragged clip is always first
        let shift = match edge {
            TrimEdge::Start => plans.first().map_or(0.0, |plan| plan.applied),
            TrimEdge::End => 0.0,
        };
        if plans.iter().all(|plan| plan.applied.abs() <= EPSILON) {
            return false;
        }

        self.edit("Trim clip", |project| {
            for plan in &plans {
                if let Some(ops) = project.operations.get_mut(&plan.id) {
                    ops.set_params(OperationParams::Trim {
                        start_time: plan.start,
                        end_time: plan.end,
                    });
                    ops.set_enabled(OperationKind::Trim, true);
                }
            }
            if shift.abs() > EPSILON {
                for clip in project.clips.iter_mut().filter(|c| members.contains(&c.id)) {
                    clip.start_time = (clip.start_time + shift).max(0.0);
                }
            }
            project.resolve(&members.iter().copied().collect());
            true
        })
    }

    /// Split every clip under the playhead.
    ///
    /// Each straddled clip keeps its id for the left half; the right half is
    /// a new clip inserted right after it. Every touched group becomes a
    /// fresh left group and a fresh right group, and the other members of
    /// those groups join the side they sit on. Returns the new right halves.
    pub fn split_at_playhead(&mut self) -> Vec<ClipId> {
        let time = self.current_time;
        let straddling: Vec<ClipId> = self
            .clips
            .iter()
            .filter(|clip| range_of(clip, &self.operations).straddles(time, MIN_CLIP_DURATION))
            .map(|clip| clip.id)
            .collect();
        if straddling.is_empty() {
            return Vec::new();
        }

        let mut created = Vec::new();
        self.edit("Split clips", |project| {
            let mut sides: HashMap<GroupId, (GroupId, GroupId)> = HashMap::new();
            for id in &straddling {
                let Some(group) = project.clip(*id).map(|c| c.group_id) else {
                    continue;
                };
                if sides.contains_key(&group) {
                    continue;
                }
                let (left, right) = (GroupId::new(), GroupId::new());
                let origin = project.origin_group(group);
                let linked = project.linked_groups.is_linked(group);
                for side in [left, right] {
                    project.group_lineage.insert(side, origin);
                    project.linked_groups.set(side, linked);
                }
                sides.insert(group, (left, right));
            }

            let mut index = 0;
            while index < project.clips.len() {
                let clip = &project.clips[index];
                let Some(&(left, right)) = sides.get(&clip.group_id) else {
                    index += 1;
                    continue;
                };
                let range = range_of(clip, &project.operations);

                if !straddling.contains(&clip.id) {
                    let group = if range.end <= time + MIN_CLIP_DURATION { left } else { right };
                    project.clips[index].group_id = group;
                    index += 1;
                    continue;
                }

                let ops = project.operations.get(&clip.id).cloned();
                let cut = timeline_time_to_media_time(clip, ops.as_ref(), time);

                let mut tail = clip.clone();
                tail.id = ClipId::new();
                tail.group_id = right;
                tail.start_time = time;
                tail.trim_bound_start = cut;

                let mut tail_ops = ops
                    .as_ref()
                    .map_or_else(|| OperationList::for_clip(&tail), OperationList::reissued);
                tail_ops.set_params(OperationParams::Trim {
                    start_time: cut,
                    end_time: range.trim_end,
                });

                let head = &mut project.clips[index];
                head.group_id = left;
                head.trim_bound_end = cut;
                let head_id = head.id;
                if let Some(head_ops) = project.operations.get_mut(&head_id) {
                    head_ops.set_params(OperationParams::Trim {
                        start_time: range.trim_start,
                        end_time: cut,
                    });
                }

                project.operations.insert(tail.id, tail_ops);
                created.push(tail.id);
                project.clips.insert(index + 1, tail);
                index += 2;
            }
            true
        });

        tracing::info!("Split {} clips at {:.3}s", created.len(), time);
        created
    }

    /// Delete one clip; its linked siblings stay.
    ///
    /// Remaining clips keep their positions; nothing closes the gap.
    pub fn delete_clip(&mut self, clip_id: ClipId) -> bool {
        if self.clip(clip_id).is_none() {
            return false;
        }
        self.remove_clips("Delete clip", &HashSet::from([clip_id]))
    }

    /// Delete the selection together with the linked groups it touches
    pub fn delete_selected(&mut self) -> bool {
        let doomed = self.selection_with_links();
        if doomed.is_empty() {
            return false;
        }
        self.remove_clips("Delete clips", &doomed)
    }

    /// Selected clips plus the members of their linked groups
    pub(crate) fn selection_with_links(&self) -> HashSet<ClipId> {
        self.selection
            .iter()
            .flat_map(|id| self.linked_members(*id))
            .collect()
    }

    pub(crate) fn remove_clips(&mut self, description: &str, doomed: &HashSet<ClipId>) -> bool {
        self.edit(description, |project| {
            project.clips.retain(|c| !doomed.contains(&c.id));
            project.operations.retain(|id, _| !doomed.contains(id));
            project.selection.clips.retain(|id| !doomed.contains(id));
            project.resolve(&HashSet::new());
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::state::{Project, SelectMode};
    use super::*;
    use cutline_timeline::{find_overlaps, MediaInfo, TrackKind};
    use std::path::PathBuf;

    fn av(duration: f64) -> MediaInfo {
        MediaInfo {
            duration,
            fps: 30.0,
            sample_rate: 48_000,
            has_video: true,
            has_audio: true,
            ..Default::default()
        }
    }

    fn import(project: &mut Project, name: &str, info: MediaInfo) -> Vec<ClipId> {
        project.import_media(vec![(PathBuf::from(name), info)])
    }

    #[test]
    fn test_move_clamps_group_at_zero() {
        let mut project = Project::new();
        let ids = import(&mut project, "a.mp4", av(4.0));
        assert!(project.move_clip(ids[0], MoveRequest::to(3.0)));
        assert!(project.move_clip(ids[0], MoveRequest::to(-5.0)));
        for id in &ids {
            assert_eq!(project.clip(*id).unwrap().start_time, 0.0);
        }
        assert!(!project.move_clip(ids[0], MoveRequest::to(-1.0)));
    }

    #[test]
    fn test_move_pushes_neighbour() {
        let mut project = Project::new();
        let a = import(&mut project, "a.mp4", av(4.0));
        let b = import(&mut project, "b.mp4", av(4.0));
        assert!(project.move_clip(a[0], MoveRequest::to(2.0)));

        let a_range = project.range(a[0]).unwrap();
        let b_range = project.range(b[0]).unwrap();
        assert_eq!(a_range.start, 2.0);
        assert!(b_range.start >= a_range.end - EPSILON || b_range.end <= a_range.start + EPSILON);
        assert!(find_overlaps(project.clips(), project.operations()).is_empty());
    }

    #[test]
    fn test_lane_change_moves_dragged_clip_only() {
        let mut project = Project::new();
        let ids = import(&mut project, "a.mp4", av(4.0));
        assert!(project.move_clip(ids[0], MoveRequest::default().on_lane(1)));
        assert_eq!(project.clip(ids[0]).unwrap().track_index, 1);
        assert_eq!(project.clip(ids[1]).unwrap().track_index, 0);
        assert_eq!(project.track_counts().video, 2);
    }

    #[test]
    fn test_lane_beyond_next_is_clamped() {
        let mut project = Project::new();
        let ids = import(&mut project, "a.mp4", av(4.0));
        assert!(project.move_clip(ids[0], MoveRequest::default().on_lane(7)));
        assert_eq!(project.clip(ids[0]).unwrap().track_index, 1);
    }

    #[test]
    fn test_multi_selection_moves_together() {
        let mut project = Project::new();
        let a = import(&mut project, "a.mp4", av(2.0));
        let b = import(&mut project, "b.mp4", av(2.0));
        project.select(&[a[0], b[0]], SelectMode::Set);
        assert!(project.move_clip(a[0], MoveRequest::to(1.0)));
        assert_eq!(project.clip(b[1]).unwrap().start_time, 3.0);
    }

    #[test]
    fn test_trim_end_applies_to_linked_audio() {
        let mut project = Project::new();
        let ids = import(&mut project, "a.mp4", av(4.0));
        assert!(project.trim_edge(ids[0], TrimEdge::End, -1.0));
        for id in &ids {
            assert_eq!(project.operations_for(*id).unwrap().trim(), Some((0.0, 3.0)));
        }
        assert_eq!(project.timeline_duration(), 3.0);
    }

    #[test]
    fn test_trim_start_keeps_content_in_place() {
        let mut project = Project::new();
        let ids = import(&mut project, "a.mp4", av(4.0));
        assert!(project.trim_edge(ids[0], TrimEdge::Start, 1.5));
        let range = project.range(ids[0]).unwrap();
        assert_eq!(range.trim_start, 1.5);
        assert_eq!(range.start, 1.5);
        assert_eq!(range.end, 4.0);
        assert_eq!(project.range(ids[1]).unwrap().start, 1.5);
    }

    #[test]
    fn test_trim_respects_minimum_length() {
        let mut project = Project::new();
        let ids = import(&mut project, "a.mp4", av(4.0));
        assert!(project.trim_edge(ids[0], TrimEdge::End, -10.0));
        let range = project.range(ids[0]).unwrap();
        assert!((range.visible_duration - MIN_TRIM_VISIBLE).abs() < 1e-9);
    }

    #[test]
    fn test_trim_cannot_extend_past_bounds() {
        let mut project = Project::new();
        let ids = import(&mut project, "a.mp4", av(4.0));
        assert!(!project.trim_edge(ids[0], TrimEdge::End, 2.0));
        assert!(!project.can_redo());
    }

    #[test]
    fn test_split_creates_halves_and_groups() {
        let mut project = Project::new();
        let ids = import(&mut project, "a.mp4", av(4.0));
        let origin = project.clip(ids[0]).unwrap().group_id;
        project.set_current_time(1.0);

        let tails = project.split_at_playhead();
        assert_eq!(tails.len(), 2);
        assert_eq!(project.clips().len(), 4);

        let head = project.clip(ids[0]).unwrap();
        let tail = project.clip(tails[0]).unwrap();
        assert_eq!(head.trim_bound_end, 1.0);
        assert_eq!(tail.trim_bound_start, 1.0);
        assert_eq!(tail.start_time, 1.0);
        assert_ne!(head.group_id, tail.group_id);
        assert_eq!(project.clip(ids[1]).unwrap().group_id, head.group_id);
        assert_eq!(project.origin_group(tail.group_id), origin);
        assert_eq!(project.timeline_duration(), 4.0);
    }

    #[test]
    fn test_split_at_edge_is_noop() {
        let mut project = Project::new();
        import(&mut project, "a.mp4", av(4.0));
        project.set_current_time(0.0);
        assert!(project.split_at_playhead().is_empty());
        project.set_current_time(4.0);
        assert!(project.split_at_playhead().is_empty());
    }

    #[test]
    fn test_split_respects_speed() {
        let mut project = Project::new();
        let ids = import(&mut project, "a.mp4", av(4.0));
        project.set_speed(ids[0], 2.0);
        project.set_current_time(1.0);
        let tails = project.split_at_playhead();
        let tail = project.range(tails[0]).unwrap();
        assert_eq!(tail.trim_start, 2.0);
        assert_eq!(tail.start, 1.0);
        assert_eq!(tail.end, 2.0);
    }

    #[test]
    fn test_delete_selected_expands_group() {
        let mut project = Project::new();
        let ids = import(&mut project, "a.mp4", av(4.0));
        let other = import(&mut project, "b.wav", MediaInfo { has_video: false, ..av(2.0) });
        project.select(&[ids[0]], SelectMode::Set);
        assert!(project.delete_selected());
        assert_eq!(project.clips().len(), 1);
        assert_eq!(project.clips()[0].id, other[0]);
        assert!(project.selection().is_empty());
    }

    #[test]
    fn test_delete_clip_keeps_sibling() {
        let mut project = Project::new();
        let ids = import(&mut project, "a.mp4", av(4.0));
        assert!(project.delete_clip(ids[0]));
        assert_eq!(project.clips().len(), 1);
        assert_eq!(project.clips()[0].track, TrackKind::Audio);
        assert!(project.undo());
        assert_eq!(project.clips().len(), 2);
    }
}
