// SPDX-License-Identifier: MIT OR Apache-2.0
//! Lane overlap resolution.
//!
//! Clips the user just moved or trimmed are "active": their positions are
//! authoritative and passive clips get out of their way. Resolution runs per
//! `(track, track_index)` lane, then propagates resolver-induced shifts to
//! linked group siblings and runs a second pass with those siblings active.
//!
//! Each lane iterates sort+scan to a fixed point, capped at `n² + 8` passes.
//! The cap is a policy, not a termination proof; when it is hit a final
//! push-right sweep settles the lane so no overlap survives.

use crate::clip::{Clip, ClipId, TrackKind, EPSILON, MIN_CLIP_DURATION};
use crate::link::{GroupId, LinkedGroups};
use crate::operation::OperationMap;
use crate::range::range_of;
use std::collections::{BTreeMap, HashSet};

/// What a resolution run did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveReport {
    /// Clips whose start changed
    pub moved: Vec<ClipId>,
    /// Whether any lane hit the iteration cap
    pub hit_iteration_cap: bool,
    /// Whether linked propagation ran a second pass
    pub propagated: bool,
}

#[derive(Debug, Clone)]
struct Entry {
    index: usize,
    id: ClipId,
    start: f64,
    length: f64,
    active: bool,
}

impl Entry {
    fn end(&self) -> f64 {
        self.start + self.length
    }
}

/// Resolve every lane so no two clips on it overlap.
///
/// `active` holds the clips whose placement wins. Starts are written back
/// into `clips`; nothing else is touched.
pub fn resolve_overlaps(
    clips: &mut [Clip],
    ops: &OperationMap,
    linked: &LinkedGroups,
    active: &HashSet<ClipId>,
) -> ResolveReport {
    let before: Vec<f64> = clips.iter().map(|c| c.start_time).collect();

    let mut report = ResolveReport {
        hit_iteration_cap: resolve_lanes(clips, ops, active),
        ..Default::default()
    };

    let mut second_pass_active = active.clone();
    let mut propagated_groups: HashSet<GroupId> = HashSet::new();

    for i in 0..clips.len() {
        let group = clips[i].group_id;
        if (clips[i].start_time - before[i]).abs() <= EPSILON
            || propagated_groups.contains(&group)
            || !linked.is_linked(group)
        {
            continue;
        }

        let members: Vec<usize> = (0..clips.len())
            .filter(|&j| clips[j].group_id == group)
            .collect();
        if members.len() < 2 {
            continue;
        }

        // The largest resolver-induced shift in the group drags the rest.
        let mut delta = 0.0_f64;
        for &j in &members {
            let d = clips[j].start_time - before[j];
            if d.abs() > delta.abs() {
                delta = d;
            }
        }

        for &j in &members {
            clips[j].start_time = (before[j] + delta).max(0.0);
            second_pass_active.insert(clips[j].id);
        }
        propagated_groups.insert(group);
    }

    if !propagated_groups.is_empty() {
        report.propagated = true;
        report.hit_iteration_cap |= resolve_lanes(clips, ops, &second_pass_active);
    }

    for (clip, start) in clips.iter_mut().zip(before) {
        if clip.start_time < 0.0 {
            clip.start_time = 0.0;
        }
        if (clip.start_time - start).abs() > EPSILON {
            report.moved.push(clip.id);
        }
    }

    if report.hit_iteration_cap {
        tracing::warn!("Overlap resolution hit its iteration cap; lanes were settled by sweep");
    }

    report
}

/// Pairs of clips sharing a lane whose ranges overlap by more than [`EPSILON`]
pub fn find_overlaps(clips: &[Clip], ops: &OperationMap) -> Vec<(ClipId, ClipId)> {
    let mut overlaps = Vec::new();
    for (i, a) in clips.iter().enumerate() {
        let ra = range_of(a, ops);
        for b in &clips[i + 1..] {
            if a.lane() != b.lane() {
                continue;
            }
            let rb = range_of(b, ops);
            if ra.start < rb.end - EPSILON && rb.start < ra.end - EPSILON {
                overlaps.push((a.id, b.id));
            }
        }
    }
    overlaps
}

fn resolve_lanes(clips: &mut [Clip], ops: &OperationMap, active: &HashSet<ClipId>) -> bool {
    let mut lanes: BTreeMap<(TrackKind, u32), Vec<usize>> = BTreeMap::new();
    for (index, clip) in clips.iter().enumerate() {
        lanes.entry(clip.lane()).or_default().push(index);
    }

    let mut hit_cap = false;
    for indices in lanes.values() {
        if indices.len() < 2 {
            continue;
        }

        let mut entries: Vec<Entry> = indices
            .iter()
            .map(|&index| {
                let clip = &clips[index];
                Entry {
                    index,
                    id: clip.id,
                    start: clip.start_time,
                    length: range_of(clip, ops).visible_duration.max(MIN_CLIP_DURATION),
                    active: active.contains(&clip.id),
                }
            })
            .collect();

        hit_cap |= resolve_lane(&mut entries);

        for entry in entries {
            clips[entry.index].start_time = entry.start.max(0.0);
        }
    }
    hit_cap
}

/// Returns `true` when the iteration cap was reached.
fn resolve_lane(entries: &mut [Entry]) -> bool {
    let n = entries.len();
    let cap = n * n + 8;

    for _ in 0..cap {
        sort_entries(entries);
        if !scan_once(entries) {
            return false;
        }
    }

    sort_entries(entries);
    for i in 1..n {
        let prev_end = entries[i - 1].end();
        if entries[i].start < prev_end - EPSILON {
            entries[i].start = prev_end;
        }
    }
    true
}

fn sort_entries(entries: &mut [Entry]) {
    entries.sort_by(|a, b| a.start.total_cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
}

fn scan_once(entries: &mut [Entry]) -> bool {
    let mut changed = false;
    for i in 0..entries.len().saturating_sub(1) {
        let current_end = entries[i].end();
        if current_end <= entries[i + 1].start + EPSILON {
            continue;
        }

        match (entries[i].active, entries[i + 1].active) {
            (false, true) => {
                let pulled = entries[i + 1].start - entries[i].length;
                if pulled >= -EPSILON {
                    entries[i].start = pulled.max(0.0);
                } else {
                    entries[i + 1].start = current_end;
                }
            }
            _ => entries[i + 1].start = current_end,
        }
        changed = true;
    }
    changed
}
