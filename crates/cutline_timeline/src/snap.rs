// SPDX-License-Identifier: MIT OR Apache-2.0
//! Snapping for drag interactions.
//!
//! Candidate points are clip edges plus the playhead. Snapping uses two
//! thresholds: a point is acquired within the enter distance and only
//! released beyond the wider exit distance, so a drag hovering near a
//! boundary does not flicker.

use crate::clip::{Clip, ClipId, EPSILON};
use crate::operation::OperationMap;
use crate::range::range_of;

/// Distance in pixels at which a snap point is acquired
pub const SNAP_ENTER_PX: f64 = 10.0;

/// Distance in pixels beyond which a held snap point is released
pub const SNAP_EXIT_PX: f64 = 15.0;

/// Sorted, deduplicated snap candidates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapTargets {
    points: Vec<f64>,
}

impl SnapTargets {
    /// Collect edges of every clip except `exclude`, plus the playhead
    pub fn collect(
        clips: &[Clip],
        ops: &OperationMap,
        playhead: f64,
        exclude: Option<ClipId>,
    ) -> Self {
        let mut points = vec![playhead];
        for clip in clips {
            if exclude == Some(clip.id) {
                continue;
            }
            let range = range_of(clip, ops);
            points.push(range.start);
            points.push(range.end);
        }
        Self::from_points(points)
    }

    /// Build from raw points
    pub fn from_points(mut points: Vec<f64>) -> Self {
        points.retain(|p| p.is_finite());
        points.sort_by(f64::total_cmp);
        points.dedup_by(|a, b| (*a - *b).abs() < EPSILON);
        Self { points }
    }

    /// Candidate points in ascending order
    pub fn points(&self) -> &[f64] {
        &self.points
    }

    fn contains(&self, point: f64) -> bool {
        self.points.iter().any(|p| (p - point).abs() < EPSILON)
    }

    /// Closest point within `threshold` of `time`
    fn nearest(&self, time: f64, threshold: f64) -> Option<(f64, f64)> {
        self.points
            .iter()
            .map(|&p| (p, (p - time).abs()))
            .filter(|(_, distance)| *distance <= threshold)
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

/// Outcome of a snap query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapResult {
    /// Resulting time (the clip start for move queries)
    pub time: f64,
    /// Whether the time was pulled onto a snap point
    pub snapped: bool,
}

impl SnapResult {
    fn free(time: f64) -> Self {
        Self { time, snapped: false }
    }
}

/// Which edge of a dragged clip holds the snap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapEdge {
    /// Leading edge
    Start,
    /// Trailing edge
    End,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Latch {
    point: f64,
    edge: SnapEdge,
}

/// Hysteresis-stabilized snapper for one drag gesture
#[derive(Debug, Clone)]
pub struct SnapEngine {
    /// Acquire distance in pixels
    pub enter_px: f64,
    /// Release distance in pixels
    pub exit_px: f64,
    latch: Option<Latch>,
}

impl SnapEngine {
    /// Create a snapper with the default thresholds
    pub fn new() -> Self {
        Self::with_thresholds(SNAP_ENTER_PX, SNAP_EXIT_PX)
    }

    /// Create a snapper with custom thresholds; exit is never below enter
    pub fn with_thresholds(enter_px: f64, exit_px: f64) -> Self {
        let enter_px = enter_px.max(0.0);
        Self {
            enter_px,
            exit_px: exit_px.max(enter_px),
            latch: None,
        }
    }

    /// Forget the held snap point (call when a drag ends)
    pub fn release(&mut self) {
        self.latch = None;
    }

    /// Point currently held, if any
    pub fn held_point(&self) -> Option<f64> {
        self.latch.map(|l| l.point)
    }

    /// Snap a single time (playhead scrub, trim edge)
    pub fn check_snap(
        &mut self,
        targets: &SnapTargets,
        time: f64,
        pixels_per_second: f64,
    ) -> SnapResult {
        if pixels_per_second <= 0.0 {
            self.release();
            return SnapResult::free(time);
        }
        let enter = self.enter_px / pixels_per_second;
        let exit = self.exit_px / pixels_per_second;

        if let Some(latch) = self.latch {
            if targets.contains(latch.point) && (time - latch.point).abs() <= exit {
                return SnapResult {
                    time: latch.point,
                    snapped: true,
                };
            }
        }

        match targets.nearest(time, enter) {
            Some((point, _)) => {
                self.latch = Some(Latch {
                    point,
                    edge: SnapEdge::Start,
                });
                SnapResult {
                    time: point,
                    snapped: true,
                }
            }
            None => {
                self.release();
                SnapResult::free(time)
            }
        }
    }

    /// Snap a dragged clip by whichever of its edges is closer to a point.
    ///
    /// Returns the resulting clip start.
    pub fn check_move_snap(
        &mut self,
        targets: &SnapTargets,
        start: f64,
        duration: f64,
        pixels_per_second: f64,
    ) -> SnapResult {
        if pixels_per_second <= 0.0 {
            self.release();
            return SnapResult::free(start);
        }
        let enter = self.enter_px / pixels_per_second;
        let exit = self.exit_px / pixels_per_second;
        let offset = |edge: SnapEdge| match edge {
            SnapEdge::Start => 0.0,
            SnapEdge::End => duration,
        };

        if let Some(latch) = self.latch {
            let edge_time = start + offset(latch.edge);
            if targets.contains(latch.point) && (edge_time - latch.point).abs() <= exit {
                return SnapResult {
                    time: latch.point - offset(latch.edge),
                    snapped: true,
                };
            }
        }

        let mut best: Option<(f64, SnapEdge, f64)> = None;
        for edge in [SnapEdge::Start, SnapEdge::End] {
            let Some((point, distance)) = targets.nearest(start + offset(edge), enter) else {
                continue;
            };
            if point - offset(edge) < -EPSILON {
                continue;
            }
            if best.map_or(true, |(_, _, d)| distance < d) {
                best = Some((point, edge, distance));
            }
        }

        match best {
            Some((point, edge, _)) => {
                self.latch = Some(Latch { point, edge });
                SnapResult {
                    time: (point - offset(edge)).max(0.0),
                    snapped: true,
                }
            }
            None => {
                self.release();
                SnapResult::free(start)
            }
        }
    }
}

impl Default for SnapEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::{MediaInfo, TrackKind};
    use crate::link::GroupId;
    use crate::operation::OperationList;

    const PPS: f64 = 100.0;

    #[test]
    fn test_collect_excludes_dragged_clip() {
        let info = MediaInfo {
            duration: 4.0,
            has_video: true,
            ..Default::default()
        };
        let a = Clip::new("a.mp4", TrackKind::Video, GroupId::new(), info.clone());
        let b = Clip::new("b.mp4", TrackKind::Video, GroupId::new(), info).with_start(6.0);
        let ops: OperationMap = [&a, &b]
            .iter()
            .map(|c| (c.id, OperationList::for_clip(c)))
            .collect();

        let targets = SnapTargets::collect(&[a.clone(), b], &ops, 4.0, Some(a.id));
        assert_eq!(targets.points(), &[4.0, 6.0, 10.0]);
    }

    #[test]
    fn test_enter_threshold() {
        let targets = SnapTargets::from_points(vec![5.0]);
        let mut engine = SnapEngine::new();
        assert!(!engine.check_snap(&targets, 5.2, PPS).snapped);
        let hit = engine.check_snap(&targets, 5.08, PPS);
        assert!(hit.snapped);
        assert_eq!(hit.time, 5.0);
    }

    #[test]
    fn test_hysteresis_holds_until_exit() {
        let targets = SnapTargets::from_points(vec![5.0]);
        let mut engine = SnapEngine::new();
        assert!(engine.check_snap(&targets, 5.05, PPS).snapped);
        // Between enter (0.10s) and exit (0.15s): still held.
        assert!(engine.check_snap(&targets, 5.12, PPS).snapped);
        // Past exit: released.
        let free = engine.check_snap(&targets, 5.2, PPS);
        assert!(!free.snapped);
        assert_eq!(free.time, 5.2);
        // Fresh approach inside the exit band but outside enter does not snap.
        assert!(!engine.check_snap(&targets, 5.12, PPS).snapped);
    }

    #[test]
    fn test_move_snap_picks_closer_edge() {
        let targets = SnapTargets::from_points(vec![10.0, 3.0]);
        let mut engine = SnapEngine::new();
        // Start edge is 0.09 from 3.0, end edge is 0.02 from 10.0.
        let hit = engine.check_move_snap(&targets, 2.91, 7.07, PPS);
        assert!(hit.snapped);
        assert!((hit.time - 2.93).abs() < 1e-9);
    }

    #[test]
    fn test_move_snap_rejects_negative_start() {
        let targets = SnapTargets::from_points(vec![1.0]);
        let mut engine = SnapEngine::new();
        let hit = engine.check_move_snap(&targets, 0.0, 1.05, PPS);
        assert!(!hit.snapped);
        assert_eq!(hit.time, 0.0);
    }

    #[test]
    fn test_zero_zoom_never_snaps() {
        let targets = SnapTargets::from_points(vec![1.0]);
        let mut engine = SnapEngine::new();
        assert!(!engine.check_snap(&targets, 1.0, 0.0).snapped);
    }
}
