// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end editing scenarios on a project.

mod common;

use common::{audio_only, av, check, import, video_only};
use cutline_editor::{MergeRejection, MoveRequest, Project, SelectMode, TrimEdge};
use cutline_timeline::{range_of, ClipId};

#[test]
fn edits_keep_timeline_consistent() {
    let mut project = Project::new();
    let a = import(&mut project, "a.mp4", av(6.0));
    let b = import(&mut project, "b.mp4", av(4.0));
    let c = import(&mut project, "c.wav", audio_only(3.0));
    check(&project);

    project.move_clip(b[0], MoveRequest::to(1.0));
    check(&project);
    project.trim_edge(a[0], TrimEdge::End, -2.5);
    check(&project);
    project.set_speed(c[0], 0.5);
    check(&project);
    project.move_clip(c[0], MoveRequest::to(0.0));
    check(&project);
    project.set_current_time(2.0);
    project.split_at_playhead();
    check(&project);
    project.select_all();
    project.copy_selection();
    project.set_current_time(1.5);
    project.paste();
    check(&project);
    project.move_clip(a[1], MoveRequest::to(3.0).on_lane(1));
    check(&project);
}

#[test]
fn undo_then_redo_restores_every_step() {
    let mut project = Project::new();
    let a = import(&mut project, "a.mp4", av(6.0));
    let b = import(&mut project, "b.mp4", av(4.0));
    project.set_current_time(3.0);

    let mut snapshots = vec![project.snapshot()];
    if project.move_clip(b[0], MoveRequest::to(2.0)) {
        snapshots.push(project.snapshot());
    }
    if project.trim_edge(a[0], TrimEdge::Start, 1.0) {
        snapshots.push(project.snapshot());
    }
    if !project.split_at_playhead().is_empty() {
        snapshots.push(project.snapshot());
    }
    if project.set_volume(a[0], 150.0).unwrap() {
        snapshots.push(project.snapshot());
    }
    assert!(snapshots.len() >= 4);

    for expected in snapshots.iter().rev().skip(1) {
        assert!(project.undo());
        assert_eq!(&project.snapshot(), expected);
    }
    for expected in snapshots.iter().skip(1) {
        assert!(project.redo());
        assert_eq!(&project.snapshot(), expected);
    }
    assert!(!project.redo());
}

#[test]
fn new_edit_discards_redo() {
    let mut project = Project::new();
    let a = import(&mut project, "a.mp4", av(6.0));
    project.move_clip(a[0], MoveRequest::to(1.0));
    assert!(project.undo());
    assert!(project.can_redo());
    project.set_speed(a[0], 2.0);
    assert!(!project.can_redo());
}

#[test]
fn split_conserves_visible_time() {
    let mut project = Project::new();
    let a = import(&mut project, "a.mp4", av(8.0));
    project.set_speed(a[0], 2.0);
    project.trim_edge(a[0], TrimEdge::Start, 0.5);

    let before: f64 = project
        .clips()
        .iter()
        .map(|c| range_of(c, project.operations()).visible_duration)
        .sum();
    let end_before = project.timeline_duration();

    project.set_current_time(2.0);
    let tails = project.split_at_playhead();
    assert_eq!(tails.len(), 2);

    let after: f64 = project
        .clips()
        .iter()
        .map(|c| range_of(c, project.operations()).visible_duration)
        .sum();
    assert!((before - after).abs() < 1e-9);
    assert!((project.timeline_duration() - end_before).abs() < 1e-9);

    for tail in tails {
        let range = project.range(tail).unwrap();
        assert!((range.start - 2.0).abs() < 1e-9);
    }
    check(&project);
}

#[test]
fn split_twice_keeps_root_lineage() {
    let mut project = Project::new();
    let a = import(&mut project, "a.mp4", av(6.0));
    let root = project.clip(a[0]).unwrap().group_id;

    project.set_current_time(2.0);
    project.split_at_playhead();
    project.set_current_time(4.0);
    let tails = project.split_at_playhead();

    let last = project.clip(tails[0]).unwrap().group_id;
    assert_ne!(last, root);
    assert_eq!(project.origin_group(last), root);
    assert_eq!(project.clips().len(), 6);
}

#[test]
fn linked_trim_scenario() {
    // 10s A/V clip trimmed by +2s at the start: both streams start at 2s
    // and show media 2..10.
    let mut project = Project::new();
    let ids = import(&mut project, "a.mp4", av(10.0));
    assert!(project.trim_edge(ids[0], TrimEdge::Start, 2.0));

    for id in &ids {
        let range = project.range(*id).unwrap();
        assert_eq!((range.trim_start, range.trim_end), (2.0, 10.0));
        assert_eq!(range.start, 2.0);
        assert_eq!(range.end, 10.0);
    }

    // Unlinked: only the dragged clip changes
    let group = project.clip(ids[0]).unwrap().group_id;
    project.set_group_linked(group, false);
    assert!(project.trim_edge(ids[0], TrimEdge::End, -1.0));
    assert_eq!(project.range(ids[0]).unwrap().trim_end, 9.0);
    assert_eq!(project.range(ids[1]).unwrap().trim_end, 10.0);
}

#[test]
fn unlinked_group_moves_alone() {
    let mut project = Project::new();
    let ids = import(&mut project, "a.mp4", av(4.0));
    let group = project.clip(ids[0]).unwrap().group_id;
    project.set_group_linked(group, false);

    project.move_clip(ids[0], MoveRequest::to(3.0));
    assert_eq!(project.clip(ids[0]).unwrap().start_time, 3.0);
    assert_eq!(project.clip(ids[1]).unwrap().start_time, 0.0);
}

#[test]
fn pushed_clip_drags_its_linked_sibling() {
    let mut project = Project::new();
    let a = import(&mut project, "a.mp4", video_only(4.0));
    let b = import(&mut project, "b.mp4", av(4.0));

    // Moving `a` over `b` on the video lane pushes b's video, and b's audio
    // must follow even though nothing overlaps it.
    project.move_clip(a[0], MoveRequest::to(3.0));
    let b_video = project.clip(b[0]).unwrap().start_time;
    let b_audio = project.clip(b[1]).unwrap().start_time;
    assert!((b_video - b_audio).abs() < 1e-9);
    check(&project);
}

#[test]
fn merge_rejects_mixed_groups() {
    let mut project = Project::new();
    let a = import(&mut project, "a.mp4", av(2.0));
    let b = import(&mut project, "b.wav", audio_only(2.0));
    project.select(&[a[0], b[0]], SelectMode::Set);

    let depth = project.history_stats().undo_count;
    assert_eq!(project.merge_eligibility(), Err(MergeRejection::MixedComposition));
    assert_eq!(project.history_stats().undo_count, depth);
    assert_eq!(project.clips().len(), 3);
}

#[test]
fn paste_into_occupied_time_reflows() {
    let mut project = Project::new();
    let a = import(&mut project, "a.mp4", av(4.0));
    import(&mut project, "b.mp4", av(4.0));

    project.select(&[a[0]], SelectMode::Set);
    assert_eq!(project.copy_selection(), 1);
    project.set_current_time(3.0);
    let pasted: Vec<ClipId> = project.paste();
    assert_eq!(pasted.len(), 1);
    assert_eq!(project.selection().clips, pasted);
    check(&project);
}

#[test]
fn cut_matches_delete_selected_for_linked_pair() {
    let mut cut = Project::new();
    let cut_ids = import(&mut cut, "a.mp4", av(4.0));
    cut.select(&[cut_ids[0]], SelectMode::Set);
    assert_eq!(cut.cut_selection(), 2);

    let mut deleted = Project::new();
    let deleted_ids = import(&mut deleted, "a.mp4", av(4.0));
    deleted.select(&[deleted_ids[0]], SelectMode::Set);
    assert!(deleted.delete_selected());

    assert_eq!(cut.clips().len(), deleted.clips().len());
    assert!(cut.clips().is_empty());
    assert_eq!(cut.clipboard().map(cutline_editor::Clipboard::len), Some(2));
}
