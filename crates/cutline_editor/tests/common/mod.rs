// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared fixtures for editor integration tests.

#![allow(dead_code, missing_docs)]

use cutline_editor::Project;
use cutline_export::{
    classify_failure, CancelHandle, EngineError, JobHandle, MediaEngine, ProgressSink,
    ProgressUpdate,
};
use cutline_timeline::{find_overlaps, range_of, ClipId, MediaInfo, EPSILON};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub fn av(duration: f64) -> MediaInfo {
    MediaInfo {
        duration,
        width: 1920,
        height: 1080,
        fps: 30.0,
        video_codec: Some("h264".into()),
        audio_codec: Some("aac".into()),
        sample_rate: 48_000,
        has_video: true,
        has_audio: true,
        ..Default::default()
    }
}

pub fn video_only(duration: f64) -> MediaInfo {
    MediaInfo {
        audio_codec: None,
        sample_rate: 0,
        has_audio: false,
        ..av(duration)
    }
}

pub fn audio_only(duration: f64) -> MediaInfo {
    MediaInfo {
        width: 0,
        height: 0,
        fps: 0.0,
        video_codec: None,
        has_video: false,
        ..av(duration)
    }
}

pub fn import(project: &mut Project, name: &str, info: MediaInfo) -> Vec<ClipId> {
    project.import_media(vec![(PathBuf::from(name), info)])
}

pub fn assert_no_overlaps(project: &Project) {
    let overlaps = find_overlaps(project.clips(), project.operations());
    assert!(overlaps.is_empty(), "overlapping clips: {overlaps:?}");
}

pub fn assert_trims_within_bounds(project: &Project) {
    for clip in project.clips() {
        let range = range_of(clip, project.operations());
        assert!(range.trim_start >= clip.trim_bound_start - EPSILON);
        assert!(range.trim_end <= clip.trim_bound_end + EPSILON);
        assert!(range.trim_start <= range.trim_end);
        assert!(clip.start_time >= 0.0);
    }
}

pub fn assert_duration_is_latest_end(project: &Project) {
    let latest = project
        .clips()
        .iter()
        .map(|c| range_of(c, project.operations()).end)
        .fold(0.0, f64::max);
    assert!((project.timeline_duration() - latest).abs() < 1e-9);
}

pub fn assert_speed_law(project: &Project) {
    for clip in project.clips() {
        let range = range_of(clip, project.operations());
        let media = range.visible_duration * range.speed_rate;
        assert!((media - range.trimmed_length()).abs() < 1e-9);
    }
}

/// Invariants every reachable project state holds
pub fn check(project: &Project) {
    assert_no_overlaps(project);
    assert_speed_law(project);
    assert_trims_within_bounds(project);
    assert_duration_is_latest_end(project);
}

/// How fake jobs end
#[derive(Debug, Clone, Default)]
pub enum JobBehavior {
    #[default]
    Succeed,
    Fail(String),
    WaitForCancel,
}

/// In-memory media engine
#[derive(Default)]
pub struct FakeEngine {
    pub media: HashMap<PathBuf, MediaInfo>,
    /// Returned for paths not in `media`, e.g. rendered merges
    pub rendered: Option<MediaInfo>,
    pub behavior: JobBehavior,
    pub probes: Mutex<Vec<PathBuf>>,
    pub jobs: Mutex<Vec<Vec<String>>>,
}

impl FakeEngine {
    pub fn with_media(media: impl IntoIterator<Item = (&'static str, MediaInfo)>) -> Self {
        Self {
            media: media.into_iter().map(|(p, i)| (PathBuf::from(p), i)).collect(),
            ..Default::default()
        }
    }
}

impl MediaEngine for FakeEngine {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, EngineError> {
        self.probes.lock().push(path.to_path_buf());
        self.media
            .get(path)
            .cloned()
            .or_else(|| self.rendered.clone())
            .ok_or_else(|| EngineError::Probe {
                path: path.to_path_buf(),
                message: "No such file or directory".into(),
            })
    }

    fn run_job(
        &self,
        args: Vec<String>,
        total_duration: f64,
        mut on_progress: ProgressSink,
    ) -> Result<JobHandle, EngineError> {
        self.jobs.lock().push(args);
        let cancel = CancelHandle::new();
        let signal = cancel.clone();
        let behavior = self.behavior.clone();

        let completion = tokio::spawn(async move {
            let half = total_duration / 2.0;
            on_progress(ProgressUpdate::from_media_time(half, total_duration, "2x"));
            match behavior {
                JobBehavior::Succeed => {
                    let total = total_duration;
                    on_progress(ProgressUpdate::from_media_time(total, total, "2x"));
                    Ok(())
                }
                JobBehavior::Fail(stderr) => Err(classify_failure(&stderr, Some(1))),
                JobBehavior::WaitForCancel => {
                    signal.cancelled().await;
                    Err(EngineError::Cancelled)
                }
            }
        });
        Ok(JobHandle::new(cancel, completion))
    }
}
