// SPDX-License-Identifier: MIT OR Apache-2.0
//! Import, merge and export against a fake media engine.

mod common;

use common::{audio_only, av, FakeEngine, JobBehavior};
use cutline_editor::{
    import_files, run_merge, start_export, EditorError, ExportResult, MergeOutcome, Project,
    SelectMode,
};
use cutline_export::{EngineError, ExportFormat, ExportOptions};
use cutline_timeline::TrackKind;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

fn mp4_options() -> ExportOptions {
    ExportOptions::new(ExportFormat::Mp4, "/tmp/out.mp4")
}

#[tokio::test]
async fn import_probes_each_file_once() {
    let engine = FakeEngine::with_media([("a.mp4", av(4.0)), ("b.wav", audio_only(2.0))]);
    let project = Mutex::new(Project::new());

    let paths = [PathBuf::from("a.mp4"), PathBuf::from("missing.mov"), PathBuf::from("b.wav")];
    let report = import_files(&project, &engine, &paths).await.unwrap();

    assert_eq!(report.clips.len(), 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, PathBuf::from("missing.mov"));
    assert_eq!(engine.probes.lock().len(), 3);

    let project = project.lock();
    assert_eq!(project.timeline_duration(), 6.0);
    let wav = project.clips().iter().find(|c| c.file_path == Path::new("b.wav")).unwrap();
    assert_eq!(wav.track, TrackKind::Audio);
    assert_eq!(wav.start_time, 4.0);
    // One history entry for the whole batch
    assert_eq!(project.history_stats().undo_count, 1);
}

#[tokio::test]
async fn import_of_only_bad_files_fails() {
    let engine = FakeEngine::default();
    let project = Mutex::new(Project::new());
    let result = import_files(&project, &engine, &[PathBuf::from("nope.mp4")]).await;
    assert!(matches!(result, Err(EditorError::Engine(EngineError::Probe { .. }))));
    assert!(project.lock().clips().is_empty());
}

#[tokio::test]
async fn export_runs_compiled_command() {
    let engine = FakeEngine::default();
    let mut project = Project::new();
    project.import_media(vec![(PathBuf::from("a.mp4"), av(4.0))]);

    let options = ExportOptions::new(ExportFormat::Mp4, "/tmp/out.mp4");
    let job = start_export(&project, &engine, options).unwrap();
    let result = job.wait().await;

    assert!(matches!(
        result,
        ExportResult::Success { ref output_path, .. } if output_path == Path::new("/tmp/out.mp4")
    ));
    let jobs = engine.jobs.lock();
    assert_eq!(jobs.len(), 1);
    assert!(jobs[0].iter().any(|arg| arg == "libx264"));
    assert_eq!(jobs[0].last().map(String::as_str), Some("/tmp/out.mp4"));
}

#[tokio::test]
async fn export_reports_progress_and_completion() {
    let engine = FakeEngine::default();
    let mut project = Project::new();
    project.import_media(vec![(PathBuf::from("a.mp4"), av(4.0))]);

    let options = ExportOptions::new(ExportFormat::Wav, "/tmp/out.wav");
    let job = start_export(&project, &engine, options).unwrap();
    let state = std::sync::Arc::clone(job.state());
    job.wait().await;

    let progress = state.get_progress();
    assert!(progress.complete);
    assert_eq!(progress.percent, 100.0);
    assert_eq!(progress.speed_text, "2x");
}

#[tokio::test]
async fn export_of_empty_timeline_is_refused() {
    let engine = FakeEngine::default();
    let project = Project::new();
    let result = start_export(&project, &engine, mp4_options());
    assert!(matches!(result, Err(EditorError::Compile(_))));
    assert!(engine.jobs.lock().is_empty());
}

#[tokio::test]
async fn export_failure_names_missing_encoder() {
    let engine = FakeEngine {
        behavior: JobBehavior::Fail("Unknown encoder 'libx264'".into()),
        ..Default::default()
    };
    let mut project = Project::new();
    project.import_media(vec![(PathBuf::from("a.mp4"), av(4.0))]);

    let job = start_export(&project, &engine, mp4_options()).unwrap();
    let state = std::sync::Arc::clone(job.state());
    let ExportResult::Failed(message) = job.wait().await else {
        panic!("export should fail");
    };
    assert!(message.contains("libx264"));
    assert!(state.get_progress().error.is_some());
}

#[tokio::test]
async fn export_can_be_cancelled() {
    let engine = FakeEngine {
        behavior: JobBehavior::WaitForCancel,
        ..Default::default()
    };
    let mut project = Project::new();
    project.import_media(vec![(PathBuf::from("a.mp4"), av(4.0))]);

    let job = start_export(&project, &engine, mp4_options()).unwrap();
    let state = std::sync::Arc::clone(job.state());
    job.cancel();
    assert_eq!(job.wait().await, ExportResult::Cancelled);
    assert!(state.is_cancelled());
}

#[tokio::test]
async fn export_reads_timeline_at_start() {
    let engine = FakeEngine {
        behavior: JobBehavior::WaitForCancel,
        ..Default::default()
    };
    let mut project = Project::new();
    let ids = project.import_media(vec![(PathBuf::from("a.mp4"), av(4.0))]);

    let job = start_export(&project, &engine, mp4_options()).unwrap();
    project.delete_clip(ids[0]);
    project.delete_clip(ids[1]);
    assert!(project.clips().is_empty());

    job.cancel();
    job.wait().await;
    assert!(engine.jobs.lock()[0].iter().any(|arg| arg == "a.mp4"));
}

#[tokio::test]
async fn merge_replaces_groups_with_rendered_clip() {
    let engine = FakeEngine {
        rendered: Some(av(6.0)),
        ..Default::default()
    };
    let project = Mutex::new(Project::new());
    let (a, b) = {
        let mut project = project.lock();
        let a = project.import_media(vec![(PathBuf::from("a.mp4"), av(2.0))]);
        let b = project.import_media(vec![(PathBuf::from("b.mp4"), av(4.0))]);
        project.select(&[a[0], b[1]], SelectMode::Set);
        (a, b)
    };

    let output_dir = std::env::temp_dir().join(format!("cutline-merge-{}", uuid::Uuid::new_v4()));
    let outcome = run_merge(&project, &engine, &output_dir).await.unwrap();
    let _ = std::fs::remove_dir_all(&output_dir);

    let MergeOutcome::Applied { clips } = outcome else {
        panic!("merge should apply");
    };
    let project = project.lock();
    assert_eq!(clips.len(), 2);
    assert_eq!(project.clips().len(), 2);
    assert!(project.clip(a[0]).is_none());
    assert!(project.clip(b[0]).is_none());
    assert!(project.clips().iter().all(|c| c.file_path.starts_with(&output_dir)));
    assert_eq!(project.timeline_duration(), 6.0);
    assert_eq!(engine.jobs.lock().len(), 1);
}

#[tokio::test]
async fn merge_rejection_runs_nothing() {
    let engine = FakeEngine::default();
    let project = Mutex::new(Project::new());
    {
        let mut project = project.lock();
        let a = project.import_media(vec![(PathBuf::from("a.mp4"), av(2.0))]);
        project.select(&[a[0]], SelectMode::Set);
    }
    let result = run_merge(&project, &engine, &std::env::temp_dir()).await;
    assert!(matches!(result, Err(EditorError::Merge(_))));
    assert!(engine.jobs.lock().is_empty());
}
