// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor workflows that talk to the media engine.
//!
//! These run outside the project lock: the project is locked only to read
//! what a workflow needs and again to apply its result, never across an
//! await.

use crate::error::EditorError;
use crate::merge::MergeOutcome;
use crate::state::Project;
use cutline_export::{compile_export, EngineError, MediaEngine, ProgressUpdate};
use cutline_timeline::ClipId;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

/// What an import batch did
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Clips added to the timeline
    pub clips: Vec<ClipId>,
    /// Files that could not be probed
    pub failures: Vec<(PathBuf, EngineError)>,
}

/// Probe `paths` and append the readable ones to the timeline.
///
/// Each file is probed once. Unreadable files are reported and skipped; the
/// batch fails only when nothing could be imported.
pub async fn import_files<E: MediaEngine>(
    project: &Mutex<Project>,
    engine: &E,
    paths: &[PathBuf],
) -> Result<ImportReport, EditorError> {
    let mut media = Vec::with_capacity(paths.len());
    let mut failures = Vec::new();

    for path in paths {
        match engine.probe(path).await {
            Ok(info) => media.push((path.clone(), info)),
            Err(err) => {
                tracing::warn!("Could not import {:?}: {err}", path);
                failures.push((path.clone(), err));
            }
        }
    }

    let clips = project.lock().import_media(media);
    if clips.is_empty() {
        return match failures.into_iter().next() {
            Some((_, err)) => Err(err.into()),
            None => Err(EditorError::NothingImported),
        };
    }
    Ok(ImportReport { clips, failures })
}

/// Merge the selected groups into one rendered clip.
///
/// The sources are rendered into `output_dir`, the result is probed, and
/// the merged clip replaces the sources if the selection is unchanged.
pub async fn run_merge<E: MediaEngine>(
    project: &Mutex<Project>,
    engine: &E,
    output_dir: &Path,
) -> Result<MergeOutcome, EditorError> {
    let request = project.lock().prepare_merge(output_dir)?;
    let command = compile_export(&request.clips, &request.operations, &request.options)?;

    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|source| EditorError::Io {
            path: output_dir.to_path_buf(),
            source,
        })?;

    let job = engine.run_job(
        command.args,
        command.total_duration,
        Box::new(|update: ProgressUpdate| tracing::debug!("Merge render {:.1}%", update.percent)),
    )?;
    job.wait().await?;

    let merged_path = request.options.output_path.clone();
    let info = engine.probe(&merged_path).await?;
    let outcome = project.lock().commit_merge(&request, merged_path, info);
    Ok(outcome)
}
