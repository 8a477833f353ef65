// SPDX-License-Identifier: MIT OR Apache-2.0
//! Merging selected groups into one rendered clip.
//!
//! A merge runs in two halves around the render. [`Project::prepare_merge`]
//! validates the selection and captures everything the render needs;
//! [`Project::commit_merge`] swaps the sources for the rendered file, but
//! only while the selection still matches the one captured.

use crate::error::MergeRejection;
use crate::state::{Project, Selection};
use cutline_export::{ExportFormat, ExportOptions, Quality};
use cutline_timeline::{
    range_of, Clip, ClipId, GroupId, MediaInfo, OperationList, OperationMap, TrackKind,
};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Stream makeup of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupComposition {
    /// Only video clips
    VideoOnly,
    /// Only audio clips
    AudioOnly,
    /// Both video and audio clips
    AudioVideo,
}

impl GroupComposition {
    /// Composition of a set of clips, `None` when empty
    pub fn of<'a>(clips: impl IntoIterator<Item = &'a Clip>) -> Option<Self> {
        let (mut video, mut audio) = (false, false);
        for clip in clips {
            match clip.track {
                TrackKind::Video => video = true,
                TrackKind::Audio => audio = true,
            }
        }
        match (video, audio) {
            (true, true) => Some(Self::AudioVideo),
            (true, false) => Some(Self::VideoOnly),
            (false, true) => Some(Self::AudioOnly),
            (false, false) => None,
        }
    }

    /// Whether the merged result carries video
    pub fn has_video(&self) -> bool {
        matches!(self, Self::VideoOnly | Self::AudioVideo)
    }

    /// Whether the merged result carries audio
    pub fn has_audio(&self) -> bool {
        matches!(self, Self::AudioOnly | Self::AudioVideo)
    }

    /// Intermediate format the merge renders to
    pub fn render_format(&self) -> ExportFormat {
        if self.has_video() {
            ExportFormat::Mp4
        } else {
            ExportFormat::Wav
        }
    }
}

/// A validated merge selection
#[derive(Debug, Clone, PartialEq)]
pub struct MergePlan {
    /// Selected groups in selection order
    pub groups: Vec<GroupId>,
    /// Shared composition
    pub composition: GroupComposition,
}

/// Everything a merge render needs, captured when it starts
#[derive(Debug, Clone)]
pub struct MergeRequest {
    /// Selection at start, sorted
    pub selection: Vec<ClipId>,
    /// Clips the merged clip replaces
    pub source_clips: Vec<ClipId>,
    /// Shared composition
    pub composition: GroupComposition,
    /// Where the merged clip goes
    pub start_time: f64,
    /// Lane of the merged video clip
    pub video_track_index: u32,
    /// Lane of the merged audio clip
    pub audio_track_index: u32,
    /// Source clips shifted to start at zero
    pub clips: Vec<Clip>,
    /// Their operations
    pub operations: OperationMap,
    /// Render settings
    pub options: ExportOptions,
}

/// Result of committing a merge
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// The merged clips replaced the sources
    Applied {
        /// New clips
        clips: Vec<ClipId>,
    },
    /// The selection changed during the render; the timeline is untouched
    SelectionChanged {
        /// Rendered file, left on disk
        kept_file: PathBuf,
    },
    /// The rendered file has none of the wanted streams
    Unusable {
        /// Rendered file, left on disk
        kept_file: PathBuf,
    },
}

impl Project {
    /// Check whether the selection can be merged
    pub fn merge_eligibility(&self) -> Result<MergePlan, MergeRejection> {
        if self.selection.is_empty() {
            return Err(MergeRejection::NothingSelected);
        }

        let groups: IndexSet<GroupId> = self
            .selection
            .iter()
            .filter_map(|id| self.clip(*id))
            .map(|clip| clip.group_id)
            .collect();
        if groups.len() < 2 {
            return Err(MergeRejection::TooFewGroups(groups.len()));
        }

        let mut composition = None;
        for group in &groups {
            let current = GroupComposition::of(self.clips.iter().filter(|c| c.group_id == *group));
            match (composition, current) {
                (_, None) => return Err(MergeRejection::MixedComposition),
                (None, Some(current)) => composition = Some(current),
                (Some(first), Some(current)) if first != current => {
                    return Err(MergeRejection::MixedComposition);
                }
                _ => {}
            }
        }
        let composition = composition.ok_or(MergeRejection::MixedComposition)?;

        Ok(MergePlan {
            groups: groups.into_iter().collect(),
            composition,
        })
    }

    /// Validate the selection and capture a render request writing into `output_dir`
    pub fn prepare_merge(&self, output_dir: &Path) -> Result<MergeRequest, MergeRejection> {
        let plan = self.merge_eligibility()?;

        let sources: Vec<&Clip> = self
            .clips
            .iter()
            .filter(|c| plan.groups.contains(&c.group_id))
            .collect();
        let start_time = sources.iter().map(|c| c.start_time).fold(f64::INFINITY, f64::min);
        let start_time = if start_time.is_finite() { start_time } else { 0.0 };
        let lowest_lane = |kind: TrackKind| {
            sources
                .iter()
                .filter(|c| c.track == kind)
                .map(|c| c.track_index)
                .min()
                .unwrap_or(0)
        };

        let clips: Vec<Clip> = sources
            .iter()
            .map(|clip| {
                let mut shifted = (*clip).clone();
                shifted.start_time = (clip.start_time - start_time).max(0.0);
                shifted
            })
            .collect();
        let operations: OperationMap = clips
            .iter()
            .map(|clip| {
                let ops = self
                    .operations
                    .get(&clip.id)
                    .cloned()
                    .unwrap_or_else(|| OperationList::for_clip(clip));
                (clip.id, ops)
            })
            .collect();

        let format = plan.composition.render_format();
        let file_name = format!("merge-{}.{}", uuid::Uuid::new_v4().simple(), format.extension());
        let options =
            ExportOptions::new(format, output_dir.join(file_name)).with_quality(Quality::High);

        tracing::info!(
            "Merging {} groups ({} clips) into {:?}",
            plan.groups.len(),
            clips.len(),
            options.output_path
        );

        Ok(MergeRequest {
            selection: self.selection.sorted(),
            source_clips: clips.iter().map(|c| c.id).collect(),
            composition: plan.composition,
            start_time,
            video_track_index: lowest_lane(TrackKind::Video),
            audio_track_index: lowest_lane(TrackKind::Audio),
            clips,
            operations,
            options,
        })
    }

    /// Replace the merge sources with the rendered file
    pub fn commit_merge(
        &mut self,
        request: &MergeRequest,
        merged_path: PathBuf,
        info: MediaInfo,
    ) -> MergeOutcome {
        let unchanged = self.selection.sorted() == request.selection
            && request.source_clips.iter().all(|id| self.clip(*id).is_some());
        if !unchanged {
            tracing::warn!(
                "Selection changed during merge; keeping {:?} without applying",
                merged_path
            );
            return MergeOutcome::SelectionChanged { kept_file: merged_path };
        }

        let streams = [
            (
                request.composition.has_video() && info.has_video,
                TrackKind::Video,
                request.video_track_index,
            ),
            (
                request.composition.has_audio() && info.has_audio,
                TrackKind::Audio,
                request.audio_track_index,
            ),
        ];
        if !streams.iter().any(|(wanted, _, _)| *wanted) {
            tracing::warn!("Merged file {:?} has no usable streams", merged_path);
            return MergeOutcome::Unusable { kept_file: merged_path };
        }

        let mut created = Vec::new();
        self.edit("Merge clips", |project| {
            let doomed: HashSet<ClipId> = request.source_clips.iter().copied().collect();
            project.clips.retain(|c| !doomed.contains(&c.id));
            project.operations.retain(|id, _| !doomed.contains(id));

            let group = GroupId::new();
            for (wanted, track, lane) in streams {
                if !wanted {
                    continue;
                }
                let clip = Clip::new(merged_path.clone(), track, group, info.clone())
                    .with_start(request.start_time)
                    .with_track_index(lane);
                project.operations.insert(clip.id, OperationList::for_clip(&clip));
                created.push(clip.id);
                project.clips.push(clip);
            }

            project.selection = Selection::with_clips(created.clone());
            project.resolve(&created.iter().copied().collect());
            true
        });

        let end = created
            .first()
            .and_then(|id| self.clip(*id))
            .map(|clip| range_of(clip, &self.operations).end);
        tracing::info!("Merged into {} clips ending at {:?}", created.len(), end);
        MergeOutcome::Applied { clips: created }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SelectMode;

    fn info(video: bool, audio: bool, duration: f64) -> MediaInfo {
        MediaInfo {
            duration,
            width: if video { 640 } else { 0 },
            height: if video { 360 } else { 0 },
            fps: if video { 25.0 } else { 0.0 },
            sample_rate: if audio { 44_100 } else { 0 },
            has_video: video,
            has_audio: audio,
            ..Default::default()
        }
    }

    fn project_with(media: &[(bool, bool)]) -> (Project, Vec<Vec<ClipId>>) {
        let mut project = Project::new();
        let ids = media
            .iter()
            .enumerate()
            .map(|(i, (v, a))| {
                let path = PathBuf::from(format!("m{i}.mp4"));
                project.import_media(vec![(path, info(*v, *a, 2.0))])
            })
            .collect();
        (project, ids)
    }

    #[test]
    fn test_nothing_selected() {
        let (project, _) = project_with(&[(true, true)]);
        assert_eq!(project.merge_eligibility(), Err(MergeRejection::NothingSelected));
    }

    #[test]
    fn test_single_group_rejected() {
        let (mut project, ids) = project_with(&[(true, true), (true, true)]);
        project.select(&ids[0], SelectMode::Set);
        assert_eq!(project.merge_eligibility(), Err(MergeRejection::TooFewGroups(1)));
    }

    #[test]
    fn test_mixed_composition_rejected() {
        let (mut project, ids) = project_with(&[(true, true), (true, false)]);
        project.select(&[ids[0][0], ids[1][0]], SelectMode::Set);
        assert_eq!(project.merge_eligibility(), Err(MergeRejection::MixedComposition));
    }

    #[test]
    fn test_composition_uses_whole_group() {
        let (mut project, ids) = project_with(&[(true, true), (true, true)]);
        // Selecting only the video halves still merges complete A/V groups
        project.select(&[ids[0][0], ids[1][0]], SelectMode::Set);
        let plan = project.merge_eligibility().unwrap();
        assert_eq!(plan.composition, GroupComposition::AudioVideo);
        assert_eq!(plan.groups.len(), 2);
    }

    #[test]
    fn test_prepare_shifts_sources_to_zero() {
        let (mut project, ids) = project_with(&[(false, true), (false, true), (false, true)]);
        project.select(&[ids[1][0], ids[2][0]], SelectMode::Set);
        let request = project.prepare_merge(Path::new("/tmp")).unwrap();
        assert_eq!(request.start_time, 2.0);
        assert_eq!(request.clips[0].start_time, 0.0);
        assert_eq!(request.clips[1].start_time, 2.0);
        assert_eq!(request.options.format, ExportFormat::Wav);
        assert!(request.options.output_path.starts_with("/tmp"));
    }

    #[test]
    fn test_commit_replaces_sources() {
        let (mut project, ids) = project_with(&[(true, true), (true, true)]);
        project.select(&[ids[0][0], ids[1][0]], SelectMode::Set);
        let request = project.prepare_merge(Path::new("/tmp")).unwrap();
        let path = request.options.output_path.clone();

        let outcome = project.commit_merge(&request, path.clone(), info(true, true, 4.0));
        let MergeOutcome::Applied { clips } = outcome else {
            panic!("merge not applied");
        };
        assert_eq!(clips.len(), 2);
        assert_eq!(project.clips().len(), 2);
        assert!(project.clips().iter().all(|c| c.file_path == path));
        assert_eq!(project.timeline_duration(), 4.0);
        assert_eq!(project.selection().len(), 2);

        assert!(project.undo());
        assert_eq!(project.clips().len(), 4);
    }

    #[test]
    fn test_commit_after_selection_change_keeps_timeline() {
        let (mut project, ids) = project_with(&[(true, false), (true, false)]);
        project.select(&[ids[0][0], ids[1][0]], SelectMode::Set);
        let request = project.prepare_merge(Path::new("/tmp")).unwrap();
        project.select(&[ids[0][0]], SelectMode::Set);

        let path = request.options.output_path.clone();
        let outcome = project.commit_merge(&request, path.clone(), info(true, false, 4.0));
        assert_eq!(outcome, MergeOutcome::SelectionChanged { kept_file: path });
        assert_eq!(project.clips().len(), 2);
    }
}
