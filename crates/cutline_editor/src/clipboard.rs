// SPDX-License-Identifier: MIT OR Apache-2.0
//! Copy, cut and paste of clips.

use crate::state::{Project, Selection};
use cutline_timeline::{Clip, ClipId, GroupId, LinkedGroups, OperationList, OperationMap};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Copied clips with their operations and link flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clipboard {
    /// Copied clips in timeline list order
    pub clips: Vec<Clip>,
    /// Their operations
    pub operations: OperationMap,
    /// Link flags of the copied groups
    pub linked_groups: LinkedGroups,
    /// Earliest start among the copied clips
    pub anchor: f64,
}

impl Clipboard {
    /// Number of copied clips
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Whether nothing was copied
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

impl Project {
    /// Current clipboard contents
    pub fn clipboard(&self) -> Option<&Clipboard> {
        self.clipboard.as_ref()
    }

    /// Copy the selected clips; returns how many were copied
    pub fn copy_selection(&mut self) -> usize {
        let chosen: HashSet<ClipId> = self.selection.iter().copied().collect();
        self.copy_clips(&chosen)
    }

    fn copy_clips(&mut self, chosen: &HashSet<ClipId>) -> usize {
        let clips: Vec<Clip> = self
            .clips
            .iter()
            .filter(|c| chosen.contains(&c.id))
            .cloned()
            .collect();
        if clips.is_empty() {
            return 0;
        }

        let operations = clips
            .iter()
            .filter_map(|c| self.operations.get(&c.id).map(|ops| (c.id, ops.clone())))
            .collect();
        let mut linked_groups = LinkedGroups::new();
        for clip in &clips {
            linked_groups.set(clip.group_id, self.linked_groups.is_linked(clip.group_id));
        }
        let anchor = clips.iter().map(|c| c.start_time).fold(f64::INFINITY, f64::min);

        let count = clips.len();
        self.clipboard = Some(Clipboard {
            clips,
            operations,
            linked_groups,
            anchor,
        });
        tracing::debug!("Copied {count} clips");
        count
    }

    /// Copy the selected clips and their linked partners, then delete them.
    ///
    /// Removes exactly what [`Project::delete_selected`] would.
    pub fn cut_selection(&mut self) -> usize {
        let doomed = self.selection_with_links();
        let count = self.copy_clips(&doomed);
        if count > 0 {
            self.remove_clips("Cut clips", &doomed);
        }
        count
    }

    /// Paste the clipboard at the playhead.
    ///
    /// Pasted clips get fresh ids and operation ids, and each copied group
    /// maps to one fresh group. The pasted clips become the selection.
    pub fn paste(&mut self) -> Vec<ClipId> {
        let Some(board) = self.clipboard.clone() else {
            return Vec::new();
        };
        if board.is_empty() {
            return Vec::new();
        }
        let offset = self.current_time - board.anchor;

        let mut pasted = Vec::new();
        self.edit("Paste clips", |project| {
            let mut groups: HashMap<GroupId, GroupId> = HashMap::new();
            for source in &board.clips {
                let group = *groups.entry(source.group_id).or_insert_with(GroupId::new);
                let mut clip = source.clone();
                clip.id = ClipId::new();
                clip.group_id = group;
                clip.start_time = (source.start_time + offset).max(0.0);

                let ops = board
                    .operations
                    .get(&source.id)
                    .map_or_else(|| OperationList::for_clip(&clip), OperationList::reissued);
                project.operations.insert(clip.id, ops);
                pasted.push(clip.id);
                project.clips.push(clip);
            }

            for (copied, fresh) in &groups {
                project.linked_groups.set(*fresh, board.linked_groups.is_linked(*copied));
            }
            project.selection = Selection::with_clips(pasted.clone());
            project.resolve(&pasted.iter().copied().collect());
            true
        });

        tracing::info!("Pasted {} clips", pasted.len());
        pasted
    }
}
