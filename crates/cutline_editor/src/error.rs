// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor error types.
//!
//! Rejections are user-facing validation outcomes: their `Display` text is
//! the reason shown to the user and no state changed. [`EditorError`] covers
//! failures of the async workflows.

use crate::history::HistoryError;
use crate::settings::SettingsError;
use cutline_export::{CompileError, EngineError};
use std::path::PathBuf;

/// Why a merge cannot run
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeRejection {
    /// Nothing is selected
    #[error("Select clips from at least two groups to merge")]
    NothingSelected,
    /// Only one group is selected
    #[error("Merging needs at least two groups; {0} selected")]
    TooFewGroups(usize),
    /// Selected groups differ in stream composition
    #[error("Selected groups must all be video-only, all audio-only or all complete audio/video")]
    MixedComposition,
}

/// Why a parameter edit was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditRejection {
    /// Volume/pitch edit on a clip with no linked audio
    #[error("This clip has no linked audio to adjust")]
    NoLinkedAudio,
}

/// Failures of editor workflows
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// Media engine failure
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// The timeline could not be compiled
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// Merge was refused
    #[error(transparent)]
    Merge(#[from] MergeRejection),
    /// History failure
    #[error("History error: {0}")]
    History(#[from] HistoryError),
    /// Settings failure
    #[error(transparent)]
    Settings(#[from] SettingsError),
    /// No file in an import batch could be used
    #[error("None of the files could be imported")]
    NothingImported,
    /// File system failure
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}
