// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cutline editor core.
//!
//! Owns the editable [`Project`] and everything that changes it:
//! - Import, move, edge trim, split, delete, copy/cut/paste
//! - Per-clip operation edits routed through linked groups
//! - Snapshot-based undo/redo
//! - Merging groups into one rendered clip
//! - Export jobs with progress, ETA and cancellation
//! - RON settings
//!
//! ## Architecture
//!
//! [`Project`] is a plain single-threaded store. The async workflows in
//! [`commands`] and [`export_job`] take it behind a `parking_lot::Mutex`
//! and only lock it to read inputs or apply results.

pub mod clipboard;
pub mod commands;
pub mod edit;
pub mod error;
pub mod export_job;
pub mod history;
pub mod merge;
pub mod settings;
pub mod state;

pub use clipboard::Clipboard;
pub use commands::{import_files, run_merge, ImportReport};
pub use edit::{MoveRequest, TrimEdge, MIN_TRIM_VISIBLE};
pub use error::{EditRejection, EditorError, MergeRejection};
pub use export_job::{start_export, ExportJob, ExportJobState, ExportProgress, ExportResult};
pub use history::{History, HistoryError, HistoryStats, MAX_HISTORY};
pub use merge::{GroupComposition, MergeOutcome, MergePlan, MergeRequest};
pub use settings::{EditorSettings, SettingsError, SETTINGS_FILE_NAME, SETTINGS_FORMAT_VERSION};
pub use state::{Project, ProjectSnapshot, SelectMode, Selection, TrackCounts};
