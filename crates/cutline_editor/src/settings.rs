// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor settings stored as RON.

use crate::history::MAX_HISTORY;
use cutline_export::{ExportFormat, LoopMode, Quality, Resolution};
use cutline_timeline::{SnapEngine, SNAP_ENTER_PX, SNAP_EXIT_PX};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE_NAME: &str = "cutline.ron";

/// Settings errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Reading or writing the file failed
    #[error("Settings file {}: {source}", path.display())]
    Io {
        /// Settings file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid settings RON
    #[error("Settings file {} is invalid: {message}", path.display())]
    Parse {
        /// Settings file
        path: PathBuf,
        /// Parser message
        message: String,
    },
    /// Settings could not be serialized
    #[error("Settings could not be written: {0}")]
    Serialize(String),
    /// The file was written by a newer version
    #[error("Settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest supported version
        supported: u32,
    },
}

/// Default export choices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDefaults {
    /// Output format
    pub format: ExportFormat,
    /// Frame size preset
    pub resolution: Resolution,
    /// Quality preset
    pub quality: Quality,
    /// Looping for animated formats
    pub loop_mode: LoopMode,
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            format: ExportFormat::Mp4,
            resolution: Resolution::Original,
            quality: Quality::Medium,
            loop_mode: LoopMode::Infinite,
        }
    }
}

/// Snap thresholds in pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapSettings {
    /// Whether snapping is on
    pub enabled: bool,
    /// Acquire distance
    pub enter_px: f64,
    /// Release distance
    pub exit_px: f64,
}

impl SnapSettings {
    /// Snap engine with these thresholds, `None` when snapping is off
    pub fn engine(&self) -> Option<SnapEngine> {
        self.enabled
            .then(|| SnapEngine::with_thresholds(self.enter_px, self.exit_px))
    }
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            enter_px: SNAP_ENTER_PX,
            exit_px: SNAP_EXIT_PX,
        }
    }
}

/// Complete editor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorSettings {
    /// Settings format version
    pub version: u32,
    /// Undo depth
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,
    /// Snapping
    #[serde(default)]
    pub snap: SnapSettings,
    /// `ffmpeg` executable
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: PathBuf,
    /// `ffprobe` executable
    #[serde(default = "default_ffprobe")]
    pub ffprobe_path: PathBuf,
    /// Export defaults
    #[serde(default)]
    pub export: ExportDefaults,
    /// Where merged media is written; the system temp dir when unset
    #[serde(default)]
    pub merge_output_dir: Option<PathBuf>,
}

fn default_history_depth() -> usize {
    MAX_HISTORY
}

fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe() -> PathBuf {
    PathBuf::from("ffprobe")
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            history_depth: default_history_depth(),
            snap: SnapSettings::default(),
            ffmpeg_path: default_ffmpeg(),
            ffprobe_path: default_ffprobe(),
            export: ExportDefaults::default(),
            merge_output_dir: None,
        }
    }
}

impl EditorSettings {
    /// Load settings; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No settings at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let settings: EditorSettings = ron::from_str(&content).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        // Version check
        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(SettingsError::UnsupportedVersion {
                found: settings.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }

        tracing::info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);

        let content = ron::ser::to_string_pretty(self, config)
            .map_err(|e| SettingsError::Serialize(e.to_string()))?;

        std::fs::write(path, content).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Directory for merged media
    pub fn merge_dir(&self) -> PathBuf {
        self.merge_output_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
