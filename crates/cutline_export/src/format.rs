// SPDX-License-Identifier: MIT OR Apache-2.0
//! Output options and the encoder lookup table.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Broad class of an output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    /// Video container (may carry audio)
    Video,
    /// Looping image format; never carries audio
    AnimatedImage,
    /// Audio-only container
    Audio,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// MPEG-4 (H.264/AAC)
    Mp4,
    /// QuickTime (H.264/AAC)
    Mov,
    /// Matroska (H.264/AAC)
    Mkv,
    /// WebM (VP9/Opus)
    Webm,
    /// AVI (MPEG-4 Part 2/MP3)
    Avi,
    /// Animated GIF
    Gif,
    /// Animated WebP
    Webp,
    /// MP3 audio
    Mp3,
    /// PCM WAV audio
    Wav,
    /// AAC audio in an M4A container
    Aac,
    /// FLAC audio
    Flac,
    /// Ogg Vorbis audio
    Ogg,
}

impl ExportFormat {
    /// All formats
    pub const ALL: [ExportFormat; 12] = [
        Self::Mp4,
        Self::Mov,
        Self::Mkv,
        Self::Webm,
        Self::Avi,
        Self::Gif,
        Self::Webp,
        Self::Mp3,
        Self::Wav,
        Self::Aac,
        Self::Flac,
        Self::Ogg,
    ];

    /// Short name used in settings and on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mov => "mov",
            Self::Mkv => "mkv",
            Self::Webm => "webm",
            Self::Avi => "avi",
            Self::Gif => "gif",
            Self::Webp => "webp",
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Aac => "aac",
            Self::Flac => "flac",
            Self::Ogg => "ogg",
        }
    }

    /// File extension for output files
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Aac => "m4a",
            other => other.name(),
        }
    }

    /// Broad class of the format
    pub fn kind(&self) -> FormatKind {
        match self {
            Self::Mp4 | Self::Mov | Self::Mkv | Self::Webm | Self::Avi => FormatKind::Video,
            Self::Gif | Self::Webp => FormatKind::AnimatedImage,
            Self::Mp3 | Self::Wav | Self::Aac | Self::Flac | Self::Ogg => FormatKind::Audio,
        }
    }

    /// Whether the format is a looping image format
    pub fn is_animated(&self) -> bool {
        self.kind() == FormatKind::AnimatedImage
    }

    /// Whether output contains a video stream
    pub fn carries_video(&self) -> bool {
        self.kind() != FormatKind::Audio
    }

    /// Whether output may contain an audio stream
    pub fn carries_audio(&self) -> bool {
        self.kind() != FormatKind::AnimatedImage
    }

    /// Whether the format is limited to a small palette
    pub fn needs_palette(&self) -> bool {
        *self == Self::Gif
    }

    /// Guess the format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        if ext == "m4a" {
            return Some(Self::Aac);
        }
        Self::ALL.iter().copied().find(|f| f.name() == ext)
    }

    /// Encoders and container flags for this format at `quality`
    pub fn encoder_profile(&self, quality: Quality) -> EncoderProfile {
        const H264: VideoEncoder = VideoEncoder {
            codec: "libx264",
            quality_flag: Some("-crf"),
            quality_scale: [18, 23, 28],
            extra: &["-preset", "medium", "-pix_fmt", "yuv420p"],
        };
        const AAC: AudioEncoder = AudioEncoder {
            codec: "aac",
            bitrate: Some("192k"),
        };
        const MP3: AudioEncoder = AudioEncoder {
            codec: "libmp3lame",
            bitrate: Some("192k"),
        };

        let (video, audio, faststart) = match self {
            Self::Mp4 | Self::Mov => (Some(H264), Some(AAC), true),
            Self::Mkv => (Some(H264), Some(AAC), false),
            Self::Webm => (
                Some(VideoEncoder {
                    codec: "libvpx-vp9",
                    quality_flag: Some("-crf"),
                    quality_scale: [24, 32, 40],
                    extra: &["-b:v", "0", "-row-mt", "1"],
                }),
                Some(AudioEncoder {
                    codec: "libopus",
                    bitrate: Some("128k"),
                }),
                false,
            ),
            Self::Avi => (
                Some(VideoEncoder {
                    codec: "mpeg4",
                    quality_flag: Some("-q:v"),
                    quality_scale: [2, 5, 10],
                    extra: &[],
                }),
                Some(MP3),
                false,
            ),
            Self::Gif => (
                Some(VideoEncoder {
                    codec: "gif",
                    quality_flag: None,
                    quality_scale: [0, 0, 0],
                    extra: &[],
                }),
                None,
                false,
            ),
            Self::Webp => (
                Some(VideoEncoder {
                    codec: "libwebp",
                    quality_flag: Some("-quality"),
                    quality_scale: [90, 75, 50],
                    extra: &["-lossless", "0"],
                }),
                None,
                false,
            ),
            Self::Mp3 => (None, Some(MP3), false),
            Self::Wav => (
                None,
                Some(AudioEncoder {
                    codec: "pcm_s16le",
                    bitrate: None,
                }),
                false,
            ),
            Self::Aac => (None, Some(AAC), true),
            Self::Flac => (
                None,
                Some(AudioEncoder {
                    codec: "flac",
                    bitrate: None,
                }),
                false,
            ),
            Self::Ogg => (
                None,
                Some(AudioEncoder {
                    codec: "libvorbis",
                    bitrate: Some("192k"),
                }),
                false,
            ),
        };

        EncoderProfile {
            video,
            audio,
            quality,
            faststart,
        }
    }

    /// `-loop` value for animated formats
    pub fn loop_value(&self, mode: LoopMode) -> Option<&'static str> {
        match (self, mode) {
            (Self::Gif, LoopMode::Infinite) | (Self::Webp, LoopMode::Infinite) => Some("0"),
            (Self::Gif, LoopMode::Once) => Some("-1"),
            (Self::Webp, LoopMode::Once) => Some("1"),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for unrecognized option names
#[derive(Debug, Clone, thiserror::Error)]
#[error("Unknown {what}: {value}")]
pub struct UnknownOption {
    /// Option being parsed
    pub what: &'static str,
    /// Rejected value
    pub value: String,
}

impl FromStr for ExportFormat {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s.trim()).ok_or_else(|| UnknownOption {
            what: "format",
            value: s.to_string(),
        })
    }
}

/// Output resolution preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Resolution {
    /// Keep the source frame size
    #[default]
    Original,
    /// 1920×1080
    P1080,
    /// 1280×720
    P720,
    /// 854×480
    P480,
}

impl Resolution {
    /// Target frame size, `None` for original
    pub fn target_size(&self) -> Option<(u32, u32)> {
        match self {
            Self::Original => None,
            Self::P1080 => Some((1920, 1080)),
            Self::P720 => Some((1280, 720)),
            Self::P480 => Some((854, 480)),
        }
    }
}

impl FromStr for Resolution {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "original" => Ok(Self::Original),
            "1080p" | "1080" => Ok(Self::P1080),
            "720p" | "720" => Ok(Self::P720),
            "480p" | "480" => Ok(Self::P480),
            _ => Err(UnknownOption {
                what: "resolution",
                value: s.to_string(),
            }),
        }
    }
}

/// Encoding quality preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Visually lossless
    High,
    /// Balanced
    #[default]
    Medium,
    /// Small files
    Low,
}

impl Quality {
    fn index(self) -> usize {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

impl FromStr for Quality {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(UnknownOption {
                what: "quality",
                value: s.to_string(),
            }),
        }
    }
}

/// Looping behavior of animated formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    /// Loop forever
    #[default]
    Infinite,
    /// Play once
    Once,
}

impl FromStr for LoopMode {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "infinite" => Ok(Self::Infinite),
            "once" => Ok(Self::Once),
            _ => Err(UnknownOption {
                what: "loop mode",
                value: s.to_string(),
            }),
        }
    }
}

/// Everything the user picks in the export dialog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Output format
    pub format: ExportFormat,
    /// Frame size preset
    pub resolution: Resolution,
    /// Quality preset
    pub quality: Quality,
    /// Destination file
    pub output_path: PathBuf,
    /// Looping (animated formats only)
    pub loop_mode: LoopMode,
}

impl ExportOptions {
    /// Options with default resolution, quality and looping
    pub fn new(format: ExportFormat, output_path: impl Into<PathBuf>) -> Self {
        Self {
            format,
            resolution: Resolution::default(),
            quality: Quality::default(),
            output_path: output_path.into(),
            loop_mode: LoopMode::default(),
        }
    }

    /// Set the resolution
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Set the quality
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Set the loop mode
    pub fn with_loop_mode(mut self, loop_mode: LoopMode) -> Self {
        self.loop_mode = loop_mode;
        self
    }
}

/// Video encoder entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoEncoder {
    /// ffmpeg encoder name
    pub codec: &'static str,
    /// Flag carrying the quality value, if the encoder takes one
    pub quality_flag: Option<&'static str>,
    /// Quality values for high, medium and low on this encoder's scale
    pub quality_scale: [u32; 3],
    /// Fixed extra arguments
    pub extra: &'static [&'static str],
}

/// Audio encoder entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioEncoder {
    /// ffmpeg encoder name
    pub codec: &'static str,
    /// Fixed bitrate, if the codec is lossy
    pub bitrate: Option<&'static str>,
}

/// Resolved encoder selection for one export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderProfile {
    /// Video encoder, if the format carries video
    pub video: Option<VideoEncoder>,
    /// Audio encoder, if the format carries audio
    pub audio: Option<AudioEncoder>,
    /// Requested quality
    pub quality: Quality,
    /// Whether to move the index to the front of the file
    pub faststart: bool,
}

impl EncoderProfile {
    /// Quality value on the video encoder's own scale
    pub fn video_quality_value(&self) -> Option<u32> {
        let video = self.video?;
        video.quality_flag?;
        Some(video.quality_scale[self.quality.index()])
    }

    /// Codec arguments for the streams actually present
    pub fn args(&self, with_video: bool, with_audio: bool) -> Vec<String> {
        let mut args = Vec::new();

        match self.video.filter(|_| with_video) {
            Some(video) => {
                args.push("-c:v".to_string());
                args.push(video.codec.to_string());
                let quality = self.video_quality_value();
                if let (Some(flag), Some(value)) = (video.quality_flag, quality) {
                    args.push(flag.to_string());
                    args.push(value.to_string());
                }
                args.extend(video.extra.iter().map(|s| (*s).to_string()));
            }
            None => args.push("-vn".to_string()),
        }

        match self.audio.filter(|_| with_audio) {
            Some(audio) => {
                args.push("-c:a".to_string());
                args.push(audio.codec.to_string());
                if let Some(bitrate) = audio.bitrate {
                    args.push("-b:a".to_string());
                    args.push(bitrate.to_string());
                }
            }
            None => args.push("-an".to_string()),
        }

        if self.faststart {
            args.push("-movflags".to_string());
            args.push("+faststart".to_string());
        }

        args
    }
}
