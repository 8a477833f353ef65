// SPDX-License-Identifier: MIT OR Apache-2.0
//! Export pipeline for Cutline.
//!
//! This crate turns a timeline into encoder work:
//! - Output formats, presets and the encoder table
//! - A labeled filter graph builder
//! - The export compiler (timeline to one ffmpeg invocation)
//! - Tempo/pitch filter chains
//! - Progress parsing and ETA smoothing
//! - The media engine seam and its ffmpeg implementation
//!
//! ## Architecture
//!
//! Compilation is pure and deterministic. Everything that touches processes
//! sits behind [`MediaEngine`] so callers can swap in a fake.

pub mod compiler;
pub mod engine;
pub mod error;
pub mod filter;
pub mod format;
pub mod progress;
pub mod tempo;

pub use compiler::{compile_export, validate_export, CompileError, ExportCommand};
pub use engine::{
    parse_probe_output, CancelHandle, FfmpegEngine, JobHandle, MediaEngine, ProgressSink,
};
pub use error::{classify_failure, EngineError};
pub use filter::{Filter, FilterChain, FilterGraph, GraphError, Pad};
pub use format::{
    EncoderProfile, ExportFormat, ExportOptions, FormatKind, LoopMode, Quality, Resolution,
    UnknownOption,
};
pub use progress::{parse_progress_line, EtaEstimator, ProgressLine, ProgressParser, ProgressUpdate};
pub use tempo::{rate_filters, tempo_filters, tempo_stages, volume_filter};
