// SPDX-License-Identifier: MIT OR Apache-2.0
//! Media engine: probing and long-running encoder jobs.
//!
//! The editor only talks to [`MediaEngine`]. [`FfmpegEngine`] implements it
//! with `ffprobe` and `ffmpeg` child processes; tests provide in-memory fakes.

use crate::error::{classify_failure, EngineError};
use crate::progress::{ProgressParser, ProgressUpdate};
use cutline_timeline::MediaInfo;
use serde::Deserialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Callback receiving progress while a job runs
pub type ProgressSink = Box<dyn FnMut(ProgressUpdate) + Send + 'static>;

/// External media toolkit
pub trait MediaEngine: Send + Sync {
    /// Read technical metadata of a media file
    fn probe(&self, path: &Path) -> impl Future<Output = Result<MediaInfo, EngineError>> + Send;

    /// Start a job with the given arguments.
    ///
    /// `total_duration` is the output length in seconds and scales progress.
    /// Must be called from within a tokio runtime.
    fn run_job(
        &self,
        args: Vec<String>,
        total_duration: f64,
        on_progress: ProgressSink,
    ) -> Result<JobHandle, EngineError>;
}

/// Shared cancellation signal for a running job
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    requested: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelHandle {
    /// Create a signal that has not fired
    pub fn new() -> Self {
        Self::default()
    }

    /// Request termination
    pub fn cancel(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Whether termination was requested
    pub fn is_cancelled(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Resolve once termination is requested
    pub async fn cancelled(&self) {
        while !self.is_cancelled() {
            self.notify.notified().await;
        }
    }
}

/// A running job: a termination handle plus its completion signal
#[derive(Debug)]
pub struct JobHandle {
    cancel: CancelHandle,
    completion: JoinHandle<Result<(), EngineError>>,
}

impl JobHandle {
    /// Pair a cancel signal with the task that honors it
    pub fn new(cancel: CancelHandle, completion: JoinHandle<Result<(), EngineError>>) -> Self {
        Self { cancel, completion }
    }

    /// Clone of the cancel signal, usable after the handle is consumed
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Request termination of the job
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the job to finish
    pub async fn wait(self) -> Result<(), EngineError> {
        match self.completion.await {
            Ok(result) => result,
            Err(err) => Err(EngineError::Task(err.to_string())),
        }
    }
}

/// [`MediaEngine`] backed by the `ffmpeg` and `ffprobe` executables
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    /// Path or name of the `ffmpeg` executable
    pub ffmpeg_path: PathBuf,
    /// Path or name of the `ffprobe` executable
    pub ffprobe_path: PathBuf,
}

impl FfmpegEngine {
    /// Create an engine using the given executables
    pub fn new(ffmpeg_path: impl Into<PathBuf>, ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
        }
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl MediaEngine for FfmpegEngine {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, EngineError> {
        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| EngineError::Spawn {
                program: self.ffprobe_path.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(EngineError::Probe {
                path: path.to_path_buf(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let mut info = parse_probe_output(&output.stdout)?;
        if !info.has_video && !info.has_audio {
            return Err(EngineError::NoStreams(path.to_path_buf()));
        }
        if info.file_size == 0 {
            if let Ok(metadata) = tokio::fs::metadata(path).await {
                info.file_size = metadata.len();
            }
        }

        tracing::debug!(path = %path.display(), duration = info.duration, "Probed media");
        Ok(info)
    }

    fn run_job(
        &self,
        args: Vec<String>,
        total_duration: f64,
        mut on_progress: ProgressSink,
    ) -> Result<JobHandle, EngineError> {
        let mut child = Command::new(&self.ffmpeg_path)
            .args(["-hide_banner", "-nostdin", "-nostats", "-progress", "pipe:1"])
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                program: self.ffmpeg_path.display().to_string(),
                source,
            })?;

        tracing::info!(
            program = %self.ffmpeg_path.display(),
            total_duration,
            "Started encoder job"
        );

        // Drain stderr concurrently so a full pipe cannot stall the encoder
        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf).await;
                String::from_utf8_lossy(&buf).into_owned()
            })
        });

        let progress_task = child.stdout.take().map(|stdout| {
            tokio::spawn(async move {
                let mut parser = ProgressParser::new(total_duration);
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if let Some(update) = parser.feed(&line) {
                        on_progress(update);
                    }
                }
            })
        });

        let cancel = CancelHandle::new();
        let completion = tokio::spawn(supervise(child, cancel.clone(), progress_task, stderr_task));
        Ok(JobHandle::new(cancel, completion))
    }
}

async fn supervise(
    mut child: Child,
    cancel: CancelHandle,
    progress_task: Option<JoinHandle<()>>,
    stderr_task: Option<JoinHandle<String>>,
) -> Result<(), EngineError> {
    let status = tokio::select! {
        status = child.wait() => status?,
        () = cancel.cancelled() => {
            if let Err(err) = child.start_kill() {
                tracing::warn!("Failed to terminate encoder: {err}");
            }
            let _ = child.wait().await;
            tracing::info!("Encoder job cancelled");
            return Err(EngineError::Cancelled);
        }
    };

    if let Some(task) = progress_task {
        let _ = task.await;
    }
    let stderr = match stderr_task {
        Some(task) => task.await.unwrap_or_default(),
        None => String::new(),
    };

    if status.success() {
        tracing::info!("Encoder job finished");
        Ok(())
    } else {
        let err = classify_failure(&stderr, status.code());
        tracing::error!("Encoder job failed: {err}");
        Err(err)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    pix_fmt: Option<String>,
    sample_rate: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    disposition: ProbeDisposition,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeDisposition {
    #[serde(default)]
    attached_pic: u8,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    size: Option<String>,
}

/// Build [`MediaInfo`] from `ffprobe -print_format json` output.
///
/// Cover-art streams do not count as video.
pub fn parse_probe_output(json: &[u8]) -> Result<MediaInfo, EngineError> {
    let output: ProbeOutput = serde_json::from_slice(json)?;
    let mut info = MediaInfo::default();

    let video = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video") && s.disposition.attached_pic == 0);
    let audio = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"));

    if let Some(video) = video {
        info.has_video = true;
        info.width = video.width.unwrap_or(0);
        info.height = video.height.unwrap_or(0);
        info.fps = [&video.avg_frame_rate, &video.r_frame_rate]
            .into_iter()
            .filter_map(|rate| rate.as_deref().and_then(parse_rational))
            .find(|fps| *fps > 0.0)
            .unwrap_or(0.0);
        info.video_codec = video.codec_name.clone();
        info.pixel_format = video.pix_fmt.clone();
    }
    if let Some(audio) = audio {
        info.has_audio = true;
        info.audio_codec = audio.codec_name.clone();
        info.sample_rate = audio
            .sample_rate
            .as_deref()
            .and_then(|rate| rate.parse().ok())
            .unwrap_or(0);
    }

    let stream_duration = video
        .into_iter()
        .chain(audio)
        .filter_map(|s| parse_seconds(s.duration.as_deref()))
        .fold(0.0, f64::max);
    let format = output.format.as_ref();
    info.duration = format
        .and_then(|f| parse_seconds(f.duration.as_deref()))
        .unwrap_or(stream_duration);
    info.file_size = format
        .and_then(|f| f.size.as_deref())
        .and_then(|size| size.parse().ok())
        .unwrap_or(0);

    Ok(info)
}

fn parse_seconds(text: Option<&str>) -> Option<f64> {
    text?.trim().parse::<f64>().ok().filter(|d| d.is_finite() && *d >= 0.0)
}

/// Parse `num/den` or a plain number
fn parse_rational(text: &str) -> Option<f64> {
    let value = match text.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => text.trim().parse().ok()?,
    };
    value.is_finite().then_some(value)
}
