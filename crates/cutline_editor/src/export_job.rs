// SPDX-License-Identifier: MIT OR Apache-2.0
//! Export jobs.
//!
//! An export compiles the timeline as it is when the job starts, hands the
//! argument list to the media engine, and tracks progress, ETA and the
//! final result in a shared [`ExportJobState`].

use crate::error::EditorError;
use crate::state::Project;
use cutline_export::{
    compile_export, CancelHandle, EtaEstimator, ExportOptions, MediaEngine, ProgressUpdate,
};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

/// Export progress reporting
#[derive(Debug, Clone, PartialEq)]
pub struct ExportProgress {
    /// Current step description
    pub step: String,
    /// Progress in percent (0-100)
    pub percent: f64,
    /// Output seconds written so far
    pub elapsed_media_seconds: f64,
    /// Encoder speed as reported
    pub speed_text: String,
    /// Estimated seconds remaining
    pub eta_seconds: Option<f64>,
    /// Whether the job finished successfully
    pub complete: bool,
    /// Whether the job was cancelled
    pub cancelled: bool,
    /// Error message if failed
    pub error: Option<String>,
}

/// Shared export state, updated from the engine's progress callback
#[derive(Debug)]
pub struct ExportJobState {
    /// Progress in hundredths of a percent
    progress: AtomicU32,
    cancelled: AtomicBool,
    complete: AtomicBool,
    step: Mutex<String>,
    error: Mutex<Option<String>>,
    latest: Mutex<ProgressUpdate>,
    eta: Mutex<EtaEstimator>,
    started: Instant,
}

impl ExportJobState {
    /// Create state for a job producing `total_duration` seconds
    pub fn new(total_duration: f64) -> Self {
        Self {
            progress: AtomicU32::new(0),
            cancelled: AtomicBool::new(false),
            complete: AtomicBool::new(false),
            step: Mutex::new("Initializing...".to_string()),
            error: Mutex::new(None),
            latest: Mutex::new(ProgressUpdate::default()),
            eta: Mutex::new(EtaEstimator::new(total_duration)),
            started: Instant::now(),
        }
    }

    /// Set the current step description
    pub fn set_step(&self, step: &str) {
        *self.step.lock() = step.to_string();
    }

    /// Record a progress update from the engine
    pub fn record(&self, update: &ProgressUpdate) {
        let hundredths = (update.percent.clamp(0.0, 100.0) * 100.0).round() as u32;
        self.progress.fetch_max(hundredths, Ordering::Relaxed);
        self.eta.lock().update(self.started.elapsed().as_secs_f64(), update);
        *self.latest.lock() = update.clone();
    }

    /// Mark the job as failed
    pub fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.set_step("Failed");
        *self.error.lock() = Some(message);
    }

    /// Mark the job as finished
    pub fn mark_complete(&self) {
        self.progress.store(10_000, Ordering::Relaxed);
        self.set_step("Complete");
        self.complete.store(true, Ordering::Relaxed);
    }

    /// Mark the job as cancelled
    pub fn mark_cancelled(&self) {
        self.set_step("Cancelled");
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether the job was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Whether the job finished successfully
    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Relaxed)
    }

    /// Seconds since the job started
    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Current progress
    pub fn get_progress(&self) -> ExportProgress {
        let latest = self.latest.lock().clone();
        ExportProgress {
            step: self.step.lock().clone(),
            percent: f64::from(self.progress.load(Ordering::Relaxed)) / 100.0,
            elapsed_media_seconds: latest.elapsed_media_seconds,
            speed_text: latest.speed_text,
            eta_seconds: self.eta.lock().estimate(),
            complete: self.is_complete(),
            cancelled: self.is_cancelled(),
            error: self.error.lock().clone(),
        }
    }
}

/// Export result
#[derive(Debug, Clone, PartialEq)]
pub enum ExportResult {
    /// The file was written
    Success {
        /// Output file
        output_path: PathBuf,
        /// Wall time in seconds
        export_time_secs: f64,
    },
    /// The job was cancelled; the partial file may remain
    Cancelled,
    /// The job failed
    Failed(String),
}

/// A running export
#[derive(Debug)]
pub struct ExportJob {
    state: Arc<ExportJobState>,
    cancel: CancelHandle,
    task: JoinHandle<ExportResult>,
}

impl ExportJob {
    /// Shared state
    pub fn state(&self) -> &Arc<ExportJobState> {
        &self.state
    }

    /// Current progress
    pub fn get_progress(&self) -> ExportProgress {
        self.state.get_progress()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        tracing::info!("Export cancellation requested");
        self.cancel.cancel();
    }

    /// Wait for the job to finish
    pub async fn wait(self) -> ExportResult {
        match self.task.await {
            Ok(result) => result,
            Err(err) => ExportResult::Failed(err.to_string()),
        }
    }
}

/// Start exporting the project's timeline.
///
/// The timeline is read once, here; later edits do not affect the running
/// job. Must be called from within a tokio runtime.
pub fn start_export<E: MediaEngine>(
    project: &Project,
    engine: &E,
    options: ExportOptions,
) -> Result<ExportJob, EditorError> {
    let (clips, operations) = project.export_source();
    let command = compile_export(&clips, &operations, &options)?;

    tracing::info!(
        "Starting {} export of {:.3}s to {:?}",
        options.format,
        command.total_duration,
        command.output_path
    );

    let state = Arc::new(ExportJobState::new(command.total_duration));
    state.set_step("Encoding");

    let sink = Arc::clone(&state);
    let handle = engine.run_job(
        command.args.clone(),
        command.total_duration,
        Box::new(move |update: ProgressUpdate| sink.record(&update)),
    )?;
    let cancel = handle.cancel_handle();

    let task_state = Arc::clone(&state);
    let output_path = command.output_path.clone();
    let task = tokio::spawn(async move {
        match handle.wait().await {
            Ok(()) => {
                task_state.mark_complete();
                let export_time_secs = task_state.elapsed_secs();
                tracing::info!("Export finished in {:.1}s: {:?}", export_time_secs, output_path);
                ExportResult::Success {
                    output_path,
                    export_time_secs,
                }
            }
            Err(err) if err.is_cancelled() => {
                task_state.mark_cancelled();
                tracing::info!("Export cancelled");
                ExportResult::Cancelled
            }
            Err(err) => {
                let message = err.to_string();
                tracing::error!("Export failed: {message}");
                task_state.set_error(message.clone());
                ExportResult::Failed(message)
            }
        }
    });

    Ok(ExportJob { state, cancel, task })
}
