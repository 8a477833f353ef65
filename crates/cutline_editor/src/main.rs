// SPDX-License-Identifier: MIT OR Apache-2.0
//! `cutline` - command-line front end for the Cutline editor core.
//!
//! Probes media, prints the ffmpeg command a timeline compiles to, or runs
//! the export with live progress. Files given on the command line are laid
//! end to end on the timeline in order.

use clap::{Args, Parser, Subcommand};
use cutline_editor::{
    import_files, start_export, EditorError, EditorSettings, ExportResult, Project,
};
use cutline_export::{
    compile_export, ExportFormat, ExportOptions, FfmpegEngine, LoopMode, MediaEngine, Quality,
    Resolution,
};
use cutline_timeline::format_timecode;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Parser)]
#[command(name = "cutline", version, about = "Multi-track timeline editing and export")]
struct Cli {
    /// Settings file
    #[arg(long, global = true, default_value = cutline_editor::SETTINGS_FILE_NAME)]
    settings: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the technical metadata of a media file as JSON
    Probe {
        /// Media file
        file: PathBuf,
    },
    /// Print the ffmpeg command the timeline compiles to
    Plan(ExportArgs),
    /// Render the timeline
    Export(ExportArgs),
}

#[derive(Debug, Args)]
struct ExportArgs {
    /// Media files, placed one after another
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output file
    #[arg(short, long)]
    output: PathBuf,

    /// Output format (default: from the output extension)
    #[arg(short, long)]
    format: Option<ExportFormat>,

    /// Frame size: original, 1080p, 720p or 480p
    #[arg(short, long)]
    resolution: Option<Resolution>,

    /// Quality: high, medium or low
    #[arg(short, long)]
    quality: Option<Quality>,

    /// Looping of animated formats: infinite or once
    #[arg(long)]
    loop_mode: Option<LoopMode>,
}

impl ExportArgs {
    fn options(&self, settings: &EditorSettings) -> ExportOptions {
        let defaults = &settings.export;
        let format = self
            .format
            .or_else(|| {
                self.output
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .and_then(ExportFormat::from_extension)
            })
            .unwrap_or(defaults.format);

        ExportOptions::new(format, &self.output)
            .with_resolution(self.resolution.unwrap_or(defaults.resolution))
            .with_quality(self.quality.unwrap_or(defaults.quality))
            .with_loop_mode(self.loop_mode.unwrap_or(defaults.loop_mode))
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("cutline_editor=info,cutline_export=info")
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    tracing::debug!("Starting Cutline v{}", env!("CARGO_PKG_VERSION"));

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, EditorError> {
    let settings = EditorSettings::load(&cli.settings)?;
    let engine = FfmpegEngine::new(&settings.ffmpeg_path, &settings.ffprobe_path);

    match cli.command {
        Command::Probe { file } => {
            let info = engine.probe(&file).await?;
            let json = serde_json::to_string_pretty(&info)
                .map_err(cutline_export::EngineError::from)?;
            println!("{json}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Plan(args) => {
            let project = load_timeline(&engine, &args.files, &settings).await?;
            let options = args.options(&settings);
            let (clips, operations) = project.lock().export_source();
            let command = compile_export(&clips, &operations, &options)?;
            println!("{}", command.to_shell_string(&settings.ffmpeg_path.to_string_lossy()));
            Ok(ExitCode::SUCCESS)
        }
        Command::Export(args) => {
            let project = load_timeline(&engine, &args.files, &settings).await?;
            let options = args.options(&settings);
            export(&project, &engine, options, &args.output).await
        }
    }
}

async fn load_timeline(
    engine: &FfmpegEngine,
    files: &[PathBuf],
    settings: &EditorSettings,
) -> Result<Mutex<Project>, EditorError> {
    let project = Mutex::new(Project::with_history_depth(settings.history_depth));
    let report = import_files(&project, engine, files).await?;
    for (path, err) in &report.failures {
        eprintln!("skipped {}: {err}", path.display());
    }
    tracing::info!(
        "Timeline: {} clips, {}",
        report.clips.len(),
        format_timecode(project.lock().timeline_duration())
    );
    Ok(project)
}

async fn export(
    project: &Mutex<Project>,
    engine: &FfmpegEngine,
    options: ExportOptions,
    output: &Path,
) -> Result<ExitCode, EditorError> {
    let job = start_export(&project.lock(), engine, options)?;
    let state = std::sync::Arc::clone(job.state());

    let reporter = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(500));
        loop {
            ticker.tick().await;
            let progress = state.get_progress();
            if progress.complete || progress.cancelled || progress.error.is_some() {
                break;
            }
            let eta = progress
                .eta_seconds
                .map_or_else(|| "--:--:--".to_string(), format_timecode);
            eprint!(
                "\r{:5.1}%  {}  speed {}  eta {}   ",
                progress.percent,
                format_timecode(progress.elapsed_media_seconds),
                if progress.speed_text.is_empty() { "-" } else { progress.speed_text.as_str() },
                eta
            );
        }
    });

    let result = job.wait().await;
    reporter.abort();
    eprintln!();

    match result {
        ExportResult::Success { export_time_secs, .. } => {
            println!("Exported {} in {:.1}s", output.display(), export_time_secs);
            Ok(ExitCode::SUCCESS)
        }
        ExportResult::Cancelled => {
            eprintln!("Export cancelled");
            Ok(ExitCode::FAILURE)
        }
        ExportResult::Failed(message) => {
            eprintln!("Export failed: {message}");
            Ok(ExitCode::FAILURE)
        }
    }
}
