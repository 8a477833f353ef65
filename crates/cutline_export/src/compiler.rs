// SPDX-License-Identifier: MIT OR Apache-2.0
//! Lowers a timeline into one ffmpeg invocation.
//!
//! Compilation is a pure function of clips, operations and options. Inputs,
//! filter chains and pads are emitted in a fixed order so identical timelines
//! always produce identical commands.

use crate::filter::{fmt_number, fmt_seconds, Filter, FilterChain, FilterGraph, GraphError, Pad};
use crate::format::{EncoderProfile, ExportFormat, ExportOptions, FormatKind};
use crate::tempo::{rate_filters, volume_filter};
use cutline_timeline::{
    range_of, Clip, OperationList, OperationMap, TimelineRange, TrackKind, EPSILON,
};
use std::path::PathBuf;

/// Frame size used when no video clip reports one
pub const FALLBACK_SIZE: (u32, u32) = (1920, 1080);

/// Frame rate assumed when no video clip reports one
pub const FALLBACK_FPS: f64 = 30.0;

/// Frame rate limits for animated image output
pub const ANIMATED_FPS_RANGE: (f64, f64) = (5.0, 20.0);

/// Reasons a timeline cannot be exported
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    /// No clips at all
    #[error("Nothing to export: the timeline is empty")]
    EmptyTimeline,
    /// Every usable clip is trimmed to nothing
    #[error("Nothing to export: the timeline has zero duration")]
    ZeroDuration,
    /// Animated output without video clips
    #[error("{0} export needs at least one video clip")]
    NoVideo(ExportFormat),
    /// Audio output without audio clips
    #[error("{0} export needs at least one audio clip")]
    NoAudio(ExportFormat),
    /// Output path missing
    #[error("No output path was given")]
    NoOutputPath,
    /// Internal wiring error in the generated graph
    #[error("Invalid filter graph: {0}")]
    Graph(#[from] GraphError),
}

/// A compiled export invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ExportCommand {
    /// Arguments after the program name
    pub args: Vec<String>,
    /// The `-filter_complex` expression, if one is used
    pub filter_graph: Option<String>,
    /// Output duration in seconds, used for progress
    pub total_duration: f64,
    /// Destination file
    pub output_path: PathBuf,
}

impl ExportCommand {
    /// Render the arguments as a copy-pasteable shell line
    pub fn to_shell_string(&self, program: &str) -> String {
        std::iter::once(program.to_string())
            .chain(self.args.iter().map(|arg| shell_quote(arg)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:+=,@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// A clip that contributes to the output
#[derive(Debug, Clone, Copy)]
struct Source<'a> {
    input: usize,
    clip: &'a Clip,
    ops: Option<&'a OperationList>,
    range: TimelineRange,
}

impl Source<'_> {
    fn speed_filters(&self) -> Vec<Filter> {
        rate_filters(
            self.range.speed_rate,
            self.ops.and_then(OperationList::pitch_percent),
            self.clip.media_info.sample_rate,
        )
    }

    fn volume(&self) -> Option<Filter> {
        volume_filter(self.ops.and_then(OperationList::volume_percent))
    }
}

fn collect_sources<'a>(
    clips: &'a [Clip],
    ops: &'a OperationMap,
    format: ExportFormat,
) -> Vec<Source<'a>> {
    let mut sources = Vec::new();
    for clip in clips {
        let wanted = match clip.track {
            TrackKind::Video => format.carries_video(),
            TrackKind::Audio => format.carries_audio(),
        };
        let range = range_of(clip, ops);
        if !wanted || range.visible_duration <= EPSILON {
            continue;
        }
        sources.push(Source {
            input: sources.len(),
            clip,
            ops: ops.get(&clip.id),
            range,
        });
    }
    sources
}

/// Check that `clips` can be exported with `options`
pub fn validate_export(
    clips: &[Clip],
    ops: &OperationMap,
    options: &ExportOptions,
) -> Result<(), CompileError> {
    if clips.is_empty() {
        return Err(CompileError::EmptyTimeline);
    }
    if options.output_path.as_os_str().is_empty() {
        return Err(CompileError::NoOutputPath);
    }

    let sources = collect_sources(clips, ops, options.format);
    let has_video = sources.iter().any(|s| s.clip.is_video());
    let has_audio = sources.iter().any(|s| s.clip.is_audio());
    match options.format.kind() {
        FormatKind::AnimatedImage if !has_video => {
            return Err(CompileError::NoVideo(options.format));
        }
        FormatKind::Audio if !has_audio => return Err(CompileError::NoAudio(options.format)),
        _ => {}
    }
    if sources.is_empty() {
        return Err(CompileError::ZeroDuration);
    }
    Ok(())
}

/// Compile the timeline into an export command
pub fn compile_export(
    clips: &[Clip],
    ops: &OperationMap,
    options: &ExportOptions,
) -> Result<ExportCommand, CompileError> {
    validate_export(clips, ops, options)?;

    let sources = collect_sources(clips, ops, options.format);
    let profile = options.format.encoder_profile(options.quality);

    let command = match single_source(&sources) {
        Some((video, audio)) => compile_single(video, audio, &sources, options, &profile)?,
        None => compile_timeline(&sources, options, &profile)?,
    };

    tracing::debug!(
        format = %options.format,
        inputs = sources.len(),
        duration = command.total_duration,
        "Compiled export command"
    );
    Ok(command)
}

/// One clip, or a video clip and its audio twin cut identically
fn single_source<'a>(sources: &[Source<'a>]) -> Option<(Option<Source<'a>>, Option<Source<'a>>)> {
    match sources {
        [only] if only.clip.is_video() => Some((Some(*only), None)),
        [only] => Some((None, Some(*only))),
        [a, b] if is_av_twin(a, b) => {
            let (video, audio) = if a.clip.is_video() { (a, b) } else { (b, a) };
            Some((Some(*video), Some(*audio)))
        }
        _ => None,
    }
}

fn is_av_twin(a: &Source<'_>, b: &Source<'_>) -> bool {
    let close = |x: f64, y: f64| (x - y).abs() < EPSILON;
    a.clip.track != b.clip.track
        && a.clip.group_id == b.clip.group_id
        && a.clip.file_path == b.clip.file_path
        && close(a.range.start, b.range.start)
        && close(a.range.trim_start, b.range.trim_start)
        && close(a.range.trim_end, b.range.trim_end)
        && close(a.range.speed_rate, b.range.speed_rate)
}

fn compile_single(
    video: Option<Source<'_>>,
    audio: Option<Source<'_>>,
    sources: &[Source<'_>],
    options: &ExportOptions,
    profile: &EncoderProfile,
) -> Result<ExportCommand, CompileError> {
    // `single_source` never returns two empty sides
    let Some(reference) = video.or(audio) else {
        return Err(CompileError::ZeroDuration);
    };
    let duration = reference.range.visible_duration;
    let format = options.format;

    let mut graph = FilterGraph::new();
    let mut maps = Vec::new();

    if let Some(video) = video {
        let mut filters = Vec::new();
        if (video.range.speed_rate - 1.0).abs() > EPSILON {
            let rate = fmt_number(video.range.speed_rate);
            filters.push(Filter::new("setpts").value(format!("PTS/{rate}")));
        }
        if format.is_animated() {
            filters.push(Filter::new("fps").value(fmt_number(animated_fps(sources))));
        }
        if let Some((width, height)) = options.resolution.target_size() {
            filters.extend(fit_filters(width, height));
        }

        if filters.is_empty() && !format.needs_palette() {
            maps.push("0:v:0".to_string());
        } else {
            let chain = FilterChain::new().input(Pad::input(0, "v")).filters(filters);
            let out = push_video_tail(&mut graph, chain, format);
            maps.push(out.to_string());
        }
    }

    if let Some(audio) = audio {
        let mut filters = audio.speed_filters();
        filters.extend(audio.volume());
        if filters.is_empty() {
            maps.push("0:a:0".to_string());
        } else {
            graph.push(
                FilterChain::new()
                    .input(Pad::input(0, "a"))
                    .filters(filters)
                    .output(Pad::new("aout")),
            );
            maps.push(Pad::new("aout").to_string());
        }
    }

    let mut args = vec![
        "-y".to_string(),
        "-ss".to_string(),
        fmt_seconds(reference.range.trim_start),
        "-i".to_string(),
        reference.clip.file_path.display().to_string(),
        "-t".to_string(),
        fmt_seconds(duration),
    ];
    let filter_graph = finish_graph(&graph, &mut args)?;
    for map in maps {
        args.push("-map".to_string());
        args.push(map);
    }
    args.extend(profile.args(video.is_some(), audio.is_some()));
    push_output_args(&mut args, options);

    Ok(ExportCommand {
        args,
        filter_graph,
        total_duration: duration,
        output_path: options.output_path.clone(),
    })
}

fn compile_timeline(
    sources: &[Source<'_>],
    options: &ExportOptions,
    profile: &EncoderProfile,
) -> Result<ExportCommand, CompileError> {
    let format = options.format;
    let total = sources.iter().map(|s| s.range.end).fold(0.0, f64::max);
    let mut graph = FilterGraph::new();

    let mut args = vec!["-y".to_string()];
    for source in sources {
        args.push("-i".to_string());
        args.push(source.clip.file_path.display().to_string());
    }

    let mut videos: Vec<&Source<'_>> = sources.iter().filter(|s| s.clip.is_video()).collect();
    videos.sort_by(|a, b| {
        a.clip
            .track_index
            .cmp(&b.clip.track_index)
            .then(a.range.start.total_cmp(&b.range.start))
            .then(a.input.cmp(&b.input))
    });
    let audios: Vec<&Source<'_>> = sources.iter().filter(|s| s.clip.is_audio()).collect();

    let video_out = if videos.is_empty() {
        None
    } else {
        let (width, height) = output_size(options, &videos);
        let fps = if format.is_animated() { animated_fps(sources) } else { source_fps(&videos) };

        for source in sources.iter().filter(|s| s.clip.is_video()) {
            graph.push(video_chain(source, width, height));
        }

        graph.push(
            FilterChain::new()
                .filter(
                    Filter::new("color")
                        .arg("c", "black")
                        .arg("s", format!("{width}x{height}"))
                        .arg("r", fmt_number(fps))
                        .arg("d", fmt_seconds(total)),
                )
                .output(Pad::new("base")),
        );

        let mut below = Pad::new("base");
        for (layer, source) in videos.iter().enumerate() {
            let label = if layer + 1 == videos.len() {
                if format.is_animated() { "vcomp".to_string() } else { "vout".to_string() }
            } else {
                format!("ov{layer}")
            };
            graph.push(
                FilterChain::new()
                    .input(below)
                    .input(Pad::new(format!("v{}", source.input)))
                    .filter(Filter::new("overlay").arg("eof_action", "pass"))
                    .output(Pad::new(label.clone())),
            );
            below = Pad::new(label);
        }

        if format.is_animated() {
            let chain = FilterChain::new()
                .input(below)
                .filter(Filter::new("fps").value(fmt_number(fps)));
            Some(push_video_tail(&mut graph, chain, format))
        } else {
            Some(below)
        }
    };

    let audio_out = if audios.is_empty() {
        None
    } else {
        for source in &audios {
            graph.push(audio_chain(source));
        }
        let end_trim = Filter::new("atrim").arg("end", fmt_seconds(total));
        let mut chain = FilterChain::new();
        for source in &audios {
            chain = chain.input(Pad::new(format!("a{}", source.input)));
        }
        if audios.len() > 1 {
            chain = chain.filter(
                Filter::new("amix")
                    .arg("inputs", audios.len())
                    .arg("duration", "longest")
                    .arg("dropout_transition", 0),
            );
        }
        graph.push(chain.filter(end_trim).output(Pad::new("aout")));
        Some(Pad::new("aout"))
    };

    let filter_graph = finish_graph(&graph, &mut args)?;
    for pad in video_out.iter().chain(audio_out.iter()) {
        args.push("-map".to_string());
        args.push(pad.to_string());
    }
    args.extend(profile.args(video_out.is_some(), audio_out.is_some()));
    push_output_args(&mut args, options);

    Ok(ExportCommand {
        args,
        filter_graph,
        total_duration: total,
        output_path: options.output_path.clone(),
    })
}

fn video_chain(source: &Source<'_>, width: u32, height: u32) -> FilterChain {
    let range = &source.range;
    let mut chain = FilterChain::new()
        .input(Pad::input(source.input, "v"))
        .filter(
            Filter::new("trim")
                .arg("start", fmt_seconds(range.trim_start))
                .arg("end", fmt_seconds(range.trim_end)),
        )
        .filter(Filter::new("setpts").value("PTS-STARTPTS"));
    if (range.speed_rate - 1.0).abs() > EPSILON {
        let rate = fmt_number(range.speed_rate);
        chain = chain.filter(Filter::new("setpts").value(format!("PTS/{rate}")));
    }
    chain
        .filters(fit_filters(width, height))
        .filter(Filter::new("setpts").value(format!("PTS+{}/TB", fmt_seconds(range.start))))
        .output(Pad::new(format!("v{}", source.input)))
}

fn audio_chain(source: &Source<'_>) -> FilterChain {
    let range = &source.range;
    let delay_ms = (range.start * 1000.0).round().max(0.0) as u64;
    FilterChain::new()
        .input(Pad::input(source.input, "a"))
        .filter(
            Filter::new("atrim")
                .arg("start", fmt_seconds(range.trim_start))
                .arg("end", fmt_seconds(range.trim_end)),
        )
        .filter(Filter::new("asetpts").value("PTS-STARTPTS"))
        .filters(source.speed_filters())
        .filters(source.volume())
        .filter(Filter::new("adelay").arg("delays", delay_ms).arg("all", 1))
        .output(Pad::new(format!("a{}", source.input)))
}

/// Scale into the frame keeping aspect, then letterbox
fn fit_filters(width: u32, height: u32) -> Vec<Filter> {
    vec![
        Filter::new("scale")
            .value(width)
            .value(height)
            .arg("force_original_aspect_ratio", "decrease"),
        Filter::new("pad")
            .value(width)
            .value(height)
            .value("(ow-iw)/2")
            .value("(oh-ih)/2"),
        Filter::new("setsar").value(1),
    ]
}

/// Close a video chain, adding the palette stages when the format needs them
fn push_video_tail(graph: &mut FilterGraph, chain: FilterChain, format: ExportFormat) -> Pad {
    if !format.needs_palette() {
        graph.push(chain.output(Pad::new("vout")));
        return Pad::new("vout");
    }
    graph.push(
        chain
            .filter(Filter::new("split"))
            .output(Pad::new("p0"))
            .output(Pad::new("p1")),
    );
    graph.push(
        FilterChain::new()
            .input(Pad::new("p0"))
            .filter(Filter::new("palettegen"))
            .output(Pad::new("pal")),
    );
    graph.push(
        FilterChain::new()
            .input(Pad::new("p1"))
            .input(Pad::new("pal"))
            .filter(Filter::new("paletteuse"))
            .output(Pad::new("vout")),
    );
    Pad::new("vout")
}

fn finish_graph(
    graph: &FilterGraph,
    args: &mut Vec<String>,
) -> Result<Option<String>, CompileError> {
    if graph.is_empty() {
        return Ok(None);
    }
    graph.validate()?;
    let text = graph.to_string();
    args.push("-filter_complex".to_string());
    args.push(text.clone());
    Ok(Some(text))
}

fn push_output_args(args: &mut Vec<String>, options: &ExportOptions) {
    if let Some(value) = options.format.loop_value(options.loop_mode) {
        args.push("-loop".to_string());
        args.push(value.to_string());
    }
    args.push(options.output_path.display().to_string());
}

fn output_size(options: &ExportOptions, videos: &[&Source<'_>]) -> (u32, u32) {
    if let Some(size) = options.resolution.target_size() {
        return size;
    }
    videos
        .iter()
        .map(|s| &s.clip.media_info)
        .find(|info| info.width >= 2 && info.height >= 2)
        .map_or(FALLBACK_SIZE, |info| (info.width & !1, info.height & !1))
}

fn source_fps(videos: &[&Source<'_>]) -> f64 {
    videos
        .iter()
        .map(|s| s.clip.media_info.fps)
        .find(|fps| fps.is_finite() && *fps > 0.0)
        .unwrap_or(FALLBACK_FPS)
}

/// Output frame rate for animated formats
fn animated_fps(sources: &[Source<'_>]) -> f64 {
    let videos: Vec<&Source<'_>> = sources.iter().filter(|s| s.clip.is_video()).collect();
    let (min, max) = ANIMATED_FPS_RANGE;
    source_fps(&videos).clamp(min, max).round()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{LoopMode, Quality, Resolution};
    use cutline_timeline::{GroupId, MediaInfo, OperationParams};

    fn video_info(duration: f64) -> MediaInfo {
        MediaInfo {
            duration,
            width: 1921,
            height: 1080,
            fps: 30.0,
            has_video: true,
            has_audio: true,
            sample_rate: 48_000,
            ..Default::default()
        }
    }

    fn with_ops(clips: &[Clip]) -> OperationMap {
        clips.iter().map(|c| (c.id, OperationList::for_clip(c))).collect()
    }

    fn position(args: &[String], flag: &str) -> Option<String> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .cloned()
    }

    #[test]
    fn test_single_clip_trim_and_speed() {
        let clip = Clip::new("in.mp4", TrackKind::Video, GroupId::new(), video_info(10.0));
        let mut ops = with_ops(std::slice::from_ref(&clip));
        let list = ops.get_mut(&clip.id).unwrap();
        list.set_params(OperationParams::Trim { start_time: 2.0, end_time: 8.0 });
        list.set_params(OperationParams::Speed { rate: 2.0 });
        list.set_enabled(cutline_timeline::OperationKind::Speed, true);

        let options = ExportOptions::new(ExportFormat::Mp4, "out.mp4")
            .with_resolution(Resolution::P720)
            .with_quality(Quality::Medium);
        let command = compile_export(&[clip], &ops, &options).unwrap();

        assert_eq!(position(&command.args, "-ss").as_deref(), Some("2.000"));
        assert_eq!(position(&command.args, "-t").as_deref(), Some("3.000"));
        assert_eq!(position(&command.args, "-crf").as_deref(), Some("23"));
        assert_eq!(position(&command.args, "-c:v").as_deref(), Some("libx264"));
        let graph = command.filter_graph.unwrap();
        assert!(graph.contains("scale=1280:720"));
        assert!(graph.contains("setpts=PTS/2"));
        assert!((command.total_duration - 3.0).abs() < 1e-9);
        assert_eq!(command.args.last().map(String::as_str), Some("out.mp4"));
    }

    #[test]
    fn test_av_pair_trim_and_speed_selects_h264_and_aac() {
        let group = GroupId::new();
        let video = Clip::new("in.mp4", TrackKind::Video, group, video_info(10.0));
        let audio = Clip::new("in.mp4", TrackKind::Audio, group, video_info(10.0));
        let clips = vec![video, audio];
        let mut ops = with_ops(&clips);
        for clip in &clips {
            let list = ops.get_mut(&clip.id).unwrap();
            list.set_params(OperationParams::Trim { start_time: 2.0, end_time: 8.0 });
            list.set_params(OperationParams::Speed { rate: 2.0 });
            list.set_enabled(cutline_timeline::OperationKind::Speed, true);
        }

        let options = ExportOptions::new(ExportFormat::Mp4, "out.mp4")
            .with_resolution(Resolution::P720)
            .with_quality(Quality::Medium);
        let command = compile_export(&clips, &ops, &options).unwrap();

        assert_eq!(command.args.iter().filter(|a| *a == "-i").count(), 1);
        assert_eq!(position(&command.args, "-ss").as_deref(), Some("2.000"));
        assert_eq!(position(&command.args, "-t").as_deref(), Some("3.000"));
        assert_eq!(position(&command.args, "-crf").as_deref(), Some("23"));
        assert_eq!(position(&command.args, "-c:v").as_deref(), Some("libx264"));
        assert_eq!(position(&command.args, "-c:a").as_deref(), Some("aac"));
        assert!(!command.args.iter().any(|a| a == "-an"));

        let graph = command.filter_graph.unwrap();
        assert!(graph.contains("scale=1280:720"));
        assert!(graph.contains("setpts=PTS/2"));
        assert!(graph.contains("atempo=2"));
    }

    #[test]
    fn test_av_twin_uses_single_input() {
        let group = GroupId::new();
        let video = Clip::new("in.mp4", TrackKind::Video, group, video_info(4.0));
        let audio = Clip::new("in.mp4", TrackKind::Audio, group, video_info(4.0));
        let clips = vec![video, audio];
        let ops = with_ops(&clips);

        let options = ExportOptions::new(ExportFormat::Mp4, "out.mp4");
        let command = compile_export(&clips, &ops, &options).unwrap();

        assert_eq!(command.args.iter().filter(|a| *a == "-i").count(), 1);
        assert_eq!(command.filter_graph, None);
        assert!(command.args.windows(2).any(|w| w == ["-map", "0:v:0"]));
        assert!(command.args.windows(2).any(|w| w == ["-c:a", "aac"]));
    }

    #[test]
    fn test_timeline_composite_order_and_mix() {
        let info = video_info(4.0);
        let a = Clip::new("a.mp4", TrackKind::Video, GroupId::new(), info.clone())
            .with_track_index(1);
        let b = Clip::new("b.mp4", TrackKind::Video, GroupId::new(), info.clone()).with_start(4.0);
        let c = Clip::new("c.wav", TrackKind::Audio, GroupId::new(), info.clone()).with_start(1.0);
        let d = Clip::new("d.wav", TrackKind::Audio, GroupId::new(), info);
        let clips = vec![a, b, c, d];
        let ops = with_ops(&clips);

        let options = ExportOptions::new(ExportFormat::Mkv, "out.mkv");
        let command = compile_export(&clips, &ops, &options).unwrap();
        let graph = command.filter_graph.clone().unwrap();

        assert_eq!(command.args.iter().filter(|a| *a == "-i").count(), 4);
        assert!(graph.contains("color=c=black:s=1920x1080:r=30:d=8.000[base]"));
        // Lane 0 (input 1) draws first, lane 1 (input 0) on top.
        assert!(graph.contains("[base][v1]overlay=eof_action=pass[ov0]"));
        assert!(graph.contains("[ov0][v0]overlay=eof_action=pass[vout]"));
        assert!(graph.contains("setpts=PTS+4.000/TB[v1]"));
        assert!(graph.contains("adelay=delays=1000:all=1[a2]"));
        assert!(graph.contains(
            "[a2][a3]amix=inputs=2:duration=longest:dropout_transition=0,atrim=end=8.000[aout]"
        ));
        assert!((command.total_duration - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_compile_is_deterministic() {
        let info = video_info(3.0);
        let clips = vec![
            Clip::new("a.mp4", TrackKind::Video, GroupId::new(), info.clone()),
            Clip::new("b.mp4", TrackKind::Video, GroupId::new(), info).with_start(3.0),
        ];
        let ops = with_ops(&clips);
        let options = ExportOptions::new(ExportFormat::Webm, "out.webm");
        assert_eq!(
            compile_export(&clips, &ops, &options).unwrap(),
            compile_export(&clips, &ops, &options).unwrap()
        );
    }

    #[test]
    fn test_gif_palette_and_no_audio() {
        let group = GroupId::new();
        let clips = vec![
            Clip::new("a.mp4", TrackKind::Video, group, video_info(2.0)),
            Clip::new("b.mp4", TrackKind::Video, GroupId::new(), video_info(2.0)).with_start(2.0),
            Clip::new("a.mp4", TrackKind::Audio, group, video_info(2.0)),
        ];
        let ops = with_ops(&clips);
        let options =
            ExportOptions::new(ExportFormat::Gif, "out.gif").with_loop_mode(LoopMode::Once);
        let command = compile_export(&clips, &ops, &options).unwrap();
        let graph = command.filter_graph.clone().unwrap();

        assert!(graph.contains("r=20"));
        assert!(graph.contains(
            "[vcomp]fps=20,split[p0][p1];[p0]palettegen[pal];[p1][pal]paletteuse[vout]"
        ));
        assert!(!graph.contains("[aout]"));
        assert!(command.args.contains(&"-an".to_string()));
        assert_eq!(position(&command.args, "-loop").as_deref(), Some("-1"));
    }

    #[test]
    fn test_validation() {
        let video = Clip::new("a.mp4", TrackKind::Video, GroupId::new(), video_info(2.0));
        let ops = with_ops(std::slice::from_ref(&video));

        let mp4 = ExportOptions::new(ExportFormat::Mp4, "o.mp4");
        let empty = validate_export(&[], &OperationMap::new(), &mp4);
        assert_eq!(empty, Err(CompileError::EmptyTimeline));

        let audio_only = validate_export(
            std::slice::from_ref(&video),
            &ops,
            &ExportOptions::new(ExportFormat::Mp3, "o.mp3"),
        );
        assert_eq!(audio_only, Err(CompileError::NoAudio(ExportFormat::Mp3)));

        let audio = Clip::new("a.wav", TrackKind::Audio, GroupId::new(), video_info(2.0));
        let ops = with_ops(std::slice::from_ref(&audio));
        let gif = validate_export(&[audio], &ops, &ExportOptions::new(ExportFormat::Gif, "o.gif"));
        assert_eq!(gif, Err(CompileError::NoVideo(ExportFormat::Gif)));
    }

    #[test]
    fn test_audio_format_drops_video_clips() {
        let group = GroupId::new();
        let clips = vec![
            Clip::new("a.mp4", TrackKind::Video, group, video_info(2.0)),
            Clip::new("a.mp4", TrackKind::Audio, group, video_info(2.0)),
        ];
        let mut ops = with_ops(&clips);
        ops.get_mut(&clips[1].id)
            .unwrap()
            .set_params(OperationParams::Volume { percent: 50.0 });
        ops.get_mut(&clips[1].id)
            .unwrap()
            .set_enabled(cutline_timeline::OperationKind::Volume, true);

        let flac = ExportOptions::new(ExportFormat::Flac, "o.flac");
        let command = compile_export(&clips, &ops, &flac).unwrap();
        assert!(command.args.contains(&"-vn".to_string()));
        assert_eq!(
            command.filter_graph.as_deref(),
            Some("[0:a]volume=0.5[aout]")
        );
    }

    #[test]
    fn test_shell_string_quotes_graph() {
        let command = ExportCommand {
            args: vec!["-filter_complex".into(), "[0:v]null[vout]".into(), "my out.mp4".into()],
            filter_graph: None,
            total_duration: 1.0,
            output_path: PathBuf::from("my out.mp4"),
        };
        assert_eq!(
            command.to_shell_string("ffmpeg"),
            "ffmpeg -filter_complex '[0:v]null[vout]' 'my out.mp4'"
        );
    }
}
