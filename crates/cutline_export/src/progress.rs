// SPDX-License-Identifier: MIT OR Apache-2.0
//! Encoder progress parsing and ETA estimation.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Samples kept by the ETA median filter
pub const ETA_WINDOW: usize = 7;

/// Wall time before any estimate is trusted
pub const MIN_ELAPSED_WALL_SECS: f64 = 2.0;

/// Progress before a percent-based estimate is trusted
pub const MIN_PROGRESS_PERCENT: f64 = 1.0;

/// Media time before a rate-based estimate is trusted
pub const MIN_ELAPSED_MEDIA_SECS: f64 = 0.5;

/// A progress report delivered while a job runs
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Completion in percent, 0 to 100
    pub percent: f64,
    /// Output media seconds written so far
    pub elapsed_media_seconds: f64,
    /// Encoder speed as reported, e.g. `2.5x`
    pub speed_text: String,
}

impl ProgressUpdate {
    /// Build an update from media seconds written out of `total`
    pub fn from_media_time(
        elapsed_media_seconds: f64,
        total: f64,
        speed_text: impl Into<String>,
    ) -> Self {
        let percent = if total > 0.0 {
            (elapsed_media_seconds / total * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };
        Self {
            percent,
            elapsed_media_seconds: elapsed_media_seconds.max(0.0),
            speed_text: speed_text.into(),
        }
    }

    /// Speed multiplier parsed from the speed text
    pub fn speed_multiplier(&self) -> Option<f64> {
        parse_speed(&self.speed_text)
    }
}

/// One parsed line of encoder output
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressLine {
    /// Output time in seconds
    OutTime(f64),
    /// Speed text such as `1.25x`
    Speed(String),
    /// End of a `-progress` block; `true` on the final block
    BlockEnd {
        /// Whether the encoder reported `progress=end`
        finished: bool,
    },
    /// A classic stderr stats line
    Stats {
        /// Output time in seconds
        time: f64,
        /// Speed text, if present
        speed: Option<String>,
    },
}

/// Parse one line from `-progress` output or stderr stats.
///
/// Returns `None` for lines that carry nothing useful, including `N/A`
/// values that ffmpeg prints before the first frame.
pub fn parse_progress_line(line: &str) -> Option<ProgressLine> {
    let line = line.trim();

    if let Some((key, value)) = line.split_once('=') {
        let value = value.trim();
        match key.trim() {
            // out_time_ms is in microseconds despite the name
            "out_time_us" | "out_time_ms" => {
                let micros: i64 = value.parse().ok()?;
                return Some(ProgressLine::OutTime(micros.max(0) as f64 / 1_000_000.0));
            }
            "out_time" => return parse_clock(value).map(ProgressLine::OutTime),
            "speed" => {
                parse_speed(value)?;
                return Some(ProgressLine::Speed(value.to_string()));
            }
            "progress" => {
                return Some(ProgressLine::BlockEnd {
                    finished: value == "end",
                })
            }
            _ => {}
        }
    }

    parse_stats_line(line)
}

fn parse_stats_line(line: &str) -> Option<ProgressLine> {
    let time = stats_field(line, "time=").and_then(parse_clock)?;
    let speed = stats_field(line, "speed=")
        .filter(|s| parse_speed(s).is_some())
        .map(str::to_string);
    Some(ProgressLine::Stats { time, speed })
}

/// Value following `key` in a stats line; ffmpeg pads some values with spaces
fn stats_field<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let start = line.find(key)? + key.len();
    line[start..].trim_start().split_whitespace().next()
}

/// Parse `HH:MM:SS.frac` into seconds
pub fn parse_clock(text: &str) -> Option<f64> {
    let text = text.trim();
    let (negative, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let mut parts = text.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let total = hours * 3600.0 + minutes * 60.0 + seconds;
    Some(if negative { 0.0 } else { total })
}

/// Parse a speed text like `2.5x`
pub fn parse_speed(text: &str) -> Option<f64> {
    let value: f64 = text.trim().strip_suffix('x')?.trim().parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Accumulates `-progress` key/value lines into updates
#[derive(Debug, Clone, Default)]
pub struct ProgressParser {
    total_duration: f64,
    out_time: f64,
    speed_text: String,
}

impl ProgressParser {
    /// Create a parser for a job producing `total_duration` seconds
    pub fn new(total_duration: f64) -> Self {
        Self {
            total_duration: total_duration.max(0.0),
            out_time: 0.0,
            speed_text: String::new(),
        }
    }

    /// Feed one line; returns an update at each block boundary or stats line
    pub fn feed(&mut self, line: &str) -> Option<ProgressUpdate> {
        match parse_progress_line(line)? {
            ProgressLine::OutTime(time) => {
                self.out_time = time;
                None
            }
            ProgressLine::Speed(speed) => {
                self.speed_text = speed;
                None
            }
            ProgressLine::BlockEnd { finished } => {
                if finished {
                    self.out_time = self.out_time.max(self.total_duration);
                }
                Some(self.update())
            }
            ProgressLine::Stats { time, speed } => {
                self.out_time = time;
                if let Some(speed) = speed {
                    self.speed_text = speed;
                }
                Some(self.update())
            }
        }
    }

    fn update(&self) -> ProgressUpdate {
        ProgressUpdate::from_media_time(self.out_time, self.total_duration, self.speed_text.clone())
    }
}

/// Smoothed time-remaining estimate.
///
/// Each sample prefers a projection from the media rate (media seconds per
/// wall second) and falls back to extrapolating the percentage. Samples are
/// only taken after a short warm-up, and the reported value is the median of
/// the last [`ETA_WINDOW`] samples. Between usable samples the previous
/// estimate is held.
#[derive(Debug, Clone)]
pub struct EtaEstimator {
    total_media_seconds: f64,
    samples: VecDeque<f64>,
    estimate: Option<f64>,
}

impl EtaEstimator {
    /// Create an estimator for a job producing `total_media_seconds`
    pub fn new(total_media_seconds: f64) -> Self {
        Self {
            total_media_seconds: total_media_seconds.max(0.0),
            samples: VecDeque::with_capacity(ETA_WINDOW),
            estimate: None,
        }
    }

    /// Record a progress observation and return the remaining seconds
    pub fn update(&mut self, elapsed_wall_seconds: f64, update: &ProgressUpdate) -> Option<f64> {
        if elapsed_wall_seconds < MIN_ELAPSED_WALL_SECS {
            return self.estimate;
        }
        if update.percent >= 100.0 {
            self.samples.clear();
            self.estimate = Some(0.0);
            return self.estimate;
        }

        let media = update.elapsed_media_seconds;
        let by_rate = (media >= MIN_ELAPSED_MEDIA_SECS && self.total_media_seconds > 0.0)
            .then(|| media / elapsed_wall_seconds)
            .filter(|rate| *rate > 0.0)
            .map(|rate| (self.total_media_seconds - media).max(0.0) / rate);
        let by_percent = (update.percent >= MIN_PROGRESS_PERCENT)
            .then(|| elapsed_wall_seconds * (100.0 - update.percent) / update.percent);

        if let Some(sample) = by_rate.or(by_percent).filter(|s| s.is_finite()) {
            if self.samples.len() == ETA_WINDOW {
                self.samples.pop_front();
            }
            self.samples.push_back(sample);
            self.estimate = median(&self.samples);
        }
        self.estimate
    }

    /// Latest estimate in seconds
    pub fn estimate(&self) -> Option<f64> {
        self.estimate
    }
}

fn median(samples: &VecDeque<f64>) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted: Vec<f64> = samples.iter().copied().collect();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}
