// SPDX-License-Identifier: MIT OR Apache-2.0
//! Playhead advancement.
//!
//! The controller only computes the next playhead time. The host feeds that
//! value into the project's time setter on each frame; playback never touches
//! clips or operations.

/// Transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Not advancing; `play` restarts from the current position
    #[default]
    Stopped,
    /// Advancing on every tick
    Playing,
    /// Held mid-timeline
    Paused,
}

/// Region the playhead cycles through instead of stopping at the end
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopRange {
    /// Inclusive start, in timeline seconds
    pub start: f64,
    /// Point at which the playhead wraps back to `start`
    pub end: f64,
}

impl LoopRange {
    fn span(&self) -> f64 {
        (self.end - self.start).max(f64::EPSILON)
    }
}

/// Per-frame playhead driver
#[derive(Debug, Clone)]
pub struct PlaybackController {
    position: f64,
    state: PlaybackState,
    rate: f64,
    looping: Option<LoopRange>,
}

impl PlaybackController {
    /// Stopped controller at time zero, advancing at real time
    pub fn new() -> Self {
        Self {
            position: 0.0,
            state: PlaybackState::Stopped,
            rate: 1.0,
            looping: None,
        }
    }

    /// Advance by `delta_seconds` of wall time.
    ///
    /// Returns the new playhead while playing, `None` otherwise. Reaching the
    /// end of the timeline without a loop range stops playback there.
    pub fn tick(&mut self, delta_seconds: f64, timeline_duration: f64) -> Option<f64> {
        if !self.is_playing() {
            return None;
        }

        self.position += delta_seconds.max(0.0) * self.rate;
        match self.looping {
            Some(range) if self.position >= range.end => {
                self.position = range.start + (self.position - range.end) % range.span();
            }
            Some(_) => {}
            None if self.position >= timeline_duration => {
                self.position = timeline_duration.max(0.0);
                self.state = PlaybackState::Stopped;
            }
            None => {}
        }
        Some(self.position)
    }

    /// Current playhead time
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Transport state
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Active loop range, if any
    pub fn loop_range(&self) -> Option<LoopRange> {
        self.looping
    }

    /// Timeline seconds covered per wall-clock second
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Change the playback rate; non-positive rates are ignored
    pub fn set_rate(&mut self, rate: f64) {
        if rate > 0.0 && rate.is_finite() {
            self.rate = rate;
        }
    }

    /// Start or resume advancing
    pub fn play(&mut self) {
        self.state = PlaybackState::Playing;
    }

    /// Hold the playhead if playing
    pub fn pause(&mut self) {
        if self.is_playing() {
            self.state = PlaybackState::Paused;
        }
    }

    /// Stop advancing; the playhead stays where it is
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
    }

    /// Pause when playing, play otherwise
    pub fn toggle_playback(&mut self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Jump to `time`, clamped at zero
    pub fn seek(&mut self, time: f64) {
        self.position = time.max(0.0);
    }

    /// Cycle between `start` and `end`; the bounds may be given in either order
    pub fn set_loop_range(&mut self, start: f64, end: f64) {
        let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
        self.looping = Some(LoopRange {
            start: lo.max(0.0),
            end: hi,
        });
    }

    /// Play through to the end again
    pub fn clear_loop_range(&mut self) {
        self.looping = None;
    }

    /// Whether ticks currently advance the playhead
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_only_while_playing() {
        let mut playback = PlaybackController::new();
        assert_eq!(playback.tick(0.5, 10.0), None);
        playback.play();
        assert_eq!(playback.tick(0.5, 10.0), Some(0.5));
        playback.pause();
        assert_eq!(playback.tick(0.5, 10.0), None);
        assert_eq!(playback.state(), PlaybackState::Paused);
    }

    #[test]
    fn test_stops_at_end() {
        let mut playback = PlaybackController::new();
        playback.seek(9.8);
        playback.play();
        assert_eq!(playback.tick(0.5, 10.0), Some(10.0));
        assert_eq!(playback.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_loop_range_wraps() {
        let mut playback = PlaybackController::new();
        playback.set_loop_range(4.0, 2.0);
        playback.seek(3.5);
        playback.play();
        let t = playback.tick(1.0, 10.0).unwrap();
        assert!((t - 2.5).abs() < 1e-9);
        assert!(playback.is_playing());
    }

    #[test]
    fn test_rate_scales_advance() {
        let mut playback = PlaybackController::new();
        playback.set_rate(2.0);
        playback.set_rate(-1.0);
        playback.play();
        assert_eq!(playback.tick(0.25, 10.0), Some(0.5));
        assert_eq!(playback.rate(), 2.0);
    }
}
