// SPDX-License-Identifier: MIT OR Apache-2.0
//! Audio tempo, pitch and volume filters.
//!
//! `atempo` only accepts factors in [0.5, 2.0], so larger changes are split
//! into a chain of stages whose product equals the requested rate.

use crate::filter::{fmt_number, Filter};

/// Factor range accepted by a single `atempo` stage
pub const TEMPO_STAGE_RANGE: (f64, f64) = (0.5, 2.0);

/// Sample rate assumed when probing did not report one
pub const FALLBACK_SAMPLE_RATE: u32 = 48_000;

const NEUTRAL_EPSILON: f64 = 1e-9;

/// Split `rate` into `atempo` stage factors.
///
/// Returns an empty list for a neutral or invalid rate.
pub fn tempo_stages(rate: f64) -> Vec<f64> {
    let (min, max) = TEMPO_STAGE_RANGE;
    let mut stages = Vec::new();
    if !rate.is_finite() || rate <= 0.0 {
        return stages;
    }

    let mut remaining = rate;
    while remaining > max + NEUTRAL_EPSILON {
        stages.push(max);
        remaining /= max;
    }
    while remaining < min - NEUTRAL_EPSILON {
        stages.push(min);
        remaining /= min;
    }
    if (remaining - 1.0).abs() > NEUTRAL_EPSILON {
        stages.push(remaining.clamp(min, max));
    }
    stages
}

/// `atempo` filters for `rate`
pub fn tempo_filters(rate: f64) -> Vec<Filter> {
    tempo_stages(rate)
        .into_iter()
        .map(|stage| Filter::new("atempo").value(fmt_number(stage)))
        .collect()
}

/// Speed and pitch filters for one audio clip.
///
/// Pitch is applied by resampling and then, only when the clip keeps its
/// natural speed, restoring the original tempo. With a speed change active
/// the pitch stage is left uncompensated and the speed stage follows it.
pub fn rate_filters(speed_rate: f64, pitch_percent: Option<f64>, sample_rate: u32) -> Vec<Filter> {
    let speed_active =
        speed_rate.is_finite() && speed_rate > 0.0 && (speed_rate - 1.0).abs() > NEUTRAL_EPSILON;
    let mut filters = Vec::new();

    if let Some(factor) = pitch_percent
        .map(|p| p / 100.0)
        .filter(|f| f.is_finite() && *f > 0.0 && (f - 1.0).abs() > NEUTRAL_EPSILON)
    {
        let sample_rate = if sample_rate > 0 { sample_rate } else { FALLBACK_SAMPLE_RATE };
        let shifted = (f64::from(sample_rate) * factor).round() as u64;
        filters.push(Filter::new("asetrate").value(shifted));
        filters.push(Filter::new("aresample").value(sample_rate));
        if !speed_active {
            filters.extend(tempo_filters(1.0 / factor));
        }
    }

    if speed_active {
        filters.extend(tempo_filters(speed_rate));
    }
    filters
}

/// Volume filter, `None` at unity gain
pub fn volume_filter(percent: Option<f64>) -> Option<Filter> {
    let gain = percent? / 100.0;
    if !gain.is_finite() || (gain - 1.0).abs() < NEUTRAL_EPSILON {
        return None;
    }
    Some(Filter::new("volume").value(fmt_number(gain.max(0.0))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stages: &[f64]) -> f64 {
        stages.iter().product()
    }

    #[test]
    fn test_stages_stay_in_range() {
        for rate in [0.1, 0.25, 0.3, 0.5, 0.75, 1.5, 2.0, 3.0, 7.5, 16.0] {
            let stages = tempo_stages(rate);
            assert!(!stages.is_empty(), "rate {rate}");
            assert!((product(&stages) - rate).abs() < 1e-9, "rate {rate}");
            for stage in stages {
                assert!((0.5..=2.0).contains(&stage), "stage {stage} for {rate}");
            }
        }
    }

    #[test]
    fn test_extreme_speed_chain() {
        assert_eq!(tempo_stages(16.0), vec![2.0, 2.0, 2.0, 2.0]);
        assert_eq!(tempo_stages(0.1).len(), 4);
        assert!(tempo_stages(1.0).is_empty());
    }

    #[test]
    fn test_pitch_compensated_without_speed() {
        let rendered: Vec<String> = rate_filters(1.0, Some(200.0), 44_100)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(rendered, vec!["asetrate=88200", "aresample=44100", "atempo=0.5"]);
    }

    #[test]
    fn test_pitch_uncompensated_with_speed() {
        let rendered: Vec<String> = rate_filters(1.5, Some(200.0), 48_000)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(rendered, vec!["asetrate=96000", "aresample=48000", "atempo=1.5"]);
    }

    #[test]
    fn test_volume_filter() {
        assert_eq!(volume_filter(Some(100.0)), None);
        assert_eq!(volume_filter(None), None);
        assert_eq!(
            volume_filter(Some(250.0)).map(|f| f.to_string()),
            Some("volume=2.5".to_string())
        );
    }
}
