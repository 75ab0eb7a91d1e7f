//! Benchmark results and the strategy recommendation.

use super::BenchmarkConfig;
use crate::render::Strategy;
use serde::Serialize;

/// FPS difference, in percent of the texture strategy, that names a speed winner.
pub const SPEED_THRESHOLD_PERCENT: f64 = 5.0;

/// Frame-time variance difference, in percent, that names a smoothness winner.
pub const SMOOTHNESS_THRESHOLD_PERCENT: f64 = 10.0;

/// Measured behavior of one strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyReport {
    pub strategy: Strategy,
    pub frame_count: usize,
    pub avg_fps: f64,
    pub min_fps: f64,
    pub max_fps: f64,
    pub frame_time_variance_ms2: f64,
    pub p95_frame_time_ms: f64,
    pub p99_frame_time_ms: f64,
    /// Textures or buffers built during measurement.
    pub generation_count: u64,
}

impl StrategyReport {
    /// Summarize per-frame intervals in milliseconds.
    pub fn from_frame_times(strategy: Strategy, frame_times_ms: &[f64], generation_count: u64) -> Self {
        let frame_count = frame_times_ms.len();
        if frame_count == 0 {
            return Self {
                strategy,
                frame_count,
                avg_fps: 0.0,
                min_fps: 0.0,
                max_fps: 0.0,
                frame_time_variance_ms2: 0.0,
                p95_frame_time_ms: 0.0,
                p99_frame_time_ms: 0.0,
                generation_count,
            };
        }

        let mut sorted = frame_times_ms.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mean = sorted.iter().sum::<f64>() / frame_count as f64;
        let variance = sorted.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / frame_count as f64;
        let fps = |ms: f64| if ms > 0.0 { 1000.0 / ms } else { 0.0 };

        Self {
            strategy,
            frame_count,
            avg_fps: fps(mean),
            min_fps: fps(sorted[frame_count - 1]),
            max_fps: fps(sorted[0]),
            frame_time_variance_ms2: variance,
            p95_frame_time_ms: percentile(&sorted, 95.0),
            p99_frame_time_ms: percentile(&sorted, 99.0),
            generation_count,
        }
    }
}

/// Nearest-rank percentile of already sorted samples.
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (pct * sorted.len() as f64 / 100.0).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Outcome of one comparison axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Texture,
    Direct,
    Parity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub speed: Verdict,
    pub smoothness: Verdict,
    /// `(direct - texture) / texture` average FPS, in percent.
    pub fps_delta_percent: f64,
    /// `(direct - texture) / texture` frame-time variance, in percent.
    pub variance_delta_percent: f64,
    /// Speed decides when it names a winner, then smoothness.
    pub recommended: Verdict,
    pub summary: String,
}

impl Recommendation {
    pub fn compare(texture: &StrategyReport, direct: &StrategyReport) -> Self {
        let fps_delta_percent = relative_delta(texture.avg_fps, direct.avg_fps);
        let variance_delta_percent =
            relative_delta(texture.frame_time_variance_ms2, direct.frame_time_variance_ms2);

        let speed = if fps_delta_percent > SPEED_THRESHOLD_PERCENT {
            Verdict::Direct
        } else if fps_delta_percent < -SPEED_THRESHOLD_PERCENT {
            Verdict::Texture
        } else {
            Verdict::Parity
        };

        // lower variance is smoother
        let smoothness = if variance_delta_percent < -SMOOTHNESS_THRESHOLD_PERCENT {
            Verdict::Direct
        } else if variance_delta_percent > SMOOTHNESS_THRESHOLD_PERCENT {
            Verdict::Texture
        } else {
            Verdict::Parity
        };

        let recommended = match (speed, smoothness) {
            (Verdict::Parity, other) => other,
            (winner, _) => winner,
        };

        let summary = format!(
            "speed: {} ({:+.2}% fps, threshold ±{}%), smoothness: {} ({:+.2}% variance, threshold ±{}%), recommended: {}",
            verdict_str(speed),
            fps_delta_percent,
            SPEED_THRESHOLD_PERCENT,
            verdict_str(smoothness),
            variance_delta_percent,
            SMOOTHNESS_THRESHOLD_PERCENT,
            verdict_str(recommended),
        );

        Self {
            speed,
            smoothness,
            fps_delta_percent,
            variance_delta_percent,
            recommended,
            summary,
        }
    }
}

fn verdict_str(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Texture => "texture",
        Verdict::Direct => "direct",
        Verdict::Parity => "parity",
    }
}

/// Percent change from `base` to `other`. A zero base maps to 0 when both are
/// zero, and to ±100 otherwise, so the report stays finite.
fn relative_delta(base: f64, other: f64) -> f64 {
    if base.abs() < f64::EPSILON {
        return if other.abs() < f64::EPSILON {
            0.0
        } else {
            100.0 * other.signum()
        };
    }
    (other - base) / base * 100.0
}

/// Full comparison run.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    pub backend: String,
    pub config: BenchmarkConfig,
    pub texture: StrategyReport,
    pub direct: StrategyReport,
    pub recommendation: Recommendation,
}

impl BenchmarkReport {
    pub fn new(
        backend: impl Into<String>,
        config: BenchmarkConfig,
        texture: StrategyReport,
        direct: StrategyReport,
    ) -> Self {
        let recommendation = Recommendation::compare(&texture, &direct);
        Self {
            backend: backend.into(),
            config,
            texture,
            direct,
            recommendation,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(strategy: Strategy, avg_fps: f64, variance: f64) -> StrategyReport {
        StrategyReport {
            strategy,
            frame_count: 600,
            avg_fps,
            min_fps: avg_fps - 5.0,
            max_fps: avg_fps + 5.0,
            frame_time_variance_ms2: variance,
            p95_frame_time_ms: 9.0,
            p99_frame_time_ms: 10.0,
            generation_count: 3,
        }
    }

    #[test]
    fn test_small_fps_gap_is_parity() {
        let texture = report(Strategy::Texture, 118.0, 0.5);
        let direct = report(Strategy::Direct, 119.5, 0.5);
        let rec = Recommendation::compare(&texture, &direct);

        assert!((rec.fps_delta_percent - 1.271).abs() < 0.01);
        assert_eq!(rec.speed, Verdict::Parity);
        assert_eq!(rec.smoothness, Verdict::Parity);
        assert_eq!(rec.recommended, Verdict::Parity);
    }

    #[test]
    fn test_large_fps_gap_names_winner() {
        let texture = report(Strategy::Texture, 120.0, 0.5);
        let direct = report(Strategy::Direct, 100.0, 0.5);
        let rec = Recommendation::compare(&texture, &direct);
        assert_eq!(rec.speed, Verdict::Texture);
        assert_eq!(rec.recommended, Verdict::Texture);
    }

    #[test]
    fn test_lower_variance_wins_smoothness() {
        let texture = report(Strategy::Texture, 120.0, 1.0);
        let direct = report(Strategy::Direct, 120.0, 0.5);
        let rec = Recommendation::compare(&texture, &direct);
        assert_eq!(rec.speed, Verdict::Parity);
        assert_eq!(rec.smoothness, Verdict::Direct);
        assert_eq!(rec.recommended, Verdict::Direct);
    }

    #[test]
    fn test_from_frame_times() {
        let times: Vec<f64> = (1..=100).map(|i| i as f64).collect();
        let report = StrategyReport::from_frame_times(Strategy::Direct, &times, 7);

        assert_eq!(report.frame_count, 100);
        assert!((report.avg_fps - 1000.0 / 50.5).abs() < 1e-9);
        assert!((report.max_fps - 1000.0).abs() < 1e-9);
        assert!((report.min_fps - 10.0).abs() < 1e-9);
        assert_eq!(report.p95_frame_time_ms, 95.0);
        assert_eq!(report.p99_frame_time_ms, 99.0);
        assert!((report.frame_time_variance_ms2 - 833.25).abs() < 1e-9);
    }

    #[test]
    fn test_empty_run_is_all_zero() {
        let report = StrategyReport::from_frame_times(Strategy::Texture, &[], 0);
        assert_eq!(report.frame_count, 0);
        assert_eq!(report.avg_fps, 0.0);
    }

    #[test]
    fn test_zero_base_stays_finite() {
        assert_eq!(relative_delta(0.0, 0.0), 0.0);
        assert_eq!(relative_delta(0.0, 2.0), 100.0);
    }

    #[test]
    fn test_report_serializes() {
        let report = BenchmarkReport::new(
            "cpu",
            BenchmarkConfig::default(),
            report(Strategy::Texture, 118.0, 0.5),
            report(Strategy::Direct, 119.5, 0.5),
        );
        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["texture"]["strategy"], "texture");
        assert_eq!(value["recommendation"]["recommended"], "parity");
        assert_eq!(value["direct"]["frame_count"], 600);
    }
}
