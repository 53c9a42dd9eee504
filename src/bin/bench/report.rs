// Bench Report Types
// Structured output for comparing solver modes across presets and models

use serde::Serialize;

// ─── Statistics (per-metric aggregation over seeds) ─────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub mean: f64,
    pub std_dev: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub min: f64,
    pub max: f64,
    pub n: usize,
}

impl Stats {
    pub fn from_samples(samples: &[f64]) -> Self {
        let n = samples.len();
        if n == 0 {
            return Self { mean: 0.0, std_dev: 0.0, ci_lower: 0.0, ci_upper: 0.0, min: 0.0, max: 0.0, n: 0 };
        }
        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = if n > 1 {
            samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };
        let std_dev = variance.sqrt();
        let stderr = std_dev / (n as f64).sqrt();
        let z = 1.96; // 95% CI
        Self {
            mean,
            std_dev,
            ci_lower: mean - z * stderr,
            ci_upper: mean + z * stderr,
            min: samples.iter().cloned().fold(f64::INFINITY, f64::min),
            max: samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            n,
        }
    }
}

// ─── Single-Run Result ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchResult {
    pub preset: String,
    pub model: String,
    pub seed: u64,
    pub nodes: usize,
    pub pass: bool,
    pub iterations: usize,
    pub termination: String,
    pub defaulted: usize,
    /// Largest |sequential - row-parallel| over both trajectories
    pub max_disagreement: f64,
    pub sequential_ms: f64,
    pub row_parallel_ms: f64,
}

// ─── Per-Preset Report ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetReport {
    pub preset: String,
    pub label: String,
    pub model: String,
    pub n_runs: usize,
    pub pass_rate: f64,
    pub converged_rate: f64,
    pub iterations: Stats,
    pub defaulted: Stats,
    pub max_disagreement: f64,
    pub sequential_ms: Stats,
    pub row_parallel_ms: Stats,
    pub individual_runs: Vec<BenchResult>,
}

// ─── Top-Level Report ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchReport {
    pub timestamp: String,
    pub version: &'static str,
    pub prng: &'static str,
    pub threads: usize,
    pub n_runs_per_preset: usize,
    pub summary: Summary,
    pub presets: Vec<PresetReport>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_from_samples() {
        let s = Stats::from_samples(&[1.0, 2.0, 3.0]);
        assert_eq!(s.mean, 2.0);
        assert_eq!(s.std_dev, 1.0);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 3.0);
        assert!(s.ci_lower < 2.0 && s.ci_upper > 2.0);
        assert_eq!(Stats::from_samples(&[]).n, 0);
    }
}
