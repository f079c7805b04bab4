use serde::{Deserialize, Serialize};

use super::t_value;
use crate::storage::{SessionRecord, SessionStatus};

/// Summary of how well predictions match reality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationStats {
    /// Mean of `(actual - predicted) / predicted` in percent. Positive means
    /// sessions tend to run longer than predicted.
    pub mean_bias: f64,
    /// Half-width of the 95% interval around `mean_bias`; needs 3 sessions.
    pub bias_margin: Option<f64>,
    pub total_seconds: u64,
    /// Share of sessions that ran longer than predicted, in percent.
    pub longer_percent: f64,
    /// Share of sessions within ±10% of the prediction, in percent.
    pub within_ten_percent: f64,
    pub session_count: usize,
}

impl CalibrationStats {
    /// `None` when no session qualifies.
    pub fn compute(records: &[SessionRecord]) -> Option<Self> {
        let sessions = calibration_sessions(records);
        let n = sessions.len();
        if n == 0 {
            return None;
        }

        let biases: Vec<f64> = sessions.iter().map(|s| bias_percent(s)).collect();
        let mean_bias = biases.iter().sum::<f64>() / n as f64;

        let bias_margin = (n >= 3).then(|| {
            let variance =
                biases.iter().map(|b| (b - mean_bias).powi(2)).sum::<f64>() / (n - 1) as f64;
            t_value(n) * (variance / n as f64).sqrt()
        });

        let total_seconds = sessions.iter().map(|s| s.actual_seconds).sum();
        let longer = sessions
            .iter()
            .filter(|s| s.actual_seconds > s.predicted_seconds)
            .count();
        let within = biases.iter().filter(|b| b.abs() <= 10.0).count();

        Some(Self {
            mean_bias,
            bias_margin,
            total_seconds,
            longer_percent: longer as f64 / n as f64 * 100.0,
            within_ten_percent: within as f64 / n as f64 * 100.0,
            session_count: n,
        })
    }
}

/// Completed sessions that had a prediction.
pub fn calibration_sessions(records: &[SessionRecord]) -> Vec<&SessionRecord> {
    records
        .iter()
        .filter(|r| r.status == SessionStatus::Completed && r.predicted_seconds > 0)
        .collect()
}

fn bias_percent(s: &SessionRecord) -> f64 {
    (s.actual_seconds as f64 - s.predicted_seconds as f64) / s.predicted_seconds as f64 * 100.0
}

fn ratios(records: &[SessionRecord]) -> Vec<f64> {
    let mut ratios: Vec<f64> = calibration_sessions(records)
        .into_iter()
        .map(|s| s.actual_seconds as f64 / s.predicted_seconds as f64)
        .collect();
    ratios.sort_by(f64::total_cmp);
    ratios
}

/// Linear-interpolated quantile of sorted, non-empty data.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let pos = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Spread of `actual / predicted`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quartiles {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
}

pub fn ratio_quartiles(records: &[SessionRecord]) -> Option<Quartiles> {
    let ratios = ratios(records);
    if ratios.is_empty() {
        return None;
    }
    Some(Quartiles {
        q1: quantile(&ratios, 0.25),
        median: quantile(&ratios, 0.5),
        q3: quantile(&ratios, 0.75),
    })
}

/// Percent to add to a raw estimate so it is met with probability `p`.
///
/// Negative means estimates are padded already. Needs 3 sessions.
pub fn adjustment_for_on_time(records: &[SessionRecord], p: f64) -> Option<f64> {
    let ratios = ratios(records);
    if ratios.len() < 3 {
        return None;
    }
    Some((quantile(&ratios, p) - 1.0) * 100.0)
}
