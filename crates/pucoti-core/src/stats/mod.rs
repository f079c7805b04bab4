//! Estimation statistics over the session log.
//!
//! Only completed sessions with a positive prediction carry calibration
//! signal; everything else is filtered out up front.

mod calibration;
mod regression;

pub use calibration::{
    adjustment_for_on_time, calibration_sessions, ratio_quartiles, CalibrationStats, Quartiles,
};
pub use regression::{linear_regression, regression_with_ci, Point, Regression, RegressionWithCi};

/// Two-sided 95% critical value used for every interval here.
///
/// A flat 2.0 for small samples, the normal 1.96 above 30.
pub(crate) fn t_value(n: usize) -> f64 {
    if n > 30 {
        1.96
    } else {
        2.0
    }
}
