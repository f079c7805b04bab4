use serde::{Deserialize, Serialize};

use super::t_value;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionWithCi {
    pub fit: Regression,
    /// 95% interval for the slope; needs 3 points.
    pub slope_ci: Option<(f64, f64)>,
}

struct Fit {
    fit: Regression,
    ss_residual: f64,
    mean_x: f64,
}

fn fit(points: &[Point]) -> Option<Fit> {
    let n = points.len();
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2) = (0.0, 0.0, 0.0, 0.0);
    for p in points {
        sum_x += p.x;
        sum_y += p.y;
        sum_xy += p.x * p.y;
        sum_x2 += p.x * p.x;
    }

    let denominator = nf * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return None;
    }
    let slope = (nf * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / nf;

    let mean_y = sum_y / nf;
    let (mut ss_total, mut ss_residual) = (0.0, 0.0);
    for p in points {
        let predicted = slope * p.x + intercept;
        ss_total += (p.y - mean_y).powi(2);
        ss_residual += (p.y - predicted).powi(2);
    }
    let r_squared = if ss_total == 0.0 {
        1.0
    } else {
        1.0 - ss_residual / ss_total
    };

    Some(Fit {
        fit: Regression {
            slope,
            intercept,
            r_squared,
        },
        ss_residual,
        mean_x: sum_x / nf,
    })
}

/// Least-squares line. `None` with fewer than 2 points or when all `x` are equal.
pub fn linear_regression(points: &[Point]) -> Option<Regression> {
    fit(points).map(|f| f.fit)
}

/// [`linear_regression`] plus a confidence interval for the slope.
pub fn regression_with_ci(points: &[Point]) -> Option<RegressionWithCi> {
    let Fit {
        fit,
        ss_residual,
        mean_x,
    } = self::fit(points)?;
    let n = points.len();
    let slope_ci = (n >= 3).then(|| {
        let ss_x: f64 = points.iter().map(|p| (p.x - mean_x).powi(2)).sum();
        let mse = ss_residual / (n - 2) as f64;
        let se_slope = (mse / ss_x).sqrt();
        let margin = t_value(n) * se_slope;
        (fit.slope - margin, fit.slope + margin)
    });
    Some(RegressionWithCi { fit, slope_ci })
}
