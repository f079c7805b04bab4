use clap::Args;
use pucoti_core::format::format_duration;
use pucoti_core::stats::{
    adjustment_for_on_time, calibration_sessions, ratio_quartiles, regression_with_ci, CalibrationStats, Point,
    Quartiles, RegressionWithCi,
};
use pucoti_core::storage::Database;
use serde::Serialize;

/// Probability of finishing on time the suggested padding aims for.
const ON_TIME_PROBABILITY: f64 = 0.8;

#[derive(Args)]
pub struct StatsArgs {
    /// Print as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Report {
    calibration: Option<CalibrationStats>,
    quartiles: Option<Quartiles>,
    /// Actual minutes against predicted minutes.
    regression: Option<RegressionWithCi>,
    on_time_adjustment_percent: Option<f64>,
}

pub fn run(args: StatsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let records = db.list_sessions()?;

    let points: Vec<Point> = calibration_sessions(&records)
        .into_iter()
        .map(|s| Point::new(s.predicted_seconds as f64 / 60.0, s.actual_seconds as f64 / 60.0))
        .collect();
    let report = Report {
        calibration: CalibrationStats::compute(&records),
        quartiles: ratio_quartiles(&records),
        regression: regression_with_ci(&points),
        on_time_adjustment_percent: adjustment_for_on_time(&records, ON_TIME_PROBABILITY),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let Some(calibration) = &report.calibration else {
        println!("no completed sessions with a prediction yet");
        return Ok(());
    };

    println!("sessions:        {}", calibration.session_count);
    println!("time focused:    {}", format_duration(calibration.total_seconds));
    match calibration.bias_margin {
        Some(margin) => println!("mean bias:       {:+.1}% ± {margin:.1}%", calibration.mean_bias),
        None => println!("mean bias:       {:+.1}%", calibration.mean_bias),
    }
    println!("took longer:     {:.0}%", calibration.longer_percent);
    println!("within ±10%:     {:.0}%", calibration.within_ten_percent);

    if let Some(q) = &report.quartiles {
        println!(
            "actual/predicted: q1 {:.2}  median {:.2}  q3 {:.2}",
            q.q1, q.median, q.q3
        );
    }
    if let Some(r) = &report.regression {
        print!(
            "actual ≈ {:.2} × predicted {:+.1}m  (r² {:.2})",
            r.fit.slope, r.fit.intercept, r.fit.r_squared
        );
        match r.slope_ci {
            Some((low, high)) => println!("  slope 95% CI [{low:.2}, {high:.2}]"),
            None => println!(),
        }
    }
    if let Some(adjust) = report.on_time_adjustment_percent {
        println!(
            "to finish on time {:.0}% of the time, add {adjust:+.0}% to estimates",
            ON_TIME_PROBABILITY * 100.0
        );
    }
    Ok(())
}
