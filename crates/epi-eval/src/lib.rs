// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Forecast accuracy metrics.
//!
//! Scores a simulated trajectory against observed ground truth over paired
//! value slices. Log-based metrics are undefined for negative values and
//! fail with a metric-domain error rather than producing NaN.

use epi_core::EpiError;
use std::fmt;
use std::str::FromStr;

/// Supported accuracy metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Metric {
    Mae,
    Mse,
    Msle,
    Rmse,
    Rmsle,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Mae,
        Metric::Mse,
        Metric::Msle,
        Metric::Rmse,
        Metric::Rmsle,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Mae => "MAE",
            Metric::Mse => "MSE",
            Metric::Msle => "MSLE",
            Metric::Rmse => "RMSE",
            Metric::Rmsle => "RMSLE",
        }
    }

    fn is_log_based(&self) -> bool {
        matches!(self, Metric::Msle | Metric::Rmsle)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = EpiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MAE" => Ok(Metric::Mae),
            "MSE" => Ok(Metric::Mse),
            "MSLE" => Ok(Metric::Msle),
            "RMSE" => Ok(Metric::Rmse),
            "RMSLE" => Ok(Metric::Rmsle),
            other => Err(EpiError::invalid_input(format!(
                "unknown metric {other:?}; expected one of MAE, MSE, MSLE, RMSE, RMSLE"
            ))),
        }
    }
}

fn validate_pair(predicted: &[f64], actual: &[f64]) -> Result<(), EpiError> {
    if predicted.len() != actual.len() {
        return Err(EpiError::invalid_input(format!(
            "length mismatch: predicted has {}, actual has {}",
            predicted.len(),
            actual.len()
        )));
    }
    if predicted.is_empty() {
        return Err(EpiError::invalid_input("scoring requires at least one value"));
    }
    for (index, value) in predicted.iter().chain(actual).enumerate() {
        if !value.is_finite() {
            return Err(EpiError::invalid_input(format!(
                "scored values must be finite; got {value} at flattened index {index}"
            )));
        }
    }
    Ok(())
}

fn check_log_domain(predicted: &[f64], actual: &[f64]) -> Result<(), EpiError> {
    for (index, value) in predicted.iter().chain(actual).enumerate() {
        if *value < 0.0 {
            return Err(EpiError::metric_domain(format!(
                "log-based metric requested but value {value} at flattened index {index} is negative"
            )));
        }
    }
    Ok(())
}

/// Scores `predicted` against `actual` with the requested metric.
pub fn score(predicted: &[f64], actual: &[f64], metric: Metric) -> Result<f64, EpiError> {
    validate_pair(predicted, actual)?;
    if metric.is_log_based() {
        check_log_domain(predicted, actual)?;
    }

    let n = predicted.len() as f64;
    let value = match metric {
        Metric::Mae => {
            predicted
                .iter()
                .zip(actual)
                .map(|(p, a)| (p - a).abs())
                .sum::<f64>()
                / n
        }
        Metric::Mse => mean_squared(predicted, actual, |v| v),
        Metric::Rmse => mean_squared(predicted, actual, |v| v).sqrt(),
        Metric::Msle => mean_squared(predicted, actual, |v| (1.0 + v).ln()),
        Metric::Rmsle => mean_squared(predicted, actual, |v| (1.0 + v).ln()).sqrt(),
    };

    if !value.is_finite() {
        return Err(EpiError::numerical_issue(format!(
            "{metric} score is not finite: {value}"
        )));
    }
    Ok(value)
}

fn mean_squared(predicted: &[f64], actual: &[f64], transform: impl Fn(f64) -> f64) -> f64 {
    predicted
        .iter()
        .zip(actual)
        .map(|(&p, &a)| {
            let diff = transform(p) - transform(a);
            diff * diff
        })
        .sum::<f64>()
        / predicted.len() as f64
}
