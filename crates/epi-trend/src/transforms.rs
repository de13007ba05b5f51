// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Series transforms applied before segmentation.

use epi_core::EpiError;

/// `log10(1 + x)` of a non-negative series, the conventional transform for
/// cumulative confirmed counts.
pub fn log10_shifted(values: &[f64]) -> Result<Vec<f64>, EpiError> {
    if values.is_empty() {
        return Err(EpiError::invalid_input("log transform requires values"));
    }
    values
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            if !value.is_finite() || value < 0.0 {
                return Err(EpiError::invalid_input(format!(
                    "log transform requires finite values >= 0; got {value} at index {index}"
                )));
            }
            Ok((1.0 + value).log10())
        })
        .collect()
}

/// Centered moving average with an odd window, shrunk at the edges.
///
/// Length-preserving and deterministic; `window == 1` is the identity.
pub fn moving_average(values: &[f64], window: usize) -> Result<Vec<f64>, EpiError> {
    if values.is_empty() {
        return Err(EpiError::invalid_input("moving average requires values"));
    }
    if window == 0 || window % 2 == 0 {
        return Err(EpiError::invalid_input(format!(
            "moving average window must be odd and >= 1; got {window}"
        )));
    }

    let half = window / 2;
    let n = values.len();
    let mut out = Vec::with_capacity(n);
    for center in 0..n {
        let lo = center.saturating_sub(half);
        let hi = (center + half).min(n - 1);
        let sum: f64 = values[lo..=hi].iter().sum();
        out.push(sum / (hi - lo + 1) as f64);
    }
    Ok(out)
}
