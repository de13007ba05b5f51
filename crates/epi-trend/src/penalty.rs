// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use epi_core::EpiError;

/// Per-segment penalty rule for the segmentation objective.
///
/// A tunable strategy, not a fixed constant: information criteria scale a
/// noise-variance estimate by the per-segment parameter count, while
/// `Manual` passes a raw penalty value through untouched.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Penalty {
    /// Bayesian information criterion: scales with `ln n`.
    Bic,
    /// Akaike information criterion: constant per parameter.
    Aic,
    /// Explicit penalty value on the squared-residual scale.
    Manual(f64),
}

/// Noise variance estimated from first differences.
///
/// For a piecewise-linear signal plus iid noise, successive differences are
/// locally slope + noise-difference, so `var(diff) / 2` estimates the noise
/// variance without fitting any segmentation first.
fn first_difference_variance(values: &[f64]) -> f64 {
    if values.len() < 3 {
        return 0.0;
    }
    let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    let mean = diffs.iter().sum::<f64>() / diffs.len() as f64;
    let var = diffs.iter().map(|d| (d - mean) * (d - mean)).sum::<f64>()
        / (diffs.len() - 1) as f64;
    var / 2.0
}

/// Resolves a penalty rule into a positive beta on the segment-cost scale.
pub(crate) fn resolve_penalty(
    penalty: &Penalty,
    values: &[f64],
    params_per_segment: usize,
) -> Result<f64, EpiError> {
    let n = values.len();
    let beta = match penalty {
        Penalty::Bic => {
            2.0 * first_difference_variance(values)
                * params_per_segment as f64
                * (n.max(2) as f64).ln()
        }
        Penalty::Aic => 2.0 * first_difference_variance(values) * params_per_segment as f64,
        Penalty::Manual(beta) => *beta,
    };
    if !beta.is_finite() || beta < 0.0 {
        return Err(EpiError::invalid_input(format!(
            "resolved penalty must be finite and >= 0; got {beta}"
        )));
    }
    // A beta at or below the rounding residue of the prefix-sum segment
    // costs would make numerically-free splits look significant; keep beta
    // above that residue (noiseless input resolves Bic/Aic to ~0).
    let scale: f64 = values.iter().map(|x| x * x).sum();
    Ok(beta.max(f64::EPSILON).max(f64::EPSILON * scale))
}

#[cfg(test)]
mod tests {
    use super::{first_difference_variance, resolve_penalty, Penalty};

    #[test]
    fn noiseless_line_has_near_zero_difference_variance() {
        let line: Vec<f64> = (0..50).map(|t| 0.3 * t as f64).collect();
        assert!(first_difference_variance(&line) < 1e-24);
    }

    #[test]
    fn alternating_noise_raises_difference_variance() {
        let noisy: Vec<f64> = (0..50)
            .map(|t| 0.3 * t as f64 + if t % 2 == 0 { 0.5 } else { -0.5 })
            .collect();
        assert!(first_difference_variance(&noisy) > 0.1);
    }

    #[test]
    fn bic_grows_with_series_length_while_aic_does_not() {
        let noisy = |n: usize| -> Vec<f64> {
            (0..n)
                .map(|t| 0.3 * t as f64 + if t % 2 == 0 { 0.5 } else { -0.5 })
                .collect()
        };
        let short = noisy(50);
        let long = noisy(5_000);

        let bic_short = resolve_penalty(&Penalty::Bic, &short, 3).expect("valid");
        let bic_long = resolve_penalty(&Penalty::Bic, &long, 3).expect("valid");
        assert!(bic_long > bic_short);

        let aic_short = resolve_penalty(&Penalty::Aic, &short, 3).expect("valid");
        let aic_long = resolve_penalty(&Penalty::Aic, &long, 3).expect("valid");
        assert!((aic_long - aic_short).abs() < aic_short * 0.1);
    }

    #[test]
    fn manual_penalty_passes_through_and_rejects_bad_values() {
        let values = [1.0, 2.0, 3.0];
        assert_eq!(
            resolve_penalty(&Penalty::Manual(0.25), &values, 3).expect("valid"),
            0.25
        );
        assert!(resolve_penalty(&Penalty::Manual(-1.0), &values, 3).is_err());
        assert!(resolve_penalty(&Penalty::Manual(f64::NAN), &values, 3).is_err());
    }

    #[test]
    fn zero_penalty_is_floored_to_stay_positive() {
        let values = [1.0, 2.0, 3.0];
        let beta = resolve_penalty(&Penalty::Manual(0.0), &values, 3).expect("valid");
        assert!(beta > 0.0);
    }

    #[test]
    fn noiseless_input_floors_beta_at_the_input_scale() {
        // BIC/AIC resolve to ~0 on a noiseless line; the floor must track
        // the magnitude of the input, not a fixed machine epsilon.
        let line: Vec<f64> = (0..100).map(|t| 1.0e4 + 50.0 * t as f64).collect();
        let scale: f64 = line.iter().map(|x| x * x).sum();
        let beta = resolve_penalty(&Penalty::Bic, &line, 3).expect("valid");
        assert!(beta >= f64::EPSILON * scale);
    }
}
