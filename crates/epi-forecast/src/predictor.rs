// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use chrono::Days;
use epi_core::{DateRange, EpiError, IndicatorSeries, NaiveDate};
use epi_models::{ModelKind, ModelParams};
use epi_scenario::{PhaseSeq, PhaseStatus};
use log::debug;
use nalgebra::{DMatrix, DVector, Vector3};

/// Configuration for [`Predictor`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PredictorConfig {
    /// Length of each projected future phase, in days. The final stub is
    /// truncated so the projection covers the horizon exactly.
    pub phase_days: usize,
    /// Predicted rates are clamped into `[lower, upper]`.
    pub lower: f64,
    pub upper: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            phase_days: 7,
            lower: 1e-6,
            upper: 1.0 - 1e-6,
        }
    }
}

impl PredictorConfig {
    pub fn validate(&self) -> Result<(), EpiError> {
        if self.phase_days == 0 {
            return Err(EpiError::invalid_input(
                "PredictorConfig.phase_days must be >= 1; got 0",
            ));
        }
        if !self.lower.is_finite()
            || !self.upper.is_finite()
            || self.lower < 0.0
            || self.upper > 1.0
            || self.lower >= self.upper
        {
            return Err(EpiError::invalid_input(format!(
                "PredictorConfig clamp bounds must satisfy 0 <= lower < upper <= 1; \
                 got [{}, {}]",
                self.lower, self.upper
            )));
        }
        Ok(())
    }
}

/// Per-parameter regression of phase parameters on an external indicator.
///
/// Each fitted phase transition contributes one row per parameter:
/// `[1, indicator(previous phase start), previous value] -> next value`.
/// The model captures the lagged response of transmission rates to policy
/// changes the indicator tracks; projection applies it recursively, each
/// predicted phase feeding the next.
#[derive(Clone, Debug)]
pub struct Predictor {
    config: PredictorConfig,
    kind: ModelKind,
    /// One intercept/indicator/lag coefficient triple per parameter, in the
    /// kind's canonical order.
    coefficients: Vec<Vector3<f64>>,
    seed: ModelParams,
    seq_end: NaiveDate,
}

impl Predictor {
    /// Fits the regression on a scenario's estimated phases.
    ///
    /// Phases that are pending or merely predicted carry no information
    /// about how parameters respond to the indicator, so only estimated
    /// (including non-converged) phases contribute. Fails with
    /// [`EpiError::InsufficientHistory`] when fewer than two such phases
    /// exist.
    pub fn fit(
        phases: &PhaseSeq,
        indicator: &IndicatorSeries,
        config: PredictorConfig,
    ) -> Result<Self, EpiError> {
        config.validate()?;

        let fitted: Vec<_> = phases
            .phases()
            .iter()
            .filter(|phase| {
                matches!(
                    phase.status(),
                    PhaseStatus::Estimated | PhaseStatus::NonConverged
                ) && phase.params().is_some()
            })
            .collect();
        if fitted.len() < 2 {
            return Err(EpiError::insufficient_history(format!(
                "indicator regression requires at least 2 estimated phases; got {}",
                fitted.len()
            )));
        }

        let last = fitted[fitted.len() - 1];
        let kind = last.kind();
        let seed = last
            .params()
            .copied()
            .ok_or_else(|| EpiError::insufficient_history("last estimated phase lost its parameters"))?;

        let mut rows: Vec<(f64, Vec<f64>, Vec<f64>)> = Vec::new();
        for pair in fitted.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            if prev.kind() != kind || next.kind() != kind {
                continue;
            }
            let (Some(prev_params), Some(next_params)) = (prev.params(), next.params()) else {
                continue;
            };
            let start = prev.range().start();
            let value = indicator.value_on_or_before(start).ok_or_else(|| {
                EpiError::invalid_input(format!(
                    "indicator has no value on or before the phase start {start}"
                ))
            })?;
            rows.push((value, prev_params.values(), next_params.values()));
        }
        if rows.is_empty() {
            return Err(EpiError::insufficient_history(format!(
                "no consecutive estimated phase pairs share the model kind {kind}"
            )));
        }

        let coefficients = (0..kind.param_count())
            .map(|param| solve_one(&rows, param))
            .collect::<Result<Vec<_>, EpiError>>()?;

        debug!(
            "fitted {kind} indicator regression on {} phase transitions",
            rows.len()
        );
        Ok(Self {
            config,
            kind,
            coefficients,
            seed,
            seq_end: phases.span().end(),
        })
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Projects future phases covering `horizon_days` past the fitted
    /// sequence, in stubs of `phase_days` (the last one truncated).
    /// Each stub's parameters are predicted from the indicator value at its
    /// start and the previous stub's parameters.
    pub fn project(
        &self,
        indicator: &IndicatorSeries,
        horizon_days: usize,
    ) -> Result<Vec<(DateRange, ModelParams)>, EpiError> {
        if horizon_days == 0 {
            return Err(EpiError::invalid_input(
                "projection horizon must be >= 1 day",
            ));
        }

        let mut stubs = Vec::new();
        let mut previous = self.seed;
        let mut last_end = self.seq_end;
        let mut remaining = horizon_days;
        while remaining > 0 {
            let days = remaining.min(self.config.phase_days);
            let start = last_end
                .succ_opt()
                .ok_or_else(|| EpiError::invalid_input("projection overflows the calendar"))?;
            let end = start
                .checked_add_days(Days::new(days as u64 - 1))
                .ok_or_else(|| EpiError::invalid_input("projection overflows the calendar"))?;
            let range = DateRange::new(start, end)?;

            let value = indicator.value_on_or_before(start).ok_or_else(|| {
                EpiError::invalid_input(format!(
                    "indicator has no value on or before the projected phase start {start}"
                ))
            })?;
            let params = self.predict_params(value, &previous)?;

            stubs.push((range, params));
            previous = params;
            last_end = end;
            remaining -= days;
        }
        Ok(stubs)
    }

    fn predict_params(
        &self,
        indicator_value: f64,
        previous: &ModelParams,
    ) -> Result<ModelParams, EpiError> {
        let values = previous
            .values()
            .iter()
            .zip(&self.coefficients)
            .map(|(&lag, beta)| {
                let raw = beta[0] + beta[1] * indicator_value + beta[2] * lag;
                if !raw.is_finite() {
                    return Err(EpiError::numerical_issue(format!(
                        "predicted rate is not finite (indicator {indicator_value}, lag {lag})"
                    )));
                }
                Ok(raw.clamp(self.config.lower, self.config.upper))
            })
            .collect::<Result<Vec<_>, EpiError>>()?;
        ModelParams::from_values(self.kind, &values)
    }
}

/// Least-squares fit of one parameter's transition rule.
fn solve_one(
    rows: &[(f64, Vec<f64>, Vec<f64>)],
    param: usize,
) -> Result<Vector3<f64>, EpiError> {
    let design = DMatrix::from_fn(rows.len(), 3, |row, col| match col {
        0 => 1.0,
        1 => rows[row].0,
        _ => rows[row].1[param],
    });
    let targets = DVector::from_fn(rows.len(), |row, _| rows[row].2[param]);

    let solution = design
        .svd(true, true)
        .solve(&targets, 1e-12)
        .map_err(EpiError::numerical_issue)?;
    Ok(Vector3::new(solution[0], solution[1], solution[2]))
}
