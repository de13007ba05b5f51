// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::nelder_mead::{minimize, Minimum};
use epi_core::{CompartmentState, EpiError, ObservedRecord};
use epi_models::{trajectory_loss, ModelKind, ModelParams, SimulationConfig};
use log::debug;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Parameters are daily rates; keep trial points strictly inside (0, 1) so
/// the model validation never rejects an optimizer step.
const LOWER_BOUND: f64 = 1e-6;
const UPPER_BOUND: f64 = 1.0 - 1e-6;

/// Fixed multi-start values broadcast across every parameter dimension.
const START_VALUES: [f64; 3] = [0.05, 0.15, 0.35];

/// Configuration for [`PhaseEstimator`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EstimatorConfig {
    /// Nelder-Mead iteration budget per start.
    pub max_iters: usize,
    /// Relative tolerance on the simplex objective spread.
    pub f_tol: f64,
    /// Absolute tolerance on the simplex coordinate spread.
    pub x_tol: f64,
    /// Initial simplex step per coordinate.
    pub initial_step: f64,
    /// Integration settings used by the trajectory objective.
    pub sim: SimulationConfig,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            max_iters: 800,
            f_tol: 1e-12,
            x_tol: 1e-9,
            initial_step: 0.1,
            sim: SimulationConfig::default(),
        }
    }
}

impl EstimatorConfig {
    pub fn validate(&self) -> Result<(), EpiError> {
        if self.max_iters == 0 {
            return Err(EpiError::invalid_input(
                "EstimatorConfig.max_iters must be >= 1; got 0",
            ));
        }
        for (name, value) in [("f_tol", self.f_tol), ("x_tol", self.x_tol)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(EpiError::invalid_input(format!(
                    "EstimatorConfig.{name} must be finite and > 0; got {value}"
                )));
            }
        }
        if !self.initial_step.is_finite()
            || self.initial_step <= 0.0
            || self.initial_step >= 1.0
        {
            return Err(EpiError::invalid_input(format!(
                "EstimatorConfig.initial_step must lie in (0, 1); got {}",
                self.initial_step
            )));
        }
        self.sim.validate()
    }
}

/// Best parameters found for one phase, with fit quality and convergence.
#[derive(Clone, Debug, PartialEq)]
pub struct FitResult {
    pub params: ModelParams,
    /// Mean squared log-error of the fitted trajectory.
    pub loss: f64,
    pub iterations: usize,
    /// False when the iteration budget ran out before the tolerances were
    /// met. The result is still the best found and usable, but downstream
    /// consumers must surface it as non-converged.
    pub converged: bool,
}

impl FitResult {
    /// RMSLE fit-quality score, comparable across model kinds.
    pub fn rmsle(&self) -> f64 {
        self.loss.sqrt()
    }
}

/// Fits compartmental parameters to one phase's observed rows.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEstimator {
    config: EstimatorConfig,
}

impl PhaseEstimator {
    pub fn new(config: EstimatorConfig) -> Result<Self, EpiError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Estimates parameters of `kind` against `observed`, starting the
    /// trajectory from `initial` (the observed state at the phase start).
    ///
    /// `warm_start` seeds one extra optimization start, typically the
    /// previous phase's parameters.
    pub fn estimate(
        &self,
        kind: ModelKind,
        observed: &[ObservedRecord],
        initial: &CompartmentState,
        population: f64,
        warm_start: Option<&ModelParams>,
    ) -> Result<FitResult, EpiError> {
        if observed.len() < 2 {
            return Err(EpiError::invalid_input(format!(
                "estimation requires at least 2 observed rows; got {}",
                observed.len()
            )));
        }
        if let Some(params) = warm_start {
            if params.kind() != kind {
                return Err(EpiError::invalid_input(format!(
                    "warm start is {} but the requested model is {kind}",
                    params.kind()
                )));
            }
        }

        let dim = kind.param_count();
        let mut starts: Vec<Vec<f64>> =
            START_VALUES.iter().map(|&v| vec![v; dim]).collect();
        if let Some(params) = warm_start {
            starts.push(params.values());
        }

        let objective = |x: &[f64]| -> Result<f64, EpiError> {
            let params = ModelParams::from_values(kind, x)?;
            trajectory_loss(&params, initial, observed, population, &self.config.sim)
        };

        let runs = self.run_starts(&objective, &starts)?;
        let best = runs
            .into_iter()
            .min_by(|a, b| a.f.total_cmp(&b.f))
            .ok_or_else(|| EpiError::invalid_input("no optimization starts configured"))?;

        let params = ModelParams::from_values(kind, &best.x)?;
        debug!(
            "estimated {kind} over {} rows: loss {:.3e}, {} iterations, converged={}",
            observed.len(),
            best.f,
            best.iterations,
            best.converged
        );

        Ok(FitResult {
            params,
            loss: best.f,
            iterations: best.iterations,
            converged: best.converged,
        })
    }

    #[cfg(feature = "rayon")]
    fn run_starts(
        &self,
        objective: &(dyn Fn(&[f64]) -> Result<f64, EpiError> + Sync),
        starts: &[Vec<f64>],
    ) -> Result<Vec<Minimum>, EpiError> {
        starts
            .par_iter()
            .map(|start| self.run_one(objective, start))
            .collect()
    }

    #[cfg(not(feature = "rayon"))]
    fn run_starts(
        &self,
        objective: &(dyn Fn(&[f64]) -> Result<f64, EpiError> + Sync),
        starts: &[Vec<f64>],
    ) -> Result<Vec<Minimum>, EpiError> {
        starts
            .iter()
            .map(|start| self.run_one(objective, start))
            .collect()
    }

    fn run_one(
        &self,
        objective: &(dyn Fn(&[f64]) -> Result<f64, EpiError> + Sync),
        start: &[f64],
    ) -> Result<Minimum, EpiError> {
        minimize(
            objective,
            start,
            LOWER_BOUND,
            UPPER_BOUND,
            self.config.initial_step,
            self.config.max_iters,
            self.config.f_tol,
            self.config.x_tol,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{EstimatorConfig, PhaseEstimator};
    use epi_core::{CompartmentState, ObservedRecord};
    use epi_models::{simulate, ModelKind, ModelParams, SimulationConfig};

    const POPULATION: f64 = 1_000_000.0;

    fn initial() -> CompartmentState {
        CompartmentState::from_sirf(POPULATION - 1_000.0, 900.0, 90.0, 10.0)
    }

    fn synthetic_observations(params: &ModelParams, days: usize) -> Vec<ObservedRecord> {
        simulate(
            params,
            &initial(),
            days,
            POPULATION,
            &SimulationConfig::default(),
        )
        .expect("valid simulation")
        .into_iter()
        .map(|state| ObservedRecord {
            susceptible: state.susceptible,
            infected: state.infected,
            recovered: state.recovered,
            fatal: state.fatal,
        })
        .collect()
    }

    fn estimator() -> PhaseEstimator {
        PhaseEstimator::new(EstimatorConfig::default()).expect("valid config")
    }

    #[test]
    fn config_validation_rejects_bad_budgets_and_tolerances() {
        let mut config = EstimatorConfig::default();
        config.max_iters = 0;
        assert!(PhaseEstimator::new(config).is_err());

        let mut config = EstimatorConfig::default();
        config.f_tol = 0.0;
        assert!(PhaseEstimator::new(config).is_err());

        let mut config = EstimatorConfig::default();
        config.initial_step = 1.0;
        assert!(PhaseEstimator::new(config).is_err());
    }

    #[test]
    fn recovers_sir_parameters_from_noiseless_data_within_one_percent() {
        let truth = ModelParams::Sir {
            rho: 0.2,
            sigma: 0.075,
        };
        let observed = synthetic_observations(&truth, 30);

        let fit = estimator()
            .estimate(ModelKind::Sir, &observed, &initial(), POPULATION, None)
            .expect("estimation succeeds");

        assert!(fit.converged, "fit did not converge: {fit:?}");
        for ((_, fitted), (_, expected)) in fit.params.pairs().iter().zip(truth.pairs()) {
            let relative = (fitted - expected).abs() / expected;
            assert!(
                relative < 0.01,
                "parameter off by {relative:.4}: fitted {fitted}, expected {expected}"
            );
        }
    }

    #[test]
    fn warm_start_at_the_truth_reaches_a_tight_fit() {
        let truth = ModelParams::SirF {
            theta: 0.002,
            kappa: 0.005,
            rho: 0.25,
            sigma: 0.08,
        };
        let observed = synthetic_observations(&truth, 21);

        let fit = estimator()
            .estimate(
                ModelKind::SirF,
                &observed,
                &initial(),
                POPULATION,
                Some(&truth),
            )
            .expect("estimation succeeds");
        assert!(fit.rmsle() < 1e-4, "rmsle {}", fit.rmsle());
    }

    #[test]
    fn exhausted_budget_is_flagged_non_converged_not_an_error() {
        let truth = ModelParams::Sir {
            rho: 0.2,
            sigma: 0.075,
        };
        let observed = synthetic_observations(&truth, 14);

        let mut config = EstimatorConfig::default();
        config.max_iters = 2;
        let fit = PhaseEstimator::new(config)
            .expect("valid config")
            .estimate(ModelKind::Sir, &observed, &initial(), POPULATION, None)
            .expect("budget exhaustion must not error");
        assert!(!fit.converged);
        fit.params.validate().expect("best-found params stay valid");
    }

    #[test]
    fn rejects_too_few_rows_and_mismatched_warm_start() {
        let observed = synthetic_observations(
            &ModelParams::Sir {
                rho: 0.2,
                sigma: 0.075,
            },
            5,
        );

        assert!(estimator()
            .estimate(ModelKind::Sir, &observed[..1], &initial(), POPULATION, None)
            .is_err());

        let wrong_kind = ModelParams::SirF {
            theta: 0.01,
            kappa: 0.01,
            rho: 0.2,
            sigma: 0.075,
        };
        let err = estimator()
            .estimate(
                ModelKind::Sir,
                &observed,
                &initial(),
                POPULATION,
                Some(&wrong_kind),
            )
            .expect_err("kind mismatch must fail");
        assert!(err.to_string().contains("warm start"));
    }

    #[test]
    fn estimate_is_deterministic() {
        let truth = ModelParams::SirD {
            kappa: 0.003,
            rho: 0.22,
            sigma: 0.07,
        };
        let observed = synthetic_observations(&truth, 20);

        let a = estimator()
            .estimate(ModelKind::SirD, &observed, &initial(), POPULATION, None)
            .expect("run a");
        let b = estimator()
            .estimate(ModelKind::SirD, &observed, &initial(), POPULATION, None)
            .expect("run b");
        assert_eq!(a, b);
    }
}
