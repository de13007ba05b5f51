// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use epi_core::DateRange;
use epi_estimate::FitResult;
use epi_models::{ModelKind, ModelParams};

/// Lifecycle of one phase's parameters.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseStatus {
    /// No parameters yet; the phase awaits estimation.
    Pending,
    /// Parameters fitted against observations, tolerances met.
    Estimated,
    /// Best-found parameters, but the optimizer ran out of budget.
    NonConverged,
    /// Parameters carried forward or projected, not fitted to data.
    Predicted,
}

impl std::fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PhaseStatus::Pending => "pending",
            PhaseStatus::Estimated => "estimated",
            PhaseStatus::NonConverged => "non-converged",
            PhaseStatus::Predicted => "predicted",
        })
    }
}

/// Fit quality recorded when a phase is estimated.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitMetrics {
    /// RMSLE of the fitted trajectory against the phase's observations.
    pub rmsle: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl FitMetrics {
    pub(crate) fn from_fit(fit: &FitResult) -> Self {
        Self {
            rmsle: fit.rmsle(),
            iterations: fit.iterations,
            converged: fit.converged,
        }
    }
}

/// One phase: an inclusive date range over which a single parameter set of
/// one model kind is assumed to hold.
///
/// Fields are private; phases are only created and rewritten through
/// [`crate::PhaseSeq`] edits and estimation, which keep the cached
/// reproduction number and fit metrics consistent with the parameters.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Phase {
    range: DateRange,
    kind: ModelKind,
    params: Option<ModelParams>,
    fit: Option<FitMetrics>,
    rt: Option<f64>,
    status: PhaseStatus,
}

impl Phase {
    pub(crate) fn pending(range: DateRange, kind: ModelKind) -> Self {
        Self {
            range,
            kind,
            params: None,
            fit: None,
            rt: None,
            status: PhaseStatus::Pending,
        }
    }

    /// Pending phase that keeps `seed` parameters as a re-estimation seed.
    /// Fit metrics and the cached reproduction number are stale after a
    /// range edit, so they are dropped.
    pub(crate) fn pending_seeded(
        range: DateRange,
        kind: ModelKind,
        seed: Option<ModelParams>,
    ) -> Self {
        Self {
            range,
            kind,
            params: seed,
            fit: None,
            rt: None,
            status: PhaseStatus::Pending,
        }
    }

    /// Phase whose parameters were carried forward rather than fitted.
    pub(crate) fn predicted(range: DateRange, params: ModelParams) -> Self {
        Self {
            range,
            kind: params.kind(),
            rt: params.rt(),
            params: Some(params),
            fit: None,
            status: PhaseStatus::Predicted,
        }
    }

    pub(crate) fn record_fit(&mut self, fit: &FitResult) {
        self.rt = fit.params.rt();
        self.params = Some(fit.params);
        self.fit = Some(FitMetrics::from_fit(fit));
        self.status = if fit.converged {
            PhaseStatus::Estimated
        } else {
            PhaseStatus::NonConverged
        };
    }

    pub fn range(&self) -> &DateRange {
        &self.range
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn params(&self) -> Option<&ModelParams> {
        self.params.as_ref()
    }

    pub fn fit(&self) -> Option<&FitMetrics> {
        self.fit.as_ref()
    }

    /// Cached effective reproduction number, when parameters are present.
    pub fn rt(&self) -> Option<f64> {
        self.rt
    }

    pub fn status(&self) -> PhaseStatus {
        self.status
    }
}
