// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Future phase prediction from external indicators.
//!
//! Regresses each model parameter on an indicator series (e.g. a policy
//! stringency index) across estimated phase transitions, then projects
//! future phases recursively. Projections are hypotheses: downstream they
//! stay flagged as predicted and are never confused with fitted phases.

mod predictor;

pub use predictor::{Predictor, PredictorConfig};

use epi_core::{EpiError, IndicatorSeries};
use epi_scenario::{AddSpan, ScenarioSet};

/// Builds scenario `to` as a copy of `from` extended by `horizon_days` of
/// predicted phases.
///
/// Atomic: the new scenario appears only if regression, projection, and
/// every phase append succeed; `from` is never modified.
pub fn forecast_scenario(
    set: &mut ScenarioSet,
    from: &str,
    to: &str,
    indicator: &IndicatorSeries,
    config: PredictorConfig,
    horizon_days: usize,
) -> Result<(), EpiError> {
    let source = set.scenario(from)?.phases().clone();
    let predictor = Predictor::fit(&source, indicator, config)?;

    let mut phases = source;
    for (range, params) in predictor.project(indicator, horizon_days)? {
        phases = phases.add_predicted(AddSpan::ThroughDate(range.end()), params)?;
    }
    set.register(to, phases)
}
