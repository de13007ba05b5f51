// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::{simulate, ModelParams, SimulationConfig};
use epi_core::{CompartmentState, EpiError, ObservedRecord};

/// Mean squared log-error between a simulated trajectory and observed rows.
///
/// The trajectory starts from `initial` (the observed state at the phase
/// start) and is compared on the infected, recovered, and fatal columns.
/// Log scaling keeps the loss comparable across model kinds and across
/// phases with very different case magnitudes.
pub fn trajectory_loss(
    params: &ModelParams,
    initial: &CompartmentState,
    observed: &[ObservedRecord],
    population: f64,
    config: &SimulationConfig,
) -> Result<f64, EpiError> {
    if observed.is_empty() {
        return Err(EpiError::invalid_input(
            "trajectory loss requires at least one observed row",
        ));
    }

    let simulated = simulate(params, initial, observed.len() - 1, population, config)?;

    let mut total = 0.0;
    let mut count = 0usize;
    for (sim, obs) in simulated.iter().zip(observed) {
        for (sim_value, obs_value) in [
            (sim.infected, obs.infected),
            (sim.recovered, obs.recovered),
            (sim.fatal, obs.fatal),
        ] {
            let diff = (1.0 + sim_value).ln() - (1.0 + obs_value).ln();
            total += diff * diff;
            count += 1;
        }
    }

    let loss = total / count as f64;
    if !loss.is_finite() {
        return Err(EpiError::numerical_issue(format!(
            "trajectory loss is not finite: {loss}"
        )));
    }
    Ok(loss)
}

/// Root of [`trajectory_loss`]: the RMSLE fit-quality score reported on
/// phase summaries.
pub fn trajectory_rmsle(
    params: &ModelParams,
    initial: &CompartmentState,
    observed: &[ObservedRecord],
    population: f64,
    config: &SimulationConfig,
) -> Result<f64, EpiError> {
    Ok(trajectory_loss(params, initial, observed, population, config)?.sqrt())
}
