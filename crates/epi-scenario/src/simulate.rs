// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::scenario::ScenarioSet;
use epi_core::{EpiError, NaiveDate};
use epi_eval::Metric;
use epi_models::{simulate, SimulationConfig};

/// One simulated day of a scenario trajectory.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrajectoryRow {
    pub date: NaiveDate,
    pub susceptible: f64,
    pub infected: f64,
    pub recovered: f64,
    pub fatal: f64,
}

impl TrajectoryRow {
    pub fn confirmed(&self) -> f64 {
        self.infected + self.recovered + self.fatal
    }
}

impl ScenarioSet {
    /// Simulates the scenario `name` across its full phase span.
    ///
    /// The trajectory starts from the observed state on the first phase's
    /// start date; each later phase continues from the previous phase's end
    /// state, so compartments are continuous across phase boundaries even
    /// when the model kind changes. Every phase must carry parameters.
    pub fn simulate(
        &self,
        name: &str,
        config: &SimulationConfig,
    ) -> Result<Vec<TrajectoryRow>, EpiError> {
        let scenario = self.scenario(name)?;
        let phases = scenario.phases().phases();

        if let Some(index) = phases.iter().position(|phase| phase.params().is_none()) {
            return Err(EpiError::invalid_input(format!(
                "scenario {name:?} phase {index} has no parameters; \
                 estimate or predict before simulating"
            )));
        }

        let population = self.observed().population();
        let first_start = phases[0].range().start();
        let mut state = self.observed().state_on(first_start)?;
        let mut cursor = first_start;

        let mut rows = Vec::with_capacity(scenario.phases().span().len_days());
        rows.push(row_from(first_start, &state));

        for phase in phases {
            let end = phase.range().end();
            let days = (end - cursor).num_days() as usize;
            if days == 0 {
                // Single-day first phase; its state is the initial row.
                continue;
            }
            // Checked above.
            let params = phase.params().ok_or_else(|| {
                EpiError::invalid_input("phase lost its parameters mid-simulation")
            })?;
            let states = simulate(params, &state, days, population, config)?;
            for (offset, day_state) in states.iter().enumerate().skip(1) {
                let date = cursor + chrono::Days::new(offset as u64);
                rows.push(row_from(date, day_state));
            }
            state = states[states.len() - 1];
            cursor = end;
        }

        Ok(rows)
    }

    /// Scores the scenario's simulated trajectory against the observations
    /// it overlaps, flattening confirmed, infected, recovered, and fatal
    /// into one comparison vector.
    pub fn score(
        &self,
        name: &str,
        metric: Metric,
        config: &SimulationConfig,
    ) -> Result<f64, EpiError> {
        let trajectory = self.simulate(name, config)?;

        let mut predicted = Vec::new();
        let mut actual = Vec::new();
        for row in &trajectory {
            let Some(record) = self.observed().record_on(row.date) else {
                continue;
            };
            predicted.extend([row.confirmed(), row.infected, row.recovered, row.fatal]);
            actual.extend([record.confirmed(), record.infected, record.recovered, record.fatal]);
        }
        if actual.is_empty() {
            return Err(EpiError::invalid_input(format!(
                "scenario {name:?} does not overlap the observed range; nothing to score"
            )));
        }

        epi_eval::score(&predicted, &actual, metric)
    }
}

fn row_from(date: NaiveDate, state: &epi_core::CompartmentState) -> TrajectoryRow {
    TrajectoryRow {
        date,
        susceptible: state.susceptible,
        infected: state.infected,
        recovered: state.recovered,
        fatal: state.fatal,
    }
}
