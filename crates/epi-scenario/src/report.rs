// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::phase::PhaseStatus;
use crate::scenario::{Scenario, ScenarioSet};
use epi_core::{EpiError, NaiveDate};

/// One phase of one scenario, flattened for tabular display.
///
/// Output-only: parameter names borrow the model's static tables, so the
/// row serializes but is never read back.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct PhaseSummaryRow {
    pub scenario: String,
    pub phase: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub model: &'static str,
    pub status: PhaseStatus,
    /// `(name, value)` pairs in the model's canonical order; empty while
    /// the phase is pending.
    pub params: Vec<(&'static str, f64)>,
    pub rt: Option<f64>,
    pub rmsle: Option<f64>,
}

/// Per-phase series selectable by [`ScenarioSet::history`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HistoryTarget {
    /// Effective reproduction number.
    Rt,
    /// A named model parameter, e.g. `"rho"`.
    Param(String),
}

/// Parameter values of one phase relative to the first parametrized phase.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct RateRow {
    pub phase: usize,
    pub start: NaiveDate,
    /// `(name, value / baseline)` pairs; pairs whose baseline is zero are
    /// omitted.
    pub ratios: Vec<(&'static str, f64)>,
}

fn summary_rows(scenario: &Scenario) -> Vec<PhaseSummaryRow> {
    scenario
        .phases()
        .phases()
        .iter()
        .enumerate()
        .map(|(index, phase)| PhaseSummaryRow {
            scenario: scenario.name().to_owned(),
            phase: index,
            start: phase.range().start(),
            end: phase.range().end(),
            model: phase.kind().name(),
            status: phase.status(),
            params: phase.params().map(|p| p.pairs()).unwrap_or_default(),
            rt: phase.rt(),
            rmsle: phase.fit().map(|fit| fit.rmsle),
        })
        .collect()
}

impl ScenarioSet {
    /// Summary rows for every scenario, ordered by scenario name then
    /// phase index.
    pub fn summary(&self) -> Vec<PhaseSummaryRow> {
        self.scenarios().flat_map(summary_rows).collect()
    }

    /// Summary rows for one scenario.
    pub fn summary_of(&self, name: &str) -> Result<Vec<PhaseSummaryRow>, EpiError> {
        Ok(summary_rows(self.scenario(name)?))
    }

    /// Daily values of `target` across one scenario's phases, one row per
    /// date. Phases without the requested value are skipped, so a partly
    /// estimated scenario still yields its estimated stretch.
    pub fn history(
        &self,
        name: &str,
        target: &HistoryTarget,
    ) -> Result<Vec<(NaiveDate, f64)>, EpiError> {
        let scenario = self.scenario(name)?;
        let mut rows = Vec::new();
        for phase in scenario.phases().phases() {
            let value = match target {
                HistoryTarget::Rt => phase.rt(),
                HistoryTarget::Param(param) => {
                    phase.params().and_then(|params| params.get(param))
                }
            };
            let Some(value) = value else { continue };
            rows.extend(phase.range().iter_days().map(|date| (date, value)));
        }
        Ok(rows)
    }

    /// Parameter values of each parametrized phase relative to the first
    /// parametrized phase, for spotting which rate drove a trend change.
    ///
    /// Only phases of the same model kind as the baseline are compared.
    pub fn history_rate(&self, name: &str) -> Result<Vec<RateRow>, EpiError> {
        let scenario = self.scenario(name)?;
        let phases = scenario.phases().phases();

        let baseline = phases
            .iter()
            .find_map(|phase| phase.params())
            .ok_or_else(|| {
                EpiError::invalid_input(format!(
                    "scenario {name:?} has no parametrized phase to use as a baseline"
                ))
            })?;
        let base_pairs = baseline.pairs();

        Ok(phases
            .iter()
            .enumerate()
            .filter_map(|(index, phase)| {
                let params = phase.params()?;
                if params.kind() != baseline.kind() {
                    return None;
                }
                let ratios = params
                    .pairs()
                    .into_iter()
                    .zip(&base_pairs)
                    .filter(|(_, (_, base))| *base != 0.0)
                    .map(|((param, value), (_, base))| (param, value / base))
                    .collect();
                Some(RateRow {
                    phase: index,
                    start: phase.range().start(),
                    ratios,
                })
            })
            .collect())
    }
}
