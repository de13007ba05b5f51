// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use crate::phase::PhaseStatus;
use crate::registry::{AddSpan, PhaseSeq};
use epi_core::{EpiError, NaiveDate, ObservedSeries};
use epi_estimate::PhaseEstimator;
use epi_models::{ModelKind, ModelParams};
use epi_trend::{transforms, TrendSegmenter};
use log::{debug, info};

/// Name of the default scenario created by [`ScenarioSet::trend`].
pub const MAIN_SCENARIO: &str = "Main";

/// Default smoothing window (days) applied before change-point detection.
pub const DEFAULT_SMOOTHING_WINDOW: usize = 7;

/// One named what-if branch: a phase sequence over the shared observations.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Scenario {
    name: String,
    phases: PhaseSeq,
}

impl Scenario {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phases(&self) -> &PhaseSeq {
        &self.phases
    }
}

/// All scenarios for one region, sharing a single observed series.
///
/// The observed series is ground truth and is never rewritten by scenario
/// edits; scenarios only disagree about phase boundaries and parameters.
#[derive(Clone, Debug)]
pub struct ScenarioSet {
    observed: ObservedSeries,
    scenarios: BTreeMap<String, Scenario>,
}

impl ScenarioSet {
    pub fn new(observed: ObservedSeries) -> Self {
        Self {
            observed,
            scenarios: BTreeMap::new(),
        }
    }

    pub fn observed(&self) -> &ObservedSeries {
        &self.observed
    }

    /// Scenario names in deterministic (lexicographic) order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scenarios.keys().map(String::as_str)
    }

    /// Scenarios in deterministic (lexicographic name) order.
    pub fn scenarios(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.values()
    }

    pub fn scenario(&self, name: &str) -> Result<&Scenario, EpiError> {
        self.scenarios
            .get(name)
            .ok_or_else(|| EpiError::invalid_input(format!("unknown scenario {name:?}")))
    }

    /// Registers a scenario under `name`; the name must be unused and the
    /// phase sequence must start on the first observed date.
    pub fn register(&mut self, name: &str, phases: PhaseSeq) -> Result<(), EpiError> {
        if self.scenarios.contains_key(name) {
            return Err(EpiError::invalid_input(format!(
                "scenario {name:?} already exists; pick another name"
            )));
        }
        if phases.span().start() != self.observed.first_date() {
            return Err(EpiError::registry_consistency(format!(
                "phases must start on the first observed date {}; got {}",
                self.observed.first_date(),
                phases.span().start()
            )));
        }
        self.scenarios.insert(
            name.to_owned(),
            Scenario {
                name: name.to_owned(),
                phases,
            },
        );
        Ok(())
    }

    /// Proposes phase boundaries from the observed confirmed curve.
    ///
    /// The curve is log-transformed and smoothed before change-point
    /// detection, so short reporting artifacts do not spawn phases.
    pub fn detect_phases(
        &self,
        kind: ModelKind,
        segmenter: &TrendSegmenter,
        smoothing_window: usize,
    ) -> Result<PhaseSeq, EpiError> {
        let curve = transforms::log10_shifted(&self.observed.confirmed_curve())?;
        let smoothed = transforms::moving_average(&curve, smoothing_window)?;
        let indices = segmenter.detect(&smoothed)?;

        let range = self.observed.range();
        let boundaries = indices
            .iter()
            .map(|&index| {
                range.date_at(index).ok_or_else(|| {
                    EpiError::numerical_issue(format!(
                        "change point index {index} falls outside the observed range"
                    ))
                })
            })
            .collect::<Result<Vec<NaiveDate>, EpiError>>()?;

        debug!(
            "trend detection proposed {} phases over {} observed days",
            boundaries.len() + 1,
            self.observed.len()
        );
        PhaseSeq::from_boundaries(range, &boundaries, kind, segmenter.config().max_phases)
    }

    /// Runs change-point detection and (re)creates the scenario `name`
    /// with the resulting pending phases.
    pub fn trend(
        &mut self,
        name: &str,
        kind: ModelKind,
        segmenter: &TrendSegmenter,
        smoothing_window: usize,
    ) -> Result<(), EpiError> {
        let phases = self.detect_phases(kind, segmenter, smoothing_window)?;
        self.scenarios.remove(name);
        self.register(name, phases)
    }

    /// Copies `from` under the new name `to`. The copy is by value: later
    /// edits to either scenario never affect the other.
    pub fn branch(&mut self, from: &str, to: &str) -> Result<(), EpiError> {
        let phases = self.scenario(from)?.phases.clone();
        self.register(to, phases)
    }

    pub fn add(&mut self, name: &str, span: AddSpan) -> Result<(), EpiError> {
        self.apply(name, |phases| phases.add(span))
    }

    pub fn add_predicted(
        &mut self,
        name: &str,
        span: AddSpan,
        params: ModelParams,
    ) -> Result<(), EpiError> {
        self.apply(name, |phases| phases.add_predicted(span, params))
    }

    pub fn delete(&mut self, name: &str, index: usize) -> Result<(), EpiError> {
        self.apply(name, |phases| phases.delete(index))
    }

    pub fn combine(&mut self, name: &str, first: usize, last: usize) -> Result<(), EpiError> {
        self.apply(name, |phases| phases.combine(first, last))
    }

    pub fn separate(&mut self, name: &str, split: NaiveDate) -> Result<(), EpiError> {
        self.apply(name, |phases| phases.separate(split))
    }

    fn apply(
        &mut self,
        name: &str,
        edit: impl FnOnce(&PhaseSeq) -> Result<PhaseSeq, EpiError>,
    ) -> Result<(), EpiError> {
        let edited = edit(&self.scenario(name)?.phases)?;
        // scenario() above proved the key exists.
        if let Some(scenario) = self.scenarios.get_mut(name) {
            scenario.phases = edited;
        }
        Ok(())
    }

    /// Estimates every pending phase of `name` in chronological order.
    ///
    /// Each phase's trajectory starts from the observed state on its start
    /// date. The warm start is the phase's own seed parameters when a range
    /// edit left some behind, otherwise the previous phase's parameters.
    /// Phases extending past the observed range are left untouched.
    ///
    /// Returns the number of phases estimated.
    pub fn estimate_all(
        &mut self,
        name: &str,
        estimator: &PhaseEstimator,
    ) -> Result<usize, EpiError> {
        let mut phases = self.scenario(name)?.phases.clone();
        let population = self.observed.population();
        let mut estimated = 0;

        for index in phases.pending_indices() {
            let phase = phases.phase(index)?;
            let range = *phase.range();
            if range.end() > self.observed.last_date() {
                debug!(
                    "scenario {name:?}: phase {index} extends past the observed range, \
                     leaving it pending"
                );
                continue;
            }

            let kind = phase.kind();
            let warm = phase
                .params()
                .copied()
                .or_else(|| self.warm_start_for(&phases, index, kind));
            let rows = self.observed.slice(&range)?;
            let initial = self.observed.state_on(range.start())?;
            let fit = estimator.estimate(kind, rows, &initial, population, warm.as_ref())?;
            phases.record_fit(index, &fit)?;
            estimated += 1;
        }

        info!("scenario {name:?}: estimated {estimated} phases");
        if let Some(scenario) = self.scenarios.get_mut(name) {
            scenario.phases = phases;
        }
        Ok(estimated)
    }

    fn warm_start_for(
        &self,
        phases: &PhaseSeq,
        index: usize,
        kind: ModelKind,
    ) -> Option<ModelParams> {
        if index == 0 {
            return None;
        }
        let previous = phases.phases().get(index - 1)?;
        previous
            .params()
            .copied()
            .filter(|params| params.kind() == kind && previous.status() != PhaseStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::{ScenarioSet, MAIN_SCENARIO};
    use crate::registry::{AddSpan, PhaseSeq};
    use chrono::NaiveDate;
    use epi_core::{ObservedRecord, ObservedSeries};
    use epi_models::ModelKind;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    fn observed(days: usize) -> ObservedSeries {
        let records = (0..days)
            .map(|day| {
                let infected = 100.0 + 10.0 * day as f64;
                ObservedRecord {
                    susceptible: 1_000_000.0 - infected,
                    infected,
                    recovered: 0.0,
                    fatal: 0.0,
                }
            })
            .collect();
        ObservedSeries::new(date(2020, 4, 1), 1_000_000.0, records).expect("valid series")
    }

    fn seq(series: &ObservedSeries, boundaries: &[NaiveDate]) -> PhaseSeq {
        PhaseSeq::from_boundaries(series.range(), boundaries, ModelKind::Sir, 12)
            .expect("valid boundaries")
    }

    #[test]
    fn register_rejects_duplicates_and_misaligned_starts() {
        let series = observed(30);
        let mut set = ScenarioSet::new(series.clone());
        set.register(MAIN_SCENARIO, seq(&series, &[]))
            .expect("first registration");
        assert!(set.register(MAIN_SCENARIO, seq(&series, &[])).is_err());

        let shifted = PhaseSeq::from_boundaries(
            epi_core::DateRange::new(date(2020, 4, 5), date(2020, 4, 30)).expect("valid"),
            &[],
            ModelKind::Sir,
            12,
        )
        .expect("valid seq");
        let err = set.register("Shifted", shifted).expect_err("must fail");
        assert!(err.to_string().contains("first observed date"));
    }

    #[test]
    fn branch_is_a_value_copy() {
        let series = observed(30);
        let mut set = ScenarioSet::new(series.clone());
        set.register(MAIN_SCENARIO, seq(&series, &[date(2020, 4, 15)]))
            .expect("registration");
        set.branch(MAIN_SCENARIO, "Lockdown").expect("branch");

        set.add("Lockdown", AddSpan::Days(14)).expect("edit branch");
        assert_eq!(set.scenario("Lockdown").expect("exists").phases().len(), 3);
        assert_eq!(
            set.scenario(MAIN_SCENARIO).expect("exists").phases().len(),
            2,
            "editing the branch must not touch the source scenario"
        );
    }

    #[test]
    fn failed_edit_leaves_the_scenario_unchanged() {
        let series = observed(30);
        let mut set = ScenarioSet::new(series.clone());
        set.register(MAIN_SCENARIO, seq(&series, &[])).expect("registration");

        assert!(set.delete(MAIN_SCENARIO, 0).is_err());
        assert_eq!(set.scenario(MAIN_SCENARIO).expect("exists").phases().len(), 1);
    }

    #[test]
    fn unknown_scenario_names_are_reported() {
        let set = ScenarioSet::new(observed(10));
        let err = set.scenario("Nope").expect_err("must fail");
        assert!(err.to_string().contains("Nope"));
    }
}
