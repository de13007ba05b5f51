// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::phase::{Phase, PhaseStatus};
use epi_core::{DateRange, EpiError, NaiveDate};
use epi_estimate::FitResult;
use epi_models::{ModelKind, ModelParams};

/// How far past the current last phase an added phase should extend.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddSpan {
    /// New phase ends on the given date (inclusive).
    ThroughDate(NaiveDate),
    /// New phase covers this many days.
    Days(usize),
}

/// Ordered, gap-free sequence of phases covering one contiguous date span.
///
/// Every edit is apply-or-reject: methods take `&self`, build the edited
/// sequence, validate it, and return it. On error the original sequence is
/// untouched, so a caller never observes a half-applied edit.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct PhaseSeq {
    phases: Vec<Phase>,
    max_phases: usize,
}

impl PhaseSeq {
    /// Builds the initial sequence from change-point boundary dates.
    ///
    /// `boundaries` are the start dates of the second and later phases;
    /// they must be strictly increasing and lie strictly inside `span`.
    /// An empty slice yields a single phase covering all of `span`.
    pub fn from_boundaries(
        span: DateRange,
        boundaries: &[NaiveDate],
        kind: ModelKind,
        max_phases: usize,
    ) -> Result<Self, EpiError> {
        if max_phases == 0 {
            return Err(EpiError::invalid_input("max_phases must be >= 1"));
        }
        for window in boundaries.windows(2) {
            if window[0] >= window[1] {
                return Err(EpiError::invalid_input(format!(
                    "phase boundaries must be strictly increasing; got {} then {}",
                    window[0], window[1]
                )));
            }
        }

        let mut phases = Vec::with_capacity(boundaries.len() + 1);
        let mut rest = span;
        for &boundary in boundaries {
            let (head, tail) = rest.split_at(boundary)?;
            phases.push(Phase::pending(head, kind));
            rest = tail;
        }
        phases.push(Phase::pending(rest, kind));
        Self::validated(phases, max_phases)
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn phase(&self, index: usize) -> Result<&Phase, EpiError> {
        self.phases.get(index).ok_or_else(|| {
            EpiError::registry_consistency(format!(
                "phase index {index} out of bounds for {} phases",
                self.phases.len()
            ))
        })
    }

    pub fn max_phases(&self) -> usize {
        self.max_phases
    }

    /// Full span covered by the sequence.
    pub fn span(&self) -> DateRange {
        // Non-empty by construction.
        let first = self.phases[0].range();
        let last = self.phases[self.phases.len() - 1].range();
        first.hull(last)
    }

    /// Appends a phase after the last one.
    ///
    /// When the last phase has parameters they are carried forward and the
    /// new phase is flagged [`PhaseStatus::Predicted`]; otherwise it is
    /// pending.
    pub fn add(&self, span: AddSpan) -> Result<Self, EpiError> {
        let last = &self.phases[self.phases.len() - 1];
        let range = self.added_range(span)?;
        let phase = match last.params() {
            Some(params) => Phase::predicted(range, *params),
            None => Phase::pending(range, last.kind()),
        };
        let mut phases = self.phases.clone();
        phases.push(phase);
        Self::validated(phases, self.max_phases)
    }

    /// Appends a phase with externally supplied parameters (e.g. projected
    /// from indicator regression), flagged [`PhaseStatus::Predicted`].
    pub fn add_predicted(&self, span: AddSpan, params: ModelParams) -> Result<Self, EpiError> {
        params.validate()?;
        let range = self.added_range(span)?;
        let mut phases = self.phases.clone();
        phases.push(Phase::predicted(range, params));
        Self::validated(phases, self.max_phases)
    }

    fn added_range(&self, span: AddSpan) -> Result<DateRange, EpiError> {
        let last = self.phases[self.phases.len() - 1].range();
        match span {
            AddSpan::Days(days) => last.following_days(days),
            AddSpan::ThroughDate(end) => {
                let start = last.next_day()?;
                DateRange::new(start, end).map_err(|_| {
                    EpiError::registry_consistency(format!(
                        "added phase must end on or after {start}; got {end}"
                    ))
                })
            }
        }
    }

    /// Removes the phase at `index`, merging its dates into the following
    /// phase (or the preceding one when the last phase is deleted). The
    /// survivor keeps its parameter values as a re-estimation seed but
    /// returns to pending.
    pub fn delete(&self, index: usize) -> Result<Self, EpiError> {
        self.phase(index)?;
        if self.phases.len() == 1 {
            return Err(EpiError::registry_consistency(
                "cannot delete the only phase; the registry must stay non-empty",
            ));
        }

        let mut phases = self.phases.clone();
        let removed = phases.remove(index);
        let (survivor_index, merged) = if index < phases.len() {
            let survivor = &phases[index];
            (index, removed.range().join(survivor.range())?)
        } else {
            let survivor = &phases[index - 1];
            (index - 1, survivor.range().join(removed.range())?)
        };
        let survivor = &phases[survivor_index];
        let replacement =
            Phase::pending_seeded(merged, survivor.kind(), survivor.params().copied());
        phases[survivor_index] = replacement;
        Self::validated(phases, self.max_phases)
    }

    /// Merges phases `first..=last` into one pending phase.
    ///
    /// The merged phase keeps the kind of `first` and has no parameters;
    /// the constituents were fitted separately, so neither set describes
    /// the union.
    pub fn combine(&self, first: usize, last: usize) -> Result<Self, EpiError> {
        if first >= last {
            return Err(EpiError::registry_consistency(format!(
                "combine requires first < last; got {first} and {last}"
            )));
        }
        self.phase(last)?;

        let range = self.phases[first].range().hull(self.phases[last].range());
        let mut phases = Vec::with_capacity(self.phases.len() - (last - first));
        phases.extend_from_slice(&self.phases[..first]);
        phases.push(Phase::pending(range, self.phases[first].kind()));
        phases.extend_from_slice(&self.phases[last + 1..]);
        Self::validated(phases, self.max_phases)
    }

    /// Splits the phase containing `split` into two pending phases, the
    /// second starting on `split`. Both halves keep the original parameter
    /// values as re-estimation seeds.
    pub fn separate(&self, split: NaiveDate) -> Result<Self, EpiError> {
        let index = self
            .phases
            .iter()
            .position(|phase| phase.range().contains(split))
            .ok_or_else(|| {
                EpiError::registry_consistency(format!(
                    "no phase contains the split date {split}"
                ))
            })?;
        let target = &self.phases[index];
        let (head, tail) = target.range().split_at(split).map_err(|_| {
            EpiError::registry_consistency(format!(
                "split date {split} must lie strictly inside phase {index} ({} to {})",
                target.range().start(),
                target.range().end()
            ))
        })?;

        let seed = target.params().copied();
        let mut phases = self.phases.clone();
        phases[index] = Phase::pending_seeded(head, target.kind(), seed);
        phases.insert(index + 1, Phase::pending_seeded(tail, target.kind(), seed));
        Self::validated(phases, self.max_phases)
    }

    /// Stores an estimation result on the phase at `index`, refreshing the
    /// cached reproduction number and fit metrics.
    pub fn record_fit(&mut self, index: usize, fit: &FitResult) -> Result<(), EpiError> {
        self.phase(index)?;
        self.phases[index].record_fit(fit);
        Ok(())
    }

    /// Phases awaiting estimation, in chronological order.
    pub fn pending_indices(&self) -> Vec<usize> {
        self.phases
            .iter()
            .enumerate()
            .filter(|(_, phase)| phase.status() == PhaseStatus::Pending)
            .map(|(index, _)| index)
            .collect()
    }

    fn validated(phases: Vec<Phase>, max_phases: usize) -> Result<Self, EpiError> {
        if phases.is_empty() {
            return Err(EpiError::registry_consistency(
                "phase registry must contain at least one phase",
            ));
        }
        if phases.len() > max_phases {
            return Err(EpiError::registry_consistency(format!(
                "{} phases exceed the configured maximum of {max_phases}",
                phases.len()
            )));
        }
        for (index, pair) in phases.windows(2).enumerate() {
            let expected = pair[0].range().next_day()?;
            if pair[1].range().start() != expected {
                return Err(EpiError::registry_consistency(format!(
                    "phase {} must start on {expected}, the day after phase {index} ends; \
                     got {}",
                    index + 1,
                    pair[1].range().start()
                )));
            }
        }
        Ok(Self { phases, max_phases })
    }
}

#[cfg(test)]
mod tests {
    use super::{AddSpan, PhaseSeq};
    use crate::phase::PhaseStatus;
    use chrono::NaiveDate;
    use epi_core::DateRange;
    use epi_models::ModelKind;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    fn span() -> DateRange {
        DateRange::new(date(2020, 4, 1), date(2020, 6, 30)).expect("valid span")
    }

    fn three_phases() -> PhaseSeq {
        PhaseSeq::from_boundaries(
            span(),
            &[date(2020, 5, 1), date(2020, 6, 1)],
            ModelKind::SirF,
            12,
        )
        .expect("valid boundaries")
    }

    fn assert_contiguous(seq: &PhaseSeq) {
        for pair in seq.phases().windows(2) {
            let next = pair[0].range().next_day().expect("no overflow");
            assert_eq!(pair[1].range().start(), next);
        }
    }

    #[test]
    fn from_boundaries_maps_change_points_to_phase_starts() {
        let seq = three_phases();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.phases()[0].range().start(), date(2020, 4, 1));
        assert_eq!(seq.phases()[0].range().end(), date(2020, 4, 30));
        assert_eq!(seq.phases()[1].range().start(), date(2020, 5, 1));
        assert_eq!(seq.phases()[2].range().end(), date(2020, 6, 30));
        assert!(seq
            .phases()
            .iter()
            .all(|p| p.status() == PhaseStatus::Pending));
        assert_contiguous(&seq);
    }

    #[test]
    fn from_boundaries_rejects_unordered_and_out_of_span_dates() {
        let unordered = [date(2020, 6, 1), date(2020, 5, 1)];
        assert!(
            PhaseSeq::from_boundaries(span(), &unordered, ModelKind::Sir, 12).is_err()
        );
        let outside = [date(2020, 7, 15)];
        assert!(PhaseSeq::from_boundaries(span(), &outside, ModelKind::Sir, 12).is_err());
        let at_start = [date(2020, 4, 1)];
        assert!(PhaseSeq::from_boundaries(span(), &at_start, ModelKind::Sir, 12).is_err());
    }

    #[test]
    fn empty_boundaries_yield_a_single_phase() {
        let seq = PhaseSeq::from_boundaries(span(), &[], ModelKind::Sir, 12)
            .expect("single phase is valid");
        assert_eq!(seq.len(), 1);
        assert_eq!(seq.span(), span());
    }

    #[test]
    fn add_without_parameters_appends_a_pending_phase() {
        let seq = three_phases().add(AddSpan::Days(14)).expect("valid add");
        assert_eq!(seq.len(), 4);
        let added = &seq.phases()[3];
        assert_eq!(added.range().start(), date(2020, 7, 1));
        assert_eq!(added.range().end(), date(2020, 7, 14));
        assert_eq!(added.status(), PhaseStatus::Pending);
        assert_contiguous(&seq);
    }

    #[test]
    fn add_through_date_rejects_dates_before_the_next_day() {
        let err = three_phases()
            .add(AddSpan::ThroughDate(date(2020, 6, 15)))
            .expect_err("end before start must fail");
        assert!(err.to_string().contains("must end on or after"));
    }

    #[test]
    fn add_predicted_carries_the_supplied_parameters() {
        let params = epi_models::ModelParams::Sir { rho: 0.12, sigma: 0.08 };
        let seq = three_phases()
            .add_predicted(AddSpan::Days(7), params)
            .expect("valid add");
        let added = &seq.phases()[3];
        assert_eq!(added.status(), PhaseStatus::Predicted);
        assert_eq!(added.params(), Some(&params));
        assert_eq!(added.kind(), ModelKind::Sir);
        assert!(added.rt().is_some());

        let invalid = epi_models::ModelParams::Sir { rho: 1.5, sigma: 0.08 };
        assert!(three_phases().add_predicted(AddSpan::Days(7), invalid).is_err());
    }

    #[test]
    fn delete_merges_into_the_following_phase() {
        let seq = three_phases().delete(0).expect("valid delete");
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.phases()[0].range().start(), date(2020, 4, 1));
        assert_eq!(seq.phases()[0].range().end(), date(2020, 5, 31));
        assert_eq!(seq.phases()[0].status(), PhaseStatus::Pending);
        assert_eq!(seq.span(), span());
        assert_contiguous(&seq);
    }

    #[test]
    fn delete_of_the_last_phase_merges_into_the_preceding_one() {
        let seq = three_phases().delete(2).expect("valid delete");
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.phases()[1].range().start(), date(2020, 5, 1));
        assert_eq!(seq.phases()[1].range().end(), date(2020, 6, 30));
        assert_eq!(seq.span(), span());
    }

    #[test]
    fn delete_of_the_only_phase_is_rejected_and_leaves_the_registry_usable() {
        let seq = PhaseSeq::from_boundaries(span(), &[], ModelKind::Sir, 12)
            .expect("single phase");
        let err = seq.delete(0).expect_err("must fail");
        assert!(err.to_string().contains("only phase"));
        // Apply-or-reject: the original is untouched.
        assert_eq!(seq.len(), 1);
        assert_eq!(seq.span(), span());
    }

    #[test]
    fn combine_then_separate_restores_the_original_ranges() {
        let original = three_phases();
        let combined = original.combine(0, 1).expect("valid combine");
        assert_eq!(combined.len(), 2);
        assert_eq!(combined.phases()[0].range().start(), date(2020, 4, 1));
        assert_eq!(combined.phases()[0].range().end(), date(2020, 5, 31));
        assert_eq!(combined.phases()[0].status(), PhaseStatus::Pending);

        let separated = combined.separate(date(2020, 5, 1)).expect("valid separate");
        assert_eq!(separated.len(), 3);
        for (restored, expected) in separated.phases().iter().zip(original.phases()) {
            assert_eq!(restored.range(), expected.range());
        }
    }

    #[test]
    fn separate_rejects_phase_start_dates_and_uncovered_dates() {
        let seq = three_phases();
        assert!(seq.separate(date(2020, 5, 1)).is_err());
        assert!(seq.separate(date(2020, 7, 15)).is_err());
    }

    #[test]
    fn add_beyond_max_phases_is_rejected() {
        let seq = PhaseSeq::from_boundaries(span(), &[date(2020, 5, 1)], ModelKind::Sir, 2)
            .expect("two phases fit");
        let err = seq.add(AddSpan::Days(7)).expect_err("cap must hold");
        assert!(err.to_string().contains("maximum"));
        assert_eq!(seq.len(), 2);
    }
}
