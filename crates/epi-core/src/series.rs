// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::{CompartmentState, DateRange, EpiError};
use chrono::NaiveDate;

/// One day of observed compartment counts.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObservedRecord {
    pub susceptible: f64,
    pub infected: f64,
    pub recovered: f64,
    pub fatal: f64,
}

impl ObservedRecord {
    pub fn confirmed(&self) -> f64 {
        self.infected + self.recovered + self.fatal
    }

    fn validate(&self, index: usize) -> Result<(), EpiError> {
        for (name, value) in [
            ("susceptible", self.susceptible),
            ("infected", self.infected),
            ("recovered", self.recovered),
            ("fatal", self.fatal),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EpiError::invalid_input(format!(
                    "observed {name} at row {index} must be finite and >= 0; got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Gap-free daily series of observed compartment counts.
///
/// The series is ground truth: it is loaded once, may be extended when new
/// observations arrive, and is never otherwise mutated. Row `k` holds the
/// observation for `first_date + k` days, so daily contiguity holds by
/// construction.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ObservedSeries {
    first_date: NaiveDate,
    population: f64,
    records: Vec<ObservedRecord>,
}

impl ObservedSeries {
    /// Constructs a validated series.
    ///
    /// Requires `population > 0`, at least one record, and every record
    /// finite and non-negative.
    pub fn new(
        first_date: NaiveDate,
        population: f64,
        records: Vec<ObservedRecord>,
    ) -> Result<Self, EpiError> {
        if !population.is_finite() || population <= 0.0 {
            return Err(EpiError::invalid_parameter(format!(
                "population must be finite and > 0; got {population}"
            )));
        }
        if records.is_empty() {
            return Err(EpiError::invalid_input(
                "observed series requires at least one record",
            ));
        }
        for (index, record) in records.iter().enumerate() {
            record.validate(index)?;
        }
        Ok(Self {
            first_date,
            population,
            records,
        })
    }

    pub fn first_date(&self) -> NaiveDate {
        self.first_date
    }

    pub fn last_date(&self) -> NaiveDate {
        // Non-empty by construction; len >= 1 so the offset fits.
        self.first_date + chrono::Days::new(self.records.len() as u64 - 1)
    }

    pub fn population(&self) -> f64 {
        self.population
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Full observed range.
    pub fn range(&self) -> DateRange {
        DateRange::new_unchecked(self.first_date, self.last_date())
    }

    pub fn records(&self) -> &[ObservedRecord] {
        &self.records
    }

    /// Row index for `date`, if observed.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.range().offset_of(date)
    }

    /// Observation on `date`.
    pub fn record_on(&self, date: NaiveDate) -> Option<&ObservedRecord> {
        self.index_of(date).map(|idx| &self.records[idx])
    }

    /// Observed compartment state on `date`, usable as an initial condition.
    pub fn state_on(&self, date: NaiveDate) -> Result<CompartmentState, EpiError> {
        let record = self.record_on(date).ok_or_else(|| {
            EpiError::invalid_input(format!(
                "date {date} is outside the observed range {} to {}",
                self.first_date,
                self.last_date()
            ))
        })?;
        Ok(CompartmentState::from_sirf(
            record.susceptible,
            record.infected,
            record.recovered,
            record.fatal,
        ))
    }

    /// Contiguous rows covering `range`, which must lie inside the series.
    pub fn slice(&self, range: &DateRange) -> Result<&[ObservedRecord], EpiError> {
        let start = self.index_of(range.start()).ok_or_else(|| {
            EpiError::invalid_input(format!(
                "range start {} is outside the observed series",
                range.start()
            ))
        })?;
        let end = self.index_of(range.end()).ok_or_else(|| {
            EpiError::invalid_input(format!(
                "range end {} is outside the observed series",
                range.end()
            ))
        })?;
        Ok(&self.records[start..=end])
    }

    /// Per-date cumulative confirmed counts for the whole series.
    pub fn confirmed_curve(&self) -> Vec<f64> {
        self.records.iter().map(ObservedRecord::confirmed).collect()
    }

    /// Appends newly arrived daily observations; existing rows are untouched.
    pub fn extend(&mut self, new_records: Vec<ObservedRecord>) -> Result<(), EpiError> {
        let base = self.records.len();
        for (offset, record) in new_records.iter().enumerate() {
            record.validate(base + offset)?;
        }
        self.records.extend(new_records);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ObservedRecord, ObservedSeries};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    fn record(infected: f64, recovered: f64, fatal: f64) -> ObservedRecord {
        ObservedRecord {
            susceptible: 1_000_000.0 - infected - recovered - fatal,
            infected,
            recovered,
            fatal,
        }
    }

    fn series() -> ObservedSeries {
        ObservedSeries::new(
            date(2020, 4, 1),
            1_000_000.0,
            vec![record(10.0, 0.0, 0.0), record(14.0, 1.0, 0.0), record(20.0, 2.0, 1.0)],
        )
        .expect("valid series")
    }

    #[test]
    fn new_rejects_non_positive_population() {
        let err = ObservedSeries::new(date(2020, 4, 1), 0.0, vec![record(1.0, 0.0, 0.0)])
            .expect_err("population 0 must fail");
        assert!(err.to_string().contains("population"));
    }

    #[test]
    fn new_rejects_empty_and_negative_records() {
        assert!(ObservedSeries::new(date(2020, 4, 1), 1000.0, vec![]).is_err());

        let bad = ObservedRecord {
            susceptible: 990.0,
            infected: -5.0,
            recovered: 0.0,
            fatal: 0.0,
        };
        let err = ObservedSeries::new(date(2020, 4, 1), 1000.0, vec![bad])
            .expect_err("negative count must fail");
        assert!(err.to_string().contains("row 0"));
    }

    #[test]
    fn dates_and_indices_are_daily_contiguous() {
        let s = series();
        assert_eq!(s.first_date(), date(2020, 4, 1));
        assert_eq!(s.last_date(), date(2020, 4, 3));
        assert_eq!(s.len(), 3);
        assert_eq!(s.index_of(date(2020, 4, 2)), Some(1));
        assert_eq!(s.index_of(date(2020, 4, 4)), None);
    }

    #[test]
    fn state_on_maps_observation_to_initial_condition() {
        let s = series();
        let state = s.state_on(date(2020, 4, 3)).expect("date observed");
        assert_eq!(state.infected, 20.0);
        assert_eq!(state.confirmed(), 23.0);
        assert!(s.state_on(date(2020, 3, 31)).is_err());
    }

    #[test]
    fn slice_returns_inclusive_rows() {
        let s = series();
        let range = crate::DateRange::new(date(2020, 4, 2), date(2020, 4, 3)).expect("valid");
        let rows = s.slice(&range).expect("range observed");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].infected, 14.0);
    }

    #[test]
    fn confirmed_curve_is_cumulative_by_row() {
        let s = series();
        assert_eq!(s.confirmed_curve(), vec![10.0, 15.0, 23.0]);
    }

    #[test]
    fn extend_appends_without_touching_history() {
        let mut s = series();
        let before = s.records()[0];
        s.extend(vec![record(25.0, 4.0, 1.0)]).expect("valid extension");
        assert_eq!(s.len(), 4);
        assert_eq!(s.last_date(), date(2020, 4, 4));
        assert_eq!(s.records()[0], before);

        let bad = ObservedRecord {
            susceptible: f64::INFINITY,
            infected: 0.0,
            recovered: 0.0,
            fatal: 0.0,
        };
        assert!(s.extend(vec![bad]).is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn series_serde_roundtrip() {
        let s = series();
        let encoded = serde_json::to_string(&s).expect("series should serialize");
        let decoded: ObservedSeries = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(decoded, s);
    }
}
