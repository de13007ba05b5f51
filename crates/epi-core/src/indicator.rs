// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::EpiError;
use chrono::NaiveDate;

/// Auxiliary policy/behavior indicator series (e.g. stringency index).
///
/// Not owned by the engine: read-only input to the predictor. Points need
/// not be daily, only date-ordered; joining to phase boundaries carries the
/// latest value on or before the boundary forward.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct IndicatorSeries {
    points: Vec<(NaiveDate, f64)>,
}

impl IndicatorSeries {
    /// Constructs a validated series: strictly increasing dates, finite
    /// values, at least one point.
    pub fn new(points: Vec<(NaiveDate, f64)>) -> Result<Self, EpiError> {
        if points.is_empty() {
            return Err(EpiError::invalid_input(
                "indicator series requires at least one point",
            ));
        }
        for window in points.windows(2) {
            if window[1].0 <= window[0].0 {
                return Err(EpiError::invalid_input(format!(
                    "indicator dates must be strictly increasing: {} then {}",
                    window[0].0, window[1].0
                )));
            }
        }
        if let Some((date, value)) = points.iter().find(|(_, v)| !v.is_finite()) {
            return Err(EpiError::invalid_input(format!(
                "indicator value on {date} must be finite; got {value}"
            )));
        }
        Ok(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.points[0].0
    }

    pub fn last_date(&self) -> NaiveDate {
        self.points[self.points.len() - 1].0
    }

    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    /// Latest value on or before `date`, or `None` before the first point.
    pub fn value_on_or_before(&self, date: NaiveDate) -> Option<f64> {
        match self.points.partition_point(|(d, _)| *d <= date) {
            0 => None,
            idx => Some(self.points[idx - 1].1),
        }
    }
}
