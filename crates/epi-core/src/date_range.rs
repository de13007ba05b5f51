// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::EpiError;
use chrono::{Days, NaiveDate};

/// Inclusive date range at daily granularity.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Constructs a validated range with `start <= end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, EpiError> {
        if start > end {
            return Err(EpiError::invalid_input(format!(
                "date range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Range already known to be ordered (e.g. derived from a non-empty
    /// series). Callers inside the crate uphold `start <= end`.
    pub(crate) fn new_unchecked(start: NaiveDate, end: NaiveDate) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered, both endpoints included.
    pub fn len_days(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Day offset of `date` from the range start, if contained.
    pub fn offset_of(&self, date: NaiveDate) -> Option<usize> {
        self.contains(date)
            .then(|| (date - self.start).num_days() as usize)
    }

    /// Date at day offset `offset` from the start, if contained.
    pub fn date_at(&self, offset: usize) -> Option<NaiveDate> {
        let date = self.start.checked_add_days(Days::new(offset as u64))?;
        self.contains(date).then_some(date)
    }

    /// Splits into `[start, split - 1]` and `[split, end]`.
    ///
    /// `split` must lie strictly inside the range so both halves are
    /// non-empty.
    pub fn split_at(&self, split: NaiveDate) -> Result<(Self, Self), EpiError> {
        if split <= self.start || split > self.end {
            return Err(EpiError::invalid_input(format!(
                "split date {split} must satisfy {} < split <= {}",
                self.start, self.end
            )));
        }
        let before_split = split
            .pred_opt()
            .ok_or_else(|| EpiError::invalid_input("split date underflows the calendar"))?;
        Ok((
            Self {
                start: self.start,
                end: before_split,
            },
            Self {
                start: split,
                end: self.end,
            },
        ))
    }

    /// Smallest range containing both this range and `other`.
    pub fn hull(&self, other: &Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Range spanning this range and `other`; they must be adjacent
    /// (`other` starts the day after this range ends).
    pub fn join(&self, other: &Self) -> Result<Self, EpiError> {
        let expected = self
            .end
            .succ_opt()
            .ok_or_else(|| EpiError::invalid_input("range end overflows the calendar"))?;
        if other.start != expected {
            return Err(EpiError::invalid_input(format!(
                "ranges are not adjacent: {} ends {}, next starts {}",
                self.start, self.end, other.start
            )));
        }
        Ok(Self {
            start: self.start,
            end: other.end,
        })
    }

    /// The day immediately after this range, usable as the next phase start.
    pub fn next_day(&self) -> Result<NaiveDate, EpiError> {
        self.end
            .succ_opt()
            .ok_or_else(|| EpiError::invalid_input("range end overflows the calendar"))
    }

    /// Range of `days` days beginning the day after this range.
    pub fn following_days(&self, days: usize) -> Result<Self, EpiError> {
        if days == 0 {
            return Err(EpiError::invalid_input("following_days requires days >= 1"));
        }
        let start = self.next_day()?;
        let end = start
            .checked_add_days(Days::new(days as u64 - 1))
            .ok_or_else(|| EpiError::invalid_input("range end overflows the calendar"))?;
        Ok(Self { start, end })
    }

    /// Iterates every date in the range in order.
    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take(self.len_days())
    }
}
