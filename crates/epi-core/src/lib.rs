// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Shared types for the epiphase scenario engine.
//!
//! Leaf crate of the workspace: the error taxonomy, inclusive date ranges,
//! the observed compartment series, auxiliary indicator series, and the
//! compartment state vector that flows through models and simulators.

mod date_range;
mod error;
mod indicator;
mod series;
mod state;

pub use date_range::DateRange;
pub use error::EpiError;
pub use indicator::IndicatorSeries;
pub use series::{ObservedRecord, ObservedSeries};
pub use state::CompartmentState;

pub use chrono::NaiveDate;
