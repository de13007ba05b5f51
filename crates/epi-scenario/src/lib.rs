// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Named scenarios over a phase registry.
//!
//! A scenario partitions the observed timeline into contiguous phases, each
//! assuming one parameter set of one compartmental model. Scenarios share a
//! single observed series; they are branched by value, edited through
//! apply-or-reject operations that preserve contiguity, estimated phase by
//! phase, simulated by chaining phase end states, and scored against the
//! observations they overlap.

mod phase;
mod registry;
mod report;
mod scenario;
mod simulate;

pub use phase::{FitMetrics, Phase, PhaseStatus};
pub use registry::{AddSpan, PhaseSeq};
pub use report::{HistoryTarget, PhaseSummaryRow, RateRow};
pub use scenario::{Scenario, ScenarioSet, DEFAULT_SMOOTHING_WINDOW, MAIN_SCENARIO};
pub use simulate::TrajectoryRow;
