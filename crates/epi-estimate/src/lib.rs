// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Per-phase parameter estimation.
//!
//! Fits compartmental-model parameters to one phase's observed rows by
//! minimizing the trajectory loss with bounded Nelder-Mead, started from a
//! fixed set of points plus an optional warm start (the previous phase's
//! parameters). Budget exhaustion is surfaced as a flagged result, never an
//! error: a non-converged fit is usable but lower-confidence and must not
//! be treated as converged downstream.

mod estimator;
mod nelder_mead;

pub use estimator::{EstimatorConfig, FitResult, PhaseEstimator};
