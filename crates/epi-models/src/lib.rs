// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! SIR-derived compartmental models.
//!
//! A closed family of fixed-form ODE systems (SIR, SIR-D, SIR-F, SEWIR-F),
//! each with a fixed named-parameter set, deterministic fixed-step
//! integration, derived epidemiological quantities (effective reproduction
//! number, recovery/fatality sub-rates), and a trajectory-matching loss
//! shared by the estimator and model comparison.

mod kind;
mod loss;
mod params;
mod simulate;

pub use kind::ModelKind;
pub use loss::{trajectory_loss, trajectory_rmsle};
pub use params::ModelParams;
pub use simulate::{simulate, SimulationConfig};
