// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::EpiError;

/// Compartment values at one point in time, in absolute counts.
///
/// `exposed` and `waiting` are zero for every model kind except SEWIR-F.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CompartmentState {
    pub susceptible: f64,
    pub exposed: f64,
    pub waiting: f64,
    pub infected: f64,
    pub recovered: f64,
    pub fatal: f64,
}

impl CompartmentState {
    /// State observed as S/I/R/F counts, with no exposed or waiting mass.
    pub fn from_sirf(susceptible: f64, infected: f64, recovered: f64, fatal: f64) -> Self {
        Self {
            susceptible,
            exposed: 0.0,
            waiting: 0.0,
            infected,
            recovered,
            fatal,
        }
    }

    /// Cumulative confirmed cases implied by the state.
    pub fn confirmed(&self) -> f64 {
        self.infected + self.recovered + self.fatal
    }

    /// Rejects negative or non-finite compartment values.
    pub fn validate(&self) -> Result<(), EpiError> {
        for (name, value) in [
            ("susceptible", self.susceptible),
            ("exposed", self.exposed),
            ("waiting", self.waiting),
            ("infected", self.infected),
            ("recovered", self.recovered),
            ("fatal", self.fatal),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EpiError::invalid_parameter(format!(
                    "compartment {name} must be finite and >= 0; got {value}"
                )));
            }
        }
        Ok(())
    }
}
