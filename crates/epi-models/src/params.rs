// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::ModelKind;
use epi_core::EpiError;

/// Named parameter set for one model kind.
///
/// Every parameter is a daily rate in `[0, 1]` (population-normalized).
/// `values`/`from_values` round-trip through the canonical order given by
/// [`ModelKind::param_names`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ModelParams {
    Sir {
        rho: f64,
        sigma: f64,
    },
    SirD {
        kappa: f64,
        rho: f64,
        sigma: f64,
    },
    SirF {
        theta: f64,
        kappa: f64,
        rho: f64,
        sigma: f64,
    },
    Sewirf {
        theta: f64,
        kappa: f64,
        rho1: f64,
        rho2: f64,
        rho3: f64,
        sigma: f64,
    },
}

impl ModelParams {
    pub fn kind(&self) -> ModelKind {
        match self {
            ModelParams::Sir { .. } => ModelKind::Sir,
            ModelParams::SirD { .. } => ModelKind::SirD,
            ModelParams::SirF { .. } => ModelKind::SirF,
            ModelParams::Sewirf { .. } => ModelKind::Sewirf,
        }
    }

    /// Rejects any rate outside `[0, 1]` or non-finite.
    pub fn validate(&self) -> Result<(), EpiError> {
        for (name, value) in self.pairs() {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(EpiError::invalid_parameter(format!(
                    "{} parameter {name} must lie in [0, 1]; got {value}",
                    self.kind()
                )));
            }
        }
        Ok(())
    }

    /// Parameter values in canonical order.
    pub fn values(&self) -> Vec<f64> {
        self.pairs().into_iter().map(|(_, v)| v).collect()
    }

    /// `(name, value)` pairs in canonical order.
    pub fn pairs(&self) -> Vec<(&'static str, f64)> {
        match *self {
            ModelParams::Sir { rho, sigma } => vec![("rho", rho), ("sigma", sigma)],
            ModelParams::SirD { kappa, rho, sigma } => {
                vec![("kappa", kappa), ("rho", rho), ("sigma", sigma)]
            }
            ModelParams::SirF {
                theta,
                kappa,
                rho,
                sigma,
            } => vec![
                ("theta", theta),
                ("kappa", kappa),
                ("rho", rho),
                ("sigma", sigma),
            ],
            ModelParams::Sewirf {
                theta,
                kappa,
                rho1,
                rho2,
                rho3,
                sigma,
            } => vec![
                ("theta", theta),
                ("kappa", kappa),
                ("rho1", rho1),
                ("rho2", rho2),
                ("rho3", rho3),
                ("sigma", sigma),
            ],
        }
    }

    /// Value of the named parameter, if the kind defines it.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.pairs().into_iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// Builds a validated parameter set from values in canonical order.
    pub fn from_values(kind: ModelKind, values: &[f64]) -> Result<Self, EpiError> {
        if values.len() != kind.param_count() {
            return Err(EpiError::invalid_parameter(format!(
                "{kind} expects {} parameters, got {}",
                kind.param_count(),
                values.len()
            )));
        }
        let params = match kind {
            ModelKind::Sir => ModelParams::Sir {
                rho: values[0],
                sigma: values[1],
            },
            ModelKind::SirD => ModelParams::SirD {
                kappa: values[0],
                rho: values[1],
                sigma: values[2],
            },
            ModelKind::SirF => ModelParams::SirF {
                theta: values[0],
                kappa: values[1],
                rho: values[2],
                sigma: values[3],
            },
            ModelKind::Sewirf => ModelParams::Sewirf {
                theta: values[0],
                kappa: values[1],
                rho1: values[2],
                rho2: values[3],
                rho3: values[4],
                sigma: values[5],
            },
        };
        params.validate()?;
        Ok(params)
    }

    /// Effective reproduction number implied by the parameters.
    ///
    /// `None` when the removal rate is zero and the ratio is undefined.
    pub fn rt(&self) -> Option<f64> {
        let (numerator, removal) = match *self {
            ModelParams::Sir { rho, sigma } => (rho, sigma),
            ModelParams::SirD { kappa, rho, sigma } => (rho, sigma + kappa),
            ModelParams::SirF {
                theta,
                kappa,
                rho,
                sigma,
            } => (rho * (1.0 - theta), sigma + kappa),
            ModelParams::Sewirf {
                theta,
                kappa,
                rho1,
                sigma,
                ..
            } => (rho1 * (1.0 - theta), sigma + kappa),
        };
        (removal > 0.0).then(|| numerator / removal)
    }

    /// Derived daily sub-rates: recovery always, fatality where modeled.
    pub fn daily_rates(&self) -> Vec<(&'static str, f64)> {
        match *self {
            ModelParams::Sir { sigma, .. } => vec![("recovery", sigma)],
            ModelParams::SirD { kappa, sigma, .. } => {
                vec![("recovery", sigma), ("fatality", kappa)]
            }
            ModelParams::SirF { kappa, sigma, .. }
            | ModelParams::Sewirf { kappa, sigma, .. } => {
                vec![("recovery", sigma), ("fatality", kappa)]
            }
        }
    }
}
