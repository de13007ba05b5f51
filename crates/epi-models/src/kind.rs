// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::fmt;

/// The closed family of supported compartmental models.
///
/// Dynamic choice of model is expressed over this enum, never by open-ended
/// subtyping: each kind pins a fixed parameter set and ODE right-hand side.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// Susceptible-Infected-Recovered.
    Sir,
    /// SIR with a separate dead compartment.
    SirD,
    /// SIR-F: SIR-D with direct fatality of confirmed cases.
    SirF,
    /// SEWIR-F: SIR-F with exposed and waiting latent compartments.
    Sewirf,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Sir,
        ModelKind::SirD,
        ModelKind::SirF,
        ModelKind::Sewirf,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Sir => "SIR",
            ModelKind::SirD => "SIR-D",
            ModelKind::SirF => "SIR-F",
            ModelKind::Sewirf => "SEWIR-F",
        }
    }

    /// Parameter names in the canonical order used by optimizer vectors,
    /// summary rows, and regression targets.
    pub fn param_names(&self) -> &'static [&'static str] {
        match self {
            ModelKind::Sir => &["rho", "sigma"],
            ModelKind::SirD => &["kappa", "rho", "sigma"],
            ModelKind::SirF => &["theta", "kappa", "rho", "sigma"],
            ModelKind::Sewirf => &["theta", "kappa", "rho1", "rho2", "rho3", "sigma"],
        }
    }

    pub fn param_count(&self) -> usize {
        self.param_names().len()
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
