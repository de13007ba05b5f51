// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::ModelParams;
use epi_core::{CompartmentState, EpiError};

const MAX_STEPS_PER_DAY: usize = 256;

/// Integration settings for [`simulate`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimulationConfig {
    /// RK4 sub-steps per day.
    pub steps_per_day: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { steps_per_day: 4 }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), EpiError> {
        if self.steps_per_day == 0 || self.steps_per_day > MAX_STEPS_PER_DAY {
            return Err(EpiError::invalid_input(format!(
                "steps_per_day must be in [1, {MAX_STEPS_PER_DAY}]; got {}",
                self.steps_per_day
            )));
        }
        Ok(())
    }
}

/// Compartment fractions in integration order: s, e, w, i, r, f.
type Fractions = [f64; 6];

fn to_fractions(state: &CompartmentState, population: f64) -> Fractions {
    [
        state.susceptible / population,
        state.exposed / population,
        state.waiting / population,
        state.infected / population,
        state.recovered / population,
        state.fatal / population,
    ]
}

fn to_state(y: &Fractions, population: f64) -> CompartmentState {
    CompartmentState {
        susceptible: y[0] * population,
        exposed: y[1] * population,
        waiting: y[2] * population,
        infected: y[3] * population,
        recovered: y[4] * population,
        fatal: y[5] * population,
    }
}

/// Fixed ODE right-hand side per model kind, over population fractions.
fn rhs(params: &ModelParams, y: &Fractions) -> Fractions {
    let [s, e, w, i, _, _] = *y;
    match *params {
        ModelParams::Sir { rho, sigma } => {
            let new_infections = rho * s * i;
            [
                -new_infections,
                0.0,
                0.0,
                new_infections - sigma * i,
                sigma * i,
                0.0,
            ]
        }
        ModelParams::SirD { kappa, rho, sigma } => {
            let new_infections = rho * s * i;
            [
                -new_infections,
                0.0,
                0.0,
                new_infections - (sigma + kappa) * i,
                sigma * i,
                kappa * i,
            ]
        }
        ModelParams::SirF {
            theta,
            kappa,
            rho,
            sigma,
        } => {
            let new_infections = rho * s * i;
            [
                -new_infections,
                0.0,
                0.0,
                (1.0 - theta) * new_infections - (sigma + kappa) * i,
                sigma * i,
                theta * new_infections + kappa * i,
            ]
        }
        ModelParams::Sewirf {
            theta,
            kappa,
            rho1,
            rho2,
            rho3,
            sigma,
        } => {
            let new_exposures = rho1 * s * (w + i);
            [
                -new_exposures,
                new_exposures - rho2 * e,
                rho2 * e - rho3 * w,
                (1.0 - theta) * rho3 * w - (sigma + kappa) * i,
                sigma * i,
                theta * rho3 * w + kappa * i,
            ]
        }
    }
}

fn rk4_step(params: &ModelParams, y: &Fractions, dt: f64) -> Fractions {
    let k1 = rhs(params, y);
    let k2 = rhs(params, &advance(y, &k1, dt / 2.0));
    let k3 = rhs(params, &advance(y, &k2, dt / 2.0));
    let k4 = rhs(params, &advance(y, &k3, dt));

    let mut next = *y;
    for idx in 0..6 {
        next[idx] += dt / 6.0 * (k1[idx] + 2.0 * k2[idx] + 2.0 * k3[idx] + k4[idx]);
        // Rates in [0, 1] keep the system near the simplex; tiny negative
        // excursions from finite stepping are clamped for stability.
        if next[idx] < 0.0 {
            next[idx] = 0.0;
        }
    }
    next
}

fn advance(y: &Fractions, k: &Fractions, dt: f64) -> Fractions {
    let mut out = *y;
    for idx in 0..6 {
        out[idx] += k[idx] * dt;
    }
    out
}

/// Simulates `days` forward steps from `initial`.
///
/// Returns `days + 1` states: the initial state followed by one state per
/// simulated day. Deterministic: identical inputs produce bit-for-bit equal
/// trajectories.
pub fn simulate(
    params: &ModelParams,
    initial: &CompartmentState,
    days: usize,
    population: f64,
    config: &SimulationConfig,
) -> Result<Vec<CompartmentState>, EpiError> {
    params.validate()?;
    config.validate()?;
    initial.validate()?;
    if !population.is_finite() || population <= 0.0 {
        return Err(EpiError::invalid_parameter(format!(
            "population must be finite and > 0; got {population}"
        )));
    }

    let mut trajectory = Vec::with_capacity(days + 1);
    trajectory.push(*initial);

    let dt = 1.0 / config.steps_per_day as f64;
    let mut y = to_fractions(initial, population);
    for _ in 0..days {
        for _ in 0..config.steps_per_day {
            y = rk4_step(params, &y, dt);
        }
        trajectory.push(to_state(&y, population));
    }
    Ok(trajectory)
}

#[cfg(test)]
mod tests {
    use super::{simulate, SimulationConfig};
    use crate::ModelParams;
    use epi_core::CompartmentState;

    const POPULATION: f64 = 1_000_000.0;

    fn initial() -> CompartmentState {
        CompartmentState::from_sirf(POPULATION - 1_000.0, 800.0, 180.0, 20.0)
    }

    fn sirf() -> ModelParams {
        ModelParams::SirF {
            theta: 0.002,
            kappa: 0.005,
            rho: 0.2,
            sigma: 0.075,
        }
    }

    #[test]
    fn simulate_returns_initial_plus_one_state_per_day() {
        let trajectory = simulate(
            &sirf(),
            &initial(),
            30,
            POPULATION,
            &SimulationConfig::default(),
        )
        .expect("valid simulation");
        assert_eq!(trajectory.len(), 31);
        assert_eq!(trajectory[0], initial());
    }

    #[test]
    fn simulate_is_bit_for_bit_deterministic() {
        let config = SimulationConfig::default();
        let a = simulate(&sirf(), &initial(), 60, POPULATION, &config).expect("run a");
        let b = simulate(&sirf(), &initial(), 60, POPULATION, &config).expect("run b");
        assert_eq!(a, b);
    }

    #[test]
    fn simulate_conserves_population_mass() {
        let trajectory = simulate(
            &sirf(),
            &initial(),
            120,
            POPULATION,
            &SimulationConfig::default(),
        )
        .expect("valid simulation");
        for state in &trajectory {
            let total = state.susceptible
                + state.exposed
                + state.waiting
                + state.infected
                + state.recovered
                + state.fatal;
            assert!(
                (total - POPULATION).abs() < 1e-3,
                "mass drifted to {total}"
            );
            state.validate().expect("states stay non-negative");
        }
    }

    #[test]
    fn sir_epidemic_grows_when_rt_exceeds_one() {
        let params = ModelParams::Sir { rho: 0.3, sigma: 0.1 };
        assert!(params.rt().expect("defined") > 1.0);
        let trajectory = simulate(
            &params,
            &initial(),
            14,
            POPULATION,
            &SimulationConfig::default(),
        )
        .expect("valid simulation");
        assert!(trajectory[14].infected > trajectory[0].infected);
    }

    #[test]
    fn sir_epidemic_decays_when_rt_below_one() {
        let params = ModelParams::Sir { rho: 0.05, sigma: 0.1 };
        let trajectory = simulate(
            &params,
            &initial(),
            14,
            POPULATION,
            &SimulationConfig::default(),
        )
        .expect("valid simulation");
        assert!(trajectory[14].infected < trajectory[0].infected);
    }

    #[test]
    fn sewirf_routes_mass_through_latent_compartments() {
        let params = ModelParams::Sewirf {
            theta: 0.002,
            kappa: 0.005,
            rho1: 0.3,
            rho2: 0.25,
            rho3: 0.25,
            sigma: 0.075,
        };
        let trajectory = simulate(
            &params,
            &initial(),
            10,
            POPULATION,
            &SimulationConfig::default(),
        )
        .expect("valid simulation");
        assert_eq!(trajectory[0].exposed, 0.0);
        assert!(trajectory[5].exposed > 0.0);
        assert!(trajectory[5].waiting > 0.0);
    }

    #[test]
    fn simulate_rejects_invalid_inputs() {
        let bad_params = ModelParams::Sir { rho: 1.5, sigma: 0.1 };
        assert!(simulate(
            &bad_params,
            &initial(),
            5,
            POPULATION,
            &SimulationConfig::default()
        )
        .is_err());

        assert!(simulate(&sirf(), &initial(), 5, 0.0, &SimulationConfig::default()).is_err());

        let bad_config = SimulationConfig { steps_per_day: 0 };
        assert!(simulate(&sirf(), &initial(), 5, POPULATION, &bad_config).is_err());

        let mut bad_state = initial();
        bad_state.fatal = -1.0;
        assert!(simulate(
            &sirf(),
            &bad_state,
            5,
            POPULATION,
            &SimulationConfig::default()
        )
        .is_err());
    }

    #[test]
    fn zero_days_returns_only_the_initial_state() {
        let trajectory = simulate(
            &sirf(),
            &initial(),
            0,
            POPULATION,
            &SimulationConfig::default(),
        )
        .expect("valid simulation");
        assert_eq!(trajectory, vec![initial()]);
    }
}
