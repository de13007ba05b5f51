// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use epi_core::EpiError;

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Outcome of one bounded Nelder-Mead run.
#[derive(Clone, Debug)]
pub(crate) struct Minimum {
    pub x: Vec<f64>,
    pub f: f64,
    pub iterations: usize,
    pub converged: bool,
}

struct Vertex {
    x: Vec<f64>,
    f: f64,
}

fn clamp_into(x: &mut [f64], lower: f64, upper: f64) {
    for value in x {
        *value = value.clamp(lower, upper);
    }
}

fn combine(centroid: &[f64], worst: &[f64], coefficient: f64, lower: f64, upper: f64) -> Vec<f64> {
    let mut out: Vec<f64> = centroid
        .iter()
        .zip(worst)
        .map(|(c, w)| c + coefficient * (c - w))
        .collect();
    clamp_into(&mut out, lower, upper);
    out
}

/// Minimizes `objective` over the box `[lower, upper]^k` with Nelder-Mead,
/// clamping every trial point into the box.
///
/// Deterministic: the initial simplex is built from `start` with a fixed
/// per-coordinate step, and all comparisons use total ordering.
pub(crate) fn minimize(
    objective: &dyn Fn(&[f64]) -> Result<f64, EpiError>,
    start: &[f64],
    lower: f64,
    upper: f64,
    step: f64,
    max_iters: usize,
    f_tol: f64,
    x_tol: f64,
) -> Result<Minimum, EpiError> {
    let dim = start.len();
    if dim == 0 {
        return Err(EpiError::invalid_input("cannot optimize zero parameters"));
    }

    let mut simplex = Vec::with_capacity(dim + 1);
    let mut base = start.to_vec();
    clamp_into(&mut base, lower, upper);
    simplex.push(Vertex {
        f: objective(&base)?,
        x: base.clone(),
    });
    for axis in 0..dim {
        let mut vertex = base.clone();
        // Step inward when the outward step would leave the box.
        vertex[axis] = if vertex[axis] + step <= upper {
            vertex[axis] + step
        } else {
            vertex[axis] - step
        };
        clamp_into(&mut vertex, lower, upper);
        simplex.push(Vertex {
            f: objective(&vertex)?,
            x: vertex,
        });
    }

    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iters {
        simplex.sort_by(|a, b| a.f.total_cmp(&b.f));

        let best_f = simplex[0].f;
        let worst_f = simplex[dim].f;
        let f_spread = (worst_f - best_f).abs();
        let x_spread = simplex[1..]
            .iter()
            .flat_map(|v| v.x.iter().zip(&simplex[0].x).map(|(a, b)| (a - b).abs()))
            .fold(0.0_f64, f64::max);
        if f_spread <= f_tol * (1.0 + best_f.abs()) && x_spread <= x_tol {
            converged = true;
            break;
        }

        iterations += 1;

        let centroid: Vec<f64> = (0..dim)
            .map(|axis| simplex[..dim].iter().map(|v| v.x[axis]).sum::<f64>() / dim as f64)
            .collect();

        let reflected = combine(&centroid, &simplex[dim].x, REFLECT, lower, upper);
        let f_reflected = objective(&reflected)?;

        if f_reflected < simplex[0].f {
            let expanded = combine(&centroid, &simplex[dim].x, EXPAND, lower, upper);
            let f_expanded = objective(&expanded)?;
            simplex[dim] = if f_expanded < f_reflected {
                Vertex {
                    x: expanded,
                    f: f_expanded,
                }
            } else {
                Vertex {
                    x: reflected,
                    f: f_reflected,
                }
            };
            continue;
        }

        if f_reflected < simplex[dim - 1].f {
            simplex[dim] = Vertex {
                x: reflected,
                f: f_reflected,
            };
            continue;
        }

        let contracted = combine(&centroid, &simplex[dim].x, -CONTRACT, lower, upper);
        let f_contracted = objective(&contracted)?;
        if f_contracted < simplex[dim].f {
            simplex[dim] = Vertex {
                x: contracted,
                f: f_contracted,
            };
            continue;
        }

        // Shrink toward the best vertex.
        let best = simplex[0].x.clone();
        for vertex in simplex.iter_mut().skip(1) {
            for (value, anchor) in vertex.x.iter_mut().zip(&best) {
                *value = anchor + SHRINK * (*value - anchor);
            }
            clamp_into(&mut vertex.x, lower, upper);
            vertex.f = objective(&vertex.x)?;
        }
    }

    simplex.sort_by(|a, b| a.f.total_cmp(&b.f));
    let best = &simplex[0];
    Ok(Minimum {
        x: best.x.clone(),
        f: best.f,
        iterations,
        converged,
    })
}
