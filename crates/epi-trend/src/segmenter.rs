// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::penalty::{resolve_penalty, Penalty};
use epi_core::EpiError;
use log::debug;

// Linear trend per segment: slope, intercept, residual variance.
const PARAMS_PER_SEGMENT: usize = 3;
const MAX_BETA_DOUBLINGS: usize = 64;

/// Configuration for [`TrendSegmenter`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmenterConfig {
    /// Hard cap on the number of phases (segments) proposed.
    pub max_phases: usize,
    /// Minimum days per segment.
    pub min_segment_len: usize,
    /// Per-segment penalty rule.
    pub penalty: Penalty,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_phases: 12,
            min_segment_len: 5,
            penalty: Penalty::Bic,
        }
    }
}

impl SegmenterConfig {
    pub fn validate(&self) -> Result<(), EpiError> {
        if self.max_phases == 0 {
            return Err(EpiError::invalid_input(
                "SegmenterConfig.max_phases must be >= 1; got 0",
            ));
        }
        if self.min_segment_len < 2 {
            return Err(EpiError::invalid_input(format!(
                "SegmenterConfig.min_segment_len must be >= 2; got {}",
                self.min_segment_len
            )));
        }
        Ok(())
    }
}

/// Prefix-stat cache for O(1) least-squares linear segment costs.
struct LinearFitCache {
    prefix_t: Vec<f64>,
    prefix_t_sq: Vec<f64>,
    prefix_x: Vec<f64>,
    prefix_x_sq: Vec<f64>,
    prefix_t_x: Vec<f64>,
}

impl LinearFitCache {
    fn new(values: &[f64]) -> Self {
        let n = values.len();
        let mut prefix_t = Vec::with_capacity(n + 1);
        let mut prefix_t_sq = Vec::with_capacity(n + 1);
        let mut prefix_x = Vec::with_capacity(n + 1);
        let mut prefix_x_sq = Vec::with_capacity(n + 1);
        let mut prefix_t_x = Vec::with_capacity(n + 1);

        prefix_t.push(0.0);
        prefix_t_sq.push(0.0);
        prefix_x.push(0.0);
        prefix_x_sq.push(0.0);
        prefix_t_x.push(0.0);

        for (t, &x) in values.iter().enumerate() {
            let tf = t as f64;
            prefix_t.push(prefix_t[t] + tf);
            prefix_t_sq.push(prefix_t_sq[t] + tf * tf);
            prefix_x.push(prefix_x[t] + x);
            prefix_x_sq.push(prefix_x_sq[t] + x * x);
            prefix_t_x.push(prefix_t_x[t] + tf * x);
        }

        Self {
            prefix_t,
            prefix_t_sq,
            prefix_x,
            prefix_x_sq,
            prefix_t_x,
        }
    }

    /// Squared residual of the least-squares line over `[start, end)`.
    fn segment_sse(&self, start: usize, end: usize) -> f64 {
        let m = (end - start) as f64;
        let sum_t = self.prefix_t[end] - self.prefix_t[start];
        let sum_t_sq = self.prefix_t_sq[end] - self.prefix_t_sq[start];
        let sum_x = self.prefix_x[end] - self.prefix_x[start];
        let sum_x_sq = self.prefix_x_sq[end] - self.prefix_x_sq[start];
        let sum_t_x = self.prefix_t_x[end] - self.prefix_t_x[start];

        let s_tt = sum_t_sq - sum_t * sum_t / m;
        let s_ty = sum_t_x - sum_t * sum_x / m;
        let s_yy = sum_x_sq - sum_x * sum_x / m;

        // Degenerate time variance falls back to the mean-only residual.
        let tolerance = 32.0 * f64::EPSILON * sum_t_sq.abs().max(1.0);
        let fit = if s_tt <= tolerance {
            0.0
        } else {
            s_ty * s_ty / s_tt
        };
        let sse = s_yy - fit;

        // Cancellation in the prefix-sum differences leaves a rounding
        // residue proportional to the summed magnitudes; an SSE below that
        // residue is an exact fit, not signal.
        let noise_floor = m * f64::EPSILON * (sum_x_sq.abs() + sum_t_x.abs() + fit.abs());
        if sse <= noise_floor {
            0.0
        } else {
            sse
        }
    }
}

/// Piecewise-linear trend change-point detector.
///
/// Penalized dynamic program over segment start candidates with pruning:
/// exact for the configured penalty, deterministic for a given input and
/// configuration, no randomized search.
#[derive(Clone, Copy, Debug)]
pub struct TrendSegmenter {
    config: SegmenterConfig,
}

impl TrendSegmenter {
    pub fn new(config: SegmenterConfig) -> Result<Self, EpiError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Detects change points in `values` (a smoothed transform of the
    /// observed series).
    ///
    /// Returns strictly increasing segment-start indices in `(0, n)`; an
    /// empty vector means no significant trend change (single phase). If
    /// the penalized optimum has more than `max_phases` segments, the
    /// penalty is doubled until the count fits.
    pub fn detect(&self, values: &[f64]) -> Result<Vec<usize>, EpiError> {
        if let Some((index, value)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite())
        {
            return Err(EpiError::invalid_input(format!(
                "segmentation input must be finite; got {value} at index {index}"
            )));
        }

        let n = values.len();
        if n < 2 * self.config.min_segment_len {
            debug!("series of {n} points is too short to split; single phase");
            return Ok(Vec::new());
        }

        let cache = LinearFitCache::new(values);
        let mut beta = resolve_penalty(&self.config.penalty, values, PARAMS_PER_SEGMENT)?;

        for _ in 0..=MAX_BETA_DOUBLINGS {
            let boundaries = self.solve_penalized(&cache, n, beta)?;
            if boundaries.len() + 1 <= self.config.max_phases {
                debug!(
                    "trend segmentation: {} boundaries at beta {beta:.6e}",
                    boundaries.len()
                );
                return Ok(boundaries);
            }
            beta *= 2.0;
        }

        Err(EpiError::numerical_issue(format!(
            "segment count did not drop below max_phases={} after {MAX_BETA_DOUBLINGS} penalty doublings",
            self.config.max_phases
        )))
    }

    /// Penalized DP over segment-start candidates (pruned exact search).
    fn solve_penalized(
        &self,
        cache: &LinearFitCache,
        n: usize,
        beta: f64,
    ) -> Result<Vec<usize>, EpiError> {
        let min_len = self.config.min_segment_len;

        let mut best_cost = vec![f64::INFINITY; n + 1];
        let mut last_cp = vec![usize::MAX; n + 1];
        best_cost[0] = -beta;
        last_cp[0] = 0;

        let mut candidates = vec![0usize];

        for t in 1..=n {
            let mut scored = vec![None; candidates.len()];
            let mut best = f64::INFINITY;
            let mut best_tau = usize::MAX;

            for (idx, &tau) in candidates.iter().enumerate() {
                if t < tau + min_len || !best_cost[tau].is_finite() {
                    continue;
                }
                let unpenalized = best_cost[tau] + cache.segment_sse(tau, t);
                if !unpenalized.is_finite() {
                    return Err(EpiError::numerical_issue(format!(
                        "non-finite segment objective at tau={tau}, t={t}"
                    )));
                }
                scored[idx] = Some(unpenalized);

                let total = unpenalized + beta;
                if total < best || (total == best && tau < best_tau) {
                    best = total;
                    best_tau = tau;
                }
            }

            if best_tau != usize::MAX {
                best_cost[t] = best;
                last_cp[t] = best_tau;
            }

            // PELT pruning: a candidate whose unpenalized objective already
            // exceeds the best penalized objective can never win later.
            let mut survivors = Vec::with_capacity(candidates.len() + 1);
            for (idx, &tau) in candidates.iter().enumerate() {
                match scored[idx] {
                    Some(unpenalized) if best_cost[t].is_finite() => {
                        if unpenalized < best_cost[t] {
                            survivors.push(tau);
                        }
                    }
                    _ => survivors.push(tau),
                }
            }
            if t < n {
                survivors.push(t);
            }
            candidates = survivors;
        }

        if !best_cost[n].is_finite() {
            return Err(EpiError::numerical_issue(
                "no feasible segmentation reached the end of the series",
            ));
        }

        // Backtrack: interior predecessors are the change points.
        let mut boundaries = Vec::new();
        let mut cursor = n;
        while cursor > 0 {
            let tau = last_cp[cursor];
            if tau >= cursor {
                return Err(EpiError::numerical_issue(format!(
                    "invalid backtrack state: predecessor {tau} at t={cursor}"
                )));
            }
            if tau == 0 {
                break;
            }
            boundaries.push(tau);
            cursor = tau;
        }
        boundaries.reverse();
        Ok(boundaries)
    }
}
