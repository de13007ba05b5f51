// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Trend change-point detection.
//!
//! Proposes phase boundaries by segmenting a smoothed transform of the
//! observed series (typically log cumulative confirmed cases) with a
//! penalized piecewise-linear dynamic program: each extra segment must buy
//! enough squared-residual reduction to beat the penalty.

mod penalty;
mod segmenter;
pub mod transforms;

pub use penalty::Penalty;
pub use segmenter::{SegmenterConfig, TrendSegmenter};
