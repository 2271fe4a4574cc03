// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All constants *must* be double precision. Calculations are done in double
precision from the moment a cube is read.
 */

pub use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Milliarcseconds to radians.
pub const MAS_TO_RAD: f64 = PI / 180.0 / 3600.0 / 1000.0;

/// The default fraction of a hole's Fourier footprint (D/λ) used as the
/// splodge search-window radius.
pub const DEFAULT_FW_SPLODGE: f64 = 0.7;

/// Splodges with a peak-to-noise ratio below this value are flagged.
pub const DEFAULT_CUTOFF: f64 = 3.0;

/// The default number of spectral channels across a filter.
pub const DEFAULT_N_WL: usize = 1;

/// Scale factor turning a median absolute deviation into a Gaussian-equivalent
/// standard deviation.
pub const MAD_TO_SIGMA: f64 = 1.482_602_218_505_602;

/// The maximum number of Gauss-Newton iterations used when fitting a splodge.
pub const GAUSS_FIT_MAX_ITER: usize = 50;

/// A Gauss-Newton fit has converged when every parameter step is smaller than
/// this, relative to the parameter value.
pub const GAUSS_FIT_TOLERANCE: f64 = 1e-8;

/// The modified Julian date of the Unix epoch.
pub const MJD_UNIX_EPOCH: f64 = 40587.0;
