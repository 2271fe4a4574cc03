// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Some helper mathematics.

#[cfg(test)]
mod tests;

use num_complex::Complex64;

use crate::constants::{MAD_TO_SIGMA, PI, TAU};

/// Complex exponential. The argument is assumed to be purely imaginary.
///
/// This function doesn't actually use complex numbers; it just returns the real
/// and imag components from Euler's formula (i.e. e^{ix} = cos{x} + i sin{x}).
#[inline]
pub(crate) fn cexp(x: f64) -> Complex64 {
    let (im, re) = x.sin_cos();
    Complex64::new(re, im)
}

/// Wrap a phase \[radians\] into the interval (-π, π].
pub fn wrap_phase(phase: f64) -> f64 {
    if !phase.is_finite() {
        return f64::NAN;
    }
    let mut wrapped = phase.rem_euclid(TAU);
    if wrapped > PI {
        wrapped -= TAU;
    }
    wrapped
}

/// The number of ways of choosing `k` things from `n`.
pub fn n_choose_k(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    // Multiplying before dividing keeps every intermediate value an integer.
    (0..k.min(n - k)).fold(1, |acc, i| acc * (n - i) / (i + 1))
}

/// The median of some values. NaNs are ignored. `None` is returned if there
/// are no finite values.
pub(crate) fn median(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    Some(if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    })
}

/// Robust estimates of the centre and scatter of some values: the median and
/// the median absolute deviation scaled to a Gaussian-equivalent sigma.
pub(crate) fn median_and_sigma(values: &[f64]) -> Option<(f64, f64)> {
    let centre = median(values)?;
    let deviations: Vec<f64> = values.iter().map(|v| (v - centre).abs()).collect();
    let mad = median(&deviations)?;
    Some((centre, MAD_TO_SIGMA * mad))
}

/// The mean and the standard error of the mean of some values. The sample
/// variance uses `n - 1` degrees of freedom; with fewer than two values, the
/// error is NaN.
pub(crate) fn mean_and_std_err(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (f64::NAN, f64::NAN);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if n < 2 {
        return (mean, f64::NAN);
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    (mean, (var / n as f64).sqrt())
}
