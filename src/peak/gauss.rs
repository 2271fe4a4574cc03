// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Fitting a circular 2D Gaussian to the power of a splodge.

use itertools::iproduct;
use log::trace;
use nalgebra::{Matrix4, Vector4};
use ndarray::ArrayView2;
use num_complex::Complex64;

use super::read;
use crate::{
    constants::{GAUSS_FIT_MAX_ITER, GAUSS_FIT_TOLERANCE},
    uv::Splodge,
};

/// The maximum number of times a step is halved when it doesn't improve the
/// fit.
const MAX_STEP_HALVINGS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct GaussFit {
    /// Peak power.
    pub(super) amplitude: f64,
    /// Fitted centre \[signed Fourier pixels\].
    pub(super) x0: f64,
    pub(super) y0: f64,
    pub(super) sigma: f64,
}

/// Fit `A exp(-r² / 2σ²)` to `|F|²` within `radius` of the splodge centre
/// with Gauss-Newton iterations seeded at the brightest pixel. `None` if the
/// fit doesn't converge to something sensible.
pub(super) fn fit(ft: ArrayView2<Complex64>, splodge: &Splodge, radius: f64) -> Option<GaussFit> {
    let [kx, ky] = splodge.centre;
    let reach = radius.ceil() as isize;
    let (cx, cy) = (kx.round() as isize, ky.round() as isize);
    let points: Vec<(f64, f64, f64)> = iproduct!(-reach..=reach, -reach..=reach)
        .map(|(dy, dx)| (cx + dx, cy + dy))
        .filter(|&(x, y)| (x as f64 - kx).hypot(y as f64 - ky) <= radius)
        .map(|(x, y)| {
            let power = read(ft, y, x, splodge.conjugate).norm_sqr();
            (x as f64, y as f64, power)
        })
        .collect();
    // Four parameters need more than four points.
    if points.len() < 5 {
        trace!("Only {} pixels in the splodge window", points.len());
        return None;
    }

    let (seed_x, seed_y, peak) = points
        .iter()
        .copied()
        .max_by(|a, b| a.2.total_cmp(&b.2))?;
    if !(peak.is_finite() && peak > 0.0) {
        return None;
    }
    // Work with powers of order 1.
    let data: Vec<(f64, f64, f64)> = points.iter().map(|&(x, y, p)| (x, y, p / peak)).collect();

    let residual = |p: &[f64; 4]| -> f64 {
        data.iter()
            .map(|&(x, y, d)| (d - model(p, x, y)).powi(2))
            .sum()
    };

    let mut params = [1.0, seed_x, seed_y, (radius / 3.0).max(0.5)];
    let mut current = residual(&params);
    for _ in 0..GAUSS_FIT_MAX_ITER {
        let mut jtj = Matrix4::<f64>::zeros();
        let mut jtr = Vector4::<f64>::zeros();
        for &(x, y, d) in &data {
            let j = Vector4::from(jacobian(&params, x, y));
            let r = d - model(&params, x, y);
            jtr += j * r;
            jtj += j * j.transpose();
        }
        let step = match jtj.lu().solve(&jtr) {
            Some(step) if step.iter().all(|s| s.is_finite()) => step,
            _ => {
                trace!("Singular normal equations in the Gaussian fit");
                return None;
            }
        };

        let mut scale = 1.0;
        let mut improved = None;
        for _ in 0..MAX_STEP_HALVINGS {
            let mut trial = params;
            trial.iter_mut().zip(step.iter()).for_each(|(p, s)| *p += scale * s);
            let r = residual(&trial);
            if r.is_finite() && r <= current && trial[0] > 0.0 && trial[3] > 0.0 {
                improved = Some((trial, r));
                break;
            }
            scale /= 2.0;
        }
        let converged = match improved {
            Some((trial, r)) => {
                let small = trial
                    .iter()
                    .zip(params)
                    .all(|(new, old)| (new - old).abs() <= GAUSS_FIT_TOLERANCE * old.abs().max(1.0));
                params = trial;
                current = r;
                small
            }
            // No step improves the fit; we're at a minimum.
            None => true,
        };
        if converged {
            let [amplitude, x0, y0, sigma] = params;
            let fit = GaussFit {
                amplitude: amplitude * peak,
                x0,
                y0,
                sigma: sigma.abs(),
            };
            let escaped = (x0 - kx).hypot(y0 - ky) > radius;
            if escaped || !params.iter().all(|p| p.is_finite()) {
                trace!("Gaussian fit escaped its window: {fit:?}");
                return None;
            }
            return Some(fit);
        }
    }

    trace!("Gaussian fit did not converge in {GAUSS_FIT_MAX_ITER} iterations");
    None
}

fn model(p: &[f64; 4], x: f64, y: f64) -> f64 {
    let [a, x0, y0, sigma] = *p;
    let r2 = (x - x0).powi(2) + (y - y0).powi(2);
    a * (-r2 / (2.0 * sigma * sigma)).exp()
}

/// Partial derivatives of the model with respect to `[A, x0, y0, σ]`.
fn jacobian(p: &[f64; 4], x: f64, y: f64) -> [f64; 4] {
    let [a, x0, y0, sigma] = *p;
    let s2 = sigma * sigma;
    let r2 = (x - x0).powi(2) + (y - y0).powi(2);
    let g = (-r2 / (2.0 * s2)).exp();
    [
        g,
        a * g * (x - x0) / s2,
        a * g * (y - y0) / s2,
        a * g * r2 / (s2 * sigma),
    ]
}
