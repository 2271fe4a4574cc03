// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Calibrating a target's observables against those of point-like
//! calibrators.
//!
//! The instrument and atmosphere multiply every squared visibility and add to
//! every closure phase in the same way for the target and a calibrator
//! observed with the same set up. Dividing the V² and subtracting the closure
//! phases removes them. With several calibrators, their observables are
//! combined first.

mod error;

pub use error::CalibrationError;

use log::{debug, info, warn};
use num_complex::Complex64;

use crate::{bundle::ObservableBundle, math::wrap_phase};

/// Calibrate a target. Neither input is modified.
pub fn calibrate(
    target: &ObservableBundle,
    calibrators: &[ObservableBundle],
) -> Result<ObservableBundle, CalibrationError> {
    if calibrators.is_empty() {
        return Err(CalibrationError::NoCalibrators);
    }
    if target.calibrated {
        return Err(CalibrationError::AlreadyCalibrated(target.info.target.clone()));
    }
    for cal in calibrators {
        check_compatible(target, cal)?;
    }
    info!(
        "Calibrating {} with {}",
        target.info.target,
        calibrators
            .iter()
            .map(|c| c.info.target.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let cal = combine(calibrators);

    let mut out = target.clone();
    let mut num_nan = 0;
    for i in 0..target.num_baselines() {
        let (t, st) = (target.vis2[i], target.vis2_err[i]);
        let (c, sc) = (cal.vis2[i], cal.vis2_err[i]);
        let v = t / c;
        let err = v.abs() * ((st / t).powi(2) + (sc / c).powi(2)).sqrt();
        out.vis2[i] = finite_or_nan(v);
        out.vis2_err[i] = finite_or_nan(err);
        out.baseline_flags[i] |= cal.baseline_flags[i] || !v.is_finite();
        if !v.is_finite() {
            num_nan += 1;
        }
        out.frame_vis2
            .column_mut(i)
            .mapv_inplace(|f| finite_or_nan(f / c));
    }
    for i in 0..target.num_triangles() {
        let (bt, bc) = (target.bispectrum[i], cal.bispectrum[i]);
        let b = bt / bc;
        let amp_err = b.norm()
            * ((target.bispectrum_amp_err[i] / bt.norm()).powi(2)
                + (cal.bispectrum_amp_err[i] / bc.norm()).powi(2))
            .sqrt();
        let cp = wrap_phase(target.closure_phase[i] - cal.closure_phase[i]);
        let cp_err = target.closure_phase_err[i].hypot(cal.closure_phase_err[i]);
        let finite = b.re.is_finite() && b.im.is_finite() && cp.is_finite();

        out.bispectrum[i] = if finite {
            b
        } else {
            Complex64::new(f64::NAN, f64::NAN)
        };
        out.bispectrum_amp_err[i] = finite_or_nan(amp_err);
        out.closure_phase[i] = if finite { cp } else { f64::NAN };
        out.closure_phase_err[i] = finite_or_nan(cp_err);
        out.triangle_flags[i] |= cal.triangle_flags[i] || !finite;
        if !finite {
            num_nan += 1;
        }
        out.frame_bispectrum.column_mut(i).mapv_inplace(|f| f / bc);
    }
    if num_nan > 0 {
        warn!("{num_nan} calibrated observables are not finite and have been flagged");
    }

    out.calibrated = true;
    out.calibrators = calibrators.iter().map(|c| c.info.clone()).collect();
    Ok(out)
}

fn check_compatible(
    target: &ObservableBundle,
    cal: &ObservableBundle,
) -> Result<(), CalibrationError> {
    let incompatible =
        |what: &'static str, expected: String, got: String| -> Result<(), CalibrationError> {
            Err(CalibrationError::Incompatible {
                calibrator: cal.info.target.clone(),
                what,
                expected,
                got,
            })
        };

    if cal.calibrated {
        return Err(CalibrationError::AlreadyCalibrated(cal.info.target.clone()));
    }
    if target.info.instrument != cal.info.instrument {
        return incompatible(
            "instrument",
            target.info.instrument.to_string(),
            cal.info.instrument.to_string(),
        );
    }
    if !target.info.mask.eq_ignore_ascii_case(&cal.info.mask) {
        return incompatible("mask", target.info.mask.clone(), cal.info.mask.clone());
    }
    if !target.info.filter.eq_ignore_ascii_case(&cal.info.filter) {
        return incompatible(
            "filter",
            target.info.filter.clone(),
            cal.info.filter.clone(),
        );
    }
    if target.num_baselines() != cal.num_baselines() {
        return incompatible(
            "number of baselines",
            target.num_baselines().to_string(),
            cal.num_baselines().to_string(),
        );
    }
    if target.num_triangles() != cal.num_triangles() {
        return incompatible(
            "number of triangles",
            target.num_triangles().to_string(),
            cal.num_triangles().to_string(),
        );
    }
    let (wt, wc) = (target.info.wavelength, cal.info.wavelength);
    if (wt - wc).abs() > 1e-9 * wt.abs() {
        return incompatible("wavelength", format!("{wt:e}"), format!("{wc:e}"));
    }
    Ok(())
}

/// Calibrator observables, combined over calibrators.
struct Combined {
    vis2: Vec<f64>,
    vis2_err: Vec<f64>,
    baseline_flags: Vec<bool>,
    bispectrum: Vec<Complex64>,
    bispectrum_amp_err: Vec<f64>,
    closure_phase: Vec<f64>,
    closure_phase_err: Vec<f64>,
    triangle_flags: Vec<bool>,
}

/// Inverse-variance weighted means of V², bispectrum amplitudes and
/// (circular) closure phases. If any error of a quantity is unusable (e.g. a
/// calibrator with a single frame), that quantity is weighted equally.
fn combine(calibrators: &[ObservableBundle]) -> Combined {
    let first = &calibrators[0];
    if calibrators.len() == 1 {
        return Combined {
            vis2: first.vis2.clone(),
            vis2_err: first.vis2_err.clone(),
            baseline_flags: first.baseline_flags.clone(),
            bispectrum: first.bispectrum.clone(),
            bispectrum_amp_err: first.bispectrum_amp_err.clone(),
            closure_phase: first.closure_phase.clone(),
            closure_phase_err: first.closure_phase_err.clone(),
            triangle_flags: first.triangle_flags.clone(),
        };
    }
    debug!("Combining {} calibrators", calibrators.len());

    let num_baselines = first.num_baselines();
    let num_triangles = first.num_triangles();
    let mut combined = Combined {
        vis2: Vec::with_capacity(num_baselines),
        vis2_err: Vec::with_capacity(num_baselines),
        baseline_flags: Vec::with_capacity(num_baselines),
        bispectrum: Vec::with_capacity(num_triangles),
        bispectrum_amp_err: Vec::with_capacity(num_triangles),
        closure_phase: Vec::with_capacity(num_triangles),
        closure_phase_err: Vec::with_capacity(num_triangles),
        triangle_flags: Vec::with_capacity(num_triangles),
    };

    for i in 0..num_baselines {
        let values: Vec<f64> = calibrators.iter().map(|c| c.vis2[i]).collect();
        let errors: Vec<f64> = calibrators.iter().map(|c| c.vis2_err[i]).collect();
        let weights = weights(&errors);
        let sum_w: f64 = weights.iter().sum();
        let mean = values.iter().zip(&weights).map(|(v, w)| v * w).sum::<f64>() / sum_w;
        // For equal weights, this is the error of the mean of independent
        // measurements.
        let err = weights
            .iter()
            .zip(&errors)
            .map(|(w, e)| (w * e).powi(2))
            .sum::<f64>()
            .sqrt()
            / sum_w;
        combined.vis2.push(mean);
        combined.vis2_err.push(err);
        combined
            .baseline_flags
            .push(calibrators.iter().any(|c| c.baseline_flags[i]));
    }

    for i in 0..num_triangles {
        let errors: Vec<f64> = calibrators.iter().map(|c| c.closure_phase_err[i]).collect();
        let weights = weights(&errors);
        let sum_w: f64 = weights.iter().sum();
        let (sin, cos) = calibrators
            .iter()
            .zip(&weights)
            .fold((0.0, 0.0), |(s, c), (cal, w)| {
                let (ps, pc) = cal.closure_phase[i].sin_cos();
                (s + w * ps, c + w * pc)
            });
        let closure_phase = if sin.hypot(cos) > 0.0 {
            wrap_phase(sin.atan2(cos))
        } else {
            f64::NAN
        };

        // The bispectrum's phase is the closure phase; its amplitude is
        // weighted by the amplitude errors.
        let amp_errors: Vec<f64> = calibrators
            .iter()
            .map(|c| c.bispectrum_amp_err[i])
            .collect();
        let amp_weights = self::weights(&amp_errors);
        let sum_amp_w: f64 = amp_weights.iter().sum();
        let amplitude = calibrators
            .iter()
            .zip(&amp_weights)
            .map(|(cal, w)| cal.bispectrum[i].norm() * w)
            .sum::<f64>()
            / sum_amp_w;
        let amp_err = amp_weights
            .iter()
            .zip(&amp_errors)
            .map(|(w, e)| (w * e).powi(2))
            .sum::<f64>()
            .sqrt()
            / sum_amp_w;
        let cp_err = weights
            .iter()
            .zip(&errors)
            .map(|(w, e)| (w * e).powi(2))
            .sum::<f64>()
            .sqrt()
            / sum_w;
        combined
            .bispectrum
            .push(Complex64::from_polar(amplitude, closure_phase));
        combined.bispectrum_amp_err.push(amp_err);
        combined.closure_phase.push(closure_phase);
        combined.closure_phase_err.push(cp_err);
        combined
            .triangle_flags
            .push(calibrators.iter().any(|c| c.triangle_flags[i]));
    }

    combined
}

/// `1/σ²`, or all ones if any error isn't finite and positive.
fn weights(errors: &[f64]) -> Vec<f64> {
    if errors.iter().all(|e| e.is_finite() && *e > 0.0) {
        errors.iter().map(|e| 1.0 / (e * e)).collect()
    } else {
        vec![1.0; errors.len()]
    }
}

fn finite_or_nan(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        f64::NAN
    }
}
