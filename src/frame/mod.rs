// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Fourier transforms of individual frames.


use std::sync::Arc;

use ndarray::{Array2, ArrayView2, Axis};
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

/// Transforms frames of one shape. The FFT plans are made once and shared
/// between threads.
#[derive(Clone)]
pub struct FrameTransform {
    ny: usize,
    nx: usize,
    row_fft: Arc<dyn Fft<f64>>,
    col_fft: Arc<dyn Fft<f64>>,
    window: Option<Array2<f64>>,
}

impl std::fmt::Debug for FrameTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameTransform")
            .field("ny", &self.ny)
            .field("nx", &self.nx)
            .field("window", &self.window.is_some())
            .finish()
    }
}

impl FrameTransform {
    /// If `window_fwhm` is given, every frame is multiplied by a
    /// super-Gaussian of that full width at half maximum \[pixels\] before it
    /// is transformed.
    pub fn new(ny: usize, nx: usize, window_fwhm: Option<f64>) -> FrameTransform {
        let mut planner = FftPlanner::new();
        let row_fft = planner.plan_fft_forward(nx);
        let col_fft = planner.plan_fft_forward(ny);
        FrameTransform {
            ny,
            nx,
            row_fft,
            col_fft,
            window: window_fwhm.map(|fwhm| apodization_window(ny, nx, fwhm)),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.ny, self.nx)
    }

    /// The 2D FFT of a frame. The frame's centre pixel `(ny/2, nx/2)` is
    /// moved to the origin first, so a centred source has no phase ramp.
    pub fn transform(&self, frame: ArrayView2<f64>) -> Array2<Complex64> {
        let (ny, nx) = (self.ny, self.nx);
        debug_assert_eq!(frame.dim(), (ny, nx));

        let mut buffer = Array2::from_shape_fn((ny, nx), |(row, col)| {
            let src = ((row + ny / 2) % ny, (col + nx / 2) % nx);
            let weight = self.window.as_ref().map(|w| w[src]).unwrap_or(1.0);
            Complex64::new(frame[src] * weight, 0.0)
        });

        // Rows are contiguous in a standard-layout array.
        for mut row in buffer.axis_iter_mut(Axis(0)) {
            match row.as_slice_mut() {
                Some(slice) => self.row_fft.process(slice),
                None => {
                    let mut scratch = row.to_vec();
                    self.row_fft.process(&mut scratch);
                    row.iter_mut().zip(scratch).for_each(|(r, s)| *r = s);
                }
            }
        }
        let mut column = vec![Complex64::default(); ny];
        for mut col in buffer.axis_iter_mut(Axis(1)) {
            column.iter_mut().zip(col.iter()).for_each(|(c, v)| *c = *v);
            self.col_fft.process(&mut column);
            col.iter_mut().zip(column.iter()).for_each(|(v, c)| *v = *c);
        }

        buffer
    }
}

/// A super-Gaussian `exp(-(r/r0)^4)` centred on the frame's centre pixel,
/// falling to one half at a radius of `fwhm / 2`.
pub fn apodization_window(ny: usize, nx: usize, fwhm: f64) -> Array2<f64> {
    let r0 = (fwhm / 2.0) / std::f64::consts::LN_2.powf(0.25);
    let (cy, cx) = ((ny / 2) as f64, (nx / 2) as f64);
    Array2::from_shape_fn((ny, nx), |(row, col)| {
        let r = (row as f64 - cy).hypot(col as f64 - cx);
        (-(r / r0).powi(4)).exp()
    })
}

/// The mean power of a transformed frame over the pixels where `noise` is
/// `true`. Without any noise pixels there is no measurable bias, so it is
/// zero.
pub fn noise_power(transformed: ArrayView2<Complex64>, noise: ArrayView2<bool>) -> f64 {
    let (sum, count) = transformed
        .iter()
        .zip(noise.iter())
        .filter(|(_, &is_noise)| is_noise)
        .fold((0.0, 0usize), |(sum, count), (v, _)| {
            (sum + v.norm_sqr(), count + 1)
        });
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
