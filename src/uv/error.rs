// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with placing splodges on a frame's Fourier plane.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Baseline {baseline} (apertures {i} and {j}) lands at Fourier pixel ({kx:.2}, {ky:.2}) with a window radius of {radius:.2}, beyond the Nyquist limit of a {ny}x{nx} frame; the frames are too small or the pixel scale too coarse for this mask and filter")]
    BeyondNyquist {
        baseline: usize,
        i: usize,
        j: usize,
        kx: f64,
        ky: f64,
        radius: f64,
        ny: usize,
        nx: usize,
    },

    #[error("Frames of shape {ny}x{nx} are too small to extract anything from")]
    FrameTooSmall { ny: usize, nx: usize },

    #[error("The {what} must be finite and positive, but got {value}")]
    BadParameter { what: &'static str, value: f64 },

    #[error("Channel {i_wl} was requested, but there are only {n_wl} channels")]
    BadChannel { i_wl: usize, n_wl: usize },
}
