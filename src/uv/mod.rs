// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Where each baseline's fringe power ("splodge") lands in the Fourier
//! transform of a frame.
//!
//! A baseline `b` observed at wavelength `λ` has spatial frequency `u = b/λ`
//! \[cycles per radian\]. On a frame of `N` pixels of angular size `θ`, that
//! is Fourier pixel `k = u θ N`. Only half of the Fourier plane is needed
//! for a real frame; splodges on the other half are reflected through the
//! origin and marked for conjugation.

mod error;

pub use error::GeometryError;

use log::{debug, trace};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::{constants::MAS_TO_RAD, mask::FilterDefinition, mask::Mask};

/// A point in the Fourier plane of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Splodge {
    /// The (possibly fractional) centre `(kx, ky)` \[Fourier pixels\]. Always
    /// in the half plane `kx > 0 || (kx == 0 && ky >= 0)`.
    pub centre: [f64; 2],

    /// Was the centre reflected through the origin? If so, values read from
    /// the frame's transform must be conjugated.
    pub conjugate: bool,

    /// The nearest pixel to the centre as (row, column), wrapped into the
    /// frame.
    pub pixel: (usize, usize),
}

impl Splodge {
    /// Place a splodge at `(kx, ky)` on a `ny` by `nx` Fourier plane.
    pub fn new(kx: f64, ky: f64, ny: usize, nx: usize) -> Splodge {
        let conjugate = kx < 0.0 || (kx == 0.0 && ky < 0.0);
        let (kx, ky) = if conjugate { (-kx, -ky) } else { (kx, ky) };
        let pixel = (
            wrap_index(ky.round() as isize, ny),
            wrap_index(kx.round() as isize, nx),
        );
        Splodge {
            centre: [kx, ky],
            conjugate,
            pixel,
        }
    }

    /// The origin (total flux).
    pub fn dc() -> Splodge {
        Splodge {
            centre: [0.0, 0.0],
            conjugate: false,
            pixel: (0, 0),
        }
    }
}

/// Wrap a signed Fourier index into `0..n`.
pub fn wrap_index(k: isize, n: usize) -> usize {
    k.rem_euclid(n as isize) as usize
}

/// The signed frequency of array index `index` on an axis of length `n`.
pub fn signed_frequency(index: usize, n: usize) -> isize {
    if index <= n / 2 {
        index as isize
    } else {
        index as isize - n as isize
    }
}

/// The central wavelengths of `n_wl` channels that evenly split a filter's
/// bandpass \[metres\].
pub fn channel_wavelengths(filter: &FilterDefinition, n_wl: usize) -> Vec<f64> {
    let start = filter.wavelength - filter.bandwidth / 2.0;
    let step = filter.bandwidth / n_wl as f64;
    (0..n_wl)
        .map(|c| start + (c as f64 + 0.5) * step)
        .collect()
}

/// The wavelength of channel `i_wl` out of `n_wl`.
pub fn channel_wavelength(
    filter: &FilterDefinition,
    n_wl: usize,
    i_wl: usize,
) -> Result<f64, GeometryError> {
    if n_wl == 0 || i_wl >= n_wl {
        return Err(GeometryError::BadChannel { i_wl, n_wl });
    }
    Ok(channel_wavelengths(filter, n_wl)[i_wl])
}

/// The splodges of every baseline of a mask for one frame size, pixel scale
/// and wavelength. Built once per channel and only read afterwards.
#[derive(Debug, Clone)]
pub struct SplodgeGeometry {
    pub ny: usize,
    pub nx: usize,

    /// \[metres\]
    pub wavelength: f64,

    /// \[milliarcseconds per pixel\]
    pub pixel_scale_mas: f64,

    /// The search-window radius around each splodge centre \[Fourier
    /// pixels\].
    pub radius: f64,

    /// One per baseline, in baseline order.
    pub splodges: Vec<Splodge>,

    pub dc: Splodge,

    /// Baseline spatial frequencies `(u, v)` before any reflection
    /// \[wavelengths\].
    pub uv: Vec<[f64; 2]>,

    /// `true` where the power spectrum is free of fringe power.
    noise: Array2<bool>,

    num_noise_pixels: usize,
}

impl SplodgeGeometry {
    pub fn new(
        mask: &Mask,
        wavelength: f64,
        pixel_scale_mas: f64,
        fw_splodge: f64,
        ny: usize,
        nx: usize,
    ) -> Result<SplodgeGeometry, GeometryError> {
        for (what, value) in [
            ("wavelength", wavelength),
            ("pixel scale", pixel_scale_mas),
            ("splodge window fraction", fw_splodge),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(GeometryError::BadParameter { what, value });
            }
        }
        if ny < 4 || nx < 4 {
            return Err(GeometryError::FrameTooSmall { ny, nx });
        }

        let theta = pixel_scale_mas * MAS_TO_RAD;
        let n = ny.min(nx) as f64;
        // The splodge of a single hole pair has a radius of D/λ in the uv
        // plane; the search window is a fraction of that.
        let support = mask.hole_diameter / wavelength * theta * n;
        let radius = fw_splodge * support;
        trace!("Splodge support {support:.3} px, window radius {radius:.3} px");

        let mut uv = Vec::with_capacity(mask.num_baselines());
        let mut splodges = Vec::with_capacity(mask.num_baselines());
        for (i_bl, baseline) in mask.baselines.iter().enumerate() {
            let u = baseline.vector[0] / wavelength;
            let v = baseline.vector[1] / wavelength;
            let kx = u * theta * nx as f64;
            let ky = v * theta * ny as f64;
            if kx.abs() + radius > nx as f64 / 2.0 || ky.abs() + radius > ny as f64 / 2.0 {
                let (i, j) = baseline.apertures;
                return Err(GeometryError::BeyondNyquist {
                    baseline: i_bl,
                    i,
                    j,
                    kx,
                    ky,
                    radius,
                    ny,
                    nx,
                });
            }
            uv.push([u, v]);
            splodges.push(Splodge::new(kx, ky, ny, nx));
        }

        // Everything within one support radius of the origin or any splodge
        // (on either half of the plane) carries signal.
        let support_sq = support * support;
        let mut noise = Array2::from_elem((ny, nx), true);
        for ((row, col), is_noise) in noise.indexed_iter_mut() {
            let fy = signed_frequency(row, ny) as f64;
            let fx = signed_frequency(col, nx) as f64;
            if fx * fx + fy * fy <= support_sq {
                *is_noise = false;
                continue;
            }
            *is_noise = !splodges.iter().any(|s| {
                let [kx, ky] = s.centre;
                let plus = (fx - kx).powi(2) + (fy - ky).powi(2);
                let minus = (fx + kx).powi(2) + (fy + ky).powi(2);
                plus <= support_sq || minus <= support_sq
            });
        }
        let num_noise_pixels = noise.iter().filter(|&&b| b).count();
        debug!(
            "Splodge geometry for λ = {:.4} µm on {ny}x{nx} frames: window radius {radius:.2} px, {num_noise_pixels} noise pixels",
            wavelength * 1e6
        );

        Ok(SplodgeGeometry {
            ny,
            nx,
            wavelength,
            pixel_scale_mas,
            radius,
            splodges,
            dc: Splodge::dc(),
            uv,
            noise,
            num_noise_pixels,
        })
    }

    pub fn noise_mask(&self) -> ArrayView2<bool> {
        self.noise.view()
    }

    pub fn num_noise_pixels(&self) -> usize {
        self.num_noise_pixels
    }
}
