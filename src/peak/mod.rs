// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Estimating the complex fringe of a splodge from a transformed frame.

mod gauss;

use itertools::iproduct;
use ndarray::ArrayView2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::uv::{wrap_index, Splodge};

/// How a splodge is turned into a single complex number.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Display,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum PeakMethod {
    /// The transform at the pixel nearest the splodge centre.
    #[default]
    Fft,

    /// Fit a circular 2D Gaussian to the power in the search window.
    Gauss,

    /// Sum the transform over a square around the splodge centre.
    Square,
}

lazy_static::lazy_static! {
    pub static ref PEAK_METHODS_COMMA_SEPARATED: String = PeakMethod::iter().map(|m| m.to_string()).collect::<Vec<_>>().join(", ");
}

/// A fringe estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakEstimate {
    pub value: Complex64,

    /// The number of Fourier pixels that contributed. Noise power adds up
    /// over these.
    pub n_pix: usize,

    /// A Gaussian fit failed and the nearest-pixel value was used instead.
    pub fell_back: bool,
}

impl PeakEstimate {
    /// The estimate's amplitude relative to the noise expected over the
    /// pixels that contributed.
    pub fn peak_to_noise(&self, noise_power: f64) -> f64 {
        self.value.norm() / (noise_power * self.n_pix as f64).sqrt()
    }

    /// Is this estimate too close to the noise to be trusted?
    pub fn is_low_quality(&self, noise_power: f64, cutoff: f64) -> bool {
        // A NaN ratio is low quality too.
        !(self.peak_to_noise(noise_power) >= cutoff)
    }
}

/// Read the transform at the signed Fourier pixel `(ky, kx)`.
pub(crate) fn read(ft: ArrayView2<Complex64>, ky: isize, kx: isize, conjugate: bool) -> Complex64 {
    let (ny, nx) = ft.dim();
    let v = ft[(wrap_index(ky, ny), wrap_index(kx, nx))];
    if conjugate {
        v.conj()
    } else {
        v
    }
}

/// Estimate the complex fringe of `splodge`, searching within `radius`
/// Fourier pixels of its centre.
pub fn estimate(
    method: PeakMethod,
    ft: ArrayView2<Complex64>,
    splodge: &Splodge,
    radius: f64,
) -> PeakEstimate {
    match method {
        PeakMethod::Fft => nearest(ft, splodge),

        PeakMethod::Square => {
            let [kx, ky] = splodge.centre;
            let (cx, cy) = (kx.round() as isize, ky.round() as isize);
            let half = radius.round().max(0.0) as isize;
            let value = iproduct!(-half..=half, -half..=half)
                .map(|(dy, dx)| read(ft, cy + dy, cx + dx, splodge.conjugate))
                .sum();
            let side = (2 * half + 1) as usize;
            PeakEstimate {
                value,
                n_pix: side * side,
                fell_back: false,
            }
        }

        PeakMethod::Gauss => match gauss::fit(ft, splodge, radius) {
            Some(fit) => {
                let phase = read(
                    ft,
                    fit.y0.round() as isize,
                    fit.x0.round() as isize,
                    splodge.conjugate,
                )
                .arg();
                PeakEstimate {
                    value: Complex64::from_polar(fit.amplitude.sqrt(), phase),
                    n_pix: 1,
                    fell_back: false,
                }
            }
            None => PeakEstimate {
                fell_back: true,
                ..nearest(ft, splodge)
            },
        },
    }
}

/// The sum of the triple products `V_ij * V_jk * conj(V_ik)` of every set of
/// pixels in a triangle's splodges whose spatial frequencies close. Pixels
/// are taken within `radius` of the nearest pixels to the `ij` and `jk`
/// splodge centres, and the `ik` pixel that closes them must be within
/// `radius` of the sum of those. The transform must be of a real frame.
pub fn closing_triple_product(
    ft: ArrayView2<Complex64>,
    ij: &Splodge,
    jk: &Splodge,
    radius: f64,
) -> Complex64 {
    // Signed, unreflected frequencies.
    let frequency = |s: &Splodge| {
        let sign = if s.conjugate { -1 } else { 1 };
        [
            sign * s.centre[0].round() as isize,
            sign * s.centre[1].round() as isize,
        ]
    };
    let p_ij = frequency(ij);
    let p_jk = frequency(jk);
    let p_ik = [p_ij[0] + p_jk[0], p_ij[1] + p_jk[1]];

    let half = radius.floor().max(0.0) as isize;
    let within = |[dx, dy]: [isize; 2]| ((dx * dx + dy * dy) as f64) <= radius * radius;
    let offsets: Vec<[isize; 2]> = iproduct!(-half..=half, -half..=half)
        .map(|(dy, dx)| [dx, dy])
        .filter(|&d| within(d))
        .collect();
    // A real frame's transform is Hermitian, so any frequency can be read
    // directly.
    let at = |p: [isize; 2], [dx, dy]: [isize; 2]| read(ft, p[1] + dy, p[0] + dx, false);

    iproduct!(offsets.iter(), offsets.iter())
        .filter_map(|(&d1, &d2)| {
            let d3 = [d1[0] + d2[0], d1[1] + d2[1]];
            within(d3).then(|| at(p_ij, d1) * at(p_jk, d2) * at(p_ik, d3).conj())
        })
        .sum()
}

fn nearest(ft: ArrayView2<Complex64>, splodge: &Splodge) -> PeakEstimate {
    let [kx, ky] = splodge.centre;
    PeakEstimate {
        value: read(
            ft,
            ky.round() as isize,
            kx.round() as isize,
            splodge.conjugate,
        ),
        n_pix: 1,
        fell_back: false,
    }
}
