// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Aperture-mask geometry: sub-aperture coordinates and the baseline and
//! closure-triangle tables derived from them.

mod catalog;
mod error;
#[cfg(test)]
mod tests;

pub use catalog::{FilterDefinition, Instrument, InstrumentEntry, MaskDefinition};
pub(crate) use catalog::CATALOG;
pub use error::MaskError;

use std::str::FromStr;

use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use vec1::Vec1;

lazy_static::lazy_static! {
    pub static ref INSTRUMENTS_COMMA_SEPARATED: String = Instrument::iter().join(", ");
}

/// A pair of apertures. The first aperture ID is always the smaller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub apertures: (usize, usize),

    /// `x_i - x_j` in the pupil plane \[metres\].
    pub vector: [f64; 2],
}

/// A closure triangle of apertures `(i, j, k)` with `i < j < k`. The three
/// baselines are `(i, j)`, `(j, k)` and `(i, k)`; going around the triangle
/// traverses the last one backwards, hence its negative sign. The triple
/// product is `V_ij * V_jk * conj(V_ik)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triangle {
    pub apertures: [usize; 3],
    pub baselines: [usize; 3],
    pub signs: [i8; 3],
}

/// Modifications applied to a catalogue mask.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskOptions {
    /// Counter-clockwise rotation of the mask on the detector \[degrees\].
    pub theta_detector: f64,

    /// Multiplicative correction of the mask's scale.
    pub scaling_uv: f64,

    /// Override the catalogue sub-aperture diameter \[metres\].
    pub hole_diam: Option<f64>,
}

impl Default for MaskOptions {
    fn default() -> Self {
        Self {
            theta_detector: 0.0,
            scaling_uv: 1.0,
            hole_diam: None,
        }
    }
}

/// Everything needed to know about a mask's sampling of the Fourier plane.
/// Once built, it is only ever read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mask {
    pub instrument: Instrument,

    pub name: String,

    /// Sub-aperture centres after rotation and scaling \[metres\].
    pub apertures: Vec1<[f64; 2]>,

    /// \[metres\]
    pub hole_diameter: f64,

    pub baselines: Vec<Baseline>,

    pub triangles: Vec<Triangle>,
}

impl Mask {
    /// Build the mask `mask_name` of `instrument` from the catalogue.
    pub fn new(
        instrument: Instrument,
        mask_name: &str,
        options: &MaskOptions,
    ) -> Result<Mask, MaskError> {
        let entry = instrument_entry(instrument)?;
        let definition = entry
            .masks
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(mask_name))
            .ok_or_else(|| MaskError::UnknownMask {
                instrument: instrument.to_string(),
                mask: mask_name.to_string(),
                valid: entry.masks.iter().map(|m| m.name).join(", "),
            })?;
        debug!(
            "Using {instrument} mask {} ({} holes)",
            definition.name,
            definition.holes.len()
        );

        Mask::from_apertures(
            instrument,
            definition.name,
            definition.holes.as_slice(),
            definition.hole_diameter,
            options,
        )
    }

    /// Build a mask from arbitrary aperture coordinates \[metres\].
    pub fn from_apertures(
        instrument: Instrument,
        name: &str,
        holes: &[[f64; 2]],
        hole_diameter: f64,
        options: &MaskOptions,
    ) -> Result<Mask, MaskError> {
        let MaskOptions {
            theta_detector,
            scaling_uv,
            hole_diam,
        } = *options;
        if !(scaling_uv.is_finite() && scaling_uv > 0.0) {
            return Err(MaskError::BadOption {
                what: "uv scaling factor",
                value: scaling_uv,
            });
        }
        if !theta_detector.is_finite() {
            return Err(MaskError::BadOption {
                what: "detector rotation",
                value: theta_detector,
            });
        }
        let hole_diameter = hole_diam.unwrap_or(hole_diameter);
        if !(hole_diameter.is_finite() && hole_diameter > 0.0) {
            return Err(MaskError::BadOption {
                what: "hole diameter",
                value: hole_diameter,
            });
        }
        if holes.len() < 3 {
            return Err(MaskError::TooFewApertures(holes.len()));
        }
        for ((i, a), (j, b)) in holes.iter().enumerate().tuple_combinations() {
            if a == b {
                return Err(MaskError::DuplicateAperture(i, j));
            }
        }

        let (s, c) = theta_detector.to_radians().sin_cos();
        let apertures: Vec<[f64; 2]> = holes
            .iter()
            .map(|&[x, y]| [(c * x - s * y) * scaling_uv, (s * x + c * y) * scaling_uv])
            .collect();
        let n = apertures.len();

        let baselines = (0..n)
            .tuple_combinations()
            .map(|(i, j)| Baseline {
                apertures: (i, j),
                vector: [
                    apertures[i][0] - apertures[j][0],
                    apertures[i][1] - apertures[j][1],
                ],
            })
            .collect();
        let triangles = (0..n)
            .tuple_combinations()
            .map(|(i, j, k)| Triangle {
                apertures: [i, j, k],
                baselines: [
                    baseline_index(n, i, j),
                    baseline_index(n, j, k),
                    baseline_index(n, i, k),
                ],
                signs: [1, 1, -1],
            })
            .collect();

        Ok(Mask {
            instrument,
            name: name.to_string(),
            // This can't fail; we checked the number of holes above.
            apertures: Vec1::try_from_vec(apertures).map_err(|_| MaskError::TooFewApertures(0))?,
            hole_diameter,
            baselines,
            triangles,
        })
    }

    pub fn num_apertures(&self) -> usize {
        self.apertures.len()
    }

    pub fn num_baselines(&self) -> usize {
        self.baselines.len()
    }

    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// The longest baseline \[metres\].
    pub fn max_baseline(&self) -> f64 {
        self.baselines
            .iter()
            .map(|b| b.vector[0].hypot(b.vector[1]))
            .fold(0.0, f64::max)
    }
}

/// The index into a lexicographically-ordered baseline table of `n`
/// apertures for the pair `(i, j)`, `i < j`.
pub fn baseline_index(n: usize, i: usize, j: usize) -> usize {
    debug_assert!(i < j && j < n);
    i * n - i * (i + 1) / 2 + (j - i - 1)
}

/// Parse an instrument name (case insensitive).
pub fn parse_instrument(name: &str) -> Result<Instrument, MaskError> {
    Instrument::from_str(name.trim()).map_err(|_| MaskError::UnknownInstrument {
        name: name.to_string(),
        valid: INSTRUMENTS_COMMA_SEPARATED.clone(),
    })
}

pub(crate) fn instrument_entry(
    instrument: Instrument,
) -> Result<&'static InstrumentEntry, MaskError> {
    CATALOG
        .get(instrument)
        .ok_or_else(|| MaskError::UnknownInstrument {
            name: instrument.to_string(),
            valid: INSTRUMENTS_COMMA_SEPARATED.clone(),
        })
}

/// Look up a filter of an instrument (case insensitive).
pub fn get_filter(
    instrument: Instrument,
    filter_name: &str,
) -> Result<&'static FilterDefinition, MaskError> {
    let entry = instrument_entry(instrument)?;
    entry
        .filters
        .iter()
        .find(|f| f.name.eq_ignore_ascii_case(filter_name.trim()))
        .ok_or_else(|| MaskError::UnknownFilter {
            instrument: instrument.to_string(),
            filter: filter_name.to_string(),
            valid: entry.filters.iter().map(|f| f.name).join(", "),
        })
}

/// The native pixel scale of an instrument \[milliarcseconds\], if it has one.
pub fn get_pixel_scale(instrument: Instrument) -> Option<f64> {
    CATALOG.get(instrument).and_then(|e| e.pixel_scale_mas)
}

/// Every catalogue mask as (instrument, mask name, number of holes).
pub fn list_masks() -> Vec<(Instrument, &'static str, usize)> {
    CATALOG
        .iter()
        .flat_map(|(&instrument, entry)| {
            entry
                .masks
                .iter()
                .map(move |m| (instrument, m.name, m.holes.len()))
        })
        .collect()
}
