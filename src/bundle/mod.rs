// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The result of an extraction: averaged observables, their uncertainties,
//! the per-frame series they came from and where they came from.

mod nullable;

use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::{
    bispectrum::ExtractParams,
    instrument::{profile_for, Header},
    mask::{Instrument, Mask},
};

/// Metadata describing an observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationInfo {
    pub instrument: Instrument,
    pub telescope: String,
    pub mask: String,
    pub filter: String,

    /// Central wavelength of the extracted channel \[metres\].
    pub wavelength: f64,

    /// Width of the extracted channel \[metres\].
    #[serde(with = "nullable::f64_value")]
    pub bandwidth: f64,

    /// \[milliarcseconds per pixel\]
    #[serde(with = "nullable::f64_value")]
    pub pixel_scale_mas: f64,

    pub target: String,
    pub date_obs: Option<String>,
    pub observer: Option<String>,
    pub mjd: Option<f64>,

    /// \[degrees\]
    pub parallactic_angle: Option<f64>,

    /// \[degrees\]
    pub ra: Option<f64>,

    /// \[degrees\]
    pub dec: Option<f64>,

    /// The file the cube was read from, if any.
    pub source_file: Option<String>,

    /// The cube's header, verbatim.
    pub header: Header,
}

impl ObservationInfo {
    /// Gather metadata from a header with the instrument's profile. The
    /// target name falls back to "Unknown" and the telescope to the
    /// catalogue's.
    #[allow(clippy::too_many_arguments)]
    pub fn from_header(
        instrument: Instrument,
        mask: &str,
        filter: &str,
        wavelength: f64,
        bandwidth: f64,
        pixel_scale_mas: f64,
        header: Option<&Header>,
        target: Option<&str>,
    ) -> ObservationInfo {
        let empty = Header::new();
        let header = header.unwrap_or(&empty);
        let metadata = profile_for(instrument)
            .extract_metadata(header)
            .with_fallbacks(instrument);

        ObservationInfo {
            instrument,
            telescope: metadata
                .telescope
                .unwrap_or_else(|| instrument.to_string()),
            mask: mask.to_string(),
            filter: filter.to_string(),
            wavelength,
            bandwidth,
            pixel_scale_mas,
            target: target
                .map(|t| t.to_string())
                .or(metadata.target)
                .unwrap_or_else(|| "Unknown".to_string()),
            date_obs: metadata.date_obs,
            observer: metadata.observer,
            mjd: metadata.mjd,
            parallactic_angle: metadata.parallactic_angle,
            ra: metadata.ra,
            dec: metadata.dec,
            source_file: None,
            header: header.clone(),
        }
    }
}

/// Squared visibilities and bispectra averaged over a cube.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservableBundle {
    pub info: ObservationInfo,

    /// How the observables were extracted. Not known for bundles loaded from
    /// OIFITS files written elsewhere.
    pub params: Option<ExtractParams>,

    /// The mask geometry; baselines and triangles are indexed as here.
    pub mask: Mask,

    // Per baseline. Values that can't be measured are NaN.
    #[serde(with = "nullable::vec_f64")]
    pub vis2: Vec<f64>,
    #[serde(with = "nullable::vec_f64")]
    pub vis2_err: Vec<f64>,
    /// `(u, v)` \[wavelengths\]
    pub uv: Vec<[f64; 2]>,
    pub baseline_flags: Vec<bool>,

    // Per triangle.
    #[serde(with = "nullable::vec_c64")]
    pub bispectrum: Vec<Complex64>,
    #[serde(with = "nullable::vec_f64")]
    pub bispectrum_amp_err: Vec<f64>,
    /// \[radians\]
    #[serde(with = "nullable::vec_f64")]
    pub closure_phase: Vec<f64>,
    /// \[radians\]
    #[serde(with = "nullable::vec_f64")]
    pub closure_phase_err: Vec<f64>,
    pub triangle_flags: Vec<bool>,

    /// V² of each kept frame, shape `(kept frames, baselines)`.
    #[serde(with = "nullable::array2_f64")]
    pub frame_vis2: Array2<f64>,

    /// Bispectra of each kept frame, shape `(kept frames, triangles)`.
    #[serde(with = "nullable::array2_c64")]
    pub frame_bispectrum: Array2<Complex64>,

    /// The indices of the frames that survived clipping.
    pub kept_frames: Vec<usize>,

    /// The number of frames in the cube.
    pub num_frames: usize,

    /// The number of Gaussian splodge fits that fell back to the nearest
    /// pixel.
    pub num_fallbacks: usize,

    pub calibrated: bool,

    /// Provenance of the calibrators, if calibrated.
    pub calibrators: Vec<ObservationInfo>,
}

impl ObservableBundle {
    pub fn num_baselines(&self) -> usize {
        self.vis2.len()
    }

    pub fn num_triangles(&self) -> usize {
        self.closure_phase.len()
    }

    pub fn num_kept_frames(&self) -> usize {
        self.kept_frames.len()
    }

    /// The spatial frequencies of the first two baselines of a triangle
    /// \[wavelengths\]; the third is implied.
    pub fn triangle_uv(&self, triangle: usize) -> [[f64; 2]; 2] {
        let [b1, b2, _] = self.mask.triangles[triangle].baselines;
        [self.uv[b1], self.uv[b2]]
    }

    /// \[degrees\]
    pub fn closure_phase_deg(&self) -> Vec<f64> {
        self.closure_phase.iter().map(|cp| cp.to_degrees()).collect()
    }
}
