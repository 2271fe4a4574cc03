// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Extracting squared visibilities and bispectra from an image cube.
//!
//! Frames are independent, so they are transformed and measured in parallel
//! on a rayon thread pool. Each worker only reads the shared mask, splodge
//! geometry and FFT plans, and produces an immutable record for its frame.
//! The records come back in frame order and are reduced on one thread.

mod error;
mod params;
mod reduce;

pub use error::ExtractError;
pub use params::ExtractParams;

use indicatif::{ParallelProgressIterator, ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info};
use ndarray::{ArrayView2, ArrayView3, ArrayView4, Axis};
use rayon::prelude::*;

use crate::{
    bundle::{ObservableBundle, ObservationInfo},
    frame::{noise_power, FrameTransform},
    instrument::{profile_for, Header},
    mask::{get_filter, FilterDefinition, Mask},
    peak::{closing_triple_product, estimate, PeakEstimate},
    uv::{channel_wavelength, SplodgeGeometry},
    PROGRESS_BARS,
};
use reduce::{reduce, FrameRecord};

/// Extract observables from a single-channel cube `(frames, ny, nx)`. The
/// header, if given, supplies the observation metadata.
pub fn extract_bispectrum(
    cube: ArrayView3<f64>,
    params: &ExtractParams,
    header: Option<&Header>,
) -> Result<ObservableBundle, ExtractError> {
    Extractor::new(params)?.extract(cube, header)
}

/// Extract observables from a spectral cube `(channels, frames, ny, nx)`,
/// one bundle per channel.
pub fn extract_bispectrum_spectral(
    cube: ArrayView4<f64>,
    params: &ExtractParams,
    header: Option<&Header>,
) -> Result<Vec<ObservableBundle>, ExtractError> {
    Extractor::new(params)?.extract_spectral(cube, header)
}

/// A mask and filter ready to extract cubes. The mask is built once and
/// reused for every cube (and channel).
#[derive(Debug, Clone)]
pub struct Extractor {
    mask: Mask,
    filter: FilterDefinition,
    params: ExtractParams,
    pixel_scale_mas: f64,
}

impl Extractor {
    /// Use the catalogue mask and filter named in `params`.
    pub fn new(params: &ExtractParams) -> Result<Extractor, ExtractError> {
        params.validate()?;
        let mask = Mask::new(params.instrument, &params.maskname, &params.mask_options())?;
        let filter = *get_filter(params.instrument, &params.filtname)?;
        Extractor::with_mask(mask, filter, params)
    }

    /// Use an arbitrary mask and filter. The mask and filter names in
    /// `params` are ignored.
    pub fn with_mask(
        mask: Mask,
        filter: FilterDefinition,
        params: &ExtractParams,
    ) -> Result<Extractor, ExtractError> {
        params.validate()?;
        let pixel_scale_mas = match params.pixel_scale {
            Some(p) => p,
            None => profile_for(mask.instrument).pixel_scale_mas().ok_or_else(|| {
                ExtractError::InvalidParameter(format!(
                    "{} has no native pixel scale; one must be given",
                    mask.instrument
                ))
            })?,
        };
        Ok(Extractor {
            mask,
            filter,
            params: params.clone(),
            pixel_scale_mas,
        })
    }

    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    pub fn params(&self) -> &ExtractParams {
        &self.params
    }

    /// \[milliarcseconds per pixel\]
    pub fn pixel_scale_mas(&self) -> f64 {
        self.pixel_scale_mas
    }

    /// Extract the channel `i_wl` (default 0) of a single-channel cube.
    pub fn extract(
        &self,
        cube: ArrayView3<f64>,
        header: Option<&Header>,
    ) -> Result<ObservableBundle, ExtractError> {
        self.extract_channel(cube, self.params.i_wl.unwrap_or(0), header)
    }

    /// Extract every channel of a spectral cube.
    pub fn extract_spectral(
        &self,
        cube: ArrayView4<f64>,
        header: Option<&Header>,
    ) -> Result<Vec<ObservableBundle>, ExtractError> {
        let num_channels = cube.len_of(Axis(0));
        if num_channels != self.params.n_wl {
            return Err(ExtractError::DataShape(format!(
                "The cube has {num_channels} spectral channels, but n_wl is {}",
                self.params.n_wl
            )));
        }
        cube.outer_iter()
            .enumerate()
            .map(|(i_wl, channel)| {
                info!("Extracting channel {} of {num_channels}", i_wl + 1);
                self.extract_channel(channel, i_wl, header)
            })
            .collect()
    }

    fn extract_channel(
        &self,
        cube: ArrayView3<f64>,
        i_wl: usize,
        header: Option<&Header>,
    ) -> Result<ObservableBundle, ExtractError> {
        let (num_frames, ny, nx) = cube.dim();
        if num_frames == 0 {
            return Err(ExtractError::InsufficientData(
                "The cube has no frames".to_string(),
            ));
        }
        if let Some((i, _)) = cube.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(ExtractError::DataShape(format!(
                "The cube contains a non-finite value (frame {})",
                i / (ny * nx)
            )));
        }

        let n_wl = self.params.n_wl;
        let wavelength = channel_wavelength(&self.filter, n_wl, i_wl)?;
        let bandwidth = self.filter.bandwidth / n_wl as f64;
        let geometry = SplodgeGeometry::new(
            &self.mask,
            wavelength,
            self.pixel_scale_mas,
            self.params.fw_splodge,
            ny,
            nx,
        )?;
        let transform = FrameTransform::new(ny, nx, self.params.window);
        info!(
            "Extracting {num_frames} frames of {ny}x{nx} with {} ({} mask, {} baselines, {} triangles)",
            self.params.peakmethod,
            self.mask.name,
            self.mask.num_baselines(),
            self.mask.num_triangles()
        );

        let records = self.process_frames(cube, &geometry, &transform)?;
        let reduced = reduce(&records, &self.mask, &self.params)?;
        debug!(
            "Kept {} of {num_frames} frames",
            reduced.kept_frames.len()
        );

        let info = ObservationInfo::from_header(
            self.mask.instrument,
            &self.mask.name,
            self.filter.name,
            wavelength,
            bandwidth,
            self.pixel_scale_mas,
            header,
            self.params.targetname.as_deref(),
        );
        Ok(ObservableBundle {
            info,
            params: Some(ExtractParams {
                i_wl: Some(i_wl),
                ..self.params.clone()
            }),
            mask: self.mask.clone(),
            vis2: reduced.vis2,
            vis2_err: reduced.vis2_err,
            uv: geometry.uv.clone(),
            baseline_flags: reduced.baseline_flags,
            bispectrum: reduced.bispectrum,
            bispectrum_amp_err: reduced.bispectrum_amp_err,
            closure_phase: reduced.closure_phase,
            closure_phase_err: reduced.closure_phase_err,
            triangle_flags: reduced.triangle_flags,
            frame_vis2: reduced.frame_vis2,
            frame_bispectrum: reduced.frame_bispectrum,
            kept_frames: reduced.kept_frames,
            num_frames,
            num_fallbacks: reduced.num_fallbacks,
            calibrated: false,
            calibrators: vec![],
        })
    }

    /// Transform and measure every frame on the worker pool. The records are
    /// in frame order.
    fn process_frames(
        &self,
        cube: ArrayView3<f64>,
        geometry: &SplodgeGeometry,
        transform: &FrameTransform,
    ) -> Result<Vec<FrameRecord>, ExtractError> {
        let num_frames = cube.len_of(Axis(0));
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.params.num_workers.unwrap_or(0))
            .build()?;
        debug!("Using {} worker threads", pool.current_num_threads());

        let pb = ProgressBar::with_draw_target(
            Some(num_frames as _),
            if PROGRESS_BARS.load() {
                ProgressDrawTarget::stdout()
            } else {
                ProgressDrawTarget::hidden()
            },
        )
        .with_style(
            ProgressStyle::default_bar()
                .template("{msg:17}: [{wide_bar:.blue}] {pos:2}/{len:2} frames ({elapsed_precise}<{eta_precise})").unwrap()
                .progress_chars("=> "),
        )
        .with_position(0)
        .with_message("Extracting");

        let records = pool.install(|| {
            (0..num_frames)
                .into_par_iter()
                .progress_with(pb.clone())
                .map(|i_frame| {
                    self.process_frame(
                        i_frame,
                        cube.index_axis(Axis(0), i_frame),
                        geometry,
                        transform,
                    )
                })
                .collect::<Result<Vec<_>, _>>()
        });
        pb.abandon_with_message("Finished extracting");
        records
    }

    fn process_frame(
        &self,
        index: usize,
        frame: ArrayView2<f64>,
        geometry: &SplodgeGeometry,
        transform: &FrameTransform,
    ) -> Result<FrameRecord, ExtractError> {
        let method = self.params.peakmethod;
        let ft = transform.transform(frame);
        let noise = noise_power(ft.view(), geometry.noise_mask());

        let dc = estimate(method, ft.view(), &geometry.dc, geometry.radius);
        let mut flux = dc.value.norm();
        if self.params.unbias_v2 {
            flux -= (noise * dc.n_pix as f64).sqrt();
        }
        if !(flux.is_finite() && flux > 0.0) {
            return Err(ExtractError::DegenerateNormalization {
                frame: index,
                flux,
            });
        }

        let estimates: Vec<PeakEstimate> = geometry
            .splodges
            .iter()
            .map(|splodge| estimate(method, ft.view(), splodge, geometry.radius))
            .collect();
        let closing_products = self.params.bs_multi_tri.then(|| {
            self.mask
                .triangles
                .iter()
                .map(|tri| {
                    let [ij, jk, _] = tri.baselines;
                    closing_triple_product(
                        ft.view(),
                        &geometry.splodges[ij],
                        &geometry.splodges[jk],
                        geometry.radius,
                    )
                })
                .collect()
        });
        let fallbacks = estimates
            .iter()
            .chain(std::iter::once(&dc))
            .filter(|e| e.fell_back)
            .count();

        Ok(FrameRecord {
            index,
            flux,
            noise_power: noise,
            estimates,
            closing_products,
            fallbacks,
        })
    }
}
