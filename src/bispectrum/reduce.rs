// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turning per-frame fringe estimates into cube-averaged observables.
//!
//! Everything here runs on one thread, in frame order, so the result doesn't
//! depend on how the frames were processed.

use log::{debug, warn};
use ndarray::{Array2, Axis};
use num_complex::Complex64;

use super::{ExtractError, ExtractParams};
use crate::{
    mask::Mask,
    math::{mean_and_std_err, median_and_sigma, wrap_phase},
    peak::PeakEstimate,
};

/// What a worker produces for one frame.
#[derive(Debug, Clone)]
pub(super) struct FrameRecord {
    pub(super) index: usize,

    /// The total flux, already unbiased if requested.
    pub(super) flux: f64,

    /// Mean power per Fourier pixel outside the splodges.
    pub(super) noise_power: f64,

    /// One per baseline.
    pub(super) estimates: Vec<PeakEstimate>,

    /// One per triangle, if closure phases come from every closing pixel
    /// triple. See [`crate::peak::closing_triple_product`].
    pub(super) closing_products: Option<Vec<Complex64>>,

    /// Gaussian fits that fell back, including the flux's.
    pub(super) fallbacks: usize,
}

/// Cube-level observables, before metadata is attached.
#[derive(Debug, Clone)]
pub(super) struct Reduced {
    pub(super) vis2: Vec<f64>,
    pub(super) vis2_err: Vec<f64>,
    pub(super) baseline_flags: Vec<bool>,
    pub(super) bispectrum: Vec<Complex64>,
    pub(super) bispectrum_amp_err: Vec<f64>,
    pub(super) closure_phase: Vec<f64>,
    pub(super) closure_phase_err: Vec<f64>,
    pub(super) triangle_flags: Vec<bool>,
    pub(super) frame_vis2: Array2<f64>,
    pub(super) frame_bispectrum: Array2<Complex64>,
    pub(super) kept_frames: Vec<usize>,
    pub(super) num_fallbacks: usize,
}

pub(super) fn reduce(
    records: &[FrameRecord],
    mask: &Mask,
    params: &ExtractParams,
) -> Result<Reduced, ExtractError> {
    let num_frames = records.len();
    if num_frames == 0 {
        return Err(ExtractError::InsufficientData(
            "There are no frames to extract from".to_string(),
        ));
    }
    let num_baselines = mask.num_baselines();
    let num_triangles = mask.num_triangles();
    let num_holes = mask.num_apertures() as f64;

    let mut all_vis2: Array2<f64> = Array2::zeros((num_frames, num_baselines));
    let mut all_bs: Array2<Complex64> = Array2::zeros((num_frames, num_triangles));
    let mut all_low = Array2::from_elem((num_frames, num_baselines), false);
    for (i_frame, record) in records.iter().enumerate() {
        let reference = record.flux / num_holes;
        for (i_bl, est) in record.estimates.iter().enumerate() {
            let bias = if params.unbias_v2 {
                record.noise_power * est.n_pix as f64
            } else {
                0.0
            };
            all_vis2[(i_frame, i_bl)] = (est.value.norm_sqr() - bias) / reference.powi(2);
            all_low[(i_frame, i_bl)] = est.is_low_quality(record.noise_power, params.cutoff);
        }
        for (i_tri, tri) in mask.triangles.iter().enumerate() {
            let [ij, jk, ik] = tri.baselines;
            let c = |b: usize| record.estimates[b].value;
            let bs = c(ij) * c(jk) * c(ik).conj() / reference.powi(3);
            all_bs[(i_frame, i_tri)] = match &record.closing_products {
                Some(products) => Complex64::from_polar(bs.norm(), products[i_tri].arg()),
                None => bs,
            };
        }
    }

    let kept_frames = clip_frames(&all_vis2, params.clip)?;
    let num_kept = kept_frames.len();
    if num_kept < num_frames {
        debug!(
            "Clipping kept {num_kept} of {num_frames} frames; rejected {:?}",
            (0..num_frames)
                .filter(|i| !kept_frames.contains(i))
                .map(|i| records[i].index)
                .collect::<Vec<_>>()
        );
    }

    let frame_vis2 = all_vis2.select(Axis(0), &kept_frames);
    let frame_bispectrum = all_bs.select(Axis(0), &kept_frames);
    let kept_low = all_low.select(Axis(0), &kept_frames);

    let (vis2, vis2_err): (Vec<f64>, Vec<f64>) = frame_vis2
        .axis_iter(Axis(1))
        .map(|col| mean_and_std_err(&col.to_vec()))
        .unzip();

    let baseline_flags: Vec<bool> = kept_low
        .axis_iter(Axis(1))
        .map(|col| 2 * col.iter().filter(|&&low| low).count() > num_kept)
        .collect();

    let mut bispectrum = Vec::with_capacity(num_triangles);
    let mut bispectrum_amp_err = Vec::with_capacity(num_triangles);
    let mut closure_phase = Vec::with_capacity(num_triangles);
    let mut closure_phase_err = Vec::with_capacity(num_triangles);
    for col in frame_bispectrum.axis_iter(Axis(1)) {
        let stats = bispectrum_stats(&col.to_vec());
        bispectrum.push(stats.mean);
        bispectrum_amp_err.push(stats.amp_err);
        closure_phase.push(stats.phase);
        closure_phase_err.push(stats.phase_err);
    }
    let triangle_flags: Vec<bool> = mask
        .triangles
        .iter()
        .map(|tri| tri.baselines.iter().any(|&b| baseline_flags[b]))
        .collect();

    let num_fallbacks: usize = records.iter().map(|r| r.fallbacks).sum();
    if num_fallbacks > 0 {
        warn!("{num_fallbacks} Gaussian splodge fits fell back to the nearest Fourier pixel");
    }
    let num_flagged = baseline_flags.iter().filter(|&&f| f).count();
    if num_flagged > 0 {
        warn!(
            "{num_flagged} of {num_baselines} baselines have a peak-to-noise ratio below {}",
            params.cutoff
        );
    }

    Ok(Reduced {
        vis2,
        vis2_err,
        baseline_flags,
        bispectrum,
        bispectrum_amp_err,
        closure_phase,
        closure_phase_err,
        triangle_flags,
        frame_vis2,
        frame_bispectrum,
        kept_frames,
        num_fallbacks,
    })
}

/// The indices of frames whose mean V² is within `clip` robust standard
/// deviations of the median. With an odd number of frames the median frame
/// is always kept, so only an even number of frames can all be rejected.
fn clip_frames(all_vis2: &Array2<f64>, clip: Option<f64>) -> Result<Vec<usize>, ExtractError> {
    let num_frames = all_vis2.len_of(Axis(0));
    let clip = match clip {
        Some(c) => c,
        None => return Ok((0..num_frames).collect()),
    };

    let metric: Vec<f64> = all_vis2
        .axis_iter(Axis(0))
        .map(|row| row.mean().unwrap_or(f64::NAN))
        .collect();
    let kept: Vec<usize> = match median_and_sigma(&metric) {
        Some((median, sigma)) if sigma > 0.0 => metric
            .iter()
            .enumerate()
            .filter(|(_, m)| (*m - median).abs() < clip * sigma)
            .map(|(i, _)| i)
            .collect(),
        // No scatter; there's nothing to clip.
        Some(_) => (0..num_frames).collect(),
        None => vec![],
    };
    if kept.is_empty() {
        return Err(ExtractError::InsufficientData(format!(
            "Clipping at {clip} sigma rejected all {num_frames} frames"
        )));
    }
    Ok(kept)
}

#[derive(Debug, Clone, Copy)]
struct BispectrumStats {
    mean: Complex64,
    amp_err: f64,
    phase: f64,
    phase_err: f64,
}

/// Average bispectra. Errors come from the scatter parallel (amplitude) and
/// perpendicular (phase) to the mean. A zero (or non-finite) mean has no
/// phase.
fn bispectrum_stats(values: &[Complex64]) -> BispectrumStats {
    let n = values.len() as f64;
    let mean: Complex64 = values.iter().sum::<Complex64>() / n;
    let amplitude = mean.norm();
    let phase = if amplitude.is_finite() && amplitude > 0.0 {
        wrap_phase(mean.arg())
    } else {
        f64::NAN
    };
    let rotation = Complex64::from_polar(1.0, -mean.arg());
    let (parallel, perpendicular): (Vec<f64>, Vec<f64>) = values
        .iter()
        .map(|v| {
            let r = v * rotation;
            (r.re, r.im)
        })
        .unzip();
    let (_, amp_err) = mean_and_std_err(&parallel);
    let (_, perp_err) = mean_and_std_err(&perpendicular);
    let phase_err = perp_err / amplitude;
    BispectrumStats {
        mean,
        amp_err,
        phase,
        phase_err: if phase_err.is_finite() {
            phase_err
        } else {
            f64::NAN
        },
    }
}
