// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};

use clap::Parser;
use log::{debug, info, trace};
use ndarray::Axis;
use serde::{Deserialize, Serialize};

use super::{
    common::{derive_filename, display_warnings, InfoPrinter, ARG_FILE_HELP},
    Warn,
};
use crate::{
    bispectrum::{ExtractParams, Extractor},
    constants::{DEFAULT_CUTOFF, DEFAULT_FW_SPLODGE},
    io::{
        can_write_to_file, expand_globs, read_cube, save_bundle, BundleFileType, CubeData,
        BUNDLE_FILE_TYPES_COMMA_SEPARATED,
    },
    mask::{get_filter, get_pixel_scale, parse_instrument, INSTRUMENTS_COMMA_SEPARATED},
    peak::{PeakMethod, PEAK_METHODS_COMMA_SEPARATED},
    AmiPipeError,
};

lazy_static::lazy_static! {
    static ref OUTPUTS_HELP: String =
        format!("Paths to the output observables files, one per input cube. Supported formats: {}. Default: the cube's name with a .oifits extension", *BUNDLE_FILE_TYPES_COMMA_SEPARATED);

    static ref INSTRUMENT_HELP: String =
        format!("The instrument that observed the cubes. Supported instruments: {}. Default: NIRISS", *INSTRUMENTS_COMMA_SEPARATED);

    static ref PEAK_METHOD_HELP: String =
        format!("How splodges are measured. Supported methods: {}. Default: {}", *PEAK_METHODS_COMMA_SEPARATED, PeakMethod::default());

    static ref FW_SPLODGE_HELP: String =
        format!("The radius of the window searched around each splodge, as a fraction of the splodge's D/λ. Default: {DEFAULT_FW_SPLODGE}");

    static ref CUTOFF_HELP: String =
        format!("Splodges with a peak-to-noise ratio below this are flagged. Default: {DEFAULT_CUTOFF}");
}

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct ExtractArgs {
    #[clap(long, help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    /// Paths to the image cubes (FITS). Globs are expanded. Cubes are 2D
    /// (one frame), 3D (frames, y, x) or 4D (channels, frames, y, x).
    #[clap(value_name = "CUBES", multiple_values(true))]
    #[serde(default)]
    pub(super) data: Vec<String>,

    #[clap(
        short = 'o',
        long,
        multiple_values(true),
        help = OUTPUTS_HELP.as_str(),
        help_heading = "OUTPUT FILES"
    )]
    pub(super) outputs: Option<Vec<PathBuf>>,

    #[clap(short, long, help = INSTRUMENT_HELP.as_str(), help_heading = "INSTRUMENT")]
    pub(super) instrument: Option<String>,

    /// The name of the mask. Default: g7
    #[clap(short, long, help_heading = "INSTRUMENT")]
    pub(super) mask: Option<String>,

    /// The name of the filter. Default: F480M
    #[clap(short, long, help_heading = "INSTRUMENT")]
    pub(super) filter: Option<String>,

    /// The pixel scale of the cubes [milliarcseconds]. Default: the
    /// instrument's native pixel scale.
    #[clap(long, help_heading = "INSTRUMENT")]
    pub(super) pixel_scale: Option<f64>,

    /// Override the target name found in the cubes' headers.
    #[clap(short, long, help_heading = "INSTRUMENT")]
    pub(super) target: Option<String>,

    /// The number of spectral channels the filter is split into. Default: 1,
    /// or the number of channels of a spectral cube.
    #[clap(long, help_heading = "INSTRUMENT")]
    pub(super) n_wl: Option<usize>,

    /// The channel a single-channel cube was observed in. Default: 0
    #[clap(long, help_heading = "INSTRUMENT")]
    pub(super) i_wl: Option<usize>,

    /// Scale the mask's aperture coordinates by this factor. Default: 1
    #[clap(long, help_heading = "MASK GEOMETRY")]
    pub(super) scaling_uv: Option<f64>,

    /// Rotate the mask by this angle [degrees]. Default: 0
    #[clap(long, help_heading = "MASK GEOMETRY")]
    pub(super) theta_detector: Option<f64>,

    /// Override the catalogue's aperture diameter [metres].
    #[clap(long, help_heading = "MASK GEOMETRY")]
    pub(super) hole_diam: Option<f64>,

    #[clap(long, help = PEAK_METHOD_HELP.as_str(), help_heading = "EXTRACTION")]
    pub(super) peak_method: Option<String>,

    #[clap(long, help = FW_SPLODGE_HELP.as_str(), help_heading = "EXTRACTION")]
    pub(super) fw_splodge: Option<f64>,

    #[clap(long, help = CUTOFF_HELP.as_str(), help_heading = "EXTRACTION")]
    pub(super) cutoff: Option<f64>,

    /// Don't subtract the noise bias from the power spectra.
    #[clap(long, help_heading = "EXTRACTION")]
    #[serde(default)]
    pub(super) no_unbias: bool,

    /// Measure closure phases from every closing triple of pixels within the
    /// splodges rather than only from their peaks.
    #[clap(long, help_heading = "EXTRACTION")]
    #[serde(default)]
    pub(super) multi_tri: bool,

    /// Reject frames whose mean V² is this many (robust) standard deviations
    /// away from the median. Default: keep every frame.
    #[clap(long, help_heading = "EXTRACTION")]
    pub(super) clip: Option<f64>,

    /// Apply a super-Gaussian window with this FWHM to every frame before
    /// transforming it [pixels]. Default: no window.
    #[clap(long, help_heading = "EXTRACTION")]
    pub(super) window: Option<f64>,

    /// The number of threads frames are processed on. Default: one per CPU
    /// core.
    #[clap(long, help_heading = "EXTRACTION")]
    pub(super) num_workers: Option<usize>,
}

impl ExtractArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was specified into
    /// a single struct. Where applicable, it will prefer CLI parameters over
    /// those in the file.
    ///
    /// This function should only ever merge arguments, and not try to make
    /// sense of them.
    pub(super) fn merge(self) -> Result<ExtractArgs, AmiPipeError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            // Read in the file arguments. Ensure all of the file args are
            // accounted for by pattern matching.
            let ExtractArgs {
                args_file: _,
                data,
                outputs,
                instrument,
                mask,
                filter,
                pixel_scale,
                target,
                n_wl,
                i_wl,
                scaling_uv,
                theta_detector,
                hole_diam,
                peak_method,
                fw_splodge,
                cutoff,
                no_unbias,
                multi_tri,
                clip,
                window,
                num_workers,
            } = unpack_arg_file!(arg_file);

            // Merge all the arguments, preferring the CLI args when available.
            Ok(ExtractArgs {
                args_file: None,
                data: if cli_args.data.is_empty() {
                    data
                } else {
                    cli_args.data
                },
                outputs: cli_args.outputs.or(outputs),
                instrument: cli_args.instrument.or(instrument),
                mask: cli_args.mask.or(mask),
                filter: cli_args.filter.or(filter),
                pixel_scale: cli_args.pixel_scale.or(pixel_scale),
                target: cli_args.target.or(target),
                n_wl: cli_args.n_wl.or(n_wl),
                i_wl: cli_args.i_wl.or(i_wl),
                scaling_uv: cli_args.scaling_uv.or(scaling_uv),
                theta_detector: cli_args.theta_detector.or(theta_detector),
                hole_diam: cli_args.hole_diam.or(hole_diam),
                peak_method: cli_args.peak_method.or(peak_method),
                fw_splodge: cli_args.fw_splodge.or(fw_splodge),
                cutoff: cli_args.cutoff.or(cutoff),
                no_unbias: cli_args.no_unbias || no_unbias,
                multi_tri: cli_args.multi_tri || multi_tri,
                clip: cli_args.clip.or(clip),
                window: cli_args.window.or(window),
                num_workers: cli_args.num_workers.or(num_workers),
            })
        } else {
            Ok(cli_args)
        }
    }

    /// Turn the arguments into extraction parameters. The mask and filter are
    /// looked up here, so bad names are reported before any cube is read.
    pub(super) fn parse(self) -> Result<ExtractJob, AmiPipeError> {
        debug!("{:#?}", self);

        let Self {
            args_file: _,
            data,
            outputs,
            instrument,
            mask,
            filter,
            pixel_scale,
            target,
            n_wl,
            i_wl,
            scaling_uv,
            theta_detector,
            hole_diam,
            peak_method,
            fw_splodge,
            cutoff,
            no_unbias,
            multi_tri,
            clip,
            window,
            num_workers,
        } = self;

        let defaults = ExtractParams::default();
        let params = ExtractParams {
            peakmethod: match peak_method {
                Some(m) => m.trim().parse::<PeakMethod>().map_err(|_| ExtractArgsError::BadPeakMethod {
                    got: m,
                    valid: PEAK_METHODS_COMMA_SEPARATED.clone(),
                })?,
                None => defaults.peakmethod,
            },
            instrument: match instrument {
                Some(i) => parse_instrument(&i)?,
                None => defaults.instrument,
            },
            maskname: mask.unwrap_or(defaults.maskname),
            filtname: filter.unwrap_or(defaults.filtname),
            targetname: target,
            fw_splodge: fw_splodge.unwrap_or(defaults.fw_splodge),
            cutoff: cutoff.unwrap_or(defaults.cutoff),
            n_wl: n_wl.unwrap_or(defaults.n_wl),
            i_wl,
            unbias_v2: !no_unbias,
            bs_multi_tri: multi_tri,
            scaling_uv: scaling_uv.unwrap_or(defaults.scaling_uv),
            theta_detector: theta_detector.unwrap_or(defaults.theta_detector),
            hole_diam,
            clip,
            window,
            pixel_scale,
            num_workers,
        };
        let extractor = Extractor::new(&params)?;

        if data.is_empty() {
            return Err(ExtractArgsError::NoInputs.into());
        }
        let cubes = expand_globs(&data)?;
        let outputs = match outputs {
            Some(o) => {
                if o.len() != cubes.len() {
                    return Err(ExtractArgsError::OutputCountMismatch {
                        inputs: cubes.len(),
                        outputs: o.len(),
                    }
                    .into());
                }
                o
            }
            None => cubes
                .iter()
                .map(|c| derive_filename(c, "", "oifits"))
                .collect(),
        };
        for output in &outputs {
            BundleFileType::from_path(output)?;
            can_write_to_file(output)?;
        }

        let mut printer = InfoPrinter::new("Extracting observables".into());
        let mask = extractor.mask();
        printer.push_line(
            format!(
                "{} {}: {} apertures, {} baselines, {} triangles",
                mask.instrument,
                mask.name,
                mask.num_apertures(),
                mask.num_baselines(),
                mask.num_triangles()
            )
            .into(),
        );
        let filter_def = get_filter(params.instrument, &params.filtname)?;
        printer.push_block(vec![
            format!(
                "Filter {}: {:.3} µm, {:.3} µm wide",
                filter_def.name,
                filter_def.wavelength * 1e6,
                filter_def.bandwidth * 1e6
            )
            .into(),
            match n_wl {
                Some(n) => format!("{n} spectral channel(s)").into(),
                None => "Spectral channels follow the cubes".into(),
            },
        ]);
        printer.push_line(format!("Pixel scale: {} mas", extractor.pixel_scale_mas()).into());
        let mut method_block = vec![
            format!("Peak method: {}", params.peakmethod).into(),
            format!(
                "Splodge window: {} D/λ, cutoff: {}",
                params.fw_splodge, params.cutoff
            )
            .into(),
        ];
        if !params.unbias_v2 {
            method_block.push("Not subtracting the noise bias".into());
        }
        if params.bs_multi_tri {
            method_block.push("Closure phases from every closing pixel triple".into());
        }
        if let Some(clip) = params.clip {
            method_block.push(format!("Clipping frames beyond {clip}σ").into());
        }
        printer.push_block(method_block);
        printer.push_block(
            cubes
                .iter()
                .zip(outputs.iter())
                .map(|(c, o)| format!("{} -> {}", c.display(), o.display()).into())
                .collect(),
        );
        printer.display();

        if let (Some(given), Some(native)) = (params.pixel_scale, get_pixel_scale(params.instrument))
        {
            if (given - native).abs() > f64::EPSILON * native {
                format!(
                    "Using a pixel scale of {given} mas instead of {}'s native {native} mas",
                    params.instrument
                )
                .warn();
            }
        }

        display_warnings();

        Ok(ExtractJob {
            extractor,
            n_wl_given: n_wl.is_some(),
            files: cubes.into_iter().zip(outputs).collect(),
        })
    }

    pub(super) fn run(self, dry_run: bool) -> Result<(), AmiPipeError> {
        debug!("Converting arguments into parameters");
        trace!("{:#?}", self);
        let job = self.parse()?;

        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        job.run()
    }
}

/// Cubes to extract, and where their observables go.
pub(super) struct ExtractJob {
    extractor: Extractor,

    /// If the user didn't say how many channels there are, spectral cubes
    /// decide.
    n_wl_given: bool,

    /// (cube, output) pairs.
    files: Vec<(PathBuf, PathBuf)>,
}

impl ExtractJob {
    fn run(self) -> Result<(), AmiPipeError> {
        for (cube_file, output) in &self.files {
            info!("Reading {}", cube_file.display());
            let cube = read_cube(cube_file)?;
            let source_file = cube_file.display().to_string();

            match cube.data {
                CubeData::Single(data) => {
                    let mut bundle = self.extractor.extract(data.view(), Some(&cube.header))?;
                    bundle.info.source_file = Some(source_file);
                    save_bundle(&bundle, output)?;
                    info!("Wrote {}", output.display());
                }

                CubeData::Spectral(data) => {
                    let num_channels = data.len_of(Axis(0));
                    let per_cube;
                    let extractor = if self.n_wl_given {
                        &self.extractor
                    } else {
                        per_cube = Extractor::new(&ExtractParams {
                            n_wl: num_channels,
                            ..self.extractor.params().clone()
                        })?;
                        &per_cube
                    };

                    let bundles = extractor.extract_spectral(data.view(), Some(&cube.header))?;
                    for (i_wl, mut bundle) in bundles.into_iter().enumerate() {
                        bundle.info.source_file = Some(source_file.clone());
                        let output = channel_filename(output, i_wl);
                        save_bundle(&bundle, &output)?;
                        info!("Wrote {}", output.display());
                    }
                }
            }
        }

        Ok(())
    }
}

/// Where the observables of one channel of a spectral cube go, e.g.
/// "ab_dor.oifits" -> "ab_dor_ch3.oifits".
fn channel_filename(output: &Path, i_wl: usize) -> PathBuf {
    let ext = output
        .extension()
        .map(|e| e.to_string_lossy())
        .unwrap_or_default();
    derive_filename(output, &format!("_ch{i_wl}"), &ext)
}

#[derive(thiserror::Error, Debug)]
pub(super) enum ExtractArgsError {
    #[error("No image cubes were supplied")]
    NoInputs,

    #[error("{inputs} image cube(s) were supplied, but {outputs} output file(s); there must be one output per cube")]
    OutputCountMismatch { inputs: usize, outputs: usize },

    #[error("Unknown peak method '{got}'; supported methods are: {valid}")]
    BadPeakMethod { got: String, valid: String },
}
