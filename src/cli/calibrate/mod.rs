// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

#[cfg(test)]
mod tests;

use std::path::PathBuf;

use clap::Parser;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use super::common::{derive_filename, display_warnings, InfoPrinter, ARG_FILE_HELP};
use crate::{
    calibrate::calibrate,
    io::{
        can_write_to_file, expand_globs, load_bundle, save_bundle, BundleFileType,
        BUNDLE_FILE_TYPES_COMMA_SEPARATED,
    },
    AmiPipeError,
};

lazy_static::lazy_static! {
    static ref BUNDLES_HELP: String =
        format!("Paths to observables files. The first is the target, and the rest are calibrators. Globs are expanded. Supported formats: {}", *BUNDLE_FILE_TYPES_COMMA_SEPARATED);

    static ref OUTPUT_HELP: String =
        format!("Path to the calibrated observables. Supported formats: {}. Default: the target's name with a _calibrated.oifits suffix", *BUNDLE_FILE_TYPES_COMMA_SEPARATED);
}

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct CalibrateArgs {
    #[clap(long, help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    #[clap(value_name = "BUNDLES", multiple_values(true), help = BUNDLES_HELP.as_str())]
    #[serde(default)]
    pub(super) bundles: Vec<String>,

    #[clap(short = 'o', long, help = OUTPUT_HELP.as_str(), help_heading = "OUTPUT FILES")]
    pub(super) output: Option<PathBuf>,
}

impl CalibrateArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was specified into
    /// a single struct. Where applicable, it will prefer CLI parameters over
    /// those in the file.
    pub(super) fn merge(self) -> Result<CalibrateArgs, AmiPipeError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            let CalibrateArgs {
                args_file: _,
                bundles,
                output,
            } = unpack_arg_file!(arg_file);

            Ok(CalibrateArgs {
                args_file: None,
                bundles: if cli_args.bundles.is_empty() {
                    bundles
                } else {
                    cli_args.bundles
                },
                output: cli_args.output.or(output),
            })
        } else {
            Ok(cli_args)
        }
    }

    fn parse(self) -> Result<CalibrateJob, AmiPipeError> {
        debug!("{:#?}", self);

        let Self {
            args_file: _,
            bundles,
            output,
        } = self;

        let mut files = if bundles.is_empty() {
            vec![]
        } else {
            expand_globs(&bundles)?
        };
        if files.len() < 2 {
            return Err(CalibrateArgsError::TooFewBundles(files.len()).into());
        }
        let target = files.remove(0);
        let calibrators = files;
        let output = output.unwrap_or_else(|| derive_filename(&target, "_calibrated", "oifits"));
        BundleFileType::from_path(&output)?;
        can_write_to_file(&output)?;

        let mut printer = InfoPrinter::new("Calibrating observables".into());
        printer.push_line(format!("Target: {}", target.display()).into());
        printer.push_block(
            calibrators
                .iter()
                .enumerate()
                .map(|(i, c)| {
                    if i == 0 {
                        format!("Calibrators: {}", c.display()).into()
                    } else {
                        format!("             {}", c.display()).into()
                    }
                })
                .collect(),
        );
        printer.push_line(format!("Output: {}", output.display()).into());
        printer.display();
        display_warnings();

        Ok(CalibrateJob {
            target,
            calibrators,
            output,
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

#[derive(Debug)]
struct CalibrateJob {
    target: PathBuf,
    calibrators: Vec<PathBuf>,
    output: PathBuf,
}

impl CalibrateJob {
    fn run(self) -> Result<(), AmiPipeError> {
        let target = load_bundle(&self.target)?;
        let calibrators = self
            .calibrators
            .iter()
            .map(load_bundle)
            .collect::<Result<Vec<_>, _>>()?;

        let calibrated = calibrate(&target, &calibrators)?;
        let num_flagged = calibrated.baseline_flags.iter().filter(|&&f| f).count();
        if num_flagged > 0 {
            info!(
                "{num_flagged} of {} baselines are flagged",
                calibrated.num_baselines()
            );
        }
        save_bundle(&calibrated, &self.output)?;
        info!("Wrote {}", self.output.display());
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub(super) enum CalibrateArgsError {
    #[error("A target and at least one calibrator are needed, but {0} observables file(s) were supplied")]
    TooFewBundles(usize),
}
