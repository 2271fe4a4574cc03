// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Observables as JSON. Unlike OIFITS, JSON keeps everything in a bundle,
//! including the per-frame series.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use log::debug;

use super::BundleFileError;
use crate::bundle::ObservableBundle;

pub fn write_json<P: AsRef<Path>>(
    bundle: &ObservableBundle,
    file: P,
) -> Result<(), BundleFileError> {
    let file = file.as_ref();
    debug!("Writing JSON observables to {}", file.display());
    let mut writer = BufWriter::new(File::create(file)?);
    serde_json::to_writer_pretty(&mut writer, bundle).map_err(|err| BundleFileError::Json {
        file: file.to_path_buf(),
        err,
    })?;
    writer.flush()?;
    Ok(())
}

pub fn read_json<P: AsRef<Path>>(file: P) -> Result<ObservableBundle, BundleFileError> {
    let file = file.as_ref();
    debug!("Reading JSON observables from {}", file.display());
    let reader = BufReader::new(File::open(file)?);
    serde_json::from_reader(reader).map_err(|err| BundleFileError::Json {
        file: file.to_path_buf(),
        err,
    })
}
