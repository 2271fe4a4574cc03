// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Print the instrument catalogue.

use std::borrow::Cow;

use clap::Parser;
use itertools::Itertools;
use strum::IntoEnumIterator;

use super::common::InfoPrinter;
use crate::{
    mask::{instrument_entry, list_masks, parse_instrument, Instrument},
    AmiPipeError,
};

#[derive(Parser, Debug)]
pub(super) struct MasksArgs {
    /// Only list this instrument.
    #[clap(name = "INSTRUMENT")]
    instrument: Option<String>,
}

impl MasksArgs {
    pub(super) fn run(self) -> Result<(), AmiPipeError> {
        let instruments = match self.instrument {
            Some(name) => vec![parse_instrument(&name)?],
            None => Instrument::iter().collect(),
        };
        for instrument in instruments {
            let mut printer = InfoPrinter::new(instrument.to_string().into());
            for block in describe(instrument)? {
                printer.push_block(block);
            }
            printer.display();
        }
        Ok(())
    }
}

/// The lines printed for an instrument, in blocks.
fn describe(instrument: Instrument) -> Result<Vec<Vec<Cow<'static, str>>>, AmiPipeError> {
    let entry = instrument_entry(instrument)?;
    let mut blocks = vec![vec![
        format!("Telescope: {}", entry.telescope).into(),
        match entry.pixel_scale_mas {
            Some(p) => format!("Pixel scale: {p} mas").into(),
            None => "Pixel scale: must be supplied".into(),
        },
    ]];

    blocks.push(
        list_masks()
            .into_iter()
            .filter(|(i, _, _)| *i == instrument)
            .map(|(_, name, num_holes)| {
                format!(
                    "Mask {name}: {num_holes} holes, {} baselines, {} triangles",
                    num_holes * (num_holes - 1) / 2,
                    num_holes * (num_holes - 1) * (num_holes - 2) / 6
                )
                .into()
            })
            .collect(),
    );

    let filters = entry
        .filters
        .iter()
        .map(|f| format!("{} ({:.3} µm)", f.name, f.wavelength * 1e6))
        .join(", ");
    blocks.push(vec![format!("Filters: {filters}").into()]);
    Ok(blocks)
}
