// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Pretty printers for reporting information.
//!
//! Information and warnings are collected as "blocks" of lines; the first line
//! of each block is attached to a tree, e.g.
//!
//! ```text
//! Extracting observables
//! ├ NIRISS g7 (7 apertures, 21 baselines, 35 triangles)
//! ├ Filter F480M: 4.817 µm
//! │ 1 spectral channel
//! └ Peak method: fft
//! ```

use std::{borrow::Cow, sync::Mutex};

const VERTICAL: char = '│';
const UP_AND_RIGHT: char = '└';
const VERTICAL_AND_RIGHT: char = '├';

lazy_static::lazy_static! {
    static ref WARNING_PRINTER: Mutex<Blocks> = Mutex::new(Blocks::default());
}

#[derive(Debug, Default)]
struct Blocks(Vec<Vec<Cow<'static, str>>>);

impl Blocks {
    fn push_line(&mut self, line: Cow<'static, str>) {
        self.0.push(vec![line]);
    }

    fn push_block(&mut self, block: Vec<Cow<'static, str>>) {
        if !block.is_empty() {
            self.0.push(block);
        }
    }

    /// Every line prefixed with its tree symbol.
    fn render(&self) -> Vec<String> {
        let num_blocks = self.0.len();
        self.0
            .iter()
            .enumerate()
            .flat_map(|(i_block, block)| {
                let num_lines = block.len();
                block.iter().enumerate().map(move |(i_line, line)| {
                    let symbol = match (i_line, i_line + 1 == num_lines, i_block + 1 == num_blocks)
                    {
                        (0, true, true) => UP_AND_RIGHT,
                        (0, _, _) => VERTICAL_AND_RIGHT,
                        _ => VERTICAL,
                    };
                    format!("{symbol} {line}")
                })
            })
            .collect()
    }
}

/// Collects lines, then logs them all at once at the info level.
pub(crate) struct InfoPrinter {
    title: Cow<'static, str>,
    blocks: Blocks,
}

impl InfoPrinter {
    pub(crate) fn new(title: Cow<'static, str>) -> Self {
        Self {
            title,
            blocks: Blocks::default(),
        }
    }

    pub(crate) fn push_line(&mut self, line: Cow<'static, str>) {
        self.blocks.push_line(line);
    }

    pub(crate) fn push_block(&mut self, block: Vec<Cow<'static, str>>) {
        self.blocks.push_block(block);
    }

    pub(crate) fn display(self) {
        log::info!("{}", console::style(self.title).bold());
        for line in self.blocks.render() {
            log::info!("{line}");
        }
        log::info!("");
    }
}

pub(crate) trait Warn {
    fn warn(self);
}

impl Warn for &'static str {
    fn warn(self) {
        WARNING_PRINTER.lock().unwrap().push_line(self.into());
    }
}

impl Warn for String {
    fn warn(self) {
        WARNING_PRINTER.lock().unwrap().push_line(self.into());
    }
}

impl Warn for Cow<'static, str> {
    fn warn(self) {
        WARNING_PRINTER.lock().unwrap().push_line(self);
    }
}

impl Warn for Vec<Cow<'static, str>> {
    fn warn(self) {
        WARNING_PRINTER.lock().unwrap().push_block(self);
    }
}

/// Print out any warnings that have been collected as CLI arguments have been
/// parsed, and forget them. This should be called once all arguments have
/// been parsed into parameters.
pub(crate) fn display_warnings() {
    log::debug!("Displaying warnings");
    let mut warnings = WARNING_PRINTER.lock().unwrap();
    if warnings.0.is_empty() {
        return;
    }

    log::warn!("{}", console::style("Warnings").bold());
    for line in warnings.render() {
        log::warn!("{line}");
    }
    log::warn!("");
    warnings.0.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_symbols() {
        let mut blocks = Blocks::default();
        blocks.push_line("NIRISS g7".into());
        blocks.push_block(vec!["Filter F480M".into(), "1 spectral channel".into()]);
        blocks.push_block(vec![]);
        blocks.push_line("Peak method: fft".into());
        assert_eq!(
            blocks.render(),
            vec![
                "├ NIRISS g7",
                "├ Filter F480M",
                "│ 1 spectral channel",
                "└ Peak method: fft",
            ]
        );
    }

    #[test]
    fn test_last_block_with_many_lines() {
        let mut blocks = Blocks::default();
        blocks.push_block(vec!["a".into(), "b".into()]);
        assert_eq!(blocks.render(), vec!["├ a", "│ b"]);
        assert!(Blocks::default().render().is_empty());
    }
}
