// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Messages to report to the user.
//!
//! Indexing and preloading report things in whatever order the code runs;
//! these types gather what is worth telling the user and print it in one go.

use std::path::PathBuf;

use itertools::Itertools;
use log::info;

use crate::{index::DataIndex, misc::mjd_to_epoch};

const VERTICAL_AND_RIGHT: char = '├';
const UP_AND_RIGHT: char = '└';

#[must_use = "This struct must be consumed with its print() method"]
pub(crate) struct InputFiles<'a> {
    pub(crate) paths: &'a [PathBuf],
}

impl InputFiles<'_> {
    pub(crate) fn print(self) {
        info!(
            "{} {} input file(s)",
            console::style("Reading").bold(),
            self.paths.len()
        );
        for path in self.paths {
            info!("  {}", path.display());
        }
    }
}

#[must_use = "This struct must be consumed with its print() method"]
pub(crate) struct IndexSummary<'a> {
    pub(crate) index: &'a DataIndex,
}

impl IndexSummary<'_> {
    pub(crate) fn print(self) {
        for file in &self.index.files {
            info!("{}", console::style(file.path.display()).bold());
            let num_scans = file.scans.len();
            for (i, scan) in file.scans.iter().enumerate() {
                let symbol = if i + 1 == num_scans {
                    UP_AND_RIGHT
                } else {
                    VERTICAL_AND_RIGHT
                };
                let header = &scan.header;
                info!(
                    "{symbol} {} ({}): {} cycles from {} to {}",
                    header.source_name(),
                    header.obstype,
                    scan.num_cycles(),
                    mjd_to_epoch(scan.start_mjd),
                    mjd_to_epoch(scan.end_mjd),
                );
                info!(
                    "    IFs: {}",
                    header
                        .windows
                        .iter()
                        .map(|w| format!("{} ({} MHz)", w.names[0], w.centre_freq_mhz))
                        .join(", ")
                );
            }
        }
        if let Some(range) = self.index.time_range() {
            info!(
                "{} scans, MJD {:.6} to {:.6}",
                self.index.num_scans(),
                range.earliest_mjd,
                range.latest_mjd
            );
        }
        info!("");
    }
}
