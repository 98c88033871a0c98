// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A pre-pass over all input files, recording each file's scans and the MJD of
//! every cycle.

mod error;

pub use error::IndexError;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::warn;
use vec1::Vec1;

use crate::{
    constants::SECONDS_PER_DAY,
    data::ScanHeader,
    PROGRESS_BARS,
};

/// A scan with at least one cycle.
#[derive(Debug, Clone)]
pub struct ScanSummary {
    pub header: Arc<ScanHeader>,
    /// The MJD of the first cycle, less half a cycle.
    pub start_mjd: f64,
    /// The MJD of the last cycle, plus half a cycle.
    pub end_mjd: f64,
    pub cycle_mjds: Vec1<f64>,
}

impl ScanSummary {
    /// Summarise a scan from its cycle MJDs. `None` is returned if there are
    /// no cycles.
    pub fn new(header: Arc<ScanHeader>, cycle_mjds: Vec<f64>) -> Option<ScanSummary> {
        let cycle_mjds = Vec1::try_from_vec(cycle_mjds).ok()?;
        let half_cycle_days = header.half_cycle_s() / SECONDS_PER_DAY;
        Some(ScanSummary {
            start_mjd: *cycle_mjds.first() - half_cycle_days,
            end_mjd: *cycle_mjds.last() + half_cycle_days,
            header,
            cycle_mjds,
        })
    }

    pub fn contains_mjd(&self, mjd: f64) -> bool {
        self.start_mjd <= mjd && mjd <= self.end_mjd
    }

    /// Does any part of this scan fall within `[low, high]`?
    pub fn overlaps(&self, low: f64, high: f64) -> bool {
        self.start_mjd <= high && low <= self.end_mjd
    }

    pub fn num_cycles(&self) -> usize {
        self.cycle_mjds.len()
    }
}

#[derive(Debug, Clone)]
pub struct FileIndex {
    pub path: PathBuf,
    pub scans: Vec<ScanSummary>,
}

impl FileIndex {
    /// Read through a file, recording its scans. Scans without cycles are
    /// discarded and unreadable cycles are skipped.
    pub fn build<P: AsRef<Path>>(path: P) -> Result<FileIndex, IndexError> {
        Ok(crate::pipeline::index_file(path.as_ref())?)
    }

    /// The MJD extent of all scans in this file.
    pub fn mjd_range(&self) -> Option<(f64, f64)> {
        let first = self.scans.first()?;
        let last = self.scans.last()?;
        Some((first.start_mjd, last.end_mjd))
    }

    pub fn contains_mjd(&self, mjd: f64) -> bool {
        self.mjd_range()
            .map(|(low, high)| low <= mjd && mjd <= high)
            .unwrap_or(false)
    }

    /// Find the indexed instance of a header read from this file.
    pub fn shared_header(&self, header: &ScanHeader) -> Option<Arc<ScanHeader>> {
        self.scans
            .iter()
            .find(|s| *s.header == *header)
            .map(|s| Arc::clone(&s.header))
    }
}

pub(crate) fn cycle_mjd(base_mjd: f64, ut_seconds: f64) -> f64 {
    base_mjd + crate::misc::round_hundredths_of_a_second(ut_seconds) / SECONDS_PER_DAY
}

/// The cycle time and MJD extent of all indexed data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub cycle_time_days: f64,
    pub earliest_mjd: f64,
    pub latest_mjd: f64,
}

/// Every input file's scans.
#[derive(Debug, Clone, Default)]
pub struct DataIndex {
    pub files: Vec<FileIndex>,
}

impl DataIndex {
    /// Index each of the files. Files that can't be opened or read are
    /// skipped with a warning.
    pub fn build(paths: &[PathBuf]) -> Result<DataIndex, IndexError> {
        let progress = ProgressBar::with_draw_target(
            Some(paths.len() as _),
            if PROGRESS_BARS.load() {
                ProgressDrawTarget::stdout()
            } else {
                ProgressDrawTarget::hidden()
            },
        )
        .with_style(
            ProgressStyle::default_bar()
                .template("{msg:17}: [{wide_bar:.blue}] {pos:2}/{len:2} files ({elapsed_precise}<{eta_precise})")
                .unwrap()
                .progress_chars("=> "),
        )
        .with_position(0)
        .with_message("Indexing");

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            match FileIndex::build(path) {
                Ok(f) => files.push(f),
                Err(e) => warn!("Skipping {}: {e}", path.display()),
            }
            progress.inc(1);
        }
        progress.abandon_with_message("Finished indexing");

        let index = DataIndex { files };
        if index.num_scans() == 0 {
            return Err(IndexError::NoData {
                num_files: paths.len(),
            });
        }
        Ok(index)
    }

    /// All scans in file order, with the index of the file holding them.
    pub fn scans(&self) -> impl Iterator<Item = (usize, &ScanSummary)> {
        self.files
            .iter()
            .enumerate()
            .flat_map(|(i, f)| f.scans.iter().map(move |s| (i, s)))
    }

    pub fn num_scans(&self) -> usize {
        self.files.iter().map(|f| f.scans.len()).sum()
    }

    pub fn earliest_mjd(&self) -> Option<f64> {
        self.scans().map(|(_, s)| s.start_mjd).reduce(f64::min)
    }

    pub fn latest_mjd(&self) -> Option<f64> {
        self.scans().map(|(_, s)| s.end_mjd).reduce(f64::max)
    }

    /// The cycle time of the first scan \[seconds\].
    pub fn cycle_time_s(&self) -> Option<f64> {
        self.scans().next().map(|(_, s)| s.header.cycle_time_s)
    }

    pub fn time_range(&self) -> Option<TimeRange> {
        Some(TimeRange {
            cycle_time_days: self.cycle_time_s()? / SECONDS_PER_DAY,
            earliest_mjd: self.earliest_mjd()?,
            latest_mjd: self.latest_mjd()?,
        })
    }

    /// Is the MJD within the extent of all indexed data?
    pub fn contains_mjd(&self, mjd: f64) -> bool {
        match (self.earliest_mjd(), self.latest_mjd()) {
            (Some(low), Some(high)) => low <= mjd && mjd <= high,
            _ => false,
        }
    }

    /// The MJDs of all cycles, in ascending order.
    pub fn cycle_mjds(&self) -> Vec<f64> {
        let mut mjds: Vec<f64> = self
            .scans()
            .flat_map(|(_, s)| s.cycle_mjds.iter().copied())
            .collect();
        mjds.sort_by(f64::total_cmp);
        mjds
    }

    /// The scan containing the MJD, if any.
    pub fn find_scan(&self, mjd: f64) -> Option<&ScanSummary> {
        self.scans()
            .map(|(_, s)| s)
            .find(|s| s.contains_mjd(mjd))
    }
}
