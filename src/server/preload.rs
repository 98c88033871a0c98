// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The products a server holds before any client connects.

use std::{path::PathBuf, sync::Arc};

use log::{debug, info};
use rand::seq::SliceRandom;

use super::ServerError;
use crate::{
    constants::{PRELOAD_SCAN_OFFSET_SECONDS, SECONDS_PER_DAY},
    index::{DataIndex, IndexError},
    options::AmpPhaseOptions,
    pipeline::{read_data, ReadIntents, ReadRequest},
    products::{SpectrumBundle, VisBundle},
};

/// Indexed input files, the default spectrum and vis bundles, and the
/// default options they were computed with.
#[derive(Debug, Clone)]
pub struct Preloaded {
    pub paths: Arc<Vec<PathBuf>>,
    pub index: Arc<DataIndex>,
    pub spectrum: Arc<SpectrumBundle>,
    pub vis: Arc<VisBundle>,
    pub options: Vec<AmpPhaseOptions>,
}

impl Preloaded {
    /// Index the files, then grab a spectrum from a random scan and compute
    /// vis quantities for all of the data with default options.
    pub fn load(paths: Vec<PathBuf>) -> Result<Preloaded, ServerError> {
        let index = DataIndex::build(&paths)?;

        let scans: Vec<_> = index.scans().map(|(_, s)| s).collect();
        let scan = scans
            .choose(&mut rand::thread_rng())
            .ok_or(IndexError::NoData {
                num_files: paths.len(),
            })?;
        let mjd = preload_mjd(*scan.cycle_mjds.first(), *scan.cycle_mjds.last());
        debug!(
            "Preloading the spectrum of {} at MJD {mjd}",
            scan.header.source_name()
        );

        let mut options = vec![];
        let request = ReadRequest {
            intents: ReadIntents {
                spectrum: true,
                vis_products: true,
                ..Default::default()
            },
            mjd: Some(mjd),
            ..Default::default()
        };
        let products = read_data(&paths, Some(&index), &request, &mut options)?;
        let (spectrum, vis) = match (products.spectrum, products.vis) {
            (Some(s), Some(v)) => (s, v),
            // Both were asked for, so both are present when reading succeeds.
            _ => {
                return Err(IndexError::NoData {
                    num_files: paths.len(),
                }
                .into())
            }
        };
        info!(
            "Preloaded a spectrum at UT {} s and {} cycles of vis quantities",
            spectrum.ut_seconds,
            vis.num_cycles()
        );

        Ok(Preloaded {
            paths: Arc::new(paths),
            index: Arc::new(index),
            spectrum,
            vis,
            options,
        })
    }
}

/// A little way into the scan, unless the scan is shorter than that.
fn preload_mjd(first_cycle_mjd: f64, last_cycle_mjd: f64) -> f64 {
    (first_cycle_mjd + PRELOAD_SCAN_OFFSET_SECONDS / SECONDS_PER_DAY).min(last_cycle_mjd)
}
