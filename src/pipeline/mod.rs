// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reading cycles from the input files and reducing them to spectra and
//! averaged quantities.
//!
//! Every cycle that is processed is first calibrated (its system temperatures
//! are recomputed and the requested scaling applied), then the spectra of
//! each window and polarisation product are computed. Spectrum requests keep
//! the first cycle near the requested MJD; vis requests average the spectra
//! of every cycle in range.

mod error;
#[cfg(test)]
mod tests;

pub use error::PipelineError;

use std::{
    io::Read,
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{debug, trace, warn};
use rayon::prelude::*;

use crate::{
    ampphase::{compute_ampphase, AmpPhase},
    averaging::{compute_vis_quantities, VisQuantities},
    cache::Caches,
    constants::SECONDS_PER_DAY,
    data::{CycleData, ScanHeader},
    index::{cycle_mjd, DataIndex, FileIndex, ScanSummary},
    io::read::{CycleFileReader, CycleRead, HeaderRead, ReadCycleFileError, ReadStatus},
    misc::mjds_within,
    options::{find_or_create_options, AmpPhaseOptions},
    products::{SpectrumBundle, VisBundle, VisCycle},
    tsys::{calibrate_cycle, TsysError},
};

/// What a call to [read_data] should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadIntents {
    /// Index the scans of every file.
    pub scan_metadata: bool,
    /// The spectra of a single cycle.
    pub spectrum: bool,
    /// Averaged quantities of every cycle in range.
    pub vis_products: bool,
}

impl ReadIntents {
    pub fn any(&self) -> bool {
        self.scan_metadata || self.spectrum || self.vis_products
    }

    /// Is a spectrum the only thing wanted?
    fn spectrum_only(&self) -> bool {
        self.spectrum && !self.scan_metadata && !self.vis_products
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReadRequest<'a> {
    pub intents: ReadIntents,
    /// The MJD of the wanted spectrum. Without one, the first cycle is used.
    pub mjd: Option<f64>,
    /// Only cycles within `[low, high]` are averaged.
    pub mjd_range: Option<(f64, f64)>,
    /// Caches to search before touching any files.
    pub caches: Option<&'a Caches>,
}

#[derive(Debug, Default)]
pub struct DataProducts {
    pub index: Option<DataIndex>,
    pub spectrum: Option<Arc<SpectrumBundle>>,
    pub vis: Option<Arc<VisBundle>>,
    /// Was the spectrum found in the cache?
    pub spectrum_cached: bool,
    /// Were the vis quantities found in the cache?
    pub vis_cached: bool,
}

/// The spectra of the cycle picked for a spectrum request.
struct PickedCycle {
    header: Arc<ScanHeader>,
    ut_seconds: f64,
    mjd: f64,
    ampphase: Vec<Vec<AmpPhase>>,
}

#[derive(Default)]
struct Found {
    spectrum: Option<PickedCycle>,
    vis_cycles: Vec<VisCycle>,
}

/// Read the input files and produce what `request` asks for. `options` holds
/// the options for each IF configuration; options for configurations not in
/// the list are created from its first element and appended.
///
/// Files are only opened when they may contain wanted data. Cycles that can't
/// be read are skipped, as are files that can't be opened.
pub fn read_data(
    paths: &[PathBuf],
    index: Option<&DataIndex>,
    request: &ReadRequest,
    options: &mut Vec<AmpPhaseOptions>,
) -> Result<DataProducts, PipelineError> {
    let mut intents = request.intents;
    let mut products = DataProducts::default();

    if let Some(caches) = request.caches {
        if intents.vis_products {
            if let Some(vis) = caches.vis.lookup(options) {
                debug!("Using cached vis quantities");
                products.vis = Some(vis);
                products.vis_cached = true;
                intents.vis_products = false;
            }
        }
        if let (true, Some(mjd)) = (intents.spectrum, request.mjd) {
            if let Some(spectrum) = caches.spectrum.lookup(mjd, options) {
                debug!("Using the cached spectrum at MJD {}", spectrum.mjd);
                products.spectrum = Some(spectrum);
                products.spectrum_cached = true;
                intents.spectrum = false;
            }
        }
    }

    if let (true, Some(mjd), Some(range)) = (
        intents.spectrum,
        request.mjd,
        index.and_then(|i| i.time_range()),
    ) {
        if mjd < range.earliest_mjd || mjd > range.latest_mjd {
            return Err(PipelineError::OutsideMJDRange {
                mjd,
                earliest: range.earliest_mjd,
                latest: range.latest_mjd,
            });
        }
    }

    if !intents.any() {
        return Ok(products);
    }

    let mut found = Found::default();
    let mut file_indices = vec![];
    for path in paths {
        let file_index = index.and_then(|i| i.files.iter().find(|f| f.path == *path));
        let spectrum_pending = intents.spectrum && found.spectrum.is_none();
        let may_hold_spectrum = match (request.mjd, file_index) {
            (Some(mjd), Some(f)) => f.contains_mjd(mjd),
            _ => true,
        };
        if !(intents.scan_metadata || intents.vis_products || (spectrum_pending && may_hold_spectrum)) {
            trace!("Not opening {}", path.display());
            continue;
        }

        let reader = match CycleFileReader::open(path) {
            Ok(r) => r,
            Err(e) => {
                warn!("{e}");
                continue;
            }
        };
        let scans = traverse_file(reader, path, file_index, intents, request, options, &mut found)?;
        if intents.scan_metadata {
            file_indices.push(FileIndex {
                path: path.to_path_buf(),
                scans,
            });
        }
        if intents.spectrum_only() && found.spectrum.is_some() {
            break;
        }
    }

    if intents.scan_metadata {
        let index = DataIndex {
            files: file_indices,
        };
        if index.num_scans() == 0 {
            return Err(PipelineError::NoData {
                num_files: paths.len(),
            });
        }
        products.index = Some(index);
    }

    if intents.spectrum {
        let picked = found.spectrum.ok_or(match request.mjd {
            Some(mjd) => PipelineError::NoCycleFound { mjd },
            None => PipelineError::NoData {
                num_files: paths.len(),
            },
        })?;
        products.spectrum = Some(Arc::new(SpectrumBundle {
            header: picked.header,
            ut_seconds: picked.ut_seconds,
            mjd: picked.mjd,
            ampphase: picked.ampphase,
            options: options.clone(),
        }));
    }

    if intents.vis_products {
        let mut cycles = found.vis_cycles;
        cycles.sort_by(|a, b| a.mjd.total_cmp(&b.mjd));
        let (mjd_low, mjd_high) = match (request.mjd_range, cycles.first(), cycles.last()) {
            (Some(range), _, _) => range,
            (None, Some(first), Some(last)) => {
                let half = first.header.half_cycle_s() / SECONDS_PER_DAY;
                (first.mjd - half, last.mjd + half)
            }
            _ => (0.0, 0.0),
        };
        debug!("Averaged {} cycles", cycles.len());
        products.vis = Some(Arc::new(VisBundle {
            cycles,
            mjd_low,
            mjd_high,
            options: options.clone(),
        }));
    }

    Ok(products)
}

/// Index a single file: its scans and the MJD of each of their cycles. This
/// is the scan-metadata traversal of [read_data] without anything else.
pub(crate) fn index_file(path: &Path) -> Result<FileIndex, PipelineError> {
    let reader = CycleFileReader::open(path)?;
    let intents = ReadIntents {
        scan_metadata: true,
        ..Default::default()
    };
    let request = ReadRequest {
        intents,
        ..Default::default()
    };
    let scans = traverse_file(
        reader,
        path,
        None,
        intents,
        &request,
        &mut vec![],
        &mut Found::default(),
    )?;
    Ok(FileIndex {
        path: path.to_path_buf(),
        scans,
    })
}

/// Read through one file, processing the cycles `request` wants. If scan
/// metadata is wanted, the file's scans are returned.
fn traverse_file<R: Read>(
    mut reader: CycleFileReader<R>,
    path: &Path,
    file_index: Option<&FileIndex>,
    intents: ReadIntents,
    request: &ReadRequest,
    options: &mut Vec<AmpPhaseOptions>,
    found: &mut Found,
) -> Result<Vec<ScanSummary>, PipelineError> {
    debug!("Reading {}", path.display());

    let mut scans = vec![];
    let mut finished = false;
    while !finished {
        let header = match reader.next_scan_header() {
            Ok(HeaderRead::Header(h)) => h,
            Ok(HeaderRead::FlagTable) => continue,
            Ok(HeaderRead::EndOfFile) => break,
            Err(e @ ReadCycleFileError::IllegalData { .. }) => {
                warn!("{e}");
                continue;
            }
            Err(e) => {
                warn!("{e}");
                break;
            }
        };
        // Share the indexed copy of the header, if there is one.
        let header = match file_index.and_then(|f| f.shared_header(&header)) {
            Some(shared) => shared,
            None => Arc::new(header),
        };
        let base_mjd = match header.base_mjd() {
            Ok(m) => Some(m),
            Err(e) => {
                warn!("Ignoring the cycles of a scan in {}: {e}", path.display());
                None
            }
        };

        let mut cycle_mjds = vec![];
        loop {
            let CycleRead { cycle, status } = match reader.next_cycle(&header) {
                Ok(r) => r,
                Err(e @ ReadCycleFileError::IllegalData { .. }) => {
                    warn!("{e}");
                    continue;
                }
                Err(e) => {
                    warn!("{e}");
                    finished = true;
                    break;
                }
            };

            if let (Some(mut cycle), Some(base_mjd)) = (cycle, base_mjd) {
                let mjd = cycle_mjd(base_mjd, cycle.ut_seconds);
                cycle_mjds.push(mjd);

                let want_spectrum = intents.spectrum
                    && found.spectrum.is_none()
                    && request
                        .mjd
                        .map_or(true, |target| mjds_within(mjd, target, header.half_cycle_s()));
                let want_vis = intents.vis_products
                    && request
                        .mjd_range
                        .map_or(true, |(low, high)| low <= mjd && mjd <= high);

                let processed = if want_spectrum || want_vis {
                    trace!("Processing the cycle at {} s", cycle.ut_seconds);
                    process_cycle(&header, &mut cycle, options)?
                } else {
                    None
                };
                if let Some(ampphase) = processed {
                    if want_vis {
                        let cycle_options = find_or_create_options(options, &header).clone();
                        found.vis_cycles.push(VisCycle {
                            header: Arc::clone(&header),
                            ut_seconds: cycle.ut_seconds,
                            mjd,
                            quantities: average_cycle(&ampphase, &cycle_options),
                            site: cycle.syscal.site.clone(),
                            syscal: cycle.syscal.cells().cloned().collect(),
                        });
                    }
                    if want_spectrum {
                        found.spectrum = Some(PickedCycle {
                            header: Arc::clone(&header),
                            ut_seconds: cycle.ut_seconds,
                            mjd,
                            ampphase,
                        });
                        if intents.spectrum_only() {
                            finished = true;
                            break;
                        }
                    }
                }
            }

            match status {
                ReadStatus::DataAvailable => (),
                ReadStatus::HeaderAvailable => break,
                ReadStatus::Exhausted => {
                    finished = true;
                    break;
                }
            }
        }

        if intents.scan_metadata {
            match ScanSummary::new(header, cycle_mjds) {
                Some(summary) => scans.push(summary),
                None => debug!("Discarding a scan without cycles in {}", path.display()),
            }
        }
    }
    reader.close();

    Ok(scans)
}

/// Calibrate a cycle and compute the spectra of every window and polarisation
/// product, in header order. Cycles that can't be calibrated give `None`.
fn process_cycle(
    header: &Arc<ScanHeader>,
    cycle: &mut CycleData,
    options: &mut Vec<AmpPhaseOptions>,
) -> Result<Option<Vec<Vec<AmpPhase>>>, PipelineError> {
    let cycle_options = find_or_create_options(options, header);
    match calibrate_cycle(header, cycle, cycle_options) {
        Ok(()) => (),
        // The cycle's scaling can't be trusted to match its options.
        Err(e @ TsysError::UnexpectedBin { .. }) => {
            warn!("{e}; skipping the cycle at {} s", cycle.ut_seconds);
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    }

    let mut ampphase = Vec::with_capacity(header.windows.len());
    for window in &header.windows {
        let mut per_pol = Vec::with_capacity(window.num_stokes);
        for slot in 0..window.num_stokes {
            match window.stokes_pol(slot) {
                Some(pol) => per_pol.push(compute_ampphase(header, cycle, window.label, pol, options)?),
                None => trace!(
                    "Window {} product {:?} isn't a recognised polarisation",
                    window.label,
                    window.stokes[slot]
                ),
            }
        }
        ampphase.push(per_pol);
    }
    Ok(Some(ampphase))
}

/// Average the spectra of every window and polarisation product.
fn average_cycle(ampphase: &[Vec<AmpPhase>], options: &AmpPhaseOptions) -> Vec<Vec<VisQuantities>> {
    ampphase
        .par_iter()
        .map(|per_pol| {
            per_pol
                .par_iter()
                .map(|ap| compute_vis_quantities(ap, options))
                .collect()
        })
        .collect()
}
