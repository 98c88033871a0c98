// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Compute-and-serve engine for radio-interferometer cycle data.
//!
//! Binary visibility files are indexed into scans and cycles, per-channel
//! amplitude/phase spectra and per-cycle averaged quantities are derived on
//! demand under user-selected options, and the results are cached and served
//! to clients over a length-prefixed socket protocol.

pub mod ampphase;
pub mod averaging;
pub mod cache;
mod cli;
pub mod client;
pub mod clients;
pub mod constants;
pub mod data;
pub mod index;
pub mod io;
pub(crate) mod math;
mod messages;
pub(crate) mod misc;
pub mod options;
pub mod pipeline;
pub mod products;
pub mod server;
pub mod tsys;
pub mod wire;

#[cfg(test)]
mod tests;

use crossbeam_utils::atomic::AtomicCell;

lazy_static::lazy_static! {
    /// Are progress bars being drawn? This should only ever be enabled by CLI
    /// code.
    static ref PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);
}

// Re-exports.
pub use ampphase::{compute_ampphase, AmpPhase, AmpPhaseError};
pub use averaging::{compute_vis_quantities, VisQuantities};
pub use cli::{VisdataServer, VisdataServerError};
pub use data::{CycleData, Pol, ScanHeader};
pub use io::read::{CycleFileReader, ReadCycleFileError};
pub use io::write::CycleFileWriter;
pub use options::AmpPhaseOptions;
pub use products::{SpectrumBundle, VisBundle};
