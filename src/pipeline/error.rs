// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from reading and reducing cycle data.

use thiserror::Error;

use crate::{ampphase::AmpPhaseError, io::read::ReadCycleFileError, tsys::TsysError};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("MJD {mjd} is outside the range of the data ({earliest} to {latest})")]
    OutsideMJDRange {
        mjd: f64,
        earliest: f64,
        latest: f64,
    },

    #[error("No cycle was found near MJD {mjd}")]
    NoCycleFound { mjd: f64 },

    #[error("No cycle was found in any of the {num_files} input file(s)")]
    NoData { num_files: usize },

    #[error(transparent)]
    Read(#[from] ReadCycleFileError),

    #[error(transparent)]
    AmpPhase(#[from] AmpPhaseError),

    #[error(transparent)]
    Tsys(#[from] TsysError),
}
