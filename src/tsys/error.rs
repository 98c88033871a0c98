// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from system-temperature handling.

use thiserror::Error;

use crate::{data::DataError, options::OptionsError};

#[derive(Error, Debug)]
pub enum TsysError {
    /// Only bins 1 (noise diode off) and 2 (on) are understood.
    #[error("Autocorrelation of antenna {antenna} in window {window} has bin {bin}; only noise-diode bins 1 (off) and 2 (on) are expected")]
    UnexpectedBin {
        window: usize,
        antenna: usize,
        bin: usize,
    },

    #[error(transparent)]
    Options(#[from] OptionsError),

    #[error(transparent)]
    Data(#[from] DataError),
}
