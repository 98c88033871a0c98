// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from reading cycle files.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReadCycleFileError {
    #[error("Couldn't open {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path} is not a cycle file (bad magic bytes)")]
    NotACycleFile { path: PathBuf },

    /// The current cycle can't be used, but reading may continue.
    #[error("Illegal data in {path}: {reason}")]
    IllegalData { path: PathBuf, reason: String },

    #[error("Attempted to read past the end of {path}")]
    EndOfFile { path: PathBuf },

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
