// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all visdata-server errors. This should be the *only* error
//! enum that is publicly visible from the binary's point of view.

use thiserror::Error;

use super::serve::ServeArgsError;
use crate::{
    index::IndexError,
    io::{read::ReadCycleFileError, GlobError},
    pipeline::PipelineError,
    server::{DumpError, ServerError},
    wire::WireError,
};

#[derive(Error, Debug)]
pub enum VisdataServerError {
    /// An error with the supplied arguments.
    #[error("{0}")]
    Args(String),

    /// An error related to argument files.
    #[error("{0}\n\nArgument files must be toml or json, with keys named after the long CLI flags")]
    ArgFile(String),

    /// An error reading cycle files.
    #[error("{0}")]
    Read(String),

    /// An error while serving.
    #[error("{0}")]
    Server(String),

    /// An error writing or reading dump files.
    #[error("{0}")]
    Dump(String),

    /// A generic error that can't be clarified further, e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

impl From<ServeArgsError> for VisdataServerError {
    fn from(e: ServeArgsError) -> Self {
        let s = e.to_string();
        match e {
            ServeArgsError::NoInputs => Self::Args(s),
            ServeArgsError::Glob(e) => Self::from(e),
        }
    }
}

impl From<GlobError> for VisdataServerError {
    fn from(e: GlobError) -> Self {
        Self::Args(e.to_string())
    }
}

impl From<ReadCycleFileError> for VisdataServerError {
    fn from(e: ReadCycleFileError) -> Self {
        Self::Read(e.to_string())
    }
}

impl From<IndexError> for VisdataServerError {
    fn from(e: IndexError) -> Self {
        Self::Read(e.to_string())
    }
}

impl From<PipelineError> for VisdataServerError {
    fn from(e: PipelineError) -> Self {
        Self::Read(e.to_string())
    }
}

impl From<ServerError> for VisdataServerError {
    fn from(e: ServerError) -> Self {
        let s = e.to_string();
        match e {
            ServerError::BindFailed { .. } | ServerError::ListenFailed(_) => Self::Server(s),
            ServerError::Preload(e) => Self::from(e),
            ServerError::Index(e) => Self::from(e),
            ServerError::Dump(e) => Self::from(e),
        }
    }
}

impl From<DumpError> for VisdataServerError {
    fn from(e: DumpError) -> Self {
        Self::Dump(e.to_string())
    }
}

impl From<WireError> for VisdataServerError {
    fn from(e: WireError) -> Self {
        Self::Server(e.to_string())
    }
}

impl From<std::io::Error> for VisdataServerError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
