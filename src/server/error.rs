// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors that stop the server.

use std::{net::SocketAddr, path::PathBuf};

use thiserror::Error;

use crate::{index::IndexError, pipeline::PipelineError, wire::WireError};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Couldn't bind to {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("Couldn't listen for connections: {0}")]
    ListenFailed(std::io::Error),

    #[error("Couldn't preload data: {0}")]
    Preload(#[from] PipelineError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Dump(#[from] DumpError),
}

#[derive(Error, Debug)]
pub enum DumpError {
    #[error("Couldn't create dump file {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Couldn't open dump file {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Dump file {0} holds no data")]
    Empty(PathBuf),

    #[error(transparent)]
    Wire(#[from] WireError),
}
