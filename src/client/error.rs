// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::wire::WireError;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Couldn't connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    #[error("The server closed the connection")]
    Disconnected,

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
