// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from framing, encoding and decoding messages.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WireError {
    #[error("The connection closed after {received} of {expected} frame bytes")]
    ShortFrame { expected: u64, received: u64 },

    #[error("A frame of {length} bytes exceeds the limit of {max} bytes")]
    FrameTooLarge { length: u64, max: u64 },

    #[error("Client ID '{0}' is longer than the header allows")]
    BadClientId(String),

    #[error("Username '{0}' is longer than the header allows")]
    BadUsername(String),

    #[error("Expected a {expected} response, but got {got}")]
    UnexpectedResponseType { expected: String, got: String },

    #[error("Unknown request type {0}")]
    UnknownRequestType(i32),

    #[error("Unknown response type {0}")]
    UnknownResponseType(i32),

    #[error("The message body ended early")]
    Truncated,

    #[error("Invalid {what} on the wire: {value}")]
    InvalidValue { what: &'static str, value: String },

    #[error("A string on the wire isn't valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("IO error: {0}")]
    IO(std::io::Error),
}

impl From<std::io::Error> for WireError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof => WireError::Truncated,
            _ => WireError::IO(e),
        }
    }
}
