// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The socket protocol.
//!
//! Every message is a length-prefixed frame. A request body is a
//! [RequestHeader] followed by the payload its type calls for; a response
//! body is a [ResponseHeader] followed by its payload. The same encoding is
//! used for dump files, which hold a sequence of response frames.

pub(crate) mod codec;
mod error;
mod frame;
mod impls;
mod messages;

pub use codec::{Decode, Encode};
pub use error::WireError;
pub use frame::{read_frame, write_frame};
pub(crate) use messages::decode_responses;
pub use messages::{
    Request, RequestBody, RequestHeader, RequestType, Response, ResponseBody, ResponseHeader,
    ResponseType, ServerType,
};

use std::io::{Read, Write};

pub fn send_request<W: Write>(w: &mut W, request: &Request) -> Result<(), WireError> {
    write_frame(w, &request.encode()?)
}

pub fn send_response<W: Write>(w: &mut W, response: &Response) -> Result<(), WireError> {
    write_frame(w, &response.encode()?)
}

/// Read a request. `None` means the peer closed the connection.
pub fn receive_request<R: Read>(r: &mut R) -> Result<Option<Request>, WireError> {
    read_frame(r)?.map(|body| Request::decode(&body)).transpose()
}

/// Read a response. `None` means the peer closed the connection.
pub fn receive_response<R: Read>(r: &mut R) -> Result<Option<Response>, WireError> {
    read_frame(r)?.map(|body| Response::decode(&body)).transpose()
}
