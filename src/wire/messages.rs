// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Requests, responses and their headers.

use std::{
    io::{Cursor, Read},
    sync::Arc,
};

use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

use super::{
    codec::{read_fixed_string, write_fixed_string, Decode, Encode},
    WireError,
};
use crate::{
    constants::CLIENT_ID_LENGTH,
    index::TimeRange,
    options::AmpPhaseOptions,
    products::{SpectrumBundle, VisBundle},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum RequestType {
    CurrentSpectrum,
    CurrentVisdata,
    ComputeVisdata,
    ComputedVisdata,
    ChildrequestVisdataComputed,
    Servertype,
    SpectrumMjd,
    MjdSpectrum,
    ChildrequestSpectrumMjd,
    Timerange,
    CycleTimes,
    SupplyUsername,
}

impl RequestType {
    pub fn code(self) -> i32 {
        match self {
            RequestType::CurrentSpectrum => 1,
            RequestType::CurrentVisdata => 2,
            RequestType::ComputeVisdata => 3,
            RequestType::ComputedVisdata => 4,
            RequestType::ChildrequestVisdataComputed => 5,
            RequestType::Servertype => 6,
            RequestType::SpectrumMjd => 7,
            RequestType::MjdSpectrum => 8,
            RequestType::ChildrequestSpectrumMjd => 9,
            RequestType::Timerange => 10,
            RequestType::CycleTimes => 11,
            RequestType::SupplyUsername => 12,
        }
    }

    pub fn from_code(code: i32) -> Option<RequestType> {
        RequestType::iter().find(|t| t.code() == code)
    }

    /// Is this a request only workers may make?
    pub fn is_child_request(self) -> bool {
        matches!(
            self,
            RequestType::ChildrequestVisdataComputed | RequestType::ChildrequestSpectrumMjd
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum ResponseType {
    CurrentSpectrum,
    CurrentVisdata,
    VisdataComputed,
    ComputedVisdata,
    VisdataComputing,
    Servertype,
    SpectrumLoading,
    SpectrumLoaded,
    LoadedSpectrum,
    SpectrumOutsiderange,
    Timerange,
    CycleTimes,
    RequestUsername,
}

impl ResponseType {
    pub fn code(self) -> i32 {
        match self {
            ResponseType::CurrentSpectrum => 1,
            ResponseType::CurrentVisdata => 2,
            ResponseType::VisdataComputed => 3,
            ResponseType::ComputedVisdata => 4,
            ResponseType::VisdataComputing => 5,
            ResponseType::Servertype => 6,
            ResponseType::SpectrumLoading => 7,
            ResponseType::SpectrumLoaded => 8,
            ResponseType::LoadedSpectrum => 9,
            ResponseType::SpectrumOutsiderange => 10,
            ResponseType::Timerange => 11,
            ResponseType::CycleTimes => 12,
            ResponseType::RequestUsername => 13,
        }
    }

    pub fn from_code(code: i32) -> Option<ResponseType> {
        ResponseType::iter().find(|t| t.code() == code)
    }
}

/// What kind of server is talking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum ServerType {
    Simulator,
    Correlator,
    Testing,
}

impl ServerType {
    pub fn code(self) -> i32 {
        match self {
            ServerType::Simulator => 1,
            ServerType::Correlator => 2,
            ServerType::Testing => 3,
        }
    }

    pub fn from_code(code: i32) -> Option<ServerType> {
        ServerType::iter().find(|t| t.code() == code)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestHeader {
    pub request_type: RequestType,
    pub client_id: String,
    /// Empty if the client hasn't got one.
    pub username: String,
    pub client_type: i32,
}

impl RequestHeader {
    pub fn new(request_type: RequestType, client_id: &str) -> RequestHeader {
        RequestHeader {
            request_type,
            client_id: client_id.to_string(),
            username: String::new(),
            client_type: 0,
        }
    }

    pub fn username(&self) -> Option<&str> {
        if self.username.is_empty() {
            None
        } else {
            Some(&self.username)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseHeader {
    pub response_type: ResponseType,
    pub client_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    None,
    SpectrumMjd {
        mjd: f64,
        options: Vec<AmpPhaseOptions>,
    },
    /// Without options, the client's saved options are used.
    ComputeVisdata {
        options: Option<Vec<AmpPhaseOptions>>,
    },
    SpectrumComputed {
        spectrum: Arc<SpectrumBundle>,
        options: Vec<AmpPhaseOptions>,
    },
    VisdataComputed {
        vis: Arc<VisBundle>,
        options: Vec<AmpPhaseOptions>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub header: RequestHeader,
    pub body: RequestBody,
}

impl Request {
    pub fn new(request_type: RequestType, client_id: &str) -> Request {
        Request {
            header: RequestHeader::new(request_type, client_id),
            body: RequestBody::None,
        }
    }

    pub fn with_username(mut self, username: &str) -> Request {
        self.header.username = username.to_string();
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Request {
        self.body = body;
        self
    }

    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let h = &self.header;
        let mut buf = vec![];
        h.request_type.code().encode(&mut buf)?;
        write_fixed_string(&mut buf, &h.client_id, CLIENT_ID_LENGTH)
            .map_err(|_| WireError::BadClientId(h.client_id.clone()))?;
        write_fixed_string(&mut buf, &h.username, CLIENT_ID_LENGTH)
            .map_err(|_| WireError::BadUsername(h.username.clone()))?;
        h.client_type.encode(&mut buf)?;

        match &self.body {
            RequestBody::None => (),
            RequestBody::SpectrumMjd { mjd, options } => {
                mjd.encode(&mut buf)?;
                options.encode(&mut buf)?;
            }
            RequestBody::ComputeVisdata { options } => {
                if let Some(options) = options {
                    options.encode(&mut buf)?;
                }
            }
            RequestBody::SpectrumComputed { spectrum, options } => {
                spectrum.encode(&mut buf)?;
                options.encode(&mut buf)?;
            }
            RequestBody::VisdataComputed { vis, options } => {
                vis.encode(&mut buf)?;
                options.encode(&mut buf)?;
            }
        }
        Ok(buf)
    }

    pub fn decode(bytes: &[u8]) -> Result<Request, WireError> {
        let mut r = Cursor::new(bytes);
        let code = i32::decode(&mut r)?;
        let request_type =
            RequestType::from_code(code).ok_or(WireError::UnknownRequestType(code))?;
        let header = RequestHeader {
            request_type,
            client_id: read_fixed_string(&mut r, CLIENT_ID_LENGTH)?,
            username: read_fixed_string(&mut r, CLIENT_ID_LENGTH)?,
            client_type: i32::decode(&mut r)?,
        };

        let body = match request_type {
            RequestType::SpectrumMjd => RequestBody::SpectrumMjd {
                mjd: f64::decode(&mut r)?,
                options: Decode::decode(&mut r)?,
            },
            RequestType::ComputeVisdata => RequestBody::ComputeVisdata {
                options: if remaining(&r) == 0 {
                    None
                } else {
                    Some(Decode::decode(&mut r)?)
                },
            },
            RequestType::ChildrequestSpectrumMjd => RequestBody::SpectrumComputed {
                spectrum: Decode::decode(&mut r)?,
                options: Decode::decode(&mut r)?,
            },
            RequestType::ChildrequestVisdataComputed => RequestBody::VisdataComputed {
                vis: Decode::decode(&mut r)?,
                options: Decode::decode(&mut r)?,
            },
            _ => RequestBody::None,
        };
        Ok(Request { header, body })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    None,
    Spectrum {
        spectrum: Arc<SpectrumBundle>,
        options: Vec<AmpPhaseOptions>,
    },
    Vis {
        vis: Arc<VisBundle>,
        options: Vec<AmpPhaseOptions>,
    },
    ServerType(ServerType),
    TimeRange(TimeRange),
    CycleTimes(Vec<f64>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub header: ResponseHeader,
    pub body: ResponseBody,
}

impl Response {
    pub fn new(response_type: ResponseType, client_id: &str) -> Response {
        Response {
            header: ResponseHeader {
                response_type,
                client_id: client_id.to_string(),
            },
            body: ResponseBody::None,
        }
    }

    pub fn with_body(mut self, body: ResponseBody) -> Response {
        self.body = body;
        self
    }

    pub fn response_type(&self) -> ResponseType {
        self.header.response_type
    }

    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let h = &self.header;
        let mut buf = vec![];
        h.response_type.code().encode(&mut buf)?;
        write_fixed_string(&mut buf, &h.client_id, CLIENT_ID_LENGTH)
            .map_err(|_| WireError::BadClientId(h.client_id.clone()))?;

        match &self.body {
            ResponseBody::None => (),
            ResponseBody::Spectrum { spectrum, options } => {
                spectrum.encode(&mut buf)?;
                options.encode(&mut buf)?;
            }
            ResponseBody::Vis { vis, options } => {
                vis.encode(&mut buf)?;
                options.encode(&mut buf)?;
            }
            ResponseBody::ServerType(t) => t.code().encode(&mut buf)?,
            ResponseBody::TimeRange(range) => range.encode(&mut buf)?,
            ResponseBody::CycleTimes(mjds) => mjds.encode(&mut buf)?,
        }
        Ok(buf)
    }

    pub fn decode(bytes: &[u8]) -> Result<Response, WireError> {
        let mut r = Cursor::new(bytes);
        let code = i32::decode(&mut r)?;
        let response_type =
            ResponseType::from_code(code).ok_or(WireError::UnknownResponseType(code))?;
        let header = ResponseHeader {
            response_type,
            client_id: read_fixed_string(&mut r, CLIENT_ID_LENGTH)?,
        };

        let body = match response_type {
            ResponseType::CurrentSpectrum | ResponseType::LoadedSpectrum => ResponseBody::Spectrum {
                spectrum: Decode::decode(&mut r)?,
                options: Decode::decode(&mut r)?,
            },
            ResponseType::CurrentVisdata | ResponseType::ComputedVisdata => ResponseBody::Vis {
                vis: Decode::decode(&mut r)?,
                options: Decode::decode(&mut r)?,
            },
            ResponseType::Servertype => {
                let code = i32::decode(&mut r)?;
                ResponseBody::ServerType(ServerType::from_code(code).ok_or(
                    WireError::InvalidValue {
                        what: "server type",
                        value: code.to_string(),
                    },
                )?)
            }
            ResponseType::Timerange => ResponseBody::TimeRange(Decode::decode(&mut r)?),
            ResponseType::CycleTimes => ResponseBody::CycleTimes(Decode::decode(&mut r)?),
            _ => ResponseBody::None,
        };
        Ok(Response { header, body })
    }
}

fn remaining<T: AsRef<[u8]>>(r: &Cursor<T>) -> usize {
    (r.get_ref().as_ref().len() as u64).saturating_sub(r.position()) as usize
}

/// Read a length-prefixed list of responses, as written to dump files.
pub(crate) fn decode_responses<R: Read>(r: &mut R) -> Result<Vec<Response>, WireError> {
    let mut responses = vec![];
    while let Some(body) = super::read_frame(r)? {
        responses.push(Response::decode(&body)?);
    }
    Ok(responses)
}
