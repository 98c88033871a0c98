// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The client side of the socket protocol.
//!
//! A [ServerConnection] can be driven synchronously (send a request, wait for
//! its response), or handed to a background listener that turns everything
//! the server says into [ClientCommand]s on a channel.

mod error;

pub use crate::misc::random_printable_id;
pub use crate::server::read_dump_file;
pub use error::ClientError;

use std::{
    net::{Shutdown, TcpStream, ToSocketAddrs},
    sync::Arc,
    thread,
};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, trace, warn};

use crate::{
    constants::CLIENT_ID_LENGTH,
    index::TimeRange,
    options::AmpPhaseOptions,
    products::{SpectrumBundle, VisBundle},
    wire::{
        receive_response, send_request, Request, RequestBody, RequestType, Response,
        ResponseBody, ResponseType, ServerType, WireError,
    },
};

/// What a client should do next.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    /// Redraw with the data already held; the server has acknowledged a
    /// request (loading, computing, or out of range).
    Refresh(ResponseType),
    /// Products arrived.
    NewData(Response),
    /// Information about the data (server type, time range, cycle times)
    /// arrived.
    DescribeData(Response),
    /// The server wants a username.
    SupplyUsername,
    /// The connection is gone.
    Quit,
}

/// The outcome of asking for a spectrum at an MJD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectrumStatus {
    Loading,
    OutsideRange,
}

pub struct ServerConnection {
    stream: TcpStream,
    client_id: String,
    username: String,
}

impl ServerConnection {
    /// Connect with a freshly generated client ID.
    pub fn connect<A: ToSocketAddrs + std::fmt::Debug>(
        addr: A,
    ) -> Result<ServerConnection, ClientError> {
        ServerConnection::connect_as(addr, &random_printable_id(CLIENT_ID_LENGTH))
    }

    pub fn connect_as<A: ToSocketAddrs + std::fmt::Debug>(
        addr: A,
        client_id: &str,
    ) -> Result<ServerConnection, ClientError> {
        let stream = TcpStream::connect(&addr).map_err(|source| ClientError::Connect {
            addr: format!("{addr:?}"),
            source,
        })?;
        debug!("Connected to {addr:?} as {client_id}");
        Ok(ServerConnection {
            stream,
            client_id: client_id.to_string(),
            username: String::new(),
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The username sent with every subsequent request.
    pub fn set_username(&mut self, username: &str) {
        self.username = username.to_string();
    }

    pub fn send(&mut self, request_type: RequestType, body: RequestBody) -> Result<(), ClientError> {
        let request = Request::new(request_type, &self.client_id)
            .with_username(&self.username)
            .with_body(body);
        trace!("Sending {request_type}");
        send_request(&mut self.stream, &request)?;
        Ok(())
    }

    pub fn receive(&mut self) -> Result<Response, ClientError> {
        receive_response(&mut self.stream)?.ok_or(ClientError::Disconnected)
    }

    /// Receive a response, which must be of the given type.
    pub fn expect(&mut self, expected: ResponseType) -> Result<Response, ClientError> {
        let response = self.receive()?;
        if response.response_type() != expected {
            return Err(WireError::UnexpectedResponseType {
                expected: expected.to_string(),
                got: response.response_type().to_string(),
            }
            .into());
        }
        Ok(response)
    }

    fn ask(&mut self, request_type: RequestType, expected: ResponseType) -> Result<Response, ClientError> {
        self.send(request_type, RequestBody::None)?;
        self.expect(expected)
    }

    /// Ask what kind of server this is. A testing server then asks for a
    /// username, which is supplied if one is set.
    pub fn identify(&mut self) -> Result<ServerType, ClientError> {
        let response = self.ask(RequestType::Servertype, ResponseType::Servertype)?;
        let server_type = match response.body {
            ResponseBody::ServerType(t) => t,
            _ => return Err(unexpected_body(ResponseType::Servertype)),
        };
        if server_type == ServerType::Testing {
            self.expect(ResponseType::RequestUsername)?;
            if !self.username.is_empty() {
                self.send(RequestType::SupplyUsername, RequestBody::None)?;
            }
        }
        Ok(server_type)
    }

    pub fn current_spectrum(
        &mut self,
    ) -> Result<(Arc<SpectrumBundle>, Vec<AmpPhaseOptions>), ClientError> {
        let response = self.ask(RequestType::CurrentSpectrum, ResponseType::CurrentSpectrum)?;
        spectrum_of(response)
    }

    pub fn current_vis(&mut self) -> Result<(Arc<VisBundle>, Vec<AmpPhaseOptions>), ClientError> {
        let response = self.ask(RequestType::CurrentVisdata, ResponseType::CurrentVisdata)?;
        vis_of(response)
    }

    /// The spectrum most recently loaded for this client.
    pub fn loaded_spectrum(
        &mut self,
    ) -> Result<(Arc<SpectrumBundle>, Vec<AmpPhaseOptions>), ClientError> {
        let response = self.ask(RequestType::MjdSpectrum, ResponseType::LoadedSpectrum)?;
        spectrum_of(response)
    }

    /// The vis quantities most recently computed for this client.
    pub fn computed_vis(&mut self) -> Result<(Arc<VisBundle>, Vec<AmpPhaseOptions>), ClientError> {
        let response = self.ask(RequestType::ComputedVisdata, ResponseType::ComputedVisdata)?;
        vis_of(response)
    }

    pub fn time_range(&mut self) -> Result<TimeRange, ClientError> {
        match self.ask(RequestType::Timerange, ResponseType::Timerange)?.body {
            ResponseBody::TimeRange(range) => Ok(range),
            _ => Err(unexpected_body(ResponseType::Timerange)),
        }
    }

    pub fn cycle_times(&mut self) -> Result<Vec<f64>, ClientError> {
        match self.ask(RequestType::CycleTimes, ResponseType::CycleTimes)?.body {
            ResponseBody::CycleTimes(mjds) => Ok(mjds),
            _ => Err(unexpected_body(ResponseType::CycleTimes)),
        }
    }

    /// Ask for a spectrum near `mjd`. When loading, the server later sends
    /// [ResponseType::SpectrumLoaded]; see [ServerConnection::wait_for].
    pub fn request_spectrum(
        &mut self,
        mjd: f64,
        options: Vec<AmpPhaseOptions>,
    ) -> Result<SpectrumStatus, ClientError> {
        self.send(
            RequestType::SpectrumMjd,
            RequestBody::SpectrumMjd { mjd, options },
        )?;
        let response = self.receive()?;
        match response.response_type() {
            ResponseType::SpectrumLoading => Ok(SpectrumStatus::Loading),
            ResponseType::SpectrumOutsiderange => Ok(SpectrumStatus::OutsideRange),
            got => Err(WireError::UnexpectedResponseType {
                expected: ResponseType::SpectrumLoading.to_string(),
                got: got.to_string(),
            }
            .into()),
        }
    }

    /// Ask for vis quantities to be computed. Without options, the server
    /// uses the options last used by this client (or user).
    pub fn compute_vis(&mut self, options: Option<Vec<AmpPhaseOptions>>) -> Result<(), ClientError> {
        self.send(
            RequestType::ComputeVisdata,
            RequestBody::ComputeVisdata { options },
        )?;
        self.expect(ResponseType::VisdataComputing)?;
        Ok(())
    }

    /// Block until a notification of the given type arrives.
    pub fn wait_for(&mut self, notification: ResponseType) -> Result<(), ClientError> {
        loop {
            let response = self.receive()?;
            if response.response_type() == notification {
                return Ok(());
            }
            debug!("Skipping a {} while waiting", response.response_type());
        }
    }

    /// Hand reading over to a background thread. Everything the server sends
    /// becomes a [ClientCommand]; notifications that products are ready are
    /// followed up by fetching them. The connection can still send requests,
    /// but its receiving methods must no longer be used.
    pub fn spawn_listener(&self) -> Result<Receiver<ClientCommand>, ClientError> {
        let reader = self.stream.try_clone()?;
        let follow_up = ServerConnection {
            stream: self.stream.try_clone()?,
            client_id: self.client_id.clone(),
            username: self.username.clone(),
        };
        let (tx, rx) = unbounded();
        thread::Builder::new()
            .name(format!("listener for {}", self.client_id))
            .spawn(move || listen(reader, follow_up, tx))
            .expect("OS can create threads");
        Ok(rx)
    }

    pub fn close(self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

fn listen(mut reader: TcpStream, mut follow_up: ServerConnection, tx: Sender<ClientCommand>) {
    loop {
        let response = match receive_response(&mut reader) {
            Ok(Some(r)) => r,
            Ok(None) => break,
            Err(e) => {
                warn!("Lost the server: {e}");
                break;
            }
        };
        let follow_up_request = match response.response_type() {
            ResponseType::SpectrumLoaded => Some(RequestType::MjdSpectrum),
            ResponseType::VisdataComputed => Some(RequestType::ComputedVisdata),
            _ => None,
        };
        if let Some(request_type) = follow_up_request {
            if let Err(e) = follow_up.send(request_type, RequestBody::None) {
                warn!("Couldn't ask for new data: {e}");
                break;
            }
            continue;
        }
        if tx.send(command_for(response)).is_err() {
            // Nobody is listening.
            return;
        }
    }
    let _ = tx.send(ClientCommand::Quit);
}

/// What a client should do upon receiving a response.
pub fn command_for(response: Response) -> ClientCommand {
    match response.response_type() {
        ResponseType::CurrentSpectrum
        | ResponseType::CurrentVisdata
        | ResponseType::LoadedSpectrum
        | ResponseType::ComputedVisdata => ClientCommand::NewData(response),
        ResponseType::Servertype | ResponseType::Timerange | ResponseType::CycleTimes => {
            ClientCommand::DescribeData(response)
        }
        ResponseType::RequestUsername => ClientCommand::SupplyUsername,
        t @ (ResponseType::SpectrumLoading
        | ResponseType::SpectrumLoaded
        | ResponseType::SpectrumOutsiderange
        | ResponseType::VisdataComputing
        | ResponseType::VisdataComputed) => ClientCommand::Refresh(t),
    }
}

fn unexpected_body(response_type: ResponseType) -> ClientError {
    WireError::InvalidValue {
        what: "response body",
        value: response_type.to_string(),
    }
    .into()
}

fn spectrum_of(
    response: Response,
) -> Result<(Arc<SpectrumBundle>, Vec<AmpPhaseOptions>), ClientError> {
    match response.body {
        ResponseBody::Spectrum { spectrum, options } => Ok((spectrum, options)),
        _ => Err(unexpected_body(response.header.response_type)),
    }
}

fn vis_of(response: Response) -> Result<(Arc<VisBundle>, Vec<AmpPhaseOptions>), ClientError> {
    match response.body {
        ResponseBody::Vis { vis, options } => Ok((vis, options)),
        _ => Err(unexpected_body(response.header.response_type)),
    }
}
