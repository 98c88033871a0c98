// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The dispatcher owns the caches, the client registry and the write halves
//! of all connections. It handles one event at a time and never waits on a
//! worker.

use std::{
    collections::HashMap,
    net::{Shutdown, TcpStream},
};

use crossbeam_channel::Receiver;
use log::{debug, trace, warn};

use super::{
    connection::{ConnectionId, Event},
    worker::{spawn_worker, Job, Requester, WorkerContext},
};
use crate::{
    cache::Caches,
    clients::ClientRegistry,
    constants::{DEFAULT_CLIENT_ID, MAX_USERNAME_ATTEMPTS, MIN_USERNAME_LENGTH},
    options::{combine_options, AmpPhaseOptions},
    wire::{
        send_response, Request, RequestBody, RequestType, Response, ResponseBody, ResponseType,
        ServerType,
    },
};

struct Connection {
    stream: TcpStream,
    /// Set by the first request.
    client_id: Option<String>,
    rejected_usernames: usize,
}

pub(super) struct Dispatcher {
    pub(super) caches: Caches,
    pub(super) registry: ClientRegistry,
    pub(super) server_type: ServerType,
    /// Cloned for each worker; the caches in here are replaced with the
    /// current ones at that time.
    pub(super) worker_context: WorkerContext,
    connections: HashMap<ConnectionId, Connection>,
}

impl Dispatcher {
    pub(super) fn new(
        caches: Caches,
        registry: ClientRegistry,
        server_type: ServerType,
        worker_context: WorkerContext,
    ) -> Dispatcher {
        Dispatcher {
            caches,
            registry,
            server_type,
            worker_context,
            connections: HashMap::new(),
        }
    }

    pub(super) fn run(mut self, rx: Receiver<Event>) {
        for event in rx.iter() {
            match event {
                Event::Connected { id, stream } => {
                    self.connections.insert(
                        id,
                        Connection {
                            stream,
                            client_id: None,
                            rejected_usernames: 0,
                        },
                    );
                }
                Event::Request { id, request } => self.handle_request(id, request),
                Event::Closed { id } => self.close(id),
                Event::WorkerFinished(result) => self.handle_worker_result(result),
                Event::Shutdown => break,
            }
        }

        for (_, conn) in self.connections.drain() {
            let _ = conn.stream.shutdown(Shutdown::Both);
        }
        debug!("Dispatcher stopped");
    }

    fn handle_request(&mut self, id: ConnectionId, request: Request) {
        let header = &request.header;
        let client_id = header.client_id.as_str();
        if client_id.is_empty() || client_id == DEFAULT_CLIENT_ID {
            warn!("Ignoring a request with the client ID '{client_id}'");
            return;
        }

        match self.connections.get_mut(&id) {
            Some(conn) => {
                if conn.client_id.is_none() {
                    debug!("Connection {id} is client {client_id}");
                    conn.client_id = Some(client_id.to_string());
                }
            }
            None => return,
        }
        if let Some(username) = header.username() {
            if username.len() >= MIN_USERNAME_LENGTH
                && self.registry.username(client_id) != Some(username)
            {
                self.registry.set_username(client_id, username);
            }
        }

        let username = header.username();
        match header.request_type {
            RequestType::Servertype => {
                self.reply(
                    id,
                    Response::new(ResponseType::Servertype, client_id)
                        .with_body(ResponseBody::ServerType(self.server_type)),
                );
                if self.server_type == ServerType::Testing {
                    self.reply(id, Response::new(ResponseType::RequestUsername, client_id));
                }
            }

            RequestType::CurrentSpectrum => {
                if let Some(spectrum) = self.registry.spectrum(DEFAULT_CLIENT_ID) {
                    let options = self.default_options();
                    self.reply(
                        id,
                        Response::new(ResponseType::CurrentSpectrum, client_id)
                            .with_body(ResponseBody::Spectrum { spectrum, options }),
                    );
                }
            }

            RequestType::CurrentVisdata => {
                if let Some(vis) = self.registry.vis(DEFAULT_CLIENT_ID) {
                    let options = self.default_options();
                    self.reply(
                        id,
                        Response::new(ResponseType::CurrentVisdata, client_id)
                            .with_body(ResponseBody::Vis { vis, options }),
                    );
                }
            }

            RequestType::MjdSpectrum => {
                if let Some(spectrum) = self.registry.spectrum_or_default(client_id) {
                    let options = self.client_options(client_id, username);
                    self.reply(
                        id,
                        Response::new(ResponseType::LoadedSpectrum, client_id)
                            .with_body(ResponseBody::Spectrum { spectrum, options }),
                    );
                }
            }

            RequestType::ComputedVisdata => {
                if let Some(vis) = self.registry.vis_or_default(client_id) {
                    let options = self.client_options(client_id, username);
                    self.reply(
                        id,
                        Response::new(ResponseType::ComputedVisdata, client_id)
                            .with_body(ResponseBody::Vis { vis, options }),
                    );
                }
            }

            RequestType::SpectrumMjd => {
                let (mjd, options) = match &request.body {
                    RequestBody::SpectrumMjd { mjd, options } => (*mjd, options.clone()),
                    _ => {
                        warn!("A spectrum request from {client_id} carried no MJD");
                        return;
                    }
                };
                let in_range = self
                    .worker_context
                    .index
                    .time_range()
                    .map(|r| r.earliest_mjd <= mjd && mjd <= r.latest_mjd)
                    .unwrap_or(false);
                if !in_range {
                    debug!("MJD {mjd} requested by {client_id} is outside the data");
                    self.reply(id, Response::new(ResponseType::SpectrumOutsiderange, client_id));
                    return;
                }
                let options = if options.is_empty() {
                    self.client_options(client_id, username)
                } else {
                    options
                };
                self.reply(id, Response::new(ResponseType::SpectrumLoading, client_id));
                self.start_worker(&request, Job::Spectrum { mjd }, options);
            }

            RequestType::ComputeVisdata => {
                let options = match &request.body {
                    RequestBody::ComputeVisdata {
                        options: Some(options),
                    } => options.clone(),
                    _ => self.client_options(client_id, username),
                };
                self.reply(id, Response::new(ResponseType::VisdataComputing, client_id));
                self.start_worker(&request, Job::Vis, options);
            }

            RequestType::Timerange => match self.worker_context.index.time_range() {
                Some(range) => self.reply(
                    id,
                    Response::new(ResponseType::Timerange, client_id)
                        .with_body(ResponseBody::TimeRange(range)),
                ),
                None => warn!("No time range to give {client_id}"),
            },

            RequestType::CycleTimes => {
                let mjds = self.worker_context.index.cycle_mjds();
                self.reply(
                    id,
                    Response::new(ResponseType::CycleTimes, client_id)
                        .with_body(ResponseBody::CycleTimes(mjds)),
                );
            }

            RequestType::SupplyUsername => {
                let accepted = username.map_or(false, |u| u.len() >= MIN_USERNAME_LENGTH);
                if !accepted {
                    self.reject_username(id, client_id);
                }
            }

            // Worker results arrive as their own event; connection readers
            // drop these.
            RequestType::ChildrequestSpectrumMjd | RequestType::ChildrequestVisdataComputed => (),
        }
    }

    fn reject_username(&mut self, id: ConnectionId, client_id: &str) {
        let attempts = match self.connections.get_mut(&id) {
            Some(conn) => {
                conn.rejected_usernames += 1;
                conn.rejected_usernames
            }
            None => return,
        };
        if attempts >= MAX_USERNAME_ATTEMPTS {
            debug!("Disconnecting {client_id} after {attempts} bad usernames");
            if let Some(conn) = self.connections.get(&id) {
                let _ = conn.stream.shutdown(Shutdown::Both);
            }
            self.close(id);
        } else {
            self.reply(id, Response::new(ResponseType::RequestUsername, client_id));
        }
    }

    fn start_worker(&self, request: &Request, job: Job, options: Vec<AmpPhaseOptions>) {
        let ctx = WorkerContext {
            caches: self.caches.clone(),
            ..self.worker_context.clone()
        };
        let requester = Requester {
            client_id: request.header.client_id.clone(),
            username: request.header.username.clone(),
        };
        spawn_worker(ctx, requester, job, options);
    }

    fn handle_worker_result(&mut self, result: Request) {
        let client_id = result.header.client_id.as_str();
        let username = result.header.username();
        let (response_type, options) = match result.body {
            RequestBody::SpectrumComputed { spectrum, options } => {
                let spectrum = self.caches.spectrum.insert(&options, spectrum);
                if !self.is_connected(client_id) {
                    debug!("Discarding a spectrum for the departed client {client_id}");
                    return;
                }
                self.registry.set_spectrum(client_id, spectrum);
                (ResponseType::SpectrumLoaded, options)
            }
            RequestBody::VisdataComputed { vis, options } => {
                let vis = self.caches.vis.insert(&options, vis);
                if !self.is_connected(client_id) {
                    debug!("Discarding vis quantities for the departed client {client_id}");
                    return;
                }
                self.registry.set_vis(client_id, vis);
                (ResponseType::VisdataComputed, options)
            }
            _ => {
                warn!("A worker result for {client_id} carried no data");
                return;
            }
        };

        let mut combined = self.client_options(client_id, username);
        combine_options(&mut combined, &options);
        self.registry.set_options(client_id, username, &combined);

        let ids: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, c)| c.client_id.as_deref() == Some(client_id))
            .map(|(&id, _)| id)
            .collect();
        for id in ids {
            self.reply(id, Response::new(response_type, client_id));
        }
    }

    fn reply(&mut self, id: ConnectionId, response: Response) {
        let result = match self.connections.get_mut(&id) {
            Some(conn) => send_response(&mut conn.stream, &response),
            None => return,
        };
        match result {
            Ok(()) => trace!("Sent {} on connection {id}", response.response_type()),
            Err(e) => {
                debug!("Couldn't write to connection {id}: {e}");
                self.close(id);
            }
        }
    }

    fn close(&mut self, id: ConnectionId) {
        let client_id = match self.connections.remove(&id) {
            Some(Connection {
                client_id: Some(c), ..
            }) => c,
            _ => return,
        };
        if !self.is_connected(&client_id) {
            debug!("Forgetting client {client_id}");
            self.registry.remove_client(&client_id);
        }
    }

    fn is_connected(&self, client_id: &str) -> bool {
        self.connections
            .values()
            .any(|c| c.client_id.as_deref() == Some(client_id))
    }

    fn default_options(&self) -> Vec<AmpPhaseOptions> {
        self.registry
            .options_for(DEFAULT_CLIENT_ID, None)
            .map(|o| o.to_vec())
            .unwrap_or_default()
    }

    fn client_options(&self, client_id: &str, username: Option<&str>) -> Vec<AmpPhaseOptions> {
        self.registry
            .options_for(client_id, username)
            .map(|o| o.to_vec())
            .unwrap_or_default()
    }
}
