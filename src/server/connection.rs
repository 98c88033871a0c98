// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Accepting connections and reading their requests.
//!
//! Each connection gets a reader thread that does nothing but read whole
//! frames and post the decoded requests to the dispatcher. The dispatcher
//! keeps a clone of the stream for writing.

use std::{
    net::{TcpListener, TcpStream},
    sync::Arc,
    thread::{self, JoinHandle},
};

use crossbeam_channel::Sender;
use crossbeam_utils::atomic::AtomicCell;
use log::{debug, trace, warn};

use crate::wire::{read_frame, Request};

pub(super) type ConnectionId = usize;

/// Everything the dispatcher reacts to.
#[derive(Debug)]
pub(super) enum Event {
    Connected {
        id: ConnectionId,
        stream: TcpStream,
    },
    Request {
        id: ConnectionId,
        request: Request,
    },
    Closed {
        id: ConnectionId,
    },
    /// A worker's result.
    WorkerFinished(Request),
    Shutdown,
}

/// Accept connections until `stop` is set. A connection is only checked for
/// after the next accept, so whoever sets `stop` should connect once more.
pub(super) fn spawn_acceptor(
    listener: TcpListener,
    tx: Sender<Event>,
    stop: Arc<AtomicCell<bool>>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("acceptor".to_string())
        .spawn(move || {
            let mut next_id: ConnectionId = 0;
            for stream in listener.incoming() {
                if stop.load() {
                    break;
                }
                let stream = match stream {
                    Ok(s) => s,
                    Err(e) => {
                        warn!("Couldn't accept a connection: {e}");
                        continue;
                    }
                };
                let id = next_id;
                next_id += 1;
                if let Err(e) = accept(id, stream, &tx) {
                    warn!("Dropping connection {id}: {e}");
                }
            }
            debug!("No longer accepting connections");
        })
        .expect("OS can create threads")
}

fn accept(id: ConnectionId, stream: TcpStream, tx: &Sender<Event>) -> std::io::Result<()> {
    match stream.peer_addr() {
        Ok(addr) => debug!("Connection {id} from {addr}"),
        Err(_) => debug!("Connection {id}"),
    }
    let writer = stream.try_clone()?;
    if tx.send(Event::Connected { id, stream: writer }).is_err() {
        // The dispatcher is gone.
        return Ok(());
    }

    let tx = tx.clone();
    thread::Builder::new()
        .name(format!("connection {id}"))
        .spawn(move || read_requests(id, stream, tx))
        .expect("OS can create threads");
    Ok(())
}

fn read_requests(id: ConnectionId, mut stream: TcpStream, tx: Sender<Event>) {
    loop {
        let body = match read_frame(&mut stream) {
            Ok(Some(b)) => b,
            Ok(None) => {
                debug!("Connection {id} closed by the peer");
                break;
            }
            Err(e) => {
                debug!("Closing connection {id}: {e}");
                break;
            }
        };
        match Request::decode(&body) {
            Ok(request) if request.header.request_type.is_child_request() => {
                warn!(
                    "Ignoring a {} from {} on connection {id}",
                    request.header.request_type, request.header.client_id
                )
            }
            Ok(request) => {
                trace!(
                    "Connection {id}: {} from {}",
                    request.header.request_type,
                    request.header.client_id
                );
                if tx.send(Event::Request { id, request }).is_err() {
                    return;
                }
            }
            // A frame arrived intact, so the stream is still in step.
            Err(e) => {
                warn!("Ignoring a bad request on connection {id}: {e}")
            }
        }
    }
    // The dispatcher may already be gone during shutdown.
    let _ = tx.send(Event::Closed { id });
}
