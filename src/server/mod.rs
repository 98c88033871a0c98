// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The server: preloaded default products, a listener and a dispatcher that
//! hands long computations to workers.
//!
//! Threads:
//! - the acceptor, which spawns a reader thread per connection;
//! - connection readers, which post whole requests to the dispatcher;
//! - the dispatcher, which owns all state and answers requests;
//! - workers, which compute spectra and vis quantities from a snapshot of the
//!   caches and post the results back to the dispatcher.

mod connection;
mod dispatch;
mod dump;
mod error;
mod preload;
mod worker;

pub use dump::{read_dump_file, write_dump_files};
pub use error::{DumpError, ServerError};
pub use preload::Preloaded;

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener, TcpStream},
    sync::Arc,
    thread::{self, JoinHandle},
};

use crossbeam_channel::{unbounded, Receiver, Sender};
use crossbeam_utils::atomic::AtomicCell;
use log::{debug, info};

use crate::{
    cache::Caches, clients::ClientRegistry, constants::DEFAULT_CLIENT_ID, wire::ServerType,
};
use connection::{spawn_acceptor, Event};
use dispatch::Dispatcher;
use worker::WorkerContext;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port 0 picks a free port.
    pub port: u16,
    /// Listen on all interfaces rather than only loopback.
    pub networked: bool,
    pub server_type: ServerType,
}

pub struct Server {
    listener: TcpListener,
    dispatcher: Dispatcher,
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl Server {
    /// Bind the listening socket. The preloaded products become the DEFAULT
    /// client's products and seed the caches.
    pub fn bind(preloaded: Preloaded, config: &ServerConfig) -> Result<Server, ServerError> {
        let ip = if config.networked {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        } else {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        };
        let addr = SocketAddr::new(ip, config.port);
        let listener =
            TcpListener::bind(addr).map_err(|source| ServerError::BindFailed { addr, source })?;

        let Preloaded {
            paths,
            index,
            spectrum,
            vis,
            options,
        } = preloaded;
        let mut caches = Caches::default();
        let mut registry = ClientRegistry::new();
        registry.set_spectrum(DEFAULT_CLIENT_ID, caches.spectrum.insert(&options, spectrum));
        registry.set_vis(DEFAULT_CLIENT_ID, caches.vis.insert(&options, vis));
        registry.set_options(DEFAULT_CLIENT_ID, None, &options);

        let (tx, rx) = unbounded();
        let worker_context = WorkerContext {
            paths,
            index,
            caches: Caches::default(),
            tx: tx.clone(),
        };
        let dispatcher = Dispatcher::new(caches, registry, config.server_type, worker_context);
        Ok(Server {
            listener,
            dispatcher,
            tx,
            rx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener.local_addr().map_err(ServerError::ListenFailed)
    }

    /// Serve forever.
    pub fn run(self) -> Result<(), ServerError> {
        info!(
            "Listening on {} as a {} server",
            self.local_addr()?,
            self.dispatcher.server_type
        );
        let stop = Arc::new(AtomicCell::new(false));
        let _acceptor = spawn_acceptor(self.listener, self.tx, stop);
        self.dispatcher.run(self.rx);
        Ok(())
    }

    /// Serve on background threads until the returned handle is shut down or
    /// dropped.
    pub fn spawn(self) -> Result<ServerHandle, ServerError> {
        let addr = self.local_addr()?;
        debug!("Serving on {addr} in the background");
        let stop = Arc::new(AtomicCell::new(false));
        let acceptor = spawn_acceptor(self.listener, self.tx.clone(), Arc::clone(&stop));
        let dispatcher = self.dispatcher;
        let rx = self.rx;
        let dispatcher = thread::Builder::new()
            .name("dispatcher".to_string())
            .spawn(move || dispatcher.run(rx))
            .expect("OS can create threads");
        Ok(ServerHandle {
            addr,
            stop,
            tx: self.tx,
            threads: Some((acceptor, dispatcher)),
        })
    }
}

pub struct ServerHandle {
    addr: SocketAddr,
    stop: Arc<AtomicCell<bool>>,
    tx: Sender<Event>,
    threads: Option<(JoinHandle<()>, JoinHandle<()>)>,
}

impl ServerHandle {
    /// The address clients should connect to.
    pub fn addr(&self) -> SocketAddr {
        if self.addr.ip().is_unspecified() {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), self.addr.port())
        } else {
            self.addr
        }
    }

    /// Stop accepting, close all connections and wait for the server threads.
    pub fn shutdown(mut self) {
        self.stop_threads();
    }

    fn stop_threads(&mut self) {
        let (acceptor, dispatcher) = match self.threads.take() {
            Some(t) => t,
            None => return,
        };
        self.stop.store(true);
        let _ = self.tx.send(Event::Shutdown);
        // Wake the acceptor so it sees the stop flag.
        let _ = TcpStream::connect(self.addr());
        let _ = acceptor.join();
        let _ = dispatcher.join();
        debug!("Server on {} stopped", self.addr);
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop_threads();
    }
}
