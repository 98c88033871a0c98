// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Workers run the long computations away from the dispatcher. Each works
//! on a snapshot of the caches and reports back with a child request, or
//! not at all if something goes wrong.

use std::{path::PathBuf, sync::Arc, thread};

use crossbeam_channel::Sender;
use log::{debug, error};
use scopeguard::defer_on_unwind;

use super::connection::Event;
use crate::{
    cache::Caches,
    index::DataIndex,
    options::AmpPhaseOptions,
    pipeline::{read_data, ReadIntents, ReadRequest},
    wire::{Request, RequestBody, RequestType},
};

/// What a worker needs to know about the data.
#[derive(Clone)]
pub(super) struct WorkerContext {
    pub(super) paths: Arc<Vec<PathBuf>>,
    pub(super) index: Arc<DataIndex>,
    pub(super) caches: Caches,
    pub(super) tx: Sender<Event>,
}

/// Who asked.
pub(super) struct Requester {
    pub(super) client_id: String,
    pub(super) username: String,
}

pub(super) enum Job {
    Spectrum { mjd: f64 },
    Vis,
}

pub(super) fn spawn_worker(
    ctx: WorkerContext,
    requester: Requester,
    job: Job,
    mut options: Vec<AmpPhaseOptions>,
) {
    let name = match job {
        Job::Spectrum { .. } => format!("spectrum for {}", requester.client_id),
        Job::Vis => format!("vis for {}", requester.client_id),
    };
    thread::Builder::new()
        .name(name)
        .spawn(move || {
            defer_on_unwind! { error!("A worker for {} panicked", requester.client_id); }

            let (intents, mjd, request_type) = match job {
                Job::Spectrum { mjd } => (
                    ReadIntents {
                        spectrum: true,
                        ..Default::default()
                    },
                    Some(mjd),
                    RequestType::ChildrequestSpectrumMjd,
                ),
                Job::Vis => (
                    ReadIntents {
                        vis_products: true,
                        ..Default::default()
                    },
                    None,
                    RequestType::ChildrequestVisdataComputed,
                ),
            };
            let read_request = ReadRequest {
                intents,
                mjd,
                caches: Some(&ctx.caches),
                ..Default::default()
            };
            let products = match read_data(&ctx.paths, Some(&ctx.index), &read_request, &mut options)
            {
                Ok(p) => p,
                Err(e) => {
                    error!("Worker for {} failed: {e}", requester.client_id);
                    return;
                }
            };

            let body = match (products.spectrum, products.vis) {
                (Some(spectrum), _) => RequestBody::SpectrumComputed { spectrum, options },
                (_, Some(vis)) => RequestBody::VisdataComputed { vis, options },
                (None, None) => {
                    error!("Worker for {} produced nothing", requester.client_id);
                    return;
                }
            };
            debug!("Worker for {} finished", requester.client_id);
            let result = Request::new(request_type, &requester.client_id)
                .with_username(&requester.username)
                .with_body(body);
            // If the server has stopped, nobody is waiting.
            let _ = ctx.tx.send(Event::WorkerFinished(result));
        })
        .expect("OS can create threads");
}
