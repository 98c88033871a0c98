// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Per-client state: the last spectrum and vis bundles delivered to each
//! client, and the options each client (or username) last used.
//!
//! The reserved ID [DEFAULT_CLIENT_ID] holds the preloaded products and the
//! default options.


use std::{collections::HashMap, sync::Arc};

use log::debug;

use crate::{
    constants::DEFAULT_CLIENT_ID,
    options::AmpPhaseOptions,
    products::{SpectrumBundle, VisBundle},
};

#[derive(Debug, Clone)]
struct OptionsRow {
    client_id: String,
    username: Option<String>,
    options: Vec<AmpPhaseOptions>,
}

#[derive(Debug, Default)]
pub struct ClientRegistry {
    spectra: HashMap<String, Arc<SpectrumBundle>>,
    vis: HashMap<String, Arc<VisBundle>>,
    options: Vec<OptionsRow>,
    usernames: HashMap<String, String>,
}

impl ClientRegistry {
    pub fn new() -> ClientRegistry {
        ClientRegistry::default()
    }

    pub fn set_spectrum(&mut self, client_id: &str, bundle: Arc<SpectrumBundle>) {
        self.spectra.insert(client_id.to_string(), bundle);
    }

    pub fn spectrum(&self, client_id: &str) -> Option<Arc<SpectrumBundle>> {
        self.spectra.get(client_id).cloned()
    }

    /// The client's spectrum, or the default one.
    pub fn spectrum_or_default(&self, client_id: &str) -> Option<Arc<SpectrumBundle>> {
        self.spectrum(client_id)
            .or_else(|| self.spectrum(DEFAULT_CLIENT_ID))
    }

    pub fn set_vis(&mut self, client_id: &str, bundle: Arc<VisBundle>) {
        self.vis.insert(client_id.to_string(), bundle);
    }

    pub fn vis(&self, client_id: &str) -> Option<Arc<VisBundle>> {
        self.vis.get(client_id).cloned()
    }

    pub fn vis_or_default(&self, client_id: &str) -> Option<Arc<VisBundle>> {
        self.vis(client_id).or_else(|| self.vis(DEFAULT_CLIENT_ID))
    }

    /// Associate a username with a client. Options rows of the client gain
    /// the username.
    pub fn set_username(&mut self, client_id: &str, username: &str) {
        debug!("Client {client_id} is {username}");
        self.usernames
            .insert(client_id.to_string(), username.to_string());
        for row in self.options.iter_mut().filter(|r| r.client_id == client_id) {
            row.username = Some(username.to_string());
        }
    }

    pub fn username(&self, client_id: &str) -> Option<&str> {
        self.usernames.get(client_id).map(|s| s.as_str())
    }

    /// Record the options a client used. A row for the same username (or,
    /// without a username, the same client) is replaced.
    pub fn set_options(
        &mut self,
        client_id: &str,
        username: Option<&str>,
        options: &[AmpPhaseOptions],
    ) {
        let username = username
            .filter(|u| !u.is_empty())
            .or_else(|| self.username(client_id))
            .map(|u| u.to_string());
        let existing = self.options.iter_mut().find(|r| match &username {
            Some(u) => r.username.as_deref() == Some(u.as_str()),
            None => r.client_id == client_id,
        });
        match existing {
            Some(row) => {
                row.client_id = client_id.to_string();
                row.options = options.to_vec();
            }
            None => self.options.push(OptionsRow {
                client_id: client_id.to_string(),
                username,
                options: options.to_vec(),
            }),
        }
    }

    /// The options of a user, else of a client, else the defaults.
    pub fn options_for(&self, client_id: &str, username: Option<&str>) -> Option<&[AmpPhaseOptions]> {
        let by_username = username
            .filter(|u| !u.is_empty())
            .and_then(|u| self.options.iter().find(|r| r.username.as_deref() == Some(u)));
        let by_id = || self.options.iter().find(|r| r.client_id == client_id);
        let default = || {
            self.options
                .iter()
                .find(|r| r.client_id == DEFAULT_CLIENT_ID)
        };
        by_username
            .or_else(by_id)
            .or_else(default)
            .map(|r| r.options.as_slice())
    }

    /// Forget a disconnected client. Options rows carrying a username are
    /// kept, so the user's settings survive reconnection.
    pub fn remove_client(&mut self, client_id: &str) {
        if client_id == DEFAULT_CLIENT_ID {
            return;
        }
        self.spectra.remove(client_id);
        self.vis.remove(client_id);
        self.usernames.remove(client_id);
        self.options
            .retain(|r| r.client_id != client_id || r.username.is_some());
    }
}
