// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Options-keyed caches of computed bundles.
//!
//! Each entry keeps its own copy of the options list it was computed under.
//! A lookup only succeeds when every options set in the request matches its
//! counterpart in the entry. Payloads are reference counted, so a bundle
//! handed to a client stays valid regardless of what happens to the cache.


use std::sync::Arc;

use log::trace;

use crate::{
    misc::mjds_within,
    options::{options_lists_match, AmpPhaseOptions},
    products::{SpectrumBundle, VisBundle},
};

#[derive(Debug)]
pub struct CacheEntry<T> {
    pub options: Vec<AmpPhaseOptions>,
    pub payload: Arc<T>,
}

// A derived Clone would require T: Clone.
impl<T> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        CacheEntry {
            options: self.options.clone(),
            payload: Arc::clone(&self.payload),
        }
    }
}

#[derive(Debug)]
pub struct Cache<T> {
    entries: Vec<CacheEntry<T>>,
}

impl<T> Default for Cache<T> {
    fn default() -> Self {
        Cache { entries: vec![] }
    }
}

impl<T> Clone for Cache<T> {
    fn clone(&self) -> Self {
        Cache {
            entries: self.entries.clone(),
        }
    }
}

impl<T> Cache<T> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CacheEntry<T>] {
        &self.entries
    }

    /// Is this exact payload held by the cache?
    pub fn contains(&self, payload: &Arc<T>) -> bool {
        self.entries.iter().any(|e| Arc::ptr_eq(&e.payload, payload))
    }

    fn find(
        &self,
        options: &[AmpPhaseOptions],
        accept: impl Fn(&T) -> bool,
    ) -> Option<&CacheEntry<T>> {
        self.entries
            .iter()
            .find(|e| options_lists_match(&e.options, options) && accept(&e.payload))
    }

    /// Store a payload unless an equivalent entry exists. The stored payload
    /// is returned either way.
    fn insert_with(
        &mut self,
        options: &[AmpPhaseOptions],
        payload: Arc<T>,
        accept: impl Fn(&T) -> bool,
    ) -> Arc<T> {
        if let Some(existing) = self.find(options, accept) {
            trace!("Cache already holds an equivalent entry");
            return Arc::clone(&existing.payload);
        }
        self.entries.push(CacheEntry {
            options: options.to_vec(),
            payload: Arc::clone(&payload),
        });
        payload
    }
}

pub type SpectrumCache = Cache<SpectrumBundle>;
pub type VisCache = Cache<VisBundle>;

fn spectrum_near(bundle: &SpectrumBundle, mjd: f64) -> bool {
    mjds_within(bundle.mjd, mjd, bundle.header.half_cycle_s())
}

impl Cache<SpectrumBundle> {
    /// Find a spectrum computed under `options` within half a cycle of `mjd`.
    pub fn lookup(&self, mjd: f64, options: &[AmpPhaseOptions]) -> Option<Arc<SpectrumBundle>> {
        self.find(options, |b| spectrum_near(b, mjd))
            .map(|e| Arc::clone(&e.payload))
    }

    pub fn insert(
        &mut self,
        options: &[AmpPhaseOptions],
        payload: Arc<SpectrumBundle>,
    ) -> Arc<SpectrumBundle> {
        let mjd = payload.mjd;
        self.insert_with(options, payload, |b| spectrum_near(b, mjd))
    }
}

impl Cache<VisBundle> {
    /// Find vis quantities computed under `options`.
    pub fn lookup(&self, options: &[AmpPhaseOptions]) -> Option<Arc<VisBundle>> {
        self.find(options, |_| true).map(|e| Arc::clone(&e.payload))
    }

    pub fn insert(&mut self, options: &[AmpPhaseOptions], payload: Arc<VisBundle>) -> Arc<VisBundle> {
        self.insert_with(options, payload, |_| true)
    }
}

/// Both caches. Cloning is cheap; payloads are shared.
#[derive(Debug, Clone, Default)]
pub struct Caches {
    pub spectrum: SpectrumCache,
    pub vis: VisCache,
}
