// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Resource fetching and fetch deduplication
//!
//! The physical mechanism that turns a locator into a "ready" notification
//! lives behind [`ResourceFetcher`]; the runtime only sees a completion
//! callback. The [`FetchTable`] in front of it guarantees that at most one
//! physical fetch is ever issued per distinct locator: requests that arrive
//! while a fetch is in flight are queued and drained in FIFO order when the
//! resource becomes ready.

use parking_lot::Mutex;
use std::collections::HashMap;

/// Completion notification for a fetched resource, invoked exactly once
pub type ReadyCallback = Box<dyn FnOnce() + Send>;

/// The external capability that makes a resource available.
///
/// Implementations fetch the resource behind `locator` (evaluating it, which
/// is what triggers `define` calls against the runtime) and then invoke
/// `on_ready` exactly once. Deduplication is not the fetcher's concern; the
/// runtime never issues two fetches for the same locator.
pub trait ResourceFetcher: Send + Sync {
    /// Fetch `locator` and signal `on_ready` when it is available
    fn fetch(&self, locator: &str, on_ready: ReadyCallback);
}

impl<F> ResourceFetcher for F
where
    F: Fn(&str, ReadyCallback) + Send + Sync,
{
    fn fetch(&self, locator: &str, on_ready: ReadyCallback) {
        self(locator, on_ready)
    }
}

/// Internal continuation: invoked with the module identifier once the
/// resource backing it has been fetched and its definitions registered.
pub(crate) type DefinedCallback = Box<dyn FnOnce(&str) + Send>;

/// Lifecycle of one locator. Absence from the table is the NotRequested
/// state; the machine is monotonic and terminal at Ready.
enum ResourceState {
    InFlight(Vec<(String, DefinedCallback)>),
    Ready,
}

/// What a subscription found
pub(crate) enum Subscription {
    /// Resource already Ready; the callback is handed back for immediate
    /// (possibly re-entrant) invocation by the caller.
    AlreadyReady(String, DefinedCallback),
    /// A fetch is in flight; the callback was queued behind it.
    Queued,
    /// First request for this locator; the callback was queued and the
    /// caller must issue the one physical fetch.
    StartFetch,
}

/// Per-locator fetch state, keyed by resource locator
pub(crate) struct FetchTable {
    resources: Mutex<HashMap<String, ResourceState>>,
}

impl FetchTable {
    pub(crate) fn new() -> Self {
        Self {
            resources: Mutex::new(HashMap::new()),
        }
    }

    /// Register interest in `locator` on behalf of module `id`
    pub(crate) fn subscribe(
        &self,
        locator: &str,
        id: String,
        on_defined: DefinedCallback,
    ) -> Subscription {
        let mut resources = self.resources.lock();
        match resources.get_mut(locator) {
            Some(ResourceState::Ready) => Subscription::AlreadyReady(id, on_defined),
            Some(ResourceState::InFlight(queue)) => {
                queue.push((id, on_defined));
                Subscription::Queued
            }
            None => {
                resources.insert(
                    locator.to_string(),
                    ResourceState::InFlight(vec![(id, on_defined)]),
                );
                Subscription::StartFetch
            }
        }
    }

    /// Transition `locator` to Ready and hand back its queued callbacks.
    ///
    /// The transition happens before the caller drains anything, so a
    /// callback that re-requests the same locator observes Ready and cannot
    /// re-trigger a fetch. Returns `None` when the locator was already Ready
    /// (a second completion signal) or never requested.
    pub(crate) fn complete(&self, locator: &str) -> Option<Vec<(String, DefinedCallback)>> {
        let mut resources = self.resources.lock();
        let state = resources.get_mut(locator)?;
        match std::mem::replace(state, ResourceState::Ready) {
            ResourceState::InFlight(queue) => Some(queue),
            ResourceState::Ready => None,
        }
    }
}
