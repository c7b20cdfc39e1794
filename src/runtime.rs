// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The loader runtime: `define`, `require` and synchronous instantiation
//!
//! A [`Runtime`] is a cheap-to-clone handle over shared state (registry,
//! fetch table, the injected fetcher and locator mapping, the anonymous
//! definition counter). There are no ambient singletons; independent
//! runtimes coexist. All resolution logic runs on the caller's thread;
//! suspension is implicit, via the fetcher's completion callbacks, and no
//! lock is held across a user or fetcher callback invocation.

use crate::api::{DefineArguments, DepList, Factory, RequireCallback, RequireOutcome};
use crate::error::{LoaderError, Result};
use crate::fetch::{DefinedCallback, FetchTable, ResourceFetcher, Subscription};
use crate::locator::{self, LocatorFn};
use crate::registry::{InstantiationStep, ModuleRegistry};
use crate::resolver;
use crate::value::Value;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Weak};
use tokio::sync::oneshot;

pub(crate) struct RuntimeState {
    registry: ModuleRegistry,
    fetches: FetchTable,
    fetcher: Arc<dyn ResourceFetcher>,
    locate: LocatorFn,
    anonymous_seq: AtomicU64,
}

/// A module-definition and dependency-resolution runtime
#[derive(Clone)]
pub struct Runtime {
    state: Arc<RuntimeState>,
}

impl Runtime {
    /// Create a runtime backed by `fetcher`, with the default
    /// identifier-to-locator mapping.
    pub fn new(fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self::with_locator(fetcher, locator::default_locator)
    }

    /// Create a runtime with a custom identifier-to-locator mapping
    pub fn with_locator(
        fetcher: Arc<dyn ResourceFetcher>,
        locate: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            state: Arc::new(RuntimeState {
                registry: ModuleRegistry::new(),
                fetches: FetchTable::new(),
                fetcher,
                locate: Arc::new(locate),
                anonymous_seq: AtomicU64::new(0),
            }),
        }
    }

    /// Register a module declaration without executing it.
    ///
    /// Accepts the AMD positional shapes via [`DefineArguments`]
    /// conversions: a bare factory, `(deps, factory)`, `(id, factory)` or
    /// `(id, deps, factory)`; a plain object [`Value`] can stand in for the
    /// factory. A duplicate definition of an identifier that already has an
    /// authoritative record is silently ignored.
    pub fn define<A: Into<DefineArguments>>(&self, arguments: A) {
        let (id, deps, factory) = arguments.into().normalize(&self.state.anonymous_seq);
        self.state.registry.register(id, deps, factory);
    }

    /// Ensure `deps` (and everything they transitively depend on) are
    /// defined, then deliver their exports to `callback` in request order.
    ///
    /// The single-identifier, no-callback form is the synchronous shortcut:
    /// it returns [`RequireOutcome::Immediate`] with the export value and
    /// performs no fetch orchestration. Every other shape returns
    /// [`RequireOutcome::Pending`]; a multi-identifier call without a
    /// callback still drives loading and instantiation (prefetch).
    pub fn require<D: Into<DepList>>(
        &self,
        deps: D,
        callback: Option<RequireCallback>,
    ) -> Result<RequireOutcome> {
        let deps = deps.into().into_vec();
        if callback.is_none() && deps.len() == 1 {
            return Ok(RequireOutcome::Immediate(self.require_sync(&deps[0])?));
        }
        resolver::request(self, deps, callback);
        Ok(RequireOutcome::Pending)
    }

    /// `require` with an unboxed completion callback
    pub fn require_with<D, F>(&self, deps: D, callback: F)
    where
        D: Into<DepList>,
        F: FnOnce(Result<Vec<Value>>) + Send + 'static,
    {
        let _ = self.require(deps, Some(Box::new(callback)));
    }

    /// `require` bridged to a future; resolves when the completion callback
    /// would have fired.
    pub async fn require_async<D: Into<DepList>>(&self, deps: D) -> Result<Vec<Value>> {
        let (tx, rx) = oneshot::channel();
        self.require_with(deps, move |result| {
            let _ = tx.send(result);
        });
        rx.await.map_err(|_| LoaderError::Interrupted)?
    }

    /// Synchronously compute (or retrieve the memoized) export of an
    /// already-defined module.
    ///
    /// Never suspends and never fetches: the identifier must already be
    /// defined, directly or through an alias, or this fails with
    /// [`LoaderError::UnknownModule`]. The factory runs at most once; every
    /// later call short-circuits to the memoized export.
    pub fn require_sync(&self, id: &str) -> Result<Value> {
        match self.state.registry.begin_instantiation(id)? {
            InstantiationStep::Memoized(value) => Ok(value),
            InstantiationStep::Fresh {
                id,
                deps,
                factory,
                container,
            } => {
                let mut wrapper: Option<Value> = None;
                let mut arguments = Vec::with_capacity(deps.len());
                for dep in &deps {
                    let value = match dep.as_str() {
                        "require" => Value::Require(RequireFn::new(self)),
                        "exports" => container.clone(),
                        "module" => wrapper
                            .get_or_insert_with(|| module_wrapper(&id, &container))
                            .clone(),
                        other => self.require_sync(other)?,
                    };
                    arguments.push(value);
                }

                let exports = match factory {
                    Factory::Data(value) => value,
                    Factory::Invalid => container.clone(),
                    Factory::Callable(function) => {
                        let returned = function(&arguments);
                        if !returned.is_undefined() && !returned.same(&container) {
                            returned
                        } else {
                            // honor a `module.exports = …` reassignment
                            match wrapper.as_ref().and_then(|w| w.get("exports")) {
                                Some(slot) if !slot.same(&container) => slot,
                                _ => container.clone(),
                            }
                        }
                    }
                };
                self.state.registry.finish_instantiation(&id, exports.clone());
                Ok(exports)
            }
        }
    }

    /// Declared dependencies of the record `id` resolves to
    pub(crate) fn dependencies_of(&self, id: &str) -> Vec<String> {
        self.state.registry.dependencies_of(id)
    }

    /// Ensure the resource backing `id` has been fetched, invoking
    /// `on_defined` (immediately if already Ready, otherwise once the fetch
    /// completes) with the identifier.
    pub(crate) fn ensure_defined(&self, id: &str, on_defined: DefinedCallback) {
        let locator = (self.state.locate)(id);
        match self
            .state
            .fetches
            .subscribe(&locator, id.to_string(), on_defined)
        {
            Subscription::AlreadyReady(id, callback) => callback(&id),
            Subscription::Queued => {}
            Subscription::StartFetch => {
                tracing::trace!(id = %id, locator = %locator, "fetching resource");
                let runtime = self.clone();
                let key = locator.clone();
                self.state
                    .fetcher
                    .fetch(&locator, Box::new(move || runtime.resource_ready(&key)));
            }
        }
    }

    /// Completion path for a fetched locator: mark it Ready, bind the
    /// locator-derived identifier to whatever the resource defined, then
    /// drain the queued continuations in FIFO order.
    fn resource_ready(&self, locator: &str) {
        let Some(queued) = self.state.fetches.complete(locator) else {
            tracing::trace!(locator = %locator, "resource signaled ready more than once");
            return;
        };
        tracing::trace!(locator = %locator, "resource ready");

        let derived = locator::derived_id(locator);
        if let Some(defined) = self.state.registry.claim_definition() {
            self.state.registry.create_alias(derived, &defined);
        }

        for (id, callback) in queued {
            callback(&id);
        }
    }
}

fn module_wrapper(id: &str, container: &Value) -> Value {
    let wrapper = Value::object();
    wrapper.set("id", Value::from(id));
    wrapper.set("exports", container.clone());
    wrapper
}

/// The callable `require` value handed to factories that declare the
/// `require` reserved token. Holds a weak handle, so exports that retain it
/// do not keep a dropped runtime alive.
#[derive(Clone)]
pub struct RequireFn {
    state: Weak<RuntimeState>,
}

impl RequireFn {
    pub(crate) fn new(runtime: &Runtime) -> Self {
        Self {
            state: Arc::downgrade(&runtime.state),
        }
    }

    fn runtime(&self) -> Result<Runtime> {
        self.state
            .upgrade()
            .map(|state| Runtime { state })
            .ok_or(LoaderError::RuntimeGone)
    }

    /// Synchronous retrieval, as `require.sync(id)`
    pub fn sync(&self, id: &str) -> Result<Value> {
        self.runtime()?.require_sync(id)
    }

    /// The full `require(deps, callback?)` form
    pub fn call<D: Into<DepList>>(
        &self,
        deps: D,
        callback: Option<RequireCallback>,
    ) -> Result<RequireOutcome> {
        self.runtime()?.require(deps, callback)
    }

    pub(crate) fn same(&self, other: &RequireFn) -> bool {
        Weak::ptr_eq(&self.state, &other.state)
    }
}
