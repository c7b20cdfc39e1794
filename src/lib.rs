// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # lodestar
//!
//! An AMD-style module-definition and dependency-resolution runtime: the
//! client-side analogue of a dynamic linker. `define` registers a unit of
//! code with declared dependencies without executing it; `require` resolves
//! the dependency graph, fetching and executing each unit exactly once, and
//! hands back the computed export values.
//!
//! The physical fetch mechanism is injected as a [`ResourceFetcher`]; the
//! runtime deduplicates overlapping fetches per resource locator, drives a
//! countdown barrier across the transitive dependency closure, and
//! instantiates modules synchronously with permanent export memoization.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use lodestar::{Factory, ReadyCallback, Runtime, Value};
//!
//! // A fetcher that reports every resource ready immediately; the modules
//! // in this example are defined up front.
//! let runtime = Runtime::new(Arc::new(|_locator: &str, ready: ReadyCallback| ready()));
//!
//! runtime.define(("answer", Factory::callable(|_args: &[Value]| Value::from(42.0))));
//! assert_eq!(runtime.require_sync("answer").unwrap(), Value::from(42.0));
//! ```
//!
//! Asynchronous loading goes through `require` with a completion callback
//! (or [`Runtime::require_async`] for a future), with results delivered in
//! request order once the whole closure is defined:
//!
//! ```ignore
//! runtime.require_with(["app", "config"], |exports| {
//!     let [app, config] = &exports.unwrap()[..] else { unreachable!() };
//!     // …
//! });
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod error;
pub mod fetch;
pub mod locator;
mod registry;
mod resolver;
pub mod runtime;
pub mod value;

// Re-exports
pub use api::{
    DefineArguments, DepList, Factory, FactoryFn, RequireCallback, RequireOutcome,
    RESERVED_TOKENS, is_reserved,
};
pub use error::{LoaderError, Result};
pub use fetch::{ReadyCallback, ResourceFetcher};
pub use locator::LocatorFn;
pub use runtime::{RequireFn, Runtime};
pub use value::Value;

/// Version of the lodestar runtime
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// AMD API draft revision this loader tracks. Informational only.
pub const AMD_API_VERSION: &str = "0.9";
