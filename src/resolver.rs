// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The asynchronous dependency resolver
//!
//! `require` becomes a countdown barrier: the counter starts at the number
//! of direct non-reserved dependencies and is adjusted as each one turns out
//! to carry dependencies of its own (+n for the newly discovered ones, -1
//! for the dependency's own slot). The barrier therefore falls to zero
//! exactly when every transitively reachable non-reserved identifier has a
//! defined record, regardless of the order resources arrive in. Completion
//! then instantiates the *originally requested* identifiers, in request
//! order, and fires the callback once.
//!
//! A per-request visited set keeps identifiers from being walked twice, so
//! diamond graphs are counted correctly and cyclic `define` graphs
//! terminate instead of re-walking forever.

use crate::api::{RequireCallback, filter_reserved};
use crate::runtime::Runtime;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Join state for one `require` call
pub(crate) struct Barrier {
    /// Identifiers as originally requested, reserved tokens included;
    /// completion instantiates exactly these, in this order.
    requested: Vec<String>,
    /// Non-reserved definitions still outstanding across the whole closure
    remaining: Mutex<i64>,
    /// Identifiers already scheduled for this request
    visited: Mutex<HashSet<String>>,
    callback: Mutex<Option<RequireCallback>>,
    done: AtomicBool,
}

/// Drive a `require` call: ensure every requested identifier (and,
/// transitively, everything they depend on) is defined, then deliver the
/// exports.
pub(crate) fn request(runtime: &Runtime, deps: Vec<String>, callback: Option<RequireCallback>) {
    let load_deps = filter_reserved(&deps);
    let barrier = Arc::new(Barrier {
        requested: deps,
        remaining: Mutex::new(load_deps.len() as i64),
        visited: Mutex::new(load_deps.iter().cloned().collect()),
        callback: Mutex::new(callback),
        done: AtomicBool::new(false),
    });

    if load_deps.is_empty() {
        complete(runtime, &barrier);
        return;
    }
    for dep in load_deps {
        subscribe(runtime, &barrier, dep);
    }
}

fn subscribe(runtime: &Runtime, barrier: &Arc<Barrier>, id: String) {
    let rt = runtime.clone();
    let barrier = Arc::clone(barrier);
    runtime.ensure_defined(
        &id,
        Box::new(move |name: &str| dependency_ready(&rt, &barrier, name)),
    );
}

/// One direct or transitive dependency now has a defined record
fn dependency_ready(runtime: &Runtime, barrier: &Arc<Barrier>, id: &str) {
    let declared = runtime.dependencies_of(id);
    let mut fresh = Vec::new();
    {
        let mut visited = barrier.visited.lock();
        for dep in filter_reserved(&declared) {
            if visited.insert(dep.clone()) {
                fresh.push(dep);
            }
        }
    }

    if fresh.is_empty() {
        let remaining = {
            let mut remaining = barrier.remaining.lock();
            *remaining -= 1;
            *remaining
        };
        if remaining <= 0 {
            complete(runtime, barrier);
        }
    } else {
        // this dependency's slot is replaced by its children's slots
        *barrier.remaining.lock() += fresh.len() as i64 - 1;
        for dep in fresh {
            subscribe(runtime, barrier, dep);
        }
    }
}

fn complete(runtime: &Runtime, barrier: &Arc<Barrier>) {
    if barrier.done.swap(true, Ordering::SeqCst) {
        return;
    }

    let mut exports = Vec::with_capacity(barrier.requested.len());
    let mut failure = None;
    for id in &barrier.requested {
        match runtime.require_sync(id) {
            Ok(value) => exports.push(value),
            Err(err) => {
                failure = Some(err);
                break;
            }
        }
    }

    let callback = barrier.callback.lock().take();
    match (failure, callback) {
        (None, Some(callback)) => callback(Ok(exports)),
        (Some(err), Some(callback)) => callback(Err(err)),
        (Some(err), None) => {
            tracing::warn!(error = %err, "require completed with an error and no callback")
        }
        (None, None) => {}
    }
}
