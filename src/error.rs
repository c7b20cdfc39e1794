// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the module loader

use thiserror::Error;

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Errors that can occur in the loader runtime
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Synchronous instantiation was requested for an identifier that has
    /// never been defined.
    #[error("required unknown module, id: \"{0}\"")]
    UnknownModule(String),

    /// A `require_async` completion channel closed before the exports were
    /// delivered.
    #[error("require completion channel closed before delivery")]
    Interrupted,

    /// A `require` handle outlived the runtime it was created from.
    #[error("module runtime has been dropped")]
    RuntimeGone,
}

impl LoaderError {
    /// Create an unknown-module error
    pub fn unknown_module(id: impl Into<String>) -> Self {
        Self::UnknownModule(id.into())
    }
}
