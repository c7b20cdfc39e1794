// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module registry: records, alias indirection and export memoization
//!
//! All writes are monotonic inserts (plus idempotent export memoization), so
//! re-entrant traversal during instantiation never observes an in-place edit
//! of an authoritative record.

use crate::api::Factory;
use crate::error::{LoaderError, Result};
use crate::value::Value;
use parking_lot::Mutex;
use std::collections::HashMap;

struct ModuleRecord {
    deps: Option<Vec<String>>,
    factory: Factory,
    exports: Option<Value>,
}

enum RegistryEntry {
    Module(ModuleRecord),
    /// Redirect to the identifier actually used at definition time.
    /// Dereferenced one hop, never chained.
    Alias(String),
}

/// The first step of instantiating an identifier
pub(crate) enum InstantiationStep {
    /// Permanent export already computed
    Memoized(Value),
    /// Fresh instantiation: the export container has been memoized under
    /// `id` and the factory taken out of the record, so a re-entrant call
    /// short-circuits to `Memoized` with the (still empty) container.
    Fresh {
        id: String,
        deps: Vec<String>,
        factory: Factory,
        container: Value,
    },
}

pub(crate) struct ModuleRegistry {
    entries: Mutex<HashMap<String, RegistryEntry>>,
    /// Identifiers registered but not yet claimed by a completed fetch, in
    /// definition order. A completed fetch claims the most recent one to
    /// bind its locator-derived identifier to the defined identifier.
    definition_log: Mutex<Vec<String>>,
}

impl ModuleRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            definition_log: Mutex::new(Vec::new()),
        }
    }

    /// Insert a record unless `id` already has an authoritative one.
    /// Returns whether the record was inserted.
    pub(crate) fn register(
        &self,
        id: String,
        deps: Option<Vec<String>>,
        factory: Factory,
    ) -> bool {
        {
            let mut entries = self.entries.lock();
            if matches!(entries.get(&id), Some(RegistryEntry::Module(_))) {
                drop(entries);
                tracing::debug!(id = %id, "duplicate define ignored");
                return false;
            }
            entries.insert(
                id.clone(),
                RegistryEntry::Module(ModuleRecord {
                    deps,
                    factory,
                    exports: None,
                }),
            );
        }
        tracing::debug!(id = %id, "module registered");
        self.definition_log.lock().push(id);
        true
    }

    /// Record a redirect from a locator-derived identifier to the identifier
    /// used at definition time. No-op when the two coincide, when the target
    /// has no authoritative record, or when the derived identifier already
    /// has one of its own.
    pub(crate) fn create_alias(&self, derived: &str, target: &str) {
        if derived == target {
            return;
        }
        let mut entries = self.entries.lock();
        if !matches!(entries.get(target), Some(RegistryEntry::Module(_))) {
            return;
        }
        if matches!(entries.get(derived), Some(RegistryEntry::Module(_))) {
            return;
        }
        entries.insert(derived.to_string(), RegistryEntry::Alias(target.to_string()));
        tracing::debug!(derived = %derived, target = %target, "alias recorded");
    }

    /// Declared dependencies of the record `id` resolves to; empty when the
    /// identifier is unknown (the dependency walk treats that as a leaf).
    pub(crate) fn dependencies_of(&self, id: &str) -> Vec<String> {
        let entries = self.entries.lock();
        let canonical = match entries.get(id) {
            Some(RegistryEntry::Alias(target)) => target.as_str(),
            Some(RegistryEntry::Module(_)) => id,
            None => {
                tracing::warn!(id = %id, "no record for module");
                return Vec::new();
            }
        };
        match entries.get(canonical) {
            Some(RegistryEntry::Module(record)) => record.deps.clone().unwrap_or_default(),
            _ => {
                tracing::warn!(id = %id, "alias points at missing module");
                Vec::new()
            }
        }
    }

    /// Claim the most recently defined, not-yet-claimed identifier
    pub(crate) fn claim_definition(&self) -> Option<String> {
        self.definition_log.lock().pop()
    }

    /// Resolve `id` (one alias hop) and either return the memoized export
    /// or open a fresh instantiation with the container memoized up front.
    pub(crate) fn begin_instantiation(&self, id: &str) -> Result<InstantiationStep> {
        let mut entries = self.entries.lock();
        let canonical = match entries.get(id) {
            None => return Err(LoaderError::unknown_module(id)),
            Some(RegistryEntry::Module(_)) => id.to_string(),
            Some(RegistryEntry::Alias(target)) => target.clone(),
        };
        let record = match entries.get_mut(&canonical) {
            Some(RegistryEntry::Module(record)) => record,
            _ => return Err(LoaderError::unknown_module(id)),
        };
        if let Some(exports) = &record.exports {
            return Ok(InstantiationStep::Memoized(exports.clone()));
        }
        let container = Value::object();
        record.exports = Some(container.clone());
        let deps = record.deps.clone().unwrap_or_default();
        let factory = std::mem::replace(&mut record.factory, Factory::Invalid);
        Ok(InstantiationStep::Fresh {
            id: canonical,
            deps,
            factory,
            container,
        })
    }

    /// Store the permanent export computed for `id`
    pub(crate) fn finish_instantiation(&self, id: &str, exports: Value) {
        let mut entries = self.entries.lock();
        if let Some(RegistryEntry::Module(record)) = entries.get_mut(id) {
            record.exports = Some(exports);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_register_is_ignored() {
        let registry = ModuleRegistry::new();
        assert!(registry.register("m".into(), None, Factory::Invalid));
        assert!(!registry.register("m".into(), Some(vec!["x".into()]), Factory::Invalid));
        assert!(registry.dependencies_of("m").is_empty());
    }

    #[test]
    fn test_definition_log_claims_latest_first() {
        let registry = ModuleRegistry::new();
        registry.register("first".into(), None, Factory::Invalid);
        registry.register("second".into(), None, Factory::Invalid);
        assert_eq!(registry.claim_definition().as_deref(), Some("second"));
        assert_eq!(registry.claim_definition().as_deref(), Some("first"));
        assert_eq!(registry.claim_definition(), None);
    }

    #[test]
    fn test_alias_resolves_one_hop() {
        let registry = ModuleRegistry::new();
        registry.register("real".into(), Some(vec!["dep".into()]), Factory::Invalid);
        registry.create_alias("path/real", "real");
        assert_eq!(registry.dependencies_of("path/real"), vec!["dep".to_string()]);
    }

    #[test]
    fn test_alias_never_shadows_authoritative_record() {
        let registry = ModuleRegistry::new();
        registry.register("a".into(), None, Factory::Invalid);
        registry.register("b".into(), Some(vec!["x".into()]), Factory::Invalid);
        registry.create_alias("b", "a");
        assert_eq!(registry.dependencies_of("b"), vec!["x".to_string()]);
    }

    #[test]
    fn test_register_replaces_alias_record() {
        let registry = ModuleRegistry::new();
        registry.register("real".into(), Some(vec!["dep".into()]), Factory::Invalid);
        registry.create_alias("lib/other", "real");
        assert_eq!(registry.dependencies_of("lib/other"), vec!["dep".to_string()]);
        // a later define under the aliased identifier is authoritative
        assert!(registry.register(
            "lib/other".into(),
            Some(vec!["own".into()]),
            Factory::Invalid
        ));
        assert_eq!(registry.dependencies_of("lib/other"), vec!["own".to_string()]);
    }

    #[test]
    fn test_begin_instantiation_memoizes_container_up_front() {
        let registry = ModuleRegistry::new();
        registry.register("m".into(), None, Factory::Invalid);
        let container = match registry.begin_instantiation("m").unwrap() {
            InstantiationStep::Fresh { container, .. } => container,
            InstantiationStep::Memoized(_) => panic!("expected fresh instantiation"),
        };
        // a re-entrant call sees the container, not a second Fresh step
        match registry.begin_instantiation("m").unwrap() {
            InstantiationStep::Memoized(value) => assert!(value.same(&container)),
            InstantiationStep::Fresh { .. } => panic!("container was not memoized"),
        }
    }

    #[test]
    fn test_begin_instantiation_unknown_module() {
        let registry = ModuleRegistry::new();
        assert!(matches!(
            registry.begin_instantiation("ghost"),
            Err(LoaderError::UnknownModule(id)) if id == "ghost"
        ));
    }
}
