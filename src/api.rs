// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Public API surface: argument shapes for `define` and `require`
//!
//! AMD's `define` takes one to three positional arguments with the
//! identifier and dependency list omittable; `require` takes a single
//! identifier or a list, with an optional completion callback. This module
//! models those loose call shapes as enums normalized once at the entry
//! point.

use crate::error::Result;
use crate::value::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Dependency tokens that are never fetched; they resolve to synthetic
/// values at instantiation time.
pub const RESERVED_TOKENS: [&str; 3] = ["require", "exports", "module"];

/// Whether an identifier is one of the reserved dependency tokens
pub fn is_reserved(id: &str) -> bool {
    RESERVED_TOKENS.contains(&id)
}

/// Drop reserved tokens from a dependency list before load orchestration
pub(crate) fn filter_reserved(deps: &[String]) -> Vec<String> {
    deps.iter()
        .filter(|dep| !is_reserved(dep.as_str()))
        .cloned()
        .collect()
}

/// A boxed module factory function, invoked at most once with the resolved
/// dependency values in declared order.
pub type FactoryFn = Box<dyn FnOnce(&[Value]) -> Value + Send>;

/// The factory slot of a module record, classified once at define time.
pub enum Factory {
    /// A callable factory; its return value (or the populated `exports`
    /// container) becomes the module's export.
    Callable(FactoryFn),
    /// A plain object used directly as the export value.
    Data(Value),
    /// Neither callable nor a plain object. Not an error: instantiation
    /// leaves the empty export container in place.
    Invalid,
}

impl Factory {
    /// Wrap a closure as a callable factory
    pub fn callable<F>(function: F) -> Self
    where
        F: FnOnce(&[Value]) -> Value + Send + 'static,
    {
        Factory::Callable(Box::new(function))
    }

    /// Classify a data value: objects become `Data`, anything else `Invalid`
    pub fn from_value(value: Value) -> Self {
        if value.is_object() {
            Factory::Data(value)
        } else {
            Factory::Invalid
        }
    }
}

impl From<Value> for Factory {
    fn from(value: Value) -> Self {
        Factory::from_value(value)
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Factory::Callable(_) => f.write_str("Callable"),
            Factory::Data(value) => f.debug_tuple("Data").field(value).finish(),
            Factory::Invalid => f.write_str("Invalid"),
        }
    }
}

/// The positional shapes a `define` call can take
pub enum DefineArguments {
    /// `define(factory)`
    Anonymous(Factory),
    /// `define(deps, factory)`
    AnonymousWithDeps(Vec<String>, Factory),
    /// `define(id, factory)`
    Named(String, Factory),
    /// `define(id, deps, factory)`
    NamedWithDeps(String, Vec<String>, Factory),
}

impl DefineArguments {
    /// Normalize to `(id, deps, factory)`, synthesizing an identifier from
    /// the runtime's anonymous counter when none was given.
    pub(crate) fn normalize(self, anonymous_seq: &AtomicU64) -> (String, Option<Vec<String>>, Factory) {
        match self {
            DefineArguments::Anonymous(factory) => (next_anonymous_id(anonymous_seq), None, factory),
            DefineArguments::AnonymousWithDeps(deps, factory) => {
                (next_anonymous_id(anonymous_seq), Some(deps), factory)
            }
            DefineArguments::Named(id, factory) => (id, None, factory),
            DefineArguments::NamedWithDeps(id, deps, factory) => (id, Some(deps), factory),
        }
    }
}

fn next_anonymous_id(seq: &AtomicU64) -> String {
    format!("_anonymous_mod_{}", seq.fetch_add(1, Ordering::SeqCst))
}

fn owned(deps: &[&str]) -> Vec<String> {
    deps.iter().map(|dep| dep.to_string()).collect()
}

impl From<Factory> for DefineArguments {
    fn from(factory: Factory) -> Self {
        DefineArguments::Anonymous(factory)
    }
}

impl From<Value> for DefineArguments {
    fn from(value: Value) -> Self {
        DefineArguments::Anonymous(Factory::from_value(value))
    }
}

impl From<(&str, Factory)> for DefineArguments {
    fn from((id, factory): (&str, Factory)) -> Self {
        DefineArguments::Named(id.to_string(), factory)
    }
}

impl From<(&str, Value)> for DefineArguments {
    fn from((id, value): (&str, Value)) -> Self {
        DefineArguments::Named(id.to_string(), Factory::from_value(value))
    }
}

impl<const N: usize> From<([&str; N], Factory)> for DefineArguments {
    fn from((deps, factory): ([&str; N], Factory)) -> Self {
        DefineArguments::AnonymousWithDeps(owned(&deps), factory)
    }
}

impl<const N: usize> From<(&str, [&str; N], Factory)> for DefineArguments {
    fn from((id, deps, factory): (&str, [&str; N], Factory)) -> Self {
        DefineArguments::NamedWithDeps(id.to_string(), owned(&deps), factory)
    }
}

impl<const N: usize> From<(&str, [&str; N], Value)> for DefineArguments {
    fn from((id, deps, value): (&str, [&str; N], Value)) -> Self {
        DefineArguments::NamedWithDeps(id.to_string(), owned(&deps), Factory::from_value(value))
    }
}

/// A normalized dependency list; a single identifier becomes a one-element
/// list.
pub struct DepList(Vec<String>);

impl DepList {
    pub(crate) fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<&str> for DepList {
    fn from(id: &str) -> Self {
        DepList(vec![id.to_string()])
    }
}

impl From<String> for DepList {
    fn from(id: String) -> Self {
        DepList(vec![id])
    }
}

impl From<Vec<String>> for DepList {
    fn from(deps: Vec<String>) -> Self {
        DepList(deps)
    }
}

impl From<Vec<&str>> for DepList {
    fn from(deps: Vec<&str>) -> Self {
        DepList(owned(&deps))
    }
}

impl From<&[&str]> for DepList {
    fn from(deps: &[&str]) -> Self {
        DepList(owned(deps))
    }
}

impl<const N: usize> From<[&str; N]> for DepList {
    fn from(deps: [&str; N]) -> Self {
        DepList(owned(&deps))
    }
}

/// Completion callback for an asynchronous `require`; receives the export
/// values of the requested identifiers in original request order.
pub type RequireCallback = Box<dyn FnOnce(Result<Vec<Value>>) + Send>;

/// What a `require` call did
#[derive(Debug)]
pub enum RequireOutcome {
    /// Single-identifier, no-callback form: the export value, synchronously
    Immediate(Value),
    /// Load orchestration is (or was) in flight; results go to the callback
    Pending,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_ids_are_sequential() {
        let seq = AtomicU64::new(0);
        let (first, deps, _) = DefineArguments::Anonymous(Factory::Invalid).normalize(&seq);
        let (second, _, _) =
            DefineArguments::AnonymousWithDeps(vec!["a".to_string()], Factory::Invalid)
                .normalize(&seq);
        assert_eq!(first, "_anonymous_mod_0");
        assert_eq!(second, "_anonymous_mod_1");
        assert!(deps.is_none());
    }

    #[test]
    fn test_named_normalization_keeps_id_and_deps() {
        let seq = AtomicU64::new(0);
        let args = DefineArguments::from(("mod", ["a", "b"], Factory::Invalid));
        let (id, deps, _) = args.normalize(&seq);
        assert_eq!(id, "mod");
        assert_eq!(deps.as_deref(), Some(&["a".to_string(), "b".to_string()][..]));
        assert_eq!(seq.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_factory_classification() {
        assert!(matches!(Factory::from_value(Value::object()), Factory::Data(_)));
        assert!(matches!(Factory::from_value(Value::from(3.0)), Factory::Invalid));
        assert!(matches!(Factory::from_value(Value::array(vec![])), Factory::Invalid));
    }

    #[test]
    fn test_filter_reserved() {
        let deps: Vec<String> = ["require", "a", "exports", "module", "b"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(filter_reserved(&deps), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_dep_list_from_single_identifier() {
        assert_eq!(DepList::from("a").into_vec(), vec!["a".to_string()]);
    }
}
