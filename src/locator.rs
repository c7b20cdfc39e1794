// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Identifier-to-locator mapping
//!
//! A module identifier names a unit of code; a resource locator addresses
//! the physical content backing it. The default mapping normalizes the
//! identifier as a path and appends `.js` when it does not already denote a
//! resource. Embedders with their own addressing scheme inject a
//! replacement via [`crate::runtime::Runtime::with_locator`].

use std::sync::Arc;

/// An injective mapping from module identifier to resource locator
pub type LocatorFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Normalize a path: drop `.` segments, let `..` pop when there is depth to
/// pop from, collapse empty segments except a leading one. Locators that
/// carry a scheme (`://`) pass through untouched.
pub fn realpath(path: &str) -> String {
    if path.contains("://") {
        return path.to_string();
    }
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        if segment == "." {
            continue;
        }
        if segment == ".." {
            if out.len() >= 2 {
                out.pop();
            }
        } else if out.is_empty() || !segment.is_empty() {
            out.push(segment);
        }
    }
    out.join("/")
}

/// The default identifier-to-locator mapping
pub fn default_locator(id: &str) -> String {
    let real = realpath(id);
    if real.ends_with(".js") {
        real
    } else {
        format!("{real}.js")
    }
}

/// The identifier a locator denotes on its own (the locator minus its `.js`
/// suffix); used to bind a fetched locator to the identifier its resource
/// actually defined.
pub fn derived_id(locator: &str) -> &str {
    locator.strip_suffix(".js").unwrap_or(locator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realpath_drops_dot_segments() {
        assert_eq!(realpath("a/./b"), "a/b");
        assert_eq!(realpath("./a/b"), "a/b");
    }

    #[test]
    fn test_realpath_parent_segments() {
        assert_eq!(realpath("a/b/../c"), "a/c");
        // `..` only pops at depth >= 2
        assert_eq!(realpath("a/../../b"), "a/b");
    }

    #[test]
    fn test_realpath_keeps_leading_slash() {
        assert_eq!(realpath("/x//y"), "/x/y");
    }

    #[test]
    fn test_realpath_passes_urls_through() {
        assert_eq!(realpath("http://cdn.example/a/../m.js"), "http://cdn.example/a/../m.js");
    }

    #[test]
    fn test_default_locator_appends_js_once() {
        assert_eq!(default_locator("mod"), "mod.js");
        assert_eq!(default_locator("path/to/mod.js"), "path/to/mod.js");
    }

    #[test]
    fn test_derived_id_strips_suffix() {
        assert_eq!(derived_id("foo.js"), "foo");
        assert_eq!(derived_id("foo"), "foo");
    }
}
