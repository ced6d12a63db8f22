// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Scoped IDL names (`Module::Sub::Type`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fully scoped IDL name, stored as its module segments plus the short name.
///
/// Serialized as the `::`-joined string so type graphs stay readable in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ScopedName {
    segments: Vec<String>,
}

impl ScopedName {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments
                .into_iter()
                .map(Into::<String>::into)
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Parse `A::B::C` (a leading `::` is accepted and ignored).
    pub fn parse(scoped: &str) -> Self {
        Self::new(scoped.split("::"))
    }

    /// Unqualified type name.
    pub fn short(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// IDL spelling: `A::B::C`.
    pub fn scoped(&self) -> String {
        self.segments.join("::")
    }

    /// C# type path: `A.B.C`.
    pub fn dotted(&self) -> String {
        self.segments.join(".")
    }

    /// Enclosing C# namespace (`A.B`), `None` at global scope.
    pub fn namespace(&self) -> Option<String> {
        match self.segments.split_last() {
            Some((_, modules)) if !modules.is_empty() => Some(modules.join(".")),
            _ => None,
        }
    }

    /// Identifier usable inside a method or symbol name: `A_B_C`.
    pub fn method_safe(&self) -> String {
        self.segments.join("_")
    }
}

impl From<String> for ScopedName {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for ScopedName {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<ScopedName> for String {
    fn from(value: ScopedName) -> Self {
        value.scoped()
    }
}

impl fmt::Display for ScopedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.scoped())
    }
}
