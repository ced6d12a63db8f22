// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Generation errors and non-fatal diagnostics.
//!
//! Every fatal error aborts the current declaration only. Whether the run
//! continues is decided by the caller (see [`crate::Generator::generate_all`]).

use crate::config::TargetLayout;
use std::fmt;
use thiserror::Error;

pub type GenResult<T> = Result<T, GenError>;

/// Fatal, per-declaration generation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenError {
    #[error("{declaration}: tagged union `{construct}` is not supported")]
    UnsupportedTypeConstruct {
        declaration: String,
        construct: String,
    },

    #[error("{declaration}.{field}: wire codec has no encoding for nested {element}")]
    UnsupportedNestedAggregateInWireCodec {
        declaration: String,
        field: String,
        element: String,
    },

    #[error("{declaration}.{field}: {target} layout cannot marshal a sequence of {element}")]
    UnsupportedEnumSequenceTarget {
        declaration: String,
        field: String,
        element: String,
        target: TargetLayout,
    },

    #[error("{declaration}.{field}: {element} is not supported as {container} element")]
    UnsupportedElementType {
        declaration: String,
        field: String,
        element: String,
        container: &'static str,
    },

    #[error("{declaration}.{field}: array dimensions {dims:?} must be positive with an element count below 2^31")]
    InvalidArrayDimensions {
        declaration: String,
        field: String,
        dims: Vec<u32>,
    },

    #[error("{declaration}: constant value {value} is not valid for type {ty}")]
    InvalidConstant {
        declaration: String,
        ty: String,
        value: String,
    },
}

impl GenError {
    /// Scoped name of the declaration that failed.
    pub fn declaration(&self) -> &str {
        match self {
            Self::UnsupportedTypeConstruct { declaration, .. }
            | Self::UnsupportedNestedAggregateInWireCodec { declaration, .. }
            | Self::UnsupportedEnumSequenceTarget { declaration, .. }
            | Self::UnsupportedElementType { declaration, .. }
            | Self::InvalidArrayDimensions { declaration, .. }
            | Self::InvalidConstant { declaration, .. } => declaration,
        }
    }
}

/// Non-fatal findings reported alongside generated output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A `long double` field crosses the native boundary through `double`.
    ExtendedPrecisionLoss { declaration: String, field: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ExtendedPrecisionLoss { declaration, field } => write!(
                f,
                "{declaration}.{field}: long double is narrowed to double at the native boundary"
            ),
        }
    }
}
