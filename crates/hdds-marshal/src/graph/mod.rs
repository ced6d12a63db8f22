// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type graph handed over by the IDL compiler.
//!
//! The graph is immutable for the whole generation run. Named types are
//! shared through `Arc` so the same struct can be referenced from many
//! fields without copying its definition. Nothing in this crate mutates it.
//!
//! Representation decisions never look at [`TypeNode::Alias`] directly:
//! callers go through [`TypeNode::resolve`], which follows typedef chains and
//! merges arrays-of-arrays into a single multi-dimensional shape.

mod names;
mod resolve;

pub use names::ScopedName;
pub use resolve::{ArrayShape, Resolved, SequenceShape, StringKind};

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Primitive IDL types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    /// IDL `long double`; no bit-exact managed counterpart.
    LongDouble,
    Octet,
    Bool,
    Char,
    WChar,
}

impl PrimitiveKind {
    pub const fn is_extended_precision(self) -> bool {
        matches!(self, Self::LongDouble)
    }
}

/// One node of the type graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeNode {
    Primitive(PrimitiveKind),
    NarrowString,
    WideString,
    Enum(Arc<EnumType>),
    Struct(Arc<StructType>),
    /// Tagged union. Present only so it can be rejected.
    Union(Arc<UnionType>),
    Alias(Arc<AliasType>),
    FixedArray {
        element: Box<TypeNode>,
        dims: Vec<u32>,
    },
    Sequence {
        element: Box<TypeNode>,
        /// 0 = unbounded.
        #[serde(default)]
        max_bound: u32,
    },
}

impl TypeNode {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::Primitive(kind)
    }

    pub fn array(element: TypeNode, dims: impl Into<Vec<u32>>) -> Self {
        Self::FixedArray {
            element: Box::new(element),
            dims: dims.into(),
        }
    }

    pub fn sequence(element: TypeNode, max_bound: u32) -> Self {
        Self::Sequence {
            element: Box::new(element),
            max_bound,
        }
    }

    /// Human-readable kind used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Self::Primitive(kind) => format!("{kind:?}").to_lowercase(),
            Self::NarrowString => "string".to_string(),
            Self::WideString => "wstring".to_string(),
            Self::Enum(e) => format!("enum {}", e.name),
            Self::Struct(s) => format!("struct {}", s.name),
            Self::Union(u) => format!("union {}", u.name),
            Self::Alias(a) => format!("typedef {}", a.name),
            Self::FixedArray { element, dims } => {
                let dims: Vec<String> = dims.iter().map(|d| format!("[{d}]")).collect();
                format!("{}{}", element.describe(), dims.concat())
            }
            Self::Sequence { element, max_bound } if *max_bound > 0 => {
                format!("sequence<{}, {max_bound}>", element.describe())
            }
            Self::Sequence { element, .. } => format!("sequence<{}>", element.describe()),
        }
    }

    /// Find the first union reachable from this node without entering
    /// named structs (each struct is validated as its own declaration).
    pub fn find_union(&self) -> Option<&UnionType> {
        match self {
            Self::Union(u) => Some(u),
            Self::Alias(a) => a.target.find_union(),
            Self::FixedArray { element, .. } | Self::Sequence { element, .. } => {
                element.find_union()
            }
            Self::Primitive(_)
            | Self::NarrowString
            | Self::WideString
            | Self::Enum(_)
            | Self::Struct(_) => None,
        }
    }
}

/// Struct member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeNode,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: TypeNode) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructType {
    pub name: ScopedName,
    #[serde(default)]
    pub fields: Vec<Field>,
    /// Template category for distinguished types (e.g. `"topic"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl StructType {
    pub fn new(name: impl Into<ScopedName>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
            category: None,
        }
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn is_distinguished(&self) -> bool {
        self.category.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumType {
    pub name: ScopedName,
    pub values: Vec<String>,
}

impl EnumType {
    pub fn new<I, S>(name: impl Into<ScopedName>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasType {
    pub name: ScopedName,
    pub target: TypeNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionType {
    pub name: ScopedName,
    #[serde(default)]
    pub branches: Vec<Field>,
}

/// Constant value as written in IDL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstValue {
    Int(i64),
    #[serde(rename = "uint")]
    UInt(u64),
    Float(f64),
    Bool(bool),
    Char(char),
    Str(String),
    /// Enumerator name of the declared enum type.
    Enumerator(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstDecl {
    pub name: ScopedName,
    #[serde(rename = "type")]
    pub ty: TypeNode,
    pub value: ConstValue,
}

/// Top-level declaration, delivered one at a time in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Declaration {
    Struct(Arc<StructType>),
    Enum(Arc<EnumType>),
    Alias(Arc<AliasType>),
    Union(Arc<UnionType>),
    Const(ConstDecl),
}

impl Declaration {
    pub fn name(&self) -> &ScopedName {
        match self {
            Self::Struct(s) => &s.name,
            Self::Enum(e) => &e.name,
            Self::Alias(a) => &a.name,
            Self::Union(u) => &u.name,
            Self::Const(c) => &c.name,
        }
    }
}
