// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Alias-free view of a [`TypeNode`].

use super::{EnumType, PrimitiveKind, StructType, TypeNode, UnionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringKind {
    Narrow,
    Wide,
}

/// Resolved fixed array. Arrays of arrays are merged, so `element` never
/// resolves to another array.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayShape<'a> {
    pub element: &'a TypeNode,
    pub dims: Vec<u32>,
}

impl ArrayShape<'_> {
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn is_multi_dimensional(&self) -> bool {
        self.dims.len() > 1
    }

    /// Total element count (`d0 * d1 * ...`), `None` on overflow.
    pub fn element_count(&self) -> Option<u64> {
        self.dims
            .iter()
            .try_fold(1u64, |count, d| count.checked_mul(u64::from(*d)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceShape<'a> {
    pub element: &'a TypeNode,
    pub max_bound: u32,
}

impl SequenceShape<'_> {
    pub fn is_bounded(&self) -> bool {
        self.max_bound > 0
    }
}

/// A type node with every typedef followed.
///
/// Has no alias variant; synthesizers match on this enum, so none of them
/// can branch on a typedef.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<'a> {
    Primitive(PrimitiveKind),
    String(StringKind),
    Enum(&'a EnumType),
    Struct(&'a StructType),
    Union(&'a UnionType),
    Array(ArrayShape<'a>),
    Sequence(SequenceShape<'a>),
}

impl TypeNode {
    /// Follow typedefs until a concrete node is reached.
    pub fn unalias(&self) -> &TypeNode {
        let mut node = self;
        while let TypeNode::Alias(alias) = node {
            node = &alias.target;
        }
        node
    }

    pub fn resolve(&self) -> Resolved<'_> {
        match self {
            TypeNode::Alias(alias) => alias.target.resolve(),
            TypeNode::Primitive(kind) => Resolved::Primitive(*kind),
            TypeNode::NarrowString => Resolved::String(StringKind::Narrow),
            TypeNode::WideString => Resolved::String(StringKind::Wide),
            TypeNode::Enum(e) => Resolved::Enum(e),
            TypeNode::Struct(s) => Resolved::Struct(s),
            TypeNode::Union(u) => Resolved::Union(u),
            TypeNode::FixedArray { element, dims } => {
                let mut dims = dims.clone();
                let mut element: &TypeNode = element;
                while let TypeNode::FixedArray {
                    element: inner,
                    dims: inner_dims,
                } = element.unalias()
                {
                    dims.extend_from_slice(inner_dims);
                    element = inner.as_ref();
                }
                Resolved::Array(ArrayShape { element, dims })
            }
            TypeNode::Sequence { element, max_bound } => Resolved::Sequence(SequenceShape {
                element,
                max_bound: *max_bound,
            }),
        }
    }
}
