// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Codec Synthesizer: `Encode`/`Decode` statements against the CDR runtime.
//!
//! The runtime exposes `writer.Write<Tag>(v)` / `reader.Read<Tag>()` per
//! primitive, `Write<Tag>Seq` / `Read<Tag>Seq` for sequences (with the bound
//! as an extra argument when the sequence is bounded) and
//! `Write<Tag>Array(v, n)` / `Read<Tag>Array(n)` for rank-1 arrays. Byte
//! layout is the runtime's business.
//!
//! Only flat messages are encodable: primitives, strings, scalar enums, and
//! sequences/arrays of primitives and strings.

use crate::config::TargetLayout;
use crate::context::{Direction, GenerationContext};
use crate::csharp;
use crate::error::{GenError, GenResult};
use crate::graph::{ArrayShape, Field, Resolved, TypeNode};
use crate::loops::{emit_nested_loops, JaggedAllocation};
use crate::mapper::{check_dims, Element, Site, TypeMapper};

pub struct CodecSynthesizer<'m> {
    mapper: &'m TypeMapper,
}

impl<'m> CodecSynthesizer<'m> {
    pub fn new(mapper: &'m TypeMapper) -> Self {
        Self { mapper }
    }

    pub fn emit_encode(
        &self,
        ctx: &mut GenerationContext,
        out: &mut String,
        field: &Field,
    ) -> GenResult<()> {
        ctx.set_direction(Direction::Encode);
        let declaration = ctx.declaration().to_string();
        let site = Site::new(&declaration, &field.name);
        let value = format!("this.{}", csharp::identifier(&field.name));

        match field.ty.resolve() {
            Resolved::Primitive(kind) => {
                ctx.line(out, format!("writer.Write{}({value});", self.mapper.wire_tag(kind)));
            }
            Resolved::String(kind) => ctx.line(
                out,
                format!("writer.Write{}({value});", self.mapper.string_wire_tag(kind)),
            ),
            Resolved::Enum(_) => ctx.line(out, format!("writer.WriteInt32((int){value});")),
            Resolved::Struct(_) => return Err(nested(site, &field.ty)),
            Resolved::Union(u) => return Err(site.union(u)),
            Resolved::Sequence(shape) => {
                let tag = self.element_tag(shape.element, "sequence", site)?;
                if shape.is_bounded() {
                    ctx.line(out, format!("writer.Write{tag}Seq({value}, {});", shape.max_bound));
                } else {
                    ctx.line(out, format!("writer.Write{tag}Seq({value});"));
                }
            }
            Resolved::Array(shape) => self.encode_array(ctx, out, &shape, site, &value)?,
        }
        Ok(())
    }

    fn encode_array(
        &self,
        ctx: &mut GenerationContext,
        out: &mut String,
        shape: &ArrayShape<'_>,
        site: Site<'_>,
        value: &str,
    ) -> GenResult<()> {
        let tag = self.element_tag(shape.element, "array", site)?;
        let length = check_dims(shape, site)?;
        if !shape.is_multi_dimensional() {
            ctx.line(out, format!("writer.Write{tag}Array({value}, {length});"));
            return Ok(());
        }
        emit_nested_loops(ctx, out, &shape.dims, None, |ctx, out, indices| {
            let item = self.mapper.value_index(value, indices);
            ctx.line(out, format!("writer.Write{tag}({item});"));
            Ok(())
        })
    }

    pub fn emit_decode(
        &self,
        ctx: &mut GenerationContext,
        out: &mut String,
        field: &Field,
    ) -> GenResult<()> {
        ctx.set_direction(Direction::Decode);
        let declaration = ctx.declaration().to_string();
        let site = Site::new(&declaration, &field.name);
        let value = format!("this.{}", csharp::identifier(&field.name));

        match field.ty.resolve() {
            Resolved::Primitive(kind) => {
                ctx.line(out, format!("{value} = reader.Read{}();", self.mapper.wire_tag(kind)));
            }
            Resolved::String(kind) => ctx.line(
                out,
                format!("{value} = reader.Read{}();", self.mapper.string_wire_tag(kind)),
            ),
            Resolved::Enum(e) => ctx.line(
                out,
                format!("{value} = {};", self.mapper.enum_from_transfer(e, "reader.ReadInt32()")),
            ),
            Resolved::Struct(_) => return Err(nested(site, &field.ty)),
            Resolved::Union(u) => return Err(site.union(u)),
            Resolved::Sequence(shape) => {
                let tag = self.element_tag(shape.element, "sequence", site)?;
                if shape.is_bounded() {
                    ctx.line(out, format!("{value} = reader.Read{tag}Seq({});", shape.max_bound));
                } else {
                    ctx.line(out, format!("{value} = reader.Read{tag}Seq();"));
                }
            }
            Resolved::Array(shape) => self.decode_array(ctx, out, &shape, site, &value)?,
        }
        Ok(())
    }

    fn decode_array(
        &self,
        ctx: &mut GenerationContext,
        out: &mut String,
        shape: &ArrayShape<'_>,
        site: Site<'_>,
        value: &str,
    ) -> GenResult<()> {
        let tag = self.element_tag(shape.element, "array", site)?;
        let length = check_dims(shape, site)?;
        if !shape.is_multi_dimensional() {
            ctx.line(out, format!("{value} = reader.Read{tag}Array({length});"));
            return Ok(());
        }

        let element = self.mapper.classify_element(shape.element, "array", site)?;
        let element_type = self.mapper.element_value_type(element);
        let dims = shape.dims.as_slice();
        ctx.line(
            out,
            format!("{value} = {};", self.mapper.array_allocation(&element_type, dims)),
        );
        let jagged = JaggedAllocation {
            target: value,
            element_type: &element_type,
            dims,
        };
        let rows = (self.mapper.target() == TargetLayout::Jagged).then_some(&jagged);
        emit_nested_loops(ctx, out, dims, rows, |ctx, out, indices| {
            let item = self.mapper.value_index(value, indices);
            ctx.line(out, format!("{item} = reader.Read{tag}();"));
            Ok(())
        })
    }

    /// Wire tag of a collection element; aggregates have none.
    fn element_tag(
        &self,
        element: &TypeNode,
        container: &'static str,
        site: Site<'_>,
    ) -> GenResult<&'static str> {
        match self.mapper.classify_element(element, container, site)? {
            Element::Primitive(kind) => Ok(self.mapper.wire_tag(kind)),
            Element::String(kind) => Ok(self.mapper.string_wire_tag(kind)),
            Element::Enum(_) | Element::Struct(_) => Err(nested(site, element)),
        }
    }
}

fn nested(site: Site<'_>, element: &TypeNode) -> GenError {
    GenError::UnsupportedNestedAggregateInWireCodec {
        declaration: site.declaration.to_string(),
        field: site.field.to_string(),
        element: element.describe(),
    }
}
