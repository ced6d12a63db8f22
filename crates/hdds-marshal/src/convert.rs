// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Conversion Synthesizer.
//!
//! Emits the statements that move one field between its value-object
//! representation (`this.x`) and its transfer-struct representation
//! (`wrapper.x`), plus the statements that reset transfer handles after
//! release.
//!
//! Every native allocation emitted here is immediately followed by
//! `toRelease.Add(handle)`. Nothing else frees native memory; the single
//! `ReleaseNative` loop emitted by the declaration emitter does.

use crate::config::TargetLayout;
use crate::context::{Direction, GenerationContext};
use crate::csharp;
use crate::error::{Diagnostic, GenError, GenResult};
use crate::graph::{ArrayShape, Field, PrimitiveKind, Resolved, SequenceShape};
use crate::loops::{
    emit_counted_loop, emit_jagged_rows, emit_nested_loops, flat_index, JaggedAllocation,
};
use crate::mapper::{ArrayTransfer, Element, Site, TypeMapper};

/// Emits to-transfer, from-transfer and release statements per field.
pub struct ConversionSynthesizer<'m> {
    mapper: &'m TypeMapper,
}

/// Value-side and transfer-side spellings of the field being converted.
struct Operands {
    value: String,
    native: String,
}

impl Operands {
    fn of(field: &Field) -> Self {
        let member = csharp::identifier(&field.name);
        Self {
            value: format!("this.{member}"),
            native: format!("wrapper.{member}"),
        }
    }
}

impl<'m> ConversionSynthesizer<'m> {
    pub fn new(mapper: &'m TypeMapper) -> Self {
        Self { mapper }
    }

    // ------------------------------------------------------------------
    // to-transfer
    // ------------------------------------------------------------------

    pub fn emit_to_transfer(
        &self,
        ctx: &mut GenerationContext,
        out: &mut String,
        field: &Field,
    ) -> GenResult<()> {
        ctx.set_direction(Direction::ToTransfer);
        let declaration = ctx.declaration().to_string();
        let site = Site::new(&declaration, &field.name);
        let ops = Operands::of(field);
        tracing::trace!("to-transfer {}.{}: {}", declaration, field.name, field.ty.describe());

        match field.ty.resolve() {
            Resolved::Primitive(kind) => {
                self.note_precision(ctx, kind, site);
                ctx.line(
                    out,
                    format!(
                        "{} = {};",
                        ops.native,
                        self.mapper.primitive_to_transfer(kind, &ops.value)
                    ),
                );
            }
            Resolved::String(kind) => {
                ctx.line(
                    out,
                    format!(
                        "{} = {};",
                        ops.native,
                        self.mapper.string_to_native(kind, &ops.value)
                    ),
                );
                ctx.line(out, format!("toRelease.Add({});", ops.native));
            }
            Resolved::Enum(e) => {
                ctx.line(
                    out,
                    format!("{} = {};", ops.native, self.mapper.enum_to_transfer(e, &ops.value)),
                );
            }
            Resolved::Struct(_) => {
                ctx.line(
                    out,
                    format!("{}.ToNative(ref {}, toRelease);", ops.value, ops.native),
                );
            }
            Resolved::Union(u) => return Err(site.union(u)),
            Resolved::Array(shape) => self.array_to_transfer(ctx, out, &shape, site, &ops)?,
            Resolved::Sequence(shape) => self.sequence_to_transfer(ctx, out, &shape, site, &ops)?,
        }
        Ok(())
    }

    fn array_to_transfer(
        &self,
        ctx: &mut GenerationContext,
        out: &mut String,
        shape: &ArrayShape<'_>,
        site: Site<'_>,
        ops: &Operands,
    ) -> GenResult<()> {
        let element = self.mapper.classify_element(shape.element, "array", site)?;
        self.note_element_precision(ctx, element, site);
        let dims = shape.dims.as_slice();

        match self.mapper.array_transfer(shape, element, site)? {
            ArrayTransfer::Inline { length } => {
                ctx.line(
                    out,
                    format!(
                        "{} = new {}[{length}];",
                        ops.native,
                        self.mapper.element_transfer_type(element)
                    ),
                );
                if !shape.is_multi_dimensional() && self.is_direct(element) {
                    ctx.line(
                        out,
                        format!("Array.Copy({}, {}, {length});", ops.value, ops.native),
                    );
                    return Ok(());
                }
                emit_nested_loops(ctx, out, dims, None, |ctx, out, indices| {
                    let value = self.mapper.value_index(&ops.value, indices);
                    let native = format!("{}[{}]", ops.native, flat_index(dims, indices));
                    self.element_to_transfer(ctx, out, element, &value, &native);
                    Ok(())
                })
            }
            ArrayTransfer::OutOfLine { length } => {
                let slot = self.mapper.native_slot(element);
                ctx.open_bare(out);
                ctx.line(out, format!("int size = {};", slot.size));
                ctx.line(
                    out,
                    format!("{} = Marshal.AllocHGlobal(size * {length});", ops.native),
                );
                ctx.line(out, format!("toRelease.Add({});", ops.native));
                let result = emit_nested_loops(ctx, out, dims, None, |ctx, out, indices| {
                    let value = self.mapper.value_index(&ops.value, indices);
                    let staged = self.stage_to_native(ctx, out, element, &value);
                    let offset = format!("({}) * size", flat_index(dims, indices));
                    ctx.line(out, slot.write(&ops.native, &offset, &staged));
                    Ok(())
                });
                ctx.close(out);
                result
            }
        }
    }

    fn sequence_to_transfer(
        &self,
        ctx: &mut GenerationContext,
        out: &mut String,
        shape: &SequenceShape<'_>,
        site: Site<'_>,
        ops: &Operands,
    ) -> GenResult<()> {
        let element = self.mapper.classify_element(shape.element, "sequence", site)?;
        check_sequence_element(ctx.target(), element, site)?;
        self.note_element_precision(ctx, element, site);
        let slot = self.mapper.native_slot(element);

        let count = if shape.is_bounded() {
            format!(
                "{v} == null ? 0 : Math.Min({v}.Count, {})",
                shape.max_bound,
                v = ops.value
            )
        } else {
            format!("{v} == null ? 0 : {v}.Count", v = ops.value)
        };

        ctx.open_bare(out);
        ctx.line(out, format!("int count = {count};"));
        ctx.line(out, format!("int size = {};", slot.size));
        ctx.line(
            out,
            format!("{} = Marshal.AllocHGlobal(sizeof(int) + count * size);", ops.native),
        );
        ctx.line(out, format!("toRelease.Add({});", ops.native));
        ctx.line(out, format!("Marshal.WriteInt32({}, 0, count);", ops.native));
        let result = emit_counted_loop(ctx, out, "count", |ctx, out, index| {
            let item = format!("{}[{index}]", ops.value);
            let staged = self.stage_to_native(ctx, out, element, &item);
            let offset = format!("sizeof(int) + {index} * size");
            ctx.line(out, slot.write(&ops.native, &offset, &staged));
            Ok(())
        });
        ctx.close(out);
        result
    }

    /// Assign one element into an inline transfer array slot.
    fn element_to_transfer(
        &self,
        ctx: &mut GenerationContext,
        out: &mut String,
        element: Element<'_>,
        value: &str,
        native: &str,
    ) {
        match element {
            Element::Primitive(kind) => ctx.line(
                out,
                format!("{native} = {};", self.mapper.primitive_to_transfer(kind, value)),
            ),
            Element::String(kind) => {
                ctx.line(
                    out,
                    format!("{native} = {};", self.mapper.string_to_native(kind, value)),
                );
                ctx.line(out, format!("toRelease.Add({native});"));
            }
            Element::Enum(e) => ctx.line(
                out,
                format!("{native} = {};", self.mapper.enum_to_transfer(e, value)),
            ),
            Element::Struct(_) => {
                ctx.line(out, format!("{value}.ToNative(ref {native}, toRelease);"));
            }
        }
    }

    /// Emit any staging needed before `value` can be stored in a native
    /// slot, and return the expression to store.
    fn stage_to_native(
        &self,
        ctx: &mut GenerationContext,
        out: &mut String,
        element: Element<'_>,
        value: &str,
    ) -> String {
        match element {
            Element::Primitive(_) | Element::Enum(_) => value.to_string(),
            Element::String(kind) => {
                ctx.line(
                    out,
                    format!("IntPtr text = {};", self.mapper.string_to_native(kind, value)),
                );
                ctx.line(out, "toRelease.Add(text);");
                "text".to_string()
            }
            Element::Struct(s) => {
                let wrapper = self.mapper.transfer_name(&s.name);
                ctx.line(out, format!("{wrapper} element = new {wrapper}();"));
                ctx.line(out, format!("{value}.ToNative(ref element, toRelease);"));
                "element".to_string()
            }
        }
    }

    // ------------------------------------------------------------------
    // from-transfer
    // ------------------------------------------------------------------

    pub fn emit_from_transfer(
        &self,
        ctx: &mut GenerationContext,
        out: &mut String,
        field: &Field,
    ) -> GenResult<()> {
        ctx.set_direction(Direction::FromTransfer);
        let declaration = ctx.declaration().to_string();
        let site = Site::new(&declaration, &field.name);
        let ops = Operands::of(field);
        tracing::trace!("from-transfer {}.{}", declaration, field.name);

        match field.ty.resolve() {
            Resolved::Primitive(kind) => {
                self.note_precision(ctx, kind, site);
                ctx.line(
                    out,
                    format!(
                        "{} = {};",
                        ops.value,
                        self.mapper.primitive_from_transfer(kind, &ops.native)
                    ),
                );
            }
            Resolved::String(kind) => ctx.line(
                out,
                format!(
                    "{} = {};",
                    ops.value,
                    self.mapper.string_from_native(kind, &ops.native)
                ),
            ),
            Resolved::Enum(e) => ctx.line(
                out,
                format!(
                    "{} = {};",
                    ops.value,
                    self.mapper.enum_from_transfer(e, &ops.native)
                ),
            ),
            Resolved::Struct(s) => {
                ctx.line(
                    out,
                    format!("{} = new {}();", ops.value, self.mapper.value_name(&s.name)),
                );
                ctx.line(out, format!("{}.FromNative({});", ops.value, ops.native));
            }
            Resolved::Union(u) => return Err(site.union(u)),
            Resolved::Array(shape) => self.array_from_transfer(ctx, out, &shape, site, &ops)?,
            Resolved::Sequence(shape) => {
                let default = self.mapper.default_value_expr(&field.ty, site)?;
                self.sequence_from_transfer(ctx, out, &shape, site, &ops, &default)?
            }
        }
        Ok(())
    }

    fn array_from_transfer(
        &self,
        ctx: &mut GenerationContext,
        out: &mut String,
        shape: &ArrayShape<'_>,
        site: Site<'_>,
        ops: &Operands,
    ) -> GenResult<()> {
        let element = self.mapper.classify_element(shape.element, "array", site)?;
        self.note_element_precision(ctx, element, site);
        let dims = shape.dims.as_slice();
        let element_type = self.mapper.element_value_type(element);
        let jagged = JaggedAllocation {
            target: &ops.value,
            element_type: &element_type,
            dims,
        };
        let rows = self.rows_for(shape).then_some(&jagged);

        ctx.line(
            out,
            format!(
                "{} = {};",
                ops.value,
                self.mapper.array_allocation(&element_type, dims)
            ),
        );

        match self.mapper.array_transfer(shape, element, site)? {
            ArrayTransfer::Inline { length } => {
                if !shape.is_multi_dimensional() && self.is_direct(element) {
                    ctx.line(
                        out,
                        format!("Array.Copy({}, {}, {length});", ops.native, ops.value),
                    );
                    return Ok(());
                }
                emit_nested_loops(ctx, out, dims, rows, |ctx, out, indices| {
                    let value = self.mapper.value_index(&ops.value, indices);
                    let native = format!("{}[{}]", ops.native, flat_index(dims, indices));
                    self.element_from_transfer(ctx, out, element, &value, &native);
                    Ok(())
                })
            }
            ArrayTransfer::OutOfLine { .. } => {
                // Rows exist even when the transfer handle is null.
                if let Some(alloc) = rows {
                    emit_jagged_rows(ctx, out, alloc)?;
                }
                let slot = self.mapper.native_slot(element);
                ctx.open(out, format!("if ({} != IntPtr.Zero)", ops.native));
                ctx.line(out, format!("int size = {};", slot.size));
                let result = emit_nested_loops(ctx, out, dims, None, |ctx, out, indices| {
                    let value = self.mapper.value_index(&ops.value, indices);
                    let offset = format!("({}) * size", flat_index(dims, indices));
                    let read = slot.read(&ops.native, &offset);
                    let staged = self.stage_from_native(ctx, out, element, &read);
                    ctx.line(out, format!("{value} = {staged};"));
                    Ok(())
                });
                ctx.close(out);
                result
            }
        }
    }

    fn sequence_from_transfer(
        &self,
        ctx: &mut GenerationContext,
        out: &mut String,
        shape: &SequenceShape<'_>,
        site: Site<'_>,
        ops: &Operands,
        default: &str,
    ) -> GenResult<()> {
        let element = self.mapper.classify_element(shape.element, "sequence", site)?;
        check_sequence_element(ctx.target(), element, site)?;
        self.note_element_precision(ctx, element, site);
        let slot = self.mapper.native_slot(element);

        let stored = format!("Marshal.ReadInt32({}, 0)", ops.native);
        let count = if shape.is_bounded() {
            format!("Math.Min({stored}, {})", shape.max_bound)
        } else {
            stored
        };

        ctx.line(out, format!("{} = {default};", ops.value));
        ctx.open(out, format!("if ({} != IntPtr.Zero)", ops.native));
        ctx.line(out, format!("int count = {count};"));
        ctx.line(out, format!("int size = {};", slot.size));
        let result = emit_counted_loop(ctx, out, "count", |ctx, out, index| {
            let read = slot.read(&ops.native, &format!("sizeof(int) + {index} * size"));
            let staged = self.stage_from_native(ctx, out, element, &read);
            ctx.line(out, format!("{}.Add({staged});", ops.value));
            Ok(())
        });
        ctx.close(out);
        result
    }

    fn element_from_transfer(
        &self,
        ctx: &mut GenerationContext,
        out: &mut String,
        element: Element<'_>,
        value: &str,
        native: &str,
    ) {
        match element {
            Element::Primitive(kind) => ctx.line(
                out,
                format!("{value} = {};", self.mapper.primitive_from_transfer(kind, native)),
            ),
            Element::String(kind) => ctx.line(
                out,
                format!("{value} = {};", self.mapper.string_from_native(kind, native)),
            ),
            Element::Enum(e) => ctx.line(
                out,
                format!("{value} = {};", self.mapper.enum_from_transfer(e, native)),
            ),
            Element::Struct(s) => {
                ctx.line(
                    out,
                    format!("{value} = new {}();", self.mapper.value_name(&s.name)),
                );
                ctx.line(out, format!("{value}.FromNative({native});"));
            }
        }
    }

    /// Emit staging for a value read out of a native slot and return the
    /// managed expression.
    fn stage_from_native(
        &self,
        ctx: &mut GenerationContext,
        out: &mut String,
        element: Element<'_>,
        read: &str,
    ) -> String {
        match element {
            Element::Primitive(_) | Element::Enum(_) => read.to_string(),
            Element::String(kind) => {
                ctx.line(out, format!("IntPtr text = {read};"));
                self.mapper.string_from_native(kind, "text")
            }
            Element::Struct(s) => {
                let value = self.mapper.value_name(&s.name);
                ctx.line(out, format!("{value} element = new {value}();"));
                ctx.line(out, format!("element.FromNative({read});"));
                "element".to_string()
            }
        }
    }

    // ------------------------------------------------------------------
    // release
    // ------------------------------------------------------------------

    /// Reset the transfer-side handles of one field after the shared
    /// release list has been freed.
    pub fn emit_release(
        &self,
        ctx: &mut GenerationContext,
        out: &mut String,
        field: &Field,
    ) -> GenResult<()> {
        ctx.set_direction(Direction::Release);
        let declaration = ctx.declaration().to_string();
        let site = Site::new(&declaration, &field.name);
        let ops = Operands::of(field);

        match field.ty.resolve() {
            Resolved::Primitive(_) | Resolved::Enum(_) => {}
            Resolved::String(_) | Resolved::Sequence(_) => {
                ctx.line(out, format!("{} = IntPtr.Zero;", ops.native));
            }
            Resolved::Struct(s) => ctx.line(
                out,
                format!(
                    "{}.ReleaseNative(ref {}, toRelease);",
                    self.mapper.value_name(&s.name),
                    ops.native
                ),
            ),
            Resolved::Union(u) => return Err(site.union(u)),
            Resolved::Array(shape) => {
                let element = self.mapper.classify_element(shape.element, "array", site)?;
                match (self.mapper.array_transfer(&shape, element, site)?, element) {
                    (ArrayTransfer::OutOfLine { .. }, _) => {
                        ctx.line(out, format!("{} = IntPtr.Zero;", ops.native));
                    }
                    (ArrayTransfer::Inline { .. }, Element::String(_)) => {
                        ctx.open(out, format!("if ({} != null)", ops.native));
                        ctx.line(
                            out,
                            format!("Array.Clear({n}, 0, {n}.Length);", n = ops.native),
                        );
                        ctx.close(out);
                    }
                    (ArrayTransfer::Inline { length }, Element::Struct(s)) => {
                        let owner = self.mapper.value_name(&s.name);
                        ctx.open(out, format!("if ({} != null)", ops.native));
                        let result =
                            emit_nested_loops(ctx, out, &[length], None, |ctx, out, indices| {
                                ctx.line(
                                    out,
                                    format!(
                                        "{owner}.ReleaseNative(ref {}[{}], toRelease);",
                                        ops.native, indices[0]
                                    ),
                                );
                                Ok(())
                            });
                        ctx.close(out);
                        result?;
                    }
                    (ArrayTransfer::Inline { .. }, _) => {}
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // helpers
    // ------------------------------------------------------------------

    /// Jagged destinations need a row allocation per outer index.
    fn rows_for(&self, shape: &ArrayShape<'_>) -> bool {
        self.mapper.target() == TargetLayout::Jagged && shape.is_multi_dimensional()
    }

    fn is_direct(&self, element: Element<'_>) -> bool {
        match element {
            Element::Primitive(kind) => self.mapper.primitive_is_direct(kind),
            _ => false,
        }
    }

    fn note_precision(&self, ctx: &mut GenerationContext, kind: PrimitiveKind, site: Site<'_>) {
        if kind.is_extended_precision() {
            ctx.warn(Diagnostic::ExtendedPrecisionLoss {
                declaration: site.declaration.to_string(),
                field: site.field.to_string(),
            });
        }
    }

    fn note_element_precision(
        &self,
        ctx: &mut GenerationContext,
        element: Element<'_>,
        site: Site<'_>,
    ) {
        if let Element::Primitive(kind) = element {
            self.note_precision(ctx, kind, site);
        }
    }
}

/// The rectangular layout's native sequence bridge has no enum elements.
fn check_sequence_element(
    target: TargetLayout,
    element: Element<'_>,
    site: Site<'_>,
) -> GenResult<()> {
    match element {
        Element::Enum(e) if !target.supports_enum_sequences() => {
            Err(GenError::UnsupportedEnumSequenceTarget {
                declaration: site.declaration.to_string(),
                field: site.field.to_string(),
                element: format!("enum {}", e.name.scoped()),
                target,
            })
        }
        _ => Ok(()),
    }
}
