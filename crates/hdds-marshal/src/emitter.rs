// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Declaration Emitter.
//!
//! Top-level driver: one call per declaration, one [`GenerationContext`] per
//! declaration and target. Output for a declaration is committed to the
//! shared buffers only once every configured target has been generated
//! successfully.

use crate::codec::CodecSynthesizer;
use crate::config::{GeneratorConfig, TargetLayout};
use crate::context::{Direction, GenerationContext};
use crate::convert::ConversionSynthesizer;
use crate::csharp::{self, char_literal, float_literal, string_literal};
use crate::error::{Diagnostic, GenError, GenResult};
use crate::graph::{
    ConstDecl, ConstValue, Declaration, EnumType, Field, PrimitiveKind, Resolved, ScopedName,
    StructType,
};
use crate::loops::{emit_jagged_rows, emit_nested_loops, JaggedAllocation};
use crate::mapper::{primitive_value_type, Element, Site, TypeMapper};
use crate::template::{self, TemplateSet};
use std::collections::BTreeMap;

const VALUES_PREAMBLE: &str = "\
// Generated by hdds-marshal-gen. Do not edit.
using System;
using System.Collections.Generic;
using System.Runtime.InteropServices;
using Hdds.Cdr;
";

const TRANSFERS_PREAMBLE: &str = "\
// Generated by hdds-marshal-gen. Do not edit.
using System;
using System.Runtime.InteropServices;
";

/// Value-object and transfer-struct text for one target layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetOutput {
    pub values: String,
    pub transfers: String,
}

impl TargetOutput {
    /// Complete `Values.cs` contents.
    pub fn values_document(&self) -> String {
        format!("{VALUES_PREAMBLE}\n{}", self.values)
    }

    /// Complete `Transfers.cs` contents.
    pub fn transfers_document(&self) -> String {
        format!("{TRANSFERS_PREAMBLE}\n{}", self.transfers)
    }

    fn append(&mut self, other: &TargetOutput) {
        append_unit(&mut self.values, &other.values);
        append_unit(&mut self.transfers, &other.transfers);
    }
}

fn append_unit(buffer: &mut String, unit: &str) {
    if unit.is_empty() {
        return;
    }
    if !buffer.is_empty() {
        buffer.push('\n');
    }
    buffer.push_str(unit);
}

/// Everything generated for one declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclarationOutput {
    pub name: ScopedName,
    pub targets: BTreeMap<TargetLayout, TargetOutput>,
    pub diagnostics: Vec<Diagnostic>,
}

impl DeclarationOutput {
    pub fn is_empty(&self) -> bool {
        self.targets
            .values()
            .all(|t| t.values.is_empty() && t.transfers.is_empty())
    }
}

/// Accumulated output buffers, keyed by target layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedOutput {
    targets: BTreeMap<TargetLayout, TargetOutput>,
    diagnostics: Vec<Diagnostic>,
}

impl GeneratedOutput {
    pub fn new(targets: &[TargetLayout]) -> Self {
        Self {
            targets: targets
                .iter()
                .map(|t| (*t, TargetOutput::default()))
                .collect(),
            diagnostics: Vec::new(),
        }
    }

    pub fn get(&self, target: TargetLayout) -> Option<&TargetOutput> {
        self.targets.get(&target)
    }

    pub fn targets(&self) -> impl Iterator<Item = (TargetLayout, &TargetOutput)> {
        self.targets.iter().map(|(t, o)| (*t, o))
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn append(&mut self, declaration: &DeclarationOutput) {
        for (target, unit) in &declaration.targets {
            self.targets.entry(*target).or_default().append(unit);
        }
        for diagnostic in &declaration.diagnostics {
            if !self.diagnostics.contains(diagnostic) {
                self.diagnostics.push(diagnostic.clone());
            }
        }
    }
}

/// Result of a batch run.
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    pub output: GeneratedOutput,
    /// Declarations that produced output.
    pub emitted: Vec<String>,
    /// Declarations that produce no output (aliases).
    pub skipped: Vec<String>,
    pub failures: Vec<GenError>,
}

impl GenerationReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn render_summary(&self) -> String {
        let rule = "=".repeat(60);
        let mut text = format!("\n{rule}\n  Marshaling Generation Report\n{rule}\n\n");
        text.push_str(&format!("  [OK]   Emitted:     {} declarations\n", self.emitted.len()));
        text.push_str(&format!("  [--]   Skipped:     {} aliases\n", self.skipped.len()));
        text.push_str(&format!(
            "  [WARN] Diagnostics: {}\n",
            self.output.diagnostics().len()
        ));
        let marker = if self.failures.is_empty() { "[OK]  " } else { "[FAIL]" };
        text.push_str(&format!("  {marker} Failed:      {}\n", self.failures.len()));
        for failure in &self.failures {
            text.push_str(&format!("    - {failure}\n"));
        }
        text.push_str(&format!("\n{rule}\n"));
        text
    }
}

/// Type-directed C# marshaling generator.
#[derive(Debug, Clone)]
pub struct Generator {
    config: GeneratorConfig,
    templates: TemplateSet,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            templates: TemplateSet::new(),
        }
    }

    #[must_use]
    pub fn with_templates(mut self, templates: TemplateSet) -> Self {
        self.templates = templates;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate one declaration for every configured target.
    ///
    /// Nothing is returned for a declaration that fails on any target.
    pub fn emit_declaration(&self, declaration: &Declaration) -> GenResult<DeclarationOutput> {
        let name = declaration.name().clone();
        let mut targets = BTreeMap::new();
        let mut diagnostics: Vec<Diagnostic> = Vec::new();

        for &target in &self.config.targets {
            tracing::debug!("emitting {} for {} layout", name, target);
            let mut ctx = GenerationContext::new(name.scoped(), target)
                .with_indent_width(self.config.indent_width)
                .with_loop_prefix(self.config.loop_index_prefix.clone());
            let mapper = TypeMapper::new(
                target,
                self.config.platform,
                self.config.transfer_suffix.clone(),
            );

            let unit = match declaration {
                Declaration::Struct(s) => self.emit_struct(&mut ctx, &mapper, s)?,
                Declaration::Enum(e) => self.emit_enum(&mut ctx, &mapper, e),
                Declaration::Const(c) => self.emit_const(&mut ctx, &mapper, c)?,
                Declaration::Alias(a) => {
                    tracing::debug!(
                        "typedef {} -> {} resolved at use sites",
                        a.name,
                        a.target.describe()
                    );
                    TargetOutput::default()
                }
                Declaration::Union(u) => {
                    return Err(GenError::UnsupportedTypeConstruct {
                        declaration: name.scoped(),
                        construct: u.name.scoped(),
                    })
                }
            };

            for diagnostic in ctx.take_diagnostics() {
                if !diagnostics.contains(&diagnostic) {
                    diagnostics.push(diagnostic);
                }
            }
            targets.insert(target, unit);
        }

        Ok(DeclarationOutput {
            name,
            targets,
            diagnostics,
        })
    }

    /// Generate one declaration and append it to `output`.
    pub fn generate(
        &self,
        declaration: &Declaration,
        output: &mut GeneratedOutput,
    ) -> GenResult<()> {
        let unit = self.emit_declaration(declaration)?;
        output.append(&unit);
        Ok(())
    }

    /// Generate every declaration in order, continuing past failures.
    pub fn generate_all(&self, declarations: &[Declaration]) -> GenerationReport {
        let mut report = GenerationReport {
            output: GeneratedOutput::new(&self.config.targets),
            ..GenerationReport::default()
        };

        for declaration in declarations {
            let name = declaration.name().scoped();
            match self.generate(declaration, &mut report.output) {
                Ok(()) if matches!(declaration, Declaration::Alias(_)) => report.skipped.push(name),
                Ok(()) => report.emitted.push(name),
                Err(e) => {
                    tracing::error!("{}", e);
                    report.failures.push(e);
                }
            }
        }
        report
    }

    // ------------------------------------------------------------------
    // structs
    // ------------------------------------------------------------------

    fn emit_struct(
        &self,
        ctx: &mut GenerationContext,
        mapper: &TypeMapper,
        s: &StructType,
    ) -> GenResult<TargetOutput> {
        for field in &s.fields {
            if let Some(union) = field.ty.find_union() {
                return Err(GenError::UnsupportedTypeConstruct {
                    declaration: s.name.scoped(),
                    construct: union.name.scoped(),
                });
            }
        }

        let mut values = String::new();
        let namespaced = open_namespace(ctx, &mut values, &s.name);
        self.struct_class(ctx, mapper, s, &mut values)?;
        close_namespace(ctx, &mut values, namespaced);

        let mut transfers = String::new();
        let namespaced = open_namespace(ctx, &mut transfers, &s.name);
        self.struct_wrapper(ctx, mapper, s, &mut transfers)?;
        close_namespace(ctx, &mut transfers, namespaced);

        if let Some(category) = &s.category {
            match self.templates.get(category) {
                Some(templates) => {
                    let subs = template::substitutions(&s.name, &self.config.sequence_suffix);
                    if let Some(text) = &templates.values {
                        append_unit(&mut values, &spliced(text, &subs));
                    }
                    if let Some(text) = &templates.transfers {
                        append_unit(&mut transfers, &spliced(text, &subs));
                    }
                }
                None => tracing::debug!("no templates for category {:?}", category),
            }
        }

        Ok(TargetOutput { values, transfers })
    }

    fn struct_class(
        &self,
        ctx: &mut GenerationContext,
        mapper: &TypeMapper,
        s: &StructType,
        out: &mut String,
    ) -> GenResult<()> {
        let declaration = s.name.scoped();
        let class = csharp::identifier(s.name.short());
        let wrapper = mapper.transfer_short_name(&s.name);

        ctx.open(out, format!("public partial class {class}"));
        for field in &s.fields {
            let site = Site::new(&declaration, &field.name);
            ctx.line(
                out,
                format!(
                    "public {} {} {{ get; set; }}",
                    mapper.value_type(&field.ty, site)?,
                    csharp::identifier(&field.name)
                ),
            );
        }
        if !s.fields.is_empty() {
            ctx.blank_line(out);
        }

        ctx.set_direction(Direction::Initialize);
        ctx.open(out, format!("public {class}()"));
        for field in &s.fields {
            emit_initializer(ctx, out, mapper, &declaration, field)?;
        }
        ctx.close(out);
        ctx.blank_line(out);

        let convert = ConversionSynthesizer::new(mapper);
        ctx.line(out, "#region Marshaling");
        ctx.blank_line(out);
        ctx.open(
            out,
            format!("internal void ToNative(ref {wrapper} wrapper, List<IntPtr> toRelease)"),
        );
        for field in &s.fields {
            convert.emit_to_transfer(ctx, out, field)?;
        }
        ctx.close(out);
        ctx.blank_line(out);

        ctx.open(out, format!("internal void FromNative({wrapper} wrapper)"));
        for field in &s.fields {
            convert.emit_from_transfer(ctx, out, field)?;
        }
        ctx.close(out);
        ctx.blank_line(out);

        ctx.open(
            out,
            format!(
                "internal static void ReleaseNative(ref {wrapper} wrapper, List<IntPtr> toRelease)"
            ),
        );
        ctx.open(out, "foreach (IntPtr handle in toRelease)");
        ctx.line(out, "Marshal.FreeHGlobal(handle);");
        ctx.close(out);
        ctx.line(out, "toRelease.Clear();");
        for field in &s.fields {
            convert.emit_release(ctx, out, field)?;
        }
        ctx.close(out);
        ctx.blank_line(out);
        ctx.line(out, "#endregion");

        if self.config.wire_codec && s.is_distinguished() {
            let codec = CodecSynthesizer::new(mapper);
            ctx.blank_line(out);
            ctx.line(out, "#region Serialization");
            ctx.blank_line(out);
            ctx.open(out, "public void Encode(CdrWriter writer)");
            for field in &s.fields {
                codec.emit_encode(ctx, out, field)?;
            }
            ctx.close(out);
            ctx.blank_line(out);
            ctx.open(out, "public void Decode(CdrReader reader)");
            for field in &s.fields {
                codec.emit_decode(ctx, out, field)?;
            }
            ctx.close(out);
            ctx.blank_line(out);
            ctx.line(out, "#endregion");
        }

        ctx.close(out);
        Ok(())
    }

    fn struct_wrapper(
        &self,
        ctx: &mut GenerationContext,
        mapper: &TypeMapper,
        s: &StructType,
        out: &mut String,
    ) -> GenResult<()> {
        let declaration = s.name.scoped();
        ctx.line(out, "[StructLayout(LayoutKind.Sequential)]");
        ctx.open(
            out,
            format!("internal struct {}", mapper.transfer_short_name(&s.name)),
        );
        for field in &s.fields {
            let site = Site::new(&declaration, &field.name);
            tracing::trace!("transfer field {}.{}", declaration, field.name);
            if let Some(attribute) = mapper.transfer_attribute(&field.ty, site)? {
                ctx.line(out, attribute);
            }
            ctx.line(
                out,
                format!(
                    "public {} {};",
                    mapper.transfer_type(&field.ty, site)?,
                    csharp::identifier(&field.name)
                ),
            );
        }
        ctx.close(out);
        Ok(())
    }

    // ------------------------------------------------------------------
    // enums and constants
    // ------------------------------------------------------------------

    fn emit_enum(
        &self,
        ctx: &mut GenerationContext,
        mapper: &TypeMapper,
        e: &EnumType,
    ) -> TargetOutput {
        let mut values = String::new();
        let namespaced = open_namespace(ctx, &mut values, &e.name);
        let header = format!("public enum {}", csharp::identifier(e.name.short()));
        enum_body(ctx, &mut values, &header, e);
        close_namespace(ctx, &mut values, namespaced);

        let mut transfers = String::new();
        let namespaced = open_namespace(ctx, &mut transfers, &e.name);
        enum_body(
            ctx,
            &mut transfers,
            &format!("internal enum {} : int", mapper.transfer_short_name(&e.name)),
            e,
        );
        close_namespace(ctx, &mut transfers, namespaced);

        TargetOutput { values, transfers }
    }

    fn emit_const(
        &self,
        ctx: &mut GenerationContext,
        mapper: &TypeMapper,
        c: &ConstDecl,
    ) -> GenResult<TargetOutput> {
        let (ty, literal) = const_literal(mapper, c)?;
        let mut values = String::new();
        let namespaced = open_namespace(ctx, &mut values, &c.name);
        ctx.open(&mut values, "public static partial class Constants");
        ctx.line(
            &mut values,
            format!("public const {ty} {} = {literal};", csharp::identifier(c.name.short())),
        );
        ctx.close(&mut values);
        close_namespace(ctx, &mut values, namespaced);
        Ok(TargetOutput {
            values,
            transfers: String::new(),
        })
    }
}

fn spliced(text: &str, substitutions: &[(&str, String)]) -> String {
    let result = template::splice(text, substitutions);
    let unresolved = template::unresolved_placeholders(&result);
    if !unresolved.is_empty() {
        tracing::debug!("template left placeholders unresolved: {:?}", unresolved);
    }
    result
}

fn open_namespace(ctx: &mut GenerationContext, out: &mut String, name: &ScopedName) -> bool {
    match name.namespace() {
        Some(namespace) => {
            ctx.open(out, format!("namespace {namespace}"));
            true
        }
        None => false,
    }
}

fn close_namespace(ctx: &mut GenerationContext, out: &mut String, namespaced: bool) {
    if namespaced {
        ctx.close(out);
    }
}

fn enum_body(ctx: &mut GenerationContext, out: &mut String, header: &str, e: &EnumType) {
    ctx.open(out, header);
    let last = e.values.len().saturating_sub(1);
    for (i, value) in e.values.iter().enumerate() {
        let separator = if i == last { "" } else { "," };
        ctx.line(out, format!("{}{separator}", csharp::identifier(value)));
    }
    ctx.close(out);
}

/// Constructor statement(s) giving one field its default value.
fn emit_initializer(
    ctx: &mut GenerationContext,
    out: &mut String,
    mapper: &TypeMapper,
    declaration: &str,
    field: &Field,
) -> GenResult<()> {
    let site = Site::new(declaration, &field.name);
    let target = format!("this.{}", csharp::identifier(&field.name));
    ctx.line(
        out,
        format!("{target} = {};", mapper.default_value_expr(&field.ty, site)?),
    );

    let Resolved::Array(shape) = field.ty.resolve() else {
        return Ok(());
    };
    if !mapper.needs_element_init(&shape) {
        return Ok(());
    }

    let element = mapper.classify_element(shape.element, "array", site)?;
    let element_type = mapper.element_value_type(element);
    let alloc = JaggedAllocation {
        target: &target,
        element_type: &element_type,
        dims: &shape.dims,
    };
    let rows = mapper.target() == TargetLayout::Jagged && shape.is_multi_dimensional();
    let fill = match element {
        Element::String(_) => Some("string.Empty".to_string()),
        Element::Struct(s) => Some(format!("new {}()", mapper.value_name(&s.name))),
        Element::Primitive(_) | Element::Enum(_) => None,
    };

    match fill {
        Some(fill) => {
            let jagged = rows.then_some(&alloc);
            emit_nested_loops(ctx, out, &shape.dims, jagged, |ctx, out, indices| {
                ctx.line(out, format!("{} = {fill};", mapper.value_index(&target, indices)));
                Ok(())
            })
        }
        None if rows => emit_jagged_rows(ctx, out, &alloc),
        None => Ok(()),
    }
}

/// C# type and literal of a constant.
fn const_literal(mapper: &TypeMapper, c: &ConstDecl) -> GenResult<(String, String)> {
    let invalid = || GenError::InvalidConstant {
        declaration: c.name.scoped(),
        ty: c.ty.describe(),
        value: format!("{:?}", c.value),
    };

    match (c.ty.resolve(), &c.value) {
        (Resolved::Primitive(kind), value) => primitive_literal(kind, value)
            .map(|literal| (primitive_value_type(kind).to_string(), literal))
            .ok_or_else(invalid),
        (Resolved::String(_), ConstValue::Str(text)) => {
            Ok(("string".to_string(), string_literal(text)))
        }
        (Resolved::Enum(e), ConstValue::Enumerator(member)) if e.values.contains(member) => {
            let ty = mapper.value_name(&e.name);
            let literal = format!("{ty}.{}", csharp::identifier(member));
            Ok((ty, literal))
        }
        _ => Err(invalid()),
    }
}

/// 2^96: every C# `decimal` magnitude is strictly below it.
const DECIMAL_LIMIT: f64 = 79_228_162_514_264_337_593_543_950_336.0;

fn primitive_literal(kind: PrimitiveKind, value: &ConstValue) -> Option<String> {
    let integer = match value {
        ConstValue::Int(v) => Some(i128::from(*v)),
        ConstValue::UInt(v) => Some(i128::from(*v)),
        _ => None,
    };
    let in_range = |min: i128, max: i128| {
        integer
            .filter(|v| (min..=max).contains(v))
            .map(|v| v.to_string())
    };

    match kind {
        PrimitiveKind::I8 => in_range(i8::MIN.into(), i8::MAX.into()),
        PrimitiveKind::U8 | PrimitiveKind::Octet => in_range(0, u8::MAX.into()),
        PrimitiveKind::I16 => in_range(i16::MIN.into(), i16::MAX.into()),
        PrimitiveKind::U16 => in_range(0, u16::MAX.into()),
        PrimitiveKind::I32 => in_range(i32::MIN.into(), i32::MAX.into()),
        PrimitiveKind::U32 => in_range(0, u32::MAX.into()),
        PrimitiveKind::I64 => in_range(i64::MIN.into(), i64::MAX.into()),
        PrimitiveKind::U64 => in_range(0, u64::MAX.into()),
        PrimitiveKind::F32 | PrimitiveKind::F64 | PrimitiveKind::LongDouble => {
            let number = match value {
                ConstValue::Float(v) => Some(*v),
                #[allow(clippy::cast_precision_loss)]
                _ => integer.map(|v| v as f64),
            }
            .filter(|v| v.is_finite())?;
            let (suffix, fits) = match kind {
                PrimitiveKind::F32 => ("f", number.abs() <= f64::from(f32::MAX)),
                PrimitiveKind::LongDouble => ("m", number.abs() < DECIMAL_LIMIT),
                _ => ("", true),
            };
            fits.then(|| float_literal(number, suffix))
        }
        PrimitiveKind::Bool => match value {
            ConstValue::Bool(b) => Some(b.to_string()),
            _ => None,
        },
        PrimitiveKind::Char | PrimitiveKind::WChar => {
            let limit = if kind == PrimitiveKind::Char { 0xFF } else { 0xFFFF };
            match value {
                ConstValue::Char(c) if u32::from(*c) <= limit => Some(char_literal(*c)),
                _ => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{AliasType, TypeNode, UnionType};
    use crate::template::CategoryTemplates;
    use std::sync::Arc;

    fn generator(targets: &[TargetLayout]) -> Generator {
        Generator::new(GeneratorConfig::default().with_targets(targets.to_vec()))
    }

    fn point() -> Arc<StructType> {
        Arc::new(StructType::new(
            "Geometry::Point",
            vec![
                Field::new("x", TypeNode::primitive(PrimitiveKind::F64)),
                Field::new("y", TypeNode::primitive(PrimitiveKind::F64)),
            ],
        ))
    }

    #[test]
    fn test_struct_emits_class_and_wrapper() {
        let out = generator(&[TargetLayout::Jagged])
            .emit_declaration(&Declaration::Struct(point()))
            .unwrap();
        let unit = &out.targets[&TargetLayout::Jagged];

        assert!(unit.values.starts_with("namespace Geometry\n{\n    public partial class Point\n"));
        assert!(unit.values.contains("        public double x { get; set; }\n"));
        assert!(unit
            .values
            .contains("internal void ToNative(ref PointWrapper wrapper, List<IntPtr> toRelease)"));
        assert!(unit.values.contains("wrapper.x = this.x;"));
        assert!(unit.values.contains("this.y = wrapper.y;"));
        assert!(!unit.values.contains("Encode"));

        let layout = concat!(
            "    [StructLayout(LayoutKind.Sequential)]\n",
            "    internal struct PointWrapper\n"
        );
        assert!(unit.transfers.contains(layout));
        assert!(unit.transfers.contains("        public double y;\n"));
    }

    #[test]
    fn test_distinguished_struct_gets_codec_and_templates() {
        let topic = Arc::new(
            StructType::new(
                "Sensors::Reading",
                vec![Field::new("value", TypeNode::primitive(PrimitiveKind::F32))],
            )
            .with_category("topic"),
        );
        let templates = TemplateSet::new().with_category(
            "topic",
            CategoryTemplates {
                values: Some("// <%SCOPED%> as <%TYPE%><%SEQ%> via <%SCOPED_METHOD%>\n".into()),
                transfers: None,
            },
        );
        let out = generator(&[TargetLayout::Rectangular])
            .with_templates(templates)
            .emit_declaration(&Declaration::Struct(topic))
            .unwrap();
        let unit = &out.targets[&TargetLayout::Rectangular];
        assert!(unit.values.contains("public void Encode(CdrWriter writer)"));
        assert!(unit.values.contains("writer.WriteFloat(this.value);"));
        assert!(unit.values.ends_with("// Sensors.Reading as ReadingSeq via Sensors_Reading\n"));
    }

    #[test]
    fn test_wire_codec_can_be_disabled() {
        let topic = Arc::new(StructType::new("T", Vec::new()).with_category("topic"));
        let generator = Generator::new(GeneratorConfig::default().with_wire_codec(false));
        let out = generator.emit_declaration(&Declaration::Struct(topic)).unwrap();
        assert!(out
            .targets
            .values()
            .all(|unit| !unit.values.contains("Encode")));
    }

    #[test]
    fn test_enum_has_value_and_transfer_forms() {
        let color = Arc::new(EnumType::new("Paint::Color", ["RED", "GREEN", "event"]));
        let out = generator(&[TargetLayout::Jagged])
            .emit_declaration(&Declaration::Enum(color))
            .unwrap();
        let unit = &out.targets[&TargetLayout::Jagged];
        assert_eq!(
            unit.values,
            "namespace Paint\n{\n    public enum Color\n    {\n        RED,\n        GREEN,\n        @event\n    }\n}\n"
        );
        assert!(unit.transfers.contains("internal enum ColorWrapper : int"));
    }

    #[test]
    fn test_constants() {
        let decl = |ty: TypeNode, value: ConstValue| {
            Declaration::Const(ConstDecl {
                name: ScopedName::parse("Limits::MAX"),
                ty,
                value,
            })
        };
        let gen = generator(&[TargetLayout::Jagged]);

        let out = gen
            .emit_declaration(&decl(TypeNode::primitive(PrimitiveKind::U16), ConstValue::Int(512)))
            .unwrap();
        assert!(out.targets[&TargetLayout::Jagged]
            .values
            .contains("public const ushort MAX = 512;"));

        let out = gen
            .emit_declaration(&decl(TypeNode::primitive(PrimitiveKind::F32), ConstValue::Int(2)))
            .unwrap();
        assert!(out.targets[&TargetLayout::Jagged]
            .values
            .contains("public const float MAX = 2.0f;"));

        let err = gen
            .emit_declaration(&decl(TypeNode::primitive(PrimitiveKind::I8), ConstValue::Int(300)))
            .unwrap_err();
        assert!(matches!(err, GenError::InvalidConstant { .. }));

        let err = gen
            .emit_declaration(&decl(TypeNode::NarrowString, ConstValue::Bool(true)))
            .unwrap_err();
        assert!(matches!(err, GenError::InvalidConstant { .. }));
    }

    #[test]
    fn test_float_constants_must_fit_their_type() {
        let decl = |kind: PrimitiveKind, value: f64| {
            Declaration::Const(ConstDecl {
                name: ScopedName::parse("Limits::BIG"),
                ty: TypeNode::primitive(kind),
                value: ConstValue::Float(value),
            })
        };
        let gen = generator(&[TargetLayout::Jagged]);

        for (kind, value) in [
            (PrimitiveKind::F32, 1e300),
            (PrimitiveKind::F32, -1e39),
            (PrimitiveKind::LongDouble, 1e30),
            (PrimitiveKind::LongDouble, -8e28),
        ] {
            let err = gen.emit_declaration(&decl(kind, value)).unwrap_err();
            assert!(matches!(err, GenError::InvalidConstant { .. }), "{kind:?} {value}");
        }

        let out = gen.emit_declaration(&decl(PrimitiveKind::F64, 1e300)).unwrap();
        assert!(out.targets[&TargetLayout::Jagged]
            .values
            .contains("public const double BIG = 1e300;"));

        let out = gen
            .emit_declaration(&decl(PrimitiveKind::LongDouble, 1e20))
            .unwrap();
        assert!(out.targets[&TargetLayout::Jagged]
            .values
            .contains("public const decimal BIG = 1e20m;"));
    }

    #[test]
    fn test_overflowing_array_dimensions_are_rejected() {
        let s = Arc::new(StructType::new(
            "Demo::Huge",
            vec![Field::new(
                "cells",
                TypeNode::array(
                    TypeNode::primitive(PrimitiveKind::I32),
                    vec![65536, 65536, 65536, 65536],
                ),
            )],
        ));
        let err = generator(&TargetLayout::ALL)
            .emit_declaration(&Declaration::Struct(s))
            .unwrap_err();
        assert!(matches!(
            err,
            GenError::InvalidArrayDimensions { ref field, .. } if field == "cells"
        ));
    }

    #[test]
    fn test_alias_produces_no_output() {
        let alias = Arc::new(AliasType {
            name: ScopedName::parse("Demo::Meters"),
            target: TypeNode::primitive(PrimitiveKind::F64),
        });
        let out = generator(&TargetLayout::ALL)
            .emit_declaration(&Declaration::Alias(alias))
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_union_field_aborts_whole_declaration() {
        let union = TypeNode::Union(Arc::new(UnionType {
            name: ScopedName::parse("Demo::Choice"),
            branches: Vec::new(),
        }));
        let s = Arc::new(StructType::new(
            "Demo::Holder",
            vec![
                Field::new("ok", TypeNode::primitive(PrimitiveKind::I32)),
                Field::new("choices", TypeNode::sequence(union, 0)),
            ],
        ));
        let gen = generator(&TargetLayout::ALL);
        let mut output = GeneratedOutput::new(&TargetLayout::ALL);
        let err = gen.generate(&Declaration::Struct(s), &mut output).unwrap_err();
        assert!(matches!(err, GenError::UnsupportedTypeConstruct { .. }));
        assert!(output
            .targets()
            .all(|(_, unit)| unit.values.is_empty() && unit.transfers.is_empty()));
    }

    #[test]
    fn test_failure_on_one_target_discards_all_targets() {
        let mode = TypeNode::Enum(Arc::new(EnumType::new("Robot::Mode", ["IDLE"])));
        let s = Arc::new(StructType::new(
            "Robot::State",
            vec![Field::new("modes", TypeNode::sequence(mode, 4))],
        ));
        let gen = generator(&[TargetLayout::Jagged, TargetLayout::Rectangular]);
        let mut output = GeneratedOutput::new(&[TargetLayout::Jagged, TargetLayout::Rectangular]);
        assert!(gen.generate(&Declaration::Struct(s), &mut output).is_err());
        assert!(output.get(TargetLayout::Jagged).map(|u| u.values.is_empty()).unwrap_or(false));
    }

    #[test]
    fn test_jagged_constructor_allocates_rows() {
        let s = Arc::new(StructType::new(
            "Demo::Grid",
            vec![
                Field::new(
                    "cells",
                    TypeNode::array(TypeNode::primitive(PrimitiveKind::I32), vec![2, 3]),
                ),
                Field::new("labels", TypeNode::array(TypeNode::NarrowString, vec![4])),
            ],
        ));
        let out = generator(&[TargetLayout::Jagged, TargetLayout::Rectangular])
            .emit_declaration(&Declaration::Struct(s))
            .unwrap();

        let jagged = &out.targets[&TargetLayout::Jagged].values;
        assert!(jagged.contains("this.cells = new int[2][];"));
        assert!(jagged.contains("this.cells[i0] = new int[3];"));
        assert!(jagged.contains("this.labels[i0] = string.Empty;"));

        let rect = &out.targets[&TargetLayout::Rectangular].values;
        assert!(rect.contains("this.cells = new int[2, 3];"));
        assert!(!rect.contains("this.cells[i0] = new int[3];"));
    }

    #[test]
    fn test_generate_all_continues_past_failures() {
        let union = Arc::new(UnionType {
            name: ScopedName::parse("Demo::Choice"),
            branches: Vec::new(),
        });
        let decls = vec![
            Declaration::Struct(point()),
            Declaration::Union(union),
            Declaration::Enum(Arc::new(EnumType::new("Demo::Flag", ["ON", "OFF"]))),
        ];
        let report = generator(&TargetLayout::ALL).generate_all(&decls);
        assert_eq!(report.emitted, vec!["Geometry::Point", "Demo::Flag"]);
        assert_eq!(report.failures.len(), 1);
        assert!(!report.is_success());
        assert!(report.render_summary().contains("Failed:      1"));
    }

    #[test]
    fn test_generator_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Generator>();
        assert_send_sync::<GeneratedOutput>();
    }
}
