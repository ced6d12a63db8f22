// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type Mapper: type-graph node -> C# representation names.
//!
//! Pure functions of the node plus the generator's fixed target layout and
//! platform profile. Nothing is cached; every call re-derives its answer.
//! Aliases are resolved before any decision, so typedef names never appear
//! in the output.

use crate::config::{PlatformProfile, TargetLayout};
use crate::error::{GenError, GenResult};
use crate::graph::{
    ArrayShape, EnumType, PrimitiveKind, Resolved, ScopedName, SequenceShape, StringKind,
    StructType, TypeNode, UnionType,
};

/// Declaration/field pair used to label errors.
#[derive(Debug, Clone, Copy)]
pub struct Site<'a> {
    pub declaration: &'a str,
    pub field: &'a str,
}

impl<'a> Site<'a> {
    pub fn new(declaration: &'a str, field: &'a str) -> Self {
        Self { declaration, field }
    }

    pub fn union(&self, union: &UnionType) -> GenError {
        GenError::UnsupportedTypeConstruct {
            declaration: self.declaration.to_string(),
            construct: union.name.scoped(),
        }
    }

    pub fn unsupported_element(&self, element: &TypeNode, container: &'static str) -> GenError {
        GenError::UnsupportedElementType {
            declaration: self.declaration.to_string(),
            field: self.field.to_string(),
            element: element.describe(),
            container,
        }
    }

    pub fn invalid_dims(&self, dims: &[u32]) -> GenError {
        GenError::InvalidArrayDimensions {
            declaration: self.declaration.to_string(),
            field: self.field.to_string(),
            dims: dims.to_vec(),
        }
    }
}

/// Element of an array or sequence after classification.
///
/// Collections only ever hold these four kinds; anything else is rejected
/// by [`TypeMapper::classify_element`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Element<'a> {
    Primitive(PrimitiveKind),
    String(StringKind),
    Enum(&'a EnumType),
    Struct(&'a StructType),
}

/// How a fixed array sits inside its transfer structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayTransfer {
    /// `ByValArray` of `length` elements, flattened row-major when rank > 1.
    Inline { length: u32 },
    /// `IntPtr` to an out-of-line buffer of transfer structs.
    OutOfLine { length: u32 },
}

/// `prefix + expr + suffix` conversion applied to a C# expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wrap {
    prefix: String,
    suffix: String,
}

impl Wrap {
    fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    fn identity() -> Self {
        Self::default()
    }

    pub fn apply(&self, expr: &str) -> String {
        format!("{}{}{}", self.prefix, expr, self.suffix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SlotAccess {
    /// `Marshal.Write<method>` / `Marshal.Read<method>`.
    Integer {
        method: &'static str,
        encode: Wrap,
        decode: Wrap,
    },
    /// `Marshal.StructureToPtr` / `Marshal.PtrToStructure<T>`.
    Structure { wrapper: String },
}

/// One element slot inside an out-of-line native buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeSlot {
    /// C# expression giving the slot size in bytes.
    pub size: String,
    access: SlotAccess,
}

impl NativeSlot {
    /// Statement storing `value` at `ptr + offset`.
    pub fn write(&self, ptr: &str, offset: &str, value: &str) -> String {
        match &self.access {
            SlotAccess::Integer { method, encode, .. } => format!(
                "Marshal.Write{method}({ptr}, {offset}, {});",
                encode.apply(value)
            ),
            SlotAccess::Structure { .. } => {
                format!("Marshal.StructureToPtr({value}, IntPtr.Add({ptr}, {offset}), false);")
            }
        }
    }

    /// Expression loading the value stored at `ptr + offset`.
    pub fn read(&self, ptr: &str, offset: &str) -> String {
        match &self.access {
            SlotAccess::Integer { method, decode, .. } => {
                decode.apply(&format!("Marshal.Read{method}({ptr}, {offset})"))
            }
            SlotAccess::Structure { wrapper } => {
                format!("Marshal.PtrToStructure<{wrapper}>(IntPtr.Add({ptr}, {offset}))")
            }
        }
    }
}

/// Maps type-graph nodes to value, transfer and default-value spellings.
#[derive(Debug, Clone)]
pub struct TypeMapper {
    target: TargetLayout,
    platform: PlatformProfile,
    transfer_suffix: String,
}

impl TypeMapper {
    pub fn new(
        target: TargetLayout,
        platform: PlatformProfile,
        transfer_suffix: impl Into<String>,
    ) -> Self {
        Self {
            target,
            platform,
            transfer_suffix: transfer_suffix.into(),
        }
    }

    pub fn target(&self) -> TargetLayout {
        self.target
    }

    pub fn platform(&self) -> PlatformProfile {
        self.platform
    }

    // --- names ---

    pub fn value_name(&self, name: &ScopedName) -> String {
        name.dotted()
    }

    pub fn transfer_name(&self, name: &ScopedName) -> String {
        format!("{}{}", name.dotted(), self.transfer_suffix)
    }

    /// Unqualified transfer name, used in declarations.
    pub fn transfer_short_name(&self, name: &ScopedName) -> String {
        format!("{}{}", name.short(), self.transfer_suffix)
    }

    // --- value representation ---

    /// C# type of the value-object property.
    pub fn value_type(&self, node: &TypeNode, site: Site<'_>) -> GenResult<String> {
        match node.resolve() {
            Resolved::Primitive(kind) => Ok(primitive_value_type(kind).to_string()),
            Resolved::String(_) => Ok("string".to_string()),
            Resolved::Enum(e) => Ok(self.value_name(&e.name)),
            Resolved::Struct(s) => Ok(self.value_name(&s.name)),
            Resolved::Union(u) => Err(site.union(u)),
            Resolved::Array(shape) => {
                check_dims(&shape, site)?;
                let element = self.value_type(shape.element, site)?;
                Ok(format!("{element}{}", self.rank_suffix(shape.rank())))
            }
            Resolved::Sequence(shape) => {
                let element = self.value_type(shape.element, site)?;
                Ok(format!("IList<{element}>"))
            }
        }
    }

    /// Initial value assigned by the value-object constructor.
    ///
    /// Arrays that also need per-element initialization (jagged rows,
    /// strings, structs) get it from the emitter; see
    /// [`TypeMapper::needs_element_init`].
    pub fn default_value_expr(&self, node: &TypeNode, site: Site<'_>) -> GenResult<String> {
        match node.resolve() {
            Resolved::Primitive(kind) => Ok(primitive_default(kind).to_string()),
            Resolved::String(_) => Ok("string.Empty".to_string()),
            Resolved::Enum(e) => Ok(format!("default({})", self.value_name(&e.name))),
            Resolved::Struct(s) => Ok(format!("new {}()", self.value_name(&s.name))),
            Resolved::Union(u) => Err(site.union(u)),
            Resolved::Array(shape) => {
                check_dims(&shape, site)?;
                let element = self.value_type(shape.element, site)?;
                Ok(self.array_allocation(&element, &shape.dims))
            }
            Resolved::Sequence(shape) => {
                let element = self.value_type(shape.element, site)?;
                Ok(sequence_allocation(&element, &shape))
            }
        }
    }

    /// `new T[2, 3]` (rectangular) or `new T[2][]` (jagged, outer level only).
    pub fn array_allocation(&self, element: &str, dims: &[u32]) -> String {
        match self.target {
            TargetLayout::Rectangular => {
                let dims: Vec<String> = dims.iter().map(u32::to_string).collect();
                format!("new {element}[{}]", dims.join(", "))
            }
            TargetLayout::Jagged => {
                let outer = dims.first().copied().unwrap_or_default();
                let inner = "[]".repeat(dims.len().saturating_sub(1));
                format!("new {element}[{outer}]{inner}")
            }
        }
    }

    /// Whether an array default needs loops after its allocation.
    pub fn needs_element_init(&self, shape: &ArrayShape<'_>) -> bool {
        let jagged_rows = self.target == TargetLayout::Jagged && shape.is_multi_dimensional();
        let reference_elements = matches!(
            shape.element.resolve(),
            Resolved::String(_) | Resolved::Struct(_)
        );
        jagged_rows || reference_elements
    }

    /// Element access on the value side: `a[i0, i1]` or `a[i0][i1]`.
    pub fn value_index(&self, base: &str, indices: &[String]) -> String {
        match self.target {
            TargetLayout::Rectangular => format!("{base}[{}]", indices.join(", ")),
            TargetLayout::Jagged => {
                let parts: Vec<String> = indices.iter().map(|i| format!("[{i}]")).collect();
                format!("{base}{}", parts.concat())
            }
        }
    }

    fn rank_suffix(&self, rank: usize) -> String {
        match self.target {
            TargetLayout::Rectangular => format!("[{}]", ",".repeat(rank.saturating_sub(1))),
            TargetLayout::Jagged => "[]".repeat(rank),
        }
    }

    // --- transfer representation ---

    /// C# type of the transfer-struct field.
    pub fn transfer_type(&self, node: &TypeNode, site: Site<'_>) -> GenResult<String> {
        match node.resolve() {
            Resolved::Primitive(kind) => Ok(self.primitive_transfer_type(kind).to_string()),
            Resolved::String(_) | Resolved::Sequence(_) => Ok("IntPtr".to_string()),
            Resolved::Enum(e) => Ok(self.transfer_name(&e.name)),
            Resolved::Struct(s) => Ok(self.transfer_name(&s.name)),
            Resolved::Union(u) => Err(site.union(u)),
            Resolved::Array(shape) => {
                let element = self.classify_element(shape.element, "array", site)?;
                match self.array_transfer(&shape, element, site)? {
                    ArrayTransfer::Inline { .. } => {
                        Ok(format!("{}[]", self.element_transfer_type(element)))
                    }
                    ArrayTransfer::OutOfLine { .. } => Ok("IntPtr".to_string()),
                }
            }
        }
    }

    /// `[MarshalAs(...)]` attribute for the transfer-struct field, if any.
    pub fn transfer_attribute(&self, node: &TypeNode, site: Site<'_>) -> GenResult<Option<String>> {
        match node.resolve() {
            Resolved::Primitive(kind) => Ok(self
                .unmanaged_subtype(kind)
                .map(|sub| format!("[MarshalAs(UnmanagedType.{sub})]"))),
            Resolved::Union(u) => Err(site.union(u)),
            Resolved::Array(shape) => {
                let element = self.classify_element(shape.element, "array", site)?;
                match self.array_transfer(&shape, element, site)? {
                    ArrayTransfer::Inline { length } => {
                        let subtype = match element {
                            Element::Primitive(kind) => self.unmanaged_subtype(kind),
                            _ => None,
                        };
                        Ok(Some(match subtype {
                            Some(sub) => format!(
                                "[MarshalAs(UnmanagedType.ByValArray, SizeConst = {length}, ArraySubType = UnmanagedType.{sub})]"
                            ),
                            None => format!(
                                "[MarshalAs(UnmanagedType.ByValArray, SizeConst = {length})]"
                            ),
                        }))
                    }
                    ArrayTransfer::OutOfLine { .. } => Ok(None),
                }
            }
            Resolved::String(_)
            | Resolved::Enum(_)
            | Resolved::Struct(_)
            | Resolved::Sequence(_) => Ok(None),
        }
    }

    /// Inline flattened array, except rank > 1 struct arrays which the two
    /// target layouts cannot agree on and therefore go out of line.
    pub fn array_transfer(
        &self,
        shape: &ArrayShape<'_>,
        element: Element<'_>,
        site: Site<'_>,
    ) -> GenResult<ArrayTransfer> {
        let length = check_dims(shape, site)?;
        if shape.is_multi_dimensional() && matches!(element, Element::Struct(_)) {
            Ok(ArrayTransfer::OutOfLine { length })
        } else {
            Ok(ArrayTransfer::Inline { length })
        }
    }

    pub fn primitive_transfer_type(&self, kind: PrimitiveKind) -> &'static str {
        match kind {
            PrimitiveKind::LongDouble => "double",
            PrimitiveKind::WChar if self.platform == PlatformProfile::Linux => "uint",
            other => primitive_value_type(other),
        }
    }

    fn unmanaged_subtype(&self, kind: PrimitiveKind) -> Option<&'static str> {
        match kind {
            PrimitiveKind::Bool | PrimitiveKind::Char => Some("I1"),
            PrimitiveKind::WChar if self.platform == PlatformProfile::Windows => Some("U2"),
            _ => None,
        }
    }

    pub fn element_value_type(&self, element: Element<'_>) -> String {
        match element {
            Element::Primitive(kind) => primitive_value_type(kind).to_string(),
            Element::String(_) => "string".to_string(),
            Element::Enum(e) => self.value_name(&e.name),
            Element::Struct(s) => self.value_name(&s.name),
        }
    }

    pub fn element_transfer_type(&self, element: Element<'_>) -> String {
        match element {
            Element::Primitive(kind) => self.primitive_transfer_type(kind).to_string(),
            Element::String(_) => "IntPtr".to_string(),
            Element::Enum(e) => self.transfer_name(&e.name),
            Element::Struct(s) => self.transfer_name(&s.name),
        }
    }

    /// Classify a collection element, rejecting unions and nested collections.
    pub fn classify_element<'a>(
        &self,
        node: &'a TypeNode,
        container: &'static str,
        site: Site<'_>,
    ) -> GenResult<Element<'a>> {
        match node.resolve() {
            Resolved::Primitive(kind) => Ok(Element::Primitive(kind)),
            Resolved::String(kind) => Ok(Element::String(kind)),
            Resolved::Enum(e) => Ok(Element::Enum(e)),
            Resolved::Struct(s) => Ok(Element::Struct(s)),
            Resolved::Union(u) => Err(site.union(u)),
            Resolved::Array(_) | Resolved::Sequence(_) => {
                Err(site.unsupported_element(node, container))
            }
        }
    }

    // --- conversions across the boundary ---

    /// Value -> transfer conversion of a scalar primitive.
    pub fn primitive_to_transfer(&self, kind: PrimitiveKind, expr: &str) -> String {
        match kind {
            PrimitiveKind::LongDouble => format!("(double){expr}"),
            PrimitiveKind::WChar if self.platform == PlatformProfile::Linux => {
                format!("(uint){expr}")
            }
            _ => expr.to_string(),
        }
    }

    /// Transfer -> value conversion of a scalar primitive.
    pub fn primitive_from_transfer(&self, kind: PrimitiveKind, expr: &str) -> String {
        match kind {
            PrimitiveKind::LongDouble => format!("(decimal){expr}"),
            PrimitiveKind::WChar if self.platform == PlatformProfile::Linux => {
                format!("(char){expr}")
            }
            _ => expr.to_string(),
        }
    }

    /// Whether value and transfer spellings of a primitive are identical,
    /// which allows bulk `Array.Copy`.
    pub fn primitive_is_direct(&self, kind: PrimitiveKind) -> bool {
        primitive_value_type(kind) == self.primitive_transfer_type(kind)
    }

    pub fn enum_to_transfer(&self, e: &EnumType, expr: &str) -> String {
        format!("({}){expr}", self.transfer_name(&e.name))
    }

    pub fn enum_from_transfer(&self, e: &EnumType, expr: &str) -> String {
        format!("({}){expr}", self.value_name(&e.name))
    }

    /// Expression allocating a native copy of a managed string.
    pub fn string_to_native(&self, kind: StringKind, expr: &str) -> String {
        let text = format!("{expr} ?? string.Empty");
        match (kind, self.platform) {
            (StringKind::Narrow, _) => format!("Marshal.StringToHGlobalAnsi({text})"),
            (StringKind::Wide, PlatformProfile::Windows) => {
                format!("Marshal.StringToHGlobalUni({text})")
            }
            (StringKind::Wide, PlatformProfile::Linux) => {
                format!("MarshalHelper.StringToHGlobalUtf32({text})")
            }
        }
    }

    /// Expression reading a native string handle, null -> `string.Empty`.
    pub fn string_from_native(&self, kind: StringKind, handle: &str) -> String {
        let read = match (kind, self.platform) {
            (StringKind::Narrow, _) => format!("Marshal.PtrToStringAnsi({handle})"),
            (StringKind::Wide, PlatformProfile::Windows) => {
                format!("Marshal.PtrToStringUni({handle})")
            }
            (StringKind::Wide, PlatformProfile::Linux) => {
                format!("MarshalHelper.PtrToStringUtf32({handle})")
            }
        };
        format!("{handle} != IntPtr.Zero ? {read} : string.Empty")
    }

    /// Slot layout of one element inside an out-of-line sequence or array buffer.
    pub fn native_slot(&self, element: Element<'_>) -> NativeSlot {
        match element {
            Element::Primitive(kind) => self.primitive_slot(kind),
            Element::String(_) => {
                integer_slot("IntPtr.Size", "IntPtr", Wrap::identity(), Wrap::identity())
            }
            Element::Enum(e) => integer_slot(
                "sizeof(int)",
                "Int32",
                Wrap::new("(int)", ""),
                Wrap::new(format!("({})", self.value_name(&e.name)), ""),
            ),
            Element::Struct(s) => {
                let wrapper = self.transfer_name(&s.name);
                NativeSlot {
                    size: format!("Marshal.SizeOf<{wrapper}>()"),
                    access: SlotAccess::Structure { wrapper },
                }
            }
        }
    }

    fn primitive_slot(&self, kind: PrimitiveKind) -> NativeSlot {
        let plain = Wrap::identity;
        match kind {
            PrimitiveKind::I8 => integer_slot(
                "1",
                "Byte",
                Wrap::new("unchecked((byte)", ")"),
                Wrap::new("unchecked((sbyte)", ")"),
            ),
            PrimitiveKind::U8 | PrimitiveKind::Octet => integer_slot("1", "Byte", plain(), plain()),
            PrimitiveKind::I16 => integer_slot("2", "Int16", plain(), plain()),
            PrimitiveKind::U16 => integer_slot(
                "2",
                "Int16",
                Wrap::new("unchecked((short)", ")"),
                Wrap::new("unchecked((ushort)", ")"),
            ),
            PrimitiveKind::I32 => integer_slot("4", "Int32", plain(), plain()),
            PrimitiveKind::U32 => integer_slot(
                "4",
                "Int32",
                Wrap::new("unchecked((int)", ")"),
                Wrap::new("unchecked((uint)", ")"),
            ),
            PrimitiveKind::I64 => integer_slot("8", "Int64", plain(), plain()),
            PrimitiveKind::U64 => integer_slot(
                "8",
                "Int64",
                Wrap::new("unchecked((long)", ")"),
                Wrap::new("unchecked((ulong)", ")"),
            ),
            PrimitiveKind::F32 => integer_slot(
                "4",
                "Int32",
                Wrap::new("BitConverter.SingleToInt32Bits(", ")"),
                Wrap::new("BitConverter.Int32BitsToSingle(", ")"),
            ),
            PrimitiveKind::F64 => integer_slot(
                "8",
                "Int64",
                Wrap::new("BitConverter.DoubleToInt64Bits(", ")"),
                Wrap::new("BitConverter.Int64BitsToDouble(", ")"),
            ),
            PrimitiveKind::LongDouble => integer_slot(
                "8",
                "Int64",
                Wrap::new("BitConverter.DoubleToInt64Bits((double)", ")"),
                Wrap::new("(decimal)BitConverter.Int64BitsToDouble(", ")"),
            ),
            PrimitiveKind::Bool => integer_slot(
                "1",
                "Byte",
                Wrap::new("(byte)(", " ? 1 : 0)"),
                Wrap::new("", " != 0"),
            ),
            PrimitiveKind::Char => integer_slot(
                "1",
                "Byte",
                Wrap::new("(byte)", ""),
                Wrap::new("(char)", ""),
            ),
            PrimitiveKind::WChar => match self.platform {
                PlatformProfile::Windows => integer_slot(
                    "2",
                    "Int16",
                    Wrap::new("(short)", ""),
                    Wrap::new("(char)", ""),
                ),
                PlatformProfile::Linux => integer_slot(
                    "4",
                    "Int32",
                    Wrap::new("(int)", ""),
                    Wrap::new("(char)", ""),
                ),
            },
        }
    }

    // --- wire codec ---

    /// Method-name stem of the codec runtime for a primitive.
    pub fn wire_tag(&self, kind: PrimitiveKind) -> &'static str {
        match kind {
            PrimitiveKind::I8 => "Int8",
            PrimitiveKind::U8 => "UInt8",
            PrimitiveKind::I16 => "Int16",
            PrimitiveKind::U16 => "UInt16",
            PrimitiveKind::I32 => "Int32",
            PrimitiveKind::U32 => "UInt32",
            PrimitiveKind::I64 => "Int64",
            PrimitiveKind::U64 => "UInt64",
            PrimitiveKind::F32 => "Float",
            PrimitiveKind::F64 => "Double",
            PrimitiveKind::LongDouble => "LongDouble",
            PrimitiveKind::Octet => "Octet",
            PrimitiveKind::Bool => "Bool",
            PrimitiveKind::Char => "Char",
            PrimitiveKind::WChar => "WChar",
        }
    }

    pub fn string_wire_tag(&self, kind: StringKind) -> &'static str {
        match kind {
            StringKind::Narrow => "String",
            StringKind::Wide => "WString",
        }
    }
}

fn integer_slot(size: &str, method: &'static str, encode: Wrap, decode: Wrap) -> NativeSlot {
    NativeSlot {
        size: size.to_string(),
        access: SlotAccess::Integer {
            method,
            encode,
            decode,
        },
    }
}

fn sequence_allocation(element: &str, shape: &SequenceShape<'_>) -> String {
    if shape.is_bounded() {
        format!("new List<{element}>({})", shape.max_bound)
    } else {
        format!("new List<{element}>()")
    }
}

/// Validate array dimensions and return the flattened element count.
pub fn check_dims(shape: &ArrayShape<'_>, site: Site<'_>) -> GenResult<u32> {
    if shape.dims.is_empty() || shape.dims.contains(&0) {
        return Err(site.invalid_dims(&shape.dims));
    }
    // SizeConst is an Int32 on the managed side.
    shape
        .element_count()
        .and_then(|count| u32::try_from(count).ok())
        .filter(|count| i32::try_from(*count).is_ok())
        .ok_or_else(|| site.invalid_dims(&shape.dims))
}

pub fn primitive_value_type(kind: PrimitiveKind) -> &'static str {
    match kind {
        PrimitiveKind::I8 => "sbyte",
        PrimitiveKind::U8 | PrimitiveKind::Octet => "byte",
        PrimitiveKind::I16 => "short",
        PrimitiveKind::U16 => "ushort",
        PrimitiveKind::I32 => "int",
        PrimitiveKind::U32 => "uint",
        PrimitiveKind::I64 => "long",
        PrimitiveKind::U64 => "ulong",
        PrimitiveKind::F32 => "float",
        PrimitiveKind::F64 => "double",
        PrimitiveKind::LongDouble => "decimal",
        PrimitiveKind::Bool => "bool",
        PrimitiveKind::Char | PrimitiveKind::WChar => "char",
    }
}

fn primitive_default(kind: PrimitiveKind) -> &'static str {
    match kind {
        PrimitiveKind::F32 => "0.0f",
        PrimitiveKind::F64 => "0.0",
        PrimitiveKind::LongDouble => "0m",
        PrimitiveKind::Bool => "false",
        PrimitiveKind::Char | PrimitiveKind::WChar => "'\\0'",
        _ => "0",
    }
}
