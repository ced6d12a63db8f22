// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use hdds_marshal::{
    AliasType, Declaration, Diagnostic, EnumType, Field, GenError, Generator, GeneratorConfig,
    PlatformProfile, PrimitiveKind, ScopedName, StructType, TargetLayout, TypeNode, UnionType,
};
use std::sync::Arc;

fn label() -> Arc<StructType> {
    Arc::new(StructType::new(
        "Robot::Label",
        vec![
            Field::new("text", TypeNode::NarrowString),
            Field::new("wide", TypeNode::WideString),
        ],
    ))
}

fn mode() -> Arc<EnumType> {
    Arc::new(EnumType::new("Robot::Mode", ["IDLE", "MOVING", "FAULT"]))
}

fn state() -> Arc<StructType> {
    Arc::new(StructType::new(
        "Robot::State",
        vec![
            Field::new("id", TypeNode::primitive(PrimitiveKind::U32)),
            Field::new("name", TypeNode::NarrowString),
            Field::new("mode", TypeNode::Enum(mode())),
            Field::new("tags", TypeNode::sequence(TypeNode::NarrowString, 4)),
            Field::new("label", TypeNode::Struct(label())),
            Field::new(
                "history",
                TypeNode::sequence(TypeNode::Struct(label()), 0),
            ),
            Field::new(
                "grid",
                TypeNode::array(TypeNode::primitive(PrimitiveKind::F32), vec![2, 3, 4]),
            ),
            Field::new("names", TypeNode::array(TypeNode::WideString, vec![2, 2])),
            Field::new("precise", TypeNode::primitive(PrimitiveKind::LongDouble)),
        ],
    ))
}

fn declarations() -> Vec<Declaration> {
    vec![
        Declaration::Enum(mode()),
        Declaration::Struct(label()),
        Declaration::Alias(Arc::new(AliasType {
            name: ScopedName::parse("Robot::Meters"),
            target: TypeNode::primitive(PrimitiveKind::F64),
        })),
        Declaration::Struct(Arc::new(StructType::new(
            "Robot::Pose",
            vec![
                Field::new("x", TypeNode::primitive(PrimitiveKind::F64)),
                Field::new("y", TypeNode::primitive(PrimitiveKind::F64)),
            ],
        ))),
    ]
}

/// Text between `start` and the next occurrence of `end`.
fn section<'a>(text: &'a str, start: &str, end: &str) -> &'a str {
    let from = text.find(start).expect("section start");
    let rest = &text[from..];
    let to = rest.find(end).expect("section end");
    &rest[..to]
}

fn allocation_sites(text: &str) -> usize {
    text.matches("AllocHGlobal(").count() + text.matches("StringToHGlobal").count()
}

fn jagged_only() -> Generator {
    Generator::new(GeneratorConfig::default().with_targets(vec![TargetLayout::Jagged]))
}

#[test]
fn test_generation_is_idempotent() {
    let generator = Generator::new(GeneratorConfig::default());
    let first = generator.generate_all(&declarations());
    let second = generator.generate_all(&declarations());

    assert!(first.is_success());
    assert_eq!(first.output, second.output);
    for (target, unit) in first.output.targets() {
        let again = second.output.get(target).expect("target present");
        assert_eq!(unit.values_document(), again.values_document());
        assert_eq!(unit.transfers_document(), again.transfers_document());
    }
}

#[test]
fn test_batch_reports_aliases_as_skipped() {
    let report = jagged_only().generate_all(&declarations());
    assert_eq!(report.emitted, vec!["Robot::Mode", "Robot::Label", "Robot::Pose"]);
    assert_eq!(report.skipped, vec!["Robot::Meters"]);
}

#[test]
fn test_every_allocation_is_recorded_for_release() {
    let out = jagged_only()
        .emit_declaration(&Declaration::Struct(state()))
        .expect("state generates");
    let values = &out.targets[&TargetLayout::Jagged].values;

    let to_native = section(values, "internal void ToNative", "internal void FromNative");
    let allocations = allocation_sites(to_native);
    // name, tags buffer + elements, history buffer, names elements
    assert_eq!(allocations, 5);
    assert_eq!(to_native.matches("toRelease.Add(").count(), allocations);

    let release = section(values, "internal static void ReleaseNative", "#endregion");
    assert_eq!(release.matches("Marshal.FreeHGlobal(").count(), 1);
    assert!(release.contains("toRelease.Clear();"));
    assert!(release.contains("Robot.Label.ReleaseNative(ref wrapper.label, toRelease);"));

    let nested = jagged_only()
        .emit_declaration(&Declaration::Struct(label()))
        .expect("label generates");
    let nested_values = &nested.targets[&TargetLayout::Jagged].values;
    let nested_to_native = section(
        nested_values,
        "internal void ToNative",
        "internal void FromNative",
    );
    assert_eq!(allocation_sites(nested_to_native), 2);
    assert_eq!(nested_to_native.matches("toRelease.Add(").count(), 2);
}

#[test]
fn test_bounded_sequence_is_clamped_in_both_directions() {
    let out = jagged_only()
        .emit_declaration(&Declaration::Struct(state()))
        .expect("state generates");
    let values = &out.targets[&TargetLayout::Jagged].values;

    assert!(values.contains("int count = this.tags == null ? 0 : Math.Min(this.tags.Count, 4);"));
    assert!(values.contains("int count = Math.Min(Marshal.ReadInt32(wrapper.tags, 0), 4);"));
    assert!(values.contains("this.tags = new List<string>(4);"));
    assert!(values.contains("int count = this.history == null ? 0 : this.history.Count;"));
}

#[test]
fn test_three_dimensional_array_loops_use_literal_bounds() {
    let out = jagged_only()
        .emit_declaration(&Declaration::Struct(state()))
        .expect("state generates");
    let values = &out.targets[&TargetLayout::Jagged].values;
    let from_native = section(
        values,
        "internal void FromNative",
        "internal static void ReleaseNative",
    );

    let grid = section(from_native, "this.grid = ", "this.names = ");
    let headers: Vec<&str> = grid
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("for "))
        .collect();
    assert_eq!(
        headers,
        vec![
            "for (int i0 = 0; i0 < 2; ++i0)",
            "for (int i1 = 0; i1 < 3; ++i1)",
            "for (int i2 = 0; i2 < 4; ++i2)",
        ]
    );
    assert!(grid.contains("this.grid[i0] = new float[3][];"));
    assert!(grid.contains("this.grid[i0][i1] = new float[4];"));
    assert!(grid.contains("this.grid[i0][i1][i2] = wrapper.grid[(i0 * 12) + (i1 * 4) + i2];"));

    let transfers = &out.targets[&TargetLayout::Jagged].transfers;
    assert!(transfers.contains("[MarshalAs(UnmanagedType.ByValArray, SizeConst = 24)]"));
    assert!(transfers.contains("public float[] grid;"));
}

#[test]
fn test_long_double_reports_precision_loss() {
    let out = jagged_only()
        .emit_declaration(&Declaration::Struct(state()))
        .expect("state generates");
    assert_eq!(
        out.diagnostics,
        vec![Diagnostic::ExtendedPrecisionLoss {
            declaration: "Robot::State".into(),
            field: "precise".into(),
        }]
    );
}

#[test]
fn test_union_declaration_is_rejected_without_output() {
    let generator = Generator::new(GeneratorConfig::default());
    let union = Arc::new(UnionType {
        name: ScopedName::parse("Robot::Command"),
        branches: vec![Field::new("stop", TypeNode::primitive(PrimitiveKind::Bool))],
    });
    let report = generator.generate_all(&[Declaration::Union(union)]);
    assert!(matches!(
        report.failures.as_slice(),
        [GenError::UnsupportedTypeConstruct { .. }]
    ));
    assert!(report
        .output
        .targets()
        .all(|(_, unit)| unit.values.is_empty() && unit.transfers.is_empty()));
}

#[test]
fn test_wire_codec_rejects_sequence_of_structs() {
    let err = jagged_only()
        .emit_declaration(&Declaration::Struct(Arc::new(
            StructType::new(
                "Robot::Log",
                vec![Field::new("entries", TypeNode::sequence(TypeNode::Struct(label()), 8))],
            )
            .with_category("topic"),
        )))
        .unwrap_err();
    assert!(matches!(
        err,
        GenError::UnsupportedNestedAggregateInWireCodec { ref field, .. } if field == "entries"
    ));

    // Nested aggregates are fine once the codec is off.
    let generator = Generator::new(
        GeneratorConfig::default()
            .with_targets(vec![TargetLayout::Jagged])
            .with_wire_codec(false),
    );
    let topic = Arc::new(StructType::clone(&state()).with_category("topic"));
    assert!(generator.emit_declaration(&Declaration::Struct(topic)).is_ok());
}

#[test]
fn test_enum_sequence_depends_on_target_layout() {
    let holder = Declaration::Struct(Arc::new(StructType::new(
        "Robot::Plan",
        vec![Field::new("steps", TypeNode::sequence(TypeNode::Enum(mode()), 0))],
    )));

    let rect = Generator::new(
        GeneratorConfig::default().with_targets(vec![TargetLayout::Rectangular]),
    );
    assert!(matches!(
        rect.emit_declaration(&holder),
        Err(GenError::UnsupportedEnumSequenceTarget {
            target: TargetLayout::Rectangular,
            ..
        })
    ));
    assert!(jagged_only().emit_declaration(&holder).is_ok());
}

#[test]
fn test_wide_strings_follow_platform_profile() {
    let decl = Declaration::Struct(label());
    let windows = Generator::new(
        GeneratorConfig::default()
            .with_targets(vec![TargetLayout::Jagged])
            .with_platform(PlatformProfile::Windows),
    );
    let linux = jagged_only();

    let win = windows.emit_declaration(&decl).expect("windows");
    let lin = linux.emit_declaration(&decl).expect("linux");
    assert!(win.targets[&TargetLayout::Jagged]
        .values
        .contains("Marshal.StringToHGlobalUni(this.wide ?? string.Empty)"));
    assert!(lin.targets[&TargetLayout::Jagged]
        .values
        .contains("MarshalHelper.StringToHGlobalUtf32(this.wide ?? string.Empty)"));
}

#[test]
fn test_rectangular_struct_grid_uses_out_of_line_buffer() {
    let decl = Declaration::Struct(Arc::new(StructType::new(
        "Robot::Map",
        vec![Field::new("cells", TypeNode::array(TypeNode::Struct(label()), vec![3, 3]))],
    )));
    let out = Generator::new(GeneratorConfig::default())
        .emit_declaration(&decl)
        .expect("map generates");

    for target in TargetLayout::ALL {
        let unit = &out.targets[&target];
        assert!(unit.transfers.contains("public IntPtr cells;"));
        assert!(unit.values.contains("wrapper.cells = Marshal.AllocHGlobal(size * 9);"));
    }
    assert!(out.targets[&TargetLayout::Rectangular]
        .values
        .contains("public Robot.Label[,] cells { get; set; }"));
    assert!(out.targets[&TargetLayout::Jagged]
        .values
        .contains("public Robot.Label[][] cells { get; set; }"));
}
