// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::path::Path;
use std::process::{Command, Output};

const TYPES: &str = r#"[
  { "enum": { "name": "Fleet::Status", "values": ["OK", "DEGRADED"] } },
  {
    "struct": {
      "name": "Fleet::Vehicle",
      "category": "topic",
      "fields": [
        { "name": "id", "type": { "primitive": "u32" } },
        { "name": "callsign", "type": "narrow_string" },
        { "name": "status", "type": { "enum": { "name": "Fleet::Status", "values": ["OK", "DEGRADED"] } } }
      ]
    }
  }
]"#;

const BAD_TYPES: &str = r#"[
  { "union": { "name": "Fleet::Command", "branches": [] } },
  { "enum": { "name": "Fleet::Status", "values": ["OK"] } }
]"#;

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_hdds-marshal-gen"))
}

fn run(args: &[&str], dir: &Path) -> Output {
    bin()
        .args(args)
        .current_dir(dir)
        .output()
        .expect("run hdds-marshal-gen")
}

#[test]
fn test_generate_writes_both_layouts() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("types.json"), TYPES).expect("write types");

    let output = run(&["generate", "--types", "types.json", "--out", "cs"], dir.path());
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    for target in ["rectangular", "jagged"] {
        let values = std::fs::read_to_string(dir.path().join("cs").join(target).join("Values.cs"))
            .expect("values written");
        let transfers =
            std::fs::read_to_string(dir.path().join("cs").join(target).join("Transfers.cs"))
                .expect("transfers written");
        assert!(values.contains("public partial class Vehicle"));
        assert!(values.contains("public void Encode(CdrWriter writer)"));
        assert!(transfers.contains("internal struct VehicleWrapper"));
        assert!(transfers.contains("internal enum StatusWrapper : int"));
    }
}

#[test]
fn test_config_selects_targets_and_templates() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("types.json"), TYPES).expect("write types");
    std::fs::create_dir_all(dir.path().join("conf/templates")).expect("mkdir");
    std::fs::write(
        dir.path().join("conf/templates/topic_values.cs.tmpl"),
        "public sealed class <%TYPE%>Reader : DataReader<<%SCOPED%>> { }\n",
    )
    .expect("write template");
    std::fs::write(
        dir.path().join("conf/marshal.yaml"),
        "platform: windows\ntargets: [jagged]\ntemplates:\n  topic:\n    values: templates/topic_values.cs.tmpl\n",
    )
    .expect("write config");

    let output = run(
        &["generate", "--types", "types.json", "--config", "conf/marshal.yaml", "--out", "cs"],
        dir.path(),
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(!dir.path().join("cs/rectangular").exists());

    let values = std::fs::read_to_string(dir.path().join("cs/jagged/Values.cs")).expect("values");
    assert!(values.contains("public sealed class VehicleReader : DataReader<Fleet.Vehicle> { }"));
}

#[test]
fn test_check_fails_on_rejected_declaration() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("bad.json"), BAD_TYPES).expect("write types");

    let output = run(&["check", "--types", "bad.json"], dir.path());
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Fleet::Command"));
    assert!(stdout.contains("Emitted:     1 declarations"));
}

#[test]
fn test_missing_types_file_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = run(&["check", "--types", "missing.json"], dir.path());
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read missing.json"));
}
