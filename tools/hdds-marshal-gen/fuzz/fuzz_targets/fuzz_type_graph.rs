// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fuzz target for the marshaling generator
//!
//! Feeds arbitrary bytes through the JSON type-graph loader and, when they
//! parse, through generation for every target and platform. Rejections must
//! come back as errors in the report, never as panics.

#![no_main]

use hdds_marshal::{Declaration, Generator, GeneratorConfig, PlatformProfile};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(declarations) = serde_json::from_slice::<Vec<Declaration>>(data) else {
        return;
    };

    for platform in [PlatformProfile::Windows, PlatformProfile::Linux] {
        let generator = Generator::new(GeneratorConfig::default().with_platform(platform));
        let report = generator.generate_all(&declarations);
        let _ = report.render_summary();
        for (_, unit) in report.output.targets() {
            let _ = unit.values_document();
            let _ = unit.transfers_document();
        }
    }
});
