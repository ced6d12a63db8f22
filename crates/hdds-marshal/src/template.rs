// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Boilerplate splicing for distinguished type categories.
//!
//! A template is plain C# text with `<%NAME%>` markers. Substitution is an
//! ordered key -> value replacement with no escaping; markers that no key
//! matches are left in place.

use crate::config::{ConfigError, GeneratorConfig};
use crate::graph::ScopedName;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

/// Replace every `<%KEY%>` marker, in `substitutions` order.
pub fn splice(template: &str, substitutions: &[(&str, String)]) -> String {
    let mut text = template.to_string();
    for (key, value) in substitutions {
        text = text.replace(&format!("<%{key}%>"), value);
    }
    text
}

/// Marker names still present in `text`, in order of first appearance.
pub fn unresolved_placeholders(text: &str) -> Vec<String> {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    let marker = MARKER.get_or_init(|| {
        #[allow(clippy::expect_used)] // constant pattern
        Regex::new(r"<%([A-Za-z_][A-Za-z0-9_]*)%>").expect("valid placeholder pattern")
    });

    let mut names: Vec<String> = Vec::new();
    for capture in marker.captures_iter(text) {
        let name = capture[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Substitution values for one declaration.
pub fn substitutions(name: &ScopedName, sequence_suffix: &str) -> Vec<(&'static str, String)> {
    vec![
        ("SCOPED_METHOD", name.method_safe()),
        ("SCOPED", name.dotted()),
        ("TYPE", name.short().to_string()),
        ("SEQ", sequence_suffix.to_string()),
    ]
}

/// Template text for one category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryTemplates {
    pub values: Option<String>,
    pub transfers: Option<String>,
}

/// Category name -> template text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateSet {
    categories: BTreeMap<String, CategoryTemplates>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every template file named in `config`, resolving relative paths
    /// against `base_dir`.
    pub fn load(config: &GeneratorConfig, base_dir: &Path) -> Result<Self, ConfigError> {
        let mut set = Self::new();
        for (category, paths) in &config.templates {
            let read = |path: &Option<std::path::PathBuf>| -> Result<Option<String>, ConfigError> {
                match path {
                    Some(path) => {
                        let full = base_dir.join(path);
                        tracing::debug!("loading {} template {}", category, full.display());
                        Ok(Some(std::fs::read_to_string(full)?))
                    }
                    None => Ok(None),
                }
            };
            set.categories.insert(
                category.clone(),
                CategoryTemplates {
                    values: read(&paths.values)?,
                    transfers: read(&paths.transfers)?,
                },
            );
        }
        Ok(set)
    }

    #[must_use]
    pub fn with_category(
        mut self,
        category: impl Into<String>,
        templates: CategoryTemplates,
    ) -> Self {
        self.categories.insert(category.into(), templates);
        self
    }

    pub fn get(&self, category: &str) -> Option<&CategoryTemplates> {
        self.categories.get(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splice_replaces_all_known_markers() {
        let name = ScopedName::parse("Sensors::Imu::Sample");
        let text = splice(
            "class <%TYPE%><%SEQ%> : Seq<<%SCOPED%>> { void Take_<%SCOPED_METHOD%>() {} }",
            &substitutions(&name, "Seq"),
        );
        assert_eq!(
            text,
            "class SampleSeq : Seq<Sensors.Imu.Sample> { void Take_Sensors_Imu_Sample() {} }"
        );
    }

    #[test]
    fn test_unknown_markers_are_left_untouched() {
        let name = ScopedName::parse("A::B");
        let text = splice(
            "<%TYPE%> <%UNKNOWN%> <%UNKNOWN%> <%OTHER%>",
            &substitutions(&name, "Seq"),
        );
        assert_eq!(text, "B <%UNKNOWN%> <%UNKNOWN%> <%OTHER%>");
        assert_eq!(unresolved_placeholders(&text), vec!["UNKNOWN", "OTHER"]);
    }

    #[test]
    fn test_substitution_is_not_escaped() {
        let text = splice("<%X%>", &[("X", "\"quoted\" <%Y%>".to_string()), ("Y", "y".into())]);
        assert_eq!(text, "\"quoted\" y");
    }

    #[test]
    fn test_load_reads_relative_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("topic.cs.tmpl"), "// <%TYPE%>\n").expect("write");
        let config = GeneratorConfig::from_yaml_str(
            "templates:\n  topic:\n    values: topic.cs.tmpl\n",
        )
        .expect("config");
        let set = TemplateSet::load(&config, dir.path()).expect("load");
        let topic = set.get("topic").expect("topic");
        assert_eq!(topic.values.as_deref(), Some("// <%TYPE%>\n"));
        assert!(topic.transfers.is_none());
    }
}
