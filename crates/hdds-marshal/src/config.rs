// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Generator configuration.
//!
//! Resolved once per generator instance; nothing here changes while
//! declarations are being processed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Managed representation of multi-dimensional arrays.
///
/// The two layouts also differ in what their native sequence bridge can
/// carry: `Rectangular` has no enum sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetLayout {
    /// One contiguous block with compile-time rank (`T[,]`).
    Rectangular,
    /// Arrays of independently allocated arrays (`T[][]`).
    Jagged,
}

impl TargetLayout {
    pub const ALL: [TargetLayout; 2] = [TargetLayout::Rectangular, TargetLayout::Jagged];

    pub fn as_str(self) -> &'static str {
        match self {
            TargetLayout::Rectangular => "rectangular",
            TargetLayout::Jagged => "jagged",
        }
    }

    pub fn supports_enum_sequences(self) -> bool {
        matches!(self, TargetLayout::Jagged)
    }
}

impl fmt::Display for TargetLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Native platform the transfer structures are laid out for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformProfile {
    /// `wchar_t` is 2 bytes (UTF-16).
    Windows,
    /// `wchar_t` is 4 bytes (UTF-32).
    #[default]
    Linux,
}

impl PlatformProfile {
    pub fn wchar_width(self) -> u8 {
        match self {
            PlatformProfile::Windows => 2,
            PlatformProfile::Linux => 4,
        }
    }
}

/// Template files for one distinguished type category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplatePaths {
    /// Spliced after the value-object declaration.
    #[serde(default)]
    pub values: Option<PathBuf>,
    /// Spliced after the transfer-struct declaration.
    #[serde(default)]
    pub transfers: Option<PathBuf>,
}

/// Generator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub platform: PlatformProfile,

    /// One output buffer pair is produced per target.
    #[serde(default = "default_targets")]
    pub targets: Vec<TargetLayout>,

    /// Emit `Encode`/`Decode` for distinguished types.
    #[serde(default = "default_true")]
    pub wire_codec: bool,

    #[serde(default = "default_indent_width")]
    pub indent_width: usize,

    #[serde(default = "default_transfer_suffix")]
    pub transfer_suffix: String,

    /// Substituted for `<%SEQ%>` in templates.
    #[serde(default = "default_sequence_suffix")]
    pub sequence_suffix: String,

    #[serde(default = "default_loop_index_prefix")]
    pub loop_index_prefix: String,

    /// Category name -> template files, relative to the config file.
    #[serde(default)]
    pub templates: BTreeMap<String, TemplatePaths>,
}

fn default_targets() -> Vec<TargetLayout> {
    TargetLayout::ALL.to_vec()
}

fn default_true() -> bool {
    true
}

fn default_indent_width() -> usize {
    4
}

fn default_transfer_suffix() -> String {
    "Wrapper".to_string()
}

fn default_sequence_suffix() -> String {
    "Seq".to_string()
}

fn default_loop_index_prefix() -> String {
    "i".to_string()
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            platform: PlatformProfile::default(),
            targets: default_targets(),
            wire_codec: true,
            indent_width: default_indent_width(),
            transfer_suffix: default_transfer_suffix(),
            sequence_suffix: default_sequence_suffix(),
            loop_index_prefix: default_loop_index_prefix(),
            templates: BTreeMap::new(),
        }
    }
}

impl GeneratorConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_platform(mut self, platform: PlatformProfile) -> Self {
        self.platform = platform;
        self
    }

    #[must_use]
    pub fn with_targets(mut self, targets: impl Into<Vec<TargetLayout>>) -> Self {
        self.targets = targets.into();
        self
    }

    #[must_use]
    pub fn with_wire_codec(mut self, enabled: bool) -> Self {
        self.wire_codec = enabled;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::Invalid("No target layouts configured".into()));
        }
        for (i, target) in self.targets.iter().enumerate() {
            if self.targets[..i].contains(target) {
                return Err(ConfigError::Invalid(format!(
                    "Target layout {target} listed more than once"
                )));
            }
        }
        if self.indent_width == 0 {
            return Err(ConfigError::Invalid("indent_width must be positive".into()));
        }
        if self.transfer_suffix.is_empty() {
            return Err(ConfigError::Invalid("transfer_suffix must not be empty".into()));
        }
        if !is_identifier(&self.loop_index_prefix) {
            return Err(ConfigError::Invalid(format!(
                "loop_index_prefix {:?} is not an identifier",
                self.loop_index_prefix
            )));
        }
        Ok(())
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
