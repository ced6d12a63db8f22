// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type-directed C# marshaling generator for HDDS IDL types.
//!
//! Given a type graph (structs, enums, typedefs, constants, fixed arrays and
//! sequences), the generator emits per declaration:
//!
//! - a managed value class,
//! - a sequential-layout transfer struct for the native boundary, with
//!   `ToNative` / `FromNative` / `ReleaseNative` conversions,
//! - `Encode` / `Decode` against the CDR runtime for distinguished types.
//!
//! # Example
//!
//! ```
//! use hdds_marshal::{
//!     Declaration, Field, Generator, GeneratorConfig, PrimitiveKind, StructType, TypeNode,
//! };
//! use std::sync::Arc;
//!
//! let point = StructType::new(
//!     "Geometry::Point",
//!     vec![
//!         Field::new("x", TypeNode::primitive(PrimitiveKind::F64)),
//!         Field::new("y", TypeNode::primitive(PrimitiveKind::F64)),
//!     ],
//! );
//! let report = Generator::new(GeneratorConfig::default())
//!     .generate_all(&[Declaration::Struct(Arc::new(point))]);
//! assert!(report.is_success());
//! ```

pub mod codec;
pub mod config;
pub mod context;
pub mod convert;
pub mod csharp;
pub mod emitter;
pub mod error;
pub mod graph;
pub mod loops;
pub mod mapper;
pub mod template;

pub use config::{ConfigError, GeneratorConfig, PlatformProfile, TargetLayout, TemplatePaths};
pub use context::{Direction, GenerationContext};
pub use emitter::{DeclarationOutput, GeneratedOutput, GenerationReport, Generator, TargetOutput};
pub use error::{Diagnostic, GenError, GenResult};
pub use graph::{
    AliasType, ConstDecl, ConstValue, Declaration, EnumType, Field, PrimitiveKind, ScopedName,
    StructType, TypeNode, UnionType,
};
pub use mapper::TypeMapper;
pub use template::{CategoryTemplates, TemplateSet};
