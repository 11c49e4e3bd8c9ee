//! # Projection Compiler
//!
//! This crate compiles declarative projection mappings into executable plans.
//! A mapping describes how an `(event, record)` pair becomes either a flat
//! row of typed column values (for a bulk columnar loader) or a nested JSON
//! document (for a search or document store). It is compiled once and the
//! resulting plan is replayed for every incoming pair, with no further
//! parsing or field lookup.
//!
//! ## Architecture
//!
//! ```text
//! Mapping document (JSON)
//!        │
//!        ▼
//! ┌──────────────┐
//! │   Frontend   │  Classify nodes, split field references by scope
//! │ (config → IR)│
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │     Plan     │  Bind every field to an accessor, lower JSON to ops
//! │  (IR → plan) │◄─── AccessorResolver (ShapeRegistry / #[derive(Shape)])
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │  PlanCache   │  One plan per (event, record, path, format, columns)
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │     Exec     │  Rows: one pass over columns
//! │              │  JSON: one linear scan over ops
//! └──────────────┘
//! ```
//!
//! Every error is raised while compiling. A plan that compiled executes
//! without failing; only the caller's writer can return an error.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use projection_compiler::{MappingDocument, PlanCompiler, Shape, ShapeRegistry};
//!
//! #[derive(Shape)]
//! #[shape(rename_all = "PascalCase")]
//! struct Sample {
//!     sample_id: i64,
//!     name: String,
//! }
//!
//! let registry = ShapeRegistry::new().with::<SampleEvent>().with::<Sample>();
//! let compiler = PlanCompiler::new(registry);
//!
//! let doc = MappingDocument::from_path("mappings.json".as_ref())?;
//! let rows = compiler.compile_columns::<SampleEvent, Sample>(&doc.section("samples")?)?;
//! let row = rows.build_row(&event, &sample);
//! ```

// Lets the derive macro refer to `::projection_compiler` from inside this crate.
extern crate self as projection_compiler;

pub mod cache;
pub mod compiler;
pub mod config;
pub mod diagnostic;
pub mod exec;
pub mod frontend;
pub mod ir;
pub mod plan;
pub mod shape;
pub mod target;

pub use cache::{PlanCache, PlanKey};
pub use compiler::PlanCompiler;
pub use config::{CompilerConfig, ConfigSection, MappingDocument};
pub use diagnostic::{CompileError, ConfigPath, Result};
pub use exec::{DocumentPlan, ExecContext, FieldPlan, Plan, RowPlan};
pub use ir::{OutputFormat, Scope};
pub use plan::{ColumnPlan, JsonPlan, Op};
pub use shape::{
    Accessor, AccessorResolver, IntoValue, ScalarType, Shape, ShapeBuilder, ShapeId, ShapeRegistry,
    Value,
};
pub use target::{Document, IndexTarget, RowBatch, TableTarget};

/// Derives [`Shape`] for a struct with named fields.
///
/// ```rust,ignore
/// #[derive(Shape)]
/// #[shape(rename_all = "PascalCase")]
/// struct Sample {
///     sample_id: i64,
///     #[shape(items)]
///     attachments: Vec<Attachment>,
///     #[shape(object)]
///     owner: Option<Owner>,
///     #[shape(rename = "Label")]
///     display_name: String,
///     #[shape(skip)]
///     cache: Vec<u8>,
/// }
/// ```
pub use projection_compiler_macros::Shape;
