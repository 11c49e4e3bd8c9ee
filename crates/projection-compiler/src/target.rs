//! Projection targets.
//!
//! A target pairs a compiled plan with where its output goes: a table for
//! row plans, an index for documents. Targets only describe output; handing
//! batches and documents to a store is the caller's job.
//!
//! ```json
//! { "table": "samples", "format": "object[]", "items": { ... } }
//! { "index": "samples", "format": "json", "id": "record.Id", "fields": { ... } }
//! ```

use std::any::Any;
use std::fmt;

use serde::Serialize;

use crate::compiler::PlanCompiler;
use crate::config::ConfigSection;
use crate::diagnostic::{CompileError, Result};
use crate::exec::{DocumentPlan, FieldPlan, RowPlan};
use crate::ir::OutputFormat;
use crate::shape::Value;

// =============================================================================
// Tables
// =============================================================================

/// Rows for a bulk columnar loader.
pub struct TableTarget<E, R> {
    table: String,
    plan: RowPlan<E, R>,
}

impl<E, R> fmt::Debug for TableTarget<E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableTarget")
            .field("table", &self.table)
            .field("plan", &self.plan)
            .finish()
    }
}

impl<E: Any, R: Any> TableTarget<E, R> {
    /// Compiles a table target. Requires `table` next to the row mapping.
    pub fn compile(compiler: &PlanCompiler, section: &ConfigSection<'_>) -> Result<Self> {
        let table = section.require_str("table")?.to_string();
        let plan = compiler.compile_columns(section)?;
        Ok(Self { table, plan })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn plan(&self) -> &RowPlan<E, R> {
        &self.plan
    }

    /// An empty batch with this target's table and columns.
    pub fn batch(&self) -> RowBatch {
        RowBatch {
            table: self.table.clone(),
            columns: self.plan.column_names().to_vec(),
            rows: Vec::new(),
        }
    }

    /// Builds one row and appends it to `batch`.
    pub fn append(&self, batch: &mut RowBatch, event: &E, record: &R) {
        batch.rows.push(self.plan.build_row(event, record));
    }
}

/// Rows bound for one table, aligned by position with `columns`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowBatch {
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl RowBatch {
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Takes the accumulated rows, keeping table and columns for reuse.
    pub fn drain(&mut self) -> Vec<Vec<Value>> {
        std::mem::take(&mut self.rows)
    }
}

// =============================================================================
// Indexes
// =============================================================================

/// Documents for a search or document store.
pub struct IndexTarget<E, R> {
    index: String,
    id: FieldPlan<E, R>,
    body: DocumentPlan<E, R>,
}

impl<E, R> fmt::Debug for IndexTarget<E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexTarget")
            .field("index", &self.index)
            .field("id", &self.id)
            .field("body", &self.body)
            .finish()
    }
}

impl<E: Any, R: Any> IndexTarget<E, R> {
    /// Compiles an index target from `index`, `id` and `fields`. A `format`,
    /// if present, must be `json`.
    pub fn compile(compiler: &PlanCompiler, section: &ConfigSection<'_>) -> Result<Self> {
        let index = section.require_str("index")?.to_string();

        if let Some(format) = section.optional_str("format")? {
            if OutputFormat::parse(format) != Some(OutputFormat::Json) {
                return Err(CompileError::unsupported_format(
                    &section.path().child("format"),
                    format,
                ));
            }
        }

        let id = compiler.compile_field(&section.require("id")?)?;
        let body = compiler.compile_json(&section.require("fields")?)?;
        Ok(Self { index, id, body })
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn plan(&self) -> &DocumentPlan<E, R> {
        &self.body
    }

    pub fn document(&self, event: &E, record: &R) -> Document {
        Document {
            index: self.index.clone(),
            id: self.id.evaluate(event, record),
            body: self.body.to_json_string(event, record),
        }
    }
}

/// One rendered document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub index: String,
    pub id: Value,
    /// JSON text of the document body.
    pub body: String,
}
