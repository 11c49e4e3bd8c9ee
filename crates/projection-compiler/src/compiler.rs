//! Plan compiler facade.
//!
//! [`PlanCompiler`] is the single entry point: it reads the declared format,
//! drives the frontend and the plan compilers, and owns the [`PlanCache`].
//!
//! ```text
//! ConfigSection ──► parse_format ──► object[] ──► compile_columns ──► RowPlan
//!                                                   │
//!       fields ─────────────────────────────────► compile_json ────► DocumentPlan
//!                                                   │
//!                                               PlanCache (get-or-compile)
//! ```

use std::any::Any;
use std::sync::Arc;

use crate::cache::{signature, CachedPlan, PlanCache, PlanKey};
use crate::config::{CompilerConfig, ConfigSection};
use crate::diagnostic::{CompileError, Result};
use crate::exec::{DocumentPlan, FieldPlan, Plan, RowPlan};
use crate::frontend;
use crate::ir::OutputFormat;
use crate::plan::{ColumnCompiler, FieldBinder, JsonCompiler, Scopes};
use crate::shape::{AccessorResolver, ShapeId};

/// Compiles mappings into executable plans, caching one plan per mapping
/// shape.
///
/// A compiler is cheap to share behind an `Arc`; every method takes `&self`.
pub struct PlanCompiler {
    resolver: Arc<dyn AccessorResolver>,
    config: CompilerConfig,
    cache: PlanCache,
}

impl PlanCompiler {
    pub fn new<R: AccessorResolver + 'static>(resolver: R) -> Self {
        Self::with_config(resolver, CompilerConfig::default())
    }

    pub fn with_config<R: AccessorResolver + 'static>(resolver: R, config: CompilerConfig) -> Self {
        Self {
            resolver: Arc::new(resolver),
            config,
            cache: PlanCache::new(),
        }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn cache(&self) -> &PlanCache {
        &self.cache
    }

    /// Compiles a mapping according to its top-level `format`.
    ///
    /// Only `object[]` is accepted here; a missing or different format is
    /// [`CompileError::UnsupportedFormat`].
    pub fn compile<E: Any, R: Any>(&self, section: &ConfigSection<'_>) -> Result<Plan<E, R>> {
        match frontend::parse_format(section)? {
            OutputFormat::Rows => Ok(Plan::Rows(self.compile_columns(section)?)),
            other => Err(CompileError::unsupported_format(
                &section.path().child("format"),
                other.as_str(),
            )),
        }
    }

    /// Compiles an `object[]` mapping into a row plan.
    pub fn compile_columns<E: Any, R: Any>(&self, section: &ConfigSection<'_>) -> Result<RowPlan<E, R>> {
        let format = frontend::parse_format(section)?;
        if format != OutputFormat::Rows {
            return Err(CompileError::unsupported_format(
                &section.path().child("format"),
                format.as_str(),
            ));
        }

        let key = PlanKey {
            event: ShapeId::of::<E>(),
            record: ShapeId::of::<R>(),
            path: section.path().clone(),
            format,
            signature: signature(frontend::column_names(section)?),
        };

        let cached = self.cache.get_or_compile(key, || {
            let mapping = frontend::parse_mapping(section)?;
            let binder = FieldBinder::new(&*self.resolver, &self.config);
            let plan = ColumnCompiler::new(&binder).compile(&self.scopes::<E, R>(), &mapping)?;
            tracing::debug!(
                path = %section.path(),
                event = ShapeId::of::<E>().name(),
                record = ShapeId::of::<R>().name(),
                columns = plan.len(),
                "compiled row plan"
            );
            Ok(CachedPlan::Rows(Arc::new(plan)))
        })?;

        match cached {
            CachedPlan::Rows(plan) => Ok(RowPlan::new(plan)),
            CachedPlan::Json(_) => Err(mismatched(section)),
        }
    }

    /// Compiles an object description (the `fields` of a JSON column or an
    /// index target) into a document plan.
    pub fn compile_json<E: Any, R: Any>(&self, fields: &ConfigSection<'_>) -> Result<DocumentPlan<E, R>> {
        let keys = fields.children()?;
        let key = PlanKey {
            event: ShapeId::of::<E>(),
            record: ShapeId::of::<R>(),
            path: fields.path().clone(),
            format: OutputFormat::Json,
            signature: signature(keys.iter().map(|(name, _)| *name)),
        };

        let cached = self.cache.get_or_compile(key, || {
            let spec = frontend::parse_object(fields)?;
            let binder = FieldBinder::new(&*self.resolver, &self.config);
            let plan = JsonCompiler::new(&binder).compile(&self.scopes::<E, R>(), &spec)?;
            tracing::debug!(
                path = %fields.path(),
                event = ShapeId::of::<E>().name(),
                record = ShapeId::of::<R>().name(),
                ops = plan.ops().len(),
                "compiled json plan"
            );
            Ok(CachedPlan::Json(Arc::new(plan)))
        })?;

        match cached {
            CachedPlan::Json(plan) => Ok(DocumentPlan::new(plan)),
            CachedPlan::Rows(_) => Err(mismatched(fields)),
        }
    }

    /// Compiles a single field reference. Not cached.
    pub fn compile_field<E: Any, R: Any>(&self, section: &ConfigSection<'_>) -> Result<FieldPlan<E, R>> {
        let reference = frontend::parse_field_ref(section)?;
        let binder = FieldBinder::new(&*self.resolver, &self.config);
        let source = binder.scalar(&self.scopes::<E, R>(), &reference, None, section.path())?;
        Ok(FieldPlan::new(source))
    }

    fn scopes<E: Any, R: Any>(&self) -> Scopes {
        Scopes::new(ShapeId::of::<E>(), ShapeId::of::<R>())
    }
}

impl std::fmt::Debug for PlanCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanCompiler")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

fn mismatched(section: &ConfigSection<'_>) -> CompileError {
    CompileError::invalid(section.path(), "cached plan has a different output format")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MappingDocument;
    use crate::shape::{Shape, ShapeBuilder, ShapeRegistry, Value};
    use serde_json::json;

    struct Event {
        kind: String,
    }

    struct Record {
        id: i64,
        name: String,
    }

    impl Shape for Event {
        fn describe(shape: &mut ShapeBuilder<Self>) {
            shape.field("Kind", |e| e.kind.clone());
        }
    }

    impl Shape for Record {
        fn describe(shape: &mut ShapeBuilder<Self>) {
            shape.field("Id", |r| r.id).field("Name", |r| r.name.clone());
        }
    }

    fn compiler() -> PlanCompiler {
        PlanCompiler::new(ShapeRegistry::new().with::<Event>().with::<Record>())
    }

    fn inputs() -> (Event, Record) {
        (
            Event {
                kind: "created".to_string(),
            },
            Record {
                id: 7,
                name: "seven".to_string(),
            },
        )
    }

    #[test]
    fn test_compile_dispatches_object_rows() {
        let doc = MappingDocument::from_value(json!({
            "rows": {
                "format": "object[]",
                "items": {
                    "id": { "source": "record.Id", "type": "int" },
                    "kind": { "source": "event.Kind", "type": "string" }
                }
            }
        }));
        let plan = compiler()
            .compile::<Event, Record>(&doc.section("rows").unwrap())
            .unwrap()
            .into_rows()
            .unwrap();

        let (event, record) = inputs();
        assert_eq!(plan.column_names(), ["id", "kind"]);
        assert_eq!(
            plan.build_row(&event, &record),
            vec![Value::Int(7), Value::String("created".to_string())]
        );
    }

    #[test]
    fn test_compile_rejects_missing_and_unknown_formats() {
        let doc = MappingDocument::from_value(json!({
            "missing": { "items": {} },
            "csv": { "format": "csv", "items": {} },
            "json": { "format": "json", "items": {} }
        }));
        let compiler = compiler();
        for name in ["missing", "csv", "json"] {
            let err = compiler
                .compile::<Event, Record>(&doc.section(name).unwrap())
                .unwrap_err();
            assert!(
                matches!(err, CompileError::UnsupportedFormat { .. }),
                "{}: {:?}",
                name,
                err
            );
        }
    }

    #[test]
    fn test_repeated_compiles_share_one_plan() {
        let doc = MappingDocument::from_value(json!({
            "format": "object[]",
            "items": { "id": { "source": "record.Id", "type": "int" } }
        }));
        let compiler = compiler();
        let first = compiler.compile_columns::<Event, Record>(&doc.root()).unwrap();
        let second = compiler.compile_columns::<Event, Record>(&doc.root()).unwrap();
        assert!(Arc::ptr_eq(first.plan(), second.plan()));
        assert_eq!(compiler.cache().len(), 1);
    }

    #[test]
    fn test_failed_compile_leaves_cache_empty() {
        let doc = MappingDocument::from_value(json!({
            "format": "object[]",
            "items": { "x": { "source": "record.DoesNotExist", "type": "string" } }
        }));
        let compiler = compiler();
        let err = compiler.compile_columns::<Event, Record>(&doc.root()).unwrap_err();
        assert!(matches!(err, CompileError::UnresolvableField { .. }));
        assert!(compiler.cache().is_empty());
    }

    #[test]
    fn test_compile_json_document() {
        let doc = MappingDocument::from_value(json!({
            "fields": { "id": "record.Id", "kind": "event.Kind", "tag": "const.v1" }
        }));
        let plan = compiler()
            .compile_json::<Event, Record>(&doc.section("fields").unwrap())
            .unwrap();
        let (event, record) = inputs();
        assert_eq!(
            plan.to_json_string(&event, &record),
            r#"{"id":7,"kind":"created","tag":"v1"}"#
        );
    }

    #[test]
    fn test_compile_field() {
        let doc = MappingDocument::from_value(json!({ "id": "record.Name" }));
        let field = compiler()
            .compile_field::<Event, Record>(&doc.section("id").unwrap())
            .unwrap();
        let (event, record) = inputs();
        assert_eq!(field.evaluate(&event, &record), Value::String("seven".to_string()));
    }
}
