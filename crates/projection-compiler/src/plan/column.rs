//! Column plan compiler.
//!
//! Lowers an `object[]` mapping into an ordered list of column accessors.
//! Row building evaluates each accessor once, in order, into a pre-sized
//! row.

use std::fmt;

use crate::diagnostic::Result;
use crate::exec::ExecContext;
use crate::ir::{ColumnKind, Mapping};
use crate::shape::{ScalarType, Value};

use super::json::{JsonCompiler, JsonPlan};
use super::source::{FieldBinder, ValueSource};
use super::Scopes;

/// How one column's value is produced.
#[derive(Debug, Clone)]
pub enum ColumnValue {
    Scalar(ValueSource),
    /// An embedded JSON document, rendered to a string per row.
    Json(JsonPlan),
}

/// A compiled column.
#[derive(Debug, Clone)]
pub struct CompiledColumn {
    name: String,
    value_type: ScalarType,
    value: ColumnValue,
}

impl CompiledColumn {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type of the column (`string` for JSON columns).
    pub fn value_type(&self) -> ScalarType {
        self.value_type
    }

    pub fn value(&self) -> &ColumnValue {
        &self.value
    }

    #[inline]
    pub(crate) fn evaluate(&self, cx: &ExecContext<'_>) -> Value {
        match &self.value {
            ColumnValue::Scalar(source) => source.evaluate(cx),
            ColumnValue::Json(plan) => Value::String(plan.render(cx)),
        }
    }
}

/// A compiled row mapping.
#[derive(Debug, Clone)]
pub struct ColumnPlan {
    names: Vec<String>,
    columns: Vec<CompiledColumn>,
}

impl ColumnPlan {
    /// Column names, aligned with every row this plan builds.
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn column_types(&self) -> impl Iterator<Item = ScalarType> + '_ {
        self.columns.iter().map(|column| column.value_type)
    }

    pub fn columns(&self) -> &[CompiledColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Builds one row for an execution context.
    pub fn build_row(&self, cx: &ExecContext<'_>) -> Vec<Value> {
        crate::exec::row::build_row(&self.columns, cx)
    }
}

impl fmt::Display for ColumnPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, column) in self.columns.iter().enumerate() {
            match &column.value {
                ColumnValue::Scalar(source) => {
                    writeln!(f, "{:>4} {} {} <- {}", index, column.name, column.value_type, source)?
                }
                ColumnValue::Json(plan) => {
                    writeln!(f, "{:>4} {} json <- {} ops", index, column.name, plan.ops().len())?
                }
            }
        }
        Ok(())
    }
}

/// Compiles row mappings into [`ColumnPlan`]s.
pub struct ColumnCompiler<'c> {
    binder: &'c FieldBinder<'c>,
}

impl<'c> ColumnCompiler<'c> {
    pub(crate) fn new(binder: &'c FieldBinder<'c>) -> Self {
        Self { binder }
    }

    /// Compiles every column. Any column that fails fails the whole plan.
    pub fn compile(&self, scopes: &Scopes, mapping: &Mapping) -> Result<ColumnPlan> {
        let json = JsonCompiler::new(self.binder);
        let mut columns = Vec::with_capacity(mapping.columns.len());

        for spec in &mapping.columns {
            let column = match &spec.kind {
                ColumnKind::Scalar { source, value_type } => CompiledColumn {
                    name: spec.name.clone(),
                    value_type: *value_type,
                    value: ColumnValue::Scalar(self.binder.scalar(
                        scopes,
                        source,
                        Some(*value_type),
                        &spec.path.child("source"),
                    )?),
                },
                ColumnKind::Json { fields } => CompiledColumn {
                    name: spec.name.clone(),
                    value_type: ScalarType::String,
                    value: ColumnValue::Json(json.compile(scopes, fields)?),
                },
            };
            columns.push(column);
        }

        Ok(ColumnPlan {
            names: columns.iter().map(|column| column.name.clone()).collect(),
            columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CompilerConfig, MappingDocument};
    use crate::diagnostic::CompileError;
    use crate::frontend::parse_mapping;
    use crate::shape::{Shape, ShapeBuilder, ShapeId, ShapeRegistry};
    use serde_json::json;

    struct Event;

    struct Record {
        id: i64,
    }

    impl Shape for Event {
        fn describe(_shape: &mut ShapeBuilder<Self>) {}
    }

    impl Shape for Record {
        fn describe(shape: &mut ShapeBuilder<Self>) {
            shape.field("Id", |r| r.id);
        }
    }

    fn compile_with(config: CompilerConfig, items: serde_json::Value) -> Result<ColumnPlan> {
        let registry = ShapeRegistry::new().with::<Event>().with::<Record>();
        let binder = FieldBinder::new(&registry, &config);
        let doc = MappingDocument::from_value(json!({ "format": "object[]", "items": items }));
        let mapping = parse_mapping(&doc.root())?;
        let scopes = Scopes::new(ShapeId::of::<Event>(), ShapeId::of::<Record>());
        ColumnCompiler::new(&binder).compile(&scopes, &mapping)
    }

    fn compile(items: serde_json::Value) -> Result<ColumnPlan> {
        compile_with(CompilerConfig::default(), items)
    }

    #[test]
    fn test_constants_are_parsed_at_compile_time() {
        let plan = compile(json!({
            "n": { "source": "const.42", "type": "int" },
            "s": { "source": "const.42", "type": "string" }
        }))
        .unwrap();

        let record = Record { id: 1 };
        let cx = ExecContext::new(&Event, &record);
        assert_eq!(
            plan.build_row(&cx),
            vec![Value::Int(42), Value::String("42".to_string())]
        );
    }

    #[test]
    fn test_unparsable_constant_fails() {
        let err = compile(json!({ "n": { "source": "const.abc", "type": "int" } })).unwrap_err();
        match err {
            CompileError::TypeCoercionFailure { declared, actual, .. } => {
                assert_eq!(declared, "int");
                assert_eq!(actual, "literal 'abc'");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_coercions_follow_config() {
        let items = json!({
            "text": { "source": "record.Id", "type": "string" },
            "amount": { "source": "record.Id", "type": "decimal" }
        });
        let plan = compile(items.clone()).unwrap();
        assert_eq!(
            plan.column_types().collect::<Vec<_>>(),
            vec![ScalarType::String, ScalarType::Decimal]
        );

        let strict = CompilerConfig {
            string_coercion: false,
            decimal_from_int: true,
        };
        assert!(matches!(
            compile_with(strict, items.clone()),
            Err(CompileError::TypeCoercionFailure { .. })
        ));

        let no_decimal = CompilerConfig {
            string_coercion: true,
            decimal_from_int: false,
        };
        assert!(matches!(
            compile_with(no_decimal, items),
            Err(CompileError::TypeCoercionFailure { .. })
        ));
    }

    #[test]
    fn test_display_lists_columns() {
        let plan = compile(json!({
            "id": { "source": "record.Id", "type": "int" },
            "body": { "format": "json", "fields": { "id": "record.Id" } }
        }))
        .unwrap();
        assert_eq!(
            plan.to_string(),
            "   0 id int <- record.Id\n   1 body json <- 4 ops\n"
        );
    }
}
