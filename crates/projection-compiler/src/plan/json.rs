//! JSON sub-plan compiler.
//!
//! An object description is lowered into a flat sequence of [`Op`]s. Arrays
//! are encoded in-line: `BeginArray` carries the collection source and the
//! length of the per-item body that follows it, and the executor replays
//! that body once per element.
//!
//! ```text
//! { "id": record.Id, "files": [ { "name": item.Name } ] }
//!
//! 0 begin-object
//! 1 property-name "id"
//! 2 emit-value record.Id
//! 3 property-name "files"
//! 4 begin-array record.Files (body 4)
//! 5   begin-object
//! 6   property-name "name"
//! 7   emit-value item.Name
//! 8   end-object
//! 9 end-array
//! 10 end-object
//! ```

use std::fmt;
use std::io::{self, Write};

use crate::diagnostic::{CompileError, Result};
use crate::exec::{self, ExecContext};
use crate::ir::{FieldNode, ObjectSpec};

use super::source::{CollectionSource, FieldBinder, ValueSource};
use super::Scopes;

/// One instruction of a compiled JSON plan.
#[derive(Debug, Clone)]
pub enum Op {
    BeginObject,
    EndObject,
    /// Opens an array over `source`; the next `body` ops are the per-item
    /// plan, followed by the matching `EndArray`.
    BeginArray { source: CollectionSource, body: usize },
    EndArray,
    /// A property name, pre-encoded with its separator (`,"name":`).
    PropertyName { name: String, encoded: Box<[u8]> },
    EmitValue(ValueSource),
}

impl Op {
    fn property_name(name: &str, first: bool) -> serde_json::Result<Op> {
        let mut encoded = Vec::with_capacity(name.len() + 4);
        if !first {
            encoded.push(b',');
        }
        serde_json::to_writer(&mut encoded, name)?;
        encoded.push(b':');
        Ok(Op::PropertyName {
            name: name.to_string(),
            encoded: encoded.into_boxed_slice(),
        })
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::BeginObject => f.write_str("begin-object"),
            Op::EndObject => f.write_str("end-object"),
            Op::BeginArray { source, body } => {
                write!(f, "begin-array {:?} (body {})", source, body)
            }
            Op::EndArray => f.write_str("end-array"),
            Op::PropertyName { name, .. } => write!(f, "property-name {:?}", name),
            Op::EmitValue(source) => write!(f, "emit-value {}", source),
        }
    }
}

/// A compiled JSON object plan.
#[derive(Debug, Clone)]
pub struct JsonPlan {
    ops: Vec<Op>,
}

impl JsonPlan {
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Streams the document for one execution context.
    pub fn write<W: Write + ?Sized>(&self, cx: &ExecContext<'_>, out: &mut W) -> io::Result<()> {
        exec::json::run(&self.ops, cx, out)
    }

    /// Renders the document to a string.
    pub fn render(&self, cx: &ExecContext<'_>) -> String {
        exec::json::render(&self.ops, cx)
    }
}

impl fmt::Display for JsonPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut depth = 0usize;
        for (index, op) in self.ops.iter().enumerate() {
            if matches!(op, Op::EndObject | Op::EndArray) {
                depth = depth.saturating_sub(1);
            }
            writeln!(f, "{:>4} {:indent$}{}", index, "", op, indent = depth * 2)?;
            if matches!(op, Op::BeginObject | Op::BeginArray { .. }) {
                depth += 1;
            }
        }
        Ok(())
    }
}

// =============================================================================
// Compiler
// =============================================================================

/// Compiles object descriptions into [`JsonPlan`]s.
pub struct JsonCompiler<'c> {
    binder: &'c FieldBinder<'c>,
}

impl<'c> JsonCompiler<'c> {
    pub(crate) fn new(binder: &'c FieldBinder<'c>) -> Self {
        Self { binder }
    }

    pub fn compile(&self, scopes: &Scopes, spec: &ObjectSpec) -> Result<JsonPlan> {
        let mut ops = Vec::new();
        self.compile_object(scopes, spec, &mut ops)?;
        Ok(JsonPlan { ops })
    }

    fn compile_object(&self, scopes: &Scopes, spec: &ObjectSpec, ops: &mut Vec<Op>) -> Result<()> {
        ops.push(Op::BeginObject);

        for (index, field) in spec.fields.iter().enumerate() {
            let name = Op::property_name(&field.key, index == 0)
                .map_err(|e| CompileError::invalid(&field.path, e.to_string()))?;
            ops.push(name);

            match &field.node {
                FieldNode::Leaf { source, value_type } => {
                    let source = self.binder.scalar(scopes, source, *value_type, &field.path)?;
                    ops.push(Op::EmitValue(source));
                }
                FieldNode::Object(object) => {
                    self.compile_object(scopes, object, ops)?;
                }
                FieldNode::Array(array) => {
                    let source = self
                        .binder
                        .collection(scopes, &array.context, &array.context_path)?;
                    let item_scopes = scopes.with_item(source.item_shape());

                    let begin = ops.len();
                    ops.push(Op::BeginArray { source, body: 0 });
                    self.compile_object(&item_scopes, &array.items, ops)?;
                    let body_len = ops.len() - begin - 1;
                    if let Op::BeginArray { body, .. } = &mut ops[begin] {
                        *body = body_len;
                    }
                    ops.push(Op::EndArray);
                }
            }
        }

        ops.push(Op::EndObject);
        Ok(())
    }
}
