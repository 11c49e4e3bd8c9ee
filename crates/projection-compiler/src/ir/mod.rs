//! Parsed mapping representation.
//!
//! The frontend turns a configuration tree into these types once. Every
//! field reference is already split into its scope, and every node is
//! classified, so the plan compilers work by exhaustive matching instead of
//! probing configuration keys.

mod field_ref;

pub use field_ref::{FieldRef, Scope};

use std::fmt;

use crate::diagnostic::ConfigPath;
use crate::shape::ScalarType;

/// Output format of a mapping or embedded column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// `object[]`: one row of column values per input pair.
    Rows,
    /// `json`: one JSON document per input pair.
    Json,
}

impl OutputFormat {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "object[]" => Some(OutputFormat::Rows),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Rows => "object[]",
            OutputFormat::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A JSON object description: ordered keys, each with a node.
#[derive(Debug, Clone)]
pub struct ObjectSpec {
    pub path: ConfigPath,
    pub fields: Vec<FieldSpec>,
}

/// One key of an [`ObjectSpec`].
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Output property name.
    pub key: String,
    pub path: ConfigPath,
    pub node: FieldNode,
}

/// What a JSON property is built from.
#[derive(Debug, Clone)]
pub enum FieldNode {
    /// A single value. `value_type` is set when the node was written as
    /// `{ "source": ..., "type": ... }`.
    Leaf {
        source: FieldRef,
        value_type: Option<ScalarType>,
    },
    /// A nested object.
    Object(ObjectSpec),
    /// An array of objects, one per item of `context`.
    Array(ArraySpec),
}

#[derive(Debug, Clone)]
pub struct ArraySpec {
    /// Must resolve to an enumerable.
    pub context: FieldRef,
    pub context_path: ConfigPath,
    /// Per-item object; `item.` inside refers to the current element.
    pub items: ObjectSpec,
}

/// One output column of a row mapping.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: String,
    pub path: ConfigPath,
    pub order: Option<i64>,
    pub kind: ColumnKind,
}

#[derive(Debug, Clone)]
pub enum ColumnKind {
    /// `{ "source": ..., "type": ... }`
    Scalar {
        source: FieldRef,
        value_type: ScalarType,
    },
    /// `{ "format": "json", "fields": { ... } }`
    Json { fields: ObjectSpec },
}

/// A parsed `object[]` mapping. Columns are in output order.
#[derive(Debug, Clone)]
pub struct Mapping {
    pub path: ConfigPath,
    pub format: OutputFormat,
    pub columns: Vec<ColumnSpec>,
}

impl Mapping {
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.name.as_str())
    }
}
