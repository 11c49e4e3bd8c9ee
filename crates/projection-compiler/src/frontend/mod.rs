//! Mapping frontend: configuration tree -> IR.
//!
//! Each configuration node is classified exactly once into a node kind, then
//! lowered by matching on that kind. Every node of the subtree is visited,
//! and the first error in document order is returned.

use crate::config::ConfigSection;
use crate::diagnostic::{CompileError, Result};
use crate::ir::{
    ArraySpec, ColumnKind, ColumnSpec, FieldNode, FieldRef, FieldSpec, Mapping, ObjectSpec,
    OutputFormat,
};
use crate::shape::ScalarType;

/// Marker value of `type` for array nodes.
const ARRAY_TYPE: &str = "array";

const TYPED_LEAF_KEYS: &[&str] = &["source", "type"];
const ARRAY_KEYS: &[&str] = &["type", "context", "items"];
const SCALAR_COLUMN_KEYS: &[&str] = &["source", "type", "order"];
const JSON_COLUMN_KEYS: &[&str] = &["format", "fields", "order"];

/// Shape of a node inside an object description.
enum NodeKind<'a> {
    /// `"record.Name"`
    Leaf(&'a str),
    /// `{ "source": "record.Name", "type": "string" }`
    TypedLeaf(ConfigSection<'a>),
    /// `{ "type": "array", "context": ..., "items": { ... } }`
    Array(ConfigSection<'a>),
    /// Any other object.
    Object(ConfigSection<'a>),
}

fn classify<'a>(section: &ConfigSection<'a>) -> Result<NodeKind<'a>> {
    if let Some(text) = section.as_str() {
        return Ok(NodeKind::Leaf(text));
    }
    if !section.is_object() {
        return Err(CompileError::invalid(
            section.path(),
            "expected a field reference or an object",
        ));
    }

    // A string `source` marks a typed leaf; `source` holding an object is
    // an ordinary nested key.
    let typed = section
        .get("source")
        .is_some_and(|source| source.as_str().is_some());

    match section.optional_str("type")? {
        Some(ARRAY_TYPE) => Ok(NodeKind::Array(section.clone())),
        Some(_) if typed => Ok(NodeKind::TypedLeaf(section.clone())),
        Some(other) => Err(CompileError::unsupported_format(
            &section.path().child("type"),
            other,
        )),
        None if typed => Ok(NodeKind::TypedLeaf(section.clone())),
        None => Ok(NodeKind::Object(section.clone())),
    }
}

/// Parses a leaf field reference.
pub fn parse_field_ref(section: &ConfigSection<'_>) -> Result<FieldRef> {
    let text = section
        .as_str()
        .ok_or_else(|| CompileError::invalid(section.path(), "expected a field reference"))?;
    FieldRef::parse(text).map_err(|message| CompileError::invalid(section.path(), message))
}

fn parse_scalar_type(section: &ConfigSection<'_>) -> Result<ScalarType> {
    let name = section.require_str("type")?;
    ScalarType::parse(name)
        .ok_or_else(|| CompileError::unsupported_format(&section.path().child("type"), name))
}

// =============================================================================
// Object Descriptions
// =============================================================================

/// Parses an object description (the `fields` of a JSON column, or the
/// `items` of an array).
pub fn parse_object(section: &ConfigSection<'_>) -> Result<ObjectSpec> {
    let mut fields = Vec::new();

    for (key, child) in section.children()? {
        let node = match classify(&child)? {
            NodeKind::Leaf(text) => FieldNode::Leaf {
                source: FieldRef::parse(text)
                    .map_err(|message| CompileError::invalid(child.path(), message))?,
                value_type: None,
            },
            NodeKind::TypedLeaf(leaf) => {
                check_keys(&leaf, TYPED_LEAF_KEYS)?;
                FieldNode::Leaf {
                    source: parse_field_ref(&leaf.require("source")?)?,
                    value_type: match leaf.get("type") {
                        Some(_) => Some(parse_scalar_type(&leaf)?),
                        None => None,
                    },
                }
            }
            NodeKind::Array(array) => FieldNode::Array(parse_array(&array)?),
            NodeKind::Object(object) => FieldNode::Object(parse_object(&object)?),
        };

        fields.push(FieldSpec {
            key: key.to_string(),
            path: child.path().clone(),
            node,
        });
    }

    Ok(ObjectSpec {
        path: section.path().clone(),
        fields,
    })
}

fn parse_array(section: &ConfigSection<'_>) -> Result<ArraySpec> {
    check_keys(section, ARRAY_KEYS)?;
    let context = section.require("context")?;
    let items = section.require("items")?;

    Ok(ArraySpec {
        context: parse_field_ref(&context)?,
        context_path: context.path().clone(),
        items: parse_object(&items)?,
    })
}

/// Fails on the first key of `section` not listed in `allowed`.
fn check_keys(section: &ConfigSection<'_>, allowed: &[&str]) -> Result<()> {
    for (key, child) in section.children()? {
        if !allowed.contains(&key) {
            return Err(CompileError::invalid(
                child.path(),
                format!("unexpected key '{}', expected one of: {}", key, allowed.join(", ")),
            ));
        }
    }
    Ok(())
}

// =============================================================================
// Row Mappings
// =============================================================================

/// Reads the declared output format of a mapping section.
///
/// A missing `format` is reported as unsupported.
pub fn parse_format(section: &ConfigSection<'_>) -> Result<OutputFormat> {
    let format_path = section.path().child("format");
    let name = section
        .optional_str("format")?
        .ok_or_else(|| CompileError::unsupported_format(&format_path, "<missing>"))?;
    OutputFormat::parse(name).ok_or_else(|| CompileError::unsupported_format(&format_path, name))
}

/// Column names of a row mapping in declaration order, read without parsing
/// the columns themselves.
pub fn column_names<'a>(section: &ConfigSection<'a>) -> Result<Vec<&'a str>> {
    Ok(section
        .require("items")?
        .children()?
        .into_iter()
        .map(|(name, _)| name)
        .collect())
}

/// Parses an `object[]` mapping.
pub fn parse_mapping(section: &ConfigSection<'_>) -> Result<Mapping> {
    let format = parse_format(section)?;
    if format != OutputFormat::Rows {
        return Err(CompileError::unsupported_format(
            &section.path().child("format"),
            format.as_str(),
        ));
    }

    let mut columns = Vec::new();
    for (name, child) in section.require("items")?.children()? {
        columns.push(parse_column(name, &child)?);
    }

    // Stable: equal orders keep declaration order; unordered columns go last.
    columns.sort_by_key(|column| column.order.unwrap_or(i64::MAX));

    Ok(Mapping {
        path: section.path().clone(),
        format,
        columns,
    })
}

fn parse_column(name: &str, section: &ConfigSection<'_>) -> Result<ColumnSpec> {
    if !section.is_object() {
        return Err(CompileError::invalid(
            section.path(),
            "column must be an object with `source` and `type`, or `format` and `fields`",
        ));
    }

    let order = match section.get("order") {
        None => None,
        Some(order) => Some(
            order
                .node()
                .as_i64()
                .ok_or_else(|| CompileError::invalid(order.path(), "order must be an integer"))?,
        ),
    };

    let kind = match section.optional_str("format")? {
        Some(format) => match OutputFormat::parse(format) {
            Some(OutputFormat::Json) => {
                check_keys(section, JSON_COLUMN_KEYS)?;
                ColumnKind::Json {
                    fields: parse_object(&section.require("fields")?)?,
                }
            }
            _ => {
                return Err(CompileError::unsupported_format(
                    &section.path().child("format"),
                    format,
                ))
            }
        },
        None => {
            check_keys(section, SCALAR_COLUMN_KEYS)?;
            ColumnKind::Scalar {
                source: parse_field_ref(&section.require("source")?)?,
                value_type: parse_scalar_type(section)?,
            }
        }
    };

    Ok(ColumnSpec {
        name: name.to_string(),
        path: section.path().clone(),
        order,
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MappingDocument;
    use crate::ir::Scope;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> MappingDocument {
        MappingDocument::from_value(value)
    }

    #[test]
    fn test_parse_object_classifies_nodes() {
        let doc = doc(json!({
            "sample_id": "record.SampleId",
            "meta": { "kind": "const.Sample" },
            "amount": { "source": "record.Amount", "type": "decimal" },
            "attachments": {
                "type": "array",
                "context": "record.Attachments",
                "items": { "filename": "item.FileName" }
            }
        }));

        let spec = parse_object(&doc.root()).unwrap();
        let keys: Vec<_> = spec.fields.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["sample_id", "meta", "amount", "attachments"]);

        assert!(matches!(
            &spec.fields[0].node,
            FieldNode::Leaf { source: FieldRef::Field { scope: Scope::Record, .. }, value_type: None }
        ));
        assert!(matches!(&spec.fields[1].node, FieldNode::Object(_)));
        assert!(matches!(
            &spec.fields[2].node,
            FieldNode::Leaf { value_type: Some(ScalarType::Decimal), .. }
        ));
        let FieldNode::Array(array) = &spec.fields[3].node else {
            panic!("expected array node");
        };
        assert_eq!(array.context.to_string(), "record.Attachments");
        assert_eq!(array.context_path.as_str(), "attachments:context");
        assert_eq!(array.items.fields[0].path.as_str(), "attachments:items:filename");
    }

    #[test]
    fn test_array_requires_context_and_items() {
        let missing_context = doc(json!({
            "attachments": { "type": "array", "items": {} }
        }));
        match parse_object(&missing_context.root()) {
            Err(CompileError::MissingRequiredKey { key, .. }) => assert_eq!(key, "context"),
            other => panic!("unexpected: {:?}", other),
        }

        let missing_items = doc(json!({
            "attachments": { "type": "array", "context": "record.Attachments" }
        }));
        match parse_object(&missing_items.root()) {
            Err(CompileError::MissingRequiredKey { key, .. }) => assert_eq!(key, "items"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_node_type_is_unsupported() {
        let doc = doc(json!({ "tags": { "type": "set", "context": "record.Tags" } }));
        assert!(matches!(
            parse_object(&doc.root()),
            Err(CompileError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_non_string_leaf_is_invalid() {
        let doc = doc(json!({ "count": 3 }));
        match parse_object(&doc.root()) {
            Err(CompileError::InvalidMapping { path, .. }) => assert_eq!(path.as_str(), "count"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_first_error_in_document_order() {
        let doc = doc(json!({
            "ok": "record.Name",
            "first": "nope",
            "second": 42
        }));
        match parse_object(&doc.root()) {
            Err(CompileError::InvalidMapping { path, .. }) => assert_eq!(path.as_str(), "first"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_mapping_orders_columns() {
        let doc = doc(json!({
            "format": "object[]",
            "items": {
                "kind": { "source": "const.Sample", "type": "string" },
                "body": { "format": "json", "fields": { "id": "record.SampleId" } },
                "id": { "source": "record.SampleId", "type": "int", "order": 0 },
                "name": { "source": "record.Name", "type": "string", "order": 1 }
            }
        }));

        let mapping = parse_mapping(&doc.root()).unwrap();
        assert_eq!(
            mapping.column_names().collect::<Vec<_>>(),
            vec!["id", "name", "kind", "body"]
        );
        assert!(matches!(mapping.columns[3].kind, ColumnKind::Json { .. }));
        assert_eq!(column_names(&doc.root()).unwrap(), vec!["kind", "body", "id", "name"]);
    }

    #[test]
    fn test_parse_mapping_format_errors() {
        let missing = doc(json!({ "items": {} }));
        assert!(matches!(
            parse_mapping(&missing.root()),
            Err(CompileError::UnsupportedFormat { .. })
        ));

        let wrong = doc(json!({ "format": "csv", "items": {} }));
        match parse_mapping(&wrong.root()) {
            Err(CompileError::UnsupportedFormat { format, .. }) => assert_eq!(format, "csv"),
            other => panic!("unexpected: {:?}", other),
        }

        let no_items = doc(json!({ "format": "object[]" }));
        assert!(matches!(
            parse_mapping(&no_items.root()),
            Err(CompileError::MissingRequiredKey { .. })
        ));
    }

    #[test]
    fn test_column_errors() {
        let bad_type = doc(json!({
            "format": "object[]",
            "items": { "id": { "source": "record.SampleId", "type": "bool" } }
        }));
        assert!(matches!(
            parse_mapping(&bad_type.root()),
            Err(CompileError::UnsupportedFormat { .. })
        ));

        let bad_format = doc(json!({
            "format": "object[]",
            "items": { "body": { "format": "xml", "fields": {} } }
        }));
        assert!(matches!(
            parse_mapping(&bad_format.root()),
            Err(CompileError::UnsupportedFormat { .. })
        ));

        let no_fields = doc(json!({
            "format": "object[]",
            "items": { "body": { "format": "json" } }
        }));
        assert!(matches!(
            parse_mapping(&no_fields.root()),
            Err(CompileError::MissingRequiredKey { .. })
        ));

        let bad_order = doc(json!({
            "format": "object[]",
            "items": { "id": { "source": "record.SampleId", "type": "int", "order": "first" } }
        }));
        assert!(matches!(
            parse_mapping(&bad_order.root()),
            Err(CompileError::InvalidMapping { .. })
        ));
    }

    fn assert_unexpected_key(result: Result<impl std::fmt::Debug>, expected_path: &str) {
        match result {
            Err(CompileError::InvalidMapping { path, message }) => {
                assert_eq!(path.as_str(), expected_path);
                assert!(message.contains("unexpected key"), "{}", message);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let typed_leaf = doc(json!({
            "meta": { "source": "record.Origin", "name": "record.Name" }
        }));
        assert_unexpected_key(parse_object(&typed_leaf.root()), "meta:name");

        let array = doc(json!({
            "attachments": {
                "type": "array",
                "context": "record.Attachments",
                "item": { "filename": "item.FileName" },
                "items": { "filename": "item.FileName" }
            }
        }));
        assert_unexpected_key(parse_object(&array.root()), "attachments:item");

        let scalar_column = doc(json!({
            "format": "object[]",
            "items": { "id": { "source": "record.SampleId", "type": "int", "nullable": true } }
        }));
        assert_unexpected_key(parse_mapping(&scalar_column.root()), "items:id:nullable");

        let json_column = doc(json!({
            "format": "object[]",
            "items": {
                "body": { "format": "json", "fields": { "id": "record.SampleId" }, "source": "record.Body" }
            }
        }));
        assert_unexpected_key(parse_mapping(&json_column.root()), "items:body:source");
    }
}
