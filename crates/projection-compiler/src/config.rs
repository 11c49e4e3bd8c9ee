//! Compiler configuration and mapping documents.
//!
//! Mapping documents are JSON trees read with key order preserved. A
//! [`ConfigSection`] addresses one subtree by its logical path
//! (`projections:samples:clickhouse`); the path travels with the section into
//! diagnostics and plan cache keys.

use std::cell::RefCell;
use std::fmt;
use std::path::Path;

use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Number, Value as JsonValue};
use walkdir::WalkDir;

use crate::diagnostic::{CompileError, ConfigPath, Result, PATH_SEPARATOR};

/// File extension of mapping documents in a catalog directory.
const MAPPING_EXTENSION: &str = "json";

/// Configuration for the plan compiler.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Allow any scalar accessor to feed a column declared `string`.
    pub string_coercion: bool,

    /// Allow `int` accessors to feed columns declared `decimal`.
    pub decimal_from_int: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            string_coercion: true,
            decimal_from_int: true,
        }
    }
}

// =============================================================================
// Mapping Documents
// =============================================================================

/// A read-only mapping document.
#[derive(Debug, Clone)]
pub struct MappingDocument {
    root: JsonValue,
}

impl MappingDocument {
    /// Wraps an already parsed JSON tree.
    pub fn from_value(root: JsonValue) -> Self {
        Self { root }
    }

    /// Parses a JSON mapping document.
    ///
    /// `source_name` only appears in error messages.
    /// Repeated keys and keys containing `:` are rejected as
    /// [`CompileError::InvalidMapping`].
    pub fn parse(source_name: &str, text: &str) -> Result<Self> {
        let rejected = RefCell::new(None);
        let mut deserializer = serde_json::Deserializer::from_str(text);
        let parsed = NodeSeed {
            path: ConfigPath::root(),
            rejected: &rejected,
        }
        .deserialize(&mut deserializer)
        .and_then(|root| deserializer.end().map(|()| root));

        match parsed {
            Ok(root) => Ok(Self { root }),
            Err(e) => Err(rejected.into_inner().unwrap_or_else(|| CompileError::Parse {
                source_name: source_name.to_string(),
                message: e.to_string(),
            })),
        }
    }

    /// Loads a mapping document from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CompileError::io(path, e.to_string()))?;
        Self::parse(&path.display().to_string(), &content)
    }

    /// Loads every `*.json` file under `dir` into one document.
    ///
    /// Each file is mounted under its path relative to `dir`, without the
    /// extension: `projections/samples.json` becomes `projections:samples`.
    /// Files are visited in name order so the resulting document is the same
    /// on every run.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut root = Map::new();

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| CompileError::io(dir, e.to_string()))?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some(MAPPING_EXTENSION)
            {
                continue;
            }

            let relative = path.strip_prefix(dir).unwrap_or(path).with_extension("");
            let segments: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            if segments.iter().any(|segment| segment.contains(PATH_SEPARATOR)) {
                return Err(CompileError::io(
                    path,
                    format!("mapping file names cannot contain '{}'", PATH_SEPARATOR),
                ));
            }

            let document = Self::from_path(path)?;
            mount(&mut root, &segments, document.root, path)?;
        }

        tracing::debug!(dir = %dir.display(), sections = root.len(), "loaded mapping catalog");
        Ok(Self {
            root: JsonValue::Object(root),
        })
    }

    /// The whole document.
    pub fn root(&self) -> ConfigSection<'_> {
        ConfigSection {
            path: ConfigPath::root(),
            node: &self.root,
        }
    }

    /// Looks up a section by logical path (`a:b:c`).
    pub fn section(&self, path: &str) -> Result<ConfigSection<'_>> {
        self.root().section(path)
    }
}

fn mount(root: &mut Map<String, JsonValue>, segments: &[String], value: JsonValue, file: &Path) -> Result<()> {
    let Some((last, parents)) = segments.split_last() else {
        return Ok(());
    };

    let mut current = root;
    for segment in parents {
        let slot = current
            .entry(segment.clone())
            .or_insert_with(|| JsonValue::Object(Map::new()));
        current = match slot {
            JsonValue::Object(map) => map,
            _ => {
                return Err(CompileError::io(
                    file,
                    format!("section '{}' is both a file and a directory", segment),
                ))
            }
        };
    }

    if current.contains_key(last) {
        return Err(CompileError::io(
            file,
            format!("section '{}' is both a file and a directory", last),
        ));
    }
    current.insert(last.clone(), value);
    Ok(())
}

// =============================================================================
// Sections
// =============================================================================

/// A borrowed subtree of a mapping document, tagged with its path.
#[derive(Debug, Clone)]
pub struct ConfigSection<'a> {
    path: ConfigPath,
    node: &'a JsonValue,
}

impl<'a> ConfigSection<'a> {
    /// Creates a section for a detached JSON value.
    pub fn new(path: ConfigPath, node: &'a JsonValue) -> Self {
        Self { path, node }
    }

    pub fn path(&self) -> &ConfigPath {
        &self.path
    }

    pub fn node(&self) -> &'a JsonValue {
        self.node
    }

    pub fn as_str(&self) -> Option<&'a str> {
        self.node.as_str()
    }

    pub fn is_object(&self) -> bool {
        self.node.is_object()
    }

    /// Returns a direct child. Keys containing `:` never match, since their
    /// paths would be indistinguishable from nested ones.
    pub fn get(&self, key: &str) -> Option<ConfigSection<'a>> {
        if key.contains(PATH_SEPARATOR) {
            return None;
        }
        self.node.get(key).map(|node| ConfigSection {
            path: self.path.child(key),
            node,
        })
    }

    /// Returns a descendant by relative logical path.
    pub fn section(&self, path: &str) -> Result<ConfigSection<'a>> {
        let mut current = self.clone();
        for segment in ConfigPath::new(path).segments() {
            current = current.get(segment).ok_or_else(|| CompileError::MissingSection {
                path: self.path.child(path),
            })?;
        }
        Ok(current)
    }

    /// Returns a child that must be present.
    pub fn require(&self, key: &str) -> Result<ConfigSection<'a>> {
        self.get(key)
            .ok_or_else(|| CompileError::missing_key(&self.path, key))
    }

    /// Returns a string child that must be present.
    pub fn require_str(&self, key: &str) -> Result<&'a str> {
        let child = self.require(key)?;
        child
            .as_str()
            .ok_or_else(|| CompileError::invalid(child.path(), "expected a string"))
    }

    /// Returns an optional string child.
    pub fn optional_str(&self, key: &str) -> Result<Option<&'a str>> {
        match self.get(key) {
            None => Ok(None),
            Some(child) => child
                .as_str()
                .map(Some)
                .ok_or_else(|| CompileError::invalid(child.path(), "expected a string")),
        }
    }

    /// Iterates the children of an object node in document order.
    pub fn children(&self) -> Result<Vec<(&'a str, ConfigSection<'a>)>> {
        let map = self
            .node
            .as_object()
            .ok_or_else(|| CompileError::invalid(&self.path, "expected an object"))?;
        map.iter()
            .map(|(key, node)| {
                if key.contains(PATH_SEPARATOR) {
                    return Err(separator_in_key(&self.path, key));
                }
                Ok((
                    key.as_str(),
                    ConfigSection {
                        path: self.path.child(key),
                        node,
                    },
                ))
            })
            .collect()
    }
}

fn separator_in_key(path: &ConfigPath, key: &str) -> CompileError {
    CompileError::invalid(
        path,
        format!("key '{}' contains the path separator '{}'", key, PATH_SEPARATOR),
    )
}

// =============================================================================
// Parsing
// =============================================================================

/// Deserializes one JSON node, recording the first structural problem
/// (repeated key, separator in a key) in `rejected`.
struct NodeSeed<'r> {
    path: ConfigPath,
    rejected: &'r RefCell<Option<CompileError>>,
}

impl NodeSeed<'_> {
    fn reject<E: de::Error>(&self, error: CompileError) -> E {
        let message = error.to_string();
        self.rejected.borrow_mut().get_or_insert(error);
        E::custom(message)
    }
}

impl<'de> DeserializeSeed<'de> for NodeSeed<'_> {
    type Value = JsonValue;

    fn deserialize<D>(self, deserializer: D) -> std::result::Result<JsonValue, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for NodeSeed<'_> {
    type Value = JsonValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<JsonValue, E> {
        Ok(Number::from_f64(v).map_or(JsonValue::Null, JsonValue::Number))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::Null)
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<JsonValue, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element_seed(NodeSeed {
            path: self.path.child(&items.len().to_string()),
            rejected: self.rejected,
        })? {
            items.push(item);
        }
        Ok(JsonValue::Array(items))
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<JsonValue, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut object = Map::new();
        while let Some(key) = map.next_key::<String>()? {
            if key.contains(PATH_SEPARATOR) {
                return Err(self.reject(separator_in_key(&self.path, &key)));
            }
            if object.contains_key(&key) {
                return Err(self.reject(CompileError::invalid(
                    &self.path.child(&key),
                    format!("duplicate key '{}'", key),
                )));
            }
            let value = map.next_value_seed(NodeSeed {
                path: self.path.child(&key),
                rejected: self.rejected,
            })?;
            object.insert(key, value);
        }
        Ok(JsonValue::Object(object))
    }
}
