//! Scoped field references (`record.Name`, `item.Url`, `const.Sample`).

use std::fmt;

/// Which input a field reference reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// The source event.
    Event,
    /// The destination record.
    Record,
    /// The element of the nearest enclosing array.
    Item,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Event => "event",
            Scope::Record => "record",
            Scope::Item => "item",
        }
    }
}

/// A leaf configuration value, split into scope and path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldRef {
    Field { scope: Scope, path: String },
    Const(String),
}

impl FieldRef {
    /// Parses `<scope>.<path>`. Returns a description of the problem on
    /// failure.
    pub fn parse(text: &str) -> Result<Self, String> {
        let Some((scope, rest)) = text.split_once('.') else {
            return Err(format!(
                "'{}' is not a field reference (expected event., record., item. or const.)",
                text
            ));
        };

        let scope = match scope {
            "event" => Scope::Event,
            "record" => Scope::Record,
            "item" => Scope::Item,
            "const" => return Ok(FieldRef::Const(rest.to_string())),
            other => return Err(format!("unknown scope '{}' in '{}'", other, text)),
        };

        if rest.is_empty() {
            return Err(format!("'{}' has an empty field path", text));
        }

        Ok(FieldRef::Field {
            scope,
            path: rest.to_string(),
        })
    }

    pub fn scope(&self) -> Option<Scope> {
        match self {
            FieldRef::Field { scope, .. } => Some(*scope),
            FieldRef::Const(_) => None,
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRef::Field { scope, path } => write!(f, "{}.{}", scope.as_str(), path),
            FieldRef::Const(literal) => write!(f, "const.{}", literal),
        }
    }
}
