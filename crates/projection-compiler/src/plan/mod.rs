//! Plan compilation: IR -> executable plans.
//!
//! ```text
//!   ObjectSpec ──► JsonCompiler ──► JsonPlan (flat Op sequence)
//!                        ▲
//!   Mapping ────► ColumnCompiler ─► ColumnPlan (ordered column accessors)
//!                        │
//!                        ▼
//!                  FieldBinder ──► AccessorResolver
//! ```
//!
//! Every field reference is bound to an accessor here, so a plan that
//! compiles never fails to resolve anything when executed.

mod column;
mod json;
mod source;

pub use column::{ColumnCompiler, ColumnPlan, ColumnValue, CompiledColumn};
pub use json::{JsonCompiler, JsonPlan, Op};
pub use source::{CollectionSource, ValueSource};

pub(crate) use source::FieldBinder;

use crate::ir::Scope;
use crate::shape::ShapeId;

/// Shapes visible at one point of a mapping.
///
/// `item` is the element shape of the nearest enclosing array; `event` and
/// `record` never change with nesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scopes {
    event: ShapeId,
    record: ShapeId,
    item: Option<ShapeId>,
}

impl Scopes {
    pub fn new(event: ShapeId, record: ShapeId) -> Self {
        Self {
            event,
            record,
            item: None,
        }
    }

    /// Scopes for the items subtree of an array whose elements are `item`.
    pub fn with_item(self, item: ShapeId) -> Self {
        Self {
            item: Some(item),
            ..self
        }
    }

    pub fn shape(&self, scope: Scope) -> Option<ShapeId> {
        match scope {
            Scope::Event => Some(self.event),
            Scope::Record => Some(self.record),
            Scope::Item => self.item,
        }
    }
}
