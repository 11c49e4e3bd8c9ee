//! Plan executor.
//!
//! Plans are executed against an [`ExecContext`]: the `(event, record,
//! item)` triple. Contexts are cheap borrowed values; entering an array
//! derives a new context with the current element and leaves the outer one
//! untouched, so execution shares no mutable state and any number of
//! threads may run the same plan at once.
//!
//! The typed handles ([`RowPlan`], [`DocumentPlan`], [`FieldPlan`]) pin a
//! compiled plan to the event and record types it was compiled for.

pub(crate) mod json;
pub(crate) mod row;

use std::any::Any;
use std::fmt;
use std::io::{self, Write};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::ir::Scope;
use crate::plan::{ColumnPlan, JsonPlan, ValueSource};
use crate::shape::{ScalarType, Value};

/// Inputs visible to a plan while it executes.
#[derive(Clone, Copy)]
pub struct ExecContext<'a> {
    event: &'a dyn Any,
    record: &'a dyn Any,
    item: Option<&'a dyn Any>,
}

impl<'a> ExecContext<'a> {
    pub fn new(event: &'a dyn Any, record: &'a dyn Any) -> Self {
        Self {
            event,
            record,
            item: None,
        }
    }

    /// The context for one element of an array.
    #[inline]
    pub fn with_item<'b>(&'b self, item: &'b dyn Any) -> ExecContext<'b> {
        ExecContext {
            event: self.event,
            record: self.record,
            item: Some(item),
        }
    }

    #[inline]
    pub fn input(&self, scope: Scope) -> Option<&'a dyn Any> {
        match scope {
            Scope::Event => Some(self.event),
            Scope::Record => Some(self.record),
            Scope::Item => self.item,
        }
    }
}

impl fmt::Debug for ExecContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecContext")
            .field("has_item", &self.item.is_some())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Typed Handles
// =============================================================================

/// A compiled row mapping for events `E` and records `R`.
pub struct RowPlan<E, R> {
    plan: Arc<ColumnPlan>,
    _inputs: PhantomData<fn(&E, &R)>,
}

impl<E: Any, R: Any> RowPlan<E, R> {
    pub(crate) fn new(plan: Arc<ColumnPlan>) -> Self {
        Self {
            plan,
            _inputs: PhantomData,
        }
    }

    pub fn column_names(&self) -> &[String] {
        self.plan.column_names()
    }

    pub fn column_types(&self) -> Vec<ScalarType> {
        self.plan.column_types().collect()
    }

    /// Builds one row, aligned with [`column_names`](Self::column_names).
    pub fn build_row(&self, event: &E, record: &R) -> Vec<Value> {
        self.plan.build_row(&ExecContext::new(event, record))
    }

    pub fn plan(&self) -> &Arc<ColumnPlan> {
        &self.plan
    }
}

impl<E, R> Clone for RowPlan<E, R> {
    fn clone(&self) -> Self {
        Self {
            plan: Arc::clone(&self.plan),
            _inputs: PhantomData,
        }
    }
}

impl<E, R> fmt::Debug for RowPlan<E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowPlan")
            .field("columns", &self.plan.column_names())
            .finish()
    }
}

/// A compiled JSON document mapping for events `E` and records `R`.
pub struct DocumentPlan<E, R> {
    plan: Arc<JsonPlan>,
    _inputs: PhantomData<fn(&E, &R)>,
}

impl<E: Any, R: Any> DocumentPlan<E, R> {
    pub(crate) fn new(plan: Arc<JsonPlan>) -> Self {
        Self {
            plan,
            _inputs: PhantomData,
        }
    }

    /// Streams one document into `out`. Only writer failures are reported.
    pub fn write<W: Write + ?Sized>(&self, out: &mut W, event: &E, record: &R) -> io::Result<()> {
        self.plan.write(&ExecContext::new(event, record), out)
    }

    pub fn to_json_string(&self, event: &E, record: &R) -> String {
        self.plan.render(&ExecContext::new(event, record))
    }

    pub fn plan(&self) -> &Arc<JsonPlan> {
        &self.plan
    }
}

impl<E, R> Clone for DocumentPlan<E, R> {
    fn clone(&self) -> Self {
        Self {
            plan: Arc::clone(&self.plan),
            _inputs: PhantomData,
        }
    }
}

impl<E, R> fmt::Debug for DocumentPlan<E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentPlan")
            .field("ops", &self.plan.ops().len())
            .finish()
    }
}

/// A single compiled field reference, such as a document id.
pub struct FieldPlan<E, R> {
    source: ValueSource,
    _inputs: PhantomData<fn(&E, &R)>,
}

impl<E: Any, R: Any> FieldPlan<E, R> {
    pub(crate) fn new(source: ValueSource) -> Self {
        Self {
            source,
            _inputs: PhantomData,
        }
    }

    pub fn evaluate(&self, event: &E, record: &R) -> Value {
        self.source.evaluate(&ExecContext::new(event, record))
    }

    pub fn source(&self) -> &ValueSource {
        &self.source
    }
}

impl<E, R> Clone for FieldPlan<E, R> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            _inputs: PhantomData,
        }
    }
}

impl<E, R> fmt::Debug for FieldPlan<E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldPlan({})", self.source)
    }
}

/// A compiled mapping, as returned by
/// [`PlanCompiler::compile`](crate::PlanCompiler::compile).
#[non_exhaustive]
pub enum Plan<E, R> {
    Rows(RowPlan<E, R>),
}

impl<E, R> Clone for Plan<E, R> {
    fn clone(&self) -> Self {
        match self {
            Plan::Rows(plan) => Plan::Rows(plan.clone()),
        }
    }
}

impl<E, R> fmt::Debug for Plan<E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plan::Rows(plan) => f.debug_tuple("Rows").field(plan).finish(),
        }
    }
}

impl<E: Any, R: Any> Plan<E, R> {
    pub fn into_rows(self) -> Option<RowPlan<E, R>> {
        match self {
            Plan::Rows(plan) => Some(plan),
        }
    }
}
