//! Row builder.

use super::ExecContext;
use crate::plan::CompiledColumn;
use crate::shape::Value;

/// Evaluates every column once, in order, into a pre-sized row.
#[inline]
pub(crate) fn build_row(columns: &[CompiledColumn], cx: &ExecContext<'_>) -> Vec<Value> {
    let mut row = Vec::with_capacity(columns.len());
    for column in columns {
        row.push(column.evaluate(cx));
    }
    row
}
