//! JSON op-sequence interpreter.

use std::any::Any;
use std::io::{self, Write};

use super::ExecContext;
use crate::plan::{CollectionSource, Op};

/// Runs `ops` once, writing the document to `out`.
///
/// A single forward scan. `BeginArray` hands its body to [`write_items`] and
/// skips past it; the body is a complete object and runs recursively with
/// the element bound as the current item.
pub(crate) fn run<W: Write + ?Sized>(ops: &[Op], cx: &ExecContext<'_>, out: &mut W) -> io::Result<()> {
    let mut pc = 0;
    while pc < ops.len() {
        match &ops[pc] {
            Op::BeginObject => out.write_all(b"{")?,
            Op::EndObject => out.write_all(b"}")?,
            Op::PropertyName { encoded, .. } => out.write_all(encoded)?,
            Op::EmitValue(source) => source.evaluate(cx).write_json(out)?,
            Op::BeginArray { source, body } => {
                let body = *body;
                out.write_all(b"[")?;
                write_items(source, &ops[pc + 1..pc + 1 + body], cx, out)?;
                pc += body;
            }
            Op::EndArray => out.write_all(b"]")?,
        }
        pc += 1;
    }
    Ok(())
}

/// Writes every element of an array. An absent collection writes nothing,
/// which leaves `[]`.
fn write_items<W: Write + ?Sized>(
    source: &CollectionSource,
    body: &[Op],
    cx: &ExecContext<'_>,
    out: &mut W,
) -> io::Result<()> {
    let mut status = Ok(());
    let mut first = true;

    source.for_each(cx, &mut |item: &dyn Any| {
        if status.is_err() {
            return;
        }
        if !first {
            status = (*out).write_all(b",");
        }
        first = false;
        if status.is_ok() {
            status = run(body, &cx.with_item(item), &mut *out);
        }
    });

    status
}

/// Runs `ops` into a fresh string.
pub(crate) fn render(ops: &[Op], cx: &ExecContext<'_>) -> String {
    let mut buf = Vec::with_capacity(128);
    // Writing into a Vec cannot fail.
    let _ = run(ops, cx, &mut buf);
    String::from_utf8(buf).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}
