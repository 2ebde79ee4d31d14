//! JSON-lines output on stdout. Logs go to stderr, so stdout stays
//! machine-readable.

use std::io::Write;

use serde::Serialize;

/// Write `value` as one JSON line to stdout.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    write_json_line(&mut stdout, value)?;
    stdout.flush()?;
    Ok(())
}

pub(crate) fn write_json_line<W: Write, T: Serialize>(out: &mut W, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    out.write_all(b"\n")?;
    Ok(())
}
