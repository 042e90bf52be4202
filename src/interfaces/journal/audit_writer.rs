use crate::domain::webhook::AuditEntry;
use crate::error::Result;
use std::io::{BufWriter, Write};

/// Dumps audit entries as JSON Lines, one entry per line in receipt order.
pub fn write_audit_log<W: Write>(sink: W, entries: &[AuditEntry]) -> Result<()> {
    let mut out = BufWriter::new(sink);
    for entry in entries {
        serde_json::to_writer(&mut out, entry).map_err(std::io::Error::from)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
