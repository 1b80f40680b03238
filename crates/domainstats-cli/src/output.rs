use crate::config::OutputFormat;
use domainstats::DomainCount;
use std::io::{self, Write};

/// Writes `counts` to `out` in the requested format.
pub fn render<W: Write>(
    out: &mut W,
    counts: &[DomainCount],
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Text => {
            for entry in counts {
                writeln!(out, "{}\t{}", entry.domain, entry.number_of_users)?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, counts)?;
            writeln!(out)?;
        }
    }
    out.flush()
}
