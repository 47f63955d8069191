//! Writers turning generated rows into CSV or JSON files.

pub mod csv;
pub mod json;

use std::fs;
use std::path::Path;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE};
use mamegen_core::{OutputFormat, WriterOptions};
use tracing::info;

use crate::errors::GenerationError;
use crate::model::Row;

/// Looks up an encoding by its WHATWG label, e.g. `utf-8`, `sjis`, `latin1`.
pub fn resolve_encoding(label: &str) -> Result<&'static Encoding, GenerationError> {
    Encoding::for_label_no_replacement(label.trim().as_bytes())
        .ok_or_else(|| GenerationError::UnknownEncoding(label.to_string()))
}

/// Encodes `text`, failing on characters the target encoding cannot represent.
pub fn encode_text(text: &str, encoding: &'static Encoding) -> Result<Vec<u8>, GenerationError> {
    if encoding == UTF_16LE || encoding == UTF_16BE {
        let big_endian = encoding == UTF_16BE;
        return Ok(text
            .encode_utf16()
            .flat_map(|unit| {
                if big_endian {
                    unit.to_be_bytes()
                } else {
                    unit.to_le_bytes()
                }
            })
            .collect());
    }
    let (bytes, _, had_errors) = encoding.encode(text);
    if had_errors {
        return Err(GenerationError::Unencodable {
            encoding: encoding.name().to_string(),
        });
    }
    Ok(bytes.into_owned())
}

/// Renders `rows` in the configured format and writes them to `path`.
/// Returns the number of bytes written.
pub fn write_rows(
    path: &Path,
    header: &[String],
    rows: &[Row],
    options: &WriterOptions,
) -> Result<u64, GenerationError> {
    let encoding = resolve_encoding(&options.encoding)?;
    let text = match options.format {
        OutputFormat::Csv => csv::render_csv(header, rows, options)?,
        OutputFormat::Json => json::render_json(rows)?,
    };
    let bytes = encode_text(&text, encoding)?;

    fs::write(path, &bytes)?;
    let written = bytes.len() as u64;
    info!(
        path = %path.display(),
        format = ?options.format,
        encoding = encoding.name(),
        rows = rows.len(),
        bytes = written,
        "output written"
    );
    Ok(written)
}
