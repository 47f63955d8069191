use csv::QuoteStyle;
use mamegen_core::WriterOptions;

use crate::errors::GenerationError;
use crate::model::Row;

/// Renders rows as CSV text. Nulls become empty fields.
///
/// `quote_header` and `quote_strings` choose between quoting every field and
/// quoting only where needed, for the header and the data rows respectively.
pub fn render_csv(
    header: &[String],
    rows: &[Row],
    options: &WriterOptions,
) -> Result<String, GenerationError> {
    let mut buffer = Vec::new();
    if options.with_header {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .quote_style(quote_style(options.quote_header))
            .from_writer(&mut buffer);
        writer.write_record(header)?;
        writer.flush()?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(quote_style(options.quote_strings))
        .from_writer(&mut buffer);
    for row in rows {
        let record: Vec<String> = row.values().map(|value| value.to_text()).collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    drop(writer);

    String::from_utf8(buffer).map_err(|err| {
        GenerationError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    })
}

fn quote_style(quote_all: bool) -> QuoteStyle {
    if quote_all {
        QuoteStyle::Always
    } else {
        QuoteStyle::Necessary
    }
}
