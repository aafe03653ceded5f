use csv::{QuoteStyle, WriterBuilder};

use crate::error::{CafeteriaError, Result};
use crate::table::TabularResult;

pub const CSV_MIME: &str = "text/csv";

/// Encode a result as comma-separated UTF-8 text: header line, then one record per row.
/// Fields are quoted only when they contain a delimiter, a quote or a line break.
/// Reals are written unrounded.
pub fn encode_csv(table: &TabularResult) -> Result<Vec<u8>> {
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new());
    wtr.write_record(table.columns())?;
    for row in table.field_rows() {
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    wtr.into_inner()
        .map_err(|e| CafeteriaError::Io(std::io::Error::new(e.error().kind(), e.to_string())))
}
