use serde_json::Value;

use super::{unexpected_response, Demultiplexer, Fragment};
use crate::error::SchemaError;
use crate::fetch::RawResponse;
use crate::record::Record;

/// Delimited text with a header line; each data row is one entity, identified by `id_column`.
/// Quoted cells may contain the delimiter.
#[derive(Debug, Clone)]
pub struct TabularDemux {
    pub delimiter: u8,
    pub id_column: String,
    /// Lines starting with this byte are skipped, e.g. `#` for commented preambles.
    pub comment: Option<u8>,
}

impl TabularDemux {
    pub fn tsv(id_column: &str) -> Self {
        Self {
            delimiter: b'\t',
            id_column: id_column.to_string(),
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: u8) -> Self {
        self.comment = Some(comment);
        self
    }

    fn malformed(message: String) -> SchemaError {
        SchemaError::Malformed {
            format: "table",
            message,
        }
    }
}

impl Demultiplexer for TabularDemux {
    fn demultiplex(
        &self,
        _requested: &[String],
        raw: &RawResponse,
    ) -> Result<Vec<(String, Fragment)>, SchemaError> {
        let RawResponse::Text(text) = raw else {
            return Err(unexpected_response("text", raw));
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .comment(self.comment)
            .trim(csv::Trim::All)
            .flexible(false)
            .from_reader(text.as_bytes());

        let columns = reader
            .headers()
            .map_err(|e| Self::malformed(format!("header: {e}")))?
            .clone();
        if columns.is_empty() {
            return Ok(Vec::new());
        }
        let id_index = columns
            .iter()
            .position(|c| c == self.id_column)
            .ok_or_else(|| SchemaError::missing(format!("column {}", self.id_column)))?;

        let mut pairs = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let cells = result.map_err(|e| Self::malformed(format!("row {}: {e}", index + 1)))?;
            let id = cells.get(id_index).unwrap_or_default();
            if id.is_empty() {
                return Err(Self::malformed(format!("row {} has no id", index + 1)));
            }
            let row: Record = columns
                .iter()
                .zip(cells.iter())
                .map(|(column, cell)| (column.to_string(), Value::String(cell.to_string())))
                .collect();
            pairs.push((id.to_string(), Fragment::Row(row)));
        }
        Ok(pairs)
    }
}
