use crate::errors::GenerationError;
use crate::model::Row;

/// Renders rows as a pretty-printed JSON array of objects in header order.
pub fn render_json(rows: &[Row]) -> Result<String, GenerationError> {
    Ok(serde_json::to_string_pretty(rows)?)
}
