use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::{entities::plant::PlantView, errors::ExportError};

pub const EXPORT_FILENAME: &str = "indomitum_plant_inventory.csv";
pub const EXPORT_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

const HEADER: [&str; 6] = ["ID", "Name", "Date Added", "Latitude", "Longitude", "Added By"];

#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    pub filename: &'static str,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Writes the rows as they are displayed. The header stays bare. The ID,
/// name, date and owner columns are always quoted, whatever they contain;
/// coordinates are written bare and left empty when missing.
pub fn export_csv(rows: &[PlantView]) -> Result<ExportFile, ExportError> {
    if rows.is_empty() {
        return Err(ExportError::Empty);
    }

    // Quoting is decided per column, so text cells reach the writer already
    // quoted and it must not quote again.
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(HEADER)
        .map_err(|e| ExportError::Csv(e.to_string()))?;

    for row in rows {
        let record = &row.record;
        writer
            .write_record([
                quoted(&record.id),
                quoted(&record.name),
                quoted(&row.field_value("dateAdded")),
                row.field_value("latitude"),
                row.field_value("longitude"),
                quoted(&row.added_by_display),
            ])
            .map_err(|e| ExportError::Csv(e.to_string()))?;
    }

    let mut bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.to_string()))?;
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
    }

    tracing::info!(rows = rows.len(), "Exported plant inventory");

    Ok(ExportFile {
        filename: EXPORT_FILENAME,
        content_type: EXPORT_CONTENT_TYPE,
        bytes,
    })
}

fn quoted(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}
