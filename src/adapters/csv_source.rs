use crate::core::builder::{KOORDINAT_X, KOORDINAT_Y, YON};
use crate::core::normalizer::normalize;
use crate::domain::model::{RawRecord, SourceTable};
use crate::utils::error::{EtlError, Result};
use std::collections::HashSet;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parses a CSV export with a header row.
pub fn read_records(data: &[u8]) -> Result<SourceTable> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(data);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut seen = HashSet::new();
    for header in &headers {
        if !seen.insert(header.as_str()) {
            return Err(EtlError::ValidationError {
                message: format!("Duplicate column '{}' in CSV header", header),
            });
        }
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        records.push(
            headers
                .iter()
                .zip(row.iter())
                .map(|(h, v)| (h.as_str(), v))
                .collect::<RawRecord>(),
        );
    }

    tracing::debug!("Read {} rows with columns {:?}", records.len(), headers);
    Ok(SourceTable { headers, records })
}

/// Writes the route-stop export back out with repaired coordinates and
/// without the direction column.
pub fn write_clean_route_stops(table: &SourceTable) -> Result<Vec<u8>> {
    let headers: Vec<&str> = table
        .headers
        .iter()
        .map(String::as_str)
        .filter(|h| *h != YON)
        .collect();

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&headers)?;

    for record in &table.records {
        let mut fields = Vec::with_capacity(headers.len());
        for header in &headers {
            let value = record.get(header);
            let field = if *header == KOORDINAT_X || *header == KOORDINAT_Y {
                normalize(value)?.map(|v| v.to_string()).unwrap_or_default()
            } else {
                value.unwrap_or_default().to_string()
            };
            fields.push(field);
        }
        writer.write_record(&fields)?;
    }

    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}
