use crate::domain::model::Record;
use crate::utils::error::{MergeError, Result};
use serde_json::Value;
use std::collections::HashMap;

/// Parses provider rows. Cells are typed so numeric columns format and compare
/// as numbers; the extension column is left as text for the resolver.
pub fn parse_records(bytes: &[u8], extension_key: &str) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(MergeError::ValidationError {
            message: "Records file has no header row".to_string(),
        });
    }

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let row_data = result?;
        let mut data = HashMap::with_capacity(headers.len());

        for (header, cell) in headers.iter().zip(row_data.iter()) {
            if header.is_empty() {
                continue;
            }
            let value = if header == extension_key {
                if cell.is_empty() {
                    Value::Null
                } else {
                    Value::String(cell.to_string())
                }
            } else {
                infer_cell(cell)
            };
            data.insert(header.to_string(), value);
        }

        if data.values().all(Value::is_null) {
            tracing::debug!("Skipping empty row {}", row + 1);
            continue;
        }
        records.push(Record { data });
    }

    tracing::debug!("Parsed {} records with columns {:?}", records.len(), headers);
    Ok(records)
}

/// A cell becomes a number only when the number prints back as the same
/// text, so ids like `02115` or `1e3` keep their spelling.
pub fn infer_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(n) = cell.parse::<i64>() {
        if n.to_string() == cell {
            return Value::from(n);
        }
    }
    if let Some(n) = cell
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(serde_json::Number::from_f64)
    {
        if n.to_string() == cell {
            return Value::Number(n);
        }
    }
    match cell {
        "true" | "TRUE" | "True" => Value::Bool(true),
        "false" | "FALSE" | "False" => Value::Bool(false),
        _ => Value::String(cell.to_string()),
    }
}
