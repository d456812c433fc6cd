//! Explicit validation of stored metadata documents
//!
//! A document either becomes a fully typed [`MetadataRecord`] or is rejected
//! as [`MetadataError::Malformed`] naming the offending field.

use chrono::DateTime;
use serde_json::{Map, Value};
use tars_common::{DailySequenceNumber, MetadataRecord};

use super::family::RecordDetail;
use crate::error::MetadataError;

pub fn parse_record(
    file_name: &str,
    raw: &[u8],
    detail: RecordDetail,
) -> Result<MetadataRecord, MetadataError> {
    let malformed = |reason: String| MetadataError::Malformed {
        file_name: file_name.to_string(),
        reason,
    };

    let value: Value =
        serde_json::from_slice(raw).map_err(|e| malformed(format!("invalid JSON: {e}")))?;
    let Value::Object(fields) = value else {
        return Err(malformed("document is not a JSON object".to_string()));
    };

    let sequence_number = field(&fields, "sequenceNumber")
        .ok_or_else(|| malformed("missing sequenceNumber".to_string()))?
        .as_u64()
        .ok_or_else(|| malformed("sequenceNumber is not a non-negative integer".to_string()))?;

    let daily_raw = string_field(&fields, "dailySequenceNumber").map_err(&malformed)?;
    let daily_sequence_number = daily_raw
        .ok_or_else(|| malformed("missing dailySequenceNumber".to_string()))?
        .parse::<DailySequenceNumber>()
        .map_err(|e| malformed(format!("dailySequenceNumber: {e}")))?;

    let created_raw = string_field(&fields, "created")
        .map_err(&malformed)?
        .ok_or_else(|| malformed("missing created".to_string()))?;
    let created = DateTime::parse_from_rfc3339(created_raw)
        .map_err(|e| malformed(format!("created {created_raw:?} is not a timestamp: {e}")))?;

    let result_file = string_field(&fields, "fileName").map_err(&malformed)?;
    let checksum = string_field(&fields, "checksum").map_err(&malformed)?;
    let number_of_rows = match field(&fields, "numberOfRows") {
        None => None,
        Some(v) => Some(
            v.as_u64()
                .ok_or_else(|| malformed("numberOfRows is not a non-negative integer".to_string()))?,
        ),
    };

    if detail == RecordDetail::Full {
        if result_file.is_none() {
            return Err(malformed("missing fileName".to_string()));
        }
        if number_of_rows.is_none() {
            return Err(malformed("missing numberOfRows".to_string()));
        }
    }
    if result_file.is_some() && checksum.is_none() {
        return Err(malformed("fileName present without checksum".to_string()));
    }

    Ok(MetadataRecord {
        sequence_number,
        daily_sequence_number,
        created,
        file_name: result_file.map(str::to_string),
        checksum: checksum.map(str::to_string),
        number_of_rows,
    })
}

/// A present, non-null field
fn field<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    fields.get(name).filter(|v| !v.is_null())
}

/// A present field that must be a non-empty string
fn string_field<'a>(fields: &'a Map<String, Value>, name: &str) -> Result<Option<&'a str>, String> {
    match field(fields, name) {
        None => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Err(format!("{name} is empty")),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(format!("{name} is not a string")),
    }
}
