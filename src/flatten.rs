//! Flattening of structured submissions into embeddable text.
//!
//! A submission is a nested JSON document with header identifiers and a
//! `fieldValues` array; each entry carries a `fieldType`, `fieldName`, and
//! `value`. Flattening produces one multiline text block: header lines
//! followed by one rendered line (or block, for tables) per field, dispatched
//! on the field type. Output is deterministic: identical input always
//! produces identical text, and object keys are traversed in insertion order.

use serde_json::Value;

use crate::error::{Error, Result};

/// Flatten an entire submission into a text block.
///
/// Header fields absent from the document render as empty strings; a
/// document that is not an object, or a `fieldValues` that is not an array,
/// is a serialization error.
pub fn flatten_submission(doc: &Value) -> Result<String> {
    let obj = doc
        .as_object()
        .ok_or_else(|| Error::Serialization("submission must be a JSON object".to_string()))?;

    let text_of = |key: &str| -> String {
        obj.get(key).map(scalar_text).unwrap_or_default()
    };

    let mut lines = Vec::new();
    lines.push(format!("Submission (Result ID: {})", text_of("_id")));
    lines.push(format!(
        "For Document: {} in Folder: {}.",
        text_of("document_id"),
        text_of("folder_id")
    ));
    lines.push(format!("Owned by user: {}.", text_of("user_id")));
    lines.push(format!("Timestamp: {}.", text_of("timestamp")));
    lines.push("Field Values:".to_string());

    if let Some(field_values) = obj.get("fieldValues") {
        let entries = field_values.as_array().ok_or_else(|| {
            Error::Serialization("submission fieldValues must be an array".to_string())
        })?;
        for entry in entries {
            // Table fields render as multiple lines; indent each of them.
            for line in flatten_field(entry).lines() {
                lines.push(format!("  {}", line));
            }
        }
    }

    Ok(lines.join("\n"))
}

/// Render a single field entry based on its `fieldType`.
///
/// Unknown types fall back to `Name: value`; composite types with the wrong
/// value shape get a bracketed placeholder instead of failing the whole
/// submission.
pub fn flatten_field(field: &Value) -> String {
    let field_type = field.get("fieldType").and_then(Value::as_str).unwrap_or("");
    let name = field
        .get("fieldName")
        .and_then(Value::as_str)
        .unwrap_or("UnknownField");
    let value = field.get("value").unwrap_or(&Value::Null);

    match field_type {
        "checkbox" => {
            let status = if value.as_bool().unwrap_or(false) {
                "Checked"
            } else {
                "Unchecked"
            };
            format!("{}: {}", name, status)
        }
        "password" => format!("{}: [REDACTED]", name),
        "address" => match value.as_object() {
            Some(address) => flatten_address(name, address),
            None => format!("{}: [Invalid address data]", name),
        },
        "table" => match value.as_array() {
            Some(rows) => flatten_table(name, rows),
            None => format!("{}: [Invalid table data]", name),
        },
        "signature" => match value.as_object() {
            Some(signature) => flatten_signature(name, signature),
            None => format!("{}: [Signature provided]", name),
        },
        "location" => match value.as_object() {
            Some(location) => flatten_location(name, location),
            None => format!("{}: [Location data]", name),
        },
        // text, number, date, and anything unknown render the value as-is.
        _ => format!("{}: {}", name, scalar_text(value)),
    }
}

/// Join the non-empty address parts into one line.
fn flatten_address(name: &str, address: &serde_json::Map<String, Value>) -> String {
    let parts = ["line1", "line2", "city", "state", "zip"]
        .iter()
        .map(|key| address.get(*key).map(scalar_text).unwrap_or_default())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}: {}", name, parts)
}

/// Render a table as `Name:` followed by one `RowN: [k=v, ...]` line per row.
fn flatten_table(name: &str, rows: &[Value]) -> String {
    let mut lines = vec![format!("{}:", name)];
    for (i, row) in rows.iter().enumerate() {
        let cells = match row.as_object() {
            Some(cells) => cells
                .iter()
                .map(|(key, cell)| format!("{}={}", key, scalar_text(cell)))
                .collect::<Vec<_>>()
                .join(", "),
            None => scalar_text(row),
        };
        lines.push(format!("  Row{}: [{}]", i + 1, cells));
    }
    lines.join("\n")
}

/// Signatures store a placeholder plus whatever metadata is present, never
/// the signature itself.
fn flatten_signature(name: &str, signature: &serde_json::Map<String, Value>) -> String {
    let mut text = format!("{}: Signature provided", name);
    if let Some(ts) = signature.get("timestamp").and_then(Value::as_str) {
        if !ts.is_empty() {
            text.push_str(&format!(" at {}", ts));
        }
    }
    if let Some(file_ref) = signature.get("fileRef").and_then(Value::as_str) {
        if !file_ref.is_empty() {
            text.push_str(&format!(", file: {}", file_ref));
        }
    }
    text
}

fn flatten_location(name: &str, location: &serde_json::Map<String, Value>) -> String {
    match (location.get("lat"), location.get("lon")) {
        (Some(lat), Some(lon)) if lat.is_number() && lon.is_number() => {
            format!("{}: (Lat={}, Lon={})", name, lat, lon)
        }
        _ => format!("{}: [Location data]", name),
    }
}

/// Render a scalar JSON value without quoting strings.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_submission() -> Value {
        json!({
            "_id": "result123",
            "user_id": "userXYZ",
            "folder_id": "folderABC",
            "document_id": "doc789",
            "timestamp": "2025-04-15T10:00:00Z",
            "fieldValues": [
                { "fieldType": "text", "fieldName": "FirstName", "value": "Alice" },
                { "fieldType": "checkbox", "fieldName": "NewsletterOpt", "value": true },
                { "fieldType": "number", "fieldName": "Age", "value": 34 }
            ]
        })
    }

    #[test]
    fn test_flatten_is_deterministic() {
        let doc = sample_submission();
        assert_eq!(
            flatten_submission(&doc).unwrap(),
            flatten_submission(&doc).unwrap()
        );
    }

    #[test]
    fn test_flatten_submission_layout() {
        let text = flatten_submission(&sample_submission()).unwrap();
        let expected = "\
Submission (Result ID: result123)
For Document: doc789 in Folder: folderABC.
Owned by user: userXYZ.
Timestamp: 2025-04-15T10:00:00Z.
Field Values:
  FirstName: Alice
  NewsletterOpt: Checked
  Age: 34";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_checkbox_states() {
        let checked = json!({ "fieldType": "checkbox", "fieldName": "Opt", "value": true });
        let unchecked = json!({ "fieldType": "checkbox", "fieldName": "Opt", "value": false });
        assert_eq!(flatten_field(&checked), "Opt: Checked");
        assert_eq!(flatten_field(&unchecked), "Opt: Unchecked");
    }

    #[test]
    fn test_password_redacted() {
        let field = json!({ "fieldType": "password", "fieldName": "Secret", "value": "hunter2" });
        let text = flatten_field(&field);
        assert_eq!(text, "Secret: [REDACTED]");
        assert!(!text.contains("hunter2"));
    }

    #[test]
    fn test_address_skips_empty_parts() {
        let field = json!({
            "fieldType": "address",
            "fieldName": "Home",
            "value": { "line1": "123 Main St", "line2": "", "city": "Springfield", "state": "IL", "zip": "12345" }
        });
        assert_eq!(
            flatten_field(&field),
            "Home: 123 Main St, Springfield, IL, 12345"
        );
    }

    #[test]
    fn test_table_rows_numbered_in_order() {
        let field = json!({
            "fieldType": "table",
            "fieldName": "OrderItems",
            "value": [
                { "Item": "Paper Clips", "Quantity": 3 },
                { "Item": "Markers", "Quantity": 5 }
            ]
        });
        let text = flatten_field(&field);
        assert_eq!(
            text,
            "OrderItems:\n  Row1: [Item=Paper Clips, Quantity=3]\n  Row2: [Item=Markers, Quantity=5]"
        );
    }

    #[test]
    fn test_signature_with_metadata() {
        let field = json!({
            "fieldType": "signature",
            "fieldName": "Signature",
            "value": { "timestamp": "2025-04-15T10:00:00Z", "fileRef": "sig_abc.png" }
        });
        assert_eq!(
            flatten_field(&field),
            "Signature: Signature provided at 2025-04-15T10:00:00Z, file: sig_abc.png"
        );
    }

    #[test]
    fn test_location_with_coordinates() {
        let field = json!({
            "fieldType": "location",
            "fieldName": "Site",
            "value": { "lat": 35.6895, "lon": 139.6917 }
        });
        assert_eq!(flatten_field(&field), "Site: (Lat=35.6895, Lon=139.6917)");
    }

    #[test]
    fn test_invalid_composite_values_get_placeholders() {
        let address = json!({ "fieldType": "address", "fieldName": "Home", "value": "elsewhere" });
        let table = json!({ "fieldType": "table", "fieldName": "Rows", "value": 7 });
        let location = json!({ "fieldType": "location", "fieldName": "Site", "value": {} });
        assert_eq!(flatten_field(&address), "Home: [Invalid address data]");
        assert_eq!(flatten_field(&table), "Rows: [Invalid table data]");
        assert_eq!(flatten_field(&location), "Site: [Location data]");
    }

    #[test]
    fn test_unknown_field_type_falls_back() {
        let field = json!({ "fieldType": "stars", "fieldName": "Rating", "value": 5 });
        assert_eq!(flatten_field(&field), "Rating: 5");
    }

    #[test]
    fn test_missing_header_fields_render_empty() {
        let text = flatten_submission(&json!({ "fieldValues": [] })).unwrap();
        assert!(text.starts_with("Submission (Result ID: )"));
    }

    #[test]
    fn test_non_object_submission_fails() {
        assert!(flatten_submission(&json!("just a string")).is_err());
    }

    #[test]
    fn test_non_array_field_values_fails() {
        let doc = json!({ "_id": "r1", "fieldValues": {} });
        assert!(flatten_submission(&doc).is_err());
    }
}
