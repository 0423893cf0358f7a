//! The portlet resource endpoint behind the market watch tables.
//!
//! The endpoint answers a form POST with a JSON object whose payload field is
//! a *string* holding another JSON document: the array of row objects keyed by
//! short column codes.

use serde_json::Value;
use url::Url;

use crate::error::AppError;
use crate::models::RawRecord;
use crate::table::TableId;

/// Short column codes used by the endpoint → table display headers.
pub const COLUMN_MAPPING: &[(&str, &str)] = &[
    ("ismt_idntr", "Security Description"),
    ("ttc", "Trades"),
    ("tta", "TTA"),
    ("op", "Open"),
    ("hi", "High"),
    ("lo", "Low"),
    ("ltp", "LTP"),
    ("arrow", "Arrow"),
    ("indicator", "Indicator"),
    ("lty", "LTY"),
    ("prev_trad_rate", "Previous Trade Rate"),
    ("trade_yeild", "Trade Yield"),
    ("mrkt_indc", "Market Indicator"),
    ("book_indc", "Book Indicator"),
];

/// Build the resource URL for `table` on the portlet page at `base_url`.
pub fn resource_url(base_url: &str, portlet_id: &str, table: TableId) -> Result<Url, AppError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| AppError::ConfigError(format!("Invalid base URL '{base_url}': {e}")))?;

    url.query_pairs_mut()
        .append_pair("p_p_id", portlet_id)
        .append_pair("p_p_lifecycle", "2")
        .append_pair("p_p_state", "normal")
        .append_pair("p_p_mode", "view")
        .append_pair("p_p_resource_id", table.resource_id())
        .append_pair("p_p_cacheability", "cacheLevelPage");

    Ok(url)
}

/// Decode a resource response into raw records with display headers.
pub fn decode_payload(body: &str, payload_field: &str) -> Result<Vec<RawRecord>, AppError> {
    let outer: Value = serde_json::from_str(body)
        .map_err(|e| AppError::ParseError(format!("Response is not JSON: {e}")))?;

    let payload = outer.get(payload_field).ok_or_else(|| {
        AppError::ParseError(format!("Response has no '{payload_field}' field"))
    })?;

    let rows: Value = match payload {
        Value::String(encoded) => serde_json::from_str(encoded).map_err(|e| {
            AppError::ParseError(format!("Field '{payload_field}' is not valid JSON: {e}"))
        })?,
        // Some deployments already inline the array.
        Value::Array(_) => payload.clone(),
        other => {
            return Err(AppError::ParseError(format!(
                "Field '{payload_field}' has unexpected type: {}",
                type_name(other)
            )));
        }
    };

    let Value::Array(rows) = rows else {
        return Err(AppError::ParseError(format!(
            "Field '{payload_field}' does not hold an array"
        )));
    };

    let mut records = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        let Value::Object(fields) = row else {
            tracing::warn!(row = index, "Payload row is not an object, skipping row");
            continue;
        };

        let record: RawRecord = fields
            .into_iter()
            .filter_map(|(key, value)| cell_text(value).map(|text| (display_header(&key), text)))
            .collect();
        records.push(record);
    }

    Ok(records)
}

fn display_header(code: &str) -> String {
    COLUMN_MAPPING
        .iter()
        .find(|(short, _)| *short == code)
        .map(|(_, header)| header.to_string())
        .unwrap_or_else(|| code.to_string())
}

fn cell_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
