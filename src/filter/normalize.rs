//! Field-name and value normalization
//!
//! Rules applied to every leaf before compilation:
//! - A path segment equal to `id` becomes the primary key `_id`
//! - Paths with an `_id` segment take identifier operands (UUID)
//! - Date-named fields take date operands
//! - Blank operands make the leaf a no-op

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::store::document::PRIMARY_KEY;

use super::errors::{FilterError, FilterResult};
use super::native::Operand;

/// Timestamp fields stamped on every entity
pub const TIMESTAMP_FIELDS: [&str; 2] = ["createdAt", "updatedAt"];

/// Operand type a field path expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Identifier,
    Date,
    Plain,
}

/// Rewrites `id` segments to the primary key name.
pub fn normalize_path(path: &str) -> String {
    path.split('.')
        .map(|segment| if segment == "id" { PRIMARY_KEY } else { segment })
        .collect::<Vec<_>>()
        .join(".")
}

/// Classifies a normalized path.
///
/// Reference fields (`stageId`, `userIds`) are not dates even when their
/// name happens to contain "date", as in `updatedById`.
pub fn field_kind(path: &str) -> FieldKind {
    if path.split('.').any(|segment| segment == PRIMARY_KEY) {
        return FieldKind::Identifier;
    }

    let last = path.rsplit('.').next().unwrap_or(path);
    let is_reference = last.ends_with("Id") || last.ends_with("Ids");
    if TIMESTAMP_FIELDS.contains(&last)
        || (!is_reference && last.to_lowercase().contains("date"))
    {
        return FieldKind::Date;
    }

    FieldKind::Plain
}

/// True when a leaf operand should make the leaf a no-op.
///
/// Blank form inputs arrive as `""`, `[]`, `[""]` or `null`.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => {
            items.is_empty() || (items.len() == 1 && items[0].as_str() == Some(""))
        }
        _ => false,
    }
}

/// Parses a stored or supplied value as a UTC timestamp.
///
/// Accepts RFC 3339 strings, plain `YYYY-MM-DD` dates (midnight UTC) and
/// epoch milliseconds.
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

/// Parses a stored or supplied value as an identifier.
pub fn parse_identifier(value: &Value) -> Option<Uuid> {
    value.as_str().and_then(|s| Uuid::parse_str(s).ok())
}

/// Coerces one scalar operand for the field at `path`.
pub fn coerce_scalar(path: &str, operator: &str, value: &Value) -> FilterResult<Operand> {
    match field_kind(path) {
        FieldKind::Identifier => parse_identifier(value).map(Operand::Id).ok_or_else(|| {
            FilterError::invalid_value(path, operator, format!("{} is not a valid identifier", value))
        }),
        FieldKind::Date => parse_date(value).map(Operand::Date).ok_or_else(|| {
            FilterError::invalid_value(path, operator, format!("{} is not a valid date", value))
        }),
        FieldKind::Plain => Ok(Operand::Json(value.clone())),
    }
}

/// Coerces a list operand element-wise.
pub fn coerce_list(path: &str, operator: &str, value: &Value) -> FilterResult<Vec<Operand>> {
    let items = value
        .as_array()
        .ok_or_else(|| FilterError::invalid_value(path, operator, "expected a list"))?;
    items
        .iter()
        .map(|item| coerce_scalar(path, operator, item))
        .collect()
}
