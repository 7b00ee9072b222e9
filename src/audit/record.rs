//! Audit record types

use std::fmt;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::change::ChangeEntry;

/// Mutation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Create,
    Update,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One audited mutation
///
/// Created once per mutation. Only `changes` and `updated_at` change
/// afterwards, through amendment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: Uuid,
    pub action: AuditAction,
    pub target_entity: String,
    pub target_id: Uuid,
    pub changes: Vec<ChangeEntry>,
    pub user_id: Uuid,
    #[serde(with = "millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "millis")]
    pub updated_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(
        action: AuditAction,
        target_entity: impl Into<String>,
        target_id: Uuid,
        changes: Vec<ChangeEntry>,
        user_id: Uuid,
    ) -> Self {
        let now = now();
        Self {
            id: Uuid::new_v4(),
            action,
            target_entity: target_entity.into(),
            target_id,
            changes,
            user_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Appends one change and stamps `updated_at`.
    pub fn amend(&mut self, change: ChangeEntry, at: DateTime<Utc>) {
        self.changes.push(change);
        self.updated_at = at;
    }
}

/// Current time at millisecond precision, the precision timestamps are
/// stored with
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Timestamp format shared by audit records and entity documents.
///
/// Fixed-width RFC 3339, so string order is chronological order.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

mod millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(at))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let target = Uuid::new_v4();
        let user = Uuid::new_v4();
        let record = AuditRecord::new(
            AuditAction::Create,
            "Deal",
            target,
            vec![ChangeEntry::created("title", "Big deal")],
            user,
        );

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["action"], "CREATE");
        assert_eq!(value["targetEntity"], "Deal");
        assert_eq!(value["targetId"], json!(target.to_string()));
        assert_eq!(value["userId"], json!(user.to_string()));
        assert_eq!(value["changes"], json!([{"field": "title", "to": "Big deal"}]));
        assert_eq!(value["createdAt"], json!(format_timestamp(&record.created_at)));

        let back: AuditRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_amend_appends() {
        let mut record =
            AuditRecord::new(AuditAction::Update, "Task", Uuid::new_v4(), vec![], Uuid::new_v4());
        let later = record.created_at + chrono::Duration::seconds(5);
        record.amend(ChangeEntry::updated("title", Some("a".into()), Some("b".into())), later);

        assert_eq!(record.changes.len(), 1);
        assert_eq!(record.updated_at, later);
        assert!(record.created_at < record.updated_at);
    }

    #[test]
    fn test_format_timestamp() {
        let at = "2024-05-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(format_timestamp(&at), "2024-05-01T10:00:00.000Z");
    }
}
