use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authenticated identity attached to a streaming connection.
///
/// Captured once at admission and used for every visibility check that
/// connection triggers; the broker itself never inspects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub uuid: String,
    pub is_admin: bool,
}

impl Principal {
    pub fn new(uuid: impl Into<String>, is_admin: bool) -> Self {
        Self {
            uuid: uuid.into(),
            is_admin,
        }
    }
}

/// One row of the `logs` table.
///
/// The `Serialize` impl is the standard external representation: exactly
/// what a streaming client receives, one JSON document per record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LogRecord {
    pub id: i64,
    pub uuid: String,
    /// Entity this log entry describes.
    pub object_uuid: String,
    /// Owner of that entity, the visibility anchor for non-admin readers.
    pub object_owner_uuid: String,
    pub event_type: String,
    pub summary: Option<String>,
    pub properties: serde_json::Value,
    pub event_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> LogRecord {
        LogRecord {
            id: 7,
            uuid: "zzzzz-57u5n-0123456789abcde".to_string(),
            object_uuid: "zzzzz-4zz18-0123456789abcde".to_string(),
            object_owner_uuid: "zzzzz-tpzed-u1".to_string(),
            event_type: "create".to_string(),
            summary: Some("created collection".to_string()),
            properties: serde_json::json!({ "size": 42 }),
            event_at: "2026-08-01T12:00:00Z".parse().unwrap(),
            created_at: "2026-08-01T12:00:00Z".parse().unwrap(),
            updated_at: "2026-08-01T12:00:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn wire_representation_has_stable_field_set() {
        let json = serde_json::to_value(sample_record()).unwrap();
        let obj = json.as_object().unwrap();
        let mut keys: Vec<_> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "created_at",
                "event_at",
                "event_type",
                "id",
                "object_owner_uuid",
                "object_uuid",
                "properties",
                "summary",
                "updated_at",
                "uuid",
            ]
        );
        assert_eq!(obj["id"], 7);
        assert_eq!(obj["properties"]["size"], 42);
    }

    #[test]
    fn wire_representation_round_trips() {
        let record = sample_record();
        let json = serde_json::to_string(&record).unwrap();
        let back: LogRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.uuid, record.uuid);
        assert_eq!(back.event_at, record.event_at);
    }
}
