use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Operator row as read for authentication, including the password hash.
#[derive(Debug, Clone, FromRow)]
pub struct OperatorRecord {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub email: Option<String>,
    pub phone: String,
    pub is_active: bool,
    pub is_limited_event_access: bool,
    pub is_limited_classes_access: bool,
    pub device_id: Option<String>,
    pub device_access_token: Option<String>,
    pub password: String,
    pub role_id: Option<i64>,
    pub role_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Option<i64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventClass {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEvent {
    pub id: i64,
    pub name: String,
    pub classes: Vec<EventClass>,
}

/// Which events an operator may see. `Limited(vec![])` grants nothing,
/// unlike `Unrestricted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "events", rename_all = "snake_case")]
pub enum AccessPolicy {
    Unrestricted,
    Limited(Vec<AccessEvent>),
}

impl AccessPolicy {
    pub fn is_limited(&self) -> bool {
        matches!(self, AccessPolicy::Limited(_))
    }
}

/// One row of the grant join: an event grant with an optional class grant.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct AccessGrantRow {
    pub event_id: i64,
    pub event_name: String,
    pub class_id: Option<i64>,
    pub class_name: Option<String>,
}

/// Profile returned on login. Secrets stay in [`OperatorRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatorProfile {
    pub id: i64,
    pub role: Role,
    pub name: String,
    pub username: String,
    pub email: Option<String>,
    pub phone: String,
    pub is_active: bool,
    pub is_limited_event_access: bool,
    pub is_limited_classes_access: bool,
    pub device_id: Option<String>,
    pub access: AccessPolicy,
}

impl OperatorProfile {
    pub fn new(record: OperatorRecord, access: AccessPolicy) -> Self {
        Self {
            id: record.id,
            role: Role {
                id: record.role_id,
                name: record.role_name,
            },
            name: record.name,
            username: record.username,
            email: record.email,
            phone: record.phone,
            is_active: record.is_active,
            is_limited_event_access: record.is_limited_event_access,
            is_limited_classes_access: record.is_limited_classes_access,
            device_id: record.device_id,
            access,
        }
    }
}

/// Insert payload for a new operator; `password_hash` is already bcrypt.
#[derive(Debug, Clone)]
pub struct NewOperator {
    pub name: String,
    pub username: String,
    pub email: Option<String>,
    pub phone: String,
    pub password_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn access_policy_is_tagged() {
        let unrestricted = serde_json::to_value(AccessPolicy::Unrestricted).unwrap();
        assert_eq!(unrestricted, json!({ "type": "unrestricted" }));

        let limited = serde_json::to_value(AccessPolicy::Limited(vec![AccessEvent {
            id: 1,
            name: "Expo".into(),
            classes: vec![],
        }]))
        .unwrap();
        assert_eq!(limited["type"], "limited");
        assert_eq!(limited["events"][0]["classes"], json!([]));
    }
}
