use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Number of characters in a device code.
pub const CODE_LENGTH: usize = 6;

/// Whether `code` has the shape of a device code.
pub fn is_valid_code(code: &str) -> bool {
    code.chars().count() == CODE_LENGTH
}

/// Records expire this long after `created_at`.
pub const DEVICE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// A registered device as stored in the `devices` collection.
///
/// Field names follow the collection layout written by earlier deployments,
/// so existing records deserialize unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Device {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub code: String,
    #[serde(rename = "fcmToken")]
    pub push_token: String,
    #[serde(
        rename = "createdAt",
        with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime"
    )]
    pub created_at: DateTime<Utc>,
}

impl Device {
    pub fn new(code: impl Into<String>, push_token: impl Into<String>) -> Self {
        Self {
            id: None,
            code: code.into(),
            push_token: push_token.into(),
            created_at: Utc::now(),
        }
    }

    /// Whether the record has outlived `ttl` at instant `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now - self.created_at >= ttl,
            Err(_) => false,
        }
    }
}

/// JSON shape of a device in API responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub code: String,
    pub fcm_token: String,
    pub created_at: DateTime<Utc>,
}

impl From<Device> for DeviceView {
    fn from(device: Device) -> Self {
        Self {
            id: device.id.map(|id| id.to_hex()),
            code: device.code,
            fcm_token: device.push_token,
            created_at: device.created_at,
        }
    }
}
