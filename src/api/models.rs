use crate::phone::{Identity, lenient_phone, lenient_phone_opt};
use chrono::DateTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentType {
    Image,
    Doc,
}

impl AttachmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentType::Image => "image",
            AttachmentType::Doc => "doc",
        }
    }
}

impl fmt::Display for AttachmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store timestamp with second granularity as the ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    #[serde(default)]
    pub nanos: i32,
}

impl Timestamp {
    pub fn from_rfc3339(text: &str) -> Option<Self> {
        let dt = DateTime::parse_from_rfc3339(text).ok()?;
        Some(Self { seconds: dt.timestamp(), nanos: dt.timestamp_subsec_nanos() as i32 })
    }
}

/// Anything that is not a recognisable timestamp decodes as absent.
fn lenient_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Timestamp>, D::Error> {
    let value = serde_json::Value::deserialize(d)?;
    Ok(match value {
        serde_json::Value::Object(_) => serde_json::from_value::<Timestamp>(value).ok(),
        serde_json::Value::Number(n) => n.as_i64().map(|seconds| Timestamp { seconds, nanos: 0 }),
        serde_json::Value::String(s) => Timestamp::from_rfc3339(&s),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_phone")]
    pub from: String,
    #[serde(default, deserialize_with = "lenient_phone")]
    pub chat_with: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_attachment", skip_serializing_if = "Option::is_none")]
    pub attachment_type: Option<AttachmentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
}

fn lenient_attachment<'de, D: Deserializer<'de>>(d: D) -> Result<Option<AttachmentType>, D::Error> {
    let value = serde_json::Value::deserialize(d)?;
    Ok(serde_json::from_value(value).ok())
}

impl Message {
    /// Seconds used for ordering; records without a timestamp sort as 0.
    pub fn seconds(&self) -> i64 {
        self.created_at.map(|t| t.seconds).unwrap_or(0)
    }

    /// One-line preview shown in the conversation list.
    pub fn summary(&self) -> String {
        match (&self.text, self.attachment_type, &self.attachment_url) {
            (Some(text), _, _) if !text.is_empty() => text.clone(),
            (_, Some(kind), _) => format!("{kind} attachment"),
            (_, None, Some(_)) => "attachment".to_string(),
            _ => String::new(),
        }
    }
}

/// A registered user document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_phone_opt")]
    pub phone: Option<String>,
    #[serde(default)]
    pub profile_pic: Option<String>,
}

/// Derived per-counterparty summary; never written back to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub counterparty: Identity,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub last_message_summary: String,
    pub last_timestamp: i64,
}

/// A contact from the device address book, as handed in by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceContact {
    pub id: String,
    pub name: String,
    pub phone_numbers: Vec<String>,
}

/// A device contact that belongs to a registered user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedContact {
    pub contact_id: String,
    pub name: String,
    pub identity: Identity,
    pub avatar_url: Option<String>,
}
