//! Client Key-Value Protocol
//!
//! Routes and Data Transfer Objects (DTOs) of the client-facing key-value API.
//!
//! Requests arrive as form bodies (`val=...&payload=...`) and every response is
//! a flat JSON object. The `payload` field carries the vector clock of the key
//! so that clients can hand it back on their next write and keep their own
//! writes causally ordered.

use serde::{Deserialize, Serialize};

// --- API Endpoints ---

/// Root of the key-value routes (`/keyValue-store/:key`).
pub const ENDPOINT_KEY_VALUE: &str = "/keyValue-store";
/// Existence check (`/keyValue-store/search/:key`).
pub const ENDPOINT_SEARCH: &str = "/keyValue-store/search";

// --- Messages ---

pub const MSG_ADDED: &str = "Added successfully";
pub const MSG_UPDATED: &str = "Updated successfully";
pub const MSG_DELETED: &str = "Key deleted";
pub const MSG_KEY_MISSING: &str = "Key does not exist";
pub const MSG_KEY_INVALID: &str = "Key not valid";
pub const MSG_VALUE_TOO_LARGE: &str = "Object too large. Size limit is 1MB";

// --- Data Transfer Objects ---

/// Form body of a PUT.
#[derive(Debug, Deserialize)]
pub struct PutForm {
    /// The value to store.
    pub val: String,
    /// JSON-encoded vector clock the client has observed so far (optional).
    #[serde(default)]
    pub payload: Option<String>,
}

/// Form body of a GET/DELETE/search carrying only causal context.
#[derive(Debug, Default, Deserialize)]
pub struct PayloadForm {
    #[serde(default)]
    pub payload: Option<String>,
}

/// Response body shared by all key-value routes. Absent fields are omitted.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct KvResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "isExists", skip_serializing_if = "Option::is_none")]
    pub is_exists: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    /// The key's vector clock, JSON encoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl KvResponse {
    pub fn success() -> Self {
        Self {
            result: Some("Success".to_string()),
            ..Default::default()
        }
    }

    pub fn error(msg: &str) -> Self {
        Self {
            result: Some("Error".to_string()),
            msg: Some(msg.to_string()),
            ..Default::default()
        }
    }
}
