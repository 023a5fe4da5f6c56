//! Shard administration routes and their DTOs.

use serde::{Deserialize, Serialize};

pub const ENDPOINT_SHARD_MY_ID: &str = "/shard/my_id";
pub const ENDPOINT_SHARD_ALL_IDS: &str = "/shard/all_ids";
pub const ENDPOINT_SHARD_MEMBERS: &str = "/shard/members";
pub const ENDPOINT_SHARD_COUNT: &str = "/shard/count";
pub const ENDPOINT_SHARD_CHANGE_NUMBER: &str = "/shard/changeShardNumber";

/// Form body of `PUT /shard/changeShardNumber`.
#[derive(Debug, Deserialize)]
pub struct ChangeShardForm {
    pub num: String,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ShardResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard_ids: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<String>,
    #[serde(rename = "Count", skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl ShardResponse {
    pub fn success() -> Self {
        Self {
            result: Some("Success".to_string()),
            ..Default::default()
        }
    }

    pub fn error(msg: String) -> Self {
        Self {
            result: Some("Error".to_string()),
            msg: Some(msg),
            ..Default::default()
        }
    }
}
