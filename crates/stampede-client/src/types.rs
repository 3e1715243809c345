// Wire types for the target's documented HTTP contract.
//
// All success responses wrap their payload as {success: true, data, meta?};
// failures come back as {success: false, error} with a 4xx/5xx status.
// /health is served bare by some targets and enveloped by others; the client
// accepts both.

use serde::{Deserialize, Deserializer, Serialize};

/// Response envelope used by every endpoint except /health
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default = "none")]
    pub data: Option<T>,
    pub error: Option<String>,
    pub meta: Option<Meta>,
}

fn none<T>() -> Option<T> {
    None
}

/// Pagination metadata
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub total: Option<u64>,
}

/// A post as returned by the target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub author_id: Option<String>,
    #[serde(default)]
    pub views: Option<u64>,
    #[serde(default)]
    pub likes: Option<u64>,
}

/// Payload for POST /posts
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub author_id: u64,
}

/// A user as returned by the target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Payload for POST /users
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

/// GET /health response (not enveloped)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub memory: Option<MemoryInfo>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryInfo {
    pub heap_used: u64,
}

impl MemoryInfo {
    /// Heap usage in megabytes
    pub fn heap_used_mb(&self) -> f64 {
        self.heap_used as f64 / (1024.0 * 1024.0)
    }
}

// The target is free to hand out numeric or string ids; normalize to String
// so run state can key on them either way.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Str(String),
        Num(u64),
    }
    Ok(match Id::deserialize(deserializer)? {
        Id::Str(s) => s,
        Id::Num(n) => n.to_string(),
    })
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Str(String),
        Num(u64),
    }
    Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
        Id::Str(s) => s,
        Id::Num(n) => n.to_string(),
    }))
}
