use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Zendesk user
///
/// The same struct is read back from the API and submitted on
/// create/update; server-assigned fields stay `None` on outgoing records
/// and are skipped during serialization.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// One page of users
///
/// `next_page`/`previous_page` hold the follow-up URLs Zendesk reports for
/// offset pagination, `count` the total across all pages.
#[derive(Debug, Clone, Deserialize)]
pub struct UserList {
    pub users: Vec<User>,
    pub next_page: Option<String>,
    pub previous_page: Option<String>,
    pub count: Option<u64>,
}
