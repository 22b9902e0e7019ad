use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Comment attached to a ticket submission
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TicketComment {
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
}

/// Zendesk ticket
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Ticket {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<TicketComment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Ticket {
    /// Returns a copy with `comment` populated from `description`
    ///
    /// Zendesk ignores a bare `description` on submission; outgoing ticket
    /// text has to travel as a comment. `description` itself is left
    /// untouched, and a ticket without one comes back unchanged.
    pub fn with_derived_comment(&self) -> Ticket {
        let mut ticket = self.clone();
        if let Some(description) = &ticket.description {
            ticket.comment = Some(TicketComment {
                body: description.clone(),
                public: None,
            });
        }
        ticket
    }
}

/// One page of tickets
#[derive(Debug, Clone, Deserialize)]
pub struct TicketList {
    pub tickets: Vec<Ticket>,
    pub next_page: Option<String>,
    pub previous_page: Option<String>,
    pub count: Option<u64>,
}
