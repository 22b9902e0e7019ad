use std::time::Duration;
use ureq::Agent;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ZendeskError};
use crate::models::*;

/// Zendesk Support REST API client
///
/// One method per endpoint; every call issues exactly one blocking HTTP
/// request. Methods take `&self`, so a client can be shared across threads.
pub struct ZendeskClient {
    agent: Agent,
    base_url: String,
    auth_header: String,
}

// Request/response wrappers: Zendesk nests every payload under a
// resource-name key, e.g. {"user": {...}} or {"tickets": [...]}.

#[derive(Serialize)]
struct UserBody<'a> {
    user: &'a User,
}

#[derive(Serialize)]
struct UsersBody<'a> {
    users: &'a [User],
}

#[derive(Serialize)]
struct TicketBody<'a> {
    ticket: &'a Ticket,
}

#[derive(Serialize)]
struct TicketsBody<'a> {
    tickets: &'a [Ticket],
}

#[derive(Deserialize)]
struct UserEnvelope {
    user: User,
}

#[derive(Deserialize)]
struct TicketEnvelope {
    ticket: Ticket,
}

#[derive(Deserialize)]
struct JobStatusEnvelope {
    job_status: JobStatus,
}

#[derive(Deserialize)]
struct JobStatusList {
    job_statuses: Vec<JobStatus>,
}

impl ZendeskClient {
    /// Create a new client authenticating with an API token
    ///
    /// Zendesk token auth is HTTP Basic with `{email}/token` as the
    /// username and the API token as the password.
    pub fn new(base_url: &str, email: &str, api_token: &str) -> Self {
        let credentials = format!("{}/token:{}", email, api_token);
        let auth_header = format!("Basic {}", base64_encode(&credentials));
        Self::with_auth_header(base_url, auth_header)
    }

    /// Create a new client authenticating with an OAuth access token
    pub fn with_oauth_token(base_url: &str, token: &str) -> Self {
        Self::with_auth_header(base_url, format!("Bearer {}", token))
    }

    fn with_auth_header(base_url: &str, auth_header: String) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(30)))
            // Non-2xx statuses are inspected manually in check_response
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header,
        }
    }

    /// Build a full URL from a path under /api/v2
    fn api_url(&self, path: &str) -> String {
        format!("{}/api/v2{}", self.base_url, path)
    }

    /// Check response status and return an error if not successful
    fn check_response(
        &self,
        mut response: ureq::http::Response<ureq::Body>,
    ) -> Result<ureq::http::Response<ureq::Body>> {
        let status = response.status().as_u16();

        if (200..300).contains(&status) {
            return Ok(response);
        }

        // Try to read the error body for a usable message
        let body = response
            .body_mut()
            .read_to_string()
            .unwrap_or_else(|_| String::new());

        // Zendesk error bodies come in two shapes:
        //   {"error": "RecordNotFound", "description": "..."}
        //   {"error": {"title": "...", "message": "..."}}
        let message = if let Ok(value) = serde_json::from_str::<serde_json::Value>(&body) {
            value
                .get("description")
                .and_then(|d| d.as_str())
                .map(String::from)
                .or_else(|| {
                    let error = value.get("error")?;
                    error
                        .as_str()
                        .map(String::from)
                        .or_else(|| error.get("message")?.as_str().map(String::from))
                })
                .unwrap_or(body)
        } else if body.is_empty() {
            format!("HTTP {}", status)
        } else {
            body
        };

        match status {
            401 => Err(ZendeskError::Unauthorized),
            404 => Err(ZendeskError::NotFound(message)),
            _ => Err(ZendeskError::Api { status, message }),
        }
    }

    /// Read the response body and decode it as JSON
    fn read_body<T: DeserializeOwned>(
        &self,
        mut response: ureq::http::Response<ureq::Body>,
    ) -> Result<T> {
        let body = response.body_mut().read_to_string()?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Decode the `job_status` envelope every bulk endpoint responds with
    fn read_job_status(&self, response: ureq::http::Response<ureq::Body>) -> Result<JobStatus> {
        let envelope: JobStatusEnvelope = self.read_body(response)?;
        Ok(envelope.job_status)
    }

    // ==================== User Operations ====================

    /// List users on the account
    pub fn list_users(&self) -> Result<Vec<User>> {
        let url = self.api_url("/users.json");

        let response = self
            .agent
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .call()
            .map_err(ZendeskError::Http)?;

        let response = self.check_response(response)?;
        let list: UserList = self.read_body(response)?;
        Ok(list.users)
    }

    /// List one page of users
    ///
    /// Returns the whole page envelope so callers can follow `next_page`
    /// themselves.
    pub fn list_users_page(&self, page: usize, per_page: usize) -> Result<UserList> {
        let url = self.api_url(&format!("/users.json?page={}&per_page={}", page, per_page));

        let response = self
            .agent
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .call()
            .map_err(ZendeskError::Http)?;

        let response = self.check_response(response)?;
        self.read_body(response)
    }

    /// Fetch a single user by id
    pub fn show_user(&self, id: u64) -> Result<User> {
        let url = self.api_url(&format!("/users/{}.json", id));

        let response = self
            .agent
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .call()
            .map_err(ZendeskError::Http)?;

        let response = self.check_response(response)?;
        let envelope: UserEnvelope = self.read_body(response)?;
        Ok(envelope.user)
    }

    /// Fetch several users in one request
    pub fn show_many_users(&self, ids: &[u64]) -> Result<Vec<User>> {
        let url = self.api_url(&format!("/users/show_many.json?ids={}", comma_join_ids(ids)));

        let response = self
            .agent
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .call()
            .map_err(ZendeskError::Http)?;

        let response = self.check_response(response)?;
        let list: UserList = self.read_body(response)?;
        Ok(list.users)
    }

    /// Create a user
    pub fn create_user(&self, user: &User) -> Result<User> {
        let url = self.api_url("/users.json");

        let response = self
            .agent
            .post(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send_json(&UserBody { user })
            .map_err(ZendeskError::Http)?;

        let response = self.check_response(response)?;
        let envelope: UserEnvelope = self.read_body(response)?;
        Ok(envelope.user)
    }

    /// Update an existing user
    ///
    /// The user's `id` selects the record being updated and must be set.
    pub fn update_user(&self, user: &User) -> Result<User> {
        let url = self.api_url(&format!("/users/{}.json", user.id.unwrap_or_default()));

        let response = self
            .agent
            .put(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send_json(&UserBody { user })
            .map_err(ZendeskError::Http)?;

        let response = self.check_response(response)?;
        let envelope: UserEnvelope = self.read_body(response)?;
        Ok(envelope.user)
    }

    /// Create a user, or update the existing one matched by email or
    /// external id
    pub fn create_or_update_user(&self, user: &User) -> Result<User> {
        let url = self.api_url("/users/create_or_update.json");

        let response = self
            .agent
            .post(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send_json(&UserBody { user })
            .map_err(ZendeskError::Http)?;

        let response = self.check_response(response)?;
        let envelope: UserEnvelope = self.read_body(response)?;
        Ok(envelope.user)
    }

    /// Delete a user
    ///
    /// Zendesk soft-deletes users and echoes the deleted record back.
    pub fn destroy_user(&self, id: u64) -> Result<User> {
        let url = self.api_url(&format!("/users/{}.json", id));

        let response = self
            .agent
            .delete(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .call()
            .map_err(ZendeskError::Http)?;

        let response = self.check_response(response)?;
        let envelope: UserEnvelope = self.read_body(response)?;
        Ok(envelope.user)
    }

    /// Create several users in one call
    ///
    /// The records are processed by a background job; the returned
    /// [`JobStatus`] is the handle Zendesk assigns to it.
    pub fn create_many_users(&self, users: &[User]) -> Result<JobStatus> {
        let url = self.api_url("/users/create_many.json");

        let response = self
            .agent
            .post(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send_json(&UsersBody { users })
            .map_err(ZendeskError::Http)?;

        let response = self.check_response(response)?;
        self.read_job_status(response)
    }

    /// Update several users in one call
    pub fn update_many_users(&self, users: &[User]) -> Result<JobStatus> {
        let url = self.api_url("/users/update_many.json");

        let response = self
            .agent
            .put(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send_json(&UsersBody { users })
            .map_err(ZendeskError::Http)?;

        let response = self.check_response(response)?;
        self.read_job_status(response)
    }

    /// Create or update several users in one call
    pub fn create_or_update_many_users(&self, users: &[User]) -> Result<JobStatus> {
        let url = self.api_url("/users/create_or_update_many.json");

        let response = self
            .agent
            .post(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send_json(&UsersBody { users })
            .map_err(ZendeskError::Http)?;

        let response = self.check_response(response)?;
        self.read_job_status(response)
    }

    /// Delete several users in one call
    pub fn destroy_many_users(&self, ids: &[u64]) -> Result<JobStatus> {
        let url = self.api_url(&format!(
            "/users/destroy_many.json?ids={}",
            comma_join_ids(ids)
        ));

        let response = self
            .agent
            .delete(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .call()
            .map_err(ZendeskError::Http)?;

        let response = self.check_response(response)?;
        self.read_job_status(response)
    }

    // ==================== Ticket Operations ====================

    /// List tickets on the account
    pub fn list_tickets(&self) -> Result<Vec<Ticket>> {
        let url = self.api_url("/tickets.json");

        let response = self
            .agent
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .call()
            .map_err(ZendeskError::Http)?;

        let response = self.check_response(response)?;
        let list: TicketList = self.read_body(response)?;
        Ok(list.tickets)
    }

    /// List one page of tickets
    pub fn list_tickets_page(&self, page: usize, per_page: usize) -> Result<TicketList> {
        let url = self.api_url(&format!(
            "/tickets.json?page={}&per_page={}",
            page, per_page
        ));

        let response = self
            .agent
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .call()
            .map_err(ZendeskError::Http)?;

        let response = self.check_response(response)?;
        self.read_body(response)
    }

    /// Fetch a single ticket by id
    pub fn show_ticket(&self, id: u64) -> Result<Ticket> {
        let url = self.api_url(&format!("/tickets/{}.json", id));

        let response = self
            .agent
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .call()
            .map_err(ZendeskError::Http)?;

        let response = self.check_response(response)?;
        let envelope: TicketEnvelope = self.read_body(response)?;
        Ok(envelope.ticket)
    }

    /// Fetch several tickets in one request
    pub fn show_many_tickets(&self, ids: &[u64]) -> Result<Vec<Ticket>> {
        let url = self.api_url(&format!(
            "/tickets/show_many.json?ids={}",
            comma_join_ids(ids)
        ));

        let response = self
            .agent
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .call()
            .map_err(ZendeskError::Http)?;

        let response = self.check_response(response)?;
        let list: TicketList = self.read_body(response)?;
        Ok(list.tickets)
    }

    /// Create a ticket
    ///
    /// The ticket's text travels as a comment; see
    /// [`Ticket::with_derived_comment`].
    pub fn create_ticket(&self, ticket: &Ticket) -> Result<Ticket> {
        let url = self.api_url("/tickets.json");
        let ticket = ticket.with_derived_comment();

        let response = self
            .agent
            .post(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send_json(&TicketBody { ticket: &ticket })
            .map_err(ZendeskError::Http)?;

        let response = self.check_response(response)?;
        let envelope: TicketEnvelope = self.read_body(response)?;
        Ok(envelope.ticket)
    }

    /// Update an existing ticket
    ///
    /// The ticket's `id` selects the record being updated and must be set.
    pub fn update_ticket(&self, ticket: &Ticket) -> Result<Ticket> {
        let url = self.api_url(&format!(
            "/tickets/{}.json",
            ticket.id.unwrap_or_default()
        ));
        let ticket = ticket.with_derived_comment();

        let response = self
            .agent
            .put(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send_json(&TicketBody { ticket: &ticket })
            .map_err(ZendeskError::Http)?;

        let response = self.check_response(response)?;
        let envelope: TicketEnvelope = self.read_body(response)?;
        Ok(envelope.ticket)
    }

    /// Delete a ticket
    ///
    /// Zendesk acknowledges the delete with 204 No Content and an empty
    /// body. Any other status is surfaced as
    /// [`ZendeskError::UnexpectedStatus`]; the body is not read.
    pub fn destroy_ticket(&self, id: u64) -> Result<()> {
        let url = self.api_url(&format!("/tickets/{}.json", id));

        let response = self
            .agent
            .delete(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .call()
            .map_err(ZendeskError::Http)?;

        match response.status().as_u16() {
            204 => Ok(()),
            status => Err(ZendeskError::UnexpectedStatus(status)),
        }
    }

    /// Create several tickets in one call
    ///
    /// The records are processed by a background job; the returned
    /// [`JobStatus`] is the handle Zendesk assigns to it.
    pub fn create_many_tickets(&self, tickets: &[Ticket]) -> Result<JobStatus> {
        let url = self.api_url("/tickets/create_many.json");
        let tickets: Vec<Ticket> = tickets.iter().map(Ticket::with_derived_comment).collect();

        let response = self
            .agent
            .post(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send_json(&TicketsBody { tickets: &tickets })
            .map_err(ZendeskError::Http)?;

        let response = self.check_response(response)?;
        self.read_job_status(response)
    }

    /// Update several tickets in one call
    pub fn update_many_tickets(&self, tickets: &[Ticket]) -> Result<JobStatus> {
        let url = self.api_url("/tickets/update_many.json");
        let tickets: Vec<Ticket> = tickets.iter().map(Ticket::with_derived_comment).collect();

        let response = self
            .agent
            .put(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send_json(&TicketsBody { tickets: &tickets })
            .map_err(ZendeskError::Http)?;

        let response = self.check_response(response)?;
        self.read_job_status(response)
    }

    /// Delete several tickets in one call
    pub fn destroy_many_tickets(&self, ids: &[u64]) -> Result<JobStatus> {
        let url = self.api_url(&format!(
            "/tickets/destroy_many.json?ids={}",
            comma_join_ids(ids)
        ));

        let response = self
            .agent
            .delete(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .call()
            .map_err(ZendeskError::Http)?;

        let response = self.check_response(response)?;
        self.read_job_status(response)
    }

    // ==================== Job Status Operations ====================

    /// Fetch the status of a background job
    pub fn show_job_status(&self, id: &str) -> Result<JobStatus> {
        let url = self.api_url(&format!("/job_statuses/{}.json", urlencoding::encode(id)));

        let response = self
            .agent
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .call()
            .map_err(ZendeskError::Http)?;

        let response = self.check_response(response)?;
        self.read_job_status(response)
    }

    /// List recent background jobs
    pub fn list_job_statuses(&self) -> Result<Vec<JobStatus>> {
        let url = self.api_url("/job_statuses.json");

        let response = self
            .agent
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .call()
            .map_err(ZendeskError::Http)?;

        let response = self.check_response(response)?;
        let list: JobStatusList = self.read_body(response)?;
        Ok(list.job_statuses)
    }
}

/// Join ids into the comma-separated form the bulk endpoints take
///
/// Each id is percent-encoded before joining; digits pass through
/// unchanged, so the query keeps the documented `ids=3,7,9` shape.
fn comma_join_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(|id| urlencoding::encode(&id.to_string()).into_owned())
        .collect::<Vec<_>>()
        .join(",")
}

/// Base64 encoding for the Basic auth header (small, dependency-free)
fn base64_encode(input: &str) -> String {
    const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

    let bytes = input.as_bytes();
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);

    for chunk in bytes.chunks(3) {
        let group = ((chunk[0] as u32) << 16)
            | ((chunk.get(1).copied().unwrap_or(0) as u32) << 8)
            | (chunk.get(2).copied().unwrap_or(0) as u32);

        out.push(ALPHABET[((group >> 18) & 0x3f) as usize] as char);
        out.push(ALPHABET[((group >> 12) & 0x3f) as usize] as char);

        if chunk.len() > 1 {
            out.push(ALPHABET[((group >> 6) & 0x3f) as usize] as char);
        } else {
            out.push('=');
        }

        if chunk.len() > 2 {
            out.push(ALPHABET[(group & 0x3f) as usize] as char);
        } else {
            out.push('=');
        }
    }

    out
}
