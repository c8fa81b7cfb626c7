//! Data carried across the collaborator seams.
//!
//! These types serialize with camelCase field names because they are
//! embedded directly into envelope payloads (`userId`, `fullName`, ...),
//! matching what clients read out of the wire format.

use serde::{Deserialize, Serialize};

use chatwire_protocol::UserId;

/// A user's presence/availability, as shown to their friends.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Availability {
    Online,
    Away,
    Busy,
    #[default]
    Offline,
}

/// The public view of an account, as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    pub availability: Availability,
}

/// Input to [`AuthService::register`](crate::AuthService::register).
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

/// A partial profile edit; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub status_message: Option<String>,
    pub availability: Option<Availability>,
    pub avatar_url: Option<String>,
}
