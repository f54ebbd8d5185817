//! User model as returned by the backend.

use crate::time_utils::iso8601;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account profile. Only the server changes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Server-assigned user ID
    pub id: String,
    /// Email address
    pub email: String,
    /// Phone number without country code
    pub phone_number: String,
    /// Display name
    #[serde(rename = "fullName")]
    pub full_name: String,
    /// When the account was created
    #[serde(rename = "createdAt", with = "iso8601")]
    pub created_at: DateTime<Utc>,
    /// Last server-side update
    #[serde(rename = "updatedAt", with = "iso8601")]
    pub updated_at: DateTime<Utc>,
}
