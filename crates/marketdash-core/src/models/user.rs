//! User models: the signed-in profile held by the session, and the
//! account records returned by the admin user listing.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::utils::contains_ignore_case;

/// Account role. Unknown strings from the backend are preserved and never
/// grant admin rights.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    #[default]
    User,
    Admin,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Other(s) => s.as_str(),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match s.as_str() {
            "user" => Role::User,
            "admin" => Role::Admin,
            _ => Role::Other(s),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated user's profile, as returned by sign-in and persisted
/// under the `user_data` storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(alias = "user_email")]
    pub email: String,
    #[serde(alias = "user_full_name", alias = "full_name")]
    pub full_name: String,
    #[serde(default)]
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Text(String),
    Int(i64),
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match IdRepr::deserialize(deserializer)? {
        IdRepr::Text(s) => s,
        IdRepr::Int(n) => n.to_string(),
    })
}

/// An account row from the admin `users` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct AdminUser {
    pub id: i64,
    pub user_email: String,
    pub user_full_name: String,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub role: Role,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl AdminUser {
    /// Parsed `timestamp`. Accepts RFC 3339, naive ISO date-times and bare
    /// dates; anything else is `None`.
    pub fn joined_at(&self) -> Option<NaiveDateTime> {
        let ts = self.timestamp.as_deref()?.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
            return Some(dt.naive_utc());
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(ts, fmt).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(ts, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UsersResponse {
    #[serde(default)]
    pub users: Vec<AdminUser>,
}

/// Verification state filter for the user listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerificationFilter {
    #[default]
    All,
    Verified,
    Unverified,
}

/// Ordering of the user listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserSort {
    /// Full name, case-insensitive
    Name,
    Email,
    /// Newest account first; missing or unreadable timestamps last
    #[default]
    Joined,
    /// Verified accounts first
    Verified,
}

impl UserSort {
    pub fn compare(&self, a: &AdminUser, b: &AdminUser) -> Ordering {
        match self {
            UserSort::Name => compare_text(&a.user_full_name, &b.user_full_name),
            UserSort::Email => compare_text(&a.user_email, &b.user_email),
            UserSort::Joined => match (a.joined_at(), b.joined_at()) {
                (Some(x), Some(y)) => y.cmp(&x),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            UserSort::Verified => b.is_verified.cmp(&a.is_verified),
        }
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

impl FromStr for UserSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(UserSort::Name),
            "email" => Ok(UserSort::Email),
            "joined" | "timestamp" => Ok(UserSort::Joined),
            "verified" => Ok(UserSort::Verified),
            other => Err(format!(
                "unknown sort {:?} (expected name, email, joined or verified)",
                other
            )),
        }
    }
}

/// Client-side filter and ordering over the admin user listing.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub search: Option<String>,
    pub role: Option<Role>,
    pub verification: VerificationFilter,
    pub sort: UserSort,
}

impl UserFilter {
    pub fn matches(&self, user: &AdminUser) -> bool {
        if let Some(ref term) = self.search {
            if !term.is_empty()
                && !contains_ignore_case(&user.user_full_name, term)
                && !contains_ignore_case(&user.user_email, term)
            {
                return false;
            }
        }
        if let Some(ref role) = self.role {
            if &user.role != role {
                return false;
            }
        }
        match self.verification {
            VerificationFilter::All => true,
            VerificationFilter::Verified => user.is_verified,
            VerificationFilter::Unverified => !user.is_verified,
        }
    }

    /// Matching users in `sort` order. Ties keep backend order.
    pub fn apply<'a>(&self, users: &'a [AdminUser]) -> Vec<&'a AdminUser> {
        let mut selected: Vec<&AdminUser> = users.iter().filter(|u| self.matches(u)).collect();
        selected.sort_by(|a, b| self.sort.compare(a, b));
        selected
    }
}

/// Verified/unverified head counts for the user listing header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserCounts {
    pub total: usize,
    pub verified: usize,
    pub unverified: usize,
    pub admins: usize,
}

impl UserCounts {
    pub fn from_users(users: &[AdminUser]) -> Self {
        let verified = users.iter().filter(|u| u.is_verified).count();
        Self {
            total: users.len(),
            verified,
            unverified: users.len() - verified,
            admins: users.iter().filter(|u| u.role.is_admin()).count(),
        }
    }
}
