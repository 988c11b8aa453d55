use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Account-store record. Not `Serialize`: the password hash and refresh
/// token never leave this subsystem, every outbound shape goes through
/// [`Identity`] or [`OwnerView`].
#[derive(Debug, Clone, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub password_hash: String,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Public projection of an account. Resolved once per request by the
/// identity verifier and passed explicitly to everything downstream.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
}

impl From<&Account> for Identity {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            full_name: account.full_name.clone(),
            avatar_url: account.avatar_url.clone(),
        }
    }
}

/// Owner fields exposed by aggregated read views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerView {
    pub username: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
}
