use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;

/// An account holder. Every transaction, budget and savings record is owned
/// by exactly one user.
///
/// The password is held and compared as plain text. This is a known gap:
/// there is no hashing and no strength policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(skip)]
    pub password: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            password: password.into(),
            created_at: Utc::now(),
        }
    }
}
