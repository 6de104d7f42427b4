use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub username: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i32,
    pub author_id: i32,
    pub title: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CollaboratorStatus {
    Pending,
    Accepted,
    Declined,
}

impl CollaboratorStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(CollaboratorStatus::Pending),
            "accepted" => Some(CollaboratorStatus::Accepted),
            "declined" => Some(CollaboratorStatus::Declined),
            _ => None,
        }
    }
}

/// A user granted access to someone else's book
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Collaborator {
    pub id: i32,
    pub book_id: i32,
    pub user_id: i32,
    /// co-author, editor or viewer
    pub role: String,
    pub status: CollaboratorStatus,
    #[serde(default = "Utc::now")]
    pub invited_at: DateTime<Utc>,
}
