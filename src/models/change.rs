use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Kind of edit carried by a document change
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Insert,
    Delete,
    Replace,
}

impl ChangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeType::Insert => "insert",
            ChangeType::Delete => "delete",
            ChangeType::Replace => "replace",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "insert" => Some(ChangeType::Insert),
            "delete" => Some(ChangeType::Delete),
            "replace" => Some(ChangeType::Replace),
            _ => None,
        }
    }
}

/// A persisted edit in the change log
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentChange {
    pub id: i64,
    pub book_id: i32,
    pub chapter_id: Option<i32>,
    pub user_id: i32,
    pub change_type: ChangeType,
    pub position: i32,
    pub content: String,
    pub previous_content: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A change accepted from a client, before the store assigns `id` and `timestamp`
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocumentChange {
    pub book_id: i32,
    pub chapter_id: Option<i32>,
    pub user_id: i32,
    pub change_type: ChangeType,
    pub position: i32,
    pub content: String,
    pub previous_content: Option<String>,
}

/// The `data` payload of an inbound `change` message
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChangeData {
    pub change_type: ChangeType,
    pub position: i64,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub previous_content: Option<String>,
    #[serde(default)]
    pub chapter_id: Option<i32>,
}

impl ChangeData {
    /// Validate the payload and bind it to an author and a book.
    pub fn into_new_change(
        self,
        book_id: i32,
        chapter_id: Option<i32>,
        user_id: i32,
    ) -> Result<NewDocumentChange, String> {
        let position = i32::try_from(self.position)
            .ok()
            .filter(|p| *p >= 0)
            .ok_or_else(|| format!("position {} is out of range", self.position))?;

        if self.change_type == ChangeType::Replace && self.previous_content.is_none() {
            return Err("replace requires previousContent".to_string());
        }

        Ok(NewDocumentChange {
            book_id,
            chapter_id: chapter_id.or(self.chapter_id),
            user_id,
            change_type: self.change_type,
            position,
            content: self.content,
            previous_content: self.previous_content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(change_type: ChangeType, position: i64, previous: Option<&str>) -> ChangeData {
        ChangeData {
            change_type,
            position,
            content: "abc".to_string(),
            previous_content: previous.map(str::to_string),
            chapter_id: Some(4),
        }
    }

    #[test]
    fn replace_without_previous_content_is_rejected() {
        let err = data(ChangeType::Replace, 0, None)
            .into_new_change(1, None, 2)
            .unwrap_err();
        assert!(err.contains("previousContent"));
    }

    #[test]
    fn negative_position_is_rejected() {
        assert!(data(ChangeType::Insert, -1, None).into_new_change(1, None, 2).is_err());
    }

    #[test]
    fn message_chapter_overrides_payload_chapter() {
        let change = data(ChangeType::Delete, 3, None)
            .into_new_change(1, Some(9), 2)
            .unwrap();
        assert_eq!(change.chapter_id, Some(9));

        let change = data(ChangeType::Delete, 3, None)
            .into_new_change(1, None, 2)
            .unwrap();
        assert_eq!(change.chapter_id, Some(4));
    }

    #[test]
    fn change_type_parses_wire_names() {
        assert_eq!(ChangeType::parse("replace"), Some(ChangeType::Replace));
        assert_eq!(ChangeType::parse("upsert"), None);
        assert_eq!(ChangeType::Insert.as_str(), "insert");
    }
}
