use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::DocumentChange;

#[derive(Deserialize, IntoParams, Debug, Default)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ChangesQuery {
    /// Only changes made by this user
    pub user_id: Option<i32>,
    /// Maximum number of changes, newest kept
    pub limit: Option<i64>,
}

#[derive(Deserialize, IntoParams, Debug, Default)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ContentQuery {
    pub chapter_id: Option<i32>,
}

/// Recent entries of a book's change log, oldest first
#[derive(Serialize, Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChangesResponse {
    pub book_id: i32,
    pub changes: Vec<DocumentChange>,
}

/// Text rebuilt by replaying a chapter's change log
#[derive(Serialize, Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ContentResponse {
    pub book_id: i32,
    pub chapter_id: Option<i32>,
    pub content: String,
    pub change_count: usize,
}
