use tracing::{debug, warn};

use crate::db::CollabStore;
use crate::models::{CollabError, CollaboratorStatus};

/// Why a user may edit a book
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Author,
    Collaborator { role: String },
}

/// Allow the book's author or an accepted collaborator; deny everyone else,
/// including users whose invitation is pending or declined.
pub async fn ensure_collaboration_permission(
    store: &dyn CollabStore,
    user_id: i32,
    book_id: i32,
) -> Result<Access, CollabError> {
    if let Some(collaborator) = store.check_collaboration_permission(user_id, book_id).await? {
        if collaborator.status == CollaboratorStatus::Accepted {
            debug!("User {} is a {} of book {}", user_id, collaborator.role, book_id);
            return Ok(Access::Collaborator { role: collaborator.role });
        }
    }

    match store.get_book(book_id).await? {
        Some(book) if book.author_id == user_id => Ok(Access::Author),
        Some(_) => {
            warn!("User {} has no collaboration access to book {}", user_id, book_id);
            Err(CollabError::PermissionDenied)
        }
        None => {
            warn!("User {} asked for unknown book {}", user_id, book_id);
            Err(CollabError::PermissionDenied)
        }
    }
}
