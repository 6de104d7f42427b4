use crate::models::{ChangeType, DocumentChange};

/// Byte offset of the `char_pos`-th character, clamped to the end of `text`.
fn byte_offset(text: &str, char_pos: usize) -> usize {
    text.char_indices().nth(char_pos).map_or(text.len(), |(i, _)| i)
}

/// Splice one change into `text` at its character position.
///
/// Positions past the end are clamped. Concurrent edits are not transformed
/// against each other: a change applies at its recorded offset no matter what
/// was applied before it.
pub fn apply_change(text: &mut String, change: &DocumentChange) {
    let position = usize::try_from(change.position).unwrap_or(0);
    let start = byte_offset(text, position);

    let removed_chars = match change.change_type {
        ChangeType::Insert => 0,
        ChangeType::Delete => change.content.chars().count(),
        ChangeType::Replace => change.previous_content.as_deref().map_or(0, |p| p.chars().count()),
    };
    let end = start + byte_offset(&text[start..], removed_chars);

    let inserted = match change.change_type {
        ChangeType::Delete => "",
        ChangeType::Insert | ChangeType::Replace => change.content.as_str(),
    };
    text.replace_range(start..end, inserted);
}

/// Rebuild text by applying `changes` in order to an empty document.
/// Callers pass changes sorted by ascending timestamp.
pub fn replay<'a>(changes: impl IntoIterator<Item = &'a DocumentChange>) -> String {
    let mut text = String::new();
    for change in changes {
        apply_change(&mut text, change);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn change(change_type: ChangeType, position: i32, content: &str, previous: Option<&str>) -> DocumentChange {
        DocumentChange {
            id: 0,
            book_id: 1,
            chapter_id: None,
            user_id: 1,
            change_type,
            position,
            content: content.to_string(),
            previous_content: previous.map(str::to_string),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn insert_delete_replace_sequence() {
        let changes = vec![
            change(ChangeType::Insert, 0, "Hello world", None),
            change(ChangeType::Insert, 5, ",", None),
            change(ChangeType::Delete, 6, " ", None),
            change(ChangeType::Replace, 6, "there", Some("world")),
        ];
        assert_eq!(replay(&changes), "Hello,there");
    }

    #[test]
    fn positions_count_characters_not_bytes() {
        let mut text = "naïve café".to_string();
        apply_change(&mut text, &change(ChangeType::Replace, 6, "bar", Some("café")));
        assert_eq!(text, "naïve bar");
    }

    #[test]
    fn out_of_range_positions_clamp_to_the_end() {
        let mut text = "abc".to_string();
        apply_change(&mut text, &change(ChangeType::Insert, 40, "d", None));
        assert_eq!(text, "abcd");
        apply_change(&mut text, &change(ChangeType::Delete, 2, "cdefg", None));
        assert_eq!(text, "ab");
    }

    #[test]
    fn concurrent_edits_at_the_same_offset_are_not_transformed() {
        // Both users typed at offset 0 of "cat"; naive splicing interleaves them.
        let changes = vec![
            change(ChangeType::Insert, 0, "cat", None),
            change(ChangeType::Insert, 0, "the ", None),
            change(ChangeType::Insert, 0, "a ", None),
        ];
        assert_eq!(replay(&changes), "a the cat");
    }
}
