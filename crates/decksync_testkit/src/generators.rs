//! Property-based generators.

use decksync_core::{Document, DocumentContent, StudyItem, UserId};
use proptest::prelude::*;

/// Strategy for a study item.
pub fn arb_study_item() -> impl Strategy<Value = StudyItem> {
    ("[a-z]{1,12}", "[a-z ]{1,24}").prop_map(|(term, definition)| StudyItem { term, definition })
}

/// Strategy for document content.
pub fn arb_content() -> impl Strategy<Value = DocumentContent> {
    (
        "[A-Za-z ]{1,20}",
        "[A-Za-z ]{0,40}",
        proptest::collection::vec("[a-z]{1,8}", 0..4),
        proptest::collection::vec(arb_study_item(), 0..8),
    )
        .prop_map(|(title, description, tags, items)| DocumentContent {
            title,
            description,
            tags,
            items,
        })
}

/// Strategy for a freshly created local document.
pub fn arb_document(owner: &str) -> impl Strategy<Value = Document> {
    let owner = owner.to_string();
    (arb_content(), 0i64..2_000_000_000_000).prop_map(move |(content, now)| {
        Document::new(UserId::new(owner.clone()), content, now)
            .expect("generated content always hashes")
    })
}
