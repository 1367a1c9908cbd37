//! Comment Guard
//!
//! Authoritative duplicate prevention: an item whose journal notes contain
//! the reserved signature already carries an AI comment and is never advised
//! again. The checkpoint only narrows what gets looked at.

use domain::Item;

/// Whether any journal note of `item` contains `signature` verbatim
pub fn has_ai_comment(item: &Item, signature: &str) -> bool {
    item.has_signed_note(signature)
}

#[derive(Debug, Clone)]
pub struct CommentGuard {
    signature: String,
}

impl CommentGuard {
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
        }
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn is_guarded(&self, item: &Item) -> bool {
        has_ai_comment(item, &self.signature)
    }
}
