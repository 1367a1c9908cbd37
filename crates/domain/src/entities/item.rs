//! Item - read-only projection of a tracker issue
//!
//! Never mutated locally; re-fetched from the tracker or taken from the
//! per-tick batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ItemId = u64;

/// One entry of an item's comment history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journal {
    pub id: u64,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_on: Option<DateTime<Utc>>,
}

impl Journal {
    /// Non-empty trimmed notes, if any
    pub fn text(&self) -> Option<&str> {
        self.notes
            .as_deref()
            .map(str::trim)
            .filter(|notes| !notes.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub subject: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub tracker: String,
    #[serde(default)]
    pub author: Option<String>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    #[serde(default)]
    pub journals: Vec<Journal>,
}

impl Item {
    pub fn journal_count(&self) -> usize {
        self.journals.len()
    }

    pub fn has_journals(&self) -> bool {
        !self.journals.is_empty()
    }

    /// Whether any journal note contains `needle` verbatim
    pub fn any_note_contains(&self, needle: &str) -> bool {
        self.journals
            .iter()
            .filter_map(|journal| journal.notes.as_deref())
            .any(|notes| notes.contains(needle))
    }

    /// Whether a note carries the AI signature. An empty signature never
    /// matches, otherwise every note would.
    pub fn has_signed_note(&self, signature: &str) -> bool {
        !signature.is_empty() && self.any_note_contains(signature)
    }
}
