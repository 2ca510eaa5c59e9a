//! Entity records hydrated from forum markup.
//!
//! All values are immutable snapshots produced once per fetch. There is no
//! identity cache: fetching the same id twice yields independent copies.
//! A `Post` owns its `Thread`, which owns its author `Member`; nothing
//! holds a back reference to its container.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A forum member profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: u64,
    pub username: String,
    /// User title string shown under the name.
    pub role: String,
    /// Badge texts in display order, blanks excluded.
    pub roles: Vec<String>,
    pub message_count: u64,
    pub reaction_score: u64,
    pub trophy_points: u64,
    pub last_activity: DateTime<Utc>,
}

impl Member {
    /// Minimal member built from an inline link when full hydration is
    /// unavailable: id and username only, counters zeroed.
    pub fn stub(id: u64, username: impl Into<String>) -> Self {
        Member {
            id,
            username: username.into(),
            role: String::new(),
            roles: Vec::new(),
            message_count: 0,
            reaction_score: 0,
            trophy_points: 0,
            last_activity: Utc::now(),
        }
    }
}

/// A discussion thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: u64,
    pub title: String,
    /// Thread starter; a stub when author hydration degraded.
    pub author: Member,
    pub date: DateTime<Utc>,
    pub category_id: u64,
    /// Post ids in document order.
    pub posts: Vec<u64>,
    pub reply_count: usize,
    pub is_locked: bool,
}

/// A single post, carrying its fully hydrated parent thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    /// Post author; a stub when author hydration degraded.
    pub author: Member,
    pub thread: Thread,
    pub date: Option<DateTime<Utc>>,
    /// Raw inner markup of the message body; empty when absent.
    pub content: String,
    /// Plain-text rendering of the message body; empty when absent.
    pub text_content: String,
}

/// A forum category (node).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub title: String,
    pub description: String,
}

/// One page of a category's thread list, partitioned by pin state.
/// Each partition preserves the source row order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadListing {
    pub pinned: Vec<u64>,
    pub regular: Vec<u64>,
}
