use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::sync::{Arc, RwLock};

pub type PostId = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: PostId,
    /// DID of the author.
    pub author: String,
    pub handle: String,
    pub display_name: Option<String>,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub reply_count: i64,
    pub repost_count: i64,
    pub like_count: i64,
    /// Who reposted it into the timeline, if it arrived as a repost.
    pub reposted_by: Option<String>,
    pub is_reply: bool,
}

/// Read-only view of one timeline, as published by the store.
///
/// `items` and `pending_items` are ordered newest first. A `None` entry marks a
/// gap in the timeline; ids that don't resolve in `statuses` are treated as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSnapshot {
    pub items: Vec<Option<PostId>>,
    pub pending_items: Vec<Option<PostId>>,
    pub statuses: HashMap<PostId, Post>,
    pub is_loading: bool,
    pub is_partial: bool,
    pub unread: usize,
    pub top: bool,
    pub cursor: Option<String>,
    pub revision: u64,
}

impl Default for FeedSnapshot {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pending_items: Vec::new(),
            statuses: HashMap::new(),
            is_loading: false,
            is_partial: false,
            unread: 0,
            top: true,
            cursor: None,
            revision: 0,
        }
    }
}

impl FeedSnapshot {
    pub fn has_unread(&self) -> bool {
        self.unread > 0
    }
    /// Resolved posts of `items`, in order.
    pub fn posts(&self) -> impl Iterator<Item = &Post> {
        self.items
            .iter()
            .flatten()
            .filter_map(|id| self.statuses.get(id))
    }
    pub fn contains(&self, id: &PostId) -> bool {
        self.items
            .iter()
            .chain(self.pending_items.iter())
            .any(|item| item.as_ref() == Some(id))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Home,
}

impl ColumnKind {
    pub fn timeline(&self) -> &'static str {
        match self {
            Self::Home => "home",
        }
    }
}

impl Display for ColumnKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home => write!(f, "Home"),
        }
    }
}

pub type ColumnParams = serde_json::Map<String, serde_json::Value>;

/// Kinds of posts a column shows, read from its params.
///
/// A missing or non-boolean param counts as shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shows {
    pub reposts: bool,
    pub replies: bool,
}

impl Shows {
    pub const REPOSTS: &'static str = "reposts";
    pub const REPLIES: &'static str = "replies";

    pub fn from_params(params: &ColumnParams) -> Self {
        let shows = |key| {
            params
                .get(key)
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(true)
        };
        Self {
            reposts: shows(Self::REPOSTS),
            replies: shows(Self::REPLIES),
        }
    }
    pub fn allows(&self, post: &Post) -> bool {
        (self.reposts || post.reposted_by.is_none()) && (self.replies || !post.is_reply)
    }
}

impl Default for Shows {
    fn default() -> Self {
        Self {
            reposts: true,
            replies: true,
        }
    }
}

/// A pinned column, persisted across sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnSettings {
    pub id: String,
    pub kind: ColumnKind,
    #[serde(default)]
    pub params: ColumnParams,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimelineAction {
    AddColumn(ColumnKind, ColumnParams),
    RemoveColumn(String),
    MoveColumn(String, isize),
    /// Sets one param of a pinned column.
    ChangeColumnParams(String, String, serde_json::Value),
    ExpandTimeline {
        name: String,
        max_id: Option<PostId>,
    },
    ScrollTop(String, bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub did: String,
    pub handle: String,
}

/// Shared session state. Signed in iff an account is present.
#[derive(Debug, Clone, Default)]
pub struct Identity(Arc<RwLock<Option<Account>>>);

impl Identity {
    pub fn new(account: Option<Account>) -> Self {
        Self(Arc::new(RwLock::new(account)))
    }
    pub fn account(&self) -> Option<Account> {
        self.0.read().ok().and_then(|account| account.clone())
    }
    pub fn signed_in(&self) -> bool {
        self.account().is_some()
    }
    pub fn viewer(&self) -> Option<String> {
        self.account().map(|account| account.did)
    }
}
