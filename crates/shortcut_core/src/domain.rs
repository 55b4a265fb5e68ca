//! crates/shortcut_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of the backend SDK and of any stored document shape;
//! the `normalize` module is the only place that knows about raw documents.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// The authenticated identity of the current user, as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// A read-only projection of an article document after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: String,
    pub headline: String,
    pub summary: String,
    /// HTML body. Rendering is left to the presentation layer.
    pub content: String,
    pub author: String,
    pub publish_date: String,
    pub read_time: String,
    pub image_url: String,
    pub topics: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Article {
    /// The timestamp used to order articles: creation time, then the publish date,
    /// then the epoch for documents carrying neither.
    pub fn recency(&self) -> DateTime<Utc> {
        self.created_at
            .or_else(|| crate::normalize::parse_date_str(&self.publish_date))
            .unwrap_or_default()
    }
}

/// The two binary interactions a user can toggle on an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InteractionKind {
    Like,
    Save,
}

impl InteractionKind {
    /// Name of the user-document field holding this interaction.
    pub fn field(self) -> &'static str {
        match self {
            InteractionKind::Like => "likedArticles",
            InteractionKind::Save => "savedArticles",
        }
    }
}

impl std::fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InteractionKind::Like => f.write_str("like"),
            InteractionKind::Save => f.write_str("save"),
        }
    }
}

/// Saved articles in either of the two historical storage shapes.
///
/// Resolved once when a user document is normalized; everything downstream
/// goes through the methods below instead of inspecting the variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavedArticles {
    /// Legacy shape: a plain list of article ids.
    IdSet(BTreeSet<String>),
    /// Preferred shape: article id mapped to the time it was saved. Entries whose
    /// stored value is not a timestamp (e.g. `true`) keep membership without a time.
    TimestampedMap(BTreeMap<String, Option<DateTime<Utc>>>),
}

impl Default for SavedArticles {
    fn default() -> Self {
        SavedArticles::IdSet(BTreeSet::new())
    }
}

impl SavedArticles {
    pub fn contains(&self, article_id: &str) -> bool {
        match self {
            SavedArticles::IdSet(ids) => ids.contains(article_id),
            SavedArticles::TimestampedMap(map) => map.contains_key(article_id),
        }
    }

    pub fn ids(&self) -> BTreeSet<String> {
        match self {
            SavedArticles::IdSet(ids) => ids.clone(),
            SavedArticles::TimestampedMap(map) => map.keys().cloned().collect(),
        }
    }

    /// When the article was saved, if the stored shape records it.
    pub fn saved_at(&self, article_id: &str) -> Option<DateTime<Utc>> {
        match self {
            SavedArticles::IdSet(_) => None,
            SavedArticles::TimestampedMap(map) => map.get(article_id).copied().flatten(),
        }
    }

    pub fn has_timestamps(&self) -> bool {
        matches!(self, SavedArticles::TimestampedMap(_))
    }

    pub fn len(&self) -> usize {
        match self {
            SavedArticles::IdSet(ids) => ids.len(),
            SavedArticles::TimestampedMap(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn insert(&mut self, article_id: &str, at: DateTime<Utc>) {
        match self {
            SavedArticles::IdSet(ids) => {
                ids.insert(article_id.to_string());
            }
            SavedArticles::TimestampedMap(map) => {
                map.insert(article_id.to_string(), Some(at));
            }
        }
    }

    pub fn remove(&mut self, article_id: &str) {
        match self {
            SavedArticles::IdSet(ids) => {
                ids.remove(article_id);
            }
            SavedArticles::TimestampedMap(map) => {
                map.remove(article_id);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadingProgress {
    pub percent: u8,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Aggregate counters kept on the user document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserStats {
    pub articles_read: u64,
    pub articles_liked: u64,
    pub articles_saved: u64,
    pub total_reading_time: u64,
}

/// A user's interactions with articles: the client's cached copy of the remote record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionRecord {
    pub liked_article_ids: HashSet<String>,
    pub saved_article_ids: SavedArticles,
    pub read_article_ids: HashSet<String>,
    pub reading_progress: HashMap<String, ReadingProgress>,
    pub stats: UserStats,
}

impl InteractionRecord {
    pub fn flag(&self, article_id: &str, kind: InteractionKind) -> bool {
        match kind {
            InteractionKind::Like => self.liked_article_ids.contains(article_id),
            InteractionKind::Save => self.saved_article_ids.contains(article_id),
        }
    }

    pub fn set_flag(&mut self, article_id: &str, kind: InteractionKind, value: bool) {
        match (kind, value) {
            (InteractionKind::Like, true) => {
                self.liked_article_ids.insert(article_id.to_string());
            }
            (InteractionKind::Like, false) => {
                self.liked_article_ids.remove(article_id);
            }
            (InteractionKind::Save, true) => self.saved_article_ids.insert(article_id, Utc::now()),
            (InteractionKind::Save, false) => self.saved_article_ids.remove(article_id),
        }
    }

    pub fn is_read(&self, article_id: &str) -> bool {
        self.read_article_ids.contains(article_id)
    }
}

/// The numbers shown on the profile screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileStats {
    pub articles_read: u64,
    pub saved: usize,
    pub liked: usize,
}

impl From<&InteractionRecord> for ProfileStats {
    fn from(record: &InteractionRecord) -> Self {
        // Older documents never maintained the counter.
        let articles_read = record
            .stats
            .articles_read
            .max(record.read_article_ids.len() as u64);
        Self {
            articles_read,
            saved: record.saved_article_ids.len(),
            liked: record.liked_article_ids.len(),
        }
    }
}
