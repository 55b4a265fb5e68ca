//! crates/shortcut_core/src/service.rs
//!
//! The interaction service facade: translates user intents ("like article X",
//! "mark as read") into document-store mutations and normalizes everything it
//! reads back. Screens talk to this type, never to the store directly.

use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

use crate::domain::{Article, InteractionKind, InteractionRecord, SavedArticles, Session};
use crate::error::FetchError;
use crate::normalize::{
    normalize_articles, normalize_interactions, normalize_saved, saved_articles_in_order,
};
use crate::ports::{DocumentStore, FieldUpdate, PortResult};

pub struct InteractionService {
    store: Arc<dyn DocumentStore>,
    /// `(uid, article_id)` pairs with a mark-read in flight.
    marking: Mutex<HashSet<(String, String)>>,
}

impl InteractionService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            marking: Mutex::new(HashSet::new()),
        }
    }

    //=====================================================================================
    // Reads
    //=====================================================================================

    pub async fn fetch_articles(&self) -> Result<Vec<Article>, FetchError> {
        let docs = self
            .store
            .fetch_article_documents()
            .await
            .map_err(FetchError::Articles)?;
        let articles = normalize_articles(docs, Utc::now());
        debug!(count = articles.len(), "Fetched articles.");
        Ok(articles)
    }

    pub async fn fetch_interactions(&self, uid: &str) -> Result<InteractionRecord, FetchError> {
        if uid.is_empty() {
            return Ok(InteractionRecord::default());
        }
        let doc = self
            .store
            .fetch_user_document(uid)
            .await
            .map_err(|source| FetchError::Interactions {
                uid: uid.to_string(),
                source,
            })?;
        Ok(normalize_interactions(doc.as_ref()))
    }

    /// The user's saved articles out of `articles`, most recently saved first.
    pub async fn saved_articles(
        &self,
        uid: &str,
        articles: &[Article],
    ) -> Result<Vec<Article>, FetchError> {
        let record = self.fetch_interactions(uid).await?;
        Ok(saved_articles_in_order(&record.saved_article_ids, articles))
    }

    pub async fn reading_history(
        &self,
        uid: &str,
        articles: &[Article],
    ) -> Result<Vec<Article>, FetchError> {
        let record = self.fetch_interactions(uid).await?;
        Ok(articles
            .iter()
            .filter(|a| record.is_read(&a.id))
            .cloned()
            .collect())
    }

    //=====================================================================================
    // Writes
    //=====================================================================================

    /// Sets a like/save flag remotely. Returns whether the backend accepted it.
    pub async fn mutate_interaction(
        &self,
        uid: &str,
        article_id: &str,
        kind: InteractionKind,
        value: bool,
    ) -> bool {
        if uid.is_empty() || article_id.is_empty() {
            warn!(%kind, "Rejected interaction update with an empty id.");
            return false;
        }

        let field = kind.field().to_string();
        let uses_map = match kind {
            InteractionKind::Like => false,
            InteractionKind::Save => match self.saved_shape(uid).await {
                Ok(shape) => shape,
                Err(e) => {
                    warn!(%article_id, "Could not read saved-articles shape: {e}");
                    return false;
                }
            },
        };

        let change = match (uses_map, value) {
            (false, true) => FieldUpdate::ArrayUnion {
                field,
                value: article_id.to_string(),
            },
            (false, false) => FieldUpdate::ArrayRemove {
                field,
                value: article_id.to_string(),
            },
            (true, true) => FieldUpdate::MapSet {
                field,
                key: article_id.to_string(),
                at: Utc::now(),
            },
            (true, false) => FieldUpdate::MapDelete {
                field,
                key: article_id.to_string(),
            },
        };

        match self
            .store
            .update_user_document(uid, vec![change, last_activity()])
            .await
        {
            Ok(()) => {
                debug!(%uid, %article_id, %kind, value, "Interaction updated.");
                true
            }
            Err(e) => {
                warn!(%uid, %article_id, %kind, value, "Interaction update failed: {e}");
                false
            }
        }
    }

    /// Records that the user opened an article. Repeat calls for the same pair
    /// never count twice. Returns whether this call counted the read.
    pub async fn mark_read(&self, uid: &str, article_id: &str) -> PortResult<bool> {
        if uid.is_empty() || article_id.is_empty() {
            return Ok(false);
        }
        let Some(_guard) = MarkGuard::acquire(&self.marking, uid, article_id) else {
            debug!(%article_id, "Mark-read already in flight.");
            return Ok(false);
        };

        match self.store.fetch_user_document(uid).await? {
            None => {
                self.store
                    .create_user_document(
                        uid,
                        json!({
                            "readArticles": [article_id],
                            "stats": { "articlesRead": 1 },
                        }),
                    )
                    .await?;
            }
            Some(doc) => {
                if normalize_interactions(Some(&doc)).is_read(article_id) {
                    return Ok(false);
                }
                self.store
                    .update_user_document(
                        uid,
                        vec![
                            FieldUpdate::ArrayUnion {
                                field: "readArticles".into(),
                                value: article_id.to_string(),
                            },
                            FieldUpdate::Increment {
                                path: path(&["stats", "articlesRead"]),
                                by: 1,
                            },
                            last_activity(),
                        ],
                    )
                    .await?;
            }
        }
        info!(%uid, %article_id, "Article marked as read.");
        Ok(true)
    }

    /// Stores reading progress for an article; the last write wins.
    pub async fn update_progress(&self, uid: &str, article_id: &str, percent: u8) -> bool {
        if uid.is_empty() || article_id.is_empty() {
            return false;
        }
        let percent = percent.min(100);
        let updates = vec![
            FieldUpdate::Set {
                path: path(&["readingProgress", article_id, "progress"]),
                value: Value::from(percent),
            },
            FieldUpdate::ServerTimestamp {
                path: path(&["readingProgress", article_id, "lastUpdated"]),
            },
        ];
        match self.store.update_user_document(uid, updates).await {
            Ok(()) => true,
            Err(e) => {
                warn!(%uid, %article_id, percent, "Progress update failed: {e}");
                false
            }
        }
    }

    /// Creates the user's interaction record with empty sets and zeroed stats.
    pub async fn initialize_user(&self, session: &Session, display_name: &str) -> PortResult<()> {
        let now = Utc::now().to_rfc3339();
        let doc = json!({
            "name": display_name,
            "email": session.email.clone().unwrap_or_default(),
            "createdAt": now,
            "lastActivity": now,
            "preferences": {
                "notifications": true,
                "darkMode": false,
                "topics": [],
            },
            "likedArticles": [],
            "savedArticles": {},
            "readArticles": [],
            "readingProgress": {},
            "stats": {
                "articlesRead": 0,
                "articlesLiked": 0,
                "articlesSaved": 0,
                "totalReadingTime": 0,
            },
        });
        self.store.create_user_document(&session.uid, doc).await?;
        info!(uid = %session.uid, "User document initialized.");
        Ok(())
    }

    /// Whether the user's saved articles are stored as an id → time map.
    /// Documents without the field get the map shape.
    async fn saved_shape(&self, uid: &str) -> PortResult<bool> {
        let doc = self.store.fetch_user_document(uid).await?;
        let saved = doc.as_ref().and_then(|d| d.get("savedArticles"));
        Ok(match saved {
            None | Some(Value::Null) => true,
            Some(value) => matches!(
                normalize_saved(Some(value)),
                SavedArticles::TimestampedMap(_)
            ),
        })
    }
}

fn last_activity() -> FieldUpdate {
    FieldUpdate::ServerTimestamp {
        path: path(&["lastActivity"]),
    }
}

fn path(segments: &[&str]) -> Vec<String> {
    segments.iter().map(|s| s.to_string()).collect()
}

/// Holds a `(uid, article)` slot in the in-flight set until dropped.
struct MarkGuard<'a> {
    set: &'a Mutex<HashSet<(String, String)>>,
    key: (String, String),
}

impl<'a> MarkGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<(String, String)>>, uid: &str, article_id: &str) -> Option<Self> {
        let key = (uid.to_string(), article_id.to_string());
        let inserted = set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone());
        inserted.then_some(Self { set, key })
    }
}

impl Drop for MarkGuard<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}
