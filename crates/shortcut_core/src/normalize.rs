//! crates/shortcut_core/src/normalize.rs
//!
//! Turns raw backend documents into domain types.
//!
//! Stored documents come in several historical shapes. Every fetch passes through
//! here so that the rest of the application only ever sees `Article` and
//! `InteractionRecord` values with all defaults filled in.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

use crate::domain::{Article, InteractionRecord, ReadingProgress, SavedArticles, UserStats};
use crate::ports::RawDocument;

pub const DEFAULT_HEADLINE: &str = "Untitled Article";
pub const DEFAULT_SUMMARY: &str = "No summary available";
pub const DEFAULT_CONTENT: &str = "No content available";
pub const DEFAULT_AUTHOR: &str = "Unknown Author";
pub const DEFAULT_READ_TIME: &str = "5 min read";
pub const DEFAULT_IMAGE_URL: &str =
    "https://images.unsplash.com/photo-1677442136019-21780ecad995?w=800";
pub const DEFAULT_TOPICS: [&str; 2] = ["AI", "Technology"];

//=========================================================================================
// Articles
//=========================================================================================

/// Unwraps a document that was stored as a single key holding its own JSON encoding,
/// e.g. `{"{\"headline\":\"X\"}": true}`. Anything else is returned unchanged,
/// including a key that looks like JSON but does not parse into an object.
pub fn unwrap_legacy_document(data: Value) -> Value {
    let encoded = match &data {
        Value::Object(map) if map.len() == 1 => match map.keys().next() {
            Some(key) if key.starts_with('{') => key.clone(),
            _ => return data,
        },
        _ => return data,
    };

    match serde_json::from_str::<Value>(&encoded) {
        Ok(inner @ Value::Object(_)) => {
            debug!("Unwrapped legacy JSON-encoded article document.");
            inner
        }
        Ok(_) | Err(_) => {
            warn!("Document key looks like JSON but could not be decoded; using it as-is.");
            data
        }
    }
}

/// Normalizes one article document. `now` fills the publish date when the
/// document carries no usable date at all.
pub fn normalize_article(doc: RawDocument, now: DateTime<Utc>) -> Article {
    let data = unwrap_legacy_document(doc.data);
    let fields = data.as_object().cloned().unwrap_or_default();

    let created_at = fields.get("createdAt").and_then(parse_timestamp);
    let updated_at = fields.get("updatedAt").and_then(parse_timestamp);

    let summary = text(&fields, "summary");
    let content = text(&fields, "content")
        .or_else(|| summary.clone())
        .unwrap_or_else(|| DEFAULT_CONTENT.to_string());

    let publish_date = fields
        .get("publishDate")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            fields
                .get("publishDate")
                .and_then(parse_timestamp)
                .or(created_at)
                .unwrap_or(now)
                .to_rfc3339()
        });

    Article {
        id: doc.id,
        headline: text(&fields, "headline").unwrap_or_else(|| DEFAULT_HEADLINE.to_string()),
        summary: summary.unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
        content,
        author: text(&fields, "author").unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
        publish_date,
        read_time: text(&fields, "readTime").unwrap_or_else(|| DEFAULT_READ_TIME.to_string()),
        image_url: text(&fields, "imageUrl").unwrap_or_else(|| DEFAULT_IMAGE_URL.to_string()),
        topics: topics(fields.get("topics")),
        created_at,
        updated_at,
    }
}

/// Normalizes a batch of article documents and orders them newest first.
pub fn normalize_articles(docs: Vec<RawDocument>, now: DateTime<Utc>) -> Vec<Article> {
    let mut articles: Vec<Article> = docs
        .into_iter()
        .map(|doc| normalize_article(doc, now))
        .collect();
    sort_by_recency(&mut articles);
    articles
}

pub fn sort_by_recency(articles: &mut [Article]) {
    articles.sort_by_key(|a| std::cmp::Reverse(a.recency()));
}

fn topics(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_string).collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect(),
    }
}

/// A non-empty display string. Numbers are accepted and formatted.
fn text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(scalar_string).filter(|s| !s.is_empty())
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

//=========================================================================================
// Timestamps
//=========================================================================================

/// Parses the timestamp encodings found in stored documents: RFC 3339 strings,
/// plain dates, epoch milliseconds and `{seconds, nanoseconds}` objects.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_date_str(s),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Value::Object(map) => {
            let seconds = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(Value::as_i64)?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            Utc.timestamp_opt(seconds, nanos as u32).single()
        }
        _ => None,
    }
}

pub fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

//=========================================================================================
// User Interactions
//=========================================================================================

/// Resolves the stored `savedArticles` value into one of the two known shapes.
pub fn normalize_saved(value: Option<&Value>) -> SavedArticles {
    match value {
        Some(Value::Array(items)) => {
            SavedArticles::IdSet(items.iter().filter_map(scalar_string).collect::<BTreeSet<_>>())
        }
        Some(Value::Object(map)) => SavedArticles::TimestampedMap(
            map.iter()
                .map(|(id, ts)| (id.clone(), parse_timestamp(ts)))
                .collect::<BTreeMap<_, _>>(),
        ),
        _ => SavedArticles::default(),
    }
}

/// Builds the interaction record from a user document. A missing document is
/// an empty record.
pub fn normalize_interactions(doc: Option<&Value>) -> InteractionRecord {
    let Some(fields) = doc.and_then(Value::as_object) else {
        return InteractionRecord::default();
    };

    let id_set = |key: &str| -> HashSet<String> {
        fields
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(scalar_string).collect())
            .unwrap_or_default()
    };

    let reading_progress: HashMap<String, ReadingProgress> = fields
        .get("readingProgress")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(id, entry)| progress_entry(entry).map(|p| (id.clone(), p)))
                .collect()
        })
        .unwrap_or_default();

    let stats_map = fields.get("stats").and_then(Value::as_object);
    let counter = |key: &str| -> Option<u64> {
        stats_map.and_then(|m| m.get(key)).and_then(Value::as_u64)
    };

    let stats = UserStats {
        // Older documents kept the real count at the top level next to a zeroed stats map.
        articles_read: counter("articlesRead")
            .unwrap_or(0)
            .max(fields.get("articlesReadCount").and_then(Value::as_u64).unwrap_or(0)),
        articles_liked: counter("articlesLiked").unwrap_or(0),
        articles_saved: counter("articlesSaved").unwrap_or(0),
        total_reading_time: counter("totalReadingTime").unwrap_or(0),
    };

    InteractionRecord {
        liked_article_ids: id_set("likedArticles"),
        saved_article_ids: normalize_saved(fields.get("savedArticles")),
        read_article_ids: id_set("readArticles"),
        reading_progress,
        stats,
    }
}

fn progress_entry(entry: &Value) -> Option<ReadingProgress> {
    let (percent, last_updated) = match entry {
        Value::Number(n) => (n.as_f64()?, None),
        Value::Object(map) => (
            map.get("progress").and_then(Value::as_f64)?,
            map.get("lastUpdated").and_then(parse_timestamp),
        ),
        _ => return None,
    };
    Some(ReadingProgress {
        percent: percent.clamp(0.0, 100.0).round() as u8,
        last_updated,
    })
}

/// Selects the saved articles out of `articles`, most recently saved first.
///
/// Without save times (legacy list shape) the order is article recency; with them,
/// save time descending and article recency breaks ties.
pub fn saved_articles_in_order(saved: &SavedArticles, articles: &[Article]) -> Vec<Article> {
    let mut selected: Vec<Article> = articles
        .iter()
        .filter(|a| saved.contains(&a.id))
        .cloned()
        .collect();

    if saved.has_timestamps() {
        selected.sort_by(|a, b| {
            saved
                .saved_at(&b.id)
                .cmp(&saved.saved_at(&a.id))
                .then_with(|| b.recency().cmp(&a.recency()))
        });
    } else {
        sort_by_recency(&mut selected);
    }
    selected
}
