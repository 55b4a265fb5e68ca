//! services/app/src/adapters/firestore.rs
//!
//! `DocumentStore` backed by the Cloud Firestore REST API (v1).
//!
//! Firestore wraps every value in a typed envelope (`{"stringValue": "..."}`);
//! this adapter converts between those envelopes and plain JSON so the core only
//! ever sees plain documents. Field updates become a single `commit` write: plain
//! sets go through the update mask, array/increment/timestamp operations become
//! field transforms, and the write is applied atomically.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use shortcut_core::ports::{DocumentStore, FieldUpdate, PortError, PortResult, RawDocument};
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, instrument};

use super::firebase_auth::FirebaseAuthAdapter;

const FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";
const PAGE_SIZE: u32 = 300;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<FirestoreDocument>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

pub struct FirestoreAdapter {
    client: Client,
    /// `projects/{p}/databases/(default)/documents`
    root: String,
    articles_collection: String,
    users_collection: String,
    auth: Arc<FirebaseAuthAdapter>,
}

impl FirestoreAdapter {
    pub fn new(
        client: Client,
        project_id: &str,
        articles_collection: String,
        users_collection: String,
        auth: Arc<FirebaseAuthAdapter>,
    ) -> Self {
        Self {
            client,
            root: format!("projects/{}/databases/(default)/documents", project_id),
            articles_collection,
            users_collection,
            auth,
        }
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/{}{}", FIRESTORE_URL, self.root, suffix)
    }

    fn user_name(&self, uid: &str) -> String {
        format!("{}/{}/{}", self.root, self.users_collection, uid)
    }

    async fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.auth.id_token().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> PortResult<Response> {
        self.authorized(request)
            .await
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }
}

/// Maps a non-success response onto a `PortError`.
async fn status_error(response: Response, context: &str) -> PortError {
    let status = response.status();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PortError::Unauthorized,
        StatusCode::NOT_FOUND => PortError::NotFound(context.to_string()),
        _ => {
            error!(status = %status, error = %text, "Firestore request failed: {}", context);
            PortError::Unexpected(format!("HTTP {}: {}", status, text))
        }
    }
}

#[async_trait]
impl DocumentStore for FirestoreAdapter {
    #[instrument(skip(self))]
    async fn fetch_article_documents(&self) -> PortResult<Vec<RawDocument>> {
        // Listed unordered: an `orderBy` would drop documents without the field,
        // and the core sorts by recency anyway.
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .client
                .get(self.url(&format!("/{}", self.articles_collection)))
                .query(&[("pageSize", PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let response = self.send(request).await?;
            if !response.status().is_success() {
                return Err(status_error(response, &self.articles_collection).await);
            }
            let page: ListResponse = response
                .json()
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;

            documents.extend(page.documents.into_iter().map(|doc| RawDocument {
                id: document_id(&doc.name).to_string(),
                data: decode_fields(&doc.fields),
            }));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }
        debug!(count = documents.len(), "Listed article documents.");
        Ok(documents)
    }

    #[instrument(skip(self))]
    async fn fetch_user_document(&self, uid: &str) -> PortResult<Option<Value>> {
        let request = self
            .client
            .get(self.url(&format!("/{}/{}", self.users_collection, uid)));
        let response = self.send(request).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let doc: FirestoreDocument = response
                    .json()
                    .await
                    .map_err(|e| PortError::Unexpected(e.to_string()))?;
                Ok(Some(decode_fields(&doc.fields)))
            }
            _ => Err(status_error(response, uid).await),
        }
    }

    #[instrument(skip(self, data))]
    async fn create_user_document(&self, uid: &str, data: Value) -> PortResult<()> {
        let fields = match encode_value(&data) {
            Value::Object(mut envelope) => envelope
                .remove("mapValue")
                .and_then(|m| m.get("fields").cloned())
                .unwrap_or_else(|| json!({})),
            _ => return Err(PortError::Unexpected("user document must be an object".into())),
        };
        let request = self
            .client
            .post(self.url(&format!("/{}", self.users_collection)))
            .query(&[("documentId", uid)])
            .json(&json!({ "fields": fields }));

        let response = self.send(request).await?;
        match response.status() {
            StatusCode::CONFLICT => {
                debug!(%uid, "User document already exists.");
                Ok(())
            }
            status if status.is_success() => Ok(()),
            _ => Err(status_error(response, uid).await),
        }
    }

    #[instrument(skip(self, updates))]
    async fn update_user_document(&self, uid: &str, updates: Vec<FieldUpdate>) -> PortResult<()> {
        let write = build_write(&self.user_name(uid), &updates);
        let request = self
            .client
            .post(self.url(":commit"))
            .json(&json!({ "writes": [write] }));

        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(status_error(response, uid).await);
        }
        Ok(())
    }
}

//=========================================================================================
// Writes
//=========================================================================================

/// Builds one `Write` applying all `updates` to the document named `name`.
fn build_write(name: &str, updates: &[FieldUpdate]) -> Value {
    let mut fields = Map::new();
    let mut mask: Vec<String> = Vec::new();
    let mut transforms: Vec<Value> = Vec::new();

    for update in updates {
        match update {
            FieldUpdate::ArrayUnion { field, value } => transforms.push(json!({
                "fieldPath": field_path(std::slice::from_ref(field)),
                "appendMissingElements": { "values": [{ "stringValue": value }] },
            })),
            FieldUpdate::ArrayRemove { field, value } => transforms.push(json!({
                "fieldPath": field_path(std::slice::from_ref(field)),
                "removeAllFromArray": { "values": [{ "stringValue": value }] },
            })),
            FieldUpdate::MapSet { field, key, at } => {
                let path = [field.clone(), key.clone()];
                insert_path(&mut fields, &path, json!({ "timestampValue": at.to_rfc3339() }));
                mask.push(field_path(&path));
            }
            FieldUpdate::MapDelete { field, key } => {
                // Masked but absent from `fields`: Firestore deletes it.
                mask.push(field_path(&[field.clone(), key.clone()]));
            }
            FieldUpdate::Increment { path, by } => transforms.push(json!({
                "fieldPath": field_path(path),
                "increment": { "integerValue": by.to_string() },
            })),
            FieldUpdate::Set { path, value } => {
                insert_path(&mut fields, path, encode_value(value));
                mask.push(field_path(path));
            }
            FieldUpdate::ServerTimestamp { path } => transforms.push(json!({
                "fieldPath": field_path(path),
                "setToServerValue": "REQUEST_TIME",
            })),
        }
    }

    json!({
        "update": { "name": name, "fields": fields },
        "updateMask": { "fieldPaths": mask },
        "updateTransforms": transforms,
        "currentDocument": { "exists": true },
    })
}

/// Places an encoded value at `path` inside a `fields` map, nesting map values.
fn insert_path(fields: &mut Map<String, Value>, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = fields;
    for segment in parents {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| json!({ "mapValue": { "fields": {} } }));
        if entry.pointer("/mapValue/fields").map_or(true, |f| !f.is_object()) {
            *entry = json!({ "mapValue": { "fields": {} } });
        }
        current = match entry.pointer_mut("/mapValue/fields") {
            Some(Value::Object(map)) => map,
            _ => return,
        };
    }
    current.insert(last.clone(), value);
}

fn simple_segment() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("field-path pattern is valid")
    })
}

/// Joins segments into a Firestore field path, backtick-quoting any segment that
/// is not a plain identifier (article ids are often numeric).
fn field_path(segments: &[String]) -> String {
    segments
        .iter()
        .map(|segment| {
            if simple_segment().is_match(segment) {
                segment.clone()
            } else {
                format!("`{}`", segment.replace('\\', "\\\\").replace('`', "\\`"))
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

//=========================================================================================
// Value Codec
//=========================================================================================

fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn decode_fields(fields: &Map<String, Value>) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(key, value)| (key.clone(), decode_value(value)))
            .collect(),
    )
}

/// Converts a typed Firestore value into plain JSON.
fn decode_value(value: &Value) -> Value {
    let Some((kind, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
        return Value::Null;
    };
    match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => inner.clone(),
        "integerValue" => match inner {
            Value::String(s) => s.parse::<i64>().map(Value::from).unwrap_or(Value::Null),
            other => other.clone(),
        },
        "doubleValue" => inner.clone(),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "geoPointValue" => inner.clone(),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => inner
            .get("fields")
            .and_then(Value::as_object)
            .map(decode_fields)
            .unwrap_or_else(|| json!({})),
        _ => Value::Null,
    }
}

/// Converts plain JSON into a typed Firestore value.
fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => {
            let fields: Map<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), encode_value(v)))
                .collect();
            json!({ "mapValue": { "fields": fields } })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn path(p: &[&str]) -> Vec<String> {
        p.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn quotes_non_identifier_segments() {
        assert_eq!(field_path(&path(&["stats", "articlesRead"])), "stats.articlesRead");
        assert_eq!(
            field_path(&path(&["readingProgress", "1", "progress"])),
            "readingProgress.`1`.progress"
        );
        assert_eq!(field_path(&path(&["savedArticles", "a-b`c"])), "savedArticles.`a-b\\`c`");
    }

    #[test]
    fn decodes_typed_document() {
        let fields = json!({
            "headline": { "stringValue": "Hello" },
            "likes": { "integerValue": "12" },
            "createdAt": { "timestampValue": "2024-01-15T10:00:00Z" },
            "topics": { "arrayValue": { "values": [{ "stringValue": "AI" }] } },
            "empty": { "arrayValue": {} },
            "stats": { "mapValue": { "fields": { "articlesRead": { "integerValue": "3" } } } },
        });
        let decoded = decode_fields(fields.as_object().unwrap());
        assert_eq!(
            decoded,
            json!({
                "headline": "Hello",
                "likes": 12,
                "createdAt": "2024-01-15T10:00:00Z",
                "topics": ["AI"],
                "empty": [],
                "stats": { "articlesRead": 3 },
            })
        );
    }

    #[test]
    fn encode_then_decode_preserves_plain_json() {
        let doc = json!({"name": "R", "stats": {"articlesRead": 0}, "savedArticles": {}, "score": 1.5});
        let encoded = encode_value(&doc);
        assert_eq!(decode_value(&encoded), doc);
    }

    #[test]
    fn write_splits_mask_and_transforms() {
        let now = Utc::now();
        let write = build_write(
            "projects/p/databases/(default)/documents/users/u1",
            &[
                FieldUpdate::MapSet {
                    field: "savedArticles".into(),
                    key: "7".into(),
                    at: now,
                },
                FieldUpdate::MapDelete {
                    field: "savedArticles".into(),
                    key: "8".into(),
                },
                FieldUpdate::Set {
                    path: path(&["readingProgress", "7", "progress"]),
                    value: json!(40),
                },
                FieldUpdate::ArrayUnion {
                    field: "readArticles".into(),
                    value: "7".into(),
                },
                FieldUpdate::Increment {
                    path: path(&["stats", "articlesRead"]),
                    by: 1,
                },
                FieldUpdate::ServerTimestamp {
                    path: path(&["lastActivity"]),
                },
            ],
        );

        assert_eq!(
            write["updateMask"]["fieldPaths"],
            json!([
                "savedArticles.`7`",
                "savedArticles.`8`",
                "readingProgress.`7`.progress"
            ])
        );
        assert_eq!(
            write["update"]["fields"]["readingProgress"]["mapValue"]["fields"]["7"]["mapValue"]
                ["fields"]["progress"],
            json!({"integerValue": "40"})
        );
        assert!(write["update"]["fields"]["savedArticles"]["mapValue"]["fields"]["8"].is_null());

        let transforms = write["updateTransforms"].as_array().unwrap();
        assert_eq!(transforms.len(), 3);
        assert_eq!(transforms[0]["fieldPath"], json!("readArticles"));
        assert_eq!(transforms[1]["increment"], json!({"integerValue": "1"}));
        assert_eq!(transforms[2]["setToServerValue"], json!("REQUEST_TIME"));
        assert_eq!(write["currentDocument"]["exists"], json!(true));
    }

    #[test]
    fn document_id_is_last_segment() {
        assert_eq!(
            document_id("projects/p/databases/(default)/documents/articles/abc"),
            "abc"
        );
    }
}
