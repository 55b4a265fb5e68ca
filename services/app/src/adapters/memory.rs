//! services/app/src/adapters/memory.rs
//!
//! An in-process backend implementing both ports. Used by the `memory` backend
//! mode and by the integration tests, which rely on its failure switches and
//! write gate to reproduce slow or failing backends.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use shortcut_core::document::apply_field_updates;
use shortcut_core::domain::Session;
use shortcut_core::ports::{
    AuthError, DocumentStore, FieldUpdate, IdentityService, PortError, PortResult, RawDocument,
    SessionStream,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use super::session_events::SessionBroadcaster;

const SAMPLE_ARTICLES: &str = include_str!("../../fixtures/sample_articles.json");

#[derive(Debug, Clone)]
struct Account {
    uid: String,
    password: String,
    display_name: Option<String>,
}

pub struct MemoryBackend {
    accounts: Mutex<HashMap<String, Account>>,
    articles: Mutex<Vec<RawDocument>>,
    users: Mutex<HashMap<String, Value>>,
    events: SessionBroadcaster,
    write_gate: Arc<RwLock<()>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_sign_out: AtomicBool,
    writes: AtomicUsize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MemoryBackend {
    pub fn new(articles: Vec<RawDocument>) -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            articles: Mutex::new(articles),
            users: Mutex::new(HashMap::new()),
            events: SessionBroadcaster::new(None),
            write_gate: Arc::new(RwLock::new(())),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_sign_out: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    /// A backend holding the bundled sample articles.
    pub fn with_sample_articles() -> Self {
        Self::new(sample_articles())
    }

    /// Registers an account without signing in.
    pub fn add_account(&self, email: &str, password: &str, display_name: Option<&str>) -> Session {
        let account = Account {
            uid: Uuid::new_v4().to_string(),
            password: password.to_string(),
            display_name: display_name.map(str::to_string),
        };
        let session = session_for(email, &account);
        lock(&self.accounts).insert(email.to_lowercase(), account);
        session
    }

    /// Marks `session` as signed in, as a persisted login would on startup.
    pub fn restore_session(&self, session: Session) {
        self.events.publish(Some(session));
    }

    pub fn insert_article(&self, doc: RawDocument) {
        lock(&self.articles).push(doc);
    }

    pub fn insert_user_document(&self, uid: &str, doc: Value) {
        lock(&self.users).insert(uid.to_string(), doc);
    }

    pub fn user_document(&self, uid: &str) -> Option<Value> {
        lock(&self.users).get(uid).cloned()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_sign_out(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    /// Number of successful document writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Blocks every document write until the returned guard is dropped.
    pub async fn hold_writes(&self) -> OwnedRwLockWriteGuard<()> {
        self.write_gate.clone().write_owned().await
    }

    fn check_reads(&self) -> PortResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("backend unavailable".into()));
        }
        Ok(())
    }

    async fn begin_write(&self) -> PortResult<tokio::sync::OwnedRwLockReadGuard<()>> {
        let permit = self.write_gate.clone().read_owned().await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("write rejected".into()));
        }
        Ok(permit)
    }
}

/// Parses the bundled fixture. A malformed fixture yields no articles.
pub fn sample_articles() -> Vec<RawDocument> {
    let docs: Vec<Value> = match serde_json::from_str(SAMPLE_ARTICLES) {
        Ok(docs) => docs,
        Err(e) => {
            warn!("Sample articles fixture is invalid: {e}");
            return Vec::new();
        }
    };
    docs.into_iter()
        .filter_map(|mut data| {
            let id = data.as_object_mut()?.remove("id")?;
            let id = match id {
                Value::String(s) => s,
                other => other.to_string(),
            };
            Some(RawDocument { id, data })
        })
        .collect()
}

fn session_for(email: &str, account: &Account) -> Session {
    Session {
        uid: account.uid.clone(),
        email: Some(email.to_string()),
        display_name: account.display_name.clone(),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl IdentityService for MemoryBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        if !email.contains('@') {
            return Err(AuthError::InvalidEmail);
        }
        let session = {
            let accounts = lock(&self.accounts);
            let account = accounts
                .get(&email.to_lowercase())
                .ok_or(AuthError::UserNotFound)?;
            if account.password != password {
                return Err(AuthError::WrongPassword);
            }
            session_for(email, account)
        };
        info!(uid = %session.uid, "Signed in.");
        self.events.publish(Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Session, AuthError> {
        if !email.contains('@') {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < 6 {
            return Err(AuthError::WeakPassword);
        }
        let session = {
            let mut accounts = lock(&self.accounts);
            if accounts.contains_key(&email.to_lowercase()) {
                return Err(AuthError::EmailAlreadyInUse);
            }
            let account = Account {
                uid: Uuid::new_v4().to_string(),
                password: password.to_string(),
                display_name: Some(display_name.to_string()).filter(|n| !n.is_empty()),
            };
            let session = session_for(email, &account);
            accounts.insert(email.to_lowercase(), account);
            session
        };
        info!(uid = %session.uid, "Account created.");
        self.events.publish(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> PortResult<()> {
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("sign-out rejected".into()));
        }
        self.events.publish(None);
        info!("Signed out.");
        Ok(())
    }

    async fn current_session(&self) -> Option<Session> {
        self.events.current()
    }

    fn session_events(&self) -> SessionStream {
        self.events.stream()
    }
}

#[async_trait]
impl DocumentStore for MemoryBackend {
    async fn fetch_article_documents(&self) -> PortResult<Vec<RawDocument>> {
        self.check_reads()?;
        Ok(lock(&self.articles).clone())
    }

    async fn fetch_user_document(&self, uid: &str) -> PortResult<Option<Value>> {
        self.check_reads()?;
        Ok(self.user_document(uid))
    }

    async fn create_user_document(&self, uid: &str, data: Value) -> PortResult<()> {
        let _permit = self.begin_write().await?;
        let mut users = lock(&self.users);
        if users.contains_key(uid) {
            return Ok(());
        }
        users.insert(uid.to_string(), data);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update_user_document(&self, uid: &str, updates: Vec<FieldUpdate>) -> PortResult<()> {
        let _permit = self.begin_write().await?;
        let mut users = lock(&self.users);
        let doc = users
            .get_mut(uid)
            .ok_or_else(|| PortError::NotFound(uid.to_string()))?;
        apply_field_updates(doc, &updates, Utc::now());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_has_four_articles() {
        let docs = sample_articles();
        assert_eq!(docs.len(), 4);
        assert_eq!(docs[0].id, "1");
        assert!(docs[0].data.get("id").is_none());
    }

    #[tokio::test]
    async fn accounts_reject_bad_credentials() {
        let backend = MemoryBackend::default();
        backend.add_account("reader@example.com", "secret1", Some("Reader"));

        assert_eq!(
            backend.sign_in("nobody@example.com", "secret1").await.unwrap_err(),
            AuthError::UserNotFound
        );
        assert_eq!(
            backend.sign_in("reader@example.com", "wrong").await.unwrap_err(),
            AuthError::WrongPassword
        );
        assert_eq!(
            backend.sign_up("Reader@example.com", "secret1", "R").await.unwrap_err(),
            AuthError::EmailAlreadyInUse
        );

        let session = backend.sign_in("reader@example.com", "secret1").await.unwrap();
        assert_eq!(backend.current_session().await, Some(session));
    }

    #[tokio::test]
    async fn updates_require_an_existing_document() {
        let backend = MemoryBackend::default();
        let err = backend
            .update_user_document("ghost", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));

        backend.create_user_document("u1", serde_json::json!({"a": 1})).await.unwrap();
        backend.create_user_document("u1", serde_json::json!({"a": 2})).await.unwrap();
        assert_eq!(backend.user_document("u1").unwrap()["a"], 1);
        assert_eq!(backend.write_count(), 1);
    }
}
