//! Shared fixtures for the app integration tests.

#![allow(dead_code)]

use app_lib::adapters::MemoryBackend;
use app_lib::app::{ActiveScreen, AppEvent, ShortcutApp};
use app_lib::config::Config;
use app_lib::context::{AppContext, Notice, NoticeReceiver};
use app_lib::screens::{DetailScreen, FeedScreen, ProfileScreen, SavedScreen};
use app_lib::session_task::spawn_session_listener;
use shortcut_core::domain::Session;
use shortcut_core::theme::ColorScheme;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const EMAIL: &str = "reader@example.com";
pub const PASSWORD: &str = "secret1";

pub struct Harness {
    pub backend: Arc<MemoryBackend>,
    pub ctx: Arc<AppContext>,
    pub app: ShortcutApp,
    notices: NoticeReceiver,
    events: mpsc::UnboundedReceiver<AppEvent>,
    shutdown: CancellationToken,
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// An app over the sample articles, past the initial session restore.
pub async fn harness() -> Harness {
    let backend = Arc::new(MemoryBackend::with_sample_articles());
    let (ctx, notices) = AppContext::init(
        Arc::new(Config::default()),
        backend.clone(),
        backend.clone(),
        ColorScheme::Light,
    );
    let app = ShortcutApp::new(ctx.clone());

    let (tx, events) = mpsc::unbounded_channel();
    let shutdown = CancellationToken::new();
    spawn_session_listener(backend.clone(), tx, shutdown.clone());

    let mut harness = Harness {
        backend,
        ctx,
        app,
        notices,
        events,
        shutdown,
    };
    harness.pump().await;
    harness
}

/// A harness with one registered account whose user document exists, already
/// signed in and on Home.
pub async fn signed_in() -> (Harness, Session) {
    let mut h = harness().await;
    let account = h.backend.add_account(EMAIL, PASSWORD, Some("Reader"));
    h.ctx
        .interactions
        .initialize_user(&account, "Reader")
        .await
        .expect("user document");
    let session = h.sign_in().await;
    (h, session)
}

impl Harness {
    /// Delivers the next session event to the app.
    pub async fn pump(&mut self) {
        let event = tokio::time::timeout(Duration::from_secs(2), self.events.recv())
            .await
            .expect("session event within two seconds")
            .expect("session listener alive");
        self.app.handle_event(event).await;
    }

    pub async fn sign_in(&mut self) -> Session {
        let session = self
            .ctx
            .identity
            .sign_in(EMAIL, PASSWORD)
            .await
            .expect("sign in");
        self.pump().await;
        session
    }

    /// Every notice raised so far.
    pub fn notices(&mut self) -> Vec<Notice> {
        let mut out = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            out.push(notice);
        }
        out
    }

    pub fn feed(&self) -> &FeedScreen {
        match self.app.active() {
            ActiveScreen::Feed(feed) => feed,
            other => panic!("expected the feed, found {}", other.name()),
        }
    }

    pub fn saved(&self) -> &SavedScreen {
        match self.app.active() {
            ActiveScreen::Saved(saved) => saved,
            other => panic!("expected the saved list, found {}", other.name()),
        }
    }

    pub fn profile(&self) -> &ProfileScreen {
        match self.app.active() {
            ActiveScreen::Profile(profile) => profile,
            other => panic!("expected the profile, found {}", other.name()),
        }
    }

    pub fn detail(&mut self) -> &mut DetailScreen {
        match self.app.active_mut() {
            ActiveScreen::Detail(detail) => detail,
            other => panic!("expected an article, found {}", other.name()),
        }
    }
}
