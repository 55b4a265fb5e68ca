//! services/app/src/screens/feed.rs
//!
//! The home feed: every article, newest first, with like/save flags.

use crate::context::{AppContext, NoticeLevel};
use crate::screens::{toggle_interaction, LoadState};
use shortcut_core::domain::{Article, InteractionKind, Session};
use shortcut_core::optimistic::{OptimisticFlags, Settlement};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

pub struct FeedScreen {
    ctx: Arc<AppContext>,
    uid: String,
    articles: Vec<Article>,
    state: LoadState,
    flags: Arc<OptimisticFlags>,
}

impl FeedScreen {
    /// Mounts the feed and performs the initial load.
    pub async fn mount(ctx: Arc<AppContext>, session: &Session) -> Self {
        let flags = Arc::new(OptimisticFlags::new(ctx.screen_token()));
        let mut screen = Self {
            ctx,
            uid: session.uid.clone(),
            articles: Vec::new(),
            state: LoadState::Loading,
            flags,
        };
        screen.refresh().await;
        screen
    }

    /// Pull-to-refresh: refetches articles and the user's interactions.
    pub async fn refresh(&mut self) {
        self.state = LoadState::Loading;
        let service = &self.ctx.interactions;
        let (articles, record) = tokio::join!(
            service.fetch_articles(),
            service.fetch_interactions(&self.uid)
        );

        match articles.and_then(|articles| record.map(|record| (articles, record))) {
            Ok((articles, record)) => {
                self.flags.seed(&record, &articles);
                info!(count = articles.len(), "Feed loaded.");
                self.articles = articles;
                self.state = LoadState::Ready;
            }
            Err(e) => {
                warn!("Feed failed to load: {e}");
                self.articles.clear();
                self.state = LoadState::Failed(e.to_string());
                self.ctx.notify(
                    NoticeLevel::Error,
                    "Failed to load",
                    "Could not load articles. Pull to refresh to try again.",
                );
            }
        }
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn article(&self, index: usize) -> Option<&Article> {
        self.articles.get(index)
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_liked(&self, article_id: &str) -> bool {
        self.flags.get(article_id, InteractionKind::Like)
    }

    pub fn is_saved(&self, article_id: &str) -> bool {
        self.flags.get(article_id, InteractionKind::Save)
    }

    /// Flips the like flag now; the returned future settles it.
    pub fn toggle_like(&self, article_id: &str) -> impl Future<Output = Settlement> + Send + 'static {
        self.toggle(article_id, InteractionKind::Like)
    }

    pub fn toggle_save(&self, article_id: &str) -> impl Future<Output = Settlement> + Send + 'static {
        self.toggle(article_id, InteractionKind::Save)
    }

    fn toggle(
        &self,
        article_id: &str,
        kind: InteractionKind,
    ) -> impl Future<Output = Settlement> + Send + 'static {
        toggle_interaction(
            self.ctx.clone(),
            self.flags.clone(),
            self.uid.clone(),
            article_id,
            kind,
        )
    }

    pub fn share(&self, article_id: &str) {
        info!(%article_id, "Share requested.");
        self.ctx
            .notify(NoticeLevel::Info, "Share Article", "Feature coming soon!");
    }
}

impl Drop for FeedScreen {
    fn drop(&mut self) {
        self.flags.token().cancel();
    }
}
