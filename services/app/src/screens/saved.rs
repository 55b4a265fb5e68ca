//! services/app/src/screens/saved.rs
//!
//! The saved-articles list, most recently saved first.
//!
//! Unsaving hides the article at once; a failed unsave brings it back.

use crate::context::{AppContext, NoticeLevel};
use crate::screens::{toggle_interaction, LoadState};
use futures::future::join_all;
use shortcut_core::domain::{Article, InteractionKind, Session};
use shortcut_core::optimistic::{OptimisticFlags, Settlement};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

pub struct SavedScreen {
    ctx: Arc<AppContext>,
    uid: String,
    articles: Vec<Article>,
    state: LoadState,
    flags: Arc<OptimisticFlags>,
}

impl SavedScreen {
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

    pub async fn refresh(&mut self) {
        self.state = LoadState::Loading;
        match self.load().await {
            Ok(()) => self.state = LoadState::Ready,
            Err(e) => {
                warn!("Saved articles failed to load: {e}");
                self.articles.clear();
                self.state = LoadState::Failed(e.to_string());
                self.ctx.notify(
                    NoticeLevel::Error,
                    "Failed to load",
                    "Could not load saved articles. Pull to refresh to try again.",
                );
            }
        }
    }

    async fn load(&mut self) -> Result<(), shortcut_core::error::FetchError> {
        let service = &self.ctx.interactions;
        let articles = service.fetch_articles().await?;
        let (saved, record) = tokio::join!(
            service.saved_articles(&self.uid, &articles),
            service.fetch_interactions(&self.uid)
        );
        let (saved, record) = (saved?, record?);
        self.flags.seed(&record, &saved);
        info!(count = saved.len(), "Saved articles loaded.");
        self.articles = saved;
        Ok(())
    }

    /// Saved articles still flagged as saved, in saved order.
    pub fn visible(&self) -> Vec<&Article> {
        self.articles
            .iter()
            .filter(|a| self.flags.get(&a.id, InteractionKind::Save))
            .collect()
    }

    pub fn article(&self, index: usize) -> Option<&Article> {
        self.visible().get(index).copied()
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_liked(&self, article_id: &str) -> bool {
        self.flags.get(article_id, InteractionKind::Like)
    }

    pub fn toggle_like(&self, article_id: &str) -> impl Future<Output = Settlement> + Send + 'static {
        toggle_interaction(
            self.ctx.clone(),
            self.flags.clone(),
            self.uid.clone(),
            article_id,
            InteractionKind::Like,
        )
    }

    /// Removes one article from the list. `None` if it is not currently saved.
    pub fn unsave(
        &self,
        article_id: &str,
    ) -> Option<impl Future<Output = Settlement> + Send + 'static> {
        if !self.flags.get(article_id, InteractionKind::Save) {
            return None;
        }
        Some(toggle_interaction(
            self.ctx.clone(),
            self.flags.clone(),
            self.uid.clone(),
            article_id,
            InteractionKind::Save,
        ))
    }

    /// Unsaves every visible article. Each removal settles independently.
    pub fn clear_all(&self) -> impl Future<Output = Vec<Settlement>> + Send + 'static {
        let pending: Vec<_> = self
            .visible()
            .into_iter()
            .map(|article| {
                toggle_interaction(
                    self.ctx.clone(),
                    self.flags.clone(),
                    self.uid.clone(),
                    &article.id,
                    InteractionKind::Save,
                )
            })
            .collect();
        info!(count = pending.len(), "Clearing saved articles.");
        join_all(pending)
    }

    pub fn share(&self, article_id: &str) {
        info!(%article_id, "Share requested.");
        self.ctx
            .notify(NoticeLevel::Info, "Share Saved Article", "Feature coming soon!");
    }
}

impl Drop for SavedScreen {
    fn drop(&mut self) {
        self.flags.token().cancel();
    }
}
