//! services/app/src/screens/detail.rs
//!
//! The article screen, shared by the summary view (ArticleDetail) and the full
//! text view (FullArticle). Moving between the two keeps the same screen, so the
//! article is marked read once per visit.

use crate::context::{AppContext, NoticeLevel};
use crate::screens::toggle_interaction;
use shortcut_core::domain::{Article, InteractionKind, Session};
use shortcut_core::optimistic::{OptimisticFlags, Settlement};
use shortcut_core::reading::{scroll_fraction, ProgressGate};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailMode {
    Summary,
    Full,
}

pub struct DetailScreen {
    ctx: Arc<AppContext>,
    uid: String,
    article: Article,
    mode: DetailMode,
    flags: Arc<OptimisticFlags>,
    gate: ProgressGate,
    /// Fire-and-forget writes (mark-read, progress) started by this screen.
    background: Vec<JoinHandle<()>>,
}

impl DetailScreen {
    pub async fn mount(
        ctx: Arc<AppContext>,
        session: &Session,
        article: Article,
        mode: DetailMode,
    ) -> Self {
        let flags = Arc::new(OptimisticFlags::new(ctx.screen_token()));
        match ctx.interactions.fetch_interactions(&session.uid).await {
            Ok(record) => flags.seed(&record, std::slice::from_ref(&article)),
            Err(e) => warn!(article_id = %article.id, "Could not load interaction flags: {e}"),
        }

        let mut screen = Self {
            ctx,
            uid: session.uid.clone(),
            article,
            mode,
            flags,
            gate: ProgressGate::new(),
            background: Vec::new(),
        };
        screen.spawn_mark_read();
        screen
    }

    fn spawn_mark_read(&mut self) {
        let service = self.ctx.interactions.clone();
        let uid = self.uid.clone();
        let article_id = self.article.id.clone();
        self.background.push(tokio::spawn(async move {
            match service.mark_read(&uid, &article_id).await {
                Ok(true) => debug!(%article_id, "Read recorded."),
                Ok(false) => debug!(%article_id, "Already read."),
                Err(e) => warn!(%article_id, "Could not mark article as read: {e}"),
            }
        }));
    }

    pub fn article(&self) -> &Article {
        &self.article
    }

    pub fn mode(&self) -> DetailMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: DetailMode) {
        self.mode = mode;
    }

    pub fn is_liked(&self) -> bool {
        self.flags.get(&self.article.id, InteractionKind::Like)
    }

    pub fn is_saved(&self) -> bool {
        self.flags.get(&self.article.id, InteractionKind::Save)
    }

    pub fn toggle_like(&self) -> impl Future<Output = Settlement> + Send + 'static {
        self.toggle(InteractionKind::Like)
    }

    pub fn toggle_save(&self) -> impl Future<Output = Settlement> + Send + 'static {
        self.toggle(InteractionKind::Save)
    }

    fn toggle(&self, kind: InteractionKind) -> impl Future<Output = Settlement> + Send + 'static {
        toggle_interaction(
            self.ctx.clone(),
            self.flags.clone(),
            self.uid.clone(),
            &self.article.id,
            kind,
        )
    }

    /// Handles a scroll report and returns the fraction for the progress bar.
    /// Reports past the threshold are written to the backend.
    pub fn on_scroll(&mut self, offset: f64, content_height: f64, viewport_height: f64) -> f64 {
        let fraction = scroll_fraction(offset, content_height, viewport_height);
        if let Some(percent) = self.gate.observe(fraction) {
            let service = self.ctx.interactions.clone();
            let uid = self.uid.clone();
            let article_id = self.article.id.clone();
            self.background.push(tokio::spawn(async move {
                service.update_progress(&uid, &article_id, percent).await;
            }));
        }
        fraction
    }

    pub fn progress(&self) -> f64 {
        self.gate.fraction()
    }

    /// Number of progress updates sent so far.
    pub fn progress_updates(&self) -> usize {
        self.gate.sent()
    }

    /// Waits for the background writes started so far.
    pub async fn settle_background(&mut self) {
        for handle in self.background.drain(..) {
            if let Err(e) = handle.await {
                warn!("Background write task failed: {e}");
            }
        }
    }

    pub fn share(&self) {
        info!(article_id = %self.article.id, "Share requested.");
        self.ctx
            .notify(NoticeLevel::Info, "Share Article", "Feature coming soon!");
    }
}

impl Drop for DetailScreen {
    fn drop(&mut self) {
        // Writes already started are left to finish; only flag settlements detach.
        self.flags.token().cancel();
    }
}
