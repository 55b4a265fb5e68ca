//! services/app/src/screens/profile.rs

use crate::context::{AppContext, NoticeLevel};
use crate::screens::LoadState;
use shortcut_core::domain::{Article, ProfileStats, Session};
use shortcut_core::error::FetchError;
use shortcut_core::ports::PortResult;
use shortcut_core::theme::ThemePreference;
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_DISPLAY_NAME: &str = "AI News Reader";

/// Account summary, reading statistics and local settings.
pub struct ProfileScreen {
    ctx: Arc<AppContext>,
    session: Session,
    stats: ProfileStats,
    history: Vec<Article>,
    state: LoadState,
}

impl ProfileScreen {
    pub async fn mount(ctx: Arc<AppContext>, session: &Session) -> Self {
        let mut screen = Self {
            ctx,
            session: session.clone(),
            stats: ProfileStats::default(),
            history: Vec::new(),
            state: LoadState::Loading,
        };
        screen.refresh().await;
        screen
    }

    pub async fn refresh(&mut self) {
        let service = &self.ctx.interactions;
        let uid = &self.session.uid;
        let loaded: Result<_, FetchError> = async {
            let record = service.fetch_interactions(uid).await?;
            let articles = service.fetch_articles().await?;
            let history = service.reading_history(uid, &articles).await?;
            Ok((ProfileStats::from(&record), history))
        }
        .await;

        match loaded {
            Ok((stats, history)) => {
                self.stats = stats;
                self.history = history;
                self.state = LoadState::Ready;
            }
            Err(e) => {
                warn!("Profile stats failed to load: {e}");
                self.stats = ProfileStats::default();
                self.history.clear();
                self.state = LoadState::Failed(e.to_string());
            }
        }
    }

    pub fn display_name(&self) -> &str {
        self.session
            .display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_DISPLAY_NAME)
    }

    pub fn email(&self) -> Option<&str> {
        self.session.email.as_deref()
    }

    pub fn stats(&self) -> ProfileStats {
        self.stats
    }

    /// Articles the user has read, newest first.
    pub fn reading_history(&self) -> &[Article] {
        &self.history
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn toggle_notifications(&self) -> bool {
        let enabled = self.ctx.toggle_notifications();
        let message = if enabled {
            "Notifications enabled"
        } else {
            "Notifications disabled"
        };
        self.ctx.notify(NoticeLevel::Info, "Notifications", message);
        enabled
    }

    pub fn toggle_theme(&self) -> ThemePreference {
        self.ctx.toggle_theme()
    }

    /// Asks the identity provider to end the session. The resulting session event,
    /// not this call, moves the app back to the welcome screen; on failure nothing
    /// changes locally and the user is told.
    pub async fn sign_out(&self) -> PortResult<()> {
        match self.ctx.identity.sign_out().await {
            Ok(()) => {
                info!(uid = %self.session.uid, "Sign-out requested.");
                Ok(())
            }
            Err(e) => {
                warn!(uid = %self.session.uid, "Sign-out failed: {e}");
                self.ctx.notify(
                    NoticeLevel::Error,
                    "Sign Out Failed",
                    "Could not sign out. Please try again.",
                );
                Err(e)
            }
        }
    }
}
