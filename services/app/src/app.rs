//! services/app/src/app.rs
//!
//! The root of the application: owns the navigator and the one mounted screen.
//!
//! Every navigation goes through the `Navigator` first; only a transition it
//! accepts remounts a screen. Replacing the mounted screen drops the old one,
//! which cancels its token so late settlements are discarded.

use crate::context::{AppContext, NoticeLevel};
use crate::error::AppError;
use crate::screens::{
    DetailMode, DetailScreen, FeedScreen, LoginForm, ProfileScreen, SavedScreen, SignupForm,
};
use shortcut_core::domain::{Article, Session};
use shortcut_core::navigation::{AuthScreen, BackOutcome, Navigator, Route, Screen};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Inputs that arrive from outside the user's own actions.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    SessionChanged(Option<Session>),
}

pub enum ActiveScreen {
    Restoring,
    Welcome,
    Login(LoginForm),
    Signup(SignupForm),
    Feed(FeedScreen),
    Saved(SavedScreen),
    Profile(ProfileScreen),
    Detail(DetailScreen),
}

impl ActiveScreen {
    pub fn name(&self) -> &'static str {
        match self {
            ActiveScreen::Restoring => "Restoring",
            ActiveScreen::Welcome => "Welcome",
            ActiveScreen::Login(_) => "Login",
            ActiveScreen::Signup(_) => "Signup",
            ActiveScreen::Feed(_) => "Home",
            ActiveScreen::Saved(_) => "Saved",
            ActiveScreen::Profile(_) => "Profile",
            ActiveScreen::Detail(detail) => match detail.mode() {
                DetailMode::Summary => "ArticleDetail",
                DetailMode::Full => "FullArticle",
            },
        }
    }
}

pub struct ShortcutApp {
    ctx: Arc<AppContext>,
    nav: Navigator,
    active: ActiveScreen,
}

impl ShortcutApp {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        let nav = Navigator::new(ctx.config.exit_confirm_window);
        Self {
            ctx,
            nav,
            active: ActiveScreen::Restoring,
        }
    }

    pub fn context(&self) -> &Arc<AppContext> {
        &self.ctx
    }

    pub fn navigator(&self) -> &Navigator {
        &self.nav
    }

    pub fn route(&self) -> &Route {
        self.nav.route()
    }

    pub fn active(&self) -> &ActiveScreen {
        &self.active
    }

    pub fn active_mut(&mut self) -> &mut ActiveScreen {
        &mut self.active
    }

    pub async fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::SessionChanged(session) => self.on_session_changed(session).await,
        }
    }

    async fn on_session_changed(&mut self, session: Option<Session>) {
        match &session {
            Some(s) => self.ctx.begin_session(s.clone()),
            None => self.ctx.teardown(),
        }
        self.nav.on_session_changed(session);
        // A session event always remounts, even if the route looks unchanged.
        self.active = ActiveScreen::Restoring;
        self.remount().await;
    }

    //=====================================================================================
    // Transitions
    //=====================================================================================

    pub async fn show_login(&mut self) -> Result<(), AppError> {
        self.nav.show_login()?;
        self.remount().await;
        Ok(())
    }

    pub async fn show_signup(&mut self) -> Result<(), AppError> {
        self.nav.show_signup()?;
        self.remount().await;
        Ok(())
    }

    pub async fn back_to_welcome(&mut self) -> Result<(), AppError> {
        self.nav.back_to_welcome()?;
        self.remount().await;
        Ok(())
    }

    pub async fn navigate(&mut self, screen: Screen) -> Result<(), AppError> {
        self.nav.navigate(screen)?;
        self.remount().await;
        Ok(())
    }

    /// Opens the article at `index` of the list on screen (feed or saved).
    pub async fn open_article(&mut self, index: usize) -> Result<(), AppError> {
        let article = match &self.active {
            ActiveScreen::Feed(feed) => feed.article(index).cloned(),
            ActiveScreen::Saved(saved) => saved.article(index).cloned(),
            _ => None,
        }
        .ok_or_else(|| AppError::Internal(format!("no article at position {}", index)))?;
        self.open(article).await
    }

    pub async fn open(&mut self, article: Article) -> Result<(), AppError> {
        self.nav.open_article(article)?;
        self.remount().await;
        Ok(())
    }

    pub async fn open_full_article(&mut self) -> Result<(), AppError> {
        self.nav.open_full_article()?;
        self.remount().await;
        Ok(())
    }

    pub async fn back_to_detail(&mut self) -> Result<(), AppError> {
        self.nav.back_to_detail()?;
        self.remount().await;
        Ok(())
    }

    pub async fn close_article(&mut self) -> Result<(), AppError> {
        self.nav.close_article()?;
        self.remount().await;
        Ok(())
    }

    /// Platform back. The exit hint is surfaced as a notice.
    pub async fn back(&mut self, now: Instant) -> BackOutcome {
        let outcome = self.nav.back(now);
        match outcome {
            BackOutcome::Popped => self.remount().await,
            BackOutcome::ExitHint => {
                self.ctx
                    .notify(NoticeLevel::Info, "Exit", "Press back again to exit");
            }
            BackOutcome::Exit => info!("Exit confirmed."),
            BackOutcome::Ignored => {}
        }
        outcome
    }

    //=====================================================================================
    // Mounting
    //=====================================================================================

    /// Brings the mounted screen in line with the navigator's route.
    async fn remount(&mut self) {
        let route = self.nav.route().clone();
        match route {
            Route::Restoring => self.active = ActiveScreen::Restoring,
            Route::Unauthenticated(AuthScreen::Welcome) => self.active = ActiveScreen::Welcome,
            Route::Unauthenticated(AuthScreen::Login) => {
                if !matches!(self.active, ActiveScreen::Login(_)) {
                    self.active = ActiveScreen::Login(LoginForm::new());
                }
            }
            Route::Unauthenticated(AuthScreen::Signup) => {
                if !matches!(self.active, ActiveScreen::Signup(_)) {
                    self.active = ActiveScreen::Signup(SignupForm::new());
                }
            }
            Route::Authenticated {
                screen,
                selected_article,
            } => self.mount_authenticated(screen, selected_article).await,
        }
        debug!(route = %self.nav.route(), screen = self.active.name(), "Screen mounted.");
    }

    async fn mount_authenticated(&mut self, screen: Screen, selected: Option<Article>) {
        let Some(session) = self.nav.session().cloned() else {
            self.active = ActiveScreen::Restoring;
            return;
        };

        let mode = match screen {
            Screen::ArticleDetail => Some(DetailMode::Summary),
            Screen::FullArticle => Some(DetailMode::Full),
            _ => None,
        };

        if let (Some(mode), Some(article)) = (mode, selected) {
            // Summary and full text of the same article share one screen.
            if let ActiveScreen::Detail(detail) = &mut self.active {
                if detail.article().id == article.id {
                    detail.set_mode(mode);
                    return;
                }
            }
            self.active = ActiveScreen::Restoring;
            let detail = DetailScreen::mount(self.ctx.clone(), &session, article, mode).await;
            self.active = ActiveScreen::Detail(detail);
            return;
        }

        // Drop the old screen before loading the next one.
        self.active = ActiveScreen::Restoring;
        self.active = match screen {
            Screen::Saved => ActiveScreen::Saved(SavedScreen::mount(self.ctx.clone(), &session).await),
            Screen::Profile => {
                ActiveScreen::Profile(ProfileScreen::mount(self.ctx.clone(), &session).await)
            }
            _ => ActiveScreen::Feed(FeedScreen::mount(self.ctx.clone(), &session).await),
        };
    }
}
