//! crates/shortcut_core/src/navigation.rs
//!
//! The authentication/navigation state machine of the root application.
//!
//! Authenticated and unauthenticated branches are switched only by session events
//! from the identity provider. Every other transition is local and validated
//! against the current route.

use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::domain::{Article, Session};

/// Default window for the double-press-to-exit policy at a root screen.
pub const EXIT_CONFIRM_WINDOW: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScreen {
    Welcome,
    Login,
    Signup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Profile,
    Saved,
    ArticleDetail,
    FullArticle,
}

impl Screen {
    fn needs_article(self) -> bool {
        matches!(self, Screen::ArticleDetail | Screen::FullArticle)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Waiting for the one-time session restore; nothing is rendered.
    Restoring,
    Unauthenticated(AuthScreen),
    Authenticated {
        screen: Screen,
        selected_article: Option<Article>,
    },
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::Restoring => f.write_str("Restoring"),
            Route::Unauthenticated(screen) => write!(f, "Unauthenticated.{screen:?}"),
            Route::Authenticated { screen, .. } => write!(f, "Authenticated.{screen:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("cannot {action} from {from}")]
    InvalidTransition { from: String, action: &'static str },
}

/// What a platform back press did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackOutcome {
    /// Moved one level up.
    Popped,
    /// First press at a root: the press is absorbed and a hint should be shown.
    ExitHint,
    /// Second press at a root inside the window: the application should exit.
    Exit,
    /// Nothing to do (still restoring).
    Ignored,
}

#[derive(Debug)]
pub struct Navigator {
    route: Route,
    session: Option<Session>,
    exit_window: Duration,
    exit_armed_at: Option<Instant>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(EXIT_CONFIRM_WINDOW)
    }
}

impl Navigator {
    pub fn new(exit_window: Duration) -> Self {
        Self {
            route: Route::Restoring,
            session: None,
            exit_window,
            exit_armed_at: None,
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_restoring(&self) -> bool {
        matches!(self.route, Route::Restoring)
    }

    pub fn auth_screen(&self) -> Option<AuthScreen> {
        match self.route {
            Route::Unauthenticated(screen) => Some(screen),
            _ => None,
        }
    }

    pub fn current_screen(&self) -> Option<Screen> {
        match self.route {
            Route::Authenticated { screen, .. } => Some(screen),
            _ => None,
        }
    }

    pub fn selected_article(&self) -> Option<&Article> {
        match &self.route {
            Route::Authenticated { selected_article, .. } => selected_article.as_ref(),
            _ => None,
        }
    }

    //=====================================================================================
    // Session events
    //=====================================================================================

    /// Applies a session event from the identity provider. A user always lands on
    /// `Home` with nothing selected; no user always lands on `Welcome`.
    pub fn on_session_changed(&mut self, session: Option<Session>) {
        self.exit_armed_at = None;
        match session {
            Some(session) => {
                debug!(uid = %session.uid, "Session established; resetting to Home.");
                self.session = Some(session);
                self.route = Route::Authenticated {
                    screen: Screen::Home,
                    selected_article: None,
                };
            }
            None => {
                debug!("No session; showing Welcome.");
                self.session = None;
                self.route = Route::Unauthenticated(AuthScreen::Welcome);
            }
        }
    }

    //=====================================================================================
    // Unauthenticated branch
    //=====================================================================================

    pub fn show_login(&mut self) -> Result<(), NavigationError> {
        match self.route {
            Route::Unauthenticated(AuthScreen::Welcome | AuthScreen::Signup) => {
                self.set_auth_screen(AuthScreen::Login);
                Ok(())
            }
            _ => Err(self.invalid("show login")),
        }
    }

    pub fn show_signup(&mut self) -> Result<(), NavigationError> {
        match self.route {
            Route::Unauthenticated(AuthScreen::Welcome | AuthScreen::Login) => {
                self.set_auth_screen(AuthScreen::Signup);
                Ok(())
            }
            _ => Err(self.invalid("show sign-up")),
        }
    }

    pub fn back_to_welcome(&mut self) -> Result<(), NavigationError> {
        match self.route {
            Route::Unauthenticated(AuthScreen::Login | AuthScreen::Signup) => {
                self.set_auth_screen(AuthScreen::Welcome);
                Ok(())
            }
            _ => Err(self.invalid("go back to welcome")),
        }
    }

    //=====================================================================================
    // Authenticated branch
    //=====================================================================================

    /// Bottom-menu navigation. Detail screens requested here without a selected
    /// article fall back to `Home`.
    pub fn navigate(&mut self, screen: Screen) -> Result<(), NavigationError> {
        let Route::Authenticated { selected_article, .. } = &self.route else {
            return Err(self.invalid("navigate"));
        };
        let selected = if screen.needs_article() {
            selected_article.clone()
        } else {
            None
        };
        self.set_authenticated(screen, selected);
        Ok(())
    }

    /// Opens an article from the feed or the saved list.
    pub fn open_article(&mut self, article: Article) -> Result<(), NavigationError> {
        match self.route {
            Route::Authenticated {
                screen: Screen::Home | Screen::Saved,
                ..
            } => {
                debug!(article_id = %article.id, "Opening article detail.");
                self.set_authenticated(Screen::ArticleDetail, Some(article));
                Ok(())
            }
            _ => Err(self.invalid("open an article")),
        }
    }

    pub fn open_full_article(&mut self) -> Result<(), NavigationError> {
        match &self.route {
            Route::Authenticated {
                screen: Screen::ArticleDetail,
                selected_article,
            } => {
                let selected = selected_article.clone();
                self.set_authenticated(Screen::FullArticle, selected);
                Ok(())
            }
            _ => Err(self.invalid("open the full article")),
        }
    }

    pub fn back_to_detail(&mut self) -> Result<(), NavigationError> {
        match &self.route {
            Route::Authenticated {
                screen: Screen::FullArticle,
                selected_article,
            } => {
                let selected = selected_article.clone();
                self.set_authenticated(Screen::ArticleDetail, selected);
                Ok(())
            }
            _ => Err(self.invalid("go back to the article")),
        }
    }

    pub fn close_article(&mut self) -> Result<(), NavigationError> {
        match self.route {
            Route::Authenticated {
                screen: Screen::ArticleDetail,
                ..
            } => {
                self.set_authenticated(Screen::Home, None);
                Ok(())
            }
            _ => Err(self.invalid("close the article")),
        }
    }

    //=====================================================================================
    // Platform back
    //=====================================================================================

    /// Pops one level. At a root (`Welcome`, or `Home` with nothing selected) the first
    /// press only arms the exit and a second press inside the window exits.
    pub fn back(&mut self, now: Instant) -> BackOutcome {
        let popped = match &self.route {
            Route::Restoring => return BackOutcome::Ignored,
            Route::Unauthenticated(AuthScreen::Welcome) => false,
            Route::Unauthenticated(_) => {
                self.route = Route::Unauthenticated(AuthScreen::Welcome);
                true
            }
            Route::Authenticated {
                screen: Screen::FullArticle,
                selected_article,
            } => {
                let selected = selected_article.clone();
                self.set_authenticated(Screen::ArticleDetail, selected);
                true
            }
            Route::Authenticated {
                screen: Screen::Home,
                selected_article: None,
            } => false,
            Route::Authenticated { .. } => {
                self.set_authenticated(Screen::Home, None);
                true
            }
        };

        if popped {
            self.exit_armed_at = None;
            return BackOutcome::Popped;
        }

        match self.exit_armed_at {
            Some(armed) if now.saturating_duration_since(armed) <= self.exit_window => {
                self.exit_armed_at = None;
                BackOutcome::Exit
            }
            _ => {
                self.exit_armed_at = Some(now);
                BackOutcome::ExitHint
            }
        }
    }

    //=====================================================================================
    // Helpers
    //=====================================================================================

    fn set_auth_screen(&mut self, screen: AuthScreen) {
        self.exit_armed_at = None;
        self.route = Route::Unauthenticated(screen);
    }

    fn set_authenticated(&mut self, screen: Screen, selected_article: Option<Article>) {
        self.exit_armed_at = None;
        if screen.needs_article() && selected_article.is_none() {
            warn!(?screen, "No article selected; returning to Home.");
            self.route = Route::Authenticated {
                screen: Screen::Home,
                selected_article: None,
            };
            return;
        }
        self.route = Route::Authenticated {
            screen,
            selected_article,
        };
    }

    fn invalid(&self, action: &'static str) -> NavigationError {
        NavigationError::InvalidTransition {
            from: self.route.to_string(),
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            uid: "u1".into(),
            email: Some("reader@example.com".into()),
            display_name: Some("Reader".into()),
        }
    }

    fn article(id: &str) -> Article {
        crate::normalize::normalize_article(
            crate::ports::RawDocument {
                id: id.into(),
                data: serde_json::json!({"headline": id}),
            },
            chrono::Utc::now(),
        )
    }

    fn signed_in() -> Navigator {
        let mut nav = Navigator::default();
        nav.on_session_changed(Some(session()));
        nav
    }

    #[test]
    fn starts_restoring_and_resolves_to_welcome() {
        let mut nav = Navigator::default();
        assert!(nav.is_restoring());
        assert!(nav.show_login().is_err());

        nav.on_session_changed(None);
        assert_eq!(nav.auth_screen(), Some(AuthScreen::Welcome));
        assert!(nav.session().is_none());
    }

    #[test]
    fn welcome_login_cycles_never_authenticate() {
        let mut nav = Navigator::default();
        nav.on_session_changed(None);
        for _ in 0..5 {
            nav.show_login().unwrap();
            nav.back_to_welcome().unwrap();
        }
        assert_eq!(nav.route(), &Route::Unauthenticated(AuthScreen::Welcome));
        assert!(nav.session().is_none());
    }

    #[test]
    fn login_and_signup_swap() {
        let mut nav = Navigator::default();
        nav.on_session_changed(None);
        nav.show_signup().unwrap();
        nav.show_login().unwrap();
        nav.show_signup().unwrap();
        assert_eq!(nav.auth_screen(), Some(AuthScreen::Signup));
        assert!(nav.back_to_welcome().is_ok());
        assert!(nav.back_to_welcome().is_err());
    }

    #[test]
    fn session_event_always_resets_to_home() {
        let mut nav = signed_in();
        nav.open_article(article("a")).unwrap();
        nav.open_full_article().unwrap();

        nav.on_session_changed(Some(session()));
        assert_eq!(nav.current_screen(), Some(Screen::Home));
        assert!(nav.selected_article().is_none());

        let mut from_login = Navigator::default();
        from_login.on_session_changed(None);
        from_login.show_login().unwrap();
        from_login.on_session_changed(Some(session()));
        assert_eq!(from_login.current_screen(), Some(Screen::Home));
    }

    #[test]
    fn article_flow_keeps_selection_until_closed() {
        let mut nav = signed_in();
        nav.navigate(Screen::Saved).unwrap();
        nav.open_article(article("a")).unwrap();
        assert_eq!(nav.current_screen(), Some(Screen::ArticleDetail));

        nav.open_full_article().unwrap();
        assert_eq!(nav.selected_article().map(|a| a.id.as_str()), Some("a"));

        nav.back_to_detail().unwrap();
        assert_eq!(nav.current_screen(), Some(Screen::ArticleDetail));
        assert_eq!(nav.selected_article().map(|a| a.id.as_str()), Some("a"));

        nav.close_article().unwrap();
        assert_eq!(nav.current_screen(), Some(Screen::Home));
        assert!(nav.selected_article().is_none());
    }

    #[test]
    fn rejects_transitions_outside_the_table() {
        let mut nav = signed_in();
        nav.navigate(Screen::Profile).unwrap();
        let err = nav.open_article(article("a")).unwrap_err();
        assert_eq!(
            err,
            NavigationError::InvalidTransition {
                from: "Authenticated.Profile".into(),
                action: "open an article",
            }
        );
        assert_eq!(nav.current_screen(), Some(Screen::Profile));
        assert!(nav.open_full_article().is_err());
        assert!(nav.show_login().is_err());
    }

    #[test]
    fn detail_without_article_lands_on_home() {
        let mut nav = signed_in();
        nav.navigate(Screen::Profile).unwrap();
        nav.navigate(Screen::FullArticle).unwrap();
        assert_eq!(nav.current_screen(), Some(Screen::Home));
        assert!(nav.selected_article().is_none());
    }

    #[test]
    fn tab_navigation_clears_selection() {
        let mut nav = signed_in();
        nav.open_article(article("a")).unwrap();
        nav.navigate(Screen::Saved).unwrap();
        assert!(nav.selected_article().is_none());

        nav.open_article(article("b")).unwrap();
        nav.open_full_article().unwrap();
        nav.navigate(Screen::Profile).unwrap();
        assert_eq!(nav.current_screen(), Some(Screen::Profile));
        assert!(nav.selected_article().is_none());
    }

    #[test]
    fn back_pops_one_level() {
        let mut nav = signed_in();
        let now = Instant::now();
        nav.open_article(article("a")).unwrap();
        nav.open_full_article().unwrap();

        assert_eq!(nav.back(now), BackOutcome::Popped);
        assert_eq!(nav.current_screen(), Some(Screen::ArticleDetail));
        assert_eq!(nav.back(now), BackOutcome::Popped);
        assert_eq!(nav.current_screen(), Some(Screen::Home));

        nav.navigate(Screen::Profile).unwrap();
        assert_eq!(nav.back(now), BackOutcome::Popped);
        assert_eq!(nav.current_screen(), Some(Screen::Home));
    }

    #[test]
    fn root_requires_double_press_inside_window() {
        let mut nav = signed_in();
        let t0 = Instant::now();
        assert_eq!(nav.back(t0), BackOutcome::ExitHint);
        assert_eq!(nav.back(t0 + Duration::from_millis(2000)), BackOutcome::ExitHint);
        assert_eq!(nav.back(t0 + Duration::from_millis(2500)), BackOutcome::Exit);

        let mut welcome = Navigator::default();
        welcome.on_session_changed(None);
        welcome.show_login().unwrap();
        assert_eq!(welcome.back(t0), BackOutcome::Popped);
        assert_eq!(welcome.back(t0), BackOutcome::ExitHint);
        assert_eq!(welcome.back(t0 + Duration::from_millis(1500)), BackOutcome::Exit);
    }

    #[test]
    fn back_while_restoring_is_ignored() {
        let mut nav = Navigator::default();
        assert_eq!(nav.back(Instant::now()), BackOutcome::Ignored);
    }
}
