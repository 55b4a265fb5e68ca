//! services/app/src/context.rs
//!
//! Defines the application context shared by every screen, plus the session-scoped
//! cancellation that ties screen lifetimes to the signed-in user.

use crate::config::Config;
use shortcut_core::domain::Session;
use shortcut_core::ports::{DocumentStore, IdentityService};
use shortcut_core::service::InteractionService;
use shortcut_core::theme::{ColorScheme, ThemePreference};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

//=========================================================================================
// Notices
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A user-visible alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

pub type NoticeReceiver = mpsc::UnboundedReceiver<Notice>;

//=========================================================================================
// AppContext (Shared Across All Screens)
//=========================================================================================

/// Created once at startup and passed to every screen.
pub struct AppContext {
    pub config: Arc<Config>,
    pub identity: Arc<dyn IdentityService>,
    pub interactions: Arc<InteractionService>,
    notices: mpsc::UnboundedSender<Notice>,
    session: RwLock<Option<Session>>,
    /// Cancelled on sign-out; every screen token is a child of it.
    session_token: Mutex<CancellationToken>,
    theme: Mutex<ThemePreference>,
    notifications: AtomicBool,
}

impl AppContext {
    pub fn init(
        config: Arc<Config>,
        identity: Arc<dyn IdentityService>,
        store: Arc<dyn DocumentStore>,
        system_scheme: ColorScheme,
    ) -> (Arc<Self>, NoticeReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let context = Arc::new(Self {
            config,
            identity,
            interactions: Arc::new(InteractionService::new(store)),
            notices: tx,
            session: RwLock::new(None),
            session_token: Mutex::new(CancellationToken::new()),
            theme: Mutex::new(ThemePreference::from_system(system_scheme)),
            notifications: AtomicBool::new(true),
        });
        (context, rx)
    }

    //=====================================================================================
    // Session Lifetime
    //=====================================================================================

    pub fn session(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Adopts a newly authenticated session. A different user gets a fresh scope.
    pub fn begin_session(&self, session: Session) {
        let mut current = self.session.write().unwrap_or_else(PoisonError::into_inner);
        let same_user = current.as_ref().map(|s| s.uid.as_str()) == Some(session.uid.as_str());
        if !same_user {
            self.reset_scope();
            info!(uid = %session.uid, "Session started.");
        }
        *current = Some(session);
    }

    /// Drops the session and detaches every screen that belonged to it.
    pub fn teardown(&self) {
        let previous = self
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.reset_scope();
        if let Some(session) = previous {
            info!(uid = %session.uid, "Session torn down.");
        }
    }

    /// A token for one mounted screen; cancelled when the screen unmounts or the
    /// session ends, whichever comes first.
    pub fn screen_token(&self) -> CancellationToken {
        lock(&self.session_token).child_token()
    }

    fn reset_scope(&self) {
        let mut token = lock(&self.session_token);
        token.cancel();
        *token = CancellationToken::new();
    }

    //=====================================================================================
    // Notices & Preferences
    //=====================================================================================

    pub fn notify(&self, level: NoticeLevel, title: &str, message: impl Into<String>) {
        let notice = Notice {
            level,
            title: title.to_string(),
            message: message.into(),
        };
        if self.notices.send(notice).is_err() {
            debug!(%title, "Notice dropped; nobody is listening.");
        }
    }

    pub fn theme(&self) -> ThemePreference {
        *lock(&self.theme)
    }

    pub fn toggle_theme(&self) -> ThemePreference {
        let mut theme = lock(&self.theme);
        theme.toggle();
        *theme
    }

    pub fn reset_theme(&self, scheme: ColorScheme) -> ThemePreference {
        let mut theme = lock(&self.theme);
        theme.reset_to_system(scheme);
        *theme
    }

    pub fn on_system_scheme(&self, scheme: ColorScheme) {
        lock(&self.theme).on_system_change(scheme);
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notifications.load(Ordering::SeqCst)
    }

    /// Flips the local notifications preference and returns the new value.
    pub fn toggle_notifications(&self) -> bool {
        !self.notifications.fetch_xor(true, Ordering::SeqCst)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryBackend;

    fn context() -> (Arc<AppContext>, NoticeReceiver) {
        let backend = Arc::new(MemoryBackend::default());
        AppContext::init(
            Arc::new(Config::default()),
            backend.clone(),
            backend,
            ColorScheme::Light,
        )
    }

    fn session(uid: &str) -> Session {
        Session {
            uid: uid.into(),
            email: None,
            display_name: None,
        }
    }

    #[test]
    fn teardown_cancels_screen_tokens() {
        let (ctx, _rx) = context();
        ctx.begin_session(session("u1"));
        let token = ctx.screen_token();

        ctx.begin_session(session("u1"));
        assert!(!token.is_cancelled());

        ctx.teardown();
        assert!(token.is_cancelled());
        assert!(ctx.session().is_none());
        assert!(!ctx.screen_token().is_cancelled());
    }

    #[test]
    fn switching_users_resets_scope() {
        let (ctx, _rx) = context();
        ctx.begin_session(session("u1"));
        let token = ctx.screen_token();
        ctx.begin_session(session("u2"));
        assert!(token.is_cancelled());
    }

    #[test]
    fn preferences_toggle() {
        let (ctx, mut rx) = context();
        assert!(!ctx.toggle_notifications());
        assert!(ctx.toggle_notifications());
        assert!(ctx.toggle_theme().is_dark);
        assert!(!ctx.reset_theme(ColorScheme::Light).is_dark);

        ctx.notify(NoticeLevel::Info, "Hi", "there");
        assert_eq!(rx.try_recv().unwrap().title, "Hi");
    }
}
