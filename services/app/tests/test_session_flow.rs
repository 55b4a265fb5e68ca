//! Session lifecycle: restore, the auth forms, session-driven navigation and
//! sign-out, all against the in-memory backend.

mod common;

use app_lib::app::ActiveScreen;
use app_lib::context::NoticeLevel;
use app_lib::error::AppError;
use app_lib::screens::{FormField, SubmitOutcome};
use common::{harness, signed_in, EMAIL, PASSWORD};
use shortcut_core::navigation::{AuthScreen, BackOutcome, Route, Screen};
use shortcut_core::ports::AuthError;
use std::time::{Duration, Instant};

#[tokio::test]
async fn restore_without_session_lands_on_welcome() {
    let h = harness().await;
    assert_eq!(h.app.route(), &Route::Unauthenticated(AuthScreen::Welcome));
    assert_eq!(h.app.active().name(), "Welcome");
    assert!(h.ctx.session().is_none());
}

#[tokio::test]
async fn welcome_and_forms_loop_without_a_session() -> Result<(), AppError> {
    let mut h = harness().await;

    h.app.show_login().await?;
    assert_eq!(h.app.active().name(), "Login");
    h.app.back_to_welcome().await?;
    h.app.show_signup().await?;
    assert_eq!(h.app.active().name(), "Signup");
    h.app.back_to_welcome().await?;

    assert_eq!(h.app.route(), &Route::Unauthenticated(AuthScreen::Welcome));
    assert!(h.ctx.session().is_none());
    Ok(())
}

#[tokio::test]
async fn authenticated_screens_are_unreachable_before_sign_in() {
    let mut h = harness().await;
    assert!(h.app.navigate(Screen::Home).await.is_err());
    assert_eq!(h.app.active().name(), "Welcome");
}

#[tokio::test]
async fn signup_creates_the_user_document_and_the_session_event_goes_home() -> Result<(), AppError> {
    let mut h = harness().await;
    h.app.show_signup().await?;

    let ctx = h.ctx.clone();
    let ActiveScreen::Signup(form) = h.app.active_mut() else {
        panic!("expected the signup form");
    };
    form.set(FormField::Name, "Ada Reader");
    form.set(FormField::Email, "ada@example.com");
    form.set(FormField::Password, "secret1");
    form.set(FormField::ConfirmPassword, "secret1");
    assert_eq!(form.submit(&ctx).await, SubmitOutcome::Submitted);

    // Submitting never navigates; the session event does.
    assert_eq!(h.app.route(), &Route::Unauthenticated(AuthScreen::Signup));
    h.pump().await;
    assert!(matches!(h.app.route(), Route::Authenticated { screen: Screen::Home, .. }));
    assert_eq!(h.feed().articles().len(), 4);

    let session = h.ctx.session().expect("signed in");
    let doc = h.backend.user_document(&session.uid).expect("user document");
    assert_eq!(doc["name"], "Ada Reader");
    assert_eq!(doc["stats"]["articlesRead"], 0);
    assert_eq!(doc["likedArticles"], serde_json::json!([]));

    let notices = h.notices();
    assert!(notices.iter().any(|n| n.title == "🎉 Account Created!"
        && n.message.contains("Welcome to AI ShortCut, Ada Reader!")));
    Ok(())
}

#[tokio::test]
async fn signup_validation_blocks_submission() -> Result<(), AppError> {
    let mut h = harness().await;
    h.app.show_signup().await?;

    let ctx = h.ctx.clone();
    let ActiveScreen::Signup(form) = h.app.active_mut() else {
        panic!("expected the signup form");
    };
    form.set(FormField::Name, "A");
    form.set(FormField::Email, "not-an-email");
    form.set(FormField::Password, "secret1");
    form.set(FormField::ConfirmPassword, "secret2");
    assert_eq!(form.submit(&ctx).await, SubmitOutcome::Invalid);
    assert_eq!(form.error(FormField::ConfirmPassword), Some("Passwords do not match"));
    assert!(form.error(FormField::Name).is_some());
    assert!(form.error(FormField::Email).is_some());
    assert!(h.notices().is_empty());
    Ok(())
}

#[tokio::test]
async fn wrong_password_alerts_and_stays_on_login() -> Result<(), AppError> {
    let mut h = harness().await;
    h.backend.add_account(EMAIL, PASSWORD, None);
    h.app.show_login().await?;

    let ctx = h.ctx.clone();
    let ActiveScreen::Login(form) = h.app.active_mut() else {
        panic!("expected the login form");
    };
    form.set(FormField::Email, EMAIL);
    form.set(FormField::Password, "wrong-password");
    assert_eq!(
        form.submit(&ctx).await,
        SubmitOutcome::Rejected(AuthError::WrongPassword)
    );
    assert!(!form.is_loading());

    let notices = h.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert_eq!(notices[0].title, "Login Failed");
    assert_eq!(notices[0].message, "Incorrect password. Please try again.");
    assert_eq!(h.app.route(), &Route::Unauthenticated(AuthScreen::Login));
    Ok(())
}

#[tokio::test]
async fn session_event_resets_the_article_selection() -> Result<(), AppError> {
    let (mut h, session) = signed_in().await;
    h.app.open_article(0).await?;
    assert_eq!(h.app.active().name(), "ArticleDetail");

    h.backend.restore_session(session);
    h.pump().await;
    assert_eq!(
        h.app.route(),
        &Route::Authenticated {
            screen: Screen::Home,
            selected_article: None
        }
    );
    assert_eq!(h.app.active().name(), "Home");
    Ok(())
}

#[tokio::test]
async fn article_navigation_round_trip() -> Result<(), AppError> {
    let (mut h, _) = signed_in().await;
    let first = h.feed().articles()[0].id.clone();

    h.app.open_article(0).await?;
    h.app.open_full_article().await?;
    assert_eq!(h.app.active().name(), "FullArticle");
    assert_eq!(h.detail().article().id, first);

    h.app.back_to_detail().await?;
    assert_eq!(h.app.active().name(), "ArticleDetail");
    h.app.close_article().await?;
    assert_eq!(
        h.app.route(),
        &Route::Authenticated {
            screen: Screen::Home,
            selected_article: None
        }
    );
    Ok(())
}

#[tokio::test]
async fn back_on_home_asks_for_confirmation_then_exits() {
    let (mut h, _) = signed_in().await;
    let start = Instant::now();

    assert_eq!(h.app.back(start).await, BackOutcome::ExitHint);
    let notices = h.notices();
    assert!(notices.iter().any(|n| n.title == "Exit" && n.message == "Press back again to exit"));

    assert_eq!(h.app.back(start + Duration::from_millis(500)).await, BackOutcome::Exit);
}

#[tokio::test]
async fn failed_sign_out_alerts_and_keeps_the_session() -> Result<(), AppError> {
    let (mut h, session) = signed_in().await;
    h.app.navigate(Screen::Profile).await?;
    assert_eq!(h.profile().display_name(), "Reader");

    h.backend.set_fail_sign_out(true);
    assert!(h.profile().sign_out().await.is_err());
    let notices = h.notices();
    assert!(notices.iter().any(|n| n.title == "Sign Out Failed"
        && n.message == "Could not sign out. Please try again."));
    assert_eq!(h.ctx.session(), Some(session));
    assert!(matches!(h.app.route(), Route::Authenticated { screen: Screen::Profile, .. }));

    h.backend.set_fail_sign_out(false);
    h.profile().sign_out().await?;
    h.pump().await;
    assert_eq!(h.app.route(), &Route::Unauthenticated(AuthScreen::Welcome));
    assert!(h.ctx.session().is_none());
    Ok(())
}
