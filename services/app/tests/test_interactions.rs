//! Likes, saves, reads and reading progress through the mounted screens.

mod common;

use app_lib::context::NoticeLevel;
use app_lib::error::AppError;
use app_lib::screens::LoadState;
use common::{harness, signed_in};
use serde_json::json;
use shortcut_core::navigation::Screen;
use shortcut_core::optimistic::Settlement;

#[tokio::test]
async fn feed_is_sorted_newest_first() {
    let (h, _) = signed_in().await;
    let ids: Vec<_> = h.feed().articles().iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, ["1", "2", "3", "4"]);
    assert_eq!(h.feed().state(), &LoadState::Ready);
}

#[tokio::test]
async fn like_is_persisted_and_can_be_undone() {
    let (h, session) = signed_in().await;
    let writes_before = h.backend.write_count();

    let pending = h.feed().toggle_like("2");
    assert!(h.feed().is_liked("2"));
    assert_eq!(pending.await, Settlement::Confirmed);
    let doc = h.backend.user_document(&session.uid).expect("user document");
    assert_eq!(doc["likedArticles"], json!(["2"]));

    assert_eq!(h.feed().toggle_like("2").await, Settlement::Confirmed);
    assert!(!h.feed().is_liked("2"));
    let doc = h.backend.user_document(&session.uid).expect("user document");
    assert_eq!(doc["likedArticles"], json!([]));
    assert_eq!(h.backend.write_count(), writes_before + 2);
}

#[tokio::test]
async fn failed_toggle_reverts_and_alerts() {
    let (mut h, _) = signed_in().await;
    h.backend.set_fail_writes(true);

    let pending = h.feed().toggle_save("3");
    assert!(h.feed().is_saved("3"), "flag flips before the call settles");
    assert_eq!(pending.await, Settlement::Reverted(false));
    assert!(!h.feed().is_saved("3"));

    let notices = h.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert_eq!(notices[0].title, "Error");
    assert_eq!(notices[0].message, "Could not update save status. Please try again.");
}

#[tokio::test]
async fn unmounting_detaches_an_in_flight_toggle() -> Result<(), AppError> {
    let (mut h, session) = signed_in().await;
    let gate = h.backend.hold_writes().await;

    let in_flight = tokio::spawn(h.feed().toggle_like("1"));
    h.app.navigate(Screen::Saved).await?;
    drop(gate);

    assert_eq!(in_flight.await.expect("toggle task"), Settlement::Detached);
    // The write itself still lands; only the local settlement is discarded.
    let doc = h.backend.user_document(&session.uid).expect("user document");
    assert_eq!(doc["likedArticles"], json!(["1"]));
    assert!(h.notices().is_empty());
    Ok(())
}

#[tokio::test]
async fn opening_an_article_counts_one_read_per_article() -> Result<(), AppError> {
    let (mut h, session) = signed_in().await;

    h.app.open_article(0).await?;
    h.detail().settle_background().await;
    h.app.open_full_article().await?;
    h.detail().settle_background().await;
    h.app.back_to_detail().await?;
    h.app.close_article().await?;

    h.app.open_article(0).await?;
    h.detail().settle_background().await;

    let doc = h.backend.user_document(&session.uid).expect("user document");
    assert_eq!(doc["readArticles"], json!(["1"]));
    assert_eq!(doc["stats"]["articlesRead"], 1);
    Ok(())
}

#[tokio::test]
async fn progress_is_reported_only_past_the_threshold() -> Result<(), AppError> {
    let (mut h, session) = signed_in().await;
    h.app.open_article(1).await?;
    h.detail().settle_background().await;
    let writes_after_read = h.backend.write_count();

    let fraction = h.detail().on_scroll(10.0, 1000.0, 500.0);
    assert!((fraction - 0.02).abs() < 1e-9);
    assert_eq!(h.detail().progress_updates(), 0);

    h.detail().on_scroll(250.0, 1000.0, 500.0);
    h.detail().on_scroll(400.0, 1000.0, 500.0);
    h.detail().settle_background().await;
    assert_eq!(h.detail().progress_updates(), 2);
    assert_eq!(h.backend.write_count(), writes_after_read + 2);

    let doc = h.backend.user_document(&session.uid).expect("user document");
    assert_eq!(doc["readingProgress"]["2"]["progress"], 80);
    Ok(())
}

#[tokio::test]
async fn saved_list_orders_by_save_time_and_clears() -> Result<(), AppError> {
    let (mut h, session) = signed_in().await;
    h.backend.insert_user_document(
        &session.uid,
        json!({
            "savedArticles": {
                "2": "2024-02-01T10:00:00Z",
                "4": "2024-03-01T10:00:00Z",
            }
        }),
    );
    h.app.navigate(Screen::Saved).await?;

    let ids: Vec<_> = h.saved().visible().iter().map(|a| a.id.clone()).collect();
    assert_eq!(ids, ["4", "2"]);

    let settlements = h.saved().clear_all().await;
    assert_eq!(settlements, [Settlement::Confirmed, Settlement::Confirmed]);
    assert!(h.saved().visible().is_empty());
    let doc = h.backend.user_document(&session.uid).expect("user document");
    assert_eq!(doc["savedArticles"], json!({}));
    Ok(())
}

#[tokio::test]
async fn legacy_saved_list_falls_back_to_article_recency() -> Result<(), AppError> {
    let (mut h, session) = signed_in().await;
    h.backend
        .insert_user_document(&session.uid, json!({ "savedArticles": ["3", "1"] }));
    h.app.navigate(Screen::Saved).await?;

    let ids: Vec<_> = h.saved().visible().iter().map(|a| a.id.clone()).collect();
    assert_eq!(ids, ["1", "3"]);

    assert!(h.saved().unsave("2").is_none());
    let pending = h.saved().unsave("1").expect("article 1 is saved");
    assert_eq!(h.saved().visible().len(), 1, "unsave hides the article at once");
    assert_eq!(pending.await, Settlement::Confirmed);

    let doc = h.backend.user_document(&session.uid).expect("user document");
    assert_eq!(doc["savedArticles"], json!(["3"]));
    Ok(())
}

#[tokio::test]
async fn read_failure_empties_the_feed_until_refresh() -> Result<(), AppError> {
    let mut h = harness().await;
    h.backend.add_account(common::EMAIL, common::PASSWORD, None);
    h.backend.set_fail_reads(true);
    h.sign_in().await;

    assert!(h.feed().articles().is_empty());
    assert!(matches!(h.feed().state(), LoadState::Failed(_)));
    assert!(h.notices().iter().any(|n| n.title == "Failed to load"));

    h.backend.set_fail_reads(false);
    h.app.navigate(Screen::Profile).await?;
    h.app.navigate(Screen::Home).await?;
    assert_eq!(h.feed().articles().len(), 4);
    assert_eq!(h.feed().state(), &LoadState::Ready);
    Ok(())
}

#[tokio::test]
async fn profile_reflects_reads_and_likes() -> Result<(), AppError> {
    let (mut h, _) = signed_in().await;
    h.feed().toggle_like("4").await;
    h.app.open_article(0).await?;
    h.detail().settle_background().await;
    h.app.navigate(Screen::Profile).await?;

    let stats = h.profile().stats();
    assert_eq!(stats.articles_read, 1);
    assert_eq!(stats.liked, 1);
    let history: Vec<_> = h.profile().reading_history().iter().map(|a| a.id.clone()).collect();
    assert_eq!(history, ["1"]);
    Ok(())
}

#[tokio::test]
async fn overlapping_mark_reads_count_once() -> Result<(), AppError> {
    let (h, session) = signed_in().await;
    let service = h.ctx.interactions.clone();
    let gate = h.backend.hold_writes().await;

    let first = tokio::spawn({
        let service = service.clone();
        let uid = session.uid.clone();
        async move { service.mark_read(&uid, "1").await }
    });
    // Let the first call claim the pair and park on the held write.
    tokio::task::yield_now().await;
    let second = service.mark_read(&session.uid, "1").await?;
    drop(gate);
    let first = first.await.expect("mark-read task")?;

    assert_eq!((first, second), (true, false));
    let doc = h.backend.user_document(&session.uid).expect("user document");
    assert_eq!(doc["stats"]["articlesRead"], 1);
    assert_eq!(doc["readArticles"], json!(["1"]));
    Ok(())
}
