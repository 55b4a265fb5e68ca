//! services/app/src/screens/mod.rs
//!
//! Screen controllers. Each authenticated screen owns an `OptimisticFlags` table
//! scoped to a child of the session token; dropping the screen cancels it.

pub mod auth;
pub mod detail;
pub mod feed;
pub mod profile;
pub mod saved;

pub use auth::{FormField, LoginForm, SignupForm, SubmitOutcome};
pub use detail::{DetailMode, DetailScreen};
pub use feed::FeedScreen;
pub use profile::ProfileScreen;
pub use saved::SavedScreen;

use crate::context::{AppContext, NoticeLevel};
use shortcut_core::domain::InteractionKind;
use shortcut_core::error::MutationError;
use shortcut_core::optimistic::{OptimisticFlags, Settlement};
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

/// Where a screen's remote data stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    /// The fetch failed; the screen shows an empty list with this message.
    Failed(String),
}

/// Flips the flag immediately and returns the future that runs the remote call
/// and settles it, surfacing a revert to the user. The future owns its inputs so
/// callers may spawn it and unmount the screen while the call is in flight.
pub(crate) fn toggle_interaction(
    ctx: Arc<AppContext>,
    flags: Arc<OptimisticFlags>,
    uid: String,
    article_id: &str,
    kind: InteractionKind,
) -> impl Future<Output = Settlement> + Send + 'static {
    let pending = flags.begin(article_id, kind);
    let service = ctx.interactions.clone();

    async move {
        let succeeded = service
            .mutate_interaction(&uid, &pending.article_id, kind, pending.new_value)
            .await;
        let article_id = pending.article_id.clone();
        let settlement = flags.settle(pending, succeeded);

        if let Settlement::Reverted(_) = settlement {
            let err = MutationError { article_id, kind };
            warn!("{err}; flag reverted.");
            ctx.notify(
                NoticeLevel::Error,
                "Error",
                format!("Could not update {kind} status. Please try again."),
            );
        }
        settlement
    }
}
