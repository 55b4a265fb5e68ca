//! services/app/src/session_task.rs
//!
//! The long-running task that forwards identity-provider session changes into
//! the application's event channel.

use crate::app::AppEvent;
use futures::StreamExt;
use shortcut_core::ports::IdentityService;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Spawns the listener. It stops when the token is cancelled, the stream ends,
/// or the receiving side is dropped.
pub fn spawn_session_listener(
    identity: Arc<dyn IdentityService>,
    events: mpsc::UnboundedSender<AppEvent>,
    cancellation_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Session listener started.");
        let mut stream = identity.session_events();
        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    info!("Session listener cancelled.");
                    break;
                }
                next = stream.next() => {
                    let Some(session) = next else {
                        debug!("Session stream ended.");
                        break;
                    };
                    debug!(signed_in = session.is_some(), "Session changed.");
                    if events.send(AppEvent::SessionChanged(session)).is_err() {
                        debug!("App event channel closed.");
                        break;
                    }
                }
            }
        }
    })
}
