//! services/app/src/adapters/session_events.rs
//!
//! Session change notifications shared by the identity adapters.
//!
//! Backed by a `watch` channel: a new subscriber first sees the current session,
//! then every change. Rapid changes may coalesce into the latest value.

use shortcut_core::domain::Session;
use shortcut_core::ports::SessionStream;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone)]
pub struct SessionBroadcaster {
    tx: Arc<watch::Sender<Option<Session>>>,
}

impl SessionBroadcaster {
    pub fn new(initial: Option<Session>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    pub fn publish(&self, session: Option<Session>) {
        self.tx.send_replace(session);
    }

    pub fn stream(&self) -> SessionStream {
        let mut rx = self.tx.subscribe();
        Box::pin(async_stream::stream! {
            let current = rx.borrow_and_update().clone();
            yield current;
            while rx.changed().await.is_ok() {
                let next = rx.borrow_and_update().clone();
                yield next;
            }
        })
    }
}
