//! crates/shortcut_core/src/error.rs
//!
//! Errors raised by the interaction facade. Neither is fatal: a failed fetch
//! degrades to an empty list, a failed mutation reverts the optimistic flag.

use crate::domain::InteractionKind;
use crate::ports::PortError;

/// A list fetch (articles or interactions) failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to load articles: {0}")]
    Articles(#[source] PortError),
    #[error("failed to load interactions for {uid}: {source}")]
    Interactions {
        uid: String,
        #[source]
        source: PortError,
    },
}

/// An interaction toggle was not accepted by the backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("could not {kind} article {article_id}")]
pub struct MutationError {
    pub article_id: String,
    pub kind: InteractionKind,
}
