pub mod document;
pub mod domain;
pub mod error;
pub mod navigation;
pub mod normalize;
pub mod optimistic;
pub mod ports;
pub mod reading;
pub mod service;
pub mod theme;

pub use domain::{
    Article, InteractionKind, InteractionRecord, ProfileStats, ReadingProgress, SavedArticles,
    Session, UserStats,
};
pub use error::{FetchError, MutationError};
pub use navigation::{AuthScreen, BackOutcome, NavigationError, Navigator, Route, Screen};
pub use optimistic::{OptimisticFlags, PendingToggle, Settlement};
pub use ports::{
    AuthError, DocumentStore, FieldUpdate, IdentityService, PortError, PortResult, RawDocument,
    SessionStream,
};
pub use service::InteractionService;
pub use theme::{ColorScheme, ThemePreference};
