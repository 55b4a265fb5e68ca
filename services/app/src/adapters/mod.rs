pub mod firebase_auth;
pub mod firestore;
pub mod memory;
pub mod session_events;

pub use firebase_auth::FirebaseAuthAdapter;
pub use firestore::FirestoreAdapter;
pub use memory::MemoryBackend;
pub use session_events::SessionBroadcaster;
