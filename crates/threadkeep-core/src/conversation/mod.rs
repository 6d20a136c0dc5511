//! Conversation memory: the session-keyed transcript store and the
//! per-session locks the chat service serializes on.

pub mod locks;
pub mod store;

pub use locks::{SessionGuard, SessionLocks};
pub use store::ConversationStore;
