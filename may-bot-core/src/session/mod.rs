//! In-memory conversation history
//!
//! Every chat gets its own ordered message sequence. History lives only as
//! long as the process does.

pub mod message;
pub mod store;

pub use message::{Message, Role, SessionKey};
pub use store::{ConversationStore, SessionStore};
