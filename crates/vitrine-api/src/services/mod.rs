//! Service modules for vitrine-api.

pub mod session_store;
pub mod tokens;

pub use session_store::{SessionRecord, SessionStore};
