//! Authentication state.
//!
//! This module provides:
//! - `Session`: the (token, username) pair, empty when signed out
//! - `SessionStore`: the single owner of the session, persisting it to a
//!   `DurableStorage` backend
//!
//! The token is never checked here; the backend rejects stale tokens with a
//! 401, and the application answers that by clearing the store.

pub mod session;

pub use session::{Session, SessionStore, TOKEN_KEY, USERNAME_KEY};
