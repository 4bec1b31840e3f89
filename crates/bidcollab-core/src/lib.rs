//! Core library for bidcollab.
//!
//! The session store persists the signed-in identity; the router decides,
//! for every navigation, whether that identity is enough to reach the
//! requested view or whether the user goes to the login page instead.

pub mod api;
pub mod auth;
pub mod config;
pub mod router;
pub mod storage;

pub use api::{ApiClient, ApiError, AuthResponse};
pub use auth::{Session, SessionStore};
pub use config::Config;
pub use router::{Decision, Navigation, NavigationGuard, Route, Router, RouterError};
pub use storage::{DurableStorage, StorageBackend};
