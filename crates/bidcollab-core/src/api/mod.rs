//! REST API client module for the bidcollab backend.
//!
//! The backend issues a JWT on login/registration; every other request
//! carries it as a bearer token. A 401 from any endpoint means the token is
//! no longer accepted and the local session should be cleared.

pub mod client;
pub mod error;

pub use client::{ApiClient, AuthResponse};
pub use error::ApiError;
