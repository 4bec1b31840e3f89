//! Client-side navigation.
//!
//! Every navigation first passes the `NavigationGuard`, then resolves against
//! the route table. Redirect-only routes (`/`) start a new, again guarded,
//! navigation to their target.

pub mod guard;
pub mod route;

use thiserror::Error;
use tracing::debug;

use crate::auth::Session;

pub use guard::{Decision, NavigationGuard, TargetKind, LOGIN_PATH, PUBLIC_SHARE_PREFIX};
pub use route::{normalize, Route, HOME_PATH};

/// Maximum number of redirects followed for one navigation
const MAX_REDIRECTS: usize = 8;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RouterError {
    #[error("Too many redirects navigating to {0}")]
    RedirectLoop(String),
}

/// Outcome of a successful navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    /// Path as the caller asked for it
    pub requested: String,
    /// Path actually landed on
    pub path: String,
    pub route: Route,
    /// True if the guard or a route redirect changed the destination
    pub redirected: bool,
}

#[derive(Debug, Default)]
pub struct Router {
    guard: NavigationGuard,
    current: Option<Route>,
}

impl Router {
    pub fn new(guard: NavigationGuard) -> Self {
        Self {
            guard,
            current: None,
        }
    }

    pub fn guard(&self) -> &NavigationGuard {
        &self.guard
    }

    /// Last route successfully navigated to.
    pub fn current(&self) -> Option<&Route> {
        self.current.as_ref()
    }

    pub fn navigate(&mut self, target: &str, session: &Session) -> Result<Navigation, RouterError> {
        let mut path = normalize(target);
        let mut redirected = false;

        for _ in 0..=MAX_REDIRECTS {
            if let Decision::RedirectTo(login) = self.guard.authorize(&path, session) {
                path = login;
                redirected = true;
                continue;
            }

            let route = Route::resolve(&path);
            if let Some(next) = route.redirect() {
                debug!(from = %path, to = next, "Following route redirect");
                path = next.to_string();
                redirected = true;
                continue;
            }

            debug!(requested = target, %path, redirected, "Navigation complete");
            self.current = Some(route.clone());
            return Ok(Navigation {
                requested: target.to_string(),
                path,
                route,
                redirected,
            });
        }

        Err(RouterError::RedirectLoop(target.to_string()))
    }
}
