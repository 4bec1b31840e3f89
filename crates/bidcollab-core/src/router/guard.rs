use tracing::debug;

use crate::auth::Session;

/// Route that never requires a session
pub const LOGIN_PATH: &str = "/login";

/// Public exam-sharing links: `/exam-link/<token>`
pub const PUBLIC_SHARE_PREFIX: &str = "/exam-link/";

/// How a requested path is treated by the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Login,
    PublicShare,
    Protected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectTo(String),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Decides whether a navigation may proceed. Holds no session state of its
/// own; the caller lends the current session for each decision.
#[derive(Debug, Clone)]
pub struct NavigationGuard {
    login_path: String,
    public_share_prefix: String,
}

impl Default for NavigationGuard {
    fn default() -> Self {
        Self::new(LOGIN_PATH, PUBLIC_SHARE_PREFIX)
    }
}

impl NavigationGuard {
    pub fn new(login_path: impl Into<String>, public_share_prefix: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
            public_share_prefix: public_share_prefix.into(),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn classify(&self, path: &str) -> TargetKind {
        if path == self.login_path {
            TargetKind::Login
        } else if path.starts_with(&self.public_share_prefix) {
            TargetKind::PublicShare
        } else {
            TargetKind::Protected
        }
    }

    pub fn authorize(&self, path: &str, session: &Session) -> Decision {
        match self.classify(path) {
            TargetKind::Login | TargetKind::PublicShare => Decision::Allow,
            TargetKind::Protected if session.is_authenticated() => Decision::Allow,
            TargetKind::Protected => {
                debug!(path, redirect = %self.login_path, "No session, redirecting to login");
                Decision::RedirectTo(self.login_path.clone())
            }
        }
    }
}
