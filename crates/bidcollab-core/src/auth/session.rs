use tracing::{debug, info, warn};

use crate::storage::DurableStorage;

/// Storage key for the bearer token
pub const TOKEN_KEY: &str = "token";

/// Storage key for the display username
pub const USERNAME_KEY: &str = "username";

/// Number of token characters shown by `token_preview`
const TOKEN_PREVIEW_CHARS: usize = 6;

/// The signed-in identity. An empty token means signed out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: String,
    username: String,
}

impl Session {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }

    /// First few characters of the token, for display
    pub fn token_preview(&self) -> String {
        if self.token.chars().count() <= TOKEN_PREVIEW_CHARS {
            "*".repeat(self.token.chars().count())
        } else {
            let head: String = self.token.chars().take(TOKEN_PREVIEW_CHARS).collect();
            format!("{}…", head)
        }
    }
}

/// Owns the session and keeps durable storage in step with it.
///
/// Storage failures never change the in-memory session. They are logged at
/// warn level and reported through the `bool` returned by `set_auth` and
/// `clear`.
pub struct SessionStore<S> {
    storage: S,
    session: Session,
}

impl<S: DurableStorage> SessionStore<S> {
    /// Load the session persisted in `storage`, if any.
    pub fn initialize(storage: S) -> Self {
        let token = read_key(&storage, TOKEN_KEY);
        let username = read_key(&storage, USERNAME_KEY);

        let session = match (token, username) {
            (Some(token), Some(username)) if !token.is_empty() => Session { token, username },
            (Some(token), None) if !token.is_empty() => {
                warn!("Stored token has no username, ignoring partial session");
                Session::default()
            }
            _ => Session::default(),
        };

        debug!(
            authenticated = session.is_authenticated(),
            persistent = storage.is_persistent(),
            "Session store initialized"
        );

        Self { storage, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Replace the session and persist both keys. The caller guarantees a
    /// non-empty token. Returns whether storage accepted the write.
    pub fn set_auth(&mut self, token: impl Into<String>, username: impl Into<String>) -> bool {
        self.session = Session {
            token: token.into(),
            username: username.into(),
        };

        let result = self
            .storage
            .set(TOKEN_KEY, &self.session.token)
            .and_then(|()| self.storage.set(USERNAME_KEY, &self.session.username));

        match result {
            Ok(()) => {
                info!(username = %self.session.username, "Session stored");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to persist session, it will be lost on restart");
                // A half-written pair would mix two identities after a restart
                let _ = self.storage.remove(TOKEN_KEY);
                let _ = self.storage.remove(USERNAME_KEY);
                false
            }
        }
    }

    /// Reset to the empty session and remove both keys. Safe to repeat.
    /// Returns whether storage accepted the removal.
    pub fn clear(&mut self) -> bool {
        let was_authenticated = self.session.is_authenticated();
        self.session = Session::default();

        // Attempt both removals even if the first one fails
        let token_result = self.storage.remove(TOKEN_KEY);
        let username_result = self.storage.remove(USERNAME_KEY);

        match token_result.and(username_result) {
            Ok(()) => {
                if was_authenticated {
                    info!("Session cleared");
                }
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to remove stored session, it may reappear on restart");
                false
            }
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }
}

/// Missing and unreadable keys both count as "no value".
fn read_key<S: DurableStorage>(storage: &S, key: &str) -> Option<String> {
    match storage.get(key) {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, "Failed to read stored session, treating as signed out");
            None
        }
    }
}
