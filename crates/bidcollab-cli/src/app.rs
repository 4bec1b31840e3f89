//! Application state for the bidcollab CLI.
//!
//! `App` owns the configuration, the session store, the router and the API
//! client, and wires backend results into session state: a successful login
//! stores the session, a 401 from the backend clears it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use bidcollab_core::storage::{self, DurableStorage, StorageBackend};
use bidcollab_core::{
    ApiClient, ApiError, AuthResponse, Config, Navigation, Router, Session, SessionStore,
};

// ============================================================================
// Constants
// ============================================================================

/// Maximum length for username input.
const MAX_USERNAME_LENGTH: usize = 64;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

pub struct App {
    config: Config,
    /// Where `config` is saved; `None` keeps it in memory only
    config_path: Option<PathBuf>,
    store: SessionStore<Box<dyn DurableStorage>>,
    router: Router,
    api: ApiClient,
}

impl App {
    /// Create the application from the on-disk configuration.
    pub fn new(ephemeral: bool, api_url: Option<String>) -> Result<Self> {
        let mut config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };
        config.apply_env_overrides();
        if let Some(url) = api_url {
            config.api_base_url = Some(url);
        }

        let backend = if ephemeral {
            StorageBackend::Memory
        } else {
            config.storage
        };
        debug!(%backend, api = config.api_base_url(), "Config loaded");

        let config_path = Config::config_path().ok();
        Self::from_parts(config, config_path, storage::open(backend))
    }

    pub fn from_parts(
        config: Config,
        config_path: Option<PathBuf>,
        storage: Box<dyn DurableStorage>,
    ) -> Result<Self> {
        let store = SessionStore::initialize(storage);
        let mut api = ApiClient::new(config.api_base_url())?;

        if store.is_authenticated() {
            api.set_token(store.session().token().to_string());
            debug!("Token set on API client");
        } else {
            debug!("No session data found");
        }

        Ok(Self {
            config,
            config_path,
            store,
            router: Router::default(),
            api,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &Session {
        self.store.session()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    pub fn storage_is_persistent(&self) -> bool {
        self.store.storage().is_persistent()
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        validate_credentials(username, password)?;

        match self.api.login(username, password).await {
            Ok(auth) => {
                self.apply_auth(auth);
                info!("Login successful");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                Err(anyhow::anyhow!(self.describe_auth_error(&e, "Login")))
            }
        }
    }

    pub async fn register(&mut self, username: &str, password: &str) -> Result<()> {
        let username = username.trim();
        validate_credentials(username, password)?;

        match self.api.register(username, password).await {
            Ok(auth) => {
                self.apply_auth(auth);
                info!("Registration successful");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Registration failed");
                Err(anyhow::anyhow!(self.describe_auth_error(&e, "Registration")))
            }
        }
    }

    fn apply_auth(&mut self, auth: AuthResponse) {
        if !self.store.set_auth(auth.token.clone(), auth.username.clone()) {
            warn!("Session kept in memory only for this run");
        }
        self.api.set_token(auth.token);

        self.config.last_username = Some(auth.username);
        self.save_config();
    }

    /// Turn an authentication failure into a message for the user.
    fn describe_auth_error(&self, err: &anyhow::Error, action: &str) -> String {
        match err.downcast_ref::<ApiError>() {
            Some(ApiError::Unauthorized) | Some(ApiError::AccessDenied(_)) => {
                "Invalid username or password".to_string()
            }
            Some(ApiError::BadRequest(body)) if !body.is_empty() => {
                format!("{} rejected: {}", action, body)
            }
            Some(ApiError::NetworkError(e)) if e.is_timeout() => {
                "Connection timed out. Please try again.".to_string()
            }
            Some(ApiError::NetworkError(_)) => format!(
                "Unable to connect to server at {}. Is the backend running?",
                self.api.base_url()
            ),
            _ => format!("{} failed: {:#}", action, err),
        }
    }

    /// Forget the session and go to the login page.
    pub fn logout(&mut self) -> Result<Navigation> {
        if !self.store.clear() {
            warn!("Stored session could not be removed");
        }
        self.api.clear_token();
        let login = self.router.guard().login_path().to_string();
        self.navigate(&login)
    }

    fn save_config(&self) {
        if let Some(ref path) = self.config_path {
            if let Err(e) = self.config.save_to(path) {
                warn!(error = %e, "Failed to save config");
            }
        }
    }

    // =========================================================================
    // Navigation & requests
    // =========================================================================

    pub fn navigate(&mut self, path: &str) -> Result<Navigation> {
        let navigation = self.router.navigate(path, self.store.session())?;
        Ok(navigation)
    }

    /// Authenticated GET against the backend. A 401 clears the session.
    pub async fn get_json(&mut self, path: &str) -> Result<serde_json::Value> {
        match self.api.get_json(path).await {
            Ok(value) => Ok(value),
            Err(e) => {
                let unauthorized = e
                    .downcast_ref::<ApiError>()
                    .is_some_and(ApiError::is_unauthorized);
                if unauthorized {
                    info!("Backend rejected the session token, clearing session");
                    if !self.store.clear() {
                        warn!("Stored session could not be removed, it may reappear on restart");
                    }
                    self.api.clear_token();
                    return Err(e).context("Session expired or invalid, please log in again");
                }
                Err(e)
            }
        }
    }
}

fn validate_credentials(username: &str, password: &str) -> Result<()> {
    if username.is_empty() || password.is_empty() {
        anyhow::bail!("Username and password required");
    }
    if username.chars().count() > MAX_USERNAME_LENGTH || username.chars().any(char::is_control) {
        anyhow::bail!("Invalid username");
    }
    if password.chars().count() > MAX_PASSWORD_LENGTH {
        anyhow::bail!("Password too long (max {} characters)", MAX_PASSWORD_LENGTH);
    }
    Ok(())
}
