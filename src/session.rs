use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, ApiResult, TippingApi};
use crate::config::app_cache_dir;
use crate::model::{AuthResponse, Registration, User};

const SESSION_FILE: &str = "session.json";
const SESSION_VERSION: u32 = 1;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated(User),
}

impl AuthState {
    pub fn user(&self) -> Option<&User> {
        match self {
            AuthState::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CredentialFile {
    version: u32,
    token: Option<String>,
}

/// Durable home of the bearer token. A store without a path keeps nothing.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: Option<PathBuf>,
}

impl CredentialStore {
    pub fn default_location() -> Self {
        Self {
            path: app_cache_dir().map(|dir| dir.join(SESSION_FILE)),
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn ephemeral() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn load(&self) -> Option<String> {
        let path = self.path.as_ref()?;
        let raw = fs::read_to_string(path).ok()?;
        let file = serde_json::from_str::<CredentialFile>(&raw).ok()?;
        if file.version != SESSION_VERSION {
            return None;
        }
        file.token.filter(|t| !t.trim().is_empty())
    }

    pub fn save(&self, token: &str) -> Result<()> {
        self.write(CredentialFile {
            version: SESSION_VERSION,
            token: Some(token.to_string()),
        })
    }

    pub fn clear(&self) -> Result<()> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        if !path.exists() {
            return Ok(());
        }
        fs::remove_file(path).with_context(|| format!("remove {}", path.display()))
    }

    fn write(&self, file: CredentialFile) -> Result<()> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).ok();
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string(&file).context("serialize session")?;
        fs::write(&tmp, json).context("write session")?;
        fs::rename(&tmp, path).context("swap session")?;
        Ok(())
    }
}

pub fn validate_registration(form: &Registration, require_favorite_team: bool) -> ApiResult<()> {
    if form.display_name.trim().is_empty() || form.email.trim().is_empty() {
        return Err(ApiError::Validation(
            "Email, name, and password (6+ chars) required".to_string(),
        ));
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(
            "Email, name, and password (6+ chars) required".to_string(),
        ));
    }
    if require_favorite_team && form.favorite_team_id.is_none() {
        return Err(ApiError::Validation("Please pick your favourite team".to_string()));
    }
    Ok(())
}

/// Credential and identity owned by the provider thread.
#[derive(Debug)]
pub struct Session {
    store: CredentialStore,
    user: Option<User>,
    require_favorite_team: bool,
}

impl Session {
    pub fn new(store: CredentialStore, require_favorite_team: bool) -> Self {
        Self {
            store,
            user: None,
            require_favorite_team,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn login<A: TippingApi>(
        &mut self,
        api: &mut A,
        email: &str,
        password: &str,
    ) -> ApiResult<User> {
        let auth = api.login(email.trim(), password)?;
        Ok(self.establish(api, auth))
    }

    pub fn register<A: TippingApi>(&mut self, api: &mut A, form: &Registration) -> ApiResult<User> {
        validate_registration(form, self.require_favorite_team)?;
        let auth = api.register(form)?;
        Ok(self.establish(api, auth))
    }

    /// Validates a stored credential. Any failure discards it.
    pub fn restore<A: TippingApi>(&mut self, api: &mut A) -> Option<User> {
        let token = self.store.load()?;
        api.set_token(Some(token));
        match api.me() {
            Ok(user) => {
                tracing::info!(user_id = user.id, "session restored");
                self.user = Some(user.clone());
                Some(user)
            }
            Err(err) => {
                tracing::info!(error = %err, "stored credential rejected");
                self.forget(api);
                None
            }
        }
    }

    pub fn logout<A: TippingApi>(&mut self, api: &mut A) {
        self.forget(api);
    }

    fn establish<A: TippingApi>(&mut self, api: &mut A, auth: AuthResponse) -> User {
        if let Err(err) = self.store.save(&auth.token) {
            tracing::warn!(error = %err, "failed to persist credential");
        }
        api.set_token(Some(auth.token));
        self.user = Some(auth.user.clone());
        auth.user
    }

    fn forget<A: TippingApi>(&mut self, api: &mut A) {
        api.set_token(None);
        self.user = None;
        if let Err(err) = self.store.clear() {
            tracing::warn!(error = %err, "failed to clear credential");
        }
    }
}
