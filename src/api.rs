use anyhow::Result;
use reqwest::Method;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;

use crate::config::ClientConfig;
use crate::http_client::http_client;
use crate::model::{
    AuthResponse, CreatedGroup, Fixture, Group, LeaderboardRow, MeResponse, PriorTip,
    Registration, Round, Team, TipSubmission, User,
};

pub const GENERIC_FAILURE: &str = "Request failed";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Bad credentials or a rejected token.
    #[error("{0}")]
    Unauthorized(String),
    /// Caught locally before any request was made.
    #[error("{0}")]
    Validation(String),
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// The server's `error` field, or the generic message.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.as_str())
                .map(|s| s.trim().to_string())
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| GENERIC_FAILURE.to_string())
}

pub fn classify_failure(status: u16, body: &str) -> ApiError {
    let message = error_message(body);
    if status == 401 {
        ApiError::Unauthorized(message)
    } else {
        ApiError::Server { status, message }
    }
}

/// Every endpoint the client consumes. Implemented over HTTP by [`HttpApi`].
pub trait TippingApi {
    fn set_token(&mut self, token: Option<String>);
    fn token(&self) -> Option<&str>;

    fn login(&self, email: &str, password: &str) -> ApiResult<AuthResponse>;
    fn register(&self, form: &Registration) -> ApiResult<AuthResponse>;
    fn me(&self) -> ApiResult<User>;
    fn teams(&self) -> ApiResult<Vec<Team>>;
    fn rounds(&self) -> ApiResult<Vec<Round>>;
    fn fixtures(&self, round_id: u32) -> ApiResult<Vec<Fixture>>;
    fn round_tips(&self, round_id: u32) -> ApiResult<Vec<PriorTip>>;
    fn submit_tips(&self, tips: &[TipSubmission]) -> ApiResult<()>;
    fn leaderboard(&self) -> ApiResult<Vec<LeaderboardRow>>;
    fn groups(&self) -> ApiResult<Vec<Group>>;
    fn create_group(&self, name: &str) -> ApiResult<CreatedGroup>;
    fn join_group(&self, code: &str) -> ApiResult<()>;
    fn group_leaderboard(&self, group_id: u32) -> ApiResult<Vec<LeaderboardRow>>;
}

#[derive(Debug, Clone)]
pub struct HttpApi {
    base_url: String,
    token: Option<String>,
    client: &'static Client,
}

impl HttpApi {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: None,
            client: http_client(config.http_timeout)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// One request, no retries. Non-2xx responses become errors.
    pub fn call(&self, method: Method, path: &str, body: Option<&Value>) -> ApiResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%method, %path, "api request");

        let mut req = self
            .client
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");
        if let Some(token) = self.token.as_deref() {
            req = req.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = body {
            req = req.body(body.to_string());
        }

        let resp = req.send().map_err(|err| {
            tracing::warn!(%method, %path, error = %err, "api transport failure");
            ApiError::Network(err.to_string())
        })?;
        let status = resp.status();
        let text = resp
            .text()
            .map_err(|err| ApiError::Network(format!("failed reading body: {err}")))?;

        if !status.is_success() {
            let err = classify_failure(status.as_u16(), &text);
            tracing::warn!(%method, %path, status = status.as_u16(), error = %err, "api call failed");
            return Err(err);
        }

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(trimmed).map_err(|err| ApiError::Decode(err.to_string()))
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let value = self.call(Method::GET, path, None)?;
        decode(value)
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> ApiResult<T> {
        let body = serde_json::to_value(body).map_err(|err| ApiError::Decode(err.to_string()))?;
        let value = self.call(Method::POST, path, Some(&body))?;
        decode(value)
    }

    fn post_ack<B: Serialize>(&self, path: &str, body: &B) -> ApiResult<()> {
        let body = serde_json::to_value(body).map_err(|err| ApiError::Decode(err.to_string()))?;
        self.call(Method::POST, path, Some(&body)).map(|_| ())
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> ApiResult<T> {
    serde_json::from_value(value).map_err(|err| ApiError::Decode(err.to_string()))
}

impl TippingApi for HttpApi {
    fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn login(&self, email: &str, password: &str) -> ApiResult<AuthResponse> {
        self.post("/api/login", &json!({ "email": email, "password": password }))
    }

    fn register(&self, form: &Registration) -> ApiResult<AuthResponse> {
        self.post("/api/register", form)
    }

    fn me(&self) -> ApiResult<User> {
        self.get::<MeResponse>("/api/me").map(|r| r.user)
    }

    fn teams(&self) -> ApiResult<Vec<Team>> {
        self.get("/api/teams")
    }

    fn rounds(&self) -> ApiResult<Vec<Round>> {
        self.get("/api/rounds")
    }

    fn fixtures(&self, round_id: u32) -> ApiResult<Vec<Fixture>> {
        self.get(&format!("/api/fixtures/round/{round_id}"))
    }

    fn round_tips(&self, round_id: u32) -> ApiResult<Vec<PriorTip>> {
        self.get(&format!("/api/tips/round/{round_id}"))
    }

    fn submit_tips(&self, tips: &[TipSubmission]) -> ApiResult<()> {
        self.post_ack("/api/tips", &json!({ "tips": tips }))
    }

    fn leaderboard(&self) -> ApiResult<Vec<LeaderboardRow>> {
        self.get("/api/leaderboard")
    }

    fn groups(&self) -> ApiResult<Vec<Group>> {
        self.get("/api/groups")
    }

    fn create_group(&self, name: &str) -> ApiResult<CreatedGroup> {
        self.post("/api/groups/create", &json!({ "name": name }))
    }

    fn join_group(&self, code: &str) -> ApiResult<()> {
        self.post_ack("/api/groups/join", &json!({ "code": code }))
    }

    fn group_leaderboard(&self, group_id: u32) -> ApiResult<Vec<LeaderboardRow>> {
        self.get(&format!("/api/groups/{group_id}/leaderboard"))
    }
}
