//! HTTP transport of the mini-app API.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use super::RequestSpacer;
use super::types::{LoginRequest, LoginResponse, RefreshRequest, TokenPair};
use crate::action::Outcome;
use crate::config::{PacingConfig, SessionIdentity};

/// Base URL of the game service.
pub const GAME_API: &str = "https://game-domain.blum.codes/api/v1/";

/// Base URL of the user service.
pub const USER_API: &str = "https://user-domain.blum.codes/api/v1/";

/// Origin the mini-app requests are sent from.
const ORIGIN: &str = "https://telegram.blum.codes";

/// Errors of a single API request.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP {status}")]
    Status {
        status: u16,
        retry_after: Option<Duration>,
    },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Invalid game id: {0}")]
    InvalidGameId(String),
}

impl ApiError {
    /// Whether the access token was rejected.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401, .. })
    }

    /// HTTP status of the response, if one arrived.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Maps the error onto the action outcome taxonomy.
    ///
    /// Rate limits with a known retry time become `Unavailable`; anything
    /// that may succeed later is transient; rejected requests are permanent.
    #[must_use]
    pub fn classify(&self, now: DateTime<Utc>) -> Outcome {
        match self {
            Self::Status {
                status: 429,
                retry_after: Some(after),
            } => Outcome::Unavailable {
                retry_at: now + TimeDelta::from_std(*after).unwrap_or(TimeDelta::MAX),
            },
            Self::Status { status, .. } => match *status {
                401 => Outcome::transient("HTTP 401, token will be refreshed"),
                408 | 429 | 500..=599 => Outcome::transient(self.to_string()),
                _ => Outcome::permanent(self.to_string()),
            },
            Self::Client(_) => Outcome::permanent(self.to_string()),
            Self::Transport(_) | Self::Timeout | Self::Decode(_) | Self::InvalidGameId(_) => {
                Outcome::transient(self.to_string())
            }
        }
    }
}

/// Service a path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Game,
    User,
}

/// Base URLs of both services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub game: String,
    pub user: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            game: GAME_API.to_owned(),
            user: USER_API.to_owned(),
        }
    }
}

impl Endpoints {
    /// Full URL of `path` on `service`.
    #[must_use]
    pub fn url(&self, service: Service, path: &str) -> String {
        let base = match service {
            Service::Game => &self.game,
            Service::User => &self.user,
        };
        format!("{base}{path}")
    }
}

/// Authenticated HTTP session with the mini-app API.
pub struct BlumApi {
    http: reqwest::Client,
    endpoints: Endpoints,
    tokens: Option<TokenPair>,
    timeout: Duration,
    spacer: RequestSpacer,
}

impl BlumApi {
    /// Builds the HTTP client for `identity`: its proxy, its user agent,
    /// mini-app headers and the request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the proxy or a header is invalid.
    pub fn new(
        identity: &SessionIdentity,
        endpoints: Endpoints,
        pacing: &PacingConfig,
    ) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(header::ORIGIN, HeaderValue::from_static(ORIGIN));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert("priority", HeaderValue::from_static("u=1, i"));

        let mut builder = reqwest::Client::builder()
            .user_agent(identity.user_agent_or_default())
            .default_headers(headers)
            .timeout(pacing.request_timeout());

        if let Some(proxy) = &identity.proxy {
            let mut http_proxy =
                reqwest::Proxy::all(proxy.url()).map_err(|e| ApiError::Client(e.to_string()))?;
            if let Some(username) = &proxy.username {
                http_proxy = http_proxy.basic_auth(username, proxy.password.as_deref().unwrap_or(""));
            }
            builder = builder.proxy(http_proxy);
        }

        let http = builder.build().map_err(|e| ApiError::Client(e.to_string()))?;

        Ok(Self {
            http,
            endpoints,
            tokens: None,
            timeout: pacing.request_timeout(),
            spacer: RequestSpacer::new(pacing.request_spacing()),
        })
    }

    /// Exchanges Telegram web-app data for API tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    pub async fn login(&mut self, query: &str) -> Result<(), ApiError> {
        let url = self
            .endpoints
            .url(Service::User, "auth/provider/PROVIDER_TELEGRAM_MINI_APP");
        let response: LoginResponse = self
            .fetch(self.http.post(url).json(&LoginRequest { query }))
            .await?;
        self.tokens = Some(response.token);
        debug!("Logged in to the mini-app");
        Ok(())
    }

    /// Obtains a new access token with the refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        let Some(refresh) = self.tokens.as_ref().map(|t| t.refresh.clone()) else {
            return Err(ApiError::Status {
                status: 401,
                retry_after: None,
            });
        };

        let url = self.endpoints.url(Service::User, "auth/refresh");
        let tokens: TokenPair = self
            .fetch(self.http.post(url).json(&RefreshRequest { refresh: &refresh }))
            .await?;
        self.tokens = Some(tokens);
        debug!("Access token refreshed");
        Ok(())
    }

    /// Starts an authorized request to `path` on `service`.
    #[must_use]
    pub fn request(&self, method: Method, service: Service, path: &str) -> RequestBuilder {
        let request = self.http.request(method, self.endpoints.url(service, path));
        match &self.tokens {
            Some(tokens) => request.bearer_auth(&tokens.access),
            None => request,
        }
    }

    /// Sends `request` and decodes the JSON response.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, timeout, a non-success status
    /// or an undecodable body.
    pub async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let bytes = self.send(request).await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Sends `request`, ignoring the response body.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, timeout or a non-success status.
    pub async fn ack(&self, request: RequestBuilder) -> Result<(), ApiError> {
        self.send(request).await.map(|_| ())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Vec<u8>, ApiError> {
        self.spacer.acquire().await;

        let exchange = async {
            let response = request.send().await.map_err(transport_error)?;
            let status = response.status();
            if !status.is_success() {
                return Err(ApiError::Status {
                    status: status.as_u16(),
                    retry_after: retry_after(&response, status),
                });
            }
            let bytes = response.bytes().await.map_err(transport_error)?;
            Ok(bytes.to_vec())
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ApiError::Timeout)?
    }
}

impl std::fmt::Debug for BlumApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlumApi")
            .field("endpoints", &self.endpoints)
            .field("logged_in", &self.tokens.is_some())
            .finish_non_exhaustive()
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else if err.is_decode() {
        ApiError::Decode(err.to_string())
    } else {
        ApiError::Transport(err.to_string())
    }
}

/// `Retry-After` in seconds on a 429.
fn retry_after(response: &reqwest::Response, status: StatusCode) -> Option<Duration> {
    if status != StatusCode::TOO_MANY_REQUESTS {
        return None;
    }
    response
        .headers()
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
        .map(Duration::from_secs)
}
