use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::auth::session::SessionManager;
use crate::config::AppConfig;
use crate::error::{ApiError, ApiResult, ErrorBody, UNKNOWN_MESSAGE};

/// What to show when a rejected response carries no `message`.
#[derive(Debug, Clone, Copy)]
pub enum Fallback {
    Text(&'static str),
    /// "Server error: <code> <reason>"
    Status,
}

impl Fallback {
    fn render(self, status: StatusCode) -> String {
        match self {
            Fallback::Text(t) => t.to_string(),
            Fallback::Status => format!(
                "Server error: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            )
            .trim_end()
            .to_string(),
        }
    }
}

impl Default for Fallback {
    fn default() -> Self {
        Fallback::Text(UNKNOWN_MESSAGE)
    }
}

/// HTTP plumbing shared by every request function.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionManager>,
}

impl ApiClient {
    pub fn new(config: &AppConfig, session: Arc<SessionManager>) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                error!(error = %e, "building http client failed");
                ApiError::Unknown
            })?;
        Ok(Self {
            http,
            base_url: config.api_url.clone(),
            session,
        })
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Unauthenticated request builder.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path))
    }

    /// Request builder carrying the bearer credential. Fails without touching
    /// the network when no token can be read; the session is left as is.
    pub async fn authed(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        match self.session.load_token().await {
            Ok(Some(token)) => Ok(self.request(method, path).bearer_auth(token)),
            Ok(None) => {
                warn!(path, "no session token; request not sent");
                Err(ApiError::Unauthorized("Not authenticated".into()))
            }
            Err(e) => {
                error!(path, error = %e, "reading session token failed; request not sent");
                Err(ApiError::Unknown)
            }
        }
    }

    pub async fn send_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        authed: bool,
        fallback: Fallback,
    ) -> ApiResult<T> {
        let resp = self.execute(req, authed, fallback).await?;
        resp.json::<T>().await.map_err(|e| {
            error!(error = %e, "response body did not decode");
            ApiError::from(e)
        })
    }

    pub async fn send_unit(
        &self,
        req: RequestBuilder,
        authed: bool,
        fallback: Fallback,
    ) -> ApiResult<()> {
        self.execute(req, authed, fallback).await.map(|_| ())
    }

    async fn execute(
        &self,
        req: RequestBuilder,
        authed: bool,
        fallback: Fallback,
    ) -> ApiResult<Response> {
        let resp = req.send().await.map_err(|e| {
            let mapped = ApiError::from(e);
            warn!(error = ?mapped, "request failed before a response");
            mapped
        })?;

        let status = resp.status();
        debug!(%status, url = %resp.url(), "response");
        if status.is_success() {
            return Ok(resp);
        }

        let message = resp
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.is_empty());

        if status == StatusCode::UNAUTHORIZED && authed {
            self.session.expire().await;
            return Err(ApiError::Unauthorized(
                message.unwrap_or_else(|| "Not authorized".into()),
            ));
        }

        if status.is_server_error() {
            error!(%status, "server rejected request");
        } else {
            warn!(%status, "server rejected request");
        }
        Err(ApiError::Server {
            status: status.as_u16(),
            message: message.unwrap_or_else(|| fallback.render(status)),
        })
    }
}
