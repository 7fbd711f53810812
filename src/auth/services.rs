use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Method;
use tracing::{error, info, instrument, warn};

use crate::auth::dto::{
    AuthResponse, LoginRequest, MeResponse, ProfileUpdate, RegisterRequest, User,
};
use crate::error::{ApiError, ApiResult};
use crate::http::{ApiClient, Fallback};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn validate_login(req: &LoginRequest) -> ApiResult<()> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::validation("Please enter your email and password"));
    }
    Ok(())
}

pub fn validate_register(req: &RegisterRequest) -> ApiResult<()> {
    if req.name.trim().is_empty() || req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::validation(
            "Please enter your name, email and password",
        ));
    }
    if !is_valid_email(req.email.trim()) {
        return Err(ApiError::validation("Invalid email"));
    }
    if req.daily_calorie_goal == 0 {
        return Err(ApiError::validation(
            "Daily calorie goal must be greater than zero",
        ));
    }
    Ok(())
}

/// Persists the issued token; a failed write fails the whole call.
async fn persist(api: &ApiClient, resp: &AuthResponse) -> ApiResult<()> {
    api.session()
        .set_token(&resp.user.token)
        .await
        .map_err(|e| {
            error!(error = %e, "persisting session token failed");
            ApiError::Unknown
        })
}

#[instrument(skip(api, req), fields(email = %req.email))]
pub async fn register(api: &ApiClient, req: &RegisterRequest) -> ApiResult<AuthResponse> {
    validate_register(req)?;
    let resp: AuthResponse = api
        .send_json(
            api.request(Method::POST, "/auth/register").json(req),
            false,
            Fallback::default(),
        )
        .await?;
    persist(api, &resp).await?;
    info!(user_id = %resp.user.user.id, "user registered");
    Ok(resp)
}

/// Token is written only after the server accepted the credentials, so a
/// failed attempt never disturbs an existing session.
#[instrument(skip(api, req), fields(email = %req.email))]
pub async fn login(api: &ApiClient, req: &LoginRequest) -> ApiResult<AuthResponse> {
    validate_login(req)?;
    let resp: AuthResponse = match api
        .send_json(
            api.request(Method::POST, "/auth/login").json(req),
            false,
            Fallback::default(),
        )
        .await
    {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "login rejected");
            return Err(e);
        }
    };
    persist(api, &resp).await?;
    info!(user_id = %resp.user.user.id, "user logged in");
    Ok(resp)
}

#[instrument(skip(api))]
pub async fn me(api: &ApiClient) -> ApiResult<User> {
    let req = api.authed(Method::GET, "/auth/me").await?;
    let resp: MeResponse = api.send_json(req, true, Fallback::default()).await?;
    Ok(resp.user)
}

#[instrument(skip(api))]
pub async fn update_profile(api: &ApiClient, update: &ProfileUpdate) -> ApiResult<User> {
    if update.daily_calorie_goal == Some(0) {
        return Err(ApiError::validation(
            "Daily calorie goal must be greater than zero",
        ));
    }
    let req = api
        .authed(Method::PUT, "/auth/update-profile")
        .await?
        .json(update);
    api.send_json(req, true, Fallback::default()).await
}
