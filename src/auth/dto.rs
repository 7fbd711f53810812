use serde::{Deserialize, Serialize};

/// Request body for user registration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub daily_calorie_goal: u32,
}

/// Request body for login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Partial profile update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onboarding_completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_calorie_goal: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// User as the server reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub daily_calorie_goal: u32,
    #[serde(default)]
    pub onboarding_completed: bool,
}

/// User plus the freshly issued token.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    #[serde(flatten)]
    pub user: User,
    pub token: String,
}

/// Response to login and register.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub message: String,
    pub user: AuthUser,
}

/// Response to `GET /auth/me`.
#[derive(Debug, Deserialize)]
pub struct MeResponse {
    #[serde(default)]
    pub message: String,
    pub user: User,
}
