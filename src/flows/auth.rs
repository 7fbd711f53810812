use tracing::{info, instrument};

use crate::auth::dto::{LoginRequest, ProfileUpdate, RegisterRequest};
use crate::auth::services as auth_api;
use crate::cache::{Mutation, MutationKind, QueryKey};
use crate::error::{ApiError, ApiResult};
use crate::flows::{FlowError, Route};
use crate::state::AppState;

pub const DEFAULT_CALORIE_GOAL: u32 = 2000;

/// Login screen. The email survives a failed attempt, the password does not.
#[derive(Debug, Clone)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    error: Option<String>,
    mutation: Mutation,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginForm {
    pub fn new() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            error: None,
            mutation: Mutation::new(MutationKind::Login),
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.mutation.is_pending()
    }

    #[instrument(skip(self, app), fields(email = %self.email))]
    pub async fn submit(&mut self, app: &AppState) -> Result<Route, FlowError> {
        self.error = None;
        let req = LoginRequest {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        };
        match self.mutation.run(&app.cache, auth_api::login(&app.api, &req)).await {
            Ok(_) => {
                // data cached under a previous session must not leak into this one
                app.cache.clear();
                self.password.clear();
                Ok(Route::Home)
            }
            Err(e) => {
                if !matches!(e, ApiError::Validation(_)) {
                    self.password.clear();
                }
                self.error = Some(e.to_string());
                Err(e.into())
            }
        }
    }
}

/// Registration screen.
#[derive(Debug, Clone)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub daily_calorie_goal: u32,
    error: Option<String>,
    mutation: Mutation,
}

impl Default for RegisterForm {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterForm {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            password: String::new(),
            confirm_password: String::new(),
            daily_calorie_goal: DEFAULT_CALORIE_GOAL,
            error: None,
            mutation: Mutation::new(MutationKind::Register),
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.mutation.is_pending()
    }

    fn check(&self) -> ApiResult<RegisterRequest> {
        if self.name.trim().is_empty()
            || self.email.trim().is_empty()
            || self.password.is_empty()
            || self.confirm_password.is_empty()
        {
            return Err(ApiError::validation(
                "Please enter your name, email and password",
            ));
        }
        if self.password != self.confirm_password {
            return Err(ApiError::validation(
                "Password and Confirm Password do not match",
            ));
        }
        Ok(RegisterRequest {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            daily_calorie_goal: self.daily_calorie_goal,
        })
    }

    #[instrument(skip(self, app), fields(email = %self.email))]
    pub async fn submit(&mut self, app: &AppState) -> Result<Route, FlowError> {
        self.error = None;
        let req = match self.check() {
            Ok(req) => req,
            Err(e) => {
                self.error = Some(e.to_string());
                return Err(e.into());
            }
        };
        match self
            .mutation
            .run(&app.cache, auth_api::register(&app.api, &req))
            .await
        {
            Ok(resp) => {
                app.cache.clear();
                app.cache.set(QueryKey::CurrentUser, resp.user.user);
                Ok(Route::Onboarding)
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e.into())
            }
        }
    }
}

/// Final onboarding step.
#[derive(Debug, Clone)]
pub struct OnboardingFlow {
    error: Option<String>,
    mutation: Mutation,
}

impl Default for OnboardingFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl OnboardingFlow {
    pub fn new() -> Self {
        Self {
            error: None,
            mutation: Mutation::new(MutationKind::UpdateProfile),
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub async fn complete(&mut self, app: &AppState) -> Result<Route, FlowError> {
        self.error = None;
        let update = ProfileUpdate {
            onboarding_completed: Some(true),
            ..Default::default()
        };
        match self
            .mutation
            .run(&app.cache, auth_api::update_profile(&app.api, &update))
            .await
        {
            Ok(user) => {
                info!(user_id = %user.id, "onboarding completed");
                Ok(Route::Home)
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e.into())
            }
        }
    }
}
