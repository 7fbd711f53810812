use crate::auth::dto::User;
use crate::auth::session::SessionState;
use crate::cache::QueryKey;
use crate::flows::Route;
use crate::state::AppState;

/// Where to send the user for a given session state and loaded profile.
///
/// A token without a loadable profile is not enough to enter the app.
pub fn route(state: SessionState, user: Option<&User>) -> Route {
    match (state, user) {
        (SessionState::Loading, _) => Route::Splash,
        (SessionState::SignedIn, Some(u)) if u.onboarding_completed => Route::Home,
        (SessionState::SignedIn, Some(_)) => Route::Onboarding,
        _ => Route::Login,
    }
}

/// Runs the startup sequence and picks the first screen.
pub async fn resolve(app: &AppState) -> Route {
    let state = app.bootstrap().await;
    let user = app.cache.get::<User>(&QueryKey::CurrentUser);
    route(state, user.as_ref())
}
