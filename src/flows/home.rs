use tracing::{instrument, warn};

use crate::auth::dto::User;
use crate::cache::QueryKey;
use crate::dates;
use crate::flows::Route;
use crate::meals::dto::FoodEntry;
use crate::reports::dto::DailyReport;
use crate::state::{AppState, Fetch};

pub const FALLBACK_GOAL: f64 = 2000.0;

fn nonzero(v: f64) -> Option<f64> {
    (v != 0.0).then_some(v)
}

/// Figures shown on the home dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct HomeSummary {
    pub goal: f64,
    pub consumed: f64,
    pub remaining: f64,
    pub progress: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub meals: Vec<FoodEntry>,
    /// Messages for the reads that failed; the rest of the summary still holds.
    pub errors: Vec<String>,
}

impl HomeSummary {
    /// Server figures win when present and non-zero; otherwise they are
    /// derived from the goal.
    pub fn compute(
        user: Option<&User>,
        report: Option<&DailyReport>,
        meals: Vec<FoodEntry>,
    ) -> Self {
        let goal = user
            .and_then(|u| nonzero(f64::from(u.daily_calorie_goal)))
            .or_else(|| report.and_then(|r| nonzero(r.goal)))
            .unwrap_or(FALLBACK_GOAL);
        let consumed = report.map(|r| r.consumed).unwrap_or(0.0);
        let remaining = report
            .and_then(|r| nonzero(r.remaining))
            .unwrap_or_else(|| (goal - consumed).max(0.0));
        let progress = report
            .and_then(|r| nonzero(r.percent_complete))
            .unwrap_or(consumed / goal * 100.0);
        let macros = report.and_then(|r| r.macros.as_ref());

        Self {
            goal,
            consumed,
            remaining,
            progress,
            protein: macros.map(|m| m.protein.grams).unwrap_or(0.0),
            carbs: macros.map(|m| m.carbs.grams).unwrap_or(0.0),
            fat: macros.map(|m| m.fat.grams).unwrap_or(0.0),
            meals,
            errors: Vec::new(),
        }
    }
}

/// Home dashboard for one day.
#[derive(Debug, Clone)]
pub struct HomeScreen {
    date: String,
}

impl HomeScreen {
    pub fn today() -> Self {
        Self::for_date(dates::today())
    }

    pub fn for_date(date: impl Into<String>) -> Self {
        Self { date: date.into() }
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    #[instrument(skip(self, app), fields(date = %self.date))]
    async fn read(&self, app: &AppState, mode: Fetch) -> HomeSummary {
        let (report, meals) = tokio::join!(
            app.daily_report(&self.date, mode),
            app.food_entries(&self.date, &self.date, mode),
        );

        let mut errors = Vec::new();
        let mut keep = |part: &str, e: crate::error::ApiError| {
            warn!(part, error = %e, "home data failed to load");
            errors.push(e.to_string());
        };
        let report = report.map_err(|e| keep("daily", e)).ok();
        let meals = meals.map_err(|e| keep("entries", e)).unwrap_or_default();

        let user = app.cache.get::<User>(&QueryKey::CurrentUser);
        HomeSummary {
            errors,
            ..HomeSummary::compute(user.as_ref(), report.as_ref(), meals)
        }
    }

    pub async fn load(&self, app: &AppState) -> HomeSummary {
        self.read(app, Fetch::IfStale).await
    }

    /// The screen regained focus; always hits the server.
    pub async fn on_focus(&self, app: &AppState) -> HomeSummary {
        self.read(app, Fetch::Force).await
    }

    /// Pull-to-refresh.
    pub async fn refresh(&self, app: &AppState) -> HomeSummary {
        self.read(app, Fetch::Force).await
    }

    pub async fn logout(&self, app: &AppState) -> anyhow::Result<Route> {
        app.logout().await?;
        Ok(Route::Login)
    }
}
