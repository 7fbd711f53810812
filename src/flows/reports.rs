use tracing::{instrument, warn};

use crate::dates;
use crate::flows::home::FALLBACK_GOAL;
use crate::reports::dto::{DailyReport, MonthlyReport, WeeklyReport};
use crate::state::{AppState, Fetch};

const MIN_BAR: f64 = 5.0;
const MAX_BAR: f64 = 100.0;

/// One bar of the weekly chart.
#[derive(Debug, Clone, PartialEq)]
pub struct DayBar {
    pub day_name: String,
    pub calories: f64,
    /// Height as a percent of the chart scale.
    pub height: f64,
    pub over_goal: bool,
}

/// Everything the reports screen shows. A report that failed to load is
/// `None` and its message is kept in `errors`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportsOverview {
    pub daily: Option<DailyReport>,
    pub weekly: Option<WeeklyReport>,
    pub monthly: Option<MonthlyReport>,
    pub errors: Vec<String>,
}

impl ReportsOverview {
    pub fn has_data(&self) -> bool {
        self.daily.is_some() && self.weekly.as_ref().is_some_and(|w| w.total_entries > 0)
    }

    fn weekly_goal(&self) -> f64 {
        self.weekly
            .as_ref()
            .map(|w| w.goal)
            .filter(|g| *g != 0.0)
            .unwrap_or(FALLBACK_GOAL)
    }

    /// Chart scale: the largest day or the goal, whichever is higher.
    pub fn chart_max(&self) -> f64 {
        let goal = self.weekly_goal();
        self.weekly
            .iter()
            .flat_map(|w| w.week.iter())
            .map(|d| d.calories)
            .fold(goal, f64::max)
    }

    pub fn bars(&self) -> Vec<DayBar> {
        let Some(weekly) = &self.weekly else {
            return Vec::new();
        };
        let max = self.chart_max();
        let goal = self.weekly_goal();
        weekly
            .week
            .iter()
            .map(|d| DayBar {
                day_name: d.day_name.clone(),
                calories: d.calories,
                height: if d.calories > 0.0 {
                    (d.calories / max * 100.0).clamp(MIN_BAR, MAX_BAR)
                } else {
                    0.0
                },
                over_goal: d.calories > goal,
            })
            .collect()
    }
}

/// Reports for a day plus the rolling week and one calendar month.
#[derive(Debug, Clone)]
pub struct ReportsScreen {
    date: String,
    year: i32,
    month: u8,
}

impl ReportsScreen {
    pub fn current() -> Self {
        let (year, month) = dates::current_year_month();
        Self::new(dates::today(), year, month)
    }

    pub fn new(date: impl Into<String>, year: i32, month: u8) -> Self {
        Self {
            date: date.into(),
            year,
            month,
        }
    }

    #[instrument(skip(self, app), fields(date = %self.date, year = self.year, month = self.month))]
    async fn read(&self, app: &AppState, mode: Fetch) -> ReportsOverview {
        let (daily, weekly, monthly) = tokio::join!(
            app.daily_report(&self.date, mode),
            app.weekly_report(mode),
            app.monthly_report(self.year, self.month, mode),
        );

        let mut errors = Vec::new();
        let mut keep = |label: &str, e: crate::error::ApiError| {
            warn!(report = label, error = %e, "report failed to load");
            errors.push(e.to_string());
        };
        let daily = daily.map_err(|e| keep("daily", e)).ok();
        let weekly = weekly.map_err(|e| keep("weekly", e)).ok();
        let monthly = monthly.map_err(|e| keep("monthly", e)).ok();

        ReportsOverview {
            daily,
            weekly,
            monthly,
            errors,
        }
    }

    pub async fn load(&self, app: &AppState) -> ReportsOverview {
        self.read(app, Fetch::IfStale).await
    }

    pub async fn refresh(&self, app: &AppState) -> ReportsOverview {
        self.read(app, Fetch::Force).await
    }
}
