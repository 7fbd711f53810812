use std::fmt;
use std::time::Duration;

use crate::auth::dto::User;
use crate::config::StaleConfig;
use crate::meals::dto::FoodEntry;
use crate::reports::dto::{DailyReport, MonthlyReport, WeeklyReport};

/// Resource family a key belongs to; the unit of invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    CurrentUser,
    FoodEntries,
    DailyReport,
    WeeklyReport,
    MonthlyReport,
}

impl Resource {
    pub fn stale_after(self, stale: &StaleConfig) -> Duration {
        let secs = match self {
            Resource::CurrentUser => stale.user_secs,
            Resource::FoodEntries => stale.entries_secs,
            Resource::DailyReport => stale.daily_secs,
            Resource::WeeklyReport => stale.weekly_secs,
            Resource::MonthlyReport => stale.monthly_secs,
        };
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    CurrentUser,
    FoodEntries { start: String, end: String },
    DailyReport { date: String },
    WeeklyReport,
    MonthlyReport { year: i32, month: u8 },
}

impl QueryKey {
    pub fn food_entries(start: &str, end: &str) -> Self {
        QueryKey::FoodEntries {
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    pub fn daily(date: &str) -> Self {
        QueryKey::DailyReport {
            date: date.to_string(),
        }
    }

    pub fn resource(&self) -> Resource {
        match self {
            QueryKey::CurrentUser => Resource::CurrentUser,
            QueryKey::FoodEntries { .. } => Resource::FoodEntries,
            QueryKey::DailyReport { .. } => Resource::DailyReport,
            QueryKey::WeeklyReport => Resource::WeeklyReport,
            QueryKey::MonthlyReport { .. } => Resource::MonthlyReport,
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::CurrentUser => write!(f, "currentUser"),
            QueryKey::FoodEntries { start, end } => write!(f, "foodEntries[{start}..{end}]"),
            QueryKey::DailyReport { date } => write!(f, "dailyReport[{date}]"),
            QueryKey::WeeklyReport => write!(f, "weeklyReport"),
            QueryKey::MonthlyReport { year, month } => write!(f, "monthlyReport[{year}-{month:02}]"),
        }
    }
}

/// Every value the cache can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryData {
    User(User),
    FoodEntries(Vec<FoodEntry>),
    Daily(DailyReport),
    Weekly(WeeklyReport),
    Monthly(MonthlyReport),
}

/// Typed view over one `QueryData` variant.
pub trait Cached: Clone + Send + Sync + 'static {
    fn into_data(self) -> QueryData;
    fn from_data(data: &QueryData) -> Option<Self>;
}

macro_rules! cached {
    ($ty:ty, $variant:ident) => {
        impl Cached for $ty {
            fn into_data(self) -> QueryData {
                QueryData::$variant(self)
            }

            fn from_data(data: &QueryData) -> Option<Self> {
                match data {
                    QueryData::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

cached!(User, User);
cached!(Vec<FoodEntry>, FoodEntries);
cached!(DailyReport, Daily);
cached!(WeeklyReport, Weekly);
cached!(MonthlyReport, Monthly);
