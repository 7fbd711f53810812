use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroShare {
    pub grams: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Macros {
    pub protein: MacroShare,
    pub carbs: MacroShare,
    pub fat: MacroShare,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    pub date: String,
    pub consumed: f64,
    pub goal: f64,
    pub remaining: f64,
    pub percent_complete: f64,
    pub entries_count: u32,
    #[serde(default)]
    pub macros: Option<Macros>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyDay {
    pub date: String,
    pub day_name: String,
    pub calories: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReport {
    pub total_entries: u32,
    pub avg_calories: f64,
    pub goal: f64,
    pub week: Vec<WeeklyDay>,
    #[serde(default)]
    pub macros: Option<Macros>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReport {
    pub total_entries: u32,
    pub total_calories: f64,
    pub avg_calories: f64,
    pub days_tracked: u32,
    pub highest_day: f64,
}
