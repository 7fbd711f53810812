use reqwest::Method;
use tracing::instrument;

use crate::error::ApiResult;
use crate::http::{ApiClient, Fallback};
use crate::reports::dto::{DailyReport, MonthlyReport, WeeklyReport};

#[instrument(skip(api))]
pub async fn daily(api: &ApiClient, date: &str) -> ApiResult<DailyReport> {
    let req = api
        .authed(Method::GET, "/reports/daily")
        .await?
        .query(&[("date", date)]);
    api.send_json(req, true, Fallback::Text("Failed to get daily report"))
        .await
}

#[instrument(skip(api))]
pub async fn weekly(api: &ApiClient) -> ApiResult<WeeklyReport> {
    let req = api.authed(Method::GET, "/reports/weekly").await?;
    api.send_json(req, true, Fallback::Text("Failed to get weekly report"))
        .await
}

#[instrument(skip(api))]
pub async fn monthly(api: &ApiClient, year: i32, month: u8) -> ApiResult<MonthlyReport> {
    let req = api
        .authed(Method::GET, "/reports/monthly")
        .await?
        .query(&[("year", year.to_string()), ("month", month.to_string())]);
    api.send_json(req, true, Fallback::Text("Failed to get monthly report"))
        .await
}
