use std::time::Duration;

use reqwest::Method;
use tracing::{info, instrument};

use crate::error::ApiResult;
use crate::http::{ApiClient, Fallback};
use crate::images::services::{image_form, read_image, ImageSource};
use crate::meals::dto::{DiscardRequest, FoodAnalysis, FoodEntry};

/// Query parameters for an entries range. A single day is sent as `date`.
pub fn entries_params(start: &str, end: &str) -> Vec<(&'static str, String)> {
    if !start.is_empty() && start == end {
        return vec![("date", start.to_string())];
    }
    let mut params = Vec::with_capacity(2);
    if !start.is_empty() {
        params.push(("startDate", start.to_string()));
    }
    if !end.is_empty() {
        params.push(("endDate", end.to_string()));
    }
    params
}

#[instrument(skip(api))]
pub async fn entries(api: &ApiClient, start: &str, end: &str) -> ApiResult<Vec<FoodEntry>> {
    let req = api
        .authed(Method::GET, "/food/entries")
        .await?
        .query(&entries_params(start, end));
    api.send_json(req, true, Fallback::default()).await
}

/// Uploads the photo for analysis. Bounded by `timeout` regardless of the
/// client-wide default.
#[instrument(skip(api, source), fields(uri = %source.uri))]
pub async fn analyze(
    api: &ApiClient,
    source: &ImageSource,
    timeout: Duration,
) -> ApiResult<FoodAnalysis> {
    let body = read_image(source).await?;
    let meta = source.upload_meta();
    let form = image_form(body, &meta)?;
    let req = api
        .authed(Method::POST, "/food/analyze")
        .await?
        .multipart(form)
        .timeout(timeout);
    let draft: FoodAnalysis = api.send_json(req, true, Fallback::Status).await?;
    info!(food = %draft.food_name, storage_key = %draft.storage_key, "analysis ready");
    Ok(draft)
}

#[instrument(skip(api, draft), fields(storage_key = %draft.storage_key))]
pub async fn save(api: &ApiClient, draft: &FoodAnalysis) -> ApiResult<()> {
    let req = api.authed(Method::POST, "/food/save").await?.json(draft);
    api.send_unit(req, true, Fallback::default()).await
}

#[instrument(skip(api))]
pub async fn discard(api: &ApiClient, storage_key: &str) -> ApiResult<()> {
    let req = api
        .authed(Method::POST, "/food/discard")
        .await?
        .json(&DiscardRequest { storage_key });
    api.send_unit(req, true, Fallback::default()).await
}
