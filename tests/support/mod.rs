#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Multipart, Query, Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use mealmind_client::config::AppConfig;
use mealmind_client::storage::{MemoryTokenStore, TokenStore};
use mealmind_client::AppState;

/// What the fake server saw in the last analyze upload.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub size: usize,
}

#[derive(Debug, Clone)]
struct StoredUser {
    id: String,
    name: String,
    email: String,
    password: String,
    goal: u64,
    onboarded: bool,
}

impl StoredUser {
    fn json(&self) -> Value {
        json!({
            "_id": self.id,
            "name": self.name,
            "email": self.email,
            "dailyCalorieGoal": self.goal,
            "onboardingCompleted": self.onboarded,
        })
    }
}

#[derive(Default)]
struct Db {
    users: HashMap<String, StoredUser>,
    tokens: HashMap<String, String>,
    entries: Vec<(String, Value)>,
    drafts: HashMap<String, (String, Value)>,
    discarded: Vec<String>,
    last_upload: Option<Upload>,
    analyze_delay: Duration,
    analyze_status: Option<StatusCode>,
    failing: HashMap<String, StatusCode>,
    seq: u64,
}

impl Db {
    fn next(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn issue_token(&mut self, email: &str) -> String {
        let token = format!("tok-{}", self.next());
        self.tokens.insert(token.clone(), email.to_string());
        token
    }

    fn entries_for<'a>(&'a self, email: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.entries
            .iter()
            .filter(move |(owner, _)| owner == email)
            .map(|(_, e)| e)
    }
}

/// In-process stand-in for the MealMind API.
#[derive(Clone, Default)]
pub struct FakeApi {
    db: Arc<Mutex<Db>>,
    hits: Arc<Mutex<HashMap<String, usize>>>,
}

impl FakeApi {
    pub fn add_user(&self, name: &str, email: &str, password: &str, onboarded: bool) {
        let mut db = self.db.lock().unwrap();
        let id = format!("user-{}", db.next());
        db.users.insert(
            email.to_string(),
            StoredUser {
                id,
                name: name.into(),
                email: email.into(),
                password: password.into(),
                goal: 2000,
                onboarded,
            },
        );
    }

    /// Token valid for `email`, as if issued by an earlier login.
    pub fn token_for(&self, email: &str) -> String {
        self.db.lock().unwrap().issue_token(email)
    }

    pub fn revoke_all_tokens(&self) {
        self.db.lock().unwrap().tokens.clear();
    }

    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn set_analyze_delay(&self, delay: Duration) {
        self.db.lock().unwrap().analyze_delay = delay;
    }

    pub fn fail_analyze_with(&self, status: StatusCode) {
        self.db.lock().unwrap().analyze_status = Some(status);
    }

    /// Every later request to `path` answers with `status`.
    pub fn fail_path(&self, path: &str, status: StatusCode) {
        self.db.lock().unwrap().failing.insert(path.to_string(), status);
    }

    pub fn last_upload(&self) -> Option<Upload> {
        self.db.lock().unwrap().last_upload.clone()
    }

    pub fn discarded(&self) -> Vec<String> {
        self.db.lock().unwrap().discarded.clone()
    }

    pub fn pending_drafts(&self) -> usize {
        self.db.lock().unwrap().drafts.len()
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/auth/register", post(register))
            .route("/auth/login", post(login))
            .route("/auth/me", get(me))
            .route("/auth/update-profile", put(update_profile))
            .route("/food/entries", get(entries))
            .route("/food/analyze", post(analyze))
            .route("/food/save", post(save))
            .route("/food/discard", post(discard))
            .route("/reports/daily", get(daily))
            .route("/reports/weekly", get(weekly))
            .route("/reports/monthly", get(monthly))
            .layer(middleware::from_fn_with_state(self.clone(), count))
            .with_state(self.clone())
    }

    fn user_from(&self, headers: &HeaderMap) -> Result<StoredUser, Response> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "No token, authorization denied"))?;
        let db = self.db.lock().unwrap();
        let user = db
            .tokens
            .get(token)
            .and_then(|email| db.users.get(email))
            .cloned();
        user.ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "Token is not valid"))
    }
}

/// Running fake API plus a client wired to it.
pub struct Harness {
    pub api: FakeApi,
    pub base_url: String,
}

impl Harness {
    pub async fn start() -> Self {
        let api = FakeApi::default();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = api.router();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            api,
            base_url: format!("http://{addr}"),
        }
    }

    pub fn config(&self) -> AppConfig {
        AppConfig::for_api(self.base_url.clone(), "/tmp/unused")
    }

    pub fn client(&self) -> AppState {
        self.client_with(self.config(), Arc::new(MemoryTokenStore::new()))
    }

    pub fn client_with(&self, config: AppConfig, store: Arc<dyn TokenStore>) -> AppState {
        AppState::from_parts(config, store).unwrap()
    }

    /// Client already holding a valid token for a fresh onboarded user.
    pub async fn signed_in(&self) -> AppState {
        self.api.add_user("Ada", "ada@example.com", "secret1", true);
        let token = self.api.token_for("ada@example.com");
        let app = self.client_with(
            self.config(),
            Arc::new(MemoryTokenStore::with_token(&token)),
        );
        app.bootstrap().await;
        app
    }
}

pub fn write_image(dir: &std::path::Path, name: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, b"\x89PNG fake image bytes").unwrap();
    format!("file://{}", path.display())
}

fn reject(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

async fn count(State(api): State<FakeApi>, req: Request, next: Next) -> Response {
    *api.hits
        .lock()
        .unwrap()
        .entry(req.uri().path().to_string())
        .or_default() += 1;
    let failing = api.db.lock().unwrap().failing.get(req.uri().path()).copied();
    if let Some(status) = failing {
        return reject(status, "Unavailable");
    }
    next.run(req).await
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap()
}

fn entry_day(entry: &Value) -> String {
    entry["timestamp"].as_str().unwrap_or_default()[..10].to_string()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody {
    name: String,
    email: String,
    password: String,
    daily_calorie_goal: u64,
}

async fn register(State(api): State<FakeApi>, Json(body): Json<RegisterBody>) -> Response {
    let mut db = api.db.lock().unwrap();
    if db.users.contains_key(&body.email) {
        return reject(StatusCode::BAD_REQUEST, "User already exists");
    }
    let id = format!("user-{}", db.next());
    let user = StoredUser {
        id,
        name: body.name,
        email: body.email.clone(),
        password: body.password,
        goal: body.daily_calorie_goal,
        onboarded: false,
    };
    let mut out = user.json();
    db.users.insert(body.email.clone(), user);
    out["token"] = json!(db.issue_token(&body.email));
    (
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully", "user": out })),
    )
        .into_response()
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn login(State(api): State<FakeApi>, Json(body): Json<LoginBody>) -> Response {
    let mut db = api.db.lock().unwrap();
    let Some(user) = db
        .users
        .get(&body.email)
        .filter(|u| u.password == body.password)
        .cloned()
    else {
        return reject(StatusCode::UNAUTHORIZED, "Invalid credentials");
    };
    let mut out = user.json();
    out["token"] = json!(db.issue_token(&user.email));
    Json(json!({ "message": "Login successful", "user": out })).into_response()
}

async fn me(State(api): State<FakeApi>, headers: HeaderMap) -> Result<Json<Value>, Response> {
    let user = api.user_from(&headers)?;
    Ok(Json(json!({ "message": "ok", "user": user.json() })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileBody {
    onboarding_completed: Option<bool>,
    daily_calorie_goal: Option<u64>,
    name: Option<String>,
}

async fn update_profile(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Json(body): Json<ProfileBody>,
) -> Result<Json<Value>, Response> {
    let user = api.user_from(&headers)?;
    let mut db = api.db.lock().unwrap();
    let stored = db
        .users
        .get_mut(&user.email)
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, "User not found"))?;
    if let Some(done) = body.onboarding_completed {
        stored.onboarded = done;
    }
    if let Some(goal) = body.daily_calorie_goal {
        stored.goal = goal;
    }
    if let Some(name) = body.name {
        stored.name = name;
    }
    Ok(Json(stored.json()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntriesQuery {
    date: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

async fn entries(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Query(q): Query<EntriesQuery>,
) -> Result<Json<Value>, Response> {
    let user = api.user_from(&headers)?;
    let db = api.db.lock().unwrap();
    let (start, end) = match q.date {
        Some(d) => (Some(d.clone()), Some(d)),
        None => (q.start_date, q.end_date),
    };
    let list: Vec<Value> = db
        .entries_for(&user.email)
        .filter(|e| {
            let day = entry_day(e);
            start.as_deref().map_or(true, |s| day.as_str() >= s)
                && end.as_deref().map_or(true, |s| day.as_str() <= s)
        })
        .cloned()
        .collect();
    Ok(Json(Value::Array(list)))
}

async fn analyze(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Value>, Response> {
    let user = api.user_from(&headers)?;
    let mut upload = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let size = field.bytes().await.map(|b| b.len()).unwrap_or(0);
        upload = Some(Upload {
            field: name,
            file_name,
            content_type,
            size,
        });
    }

    let (delay, status) = {
        let mut db = api.db.lock().unwrap();
        db.last_upload = upload.clone();
        (db.analyze_delay, db.analyze_status)
    };
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    if let Some(status) = status {
        return Err(status.into_response());
    }
    match upload {
        Some(u) if u.field == "image" => {}
        _ => return Err(reject(StatusCode::BAD_REQUEST, "No image uploaded")),
    }

    let mut db = api.db.lock().unwrap();
    let n = db.next();
    let key = format!("drafts/{n}.jpg");
    let draft = json!({
        "foodName": format!("Chicken Salad {n}"),
        "calories": 420.0,
        "protein": 30.0,
        "carbs": 10.0,
        "fat": 10.0,
        "mealType": "lunch",
        "imageUrl": format!("https://cdn.example.com/{key}"),
        "storageKey": key,
    });
    db.drafts.insert(key, (user.email, draft.clone()));
    Ok(Json(draft))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyBody {
    storage_key: String,
}

async fn save(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, Response> {
    let user = api.user_from(&headers)?;
    let key = body["storageKey"].as_str().unwrap_or_default().to_string();
    let mut db = api.db.lock().unwrap();
    if db.drafts.remove(&key).is_none() {
        return Err(reject(StatusCode::NOT_FOUND, "Draft not found"));
    }
    let id = format!("entry-{}", db.next());
    let entry = json!({
        "_id": id,
        "foodName": body["foodName"],
        "calories": body["calories"],
        "protein": body["protein"],
        "carbs": body["carbs"],
        "fat": body["fat"],
        "mealType": body["mealType"],
        "imageUrl": body["imageUrl"],
        "timestamp": now_rfc3339(),
    });
    db.entries.push((user.email, entry));
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Food entry saved successfully" })),
    )
        .into_response())
}

async fn discard(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Json(body): Json<KeyBody>,
) -> Result<Json<Value>, Response> {
    api.user_from(&headers)?;
    let mut db = api.db.lock().unwrap();
    db.drafts.remove(&body.storage_key);
    db.discarded.push(body.storage_key);
    Ok(Json(json!({ "message": "Image discarded" })))
}

fn sum(entries: &[&Value], field: &str) -> f64 {
    entries.iter().filter_map(|e| e[field].as_f64()).sum()
}

#[derive(Deserialize)]
struct DailyQuery {
    date: String,
}

async fn daily(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Query(q): Query<DailyQuery>,
) -> Result<Json<Value>, Response> {
    let user = api.user_from(&headers)?;
    let db = api.db.lock().unwrap();
    let day: Vec<&Value> = db
        .entries_for(&user.email)
        .filter(|e| entry_day(e) == q.date)
        .collect();
    let consumed = sum(&day, "calories");
    let goal = user.goal as f64;
    Ok(Json(json!({
        "date": q.date,
        "consumed": consumed,
        "goal": goal,
        "remaining": (goal - consumed).max(0.0),
        "percentComplete": consumed / goal * 100.0,
        "entriesCount": day.len(),
        "macros": {
            "protein": { "grams": sum(&day, "protein"), "percentage": 0 },
            "carbs": { "grams": sum(&day, "carbs"), "percentage": 0 },
            "fat": { "grams": sum(&day, "fat"), "percentage": 0 },
        },
    })))
}

async fn weekly(State(api): State<FakeApi>, headers: HeaderMap) -> Result<Json<Value>, Response> {
    let user = api.user_from(&headers)?;
    let db = api.db.lock().unwrap();
    let all: Vec<&Value> = db.entries_for(&user.email).collect();
    let today = OffsetDateTime::now_utc().date();
    let week: Vec<Value> = (0..7)
        .rev()
        .map(|back| {
            let d = today - time::Duration::days(back);
            let date = mealmind_client::dates::format_day(d);
            let calories: f64 = all
                .iter()
                .filter(|e| entry_day(e) == date)
                .filter_map(|e| e["calories"].as_f64())
                .sum();
            let day_name = d.weekday().to_string()[..3].to_string();
            json!({ "date": date, "dayName": day_name, "calories": calories })
        })
        .collect();
    let total = sum(&all, "calories");
    Ok(Json(json!({
        "totalEntries": all.len(),
        "avgCalories": total / 7.0,
        "goal": user.goal,
        "week": week,
    })))
}

#[derive(Deserialize)]
struct MonthlyQuery {
    year: i32,
    month: u8,
}

async fn monthly(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Query(q): Query<MonthlyQuery>,
) -> Result<Json<Value>, Response> {
    let user = api.user_from(&headers)?;
    let db = api.db.lock().unwrap();
    let prefix = format!("{:04}-{:02}", q.year, q.month);
    let month: Vec<&Value> = db
        .entries_for(&user.email)
        .filter(|e| entry_day(e).starts_with(&prefix))
        .collect();
    let total = sum(&month, "calories");
    Ok(Json(json!({
        "totalEntries": month.len(),
        "totalCalories": total,
        "avgCalories": if month.is_empty() { 0.0 } else { total / month.len() as f64 },
        "daysTracked": if month.is_empty() { 0 } else { 1 },
        "highestDay": total,
    })))
}
