use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{ArgGroup, Parser, Subcommand};
use tracing::debug;

use mealmind_client::auth::dto::User;
use mealmind_client::dates;
use mealmind_client::flows::add_meal::AddMealFlow;
use mealmind_client::flows::auth::{LoginForm, OnboardingFlow, RegisterForm, DEFAULT_CALORIE_GOAL};
use mealmind_client::flows::home::HomeScreen;
use mealmind_client::flows::reports::ReportsOverview;
use mealmind_client::flows::{startup, Route};
use mealmind_client::images::services::ImageSource;
use mealmind_client::{AppState, Fetch};

#[derive(Parser)]
#[command(name = "mealmind-client", version, about = "Log meals from photos and read nutrition reports")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and store the session token.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account.
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value_t = DEFAULT_CALORIE_GOAL)]
        goal: u32,
    },
    /// Show the signed-in user.
    Me,
    /// Finish onboarding after registering.
    Onboard,
    /// Analyze a meal photo, then keep or drop the draft.
    #[command(group(ArgGroup::new("decision").required(true).args(["accept", "decline"])))]
    Analyze {
        image: String,
        #[arg(long)]
        accept: bool,
        #[arg(long)]
        decline: bool,
        /// Write the server's preview image here.
        #[arg(long)]
        preview_out: Option<PathBuf>,
    },
    /// List diary entries (defaults to today).
    Entries {
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// Today's dashboard.
    Home,
    Report {
        #[command(subcommand)]
        kind: ReportKind,
    },
    /// Forget the stored session.
    Logout,
}

#[derive(Subcommand)]
enum ReportKind {
    Daily {
        #[arg(long)]
        date: Option<String>,
    },
    Weekly,
    Monthly {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u8>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "mealmind_client=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let cli = Cli::parse();
    let app = AppState::init()?;
    let route = startup::resolve(&app).await;
    debug!(?route, "startup route");

    match cli.command {
        Command::Login { email, password } => {
            let mut form = LoginForm::new();
            form.email = email;
            form.password = password;
            form.submit(&app).await?;
            let user = app.current_user(Fetch::Force).await?;
            println!("Signed in as {} <{}>", user.name, user.email);
        }
        Command::Register {
            name,
            email,
            password,
            goal,
        } => {
            let mut form = RegisterForm::new();
            form.name = name;
            form.email = email;
            form.confirm_password = password.clone();
            form.password = password;
            form.daily_calorie_goal = goal;
            if form.submit(&app).await? == Route::Onboarding {
                println!("Account created for {}; run `mealmind-client onboard` to finish", form.email);
            } else {
                println!("Account created for {}", form.email);
            }
        }
        Command::Logout => {
            HomeScreen::today().logout(&app).await?;
            println!("Signed out");
        }
        command => {
            if matches!(route, Route::Login | Route::Splash) {
                bail!("not signed in; run `mealmind-client login` first");
            }
            run_signed_in(command, &app).await?;
        }
    }
    Ok(())
}

async fn run_signed_in(command: Command, app: &AppState) -> anyhow::Result<()> {
    match command {
        Command::Me => {
            let user = app.current_user(Fetch::Force).await?;
            print_user(&user);
        }
        Command::Onboard => {
            OnboardingFlow::new().complete(app).await?;
            let user = app.current_user(Fetch::IfStale).await?;
            print_user(&user);
        }
        Command::Analyze {
            image,
            accept,
            preview_out,
            ..
        } => {
            let mut flow = AddMealFlow::new();
            flow.select_image(ImageSource::new(image))?;
            let draft = flow.analyze(app).await?;
            let split = draft.macro_split();
            println!(
                "{} ({:?}): {:.0} kcal, protein {:.0}g ({:.0}%), carbs {:.0}g ({:.0}%), fat {:.0}g ({:.0}%)",
                draft.food_name,
                draft.meal_type,
                draft.calories,
                draft.protein,
                split.protein,
                draft.carbs,
                split.carbs,
                draft.fat,
                split.fat,
            );
            if let (Some(path), Some(bytes)) = (preview_out, draft.preview_bytes()) {
                tokio::fs::write(&path, bytes)
                    .await
                    .with_context(|| format!("write preview to {}", path.display()))?;
            }
            if accept {
                println!("{}", flow.accept(app).await?);
            } else {
                flow.decline(app).await?;
                println!("Draft discarded");
            }
        }
        Command::Entries { start, end } => {
            let today = dates::today();
            let start = start.unwrap_or_else(|| today.clone());
            let end = end.unwrap_or_else(|| start.clone());
            let entries = app.food_entries(&start, &end, Fetch::Force).await?;
            if entries.is_empty() {
                println!("No meals logged");
            }
            for e in entries {
                println!(
                    "{}  {:<24} {:>6.0} kcal  P{:.0} C{:.0} F{:.0}",
                    e.timestamp, e.food_name, e.calories, e.protein, e.carbs, e.fat
                );
            }
        }
        Command::Home => {
            let s = HomeScreen::today().refresh(app).await;
            for e in &s.errors {
                eprintln!("warning: {e}");
            }
            println!(
                "{:.0} / {:.0} kcal ({:.0}%), {:.0} remaining",
                s.consumed, s.goal, s.progress, s.remaining
            );
            println!("protein {:.0}g, carbs {:.0}g, fat {:.0}g", s.protein, s.carbs, s.fat);
            for m in &s.meals {
                println!("  {:<24} {:>6.0} kcal", m.food_name, m.calories);
            }
        }
        Command::Report { kind } => match kind {
            ReportKind::Daily { date } => {
                let date = date.unwrap_or_else(dates::today);
                let report = app.daily_report(&date, Fetch::Force).await?;
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            ReportKind::Weekly => {
                let weekly = app.weekly_report(Fetch::Force).await?;
                let overview = ReportsOverview {
                    weekly: Some(weekly),
                    ..Default::default()
                };
                for bar in overview.bars() {
                    let width = (bar.height / 5.0).round() as usize;
                    let mark = if bar.over_goal { "!" } else { "" };
                    println!("{:<4} {:>6.0} {}{}", bar.day_name, bar.calories, "#".repeat(width), mark);
                }
            }
            ReportKind::Monthly { year, month } => {
                let (cur_year, cur_month) = dates::current_year_month();
                let report = app
                    .monthly_report(year.unwrap_or(cur_year), month.unwrap_or(cur_month), Fetch::Force)
                    .await?;
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        },
        Command::Login { .. } | Command::Register { .. } | Command::Logout => {}
    }
    Ok(())
}

fn print_user(user: &User) {
    println!("{} <{}>", user.name, user.email);
    println!("daily goal: {} kcal", user.daily_calorie_goal);
    println!("onboarding completed: {}", user.onboarding_completed);
}
