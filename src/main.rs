//! homefit - Home workout companion
//!
//! Body-part exercise catalog, workout tips and a daily progress calendar.

use std::rc::Rc;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use homefit::api::FitnessApi;
use homefit::config::Config;
use homefit::db::{KeyValueStore, SqliteStore};
use homefit::progress::{self, ProgressTracker};
use homefit::remote::{AppwriteClient, DocumentStore};
use homefit::session::{self, SessionContext, User};
use homefit::selection;
use homefit::tips::format_tip;
use homefit::tui::{App, Exit};

const DEFAULT_LOG_FILTER: &str = "homefit=info";

#[derive(Parser)]
#[command(name = "homefit")]
#[command(author, version, about = "Home workout companion")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open TUI dashboard
    Tui,

    /// Create an account and sign in
    Register {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "HOMEFIT_PASSWORD")]
        password: String,

        #[arg(short, long)]
        username: String,
    },

    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "HOMEFIT_PASSWORD")]
        password: String,
    },

    /// Sign out and clear all local data
    Logout,

    /// Show the signed-in user
    Whoami,

    /// List body parts
    BodyParts,

    /// List exercises of a body part
    Exercises {
        /// Body part document id
        body_part_id: String,
    },

    /// Show one exercise
    Exercise {
        /// Exercise document id
        id: String,
    },

    /// List workout tips
    Tips {
        /// Show full tip content
        #[arg(short, long)]
        full: bool,
    },

    /// Show completed workout days
    Progress {
        /// Print the calendar mark map as JSON
        #[arg(long)]
        json: bool,
    },

    /// Mark or unmark a workout day
    Toggle {
        /// Day as YYYY-MM-DD (default: today)
        date: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let dashboard = matches!(cli.command, None | Some(Commands::Tui));
    init_tracing(&config, dashboard)?;

    let store: Rc<dyn KeyValueStore> = Rc::new(
        SqliteStore::open(&config.store_path)
            .with_context(|| format!("Failed to open local store at {}", config.store_path))?,
    );

    let client = AppwriteClient::new(&config)?;
    client.restore_session(session::load_session_token(store.as_ref())).await;
    let remote: Arc<dyn DocumentStore> = Arc::new(client);
    let api = FitnessApi::new(remote, config.database_id.clone(), config.collections.clone());

    match cli.command {
        None | Some(Commands::Tui) => {
            let user = require_user(&api).await?;
            let mut app = App::new(api.clone(), store.clone(), SessionContext::begin(user))?;
            if app.run()? == Exit::SignedOut {
                // Local state is gone already; the remote session is best effort.
                let _ = api.sign_out().await;
                println!("Signed out. Run `homefit login` to sign in again.");
            }
        }

        Some(Commands::Register { email, password, username }) => {
            let user = api.create_user(&email, &password, &username).await?;
            persist_session(&api, store.as_ref()).await?;
            println!("Welcome, {}! (user id: {})", user.username, user.id);
        }

        Some(Commands::Login { email, password }) => {
            api.sign_in(&email, &password).await?;
            persist_session(&api, store.as_ref()).await?;
            match api.current_user().await {
                Some(user) => println!("Signed in as {}", user.username),
                None => println!("Signed in, but no profile exists for {}", email),
            }
        }

        Some(Commands::Logout) => {
            let mut session = match api.current_user().await {
                Some(user) => SessionContext::begin(user),
                None => SessionContext::signed_out(),
            };
            let _ = api.sign_out().await;
            session.end(store.as_ref())?;
            println!("Signed out, local data cleared.");
        }

        Some(Commands::Whoami) => match api.current_user().await {
            Some(user) => {
                println!("{} <{}>", user.username, user.email);
                println!("user id:    {}", user.id);
                println!("account id: {}", user.account_id);
                if let Some(avatar) = user.avatar {
                    println!("avatar:     {}", avatar);
                }
            }
            None => println!("Not signed in."),
        },

        Some(Commands::BodyParts) => {
            let parts = api.body_parts().await?;
            if parts.is_empty() {
                println!("No body parts found.");
            }
            for p in parts {
                println!("{:20} | {:24} | {}", p.id, p.name, p.description);
            }
        }

        Some(Commands::Exercises { body_part_id }) => {
            let part = api.body_part(&body_part_id).await?;
            selection::remember_body_part(store.as_ref(), &part.id)?;
            selection::remember_body_part_name(store.as_ref(), &part.name)?;

            let exercises = api.exercises_for_body_part(&body_part_id).await?;
            println!("Selected Body Part: {}", part.name);
            println!("{:-<60}", "");
            if exercises.is_empty() {
                println!("No exercises available for this body part at the moment.");
            }
            for e in exercises {
                println!("{:20} | {:24} | {}", e.id, e.name, e.description);
            }
        }

        Some(Commands::Exercise { id }) => {
            let exercise = api.exercise(&id).await?;
            println!("{}", exercise.name);
            println!("{:-<60}", "");
            println!("{}", exercise.description);
            if let Some(thumbnail) = exercise.thumbnail {
                println!("\nthumbnail: {}", thumbnail);
            }
        }

        Some(Commands::Tips { full }) => {
            let tips = api.tips().await?;
            if tips.is_empty() {
                println!("No tips found.");
            }
            for tip in &tips {
                println!("{}\n", format_tip(tip, full));
            }
        }

        Some(Commands::Progress { json }) => {
            let user = require_user(&api).await?;
            let marks = ProgressTracker::new(store.clone()).try_load_progress(&user.id)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&marks)?);
            } else {
                let dates = marks.marked_dates();
                println!("Completed workouts: {}", dates.len());
                println!("{:-<30}", "");
                for date in dates {
                    println!("{}", date.format(progress::DATE_FORMAT));
                }
            }
        }

        Some(Commands::Toggle { date }) => {
            let user = require_user(&api).await?;
            let date = match date {
                Some(raw) => match progress::parse_date(&raw) {
                    Some(date) => date,
                    None => bail!("Invalid date '{}', expected YYYY-MM-DD", raw),
                },
                None => Local::now().date_naive(),
            };

            let tracker = ProgressTracker::new(store.clone());
            let mut marks = tracker.try_load_progress(&user.id)?;
            let outcome = tracker
                .toggle_date(&user.id, date, &mut marks)
                .context("Failed to update progress. Please try again.")?;

            let day = outcome.date.format(progress::DATE_FORMAT);
            if outcome.celebration.is_some() {
                println!("✓ {} completed. Great Workout Today! You Are Stronger", day);
            } else {
                println!("{} cleared", day);
            }
        }
    }

    Ok(())
}

/// stderr for plain commands; a log file while the dashboard owns the terminal
fn init_tracing(config: &Config, dashboard: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    if dashboard {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)
            .with_context(|| format!("Failed to open log file {}", config.log_file))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

async fn require_user(api: &FitnessApi) -> Result<User> {
    match api.current_user().await {
        Some(user) => Ok(user),
        None => bail!("Not signed in. Run `homefit login --email <email> --password <password>` first."),
    }
}

async fn persist_session(api: &FitnessApi, store: &dyn KeyValueStore) -> Result<()> {
    let token = api.remote().session_token().await;
    session::save_session_token(store, token.as_deref())?;
    Ok(())
}
