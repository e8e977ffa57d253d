//! Command line front end for the habit sync engine
//!
//! Sets up logging, opens the database, runs one subcommand and shuts the
//! app down cleanly so queued remote writes and pending snapshots are not
//! lost.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use habit_sync::commands::{self, NoteOperation};
use habit_sync::{AppError, HabitApp, SyncConfig};

/// Get the default database path with robust fallback strategy
fn get_default_database_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    // Try various locations in order of preference
    let potential_paths = [
        dirs::home_dir().map(|mut p| {
            p.push(".habit_sync");
            p
        }),
        dirs::data_dir().map(|mut p| {
            p.push("habit_sync");
            p
        }),
        dirs::config_dir().map(|mut p| {
            p.push("habit_sync");
            p
        }),
        std::env::current_dir().ok().map(|mut p| {
            p.push(".habit_sync");
            p
        }),
    ];

    for potential_path in potential_paths.iter().flatten() {
        if let Ok(()) = std::fs::create_dir_all(potential_path) {
            // Test if we can write to this directory
            let test_file = potential_path.join(".test_write");
            if std::fs::write(&test_file, "test").is_ok() {
                let _ = std::fs::remove_file(&test_file);
                return Ok(potential_path.join("habits.db"));
            }
        }
    }

    // Ultimate fallback: use a temporary directory
    let mut temp_path = std::env::temp_dir();
    temp_path.push("habit_sync");
    std::fs::create_dir_all(&temp_path)?;
    temp_path.push("habits.db");

    tracing::warn!("Using temporary directory for database: {}", temp_path.display());
    Ok(temp_path)
}

/// Make sure the parent directory of a user-supplied path exists
fn prepare_path(path: PathBuf) -> std::io::Result<PathBuf> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(path)
}

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the local SQLite database file
    /// If not provided, uses a default location in the user's home directory
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// SQLite file acting as the remote store (defaults to the local database)
    #[arg(long, global = true)]
    remote: Option<PathBuf>,

    /// Quiet period before local snapshots are written
    #[arg(long, global = true, default_value_t = habit_sync::sync::DEFAULT_DEBOUNCE_MS)]
    debounce_ms: u64,

    /// Print responses as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable verbose output (implies debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a habit
    Add {
        title: String,
        /// Completions needed per day
        #[arg(short, long, default_value = "1")]
        frequency: String,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    /// Change a habit's details or position
    Edit {
        /// Title, key or key prefix
        habit: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        frequency: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        /// Move to this position (0 is the top)
        #[arg(long)]
        position: Option<usize>,
    },
    /// Log one completion for today
    Progress { habit: String },
    /// Archive a habit, or restore it if archived
    Archive { habit: String },
    /// Delete a habit
    Delete { habit: String },
    /// List habits with today's progress
    List {
        /// Include archived habits
        #[arg(short, long)]
        all: bool,
        /// position, title, streak or rate
        #[arg(long)]
        sort: Option<String>,
    },
    /// Streaks, completion rates and insights
    Stats { habit: Option<String> },
    /// Add, edit or delete a note on a habit
    Note {
        habit: String,
        #[command(subcommand)]
        action: NoteAction,
    },
    /// Add, edit, delete or list main diary entries
    Diary {
        #[command(subcommand)]
        action: NoteAction,
    },
    /// Show or change settings
    Settings {
        /// light, dark or auto
        #[arg(long)]
        theme: Option<String>,
        /// default or compact
        #[arg(long)]
        calendar_view: Option<String>,
        #[arg(long)]
        highlight_today: Option<bool>,
        /// Other options as name=value
        #[arg(long = "set")]
        options: Vec<String>,
    },
    /// Unlock an achievement
    Unlock {
        key: String,
        #[arg(long)]
        title: Option<String>,
    },
    /// Export all data to a JSON file (stdout when no file is given)
    Export { file: Option<PathBuf> },
    /// Replace data with the contents of an export file
    Import { file: PathBuf },
    /// Sign in; data is then synced with the remote store
    Login { email: String },
    /// Sign out; data stays on this device
    Logout,
}

#[derive(Subcommand, Debug)]
enum NoteAction {
    Add {
        text: String,
        /// Creation timestamp (RFC 3339), defaults to now
        #[arg(long)]
        date: Option<String>,
    },
    Edit {
        /// Creation timestamp of the note (RFC 3339)
        date: String,
        text: String,
    },
    Delete {
        /// Creation timestamp of the note (RFC 3339)
        date: String,
    },
    List,
}

fn note_params(habit: Option<String>, action: NoteAction) -> Option<commands::NoteParams> {
    let (operation, date, text) = match action {
        NoteAction::Add { text, date } => (NoteOperation::Add, date, Some(text)),
        NoteAction::Edit { date, text } => (NoteOperation::Edit, Some(date), Some(text)),
        NoteAction::Delete { date } => (NoteOperation::Delete, Some(date), None),
        NoteAction::List => return None,
    };
    Some(commands::NoteParams {
        operation,
        habit,
        date,
        text,
    })
}

fn print<T: Serialize>(json: bool, response: &T, message: &str) -> Result<(), AppError> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
    } else {
        println!("{}", message);
    }
    Ok(())
}

async fn run(app: &HabitApp, command: Command, json: bool) -> Result<(), AppError> {
    match command {
        Command::Add {
            title,
            frequency,
            color,
            icon,
        } => {
            let r = commands::add_habit(
                app,
                commands::AddHabitParams {
                    title,
                    frequency,
                    color_index: color,
                    icon_title: icon,
                },
            )?;
            print(json, &r, &r.message)
        }
        Command::Edit {
            habit,
            title,
            frequency,
            color,
            icon,
            position,
        } => {
            let r = commands::edit_habit(
                app,
                commands::EditHabitParams {
                    habit,
                    title,
                    frequency,
                    color_index: color,
                    icon_title: icon,
                    position,
                },
            )?;
            print(json, &r, &r.message)
        }
        Command::Progress { habit } => {
            let r = commands::log_progress(app, &habit)?;
            print(json, &r, &r.message)
        }
        Command::Archive { habit } => {
            let r = commands::archive_habit(app, &habit)?;
            print(json, &r, &r.message)
        }
        Command::Delete { habit } => {
            let r = commands::delete_habit(app, &habit)?;
            print(json, &r, &r.message)
        }
        Command::List { all, sort } => {
            let r = commands::list_habits(
                app,
                commands::ListHabitsParams {
                    include_archived: all,
                    sort_by: sort,
                },
            )?;
            print(json, &r, &r.message)
        }
        Command::Stats { habit } => {
            let r = commands::habit_stats(app, commands::StatsParams { habit })?;
            print(json, &r, &r.message)
        }
        Command::Note { habit, action } => notes(app, Some(habit), action, json),
        Command::Diary { action } => notes(app, None, action, json),
        Command::Settings {
            theme,
            calendar_view,
            highlight_today,
            options,
        } => {
            let r = commands::update_settings(
                app,
                commands::SettingsParams {
                    theme,
                    calendar_view,
                    highlight_today,
                    options,
                },
            )?;
            let text = format!("{}\n{}", r.message, serde_json::to_string_pretty(&r.settings)?);
            print(json, &r, &text)
        }
        Command::Unlock { key, title } => {
            let r = commands::unlock_achievement(app, &key, title.as_deref())?;
            print(json, &r, &r.message)
        }
        Command::Export { file } => {
            let r = commands::export_data(app, file.as_deref())?;
            print(json, &r, &r.message)
        }
        Command::Import { file } => {
            let r = commands::import_data(app, &file).await?;
            print(json, &r, &r.message)
        }
        Command::Login { email } => {
            let r = commands::login(app, &email).await?;
            print(json, &r, &r.message)
        }
        Command::Logout => {
            let r = commands::logout(app).await?;
            print(json, &r, &r.message)
        }
    }
}

fn notes(app: &HabitApp, habit: Option<String>, action: NoteAction, json: bool) -> Result<(), AppError> {
    match note_params(habit.clone(), action) {
        Some(params) => {
            let r = commands::apply_note(app, params)?;
            print(json, &r, &format!("{} ({})", r.message, r.date))
        }
        None => {
            let entries = commands::list_notes(app, habit.as_deref())?;
            let text = if entries.is_empty() {
                "No notes yet".to_string()
            } else {
                entries
                    .iter()
                    .map(|e| format!("{}  {}", habit_sync::canonical_timestamp(&e.date), e.text))
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            print(json, &entries, &text)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Set up logging based on command line flags
    let log_level = if args.verbose {
        "debug"
    } else if args.debug {
        "info"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!("habit_sync={}", log_level))
        .with_writer(std::io::stderr) // Keep stdout for command output
        .init();

    let db_path = match args.database {
        Some(path) => prepare_path(path)?,
        None => get_default_database_path()?,
    };
    let remote_path = args.remote.map(prepare_path).transpose()?;

    info!("Using database at: {}", db_path.display());

    let config = SyncConfig::with_debounce_ms(args.debounce_ms);
    let app = HabitApp::open(db_path, remote_path, &config)?;
    app.start().await;

    let result = run(&app, args.command, args.json).await;

    // Always drain queued writes, even after a failed command
    app.shutdown().await?;
    result?;

    info!("Done");
    Ok(())
}
