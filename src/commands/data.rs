//! Export, import and account commands

use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::transfer::ImportSummary;
use crate::{AppError, HabitApp};

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub habits: usize,
    pub diary_entries: usize,
    pub message: String,
}

/// Write an export file; `None` returns the document in the message instead
pub fn export_data(app: &HabitApp, path: Option<&Path>) -> Result<ExportResponse, AppError> {
    let doc = app.export();
    let json = doc.to_json()?;

    let message = match path {
        Some(path) => {
            std::fs::write(path, &json)?;
            info!("Exported data to {}", path.display());
            format!(
                "Exported {} habits and {} diary entries to {}",
                doc.habits.len(),
                doc.main_diary.len(),
                path.display()
            )
        }
        None => json,
    };

    Ok(ExportResponse {
        habits: doc.habits.len(),
        diary_entries: doc.main_diary.len(),
        message,
    })
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub summary: ImportSummary,
    pub message: String,
}

/// Read an export file and replace the collections it carries
pub async fn import_data(app: &HabitApp, path: &Path) -> Result<ImportResponse, AppError> {
    let json = std::fs::read_to_string(path)?;
    let summary = app.import_json(&json).await?;

    let mut parts = Vec::new();
    if let Some(n) = summary.habits {
        parts.push(format!("{} habits", n));
    }
    if summary.settings {
        parts.push("settings".to_string());
    }
    if let Some(n) = summary.achievements {
        parts.push(format!("{} achievements", n));
    }
    if let Some(n) = summary.main_diary {
        parts.push(format!("{} diary entries", n));
    }

    let message = if parts.is_empty() {
        "Nothing to import".to_string()
    } else if summary.synced {
        format!("Imported {} and synced them", parts.join(", "))
    } else {
        format!("Imported {} (offline, stored locally)", parts.join(", "))
    };

    Ok(ImportResponse { summary, message })
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub email: Option<String>,
    pub message: String,
}

pub async fn login(app: &HabitApp, email: &str) -> Result<SessionResponse, AppError> {
    let user = app.sign_in(email).await?;
    let habits = app.stores().habits.view();

    let message = match habits.error {
        Some(error) => format!("Signed in as {}, but loading failed: {}", user.email, error),
        None => format!("Signed in as {} ({} habits)", user.email, habits.data.len()),
    };

    Ok(SessionResponse {
        email: Some(user.email),
        message,
    })
}

pub async fn logout(app: &HabitApp) -> Result<SessionResponse, AppError> {
    let email = app.current_user().map(|u| u.email);
    app.sign_out().await?;

    let message = match &email {
        Some(email) => format!("Signed out {}; changes are now kept on this device only", email),
        None => "Not signed in".to_string(),
    };

    Ok(SessionResponse { email: None, message })
}
