use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::college_list::repository::{add_entry, list_entries, remove_entry};
use crate::errors::AppError;
use crate::fit::handlers::{fit_for_profile, FitResponse};
use crate::knowledge::handlers::load_university;
use crate::knowledge::repository::get_university;
use crate::models::college_list::CollegeListRow;
use crate::profile::validate_user_id;
use crate::profile::versioning::get_current_profile;
use crate::state::AppState;

const MAX_NOTES_LEN: usize = 2_000;

#[derive(Debug, Default, Deserialize)]
pub struct CollegeListQuery {
    #[serde(default)]
    pub with_fit: bool,
}

#[derive(Debug, Deserialize)]
pub struct AddCollegeRequest {
    pub university_id: String,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CollegeListEntry {
    #[serde(flatten)]
    pub entry: CollegeListRow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit: Option<FitResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit_error: Option<String>,
}

impl From<CollegeListRow> for CollegeListEntry {
    fn from(entry: CollegeListRow) -> Self {
        Self {
            entry,
            fit: None,
            fit_error: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CollegeListResponse {
    pub user_id: String,
    pub entries: Vec<CollegeListEntry>,
}

fn clean_notes(notes: Option<String>) -> Result<Option<String>, AppError> {
    let notes = notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    if notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_LEN) {
        return Err(AppError::Validation(format!(
            "notes must be at most {MAX_NOTES_LEN} characters"
        )));
    }
    Ok(notes)
}

/// GET /api/v1/college-list/:user_id?with_fit=
pub async fn handle_get_college_list(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<CollegeListQuery>,
) -> Result<Json<CollegeListResponse>, AppError> {
    validate_user_id(&user_id)?;
    let rows = list_entries(&state.db, &user_id).await?;
    let mut entries: Vec<CollegeListEntry> = rows.into_iter().map(CollegeListEntry::from).collect();

    if params.with_fit && !entries.is_empty() {
        match get_current_profile(&state.db, &user_id).await? {
            None => {
                let message = format!("Profile not found for {user_id}");
                for entry in &mut entries {
                    entry.fit_error = Some(message.clone());
                }
            }
            Some(current) => {
                for entry in &mut entries {
                    let outcome = match get_university(&state.db, &entry.entry.university_id).await? {
                        Some(university) => {
                            fit_for_profile(&state, &user_id, &current, &university, false).await
                        }
                        None => Err(AppError::NotFound(format!(
                            "University '{}' not found",
                            entry.entry.university_id
                        ))),
                    };
                    match outcome {
                        Ok(fit) => entry.fit = Some(fit),
                        Err(e) => {
                            warn!(
                                "Fit failed for {user_id} at {}: {e}",
                                entry.entry.university_id
                            );
                            entry.fit_error = Some(e.to_string());
                        }
                    }
                }
            }
        }
    }

    Ok(Json(CollegeListResponse { user_id, entries }))
}

/// POST /api/v1/college-list/:user_id
pub async fn handle_add_college(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<AddCollegeRequest>,
) -> Result<(StatusCode, Json<CollegeListRow>), AppError> {
    validate_user_id(&user_id)?;
    let notes = clean_notes(req.notes)?;
    let university = load_university(&state, &req.university_id).await?;

    let added_at = add_entry(&state.db, &user_id, &university.university_id, notes.as_deref())
        .await?
        .ok_or_else(|| {
            AppError::Conflict(format!(
                "{} is already on the college list",
                university.name
            ))
        })?;

    Ok((
        StatusCode::CREATED,
        Json(CollegeListRow {
            user_id,
            university_id: university.university_id,
            university_name: university.name,
            notes,
            added_at,
        }),
    ))
}

/// DELETE /api/v1/college-list/:user_id/:university_id
pub async fn handle_remove_college(
    State(state): State<AppState>,
    Path((user_id, university_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    validate_user_id(&user_id)?;
    if !remove_entry(&state.db, &user_id, &university_id).await? {
        return Err(AppError::NotFound(format!(
            "{university_id} is not on the college list for {user_id}"
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}
