use axum::{
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;
use crate::models::profile::ProfileSnapshotRow;
use crate::profile::completeness::{compute_completeness_report, CompletenessReport};
use crate::profile::ingest::{
    confirm_extraction, extract_document_text, preview_extraction, DocumentConfirmRequest,
    DocumentConfirmResponse, DocumentPreviewResponse, DocumentTextRequest,
};
use crate::profile::merge::apply_merge_patch;
use crate::profile::models::StudentProfile;
use crate::profile::search::{search_profile, ProfileSearchHit};
use crate::profile::versioning::{
    commit_profile_version, delete_profile, get_profile_at_version,
    get_version_history, CurrentProfile, ProfileSource,
};
use crate::profile::{load_current_profile, validate_user_id};
use crate::state::AppState;

#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WriteSource {
    #[default]
    Manual,
    Onboarding,
}

#[derive(Debug, Deserialize)]
pub struct PutProfileRequest {
    pub profile: StudentProfile,
    #[serde(default)]
    pub source: WriteSource,
}

#[derive(Debug, Serialize)]
pub struct ProfileWriteResponse {
    pub user_id: String,
    pub version: i32,
    pub snapshot_key: String,
    pub completeness: CompletenessReport,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user_id: String,
    pub version: i32,
    pub source: String,
    pub profile: StudentProfile,
    pub completeness: CompletenessReport,
}

impl ProfileResponse {
    fn new(user_id: String, current: CurrentProfile) -> Self {
        let completeness = compute_completeness_report(&current.profile);
        Self {
            user_id,
            version: current.version,
            source: current.source,
            profile: current.profile,
            completeness,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProfileSearchQuery {
    pub q: String,
    pub limit: Option<usize>,
}

async fn write_profile(
    state: &AppState,
    user_id: String,
    profile: StudentProfile,
    source: ProfileSource,
) -> Result<ProfileWriteResponse, AppError> {
    profile.validate()?;
    let version = commit_profile_version(
        &state.db,
        &state.s3,
        &state.config.s3_bucket,
        &user_id,
        &profile,
        source,
    )
    .await?;
    Ok(ProfileWriteResponse {
        user_id,
        version: version.version,
        snapshot_key: version.s3_key,
        completeness: compute_completeness_report(&profile),
    })
}

/// PUT /api/v1/profiles/:user_id
pub async fn handle_put_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<PutProfileRequest>,
) -> Result<Json<ProfileWriteResponse>, AppError> {
    validate_user_id(&user_id)?;
    let source = match req.source {
        WriteSource::Manual => ProfileSource::Manual,
        WriteSource::Onboarding => ProfileSource::Onboarding,
    };
    Ok(Json(write_profile(&state, user_id, req.profile, source).await?))
}

/// PATCH /api/v1/profiles/:user_id
pub async fn handle_patch_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<ProfileWriteResponse>, AppError> {
    validate_user_id(&user_id)?;
    let current = load_current_profile(&state.db, &user_id).await?;
    let patched = apply_merge_patch(&current.profile, &patch)?;
    Ok(Json(
        write_profile(&state, user_id, patched, ProfileSource::Manual).await?,
    ))
}

/// GET /api/v1/profiles/:user_id
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ProfileResponse>, AppError> {
    validate_user_id(&user_id)?;
    let current = load_current_profile(&state.db, &user_id).await?;
    Ok(Json(ProfileResponse::new(user_id, current)))
}

/// GET /api/v1/profiles/:user_id/history
pub async fn handle_profile_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<ProfileSnapshotRow>>, AppError> {
    validate_user_id(&user_id)?;
    Ok(Json(get_version_history(&state.db, &user_id).await?))
}

/// GET /api/v1/profiles/:user_id/versions/:v
pub async fn handle_get_profile_version(
    State(state): State<AppState>,
    Path((user_id, version)): Path<(String, i32)>,
) -> Result<Json<ProfileResponse>, AppError> {
    validate_user_id(&user_id)?;
    let current = get_profile_at_version(&state.db, &user_id, version)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Profile version {version} not found for {user_id}"))
        })?;
    Ok(Json(ProfileResponse::new(user_id, current)))
}

/// DELETE /api/v1/profiles/:user_id
pub async fn handle_delete_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, AppError> {
    validate_user_id(&user_id)?;
    if delete_profile(&state.db, &user_id).await? == 0 {
        return Err(AppError::NotFound(format!("Profile not found for {user_id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/profiles/:user_id/search?q=
pub async fn handle_search_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<ProfileSearchQuery>,
) -> Result<Json<Vec<ProfileSearchHit>>, AppError> {
    validate_user_id(&user_id)?;
    let current = load_current_profile(&state.db, &user_id).await?;
    let hits = search_profile(&current.profile, &params.q, params.limit.unwrap_or(10).min(50))?;
    Ok(Json(hits))
}

/// POST /api/v1/profiles/:user_id/documents
///
/// Accepts a multipart upload (`file` field, PDF or text) or a JSON
/// `{ "document_text": ... }` body and returns an extraction preview.
pub async fn handle_document_preview(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    request: Request,
) -> Result<Json<DocumentPreviewResponse>, AppError> {
    validate_user_id(&user_id)?;

    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let document_text = if is_multipart {
        let mut multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        let mut text = None;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?
        {
            if field.name() != Some("file") {
                continue;
            }
            let file_name = field.file_name().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            text = Some(extract_document_text(data, file_name.as_deref()).await?);
            break;
        }
        text.ok_or_else(|| AppError::Validation("multipart body needs a 'file' field".to_string()))?
    } else {
        let Json(body) = Json::<DocumentTextRequest>::from_request(request, &state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        if body.document_text.trim().is_empty() {
            return Err(AppError::Validation("document_text cannot be empty".to_string()));
        }
        body.document_text
    };

    let preview = preview_extraction(&state.db, &state.llm, &user_id, &document_text).await?;
    Ok(Json(preview))
}

/// POST /api/v1/profiles/:user_id/documents/confirm
pub async fn handle_document_confirm(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<DocumentConfirmRequest>,
) -> Result<Json<DocumentConfirmResponse>, AppError> {
    validate_user_id(&user_id)?;
    let response = confirm_extraction(
        &state.db,
        &state.s3,
        &state.config.s3_bucket,
        &user_id,
        &req.extracted,
    )
    .await?;
    Ok(Json(response))
}
