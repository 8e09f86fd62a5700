//! Axum route handlers for the university knowledge base.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::AppError;
use crate::knowledge::models::{InstitutionType, UniversityProfile};
use crate::knowledge::repository;
use crate::knowledge::search::{rank, SearchFilters, SearchRequest, SearchType};
use crate::models::university::UniversitySummaryRow;
use crate::state::AppState;

const MAX_LIST_LIMIT: i64 = 200;

#[derive(Debug, Serialize)]
pub struct UpsertUniversityResponse {
    pub university_id: String,
    pub updated_at: DateTime<Utc>,
    pub embedding_backend: &'static str,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListUniversitiesQuery {
    pub state: Option<String>,
    pub institution_type: Option<InstitutionType>,
    pub min_acceptance_rate: Option<f64>,
    pub max_acceptance_rate: Option<f64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub university: UniversitySummaryRow,
    pub score: f64,
    pub keyword_score: Option<f64>,
    pub semantic_score: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub search_type: SearchType,
    pub total_candidates: usize,
    pub results: Vec<SearchHit>,
}

/// Looks up a university, turning a miss into a 404 that lists likely ids.
pub async fn load_university(state: &AppState, university_id: &str) -> Result<UniversityProfile, AppError> {
    if let Some(profile) = repository::get_university(&state.db, university_id).await? {
        return Ok(profile);
    }
    let suggestions = repository::suggest_university_ids(&state.db, university_id).await?;
    let hint = if suggestions.is_empty() {
        " Use list_valid_university_ids to see available ids.".to_string()
    } else {
        format!(" Did you mean: {}?", suggestions.join(", "))
    };
    Err(AppError::NotFound(format!(
        "University '{university_id}' not found.{hint}"
    )))
}

/// POST /api/v1/universities
pub async fn handle_upsert_university(
    State(state): State<AppState>,
    Json(profile): Json<UniversityProfile>,
) -> Result<Json<UpsertUniversityResponse>, AppError> {
    profile.validate()?;
    let embedding = state.embedder.embed(&profile.search_text()).await?;
    let updated_at = repository::upsert_university(&state.db, &profile, &embedding).await?;
    Ok(Json(UpsertUniversityResponse {
        university_id: profile.university_id,
        updated_at,
        embedding_backend: state.embedder.backend(),
    }))
}

/// GET /api/v1/universities/:id
pub async fn handle_get_university(
    State(state): State<AppState>,
    Path(university_id): Path<String>,
) -> Result<Json<UniversityProfile>, AppError> {
    Ok(Json(load_university(&state, &university_id).await?))
}

/// DELETE /api/v1/universities/:id
pub async fn handle_delete_university(
    State(state): State<AppState>,
    Path(university_id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !repository::delete_university(&state.db, &university_id).await? {
        return Err(AppError::NotFound(format!(
            "University '{university_id}' not found"
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/universities
pub async fn handle_list_universities(
    State(state): State<AppState>,
    Query(params): Query<ListUniversitiesQuery>,
) -> Result<Json<Vec<UniversitySummaryRow>>, AppError> {
    Ok(Json(list_universities(&state, params).await?))
}

pub async fn list_universities(
    state: &AppState,
    params: ListUniversitiesQuery,
) -> Result<Vec<UniversitySummaryRow>, AppError> {
    let filters = SearchFilters {
        state: params.state,
        institution_type: params.institution_type,
        min_acceptance_rate: params.min_acceptance_rate,
        max_acceptance_rate: params.max_acceptance_rate,
    };
    filters.validate()?;
    let limit = params.limit.unwrap_or(50).clamp(1, MAX_LIST_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);
    Ok(repository::list_universities(&state.db, &filters, limit, offset).await?)
}

/// GET /api/v1/universities/ids
pub async fn handle_list_university_ids(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(repository::list_university_ids(&state.db).await?))
}

/// POST /api/v1/universities/search
pub async fn handle_search_universities(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    Ok(Json(search_universities(&state, request).await?))
}

pub async fn search_universities(
    state: &AppState,
    request: SearchRequest,
) -> Result<SearchResponse, AppError> {
    if request.query.trim().is_empty() {
        return Err(AppError::Validation("query cannot be empty".to_string()));
    }
    request.filters.validate()?;

    let query_embedding = if request.search_type.needs_embedding() {
        Some(state.embedder.embed(&request.query).await?)
    } else {
        None
    };

    let loaded = repository::load_candidates(&state.db, &request.filters).await?;
    let (candidates, summaries): (Vec<_>, Vec<_>) = loaded.into_iter().unzip();

    let ranked = rank(
        &request.query,
        query_embedding.as_deref(),
        request.search_type,
        &candidates,
        request.effective_limit(),
    );
    debug!(
        "Search '{}' ({:?}) ranked {} of {} candidates",
        request.query,
        request.search_type,
        ranked.len(),
        candidates.len()
    );

    let results = ranked
        .into_iter()
        .map(|r| SearchHit {
            university: summaries[r.index].clone(),
            score: r.score,
            keyword_score: r.keyword_score,
            semantic_score: r.semantic_score,
        })
        .collect();

    Ok(SearchResponse {
        query: request.query,
        search_type: request.search_type,
        total_candidates: candidates.len(),
        results,
    })
}
