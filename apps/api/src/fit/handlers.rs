use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::fit::cache::{cache_key, get_cached_fit, store_fit};
use crate::fit::scoring::FitResult;
use crate::knowledge::handlers::load_university;
use crate::knowledge::models::UniversityProfile;
use crate::knowledge::repository::get_university;
use crate::profile::versioning::CurrentProfile;
use crate::profile::{load_current_profile, validate_user_id};
use crate::state::AppState;

const MAX_BATCH_SIZE: usize = 25;

#[derive(Debug, Deserialize)]
pub struct FitRequest {
    pub user_id: String,
    pub university_id: String,
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Serialize)]
pub struct FitResponse {
    pub fit: FitResult,
    pub cached: bool,
    pub profile_version: i32,
}

#[derive(Debug, Deserialize)]
pub struct BatchFitRequest {
    pub user_id: String,
    pub university_ids: Vec<String>,
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Serialize)]
pub struct BatchFailure {
    pub university_id: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct BatchFitResponse {
    pub user_id: String,
    pub profile_version: i32,
    pub results: Vec<FitResponse>,
    pub not_found: Vec<String>,
    pub failed: Vec<BatchFailure>,
}

/// Scores one already-loaded pair, consulting the cache unless `force_refresh`.
pub async fn fit_for_profile(
    state: &AppState,
    user_id: &str,
    current: &CurrentProfile,
    university: &UniversityProfile,
    force_refresh: bool,
) -> Result<FitResponse, AppError> {
    let key = cache_key(
        user_id,
        current.version,
        current.id,
        &university.university_id,
        university.updated_at,
    );

    if !force_refresh {
        if let Some(fit) = get_cached_fit(&state.redis, &key).await {
            return Ok(FitResponse {
                fit,
                cached: true,
                profile_version: current.version,
            });
        }
    }

    let fit = state.fit_scorer.score(&current.profile, university).await?;
    info!(
        "Fit for {user_id} at {}: {:?} ({}%)",
        university.university_id, fit.category, fit.percentage
    );
    store_fit(&state.redis, &key, &fit, state.config.fit_cache_ttl_secs).await;

    Ok(FitResponse {
        fit,
        cached: false,
        profile_version: current.version,
    })
}

/// Loads the student's current profile and the university, then scores the pair.
pub async fn compute_fit(
    state: &AppState,
    user_id: &str,
    university_id: &str,
    force_refresh: bool,
) -> Result<FitResponse, AppError> {
    validate_user_id(user_id)?;
    let current = load_current_profile(&state.db, user_id).await?;
    let university = load_university(state, university_id).await?;
    fit_for_profile(state, user_id, &current, &university, force_refresh).await
}

/// POST /api/v1/fit
pub async fn handle_fit(
    State(state): State<AppState>,
    Json(req): Json<FitRequest>,
) -> Result<Json<FitResponse>, AppError> {
    Ok(Json(
        compute_fit(&state, &req.user_id, &req.university_id, req.force_refresh).await?,
    ))
}

/// Drops blanks and repeats while keeping request order.
fn dedup_ids(ids: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect()
}

/// POST /api/v1/fit/batch
pub async fn handle_batch_fit(
    State(state): State<AppState>,
    Json(req): Json<BatchFitRequest>,
) -> Result<Json<BatchFitResponse>, AppError> {
    validate_user_id(&req.user_id)?;
    let ids = dedup_ids(req.university_ids);
    if ids.is_empty() {
        return Err(AppError::Validation(
            "university_ids must contain at least one id".to_string(),
        ));
    }
    if ids.len() > MAX_BATCH_SIZE {
        return Err(AppError::Validation(format!(
            "at most {MAX_BATCH_SIZE} universities per batch"
        )));
    }

    let current = load_current_profile(&state.db, &req.user_id).await?;
    let mut outcomes = BatchOutcomes::default();

    for university_id in ids {
        let outcome = match get_university(&state.db, &university_id).await? {
            Some(university) => Some(
                fit_for_profile(&state, &req.user_id, &current, &university, req.force_refresh)
                    .await,
            ),
            None => None,
        };
        outcomes.record(university_id, outcome)?;
    }

    Ok(Json(BatchFitResponse {
        user_id: req.user_id,
        profile_version: current.version,
        results: outcomes.results,
        not_found: outcomes.not_found,
        failed: outcomes.failed,
    }))
}

#[derive(Debug, Default)]
struct BatchOutcomes {
    results: Vec<FitResponse>,
    not_found: Vec<String>,
    failed: Vec<BatchFailure>,
}

impl BatchOutcomes {
    /// Files one id's outcome. `None` means the id is unknown. Only
    /// InsufficientData is recorded per id; any other error aborts the batch.
    fn record(
        &mut self,
        university_id: String,
        outcome: Option<Result<FitResponse, AppError>>,
    ) -> Result<(), AppError> {
        match outcome {
            None => self.not_found.push(university_id),
            Some(Ok(response)) => self.results.push(response),
            Some(Err(AppError::InsufficientData(error))) => self.failed.push(BatchFailure {
                university_id,
                error,
            }),
            Some(Err(e)) => return Err(e),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::scoring::{score_fit, FitWeights};
    use crate::profile::models::StudentProfile;

    #[test]
    fn test_dedup_ids_keeps_order() {
        let ids = vec![
            "mit".to_string(),
            " stanford_university ".to_string(),
            "mit".to_string(),
            "".to_string(),
        ];
        assert_eq!(dedup_ids(ids), vec!["mit", "stanford_university"]);
    }

    #[test]
    fn test_fit_request_defaults() {
        let req: FitRequest = serde_json::from_value(serde_json::json!({
            "user_id": "ada@example.com",
            "university_id": "mit"
        }))
        .unwrap();
        assert!(!req.force_refresh);
    }

    fn scored_response() -> FitResponse {
        let university: UniversityProfile = serde_json::from_value(serde_json::json!({
            "university_id": "state_flagship",
            "name": "State Flagship",
            "institution_type": "public",
            "acceptance_rate": 60.0,
            "early_acceptance_rate": null
        }))
        .unwrap();
        let mut profile = StudentProfile::default();
        profile.gpa.unweighted = Some(3.8);
        FitResponse {
            fit: score_fit(&profile, &university, &FitWeights::default()).unwrap(),
            cached: false,
            profile_version: 1,
        }
    }

    #[test]
    fn test_batch_outcomes_routed_by_kind() {
        let mut outcomes = BatchOutcomes::default();
        outcomes
            .record("state_flagship".to_string(), Some(Ok(scored_response())))
            .unwrap();
        outcomes.record("atlantis_tech".to_string(), None).unwrap();
        outcomes
            .record(
                "mit".to_string(),
                Some(Err(AppError::InsufficientData(
                    "profile has no GPA or test scores".to_string(),
                ))),
            )
            .unwrap();

        assert_eq!(outcomes.results.len(), 1);
        assert_eq!(outcomes.results[0].fit.university_id, "state_flagship");
        assert_eq!(outcomes.not_found, vec!["atlantis_tech"]);
        assert_eq!(outcomes.failed.len(), 1);
        assert_eq!(outcomes.failed[0].university_id, "mit");
        assert!(outcomes.failed[0].error.contains("no GPA"));
    }

    #[test]
    fn test_batch_outcome_other_errors_abort() {
        let mut outcomes = BatchOutcomes::default();
        let err = outcomes
            .record(
                "mit".to_string(),
                Some(Err(AppError::Embedding("upstream down".to_string()))),
            )
            .unwrap_err();
        assert!(matches!(err, AppError::Embedding(_)));
        assert!(outcomes.failed.is_empty());
    }

    #[test]
    fn test_dedup_happens_before_size_check() {
        let mut ids: Vec<String> = (0..MAX_BATCH_SIZE).map(|i| format!("uni_{i}")).collect();
        ids.extend(["uni_0".to_string(), "  ".to_string()]);
        assert_eq!(dedup_ids(ids).len(), MAX_BATCH_SIZE);
    }
}
