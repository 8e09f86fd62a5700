// Student profile store: append-only versions, document extraction,
// completeness and keyword search. Extraction goes through llm_client.

pub mod completeness;
pub mod conflicts;
pub mod handlers;
pub mod ingest;
pub mod merge;
pub mod models;
pub mod prompts;
pub mod search;
pub mod versioning;

use sqlx::PgPool;

use crate::errors::AppError;
use versioning::{get_current_profile, CurrentProfile};

const MAX_USER_ID_LEN: usize = 254;

/// User ids are emails or auth-provider uids; anything else is rejected early.
pub fn validate_user_id(user_id: &str) -> Result<(), AppError> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("user_id cannot be empty".to_string()));
    }
    if trimmed.len() != user_id.len() || user_id.len() > MAX_USER_ID_LEN {
        return Err(AppError::Validation(format!(
            "user_id must be at most {MAX_USER_ID_LEN} characters without surrounding whitespace"
        )));
    }
    if user_id.chars().any(char::is_control) {
        return Err(AppError::Validation(
            "user_id contains control characters".to_string(),
        ));
    }
    Ok(())
}

/// Current profile or a "profile not found" error.
pub async fn load_current_profile(pool: &PgPool, user_id: &str) -> Result<CurrentProfile, AppError> {
    get_current_profile(pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile not found for {user_id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_user_id_accepted() {
        assert!(validate_user_id("student@example.com").is_ok());
    }

    #[test]
    fn test_blank_and_padded_user_ids_rejected() {
        assert!(validate_user_id("").is_err());
        assert!(validate_user_id("  ").is_err());
        assert!(validate_user_id(" student@example.com").is_err());
    }

    #[test]
    fn test_overlong_user_id_rejected() {
        assert!(validate_user_id(&"a".repeat(300)).is_err());
    }
}
