use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::prompts::NO_INVENTION_INSTRUCTION;
use crate::llm_client::LlmClient;
use crate::profile::completeness::compute_completeness_report;
use crate::profile::conflicts::{check_for_conflicts, ConflictWarning};
use crate::profile::merge::merge_extraction;
use crate::profile::models::StudentProfile;
use crate::profile::prompts::{PROFILE_EXTRACT_PROMPT, PROFILE_EXTRACT_SYSTEM};
use crate::profile::versioning::{commit_profile_version, get_current_profile, ProfileSource};

/// Documents longer than this are truncated before extraction.
const MAX_DOCUMENT_CHARS: usize = 60_000;

#[derive(Debug, Deserialize)]
pub struct DocumentTextRequest {
    pub document_text: String,
}

#[derive(Debug, Serialize)]
pub struct DocumentPreviewResponse {
    pub extracted: StudentProfile,
    pub merged_preview: StudentProfile,
    pub conflict_warnings: Vec<ConflictWarning>,
    pub completeness_before: f64,
    pub completeness_after: f64,
    pub truncated: bool,
}

#[derive(Debug, Deserialize)]
pub struct DocumentConfirmRequest {
    pub extracted: StudentProfile,
}

#[derive(Debug, Serialize)]
pub struct DocumentConfirmResponse {
    pub version: i32,
    pub completeness_delta: f64,
}

/// Pulls plain text out of an uploaded file. PDFs go through `pdf-extract`,
/// anything else must be UTF-8 text.
pub async fn extract_document_text(
    bytes: bytes::Bytes,
    file_name: Option<&str>,
) -> Result<String, AppError> {
    let is_pdf = bytes.starts_with(b"%PDF")
        || file_name.is_some_and(|n| n.to_ascii_lowercase().ends_with(".pdf"));

    let text = if is_pdf {
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(anyhow::Error::from)?
            .map_err(|e| AppError::UnprocessableEntity(format!("could not read PDF: {e}")))?
    } else {
        String::from_utf8(bytes.to_vec()).map_err(|_| {
            AppError::UnprocessableEntity("document must be a PDF or UTF-8 text".to_string())
        })?
    };

    if text.trim().is_empty() {
        return Err(AppError::UnprocessableEntity(
            "document contains no extractable text".to_string(),
        ));
    }
    Ok(text)
}

/// The document goes in last so placeholder-like text inside it is left alone.
fn extraction_prompt(document: &str) -> String {
    PROFILE_EXTRACT_PROMPT
        .replace("{no_invention}", NO_INVENTION_INSTRUCTION)
        .replace("{document_text}", document)
}

/// Runs LLM extraction and shows what a merge would change. Nothing is stored.
pub async fn preview_extraction(
    pool: &PgPool,
    llm: &LlmClient,
    user_id: &str,
    document_text: &str,
) -> Result<DocumentPreviewResponse, AppError> {
    let (document, truncated) = truncate_chars(document_text, MAX_DOCUMENT_CHARS);
    let prompt = extraction_prompt(document);

    let extracted: StudentProfile = llm
        .complete_json(&prompt, PROFILE_EXTRACT_SYSTEM)
        .await
        .map_err(|e| AppError::Llm(format!("profile extraction failed: {e}")))?;

    extracted.validate().map_err(|e| {
        AppError::UnprocessableEntity(format!("extracted values are out of range: {e}"))
    })?;

    let existing = get_current_profile(pool, user_id)
        .await?
        .map(|p| p.profile)
        .unwrap_or_default();

    let merged_preview = merge_extraction(&existing, &extracted);
    let conflict_warnings = check_for_conflicts(&existing, &extracted);

    info!(
        "Extracted profile preview for {user_id}: {} courses, {} activities, {} conflicts",
        extracted.courses.len(),
        extracted.activities.len(),
        conflict_warnings.len()
    );

    Ok(DocumentPreviewResponse {
        completeness_before: compute_completeness_report(&existing).overall_score,
        completeness_after: compute_completeness_report(&merged_preview).overall_score,
        extracted,
        merged_preview,
        conflict_warnings,
        truncated,
    })
}

/// Merges a confirmed extraction into the stored profile as a new version.
pub async fn confirm_extraction(
    pool: &PgPool,
    s3: &aws_sdk_s3::Client,
    s3_bucket: &str,
    user_id: &str,
    extracted: &StudentProfile,
) -> Result<DocumentConfirmResponse, AppError> {
    extracted.validate()?;

    let existing = get_current_profile(pool, user_id)
        .await?
        .map(|p| p.profile)
        .unwrap_or_default();
    let merged = merge_extraction(&existing, extracted);
    merged.validate()?;

    let score_before = compute_completeness_report(&existing).overall_score;
    let version = commit_profile_version(
        pool,
        s3,
        s3_bucket,
        user_id,
        &merged,
        ProfileSource::Document,
    )
    .await?;
    let score_after = compute_completeness_report(&merged).overall_score;

    Ok(DocumentConfirmResponse {
        version: version.version,
        completeness_delta: score_after - score_before,
    })
}

fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}
