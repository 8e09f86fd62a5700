use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use crate::knowledge::models::UniversityProfile;
use crate::knowledge::search::{Candidate, SearchFilters};
use crate::knowledge::text::tokenize;
use crate::models::university::{UniversityRow, UniversitySummaryRow};

/// Inserts or replaces a university and its embedding. Returns the new `updated_at`.
pub async fn upsert_university(
    pool: &PgPool,
    profile: &UniversityProfile,
    embedding: &[f32],
) -> Result<DateTime<Utc>> {
    let mut stored = profile.clone();
    stored.updated_at = None;
    let profile_json = serde_json::to_value(&stored)?;

    let updated_at: DateTime<Utc> = sqlx::query_scalar(
        r#"
        INSERT INTO universities
            (university_id, name, state, institution_type, acceptance_rate,
             profile, search_text, embedding, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now())
        ON CONFLICT (university_id) DO UPDATE SET
            name = EXCLUDED.name,
            state = EXCLUDED.state,
            institution_type = EXCLUDED.institution_type,
            acceptance_rate = EXCLUDED.acceptance_rate,
            profile = EXCLUDED.profile,
            search_text = EXCLUDED.search_text,
            embedding = EXCLUDED.embedding,
            updated_at = now()
        RETURNING updated_at
        "#,
    )
    .bind(&profile.university_id)
    .bind(&profile.name)
    .bind(profile.state.as_deref().map(str::to_uppercase))
    .bind(profile.institution_type.as_str())
    .bind(profile.acceptance_rate)
    .bind(&profile_json)
    .bind(profile.search_text())
    .bind(embedding)
    .fetch_one(pool)
    .await?;

    info!("Upserted university {}", profile.university_id);
    Ok(updated_at)
}

fn decode_row(row: UniversityRow) -> Result<UniversityProfile> {
    let mut profile: UniversityProfile = serde_json::from_value(row.profile)
        .with_context(|| format!("stored profile for {} is malformed", row.university_id))?;
    profile.updated_at = Some(row.updated_at);
    Ok(profile)
}

pub async fn get_university(pool: &PgPool, university_id: &str) -> Result<Option<UniversityProfile>> {
    let row = sqlx::query_as::<_, UniversityRow>(
        "SELECT * FROM universities WHERE university_id = $1",
    )
    .bind(university_id)
    .fetch_optional(pool)
    .await?;
    row.map(decode_row).transpose()
}

pub async fn delete_university(pool: &PgPool, university_id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM universities WHERE university_id = $1")
        .bind(university_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filters: &SearchFilters) {
    if let Some(state) = filters.normalized_state() {
        builder.push(" AND state = ").push_bind(state);
    }
    if let Some(kind) = filters.institution_type {
        builder
            .push(" AND institution_type = ")
            .push_bind(kind.as_str());
    }
    if let Some(min) = filters.min_acceptance_rate {
        builder.push(" AND acceptance_rate >= ").push_bind(min);
    }
    if let Some(max) = filters.max_acceptance_rate {
        builder.push(" AND acceptance_rate <= ").push_bind(max);
    }
}

pub async fn list_universities(
    pool: &PgPool,
    filters: &SearchFilters,
    limit: i64,
    offset: i64,
) -> Result<Vec<UniversitySummaryRow>> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT university_id, name, state, institution_type, acceptance_rate \
         FROM universities WHERE TRUE",
    );
    push_filters(&mut builder, filters);
    builder
        .push(" ORDER BY name ASC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    Ok(builder
        .build_query_as::<UniversitySummaryRow>()
        .fetch_all(pool)
        .await?)
}

pub async fn list_university_ids(pool: &PgPool) -> Result<Vec<String>> {
    Ok(
        sqlx::query_scalar("SELECT university_id FROM universities ORDER BY university_id")
            .fetch_all(pool)
            .await?,
    )
}

/// Filtered rows as ranking candidates, paired with their listing projection.
pub async fn load_candidates(
    pool: &PgPool,
    filters: &SearchFilters,
) -> Result<Vec<(Candidate, UniversitySummaryRow)>> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM universities WHERE TRUE");
    push_filters(&mut builder, filters);

    let rows = builder
        .build_query_as::<UniversityRow>()
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let summary = UniversitySummaryRow {
                university_id: row.university_id.clone(),
                name: row.name.clone(),
                state: row.state,
                institution_type: row.institution_type,
                acceptance_rate: row.acceptance_rate,
            };
            let candidate = Candidate {
                university_id: row.university_id,
                name: row.name,
                search_text: row.search_text,
                embedding: row.embedding,
            };
            (candidate, summary)
        })
        .collect())
}

/// Valid ids that look like a mistyped one, best first.
pub async fn suggest_university_ids(pool: &PgPool, requested: &str) -> Result<Vec<String>> {
    let known: Vec<(String, String)> =
        sqlx::query_as("SELECT university_id, name FROM universities")
            .fetch_all(pool)
            .await?;
    Ok(suggest_similar_ids(requested, &known, 3))
}

/// Ranks known `(id, name)` pairs by shared tokens with the requested id.
pub fn suggest_similar_ids(requested: &str, known: &[(String, String)], max: usize) -> Vec<String> {
    let wanted = tokenize(&requested.replace(['_', '-'], " "));
    if wanted.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, &str)> = known
        .iter()
        .filter_map(|(id, name)| {
            let mut tokens = tokenize(&id.replace('_', " "));
            tokens.extend(tokenize(name));
            let shared = wanted.iter().filter(|w| tokens.contains(w)).count();
            (shared > 0).then_some((shared, id.as_str()))
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored
        .into_iter()
        .take(max)
        .map(|(_, id)| id.to_string())
        .collect()
}
