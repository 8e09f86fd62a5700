use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;

use crate::models::college_list::CollegeListRow;

pub async fn list_entries(pool: &PgPool, user_id: &str) -> Result<Vec<CollegeListRow>> {
    Ok(sqlx::query_as::<_, CollegeListRow>(
        r#"
        SELECT c.user_id, c.university_id, u.name AS university_name, c.notes, c.added_at
        FROM college_list c
        JOIN universities u ON u.university_id = c.university_id
        WHERE c.user_id = $1
        ORDER BY c.added_at ASC, c.university_id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

/// Adds an entry. Returns `None` when the university is already on the list.
pub async fn add_entry(
    pool: &PgPool,
    user_id: &str,
    university_id: &str,
    notes: Option<&str>,
) -> Result<Option<DateTime<Utc>>> {
    let added_at: Option<DateTime<Utc>> = sqlx::query_scalar(
        r#"
        INSERT INTO college_list (user_id, university_id, notes)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, university_id) DO NOTHING
        RETURNING added_at
        "#,
    )
    .bind(user_id)
    .bind(university_id)
    .bind(notes)
    .fetch_optional(pool)
    .await?;

    if added_at.is_some() {
        info!("Added {university_id} to college list of {user_id}");
    }
    Ok(added_at)
}

pub async fn remove_entry(pool: &PgPool, user_id: &str, university_id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM college_list WHERE user_id = $1 AND university_id = $2")
        .bind(user_id)
        .bind(university_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
