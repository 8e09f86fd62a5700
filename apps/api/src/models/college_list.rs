use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// College-list entry joined with the university display name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CollegeListRow {
    pub user_id: String,
    pub university_id: String,
    pub university_name: String,
    pub notes: Option<String>,
    pub added_at: DateTime<Utc>,
}
