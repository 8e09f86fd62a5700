use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// Stored knowledge-base row. `profile` holds the full `UniversityProfile` JSON;
/// the scalar columns exist for SQL-side filtering.
#[derive(Debug, Clone, FromRow)]
pub struct UniversityRow {
    pub university_id: String,
    pub name: String,
    pub state: Option<String>,
    pub institution_type: String,
    pub acceptance_rate: Option<f64>,
    pub profile: Value,
    pub search_text: String,
    pub embedding: Vec<f32>,
    pub updated_at: DateTime<Utc>,
}

/// Listing projection used by `list_universities` and search results.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UniversitySummaryRow {
    pub university_id: String,
    pub name: String,
    pub state: Option<String>,
    pub institution_type: String,
    pub acceptance_rate: Option<f64>,
}
