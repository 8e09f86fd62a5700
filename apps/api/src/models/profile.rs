use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudentProfileRow {
    pub id: Uuid,
    pub user_id: String,
    pub version: i32,
    pub profile: Value,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProfileSnapshotRow {
    pub id: Uuid,
    pub user_id: String,
    pub version: i32,
    pub s3_key: String,
    pub created_at: DateTime<Utc>,
}
