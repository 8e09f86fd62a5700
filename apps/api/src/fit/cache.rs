//! Redis cache for fit results.
//!
//! Keys embed the profile row id and the university's `updated_at` to the
//! microsecond, so an edit on either side produces a new key and stale entries
//! simply expire. Row ids are not reused when a profile is deleted and started
//! over at v1. Cache failures are logged and treated as misses.

use anyhow::Result;
use chrono::{DateTime, Utc};
use redis::Client as RedisClient;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::fit::scoring::FitResult;

pub fn cache_key(
    user_id: &str,
    profile_version: i32,
    profile_row_id: Uuid,
    university_id: &str,
    university_updated_at: Option<DateTime<Utc>>,
) -> String {
    let stamp = university_updated_at
        .map(|t| t.timestamp_micros())
        .unwrap_or(0);
    format!("fit:{user_id}:v{profile_version}:{profile_row_id}:{university_id}:{stamp}")
}

async fn read(redis: &RedisClient, key: &str) -> Result<Option<FitResult>> {
    let mut conn = redis.get_multiplexed_async_connection().await?;
    let raw: Option<String> = redis::cmd("GET")
        .arg(key)
        .query_async(&mut conn)
        .await?;
    Ok(match raw {
        Some(json) => Some(serde_json::from_str(&json)?),
        None => None,
    })
}

async fn write(redis: &RedisClient, key: &str, fit: &FitResult, ttl_secs: u64) -> Result<()> {
    let json = serde_json::to_string(fit)?;
    let mut conn = redis.get_multiplexed_async_connection().await?;
    redis::cmd("SET")
        .arg(key)
        .arg(json)
        .arg("EX")
        .arg(ttl_secs)
        .query_async::<_, ()>(&mut conn)
        .await?;
    Ok(())
}

pub async fn get_cached_fit(redis: &RedisClient, key: &str) -> Option<FitResult> {
    match read(redis, key).await {
        Ok(hit) => {
            debug!("Fit cache {} for {key}", if hit.is_some() { "hit" } else { "miss" });
            hit
        }
        Err(e) => {
            warn!("Fit cache read failed for {key}: {e:#}");
            None
        }
    }
}

pub async fn store_fit(redis: &RedisClient, key: &str, fit: &FitResult, ttl_secs: u64) {
    if ttl_secs == 0 {
        return;
    }
    if let Err(e) = write(redis, key, fit, ttl_secs).await {
        warn!("Fit cache write failed for {key}: {e:#}");
    }
}
