pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::college_list::handlers as college_list;
use crate::fit::handlers as fit;
use crate::knowledge::handlers as knowledge;
use crate::profile::handlers as profile;
use crate::state::AppState;
use crate::tools;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Student profiles
        .route(
            "/api/v1/profiles/:user_id",
            get(profile::handle_get_profile)
                .put(profile::handle_put_profile)
                .patch(profile::handle_patch_profile)
                .delete(profile::handle_delete_profile),
        )
        .route(
            "/api/v1/profiles/:user_id/history",
            get(profile::handle_profile_history),
        )
        .route(
            "/api/v1/profiles/:user_id/versions/:v",
            get(profile::handle_get_profile_version),
        )
        .route(
            "/api/v1/profiles/:user_id/search",
            get(profile::handle_search_profile),
        )
        .route(
            "/api/v1/profiles/:user_id/documents",
            post(profile::handle_document_preview),
        )
        .route(
            "/api/v1/profiles/:user_id/documents/confirm",
            post(profile::handle_document_confirm),
        )
        // University knowledge base
        .route(
            "/api/v1/universities",
            get(knowledge::handle_list_universities).post(knowledge::handle_upsert_university),
        )
        .route(
            "/api/v1/universities/ids",
            get(knowledge::handle_list_university_ids),
        )
        .route(
            "/api/v1/universities/search",
            post(knowledge::handle_search_universities),
        )
        .route(
            "/api/v1/universities/:id",
            get(knowledge::handle_get_university).delete(knowledge::handle_delete_university),
        )
        // Fit
        .route("/api/v1/fit", post(fit::handle_fit))
        .route("/api/v1/fit/batch", post(fit::handle_batch_fit))
        // College list
        .route(
            "/api/v1/college-list/:user_id",
            get(college_list::handle_get_college_list).post(college_list::handle_add_college),
        )
        .route(
            "/api/v1/college-list/:user_id/:university_id",
            delete(college_list::handle_remove_college),
        )
        // Agent tools
        .route("/api/v1/tools", get(tools::handle_list_tools))
        .route("/api/v1/tools/:name", post(tools::handle_call_tool))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use aws_sdk_s3::config::{BehaviorVersion, Region};
    use axum::{
        body::{to_bytes, Body},
        http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{Config, EmbeddingConfig};
    use crate::fit::scoring::RubricFitScorer;
    use crate::knowledge::embedding::HashingEmbedder;
    use crate::llm_client::LlmClient;

    /// State whose backing services are never contacted by the paths under test.
    fn test_state() -> AppState {
        let config = Config {
            database_url: "postgres://localhost:1/counsel_test".to_string(),
            db_max_connections: 1,
            run_migrations: false,
            redis_url: "redis://127.0.0.1:1/".to_string(),
            fit_cache_ttl_secs: 60,
            s3_bucket: "profiles".to_string(),
            s3_endpoint: "http://localhost:9000".to_string(),
            s3_region: "us-east-1".to_string(),
            aws_access_key_id: "test".to_string(),
            aws_secret_access_key: "test".to_string(),
            anthropic_api_key: "sk-test".to_string(),
            embedding: EmbeddingConfig::default(),
            port: 0,
            rust_log: "info".to_string(),
        };
        let db = PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy(&config.database_url)
            .unwrap();
        let s3 = aws_sdk_s3::Client::from_conf(
            aws_sdk_s3::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .region(Region::new("us-east-1"))
                .build(),
        );
        AppState {
            db,
            redis: redis::Client::open(config.redis_url.clone()).unwrap(),
            s3,
            llm: LlmClient::new(config.anthropic_api_key.clone()).unwrap(),
            config,
            fit_scorer: Arc::new(RubricFitScorer::default()),
            embedder: Arc::new(HashingEmbedder::default()),
        }
    }

    async fn send(method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = build_router(test_state())
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "counsel-api");
    }

    #[tokio::test]
    async fn test_tool_catalog() {
        let (status, body) = send(Method::GET, "/api/v1/tools", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(6));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_found() {
        let (status, body) =
            send(Method::POST, "/api/v1/tools/book_flight", Some(json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_tool_with_bad_arguments_is_rejected() {
        let (status, body) = send(
            Method::POST,
            "/api/v1/tools/calculate_college_fit",
            Some(json!({"user_id": "ada@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_empty_search_query_rejected() {
        let (status, _) = send(
            Method::POST,
            "/api/v1/universities/search",
            Some(json!({"query": "   "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_profile_rejected_before_storage() {
        let (status, body) = send(
            Method::PUT,
            "/api/v1/profiles/ada@example.com",
            Some(json!({"profile": {"gpa": {"unweighted": 5.2}}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"]
            .as_str()
            .is_some_and(|m| m.contains("unweighted GPA")));
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let (status, _) = send(
            Method::POST,
            "/api/v1/fit/batch",
            Some(json!({"user_id": "ada@example.com", "university_ids": []})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_oversized_batch_rejected() {
        let ids: Vec<String> = (0..26).map(|i| format!("uni_{i}")).collect();
        let (status, body) = send(
            Method::POST,
            "/api/v1/fit/batch",
            Some(json!({"user_id": "ada@example.com", "university_ids": ids})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"]
            .as_str()
            .is_some_and(|m| m.contains("at most 25")));
    }

    #[tokio::test]
    async fn test_invalid_university_upsert_rejected() {
        let (status, _) = send(
            Method::POST,
            "/api/v1/universities",
            Some(json!({
                "university_id": "Not A Slug",
                "name": "Somewhere",
                "institution_type": "public",
                "acceptance_rate": 50.0,
                "early_acceptance_rate": null
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
