//! Agent-facing tool surface.
//!
//! Each tool is a thin adapter over an existing service function, so the
//! agent and the REST routes always share one code path.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::errors::AppError;
use crate::fit::handlers::compute_fit;
use crate::knowledge::handlers::{
    list_universities, load_university, search_universities, ListUniversitiesQuery,
};
use crate::knowledge::repository::list_university_ids;
use crate::knowledge::search::SearchRequest;
use crate::profile::search::search_profile;
use crate::profile::{load_current_profile, validate_user_id};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    SearchUniversities,
    GetUniversity,
    ListUniversities,
    SearchUserProfile,
    CalculateCollegeFit,
    ListValidUniversityIds,
}

impl Tool {
    pub const ALL: [Tool; 6] = [
        Tool::SearchUniversities,
        Tool::GetUniversity,
        Tool::ListUniversities,
        Tool::SearchUserProfile,
        Tool::CalculateCollegeFit,
        Tool::ListValidUniversityIds,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Tool::SearchUniversities => "search_universities",
            Tool::GetUniversity => "get_university",
            Tool::ListUniversities => "list_universities",
            Tool::SearchUserProfile => "search_user_profile",
            Tool::CalculateCollegeFit => "calculate_college_fit",
            Tool::ListValidUniversityIds => "list_valid_university_ids",
        }
    }

    pub fn from_name(name: &str) -> Option<Tool> {
        Tool::ALL.into_iter().find(|t| t.name() == name)
    }

    fn description(self) -> &'static str {
        match self {
            Tool::SearchUniversities => {
                "Search the university knowledge base by free text with optional filters."
            }
            Tool::GetUniversity => "Fetch the full profile of one university by id.",
            Tool::ListUniversities => "List universities matching structured filters.",
            Tool::SearchUserProfile => {
                "Find lines of the student's stored profile relevant to a question."
            }
            Tool::CalculateCollegeFit => {
                "Score the student's fit at a university: category, percentage and factor breakdown."
            }
            Tool::ListValidUniversityIds => "Return every university id in the knowledge base.",
        }
    }

    fn parameters(self) -> Value {
        let filters = json!({
            "state": {"type": "string", "description": "Two-letter state code"},
            "institution_type": {"type": "string", "enum": ["public", "private"]},
            "min_acceptance_rate": {"type": "number", "minimum": 0, "maximum": 100},
            "max_acceptance_rate": {"type": "number", "minimum": 0, "maximum": 100}
        });
        match self {
            Tool::SearchUniversities => json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "search_type": {"type": "string", "enum": ["hybrid", "semantic", "keyword"]},
                    "filters": {"type": "object", "properties": filters},
                    "limit": {"type": "integer", "minimum": 1, "maximum": 50}
                },
                "required": ["query"]
            }),
            Tool::GetUniversity => json!({
                "type": "object",
                "properties": {"university_id": {"type": "string"}},
                "required": ["university_id"]
            }),
            Tool::ListUniversities => {
                let mut properties = filters;
                properties["limit"] = json!({"type": "integer", "minimum": 1});
                properties["offset"] = json!({"type": "integer", "minimum": 0});
                json!({"type": "object", "properties": properties})
            }
            Tool::SearchUserProfile => json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string"},
                    "query": {"type": "string"},
                    "limit": {"type": "integer", "minimum": 1, "maximum": 50}
                },
                "required": ["user_id", "query"]
            }),
            Tool::CalculateCollegeFit => json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string"},
                    "university_id": {"type": "string"},
                    "force_refresh": {"type": "boolean"}
                },
                "required": ["user_id", "university_id"]
            }),
            Tool::ListValidUniversityIds => json!({"type": "object", "properties": {}}),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

pub fn catalog() -> Vec<ToolSpec> {
    Tool::ALL
        .into_iter()
        .map(|tool| ToolSpec {
            name: tool.name(),
            description: tool.description(),
            parameters: tool.parameters(),
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct GetUniversityArgs {
    university_id: String,
}

#[derive(Debug, Deserialize)]
struct SearchUserProfileArgs {
    user_id: String,
    query: String,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct CalculateFitArgs {
    user_id: String,
    university_id: String,
    #[serde(default)]
    force_refresh: bool,
}

fn parse_args<T: DeserializeOwned>(tool: Tool, args: Value) -> Result<T, AppError> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args)
        .map_err(|e| AppError::Validation(format!("invalid arguments for {}: {e}", tool.name())))
}

fn to_value<T: Serialize>(value: T) -> Result<Value, AppError> {
    Ok(serde_json::to_value(value).map_err(anyhow::Error::from)?)
}

pub async fn dispatch(state: &AppState, tool: Tool, args: Value) -> Result<Value, AppError> {
    match tool {
        Tool::SearchUniversities => {
            let request: SearchRequest = parse_args(tool, args)?;
            to_value(search_universities(state, request).await?)
        }
        Tool::GetUniversity => {
            let args: GetUniversityArgs = parse_args(tool, args)?;
            to_value(load_university(state, &args.university_id).await?)
        }
        Tool::ListUniversities => {
            let query: ListUniversitiesQuery = parse_args(tool, args)?;
            to_value(list_universities(state, query).await?)
        }
        Tool::SearchUserProfile => {
            let args: SearchUserProfileArgs = parse_args(tool, args)?;
            validate_user_id(&args.user_id)?;
            let current = load_current_profile(&state.db, &args.user_id).await?;
            let hits = search_profile(
                &current.profile,
                &args.query,
                args.limit.unwrap_or(10).clamp(1, 50),
            )?;
            to_value(json!({ "profile_version": current.version, "hits": hits }))
        }
        Tool::CalculateCollegeFit => {
            let args: CalculateFitArgs = parse_args(tool, args)?;
            to_value(
                compute_fit(state, &args.user_id, &args.university_id, args.force_refresh).await?,
            )
        }
        Tool::ListValidUniversityIds => {
            let ids = list_university_ids(&state.db).await?;
            to_value(json!({ "count": ids.len(), "university_ids": ids }))
        }
    }
}

/// GET /api/v1/tools
pub async fn handle_list_tools() -> Json<Vec<ToolSpec>> {
    Json(catalog())
}

/// POST /api/v1/tools/:name
pub async fn handle_call_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(args): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let tool = Tool::from_name(&name)
        .ok_or_else(|| AppError::NotFound(format!("Unknown tool '{name}'")))?;
    info!("Tool call: {}", tool.name());
    let result = dispatch(&state, tool, args).await?;
    Ok(Json(json!({ "tool": tool.name(), "result": result })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lists_every_tool_once() {
        let names: Vec<&str> = catalog().iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "search_universities",
                "get_university",
                "list_universities",
                "search_user_profile",
                "calculate_college_fit",
                "list_valid_university_ids",
            ]
        );
        for spec in catalog() {
            assert_eq!(spec.parameters["type"], "object");
        }
    }

    #[test]
    fn test_tool_names_round_trip() {
        for tool in Tool::ALL {
            assert_eq!(Tool::from_name(tool.name()), Some(tool));
        }
        assert_eq!(Tool::from_name("book_flight"), None);
    }

    #[test]
    fn test_missing_required_argument_is_validation_error() {
        let err = parse_args::<CalculateFitArgs>(
            Tool::CalculateCollegeFit,
            json!({"user_id": "ada@example.com"}),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("university_id")));
    }

    #[test]
    fn test_null_arguments_treated_as_empty_object() {
        let query: ListUniversitiesQuery =
            parse_args(Tool::ListUniversities, Value::Null).unwrap();
        assert!(query.limit.is_none());
    }

    #[test]
    fn test_list_tool_schema_includes_paging() {
        let params = Tool::ListUniversities.parameters();
        assert!(params["properties"]["offset"].is_object());
        assert!(params["properties"]["state"].is_object());
    }
}
