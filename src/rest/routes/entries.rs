// rest/routes/entries.rs — time-entry CRUD.
//
// Every project-scoped operation passes the ownership guard first; a project
// that exists but belongs to someone else is indistinguishable from one that
// does not exist.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::storage::{EntryScope, TimeEntryRow};
use crate::AppContext;

#[derive(Deserialize)]
pub struct ListEntriesParams {
    #[serde(rename = "projectId")]
    pub project_id: Option<String>,
}

pub async fn list(
    State(ctx): State<Arc<AppContext>>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<ListEntriesParams>,
) -> Result<Json<Vec<TimeEntryRow>>, ApiError> {
    let scope = match params.project_id.filter(|s| !s.is_empty()) {
        Some(project_id) => {
            ctx.storage
                .project_owned(&user.id, &project_id)
                .await?
                .ok_or(ApiError::NotFound("Project"))?;
            EntryScope::Project(project_id)
        }
        None => EntryScope::All,
    };

    Ok(Json(ctx.storage.list_entries(&user.id, &scope).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntryRequest {
    pub project_id: Option<String>,
    pub date: Option<String>,
    /// Accepted as a JSON number or a numeric string — the original web
    /// client sends both.
    pub hours: Option<Value>,
    pub description: Option<String>,
}

fn parse_hours(raw: Option<&Value>) -> Option<f64> {
    match raw? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

pub async fn create(
    State(ctx): State<Arc<AppContext>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<CreateEntryRequest>,
) -> Result<(StatusCode, Json<TimeEntryRow>), ApiError> {
    let project_id = body.project_id.as_deref().unwrap_or("").trim().to_string();
    let date = body.date.as_deref().unwrap_or("").trim().to_string();
    if project_id.is_empty() || date.is_empty() || body.hours.is_none() {
        return Err(ApiError::Validation(
            "projectId, date, and hours are required".to_string(),
        ));
    }

    let hours = parse_hours(body.hours.as_ref())
        .filter(|h| h.is_finite() && *h > 0.0)
        .ok_or_else(|| ApiError::Validation("Hours must be a positive number".to_string()))?;

    ctx.storage
        .project_owned(&user.id, &project_id)
        .await?
        .ok_or(ApiError::NotFound("Project"))?;

    let description = body
        .description
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let entry = ctx
        .storage
        .create_entry(&user.id, &project_id, &date, hours, description)
        .await?;
    info!(user_id = %user.id, project_id = %project_id, entry_id = %entry.id, hours, "time entry created");
    Ok((StatusCode::CREATED, Json(entry)))
}

#[derive(Deserialize)]
pub struct DeleteEntryParams {
    pub id: Option<String>,
}

pub async fn delete(
    State(ctx): State<Arc<AppContext>>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<DeleteEntryParams>,
) -> Result<Json<Value>, ApiError> {
    let id = params
        .id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("Time entry ID is required".to_string()))?;

    if ctx.storage.delete_entry(&user.id, &id).await? {
        info!(user_id = %user.id, entry_id = %id, "time entry deleted");
        Ok(Json(json!({ "success": true })))
    } else {
        Err(ApiError::NotFound("Time entry"))
    }
}
