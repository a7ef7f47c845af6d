// rest/routes/projects.rs — project CRUD, scoped to the session user.

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
use crate::storage::ProjectRow;
use crate::AppContext;

pub async fn list(
    State(ctx): State<Arc<AppContext>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<ProjectRow>>, ApiError> {
    Ok(Json(ctx.storage.list_projects(&user.id).await?))
}

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    pub name: Option<String>,
}

pub async fn create(
    State(ctx): State<Arc<AppContext>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectRow>), ApiError> {
    let name = body.name.as_deref().unwrap_or("").trim().to_string();
    if name.is_empty() {
        return Err(ApiError::Validation("Project name is required".to_string()));
    }

    let project = ctx.storage.create_project(&user.id, &name).await?;
    info!(user_id = %user.id, project_id = %project.id, "project created");
    Ok((StatusCode::CREATED, Json(project)))
}

#[derive(Deserialize)]
pub struct DeleteProjectParams {
    pub id: Option<String>,
}

pub async fn delete(
    State(ctx): State<Arc<AppContext>>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<DeleteProjectParams>,
) -> Result<Json<Value>, ApiError> {
    let id = params
        .id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("Project ID is required".to_string()))?;

    // Ownership guard + cascade run inside one transaction in the store.
    if ctx.storage.delete_project(&user.id, &id).await? {
        info!(user_id = %user.id, project_id = %id, "project deleted");
        Ok(Json(json!({ "success": true })))
    } else {
        Err(ApiError::NotFound("Project"))
    }
}
