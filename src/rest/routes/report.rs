// rest/routes/report.rs — aggregated per-project totals for the chart/report.

use axum::{extract::State, Extension, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::report;
use crate::storage::EntryScope;
use crate::AppContext;

pub async fn summary(
    State(ctx): State<Arc<AppContext>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Value>, ApiError> {
    let projects = ctx.storage.list_projects(&user.id).await?;
    let entries = ctx.storage.list_entries(&user.id, &EntryScope::All).await?;

    let totals = report::per_project_totals(&projects, &entries);
    let slices = report::chart_slices(&projects, &totals);

    Ok(Json(json!({
        "totalHours": report::total_hours(&entries),
        "projects": slices,
    })))
}
