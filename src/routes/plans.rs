use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    models::{
        auth::AuthenticatedUser,
        plan::{MealPlan, PlanListQuery, UpdateMealRequest},
    },
    services::{auth::AuthService, plans::PlanService},
    AppState,
};

fn internal_error(e: impl std::fmt::Display) -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
    )
}

/// Fetch the plan and verify it belongs to the caller's account.
pub(crate) async fn require_owned_plan(
    state: &AppState,
    user: &AuthenticatedUser,
    plan_id: Uuid,
) -> Result<MealPlan, (StatusCode, Json<Value>)> {
    PlanService::get_owned(&state.db, plan_id, user.account_id)
        .await
        .map_err(internal_error)?
        .ok_or((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Meal plan not found" })),
        ))
}

pub async fn list_plans(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<PlanListQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    PlanService::list(&state.db, user.account_id, user.user_id, params.cursor)
        .await
        .map(|page| Json(serde_json::to_value(page).unwrap()))
        .map_err(internal_error)
}

pub async fn create_plan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let profile = AuthService::profile(&state.db, user.user_id)
        .await
        .map_err(internal_error)?;

    PlanService::create(
        &state.db,
        state.completion.as_ref(),
        user.account_id,
        user.user_id,
        profile.language,
    )
    .await
    .map(|plan| (StatusCode::CREATED, Json(serde_json::to_value(plan).unwrap())))
    .map_err(internal_error)
}

pub async fn update_meal(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateMealRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_owned_plan(&state, &user, id).await?;

    PlanService::upsert_meal(&state.db, id, &body)
        .await
        .map(|meal| Json(serde_json::to_value(meal).unwrap()))
        .map_err(internal_error)
}

pub async fn delete_plan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_owned_plan(&state, &user, id).await?;

    PlanService::delete(&state.db, id)
        .await
        .map(|_| Json(json!({ "success": true })))
        .map_err(internal_error)
}
