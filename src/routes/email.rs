use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    models::auth::AuthenticatedUser,
    routes::plans::require_owned_plan,
    services::{auth::AuthService, generator, plans::PlanService},
    AppState,
};

/// POST /meal-plans/{id}/email — mail the plan summary (meals + a freshly
/// generated grocery list) to the signed-in user.
pub async fn send_plan_email(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_owned_plan(&state, &user, id).await?;

    let email_svc = state.email.as_ref().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "error": "Email is not configured" })),
    ))?;

    let profile = AuthService::profile(&state.db, user.user_id)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?;

    let meals = PlanService::meals_for_plan(&state.db, id).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    let meal_names: Vec<String> = meals
        .iter()
        .filter(|meal| !meal.name.is_empty())
        .map(|meal| meal.name.clone())
        .collect();

    let grocery_list = generator::generate_grocery_list(state.completion.as_ref(), &meal_names)
        .await
        .map_err(|e| {
            tracing::error!("Grocery list generation failed for plan email: {e}");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "Could not generate grocery list" })),
            )
        })?;

    email_svc
        .send_meal_plan(&profile.email, profile.name.as_deref(), &meals, &grocery_list)
        .await
        .map(|_| Json(json!({ "success": true })))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}
