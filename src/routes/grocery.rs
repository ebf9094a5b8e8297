use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    models::{auth::AuthenticatedUser, grocery::UpdateGroceryListRequest},
    routes::plans::require_owned_plan,
    services::grocery::{GroceryService, GroceryServiceError},
    AppState,
};

fn grocery_error(e: GroceryServiceError) -> (StatusCode, Json<Value>) {
    match e {
        GroceryServiceError::Generation(err) => {
            tracing::error!("Grocery list generation failed: {err}");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "Could not generate grocery list" })),
            )
        }
        GroceryServiceError::Other(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": err.to_string() })),
        ),
    }
}

pub async fn get_grocery_list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_owned_plan(&state, &user, id).await?;

    GroceryService::fetch_or_generate(&state.db, state.completion.as_ref(), id)
        .await
        .map(|list| Json(serde_json::to_value(list).unwrap()))
        .map_err(grocery_error)
}

pub async fn regenerate_grocery_list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_owned_plan(&state, &user, id).await?;

    GroceryService::regenerate(&state.db, state.completion.as_ref(), id)
        .await
        .map(|list| Json(serde_json::to_value(list).unwrap()))
        .map_err(grocery_error)
}

pub async fn update_grocery_list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateGroceryListRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_owned_plan(&state, &user, id).await?;

    GroceryService::update(&state.db, id, &body.categories)
        .await
        .map_err(grocery_error)?
        .map(|list| Json(serde_json::to_value(list).unwrap()))
        .ok_or((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Grocery list not found" })),
        ))
}
