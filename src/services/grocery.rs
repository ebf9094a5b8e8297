use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::grocery::{GroceryCategories, GroceryListRow};
use crate::services::completion::CompletionApi;
use crate::services::generator::{self, GenerationError};
use crate::services::plans::PlanService;

#[derive(Debug, thiserror::Error)]
pub enum GroceryServiceError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for GroceryServiceError {
    fn from(e: sqlx::Error) -> Self {
        GroceryServiceError::Other(e.into())
    }
}

const LIST_COLUMNS: &str = "id, meal_plan_id, categories, is_edited, created_at, updated_at";

pub struct GroceryService;

impl GroceryService {
    /// Return the stored list for a plan, generating and storing one when
    /// none exists yet. Generation failures propagate — a grocery list is
    /// the requested resource here, not a decoration.
    pub async fn fetch_or_generate(
        pool: &PgPool,
        client: &dyn CompletionApi,
        plan_id: Uuid,
    ) -> Result<GroceryListRow, GroceryServiceError> {
        let existing: Option<GroceryListRow> = sqlx::query_as(&format!(
            "SELECT {LIST_COLUMNS} FROM grocery_lists WHERE meal_plan_id = $1"
        ))
        .bind(plan_id)
        .fetch_optional(pool)
        .await?;

        if let Some(list) = existing {
            return Ok(list);
        }

        Self::generate_and_store(pool, client, plan_id).await
    }

    /// Regenerate the list from the plan's current meals, replacing whatever
    /// is stored and clearing the edited flag.
    pub async fn regenerate(
        pool: &PgPool,
        client: &dyn CompletionApi,
        plan_id: Uuid,
    ) -> Result<GroceryListRow, GroceryServiceError> {
        Self::generate_and_store(pool, client, plan_id).await
    }

    async fn generate_and_store(
        pool: &PgPool,
        client: &dyn CompletionApi,
        plan_id: Uuid,
    ) -> Result<GroceryListRow, GroceryServiceError> {
        let meal_names: Vec<String> = PlanService::meals_for_plan(pool, plan_id)
            .await?
            .into_iter()
            .map(|meal| meal.name)
            .filter(|name| !name.is_empty())
            .collect();

        let list = generator::generate_grocery_list(client, &meal_names).await?;

        let row = sqlx::query_as(&format!(
            "INSERT INTO grocery_lists (meal_plan_id, categories)
             VALUES ($1, $2)
             ON CONFLICT (meal_plan_id) DO UPDATE SET
                 categories = EXCLUDED.categories,
                 is_edited = FALSE,
                 updated_at = NOW()
             RETURNING {LIST_COLUMNS}"
        ))
        .bind(plan_id)
        .bind(Json(&list.categories))
        .fetch_one(pool)
        .await?;

        Ok(row)
    }

    /// Replace the list contents with a user edit.
    pub async fn update(
        pool: &PgPool,
        plan_id: Uuid,
        categories: &GroceryCategories,
    ) -> Result<Option<GroceryListRow>, GroceryServiceError> {
        let row = sqlx::query_as(&format!(
            "UPDATE grocery_lists SET
                 categories = $1,
                 is_edited = TRUE,
                 updated_at = NOW()
             WHERE meal_plan_id = $2
             RETURNING {LIST_COLUMNS}"
        ))
        .bind(Json(categories))
        .bind(plan_id)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }
}
