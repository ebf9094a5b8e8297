use sqlx::PgPool;
use uuid::Uuid;

use crate::models::plan::{
    MealPlan, MealPlanWithMeals, MealRow, PastMealRecord, PlanPage, UpdateMealRequest, WeeklyPlan,
};
use crate::models::user::Language;
use crate::services::completion::CompletionApi;
use crate::services::generator::{self, GenerationError};

const PAGE_SIZE: i64 = 5;
const PLAN_COLUMNS: &str = "id, account_id, created_by_id, created_at, updated_at";
const MEAL_COLUMNS: &str =
    "id, meal_plan_id, day, meal_type, name, description, created_at, updated_at";

pub struct PlanService;

impl PlanService {
    /// Page of plans (with their meals) for an account, oldest first. An
    /// account with no plans gets one default empty plan created on first
    /// read, so the client always has something to render.
    pub async fn list(
        pool: &PgPool,
        account_id: Uuid,
        user_id: Uuid,
        cursor: Option<i64>,
    ) -> anyhow::Result<PlanPage> {
        let offset = cursor.unwrap_or(0).max(0);

        let mut plans: Vec<MealPlan> = sqlx::query_as(&format!(
            "SELECT {PLAN_COLUMNS} FROM meal_plans
             WHERE account_id = $1
             ORDER BY created_at ASC
             LIMIT $2 OFFSET $3"
        ))
        .bind(account_id)
        .bind(PAGE_SIZE + 1)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        if plans.is_empty() && offset == 0 {
            let default_plan =
                Self::insert_plan(pool, account_id, user_id, &WeeklyPlan::empty()).await?;
            return Ok(PlanPage {
                items: vec![default_plan],
                next_cursor: None,
            });
        }

        let has_more = plans.len() as i64 > PAGE_SIZE;
        if has_more {
            plans.truncate(PAGE_SIZE as usize);
        }

        let mut items = Vec::with_capacity(plans.len());
        for plan in plans {
            let meals = Self::meals_for_plan(pool, plan.id).await?;
            items.push(MealPlanWithMeals::new(plan, meals));
        }

        Ok(PlanPage {
            items,
            next_cursor: has_more.then_some(offset + PAGE_SIZE),
        })
    }

    /// Create a plan, filled by the weekly generator. Generation failures are
    /// downgraded to the all-empty plan — creating a plan never hard-fails on
    /// the completion service.
    pub async fn create(
        pool: &PgPool,
        client: &dyn CompletionApi,
        account_id: Uuid,
        user_id: Uuid,
        language: Language,
    ) -> anyhow::Result<MealPlanWithMeals> {
        let past_meals = Self::recent_meals(pool, account_id).await?;
        let plan = Self::generated_or_empty(
            generator::generate_weekly_plan(client, &past_meals, language).await,
        );
        Self::insert_plan(pool, account_id, user_id, &plan).await
    }

    fn generated_or_empty(result: Result<WeeklyPlan, GenerationError>) -> WeeklyPlan {
        match result {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!("Weekly plan generation failed, creating empty plan: {e}");
                WeeklyPlan::empty()
            }
        }
    }

    async fn insert_plan(
        pool: &PgPool,
        account_id: Uuid,
        user_id: Uuid,
        week: &WeeklyPlan,
    ) -> anyhow::Result<MealPlanWithMeals> {
        let plan: MealPlan = sqlx::query_as(&format!(
            "INSERT INTO meal_plans (account_id, created_by_id)
             VALUES ($1, $2)
             RETURNING {PLAN_COLUMNS}"
        ))
        .bind(account_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        let mut meals = Vec::with_capacity(14);
        for (day, slot, meal) in week.slots() {
            let row: MealRow = sqlx::query_as(&format!(
                "INSERT INTO meals (meal_plan_id, day, meal_type, name, description)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING {MEAL_COLUMNS}"
            ))
            .bind(plan.id)
            .bind(day.to_string())
            .bind(slot.to_string())
            .bind(&meal.name)
            .bind(&meal.description)
            .fetch_one(pool)
            .await?;
            meals.push(row);
        }

        Ok(MealPlanWithMeals::new(plan, meals))
    }

    /// Fetch a plan only if it belongs to the given account.
    pub async fn get_owned(
        pool: &PgPool,
        plan_id: Uuid,
        account_id: Uuid,
    ) -> anyhow::Result<Option<MealPlan>> {
        let plan = sqlx::query_as(&format!(
            "SELECT {PLAN_COLUMNS} FROM meal_plans WHERE id = $1 AND account_id = $2"
        ))
        .bind(plan_id)
        .bind(account_id)
        .fetch_optional(pool)
        .await?;
        Ok(plan)
    }

    pub async fn meals_for_plan(pool: &PgPool, plan_id: Uuid) -> anyhow::Result<Vec<MealRow>> {
        let meals = sqlx::query_as(&format!(
            "SELECT {MEAL_COLUMNS} FROM meals
             WHERE meal_plan_id = $1
             ORDER BY array_position(
                 ARRAY['monday','tuesday','wednesday','thursday','friday','saturday','sunday'],
                 day
             ), meal_type"
        ))
        .bind(plan_id)
        .fetch_all(pool)
        .await?;
        Ok(meals)
    }

    /// Upsert one meal slot (unique on plan + day + meal type).
    pub async fn upsert_meal(
        pool: &PgPool,
        plan_id: Uuid,
        req: &UpdateMealRequest,
    ) -> anyhow::Result<MealRow> {
        let row = sqlx::query_as(&format!(
            "INSERT INTO meals (meal_plan_id, day, meal_type, name)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (meal_plan_id, day, meal_type) DO UPDATE SET
                 name = EXCLUDED.name,
                 updated_at = NOW()
             RETURNING {MEAL_COLUMNS}"
        ))
        .bind(plan_id)
        .bind(req.day.to_string())
        .bind(req.meal_type.to_string())
        .bind(&req.name)
        .fetch_one(pool)
        .await?;
        Ok(row)
    }

    /// Delete a plan; meals and grocery list go with it (cascade).
    pub async fn delete(pool: &PgPool, plan_id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM meal_plans WHERE id = $1")
            .bind(plan_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The account's 10 most recent named meals — prompt context for the
    /// weekly generator.
    pub async fn recent_meals(
        pool: &PgPool,
        account_id: Uuid,
    ) -> anyhow::Result<Vec<PastMealRecord>> {
        let meals = sqlx::query_as(
            "SELECT m.name, m.day, m.meal_type, m.created_at
             FROM meals m
             JOIN meal_plans p ON p.id = m.meal_plan_id
             WHERE p.account_id = $1 AND m.name <> ''
             ORDER BY m.created_at DESC
             LIMIT 10",
        )
        .bind(account_id)
        .fetch_all(pool)
        .await?;
        Ok(meals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::completion::CompletionError;

    #[test]
    fn generation_failure_falls_back_to_all_empty_names() {
        let plan = PlanService::generated_or_empty(Err(GenerationError::ServiceUnavailable(
            CompletionError::MissingApiKey,
        )));
        let names: Vec<&str> = plan.slots().map(|(_, _, meal)| meal.name.as_str()).collect();
        assert_eq!(names.len(), 14);
        assert!(names.iter().all(|name| name.is_empty()));
    }

    #[test]
    fn successful_generation_is_kept_as_is() {
        let mut plan = WeeklyPlan::empty();
        plan.monday.lunch.name = "Pasta e ceci".to_string();
        let kept = PlanService::generated_or_empty(Ok(plan.clone()));
        assert_eq!(kept, plan);
    }
}
