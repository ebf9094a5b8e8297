use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// The six categories every generated list carries, even when empty. The
/// bilingual key strings are part of the stored format.
pub const GROCERY_CATEGORIES: [&str; 6] = [
    "Verdura (Vegetables)",
    "Frutta (Fruit)",
    "Carne e Pesce (Meat and Fish)",
    "Latticini (Dairy)",
    "Dispensa (Pantry)",
    "Erbe e Spezie (Herbs and Spices)",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroceryItem {
    pub item: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

pub type GroceryCategories = BTreeMap<String, Vec<GroceryItem>>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroceryList {
    pub categories: GroceryCategories,
}

impl GroceryList {
    /// Adds any missing fixed category as an empty section so consumers can
    /// rely on all six keys being present.
    pub fn normalize(mut self) -> Self {
        for category in GROCERY_CATEGORIES {
            self.categories.entry(category.to_string()).or_default();
        }
        self
    }
}

/// Stored grocery list, one per meal plan. `is_edited` marks lists the user
/// has touched, so regeneration is never done silently over their edits.
#[derive(Debug, Serialize, FromRow)]
pub struct GroceryListRow {
    pub id: Uuid,
    pub meal_plan_id: Uuid,
    pub categories: Json<GroceryCategories>,
    pub is_edited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body for PATCH /meal-plans/{id}/grocery-list.
#[derive(Debug, Deserialize)]
pub struct UpdateGroceryListRequest {
    pub categories: GroceryCategories,
}
