//! Demo account seed script
//!
//! Seeds a demo household with realistic data:
//! - Account: Demo's Family
//! - 1 user: demo@mealmind.app (Italian prompt language)
//! - 1 meal plan with a full week of Italian meals
//! - A grocery list for that plan
//!
//! Usage:
//!   DATABASE_URL=... DEMO_PASSWORD=Demo2024! ./seed-demo
//!
//! Environment variables:
//!   DATABASE_URL   — PostgreSQL connection string (required)
//!   DEMO_PASSWORD  — Password for the demo account (default: Demo2024!)

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use std::env;
use uuid::Uuid;

use mealmind_api::models::grocery::{GroceryCategories, GroceryItem, GROCERY_CATEGORIES};

const DEMO_EMAIL: &str = "demo@mealmind.app";

const DEMO_WEEK: [(&str, &str, &str); 14] = [
    ("monday", "lunch", "Pasta ricotta e spinaci"),
    ("monday", "dinner", "Orata al forno con patate"),
    ("tuesday", "lunch", "Insalata di lenticchie con pomodorini e pane"),
    ("tuesday", "dinner", "Petto di pollo ai ferri con zucchine"),
    ("wednesday", "lunch", "Couscous con ceci e verdure"),
    ("wednesday", "dinner", "Frittata di zucchine con pane"),
    ("thursday", "lunch", "Riso basmati con fagiolini e robiola"),
    ("thursday", "dinner", "Merluzzo al vapore con carote e patate"),
    ("friday", "lunch", "Pasta e fagioli"),
    ("friday", "dinner", "Mozzarella con pomodori e pane"),
    ("saturday", "lunch", "Farro con verdure di stagione"),
    ("saturday", "dinner", "Tacchino in padella con finocchi"),
    ("sunday", "lunch", "Pasta al pomodoro con ricotta salata"),
    ("sunday", "dinner", "Zuppa di legumi con crostini di pane"),
];

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let database_url = env::var("DATABASE_URL").context("DATABASE_URL required")?;
    let demo_password = env::var("DEMO_PASSWORD").unwrap_or_else(|_| "Demo2024!".to_string());

    println!("=== Seed Demo Account ===");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    // 1. Clean the existing demo account
    println!("Cleaning existing demo account...");
    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT account_id FROM users WHERE email = $1")
            .bind(DEMO_EMAIL)
            .fetch_optional(&pool)
            .await?;
    if let Some((account_id,)) = existing {
        sqlx::query("DELETE FROM meal_plans WHERE account_id = $1")
            .bind(account_id)
            .execute(&pool)
            .await?;
        sqlx::query("DELETE FROM users WHERE account_id = $1")
            .bind(account_id)
            .execute(&pool)
            .await?;
        sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(account_id)
            .execute(&pool)
            .await?;
    }

    // 2. Account + user (bcrypt cost 10 for seed speed)
    println!("Creating account and user...");
    let password_hash = bcrypt::hash(&demo_password, 10).context("Failed to hash password")?;

    let (account_id,): (Uuid,) =
        sqlx::query_as("INSERT INTO accounts (name) VALUES ('Demo''s Family') RETURNING id")
            .fetch_one(&pool)
            .await?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO users (account_id, email, name, password_hash, language)
         VALUES ($1, $2, 'Demo', $3, 'it')
         RETURNING id",
    )
    .bind(account_id)
    .bind(DEMO_EMAIL)
    .bind(&password_hash)
    .fetch_one(&pool)
    .await?;

    // 3. One populated meal plan
    println!("Creating meal plan...");
    let (plan_id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO meal_plans (account_id, created_by_id) VALUES ($1, $2) RETURNING id",
    )
    .bind(account_id)
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    for (day, meal_type, name) in DEMO_WEEK {
        sqlx::query(
            "INSERT INTO meals (meal_plan_id, day, meal_type, name) VALUES ($1, $2, $3, $4)",
        )
        .bind(plan_id)
        .bind(day)
        .bind(meal_type)
        .bind(name)
        .execute(&pool)
        .await?;
    }

    // 4. Grocery list for the plan
    println!("Creating grocery list...");
    let mut categories = GroceryCategories::new();
    for category in GROCERY_CATEGORIES {
        categories.insert(category.to_string(), Vec::new());
    }
    categories.insert(
        "Verdura (Vegetables)".to_string(),
        vec![
            item("Spinaci (Spinach)", Some("500g"), None),
            item("Zucchine (Zucchini)", Some("6 pezzi"), None),
            item("Pomodorini (Cherry tomatoes)", Some("400g"), Some("maturi")),
            item("Finocchi (Fennel)", Some("2 pezzi"), None),
        ],
    );
    categories.insert(
        "Carne e Pesce (Meat and Fish)".to_string(),
        vec![
            item("Petto di pollo (Chicken breast)", Some("600g"), None),
            item("Orata (Sea bream)", Some("2 pezzi"), Some("fresca")),
            item("Merluzzo (Cod)", Some("400g"), None),
        ],
    );
    categories.insert(
        "Latticini (Dairy)".to_string(),
        vec![
            item("Ricotta", Some("250g"), None),
            item("Mozzarella", Some("2 pezzi"), None),
        ],
    );
    categories.insert(
        "Dispensa (Pantry)".to_string(),
        vec![
            item("Pasta", Some("1kg"), None),
            item("Lenticchie secche (Dried lentils)", Some("500g"), None),
            item("Couscous", Some("500g"), None),
            item("Farro", Some("500g"), None),
        ],
    );

    sqlx::query("INSERT INTO grocery_lists (meal_plan_id, categories) VALUES ($1, $2)")
        .bind(plan_id)
        .bind(Json(&categories))
        .execute(&pool)
        .await?;

    println!("Done. Login: {DEMO_EMAIL} / {demo_password}");
    Ok(())
}

fn item(name: &str, quantity: Option<&str>, note: Option<&str>) -> GroceryItem {
    GroceryItem {
        item: name.to_string(),
        quantity: quantity.map(str::to_string),
        note: note.map(str::to_string),
    }
}
