/// Purge stale data: expired/revoked refresh tokens and, optionally, old
/// meal plans beyond a per-account retention count.
/// Run daily (e.g., via cron job: 0 2 * * * /app/purge-data --keep-latest 20)
///
/// Usage: purge-data [--keep-latest N]
///   --keep-latest N : also delete all but the N newest plans per account

use clap::Parser;

use sqlx::postgres::PgPoolOptions;

#[derive(Parser)]
#[command(name = "purge-data", about = "Purge stale data from the MealMind database")]
struct Args {
    /// Keep only the N newest meal plans per account (optional)
    #[arg(long)]
    keep_latest: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL environment variable not set");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    tracing::info!("Starting data purge job...");

    let tokens = sqlx::query(
        "DELETE FROM refresh_tokens WHERE revoked = TRUE OR expires_at < NOW()",
    )
    .execute(&pool)
    .await?;
    tracing::info!("Deleted {} stale refresh tokens", tokens.rows_affected());

    if let Some(keep) = args.keep_latest {
        let plans = sqlx::query(
            "DELETE FROM meal_plans WHERE id IN (
                 SELECT id FROM (
                     SELECT id,
                            ROW_NUMBER() OVER (
                                PARTITION BY account_id ORDER BY created_at DESC
                            ) AS rn
                     FROM meal_plans
                 ) ranked
                 WHERE rn > $1
             )",
        )
        .bind(keep)
        .execute(&pool)
        .await?;
        tracing::info!(
            "Deleted {} meal plans beyond the {} newest per account",
            plans.rows_affected(),
            keep
        );
    }

    tracing::info!("Data purge job completed");
    Ok(())
}
