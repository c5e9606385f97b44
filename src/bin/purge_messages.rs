// Out-of-band maintenance: wipe the messages table. Not reachable from the
// service itself; run by an operator when a full purge is required.
use anyhow::Context;
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .context("failed to connect to the database")?;

    let result = sqlx::query("DELETE FROM messages")
        .execute(&pool)
        .await
        .context("failed to delete messages")?;

    println!("🧹 Deleted {} message(s)", result.rows_affected());

    Ok(())
}
