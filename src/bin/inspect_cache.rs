use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqlitePoolOptions;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let dataset = args.get(1);

    let database_url = "sqlite://steelworks.db";
    let pool = SqlitePoolOptions::new()
        .connect(database_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to cache database: {}", e))?;

    let Some(dataset) = dataset else {
        let rows = sqlx::query(
            "SELECT dataset, fetched_at, length(payload) AS bytes FROM list_cache ORDER BY dataset",
        )
        .fetch_all(&pool)
        .await?;

        if rows.is_empty() {
            println!("Cache is empty.");
        }
        let now = Utc::now();
        for row in rows {
            let name: String = row.get("dataset");
            let fetched_at: i64 = row.get("fetched_at");
            let bytes: i64 = row.get("bytes");
            let age = DateTime::from_timestamp_millis(fetched_at)
                .map(|t| format!("{}s ago", (now - t).num_seconds()))
                .unwrap_or_else(|| "unknown".to_string());
            println!("{:<16} {:>8} bytes  fetched {}", name, bytes, age);
        }
        println!();
        println!("Usage: {} [dataset]  dumps one cached payload", args[0]);
        return Ok(());
    };

    let row = sqlx::query("SELECT payload FROM list_cache WHERE dataset = ?")
        .bind(dataset)
        .fetch_optional(&pool)
        .await?;

    match row {
        Some(row) => {
            let payload: String = row.get("payload");
            match serde_json::from_str::<serde_json::Value>(&payload) {
                Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                Err(_) => println!("{}", payload),
            }
        }
        None => println!("No cached entry for '{}'", dataset),
    }

    Ok(())
}
