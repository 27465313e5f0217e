use anyhow::Context;
use mongodb::{Client, Database};

use crate::config::AppConfig;

pub async fn get_db_client(config: &AppConfig) -> anyhow::Result<Database> {
    let client = Client::with_uri_str(&config.database_url)
        .await
        .context("Failed to connect to MongoDB")?;

    let db = client.database(&config.database_name);

    // Verify the database is reachable before serving traffic
    match db.list_collection_names().await {
        Ok(collections) => {
            tracing::info!("✅ Connected to database: {}", config.database_name);
            if !collections.contains(&"matches".to_string()) {
                tracing::warn!(
                    "'matches' collection not found yet, it will be created on first insert"
                );
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ Database '{}' is inaccessible: {}",
                config.database_name,
                e
            );
            return Err(e).context("MongoDB ping failed");
        }
    }

    Ok(db)
}
