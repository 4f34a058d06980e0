use sqlx::{MySql, Pool};

use crate::config::AppConfig;
use crate::error::Result;

pub async fn establish_connection(config: &AppConfig) -> Result<Pool<MySql>> {
    let pool = sqlx::mysql::MySqlPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            log::error!("Gagal membuat pool database: {:?}", e);
            e
        })?;

    Ok(pool)
}
