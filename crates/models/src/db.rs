use std::env;
use std::time::Duration;

use once_cell::sync::Lazy;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::info;

/// Local file-based store used when no connection string is configured.
const DEFAULT_SQLITE_URL: &str = "sqlite://fuelsplit.db?mode=rwc";

/// Resolved connection string: `DATABASE_URL` env var, else `config.toml`,
/// else the local SQLite file. Normalized once for the sqlx drivers.
pub static DATABASE_URL: Lazy<String> = Lazy::new(|| {
    // Load .env if present
    let _ = dotenvy::dotenv();
    let raw = env::var("DATABASE_URL")
        .ok()
        .or_else(|| {
            configs::load_default()
                .ok()
                .map(|cfg| cfg.database.url)
                .filter(|url| !url.trim().is_empty())
        })
        .unwrap_or_else(|| DEFAULT_SQLITE_URL.to_string());
    normalize_driver_url(&raw)
});

/// Rewrite deployment-style connection strings into the exact form the sqlx
/// drivers expect. Pure string transform, applied once at startup:
/// - `postgres://` (hosting-platform convention) -> `postgresql://`
/// - SQLAlchemy-style `sqlite:///file.db` -> `sqlite://file.db`
/// - file-backed SQLite URLs get `?mode=rwc` so the file is created on
///   first run
pub fn normalize_driver_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("postgres://") {
        return format!("postgresql://{rest}");
    }
    if url.starts_with("sqlite:") {
        let rewritten = match url.strip_prefix("sqlite:///") {
            Some(rest) => format!("sqlite://{rest}"),
            None => url.to_string(),
        };
        if !rewritten.contains('?') && !rewritten.ends_with(":memory:") {
            return format!("{rewritten}?mode=rwc");
        }
        return rewritten;
    }
    url.to_string()
}

pub async fn connect() -> anyhow::Result<DatabaseConnection> {
    let db_cfg = configs::load_default().unwrap_or_default().database;
    let backend = DATABASE_URL.split("://").next().unwrap_or("unknown");
    info!(backend, "connecting to database");

    let mut opts = ConnectOptions::new(DATABASE_URL.as_str());
    opts.max_connections(db_cfg.max_connections)
        .min_connections(db_cfg.min_connections)
        .connect_timeout(Duration::from_secs(db_cfg.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(db_cfg.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(db_cfg.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(db_cfg.max_lifetime_secs))
        .sqlx_logging(db_cfg.sqlx_logging);

    let db = Database::connect(opts).await?;
    Ok(db)
}
