use crate::engine::Engine;
use crate::error::{OrmError, Result};
use crate::model::ModelMetaInfo;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Mutex;

/// Pool construction settings for the physical SQLite handle
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Maximum connections in the pool
    pub max_connections: u32,
    /// Create the database file if it does not exist
    pub create_if_missing: bool,
    /// Enable `PRAGMA foreign_keys`
    pub foreign_keys: bool,
    /// Use WAL journal mode
    pub wal: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            create_if_missing: true,
            foreign_keys: true,
            wal: true,
        }
    }
}

/// Build a live SQLite pool suitable for [`Connection::open`](crate::Connection::open).
pub async fn open_database(url: &str) -> Result<SqlitePool> {
    open_database_with(url, SqliteConfig::default()).await
}

pub async fn open_database_with(url: &str, config: SqliteConfig) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(config.create_if_missing);

    // A :memory: pool wider than one connection would open one private
    // database per connection.
    let max_connections = if url.contains(":memory:") {
        1
    } else {
        config.max_connections
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    if config.foreign_keys {
        sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;
    }

    if config.wal {
        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    }

    Ok(pool)
}

/// Open an in-memory SQLite database.
pub async fn open_memory() -> Result<SqlitePool> {
    open_database("sqlite::memory:").await
}

/// Open a file-based SQLite database.
pub async fn open_file(path: &str) -> Result<SqlitePool> {
    open_database(&format!("sqlite://{}", path)).await
}

#[derive(Default)]
struct SqliteEngineState {
    db: Option<SqlitePool>,
    models: Vec<ModelMetaInfo>,
}

/// Embedded-file storage engine backed by a SQLite pool.
pub struct SqliteEngine {
    state: Mutex<SqliteEngineState>,
}

impl SqliteEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SqliteEngineState::default()),
        }
    }
}

impl Default for SqliteEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for SqliteEngine {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn open(&self, db: SqlitePool) -> Result<()> {
        if db.is_closed() {
            return Err(OrmError::Database(
                "database handle is already closed".to_string(),
            ));
        }
        self.state.lock().unwrap().db = Some(db);
        Ok(())
    }

    fn close(&self) {
        self.state.lock().unwrap().db = None;
    }

    fn is_open(&self) -> bool {
        self.state
            .lock()
            .unwrap()
            .db
            .as_ref()
            .is_some_and(|db| !db.is_closed())
    }

    fn add_model(&self, meta: &ModelMetaInfo) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state
            .models
            .iter()
            .any(|bound| bound.type_id() == meta.type_id())
        {
            state.models.push(meta.clone());
        }
        Ok(())
    }

    fn model_list(&self) -> Vec<ModelMetaInfo> {
        self.state.lock().unwrap().models.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDef, SqlType};

    struct Player;

    fn player_meta() -> ModelMetaInfo {
        ModelMetaInfo::new::<Player>(
            "Player",
            vec![
                FieldDef::new("id", SqlType::Integer),
                FieldDef::new("name", SqlType::Text).not_null(),
            ],
        )
    }

    #[test]
    fn test_new_engine_is_closed() {
        let engine = SqliteEngine::new();
        assert!(!engine.is_open());
        assert!(engine.model_list().is_empty());
    }

    #[test]
    fn test_add_model_is_idempotent() {
        let engine = SqliteEngine::new();
        engine.add_model(&player_meta()).unwrap();
        engine.add_model(&player_meta()).unwrap();
        assert_eq!(engine.model_list().len(), 1);
        assert_eq!(engine.model_list()[0].name(), "Player");
    }

    #[tokio::test]
    async fn test_open_and_close() {
        let engine = SqliteEngine::new();
        let db = open_memory().await.unwrap();

        engine.open(db).unwrap();
        assert!(engine.is_open());

        engine.close();
        assert!(!engine.is_open());
    }

    #[tokio::test]
    async fn test_close_keeps_models() {
        let engine = SqliteEngine::new();
        engine.add_model(&player_meta()).unwrap();

        let db = open_memory().await.unwrap();
        engine.open(db).unwrap();
        engine.close();

        assert_eq!(engine.model_list().len(), 1);
    }

    #[tokio::test]
    async fn test_open_rejects_closed_handle() {
        let engine = SqliteEngine::new();
        let db = open_memory().await.unwrap();
        db.close().await;

        assert!(engine.open(db).is_err());
        assert!(!engine.is_open());
    }

    #[tokio::test]
    async fn test_memory_database_is_usable() {
        let db = open_memory().await.unwrap();
        sqlx::query("CREATE TABLE t (id INTEGER)")
            .execute(&db)
            .await
            .unwrap();
        sqlx::query("INSERT INTO t (id) VALUES (1)")
            .execute(&db)
            .await
            .unwrap();
    }
}
