use async_trait::async_trait;
use modelq::prelude::*;
use modelq::{sqlite, AbstractQuery, Expression, FieldDef, IndexDef, OrmError, SqlType};
use serde_json::json;

struct Player {
    id: Option<i64>,
    name: String,
    score: i64,
    connection: Connection,
}

impl Player {
    fn new(name: &str, score: i64) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            score,
            connection: Connection::new(),
        }
    }
}

fn player_meta() -> ModelMetaInfo {
    ModelMetaInfo::new::<Player>(
        "Player",
        vec![
            FieldDef::new("id", SqlType::Integer),
            FieldDef::new("name", SqlType::Text).not_null(),
            FieldDef::new("score", SqlType::Integer).not_null(),
        ],
    )
    .with_initial_data(seed_players)
}

fn seed_players() -> Vec<Box<dyn Model>> {
    vec![Box::new(Player::new("system", 0))]
}

#[async_trait]
impl Model for Player {
    fn meta(&self) -> ModelMetaInfo {
        player_meta()
    }

    fn set_connection(&mut self, connection: Connection) {
        self.connection = connection;
    }

    async fn save(&mut self) -> modelq::Result<()> {
        let meta = self.meta();
        let statement = SqliteStatement.insert_into(&meta, self.id.is_some());

        let mut params = Vec::new();
        if let Some(id) = self.id {
            params.push(json!(id));
        }
        params.push(json!(self.name.clone()));
        params.push(json!(self.score));

        self.connection.execute_with(&statement, &params).await?;
        Ok(())
    }
}

struct Inventory;

fn inventory_meta() -> ModelMetaInfo {
    ModelMetaInfo::new::<Inventory>(
        "Inventory",
        vec![
            FieldDef::new("id", SqlType::Integer),
            FieldDef::new("item", SqlType::Text).not_null(),
            FieldDef::new("quantity", SqlType::Integer).default_value("0"),
        ],
    )
}

async fn open_connection(registry: &ModelRegistry) -> Connection {
    let mut connection = Connection::new();
    connection.add_model(registry, &player_meta()).unwrap();
    connection.add_model(registry, &inventory_meta()).unwrap();
    connection
        .open(sqlite::open_memory().await.unwrap())
        .unwrap();
    connection
}

#[tokio::test]
async fn test_full_workflow() {
    let registry = ModelRegistry::new();
    let connection = open_connection(&registry).await;
    assert!(connection.is_open());

    connection.create_tables().await.unwrap();

    // Seed row was saved through this connection during table creation
    let select_all = SqliteStatement.select(&AbstractQuery::new(player_meta()).into_rules());
    assert_eq!(select_all, "SELECT ALL * FROM Player;");
    let rows = connection.query(&select_all).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_string("name"), Some("system".to_string()));

    // Save model instances through the connection
    let mut alice = Player::new("Alice", 1500);
    alice.set_connection(connection.clone());
    alice.save().await.unwrap();

    let mut bob = Player::new("Bob", 900);
    bob.set_connection(connection.clone());
    bob.save().await.unwrap();

    // Filtered select through the builder
    let query = AbstractQuery::new(player_meta())
        .select(vec!["name", "score"])
        .filter(Expression::gt("score", json!(1000)))
        .limit(10)
        .into_rules();
    let rows = connection
        .query(&SqliteStatement.select(&query))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_string("name"), Some("Alice".to_string()));
    assert_eq!(rows[0].get_i64("score"), Some(1500));

    // Aggregate select
    let count = AbstractQuery::new(player_meta()).func("count").into_rules();
    let rows = connection
        .query(&SqliteStatement.select(&count))
        .await
        .unwrap();
    assert_eq!(rows[0].get_i64("count(*)"), Some(3));

    // Delete through the builder
    let delete = AbstractQuery::new(player_meta())
        .filter(Expression::eq("name", json!("Bob")))
        .into_rules();
    let affected = connection
        .execute(&SqliteStatement.delete_from(&delete))
        .await
        .unwrap();
    assert_eq!(affected, 1);

    // Drop everything and verify the tables are gone
    connection.drop_tables().await.unwrap();
    let rows = connection
        .query("SELECT name FROM sqlite_master WHERE type='table' AND name='Player';")
        .await
        .unwrap();
    assert!(rows.is_empty());

    connection.close(&registry);
    assert!(!connection.is_open());
    assert!(registry.default_connection(&player_meta()).is_null());
}

#[tokio::test]
async fn test_create_tables_is_idempotent() {
    let registry = ModelRegistry::new();
    let connection = open_connection(&registry).await;

    connection.create_tables().await.unwrap();
    connection.create_tables().await.unwrap();

    // Existing tables are skipped, so the seed row is not duplicated
    let rows = connection.query("SELECT ALL * FROM Player;").await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_default_connection_resolution() {
    let registry = ModelRegistry::new();
    let connection = open_connection(&registry).await;
    connection.create_tables().await.unwrap();

    let default = registry.default_connection(&player_meta());
    assert_eq!(default, connection);

    // A model saved through the resolved default lands in the same database
    let mut carol = Player::new("Carol", 700);
    carol.set_connection(default);
    carol.save().await.unwrap();

    let rows = connection
        .query("SELECT ALL * FROM Player WHERE name = 'Carol';")
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_index_lifecycle() {
    let registry = ModelRegistry::new();
    let connection = open_connection(&registry).await;
    connection.create_tables().await.unwrap();

    let index = IndexDef::new("idx_player_score", "Player", vec!["score"]);
    connection.create_index(&index).await.unwrap();

    let rows = connection
        .query("SELECT name FROM sqlite_master WHERE type='index' AND name='idx_player_score';")
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);

    connection.drop_index("idx_player_score").await.unwrap();
    let rows = connection
        .query("SELECT name FROM sqlite_master WHERE type='index' AND name='idx_player_score';")
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_unique_index_is_enforced() {
    let registry = ModelRegistry::new();
    let connection = open_connection(&registry).await;
    connection.create_tables().await.unwrap();

    let index = IndexDef::new("idx_player_name", "Player", vec!["name"]).unique();
    connection.create_index(&index).await.unwrap();

    let mut first = Player::new("Dave", 100);
    first.set_connection(connection.clone());
    first.save().await.unwrap();

    let mut duplicate = Player::new("Dave", 200);
    duplicate.set_connection(connection.clone());
    assert!(duplicate.save().await.is_err());
}

#[tokio::test]
async fn test_last_query_tracks_executions() {
    let registry = ModelRegistry::new();
    let mut connection = Connection::new();
    connection.add_model(&registry, &player_meta()).unwrap();
    connection
        .open(sqlite::open_memory().await.unwrap())
        .unwrap();

    connection.create_tables().await.unwrap();
    // The most recent statement is the seed row insert
    assert_eq!(
        connection.last_query(),
        "INSERT INTO Player (name,score) values (:name,:score);"
    );

    connection.query("SELECT ALL * FROM Player;").await.unwrap();
    assert_eq!(connection.last_query(), "SELECT ALL * FROM Player;");
}

#[tokio::test]
async fn test_failed_statement_is_recorded() {
    let registry = ModelRegistry::new();
    let connection = open_connection(&registry).await;
    connection.create_tables().await.unwrap();

    let result = connection.execute("INSERT INTO Missing VALUES (1);").await;
    match result {
        Err(OrmError::Statement { sql, .. }) => {
            assert_eq!(sql, "INSERT INTO Missing VALUES (1);");
        }
        other => panic!("expected statement error, got {:?}", other),
    }
    assert_eq!(connection.last_query(), "INSERT INTO Missing VALUES (1);");
}

#[tokio::test]
async fn test_closed_connection_rejects_ddl() {
    let registry = ModelRegistry::new();
    let connection = open_connection(&registry).await;
    connection.close(&registry);

    assert!(!connection.is_open());
    assert!(matches!(
        connection.create_tables().await,
        Err(OrmError::NotOpen)
    ));
}
