use crate::error::{OrmError, Result};
use crate::model::ModelMetaInfo;
use crate::statement::{SqliteStatement, StatementBuilder};
use serde_json::Value;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row, SqlitePool};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

/// One row of a query result, keyed by column name
#[derive(Debug, Clone, Default)]
pub struct QueryRow {
    pub columns: HashMap<String, Value>,
}

impl QueryRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: String, value: Value) {
        self.columns.insert(key, value);
    }

    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.columns
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.columns
            .get(key)
            .and_then(|value| value.as_str().map(String::from))
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.columns.get(key).and_then(|value| value.as_i64())
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.columns.get(key).and_then(|value| value.as_f64())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.columns.get(key).and_then(|value| value.as_bool())
    }
}

pub type QueryResult = Vec<QueryRow>;

/// The connection's SQL sub-object: the statement renderer plus the live
/// database handle. Cloning is cheap; a clone taken under the connection's
/// lock can run statements after the lock is released.
#[derive(Clone)]
pub struct Sql {
    statement: Arc<dyn StatementBuilder>,
    db: Option<SqlitePool>,
}

impl Default for Sql {
    fn default() -> Self {
        Self::new(Arc::new(SqliteStatement))
    }
}

impl Sql {
    pub fn new(statement: Arc<dyn StatementBuilder>) -> Self {
        Self {
            statement,
            db: None,
        }
    }

    /// Swap the statement renderer (dialect).
    pub fn set_statement(&mut self, statement: Arc<dyn StatementBuilder>) {
        self.statement = statement;
    }

    pub fn statement(&self) -> &dyn StatementBuilder {
        &*self.statement
    }

    /// Attach or detach the physical database handle.
    pub fn set_database(&mut self, db: Option<SqlitePool>) {
        self.db = db;
    }

    pub fn database(&self) -> Option<&SqlitePool> {
        self.db.as_ref()
    }

    fn db(&self) -> Result<&SqlitePool> {
        self.db.as_ref().ok_or(OrmError::NotOpen)
    }

    /// Run a statement, returning the number of affected rows.
    pub async fn execute(&self, sql: &str) -> Result<u64> {
        let db = self.db()?;
        match sqlx::query(sql).execute(db).await {
            Ok(done) => Ok(done.rows_affected()),
            Err(err) => Err(OrmError::Statement {
                sql: sql.to_string(),
                message: err.to_string(),
            }),
        }
    }

    /// Run a parameterized statement. Values are bound in the order the
    /// placeholders occur, which is the field order the statement builders
    /// emit.
    pub async fn execute_with(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let db = self.db()?;
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_value(query, param);
        }
        match query.execute(db).await {
            Ok(done) => Ok(done.rows_affected()),
            Err(err) => Err(OrmError::Statement {
                sql: sql.to_string(),
                message: err.to_string(),
            }),
        }
    }

    /// Run a query and collect all rows.
    pub async fn fetch(&self, sql: &str) -> Result<QueryResult> {
        let db = self.db()?;
        match sqlx::query(sql).fetch_all(db).await {
            Ok(rows) => Ok(rows.iter().map(convert_row).collect()),
            Err(err) => Err(OrmError::Statement {
                sql: sql.to_string(),
                message: err.to_string(),
            }),
        }
    }

    /// Probe whether the model's table exists.
    pub async fn exists(&self, meta: &ModelMetaInfo) -> Result<bool> {
        let probe = self.statement.exists(meta);
        let rows = self.fetch(&probe).await?;
        Ok(!rows.is_empty())
    }
}

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>;

fn bind_value<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(Option::<String>::None),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(f) = n.as_f64() {
                query.bind(f)
            } else {
                query.bind(n.to_string())
            }
        }
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.to_string()),
    }
}

fn convert_row(row: &SqliteRow) -> QueryRow {
    let mut result = QueryRow::new();

    for column in row.columns() {
        let name = column.name();

        // Probe for NULL first so typed getters below see real values only.
        if let Ok(Some(value)) = row.try_get::<Option<String>, _>(name) {
            result.insert(name.to_string(), Value::String(value));
        } else if let Ok(Some(value)) = row.try_get::<Option<i64>, _>(name) {
            result.insert(name.to_string(), Value::Number(value.into()));
        } else if let Ok(Some(value)) = row.try_get::<Option<f64>, _>(name) {
            if let Some(number) = serde_json::Number::from_f64(value) {
                result.insert(name.to_string(), Value::Number(number));
            }
        } else if let Ok(Some(value)) = row.try_get::<Option<bool>, _>(name) {
            result.insert(name.to_string(), Value::Bool(value));
        } else if let Ok(Some(value)) = row.try_get::<Option<Vec<u8>>, _>(name) {
            result.insert(name.to_string(), Value::String(hex_encode(&value)));
        } else {
            result.insert(name.to_string(), Value::Null);
        }
    }

    result
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}
