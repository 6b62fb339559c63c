//! modelq - model-to-table mapping core
//!
//! modelq maps typed model descriptions to relational tables and renders an
//! abstract query representation into SQL text, while sharing one or more
//! database connections across many registered model types.
//!
//! # Architecture
//!
//! - **Statement synthesis**: [`StatementBuilder`] turns [`QueryRules`] and
//!   model metadata into CRUD-shaped SQL text for a pluggable dialect
//! - **Expression trees**: [`Expression`] renders boolean filter trees into
//!   WHERE-clause fragments
//! - **Engine abstraction**: [`Engine`] is the seam for storage backends;
//!   [`SqliteEngine`] is the embedded-file implementation
//! - **Connection registry**: [`Connection`] is a thread-safe shared handle
//!   owning one engine and tracking the last executed statement;
//!   [`ModelRegistry`] resolves each model type to its default connection
//!
//! # Example
//!
//! ```rust,no_run
//! use modelq::prelude::*;
//! use modelq::{AbstractQuery, Expression, FieldDef, SqlType};
//!
//! #[derive(Debug)]
//! struct User;
//!
//! #[tokio::main]
//! async fn main() -> modelq::Result<()> {
//!     let meta = ModelMetaInfo::new::<User>(
//!         "User",
//!         vec![
//!             FieldDef::new("id", SqlType::Integer),
//!             FieldDef::new("name", SqlType::Text).not_null(),
//!         ],
//!     );
//!
//!     let registry = ModelRegistry::new();
//!     let mut connection = Connection::new();
//!     connection.add_model(&registry, &meta)?;
//!     connection.open(modelq::sqlite::open_memory().await?)?;
//!     connection.create_tables().await?;
//!
//!     let statement = SqliteStatement.select(
//!         &AbstractQuery::new(meta.clone())
//!             .filter(Expression::gt("id", serde_json::json!(10)))
//!             .limit(5)
//!             .into_rules(),
//!     );
//!     let rows = connection.query(&statement).await?;
//!     println!("{:?}", rows);
//!     Ok(())
//! }
//! ```
//!
//! # Scope
//!
//! modelq is the mapping core, not a full ORM: statement synthesis covers
//! create/drop table, create/drop index, insert, replace, select and delete.
//! Transactions, migrations and query planning belong to the layers around
//! it.

pub mod connection;
pub mod engine;
pub mod error;
pub mod expression;
pub mod model;
pub mod query;
pub mod sql;
pub mod sqlite;
pub mod statement;

pub use async_trait::async_trait;

pub use connection::{Connection, ModelRegistry};
pub use engine::Engine;
pub use error::{OrmError, Result};
pub use expression::{sql_literal, CompareOp, Expression, LogicalOp};
pub use model::{FieldDef, IndexDef, Model, ModelMetaInfo, SqlType};
pub use query::{AbstractQuery, QueryRules};
pub use sql::{QueryResult, QueryRow, Sql};
pub use sqlite::{open_database, open_database_with, open_file, open_memory, SqliteConfig, SqliteEngine};
pub use statement::{SqliteStatement, StatementBuilder};

/// Prelude for common imports
pub mod prelude {
    pub use crate::connection::{Connection, ModelRegistry};
    pub use crate::engine::Engine;
    pub use crate::error::{OrmError, Result};
    pub use crate::model::{Model, ModelMetaInfo};
    pub use crate::sqlite::SqliteEngine;
    pub use crate::statement::{SqliteStatement, StatementBuilder};
}
