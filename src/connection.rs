use crate::engine::Engine;
use crate::error::{OrmError, Result};
use crate::model::{IndexDef, ModelMetaInfo};
use crate::sql::{QueryResult, Sql};
use crate::sqlite::SqliteEngine;
use serde_json::Value;
use sqlx::SqlitePool;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

#[derive(Default)]
struct Slots {
    engine: Option<Arc<dyn Engine>>,
    sql: Sql,
    last_query: String,
}

/// Shared state behind every alias of one connection. A single lock guards
/// the engine slot, the SQL sub-object and the last-query slot; it is only
/// held for the read or mutation itself, never across a statement execution.
#[derive(Default)]
struct ConnectionState {
    slots: Mutex<Slots>,
}

/// A shared handle to one engine plus last-executed-statement tracking.
///
/// Cloning a connection aliases the same underlying state; the state and the
/// engine it exclusively owns are dropped with the last alias. The
/// default-constructed connection is *null*: no state is allocated until the
/// first mutating operation, which also installs a [`SqliteEngine`] when no
/// engine was set explicitly. Null is a legitimate pre-allocation state,
/// distinct from "allocated but unopened" and "open".
#[derive(Clone, Default)]
pub struct Connection {
    state: Option<Arc<ConnectionState>>,
}

impl Connection {
    /// A null connection.
    pub fn new() -> Self {
        Self::default()
    }

    /// True while no state has been allocated.
    pub fn is_null(&self) -> bool {
        self.state.is_none()
    }

    fn ensure_state(&mut self) -> Arc<ConnectionState> {
        Arc::clone(
            self.state
                .get_or_insert_with(|| Arc::new(ConnectionState::default())),
        )
    }

    /// Allocate state and install the default engine if none is set yet.
    fn prepare(&mut self) -> (Arc<ConnectionState>, Arc<dyn Engine>) {
        let state = self.ensure_state();
        let engine = {
            let mut slots = state.slots.lock().unwrap();
            slots
                .engine
                .get_or_insert_with(|| Arc::new(SqliteEngine::new()) as Arc<dyn Engine>)
                .clone()
        };
        (state, engine)
    }

    /// Attach this connection to an already-live database handle.
    ///
    /// The handle must be connected; passing a closed pool is a precondition
    /// violation and aborts. The engine's open outcome is propagated, which
    /// tightens the original behavior of reporting success unconditionally.
    pub fn open(&mut self, db: SqlitePool) -> Result<()> {
        assert!(!db.is_closed(), "open() requires a live database handle");

        let (state, engine) = self.prepare();
        {
            let mut slots = state.slots.lock().unwrap();
            slots.sql.set_database(Some(db.clone()));
        }
        engine.open(db)?;
        debug!(engine = engine.name(), "connection opened");
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        let Some(state) = &self.state else {
            return false;
        };
        let engine = state.slots.lock().unwrap().engine.clone();
        engine.is_some_and(|engine| engine.is_open())
    }

    /// Close the connection: detach the SQL layer, close the engine and drop
    /// every model the engine had bound from the registry's default mapping,
    /// provided the mapping still points at this connection. No-op when null.
    pub fn close(&self, registry: &ModelRegistry) {
        let Some(state) = &self.state else {
            return;
        };
        let engine = {
            let mut slots = state.slots.lock().unwrap();
            slots.sql.set_database(None);
            slots.engine.clone()
        };
        let Some(engine) = engine else {
            return;
        };
        engine.close();
        for meta in engine.model_list() {
            registry.remove_if_bound_to(&meta, self);
        }
        debug!(engine = engine.name(), "connection closed");
    }

    /// Bind a model type to this connection's engine. The first connection a
    /// model is bound to becomes its default; later bindings do not steal the
    /// mapping unless [`set_default_connection`](Self::set_default_connection)
    /// is called.
    pub fn add_model(&mut self, registry: &ModelRegistry, meta: &ModelMetaInfo) -> Result<()> {
        let (_state, engine) = self.prepare();
        engine.add_model(meta)?;
        registry.bind_if_absent(meta, self);
        Ok(())
    }

    /// Unconditionally make this connection the model's default.
    pub fn set_default_connection(&self, registry: &ModelRegistry, meta: &ModelMetaInfo) {
        registry.set_default(meta, self.clone());
    }

    fn open_parts(&self) -> Result<(Arc<dyn Engine>, Sql)> {
        let state = self.state.as_ref().ok_or(OrmError::NotOpen)?;
        let (engine, sql) = {
            let slots = state.slots.lock().unwrap();
            (slots.engine.clone(), slots.sql.clone())
        };
        let engine = engine.ok_or(OrmError::NotOpen)?;
        if !engine.is_open() {
            return Err(OrmError::NotOpen);
        }
        Ok((engine, sql))
    }

    /// Create the table of every bound model that does not exist yet, then
    /// save its seed rows through this connection. Stops at the first failed
    /// statement, leaving it in the last-query slot; tables created before
    /// the failure stay created.
    pub async fn create_tables(&self) -> Result<()> {
        let (engine, sql) = self.open_parts()?;

        for meta in engine.model_list() {
            if sql.exists(&meta).await? {
                continue;
            }

            let statement = sql.statement().create_table(&meta);
            self.set_last_query(&statement);
            if let Err(err) = sql.execute(&statement).await {
                warn!(model = meta.class_name(), error = %err, "failed to create table");
                return Err(err);
            }

            for mut seed in meta.initial_data() {
                seed.set_connection(self.clone());
                if let Err(err) = seed.save().await {
                    warn!(model = meta.class_name(), error = %err, "failed to save seed row");
                }
            }
        }

        Ok(())
    }

    /// Drop the table of every bound model that exists. Same fail-fast,
    /// no-rollback contract as [`create_tables`](Self::create_tables).
    pub async fn drop_tables(&self) -> Result<()> {
        let (engine, sql) = self.open_parts()?;

        for meta in engine.model_list() {
            if !sql.exists(&meta).await? {
                continue;
            }

            let statement = sql.statement().drop_table(&meta);
            self.set_last_query(&statement);
            if let Err(err) = sql.execute(&statement).await {
                warn!(model = meta.class_name(), error = %err, "failed to drop table");
                return Err(err);
            }
        }

        Ok(())
    }

    pub async fn create_index(&self, index: &IndexDef) -> Result<()> {
        let (_engine, sql) = self.open_parts()?;
        let statement = sql.statement().create_index(index);
        self.set_last_query(&statement);
        sql.execute(&statement).await?;
        Ok(())
    }

    pub async fn drop_index(&self, name: &str) -> Result<()> {
        let (_engine, sql) = self.open_parts()?;
        let statement = sql.statement().drop_index(name);
        self.set_last_query(&statement);
        sql.execute(&statement).await?;
        Ok(())
    }

    /// Run a statement through the SQL layer, recording it as the last query.
    pub async fn execute(&self, sql: &str) -> Result<u64> {
        let (_engine, runner) = self.open_parts()?;
        self.set_last_query(sql);
        runner.execute(sql).await
    }

    /// Run a parameterized statement; values bind in placeholder order.
    pub async fn execute_with(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let (_engine, runner) = self.open_parts()?;
        self.set_last_query(sql);
        runner.execute_with(sql, params).await
    }

    /// Run a query and collect all rows, recording it as the last query.
    pub async fn query(&self, sql: &str) -> Result<QueryResult> {
        let (_engine, runner) = self.open_parts()?;
        self.set_last_query(sql);
        runner.fetch(sql).await
    }

    /// Replace the engine. Fails without mutating while the connection is
    /// open; otherwise the previous engine is dropped under the lock.
    pub fn set_engine(&mut self, engine: Arc<dyn Engine>) -> Result<()> {
        if self.is_open() {
            return Err(OrmError::EngineLocked);
        }
        let state = self.ensure_state();
        state.slots.lock().unwrap().engine = Some(engine);
        Ok(())
    }

    pub fn engine(&self) -> Option<Arc<dyn Engine>> {
        let state = self.state.as_ref()?;
        state.slots.lock().unwrap().engine.clone()
    }

    /// The most recently executed statement.
    ///
    /// The slot is shared by every alias of this connection and overwritten
    /// on each execution: with several threads issuing statements, a reader
    /// may observe another thread's statement. Last write wins; the slot is
    /// not tracked per caller. Empty while the connection is not open.
    pub fn last_query(&self) -> String {
        if !self.is_open() {
            return String::new();
        }
        match &self.state {
            Some(state) => state.slots.lock().unwrap().last_query.clone(),
            None => String::new(),
        }
    }

    /// Overwrite the last-query slot. No-op while the connection is not open.
    pub fn set_last_query(&self, query: &str) {
        if !self.is_open() {
            return;
        }
        if let Some(state) = &self.state {
            state.slots.lock().unwrap().last_query = query.to_string();
        }
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        match (&self.state, &other.state) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Eq for Connection {}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            Some(state) => write!(f, "Connection({:p})", Arc::as_ptr(state)),
            None => write!(f, "Connection(null)"),
        }
    }
}

/// The default-connection mapping from model type to connection.
///
/// Every connection lifecycle that binds or closes models mutates the
/// registry it is handed, so the registry carries its own lock instead of
/// relying on the connections'. Cloning the registry aliases the same map.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    mapping: Arc<Mutex<HashMap<TypeId, Connection>>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The connection a model type resolves to when none is specified.
    /// Returns a null connection and warns when the model was never bound.
    pub fn default_connection(&self, meta: &ModelMetaInfo) -> Connection {
        let mapping = self.mapping.lock().unwrap();
        match mapping.get(&meta.type_id()) {
            Some(connection) => connection.clone(),
            None => {
                warn!(
                    model = meta.name(),
                    "model is not added to any connection yet"
                );
                Connection::new()
            }
        }
    }

    pub fn contains(&self, meta: &ModelMetaInfo) -> bool {
        self.mapping.lock().unwrap().contains_key(&meta.type_id())
    }

    fn set_default(&self, meta: &ModelMetaInfo, connection: Connection) {
        self.mapping
            .lock()
            .unwrap()
            .insert(meta.type_id(), connection);
    }

    fn bind_if_absent(&self, meta: &ModelMetaInfo, connection: &Connection) {
        self.mapping
            .lock()
            .unwrap()
            .entry(meta.type_id())
            .or_insert_with(|| connection.clone());
    }

    fn remove_if_bound_to(&self, meta: &ModelMetaInfo, connection: &Connection) {
        let mut mapping = self.mapping.lock().unwrap();
        if mapping
            .get(&meta.type_id())
            .is_some_and(|bound| bound == connection)
        {
            mapping.remove(&meta.type_id());
        }
    }
}
