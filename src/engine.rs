use crate::error::Result;
use crate::model::ModelMetaInfo;
use sqlx::SqlitePool;

/// Pluggable storage backend behind a [`Connection`](crate::Connection).
///
/// An engine owns at most one physical database handle and remembers which
/// model types were bound to it. All methods take `&self`: implementations
/// guard their state internally so the owning connection never has to hold
/// its own lock across an engine call.
///
/// Lifecycle: created empty, opened against an already-live handle,
/// accumulates bound models, closed. Closing releases the handle but keeps
/// the bound model list.
pub trait Engine: Send + Sync {
    /// Backend name for diagnostics
    fn name(&self) -> &'static str;

    /// Attach an already-connected database handle.
    fn open(&self, db: SqlitePool) -> Result<()>;

    /// Release the database handle. Bound models are kept.
    fn close(&self);

    fn is_open(&self) -> bool;

    /// Bind a model type to this engine. Re-binding an already-bound type is
    /// not an error and does not duplicate the entry.
    fn add_model(&self, meta: &ModelMetaInfo) -> Result<()>;

    /// The model types currently bound, in binding order.
    fn model_list(&self) -> Vec<ModelMetaInfo>;
}
