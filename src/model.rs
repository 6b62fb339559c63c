use crate::connection::Connection;
use crate::error::Result;
use async_trait::async_trait;
use std::any::{type_name, TypeId};

/// SQL column types understood by the statement dialects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlType {
    BigInt,
    Integer,
    SmallInt,
    Real,
    DoublePrecision,
    Text,
    Boolean,
    Timestamp,
    Json,
    Blob,
}

/// Column definition backing one model field
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub sql_type: SqlType,
    pub nullable: bool,
    pub default: Option<String>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            nullable: true,
            default: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Index definition
#[derive(Debug, Clone)]
pub struct IndexDef {
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl IndexDef {
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        columns: Vec<impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            columns: columns.into_iter().map(|c| c.into()).collect(),
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Table metadata for one model type.
///
/// The model type's identity is its [`TypeId`]; the default-connection
/// registry is keyed on it. Field names must be unique within one model.
/// The field named `id` is treated as the auto-increment primary key by the
/// statement dialects and is skipped by insert/replace unless requested.
#[derive(Debug, Clone)]
pub struct ModelMetaInfo {
    type_id: TypeId,
    table: String,
    class_name: String,
    fields: Vec<FieldDef>,
    initial_data: Option<fn() -> Vec<Box<dyn Model>>>,
}

impl ModelMetaInfo {
    pub fn new<T: 'static>(table: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        #[cfg(debug_assertions)]
        {
            let mut seen = std::collections::HashSet::new();
            for field in &fields {
                assert!(
                    seen.insert(field.name.as_str()),
                    "duplicate field name: {}",
                    field.name
                );
            }
        }

        let class_name = type_name::<T>()
            .rsplit("::")
            .next()
            .unwrap_or(type_name::<T>())
            .to_string();

        Self {
            type_id: TypeId::of::<T>(),
            table: table.into(),
            class_name,
            fields,
            initial_data: None,
        }
    }

    /// Attach a factory producing seed rows saved right after table creation.
    pub fn with_initial_data(mut self, factory: fn() -> Vec<Box<dyn Model>>) -> Self {
        self.initial_data = Some(factory);
        self
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.table
    }

    /// Short Rust type name of the model
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Field names in declaration order
    pub fn field_name_list(&self) -> Vec<String> {
        self.fields.iter().map(|field| field.name.clone()).collect()
    }

    /// Construct the seed instances, if a factory was attached.
    pub fn initial_data(&self) -> Vec<Box<dyn Model>> {
        self.initial_data.map(|factory| factory()).unwrap_or_default()
    }
}

/// A persistable model instance.
///
/// Implementations know their own metadata and write themselves through the
/// connection they were handed.
#[async_trait]
pub trait Model: Send {
    fn meta(&self) -> ModelMetaInfo;

    fn set_connection(&mut self, connection: Connection);

    async fn save(&mut self) -> Result<()>;
}
