use crate::model::{IndexDef, ModelMetaInfo, SqlType};
use crate::query::QueryRules;

/// Renders query intent and model metadata into SQL text for one dialect.
///
/// The default method bodies implement the dialect-independent statement
/// grammar; dialects supply the column-type mapping, the primary-key column
/// definition and the table-existence probe. Generation is pure text work:
/// identifiers are emitted as-is (sanitization is the metadata layer's job)
/// and no method can fail — semantically invalid text surfaces later as an
/// execution error.
pub trait StatementBuilder: Send + Sync {
    /// Dialect column type for a field
    fn column_type(&self, sql_type: &SqlType) -> &'static str;

    /// Column definition used for the field named `id`
    fn primary_key_def(&self) -> &'static str;

    /// Statement probing whether the model's table exists
    fn exists(&self, meta: &ModelMetaInfo) -> String;

    fn create_table(&self, meta: &ModelMetaInfo) -> String {
        let columns: Vec<String> = meta
            .fields()
            .iter()
            .map(|field| {
                if field.name == "id" {
                    format!("    id {}", self.primary_key_def())
                } else {
                    let mut def =
                        format!("    {} {}", field.name, self.column_type(&field.sql_type));
                    if !field.nullable {
                        def.push_str(" NOT NULL");
                    }
                    if let Some(default) = &field.default {
                        def.push_str(&format!(" DEFAULT {}", default));
                    }
                    def
                }
            })
            .collect();

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n);",
            meta.name(),
            columns.join(",\n")
        )
    }

    fn drop_table(&self, meta: &ModelMetaInfo) -> String {
        format!("drop table {};", meta.name())
    }

    /// Parameterized INSERT over the field list; placeholders are named after
    /// the fields so values bind by name, not position. `with_id == false`
    /// drops the field named `id` from both lists.
    fn insert_into(&self, meta: &ModelMetaInfo, with_id: bool) -> String {
        insert_like("INSERT", meta, with_id)
    }

    /// Same shape as [`insert_into`](Self::insert_into), `REPLACE` keyword.
    fn replace_into(&self, meta: &ModelMetaInfo, with_id: bool) -> String {
        insert_like("REPLACE", meta, with_id)
    }

    fn select(&self, rules: &QueryRules) -> String {
        let mut sql = format!(
            "SELECT ALL {} FROM {}",
            result_column(rules),
            rules.meta_info().name()
        );
        if !rules.expression().is_null() {
            sql.push_str(&format!(" WHERE {}", rules.expression().to_sql()));
        }
        if rules.limit() > 0 {
            sql.push(' ');
            sql.push_str(&self.limit_clause(rules.limit(), rules.offset()));
        }
        sql.push(';');
        sql
    }

    fn delete_from(&self, rules: &QueryRules) -> String {
        let mut sql = format!("DELETE FROM {}", rules.meta_info().name());
        if !rules.expression().is_null() {
            sql.push_str(&format!(" WHERE {}", rules.expression().to_sql()));
        }
        if rules.limit() > 0 {
            sql.push(' ');
            sql.push_str(&self.limit_clause(rules.limit(), rules.offset()));
        }
        sql.push(';');
        sql
    }

    /// `LIMIT n`, with `OFFSET m` appended only when the offset is positive.
    fn limit_clause(&self, limit: usize, offset: usize) -> String {
        let mut clause = format!("LIMIT {}", limit);
        if offset > 0 {
            clause.push_str(&format!(" OFFSET {}", offset));
        }
        clause
    }

    fn create_index(&self, index: &IndexDef) -> String {
        let unique = if index.unique { "UNIQUE " } else { "" };
        format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} ({});",
            unique,
            index.name,
            index.table,
            index.columns.join(", ")
        )
    }

    fn drop_index(&self, name: &str) -> String {
        format!("DROP INDEX IF EXISTS {};", name)
    }
}

fn insert_like(keyword: &str, meta: &ModelMetaInfo, with_id: bool) -> String {
    let mut fields = meta.field_name_list();
    if !with_id {
        fields.retain(|field| field != "id");
    }
    let placeholders: Vec<String> = fields.iter().map(|field| format!(":{}", field)).collect();
    format!(
        "{} INTO {} ({}) values ({});",
        keyword,
        meta.name(),
        fields.join(","),
        placeholders.join(",")
    )
}

fn result_column(rules: &QueryRules) -> String {
    let columns = if rules.fields().is_empty() {
        "*".to_string()
    } else {
        rules.fields().join(",")
    };
    if rules.func().is_empty() {
        columns
    } else {
        format!("{}({})", rules.func(), columns)
    }
}

/// SQLite statement dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteStatement;

impl StatementBuilder for SqliteStatement {
    fn column_type(&self, sql_type: &SqlType) -> &'static str {
        match sql_type {
            SqlType::BigInt => "BIGINT",
            SqlType::Integer => "INTEGER",
            SqlType::SmallInt => "SMALLINT",
            SqlType::Real => "REAL",
            SqlType::DoublePrecision => "DOUBLE",
            SqlType::Text => "TEXT",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Timestamp => "TIMESTAMP",
            SqlType::Json => "TEXT",
            SqlType::Blob => "BLOB",
        }
    }

    fn primary_key_def(&self) -> &'static str {
        "INTEGER PRIMARY KEY AUTOINCREMENT"
    }

    fn exists(&self, meta: &ModelMetaInfo) -> String {
        format!(
            "SELECT name FROM sqlite_master WHERE type='table' AND name='{}';",
            meta.name()
        )
    }
}
