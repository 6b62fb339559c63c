use crate::expression::Expression;
use crate::model::ModelMetaInfo;

/// Normalized query intent consumed by the statement builders.
///
/// An empty `fields` list selects all columns; an empty `func` applies no
/// aggregate wrapping; `limit == 0` means unlimited, and the offset is only
/// meaningful while a limit is set.
#[derive(Debug, Clone)]
pub struct QueryRules {
    meta: ModelMetaInfo,
    fields: Vec<String>,
    func: String,
    expression: Expression,
    limit: usize,
    offset: usize,
}

impl QueryRules {
    pub fn meta_info(&self) -> &ModelMetaInfo {
        &self.meta
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn func(&self) -> &str {
        &self.func
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Builder-facing front end accumulating query rules.
#[derive(Debug, Clone)]
pub struct AbstractQuery {
    rules: QueryRules,
}

impl AbstractQuery {
    pub fn new(meta: ModelMetaInfo) -> Self {
        Self {
            rules: QueryRules {
                meta,
                fields: Vec::new(),
                func: String::new(),
                expression: Expression::None,
                limit: 0,
                offset: 0,
            },
        }
    }

    /// Project specific columns; without this the query selects `*`.
    pub fn select(mut self, fields: Vec<impl Into<String>>) -> Self {
        self.rules.fields = fields.into_iter().map(|field| field.into()).collect();
        self
    }

    /// Wrap the column clause in an aggregate function, e.g. `count`.
    pub fn func(mut self, func: impl Into<String>) -> Self {
        self.rules.func = func.into();
        self
    }

    /// AND the given predicate onto the current filter.
    pub fn filter(mut self, expression: Expression) -> Self {
        self.rules.expression = std::mem::take(&mut self.rules.expression).and(expression);
        self
    }

    /// Cap the result count; 0 removes the cap again.
    pub fn limit(mut self, limit: usize) -> Self {
        self.rules.limit = limit;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.rules.offset = offset;
        self
    }

    pub fn into_rules(self) -> QueryRules {
        self.rules
    }
}

impl From<AbstractQuery> for QueryRules {
    fn from(query: AbstractQuery) -> Self {
        query.into_rules()
    }
}
