use serde_json::Value;
use std::fmt;

/// Comparison operators usable in WHERE predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    NotLike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "="),
            CompareOp::Ne => write!(f, "!="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Le => write!(f, "<="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Ge => write!(f, ">="),
            CompareOp::Like => write!(f, "LIKE"),
            CompareOp::NotLike => write!(f, "NOT LIKE"),
            CompareOp::In => write!(f, "IN"),
            CompareOp::NotIn => write!(f, "NOT IN"),
            CompareOp::IsNull => write!(f, "IS NULL"),
            CompareOp::IsNotNull => write!(f, "IS NOT NULL"),
        }
    }
}

/// Logical operators for combining predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOp::And => write!(f, "AND"),
            LogicalOp::Or => write!(f, "OR"),
        }
    }
}

/// A boolean filter tree rendered into a WHERE-clause fragment.
///
/// `Expression::None` denotes "no filter": statements built from it carry no
/// WHERE clause at all. Rendering is pure, so the same tree always produces
/// the same text.
#[derive(Debug, Clone, Default)]
pub enum Expression {
    /// No filter
    #[default]
    None,
    /// A single column comparison
    Compare {
        column: String,
        op: CompareOp,
        value: Option<Value>,
    },
    /// Nested predicates joined by AND/OR
    Compound {
        operands: Vec<Expression>,
        op: LogicalOp,
    },
    /// Verbatim SQL fragment
    Raw(String),
}

impl Expression {
    pub fn compare(column: impl Into<String>, op: CompareOp, value: Option<Value>) -> Self {
        Expression::Compare {
            column: column.into(),
            op,
            value,
        }
    }

    pub fn eq(column: impl Into<String>, value: Value) -> Self {
        Self::compare(column, CompareOp::Eq, Some(value))
    }

    pub fn ne(column: impl Into<String>, value: Value) -> Self {
        Self::compare(column, CompareOp::Ne, Some(value))
    }

    pub fn lt(column: impl Into<String>, value: Value) -> Self {
        Self::compare(column, CompareOp::Lt, Some(value))
    }

    pub fn le(column: impl Into<String>, value: Value) -> Self {
        Self::compare(column, CompareOp::Le, Some(value))
    }

    pub fn gt(column: impl Into<String>, value: Value) -> Self {
        Self::compare(column, CompareOp::Gt, Some(value))
    }

    pub fn ge(column: impl Into<String>, value: Value) -> Self {
        Self::compare(column, CompareOp::Ge, Some(value))
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::compare(column, CompareOp::Like, Some(Value::String(pattern.into())))
    }

    pub fn is_in(column: impl Into<String>, values: Vec<Value>) -> Self {
        Self::compare(column, CompareOp::In, Some(Value::Array(values)))
    }

    pub fn null(column: impl Into<String>) -> Self {
        Self::compare(column, CompareOp::IsNull, Option::None)
    }

    pub fn not_null(column: impl Into<String>) -> Self {
        Self::compare(column, CompareOp::IsNotNull, Option::None)
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Expression::Raw(sql.into())
    }

    /// Join with another predicate under AND. `Expression::None` operands are
    /// absorbed rather than nested.
    pub fn and(self, other: Expression) -> Expression {
        Self::combine(self, other, LogicalOp::And)
    }

    /// Join with another predicate under OR.
    pub fn or(self, other: Expression) -> Expression {
        Self::combine(self, other, LogicalOp::Or)
    }

    fn combine(lhs: Expression, rhs: Expression, op: LogicalOp) -> Expression {
        match (lhs.is_null(), rhs.is_null()) {
            (true, _) => rhs,
            (_, true) => lhs,
            _ => Expression::Compound {
                operands: vec![lhs, rhs],
                op,
            },
        }
    }

    /// True when the expression denotes "no filter".
    pub fn is_null(&self) -> bool {
        matches!(self, Expression::None)
    }

    /// Render the WHERE-clause fragment, without the `WHERE` keyword.
    pub fn to_sql(&self) -> String {
        match self {
            Expression::None => String::new(),
            Expression::Compare { column, op, value } => match op {
                CompareOp::IsNull | CompareOp::IsNotNull => format!("{} {}", column, op),
                CompareOp::In | CompareOp::NotIn => {
                    if let Some(Value::Array(items)) = value {
                        let items: Vec<String> = items.iter().map(sql_literal).collect();
                        format!("{} {} ({})", column, op, items.join(", "))
                    } else {
                        format!("{} {} ()", column, op)
                    }
                }
                _ => {
                    let literal = value
                        .as_ref()
                        .map(sql_literal)
                        .unwrap_or_else(|| "NULL".to_string());
                    format!("{} {} {}", column, op, literal)
                }
            },
            Expression::Compound { operands, op } => {
                let parts: Vec<String> = operands
                    .iter()
                    .filter(|operand| !operand.is_null())
                    .map(|operand| operand.to_sql())
                    .collect();
                if parts.is_empty() {
                    "TRUE".to_string()
                } else {
                    format!("({})", parts.join(&format!(" {} ", op)))
                }
            }
            Expression::Raw(sql) => sql.clone(),
        }
    }
}

/// Format a JSON value as a SQL literal.
pub fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string().to_uppercase(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Array(_) | Value::Object(_) => {
            format!(
                "'{}'",
                serde_json::to_string(value)
                    .unwrap_or_default()
                    .replace('\'', "''")
            )
        }
    }
}
