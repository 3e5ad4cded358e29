//! Abstract query model: structured constraints or a raw statement with bound parameters.

use crate::error::AppError;
use serde_json::Value;

/// Scalar, null, or sequence value used in comparisons, bound parameters and rows.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<QueryValue>),
}

impl QueryValue {
    /// Objects have no SQL rendering and are rejected.
    pub fn from_json(v: &Value) -> Result<Self, AppError> {
        Ok(match v {
            Value::Null => QueryValue::Null,
            Value::Bool(b) => QueryValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => QueryValue::Int(i),
                None => QueryValue::Float(n.as_f64().unwrap_or(0.0)),
            },
            Value::String(s) => QueryValue::Text(s.clone()),
            Value::Array(items) => QueryValue::List(
                items.iter().map(QueryValue::from_json).collect::<Result<_, _>>()?,
            ),
            Value::Object(_) => {
                return Err(AppError::BadRequest("object values cannot be used in a query".into()))
            }
        })
    }

    pub fn to_json(&self) -> Value {
        match self {
            QueryValue::Null => Value::Null,
            QueryValue::Bool(b) => Value::Bool(*b),
            QueryValue::Int(i) => Value::from(*i),
            QueryValue::Float(f) => Value::from(*f),
            QueryValue::Text(s) => Value::String(s.clone()),
            QueryValue::List(items) => Value::Array(items.iter().map(QueryValue::to_json).collect()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, QueryValue::Null)
    }
}

impl From<&str> for QueryValue {
    fn from(v: &str) -> Self {
        QueryValue::Text(v.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(v: String) -> Self {
        QueryValue::Text(v)
    }
}

impl From<i64> for QueryValue {
    fn from(v: i64) -> Self {
        QueryValue::Int(v)
    }
}

impl From<i32> for QueryValue {
    fn from(v: i32) -> Self {
        QueryValue::Int(v.into())
    }
}

impl From<f64> for QueryValue {
    fn from(v: f64) -> Self {
        QueryValue::Float(v)
    }
}

impl From<bool> for QueryValue {
    fn from(v: bool) -> Self {
        QueryValue::Bool(v)
    }
}

impl<T: Into<QueryValue>> From<Vec<T>> for QueryValue {
    fn from(v: Vec<T>) -> Self {
        QueryValue::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<QueryValue>> From<Option<T>> for QueryValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(QueryValue::Null)
    }
}

/// Supported comparison operators. Tokens outside this set are rejected at compile time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    In,
    EqualTo,
    NotEqualTo,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    Like,
}

impl Operator {
    pub fn token(self) -> &'static str {
        match self {
            Operator::In => "IN",
            Operator::EqualTo => "EQUAL_TO",
            Operator::NotEqualTo => "NOT_EQUAL_TO",
            Operator::LessThan => "LESS_THAN",
            Operator::LessThanOrEqualTo => "LESS_THAN_OR_EQUAL_TO",
            Operator::GreaterThan => "GREATER_THAN",
            Operator::GreaterThanOrEqualTo => "GREATER_THAN_OR_EQUAL_TO",
            Operator::Like => "LIKE",
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            Operator::In => "IN",
            Operator::EqualTo => "=",
            Operator::NotEqualTo => "!=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqualTo => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqualTo => ">=",
            Operator::Like => "LIKE",
        }
    }

    /// Keyword operators need surrounding whitespace; symbols are written flush.
    pub fn is_keyword(self) -> bool {
        matches!(self, Operator::In | Operator::Like)
    }
}

impl std::str::FromStr for Operator {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "IN" => Operator::In,
            "EQUAL_TO" => Operator::EqualTo,
            "NOT_EQUAL_TO" => Operator::NotEqualTo,
            "LESS_THAN" => Operator::LessThan,
            "LESS_THAN_OR_EQUAL_TO" => Operator::LessThanOrEqualTo,
            "GREATER_THAN" => Operator::GreaterThan,
            "GREATER_THAN_OR_EQUAL_TO" => Operator::GreaterThanOrEqualTo,
            "LIKE" => Operator::Like,
            other => return Err(AppError::InvalidOperator(format!("unsupported operator '{}'", other))),
        })
    }
}

/// Value side of a comparison. `Raw` bypasses escaping and only applies to the property it names.
#[derive(Clone, Debug, PartialEq)]
pub enum ComparisonValue {
    Escaped(QueryValue),
    Raw { sql: String, property: String },
}

/// One constraint on a property.
#[derive(Clone, Debug, PartialEq)]
pub enum Constraint {
    /// Bare value, compared with `=`.
    Value(QueryValue),
    /// Explicit comparison; the operator token is resolved when compiling.
    Comparison {
        operator: Option<String>,
        value: ComparisonValue,
    },
}

impl Constraint {
    pub fn equal_to(value: impl Into<QueryValue>) -> Self {
        Constraint::Value(value.into())
    }

    pub fn compare(operator: Operator, value: impl Into<QueryValue>) -> Self {
        Constraint::Comparison {
            operator: Some(operator.token().to_string()),
            value: ComparisonValue::Escaped(value.into()),
        }
    }

    /// Comparison with an operator token taken as-is (e.g. from a request).
    pub fn with_token(operator: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        Constraint::Comparison {
            operator: Some(operator.into()),
            value: ComparisonValue::Escaped(value.into()),
        }
    }

    /// Unescaped comparison value. The caller asserts `sql` is safe for `property`.
    pub fn raw(operator: Operator, property: impl Into<String>, sql: impl Into<String>) -> Self {
        Constraint::Comparison {
            operator: Some(operator.token().to_string()),
            value: ComparisonValue::Raw {
                sql: sql.into(),
                property: property.into(),
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Raw statement with `?` placeholders and positional parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub parameters: Vec<QueryValue>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum QueryKind {
    Structured(Vec<(String, Constraint)>),
    Statement(Statement),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub kind: QueryKind,
    pub orderings: Vec<(String, Direction)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Default for Query {
    fn default() -> Self {
        Query::structured()
    }
}

impl Query {
    pub fn structured() -> Self {
        Query {
            kind: QueryKind::Structured(Vec::new()),
            orderings: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn statement(sql: impl Into<String>, parameters: Vec<QueryValue>) -> Self {
        Query {
            kind: QueryKind::Statement(Statement {
                sql: sql.into(),
                parameters,
            }),
            orderings: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Adds or replaces the constraint on `property`. No-op on statement queries.
    pub fn constrain(mut self, property: impl Into<String>, constraint: Constraint) -> Self {
        if let QueryKind::Structured(constraints) = &mut self.kind {
            let property = property.into();
            match constraints.iter_mut().find(|(p, _)| *p == property) {
                Some(existing) => existing.1 = constraint,
                None => constraints.push((property, constraint)),
            }
        }
        self
    }

    pub fn order_by(mut self, property: impl Into<String>, direction: Direction) -> Self {
        self.orderings.push((property.into(), direction));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn constraints(&self) -> &[(String, Constraint)] {
        match &self.kind {
            QueryKind::Structured(c) => c,
            QueryKind::Statement(_) => &[],
        }
    }
}
