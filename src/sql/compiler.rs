//! Compiles a [`Query`] into WHERE / ORDER BY / LIMIT fragments.
//!
//! Identifiers cannot be bound as parameters, so every table and column name is
//! checked against [`is_valid_identifier`] before it is written into SQL text.
//! Values are rendered through the storage quoting function, unless a comparison
//! explicitly carries a raw value for its own property.

use crate::error::AppError;
use crate::sql::query::{ComparisonValue, Constraint, Operator, Query, QueryKind, QueryValue, Statement};
use crate::sql::storage::Storage;

/// Property -> column mapping for a virtual object.
pub trait ObjectConfiguration: Send + Sync {
    fn has_property(&self, property: &str) -> bool;
    fn source_key_for_property(&self, property: &str) -> Option<String>;
}

/// ASCII letters, digits and underscores, with at least one letter or digit.
pub fn is_valid_identifier(name: &str) -> bool {
    name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name.chars().any(|c| c.is_ascii_alphanumeric())
}

pub fn check_table_name(table: &str) -> Result<(), AppError> {
    if is_valid_identifier(table) {
        Ok(())
    } else {
        Err(AppError::InvalidTableName(format!("the given table '{}' is not valid", table)))
    }
}

pub fn check_column_name(column: &str) -> Result<(), AppError> {
    if is_valid_identifier(column) {
        Ok(())
    } else {
        Err(AppError::InvalidColumnName(format!("the given column '{}' is not valid", column)))
    }
}

/// Stateless apart from the storage handle used for quoting.
pub struct QueryCompiler<'a> {
    storage: &'a dyn Storage,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(storage: &'a dyn Storage) -> Self {
        QueryCompiler { storage }
    }

    pub fn compile_where(
        &self,
        query: &Query,
        table: &str,
        configuration: Option<&dyn ObjectConfiguration>,
    ) -> Result<String, AppError> {
        check_table_name(table)?;
        match &query.kind {
            QueryKind::Statement(Statement { sql, parameters }) => {
                self.replace_placeholders(sql, parameters, table)
            }
            QueryKind::Structured(constraints) => {
                let mut parts = Vec::with_capacity(constraints.len());
                for (property, constraint) in constraints {
                    let column = resolve_column(property, configuration)?;
                    parts.push(self.render_constraint(&column, property, constraint, table)?);
                }
                Ok(parts.join(" AND "))
            }
        }
    }

    /// Substitutes each `?` with the matching parameter in one forward pass.
    /// Substituted text is never scanned again.
    pub fn replace_placeholders(
        &self,
        sql: &str,
        parameters: &[QueryValue],
        table: &str,
    ) -> Result<String, AppError> {
        let placeholders = sql.matches('?').count();
        if placeholders != parameters.len() {
            return Err(AppError::MalformedQuery(format!(
                "the number of question marks to replace ({}) must be equal to the number of parameters ({})",
                placeholders,
                parameters.len()
            )));
        }
        let mut out = String::with_capacity(sql.len() + parameters.len() * 8);
        let mut parameters = parameters.iter();
        for c in sql.chars() {
            if c != '?' {
                out.push(c);
                continue;
            }
            let parameter = parameters
                .next()
                .ok_or_else(|| AppError::MalformedQuery("missing parameter".into()))?;
            out.push_str(&self.render_parameter(parameter, table));
        }
        Ok(out)
    }

    pub fn compile_order_by(&self, query: &Query) -> Result<String, AppError> {
        let mut parts = Vec::with_capacity(query.orderings.len());
        for (column, direction) in &query.orderings {
            check_column_name(column)?;
            parts.push(format!("{} {}", column, direction.sql()));
        }
        Ok(parts.join(", "))
    }

    /// `offset,limit`. An offset without a limit uses the largest row count.
    pub fn compile_limit(&self, query: &Query) -> String {
        match (query.offset, query.limit) {
            (offset, Some(limit)) => format!("{},{}", offset.unwrap_or(0), limit),
            (Some(offset), None) if offset > 0 => format!("{},{}", offset, u64::MAX),
            _ => String::new(),
        }
    }

    fn render_parameter(&self, parameter: &QueryValue, table: &str) -> String {
        match parameter {
            QueryValue::Null => "NULL".to_string(),
            QueryValue::List(items) => self.render_list(items, table),
            scalar => self.storage.full_quote_str(scalar, table),
        }
    }

    fn render_list(&self, items: &[QueryValue], table: &str) -> String {
        let items: Vec<String> = items
            .iter()
            .map(|item| self.storage.full_quote_str(item, table))
            .collect();
        format!("({})", items.join(","))
    }

    fn render_constraint(
        &self,
        column: &str,
        property: &str,
        constraint: &Constraint,
        table: &str,
    ) -> Result<String, AppError> {
        let (operator, value) = match constraint {
            Constraint::Value(QueryValue::List(_)) => {
                return Err(AppError::InvalidOperator(format!(
                    "operator could not be detected for sequence value of '{}'",
                    property
                )))
            }
            Constraint::Value(value) => (Operator::EqualTo, self.storage.full_quote_str(value, table)),
            Constraint::Comparison { operator, value } => {
                let operator = match operator {
                    Some(token) => token.parse::<Operator>()?,
                    None => Operator::EqualTo,
                };
                (operator, self.render_comparison_value(operator, property, value, table)?)
            }
        };
        Ok(if operator.is_keyword() {
            format!("{} {} {}", column, operator.sql(), value)
        } else {
            format!("{}{}{}", column, operator.sql(), value)
        })
    }

    fn render_comparison_value(
        &self,
        operator: Operator,
        property: &str,
        value: &ComparisonValue,
        table: &str,
    ) -> Result<String, AppError> {
        let value = match value {
            ComparisonValue::Raw { sql, property: allowed } if allowed == property => {
                return Ok(sql.clone())
            }
            ComparisonValue::Raw { sql, .. } => QueryValue::Text(sql.clone()),
            ComparisonValue::Escaped(value) => value.clone(),
        };
        match (operator, value) {
            (Operator::In, QueryValue::List(items)) => Ok(self.render_list(&items, table)),
            (Operator::In, scalar) => Ok(self.render_list(std::slice::from_ref(&scalar), table)),
            (_, QueryValue::List(_)) => Err(AppError::InvalidOperator(format!(
                "operator {} does not accept a sequence value for '{}'",
                operator.token(),
                property
            ))),
            (_, scalar) => Ok(self.storage.full_quote_str(&scalar, table)),
        }
    }
}

fn resolve_column(property: &str, configuration: Option<&dyn ObjectConfiguration>) -> Result<String, AppError> {
    let column = match configuration {
        Some(configuration) => {
            if !configuration.has_property(property) {
                return Err(AppError::InvalidColumnName(format!(
                    "the given property '{}' is not defined",
                    property
                )));
            }
            configuration.source_key_for_property(property).ok_or_else(|| {
                AppError::InvalidColumnName(format!("the given property '{}' has no column", property))
            })?
        }
        None => property.to_string(),
    };
    check_column_name(&column)?;
    Ok(column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::query::Direction;
    use crate::sql::storage::MemoryStorage;
    use std::collections::HashMap;

    struct Mapping(HashMap<&'static str, &'static str>);

    impl ObjectConfiguration for Mapping {
        fn has_property(&self, property: &str) -> bool {
            self.0.contains_key(property)
        }

        fn source_key_for_property(&self, property: &str) -> Option<String> {
            self.0.get(property).map(|c| c.to_string())
        }
    }

    fn compile(query: &Query) -> Result<String, AppError> {
        let storage = MemoryStorage::new();
        QueryCompiler::new(&storage).compile_where(query, "t", None)
    }

    #[test]
    fn structured_equality() {
        let q = Query::structured().constrain("status", Constraint::compare(Operator::EqualTo, "active"));
        assert_eq!(compile(&q).unwrap(), "status='active'");
    }

    #[test]
    fn structured_in_list() {
        let q = Query::structured().constrain("ids", Constraint::compare(Operator::In, vec![1, 2, 3]));
        assert_eq!(compile(&q).unwrap(), "ids IN (1,2,3)");
    }

    #[test]
    fn bare_values_default_to_equality_and_are_joined_with_and() {
        let q = Query::structured()
            .constrain("title", Constraint::equal_to("x' OR '1'='1"))
            .constrain("deleted", Constraint::equal_to(QueryValue::Null))
            .constrain("pid", Constraint::equal_to(4));
        assert_eq!(
            compile(&q).unwrap(),
            "title='x'' OR ''1''=''1' AND deleted=NULL AND pid=4"
        );
    }

    #[test]
    fn all_operators_render() {
        let cases = [
            (Operator::NotEqualTo, "a!=1"),
            (Operator::LessThan, "a<1"),
            (Operator::LessThanOrEqualTo, "a<=1"),
            (Operator::GreaterThan, "a>1"),
            (Operator::GreaterThanOrEqualTo, "a>=1"),
        ];
        for (op, expected) in cases {
            let q = Query::structured().constrain("a", Constraint::compare(op, 1));
            assert_eq!(compile(&q).unwrap(), expected);
        }
        let q = Query::structured().constrain("a", Constraint::compare(Operator::Like, "%x%"));
        assert_eq!(compile(&q).unwrap(), "a LIKE '%x%'");
    }

    #[test]
    fn unknown_operator_token_fails() {
        let q = Query::structured().constrain("a", Constraint::with_token("CONTAINS", 1));
        assert!(matches!(compile(&q), Err(AppError::InvalidOperator(_))));
        let q = Query::structured().constrain("a", Constraint::with_token("=", 1));
        assert!(matches!(compile(&q), Err(AppError::InvalidOperator(_))));
    }

    #[test]
    fn sequence_without_in_fails() {
        let q = Query::structured().constrain("a", Constraint::equal_to(vec![1, 2]));
        assert!(matches!(compile(&q), Err(AppError::InvalidOperator(_))));
        let q = Query::structured().constrain("a", Constraint::compare(Operator::LessThan, vec![1]));
        assert!(matches!(compile(&q), Err(AppError::InvalidOperator(_))));
    }

    #[test]
    fn raw_value_only_for_its_own_property() {
        let q = Query::structured().constrain("created", Constraint::raw(Operator::GreaterThan, "created", "NOW()"));
        assert_eq!(compile(&q).unwrap(), "created>NOW()");

        let q = Query::structured().constrain("created", Constraint::raw(Operator::GreaterThan, "other", "NOW()"));
        assert_eq!(compile(&q).unwrap(), "created>'NOW()'");
    }

    #[test]
    fn unsafe_column_and_table_names_fail() {
        let q = Query::structured().constrain("a;DROP TABLE t", Constraint::equal_to(1));
        assert!(matches!(compile(&q), Err(AppError::InvalidColumnName(_))));
        let q = Query::structured().constrain("_", Constraint::equal_to(1));
        assert!(matches!(compile(&q), Err(AppError::InvalidColumnName(_))));

        let storage = MemoryStorage::new();
        let err = QueryCompiler::new(&storage)
            .compile_where(&Query::structured(), "t where 1=1", None)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTableName(_)));
    }

    #[test]
    fn properties_resolve_through_configuration() {
        let mapping = Mapping(HashMap::from([("title", "header"), ("broken", "bad-column")]));
        let storage = MemoryStorage::new();
        let compiler = QueryCompiler::new(&storage);

        let q = Query::structured().constrain("title", Constraint::equal_to("a"));
        assert_eq!(compiler.compile_where(&q, "t", Some(&mapping)).unwrap(), "header='a'");

        let q = Query::structured().constrain("header", Constraint::equal_to("a"));
        assert!(matches!(
            compiler.compile_where(&q, "t", Some(&mapping)),
            Err(AppError::InvalidColumnName(_))
        ));

        let q = Query::structured().constrain("broken", Constraint::equal_to("a"));
        assert!(matches!(
            compiler.compile_where(&q, "t", Some(&mapping)),
            Err(AppError::InvalidColumnName(_))
        ));
    }

    #[test]
    fn statement_placeholders_are_positional() {
        let q = Query::statement("a = ? AND b = ?", vec![5.into(), QueryValue::Null]);
        assert_eq!(compile(&q).unwrap(), "a = 5 AND b = NULL");

        let q = Query::statement("uid IN ? AND title = ?", vec![vec![1, 2].into(), "?".into()]);
        assert_eq!(compile(&q).unwrap(), "uid IN (1,2) AND title = '?'");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let q = Query::statement("a = ? AND b = ?", vec!["x?y".into(), "??".into()]);
        assert_eq!(compile(&q).unwrap(), "a = 'x?y' AND b = '??'");
    }

    #[test]
    fn placeholder_count_mismatch_fails() {
        let q = Query::statement("a = ?", vec![]);
        assert!(matches!(compile(&q), Err(AppError::MalformedQuery(_))));
        let q = Query::statement("a = 1", vec![1.into()]);
        assert!(matches!(compile(&q), Err(AppError::MalformedQuery(_))));
    }

    #[test]
    fn compiling_twice_is_identical() {
        let q = Query::structured()
            .constrain("a", Constraint::compare(Operator::In, vec!["x", "y"]))
            .constrain("b", Constraint::equal_to(2));
        assert_eq!(compile(&q).unwrap(), compile(&q).unwrap());
    }

    #[test]
    fn order_by_in_given_order() {
        let storage = MemoryStorage::new();
        let compiler = QueryCompiler::new(&storage);
        let q = Query::structured()
            .order_by("name", Direction::Asc)
            .order_by("id", Direction::Desc);
        assert_eq!(compiler.compile_order_by(&q).unwrap(), "name ASC, id DESC");
        assert_eq!(compiler.compile_order_by(&Query::structured()).unwrap(), "");

        let q = Query::structured().order_by("name; --", Direction::Asc);
        assert!(matches!(compiler.compile_order_by(&q), Err(AppError::InvalidColumnName(_))));
    }

    #[test]
    fn limit_and_offset() {
        let storage = MemoryStorage::new();
        let compiler = QueryCompiler::new(&storage);
        assert_eq!(compiler.compile_limit(&Query::structured()), "");
        assert_eq!(compiler.compile_limit(&Query::structured().limit(10)), "0,10");
        assert_eq!(compiler.compile_limit(&Query::structured().limit(10).offset(20)), "20,10");
        assert_eq!(
            compiler.compile_limit(&Query::structured().offset(5)),
            format!("5,{}", u64::MAX)
        );
        assert_eq!(compiler.compile_limit(&Query::structured().offset(0)), "");
    }
}
