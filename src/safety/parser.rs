//! Parser-backed read-only check.
//!
//! Uses sqlparser-rs with the SQLite dialect to confirm that a query which
//! already passed the lexical checks really is one read-only statement.

use sqlparser::ast::{Query, SetExpr, Statement, TableFactor, TableWithJoins};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

use super::ValidationError;

/// Checks that `sql` parses to exactly one statement with no data-modifying parts.
///
/// `allowed` is only used to word the `NotReadOnly` rejection.
pub fn check_read_only_statement(
    sql: &str,
    allowed: &[String],
) -> std::result::Result<(), ValidationError> {
    let statements =
        Parser::parse_sql(&SQLiteDialect {}, sql).map_err(|e| ValidationError::Unparseable {
            reason: e.to_string(),
        })?;

    match statements.as_slice() {
        [] => Err(ValidationError::Unparseable {
            reason: "empty statement".to_string(),
        }),
        [Statement::Query(query)] if query_is_read_only(query) => Ok(()),
        [_] => Err(ValidationError::NotReadOnly {
            allowed: allowed.to_vec(),
        }),
        _ => Err(ValidationError::MultiStatement),
    }
}

/// Recursively inspects CTEs, set operations and derived tables.
fn query_is_read_only(query: &Query) -> bool {
    let ctes_read_only = query
        .with
        .as_ref()
        .is_none_or(|with| with.cte_tables.iter().all(|cte| query_is_read_only(&cte.query)));

    ctes_read_only && set_expr_is_read_only(&query.body)
}

fn set_expr_is_read_only(set_expr: &SetExpr) -> bool {
    match set_expr {
        SetExpr::Select(select) => select.from.iter().all(table_with_joins_is_read_only),
        SetExpr::Query(query) => query_is_read_only(query),
        SetExpr::SetOperation { left, right, .. } => {
            set_expr_is_read_only(left) && set_expr_is_read_only(right)
        }
        SetExpr::Values(_) | SetExpr::Table(_) => true,
        // Insert, Update and anything newer
        _ => false,
    }
}

fn table_with_joins_is_read_only(twj: &TableWithJoins) -> bool {
    table_factor_is_read_only(&twj.relation)
        && twj
            .joins
            .iter()
            .all(|join| table_factor_is_read_only(&join.relation))
}

fn table_factor_is_read_only(factor: &TableFactor) -> bool {
    match factor {
        TableFactor::Derived { subquery, .. } => query_is_read_only(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => table_with_joins_is_read_only(table_with_joins),
        _ => true,
    }
}
