//! Record-level statement builders.
//!
//! Turns the structured arguments of the record tools (column → value maps,
//! column lists, filters) into prepared statements. Table and column names
//! are backtick-quoted; every value travels as a bound `?` parameter.
//!
//! Filters are equality conditions joined with `AND`. A `null` filter value
//! becomes `IS NULL`, since `= NULL` never matches.

use crate::error::{DbError, DbResult};
use crate::models::BoundStatement;
use crate::tools::dispatcher::quote_identifier;
use serde_json::{Map, Value as JsonValue};

/// Column → value pairs, in argument order.
pub type Record = Map<String, JsonValue>;

/// `INSERT INTO t (..) VALUES (..)` for one record.
pub fn insert(table: &str, data: &Record) -> DbResult<BoundStatement> {
    bulk_insert(table, std::slice::from_ref(data))
}

/// One multi-row `INSERT` for every record.
///
/// The first record fixes the column list. Every other record must name the
/// same columns; their values are bound in the first record's column order.
pub fn bulk_insert(table: &str, records: &[Record]) -> DbResult<BoundStatement> {
    let Some(first) = records.first() else {
        return Err(DbError::invalid_input("No records to insert"));
    };
    if first.is_empty() {
        return Err(DbError::invalid_input("A record needs at least one column"));
    }

    let columns: Vec<&String> = first.keys().collect();
    let mut params = Vec::with_capacity(columns.len() * records.len());

    for (index, record) in records.iter().enumerate() {
        if record.len() != columns.len() {
            return Err(mismatched_record(index));
        }
        for column in &columns {
            match record.get(*column) {
                Some(value) => params.push(value.clone()),
                None => return Err(mismatched_record(index)),
            }
        }
    }

    let row = placeholders(columns.len());
    let values = vec![row; records.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES {}",
        quote_identifier(table),
        column_list(columns.iter().copied()),
        values
    );
    Ok(BoundStatement::write(sql, params))
}

fn mismatched_record(index: usize) -> DbError {
    DbError::invalid_input(format!(
        "Record {} does not have the same columns as the first record",
        index
    ))
}

/// Options for [`select`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectOptions<'a> {
    pub columns: Option<&'a [String]>,
    pub filters: Option<&'a Record>,
    pub order_by: Option<&'a str>,
    pub limit: Option<u64>,
}

/// `SELECT` with optional column list, filters, ordering and limit.
///
/// An empty column list selects every column. A limit of 0 means no limit.
pub fn select(table: &str, options: SelectOptions<'_>) -> DbResult<BoundStatement> {
    let columns = match options.columns {
        Some(columns) if !columns.is_empty() => column_list(columns.iter()),
        _ => "*".to_string(),
    };

    let mut sql = format!("SELECT {} FROM {}", columns, quote_identifier(table));
    let mut params = Vec::new();

    if let Some(filters) = options.filters {
        push_where(&mut sql, &mut params, filters);
    }
    if let Some(order_by) = options.order_by.filter(|o| !o.trim().is_empty()) {
        sql.push_str(" ORDER BY ");
        sql.push_str(&order_by_clause(order_by)?);
    }
    if let Some(limit) = options.limit.filter(|l| *l > 0) {
        sql.push_str(" LIMIT ?");
        params.push(JsonValue::from(limit));
    }

    Ok(BoundStatement::query(sql, params))
}

/// The first row whose `id_column` equals `id_value`.
pub fn select_by_id(table: &str, id_column: &str, id_value: &JsonValue) -> BoundStatement {
    let sql = format!(
        "SELECT * FROM {} WHERE {} = ? LIMIT 1",
        quote_identifier(table),
        quote_identifier(id_column)
    );
    BoundStatement::query(sql, vec![id_value.clone()])
}

/// `SELECT COUNT(*) AS total`, optionally filtered.
pub fn count(table: &str, filters: Option<&Record>) -> BoundStatement {
    let mut sql = format!("SELECT COUNT(*) AS total FROM {}", quote_identifier(table));
    let mut params = Vec::new();
    if let Some(filters) = filters {
        push_where(&mut sql, &mut params, filters);
    }
    BoundStatement::query(sql, params)
}

/// `UPDATE t SET .. WHERE ..`. Refuses to run without a filter.
pub fn update(table: &str, data: &Record, filters: &Record) -> DbResult<BoundStatement> {
    if data.is_empty() {
        return Err(DbError::invalid_input("No columns to update"));
    }
    require_filters(filters, "update")?;

    let assignments: Vec<String> = data
        .keys()
        .map(|column| format!("{} = ?", quote_identifier(column)))
        .collect();
    let mut sql = format!(
        "UPDATE {} SET {}",
        quote_identifier(table),
        assignments.join(", ")
    );
    let mut params: Vec<JsonValue> = data.values().cloned().collect();
    push_where(&mut sql, &mut params, filters);

    Ok(BoundStatement::write(sql, params))
}

/// `DELETE FROM t WHERE ..`. Refuses to run without a filter.
pub fn delete(table: &str, filters: &Record) -> DbResult<BoundStatement> {
    require_filters(filters, "delete")?;

    let mut sql = format!("DELETE FROM {}", quote_identifier(table));
    let mut params = Vec::new();
    push_where(&mut sql, &mut params, filters);

    Ok(BoundStatement::write(sql, params))
}

/// Single-entry filter matching one record by id.
pub fn id_filter(id_column: &str, id_value: &JsonValue) -> Record {
    let mut filters = Record::new();
    filters.insert(id_column.to_string(), id_value.clone());
    filters
}

fn require_filters(filters: &Record, action: &str) -> DbResult<()> {
    if filters.is_empty() {
        return Err(DbError::invalid_input(format!(
            "Refusing to {} without a `where` condition",
            action
        )));
    }
    Ok(())
}

fn push_where(sql: &mut String, params: &mut Vec<JsonValue>, filters: &Record) {
    if filters.is_empty() {
        return;
    }

    let conditions: Vec<String> = filters
        .iter()
        .map(|(column, value)| {
            if value.is_null() {
                format!("{} IS NULL", quote_identifier(column))
            } else {
                params.push(value.clone());
                format!("{} = ?", quote_identifier(column))
            }
        })
        .collect();

    sql.push_str(" WHERE ");
    sql.push_str(&conditions.join(" AND "));
}

/// Parse `column [ASC|DESC], ...` into a quoted `ORDER BY` list.
fn order_by_clause(order_by: &str) -> DbResult<String> {
    let invalid = || {
        DbError::invalid_input(format!(
            "Invalid order_by '{}': expected `column [ASC|DESC]`, comma separated",
            order_by
        ))
    };

    let mut terms = Vec::new();
    for term in order_by.split(',') {
        let mut words = term.split_whitespace();
        let column = words.next().ok_or_else(invalid)?;
        let direction = match words.next() {
            None => None,
            Some(d) if d.eq_ignore_ascii_case("asc") => Some("ASC"),
            Some(d) if d.eq_ignore_ascii_case("desc") => Some("DESC"),
            Some(_) => return Err(invalid()),
        };
        if words.next().is_some() {
            return Err(invalid());
        }

        let quoted = quote_identifier(column);
        terms.push(match direction {
            Some(direction) => format!("{} {}", quoted, direction),
            None => quoted,
        });
    }
    Ok(terms.join(", "))
}

fn column_list<'a>(columns: impl Iterator<Item = &'a String>) -> String {
    columns
        .map(|column| quote_identifier(column))
        .collect::<Vec<_>>()
        .join(", ")
}

fn placeholders(count: usize) -> String {
    format!("({})", vec!["?"; count].join(", "))
}
