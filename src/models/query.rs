//! Query-related data models.
//!
//! This module defines the statements handed to a database client and the
//! result of running one.

use serde::Serialize;
use serde_json::Value as JsonValue;

/// A single result row, keyed by column name.
pub type Row = serde_json::Map<String, JsonValue>;

/// Whether a bound statement returns a result set or a write summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Query,
    Write,
}

/// A prepared statement with `?` placeholders and the values bound to them.
///
/// Values are never spliced into `sql`; identifiers are quoted by the
/// builder that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    pub params: Vec<JsonValue>,
    pub kind: StatementKind,
}

impl BoundStatement {
    pub fn query(sql: impl Into<String>, params: Vec<JsonValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
            kind: StatementKind::Query,
        }
    }

    pub fn write(sql: impl Into<String>, params: Vec<JsonValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
            kind: StatementKind::Write,
        }
    }
}

/// What a statement produced.
///
/// Serializes as a plain array of row objects for result sets, or as the
/// `{"affectedRows": .., "insertId": ..}` header for statements without one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatementOutput {
    Rows(Vec<Row>),
    #[serde(rename_all = "camelCase")]
    Affected {
        affected_rows: u64,
        insert_id: u64,
    },
}

impl StatementOutput {
    /// Number of rows in the result set, or rows touched by a write.
    pub fn row_count(&self) -> u64 {
        match self {
            Self::Rows(rows) => rows.len() as u64,
            Self::Affected { affected_rows, .. } => *affected_rows,
        }
    }

    /// Rows of a result set. Empty for writes.
    pub fn rows(&self) -> &[Row] {
        match self {
            Self::Rows(rows) => rows,
            Self::Affected { .. } => &[],
        }
    }
}
