//! Result sets and their text rendering.
//!
//! The agent never sees typed values: every successful query reaches it as
//! the `|`-separated table produced by [`QueryResult::to_table_text`].

use std::time::Duration;

/// Rendering of a result set with no rows.
pub const EMPTY_RESULT_TEXT: &str = "(no rows)";

/// Separator between cells of a rendered row.
const CELL_SEPARATOR: &str = " | ";

/// Rows returned by one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Row>,
    /// Wall time spent in the driver.
    pub execution_time: Duration,
    /// Rows kept, after the client's cap.
    pub row_count: usize,
    /// True when the client dropped rows past its cap.
    pub was_truncated: bool,
}

impl QueryResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a result from decoded columns and rows.
    pub fn with_data(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        Self {
            row_count: rows.len(),
            columns,
            rows,
            ..Self::default()
        }
    }

    pub fn with_execution_time(mut self, duration: Duration) -> Self {
        self.execution_time = duration;
        self
    }

    pub fn truncated(mut self) -> Self {
        self.was_truncated = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header line of column names, one line per row, and a marker line if
    /// rows were dropped.
    pub fn to_table_text(&self) -> String {
        if self.is_empty() {
            return EMPTY_RESULT_TEXT.to_string();
        }

        let header = (!self.columns.is_empty()).then(|| {
            self.columns
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(CELL_SEPARATOR)
        });
        let body = self.rows.iter().map(|row| {
            row.iter()
                .map(Value::to_display_string)
                .collect::<Vec<_>>()
                .join(CELL_SEPARATOR)
        });

        let mut lines: Vec<String> = header.into_iter().chain(body).collect();
        if self.was_truncated {
            lines.push(format!("(truncated to {} rows)", self.row_count));
        }
        lines.join("\n")
    }
}

/// Name and declared type of a result column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    /// Driver type name; empty for untyped expressions.
    pub data_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

pub type Row = Vec<Value>;

/// One cell, by SQLite storage class.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl Value {
    /// Text shown to the agent for this cell.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::Bytes(b) => format!("<{} bytes>", b.len()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
