//! # Columnar Table Values
//!
//! The in-memory stand-in for a dataframe: named columns of homogeneous-ish
//! scalar data, serialized column-by-column to a compact binary form for
//! embedding in notebook outputs (see the `arrow` encoder in
//! [`crate::encoders`]).
//!
//! The binary layout is the table's column-ordered `bincode` serialization.
//! [`Datum`] is a closed scalar enum rather than a JSON value so the binary
//! form stays self-contained and non-self-describing.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// One scalar cell of a [`Table`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Datum {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Datum {
    /// JSON rendering of the scalar, used when a table leaks into a text
    /// context (summaries, text/plain display).
    pub fn to_json(&self) -> Value {
        match self {
            Datum::Null => Value::Null,
            Datum::Bool(b) => Value::Bool(*b),
            Datum::Int(i) => Value::from(*i),
            Datum::Float(f) => Value::from(*f),
            Datum::Text(s) => Value::String(s.clone()),
        }
    }
}

/// A named column in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Datum>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Datum>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// A column-oriented table value.
///
/// Columns keep their insertion order; rows are positional across columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column append.
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<Datum>) -> Self {
        self.columns.push(Column::new(name, values));
        self
    }

    pub fn push_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Row count of the longest column.
    pub fn num_rows(&self) -> usize {
        self.columns.iter().map(|c| c.values.len()).max().unwrap_or(0)
    }

    /// Serializes the table column-by-column to its binary wire form.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Parses the binary wire form back into a table.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<table: {} rows x {} columns>",
            self.num_rows(),
            self.num_columns()
        )
    }
}
