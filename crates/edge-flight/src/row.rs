//! Row encoding.

use std::fmt;

use edge_core::NodeId;
use serde::Serialize;
use serde_json::Value;

/// Kind of a side-channel row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowTag {
    /// Model tree.
    Model,
    /// Shared symbol.
    Symbol,
    /// Client module reference.
    Module,
    /// Boundary error.
    Error,
}

impl RowTag {
    pub fn as_char(&self) -> char {
        match self {
            Self::Model => 'J',
            Self::Symbol => 'S',
            Self::Module => 'M',
            Self::Error => 'E',
        }
    }

    /// Whether rows of this kind are emitted once per request and shared.
    pub fn is_shared(&self) -> bool {
        matches!(self, Self::Symbol | Self::Module)
    }
}

/// One row: `<tag><id>:<json>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightRow {
    pub tag: RowTag,
    pub id: NodeId,
    pub payload: Value,
}

impl FlightRow {
    pub fn new(tag: RowTag, id: NodeId, payload: Value) -> Self {
        Self { tag, id, payload }
    }

    /// Encode the row.
    pub fn encode(&self) -> String {
        format!("{}{}:{}", self.tag.as_char(), self.id, self.payload)
    }
}

impl fmt::Display for FlightRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Reference to a symbol row.
pub fn symbol_ref(id: NodeId) -> String {
    format!("$S{}", id)
}

/// Reference to a module row.
pub fn module_ref(id: NodeId) -> String {
    format!("$@{}", id)
}

/// Reference to a boundary whose row arrives later.
pub fn lazy_ref(id: NodeId) -> String {
    format!("$L{}", id)
}

/// Escape user text so it cannot be read as a reference.
pub fn escape_text_value(text: &str) -> String {
    if text.starts_with('$') {
        format!("${}", text)
    } else {
        text.to_string()
    }
}
