//! Embedding rows into the HTML stream.

use crate::FlightPushRecord;

/// Escape a row for a JavaScript template literal inside a `<script>`.
pub fn escape_template_literal(row: &str) -> String {
    let mut out = String::with_capacity(row.len() + 8);
    let mut chars = row.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '`' => out.push_str("\\`"),
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            '<' if chars.peek() == Some(&'/') || chars.peek() == Some(&'!') => out.push_str("\\x3C"),
            _ => out.push(c),
        }
    }
    out
}

/// `<script>{global}.push(`row`)</script>`.
pub fn push_statement(global: &str, record: &FlightPushRecord) -> String {
    format!(
        "<script>{}.push(`{}`)</script>",
        global,
        escape_template_literal(&record.encode())
    )
}

/// Push statements for a batch, in sequence order.
pub fn push_statements(global: &str, records: &[FlightPushRecord]) -> String {
    records.iter().map(|r| push_statement(global, r)).collect()
}

/// Newline-terminated rows for a raw side-channel response.
pub fn row_lines(records: &[FlightPushRecord]) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&record.encode());
        out.push('\n');
    }
    out
}
