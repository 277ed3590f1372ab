//! Rendering fetched rows for the terminal

use anyhow::Result;
use serde_json::Value;
use std::io::Write;

use crate::list_query::ListState;

/// Write rows as CSV with one column per field name
pub fn write_csv<W: Write>(rows: &[Value], columns: &[&str], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(columns)?;
    for row in rows {
        csv_writer.write_record(columns.iter().map(|column| cell(row, column)))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write the page and its pagination as pretty JSON
pub fn write_json<W: Write>(state: &ListState<Value>, mut writer: W) -> Result<()> {
    let body = serde_json::json!({
        "items": state.items,
        "pagination": state.pagination,
    });
    serde_json::to_writer_pretty(&mut writer, &body)?;
    writeln!(writer)?;
    Ok(())
}

/// One-line pagination summary, e.g. `Page 2/5 (48 results)`
pub fn page_summary(state: &ListState<Value>) -> String {
    let meta = &state.pagination;
    format!(
        "Page {}/{} ({} results){}{}",
        meta.current_page(),
        meta.total_pages(),
        meta.total_results(),
        if meta.has_prev() { " [prev]" } else { "" },
        if meta.has_next() { " [next]" } else { "" },
    )
}

fn cell(row: &Value, column: &str) -> String {
    match row.get(column) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
