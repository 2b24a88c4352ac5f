//! Parsing and validation of page scripts.
//!
//! A script is the JSON a user pastes or a generator returns: either one page
//! object or an array of them.

use super::collection::PageInput;
use super::model::Page;
use crate::error::{PanelkitError, Result};
use serde_json::Value;

/// Parses a page script into a page sequence.
///
/// # Errors
///
/// Returns `Validation` if the text is empty, is not JSON, or does not have
/// the page → rows → panels shape.
pub fn parse_pages(script: &str) -> Result<Vec<Page>> {
    if script.trim().is_empty() {
        return Err(PanelkitError::validation("No script provided"));
    }

    let value: Value = serde_json::from_str(script)
        .map_err(|e| PanelkitError::validation(format!("Invalid JSON: {e}")))?;
    pages_from_value(value)
}

/// Validates an already-decoded script and converts it into pages.
pub fn pages_from_value(value: Value) -> Result<Vec<Page>> {
    validate_script(&value)?;

    let input: PageInput = serde_json::from_value(value)
        .map_err(|e| PanelkitError::validation(format!("Invalid page structure: {e}")))?;
    Ok(input.into_pages())
}

/// Checks the structural shape of a script value.
pub fn validate_script(script: &Value) -> Result<()> {
    match script {
        Value::Array(pages) if pages.is_empty() => {
            Err(PanelkitError::validation("Script contains no pages"))
        }
        Value::Array(pages) => pages
            .iter()
            .enumerate()
            .try_for_each(|(index, page)| validate_page(page, index)),
        page => validate_page(page, 0),
    }
}

fn validate_page(page: &Value, index: usize) -> Result<()> {
    let invalid = |detail: &str| {
        PanelkitError::validation(format!("Invalid page structure (page {}): {detail}", index + 1))
    };

    let page = page.as_object().ok_or_else(|| invalid("page is not an object"))?;
    let rows = page
        .get("rows")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("missing rows array"))?;

    for row in rows {
        let panels = row
            .as_object()
            .and_then(|row| row.get("panels"))
            .and_then(Value::as_array)
            .ok_or_else(|| invalid("row without panels array"))?;
        if panels.iter().any(|panel| !panel.is_object()) {
            return Err(invalid("panel is not an object"));
        }
    }

    Ok(())
}
