//! HTML table extraction.
//!
//! Locates a `<table>` by id, reads its `<th>` cells as headers and zips the
//! `<td>` cells of every body row onto them.

use scraper::{ElementRef, Html, Selector};

use crate::error::AppError;
use crate::models::RawRecord;

/// Extract every well-formed body row of the table with id `table_id`.
///
/// Rows whose cell count differs from the header count are skipped with a
/// warning. Empty headers produce no key.
pub fn extract_table(html: &str, table_id: &str) -> Result<Vec<RawRecord>, AppError> {
    let document = Html::parse_document(html);

    let table_sel = selector(&format!("table[id=\"{table_id}\"]"))?;
    let table = document.select(&table_sel).next().ok_or_else(|| {
        AppError::NotFoundError(format!("Table with id '{table_id}' not found in the page"))
    })?;

    let header_sel = selector("th")?;
    let headers: Vec<String> = table.select(&header_sel).map(cell_text).collect();
    if headers.is_empty() {
        return Err(AppError::NotFoundError(format!(
            "No header cells in table '{table_id}'"
        )));
    }

    let body_sel = selector("tbody")?;
    let no_body = || AppError::NotFoundError(format!("Table '{table_id}' has no tbody"));
    let body = table.select(&body_sel).next().ok_or_else(no_body)?;

    // The parser wraps bare `<tr>` rows in an implied tbody; a header row
    // inside it without any thead means the page had no body section.
    let thead_sel = selector("thead")?;
    if table.select(&thead_sel).next().is_none() && body.select(&header_sel).next().is_some() {
        return Err(no_body());
    }

    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;
    let mut records = Vec::new();

    for (index, row) in body.select(&row_sel).enumerate() {
        let cells: Vec<String> = row.select(&cell_sel).map(cell_text).collect();
        if cells.len() != headers.len() {
            tracing::warn!(
                table = table_id,
                row = index,
                cells = cells.len(),
                headers = headers.len(),
                "Row length does not match header length, skipping row"
            );
            continue;
        }

        let record: RawRecord = headers
            .iter()
            .zip(cells)
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, cell)| (header.clone(), cell))
            .collect();
        records.push(record);
    }

    tracing::debug!(table = table_id, rows = records.len(), "Extracted table");
    Ok(records)
}

fn cell_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn selector(css: &str) -> Result<Selector, AppError> {
    Selector::parse(css)
        .map_err(|e| AppError::ParseError(format!("Invalid CSS selector '{css}': {e}")))
}
