//! Purpose: Render a grid page as a titled text table or a JSON document.
//! Exports: `render_page`, `page_json`.
//! Role: Presentation only; all row selection happens in `booklist::grid`.
//! Invariants: Page numbers shown to humans and in JSON are 1-based.
use booklist::{RenderedPage, Row};
use serde_json::{Value, json};

const TITLE: &str = "Booklist";
const MAX_CELL_WIDTH: usize = 40;

pub(super) fn render_page(page: &RenderedPage) -> String {
    let mut out = String::new();
    out.push_str(TITLE);
    out.push('\n');
    out.push('\n');

    let data_headers: Vec<&str> = page.headers.iter().copied().filter(|h| !h.is_empty()).collect();
    let action_cells: Vec<String> = page
        .rows
        .iter()
        .map(|row| match row.delete_trigger() {
            Some(id) => format!("delete {id}"),
            None => "-".to_string(),
        })
        .collect();

    let mut widths: Vec<usize> = data_headers.iter().map(|h| h.chars().count()).collect();
    for row in &page.rows {
        for (width, cell) in widths.iter_mut().zip(&row.cells) {
            *width = (*width).max(cell.chars().count()).min(MAX_CELL_WIDTH);
        }
    }

    let mut header_cells: Vec<String> = data_headers
        .iter()
        .zip(&widths)
        .map(|(header, width)| pad(header, *width))
        .collect();
    header_cells.push(String::new());
    out.push_str(header_cells.join("  ").trim_end());
    out.push('\n');
    let rule_width: usize = widths.iter().sum::<usize>() + 2 * widths.len();
    out.push_str(&"-".repeat(rule_width.max(TITLE.len())));
    out.push('\n');

    if page.rows.is_empty() {
        out.push_str("(no books)\n");
    }
    for (row, action) in page.rows.iter().zip(&action_cells) {
        let mut cells: Vec<String> = row
            .cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| pad(cell, *width))
            .collect();
        cells.push(action.clone());
        out.push_str(cells.join("  ").trim_end());
        out.push('\n');
    }

    out.push_str(&format!(
        "\npage {}/{} ({} of {} books)\n",
        page.page + 1,
        page.page_count,
        page.matching_rows,
        page.total_rows
    ));
    out
}

pub(super) fn page_json(page: &RenderedPage) -> Value {
    let rows: Vec<Value> = page
        .rows
        .iter()
        .map(|rendered| {
            let mut value = serde_json::to_value(Row::new(&rendered.id, rendered.book.clone()))
                .unwrap_or(Value::Null);
            if let Value::Object(map) = &mut value {
                map.insert(
                    "deletable".to_string(),
                    json!(rendered.delete_trigger().is_some()),
                );
            }
            value
        })
        .collect();
    json!({
        "title": TITLE,
        "page": page.page + 1,
        "page_count": page.page_count,
        "matching_rows": page.matching_rows,
        "total_rows": page.total_rows,
        "rows": rows,
    })
}

fn pad(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count > width {
        let mut clipped: String = text.chars().take(width.saturating_sub(1)).collect();
        clipped.push('~');
        return clipped;
    }
    format!("{text}{}", " ".repeat(width - count))
}
