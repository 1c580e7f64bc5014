//! Markup for collected block items.
//!
//! Output is inserted into the document unescaped; sanitising labels and
//! values is the caller's job.

use crate::domain::model::{OutputType, RenderedItem};

const TABLE_STYLE: &str = "width: 100%; border-collapse: collapse; border: 1px solid #000;";
const TABLE_CELL_STYLE: &str = "border: 1px solid #000; padding: 8px; text-align: left;";
const PLAIN_TABLE_STYLE: &str = "width: 100%; border-collapse: collapse; border: none;";
const PLAIN_TABLE_CELL_STYLE: &str = "border: none; padding: 2px 8px; text-align: left;";

pub const DEFAULT_LABEL_HEADER: &str = "Activity";
pub const DEFAULT_VALUE_HEADER: &str = "Value";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHeaders {
    pub label: String,
    pub value: String,
}

impl Default for TableHeaders {
    fn default() -> Self {
        Self {
            label: DEFAULT_LABEL_HEADER.to_string(),
            value: DEFAULT_VALUE_HEADER.to_string(),
        }
    }
}

impl TableHeaders {
    pub fn with_value_header(value: &str) -> Self {
        Self {
            value: value.to_string(),
            ..Self::default()
        }
    }
}

pub fn render(items: &[RenderedItem], output_type: &OutputType) -> String {
    render_with_headers(items, output_type, &TableHeaders::default())
}

pub fn render_with_headers(
    items: &[RenderedItem],
    output_type: &OutputType,
    headers: &TableHeaders,
) -> String {
    if items.is_empty() {
        return String::new();
    }

    match output_type {
        OutputType::Table => render_table(items, headers),
        OutputType::TableNoBorders => render_table_no_borders(items, headers),
        OutputType::Paragraph => render_paragraph(items),
        OutputType::Bullets | OutputType::List => render_bullets(items),
        OutputType::Other(raw) => {
            tracing::debug!("Unknown output type '{}', rendering bullets", raw);
            render_bullets(items)
        }
    }
}

fn render_bullets(items: &[RenderedItem]) -> String {
    let mut html = String::from("<ul>");
    for item in items {
        html.push_str(&format!(
            "<li><strong>{}:</strong> {}</li>",
            item.label, item.value
        ));
    }
    html.push_str("</ul>");
    html
}

fn render_table(items: &[RenderedItem], headers: &TableHeaders) -> String {
    table_markup(items, headers, TABLE_STYLE, TABLE_CELL_STYLE)
}

fn render_table_no_borders(items: &[RenderedItem], headers: &TableHeaders) -> String {
    table_markup(items, headers, PLAIN_TABLE_STYLE, PLAIN_TABLE_CELL_STYLE)
}

fn table_markup(
    items: &[RenderedItem],
    headers: &TableHeaders,
    table_style: &str,
    cell_style: &str,
) -> String {
    let mut html = format!(
        "<table style=\"{table_style}\"><thead><tr><th style=\"{cell_style}\">{}</th><th style=\"{cell_style}\">{}</th></tr></thead><tbody>",
        headers.label, headers.value
    );
    for item in items {
        html.push_str(&format!(
            "<tr><td style=\"{cell_style}\">{}</td><td style=\"{cell_style}\">{}</td></tr>",
            item.label, item.value
        ));
    }
    html.push_str("</tbody></table>");
    html
}

fn render_paragraph(items: &[RenderedItem]) -> String {
    let joined = items
        .iter()
        .map(|item| format!("{}: {}", item.label, item.value))
        .collect::<Vec<_>>()
        .join(", ");
    format!("<p>{}</p>", joined)
}
