//! Turns a scraped page into location records.
//!
//! The first `<table>` in the document wins: its first row is treated as the
//! header and every later row with at least four `<td>` cells becomes a record.
//! Pages without a table are read as plain text and scanned for
//! `name | Q<digits> | street | city/state` lines.

use crate::domain::model::LocationRecord;
use crate::utils::error::{EtlError, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "br", "dd", "div", "dt", "footer", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "li", "p", "pre", "section", "td", "th", "tr",
];

const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Names that show up when a header row leaks into the plain-text scan.
const HEADER_NAMES: &[&str] = &["retailer", "store"];

// Pattern and selectors are compile-time constants, so parsing cannot fail.
static PIPE_ROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z \t&]+)[ \t]*\|[ \t]*(Q\d+)[ \t]*\|[ \t]*([^|\n]+)[ \t]*\|[ \t]*([^|\n]+)")
        .unwrap()
});
static TABLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static ROW_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    Table,
    PipeText,
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub strategy: ExtractionStrategy,
    pub records: Vec<LocationRecord>,
}

/// Extracts records, logging and swallowing any failure.
pub fn extract(markup: &str) -> Vec<LocationRecord> {
    match try_extract(markup) {
        Ok(extraction) => extraction.records,
        Err(e) => {
            tracing::error!("Error processing markup: {}", e);
            Vec::new()
        }
    }
}

/// Extracts records, returning an error to callers that need data when the
/// page yields none.
pub fn try_extract(markup: &str) -> Result<Extraction> {
    let document = Html::parse_document(markup);

    let extraction = match document.select(&TABLE_SELECTOR).next() {
        Some(table) => Extraction {
            strategy: ExtractionStrategy::Table,
            records: extract_table(table),
        },
        None => {
            tracing::debug!("No table found, falling back to pipe-separated text");
            Extraction {
                strategy: ExtractionStrategy::PipeText,
                records: extract_pipe_text(&visible_text(&document)),
            }
        }
    };

    if extraction.records.is_empty() {
        return Err(EtlError::Extraction {
            message: format!("no location rows found ({:?} strategy)", extraction.strategy),
        });
    }

    tracing::info!(
        "Extracted {} locations ({:?} strategy)",
        extraction.records.len(),
        extraction.strategy
    );
    Ok(extraction)
}

fn extract_table(table: ElementRef<'_>) -> Vec<LocationRecord> {
    table
        .select(&ROW_SELECTOR)
        .skip(1)
        .filter_map(|row| {
            let cells: Vec<String> = row.select(&CELL_SELECTOR).map(cell_text).collect();
            if cells.len() < 4 {
                tracing::trace!("Skipping row with {} cells", cells.len());
                return None;
            }
            Some(LocationRecord::from_parts(&cells[0], &cells[1], &cells[2], &cells[3]))
        })
        .collect()
}

/// Scans plain text for pipe-separated location rows.
pub fn extract_pipe_text(text: &str) -> Vec<LocationRecord> {
    PIPE_ROW_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let name = caps[1].trim();
            let machine_id = caps[2].trim();
            let street = caps[3].trim();
            let city_state = caps[4].trim();

            if is_header_echo(name) || !machine_id.starts_with('Q') {
                return None;
            }
            Some(LocationRecord::from_parts(name, machine_id, street, city_state))
        })
        .collect()
}

fn is_header_echo(name: &str) -> bool {
    HEADER_NAMES
        .iter()
        .any(|header| name.eq_ignore_ascii_case(header))
}

fn cell_text(cell: ElementRef<'_>) -> String {
    let raw: String = cell.text().collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Document text with block boundaries turned into line breaks and script/style
/// bodies dropped.
fn visible_text(document: &Html) -> String {
    let mut text = String::new();

    for node in document.root_element().descendants() {
        match node.value() {
            Node::Element(element) if BLOCK_ELEMENTS.contains(&element.name()) => {
                text.push('\n');
            }
            Node::Text(fragment) => {
                let hidden = node
                    .parent()
                    .and_then(|parent| parent.value().as_element())
                    .map(|parent| HIDDEN_ELEMENTS.contains(&parent.name()))
                    .unwrap_or(false);
                if !hidden {
                    text.push_str(fragment);
                }
            }
            _ => {}
        }
    }

    text
}
