//! View renderer: projects the Data Store to a display list.
//!
//! Rendering is a pure function of the store contents, followed by one side
//! effect: the snapshot is written to the fallback cache so the cache always
//! matches what was last shown.

use crate::cache::FallbackCache;
use crate::store::DataStore;
use roster_types::{Record, RecordId};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, warn};

/// Column headings, in display order.
pub const COLUMNS: [&str; 6] = ["Name", "Age", "Salary", "Gender", "Custom ID", "ID"];

/// The delete affordance of a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteAction {
    pub id: RecordId,
}

/// One displayed row. Cells hold display text; absent values are blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRow {
    pub name: String,
    pub age: String,
    pub salary: String,
    pub gender: String,
    pub custom_id: String,
    pub delete: DeleteAction,
}

impl RenderedRow {
    fn project(record: &Record) -> Self {
        Self {
            name: record.name.clone(),
            age: record.age.map(|n| n.to_string()).unwrap_or_default(),
            salary: record.salary.map(|n| n.to_string()).unwrap_or_default(),
            gender: record.gender.clone().unwrap_or_default(),
            custom_id: record.custom_id.clone(),
            delete: DeleteAction {
                id: record.id.clone(),
            },
        }
    }

    fn cells(&self) -> [&str; 5] {
        [
            self.name.as_str(),
            self.age.as_str(),
            self.salary.as_str(),
            self.gender.as_str(),
            self.custom_id.as_str(),
        ]
    }

    fn write_html(&self, out: &mut String) {
        out.push_str("<tr>");
        for cell in self.cells() {
            let _ = write!(out, "<td>{}</td>", escape_html(cell));
        }
        let _ = write!(
            out,
            "<td><button class=\"delete-btn\" data-action=\"delete\" data-id=\"{}\">Delete</button></td>",
            escape_html(&self.delete.id.to_string())
        );
        out.push_str("</tr>\n");
    }
}

/// The result of one render pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedView {
    rows: Vec<RenderedRow>,
    html: String,
}

impl RenderedView {
    /// Projects records, in order, to rows and table-body markup.
    pub fn project(records: &[Record]) -> Self {
        let rows: Vec<RenderedRow> = records.iter().map(RenderedRow::project).collect();
        let mut html = String::new();
        for row in &rows {
            row.write_html(&mut html);
        }
        Self { rows, html }
    }

    pub fn rows(&self) -> &[RenderedRow] {
        &self.rows
    }

    /// Escaped `<tr>` markup for the table body.
    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Delegated click handling: the record behind row `index`.
    pub fn delete_target(&self, index: usize) -> Option<&RecordId> {
        self.rows.get(index).map(|row| &row.delete.id)
    }

    /// Delegated click handling: the record whose button carries `data_id`.
    pub fn resolve_delete(&self, data_id: &str) -> Option<&RecordId> {
        self.rows
            .iter()
            .map(|row| &row.delete.id)
            .find(|id| id.matches_text(data_id))
    }

    /// Plain-text table for terminals. Cells are not markup-escaped.
    pub fn to_text(&self) -> String {
        let ids: Vec<String> = self.rows.iter().map(|r| r.delete.id.to_string()).collect();
        let lines: Vec<[&str; 6]> = self
            .rows
            .iter()
            .zip(&ids)
            .map(|(row, id)| {
                let [a, b, c, d, e] = row.cells();
                [a, b, c, d, e, id.as_str()]
            })
            .collect();

        let mut widths = COLUMNS.map(|c| c.chars().count());
        for line in &lines {
            for (width, cell) in widths.iter_mut().zip(line) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        write_text_line(&mut out, &COLUMNS, &widths);
        for line in &lines {
            write_text_line(&mut out, line, &widths);
        }
        out
    }
}

fn write_text_line(out: &mut String, cells: &[&str; 6], widths: &[usize; 6]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &w)| format!("{cell:<w$}"))
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

/// Escapes text for inclusion in HTML content or a quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders the store and mirrors it to the fallback cache.
pub struct ViewRenderer {
    cache: Arc<dyn FallbackCache>,
    slot: String,
    view: RenderedView,
}

impl ViewRenderer {
    pub fn new(cache: Arc<dyn FallbackCache>, slot: impl Into<String>) -> Self {
        Self {
            cache,
            slot: slot.into(),
            view: RenderedView::default(),
        }
    }

    /// Replaces the previous view with a projection of `store`, then
    /// persists the snapshot. A failed cache write is logged; the view
    /// still stands.
    pub async fn render(&mut self, store: &DataStore) -> &RenderedView {
        self.view = RenderedView::project(store.snapshot());
        debug!("Rendered {} rows", self.view.len());

        match store.encode() {
            Ok(text) => {
                if let Err(e) = self.cache.store(&self.slot, &text).await {
                    warn!("Failed to persist fallback cache: {e}");
                }
            }
            Err(e) => warn!("Failed to encode snapshot: {e}"),
        }

        &self.view
    }

    /// The most recent view.
    pub fn view(&self) -> &RenderedView {
        &self.view
    }

    /// The cache this renderer mirrors into.
    pub fn cache(&self) -> &Arc<dyn FallbackCache> {
        &self.cache
    }

    /// Name of the cache slot.
    pub fn slot(&self) -> &str {
        &self.slot
    }
}
