// SPDX-License-Identifier: GPL-3.0-or-later

//! Read-only listing tables.
//!
//! A listing table shows every body row in document order: there is no
//! pagination and no column sorting. The only row mutation is the fade-out
//! that precedes removing a rejected listing.

use std::time::{Duration, Instant};

use log::debug;
use regex::Regex;
use serde::Deserialize;

use crate::markup::{Document, NodeId};

/// Duration of the fade-out before a removed row disappears.
pub const FADE_OUT: Duration = Duration::from_millis(300);

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WidthMode {
    /// Columns share the available width evenly unless a header cell pins a
    /// width with `data-width`.
    #[default]
    Fixed,

    /// Columns are as wide as their widest cell.
    Auto,
}
impl std::str::FromStr for WidthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(WidthMode::Fixed),
            "auto" => Ok(WidthMode::Auto),
            _ => Err(format!("unknown width mode {s:?} (expected fixed or auto)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListingTable {
    node: NodeId,
    width: WidthMode,
    fading: Vec<(NodeId, Instant)>,
}
impl ListingTable {
    pub fn initialize(doc: &Document, node: NodeId, width: WidthMode) -> Self {
        let table = ListingTable {
            node,
            width,
            fading: Vec::new(),
        };
        debug!(
            "Initialized table {:?} with {} rows ({:?} width)",
            doc.element_id(node).unwrap_or("<anonymous>"),
            table.rows(doc).len(),
            width
        );
        table
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn width_mode(&self) -> WidthMode {
        self.width
    }

    pub fn contains(&self, doc: &Document, node: NodeId) -> bool {
        doc.ancestors(node).any(|n| n == self.node)
    }

    fn is_header_row(&self, doc: &Document, row: NodeId) -> bool {
        doc.ancestors(row)
            .take_while(|&n| n != self.node)
            .any(|n| doc.tag(n) == "thead")
    }

    /// `th` cells of the table head.
    pub fn header_cells(&self, doc: &Document) -> Vec<NodeId> {
        doc.find_tag(self.node, "th")
            .into_iter()
            .filter(|&th| self.is_header_row(doc, th))
            .collect()
    }

    pub fn headers(&self, doc: &Document) -> Vec<String> {
        self.header_cells(doc)
            .into_iter()
            .map(|th| doc.text_content(th).trim().to_string())
            .collect()
    }

    /// Attached body rows in document order.
    pub fn rows(&self, doc: &Document) -> Vec<NodeId> {
        if !doc.is_attached(self.node) {
            return Vec::new();
        }
        doc.find_tag(self.node, "tr")
            .into_iter()
            .filter(|&row| !self.is_header_row(doc, row))
            .filter(|&row| !self.cells(doc, row).is_empty())
            .collect()
    }

    /// Rows whose text matches `pattern`; all rows if there is no pattern.
    pub fn matching_rows(&self, doc: &Document, pattern: Option<&Regex>) -> Vec<NodeId> {
        let rows = self.rows(doc);
        match pattern {
            None => rows,
            Some(pattern) => rows
                .into_iter()
                .filter(|&row| pattern.is_match(&doc.text_content(row)))
                .collect(),
        }
    }

    pub fn cells(&self, doc: &Document, row: NodeId) -> Vec<NodeId> {
        doc.children(row)
            .iter()
            .copied()
            .filter(|&c| matches!(doc.tag(c), "td" | "th"))
            .collect()
    }

    pub fn num_columns(&self, doc: &Document) -> usize {
        self.rows(doc)
            .into_iter()
            .map(|row| self.cells(doc, row).len())
            .chain(std::iter::once(self.header_cells(doc).len()))
            .max()
            .unwrap_or(0)
    }

    /// Width of each column when the table is `total` cells wide.
    pub fn column_widths(&self, doc: &Document, total: u16) -> Vec<u16> {
        let columns = self.num_columns(doc);
        if columns == 0 {
            return Vec::new();
        }

        match self.width {
            WidthMode::Auto => {
                let mut widths = vec![0u16; columns];
                let headers = self.header_cells(doc);
                let body = self.rows(doc).into_iter().map(|row| self.cells(doc, row));
                for cells in std::iter::once(headers).chain(body) {
                    for (idx, cell) in cells.into_iter().enumerate() {
                        let len = doc.text_content(cell).trim().chars().count();
                        let len = u16::try_from(len).unwrap_or(u16::MAX);
                        widths[idx] = widths[idx].max(len);
                    }
                }
                for width in &mut widths {
                    *width = (*width).min(total);
                }
                widths
            }
            WidthMode::Fixed => {
                let mut pinned: Vec<Option<u16>> = vec![None; columns];
                for (idx, th) in self.header_cells(doc).into_iter().enumerate().take(columns) {
                    pinned[idx] = doc.attr(th, "data-width").and_then(|w| w.parse().ok());
                }

                let used: u16 = pinned.iter().flatten().fold(0u16, |a, &b| a.saturating_add(b));
                let free = pinned.iter().filter(|w| w.is_none()).count() as u16;
                let share = if free > 0 {
                    total.saturating_sub(used) / free
                } else {
                    0
                };
                pinned.into_iter().map(|w| w.unwrap_or(share)).collect()
            }
        }
    }

    /// Start fading `row` out. Returns false if it is already fading or is
    /// not a row of this table.
    pub fn fade_out(&mut self, doc: &Document, row: NodeId, now: Instant) -> bool {
        if self.is_fading(row) || !self.contains(doc, row) {
            return false;
        }
        self.fading.push((row, now + FADE_OUT));
        true
    }

    pub fn is_fading(&self, row: NodeId) -> bool {
        self.fading.iter().any(|&(r, _)| r == row)
    }

    /// Fraction of the fade that has elapsed for `row`, if it is fading.
    pub fn fade_progress(&self, row: NodeId, now: Instant) -> Option<f32> {
        let &(_, done) = self.fading.iter().find(|&&(r, _)| r == row)?;
        let remaining = done.saturating_duration_since(now);
        Some(1.0 - remaining.as_secs_f32() / FADE_OUT.as_secs_f32())
    }

    /// Detach every row whose fade has completed by `now`.
    pub fn finish_fades(&mut self, doc: &mut Document, now: Instant) -> Vec<NodeId> {
        let mut removed = Vec::new();
        self.fading.retain(|&(row, done)| {
            if done <= now {
                doc.detach(row);
                removed.push(row);
                false
            } else {
                true
            }
        });
        removed
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::markup::Element;

    fn listings(width_attr: Option<&str>) -> Document {
        let mut th = Element::new("th").text("Name");
        if let Some(w) = width_attr {
            th = th.attr("data-width", w);
        }
        Document::new(
            Element::new("table")
                .class("datatables")
                .child(
                    Element::new("thead")
                        .child(Element::new("tr").children([th, Element::new("th").text("Price")])),
                )
                .child(Element::new("tbody").children([
                    Element::new("tr")
                        .id("listing-1")
                        .children([Element::new("td").text("Loft"), Element::new("td").text("$1200")]),
                    Element::new("tr").id("listing-2").children([
                        Element::new("td").text("Garden cottage"),
                        Element::new("td").text("$950"),
                    ]),
                ])),
        )
    }

    #[test]
    fn rows_exclude_header() {
        let doc = listings(None);
        let table = ListingTable::initialize(&doc, doc.root(), WidthMode::Fixed);
        let rows = table.rows(&doc);
        assert_eq!(rows.len(), 2);
        assert_eq!(doc.element_id(rows[0]), Some("listing-1"));
        assert_eq!(table.headers(&doc), vec!["Name", "Price"]);
        assert_eq!(table.num_columns(&doc), 2);
    }

    #[test]
    fn body_row_headers_are_rows() {
        let doc = Document::new(
            Element::new("table")
                .child(Element::new("thead").child(
                    Element::new("tr").children([Element::new("th").text("Name"), Element::new("th").text("Price")]),
                ))
                .child(Element::new("tbody").child(
                    Element::new("tr")
                        .id("listing-1")
                        .children([Element::new("th").text("Loft"), Element::new("td").text("$1")]),
                )),
        );
        let table = ListingTable::initialize(&doc, doc.root(), WidthMode::Fixed);
        let rows = table.rows(&doc);
        assert_eq!(rows.len(), 1);
        assert_eq!(doc.element_id(rows[0]), Some("listing-1"));
        assert_eq!(table.cells(&doc, rows[0]).len(), 2);
        assert_eq!(table.headers(&doc), vec!["Name", "Price"]);
    }

    #[test]
    fn widths() {
        let doc = listings(None);
        let auto = ListingTable::initialize(&doc, doc.root(), WidthMode::Auto);
        assert_eq!(auto.column_widths(&doc, 80), vec![14, 5]);

        let fixed = ListingTable::initialize(&doc, doc.root(), WidthMode::Fixed);
        assert_eq!(fixed.column_widths(&doc, 80), vec![40, 40]);

        let doc = listings(Some("20"));
        let pinned = ListingTable::initialize(&doc, doc.root(), WidthMode::Fixed);
        assert_eq!(pinned.column_widths(&doc, 80), vec![20, 60]);
    }

    #[test]
    fn fade_then_remove() {
        let mut doc = listings(None);
        let mut table = ListingTable::initialize(&doc, doc.root(), WidthMode::Fixed);
        let row = doc.find_by_id("listing-1").unwrap();
        let start = Instant::now();

        assert!(table.fade_out(&doc, row, start));
        assert!(!table.fade_out(&doc, row, start));
        assert!(table.is_fading(row));

        assert!(table.finish_fades(&mut doc, start + FADE_OUT / 2).is_empty());
        assert_eq!(table.rows(&doc).len(), 2);

        assert_eq!(table.finish_fades(&mut doc, start + FADE_OUT), vec![row]);
        assert_eq!(table.rows(&doc).len(), 1);
        assert!(!table.is_fading(row));
    }

    #[test]
    fn search() {
        let doc = listings(None);
        let table = ListingTable::initialize(&doc, doc.root(), WidthMode::Fixed);
        let pattern = Regex::new("Garden").unwrap();
        let rows = table.matching_rows(&doc, Some(&pattern));
        assert_eq!(rows.len(), 1);
        assert_eq!(doc.element_id(rows[0]), Some("listing-2"));
    }
}
