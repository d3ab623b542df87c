// SPDX-License-Identifier: GPL-3.0-or-later

//! In-memory model of a server-rendered listing page.
//!
//! The page is an element tree stored in an arena. Nodes are addressed by
//! [`NodeId`], which stays valid after a node is detached; a detached node
//! simply no longer shows up in lookups that start from the root.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlyphColor {
    Gold,
    Black,
    Red,
}
impl GlyphColor {
    pub fn css_name(self) -> &'static str {
        match self {
            GlyphColor::Gold => "gold",
            GlyphColor::Black => "black",
            GlyphColor::Red => "red",
        }
    }
}

/// A single coloured symbol rendered as the content of a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub symbol: char,
    pub color: GlyphColor,
}
impl Glyph {
    pub const STAR: char = '⭑';
    pub const REJECT: char = '✗';

    pub fn star(color: GlyphColor) -> Self {
        Self {
            symbol: Self::STAR,
            color,
        }
    }

    pub fn reject(color: GlyphColor) -> Self {
        Self {
            symbol: Self::REJECT,
            color,
        }
    }

    /// The inline markup the page uses for this glyph.
    pub fn to_markup(&self) -> String {
        format!(
            "<span style='color: {};'>{}</span>",
            self.color.css_name(),
            self.symbol
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Content {
    #[default]
    Empty,
    Text(String),
    Glyph(Glyph),
}

/// Serialized form of an element tree, and a builder for one.
///
/// Pages are delivered as JSON in this shape:
///
/// ```json
/// { "tag": "form", "class": ["listing-form"],
///   "attrs": { "data-listing-id": "7" },
///   "children": [ { "tag": "button", "text": "Reject" } ] }
/// ```
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub class: Vec<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub children: Vec<Element>,
}
impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..self
        }
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class.push(class.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..self
        }
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    content: Content,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}
impl Document {
    pub fn new(root: Element) -> Self {
        let mut doc = Document {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        doc.root = doc.insert(root, None);
        doc
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let root: Element = serde_json::from_str(json)?;
        Ok(Self::new(root))
    }

    fn insert(&mut self, element: Element, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            tag: element.tag,
            id: element.id,
            classes: element.class,
            attrs: element.attrs,
            content: element.text.map(Content::Text).unwrap_or_default(),
            parent,
            children: Vec::new(),
        });
        for child in element.children {
            let child = self.insert(child, Some(id));
            self.nodes[id.0].children.push(child);
        }
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn tag(&self, node: NodeId) -> &str {
        &self.nodes[node.0].tag
    }

    pub fn element_id(&self, node: NodeId) -> Option<&str> {
        self.nodes[node.0].id.as_deref()
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.nodes[node.0].classes.iter().any(|c| c == class)
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes[node.0].attrs.get(name).map(String::as_str)
    }

    pub fn content(&self, node: NodeId) -> &Content {
        &self.nodes[node.0].content
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    /// Iterate over the strict ancestors of `node`, nearest first.
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(node), move |&n| self.parent(n))
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        node == self.root || self.ancestors(node).any(|n| n == self.root)
    }

    /// All descendants of `node` in document order, not including `node`.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            result.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        result
    }

    /// Attached elements carrying `class`, in document order.
    pub fn select_class(&self, class: &str) -> Vec<NodeId> {
        std::iter::once(self.root)
            .chain(self.descendants(self.root))
            .filter(|&n| self.has_class(n, class))
            .collect()
    }

    /// Descendants of `within` with the given tag name.
    pub fn find_tag(&self, within: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(within)
            .into_iter()
            .filter(|&n| self.tag(n) == tag)
            .collect()
    }

    /// The attached element whose `id` attribute is `element_id`.
    pub fn find_by_id(&self, element_id: &str) -> Option<NodeId> {
        std::iter::once(self.root)
            .chain(self.descendants(self.root))
            .find(|&n| self.element_id(n) == Some(element_id))
    }

    pub fn siblings(&self, node: NodeId) -> Vec<NodeId> {
        match self.parent(node) {
            Some(parent) => self
                .children(parent)
                .iter()
                .copied()
                .filter(|&n| n != node)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Concatenated text of `node` and its descendants. Glyphs contribute
    /// their symbol.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut text = String::new();
        for n in std::iter::once(node).chain(self.descendants(node)) {
            match self.content(n) {
                Content::Empty => {}
                Content::Text(t) => text.push_str(t),
                Content::Glyph(glyph) => text.push(glyph.symbol),
            }
        }
        text
    }

    /// Replace everything inside `node` with `text`.
    pub fn set_text(&mut self, node: NodeId, text: impl Into<String>) {
        self.clear_children(node);
        self.nodes[node.0].content = Content::Text(text.into());
    }

    /// Replace everything inside `node` with `glyph`.
    pub fn set_glyph(&mut self, node: NodeId, glyph: Glyph) {
        self.clear_children(node);
        self.nodes[node.0].content = Content::Glyph(glyph);
    }

    fn clear_children(&mut self, node: NodeId) {
        for child in std::mem::take(&mut self.nodes[node.0].children) {
            self.nodes[child.0].parent = None;
        }
    }

    /// Remove `node` (and its subtree) from its parent.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|&n| n != node);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> Document {
        Document::new(
            Element::new("table").class("datatables").child(
                Element::new("tr").id("listing-1").children([
                    Element::new("td").text("Sunny flat"),
                    Element::new("td").child(
                        Element::new("form")
                            .class("listing-form")
                            .attr("data-listing-id", "1")
                            .children([
                                Element::new("span").class("score").text("10"),
                                Element::new("button").attr("data-target", "score"),
                            ]),
                    ),
                ]),
            ),
        )
    }

    #[test]
    fn lookups() {
        let doc = sample();
        let forms = doc.select_class("listing-form");
        assert_eq!(forms.len(), 1);
        assert_eq!(doc.attr(forms[0], "data-listing-id"), Some("1"));

        let row = doc.find_by_id("listing-1").unwrap();
        assert_eq!(doc.tag(row), "tr");
        assert_eq!(doc.text_content(row), "Sunny flat10");

        let button = doc.find_tag(forms[0], "button")[0];
        let siblings = doc.siblings(button);
        assert_eq!(siblings.len(), 1);
        assert!(doc.has_class(siblings[0], "score"));
        assert_eq!(doc.ancestors(button).next(), Some(forms[0]));
    }

    #[test]
    fn detach_hides_subtree() {
        let mut doc = sample();
        let row = doc.find_by_id("listing-1").unwrap();
        let form = doc.select_class("listing-form")[0];
        doc.detach(row);
        assert!(!doc.is_attached(row));
        assert!(!doc.is_attached(form));
        assert!(doc.find_by_id("listing-1").is_none());
        assert!(doc.select_class("listing-form").is_empty());
    }

    #[test]
    fn set_content_replaces_children() {
        let mut doc = Document::new(
            Element::new("form").children([
                Element::new("span")
                    .class("score")
                    .child(Element::new("b").text("10")),
                Element::new("button").child(Element::new("span").text("⭑")),
            ]),
        );
        let score = doc.select_class("score")[0];
        let button = doc.find_tag(doc.root(), "button")[0];
        let old_glyph = doc.children(button)[0];

        doc.set_text(score, "42");
        doc.set_glyph(button, Glyph::star(GlyphColor::Gold));

        assert_eq!(doc.text_content(score), "42");
        assert!(doc.children(score).is_empty());
        assert_eq!(doc.text_content(button), "⭑");
        assert!(doc.children(button).is_empty());
        assert!(!doc.is_attached(old_glyph));
        assert!(doc.find_tag(doc.root(), "b").is_empty());
    }

    #[test]
    fn glyph_markup() {
        assert_eq!(
            Glyph::star(GlyphColor::Gold).to_markup(),
            "<span style='color: gold;'>⭑</span>"
        );
        assert_eq!(
            Glyph::reject(GlyphColor::Red).to_markup(),
            "<span style='color: red;'>✗</span>"
        );
    }

    #[test]
    fn from_json() -> Result<()> {
        let doc = Document::from_json(
            r#"{ "tag": "div", "children": [
                   { "tag": "button", "id": "b", "attrs": { "data-target": "star" }, "text": "*" }
               ] }"#,
        )?;
        let button = doc.find_by_id("b").unwrap();
        assert_eq!(doc.attr(button, "data-target"), Some("star"));
        assert_eq!(doc.content(button), &Content::Text("*".into()));
        Ok(())
    }
}
