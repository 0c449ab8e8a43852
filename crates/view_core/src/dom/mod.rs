//! In-memory document tree the view layer renders into.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Removing a node only
//! detaches it; handles to detached nodes stay valid but are no longer
//! reachable from the root (see [`Document::is_connected`]) until
//! [`Document::sweep`] reclaims their slots.
//!
//! A handle names its document and its slot generation, so a handle from a
//! replaced document or a reclaimed slot resolves to nothing instead of to
//! whatever node lives at that index now.

use std::{
    collections::HashSet,
    sync::atomic::{AtomicU32, Ordering},
};

mod form;
mod parse;

pub use parse::decode_entities;

pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

const ROOT_TAG: &str = "#document";

static NEXT_DOCUMENT: AtomicU32 = AtomicU32::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    doc: u32,
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    generation: u32,
    live: bool,
}

#[derive(Debug, Clone)]
pub struct Document {
    id: u32,
    nodes: Vec<Node>,
    free: Vec<u32>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let id = NEXT_DOCUMENT.fetch_add(1, Ordering::Relaxed);
        Self {
            id,
            nodes: vec![Node {
                data: NodeData::Element(Element {
                    tag: ROOT_TAG.to_string(),
                    attrs: Vec::new(),
                }),
                parent: None,
                children: Vec::new(),
                generation: 0,
                live: true,
            }],
            free: Vec::new(),
            root: NodeId {
                doc: id,
                index: 0,
                generation: 0,
            },
        }
    }

    pub fn parse(html: &str) -> Self {
        let mut doc = Self::new();
        let root = doc.root;
        parse::parse_into(&mut doc, root, html);
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        if id.doc != self.id {
            return None;
        }
        self.nodes
            .get(id.index as usize)
            .filter(|node| node.live && node.generation == id.generation)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.doc != self.id {
            return None;
        }
        self.nodes
            .get_mut(id.index as usize)
            .filter(|node| node.live && node.generation == id.generation)
    }

    /// Whether `id` resolves in this document: not foreign, not reclaimed.
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.node(id).map(|node| &node.data)
    }

    fn element(&self, id: NodeId) -> Option<&Element> {
        match self.data(id)? {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id) == Some(tag)
    }

    // -- attributes --------------------------------------------------------

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let Some(el) = self.element_mut(id) else {
            return;
        };
        let value = value.into();
        match el.attrs.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => el.attrs.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(el) = self.element_mut(id) {
            el.attrs.retain(|(key, _)| key != name);
        }
    }

    pub fn classes(&self, id: NodeId) -> impl Iterator<Item = &str> {
        self.attr(id, "class").unwrap_or_default().split_whitespace()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.classes(id).any(|c| c == class)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if !self.is_element(id) || self.has_class(id, class) {
            return;
        }
        let mut classes: Vec<String> = self.classes(id).map(str::to_string).collect();
        classes.push(class.to_string());
        self.set_attr(id, "class", classes.join(" "));
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if !self.has_class(id, class) {
            return;
        }
        let classes: Vec<String> = self
            .classes(id)
            .filter(|c| *c != class)
            .map(str::to_string)
            .collect();
        if classes.is_empty() {
            self.remove_attr(id, "class");
        } else {
            self.set_attr(id, "class", classes.join(" "));
        }
    }

    /// Sets `display: block` or `display: none` inline, as the page scripts always did.
    pub fn set_displayed(&mut self, id: NodeId, displayed: bool) {
        let value = if displayed {
            "display: block"
        } else {
            "display: none"
        };
        self.set_attr(id, "style", value);
    }

    pub fn is_displayed(&self, id: NodeId) -> bool {
        let style: String = self
            .attr(id, "style")
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        !style.to_ascii_lowercase().contains("display:none")
    }

    // -- tree --------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], |node| node.children.as_slice())
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.is_element(*child))
            .collect()
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|child| self.is_element(*child))
    }

    /// All nodes below `id` in document order, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Connected, and neither the node nor any ancestor is `display: none`.
    pub fn is_rendered(&self, id: NodeId) -> bool {
        if !self.is_connected(id) {
            return false;
        }
        let mut current = Some(id);
        while let Some(node) = current {
            if !self.is_displayed(node) {
                return false;
            }
            current = self.parent(node);
        }
        true
    }

    // -- queries -----------------------------------------------------------

    pub fn find_in(&self, scope: NodeId, pred: impl Fn(&Self, NodeId) -> bool) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|node| self.is_element(*node) && pred(self, *node))
    }

    pub fn find_all_in(&self, scope: NodeId, pred: impl Fn(&Self, NodeId) -> bool) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|node| self.is_element(*node) && pred(self, *node))
            .collect()
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.find_in(self.root, |doc, node| doc.attr(node, "id") == Some(id))
    }

    pub fn elements_by_class(&self, class: &str) -> Vec<NodeId> {
        self.find_all_in(self.root, |doc, node| doc.has_class(node, class))
    }

    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.find_all_in(self.root, |doc, node| doc.is_tag(node, tag))
    }

    pub fn element_by_name(&self, scope: NodeId, name: &str) -> Option<NodeId> {
        self.find_in(scope, |doc, node| doc.attr(node, "name") == Some(name))
    }

    // -- mutation ----------------------------------------------------------

    fn push_node(&mut self, data: NodeData) -> NodeId {
        if let Some(index) = self.free.pop() {
            let node = &mut self.nodes[index as usize];
            node.data = data;
            node.live = true;
            return NodeId {
                doc: self.id,
                index,
                generation: node.generation,
            };
        }
        let index = self.nodes.len() as u32;
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
            generation: 0,
            live: true,
        });
        NodeId {
            doc: self.id,
            index,
            generation: 0,
        }
    }

    /// Number of slots in the arena, live or free.
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    /// Reclaims every node no longer reachable from the root and returns how
    /// many were freed. Handles to reclaimed nodes stop resolving.
    pub fn sweep(&mut self) -> usize {
        let mut reachable = HashSet::new();
        reachable.insert(self.root.index);
        for node in self.descendants(self.root) {
            reachable.insert(node.index);
        }
        let mut freed = 0;
        for (index, node) in self.nodes.iter_mut().enumerate() {
            let index = index as u32;
            if !node.live || reachable.contains(&index) {
                continue;
            }
            node.live = false;
            node.generation = node.generation.wrapping_add(1);
            node.parent = None;
            node.children.clear();
            node.data = NodeData::Text(String::new());
            self.free.push(index);
            freed += 1;
        }
        freed
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_node(NodeData::Element(Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        }))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push_node(NodeData::Text(text.into()))
    }

    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node_mut(id).and_then(|node| node.parent.take()) else {
            return;
        };
        if let Some(parent) = self.node_mut(parent) {
            parent.children.retain(|child| *child != id);
        }
    }

    /// Appends `child` to `parent`, moving it out of its current parent first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || !self.is_element(parent) || !self.contains(child) {
            return;
        }
        self.detach(child);
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
    }

    pub fn clear_children(&mut self, id: NodeId) {
        let Some(node) = self.node_mut(id) else {
            return;
        };
        let children = std::mem::take(&mut node.children);
        for child in children {
            if let Some(child) = self.node_mut(child) {
                child.parent = None;
            }
        }
    }

    pub fn set_inner_html(&mut self, id: NodeId, html: &str) {
        self.clear_children(id);
        parse::parse_into(self, id, html);
    }

    pub fn append_html(&mut self, id: NodeId, html: &str) {
        parse::parse_into(self, id, html);
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) {
        self.clear_children(id);
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(id, node);
        }
    }

    // -- serialisation -----------------------------------------------------

    pub fn text_content(&self, id: NodeId) -> String {
        match self.data(id) {
            None => String::new(),
            Some(NodeData::Text(text)) => text.clone(),
            Some(NodeData::Element(_)) => self
                .descendants(id)
                .into_iter()
                .filter_map(|node| match self.data(node) {
                    Some(NodeData::Text(text)) => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.write_node(*child, &mut out);
        }
        out
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match self.data(id) {
            None => {}
            Some(NodeData::Text(text)) => out.push_str(&escape_text(text)),
            Some(NodeData::Element(el)) if el.tag == ROOT_TAG => {
                out.push_str(&self.inner_html(id));
            }
            Some(NodeData::Element(el)) => {
                out.push('<');
                out.push_str(&el.tag);
                for (key, value) in &el.attrs {
                    out.push(' ');
                    out.push_str(key);
                    if !value.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&escape_attr(value));
                        out.push('"');
                    }
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&el.tag.as_str()) {
                    return;
                }
                for child in self.children(id) {
                    self.write_node(*child, out);
                }
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
#[path = "../tests/dom_tests.rs"]
mod tests;
