//! In-memory document for the reactive controller.
//!
//! Server markup is parsed with html5ever and copied into a flat arena so the
//! controller can hold plain `NodeId`s across mutations. Elements keep their
//! attributes, a parsed inline style, and the live form-control properties a
//! browser tracks separately from attributes (`value`, `checked`, `disabled`,
//! `indeterminate`, selected options).

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

pub type NodeId = usize;

const FORM_CONTROL_TAGS: &[&str] = &["input", "select", "textarea"];

#[derive(Debug, Clone, Default)]
pub struct Element {
    pub tag: String,
    attrs: Vec<(String, String)>,
    style: Vec<(String, String)>,
    pub value: String,
    pub checked: bool,
    pub disabled: bool,
    pub indeterminate: bool,
    /// Values of the selected `<option>`s of a `<select>`.
    pub selected: Vec<String>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }
}

impl Document {
    pub fn parse(html: &str) -> Self {
        let mut document = Self::default();
        let dom = parse_rcdom(html);
        let imported = document.import_children(&dom.document, Document::ROOT);
        document.init_controls(&imported);
        document
    }

    pub const ROOT: NodeId = 0;

    // ═══════════════════════════════════════════════════════════════════════════
    // TREE
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id).map(|n| &n.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.nodes.get(id).map(|n| &n.kind) {
            Some(NodeKind::Element(el)) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.nodes.get_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Element(el)) => Some(el),
            _ => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Element children only.
    pub fn child_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.element(*c).is_some())
            .collect()
    }

    /// Nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            out.push(p);
            current = self.parent(p);
        }
        out
    }

    /// Pre-order descendants of `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor == node || self.ancestors(node).contains(&ancestor)
    }

    /// Whether the node is still reachable from the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains(Document::ROOT, id)
    }

    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            self.nodes[parent].children.retain(|c| *c != id);
            self.nodes[id].parent = None;
        }
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(NodeKind::Text(t)) = self.kind(id) {
            out.push_str(t);
        }
        for d in self.descendants(id) {
            if let Some(NodeKind::Text(t)) = self.kind(d) {
                out.push_str(t);
            }
        }
        out
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// First attached element whose attribute `name` equals `value`.
    pub fn find_by_attr(&self, name: &str, value: &str) -> Option<NodeId> {
        self.descendants(Document::ROOT)
            .into_iter()
            .find(|id| self.attr(*id, name) == Some(value))
    }

    /// Elements under `scope` (inclusive) carrying attribute `name`, in document order.
    pub fn with_attr(&self, scope: NodeId, name: &str) -> Vec<NodeId> {
        std::iter::once(scope)
            .chain(self.descendants(scope))
            .filter(|id| self.has_attr(*id, name))
            .collect()
    }

    pub fn by_tag(&self, scope: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|id| self.tag(*id) == Some(tag))
            .collect()
    }

    /// `input`, `select` and `textarea` elements under `scope` (inclusive).
    pub fn form_controls(&self, scope: NodeId) -> Vec<NodeId> {
        std::iter::once(scope)
            .chain(self.descendants(scope))
            .filter(|id| self.is_form_control(*id))
            .collect()
    }

    pub fn is_form_control(&self, id: NodeId) -> bool {
        self.tag(id).is_some_and(|t| FORM_CONTROL_TAGS.contains(&t))
    }

    /// Lowercased `type` of an `<input>`; `select`/`textarea` for those tags.
    pub fn control_type(&self, id: NodeId) -> Option<String> {
        match self.tag(id)? {
            "input" => Some(
                self.attr(id, "type")
                    .map(|t| t.to_ascii_lowercase())
                    .unwrap_or_else(|| "text".to_string()),
            ),
            other if FORM_CONTROL_TAGS.contains(&other) => Some(other.to_string()),
            _ => None,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ATTRIBUTES & STYLE
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attr(name))
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(el) = self.element_mut(id) else {
            return;
        };
        match el.attrs.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => el.attrs.push((name.to_string(), value.to_string())),
        }
        if name == "style" {
            el.style = parse_style(value);
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(el) = self.element_mut(id) {
            el.attrs.retain(|(k, _)| k != name);
            if name == "style" {
                el.style.clear();
            }
        }
    }

    pub fn style(&self, id: NodeId, property: &str) -> Option<&str> {
        self.element(id).and_then(|el| {
            el.style
                .iter()
                .find(|(k, _)| k == property)
                .map(|(_, v)| v.as_str())
        })
    }

    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) {
        if let Some(el) = self.element_mut(id) {
            match el.style.iter_mut().find(|(k, _)| k == property) {
                Some(slot) => slot.1 = value.to_string(),
                None => el.style.push((property.to_string(), value.to_string())),
            }
            sync_style_attr(el);
        }
    }

    pub fn remove_style(&mut self, id: NodeId, property: &str) {
        if let Some(el) = self.element_mut(id) {
            el.style.retain(|(k, _)| k != property);
            sync_style_attr(el);
        }
    }

    /// Hidden by its own inline `display: none`.
    pub fn is_hidden(&self, id: NodeId) -> bool {
        self.style(id, "display") == Some("none")
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CONTROL STATE
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn value(&self, id: NodeId) -> &str {
        self.element(id).map(|el| el.value.as_str()).unwrap_or("")
    }

    pub fn checked(&self, id: NodeId) -> bool {
        self.element(id).is_some_and(|el| el.checked)
    }

    pub fn disabled(&self, id: NodeId) -> bool {
        self.element(id).is_some_and(|el| el.disabled)
    }

    pub fn indeterminate(&self, id: NodeId) -> bool {
        self.element(id).is_some_and(|el| el.indeterminate)
    }

    pub fn selected(&self, id: NodeId) -> &[String] {
        self.element(id).map(|el| el.selected.as_slice()).unwrap_or(&[])
    }

    pub fn set_value(&mut self, id: NodeId, value: &str) {
        if self.tag(id) == Some("select") {
            let selected = if value.is_empty() {
                Vec::new()
            } else {
                vec![value.to_string()]
            };
            self.set_selected(id, selected);
            return;
        }
        if let Some(el) = self.element_mut(id) {
            el.value = value.to_string();
        }
    }

    /// Checking a radio unchecks the other radios of the same name in its form.
    pub fn set_checked(&mut self, id: NodeId, checked: bool) {
        if checked && self.control_type(id).as_deref() == Some("radio") {
            if let Some(name) = self.attr(id, "name").map(str::to_string) {
                let scope = self
                    .ancestors(id)
                    .into_iter()
                    .find(|a| self.tag(*a) == Some("form"))
                    .unwrap_or(Document::ROOT);
                for other in self.form_controls(scope) {
                    if other != id
                        && self.control_type(other).as_deref() == Some("radio")
                        && self.attr(other, "name") == Some(name.as_str())
                    {
                        if let Some(el) = self.element_mut(other) {
                            el.checked = false;
                        }
                    }
                }
            }
        }
        if let Some(el) = self.element_mut(id) {
            el.checked = checked;
        }
    }

    pub fn set_disabled(&mut self, id: NodeId, disabled: bool) {
        if let Some(el) = self.element_mut(id) {
            el.disabled = disabled;
        }
    }

    pub fn set_indeterminate(&mut self, id: NodeId, indeterminate: bool) {
        if let Some(el) = self.element_mut(id) {
            el.indeterminate = indeterminate;
        }
    }

    pub fn set_selected(&mut self, id: NodeId, values: Vec<String>) {
        if let Some(el) = self.element_mut(id) {
            el.value = values.first().cloned().unwrap_or_default();
            el.selected = values;
        }
    }

    /// Reset a control: checkables are unchecked, everything else loses its value.
    pub fn clear_control(&mut self, id: NodeId) {
        match self.control_type(id).as_deref() {
            Some("checkbox") | Some("radio") => self.set_checked(id, false),
            Some("select") => self.set_selected(id, Vec::new()),
            Some(_) => self.set_value(id, ""),
            None => {}
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // FRAGMENTS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Parse `html` and append its top-level nodes to `parent`, returning the
    /// inserted element ids.
    pub fn append_html(&mut self, parent: NodeId, html: &str) -> Vec<NodeId> {
        let dom = parse_rcdom(html);
        let Some(body) = find_body(&dom.document) else {
            return Vec::new();
        };
        let imported = self.import_children(&body, parent);
        self.init_controls(&imported);
        imported
            .into_iter()
            .filter(|id| self.parent(*id) == Some(parent) && self.element(*id).is_some())
            .collect()
    }

    fn push(&mut self, kind: NodeKind, parent: NodeId) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    /// Copy the children of an rcdom handle under `parent`; returns every new id.
    fn import_children(&mut self, handle: &Handle, parent: NodeId) -> Vec<NodeId> {
        let mut created = Vec::new();
        for child in handle.children.borrow().iter() {
            let id = match &child.data {
                RcNodeData::Element { name, attrs, .. } => {
                    let attrs: Vec<(String, String)> = attrs
                        .borrow()
                        .iter()
                        .map(|a| (a.name.local.to_string(), a.value.to_string()))
                        .collect();
                    let style = attrs
                        .iter()
                        .find(|(k, _)| k == "style")
                        .map(|(_, v)| parse_style(v))
                        .unwrap_or_default();
                    self.push(
                        NodeKind::Element(Element {
                            tag: name.local.to_string(),
                            attrs,
                            style,
                            ..Element::default()
                        }),
                        parent,
                    )
                }
                RcNodeData::Text { contents } => {
                    self.push(NodeKind::Text(contents.borrow().to_string()), parent)
                }
                _ => continue,
            };
            created.push(id);
            created.extend(self.import_children(child, id));
        }
        created
    }

    fn init_controls(&mut self, ids: &[NodeId]) {
        for &id in ids {
            match self.tag(id) {
                Some("input") => {
                    let value = self.attr(id, "value").unwrap_or("").to_string();
                    let checked = self.has_attr(id, "checked");
                    let disabled = self.has_attr(id, "disabled");
                    if let Some(el) = self.element_mut(id) {
                        el.value = value;
                        el.checked = checked;
                        el.disabled = disabled;
                    }
                }
                Some("textarea") => {
                    let value = self.text_content(id);
                    let disabled = self.has_attr(id, "disabled");
                    if let Some(el) = self.element_mut(id) {
                        el.value = value;
                        el.disabled = disabled;
                    }
                }
                Some("select") => {
                    let options = self.by_tag(id, "option");
                    let mut selected: Vec<String> = options
                        .iter()
                        .filter(|o| self.has_attr(**o, "selected"))
                        .map(|o| self.option_value(*o))
                        .collect();
                    if selected.is_empty() && !self.has_attr(id, "multiple") {
                        if let Some(first) = options.first() {
                            selected.push(self.option_value(*first));
                        }
                    }
                    let disabled = self.has_attr(id, "disabled");
                    self.set_selected(id, selected);
                    self.set_disabled(id, disabled);
                }
                _ => {}
            }
        }
    }

    fn option_value(&self, option: NodeId) -> String {
        match self.attr(option, "value") {
            Some(v) => v.to_string(),
            None => self.text_content(option).trim().to_string(),
        }
    }
}

fn parse_rcdom(html: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .unwrap_or_default()
}

fn find_body(handle: &Handle) -> Option<Handle> {
    for child in handle.children.borrow().iter() {
        if let RcNodeData::Element { name, .. } = &child.data {
            if &*name.local == "body" {
                return Some(child.clone());
            }
        }
        if let Some(found) = find_body(child) {
            return Some(found);
        }
    }
    None
}

fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (k, v) = decl.split_once(':')?;
            let k = k.trim().to_ascii_lowercase();
            let v = v.trim();
            if k.is_empty() {
                None
            } else {
                Some((k, v.to_string()))
            }
        })
        .collect()
}

fn sync_style_attr(el: &mut Element) {
    let serialized = el
        .style
        .iter()
        .map(|(k, v)| format!("{}: {}", k, v))
        .collect::<Vec<_>>()
        .join("; ");
    el.attrs.retain(|(k, _)| k != "style");
    if !serialized.is_empty() {
        el.attrs.push(("style".to_string(), serialized));
    }
}
