//! An in-memory render target.

use crate::document::{Document, Value};
use core::fmt;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// A node handle in a [`MemoryDocument`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors returned by [`MemoryDocument`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("no such node: {0:?}")]
    NoSuchNode(NodeId),
    #[error("{child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },
    #[error("{0:?} is not an element")]
    NotAnElement(NodeId),
    #[error("inserting {0:?} would make it its own descendant")]
    Cycle(NodeId),
    #[error("injected failure creating <{0}>")]
    Injected(String),
}

/// A single recorded document mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    CreateElement { node: NodeId, tag: String },
    CreateText { node: NodeId, content: String },
    SetAttribute { node: NodeId, name: String, value: String },
    RemoveAttribute { node: NodeId, name: String },
    SetProperty { node: NodeId, name: String, value: Value },
    RemoveProperty { node: NodeId, name: String },
    SetStyle { node: NodeId, css: Option<String> },
    SetClass { node: NodeId, class: Option<String> },
    SetText { node: NodeId, text: String },
    InsertBefore { parent: NodeId, child: NodeId, reference: NodeId },
    AppendChild { parent: NodeId, child: NodeId },
    RemoveChild { parent: NodeId, child: NodeId },
}

impl Mutation {
    /// If true, this mutation creates a node.
    pub fn is_create(&self) -> bool {
        match self {
            Mutation::CreateElement { .. } | Mutation::CreateText { .. } => true,
            _ => false,
        }
    }

    /// If true, this mutation changes tree structure.
    pub fn is_structural(&self) -> bool {
        match self {
            Mutation::InsertBefore { .. }
            | Mutation::AppendChild { .. }
            | Mutation::RemoveChild { .. } => true,
            _ => false,
        }
    }
}

#[derive(Debug)]
enum MemNodeKind {
    Element {
        namespace: Option<String>,
        tag: String,
        attributes: BTreeMap<String, String>,
        properties: BTreeMap<String, Value>,
        style: Option<String>,
        class: Option<String>,
    },
    Text(String),
}

#[derive(Debug)]
struct MemNode {
    kind: MemNodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A render target that keeps its node tree in memory and records every mutation.
///
/// Removed subtrees are freed immediately, since the reconciler never reinserts a node it has
/// removed.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    nodes: HashMap<NodeId, MemNode>,
    next_id: u64,
    mutations: Vec<Mutation>,
    fail_on_create: Option<String>,
}

impl MemoryDocument {
    pub fn new() -> MemoryDocument {
        MemoryDocument::default()
    }

    /// Creates a container element without recording a mutation.
    pub fn create_container(&mut self, tag: &str) -> NodeId {
        self.alloc(MemNodeKind::Element {
            namespace: None,
            tag: tag.into(),
            attributes: BTreeMap::new(),
            properties: BTreeMap::new(),
            style: None,
            class: None,
        })
    }

    /// All mutations recorded so far.
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Returns and clears the recorded mutations.
    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::replace(&mut self.mutations, Vec::new())
    }

    /// Makes the next `create_element` call for the given tag fail.
    pub fn fail_on_create(&mut self, tag: &str) {
        self.fail_on_create = Some(tag.into());
    }

    /// Number of live nodes, including containers.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes.get(&node).map_or(&[], |node| &node.children)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|node| node.parent)
    }

    /// Element tag, or `None` for text nodes.
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(&node)?.kind {
            MemNodeKind::Element { tag, .. } => Some(tag),
            MemNodeKind::Text(_) => None,
        }
    }

    pub fn namespace(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(&node)?.kind {
            MemNodeKind::Element { namespace, .. } => namespace.as_ref().map(|s| &**s),
            MemNodeKind::Text(_) => None,
        }
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes.get(&node)?.kind {
            MemNodeKind::Element { attributes, .. } => attributes.get(name).map(|s| &**s),
            MemNodeKind::Text(_) => None,
        }
    }

    pub fn property(&self, node: NodeId, name: &str) -> Option<&Value> {
        match &self.nodes.get(&node)?.kind {
            MemNodeKind::Element { properties, .. } => properties.get(name),
            MemNodeKind::Text(_) => None,
        }
    }

    pub fn style(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(&node)?.kind {
            MemNodeKind::Element { style, .. } => style.as_ref().map(|s| &**s),
            MemNodeKind::Text(_) => None,
        }
    }

    pub fn class(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(&node)?.kind {
            MemNodeKind::Element { class, .. } => class.as_ref().map(|s| &**s),
            MemNodeKind::Text(_) => None,
        }
    }

    /// Concatenated text of the node and its descendants.
    pub fn text(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        if let Some(node) = self.nodes.get(&id) {
            match &node.kind {
                MemNodeKind::Text(text) => out.push_str(text),
                MemNodeKind::Element { .. } => {
                    for child in &node.children {
                        self.collect_text(*child, out);
                    }
                }
            }
        }
    }

    /// Serializes the subtree as markup (attributes in name order, properties omitted).
    pub fn markup(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_markup(node, &mut out);
        out
    }

    fn write_markup(&self, id: NodeId, out: &mut String) {
        let node = match self.nodes.get(&id) {
            Some(node) => node,
            None => return,
        };
        match &node.kind {
            MemNodeKind::Text(text) => out.push_str(text),
            MemNodeKind::Element {
                tag,
                attributes,
                style,
                class,
                ..
            } => {
                out.push('<');
                out.push_str(tag);
                if let Some(class) = class {
                    out.push_str(&format!(" class=\"{}\"", class));
                }
                if let Some(style) = style {
                    out.push_str(&format!(" style=\"{}\"", style));
                }
                for (name, value) in attributes {
                    out.push_str(&format!(" {}=\"{}\"", name, value));
                }
                out.push('>');
                for child in &node.children {
                    self.write_markup(*child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }

    fn alloc(&mut self, kind: MemNodeKind) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            MemNode {
                kind,
                parent: None,
                children: Vec::new(),
            },
        );
        id
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut MemNode, MemoryError> {
        self.nodes.get_mut(&id).ok_or(MemoryError::NoSuchNode(id))
    }

    fn element_mut(
        &mut self,
        id: NodeId,
    ) -> Result<
        (
            &mut BTreeMap<String, String>,
            &mut BTreeMap<String, Value>,
            &mut Option<String>,
            &mut Option<String>,
        ),
        MemoryError,
    > {
        match &mut self.node_mut(id)?.kind {
            MemNodeKind::Element {
                attributes,
                properties,
                style,
                class,
                ..
            } => Ok((attributes, properties, style, class)),
            MemNodeKind::Text(_) => Err(MemoryError::NotAnElement(id)),
        }
    }

    /// Frees a node and its subtree. Does not touch the parent's child list.
    fn free(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.remove(&id) {
            for child in node.children {
                self.free(child);
            }
        }
    }

    /// Unlinks a node from its current parent, if any.
    fn unlink(&mut self, id: NodeId) -> Result<(), MemoryError> {
        if let Some(parent) = self.node_mut(id)?.parent.take() {
            let siblings = &mut self.node_mut(parent)?.children;
            if let Some(pos) = siblings.iter().position(|i| *i == id) {
                siblings.remove(pos);
            }
        }
        Ok(())
    }

    /// Checks that `child` exists and is not `parent` or one of its ancestors.
    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<(), MemoryError> {
        if !self.nodes.contains_key(&child) {
            return Err(MemoryError::NoSuchNode(child));
        }
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return Err(MemoryError::Cycle(child));
            }
            cursor = self
                .nodes
                .get(&id)
                .ok_or(MemoryError::NoSuchNode(id))?
                .parent;
        }
        Ok(())
    }
}

impl Document for MemoryDocument {
    type Node = NodeId;
    type Error = MemoryError;

    fn create_element(&mut self, tag: &str) -> Result<NodeId, MemoryError> {
        if self.fail_on_create.as_ref().map_or(false, |t| t == tag) {
            self.fail_on_create = None;
            return Err(MemoryError::Injected(tag.into()));
        }
        let node = self.create_container(tag);
        self.mutations.push(Mutation::CreateElement {
            node,
            tag: tag.into(),
        });
        Ok(node)
    }

    fn create_element_ns(&mut self, namespace: &str, tag: &str) -> Result<NodeId, MemoryError> {
        let node = self.create_element(tag)?;
        if let MemNodeKind::Element { namespace: ns, .. } = &mut self.node_mut(node)?.kind {
            *ns = Some(namespace.into());
        }
        Ok(node)
    }

    fn create_text(&mut self, content: &str) -> Result<NodeId, MemoryError> {
        let node = self.alloc(MemNodeKind::Text(content.into()));
        self.mutations.push(Mutation::CreateText {
            node,
            content: content.into(),
        });
        Ok(node)
    }

    fn set_attribute(&mut self, node: &NodeId, name: &str, value: &str) -> Result<(), MemoryError> {
        let (attributes, _, _, _) = self.element_mut(*node)?;
        attributes.insert(name.into(), value.into());
        self.mutations.push(Mutation::SetAttribute {
            node: *node,
            name: name.into(),
            value: value.into(),
        });
        Ok(())
    }

    fn remove_attribute(&mut self, node: &NodeId, name: &str) -> Result<(), MemoryError> {
        let (attributes, _, _, _) = self.element_mut(*node)?;
        attributes.remove(name);
        self.mutations.push(Mutation::RemoveAttribute {
            node: *node,
            name: name.into(),
        });
        Ok(())
    }

    fn set_property(&mut self, node: &NodeId, name: &str, value: &Value) -> Result<(), MemoryError> {
        let (_, properties, _, _) = self.element_mut(*node)?;
        properties.insert(name.into(), value.clone());
        self.mutations.push(Mutation::SetProperty {
            node: *node,
            name: name.into(),
            value: value.clone(),
        });
        Ok(())
    }

    fn remove_property(&mut self, node: &NodeId, name: &str) -> Result<(), MemoryError> {
        let (_, properties, _, _) = self.element_mut(*node)?;
        properties.remove(name);
        self.mutations.push(Mutation::RemoveProperty {
            node: *node,
            name: name.into(),
        });
        Ok(())
    }

    fn set_style(&mut self, node: &NodeId, css: Option<&str>) -> Result<(), MemoryError> {
        let (_, _, style, _) = self.element_mut(*node)?;
        *style = css.map(Into::into);
        self.mutations.push(Mutation::SetStyle {
            node: *node,
            css: css.map(Into::into),
        });
        Ok(())
    }

    fn set_class(&mut self, node: &NodeId, class: Option<&str>) -> Result<(), MemoryError> {
        let (_, _, _, current) = self.element_mut(*node)?;
        *current = class.map(Into::into);
        self.mutations.push(Mutation::SetClass {
            node: *node,
            class: class.map(Into::into),
        });
        Ok(())
    }

    fn set_text_content(&mut self, node: &NodeId, text: &str) -> Result<(), MemoryError> {
        let id = *node;
        let is_text = match &mut self.node_mut(id)?.kind {
            MemNodeKind::Text(content) => {
                *content = text.into();
                true
            }
            MemNodeKind::Element { .. } => false,
        };
        if !is_text {
            let children = std::mem::replace(&mut self.node_mut(id)?.children, Vec::new());
            for child in children {
                self.free(child);
            }
            if !text.is_empty() {
                let text_node = self.alloc(MemNodeKind::Text(text.into()));
                self.node_mut(text_node)?.parent = Some(id);
                self.node_mut(id)?.children.push(text_node);
            }
        }
        self.mutations.push(Mutation::SetText {
            node: id,
            text: text.into(),
        });
        Ok(())
    }

    fn insert_before(
        &mut self,
        parent: &NodeId,
        child: &NodeId,
        reference: &NodeId,
    ) -> Result<(), MemoryError> {
        let (parent, child, reference) = (*parent, *child, *reference);
        self.check_insert(parent, child)?;
        if self.nodes.get(&reference).and_then(|n| n.parent) != Some(parent) {
            return Err(MemoryError::NotAChild {
                parent,
                child: reference,
            });
        }
        self.unlink(child)?;
        let siblings = &mut self.node_mut(parent)?.children;
        let pos = siblings
            .iter()
            .position(|i| *i == reference)
            .ok_or(MemoryError::NotAChild {
                parent,
                child: reference,
            })?;
        siblings.insert(pos, child);
        self.node_mut(child)?.parent = Some(parent);
        self.mutations.push(Mutation::InsertBefore {
            parent,
            child,
            reference,
        });
        Ok(())
    }

    fn append_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), MemoryError> {
        let (parent, child) = (*parent, *child);
        self.check_insert(parent, child)?;
        self.unlink(child)?;
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        self.mutations.push(Mutation::AppendChild { parent, child });
        Ok(())
    }

    fn remove_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), MemoryError> {
        let (parent, child) = (*parent, *child);
        if self.nodes.get(&child).and_then(|n| n.parent) != Some(parent) {
            return Err(MemoryError::NotAChild { parent, child });
        }
        self.unlink(child)?;
        self.free(child);
        self.mutations.push(Mutation::RemoveChild { parent, child });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_moves_existing_nodes() {
        let mut doc = MemoryDocument::new();
        let root = doc.create_container("body");
        let a = doc.create_text("a").unwrap();
        let b = doc.create_text("b").unwrap();
        doc.append_child(&root, &a).unwrap();
        doc.append_child(&root, &b).unwrap();
        assert_eq!(doc.text(root), "ab");

        doc.insert_before(&root, &b, &a).unwrap();
        assert_eq!(doc.children(root), &[b, a]);
        assert_eq!(doc.parent(b), Some(root));
    }

    #[test]
    fn remove_frees_subtree() {
        let mut doc = MemoryDocument::new();
        let root = doc.create_container("body");
        let div = doc.create_element("div").unwrap();
        let text = doc.create_text("hi").unwrap();
        doc.append_child(&div, &text).unwrap();
        doc.append_child(&root, &div).unwrap();
        assert_eq!(doc.markup(root), "<body><div>hi</div></body>");

        doc.remove_child(&root, &div).unwrap();
        assert!(!doc.contains(div));
        assert!(!doc.contains(text));
        assert_eq!(doc.node_count(), 1);
        assert_eq!(
            doc.remove_child(&root, &div),
            Err(MemoryError::NotAChild {
                parent: root,
                child: div
            })
        );
    }

    #[test]
    fn set_text_content_replaces_children() {
        let mut doc = MemoryDocument::new();
        let div = doc.create_element("div").unwrap();
        let span = doc.create_element("span").unwrap();
        doc.append_child(&div, &span).unwrap();
        doc.set_text_content(&div, "text").unwrap();
        assert!(!doc.contains(span));
        assert_eq!(doc.children(div).len(), 1);
        assert_eq!(doc.text(div), "text");

        doc.set_text_content(&div, "").unwrap();
        assert!(doc.children(div).is_empty());
    }

    #[test]
    fn rejects_cycles() {
        let mut doc = MemoryDocument::new();
        let outer = doc.create_element("div").unwrap();
        let inner = doc.create_element("div").unwrap();
        doc.append_child(&outer, &inner).unwrap();
        assert_eq!(
            doc.append_child(&inner, &outer),
            Err(MemoryError::Cycle(outer))
        );
    }

    #[test]
    fn injected_failure_fires_once() {
        let mut doc = MemoryDocument::new();
        doc.fail_on_create("p");
        assert!(doc.create_element("div").is_ok());
        assert_eq!(
            doc.create_element("p"),
            Err(MemoryError::Injected("p".into()))
        );
        assert!(doc.create_element("p").is_ok());
    }
}
