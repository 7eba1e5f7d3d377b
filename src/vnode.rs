//! Virtual nodes.

use crate::component::ComponentId;
use crate::descriptor::DescriptorInner;
use crate::document::{Document, Value};
use core::fmt;
use std::any::Any;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Identifies a child among its siblings when the parent tracks children by key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Num(u64),
    Str(Cow<'static, str>),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Key::Num(n) => write!(f, "{}", n),
            Key::Str(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<u64> for Key {
    fn from(n: u64) -> Self {
        Key::Num(n)
    }
}

impl From<u32> for Key {
    fn from(n: u32) -> Self {
        Key::Num(n.into())
    }
}

impl From<usize> for Key {
    fn from(n: usize) -> Self {
        Key::Num(n as u64)
    }
}

impl From<&'static str> for Key {
    fn from(s: &'static str) -> Self {
        Key::Str(Cow::Borrowed(s))
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(Cow::Owned(s))
    }
}

/// Attribute or property name.
pub type Name = Cow<'static, str>;

/// Attribute map whose key set is the same on every render of a node.
pub type StaticAttrs = Vec<(Name, String)>;
/// Attribute map whose key set may change between renders.
pub type DynamicAttrs = BTreeMap<Name, String>;
/// Property map whose key set is the same on every render of a node.
pub type StaticProps = Vec<(Name, Value)>;
/// Property map whose key set may change between renders.
pub type DynamicProps = BTreeMap<Name, Value>;

/// What kind of node a vnode describes.
pub enum VNodeKind<D: Document> {
    Element(Name),
    NamespacedElement { namespace: Name, tag: Name },
    Text(String),
    Component(ComponentVNode<D>),
}

/// The component half of a component placeholder.
pub struct ComponentVNode<D: Document> {
    pub(crate) descriptor: Rc<DescriptorInner<D>>,
    pub(crate) props: Rc<dyn Any>,
    pub(crate) children: Option<Rc<Vec<VNode<D>>>>,
    /// The mounted component; set by the reconciler.
    pub(crate) component: Option<ComponentId>,
}

/// Child content of an element.
pub enum Children<D: Document> {
    None,
    /// Literal text content.
    Text(String),
    /// Children diffed by position.
    Nodes(Vec<VNode<D>>),
    /// Children diffed by key.
    Keyed(Vec<VNode<D>>),
}

impl<D: Document> Children<D> {
    /// Returns the structured children, if any.
    pub fn nodes(&self) -> &[VNode<D>] {
        match self {
            Children::Nodes(nodes) | Children::Keyed(nodes) => nodes,
            Children::None | Children::Text(_) => &[],
        }
    }


    fn describe(&self) -> &'static str {
        match self {
            Children::None => "no children",
            Children::Text(_) => "text children",
            Children::Nodes(_) => "children",
            Children::Keyed(_) => "keyed children",
        }
    }
}

/// A virtual node: a cheap description of one render-target node.
///
/// VNodes are built with the fluent setters below and handed to the reconciler, which fills in
/// the rendered node. A mounted vnode is never re-described; the next render builds a new tree
/// and the reconciler compares the two.
pub struct VNode<D: Document> {
    pub(crate) kind: VNodeKind<D>,
    pub(crate) key: Option<Key>,
    pub(crate) attrs: Option<StaticAttrs>,
    pub(crate) dynamic_attrs: Option<DynamicAttrs>,
    pub(crate) props: Option<StaticProps>,
    pub(crate) dynamic_props: Option<DynamicProps>,
    pub(crate) style: Option<String>,
    pub(crate) class_name: Option<String>,
    pub(crate) children: Children<D>,
    pub(crate) node: Option<D::Node>,
}

impl<D: Document> VNode<D> {
    fn with_kind(kind: VNodeKind<D>) -> VNode<D> {
        VNode {
            kind,
            key: None,
            attrs: None,
            dynamic_attrs: None,
            props: None,
            dynamic_props: None,
            style: None,
            class_name: None,
            children: Children::None,
            node: None,
        }
    }

    /// Creates an element vnode.
    pub fn element(tag: impl Into<Name>) -> VNode<D> {
        VNode::with_kind(VNodeKind::Element(tag.into()))
    }

    /// Creates a namespaced element vnode.
    pub fn element_ns(namespace: impl Into<Name>, tag: impl Into<Name>) -> VNode<D> {
        VNode::with_kind(VNodeKind::NamespacedElement {
            namespace: namespace.into(),
            tag: tag.into(),
        })
    }

    /// Creates an SVG element vnode.
    pub fn svg(tag: impl Into<Name>) -> VNode<D> {
        VNode::element_ns(SVG_NAMESPACE, tag)
    }

    /// Creates a text vnode.
    pub fn text(content: impl Into<String>) -> VNode<D> {
        VNode::with_kind(VNodeKind::Text(content.into()))
    }

    pub(crate) fn component(
        descriptor: Rc<DescriptorInner<D>>,
        props: Rc<dyn Any>,
    ) -> VNode<D> {
        VNode::with_kind(VNodeKind::Component(ComponentVNode {
            descriptor,
            props,
            children: None,
            component: None,
        }))
    }

    /// Sets the key.
    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Sets static-shape attributes.
    pub fn attrs<I, K, V>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Name>,
        V: Into<String>,
    {
        self.assert_element("attrs");
        self.attrs = Some(
            attrs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Appends one static-shape attribute.
    pub fn attr(mut self, name: impl Into<Name>, value: impl Into<String>) -> Self {
        self.assert_element("attr");
        self.attrs
            .get_or_insert_with(Vec::new)
            .push((name.into(), value.into()));
        self
    }

    /// Sets dynamic-shape attributes.
    pub fn dynamic_attrs<I, K, V>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Name>,
        V: Into<String>,
    {
        self.assert_element("dynamic_attrs");
        self.dynamic_attrs = Some(
            attrs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Sets static-shape properties.
    pub fn props<I, K, V>(mut self, props: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Name>,
        V: Into<Value>,
    {
        self.assert_element("props");
        self.props = Some(
            props
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Appends one static-shape property.
    pub fn prop(mut self, name: impl Into<Name>, value: impl Into<Value>) -> Self {
        self.assert_element("prop");
        self.props
            .get_or_insert_with(Vec::new)
            .push((name.into(), value.into()));
        self
    }

    /// Sets dynamic-shape properties.
    pub fn dynamic_props<I, K, V>(mut self, props: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Name>,
        V: Into<Value>,
    {
        self.assert_element("dynamic_props");
        self.dynamic_props = Some(
            props
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Sets the style text.
    pub fn style(mut self, css: impl Into<String>) -> Self {
        self.assert_element("style");
        self.style = Some(css.into());
        self
    }

    /// Sets the class name.
    pub fn class_name(mut self, class: impl Into<String>) -> Self {
        self.assert_element("class_name");
        self.class_name = Some(class.into());
        self
    }

    /// Sets literal text content.
    ///
    /// # Panics
    /// - if structured children were already set
    /// - if this is not an element
    pub fn text_children(mut self, text: impl Into<String>) -> Self {
        self.assert_element("text_children");
        self.assert_children_unset("text_children");
        self.children = Children::Text(text.into());
        self
    }

    /// Sets children that are diffed by position.
    ///
    /// On component placeholders, these are passed to the component instead.
    ///
    /// # Panics
    /// - if children were already set
    /// - if this is a text node
    pub fn children(mut self, children: Vec<VNode<D>>) -> Self {
        if let VNodeKind::Component(component) = &mut self.kind {
            component.children = Some(Rc::new(children));
            return self;
        }
        self.assert_element("children");
        self.assert_children_unset("children");
        self.children = Children::Nodes(children);
        self
    }

    /// Sets children that are diffed by key; every child must have a unique key.
    ///
    /// # Panics
    /// - if children were already set
    /// - if this is not an element
    pub fn track_by_key_children(mut self, children: Vec<VNode<D>>) -> Self {
        self.assert_element("track_by_key_children");
        self.assert_children_unset("track_by_key_children");
        self.children = Children::Keyed(children);
        self
    }

    fn assert_element(&self, setter: &str) {
        match self.kind {
            VNodeKind::Element(_) | VNodeKind::NamespacedElement { .. } => (),
            _ => panic!(
                "VNode::{}: {} is not an element",
                setter,
                self.describe()
            ),
        }
    }

    fn assert_children_unset(&self, setter: &str) {
        if let Children::None = self.children {
            return;
        }
        panic!(
            "VNode::{}: {} already has {}; text and structured children are mutually exclusive",
            setter,
            self.describe(),
            self.children.describe()
        );
    }

    /// Returns the key.
    pub fn get_key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub fn kind(&self) -> &VNodeKind<D> {
        &self.kind
    }

    /// Returns the children.
    pub fn get_children(&self) -> &Children<D> {
        &self.children
    }

    /// The real node, once mounted.
    pub fn rendered_node(&self) -> Option<&D::Node> {
        self.node.as_ref()
    }

    /// The mounted component, if this is a mounted component placeholder.
    pub fn component_id(&self) -> Option<ComponentId> {
        match &self.kind {
            VNodeKind::Component(component) => component.component,
            _ => None,
        }
    }

    /// Element tag, if this is an element.
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            VNodeKind::Element(tag) | VNodeKind::NamespacedElement { tag, .. } => Some(&**tag),
            VNodeKind::Text(_) => None,
            VNodeKind::Component(component) => Some(component.descriptor.root.tag()),
        }
    }

    /// Short human-readable description for error messages.
    pub(crate) fn describe(&self) -> String {
        match &self.kind {
            VNodeKind::Element(tag) => format!("<{}>", tag),
            VNodeKind::NamespacedElement { tag, .. } => format!("<{}> (namespaced)", tag),
            VNodeKind::Text(_) => "text node".into(),
            VNodeKind::Component(component) => {
                format!("component {}", component.descriptor.name)
            }
        }
    }

    /// The rendered node; panics if this vnode was never mounted.
    pub(crate) fn rendered(&self) -> &D::Node {
        match &self.node {
            Some(node) => node,
            None => panic!("{} has not been mounted", self.describe()),
        }
    }
}

/// The SVG namespace URI.
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Produces an unmounted copy of the description.
impl<D: Document> Clone for VNode<D> {
    fn clone(&self) -> Self {
        VNode {
            kind: match &self.kind {
                VNodeKind::Element(tag) => VNodeKind::Element(tag.clone()),
                VNodeKind::NamespacedElement { namespace, tag } => VNodeKind::NamespacedElement {
                    namespace: namespace.clone(),
                    tag: tag.clone(),
                },
                VNodeKind::Text(content) => VNodeKind::Text(content.clone()),
                VNodeKind::Component(component) => VNodeKind::Component(ComponentVNode {
                    descriptor: Rc::clone(&component.descriptor),
                    props: Rc::clone(&component.props),
                    children: component.children.clone(),
                    component: None,
                }),
            },
            key: self.key.clone(),
            attrs: self.attrs.clone(),
            dynamic_attrs: self.dynamic_attrs.clone(),
            props: self.props.clone(),
            dynamic_props: self.dynamic_props.clone(),
            style: self.style.clone(),
            class_name: self.class_name.clone(),
            children: match &self.children {
                Children::None => Children::None,
                Children::Text(text) => Children::Text(text.clone()),
                Children::Nodes(nodes) => Children::Nodes(nodes.clone()),
                Children::Keyed(nodes) => Children::Keyed(nodes.clone()),
            },
            node: None,
        }
    }
}

impl<D: Document> fmt::Debug for VNode<D> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut s = f.debug_struct("VNode");
        match &self.kind {
            VNodeKind::Element(tag) => s.field("tag", tag),
            VNodeKind::NamespacedElement { namespace, tag } => {
                s.field("namespace", namespace).field("tag", tag)
            }
            VNodeKind::Text(content) => s.field("text", content),
            VNodeKind::Component(component) => s
                .field("component", &component.descriptor.name)
                .field("id", &component.component),
        };
        if let Some(key) = &self.key {
            s.field("key", key);
        }
        if let Some(attrs) = &self.attrs {
            s.field("attrs", attrs);
        }
        if let Some(attrs) = &self.dynamic_attrs {
            s.field("dynamic_attrs", attrs);
        }
        if let Some(props) = &self.props {
            s.field("props", props);
        }
        if let Some(props) = &self.dynamic_props {
            s.field("dynamic_props", props);
        }
        if let Some(style) = &self.style {
            s.field("style", style);
        }
        if let Some(class) = &self.class_name {
            s.field("class_name", class);
        }
        match &self.children {
            Children::None => (),
            Children::Text(text) => {
                s.field("text_children", text);
            }
            Children::Nodes(nodes) => {
                s.field("children", nodes);
            }
            Children::Keyed(nodes) => {
                s.field("keyed_children", nodes);
            }
        }
        if let Some(node) = &self.node {
            s.field("node", node);
        }
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocument;

    type V = VNode<MemoryDocument>;

    #[test]
    fn setters_chain() {
        let node = V::element("div")
            .key("a")
            .attr("id", "main")
            .prop("value", 3)
            .style("color: red")
            .class_name("box")
            .children(vec![V::text("hello")]);

        assert_eq!(node.get_key(), Some(&Key::from("a")));
        assert_eq!(node.tag(), Some("div"));
        assert_eq!(node.attrs.as_ref().unwrap()[0].1, "main");
        assert_eq!(node.props.as_ref().unwrap()[0].1, Value::Number(3.));
        assert_eq!(node.get_children().nodes().len(), 1);
    }

    #[test]
    #[should_panic(expected = "mutually exclusive")]
    fn text_then_keyed_children_panics() {
        let _ = V::element("ul")
            .text_children("x")
            .track_by_key_children(vec![V::text("y").key(1u64)]);
    }

    #[test]
    #[should_panic(expected = "mutually exclusive")]
    fn keyed_then_text_children_panics() {
        let _ = V::element("ul")
            .track_by_key_children(vec![])
            .text_children("x");
    }

    #[test]
    #[should_panic(expected = "is not an element")]
    fn children_on_text_panics() {
        let _ = V::text("x").children(vec![]);
    }

    #[test]
    fn clone_is_unmounted() {
        let mut doc = MemoryDocument::new();
        let mut node = V::element("div");
        node.node = Some(doc.create_container("div"));
        let copy = node.clone();
        assert!(node.rendered_node().is_some());
        assert!(copy.rendered_node().is_none());
    }

    #[test]
    fn svg_is_namespaced() {
        match V::svg("circle").kind() {
            VNodeKind::NamespacedElement { namespace, tag } => {
                assert_eq!(namespace, SVG_NAMESPACE);
                assert_eq!(tag, "circle");
            }
            _ => panic!("expected a namespaced element"),
        }
    }
}
