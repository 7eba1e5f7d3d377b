//! Traits for render targets.

use core::fmt;

/// A render target: a mutable tree of real nodes.
///
/// This is the only way the reconciler touches the outside world. Implementations for a browser
/// would wrap DOM nodes; [`MemoryDocument`](crate::MemoryDocument) keeps everything in memory.
///
/// All methods may fail. Errors are never recovered internally: they abort the current diff pass
/// and are returned to whoever called `patch`, `update` or `flush`.
pub trait Document: 'static {
    /// A reference to a node in the document.
    type Node: Clone + PartialEq + fmt::Debug;

    /// Error type.
    type Error: fmt::Debug;

    /// Creates a detached element.
    fn create_element(&mut self, tag: &str) -> Result<Self::Node, Self::Error>;

    /// Creates a detached element in a namespace (e.g. SVG).
    fn create_element_ns(&mut self, namespace: &str, tag: &str)
        -> Result<Self::Node, Self::Error>;

    /// Creates a detached text node.
    fn create_text(&mut self, content: &str) -> Result<Self::Node, Self::Error>;

    /// Sets an HTML attribute.
    fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &str)
        -> Result<(), Self::Error>;

    /// Removes an HTML attribute.
    fn remove_attribute(&mut self, node: &Self::Node, name: &str) -> Result<(), Self::Error>;

    /// Sets a property on the node object.
    fn set_property(&mut self, node: &Self::Node, name: &str, value: &Value)
        -> Result<(), Self::Error>;

    /// Removes (resets) a property on the node object.
    fn remove_property(&mut self, node: &Self::Node, name: &str) -> Result<(), Self::Error>;

    /// Sets the style text; `None` removes the style attribute.
    fn set_style(&mut self, node: &Self::Node, css: Option<&str>) -> Result<(), Self::Error>;

    /// Sets the class text; `None` removes the class attribute.
    fn set_class(&mut self, node: &Self::Node, class: Option<&str>) -> Result<(), Self::Error>;

    /// Sets the text content.
    ///
    /// On elements this replaces all children with a single text node (or with nothing if the
    /// text is empty).
    fn set_text_content(&mut self, node: &Self::Node, text: &str) -> Result<(), Self::Error>;

    /// Inserts `child` before `reference`, moving it if it is already in the document.
    fn insert_before(
        &mut self,
        parent: &Self::Node,
        child: &Self::Node,
        reference: &Self::Node,
    ) -> Result<(), Self::Error>;

    /// Appends `child` as the last child of `parent`, moving it if it is already in the document.
    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node)
        -> Result<(), Self::Error>;

    /// Removes `child` from `parent`.
    fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node)
        -> Result<(), Self::Error>;
}

/// A property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n.into())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
