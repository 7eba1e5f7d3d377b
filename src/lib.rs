//! Virtual DOM library.
//!
//! # Conceptual overview
//! Kestrel renders tree-shaped user interfaces into a mutable node tree (the *document*) by
//! describing the desired tree with cheap virtual nodes and letting a reconciler work out which
//! mutations turn the current document into the described one.
//!
//! ## VNodes
//! A [`VNode`] describes one document node: an element, a namespaced element (e.g. SVG), a text
//! node, or a component placeholder. VNodes are built with fluent setters and are never
//! changed after being handed to the reconciler, except that it records which real node (and,
//! for placeholders, which component) each one ended up with. The next render builds a fresh
//! tree and the two are compared.
//!
//! Children are either literal text, a list diffed by position, or a list diffed by key. Keyed
//! lists reuse the real node of every child whose key survives and only move the ones that are
//! out of order, so per-node state like focus or a scroll position is kept.
//!
//! ## Components
//! A component owns a root element and renders into it. Its behavior is defined by a shared,
//! immutable [`ComponentDescriptor`]: the root element, lifecycle hooks, and the render
//! function. Components receive props and children from their parent and keep a private state
//! that the framework never looks at.
//!
//! Components are created, attached, updated any number of times, possibly detached and
//! re-attached, and finally disposed. Props are shared by `Rc` and compared by identity: passing
//! the same `Rc` again does not cause a re-render.
//!
//! ## Scheduling
//! Invalidating a component marks it dirty and queues it. A flush then updates queued
//! components shallowest first, so a parent always re-renders before its children and children
//! that the parent already updated are skipped. Components invalidated during a flush are
//! handled by the same flush.
//!
//! ## Documents
//! The reconciler only talks to the outside world through the [`Document`] trait. A browser
//! binding would implement it on top of DOM nodes; [`MemoryDocument`] keeps everything in
//! memory and records each mutation, which is useful for tests and as a reference.
//!
//! Everything lives in a [`Runtime`], which is single-threaded. Other threads can reach it
//! through an [`Invalidator`] and get told about frames through [`ChannelFrames`].

mod component;
mod descriptor;
mod diff;
mod document;
mod error;
mod host;
pub mod memory;
mod runtime;
mod scheduler;
mod vnode;


pub use component::{ComponentId, Lifecycle};
pub use descriptor::{ComponentDescriptor, Cx, DescriptorBuilder, RootKind};
pub use document::{Document, Value};
pub use error::{Error, Misuse};
pub use host::{ChannelFrames, FrameReceiver, Frames, Invalidator, ManualFrames};
pub use memory::MemoryDocument;
pub use runtime::{Config, Runtime, RuntimeBuilder};
pub use scheduler::{FrameTask, Scheduler};
pub use vnode::{
    Children, ComponentVNode, DynamicAttrs, DynamicProps, Key, Name, StaticAttrs, StaticProps,
    VNode, VNodeKind, SVG_NAMESPACE,
};
