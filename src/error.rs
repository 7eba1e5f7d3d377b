//! Errors.

use crate::vnode::Key;
use core::fmt;
use thiserror::Error;

/// Errors that may occur when reconciling or updating.
#[derive(Debug, Error)]
pub enum Error<E: fmt::Debug> {
    /// The tree description or a component was used incorrectly.
    #[error(transparent)]
    Misuse(#[from] Misuse),

    /// The render target failed; the rest of the pass was aborted.
    #[error("render target error: {0:?}")]
    Document(E),
}

/// Programmer errors detected while diffing.
///
/// These indicate a tree description that would otherwise produce nondeterministic document
/// state, so the pass is aborted instead of guessing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Misuse {
    /// Two siblings in a keyed list share a key.
    #[error("duplicate key {key} among keyed children of <{parent}>")]
    DuplicateKey { parent: String, key: Key },

    /// A child in a keyed list has no key.
    #[error("child {index} of <{parent}> has no key but its siblings are tracked by key")]
    UnkeyedChild { parent: String, index: usize },

    /// A static-shape attribute or property map changed its key set between renders.
    #[error("static {map} of <{tag}> changed shape: expected {expected:?}, found {found:?}")]
    StaticShapeChanged {
        tag: String,
        map: &'static str,
        expected: Option<String>,
        found: Option<String>,
    },

    /// A component rendered a root vnode that does not describe its root element.
    #[error("component {descriptor} rendered root <{found}> but its root element is <{expected}>")]
    RootTagMismatch {
        descriptor: String,
        expected: String,
        found: String,
    },

    /// Canvas components draw directly and have no vnode tree.
    #[error("component {descriptor} is in canvas mode and cannot sync a vnode tree")]
    SyncOnCanvas { descriptor: String },
}

impl<E: fmt::Debug> Error<E> {
    /// Returns the misuse, if this is one.
    pub fn misuse(&self) -> Option<&Misuse> {
        match self {
            Error::Misuse(misuse) => Some(misuse),
            Error::Document(_) => None,
        }
    }
}
