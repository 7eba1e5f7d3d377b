//! The reconciler.
//!
//! Diffing consumes the old vnode tree and fills in the new one: every new vnode ends up with
//! the real node it describes, and every component placeholder with the component mounted for
//! it. The document is changed as little as possible along the way.
//!
//! Newly mounted subtrees are built detached and inserted in one piece; components inside them
//! are attached and rendered only after that (“activation”), so their hooks always see a root
//! element that is already in place.

use crate::component::{embedded_components, ComponentData, ComponentId};
use crate::document::Document;
use crate::error::{Error, Misuse};
use crate::runtime::Runtime;
use crate::vnode::{Children, Key, Name, VNode, VNodeKind};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;
use tracing::{trace, warn};

type DiffResult<D> = Result<(), Error<<D as Document>::Error>>;

/// A single attribute or property change.
enum Change<'a, T> {
    Set(&'a str, &'a T),
    Remove(&'a str),
}

/// Where a keyed child ends up after the forward scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    /// Reused and already in order.
    InPlace,
    /// Reused but out of order.
    Move,
    /// Newly mounted.
    Insert,
}

fn same_kind<D: Document>(a: &VNodeKind<D>, b: &VNodeKind<D>) -> bool {
    match (a, b) {
        (VNodeKind::Element(a), VNodeKind::Element(b)) => a == b,
        (
            VNodeKind::NamespacedElement { namespace, tag },
            VNodeKind::NamespacedElement {
                namespace: b_namespace,
                tag: b_tag,
            },
        ) => namespace == b_namespace && tag == b_tag,
        (VNodeKind::Text(_), VNodeKind::Text(_)) => true,
        (VNodeKind::Component(a), VNodeKind::Component(b)) => {
            Rc::ptr_eq(&a.descriptor, &b.descriptor)
        }
        _ => false,
    }
}

fn element_tag<D: Document>(kind: &VNodeKind<D>) -> &str {
    match kind {
        VNodeKind::Element(tag) | VNodeKind::NamespacedElement { tag, .. } => tag,
        VNodeKind::Text(_) => "#text",
        VNodeKind::Component(component) => component.descriptor.root.tag(),
    }
}

/// Checks that every child has a key and that no key appears twice.
fn check_keys<D: Document>(parent: &str, children: &[VNode<D>]) -> Result<(), Misuse> {
    let mut seen = HashSet::with_capacity(children.len());
    for (index, child) in children.iter().enumerate() {
        match &child.key {
            None => {
                return Err(Misuse::UnkeyedChild {
                    parent: parent.into(),
                    index,
                })
            }
            Some(key) => {
                if !seen.insert(key) {
                    return Err(Misuse::DuplicateKey {
                        parent: parent.into(),
                        key: key.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Returns the first differing key pair if the two maps don't have the same keys in the same
/// order.
fn shape_mismatch<T>(
    old: &[(Name, T)],
    new: &[(Name, T)],
) -> Option<(Option<String>, Option<String>)> {
    for i in 0..old.len().max(new.len()) {
        let old_key = old.get(i).map(|(k, _)| k);
        let new_key = new.get(i).map(|(k, _)| k);
        if old_key != new_key {
            return Some((
                old_key.map(|k| k.to_string()),
                new_key.map(|k| k.to_string()),
            ));
        }
    }
    None
}

/// Symmetric difference of two maps: removals first, then additions and changed values.
fn diff_maps<'a, T: PartialEq>(
    old: BTreeMap<&'a str, &'a T>,
    new: BTreeMap<&'a str, &'a T>,
    changes: &mut Vec<Change<'a, T>>,
) {
    for name in old.keys() {
        if !new.contains_key(name) {
            changes.push(Change::Remove(name));
        }
    }
    for (name, value) in &new {
        if old.get(name) != Some(value) {
            changes.push(Change::Set(name, value));
        }
    }
}

fn static_entries<T>(map: &[(Name, T)]) -> BTreeMap<&str, &T> {
    map.iter().map(|(k, v)| (&**k, v)).collect()
}

fn dynamic_entries<T>(map: Option<&BTreeMap<Name, T>>) -> BTreeMap<&str, &T> {
    map.into_iter()
        .flat_map(|map| map.iter())
        .map(|(k, v)| (&**k, v))
        .collect()
}

impl<D: Document> Runtime<D> {
    /// Reconciles `container`’s content against `new`.
    ///
    /// With no old tree, `new` is mounted and appended to `container`. Otherwise `old` must be
    /// the tree previously patched into `container`; it is diffed against `new` in place.
    /// Either way, `new` is the tree to pass as `old` next time.
    ///
    /// Components mounted here have no parent and count as attached.
    pub fn patch(
        &mut self,
        old: Option<VNode<D>>,
        new: &mut VNode<D>,
        container: &D::Node,
    ) -> DiffResult<D> {
        match old {
            Some(old) => self.sync(old, new, container, None),
            None => self.insert(new, container, None, None),
        }
    }

    /// Removes a tree previously patched into `container`, disposing every component in it.
    pub fn unmount(&mut self, old: VNode<D>, container: &D::Node) -> DiffResult<D> {
        self.remove(old, container)
    }

    /// Reconciles a component root against a freshly rendered tree and commits it.
    pub(crate) fn sync_component(
        &mut self,
        id: ComponentId,
        data: &mut ComponentData<D>,
        mut root: VNode<D>,
    ) -> DiffResult<D> {
        let descriptor = Rc::clone(&self.slot(id).descriptor);
        if descriptor.is_canvas() {
            return Err(Misuse::SyncOnCanvas {
                descriptor: descriptor.name.clone(),
            }
            .into());
        }

        let matches = match &root.kind {
            VNodeKind::Element(tag) => {
                descriptor.root.namespace().is_none() && tag == descriptor.root.tag()
            }
            VNodeKind::NamespacedElement { namespace, tag } => {
                descriptor.root.namespace() == Some(&**namespace) && tag == descriptor.root.tag()
            }
            VNodeKind::Text(_) | VNodeKind::Component(_) => false,
        };
        if !matches {
            return Err(Misuse::RootTagMismatch {
                descriptor: descriptor.name.clone(),
                expected: descriptor.root.tag().into(),
                found: element_tag(&root.kind).into(),
            }
            .into());
        }

        let node = self.root_node(id).clone();
        let old = match data.tree.take() {
            Some(old) => old,
            None => {
                // first render: adopt the bare root element
                trace!(component = %id, "adopting root element");
                let mut bare = match descriptor.root.namespace() {
                    Some(namespace) => {
                        VNode::element_ns(namespace.to_string(), descriptor.root.tag().to_string())
                    }
                    None => VNode::element(descriptor.root.tag().to_string()),
                };
                bare.node = Some(node.clone());
                bare
            }
        };

        let mut previous = Vec::new();
        embedded_components(&old, &mut previous);

        let result = self.sync_element(old, &mut root, node.clone(), Some(id));
        if result.is_err() {
            self.discard_content(&node, &mut root, previous);
        }
        data.tree = Some(root);
        result
    }

    /// Throws away a component’s content after a failed sync, so the next render starts from
    /// an empty root instead of a tree that no longer matches the document.
    fn discard_content(
        &mut self,
        node: &D::Node,
        root: &mut VNode<D>,
        mut components: Vec<ComponentId>,
    ) {
        embedded_components(root, &mut components);
        for id in components {
            if self.contains(id) {
                self.dispose(id);
            }
        }
        root.children = Children::None;
        if let Err(err) = self.document.set_text_content(node, "") {
            warn!(error = ?err, "could not clear content after a failed sync");
        }
    }

    /// Diffs two vnodes at the same position under `parent`.
    fn sync(
        &mut self,
        old: VNode<D>,
        new: &mut VNode<D>,
        parent: &D::Node,
        owner: Option<ComponentId>,
    ) -> DiffResult<D> {
        if !same_kind(&old.kind, &new.kind) {
            return self.replace(old, new, parent, owner);
        }
        let node = old.rendered().clone();

        if let VNodeKind::Element(_) | VNodeKind::NamespacedElement { .. } = new.kind {
            return self.sync_element(old, new, node, owner);
        }

        match &mut new.kind {
            VNodeKind::Text(content) => {
                if let VNodeKind::Text(old_content) = &old.kind {
                    if *old_content != *content {
                        self.document
                            .set_text_content(&node, content)
                            .map_err(Error::Document)?;
                    }
                }
                new.node = Some(node);
            }
            VNodeKind::Component(component) => {
                let id = match old.component_id() {
                    Some(id) => id,
                    None => panic!("{} has not been mounted", old.describe()),
                };
                component.component = Some(id);
                new.node = Some(node);
                self.receive_props(id, Rc::clone(&component.props));
                self.receive_children(id, component.children.clone());
                self.update(id)?;
            }
            VNodeKind::Element(_) | VNodeKind::NamespacedElement { .. } => unreachable!(),
        }
        Ok(())
    }

    /// Mounts `new` in place of `old`.
    fn replace(
        &mut self,
        old: VNode<D>,
        new: &mut VNode<D>,
        parent: &D::Node,
        owner: Option<ComponentId>,
    ) -> DiffResult<D> {
        trace!(old = %old.describe(), new = %new.describe(), "replacing node");
        let reference = old.rendered().clone();
        self.insert(new, parent, Some(&reference), owner)?;
        self.remove(old, parent)
    }

    fn sync_element(
        &mut self,
        old: VNode<D>,
        new: &mut VNode<D>,
        node: D::Node,
        owner: Option<ComponentId>,
    ) -> DiffResult<D> {
        let tag = element_tag(&new.kind);
        self.sync_properties(&node, tag, &old, new)?;
        new.node = Some(node.clone());
        self.sync_children(&node, tag, old.children, &mut new.children, owner)
    }

    /// Diffs attributes, properties, style and class.
    fn sync_properties(
        &mut self,
        node: &D::Node,
        tag: &str,
        old: &VNode<D>,
        new: &VNode<D>,
    ) -> DiffResult<D> {
        let mut attrs = Vec::new();
        self.diff_static(tag, "attrs", old.attrs.as_deref(), new.attrs.as_deref(), &mut attrs)?;
        diff_maps(
            dynamic_entries(old.dynamic_attrs.as_ref()),
            dynamic_entries(new.dynamic_attrs.as_ref()),
            &mut attrs,
        );
        for change in attrs {
            let result = match change {
                Change::Set(name, value) => self.document.set_attribute(node, name, value),
                Change::Remove(name) => self.document.remove_attribute(node, name),
            };
            result.map_err(Error::Document)?;
        }

        let mut props = Vec::new();
        self.diff_static(tag, "props", old.props.as_deref(), new.props.as_deref(), &mut props)?;
        diff_maps(
            dynamic_entries(old.dynamic_props.as_ref()),
            dynamic_entries(new.dynamic_props.as_ref()),
            &mut props,
        );
        for change in props {
            let result = match change {
                Change::Set(name, value) => self.document.set_property(node, name, value),
                Change::Remove(name) => self.document.remove_property(node, name),
            };
            result.map_err(Error::Document)?;
        }

        if old.style != new.style {
            self.document
                .set_style(node, new.style.as_deref())
                .map_err(Error::Document)?;
        }
        if old.class_name != new.class_name {
            self.document
                .set_class(node, new.class_name.as_deref())
                .map_err(Error::Document)?;
        }
        Ok(())
    }

    /// Diffs a static-shape map value by value.
    ///
    /// Going from no map to a map (or back) is a plain key set change. A map whose keys changed
    /// is an error if shapes are checked, and diffed like a dynamic map otherwise.
    fn diff_static<'a, T: PartialEq>(
        &self,
        tag: &str,
        map: &'static str,
        old: Option<&'a [(Name, T)]>,
        new: Option<&'a [(Name, T)]>,
        changes: &mut Vec<Change<'a, T>>,
    ) -> Result<(), Misuse> {
        let (old, new) = match (old, new) {
            (Some(old), Some(new)) => (old, new),
            (old, new) => {
                let (old, new) = (old.unwrap_or(&[]), new.unwrap_or(&[]));
                diff_maps(static_entries(old), static_entries(new), changes);
                return Ok(());
            }
        };

        match shape_mismatch(old, new) {
            None => {
                for ((_, old_value), (name, value)) in old.iter().zip(new) {
                    if old_value != value {
                        changes.push(Change::Set(name, value));
                    }
                }
            }
            Some((expected, found)) => {
                if self.config.check_static_shapes {
                    return Err(Misuse::StaticShapeChanged {
                        tag: tag.into(),
                        map,
                        expected,
                        found,
                    });
                }
                trace!(tag, map, "static map changed shape");
                diff_maps(static_entries(old), static_entries(new), changes);
            }
        }
        Ok(())
    }

    fn sync_children(
        &mut self,
        node: &D::Node,
        tag: &str,
        old: Children<D>,
        new: &mut Children<D>,
        owner: Option<ComponentId>,
    ) -> DiffResult<D> {
        match (old, new) {
            (Children::None, Children::None) => Ok(()),
            (Children::Text(old), Children::Text(new)) => {
                if old != *new {
                    self.document
                        .set_text_content(node, new)
                        .map_err(Error::Document)?;
                }
                Ok(())
            }
            (Children::Nodes(old), Children::Nodes(new)) => {
                self.sync_unkeyed(node, old, new, owner)
            }
            (Children::Keyed(old), Children::Keyed(new)) => {
                self.sync_keyed(node, tag, old, new, owner)
            }
            (old, new) => {
                trace!(tag, "children changed form");
                match old {
                    Children::None => (),
                    Children::Text(_) => {
                        if let Children::None | Children::Nodes(_) | Children::Keyed(_) = new {
                            self.document
                                .set_text_content(node, "")
                                .map_err(Error::Document)?;
                        }
                    }
                    Children::Nodes(old) | Children::Keyed(old) => {
                        if let Children::Text(_) = new {
                            // the text replaces them anyway
                            for child in &old {
                                self.dispose_vnode(child);
                            }
                        } else {
                            for child in old {
                                self.remove(child, node)?;
                            }
                        }
                    }
                }

                match new {
                    Children::None => (),
                    Children::Text(text) => {
                        self.document
                            .set_text_content(node, text)
                            .map_err(Error::Document)?;
                    }
                    Children::Keyed(new) => {
                        check_keys(tag, new)?;
                        for child in new {
                            self.insert(child, node, None, owner)?;
                        }
                    }
                    Children::Nodes(new) => {
                        for child in new {
                            self.insert(child, node, None, owner)?;
                        }
                    }
                }
                Ok(())
            }
        }
    }

    /// Diffs children pairwise by position.
    fn sync_unkeyed(
        &mut self,
        node: &D::Node,
        old: Vec<VNode<D>>,
        new: &mut [VNode<D>],
        owner: Option<ComponentId>,
    ) -> DiffResult<D> {
        let mut old = old.into_iter();
        for child in new {
            match old.next() {
                Some(old_child) => self.sync(old_child, child, node, owner)?,
                None => self.insert(child, node, None, owner)?,
            }
        }
        for old_child in old {
            self.remove(old_child, node)?;
        }
        Ok(())
    }

    /// Diffs children by key.
    ///
    /// A forward scan reuses children by key and marks the ones that are out of order relative
    /// to the longest run of increasing old positions seen so far. Only those are moved, in a
    /// second pass from the end so each one has an already placed next sibling to go before.
    fn sync_keyed(
        &mut self,
        node: &D::Node,
        tag: &str,
        old: Vec<VNode<D>>,
        new: &mut [VNode<D>],
        owner: Option<ComponentId>,
    ) -> DiffResult<D> {
        check_keys(tag, new)?;

        let old_index: HashMap<Key, usize> = old
            .iter()
            .enumerate()
            .filter_map(|(i, child)| child.key.clone().map(|key| (key, i)))
            .collect();
        let mut old: Vec<Option<VNode<D>>> = old.into_iter().map(Some).collect();

        let mut placements = Vec::with_capacity(new.len());
        let mut max_index = 0;
        for child in new.iter_mut() {
            let reused = child
                .key
                .as_ref()
                .and_then(|key| old_index.get(key).copied())
                .and_then(|i| old[i].take().map(|old_child| (i, old_child)));

            let placement = match reused {
                Some((i, old_child)) if same_kind(&old_child.kind, &child.kind) => {
                    self.sync(old_child, child, node, owner)?;
                    if i < max_index {
                        Placement::Move
                    } else {
                        max_index = i;
                        Placement::InPlace
                    }
                }
                Some((_, old_child)) => {
                    trace!(key = ?child.key, "keyed child changed kind");
                    self.remove(old_child, node)?;
                    self.mount(child, owner)?;
                    Placement::Insert
                }
                None => {
                    self.mount(child, owner)?;
                    Placement::Insert
                }
            };
            placements.push(placement);
        }

        for old_child in old.into_iter().flatten() {
            self.remove(old_child, node)?;
        }

        let mut next: Option<D::Node> = None;
        for (child, placement) in new.iter_mut().zip(placements).rev() {
            if placement != Placement::InPlace {
                if placement == Placement::Move {
                    trace!(key = ?child.key, "moving keyed child");
                }
                let result = match &next {
                    Some(reference) => {
                        self.document.insert_before(node, child.rendered(), reference)
                    }
                    None => self.document.append_child(node, child.rendered()),
                };
                result.map_err(Error::Document)?;
            }
            if placement == Placement::Insert {
                self.activate(child, owner)?;
            }
            next = Some(child.rendered().clone());
        }
        Ok(())
    }

    /// Mounts `vnode`, inserts it before `reference` (or appends it), and activates it.
    fn insert(
        &mut self,
        vnode: &mut VNode<D>,
        parent: &D::Node,
        reference: Option<&D::Node>,
        owner: Option<ComponentId>,
    ) -> DiffResult<D> {
        self.mount(vnode, owner)?;
        let result = match reference {
            Some(reference) => self.document.insert_before(parent, vnode.rendered(), reference),
            None => self.document.append_child(parent, vnode.rendered()),
        };
        result.map_err(Error::Document)?;
        self.activate(vnode, owner)
    }

    /// Creates the real nodes for a detached subtree. Components are created but not attached.
    fn mount(&mut self, vnode: &mut VNode<D>, owner: Option<ComponentId>) -> DiffResult<D> {
        let node = match &mut vnode.kind {
            VNodeKind::Text(content) => {
                let node = self.document.create_text(content).map_err(Error::Document)?;
                vnode.node = Some(node);
                return Ok(());
            }
            VNodeKind::Component(component) => {
                let id = self.instantiate(
                    &component.descriptor,
                    owner,
                    Rc::clone(&component.props),
                    component.children.clone(),
                )?;
                component.component = Some(id);
                vnode.node = Some(self.root_node(id).clone());
                return Ok(());
            }
            VNodeKind::Element(tag) => self.document.create_element(tag),
            VNodeKind::NamespacedElement { namespace, tag } => {
                self.document.create_element_ns(namespace, tag)
            }
        }
        .map_err(Error::Document)?;
        vnode.node = Some(node.clone());

        self.mount_properties(&node, vnode)?;

        let tag = element_tag(&vnode.kind);
        match &mut vnode.children {
            Children::None => (),
            Children::Text(text) => {
                if !text.is_empty() {
                    self.document
                        .set_text_content(&node, text)
                        .map_err(Error::Document)?;
                }
            }
            Children::Keyed(children) => {
                check_keys(tag, children)?;
                self.mount_children(&node, children, owner)?;
            }
            Children::Nodes(children) => self.mount_children(&node, children, owner)?,
        }
        Ok(())
    }

    fn mount_children(
        &mut self,
        node: &D::Node,
        children: &mut [VNode<D>],
        owner: Option<ComponentId>,
    ) -> DiffResult<D> {
        for child in children {
            self.mount(child, owner)?;
            self.document
                .append_child(node, child.rendered())
                .map_err(Error::Document)?;
        }
        Ok(())
    }

    fn mount_properties(&mut self, node: &D::Node, vnode: &VNode<D>) -> DiffResult<D> {
        let doc = &mut self.document;
        for (name, value) in vnode.attrs.iter().flatten() {
            doc.set_attribute(node, name, value).map_err(Error::Document)?;
        }
        for (name, value) in vnode.dynamic_attrs.iter().flatten() {
            doc.set_attribute(node, name, value).map_err(Error::Document)?;
        }
        for (name, value) in vnode.props.iter().flatten() {
            doc.set_property(node, name, value).map_err(Error::Document)?;
        }
        for (name, value) in vnode.dynamic_props.iter().flatten() {
            doc.set_property(node, name, value).map_err(Error::Document)?;
        }
        if let Some(style) = &vnode.style {
            doc.set_style(node, Some(style)).map_err(Error::Document)?;
        }
        if let Some(class) = &vnode.class_name {
            doc.set_class(node, Some(class)).map_err(Error::Document)?;
        }
        Ok(())
    }

    /// Attaches and renders the components in a freshly inserted subtree.
    ///
    /// Components stay unattached if their owner isn’t attached; they will be attached along
    /// with it.
    fn activate(&mut self, vnode: &VNode<D>, owner: Option<ComponentId>) -> DiffResult<D> {
        if let VNodeKind::Component(component) = &vnode.kind {
            if let Some(id) = component.component {
                if owner.map_or(true, |owner| self.is_attached(owner)) {
                    self.attach_and_update(id)?;
                }
            }
            return Ok(());
        }
        for child in vnode.children.nodes() {
            self.activate(child, owner)?;
        }
        Ok(())
    }

    /// Disposes the components in `old` and removes its node from `parent`.
    fn remove(&mut self, old: VNode<D>, parent: &D::Node) -> DiffResult<D> {
        trace!(node = %old.describe(), "removing node");
        self.dispose_vnode(&old);
        self.document
            .remove_child(parent, old.rendered())
            .map_err(Error::Document)
    }

    /// Disposes every component in a subtree without touching the document.
    fn dispose_vnode(&mut self, vnode: &VNode<D>) {
        if let VNodeKind::Component(component) = &vnode.kind {
            if let Some(id) = component.component {
                if self.contains(id) {
                    self.dispose(id);
                }
            }
            return;
        }
        for child in vnode.children.nodes() {
            self.dispose_vnode(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Value;
    use crate::memory::{MemoryDocument, Mutation, NodeId};

    type V = VNode<MemoryDocument>;

    fn setup() -> (Runtime<MemoryDocument>, NodeId) {
        let mut doc = MemoryDocument::new();
        let container = doc.create_container("body");
        (
            Runtime::builder(doc).check_static_shapes(true).build(),
            container,
        )
    }

    fn render(rt: &mut Runtime<MemoryDocument>, container: NodeId, old: Option<V>, mut new: V) -> V {
        rt.patch(old, &mut new, &container).unwrap();
        new
    }

    #[test]
    fn mounts_full_tree() {
        let (mut rt, body) = setup();
        let tree = render(
            &mut rt,
            body,
            None,
            V::element("div")
                .class_name("card")
                .attr("id", "a")
                .prop("value", "x")
                .children(vec![V::element("b").text_children("bold"), V::text("plain")]),
        );

        let div = *tree.rendered_node().unwrap();
        assert_eq!(rt.document().children(body), &[div]);
        assert_eq!(
            rt.document().markup(div),
            r#"<div class="card" id="a"><b>bold</b>plain</div>"#
        );
        assert_eq!(
            rt.document().property(div, "value"),
            Some(&Value::String("x".into()))
        );
    }

    #[test]
    fn static_attrs_diff_by_value() {
        let (mut rt, body) = setup();
        let old = render(
            &mut rt,
            body,
            None,
            V::element("div").attr("a", "1").attr("b", "2"),
        );
        rt.document_mut().take_mutations();

        let new = render(
            &mut rt,
            body,
            Some(old),
            V::element("div").attr("a", "1").attr("b", "3"),
        );
        let div = *new.rendered_node().unwrap();
        assert_eq!(
            rt.document_mut().take_mutations(),
            vec![Mutation::SetAttribute {
                node: div,
                name: "b".into(),
                value: "3".into()
            }]
        );
    }

    #[test]
    fn dynamic_attrs_symmetric_difference() {
        let (mut rt, body) = setup();
        let old = render(
            &mut rt,
            body,
            None,
            V::element("div").dynamic_attrs(vec![("a", "1"), ("b", "2")]),
        );
        rt.document_mut().take_mutations();

        let new = render(
            &mut rt,
            body,
            Some(old),
            V::element("div").dynamic_attrs(vec![("b", "2"), ("c", "3")]),
        );
        let div = *new.rendered_node().unwrap();
        assert_eq!(
            rt.document_mut().take_mutations(),
            vec![
                Mutation::RemoveAttribute {
                    node: div,
                    name: "a".into()
                },
                Mutation::SetAttribute {
                    node: div,
                    name: "c".into(),
                    value: "3".into()
                },
            ]
        );
    }

    #[test]
    fn static_shape_change_is_checked() {
        let (mut rt, body) = setup();
        let old = render(&mut rt, body, None, V::element("div").attr("a", "1"));
        let mut new = V::element("div").attr("b", "1");
        let err = rt.patch(Some(old), &mut new, &body).unwrap_err();
        assert_eq!(
            err.misuse(),
            Some(&Misuse::StaticShapeChanged {
                tag: "div".into(),
                map: "attrs",
                expected: Some("a".into()),
                found: Some("b".into()),
            })
        );
    }

    #[test]
    fn static_shape_change_falls_back_when_unchecked() {
        let mut doc = MemoryDocument::new();
        let body = doc.create_container("body");
        let mut rt = Runtime::builder(doc).check_static_shapes(false).build();

        let old = render(&mut rt, body, None, V::element("div").prop("a", 1));
        let new = render(&mut rt, body, Some(old), V::element("div").prop("b", 2));
        let div = *new.rendered_node().unwrap();
        assert_eq!(rt.document().property(div, "a"), None);
        assert_eq!(rt.document().property(div, "b"), Some(&Value::Number(2.)));
    }

    #[test]
    fn style_and_class_set_and_cleared() {
        let (mut rt, body) = setup();
        let old = render(&mut rt, body, None, V::element("p").style("color: red"));
        let new = render(&mut rt, body, Some(old), V::element("p").class_name("x"));
        let p = *new.rendered_node().unwrap();
        assert_eq!(rt.document().style(p), None);
        assert_eq!(rt.document().class(p), Some("x"));
    }

    #[test]
    fn tag_change_replaces_node() {
        let (mut rt, body) = setup();
        let old = render(&mut rt, body, None, V::element("div"));
        let old_node = *old.rendered_node().unwrap();
        let new = render(&mut rt, body, Some(old), V::element("span"));
        let new_node = *new.rendered_node().unwrap();
        assert_ne!(old_node, new_node);
        assert!(!rt.document().contains(old_node));
        assert_eq!(rt.document().children(body), &[new_node]);
    }

    #[test]
    fn unkeyed_appends_and_truncates() {
        let (mut rt, body) = setup();
        let list = |items: &[&str]| {
            V::element("ul").children(
                items
                    .iter()
                    .map(|i| V::element("li").text_children(*i))
                    .collect(),
            )
        };
        let old = render(&mut rt, body, None, list(&["a", "b"]));
        let ul = *old.rendered_node().unwrap();
        let first = *old.get_children().nodes()[0].rendered_node().unwrap();

        let mid = render(&mut rt, body, Some(old), list(&["a", "b", "c", "d"]));
        assert_eq!(rt.document().text(ul), "abcd");
        assert_eq!(
            *mid.get_children().nodes()[0].rendered_node().unwrap(),
            first
        );

        let _ = render(&mut rt, body, Some(mid), list(&["x"]));
        assert_eq!(rt.document().text(ul), "x");
        assert_eq!(rt.document().children(ul), &[first]);
    }

    #[test]
    fn keyed_reorder_inserts_and_removes() {
        let (mut rt, body) = setup();
        let list = |keys: &[u64]| {
            V::element("ul").track_by_key_children(
                keys.iter()
                    .map(|k| V::element("li").key(*k).text_children(k.to_string()))
                    .collect(),
            )
        };
        let old = render(&mut rt, body, None, list(&[1, 2, 3, 4, 5]));
        let ul = *old.rendered_node().unwrap();
        let five = *old.get_children().nodes()[4].rendered_node().unwrap();

        let new = render(&mut rt, body, Some(old), list(&[5, 1, 6, 3, 2]));
        assert_eq!(rt.document().text(ul), "51632");
        assert_eq!(
            *new.get_children().nodes()[0].rendered_node().unwrap(),
            five
        );
        assert_eq!(rt.document().children(ul).len(), 5);

        let _ = render(&mut rt, body, Some(new), list(&[]));
        assert!(rt.document().children(ul).is_empty());
    }

    #[test]
    fn keyed_child_changing_kind_is_remounted() {
        let (mut rt, body) = setup();
        let old = render(
            &mut rt,
            body,
            None,
            V::element("div").track_by_key_children(vec![
                V::element("a").key("x"),
                V::element("b").key("y"),
            ]),
        );
        let div = *old.rendered_node().unwrap();
        let _ = render(
            &mut rt,
            body,
            Some(old),
            V::element("div").track_by_key_children(vec![
                V::element("b").key("y"),
                V::element("i").key("x"),
            ]),
        );
        assert_eq!(rt.document().markup(div), "<div><b></b><i></i></div>");
    }

    #[test]
    fn unkeyed_child_in_keyed_list_errors() {
        let (mut rt, body) = setup();
        let mut tree = V::element("ul").track_by_key_children(vec![
            V::element("li").key(1u64),
            V::element("li"),
        ]);
        let err = rt.patch(None, &mut tree, &body).unwrap_err();
        assert_eq!(
            err.misuse(),
            Some(&Misuse::UnkeyedChild {
                parent: "ul".into(),
                index: 1
            })
        );
    }

    #[test]
    fn children_form_transitions() {
        let (mut rt, body) = setup();
        let old = render(&mut rt, body, None, V::element("p").text_children("hi"));
        let p = *old.rendered_node().unwrap();

        let list = render(
            &mut rt,
            body,
            Some(old),
            V::element("p").children(vec![V::text("a"), V::text("b")]),
        );
        assert_eq!(rt.document().children(p).len(), 2);
        assert_eq!(rt.document().text(p), "ab");

        let keyed = render(
            &mut rt,
            body,
            Some(list),
            V::element("p").track_by_key_children(vec![V::text("c").key(1u64)]),
        );
        assert_eq!(rt.document().text(p), "c");

        let text = render(&mut rt, body, Some(keyed), V::element("p").text_children("t"));
        assert_eq!(rt.document().text(p), "t");

        let _ = render(&mut rt, body, Some(text), V::element("p"));
        assert!(rt.document().children(p).is_empty());
    }

    #[test]
    fn unmount_removes_from_container() {
        let (mut rt, body) = setup();
        let tree = render(&mut rt, body, None, V::element("div").children(vec![V::text("x")]));
        rt.unmount(tree, &body).unwrap();
        assert!(rt.document().children(body).is_empty());
        assert_eq!(rt.document().node_count(), 1);
    }
}
