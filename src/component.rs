//! Components and their lifecycle.

use crate::descriptor::{ChildList, DescriptorInner};
use crate::document::Document;
use crate::error::Error;
use crate::runtime::Runtime;
use crate::vnode::{VNode, VNodeKind};
use core::fmt;
use std::any::{type_name, Any, TypeId};
use std::rc::Rc;
use tracing::{debug, trace};
use uuid::Uuid;

/// A unique identifier for a component.
///
/// (this is just a UUID)
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(u32, u16, u16, [u8; 8]);

impl ComponentId {
    pub(crate) fn new() -> ComponentId {
        let uuid = Uuid::new_v4();
        let (a, b, c, d) = uuid.as_fields();
        ComponentId(a, b, c, *d)
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ComponentId({})", self)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:08x}-{:04x}", self.0, self.1)
    }
}

/// Component lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Created and initialized, never attached.
    Constructed,
    Attached,
    Detached,
    /// Terminal.
    Disposed,
}

/// Component data that hooks get to touch.
///
/// Taken out of its slot while a hook runs, so the hook can borrow the runtime mutably too.
pub(crate) struct ComponentData<D: Document> {
    pub(crate) props: Rc<dyn Any>,
    pub(crate) state: Box<dyn Any>,
    pub(crate) children: ChildList<D>,
    /// The last committed vnode tree.
    pub(crate) tree: Option<VNode<D>>,
}

/// A component in the runtime’s component table.
pub(crate) struct Slot<D: Document> {
    pub(crate) descriptor: Rc<DescriptorInner<D>>,
    /// Only used to derive the depth.
    pub(crate) parent: Option<ComponentId>,
    pub(crate) depth: usize,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) dirty: bool,
    pub(crate) root: D::Node,
    /// `None` while one of this component’s hooks is running.
    pub(crate) data: Option<ComponentData<D>>,
}

impl<D: Document> fmt::Debug for Slot<D> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Component")
            .field("descriptor", &self.descriptor.name)
            .field("parent", &self.parent)
            .field("depth", &self.depth)
            .field("lifecycle", &self.lifecycle)
            .field("dirty", &self.dirty)
            .field("root", &self.root)
            .field("busy", &self.data.is_none())
            .finish()
    }
}

/// Collects the components embedded directly in a vnode tree (not inside other components).
pub(crate) fn embedded_components<D: Document>(vnode: &VNode<D>, out: &mut Vec<ComponentId>) {
    if let VNodeKind::Component(component) = &vnode.kind {
        if let Some(id) = component.component {
            out.push(id);
        }
        return;
    }
    for child in vnode.children.nodes() {
        embedded_components(child, out);
    }
}

fn same_rc<T: ?Sized>(a: &Rc<T>, b: &Rc<T>) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

fn same_children<D: Document>(a: &ChildList<D>, b: &ChildList<D>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => same_rc(a, b),
        (None, None) => true,
        _ => false,
    }
}

impl<D: Document> Runtime<D> {
    pub(crate) fn slot(&self, id: ComponentId) -> &Slot<D> {
        match self.slots.get(&id) {
            Some(slot) => slot,
            None => panic!("no such component {} (it may have been disposed)", id),
        }
    }

    pub(crate) fn slot_mut(&mut self, id: ComponentId) -> &mut Slot<D> {
        match self.slots.get_mut(&id) {
            Some(slot) => slot,
            None => panic!("no such component {} (it may have been disposed)", id),
        }
    }

    /// Runs `f` with the component’s data taken out of its slot.
    ///
    /// # Panics
    /// - if a hook of the same component is already running
    pub(crate) fn with_data<R>(
        &mut self,
        id: ComponentId,
        f: impl FnOnce(&mut Self, &mut ComponentData<D>) -> R,
    ) -> R {
        let slot = self.slot_mut(id);
        let mut data = match slot.data.take() {
            Some(data) => data,
            None => panic!(
                "component {} ({}) is busy: one of its hooks is already running",
                id, slot.descriptor.name
            ),
        };
        let result = f(self, &mut data);
        if let Some(slot) = self.slots.get_mut(&id) {
            slot.data = Some(data);
        }
        result
    }

    /// Creates a component, its root element, and runs `init`.
    pub(crate) fn instantiate(
        &mut self,
        descriptor: &Rc<DescriptorInner<D>>,
        parent: Option<ComponentId>,
        props: Rc<dyn Any>,
        children: ChildList<D>,
    ) -> Result<ComponentId, Error<D::Error>> {
        let depth = parent.map_or(0, |parent| self.slot(parent).depth + 1);

        let root = match descriptor.root.namespace() {
            Some(namespace) => self
                .document
                .create_element_ns(namespace, descriptor.root.tag()),
            None => self.document.create_element(descriptor.root.tag()),
        }
        .map_err(Error::Document)?;

        let id = ComponentId::new();
        debug!(component = %id, descriptor = %descriptor.name, depth, "creating component");

        self.slots.insert(
            id,
            Slot {
                descriptor: Rc::clone(descriptor),
                parent,
                depth,
                lifecycle: Lifecycle::Constructed,
                dirty: true,
                root,
                data: Some(ComponentData {
                    props,
                    state: (descriptor.new_state)(),
                    children,
                    tree: None,
                }),
            },
        );

        if let Some(init) = &descriptor.init {
            self.with_data(id, |rt, data| init(rt, id, data));
        }
        Ok(id)
    }

    /// If true, the component exists and has not been disposed.
    pub fn contains(&self, id: ComponentId) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn lifecycle(&self, id: ComponentId) -> Lifecycle {
        self.slots
            .get(&id)
            .map_or(Lifecycle::Disposed, |slot| slot.lifecycle)
    }

    pub fn depth(&self, id: ComponentId) -> usize {
        self.slot(id).depth
    }

    pub fn parent(&self, id: ComponentId) -> Option<ComponentId> {
        self.slot(id).parent
    }

    pub fn is_dirty(&self, id: ComponentId) -> bool {
        self.slot(id).dirty
    }

    pub fn is_attached(&self, id: ComponentId) -> bool {
        self.slot(id).lifecycle == Lifecycle::Attached
    }

    /// The component’s root element.
    pub fn root_node(&self, id: ComponentId) -> &D::Node {
        &self.slot(id).root
    }

    /// The descriptor name, for debugging.
    pub fn descriptor_name(&self, id: ComponentId) -> &str {
        &self.slot(id).descriptor.name
    }

    /// The last committed vnode tree, unless a hook of the component is running.
    pub fn tree(&self, id: ComponentId) -> Option<&VNode<D>> {
        self.slot(id).data.as_ref().and_then(|data| data.tree.as_ref())
    }

    /// Marks the component dirty without scheduling an update.
    pub fn mark_dirty(&mut self, id: ComponentId) {
        self.slot_mut(id).dirty = true;
    }

    /// Marks the component dirty and schedules an update.
    ///
    /// Invalidating a queued component does not queue it twice, but the descriptor’s
    /// `invalidated` hook runs every time.
    pub fn invalidate(&mut self, id: ComponentId) {
        let slot = self.slot_mut(id);
        slot.dirty = true;
        let hook = slot.descriptor.invalidated.clone();
        self.schedule(id);

        if let Some(hook) = hook {
            hook(self, id);
        }
    }

    /// Queues the component for the next flush.
    fn schedule(&mut self, id: ComponentId) {
        let depth = self.slot(id).depth;
        if self.scheduler.enqueue(id, depth) {
            trace!(component = %id, depth, "queued component");
        }
        self.request_frame();
    }

    /// Passes new props to the component.
    ///
    /// Without a `props_received` hook, the component becomes dirty if `props` is not the `Rc`
    /// it already has (or always, if identity checks are disabled).
    ///
    /// # Panics
    /// - if `P` is not the descriptor’s props type
    pub fn set_props<P: 'static>(&mut self, id: ComponentId, props: Rc<P>) {
        let slot = self.slot(id);
        if slot.descriptor.props_type != TypeId::of::<P>() {
            panic!(
                "Runtime::set_props: invalid props for {}; expected type {}, got {}",
                slot.descriptor.name,
                slot.descriptor.props_type_name,
                type_name::<P>()
            );
        }
        self.receive_props(id, props);
    }

    /// Passes new children to the component; same rules as [`set_props`](Self::set_props).
    pub fn set_children(&mut self, id: ComponentId, children: Option<Rc<Vec<VNode<D>>>>) {
        self.receive_children(id, children);
    }

    pub(crate) fn receive_props(&mut self, id: ComponentId, props: Rc<dyn Any>) {
        let descriptor = Rc::clone(&self.slot(id).descriptor);
        if let Some(hook) = &descriptor.props_received {
            self.with_data(id, |rt, data| hook(rt, id, data, props));
            return;
        }

        let changed = self.with_data(id, |_, data| {
            if descriptor.identity_checks && same_rc(&data.props, &props) {
                false
            } else {
                data.props = props;
                true
            }
        });
        if changed {
            self.slot_mut(id).dirty = true;
        }
    }

    pub(crate) fn receive_children(&mut self, id: ComponentId, children: ChildList<D>) {
        let descriptor = Rc::clone(&self.slot(id).descriptor);
        if let Some(hook) = &descriptor.children_received {
            self.with_data(id, |rt, data| hook(rt, id, data, children));
            return;
        }

        let changed = self.with_data(id, |_, data| {
            if descriptor.identity_checks && same_children(&data.children, &children) {
                false
            } else {
                data.children = children;
                true
            }
        });
        if changed {
            self.slot_mut(id).dirty = true;
        }
    }

    /// Updates the component if it is dirty and attached.
    ///
    /// Runs the `update` hook, or the render function followed by a sync of the root element,
    /// and clears the dirty flag. If the hook fails, the component stays dirty.
    pub fn update(&mut self, id: ComponentId) -> Result<(), Error<D::Error>> {
        let slot = self.slot(id);
        if !slot.dirty || slot.lifecycle != Lifecycle::Attached {
            return Ok(());
        }
        if slot.data.is_none() {
            trace!(component = %id, "skipping update of a component that is mid-hook");
            return Ok(());
        }
        let descriptor = Rc::clone(&slot.descriptor);
        trace!(component = %id, descriptor = %descriptor.name, "updating component");

        // cleared first so the hook can invalidate its own component
        self.slot_mut(id).dirty = false;
        let hook = descriptor.update.as_ref().or_else(|| descriptor.render.as_ref());
        let result = match hook {
            Some(hook) => self.with_data(id, |rt, data| hook(rt, id, data)),
            None => Ok(()),
        };
        if result.is_err() {
            if let Some(slot) = self.slots.get_mut(&id) {
                slot.dirty = true;
            }
        }
        result
    }

    /// Attaches the component, then the components embedded in its tree.
    ///
    /// Attaching does not update; a dirty component is queued for the next flush instead.
    /// Attaching an attached component does nothing.
    pub fn attach(&mut self, id: ComponentId) {
        self.attach_with(id, true);
    }

    /// Attaches a component that is about to be updated synchronously.
    ///
    /// Nothing is queued for it unless that update fails.
    pub(crate) fn attach_and_update(&mut self, id: ComponentId) -> Result<(), Error<D::Error>> {
        self.attach_with(id, false);
        let result = self.update(id);
        if result.is_err() && self.contains(id) && self.is_dirty(id) && self.is_attached(id) {
            self.schedule(id);
        }
        result
    }

    fn attach_with(&mut self, id: ComponentId, schedule_dirty: bool) {
        let slot = self.slot_mut(id);
        match slot.lifecycle {
            Lifecycle::Attached => return,
            Lifecycle::Disposed => panic!("cannot attach disposed component {}", id),
            Lifecycle::Constructed | Lifecycle::Detached => (),
        }
        slot.lifecycle = Lifecycle::Attached;
        let descriptor = Rc::clone(&slot.descriptor);
        debug!(component = %id, descriptor = %descriptor.name, "attached");

        if let Some(hook) = &descriptor.attached {
            self.with_data(id, |rt, data| hook(rt, id, data));
        }
        for child in self.children_of(id) {
            self.attach_with(child, schedule_dirty);
        }

        if !schedule_dirty {
            return;
        }
        // changes that arrived while detached were never rendered
        if let Some(slot) = self.slots.get(&id) {
            if slot.dirty && slot.lifecycle == Lifecycle::Attached {
                self.schedule(id);
            }
        }
    }

    /// Detaches the components embedded in the tree, then the component itself.
    ///
    /// Detaching a component that isn’t attached does nothing.
    pub fn detach(&mut self, id: ComponentId) {
        if self.slot(id).lifecycle != Lifecycle::Attached {
            return;
        }
        for child in self.children_of(id) {
            self.detach(child);
        }

        let slot = self.slot_mut(id);
        slot.lifecycle = Lifecycle::Detached;
        let descriptor = Rc::clone(&slot.descriptor);
        debug!(component = %id, descriptor = %descriptor.name, "detached");

        if let Some(hook) = &descriptor.detached {
            self.with_data(id, |rt, data| hook(rt, id, data));
        }
    }

    /// Disposes the component (detaching it first if needed) and every component embedded in
    /// its tree. Removes it from the update queue; the id is invalid afterwards.
    ///
    /// Does not remove the root element from the document.
    ///
    /// # Panics
    /// - if the component was already disposed
    /// - if called from one of the component’s own hooks
    pub fn dispose(&mut self, id: ComponentId) {
        if self.slot(id).data.is_none() {
            panic!(
                "cannot dispose component {} ({}) from inside its own hook",
                id,
                self.slot(id).descriptor.name
            );
        }
        self.detach(id);

        let slot = self.slot_mut(id);
        slot.lifecycle = Lifecycle::Disposed;
        let depth = slot.depth;
        let descriptor = Rc::clone(&slot.descriptor);
        self.scheduler.remove(id, depth);
        debug!(component = %id, descriptor = %descriptor.name, "disposed");

        if let Some(hook) = &descriptor.disposed {
            self.with_data(id, |rt, data| hook(rt, id, data));
        }

        let children = self.children_of(id);
        self.slots.remove(&id);
        for child in children {
            if self.contains(child) {
                self.dispose(child);
            }
        }
    }

    /// Components embedded in the committed tree.
    fn children_of(&self, id: ComponentId) -> Vec<ComponentId> {
        let mut children = Vec::new();
        if let Some(tree) = self.tree(id) {
            embedded_components(tree, &mut children);
        }
        children
    }
}

#[cfg(test)]
mod tests {
    use crate::descriptor::ComponentDescriptor;
    use crate::memory::MemoryDocument;
    use crate::runtime::Runtime;
    use crate::vnode::VNode;
    use crate::Lifecycle;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Desc<P, S> = ComponentDescriptor<MemoryDocument, P, S>;

    fn logging_descriptor(log: Rc<RefCell<Vec<String>>>) -> Desc<String, ()> {
        let (l1, l2, l3, l4, l5) = (
            log.clone(),
            log.clone(),
            log.clone(),
            log.clone(),
            log.clone(),
        );
        Desc::<String, ()>::builder("div")
            .name("Logger")
            .init(move |cx| l1.borrow_mut().push(format!("init {}", cx.props())))
            .update(move |cx| {
                l2.borrow_mut().push(format!("update {}", cx.props()));
                Ok(())
            })
            .attached(move |_| l3.borrow_mut().push("attached".into()))
            .detached(move |_| l4.borrow_mut().push("detached".into()))
            .disposed(move |_| l5.borrow_mut().push("disposed".into()))
            .build()
    }

    #[test]
    fn lifecycle_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let desc = logging_descriptor(log.clone());
        let mut rt = Runtime::new(MemoryDocument::new());

        let id = desc.create_root_component(&mut rt, "a".to_string()).unwrap();
        assert_eq!(rt.lifecycle(id), Lifecycle::Constructed);
        assert!(rt.is_dirty(id), "new components have never rendered");

        rt.attach(id);
        rt.update(id).unwrap();
        assert!(!rt.is_dirty(id));
        rt.detach(id);
        rt.attach(id);
        rt.dispose(id);

        assert_eq!(
            *log.borrow(),
            vec![
                "init a",
                "attached",
                "update a",
                "detached",
                "attached",
                "detached",
                "disposed"
            ]
        );
        assert_eq!(rt.lifecycle(id), Lifecycle::Disposed);
        assert!(!rt.contains(id));
    }

    #[test]
    fn update_is_gated_on_dirty_and_attached() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let desc = logging_descriptor(log.clone());
        let mut rt = Runtime::new(MemoryDocument::new());
        let id = desc.create_root_component(&mut rt, "a".to_string()).unwrap();

        // dirty but detached
        rt.update(id).unwrap();
        assert!(!log.borrow().iter().any(|l| l.starts_with("update")));
        assert!(rt.is_dirty(id));

        rt.attach(id);
        rt.update(id).unwrap();
        log.borrow_mut().clear();

        // attached but clean
        rt.update(id).unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn identity_checked_props() {
        let desc = Desc::<String, ()>::builder("div").build();
        let mut rt = Runtime::new(MemoryDocument::new());
        let props = Rc::new("a".to_string());
        let id = desc.create_root_component(&mut rt, props.clone()).unwrap();
        rt.attach(id);
        rt.update(id).unwrap();
        assert!(!rt.is_dirty(id));

        rt.set_props(id, props.clone());
        assert!(!rt.is_dirty(id), "same Rc twice does not dirty");
        rt.set_props(id, props.clone());
        assert!(!rt.is_dirty(id));

        rt.set_props(id, Rc::new("a".to_string()));
        assert!(rt.is_dirty(id), "equal value, different Rc");
        rt.update(id).unwrap();
        assert!(!rt.is_dirty(id));
    }

    #[test]
    fn disabled_identity_checks_always_dirty() {
        let desc = Desc::<String, ()>::builder("div")
            .disable_identity_checks()
            .build();
        let mut rt = Runtime::new(MemoryDocument::new());
        let props = Rc::new("a".to_string());
        let id = desc.create_root_component(&mut rt, props.clone()).unwrap();
        rt.attach(id);
        rt.update(id).unwrap();

        rt.set_props(id, props);
        assert!(rt.is_dirty(id));
    }

    #[test]
    fn props_hook_decides_dirtiness() {
        let desc = Desc::<u32, ()>::builder("div")
            .props_received(|cx, props| {
                if *props % 2 == 0 {
                    cx.store_props(props);
                    cx.mark_dirty();
                }
            })
            .build();
        let mut rt = Runtime::new(MemoryDocument::new());
        let id = desc.create_root_component(&mut rt, 0u32).unwrap();
        rt.attach(id);
        rt.update(id).unwrap();

        rt.set_props(id, Rc::new(1u32));
        assert!(!rt.is_dirty(id));
        rt.set_props(id, Rc::new(2u32));
        assert!(rt.is_dirty(id));
    }

    #[test]
    fn children_identity() {
        let desc = Desc::<(), ()>::builder("div").build();
        let mut rt = Runtime::new(MemoryDocument::new());
        let id = desc.create_root_component(&mut rt, ()).unwrap();
        rt.attach(id);
        rt.update(id).unwrap();

        let children = Rc::new(vec![VNode::text("x")]);
        rt.set_children(id, Some(children.clone()));
        assert!(rt.is_dirty(id));
        rt.update(id).unwrap();
        rt.set_children(id, Some(children));
        assert!(!rt.is_dirty(id));
    }

    #[test]
    fn depth_follows_parent() {
        let desc = Desc::<(), ()>::builder("div").build();
        let mut rt = Runtime::new(MemoryDocument::new());
        let root = desc.create_root_component(&mut rt, ()).unwrap();
        let child = desc.create_component(&mut rt, root, (), None).unwrap();
        let grandchild = desc.create_component(&mut rt, child, (), None).unwrap();
        assert_eq!(rt.depth(root), 0);
        assert_eq!(rt.depth(child), 1);
        assert_eq!(rt.depth(grandchild), 2);
        assert_eq!(rt.parent(grandchild), Some(child));
    }

    #[test]
    #[should_panic(expected = "invalid props")]
    fn wrong_props_type_panics() {
        let desc = Desc::<u32, ()>::builder("div").build();
        let mut rt = Runtime::new(MemoryDocument::new());
        let id = desc.create_root_component(&mut rt, 0u32).unwrap();
        rt.set_props(id, Rc::new("nope".to_string()));
    }

    #[test]
    #[should_panic(expected = "no such component")]
    fn invalidating_disposed_component_panics() {
        let desc = Desc::<(), ()>::builder("div").build();
        let mut rt = Runtime::new(MemoryDocument::new());
        let id = desc.create_root_component(&mut rt, ()).unwrap();
        rt.dispose(id);
        rt.invalidate(id);
    }
}
