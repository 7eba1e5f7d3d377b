//! Component descriptors and the hook context.

use crate::component::{ComponentData, ComponentId};
use crate::document::Document;
use crate::error::Error;
use crate::runtime::Runtime;
use crate::vnode::{Name, VNode, SVG_NAMESPACE};
use core::fmt;
use core::marker::PhantomData;
use std::any::{type_name, Any, TypeId};
use std::rc::Rc;

/// How a component's root element is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootKind {
    Element(Name),
    Namespaced { namespace: Name, tag: Name },
    /// A `<canvas>` root that the update hook draws into directly.
    Canvas,
}

impl RootKind {
    pub fn tag(&self) -> &str {
        match self {
            RootKind::Element(tag) | RootKind::Namespaced { tag, .. } => tag,
            RootKind::Canvas => "canvas",
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        match self {
            RootKind::Namespaced { namespace, .. } => Some(namespace),
            RootKind::Element(_) | RootKind::Canvas => None,
        }
    }
}

pub(crate) type Hook<D> = Rc<dyn Fn(&mut Runtime<D>, ComponentId, &mut ComponentData<D>)>;
pub(crate) type UpdateHook<D> = Rc<
    dyn Fn(&mut Runtime<D>, ComponentId, &mut ComponentData<D>) -> Result<(), Error<<D as Document>::Error>>,
>;
pub(crate) type ReceiveHook<D, T> =
    Rc<dyn Fn(&mut Runtime<D>, ComponentId, &mut ComponentData<D>, T)>;
pub(crate) type ChildList<D> = Option<Rc<Vec<VNode<D>>>>;

/// The type-erased “virtual table” shared by all components of one descriptor.
pub struct DescriptorInner<D: Document> {
    pub(crate) name: String,
    pub(crate) root: RootKind,
    pub(crate) identity_checks: bool,
    pub(crate) props_type: TypeId,
    pub(crate) props_type_name: &'static str,
    pub(crate) new_state: Box<dyn Fn() -> Box<dyn Any>>,
    pub(crate) init: Option<Hook<D>>,
    pub(crate) update: Option<UpdateHook<D>>,
    pub(crate) render: Option<UpdateHook<D>>,
    pub(crate) props_received: Option<ReceiveHook<D, Rc<dyn Any>>>,
    pub(crate) children_received: Option<ReceiveHook<D, ChildList<D>>>,
    pub(crate) attached: Option<Hook<D>>,
    pub(crate) detached: Option<Hook<D>>,
    pub(crate) disposed: Option<Hook<D>>,
    pub(crate) invalidated: Option<Rc<dyn Fn(&mut Runtime<D>, ComponentId)>>,
}

impl<D: Document> DescriptorInner<D> {
    pub(crate) fn is_canvas(&self) -> bool {
        self.root == RootKind::Canvas
    }
}

impl<D: Document> fmt::Debug for DescriptorInner<D> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("name", &self.name)
            .field("root", &self.root)
            .field("identity_checks", &self.identity_checks)
            .field("props", &self.props_type_name)
            .finish()
    }
}

/// Describes a class of components: root element, lifecycle hooks, and render function.
///
/// `P` is the props type (shared by `Rc` and compared by identity), `S` is the component state,
/// which the framework never inspects.
///
/// Descriptors are configured once with a [`DescriptorBuilder`] and then shared by every
/// component created from them; they cannot be reconfigured afterwards.
///
/// ```ignore
/// let counter = ComponentDescriptor::<MemoryDocument, u32, ()>::builder("span")
///     .name("Counter")
///     .render(|cx| VNode::element("span").text_children(cx.props().to_string()))
///     .build();
///
/// let id = counter.mount(&mut runtime, 3, &container)?;
/// ```
pub struct ComponentDescriptor<D: Document, P, S> {
    inner: Rc<DescriptorInner<D>>,
    _marker: PhantomData<fn() -> (P, S)>,
}

impl<D: Document, P, S> Clone for ComponentDescriptor<D, P, S> {
    fn clone(&self) -> Self {
        ComponentDescriptor {
            inner: Rc::clone(&self.inner),
            _marker: PhantomData,
        }
    }
}

impl<D: Document, P, S> fmt::Debug for ComponentDescriptor<D, P, S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl<D: Document, P: 'static, S: Default + 'static> ComponentDescriptor<D, P, S> {
    /// Starts configuring a descriptor whose components have a `tag` root element.
    pub fn builder(tag: impl Into<Name>) -> DescriptorBuilder<D, P, S> {
        DescriptorBuilder::new(tag)
    }

    /// The debug name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn root(&self) -> &RootKind {
        &self.inner.root
    }

    /// Creates a component placeholder vnode that will mount a component of this descriptor.
    pub fn create_vnode(&self, props: impl Into<Rc<P>>) -> VNode<D> {
        let props: Rc<P> = props.into();
        VNode::component(Rc::clone(&self.inner), props)
    }

    /// Creates a component with the given parent; its depth is one more than the parent’s.
    ///
    /// The component runs `init` and starts out dirty and unattached.
    pub fn create_component(
        &self,
        runtime: &mut Runtime<D>,
        parent: ComponentId,
        props: impl Into<Rc<P>>,
        children: Option<Vec<VNode<D>>>,
    ) -> Result<ComponentId, Error<D::Error>> {
        let props: Rc<P> = props.into();
        runtime.instantiate(
            &self.inner,
            Some(parent),
            props,
            children.map(Rc::new),
        )
    }

    /// Creates a component at depth 0.
    pub fn create_root_component(
        &self,
        runtime: &mut Runtime<D>,
        props: impl Into<Rc<P>>,
    ) -> Result<ComponentId, Error<D::Error>> {
        let props: Rc<P> = props.into();
        runtime.instantiate(&self.inner, None, props, None)
    }

    /// Creates a root component, appends its root element to `container`, attaches it and
    /// renders it.
    pub fn mount(
        &self,
        runtime: &mut Runtime<D>,
        props: impl Into<Rc<P>>,
        container: &D::Node,
    ) -> Result<ComponentId, Error<D::Error>> {
        let id = self.create_root_component(runtime, props)?;
        let root = runtime.root_node(id).clone();
        runtime
            .document
            .append_child(container, &root)
            .map_err(Error::Document)?;
        runtime.attach_and_update(id)?;
        Ok(id)
    }
}

/// Configures a [`ComponentDescriptor`].
///
/// Every setter consumes and returns the builder. Hooks that are not set fall back to the
/// default behavior documented on each setter.
pub struct DescriptorBuilder<D: Document, P, S> {
    inner: DescriptorInner<D>,
    _marker: PhantomData<fn() -> (P, S)>,
}

impl<D: Document, P: 'static, S: Default + 'static> DescriptorBuilder<D, P, S> {
    pub fn new(tag: impl Into<Name>) -> Self {
        let tag = tag.into();
        DescriptorBuilder {
            inner: DescriptorInner {
                name: tag.to_string(),
                root: RootKind::Element(tag),
                identity_checks: true,
                props_type: TypeId::of::<P>(),
                props_type_name: type_name::<P>(),
                new_state: Box::new(|| Box::new(S::default()) as Box<dyn Any>),
                init: None,
                update: None,
                render: None,
                props_received: None,
                children_received: None,
                attached: None,
                detached: None,
                disposed: None,
                invalidated: None,
            },
            _marker: PhantomData,
        }
    }

    /// Sets the name used in debug output and error messages (defaults to the root tag).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner.name = name.into();
        self
    }

    /// Creates the root element in the given namespace.
    pub fn namespace(mut self, namespace: impl Into<Name>) -> Self {
        let tag = Name::from(self.inner.root.tag().to_string());
        self.inner.root = RootKind::Namespaced {
            namespace: namespace.into(),
            tag,
        };
        self
    }

    /// Creates the root element in the SVG namespace.
    pub fn svg(self) -> Self {
        self.namespace(SVG_NAMESPACE)
    }

    /// Uses a `<canvas>` root; the update hook draws into it and no vnode tree is kept.
    pub fn canvas(mut self) -> Self {
        self.inner.root = RootKind::Canvas;
        self
    }

    /// Marks components dirty on every `set_props`/`set_children`, even with identical props.
    pub fn disable_identity_checks(mut self) -> Self {
        self.inner.identity_checks = false;
        self
    }

    /// Called once, right after the component was created.
    pub fn init<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Cx<D, P, S>) + 'static,
    {
        self.inner.init = Some(Rc::new(
            move |rt: &mut Runtime<D>, id: ComponentId, data: &mut ComponentData<D>| {
                f(&mut Cx::new(rt, id, data))
            },
        ));
        self
    }

    /// Called when a dirty, attached component is updated.
    ///
    /// Overrides the render function; call [`Cx::sync`] to reconcile the root.
    pub fn update<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Cx<D, P, S>) -> Result<(), Error<D::Error>> + 'static,
    {
        self.inner.update = Some(Rc::new(
            move |rt: &mut Runtime<D>, id: ComponentId, data: &mut ComponentData<D>| {
                f(&mut Cx::new(rt, id, data))
            },
        ));
        self
    }

    /// The default render function: its result is synced onto the component root on update.
    ///
    /// The returned vnode describes the root element itself, so its tag must match.
    pub fn render<F>(mut self, f: F) -> Self
    where
        F: Fn(&Cx<D, P, S>) -> VNode<D> + 'static,
    {
        self.inner.render = Some(Rc::new(
            move |rt: &mut Runtime<D>, id: ComponentId, data: &mut ComponentData<D>| {
                let mut cx = Cx::new(rt, id, data);
                let root = f(&cx);
                cx.sync(root)
            },
        ));
        self
    }

    /// Receives new props, replacing the default identity check entirely.
    ///
    /// The hook decides dirtiness itself, typically with [`Cx::store_props`] and
    /// [`Cx::mark_dirty`].
    pub fn props_received<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Cx<D, P, S>, Rc<P>) + 'static,
    {
        let name = self.inner.name.clone();
        self.inner.props_received = Some(Rc::new(
            move |rt: &mut Runtime<D>,
                  id: ComponentId,
                  data: &mut ComponentData<D>,
                  props: Rc<dyn Any>| {
                let props = match props.downcast::<P>() {
                    Ok(props) => props,
                    Err(_) => panic!(
                        "props_received: invalid props for {}; expected type {}",
                        name,
                        type_name::<P>()
                    ),
                };
                f(&mut Cx::new(rt, id, data), props)
            },
        ));
        self
    }

    /// Receives new children, replacing the default identity check entirely.
    pub fn children_received<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Cx<D, P, S>, Option<Rc<Vec<VNode<D>>>>) + 'static,
    {
        self.inner.children_received = Some(Rc::new(
            move |rt: &mut Runtime<D>,
                  id: ComponentId,
                  data: &mut ComponentData<D>,
                  children: ChildList<D>| {
                f(&mut Cx::new(rt, id, data), children)
            },
        ));
        self
    }

    /// Called after the component was attached.
    pub fn attached<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Cx<D, P, S>) + 'static,
    {
        self.inner.attached = Some(Rc::new(
            move |rt: &mut Runtime<D>, id: ComponentId, data: &mut ComponentData<D>| {
                f(&mut Cx::new(rt, id, data))
            },
        ));
        self
    }

    /// Called after the component was detached.
    pub fn detached<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Cx<D, P, S>) + 'static,
    {
        self.inner.detached = Some(Rc::new(
            move |rt: &mut Runtime<D>, id: ComponentId, data: &mut ComponentData<D>| {
                f(&mut Cx::new(rt, id, data))
            },
        ));
        self
    }

    /// Called once when the component is disposed. The component is gone afterwards.
    pub fn disposed<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Cx<D, P, S>) + 'static,
    {
        self.inner.disposed = Some(Rc::new(
            move |rt: &mut Runtime<D>, id: ComponentId, data: &mut ComponentData<D>| {
                f(&mut Cx::new(rt, id, data))
            },
        ));
        self
    }

    /// Called on every invalidation, including ones that find the component already queued.
    ///
    /// The component may be mid-update when this runs, so only the runtime is available.
    pub fn invalidated<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Runtime<D>, ComponentId) + 'static,
    {
        self.inner.invalidated = Some(Rc::new(f));
        self
    }

    pub fn build(self) -> ComponentDescriptor<D, P, S> {
        ComponentDescriptor {
            inner: Rc::new(self.inner),
            _marker: PhantomData,
        }
    }
}

/// The context passed to lifecycle hooks: typed access to one component.
pub struct Cx<'a, D: Document, P, S> {
    runtime: &'a mut Runtime<D>,
    id: ComponentId,
    data: &'a mut ComponentData<D>,
    _marker: PhantomData<fn() -> (P, S)>,
}

impl<'a, D: Document, P: 'static, S: 'static> Cx<'a, D, P, S> {
    pub(crate) fn new(
        runtime: &'a mut Runtime<D>,
        id: ComponentId,
        data: &'a mut ComponentData<D>,
    ) -> Self {
        Cx {
            runtime,
            id,
            data,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn depth(&self) -> usize {
        self.runtime.depth(self.id)
    }

    pub fn props(&self) -> &P {
        match self.data.props.downcast_ref::<P>() {
            Some(props) => props,
            None => panic!(
                "Cx::props: invalid props for component {}; expected type {}",
                self.id,
                type_name::<P>()
            ),
        }
    }

    /// The shared props handle.
    pub fn props_rc(&self) -> Rc<P> {
        match Rc::clone(&self.data.props).downcast::<P>() {
            Ok(props) => props,
            Err(_) => panic!(
                "Cx::props_rc: invalid props for component {}; expected type {}",
                self.id,
                type_name::<P>()
            ),
        }
    }

    pub fn state(&self) -> &S {
        match self.data.state.downcast_ref::<S>() {
            Some(state) => state,
            None => panic!(
                "Cx::state: invalid state for component {}; expected type {}",
                self.id,
                type_name::<S>()
            ),
        }
    }

    pub fn state_mut(&mut self) -> &mut S {
        let id = self.id;
        match self.data.state.downcast_mut::<S>() {
            Some(state) => state,
            None => panic!(
                "Cx::state_mut: invalid state for component {}; expected type {}",
                id,
                type_name::<S>()
            ),
        }
    }

    /// Children passed by the parent (empty if none).
    pub fn children(&self) -> &[VNode<D>] {
        match &self.data.children {
            Some(children) => children,
            None => &[],
        }
    }

    /// The shared children handle.
    pub fn children_rc(&self) -> Option<Rc<Vec<VNode<D>>>> {
        self.data.children.clone()
    }

    /// Replaces the stored props without touching the dirty flag.
    pub fn store_props(&mut self, props: Rc<P>) {
        self.data.props = props as Rc<dyn Any>;
    }

    /// Replaces the stored children without touching the dirty flag.
    pub fn store_children(&mut self, children: Option<Rc<Vec<VNode<D>>>>) {
        self.data.children = children;
    }

    /// The root element.
    pub fn root(&self) -> &D::Node {
        self.runtime.root_node(self.id)
    }

    /// The last committed vnode tree.
    pub fn tree(&self) -> Option<&VNode<D>> {
        self.data.tree.as_ref()
    }

    pub fn document(&mut self) -> &mut D {
        &mut self.runtime.document
    }

    pub fn runtime(&mut self) -> &mut Runtime<D> {
        self.runtime
    }

    pub fn is_dirty(&self) -> bool {
        self.runtime.is_dirty(self.id)
    }

    pub fn mark_dirty(&mut self) {
        self.runtime.mark_dirty(self.id);
    }

    pub fn invalidate(&mut self) {
        self.runtime.invalidate(self.id);
    }

    /// Reconciles the root element against `root`, which becomes the committed tree.
    ///
    /// The first call adopts the existing root element.
    pub fn sync(&mut self, root: VNode<D>) -> Result<(), Error<D::Error>> {
        self.runtime.sync_component(self.id, self.data, root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Lifecycle;
    use crate::memory::MemoryDocument;
    use std::cell::RefCell;

    type Desc<P, S> = ComponentDescriptor<MemoryDocument, P, S>;

    #[test]
    fn builder_roots() {
        let plain = Desc::<(), ()>::builder("div").build();
        assert_eq!(plain.name(), "div");
        assert_eq!(plain.root(), &RootKind::Element("div".into()));

        let icon = Desc::<(), ()>::builder("svg").name("Icon").svg().build();
        assert_eq!(icon.name(), "Icon");
        assert_eq!(icon.root().tag(), "svg");
        assert_eq!(icon.root().namespace(), Some(SVG_NAMESPACE));

        let chart = Desc::<(), ()>::builder("div").canvas().build();
        assert_eq!(chart.root().tag(), "canvas");
        assert_eq!(chart.root().namespace(), None);

        let mut rt = Runtime::new(MemoryDocument::new());
        let id = chart.create_root_component(&mut rt, ()).unwrap();
        let root = *rt.root_node(id);
        assert_eq!(rt.document().tag(root), Some("canvas"));
    }

    #[test]
    fn mount_renders_into_container() {
        let label = Desc::<u32, ()>::builder("p")
            .render(|cx| VNode::element("p").text_children(cx.props().to_string()))
            .build();
        let mut rt = Runtime::new(MemoryDocument::new());
        let container = rt.document_mut().create_container("body");

        let id = label.mount(&mut rt, 3u32, &container).unwrap();
        let root = *rt.root_node(id);
        assert_eq!(rt.document().children(container), &[root]);
        assert_eq!(rt.document().text(root), "3");
        assert_eq!(rt.lifecycle(id), Lifecycle::Attached);
        assert!(!rt.is_dirty(id));
        assert!(rt.tree(id).is_some());
        assert!(!rt.scheduler().is_queued(id));
        assert!(!rt.scheduler().is_frame_requested());
    }

    #[test]
    fn state_persists_between_updates() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let counter = Desc::<(), u32>::builder("div")
            .update(move |cx| {
                *cx.state_mut() += 1;
                s.borrow_mut().push(*cx.state());
                Ok(())
            })
            .build();
        let mut rt = Runtime::new(MemoryDocument::new());
        let id = counter.create_root_component(&mut rt, ()).unwrap();
        rt.attach(id);
        rt.flush().unwrap();
        rt.invalidate(id);
        rt.flush().unwrap();
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn child_components_sit_below_their_parent() {
        let desc = Desc::<(), ()>::builder("div").build();
        let mut rt = Runtime::new(MemoryDocument::new());
        let parent = desc.create_root_component(&mut rt, ()).unwrap();
        let child = desc
            .create_component(&mut rt, parent, (), Some(vec![VNode::text("hi")]))
            .unwrap();
        assert_eq!(rt.parent(child), Some(parent));
        assert_eq!(rt.depth(child), 1);
        assert_eq!(rt.lifecycle(child), Lifecycle::Constructed);
        assert!(rt.is_dirty(child));
    }

    #[test]
    fn placeholders_start_unmounted() {
        let desc = Desc::<u32, ()>::builder("li").build();
        let vnode = desc.create_vnode(7u32).key("seven");
        assert_eq!(vnode.component_id(), None);
        assert!(vnode.rendered_node().is_none());
        assert_eq!(vnode.tag(), Some("li"));
    }
}
