//! Fiber reconciler.
//!
//! A [`Renderer`] owns one container element. Each `render(tree)` queues a
//! job on the scheduler; the job builds a work-in-progress fiber tree one
//! fiber per step, matching new children against the last committed tree
//! by position and type, and commits all DOM changes at once when the walk
//! is done.
//!
//! Commit order:
//!
//! 1. deletions, listed by previous-tree id (a fiber without a node removes
//!    all of its top host nodes)
//! 2. placements, inserted before the next already-mounted sibling
//! 3. updates, patching props against the previous fiber
//!
//! Nodes the renderer did not create are left alone, so server-rendered
//! children of the container survive the first commit.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::config::DEFAULT_NAMESPACE;
use crate::dom::{Document, Node};
use crate::engine::Component;
use crate::error::OveeError;
use crate::host::Completion;
use crate::log::Logger;

use super::fiber::{EffectTag, Fiber, FiberId, FiberTree, FiberType, ROOT};
use super::props::{NODE_VALUE, patch_props};
use super::scheduler::Scheduler;
use super::vnode::{Props, VNode};

type RenderResult<T> = std::result::Result<T, OveeError>;

/// Maps framework components used in templates to host tag names.
pub trait ComponentResolver {
    fn tag_for(&self, component: &Component) -> Option<String>;
}

// =============================================================================
// Render pass
// =============================================================================

/// State of one render job between steps.
struct RenderPass {
    wip: FiberTree,
    current: Option<FiberTree>,
    deletions: Vec<FiberId>,
}

struct Inner {
    container: Node,
    scheduler: Scheduler,
    resolver: RefCell<Option<Rc<dyn ComponentResolver>>>,
    current: RefCell<Option<FiberTree>>,
    alive: Cell<bool>,
    commits: Cell<u64>,
    namespace: String,
    logger: Logger,
}

/// Renders virtual trees into one container. Clones share the renderer.
#[derive(Clone)]
pub struct Renderer(Rc<Inner>);

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("container", &self.0.container)
            .field("alive", &self.0.alive.get())
            .field("commits", &self.0.commits.get())
            .finish()
    }
}

impl Renderer {
    pub fn new(container: &Node, scheduler: &Scheduler) -> Self {
        Self::with_namespace(container, scheduler, DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(container: &Node, scheduler: &Scheduler, namespace: &str) -> Self {
        Self(Rc::new(Inner {
            container: container.clone(),
            scheduler: scheduler.clone(),
            resolver: RefCell::new(None),
            current: RefCell::new(None),
            alive: Cell::new(true),
            commits: Cell::new(0),
            namespace: namespace.to_string(),
            logger: Logger::new(namespace, "Renderer"),
        }))
    }

    /// Resolver used for [`VNode::Component`] nodes.
    pub fn set_resolver(&self, resolver: Rc<dyn ComponentResolver>) {
        *self.0.resolver.borrow_mut() = Some(resolver);
    }

    pub fn container(&self) -> &Node {
        &self.0.container
    }

    pub fn is_alive(&self) -> bool {
        self.0.alive.get()
    }

    /// Number of successful commits.
    pub fn commit_count(&self) -> u64 {
        self.0.commits.get()
    }

    /// Stop rendering. Queued jobs finish without touching the DOM.
    pub fn dispose(&self) {
        self.0.alive.set(false);
    }

    /// Queue a render of `tree`. The completion resolves once it is
    /// committed (or abandoned).
    pub fn render(&self, tree: VNode) -> Completion {
        let this = self.clone();
        let mut tree = Some(tree);
        let mut pass: Option<RenderPass> = None;
        self.0.scheduler.schedule(move |unit| {
            if !this.is_alive() {
                return None;
            }
            let id = match unit {
                Some(id) => id,
                None => {
                    pass = Some(this.begin(tree.take().unwrap_or(VNode::Fragment(Vec::new()))));
                    ROOT
                }
            };
            let Some(active) = pass.as_mut() else {
                return None;
            };
            match this.perform_unit(active, id) {
                Ok(Some(next)) => Some(next),
                Ok(None) => {
                    if let Some(finished) = pass.take() {
                        this.finish(finished);
                    }
                    None
                }
                Err(error) => {
                    this.0.logger.error(&error);
                    if let Some(aborted) = pass.take() {
                        *this.0.current.borrow_mut() = aborted.current;
                    }
                    None
                }
            }
        })
    }

    /// Render and commit `tree` right now, bypassing the scheduler.
    pub fn render_sync(&self, tree: VNode) {
        if !self.is_alive() {
            return;
        }
        let mut pass = self.begin(tree);
        let mut next = Some(ROOT);
        while let Some(id) = next {
            match self.perform_unit(&mut pass, id) {
                Ok(unit) => next = unit,
                Err(error) => {
                    self.0.logger.error(&error);
                    *self.0.current.borrow_mut() = pass.current;
                    return;
                }
            }
        }
        self.finish(pass);
    }

    fn error(&self, message: impl Into<String>) -> OveeError {
        OveeError::Render {
            namespace: crate::config::display_namespace(&self.0.namespace),
            message: message.into(),
        }
    }

    fn document(&self) -> RenderResult<Document> {
        self.0
            .container
            .document()
            .ok_or_else(|| self.error("container does not belong to a live document"))
    }

    // -------------------------------------------------------------------------
    // Render phase
    // -------------------------------------------------------------------------

    fn begin(&self, tree: VNode) -> RenderPass {
        let current = self.0.current.borrow_mut().take();
        let mut wip = FiberTree::with_root(&self.0.container, vec![tree]);
        if current.is_some() {
            if let Some(root) = wip.get_mut(ROOT) {
                root.alternate = Some(ROOT);
            }
        }
        RenderPass {
            wip,
            current,
            deletions: Vec::new(),
        }
    }

    /// Perform fiber `id`: create its DOM node if needed, reconcile its
    /// children, and return the next fiber to perform.
    fn perform_unit(&self, pass: &mut RenderPass, id: FiberId) -> RenderResult<Option<FiberId>> {
        let fiber = pass
            .wip
            .get_mut(id)
            .ok_or_else(|| self.error(format!("fiber {id} does not exist")))?;

        let children = match &fiber.ty {
            FiberType::Function(render) => vec![render(&fiber.props)],
            FiberType::Element(_) | FiberType::Text => {
                if fiber.node.is_none() {
                    fiber.node = Some(self.create_node(&fiber.ty, &fiber.props)?);
                }
                std::mem::take(&mut fiber.pending)
            }
            FiberType::Root | FiberType::Fragment => std::mem::take(&mut fiber.pending),
        };

        self.reconcile_children(pass, id, children);
        Ok(pass.wip.next_unit(id))
    }

    fn create_node(&self, ty: &FiberType, props: &Props) -> RenderResult<Node> {
        let document = self.document()?;
        let node = match ty {
            FiberType::Element(tag) => document.create_element(tag),
            FiberType::Text => document.create_text_node(""),
            _ => return Err(self.error(format!("{ty:?} fibers have no DOM node"))),
        };
        patch_props(&node, &Props::new(), props);
        Ok(node)
    }

    /// Turn a virtual node into a fiber type, props and pending children.
    fn describe(&self, vnode: VNode) -> (FiberType, Props, Vec<VNode>) {
        match vnode {
            VNode::Element {
                tag,
                props,
                children,
            } => (FiberType::Element(tag), props, children),
            VNode::Text(text) => (
                FiberType::Text,
                Props::new().with(NODE_VALUE, text),
                Vec::new(),
            ),
            VNode::Function { render, props } => (FiberType::Function(render), props, Vec::new()),
            VNode::Component {
                component,
                props,
                children,
            } => {
                let resolver = self.0.resolver.borrow().clone();
                match resolver.and_then(|resolver| resolver.tag_for(&component)) {
                    Some(tag) => (FiberType::Element(tag), props, children),
                    None => {
                        self.0
                            .logger
                            .error("component node rendered without an app to resolve it");
                        (FiberType::Fragment, Props::new(), Vec::new())
                    }
                }
            }
            VNode::Fragment(children) => (FiberType::Fragment, Props::new(), children),
        }
    }

    fn reconcile_children(&self, pass: &mut RenderPass, parent: FiberId, children: Vec<VNode>) {
        let mut old = pass
            .wip
            .get(parent)
            .and_then(|fiber| fiber.alternate)
            .and_then(|alternate| pass.current.as_ref()?.get(alternate)?.child);
        let mut previous: Option<FiberId> = None;

        for vnode in children {
            let (ty, props, pending) = self.describe(vnode);
            let old_fiber = old.and_then(|o| pass.current.as_ref()?.get(o));
            let same = old_fiber.is_some_and(|fiber| fiber.ty.same_as(&ty));

            let mut fiber = Fiber::new(ty, props, pending);
            fiber.parent = Some(parent);
            match (old, old_fiber) {
                (Some(o), Some(old_fiber)) if same => {
                    fiber.node = old_fiber.node.clone();
                    fiber.alternate = Some(o);
                    fiber.effect_tag = Some(EffectTag::Update);
                }
                _ => {
                    fiber.effect_tag = Some(EffectTag::Placement);
                    if let Some(o) = old {
                        pass.deletions.push(o);
                    }
                }
            }
            let id = pass.wip.push(fiber);
            let link = match previous {
                Some(previous) => pass.wip.get_mut(previous).map(|f| &mut f.sibling),
                None => pass.wip.get_mut(parent).map(|f| &mut f.child),
            };
            if let Some(link) = link {
                *link = Some(id);
            }
            previous = Some(id);
            old = old.and_then(|o| pass.current.as_ref()?.get(o)?.sibling);
        }

        while let Some(o) = old {
            pass.deletions.push(o);
            old = pass.current.as_ref().and_then(|tree| tree.get(o)?.sibling);
        }
    }

    // -------------------------------------------------------------------------
    // Commit phase
    // -------------------------------------------------------------------------

    fn finish(&self, pass: RenderPass) {
        let RenderPass {
            wip,
            current,
            deletions,
        } = pass;
        match self.commit(&wip, current.as_ref(), &deletions) {
            Ok(()) => {
                *self.0.current.borrow_mut() = Some(wip);
                self.0.commits.set(self.0.commits.get() + 1);
            }
            Err(error) => {
                self.0.logger.error(&error);
                *self.0.current.borrow_mut() = current;
            }
        }
    }

    fn commit(
        &self,
        wip: &FiberTree,
        current: Option<&FiberTree>,
        deletions: &[FiberId],
    ) -> RenderResult<()> {
        if let Some(current) = current {
            for &deleted in deletions {
                for node in current.host_nodes(deleted) {
                    node.remove();
                }
            }
        }

        let mut stack: Vec<FiberId> = wip.get(ROOT).and_then(|root| root.child).into_iter().collect();
        while let Some(id) = stack.pop() {
            let fiber = wip
                .get(id)
                .ok_or_else(|| self.error(format!("fiber {id} does not exist")))?;
            self.commit_fiber(wip, current, id, fiber)?;
            // Sibling after the whole subtree of this fiber.
            if let Some(sibling) = fiber.sibling {
                stack.push(sibling);
            }
            if let Some(child) = fiber.child {
                stack.push(child);
            }
        }
        Ok(())
    }

    fn commit_fiber(
        &self,
        wip: &FiberTree,
        current: Option<&FiberTree>,
        id: FiberId,
        fiber: &Fiber,
    ) -> RenderResult<()> {
        let Some(node) = &fiber.node else {
            return Ok(());
        };
        match fiber.effect_tag {
            Some(EffectTag::Placement) => {
                let parent = wip
                    .host_parent(id)
                    .ok_or_else(|| self.error("no DOM parent to place a node into"))?;
                let anchor = self.find_anchor(wip, id, &parent);
                parent
                    .insert_before(node, anchor.as_ref())
                    .map_err(|error| self.error(error.to_string()))?;
            }
            Some(EffectTag::Update) => {
                let old_props = fiber
                    .alternate
                    .and_then(|alternate| current?.get(alternate))
                    .map(|old| old.props.clone())
                    .unwrap_or_default();
                patch_props(node, &old_props, &fiber.props);
            }
            None => {}
        }
        Ok(())
    }

    /// First already-mounted host node after fiber `id` under `parent`.
    fn find_anchor(&self, wip: &FiberTree, id: FiberId, parent: &Node) -> Option<Node> {
        let mut current = id;
        loop {
            let mut sibling = wip.get(current)?.sibling;
            while let Some(s) = sibling {
                let fiber = wip.get(s)?;
                if fiber.effect_tag == Some(EffectTag::Update) {
                    let anchor = wip
                        .host_nodes(s)
                        .into_iter()
                        .find(|node| node.parent().as_ref() == Some(parent));
                    if anchor.is_some() {
                        return anchor;
                    }
                }
                sibling = fiber.sibling;
            }
            let up = wip.get(current)?.parent?;
            if wip.get(up)?.node.is_some() {
                return None;
            }
            current = up;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::vnode::{fragment, function, h, text};
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Collects formatted log output.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn setup() -> (Document, Node, Renderer) {
        let doc = Document::new();
        let root = doc.create_element("div");
        doc.body().append_child(&root).unwrap();
        let renderer = Renderer::new(&root, &Scheduler::new(doc.event_loop()));
        (doc, root, renderer)
    }

    #[test]
    fn test_initial_render() {
        let (doc, root, renderer) = setup();
        let done = renderer.render(h("p").prop("class", "x").child(text("hello")));
        doc.event_loop().run_until_idle();
        assert!(done.is_settled());
        assert_eq!(root.inner_html(), r#"<p class="x">hello</p>"#);
        assert_eq!(renderer.commit_count(), 1);
    }

    #[test]
    fn test_first_render_keeps_server_children() {
        let (doc, root, renderer) = setup();
        let server = doc.create_element("span");
        server.set_text_content("server rendered");
        root.append_child(&server).unwrap();

        renderer.render_sync(h("p"));
        assert_eq!(server.parent().as_ref(), Some(&root));
        assert_eq!(root.inner_html(), "<span>server rendered</span><p></p>");

        // Later renders only touch their own nodes.
        renderer.render_sync(h("b"));
        assert_eq!(root.inner_html(), "<span>server rendered</span><b></b>");
    }

    #[test]
    fn test_text_update_keeps_nodes() {
        let (doc, root, renderer) = setup();
        renderer.render_sync(h("div").child(h("p").child(text("hello"))));
        let p = root.query_selector("p").unwrap().unwrap();
        let before = doc.mutation_count();

        renderer.render_sync(h("div").child(h("p").child(text("world"))));
        assert_eq!(doc.mutation_count() - before, 1);
        assert_eq!(root.query_selector("p").unwrap().unwrap(), p);
        assert_eq!(p.text_content(), "world");
    }

    #[test]
    fn test_type_change_replaces() {
        let (_doc, root, renderer) = setup();
        renderer.render_sync(h("ul").children([h("li"), h("li")]));
        renderer.render_sync(h("ul").children([h("li"), h("p"), h("li")]));
        assert_eq!(root.inner_html(), "<ul><li></li><p></p><li></li></ul>");
        renderer.render_sync(h("ul").child(h("li")));
        assert_eq!(root.inner_html(), "<ul><li></li></ul>");
    }

    #[test]
    fn test_fragment_deletion_removes_all_children() {
        let (_doc, root, renderer) = setup();
        let list = |n: usize| fragment((0..n).map(|i| h("i").child(text(i.to_string()))).collect());
        renderer.render_sync(h("div").children([list(3), h("b")]));
        assert_eq!(root.query_selector_all("i").unwrap().len(), 3);
        renderer.render_sync(h("div").children([h("b"), h("b")]));
        assert_eq!(root.inner_html(), "<div><b></b><b></b></div>");
    }

    #[test]
    fn test_function_components() {
        let (_doc, root, renderer) = setup();
        let greet = Rc::new(|props: &Props| {
            let name = match props.get("name") {
                Some(crate::render::PropValue::Text(name)) => name.clone(),
                _ => String::from("nobody"),
            };
            h("em").child(text(format!("hi {name}")))
        });
        let tree = |name: &str| {
            let greet = greet.clone();
            h("div").child(function(move |p| greet(p), Props::new().with("name", name)))
        };
        renderer.render_sync(tree("a"));
        assert_eq!(root.inner_html(), "<div><em>hi a</em></div>");
    }

    #[test]
    fn test_placement_before_existing_sibling() {
        let (_doc, root, renderer) = setup();
        renderer.render_sync(fragment(vec![fragment(vec![]), h("b")]));
        renderer.render_sync(fragment(vec![fragment(vec![h("a")]), h("b")]));
        assert_eq!(root.inner_html(), "<a></a><b></b>");
    }

    #[test]
    fn test_dispose_abandons_pending_work() {
        let (doc, root, renderer) = setup();
        let done = renderer.render(h("p"));
        renderer.dispose();
        doc.event_loop().run_until_idle();
        assert!(done.is_settled());
        assert_eq!(root.child_count(), 0);
    }

    #[test]
    fn test_component_without_resolver_renders_nothing() {
        let (_doc, root, renderer) = setup();
        let component = Component::new(|_, _| ());
        renderer.render_sync(h("div").child(crate::render::vnode::component(&component)));
        assert_eq!(root.inner_html(), "<div></div>");
    }

    #[test]
    fn test_failed_render_is_logged_and_next_render_commits() {
        let logs = Captured::default();
        let subscriber = tracing_subscriber::fmt().with_writer(logs.clone()).finish();
        tracing::subscriber::with_default(subscriber, || {
            let (doc, root, renderer) = setup();
            let event_loop = doc.event_loop().clone();
            renderer.render_sync(h("p").child(text("one")));
            let p = root.query_selector("p").unwrap().unwrap();

            // Without a document no new node can be created; updates still work.
            drop(doc);
            let failed = renderer.render(h("p").children([text("two"), h("b")]));
            let next = renderer.render(h("p").child(text("three")));
            event_loop.run_until_idle();

            assert!(failed.is_settled());
            assert!(next.is_settled());
            assert_eq!(renderer.commit_count(), 2);
            assert_eq!(root.inner_html(), "<p>three</p>");
            assert_eq!(root.query_selector("p").unwrap().unwrap(), p);
        });

        let output = logs.text();
        assert!(output.contains("ERROR"));
        assert!(output.contains("[Ovee ~ Renderer]"));
        assert!(output.contains("does not belong to a live document"));
    }
}
