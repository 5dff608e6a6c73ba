//! Templates: reactive rendering into component elements.
//!
//! Run with: cargo test --test templates

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use proptest::prelude::*;
use spark_signals::{Signal, signal};

use spark_ovee::render::component;
use spark_ovee::{
    Component, Document, EventLoop, Mode, Node, Options, Renderer, Scheduler, VNode, create_app,
    fragment, h, on_mounted, text, use_app, use_element, use_template,
};

fn document_with_root() -> (Document, Node) {
    // No development tip from these tests.
    let _ = Mode::init(Mode::Test);
    let doc = Document::new();
    let root = doc.create_element("div");
    doc.body().append_child(&root).unwrap();
    (doc, root)
}

fn paragraph(message: &str) -> VNode {
    h("div").child(h("p").child(text(message)))
}

// =============================================================================
// use_template
// =============================================================================

#[test]
fn test_template_renders_and_mount_waits_for_it() {
    let (doc, root) = document_with_root();
    let host = doc.create_element("x-message");
    root.append_child(&host).unwrap();
    let seen_on_mount = Rc::new(RefCell::new(String::new()));

    let s = seen_on_mount.clone();
    let message = Component::new(move |_, _| {
        let msg: Signal<String> = signal("hello".to_string());
        let m = msg.clone();
        use_template(move || paragraph(&m.get()));
        let element = use_element().unwrap();
        let s = s.clone();
        on_mounted(move || *s.borrow_mut() = element.inner_html());
        msg
    });

    let app = create_app()
        .component("x-message", &message, Options::none())
        .unwrap()
        .run(&root)
        .unwrap();
    doc.event_loop().run_until_idle();

    assert_eq!(host.inner_html(), "<div><p>hello</p></div>");
    assert_eq!(*seen_on_mount.borrow(), "<div><p>hello</p></div>");

    // Signal change: one text mutation, same nodes.
    let p = host.query_selector("p").unwrap().unwrap();
    let before = doc.mutation_count();
    let instance = app.get_component(&host, "x-message").unwrap().unwrap();
    instance
        .instance_as::<Signal<String>>()
        .unwrap()
        .set("world".to_string());
    doc.event_loop().run_until_idle();

    assert_eq!(host.inner_html(), "<div><p>world</p></div>");
    assert_eq!(host.query_selector("p").unwrap().unwrap(), p);
    assert_eq!(doc.mutation_count() - before, 1);
}

#[test]
fn test_template_stops_after_destroy() {
    let (doc, root) = document_with_root();
    let host = doc.create_element("div");
    host.set_attribute("data-counter", "");
    root.append_child(&host).unwrap();

    let count: Signal<u32> = signal(0);
    let c = count.clone();
    let counter = Component::new(move |_, _| {
        let c = c.clone();
        use_template(move || h("b").child(text(c.get().to_string())));
    });
    let app = create_app()
        .component("counter", &counter, Options::none())
        .unwrap()
        .run(&root)
        .unwrap();
    doc.event_loop().run_until_idle();
    assert_eq!(host.inner_html(), "<b>0</b>");

    app.destroy();
    count.set(5);
    doc.event_loop().run_until_idle();
    assert_eq!(host.inner_html(), "<b>0</b>");
}

#[test]
fn test_nested_component_in_template() {
    let (doc, root) = document_with_root();
    let host = doc.create_element("div");
    host.set_attribute("data-shell", "");
    root.append_child(&host).unwrap();

    let inner_mounts = Rc::new(Cell::new(0));
    let i = inner_mounts.clone();
    let inner = Component::new(move |el, _| {
        let (i, el) = (i.clone(), el.clone());
        on_mounted(move || {
            i.set(i.get() + 1);
            el.set_attribute("data-ready", "yes");
        });
    });
    let nested = inner.clone();
    let shell = Component::new(move |_, _| {
        let nested = nested.clone();
        use_template(move || h("main").child(component(&nested)));
    });

    let app = create_app()
        .component("shell", &shell, Options::none())
        .unwrap()
        .run(&root)
        .unwrap();
    doc.event_loop().run_until_idle();

    let anonymous = host.query_selector("ovee-anonymous-1").unwrap().unwrap();
    assert_eq!(anonymous.get_attribute("data-ready").as_deref(), Some("yes"));
    assert_eq!(inner_mounts.get(), 1);
    assert!(app.components().find_instance(&anonymous, &inner).is_some());
}

#[test]
fn test_instance_created_during_setup_outlives_its_creator() {
    let (doc, root) = document_with_root();
    let opener_host = doc.create_element("div");
    opener_host.set_attribute("data-opener", "");
    root.append_child(&opener_host).unwrap();

    let label: Signal<String> = signal("a".to_string());
    let l = label.clone();
    let popup = Component::new(move |_, _| {
        let l = l.clone();
        use_template(move || text(l.get()));
    });
    // Connecting <x-popup> runs its setup inside this one.
    let opener = Component::new(|_, _| {
        let app = use_app().unwrap();
        let popup = app.document().create_element("x-popup");
        app.root().append_child(&popup).unwrap();
    });

    let app = create_app()
        .component("opener", &opener, Options::none())
        .unwrap()
        .component("x-popup", &popup, Options::none())
        .unwrap()
        .run(&root)
        .unwrap();
    doc.event_loop().run_until_idle();
    let popup_el = root.query_selector("x-popup").unwrap().unwrap();
    assert_eq!(popup_el.inner_html(), "a");

    opener_host.remove();
    doc.event_loop().run_until_idle();
    assert!(app.components().instances_of(&opener_host).is_empty());

    label.set("b".to_string());
    doc.event_loop().run_until_idle();
    assert_eq!(popup_el.inner_html(), "b");
}

// =============================================================================
// Renderer
// =============================================================================

fn renderer() -> (Document, EventLoop, Node, Renderer) {
    let doc = Document::new();
    let container = doc.create_element("div");
    doc.body().append_child(&container).unwrap();
    let event_loop = doc.event_loop().clone();
    let renderer = Renderer::new(&container, &Scheduler::new(&event_loop));
    (doc, event_loop, container, renderer)
}

#[test]
fn test_render_is_idempotent() {
    let (doc, event_loop, container, renderer) = renderer();
    let tree = || h("ul").prop("class", "list").children([h("li").child(text("a")), h("li")]);

    renderer.render(tree());
    event_loop.run_until_idle();
    let before = doc.mutation_count();

    renderer.render(tree());
    event_loop.run_until_idle();
    assert_eq!(doc.mutation_count(), before);
}

#[test]
fn test_round_trip_restores_dom() {
    let (_doc, event_loop, container, renderer) = renderer();
    let a = || fragment(vec![h("h1").child(text("title")), h("p").prop("data-x", 1)]);
    let b = || fragment(vec![h("p").child(text("body")), text("tail")]);

    renderer.render(a());
    event_loop.run_until_idle();
    let first = container.inner_html();

    renderer.render(b());
    event_loop.run_until_idle();
    assert_eq!(container.inner_html(), "<p>body</p>tail");

    renderer.render(a());
    event_loop.run_until_idle();
    assert_eq!(container.inner_html(), first);
}

#[test]
fn test_renders_commit_in_schedule_order() {
    let (_doc, event_loop, container, renderer) = renderer();
    let first = renderer.render(paragraph("one"));
    let second = renderer.render(paragraph("two"));
    let order = Rc::new(RefCell::new(Vec::new()));
    let (o1, o2) = (order.clone(), order.clone());
    first.then(move || o1.borrow_mut().push(1));
    second.then(move || o2.borrow_mut().push(2));

    event_loop.run_until_idle();
    assert_eq!(*order.borrow(), vec![1, 2]);
    assert_eq!(container.inner_html(), "<div><p>two</p></div>");
    assert_eq!(renderer.commit_count(), 2);
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_mount_is_idempotent(mounts in 1usize..6, unmounts in 1usize..6) {
        let (doc, root) = document_with_root();
        let host = doc.create_element("div");
        host.set_attribute("data-probe", "");
        root.append_child(&host).unwrap();
        let probe = Component::new(|_, _| ());
        let app = create_app()
            .component("probe", &probe, Options::none())
            .unwrap()
            .run(&root)
            .unwrap();
        doc.event_loop().run_until_idle();

        let instance = app.get_component(&host, "probe").unwrap().unwrap();
        let (m, u) = (Rc::new(Cell::new(0)), Rc::new(Cell::new(0)));
        let (mc, uc) = (m.clone(), u.clone());
        instance.on_mounted(move || mc.set(mc.get() + 1));
        instance.on_unmounted(move || uc.set(uc.get() + 1));

        for _ in 0..unmounts {
            instance.unmount();
        }
        for _ in 0..mounts {
            instance.mount();
        }
        prop_assert_eq!(u.get(), 1);
        prop_assert_eq!(m.get(), 1);
        prop_assert!(instance.is_mounted());
    }

    #[test]
    fn prop_rerender_same_text_is_free(words in proptest::collection::vec("[a-z]{1,8}", 1..6)) {
        let (doc, event_loop, container, renderer) = renderer();
        let tree = |words: &[String]| h("ol").children(words.iter().map(|w| h("li").child(text(w.as_str()))));

        renderer.render(tree(&words[..]));
        event_loop.run_until_idle();
        let before = doc.mutation_count();
        renderer.render(tree(&words[..]));
        event_loop.run_until_idle();
        prop_assert_eq!(doc.mutation_count(), before);
        prop_assert_eq!(container.query_selector_all("li").unwrap().len(), words.len());
    }
}
