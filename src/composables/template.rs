//! Reactive templates.

use std::rc::Rc;

use spark_signals::{effect, on_scope_dispose};

use crate::engine::inject_component;
use crate::render::{Renderer, VNode};

/// Render `render()` into the component's element, and render again
/// whenever a signal it reads changes.
///
/// Mounted callbacks of the component wait for the pending render, so they
/// see the rendered DOM. Rendering stops when the component is destroyed.
///
/// ```ignore
/// let counter = Component::new(|_, _| {
///     let count = signal(0);
///     use_template(move || h("b").child(text(count.get().to_string())));
/// });
/// ```
pub fn use_template(render: impl Fn() -> VNode + 'static) -> Option<Renderer> {
    let instance = inject_component("use_template")?;
    let app = instance.app()?;

    let renderer = Renderer::with_namespace(
        instance.element(),
        app.scheduler(),
        &app.config().namespace,
    );
    renderer.set_resolver(Rc::new(app.downgrade()));

    let weak = Rc::downgrade(&instance);
    let for_effect = renderer.clone();
    let _stop = effect(move || {
        let tree = render();
        let task = for_effect.render(tree);
        if let Some(instance) = weak.upgrade() {
            instance.set_render_promise(task);
        }
    });

    let for_dispose = renderer.clone();
    on_scope_dispose(move || for_dispose.dispose());
    Some(renderer)
}
