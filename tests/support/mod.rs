//! In-process extensions that record what the engine asks of them.
#![allow(dead_code)]

use std::any::Any;
use std::cell::RefCell;

use guise::mlua::{Lua, Table};
use guise::prelude::*;

thread_local! {
    static EVENTS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn record(event: impl Into<String>) {
    EVENTS.with(|events| events.borrow_mut().push(event.into()));
}

/// Drain the event log of the current test thread.
pub fn take_events() -> Vec<String> {
    EVENTS.with(|events| std::mem::take(&mut *events.borrow_mut()))
}

/// A 100x100 engine with the stack, panel and menu extensions registered.
pub fn gui() -> Gui {
    init_logger();
    let mut gui = Gui::new(GuiConfig::default().width(100).height(100));
    gui.register_extension("stack", stack_vtable()).unwrap();
    gui.register_extension("panel", panel_vtable()).unwrap();
    gui.register_extension("menu", menu_vtable()).unwrap();
    take_events();
    gui
}

/// Engine with `source` built and the event log cleared.
pub fn build(source: &str) -> Gui {
    let mut gui = gui();
    gui.build_source("test", source).unwrap();
    take_events();
    gui
}

pub fn named_widget(gui: &Gui, name: &str) -> WidgetId {
    gui.named(name)
        .and_then(ElementId::as_widget)
        .unwrap_or_else(|| panic!("no widget named {name}"))
}

// Stack: a layout that splits its bounds into equal rows.

pub struct StackData {
    pub label: String,
    pub stop: bool,
}

pub fn stack_vtable() -> ExtensionVTable {
    ExtensionVTable {
        count: Some(stack_count),
        parse_layout: Some(stack_parse),
        build_layout: Some(stack_build),
        destroy: Some(stack_destroy),
        on_scroll: Some(stack_scroll),
        on_child_clicked: Some(stack_child_clicked),
        on_child_released: Some(stack_child_released),
        ..Default::default()
    }
}

fn stack_count(gui: &Gui, element: &Table) -> usize {
    child_tables(element).iter().map(|child| gui.count(child)).sum()
}

fn stack_parse(
    gui: &mut Gui,
    element: &Table,
    layout: LayoutId,
    first_child: WidgetId,
    _defaults: Option<&Table>,
) -> usize {
    let own = Attributes::new(element, None);
    gui.set_data(
        layout,
        StackData {
            label: own.string_or("name", "stack"),
            stop: own.boolean_or("stop", false),
        },
    );

    let mut consumed = 0;
    for child in child_tables(element) {
        consumed += gui.parse(&child, first_child.advance(consumed));
    }
    consumed
}

fn stack_build(gui: &mut Gui, layout: LayoutId, children: &[ElementId]) {
    let Some(bounds) = gui.bounds(layout) else {
        return;
    };
    if children.is_empty() {
        return;
    }
    let row = bounds.height / children.len() as f32;
    for (index, child) in children.iter().enumerate() {
        gui.set_bounds(
            *child,
            Rect::new(bounds.x, bounds.y + row * index as f32, bounds.width, row),
        );
    }
}

fn stack_destroy(_: &Lua, data: &mut Box<dyn Any>) {
    if let Some(stack) = data.downcast_ref::<StackData>() {
        record(format!("destroy:{}", stack.label));
    }
}

fn stack_event(gui: &Gui, layout: ElementId, event: &str) -> bool {
    let Some(stack) = gui.data::<StackData>(layout) else {
        return false;
    };
    record(format!("{}:{}", event, stack.label));
    stack.stop
}

fn stack_scroll(gui: &mut Gui, element: ElementId, _: i32, _: i32) -> bool {
    stack_event(gui, element, "scroll")
}

fn stack_child_clicked(gui: &mut Gui, ancestor: ElementId, _: WidgetId, _: i32, _: i32) -> bool {
    stack_event(gui, ancestor, "child_clicked")
}

fn stack_child_released(gui: &mut Gui, ancestor: ElementId, _: WidgetId, _: i32, _: i32) -> bool {
    stack_event(gui, ancestor, "child_released")
}

// Panel: a single colored quad.

pub struct PanelData {
    pub label: String,
    pub color: Color,
    pub value: f32,
    pub a: i32,
    pub b: i32,
    pub bubble: bool,
    pub capture: bool,
}

pub fn panel_vtable() -> ExtensionVTable {
    ExtensionVTable {
        parse_widget: Some(panel_parse),
        build_widget: Some(panel_build),
        destroy: Some(panel_destroy),
        on_enter: Some(panel_enter),
        on_exit: Some(panel_exit),
        on_click: Some(panel_click),
        on_release_inside: Some(panel_release_inside),
        on_release_outside: Some(panel_release_outside),
        on_update: Some(panel_update),
        query_number: Some(panel_query_number),
        query_string: Some(panel_query_string),
        set_number: Some(panel_set_number),
        ..Default::default()
    }
}

fn panel_parse(gui: &mut Gui, element: &Table, widget: WidgetId, defaults: Option<&Table>) -> usize {
    let attributes = Attributes::new(element, defaults);
    if attributes.boolean_or("skip", false) {
        return 0;
    }

    gui.set_data(
        widget,
        PanelData {
            label: Attributes::new(element, None).string_or("name", "panel"),
            color: attributes.color_or("color", Color::WHITE),
            value: attributes.number_or("value", 0.0),
            a: attributes.integer_or("a", 0),
            b: attributes.integer_or("b", 0),
            bubble: attributes.boolean_or("bubble", false),
            capture: attributes.boolean_or("capture", false),
        },
    );
    if attributes.boolean_or("reject", false) {
        return 0;
    }

    if let Some(state) = gui.widget_mut(widget) {
        state.allocate_quads(1);
        state.visible = !attributes.boolean_or("hidden", false);
        state.update = attributes.boolean_or("poll", false);
    }
    1
}

fn panel_build(gui: &mut Gui, widget: WidgetId) {
    let Some(color) = gui.data::<PanelData>(widget).map(|panel| panel.color) else {
        return;
    };
    if let Some(state) = gui.widget_mut(widget) {
        let bounds = state.bounds();
        state.push_colored_quad(bounds, color);
    }
}

fn panel_destroy(_: &Lua, data: &mut Box<dyn Any>) {
    if let Some(panel) = data.downcast_ref::<PanelData>() {
        record(format!("destroy:{}", panel.label));
    }
}

fn panel_label(gui: &Gui, widget: WidgetId) -> String {
    gui.data::<PanelData>(widget)
        .map(|panel| panel.label.clone())
        .unwrap_or_default()
}

fn panel_bubbles(gui: &Gui, widget: WidgetId) -> bool {
    gui.data::<PanelData>(widget).is_some_and(|panel| panel.bubble)
}

fn panel_enter(gui: &mut Gui, widget: WidgetId) {
    record(format!("enter:{}", panel_label(gui, widget)));
}

fn panel_exit(gui: &mut Gui, widget: WidgetId) {
    record(format!("exit:{}", panel_label(gui, widget)));
}

fn panel_click(gui: &mut Gui, widget: WidgetId, _: i32, _: i32) -> bool {
    record(format!("click:{}", panel_label(gui, widget)));
    if gui.data::<PanelData>(widget).is_some_and(|panel| panel.capture) {
        gui.steal_mouse(widget.into());
    }
    panel_bubbles(gui, widget)
}

fn panel_release_inside(gui: &mut Gui, widget: WidgetId, _: i32, _: i32) -> bool {
    record(format!("release_inside:{}", panel_label(gui, widget)));
    gui.free_mouse(widget.into());
    panel_bubbles(gui, widget)
}

fn panel_release_outside(gui: &mut Gui, widget: WidgetId, _: i32, _: i32) -> bool {
    record(format!("release_outside:{}", panel_label(gui, widget)));
    gui.free_mouse(widget.into());
    panel_bubbles(gui, widget)
}

fn panel_update(gui: &mut Gui, widget: WidgetId, _: i32, _: i32) {
    record(format!("update:{}", panel_label(gui, widget)));
}

fn panel_query_number(gui: &Gui, element: ElementId, key: &str) -> Option<f32> {
    let panel = gui.data::<PanelData>(element)?;
    match key {
        "value" => Some(panel.value),
        "a" => Some(panel.a as f32),
        "b" => Some(panel.b as f32),
        _ => None,
    }
}

fn panel_query_string(gui: &Gui, element: ElementId, key: &str) -> Option<String> {
    let panel = gui.data::<PanelData>(element)?;
    match key {
        "label" => Some(panel.label.clone()),
        _ => None,
    }
}

fn panel_set_number(gui: &mut Gui, element: ElementId, key: &str, value: f32) -> bool {
    let Some(panel) = gui.data_mut::<PanelData>(element) else {
        return false;
    };
    match key {
        "value" => {
            panel.value = value;
            true
        }
        _ => false,
    }
}

// Menu: opens a preparsed subtree as a popup when clicked.

pub struct MenuData {
    pub label: String,
    pub target: String,
    pub close_on: CloseOn,
    /// Where the target is placed when opened.
    pub popup_at: (f32, f32),
}

pub fn menu_vtable() -> ExtensionVTable {
    ExtensionVTable {
        parse_widget: Some(menu_parse),
        build_widget: Some(menu_build),
        on_click: Some(menu_click),
        on_release_inside: Some(menu_release_inside),
        on_release_outside: Some(menu_release_outside),
        on_enter: Some(menu_enter),
        on_exit: Some(menu_exit),
        on_popup_closed: Some(menu_popup_closed),
        ..Default::default()
    }
}

fn menu_parse(gui: &mut Gui, element: &Table, widget: WidgetId, defaults: Option<&Table>) -> usize {
    let attributes = Attributes::new(element, defaults);
    let close_on = attributes
        .string("close_on")
        .and_then(|value| CloseOn::parse(&value))
        .unwrap_or_default();
    gui.set_data(
        widget,
        MenuData {
            label: Attributes::new(element, None).string_or("name", "menu"),
            target: attributes.string_or("target", ""),
            close_on,
            popup_at: (
                attributes.number_or("popup_x", 0.0),
                attributes.number_or("popup_y", 50.0),
            ),
        },
    );
    if let Some(state) = gui.widget_mut(widget) {
        state.allocate_quads(1);
        state.visible = !attributes.boolean_or("hidden", false);
    }
    1
}

fn menu_build(gui: &mut Gui, widget: WidgetId) {
    if let Some(state) = gui.widget_mut(widget) {
        let bounds = state.bounds();
        state.push_colored_quad(bounds, Color::BLACK);
    }
}

fn menu_label(gui: &Gui, widget: WidgetId) -> String {
    gui.data::<MenuData>(widget)
        .map(|menu| menu.label.clone())
        .unwrap_or_default()
}

fn menu_click(gui: &mut Gui, widget: WidgetId, _: i32, _: i32) -> bool {
    let Some((target, close_on, (x, y))) = gui
        .data::<MenuData>(widget)
        .map(|menu| (menu.target.clone(), menu.close_on, menu.popup_at))
    else {
        return false;
    };
    let Some(target) = gui.named(&target) else {
        return false;
    };

    gui.set_bounds(target, Rect::new(x, y, 50.0, 50.0));
    gui.build_element(target);
    gui.open_popup(&[target], close_on);
    record(format!("open:{}", menu_label(gui, widget)));
    false
}

fn menu_release_inside(gui: &mut Gui, widget: WidgetId, _: i32, _: i32) -> bool {
    record(format!("release_inside:{}", menu_label(gui, widget)));
    false
}

fn menu_release_outside(gui: &mut Gui, widget: WidgetId, _: i32, _: i32) -> bool {
    record(format!("release_outside:{}", menu_label(gui, widget)));
    false
}

fn menu_enter(gui: &mut Gui, widget: WidgetId) {
    record(format!("enter:{}", menu_label(gui, widget)));
}

fn menu_exit(gui: &mut Gui, widget: WidgetId) {
    record(format!("exit:{}", menu_label(gui, widget)));
}

fn menu_popup_closed(gui: &mut Gui, widget: WidgetId, mouse_down: bool) {
    record(format!("popup_closed:{}:{}", menu_label(gui, widget), mouse_down));
}
