//! A container widget shipped as a native extension module.
//!
//! Draws a colored quad with its label centered on it and stacks any child
//! elements in rows inside its padding. Clicks are counted and exposed
//! through the accessors together with `value` and the font height seen by
//! `Init`.

use std::cell::Cell;
use std::sync::atomic::{AtomicI32, Ordering};

use guise::extension::module::{Host, Source};
use guise::{Color, ElementId, Origin, Rect, WidgetId};

static FONT_HEIGHT: AtomicI32 = AtomicI32::new(0);

thread_local! {
    static DROPPED: Cell<usize> = const { Cell::new(0) };
}

/// Panels released on this thread so far.
pub fn dropped_panels() -> usize {
    DROPPED.with(Cell::get)
}

struct Panel {
    label: String,
    color: Color,
    padding: f32,
    clicks: Cell<u32>,
    value: Cell<f32>,
}

impl Drop for Panel {
    fn drop(&mut self) {
        DROPPED.with(|dropped| dropped.set(dropped.get() + 1));
    }
}

fn init(font_height: i32) {
    FONT_HEIGHT.store(font_height, Ordering::Relaxed);
}

fn count(host: &Host, source: &Source<'_>) -> usize {
    1 + (0..source.child_count())
        .map(|index| host.count_child(source, index))
        .sum::<usize>()
}

fn measure(_: &Host, source: &Source<'_>) -> (i32, i32) {
    (
        source.number_or("width", -1.0) as i32,
        source.number_or("height", -1.0) as i32,
    )
}

fn parse(host: &mut Host, source: &Source<'_>, widget: WidgetId) -> usize {
    let panel = Panel {
        label: source.string_or("label", ""),
        color: source.color_or("color", Color::WHITE),
        padding: source.number_or("padding", 0.0),
        clicks: Cell::new(0),
        value: Cell::new(source.number_or("value", 0.0)),
    };
    let quads = 1 + panel.label.chars().count();
    host.set_data(widget, panel);
    host.allocate_quads(widget, quads);

    let mut consumed = 1;
    for index in 0..source.child_count() {
        consumed += host.parse_child(source, index, widget.advance(consumed));
    }
    consumed
}

fn build_children(host: &mut Host, widget: WidgetId, children: &[ElementId]) {
    let (Some(bounds), Some(padding)) = (
        host.bounds(widget),
        host.data::<Panel>(widget).map(|panel| panel.padding),
    ) else {
        return;
    };
    let inner = bounds.inset(padding);
    let row = inner.height / children.len().max(1) as f32;
    for (index, child) in children.iter().enumerate() {
        let cell = Rect::new(inner.x, inner.y + row * index as f32, inner.width, row);
        host.set_bounds(*child, cell);
    }
}

fn build(host: &mut Host, widget: WidgetId) {
    let Some(bounds) = host.bounds(widget) else {
        return;
    };
    let Some((label, color)) = host
        .data::<Panel>(widget)
        .map(|panel| (panel.label.clone(), panel.color))
    else {
        return;
    };
    host.push_colored_quad(widget, bounds, color);
    let (x, y) = Origin::CENTER.anchor(bounds);
    host.create_text(widget, &label, Color::BLACK, Origin::CENTER, x, y);
}

fn click(host: &mut Host, widget: WidgetId, _: i32, _: i32) -> bool {
    if let Some(panel) = host.data::<Panel>(widget) {
        panel.clicks.set(panel.clicks.get() + 1);
    }
    false
}

fn query_number(host: &Host, element: ElementId, key: &str) -> Option<f32> {
    if key == "font_height" {
        return Some(FONT_HEIGHT.load(Ordering::Relaxed) as f32);
    }
    let panel = host.data::<Panel>(element)?;
    match key {
        "clicks" => Some(panel.clicks.get() as f32),
        "value" => Some(panel.value.get()),
        _ => None,
    }
}

fn query_string(host: &Host, element: ElementId, key: &str) -> Option<String> {
    let panel = host.data::<Panel>(element)?;
    (key == "label").then(|| panel.label.clone())
}

fn set_number(host: &mut Host, element: ElementId, key: &str, value: f32) -> bool {
    match host.data::<Panel>(element) {
        Some(panel) if key == "value" => {
            panel.value.set(value);
            true
        }
        _ => false,
    }
}

guise::export_extension! {
    init: init,
    count: count,
    measure: measure,
    parse_widget: parse,
    build_children: build_children,
    build_widget: build,
    on_click: click,
    query_number: query_number,
    query_string: query_string,
    set_number: set_number,
}
