//! Build a small scene with in-process extensions and print the draw lists.
//!
//! ```bash
//! RUST_LOG=info cargo run --example scene_dump
//! ```

use guise::mlua::Table;
use guise::prelude::*;

const SCENE: &str = r##"
inferred = { { label = "text" } }

layout = {
    type = "column", padding = 8,
    defaults = { color = "#3050A0" },
    { type = "box", name = "header", color = "#202020" },
    { text = "Hello", color = { 255, 255, 255 } },
    { type = "box" },
}
"##;

struct Column {
    padding: f32,
}

fn column_count(gui: &Gui, element: &Table) -> usize {
    child_tables(element).iter().map(|child| gui.count(child)).sum()
}

fn column_parse(
    gui: &mut Gui,
    element: &Table,
    layout: LayoutId,
    first_child: WidgetId,
    defaults: Option<&Table>,
) -> usize {
    let padding = Attributes::new(element, defaults).number_or("padding", 0.0);
    gui.set_data(layout, Column { padding });

    let mut consumed = 0;
    for child in child_tables(element) {
        consumed += gui.parse(&child, first_child.advance(consumed));
    }
    consumed
}

fn column_build(gui: &mut Gui, layout: LayoutId, children: &[ElementId]) {
    let padding = gui.data::<Column>(layout).map_or(0.0, |column| column.padding);
    let Some(bounds) = gui.bounds(layout) else {
        return;
    };
    if children.is_empty() {
        return;
    }

    let inner = bounds.inset(padding);
    let row = inner.height / children.len() as f32;
    for (index, child) in children.iter().enumerate() {
        let cell = Rect::new(inner.x, inner.y + row * index as f32, inner.width, row);
        gui.set_bounds(*child, cell.inset(padding / 2.0));
    }
}

fn box_parse(gui: &mut Gui, element: &Table, widget: WidgetId, defaults: Option<&Table>) -> usize {
    let color = Attributes::new(element, defaults).color_or("color", Color::WHITE);
    gui.set_data(widget, color);
    if let Some(state) = gui.widget_mut(widget) {
        state.allocate_quads(1);
    }
    1
}

fn box_build(gui: &mut Gui, widget: WidgetId) {
    let Some(color) = gui.data::<Color>(widget).copied() else {
        return;
    };
    if let Some(state) = gui.widget_mut(widget) {
        let bounds = state.bounds();
        state.push_colored_quad(bounds, color);
    }
}

struct Label {
    text: String,
    color: Color,
    origin: Origin,
}

fn label_parse(gui: &mut Gui, element: &Table, widget: WidgetId, defaults: Option<&Table>) -> usize {
    let attributes = Attributes::new(element, defaults);
    let text = attributes.string_or("text", "");
    let label = Label {
        color: attributes.color_or("color", Color::WHITE),
        origin: Origin::from_attributes(&attributes),
        text,
    };
    let quads = label.text.chars().count();
    gui.set_data(widget, label);
    if let Some(state) = gui.widget_mut(widget) {
        state.allocate_quads(quads);
    }
    1
}

fn label_build(gui: &mut Gui, widget: WidgetId) {
    let Some(bounds) = gui.bounds(widget) else {
        return;
    };
    let Some((text, color, origin)) = gui
        .data::<Label>(widget)
        .map(|label| (label.text.clone(), label.color, label.origin))
    else {
        return;
    };
    let (x, y) = origin.anchor(bounds);
    gui.create_aligned_text(widget, &text, color, origin, x, y);
}

fn main() -> guise::Result<()> {
    env_logger::init();

    let mut gui = Gui::new(GuiConfig::default().width(320).height(240));
    gui.set_glyph_atlas(GlyphAtlas::monospace(8.0, 16.0));

    gui.register_extension(
        "column",
        ExtensionVTable {
            count: Some(column_count),
            parse_layout: Some(column_parse),
            build_layout: Some(column_build),
            ..Default::default()
        },
    )?;
    gui.register_extension(
        "box",
        ExtensionVTable {
            parse_widget: Some(box_parse),
            build_widget: Some(box_build),
            ..Default::default()
        },
    )?;
    gui.register_extension(
        "label",
        ExtensionVTable {
            parse_widget: Some(label_parse),
            build_widget: Some(label_build),
            ..Default::default()
        },
    )?;

    gui.build_source("scene_dump", SCENE)?;
    gui.update(0, 0);

    for (index, list) in gui.draw_lists().iter().enumerate() {
        println!(
            "list {}: layer {} clip {:?} vertices {:?} indices {:?}",
            index,
            list.layer,
            list.clip_rect(),
            list.vertex_range(),
            list.index_range()
        );
    }
    for (id, widget) in gui.tree().iter_widgets() {
        println!(
            "widget {} ({}): {:?}, {} vertices",
            id.index(),
            gui.extension_name(id).unwrap_or("?"),
            widget.bounds(),
            widget.vertices().len()
        );
    }

    let bytes: &[u8] = bytemuck::cast_slice(gui.draw_vertices());
    println!("{} vertex bytes ready for upload", bytes.len());
    Ok(())
}
