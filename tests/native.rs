//! C ABI extensions linked into the host and registered in-process.

mod support;

#[path = "fixtures/native_panel/src/lib.rs"]
mod native_panel;

use guise::mlua::Table;
use guise::prelude::*;

use support::named_widget;

const SCENE: &str = r##"
layout = {
    type = "stack",
    {
        type = "native_panel", name = "outer", label = "ab", color = "#FF0000",
        padding = 10, value = 2,
        { type = "panel", name = "inner" },
    },
}
"##;

fn native_gui() -> Gui {
    let mut gui = support::gui();
    gui.set_glyph_atlas(GlyphAtlas::monospace(8.0, 16.0));
    gui.register_native_extension("native_panel", native_panel::native_entries())
        .unwrap();
    gui.build_source("native", SCENE).unwrap();
    gui
}

#[test]
fn test_native_widget_parses_and_lays_out_children() {
    let gui = native_gui();
    let outer = named_widget(&gui, "outer");
    let inner = named_widget(&gui, "inner");

    assert_eq!(gui.parent(inner), Some(ElementId::from(outer)));
    assert_eq!(gui.bounds(outer), Some(Rect::new(0.0, 0.0, 100.0, 100.0)));
    assert_eq!(gui.bounds(inner), Some(Rect::new(10.0, 10.0, 80.0, 80.0)));

    // One background quad and a quad per label glyph.
    let widget = gui.widget(outer).unwrap();
    assert_eq!(widget.vertices().len(), 12);
    assert_eq!(widget.vertices()[0].color, [255, 0, 0, 255]);
    assert_eq!(gui.extension_name(outer), Some("native_panel"));
}

#[test]
fn test_native_accessors_cross_the_boundary() {
    let mut gui = native_gui();
    let outer = named_widget(&gui, "outer");

    assert_eq!(gui.query_number(outer, "value"), Some(2.0));
    assert!(gui.set_number(outer, "value", 7.5));
    assert_eq!(gui.query_number(outer, "value"), Some(7.5));
    assert!(!gui.set_number(outer, "missing", 1.0));

    assert_eq!(gui.query_string(outer, "label").as_deref(), Some("ab"));
    assert_eq!(gui.query_string(outer, "missing"), None);
    assert!(!gui.set_string(outer, "label", "no setter"));

    assert_eq!(gui.query_number(outer, "font_height"), Some(16.0));
}

#[test]
fn test_native_click_reaches_module() {
    let mut gui = native_gui();
    let outer = named_widget(&gui, "outer");

    // Inside the padding, where only the outer panel is hit.
    gui.update(3, 3);
    assert_eq!(gui.hovered(), Some(outer));
    gui.mouse_down(3, 3);
    gui.mouse_up(3, 3);
    assert_eq!(gui.query_number(outer, "clicks"), Some(1.0));
}

#[test]
fn test_native_measure_reads_attributes() {
    let gui = native_gui();
    let element: Table = gui
        .lua()
        .load("return { type = 'native_panel', width = 30, height = 12 }")
        .eval()
        .unwrap();
    assert_eq!(gui.measure(&element), (30, 12));
    assert_eq!(gui.count(&element), 1);
}

#[test]
fn test_native_data_is_released_on_teardown() {
    let mut gui = native_gui();
    let before = native_panel::dropped_panels();

    gui.destroy(true);
    assert!(gui.tree().is_empty());
    assert_eq!(native_panel::dropped_panels(), before + 1);

    // In-process modules survive and build again.
    gui.rebuild().unwrap();
    let outer = named_widget(&gui, "outer");
    assert_eq!(gui.query_number(outer, "clicks"), Some(0.0));
}
