//! Extensions loaded from a shared library built from the fixture crate.

mod support;

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use guise::prelude::*;
use guise::ExtensionKind;

use support::named_widget;

const SCENE: &str = r##"
layout = {
    type = "stack",
    { type = "native_panel", name = "panel", label = "so", color = "#00FF00", value = 4 },
}
"##;

/// Build the fixture module once per test run.
fn fixture_library() -> &'static Path {
    static LIBRARY: OnceLock<PathBuf> = OnceLock::new();
    LIBRARY.get_or_init(|| {
        let manifest =
            Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/native_panel/Cargo.toml");
        let target_dir = Path::new(env!("CARGO_TARGET_TMPDIR")).join("fixtures");
        let cargo = std::env::var_os("CARGO")
            .or_else(|| option_env!("CARGO").map(Into::into))
            .unwrap_or_else(|| "cargo".into());

        let status = Command::new(cargo)
            .arg("build")
            .arg("--manifest-path")
            .arg(&manifest)
            .arg("--target-dir")
            .arg(&target_dir)
            .status()
            .expect("failed to run cargo");
        assert!(status.success(), "building the fixture module failed");

        target_dir.join("debug").join(format!(
            "{}native_panel{}",
            std::env::consts::DLL_PREFIX,
            std::env::consts::DLL_SUFFIX
        ))
    })
}

fn shared_gui() -> Gui {
    let mut gui = support::gui();
    gui.register_shared_library("native_panel", fixture_library())
        .unwrap();
    gui.build_source("shared", SCENE).unwrap();
    gui
}

#[test]
fn test_register_shared_library_resolves_entries() {
    let gui = shared_gui();
    let id = gui.registry().find("native_panel").unwrap();
    let extension = gui.registry().get(id).unwrap();

    assert_eq!(extension.kind(), ExtensionKind::Widget);
    assert_eq!(extension.path(), Some(fixture_library()));
    assert!(extension.vtable().on_click.is_some());
    assert!(extension.vtable().set_string.is_none());
}

#[test]
fn test_shared_library_widget_builds_and_handles_input() {
    let mut gui = shared_gui();
    let panel = named_widget(&gui, "panel");

    assert_eq!(gui.bounds(panel), Some(Rect::new(0.0, 0.0, 100.0, 100.0)));
    let widget = gui.widget(panel).unwrap();
    assert_eq!(widget.vertices()[0].color, [0, 255, 0, 255]);

    gui.update(50, 50);
    gui.mouse_down(50, 50);
    gui.mouse_up(50, 50);
    assert_eq!(gui.query_number(panel, "clicks"), Some(1.0));

    assert_eq!(gui.query_string(panel, "label").as_deref(), Some("so"));
    assert!(gui.set_number(panel, "value", 9.0));
    assert_eq!(gui.query_number(panel, "value"), Some(9.0));
    assert_eq!(
        gui.query_number(panel, "font_height"),
        Some(gui.font_height() as f32)
    );
}

#[test]
fn test_destroy_keeping_extensions_reopens_library() {
    let mut gui = shared_gui();
    let panel = named_widget(&gui, "panel");
    gui.update(50, 50);
    gui.mouse_down(50, 50);
    gui.mouse_up(50, 50);
    assert_eq!(gui.query_number(panel, "clicks"), Some(1.0));

    gui.destroy(true);
    assert!(gui.tree().is_empty());
    let id = gui.registry().find("native_panel").unwrap();
    assert_eq!(
        gui.registry().get(id).and_then(|extension| extension.path()),
        Some(fixture_library())
    );

    gui.rebuild().unwrap();
    let panel = named_widget(&gui, "panel");
    assert_eq!(gui.query_number(panel, "clicks"), Some(0.0));
    assert_eq!(gui.query_number(panel, "value"), Some(4.0));
}

#[test]
fn test_destroy_dropping_extensions_empties_registry() {
    let mut gui = shared_gui();
    gui.destroy(false);

    assert!(gui.tree().is_empty());
    assert!(gui.registry().is_empty());
    assert!(gui.rebuild().is_err());
}

#[test]
fn test_reopen_of_missing_library_drops_extension() {
    let dir = tempfile::tempdir().unwrap();
    let copy = dir.path().join(fixture_library().file_name().unwrap());
    std::fs::copy(fixture_library(), &copy).unwrap();

    let mut gui = support::gui();
    gui.register_shared_library("native_panel", &copy).unwrap();
    gui.build_source("shared", SCENE).unwrap();

    std::fs::remove_file(&copy).unwrap();
    gui.destroy(true);
    assert!(gui.registry().find("native_panel").is_none());
    assert!(gui.registry().find("stack").is_some());
}
