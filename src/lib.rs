//! A retained-mode GUI engine whose element types all come from extensions.
//!
//! A scene is a Lua script describing a nested table of elements. Each
//! element names (or lets the engine infer) the extension that implements it.
//! Building a scene runs in three passes:
//!
//! 1. **Count**: every extension reports how many flat widget slots its
//!    element needs, so the widget array is sized once.
//! 2. **Parse**: elements are created in place and their extension reads the
//!    element's attributes into private data.
//! 3. **Build**: a pre-order walk where layouts place their children and
//!    widgets generate their geometry.
//!
//! Extensions are either registered in-process as a table of Rust functions
//! or loaded from native modules that speak a small C ABI
//! ([`extension::abi`]); modules written in Rust use
//! [`extension::module`] and [`export_extension!`].
//!
//! After that the host drives the engine with [`Gui::update`],
//! [`Gui::mouse_down`], [`Gui::mouse_up`] and [`Gui::scroll`], and hands the
//! batched [`Gui::draw_lists`] to its renderer.
//!
//! ```ignore
//! use guise::prelude::*;
//!
//! let mut gui = Gui::new(GuiConfig::default().width(1280).height(720));
//! gui.register_shared_library("button", "target/debug/libbutton.so")?;
//! gui.build("scenes/main.lua")?;
//!
//! loop {
//!     gui.reload()?;
//!     gui.update(mouse_x, mouse_y);
//!     for list in gui.draw_lists() {
//!         // upload gui.draw_vertices()[list.vertex_range()] ...
//!     }
//! }
//! ```

pub mod build_pass;
pub mod builder;
pub mod draw_list;
pub mod element;
pub mod error;
pub mod events;
pub mod extension;
pub mod gui;
pub mod popup;
pub mod scene;
pub mod stats;
pub mod text;
pub mod tree;
pub mod watch;

// In-process extensions read scene elements as `mlua` tables.
pub use mlua;

pub use draw_list::DrawList;
pub use element::{
    ClipRect, Color, Element, ElementId, Layout, LayoutId, PopupMask, Rect, TexCoords, Vertex,
    Widget, WidgetId,
};
pub use error::{GuiError, Result};
pub use extension::{ExtensionId, ExtensionKind, ExtensionVTable, NativeEntries};
pub use gui::{Gui, GuiConfig};
pub use popup::CloseOn;
pub use scene::Attributes;
pub use text::{Glyph, GlyphAtlas, Origin};

pub mod prelude {
    pub use crate::draw_list::DrawList;
    pub use crate::element::{
        ClipRect, Color, ElementId, LayoutId, Rect, TexCoords, Vertex, Widget, WidgetId,
    };
    pub use crate::extension::ExtensionVTable;
    pub use crate::popup::CloseOn;
    pub use crate::scene::{child_tables, Attributes};
    pub use crate::text::{GlyphAtlas, Origin};
    pub use crate::{export_extension, Gui, GuiConfig, GuiError};
}
