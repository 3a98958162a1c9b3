//! Extension registry and the plugin contract.
//!
//! Every element type is supplied by an extension: a table of entry points
//! resolved once, at registration time, into an [`ExtensionVTable`]. Exactly
//! one of `parse_layout` / `parse_widget` must be present and decides whether
//! the extension produces [`Layout`](crate::element::Layout)s or
//! [`Widget`](crate::element::Widget)s. Every other entry is optional and
//! falls back to a documented default when absent.
//!
//! In-process extensions fill the table with Rust functions. Native modules
//! export `extern "C"` entry points instead (see [`abi`]); the registry wraps
//! those in trampolines so both kinds are dispatched through the same table.
//!
//! Extensions are kept in an append-only list; an [`ExtensionId`] is the
//! position in that list and stays valid until the registry is cleared.

pub mod abi;
pub mod export;
pub(crate) mod host;
pub mod library;
pub mod module;

use std::any::Any;
use std::path::{Path, PathBuf};

use mlua::{Lua, Table};

use crate::element::{ElementId, LayoutId, WidgetId};
use crate::error::{GuiError, Result};
use crate::gui::Gui;

pub use abi::NativeEntries;
pub use library::ExtensionLibrary;

/// Position of an extension in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtensionId(pub(crate) usize);

impl ExtensionId {
    /// Marker carried by widget slots that hold no parsed widget.
    pub(crate) const VACANT: ExtensionId = ExtensionId(usize::MAX);

    pub fn index(self) -> usize {
        self.0
    }
}

/// Called once at registration with the font height.
pub type InitFn = fn(&mut Gui, i32);
/// Number of flat widget slots the element and its descendants need. Default: 1.
pub type CountFn = fn(&Gui, &Table) -> usize;
/// Intrinsic size hint, `-1` on an axis means no opinion. Default: `(-1, -1)`.
pub type MeasureFn = fn(&Gui, &Table) -> (i32, i32);
/// Parse a layout. Children are parsed into the flat array starting at the
/// given slot. Returns the number of slots consumed.
pub type ParseLayoutFn = fn(&mut Gui, &Table, LayoutId, WidgetId, Option<&Table>) -> usize;
/// Parse a widget into its slot. Returns the number of slots consumed,
/// including the widget itself.
pub type ParseWidgetFn = fn(&mut Gui, &Table, WidgetId, Option<&Table>) -> usize;
pub type BuildLayoutFn = fn(&mut Gui, LayoutId, &[ElementId]);
pub type BuildWidgetFn = fn(&mut Gui, WidgetId);
pub type BuildChildrenFn = fn(&mut Gui, WidgetId, &[ElementId]);
/// Release whatever the private data block owns. The block itself is dropped
/// by the engine afterwards.
pub type DestroyFn = fn(&Lua, &mut Box<dyn Any>);
pub type HoverFn = fn(&mut Gui, WidgetId);
/// Pointer handlers. Returning `true` asks the engine to notify ancestors.
pub type PointerFn = fn(&mut Gui, WidgetId, i32, i32) -> bool;
pub type ScrollFn = fn(&mut Gui, ElementId, i32, i32) -> bool;
pub type UpdateFn = fn(&mut Gui, WidgetId, i32, i32);
pub type PopupClosedFn = fn(&mut Gui, WidgetId, bool);
/// Ancestor notification. Returning `true` stops the walk.
pub type ChildEventFn = fn(&mut Gui, ElementId, WidgetId, i32, i32) -> bool;
pub type QueryNumberFn = fn(&Gui, ElementId, &str) -> Option<f32>;
pub type QueryStringFn = fn(&Gui, ElementId, &str) -> Option<String>;
pub type SetNumberFn = fn(&mut Gui, ElementId, &str, f32) -> bool;
pub type SetStringFn = fn(&mut Gui, ElementId, &str, &str) -> bool;

/// The capability table of one extension.
#[derive(Clone, Copy, Default)]
pub struct ExtensionVTable {
    // Setup
    pub init: Option<InitFn>,
    pub count: Option<CountFn>,
    pub measure: Option<MeasureFn>,
    pub parse_layout: Option<ParseLayoutFn>,
    pub parse_widget: Option<ParseWidgetFn>,
    pub build_layout: Option<BuildLayoutFn>,
    pub build_widget: Option<BuildWidgetFn>,
    pub build_children: Option<BuildChildrenFn>,
    pub destroy: Option<DestroyFn>,
    // Events
    pub on_enter: Option<HoverFn>,
    pub on_exit: Option<HoverFn>,
    pub on_click: Option<PointerFn>,
    pub on_release_inside: Option<PointerFn>,
    pub on_release_outside: Option<PointerFn>,
    pub on_scroll: Option<ScrollFn>,
    pub on_update: Option<UpdateFn>,
    pub on_popup_closed: Option<PopupClosedFn>,
    pub on_child_clicked: Option<ChildEventFn>,
    pub on_child_released: Option<ChildEventFn>,
    pub on_child_update: Option<ChildEventFn>,
    // Accessors
    pub query_number: Option<QueryNumberFn>,
    pub query_string: Option<QueryStringFn>,
    pub set_number: Option<SetNumberFn>,
    pub set_string: Option<SetStringFn>,
}

impl ExtensionVTable {
    /// Which node variant this table produces, or why it produces none.
    pub fn kind(&self) -> std::result::Result<ExtensionKind, &'static str> {
        match (self.parse_layout.is_some(), self.parse_widget.is_some()) {
            (true, false) => Ok(ExtensionKind::Layout),
            (false, true) => Ok(ExtensionKind::Widget),
            (true, true) => Err("both ParseLayout and ParseWidget are present"),
            (false, false) => Err("neither ParseLayout nor ParseWidget is present"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionKind {
    Layout,
    Widget,
}

/// A registered extension.
pub struct Extension {
    name: String,
    kind: ExtensionKind,
    vtable: ExtensionVTable,
    /// Entry points behind the vtable's trampolines, for native modules.
    native: Option<NativeEntries>,
    // Dropped last: native entries point into the library.
    library: Option<ExtensionLibrary>,
}

impl Extension {
    /// Validate a capability table. Fails when the parse entry points are
    /// missing or ambiguous.
    pub fn new(name: impl Into<String>, vtable: ExtensionVTable) -> Result<Self> {
        Self::validate(name.into(), vtable, None, None)
    }

    /// An extension backed by native entry points, loaded from `library` or
    /// linked into the host.
    pub fn from_native(
        name: impl Into<String>,
        entries: NativeEntries,
        library: Option<ExtensionLibrary>,
    ) -> Result<Self> {
        let vtable = host::native_vtable(&entries);
        Self::validate(name.into(), vtable, Some(entries), library)
    }

    fn validate(
        name: String,
        vtable: ExtensionVTable,
        native: Option<NativeEntries>,
        library: Option<ExtensionLibrary>,
    ) -> Result<Self> {
        let kind = vtable
            .kind()
            .map_err(|reason| GuiError::MalformedExtension {
                name: name.clone(),
                reason,
            })?;

        Ok(Self {
            name,
            kind,
            vtable,
            native,
            library,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ExtensionKind {
        self.kind
    }

    pub fn vtable(&self) -> &ExtensionVTable {
        &self.vtable
    }

    pub fn native(&self) -> Option<NativeEntries> {
        self.native
    }

    /// Path of the native library, `None` for in-process extensions.
    pub fn path(&self) -> Option<&Path> {
        self.library.as_ref().map(|library| library.path())
    }
}

/// Append-only list of extensions, indexed by [`ExtensionId`].
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: Vec<Extension>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn get(&self, id: ExtensionId) -> Option<&Extension> {
        self.extensions.get(id.0)
    }

    /// Copy of an extension's capability table.
    pub fn vtable(&self, id: ExtensionId) -> Option<ExtensionVTable> {
        self.get(id).map(|extension| extension.vtable)
    }

    pub fn find(&self, name: &str) -> Option<ExtensionId> {
        self.extensions
            .iter()
            .position(|extension| extension.name == name)
            .map(ExtensionId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ExtensionId, &Extension)> {
        self.extensions
            .iter()
            .enumerate()
            .map(|(index, extension)| (ExtensionId(index), extension))
    }

    /// Append an extension. A name already in use is rejected and the
    /// registry is left untouched.
    pub fn insert(&mut self, extension: Extension) -> Result<ExtensionId> {
        if self.find(&extension.name).is_some() {
            return Err(GuiError::DuplicateExtension(extension.name));
        }
        self.extensions.push(extension);
        Ok(ExtensionId(self.extensions.len() - 1))
    }

    /// Remove an extension by name. Ids of later extensions shift down, so
    /// this must not run while a tree is alive.
    pub fn remove(&mut self, name: &str) -> Option<Extension> {
        let id = self.find(name)?;
        Some(self.extensions.remove(id.0))
    }

    pub fn clear(&mut self) {
        self.extensions.clear();
    }

    /// Reopen every library-backed extension from its path so rebuilt
    /// modules are picked up. In-process extensions are kept as they are.
    ///
    /// Returns the ids whose `Init` has to run again. Extensions that fail to
    /// reload are dropped with a logged error.
    pub(crate) fn reopen_libraries(&mut self) -> Vec<ExtensionId> {
        let mut reopened = Vec::new();
        let previous = std::mem::take(&mut self.extensions);

        for extension in previous {
            let Some(path) = extension.path().map(Path::to_path_buf) else {
                self.extensions.push(extension);
                continue;
            };
            let name = extension.name.clone();
            // Close the old handle before opening the new one.
            drop(extension);

            match reopen(&name, path) {
                Ok(extension) => {
                    self.extensions.push(extension);
                    reopened.push(ExtensionId(self.extensions.len() - 1));
                }
                Err(err) => log::error!("Failed to reload extension \"{}\": {}", name, err),
            }
        }

        reopened
    }
}

fn reopen(name: &str, path: PathBuf) -> Result<Extension> {
    let (library, entries) = ExtensionLibrary::open(path)?;
    Extension::from_native(name, entries, Some(library))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_widget(_: &mut Gui, _: &Table, _: WidgetId, _: Option<&Table>) -> usize {
        1
    }

    fn parse_layout(_: &mut Gui, _: &Table, _: LayoutId, _: WidgetId, _: Option<&Table>) -> usize {
        0
    }

    fn widget_vtable() -> ExtensionVTable {
        ExtensionVTable {
            parse_widget: Some(parse_widget),
            ..Default::default()
        }
    }

    #[test]
    fn test_kind_requires_exactly_one_parse_entry() {
        assert_eq!(widget_vtable().kind(), Ok(ExtensionKind::Widget));

        let layout = ExtensionVTable {
            parse_layout: Some(parse_layout),
            ..Default::default()
        };
        assert_eq!(layout.kind(), Ok(ExtensionKind::Layout));

        let both = ExtensionVTable {
            parse_layout: Some(parse_layout),
            parse_widget: Some(parse_widget),
            ..Default::default()
        };
        assert!(both.kind().is_err());
        assert!(ExtensionVTable::default().kind().is_err());
    }

    #[test]
    fn test_native_entries_pick_the_node_kind() {
        unsafe extern "C" fn parse(
            _: *mut abi::HostContext,
            _: *const abi::SourceHandle,
            _: u32,
            _: u32,
        ) -> u32 {
            0
        }

        let entries = NativeEntries {
            parse_layout: Some(parse),
            ..Default::default()
        };
        let extension = Extension::from_native("row", entries, None).unwrap();
        assert_eq!(extension.kind(), ExtensionKind::Layout);
        assert!(extension.vtable().parse_layout.is_some());
        assert!(extension.vtable().on_click.is_none());
        assert!(extension.native().is_some());

        let empty = Extension::from_native("empty", NativeEntries::default(), None);
        assert!(matches!(empty, Err(GuiError::MalformedExtension { .. })));
    }

    #[test]
    fn test_malformed_extension_is_rejected() {
        let result = Extension::new("broken", ExtensionVTable::default());
        assert!(matches!(
            result,
            Err(GuiError::MalformedExtension { ref name, .. }) if name == "broken"
        ));
    }

    #[test]
    fn test_registry_rejects_duplicate_names() {
        let mut registry = ExtensionRegistry::new();
        let first = registry
            .insert(Extension::new("panel", widget_vtable()).unwrap())
            .unwrap();
        let second = registry.insert(Extension::new("panel", widget_vtable()).unwrap());

        assert!(matches!(second, Err(GuiError::DuplicateExtension(_))));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.find("panel"), Some(first));
    }

    #[test]
    fn test_registry_remove_and_reopen_keep_in_process_extensions() {
        let mut registry = ExtensionRegistry::new();
        registry
            .insert(Extension::new("a", widget_vtable()).unwrap())
            .unwrap();
        registry
            .insert(Extension::new("b", widget_vtable()).unwrap())
            .unwrap();

        assert!(registry.reopen_libraries().is_empty());
        assert_eq!(registry.len(), 2);

        assert!(registry.remove("a").is_some());
        assert_eq!(registry.find("b"), Some(ExtensionId(0)));
        assert!(registry.remove("a").is_none());
    }
}
