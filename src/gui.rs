//! The engine context.
//!
//! [`Gui`] owns every piece of process-wide state: the scripting runtime,
//! the extension registry, the element tree, popups, pointer state and the
//! draw-list buffers. Extensions receive it in every callback and use its
//! methods as their host interface.

use std::any::Any;
use std::path::{Path, PathBuf};
use std::time::Instant;

use mlua::Lua;

use crate::draw_list::DrawListBatcher;
use crate::element::{ClipRect, Element, ElementId, Layout, LayoutId, Rect, Widget, WidgetId};
use crate::error::{GuiError, Result};
use crate::events::PointerState;
use crate::extension::host;
use crate::extension::{
    Extension, ExtensionId, ExtensionLibrary, ExtensionRegistry, ExtensionVTable, NativeEntries,
};
use crate::popup::PopupStack;
use crate::scene::{DefaultsStack, InferenceRule, SceneSource};
use crate::stats::BuildStats;
use crate::text::GlyphAtlas;
use crate::tree::ElementTree;
use crate::watch::SourceWatcher;

#[derive(Debug, Clone)]
pub struct GuiConfig {
    pub width: u32,
    pub height: u32,
    /// Font height handed to extensions when no glyph atlas is installed.
    pub font_height: i32,
    /// Watch the scene file and extension libraries for changes, picked up
    /// by [`Gui::reload`].
    pub auto_reload: bool,
}

impl Default for GuiConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            font_height: 24,
            auto_reload: false,
        }
    }
}

impl GuiConfig {
    pub fn width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.height = height;
        self
    }

    pub fn font_height(mut self, font_height: i32) -> Self {
        self.font_height = font_height;
        self
    }

    pub fn auto_reload(mut self, auto_reload: bool) -> Self {
        self.auto_reload = auto_reload;
        self
    }
}

pub struct Gui {
    pub(crate) config: GuiConfig,
    pub(crate) lua: Lua,
    pub(crate) registry: ExtensionRegistry,
    pub(crate) tree: ElementTree,
    pub(crate) inference: Vec<InferenceRule>,
    pub(crate) defaults: DefaultsStack,
    /// Elements whose parse callback is currently running, innermost last.
    pub(crate) open_nodes: Vec<ElementId>,
    pub(crate) pointer: PointerState,
    pub(crate) popups: PopupStack,
    pub(crate) batcher: DrawListBatcher,
    pub(crate) glyphs: GlyphAtlas,
    source: Option<SceneSource>,
    watcher: Option<SourceWatcher>,
    stats: Option<BuildStats>,
}

impl Gui {
    pub fn new(config: GuiConfig) -> Self {
        Self::with_lua(config, Lua::new())
    }

    /// Use an existing Lua state, e.g. one with host functions installed.
    pub fn with_lua(config: GuiConfig, lua: Lua) -> Self {
        Self {
            config,
            lua,
            registry: ExtensionRegistry::new(),
            tree: ElementTree::new(),
            inference: Vec::new(),
            defaults: DefaultsStack::new(),
            open_nodes: Vec::new(),
            pointer: PointerState::default(),
            popups: PopupStack::new(),
            batcher: DrawListBatcher::new(),
            glyphs: GlyphAtlas::default(),
            source: None,
            watcher: None,
            stats: None,
        }
    }

    pub fn config(&self) -> &GuiConfig {
        &self.config
    }

    /// The scripting runtime. Extensions must not keep values from it past
    /// the callback that provided them.
    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    // Extensions

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// Register an in-process extension. Malformed tables and duplicate names
    /// are rejected without touching the registry.
    pub fn register_extension(&mut self, name: &str, vtable: ExtensionVTable) -> Result<ExtensionId> {
        let extension = Extension::new(name, vtable)?;
        self.add_extension(extension)
    }

    /// Load and register a native extension module. Its entry points are
    /// resolved once here and again whenever the library is reopened.
    pub fn register_shared_library(&mut self, name: &str, path: impl AsRef<Path>) -> Result<ExtensionId> {
        let (library, entries) = ExtensionLibrary::open(path.as_ref())?;
        let extension = Extension::from_native(name, entries, Some(library))?;
        self.add_extension(extension)
    }

    /// Register C ABI entry points linked into the host, e.g. the
    /// `native_entries()` of a module built with
    /// [`export_extension!`](crate::export_extension).
    pub fn register_native_extension(&mut self, name: &str, entries: NativeEntries) -> Result<ExtensionId> {
        let extension = Extension::from_native(name, entries, None)?;
        self.add_extension(extension)
    }

    fn add_extension(&mut self, extension: Extension) -> Result<ExtensionId> {
        let name = extension.name().to_string();
        let kind = extension.kind();
        let id = self.registry.insert(extension).map_err(|err| {
            log::error!("{}", err);
            err
        })?;
        log::info!("Registered {:?} extension \"{}\"", kind, name);
        self.init_extension(id);
        Ok(id)
    }

    fn init_extension(&mut self, id: ExtensionId) {
        let Some(extension) = self.registry.get(id) else {
            return;
        };
        let font_height = self.font_height();
        if let Some(entries) = extension.native() {
            host::init_native(&entries, font_height);
        } else if let Some(init) = extension.vtable().init {
            init(self, font_height);
        }
    }

    /// Remove an extension by name. Refused while a scene is built, since
    /// live elements refer to extensions by position.
    pub fn unregister_extension(&mut self, name: &str) -> bool {
        if !self.tree.is_empty() {
            log::error!(
                "Cannot unregister extension \"{}\" while a scene is built",
                name
            );
            return false;
        }
        self.registry.remove(name).is_some()
    }

    pub(crate) fn vtable_of(&self, id: ElementId) -> Option<ExtensionVTable> {
        self.tree
            .element(id)
            .and_then(|element| self.registry.vtable(element.extension()))
    }

    /// Name of the extension that owns `id`.
    pub fn extension_name(&self, id: impl Into<ElementId>) -> Option<&str> {
        let element = self.tree.element(id.into())?;
        self.registry
            .get(element.extension())
            .map(Extension::name)
    }

    // Building

    /// Build the scene in the Lua file at `path`.
    pub fn build(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        self.source = Some(SceneSource::File(path.clone()));

        if self.config.auto_reload {
            let watched: Vec<PathBuf> = std::iter::once(path)
                .chain(
                    self.registry
                        .iter()
                        .filter_map(|(_, extension)| extension.path().map(Path::to_path_buf)),
                )
                .collect();
            self.watcher = match SourceWatcher::new(watched) {
                Ok(watcher) => Some(watcher),
                Err(err) => {
                    log::warn!("Hot reloading disabled, cannot start file watcher: {}", err);
                    None
                }
            };
        }

        self.rebuild()
    }

    /// Build a scene from Lua source held in memory.
    pub fn build_source(&mut self, name: &str, source: &str) -> Result<()> {
        self.source = Some(SceneSource::Inline {
            name: name.to_string(),
            source: source.to_string(),
        });
        self.watcher = None;
        self.rebuild()
    }

    /// Rebuild when a watched file changed since the last call. Returns
    /// whether a rebuild happened.
    pub fn reload(&mut self) -> Result<bool> {
        let changed = self.watcher.as_mut().is_some_and(SourceWatcher::poll);
        if changed {
            self.rebuild()?;
        }
        Ok(changed)
    }

    /// Tear down the current tree, run the scene script again and build the
    /// result. Library-backed extensions are reopened along the way.
    pub fn rebuild(&mut self) -> Result<()> {
        let source = self.source.clone().ok_or(GuiError::NoSource)?;
        let start = Instant::now();
        let mut stats = BuildStats::default();

        if !self.tree.is_empty() {
            let destroy = Instant::now();
            self.destroy(true);
            stats.destroy = destroy.elapsed();
        }

        let script = Instant::now();
        if let Err(err) = source.execute(&self.lua) {
            log::error!("Lua error when building GUI: {}", err);
            return Err(err);
        }
        stats.script = script.elapsed();

        if let Err(err) = self.parse_scene(&mut stats) {
            log::error!("Failed to build GUI: {}", err);
            self.teardown_tree();
            return Err(err);
        }

        let build = Instant::now();
        self.build_all();
        stats.build = build.elapsed();

        stats.widgets = self.tree.iter_widgets().count();
        stats.layouts = self.tree.layout_count();
        stats.total = start.elapsed();
        stats.log();
        self.stats = Some(stats);
        Ok(())
    }

    pub fn last_build_stats(&self) -> Option<&BuildStats> {
        self.stats.as_ref()
    }

    /// Destroy the tree. With `keep_extensions` the registry survives (native
    /// modules are reopened and initialized again); otherwise it is emptied
    /// and extensions must be registered again before the next build.
    pub fn destroy(&mut self, keep_extensions: bool) {
        self.teardown_tree();

        if keep_extensions {
            for id in self.registry.reopen_libraries() {
                self.init_extension(id);
            }
        } else {
            self.registry.clear();
        }
    }

    /// Destroy every element, children before parents, and reset all state
    /// that refers to the tree.
    fn teardown_tree(&mut self) {
        for id in self.tree.teardown_order() {
            self.destroy_element_data(id);
        }
        self.tree.clear();
        self.popups.clear();
        self.pointer = PointerState::default();
        self.batcher.clear();
        self.inference.clear();
        self.defaults.clear();
        self.open_nodes.clear();
    }

    /// Store the new resolution and rebuild.
    pub fn resolution_changed(&mut self, width: u32, height: u32) -> Result<()> {
        self.config.width = width;
        self.config.height = height;
        if self.source.is_some() {
            self.rebuild()
        } else {
            Ok(())
        }
    }

    // Tree access

    pub fn tree(&self) -> &ElementTree {
        &self.tree
    }

    pub fn root(&self) -> Option<ElementId> {
        self.tree.root()
    }

    pub fn widget(&self, id: WidgetId) -> Option<&Widget> {
        self.tree.widget(id)
    }

    pub fn widget_mut(&mut self, id: WidgetId) -> Option<&mut Widget> {
        self.tree.widget_mut(id)
    }

    pub fn layout(&self, id: LayoutId) -> Option<&Layout> {
        self.tree.layout(id)
    }

    pub fn layout_mut(&mut self, id: LayoutId) -> Option<&mut Layout> {
        self.tree.layout_mut(id)
    }

    pub fn element(&self, id: impl Into<ElementId>) -> Option<&Element> {
        self.tree.element(id.into())
    }

    pub fn element_mut(&mut self, id: impl Into<ElementId>) -> Option<&mut Element> {
        self.tree.element_mut(id.into())
    }

    pub fn children(&self, id: impl Into<ElementId>) -> &[ElementId] {
        self.tree.children(id.into())
    }

    pub fn parent(&self, id: impl Into<ElementId>) -> Option<ElementId> {
        self.tree.parent(id.into())
    }

    pub fn bounds(&self, id: impl Into<ElementId>) -> Option<Rect> {
        self.element(id).map(|element| element.bounds)
    }

    pub fn set_bounds(&mut self, id: impl Into<ElementId>, bounds: Rect) {
        if let Some(element) = self.element_mut(id) {
            element.bounds = bounds;
        }
    }

    /// Install an element's private data. It is handed to the extension's
    /// destroy callback when the element is torn down.
    pub fn set_data<T: Any>(&mut self, id: impl Into<ElementId>, data: T) {
        let id = id.into();
        let Some(element) = self.tree.element_mut(id) else {
            log::warn!("Ignoring data for missing element {:?}", id);
            return;
        };
        if element.set_data(Box::new(data)).is_some() {
            log::debug!("Replaced private data of {:?}", id);
        }
    }

    pub fn data<T: Any>(&self, id: impl Into<ElementId>) -> Option<&T> {
        self.element(id).and_then(Element::data::<T>)
    }

    pub fn data_mut<T: Any>(&mut self, id: impl Into<ElementId>) -> Option<&mut T> {
        self.element_mut(id).and_then(Element::data_mut::<T>)
    }

    pub fn named(&self, name: &str) -> Option<ElementId> {
        self.tree.named(name)
    }

    /// Show or hide the widgets under `id`, `depth` widget levels deep
    /// (`None` for the whole subtree).
    pub fn set_visible(&mut self, id: impl Into<ElementId>, visible: bool, depth: Option<u32>) {
        self.tree.set_visible(id.into(), visible, depth);
    }

    /// Clip every widget under `id`. `None` removes clipping.
    pub fn set_clip_rect(&mut self, id: impl Into<ElementId>, clip: Option<Rect>) {
        let clip = clip.map_or(ClipRect::NONE, ClipRect::pack);
        self.tree.set_clip(id.into(), clip);
    }

    // Accessors forwarded to the owning extension

    pub fn query_number(&self, id: impl Into<ElementId>, key: &str) -> Option<f32> {
        let id = id.into();
        let query = self.vtable_of(id)?.query_number?;
        query(self, id, key)
    }

    pub fn query_string(&self, id: impl Into<ElementId>, key: &str) -> Option<String> {
        let id = id.into();
        let query = self.vtable_of(id)?.query_string?;
        query(self, id, key)
    }

    pub fn set_number(&mut self, id: impl Into<ElementId>, key: &str, value: f32) -> bool {
        let id = id.into();
        match self.vtable_of(id).and_then(|vtable| vtable.set_number) {
            Some(set) => set(self, id, key, value),
            None => false,
        }
    }

    pub fn set_string(&mut self, id: impl Into<ElementId>, key: &str, value: &str) -> bool {
        let id = id.into();
        match self.vtable_of(id).and_then(|vtable| vtable.set_string) {
            Some(set) => set(self, id, key, value),
            None => false,
        }
    }

    /// Diagnostic message from an extension.
    pub fn message(&self, message: &str) {
        log::info!("GUI message: {}", message);
    }
}

impl Drop for Gui {
    fn drop(&mut self) {
        // Element data may hold code from extension libraries, so it goes
        // before the registry closes them.
        self.teardown_tree();
    }
}
