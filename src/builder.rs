//! Two-pass tree construction: count, then parse.
//!
//! The count pass sums how many flat widget slots the whole scene needs, so
//! the widget array can be sized once. The parse pass then walks the scene
//! again, resolving each element's extension and handing it a slot in the
//! array to parse into.

use std::time::Instant;

use mlua::{Table, Value};

use crate::element::{ElementId, Rect, WidgetId};
use crate::error::{GuiError, Result};
use crate::extension::ExtensionId;
use crate::gui::Gui;
use crate::scene::{dump_element, infer_type, parse_inference_rules, Attributes};
use crate::stats::BuildStats;

impl Gui {
    /// Resolve the extension for an element, from its `type` attribute or by
    /// type inference. Failures are logged with a dump of the element.
    pub(crate) fn resolve_extension(&self, element: &Table) -> Option<ExtensionId> {
        let type_name = match Attributes::new(element, None).string("type") {
            Some(type_name) => type_name,
            None => match infer_type(&self.inference, element) {
                Some(inferred) => inferred.to_string(),
                None => {
                    log::error!(
                        "No type given and couldn't infer type\n{}",
                        dump_element(element)
                    );
                    return None;
                }
            },
        };

        let extension = self.registry.find(&type_name);
        if extension.is_none() {
            log::error!(
                "Unknown element type \"{}\"\n{}",
                type_name,
                dump_element(element)
            );
        }
        extension
    }

    /// Flat widget slots needed by `element` and its descendants. Elements of
    /// unknown type need none.
    pub fn count(&self, element: &Table) -> usize {
        let Some(extension) = self.resolve_extension(element) else {
            return 0;
        };
        match self.registry.vtable(extension).and_then(|vtable| vtable.count) {
            Some(count) => count(self, element),
            None => 1,
        }
    }

    /// Intrinsic size of `element`, `-1` on an axis meaning no preference.
    pub fn measure(&self, element: &Table) -> (i32, i32) {
        let Some(extension) = self.resolve_extension(element) else {
            return (-1, -1);
        };
        match self.registry.vtable(extension).and_then(|vtable| vtable.measure) {
            Some(measure) => measure(self, element),
            None => (-1, -1),
        }
    }

    /// Parse `element` as a child of the element currently being parsed,
    /// starting at widget slot `slot`. Returns the number of slots consumed.
    pub fn parse(&mut self, element: &Table, slot: WidgetId) -> usize {
        self.parse_node(element, slot).1
    }

    pub(crate) fn parse_node(&mut self, element: &Table, slot: WidgetId) -> (Option<ElementId>, usize) {
        let Some(extension) = self.resolve_extension(element) else {
            return (None, 0);
        };
        let Some(vtable) = self.registry.vtable(extension) else {
            return (None, 0);
        };

        let pushed = match self.defaults.enter(&self.lua, element) {
            Ok(pushed) => pushed,
            Err(err) => {
                log::error!("Failed to read defaults: {}", err);
                false
            }
        };
        let defaults = self.defaults.top().cloned();
        let name = Attributes::new(element, None).string("name");
        let parent = self.open_nodes.last().copied();

        let parsed = if let Some(parse_layout) = vtable.parse_layout {
            let layout = self.tree.push_layout(extension, parent);
            self.register_parsed_name(name.as_deref(), layout.into());

            self.open_nodes.push(layout.into());
            let consumed = parse_layout(self, element, layout, slot, defaults.as_ref());
            self.open_nodes.pop();
            (Some(layout.into()), consumed)
        } else if let Some(parse_widget) = vtable.parse_widget {
            if self.tree.place_widget(slot, extension, parent) {
                self.register_parsed_name(name.as_deref(), slot.into());

                self.open_nodes.push(slot.into());
                let consumed = parse_widget(self, element, slot, defaults.as_ref());
                self.open_nodes.pop();
                if let Some(widget) = self.tree.widget_mut(slot) {
                    widget.seal_geometry();
                }

                if consumed == 0 {
                    log::debug!("Widget in slot {} parsed to nothing, dropping it", slot.index());
                    self.discard_element(slot.into());
                    (None, 0)
                } else {
                    (Some(slot.into()), consumed)
                }
            } else {
                (None, 0)
            }
        } else {
            (None, 0)
        };

        if pushed {
            self.defaults.exit();
        }

        parsed
    }

    fn register_parsed_name(&mut self, name: Option<&str>, id: ElementId) {
        if let Some(name) = name {
            self.tree.register_name(name, id);
        }
    }

    /// Run an extension's destroy callback on an element's private data, then
    /// drop the data.
    pub(crate) fn destroy_element_data(&mut self, id: ElementId) {
        let Some(element) = self.tree.element_mut(id) else {
            return;
        };
        let extension = element.extension();
        let Some(mut data) = element.take_data() else {
            return;
        };
        if let Some(destroy) = self.registry.vtable(extension).and_then(|vtable| vtable.destroy) {
            destroy(&self.lua, &mut data);
        }
    }

    /// Destroy a subtree's data, children first, and remove it from the tree.
    pub(crate) fn discard_element(&mut self, id: ElementId) {
        for element in self.tree.post_order(id) {
            self.destroy_element_data(element);
        }
        self.tree.discard(id);
    }

    /// Count and parse the scene left in the Lua globals by the scene script.
    pub(crate) fn parse_scene(&mut self, stats: &mut BuildStats) -> Result<()> {
        let globals = self.lua.globals();

        self.inference = match globals.get::<Value>("inferred")? {
            Value::Table(inferred) => parse_inference_rules(&inferred)?,
            _ => Vec::new(),
        };

        let layout = match globals.get::<Value>("layout")? {
            Value::Table(layout) => layout,
            _ => return Err(GuiError::MissingLayout),
        };

        let mut preparse = Vec::new();
        if let Value::Table(tables) = globals.get::<Value>("preparse_layouts")? {
            for pair in tables.pairs::<String, Value>() {
                if let (name, Value::Table(element)) = pair? {
                    preparse.push((name, element));
                }
            }
        }
        preparse.sort_by(|a, b| a.0.cmp(&b.0));

        let start = Instant::now();
        let mut total = self.count(&layout);
        for (_, element) in &preparse {
            total += self.count(element);
        }
        self.tree.reserve_widgets(total);
        stats.count = start.elapsed();

        let start = Instant::now();
        self.open_nodes.clear();
        self.defaults.clear();

        let mut offset = 0;
        for (name, element) in preparse {
            element.set("name", name.as_str())?;
            let (id, consumed) = self.parse_node(&element, WidgetId(offset));
            offset += consumed;
            match id {
                Some(id) => self.tree.add_preparsed(id),
                None => log::warn!("Preparsed layout \"{}\" produced no element", name),
            }
        }

        let (root, consumed) = self.parse_node(&layout, WidgetId(offset));
        offset += consumed;

        if offset != total {
            log::debug!("Scene counted {} widget slots, parsed {}", total, offset);
        }
        self.tree.truncate_widgets(offset);
        stats.parse = start.elapsed();

        let root = root.ok_or(GuiError::UnparsedRoot)?;
        self.tree.set_root(root);
        let (width, height) = self.resolution();
        if let Some(element) = self.tree.element_mut(root) {
            element.bounds = Rect::new(0.0, 0.0, width as f32, height as f32);
        }

        Ok(())
    }
}
