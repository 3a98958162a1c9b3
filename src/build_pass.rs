//! The build walk: bounds and geometry.
//!
//! Pre-order: a layout places its children before they build themselves; a
//! widget with children first lays them out through `BuildChildren`, then
//! regenerates its own geometry through `BuildWidget`.

use crate::element::ElementId;
use crate::gui::Gui;

impl Gui {
    /// Build `id` and everything below it. Extensions call this to rebuild a
    /// subtree after changing its bounds, e.g. before opening it as a popup.
    pub fn build_element(&mut self, id: ElementId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            self.build_node(id);
            pending.extend(self.tree.children(id).iter().rev().copied());
        }
    }

    fn build_node(&mut self, id: ElementId) {
        let Some(element) = self.tree.element(id) else {
            return;
        };
        let Some(vtable) = self.registry.vtable(element.extension()) else {
            return;
        };
        let children = element.children().to_vec();

        match id {
            ElementId::Layout(layout) => {
                if let Some(build_layout) = vtable.build_layout {
                    build_layout(self, layout, &children);
                }
            }
            ElementId::Widget(widget) => {
                if !children.is_empty() {
                    if let Some(build_children) = vtable.build_children {
                        build_children(self, widget, &children);
                    }
                }
                if let Some(widget) = self.tree.widget_mut(widget) {
                    widget.reset_cursor();
                    widget.modified = true;
                }
                if let Some(build_widget) = vtable.build_widget {
                    build_widget(self, widget);
                }
            }
        }
    }

    /// Rebuild the whole tree, e.g. after a bounds change on the root.
    pub fn build_all(&mut self) {
        if let Some(root) = self.tree.root() {
            self.build_element(root);
        }
    }
}
