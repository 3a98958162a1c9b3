//! Arena storage for the element tree.
//!
//! Widgets live in one flat array whose size is fixed before parsing starts
//! (see [`crate::builder`]); layouts are pushed into their own list as they
//! are parsed. Nodes refer to each other through [`ElementId`]s, so the
//! child → parent link is a plain index and never an ownership edge.
//!
//! The tree also owns the named registry used by extensions to find one
//! another.

use std::collections::{HashMap, HashSet};

use crate::element::{ClipRect, Element, ElementId, Layout, LayoutId, PopupMask, Widget, WidgetId};
use crate::extension::ExtensionId;

#[derive(Default)]
pub struct ElementTree {
    widgets: Vec<Widget>,
    layouts: Vec<Layout>,
    root: Option<ElementId>,
    /// Named subtrees parsed ahead of the main layout. Not attached to the root.
    preparsed: Vec<ElementId>,
    names: HashMap<String, ElementId>,
}

impl ElementTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size the flat widget array. Every slot starts out vacant.
    pub(crate) fn reserve_widgets(&mut self, count: usize) {
        self.widgets.clear();
        self.widgets.resize_with(count, Widget::vacant);
    }

    /// Drop trailing slots that were reserved but never parsed into.
    pub(crate) fn truncate_widgets(&mut self, len: usize) {
        if len < self.widgets.len() {
            log::debug!(
                "Releasing {} unused widget slots",
                self.widgets.len() - len
            );
            self.widgets.truncate(len);
        }
    }

    /// Turn a vacant slot into a widget owned by `extension` and attach it to
    /// `parent`. Fails for out of range or occupied slots.
    pub(crate) fn place_widget(
        &mut self,
        slot: WidgetId,
        extension: ExtensionId,
        parent: Option<ElementId>,
    ) -> bool {
        match self.widgets.get(slot.0) {
            None => {
                log::error!(
                    "Widget slot {} is out of range ({} slots reserved)",
                    slot.0,
                    self.widgets.len()
                );
                return false;
            }
            Some(widget) if !widget.is_vacant() => {
                log::error!("Widget slot {} is already in use", slot.0);
                return false;
            }
            Some(_) => {}
        }

        self.widgets[slot.0] = Widget::new(extension, parent);
        if let Some(parent) = parent {
            self.attach(parent, slot.into());
        }
        true
    }

    pub(crate) fn push_layout(&mut self, extension: ExtensionId, parent: Option<ElementId>) -> LayoutId {
        let id = LayoutId(self.layouts.len());
        self.layouts.push(Layout::new(extension, parent));
        if let Some(parent) = parent {
            self.attach(parent, id.into());
        }
        id
    }

    fn attach(&mut self, parent: ElementId, child: ElementId) {
        if let Some(element) = self.element_mut(parent) {
            element.push_child(child);
        }
    }

    /// Remove a subtree from the tree: it is detached from its parent, its
    /// widget slots become vacant and its names are unregistered.
    ///
    /// Private data must have been destroyed by the caller.
    pub(crate) fn discard(&mut self, id: ElementId) {
        if let Some(parent) = self.parent(id) {
            if let Some(element) = self.element_mut(parent) {
                element.remove_child(id);
            }
        }

        let subtree: HashSet<ElementId> = self.post_order(id).into_iter().collect();
        self.names.retain(|_, named| !subtree.contains(named));
        for element in &subtree {
            if let ElementId::Widget(widget) = element {
                if let Some(slot) = self.widgets.get_mut(widget.0) {
                    *slot = Widget::vacant();
                }
            }
        }
        if self.root.is_some_and(|root| subtree.contains(&root)) {
            self.root = None;
        }
        self.preparsed.retain(|root| !subtree.contains(root));
    }

    pub fn root(&self) -> Option<ElementId> {
        self.root
    }

    pub(crate) fn set_root(&mut self, root: ElementId) {
        self.root = Some(root);
    }

    pub fn preparsed(&self) -> &[ElementId] {
        &self.preparsed
    }

    pub(crate) fn add_preparsed(&mut self, root: ElementId) {
        self.preparsed.push(root);
    }

    /// Register `name` for `id`. The first registration wins; later ones are
    /// rejected with a logged conflict.
    pub fn register_name(&mut self, name: &str, id: ElementId) -> bool {
        if let Some(existing) = self.names.get(name) {
            log::error!(
                "Multiple elements named \"{}\" ({:?} is already registered, ignoring {:?})",
                name,
                existing,
                id
            );
            return false;
        }
        self.names.insert(name.to_string(), id);
        true
    }

    pub fn named(&self, name: &str) -> Option<ElementId> {
        self.names.get(name).copied()
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        match id {
            ElementId::Widget(id) => self.widget(id).map(|widget| &widget.element),
            ElementId::Layout(id) => self.layout(id).map(|layout| &layout.element),
        }
    }

    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        match id {
            ElementId::Widget(id) => self.widget_mut(id).map(|widget| &mut widget.element),
            ElementId::Layout(id) => self.layout_mut(id).map(|layout| &mut layout.element),
        }
    }

    /// The widget in `id`'s slot, `None` for vacant slots.
    pub fn widget(&self, id: WidgetId) -> Option<&Widget> {
        self.widgets.get(id.0).filter(|widget| !widget.is_vacant())
    }

    pub fn widget_mut(&mut self, id: WidgetId) -> Option<&mut Widget> {
        self.widgets.get_mut(id.0).filter(|widget| !widget.is_vacant())
    }

    pub fn layout(&self, id: LayoutId) -> Option<&Layout> {
        self.layouts.get(id.0)
    }

    pub fn layout_mut(&mut self, id: LayoutId) -> Option<&mut Layout> {
        self.layouts.get_mut(id.0)
    }

    /// The flat widget array, including vacant slots.
    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    pub(crate) fn widgets_mut(&mut self) -> &mut [Widget] {
        &mut self.widgets
    }

    /// Occupied widget slots with their ids.
    pub fn iter_widgets(&self) -> impl Iterator<Item = (WidgetId, &Widget)> {
        self.widgets
            .iter()
            .enumerate()
            .filter(|(_, widget)| !widget.is_vacant())
            .map(|(index, widget)| (WidgetId(index), widget))
    }

    pub fn widget_count(&self) -> usize {
        self.widgets.len()
    }

    pub fn layout_count(&self) -> usize {
        self.layouts.len()
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.element(id).and_then(Element::parent)
    }

    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.element(id).map(Element::children).unwrap_or(&[])
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: ElementId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    pub fn is_within(&self, id: ElementId, ancestor: ElementId) -> bool {
        id == ancestor || self.ancestors(id).any(|parent| parent == ancestor)
    }

    /// Subtree of `id` with children ahead of their parent.
    pub fn post_order(&self, id: ElementId) -> Vec<ElementId> {
        let mut order = Vec::new();
        let mut stack = vec![(id, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            stack.push((id, true));
            for child in self.children(id).iter().rev() {
                stack.push((*child, false));
            }
        }
        order
    }

    /// Every live element, children before parents: the main tree, then the
    /// preparsed subtrees, then anything left unattached.
    pub fn teardown_order(&self) -> Vec<ElementId> {
        let mut order = Vec::new();
        for root in self.root.iter().chain(&self.preparsed) {
            order.extend(self.post_order(*root));
        }

        let seen: HashSet<ElementId> = order.iter().copied().collect();
        let leftovers: Vec<ElementId> = self
            .iter_widgets()
            .map(|(id, _)| ElementId::from(id))
            .chain((0..self.layouts.len()).map(|index| LayoutId(index).into()))
            .filter(|id| !seen.contains(id))
            .collect();
        order.extend(leftovers);
        order
    }

    /// Show or hide widgets under `id`.
    ///
    /// `depth` counts widget levels, layouts are transparent: `Some(1)` only
    /// touches the first widgets reached, `None` the whole subtree.
    pub fn set_visible(&mut self, id: ElementId, visible: bool, depth: Option<u32>) {
        self.walk_widgets(id, depth, |widget| widget.visible = visible);
    }

    /// Set the layer of every widget under `id`.
    pub fn set_layer(&mut self, id: ElementId, layer: i32) {
        self.walk_widgets(id, None, |widget| widget.layer = layer);
    }

    pub fn set_mask(&mut self, id: ElementId, mask: Option<PopupMask>) {
        self.walk_widgets(id, None, |widget| widget.mask = mask);
    }

    pub fn set_clip(&mut self, id: ElementId, clip: ClipRect) {
        self.walk_widgets(id, None, |widget| widget.clip = clip);
    }

    fn walk_widgets(&mut self, id: ElementId, depth: Option<u32>, mut apply: impl FnMut(&mut Widget)) {
        let mut stack = vec![(id, 0_u32)];
        while let Some((id, mut level)) = stack.pop() {
            if let ElementId::Widget(widget) = id {
                if let Some(widget) = self.widget_mut(widget) {
                    apply(widget);
                }
                level += 1;
            }
            if depth.map_or(true, |depth| level < depth) {
                stack.extend(self.children(id).iter().map(|child| (*child, level)));
            }
        }
    }

    /// Highest layer among live widgets.
    pub fn max_layer(&self) -> Option<i32> {
        self.iter_widgets().map(|(_, widget)| widget.layer).max()
    }

    pub fn clear(&mut self) {
        self.widgets.clear();
        self.layouts.clear();
        self.root = None;
        self.preparsed.clear();
        self.names.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none() && self.preparsed.is_empty() && self.widgets.is_empty()
    }
}

pub struct Ancestors<'a> {
    tree: &'a ElementTree,
    next: Option<ElementId>,
}

impl Iterator for Ancestors<'_> {
    type Item = ElementId;

    fn next(&mut self) -> Option<ElementId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}
