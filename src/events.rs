//! Pointer input routing.
//!
//! Every event hit-tests the flat widget array: visible widgets whose bounds
//! (and clip rectangle, when set) contain the point, restricted to the top
//! popup's widgets while a popup is open. The highest layer wins, later
//! widgets win ties.

use std::iter;

use crate::element::{ElementId, WidgetId};
use crate::extension::{ChildEventFn, ExtensionVTable};
use crate::gui::Gui;
use crate::popup::CloseOn;

/// Pointer state outside of any popup, plus the global button and capture
/// state.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PointerState {
    /// Hovered widget while no popup is open.
    pub hovered: Option<WidgetId>,
    /// Pressed widget while no popup is open. Like the per-popup slots it
    /// only ever holds the press of the current gesture.
    pub pressed: Option<WidgetId>,
    /// Element holding exclusive mouse ownership.
    pub captured: Option<ElementId>,
    pub button_down: bool,
    /// A popup opened between the last press and release.
    pub popup_opened_while_down: bool,
}

impl Gui {
    /// Topmost widget under the point in the current input scope.
    pub fn hit_test(&self, x: i32, y: i32) -> Option<WidgetId> {
        let (x, y) = (x as f32, y as f32);
        let scope = self.popups.top().map(|popup| popup.mask);

        let mut best: Option<(WidgetId, i32)> = None;
        for (id, widget) in self.tree.iter_widgets() {
            if !widget.visible {
                continue;
            }
            if scope.is_some() && widget.mask != scope {
                continue;
            }
            if !widget.bounds().contains(x, y) || !widget.clip.admits(x, y) {
                continue;
            }
            if best.map_or(true, |(_, layer)| widget.layer >= layer) {
                best = Some((id, widget.layer));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Hovered widget in the current input scope.
    pub fn hovered(&self) -> Option<WidgetId> {
        match self.popups.top() {
            Some(popup) => popup.hovered,
            None => self.pointer.hovered,
        }
    }

    fn set_hovered(&mut self, hovered: Option<WidgetId>) {
        match self.popups.top_mut() {
            Some(popup) => popup.hovered = hovered,
            None => self.pointer.hovered = hovered,
        }
    }

    /// Walk the parent chain of `child` until a handler returns `true`.
    fn notify_ancestors(
        &mut self,
        child: WidgetId,
        x: i32,
        y: i32,
        handler: fn(&ExtensionVTable) -> Option<ChildEventFn>,
    ) {
        let ancestors: Vec<ElementId> = self.tree.ancestors(child.into()).collect();
        for ancestor in ancestors {
            let Some(notify) = self.vtable_of(ancestor).as_ref().and_then(handler) else {
                continue;
            };
            if notify(self, ancestor, child, x, y) {
                break;
            }
        }
    }

    /// Forget every recorded press, in every scope.
    fn clear_pressed(&mut self) {
        self.pointer.pressed = None;
        for popup in self.popups.iter_mut() {
            popup.pressed = None;
        }
    }

    pub fn mouse_down(&mut self, x: i32, y: i32) {
        self.pointer.button_down = true;
        self.clear_pressed();

        let hit = self.hit_test(x, y);
        match self.popups.top_mut() {
            Some(popup) => popup.pressed = hit,
            None => self.pointer.pressed = hit,
        }

        match hit {
            Some(widget) => {
                log::trace!("Mouse down on {:?} at ({}, {})", widget, x, y);
                if let Some(on_click) = self.vtable_of(widget.into()).and_then(|vtable| vtable.on_click) {
                    if on_click(self, widget, x, y) {
                        self.notify_ancestors(widget, x, y, |vtable| vtable.on_child_clicked);
                    }
                }
            }
            None => {
                if self
                    .popups
                    .top()
                    .is_some_and(|popup| popup.close_on == CloseOn::ClickOutside)
                {
                    self.close_popup();
                }
            }
        }
    }

    /// Pick the widget a release belongs to, and whether it still needs a
    /// synthesized click.
    ///
    /// Order: the top popup's pressed widget; the top popup's hovered widget
    /// (which then also gets a synthesized click); unless a popup opened
    /// while the button was down, the unscoped pressed widget when a single
    /// popup is open, or the pressed widget of the popup below the top one.
    fn release_target(&self) -> Option<(WidgetId, bool)> {
        let Some(top) = self.popups.top() else {
            return self.pointer.pressed.map(|widget| (widget, false));
        };

        if let Some(widget) = top.pressed {
            return Some((widget, false));
        }
        if let Some(widget) = top.hovered {
            return Some((widget, true));
        }
        if self.pointer.popup_opened_while_down {
            return None;
        }

        let pressed = match self.popups.below_top() {
            None => self.pointer.pressed,
            Some(below) => below.pressed,
        };
        pressed.map(|widget| (widget, false))
    }

    /// Release the button. The press of this gesture is forgotten afterwards
    /// whether or not a widget received the release.
    pub fn mouse_up(&mut self, x: i32, y: i32) {
        self.pointer.button_down = false;

        if let Some((widget, synthesize_click)) = self.release_target() {
            log::trace!("Mouse up for {:?} at ({}, {})", widget, x, y);
            self.release(widget, synthesize_click, x, y);
        }

        self.clear_pressed();
        self.pointer.popup_opened_while_down = false;
    }

    fn release(&mut self, widget: WidgetId, synthesize_click: bool, x: i32, y: i32) {
        let vtable = self.vtable_of(widget.into()).unwrap_or_default();

        if synthesize_click {
            if let Some(on_click) = vtable.on_click {
                on_click(self, widget, x, y);
            }
        }

        let inside = self
            .tree
            .widget(widget)
            .is_some_and(|state| state.bounds().contains(x as f32, y as f32));
        let handler = if inside {
            vtable.on_release_inside
        } else {
            vtable.on_release_outside
        };
        if let Some(on_release) = handler {
            if on_release(self, widget, x, y) {
                self.notify_ancestors(widget, x, y, |vtable| vtable.on_child_released);
            }
        }
    }

    /// Offer a scroll to the hit widget, then to its ancestors (layouts
    /// included) until one handles it.
    pub fn scroll(&mut self, x: i32, y: i32, dx: i32, dy: i32) {
        let Some(widget) = self.hit_test(x, y) else {
            return;
        };

        let chain: Vec<ElementId> = iter::once(widget.into())
            .chain(self.tree.ancestors(widget.into()))
            .collect();
        for element in chain {
            let Some(on_scroll) = self.vtable_of(element).and_then(|vtable| vtable.on_scroll) else {
                continue;
            };
            if on_scroll(self, element, dx, dy) {
                break;
            }
        }
    }

    /// Per-tick update with the current pointer position: hover-close popups,
    /// refresh hover state, poll widgets with the update flag, then rebatch.
    pub fn update(&mut self, x: i32, y: i32) {
        if self.tree.widget_count() > 0 {
            self.close_hovered_popups(x, y);
            self.update_hover(x, y);
            self.poll_widgets(x, y);
        }
        self.batcher.rebuild(self.tree.widgets_mut());
    }

    /// Close hover popups the pointer has left, from the top down, stopping
    /// at the first popup that stays open.
    fn close_hovered_popups(&mut self, x: i32, y: i32) {
        let (fx, fy) = (x as f32, y as f32);
        let mut count = 0;

        for popup in self.popups.iter().rev() {
            if popup.close_on != CloseOn::HoverExit {
                break;
            }

            let over_popup = self.tree.iter_widgets().any(|(_, widget)| {
                widget.mask == Some(popup.mask)
                    && widget.visible
                    && widget.bounds().contains(fx, fy)
                    && widget.clip.admits(fx, fy)
            });
            let over_owner = popup
                .owner
                .and_then(|owner| self.tree.widget(owner))
                .is_some_and(|owner| owner.bounds().contains(fx, fy));
            if over_popup || over_owner {
                break;
            }
            count += 1;
        }

        if count > 0 {
            self.close_popups(count);
        }
    }

    fn update_hover(&mut self, x: i32, y: i32) {
        if self.pointer.captured.is_some() {
            return;
        }

        let hit = self.hit_test(x, y);
        let previous = self.hovered();
        if hit == previous {
            return;
        }

        if let Some(old) = previous {
            if let Some(on_exit) = self.vtable_of(old.into()).and_then(|vtable| vtable.on_exit) {
                on_exit(self, old);
            }
        }
        self.set_hovered(hit);
        if let Some(new) = hit {
            if let Some(on_enter) = self.vtable_of(new.into()).and_then(|vtable| vtable.on_enter) {
                on_enter(self, new);
            }
        }
    }

    fn poll_widgets(&mut self, x: i32, y: i32) {
        let polled: Vec<WidgetId> = self
            .tree
            .iter_widgets()
            .filter(|(_, widget)| widget.update)
            .map(|(id, _)| id)
            .collect();

        for widget in polled {
            if let Some(on_update) = self.vtable_of(widget.into()).and_then(|vtable| vtable.on_update) {
                on_update(self, widget, x, y);
                self.notify_ancestors(widget, x, y, |vtable| vtable.on_child_update);
            }
        }
    }

    /// Give `element` exclusive mouse ownership. Hover tracking is suspended
    /// until it calls [`free_mouse`](Self::free_mouse).
    pub fn steal_mouse(&mut self, element: ElementId) {
        self.pointer.captured = Some(element);
    }

    /// Release mouse ownership, if `element` holds it.
    pub fn free_mouse(&mut self, element: ElementId) {
        if self.pointer.captured == Some(element) {
            self.pointer.captured = None;
        }
    }

    pub fn mouse_owner(&self) -> Option<ElementId> {
        self.pointer.captured
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }
}
