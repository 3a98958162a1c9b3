//! Popups: layered, input-isolated overlays.
//!
//! Opening a popup tags every widget of the supplied subtrees with a fresh
//! [`PopupMask`] and lifts them above everything else. While a popup is open
//! input only reaches widgets carrying the top popup's mask.

use crate::element::{ElementId, PopupMask, WidgetId};
use crate::gui::Gui;

/// When a popup closes on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloseOn {
    /// Only when closed explicitly.
    #[default]
    Never,
    /// When the pointer leaves both the popup and its owner.
    HoverExit,
    /// On a press that hits none of the popup's widgets.
    ClickOutside,
}

impl CloseOn {
    /// Parse the attribute spelling used in scenes.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" | "never" => Some(CloseOn::Never),
            "hover" => Some(CloseOn::HoverExit),
            "click" => Some(CloseOn::ClickOutside),
            _ => None,
        }
    }

    /// Encoding used across the native extension boundary. Unknown values
    /// read as [`CloseOn::Never`].
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => CloseOn::HoverExit,
            2 => CloseOn::ClickOutside,
            _ => CloseOn::Never,
        }
    }

    pub fn to_raw(self) -> u32 {
        match self {
            CloseOn::Never => 0,
            CloseOn::HoverExit => 1,
            CloseOn::ClickOutside => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popup {
    /// Widget that was hovered when the popup opened.
    pub owner: Option<WidgetId>,
    pub close_on: CloseOn,
    /// Hovered widget, scoped to this popup.
    pub hovered: Option<WidgetId>,
    /// Pressed widget, scoped to this popup.
    pub pressed: Option<WidgetId>,
    pub mask: PopupMask,
}

#[derive(Debug, Default)]
pub struct PopupStack {
    popups: Vec<Popup>,
    next_mask: u32,
}

impl PopupStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mask no earlier popup has used.
    pub(crate) fn allocate_mask(&mut self) -> PopupMask {
        let mask = PopupMask(self.next_mask);
        self.next_mask = self.next_mask.wrapping_add(1);
        mask
    }

    pub(crate) fn push(&mut self, popup: Popup) {
        self.popups.push(popup);
    }

    pub(crate) fn pop(&mut self) -> Option<Popup> {
        self.popups.pop()
    }

    pub fn top(&self) -> Option<&Popup> {
        self.popups.last()
    }

    pub(crate) fn top_mut(&mut self) -> Option<&mut Popup> {
        self.popups.last_mut()
    }

    /// The popup directly beneath the top one.
    pub fn below_top(&self) -> Option<&Popup> {
        self.popups.len().checked_sub(2).map(|index| &self.popups[index])
    }

    /// Popups from the bottom of the stack to the top.
    pub fn iter(&self) -> std::slice::Iter<'_, Popup> {
        self.popups.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Popup> {
        self.popups.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.popups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.popups.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.popups.clear();
    }
}

impl Gui {
    /// Open `roots` as a popup above everything currently shown.
    ///
    /// The first widget level of each root is made visible, the whole subtree
    /// is moved to a new top layer and tagged with a fresh mask. The owner is
    /// the widget hovered in the current input scope.
    pub fn open_popup(&mut self, roots: &[ElementId], close_on: CloseOn) -> PopupMask {
        let owner = match self.popups.top() {
            Some(popup) => popup.hovered,
            None => self.pointer.hovered,
        };
        let layer = self
            .tree
            .max_layer()
            .map_or(1, |layer| layer.saturating_add(1).max(1));
        let mask = self.popups.allocate_mask();

        for root in roots {
            self.tree.set_visible(*root, true, Some(1));
            self.tree.set_layer(*root, layer);
            self.tree.set_mask(*root, Some(mask));
        }

        self.popups.push(Popup {
            owner,
            close_on,
            hovered: None,
            pressed: None,
            mask,
        });
        self.pointer.popup_opened_while_down = self.pointer.button_down;

        log::debug!(
            "Opened popup {:?} on layer {} (owner {:?}, {:?})",
            mask,
            layer,
            owner,
            close_on
        );
        mask
    }

    /// Close the top popup.
    pub fn close_popup(&mut self) {
        self.close_popups(1);
    }

    /// Close the top `count` popups, top first.
    ///
    /// Every widget of a closing popup gets `OnExit`, is hidden and loses its
    /// mask; then the popup's owner gets `OnPopupClosed`. The popup is off the
    /// stack before any callback runs.
    pub fn close_popups(&mut self, count: usize) {
        for _ in 0..count {
            let Some(popup) = self.popups.pop() else {
                break;
            };

            let members: Vec<WidgetId> = self
                .tree
                .iter_widgets()
                .filter(|(_, widget)| widget.mask == Some(popup.mask))
                .map(|(id, _)| id)
                .collect();

            for id in members {
                if let Some(on_exit) = self.vtable_of(id.into()).and_then(|vtable| vtable.on_exit) {
                    on_exit(self, id);
                }
                if let Some(widget) = self.tree.widget_mut(id) {
                    widget.visible = false;
                    widget.mask = None;
                }
                if self.pointer.captured == Some(id.into()) {
                    self.pointer.captured = None;
                }
            }

            if let Some(owner) = popup.owner {
                if let Some(on_popup_closed) = self
                    .vtable_of(owner.into())
                    .and_then(|vtable| vtable.on_popup_closed)
                {
                    let button_down = self.pointer.button_down;
                    on_popup_closed(self, owner, button_down);
                }
            }

            log::debug!("Closed popup {:?}", popup.mask);
        }
    }

    pub fn popups(&self) -> &PopupStack {
        &self.popups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn popup(mask: u32) -> Popup {
        Popup {
            owner: None,
            close_on: CloseOn::Never,
            hovered: None,
            pressed: None,
            mask: PopupMask(mask),
        }
    }

    #[test]
    fn test_close_on_parse() {
        assert_eq!(CloseOn::parse("hover"), Some(CloseOn::HoverExit));
        assert_eq!(CloseOn::parse("click"), Some(CloseOn::ClickOutside));
        assert_eq!(CloseOn::parse("none"), Some(CloseOn::Never));
        assert_eq!(CloseOn::parse("sometimes"), None);
    }

    #[test]
    fn test_masks_are_fresh() {
        let mut stack = PopupStack::new();
        let first = stack.allocate_mask();
        let second = stack.allocate_mask();
        assert!(second > first);
    }

    #[test]
    fn test_stack_order() {
        let mut stack = PopupStack::new();
        assert!(stack.below_top().is_none());
        stack.push(popup(0));
        assert!(stack.below_top().is_none());
        stack.push(popup(1));

        assert_eq!(stack.top().unwrap().mask, PopupMask(1));
        assert_eq!(stack.below_top().unwrap().mask, PopupMask(0));
        stack.iter_mut().next().unwrap().pressed = Some(WidgetId(3));
        assert_eq!(stack.pop().unwrap().mask, PopupMask(1));
        assert_eq!(stack.top().unwrap().pressed, Some(WidgetId(3)));
    }
}
