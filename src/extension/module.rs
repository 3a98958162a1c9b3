//! Module side of the native extension ABI.
//!
//! [`Host`] wraps the [`HostFunctions`] table and the context pointer of the
//! running entry point in safe methods, and [`Source`] reads the attributes
//! of the scene element being parsed. Handlers written against these types
//! are exported with [`export_extension!`](crate::export_extension).
//!
//! Read-only entry points (`Count`, `Measure` and the queries) receive a
//! `&Host`; everything that changes the engine takes `&mut Host`.

use std::any::Any;
use std::ffi::c_void;
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use super::abi::{
    read_returned_string, write_str, HostContext, HostFunctions, SourceHandle, ABI_VERSION,
};
use crate::element::{Color, ElementId, LayoutId, PopupMask, Rect, TexCoords, WidgetId};
use crate::popup::CloseOn;
use crate::text::Origin;

pub type InitHandler = fn(i32);
pub type CountHandler = fn(&Host, &Source<'_>) -> usize;
pub type MeasureHandler = fn(&Host, &Source<'_>) -> (i32, i32);
pub type ParseLayoutHandler = fn(&mut Host, &Source<'_>, LayoutId, WidgetId) -> usize;
pub type ParseWidgetHandler = fn(&mut Host, &Source<'_>, WidgetId) -> usize;
pub type BuildLayoutHandler = fn(&mut Host, LayoutId, &[ElementId]);
pub type BuildWidgetHandler = fn(&mut Host, WidgetId);
pub type BuildChildrenHandler = fn(&mut Host, WidgetId, &[ElementId]);
pub type HoverHandler = fn(&mut Host, WidgetId);
pub type PointerHandler = fn(&mut Host, WidgetId, i32, i32) -> bool;
pub type ScrollHandler = fn(&mut Host, ElementId, i32, i32) -> bool;
pub type UpdateHandler = fn(&mut Host, WidgetId, i32, i32);
pub type PopupClosedHandler = fn(&mut Host, WidgetId, bool);
pub type ChildEventHandler = fn(&mut Host, ElementId, WidgetId, i32, i32) -> bool;
pub type QueryNumberHandler = fn(&Host, ElementId, &str) -> Option<f32>;
pub type QueryStringHandler = fn(&Host, ElementId, &str) -> Option<String>;
pub type SetNumberHandler = fn(&mut Host, ElementId, &str, f32) -> bool;
pub type SetStringHandler = fn(&mut Host, ElementId, &str, &str) -> bool;

/// Keep the table handed to `Init`. Returns `false`, leaving `slot` empty,
/// when the engine speaks a different ABI version.
///
/// # Safety
///
/// `functions` must be null or point to a table that outlives the module.
pub unsafe fn install(slot: &AtomicPtr<HostFunctions>, functions: *const HostFunctions) -> bool {
    match functions.as_ref() {
        Some(table) if table.version == ABI_VERSION => {
            slot.store(functions.cast_mut(), Ordering::Release);
            true
        }
        Some(table) => {
            log::error!(
                "Engine ABI version {} does not match module version {}",
                table.version,
                ABI_VERSION
            );
            false
        }
        None => false,
    }
}

/// Drop private data installed through [`Host::set_data`]. Exported as the
/// module's `Destroy` entry.
///
/// # Safety
///
/// `data` must be null or a pointer produced by `Host::set_data` of this
/// module, not released before.
pub unsafe fn release_data(data: *mut c_void) {
    if !data.is_null() {
        drop(Box::from_raw(data.cast::<Box<dyn Any>>()));
    }
}

/// Engine services for the entry point currently running.
pub struct Host {
    functions: &'static HostFunctions,
    context: *mut HostContext,
}

impl Host {
    /// `None` until `Init` installed the host table.
    ///
    /// # Safety
    ///
    /// `context` must be the context pointer the running entry point received.
    pub unsafe fn enter(slot: &AtomicPtr<HostFunctions>, context: *mut HostContext) -> Option<Self> {
        let functions = slot.load(Ordering::Acquire).cast_const().as_ref()?;
        Some(Self { functions, context })
    }

    /// Wrap the scene element handed to the running entry point.
    ///
    /// # Safety
    ///
    /// `handle` must be the source pointer the running entry point received.
    pub unsafe fn source<'a>(&self, handle: *const SourceHandle) -> Source<'a> {
        Source {
            functions: self.functions,
            handle,
            _frame: PhantomData,
        }
    }

    pub fn message(&self, text: &str) {
        unsafe { (self.functions.message)(self.context, text.as_ptr(), text.len()) }
    }

    // Scene source

    /// Slots needed by the child at `index` of `source`.
    pub fn count_child(&self, source: &Source<'_>, index: usize) -> usize {
        unsafe { (self.functions.count_child)(self.context, source.handle, index as u32) as usize }
    }

    pub fn measure_child(&self, source: &Source<'_>, index: usize) -> (i32, i32) {
        let (mut width, mut height) = (-1, -1);
        unsafe {
            (self.functions.measure_child)(self.context, source.handle, index as u32, &mut width, &mut height)
        };
        (width, height)
    }

    /// Parse the child at `index` of `source` into `slot`. Returns the slots
    /// consumed.
    pub fn parse_child(&mut self, source: &Source<'_>, index: usize, slot: WidgetId) -> usize {
        unsafe {
            (self.functions.parse_child)(self.context, source.handle, index as u32, slot.to_raw())
                as usize
        }
    }

    // Elements

    /// Install `data` as the element's private data. It is dropped when the
    /// element is torn down or the data is replaced.
    pub fn set_data<T: Any>(&mut self, element: impl Into<ElementId>, data: T) -> bool {
        let boxed: Box<Box<dyn Any>> = Box::new(Box::new(data));
        let pointer = Box::into_raw(boxed).cast::<c_void>();
        let installed = unsafe { (self.functions.set_data)(self.context, element.into().to_raw(), pointer) };
        if !installed {
            unsafe { release_data(pointer) };
        }
        installed
    }

    /// The element's private data, when it is a `T`. Mutable state belongs
    /// in a `Cell` or `RefCell`.
    pub fn data<T: Any>(&self, element: impl Into<ElementId>) -> Option<&T> {
        let pointer = unsafe { (self.functions.data)(self.context, element.into().to_raw()) };
        let data = unsafe { pointer.cast::<Box<dyn Any>>().as_ref()? };
        data.downcast_ref()
    }

    pub fn bounds(&self, element: impl Into<ElementId>) -> Option<Rect> {
        let mut bounds = Rect::default();
        unsafe { (self.functions.bounds)(self.context, element.into().to_raw(), &mut bounds) }
            .then_some(bounds)
    }

    pub fn set_bounds(&mut self, element: impl Into<ElementId>, bounds: Rect) {
        unsafe { (self.functions.set_bounds)(self.context, element.into().to_raw(), bounds) }
    }

    pub fn named(&self, name: &str) -> Option<ElementId> {
        let mut raw = 0;
        unsafe { (self.functions.named)(self.context, name.as_ptr(), name.len(), &mut raw) }
            .then(|| ElementId::from_raw(raw))
    }

    pub fn build_element(&mut self, element: impl Into<ElementId>) {
        unsafe { (self.functions.build_element)(self.context, element.into().to_raw()) }
    }

    /// Show or hide widgets `depth` levels deep, `None` for the whole subtree.
    pub fn set_visible(&mut self, element: impl Into<ElementId>, visible: bool, depth: Option<u32>) {
        let depth = depth.map_or(-1, |depth| depth.min(i32::MAX as u32) as i32);
        unsafe { (self.functions.set_visible)(self.context, element.into().to_raw(), visible, depth) }
    }

    pub fn set_clip_rect(&mut self, element: impl Into<ElementId>, clip: Option<Rect>) {
        let clip = clip.as_ref().map_or(ptr::null(), |clip| clip as *const Rect);
        unsafe { (self.functions.set_clip_rect)(self.context, element.into().to_raw(), clip) }
    }

    /// Opt the widget in or out of per-tick `OnUpdate` calls.
    pub fn set_update(&mut self, widget: WidgetId, enabled: bool) {
        unsafe { (self.functions.set_update)(self.context, widget.to_raw(), enabled) }
    }

    // Geometry and text

    pub fn allocate_geometry(&mut self, widget: WidgetId, vertices: usize, indices: usize) -> bool {
        unsafe {
            (self.functions.allocate_geometry)(self.context, widget.to_raw(), vertices as u32, indices as u32)
        }
    }

    pub fn allocate_quads(&mut self, widget: WidgetId, count: usize) -> bool {
        self.allocate_geometry(widget, count * 4, count * 6)
    }

    pub fn push_quad(&mut self, widget: WidgetId, rect: Rect, uv: TexCoords, color: Color) -> bool {
        unsafe { (self.functions.push_quad)(self.context, widget.to_raw(), rect, uv, color) }
    }

    pub fn push_colored_quad(&mut self, widget: WidgetId, rect: Rect, color: Color) -> bool {
        self.push_quad(widget, rect, TexCoords::SOLID, color)
    }

    /// Write aligned text at the widget's write cursor. Returns the quads
    /// written.
    pub fn create_text(
        &mut self,
        widget: WidgetId,
        text: &str,
        color: Color,
        origin: Origin,
        x: f32,
        y: f32,
    ) -> usize {
        unsafe {
            (self.functions.create_text)(
                self.context,
                widget.to_raw(),
                text.as_ptr(),
                text.len(),
                color,
                origin.bits() as u32,
                x,
                y,
            ) as usize
        }
    }

    pub fn measure_text(&self, text: &str) -> (i32, i32) {
        let (mut width, mut height) = (0, 0);
        unsafe {
            (self.functions.measure_text)(self.context, text.as_ptr(), text.len(), &mut width, &mut height)
        };
        (width, height)
    }

    // Popups and pointer

    pub fn open_popup(&mut self, roots: &[ElementId], close_on: CloseOn) -> PopupMask {
        let roots: Vec<u64> = roots.iter().map(|root| root.to_raw()).collect();
        PopupMask(unsafe {
            (self.functions.open_popup)(self.context, roots.as_ptr(), roots.len(), close_on.to_raw())
        })
    }

    pub fn close_popup(&mut self) {
        unsafe { (self.functions.close_popup)(self.context) }
    }

    pub fn steal_mouse(&mut self, element: impl Into<ElementId>) {
        unsafe { (self.functions.steal_mouse)(self.context, element.into().to_raw()) }
    }

    pub fn free_mouse(&mut self, element: impl Into<ElementId>) {
        unsafe { (self.functions.free_mouse)(self.context, element.into().to_raw()) }
    }

    // Accessors of other elements

    pub fn query_number(&self, element: impl Into<ElementId>, key: &str) -> Option<f32> {
        let mut value = 0.0;
        unsafe {
            (self.functions.query_number)(self.context, element.into().to_raw(), key.as_ptr(), key.len(), &mut value)
        }
        .then_some(value)
    }

    pub fn query_string(&self, element: impl Into<ElementId>, key: &str) -> Option<String> {
        let element = element.into().to_raw();
        read_returned_string(|buf, cap| unsafe {
            (self.functions.query_string)(self.context, element, key.as_ptr(), key.len(), buf, cap)
        })
    }

    pub fn set_number(&mut self, element: impl Into<ElementId>, key: &str, value: f32) -> bool {
        unsafe {
            (self.functions.set_number)(self.context, element.into().to_raw(), key.as_ptr(), key.len(), value)
        }
    }

    pub fn set_string(&mut self, element: impl Into<ElementId>, key: &str, value: &str) -> bool {
        unsafe {
            (self.functions.set_string)(
                self.context,
                element.into().to_raw(),
                key.as_ptr(),
                key.len(),
                value.as_ptr(),
                value.len(),
            )
        }
    }
}

/// Attributes of the scene element being counted, measured or parsed,
/// falling back to the defaults in scope.
pub struct Source<'a> {
    functions: &'static HostFunctions,
    handle: *const SourceHandle,
    _frame: PhantomData<&'a SourceHandle>,
}

impl Source<'_> {
    pub fn number(&self, key: &str) -> Option<f32> {
        let mut value = 0.0;
        unsafe { (self.functions.attribute_number)(self.handle, key.as_ptr(), key.len(), &mut value) }
            .then_some(value)
    }

    pub fn string(&self, key: &str) -> Option<String> {
        read_returned_string(|buf, cap| unsafe {
            (self.functions.attribute_string)(self.handle, key.as_ptr(), key.len(), buf, cap)
        })
    }

    pub fn boolean(&self, key: &str) -> Option<bool> {
        let mut value = false;
        unsafe { (self.functions.attribute_boolean)(self.handle, key.as_ptr(), key.len(), &mut value) }
            .then_some(value)
    }

    pub fn color(&self, key: &str) -> Option<Color> {
        let mut value = Color::default();
        unsafe { (self.functions.attribute_color)(self.handle, key.as_ptr(), key.len(), &mut value) }
            .then_some(value)
    }

    pub fn number_or(&self, key: &str, otherwise: f32) -> f32 {
        self.number(key).unwrap_or(otherwise)
    }

    pub fn string_or(&self, key: &str, otherwise: &str) -> String {
        self.string(key).unwrap_or_else(|| otherwise.to_string())
    }

    pub fn boolean_or(&self, key: &str, otherwise: bool) -> bool {
        self.boolean(key).unwrap_or(otherwise)
    }

    pub fn color_or(&self, key: &str, otherwise: Color) -> Color {
        self.color(key).unwrap_or(otherwise)
    }

    /// Number of child elements.
    pub fn child_count(&self) -> usize {
        unsafe { (self.functions.child_count)(self.handle) as usize }
    }
}

/// Ids handed to `BuildLayout` and `BuildChildren`.
///
/// # Safety
///
/// `children` must be null (with `len` 0) or point to `len` ids.
pub unsafe fn element_ids(children: *const u64, len: usize) -> Vec<ElementId> {
    if children.is_null() {
        return Vec::new();
    }
    std::slice::from_raw_parts(children, len)
        .iter()
        .map(|raw| ElementId::from_raw(*raw))
        .collect()
}

/// Write a queried string into the caller's buffer, `-1` for no value.
///
/// # Safety
///
/// `buf` must be null (with `cap` 0) or point to `cap` writable bytes.
pub unsafe fn return_string(value: Option<String>, buf: *mut u8, cap: usize) -> isize {
    match value {
        Some(value) => write_str(&value, buf, cap),
        None => -1,
    }
}
