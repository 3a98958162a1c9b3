//! The C ABI between the engine and native extension modules.
//!
//! A module exports `extern "C"` entry points under fixed names (`Init`,
//! `Count`, `ParseWidget`, ...). Everything it wants from the engine goes
//! through the [`HostFunctions`] table it receives in `Init`; it never touches
//! engine types directly. Only plain data crosses the boundary:
//!
//! - elements as raw ids ([`ElementId::to_raw`](crate::ElementId::to_raw),
//!   [`WidgetId::to_raw`](crate::WidgetId::to_raw),
//!   [`LayoutId::to_raw`](crate::LayoutId::to_raw)),
//! - strings as a UTF-8 pointer and a byte length,
//! - [`Rect`], [`TexCoords`] and [`Color`] by value,
//! - the engine and scene elements as opaque pointers, valid only for the
//!   duration of the entry point that received them.
//!
//! Strings handed back to the caller are written into a caller buffer. The
//! return value is the full length, so a caller whose buffer was too small
//! can retry with a larger one. `-1` means no value.

use std::ffi::c_void;

use crate::element::{Color, Rect, TexCoords};

/// Bumped whenever the layout of [`HostFunctions`] or an entry signature
/// changes.
pub const ABI_VERSION: u32 = 1;

/// The engine borrow an entry point runs under.
#[repr(C)]
pub struct HostContext {
    _private: [u8; 0],
}

/// A scene element (and the defaults in scope for it) being counted,
/// measured or parsed.
#[repr(C)]
pub struct SourceHandle {
    _private: [u8; 0],
}

pub type InitEntry = unsafe extern "C" fn(font_height: i32, host: *const HostFunctions);
pub type CountEntry = unsafe extern "C" fn(*mut HostContext, *const SourceHandle) -> u32;
pub type MeasureEntry =
    unsafe extern "C" fn(*mut HostContext, *const SourceHandle, width: *mut i32, height: *mut i32);
pub type ParseLayoutEntry = unsafe extern "C" fn(
    *mut HostContext,
    *const SourceHandle,
    layout: u32,
    first_child: u32,
) -> u32;
pub type ParseWidgetEntry =
    unsafe extern "C" fn(*mut HostContext, *const SourceHandle, widget: u32) -> u32;
pub type BuildLayoutEntry =
    unsafe extern "C" fn(*mut HostContext, layout: u32, children: *const u64, len: usize);
pub type BuildWidgetEntry = unsafe extern "C" fn(*mut HostContext, widget: u32);
pub type BuildChildrenEntry =
    unsafe extern "C" fn(*mut HostContext, widget: u32, children: *const u64, len: usize);
/// Release a private data pointer previously installed with `set_data`.
pub type DestroyEntry = unsafe extern "C" fn(data: *mut c_void);
pub type HoverEntry = unsafe extern "C" fn(*mut HostContext, widget: u32);
pub type PointerEntry = unsafe extern "C" fn(*mut HostContext, widget: u32, x: i32, y: i32) -> bool;
pub type ScrollEntry = unsafe extern "C" fn(*mut HostContext, element: u64, dx: i32, dy: i32) -> bool;
pub type UpdateEntry = unsafe extern "C" fn(*mut HostContext, widget: u32, x: i32, y: i32);
pub type PopupClosedEntry = unsafe extern "C" fn(*mut HostContext, owner: u32, mouse_down: bool);
pub type ChildEventEntry =
    unsafe extern "C" fn(*mut HostContext, ancestor: u64, child: u32, x: i32, y: i32) -> bool;
pub type QueryNumberEntry = unsafe extern "C" fn(
    *mut HostContext,
    element: u64,
    key: *const u8,
    key_len: usize,
    out: *mut f32,
) -> bool;
pub type QueryStringEntry = unsafe extern "C" fn(
    *mut HostContext,
    element: u64,
    key: *const u8,
    key_len: usize,
    buf: *mut u8,
    cap: usize,
) -> isize;
pub type SetNumberEntry = unsafe extern "C" fn(
    *mut HostContext,
    element: u64,
    key: *const u8,
    key_len: usize,
    value: f32,
) -> bool;
pub type SetStringEntry = unsafe extern "C" fn(
    *mut HostContext,
    element: u64,
    key: *const u8,
    key_len: usize,
    value: *const u8,
    value_len: usize,
) -> bool;

/// The entry points of one native module. Absent entries fall back to the
/// same defaults as in-process extensions.
#[derive(Clone, Copy, Default)]
pub struct NativeEntries {
    pub init: Option<InitEntry>,
    pub count: Option<CountEntry>,
    pub measure: Option<MeasureEntry>,
    pub parse_layout: Option<ParseLayoutEntry>,
    pub parse_widget: Option<ParseWidgetEntry>,
    pub build_layout: Option<BuildLayoutEntry>,
    pub build_widget: Option<BuildWidgetEntry>,
    pub build_children: Option<BuildChildrenEntry>,
    pub destroy: Option<DestroyEntry>,
    pub on_enter: Option<HoverEntry>,
    pub on_exit: Option<HoverEntry>,
    pub on_click: Option<PointerEntry>,
    pub on_release_inside: Option<PointerEntry>,
    pub on_release_outside: Option<PointerEntry>,
    pub on_scroll: Option<ScrollEntry>,
    pub on_update: Option<UpdateEntry>,
    pub on_popup_closed: Option<PopupClosedEntry>,
    pub on_child_clicked: Option<ChildEventEntry>,
    pub on_child_released: Option<ChildEventEntry>,
    pub on_child_update: Option<ChildEventEntry>,
    pub query_number: Option<QueryNumberEntry>,
    pub query_string: Option<QueryStringEntry>,
    pub set_number: Option<SetNumberEntry>,
    pub set_string: Option<SetStringEntry>,
}

/// Engine services available to a native module.
///
/// Functions taking a [`HostContext`] must be called with the context of the
/// entry point currently running. Those that change the engine fail (and log)
/// when that entry point only holds a read-only borrow: `Count`, `Measure`,
/// `QueryNumber` and `QueryString`.
#[repr(C)]
pub struct HostFunctions {
    pub version: u32,
    pub message: unsafe extern "C" fn(*mut HostContext, text: *const u8, len: usize),

    // Scene source
    pub attribute_number:
        unsafe extern "C" fn(*const SourceHandle, key: *const u8, key_len: usize, out: *mut f32) -> bool,
    pub attribute_string: unsafe extern "C" fn(
        *const SourceHandle,
        key: *const u8,
        key_len: usize,
        buf: *mut u8,
        cap: usize,
    ) -> isize,
    pub attribute_boolean:
        unsafe extern "C" fn(*const SourceHandle, key: *const u8, key_len: usize, out: *mut bool) -> bool,
    pub attribute_color:
        unsafe extern "C" fn(*const SourceHandle, key: *const u8, key_len: usize, out: *mut Color) -> bool,
    pub child_count: unsafe extern "C" fn(*const SourceHandle) -> u32,
    pub count_child: unsafe extern "C" fn(*mut HostContext, *const SourceHandle, index: u32) -> u32,
    pub measure_child: unsafe extern "C" fn(
        *mut HostContext,
        *const SourceHandle,
        index: u32,
        width: *mut i32,
        height: *mut i32,
    ),
    pub parse_child:
        unsafe extern "C" fn(*mut HostContext, *const SourceHandle, index: u32, slot: u32) -> u32,

    // Elements
    pub set_data: unsafe extern "C" fn(*mut HostContext, element: u64, data: *mut c_void) -> bool,
    pub data: unsafe extern "C" fn(*mut HostContext, element: u64) -> *mut c_void,
    pub bounds: unsafe extern "C" fn(*mut HostContext, element: u64, out: *mut Rect) -> bool,
    pub set_bounds: unsafe extern "C" fn(*mut HostContext, element: u64, bounds: Rect),
    pub named: unsafe extern "C" fn(*mut HostContext, name: *const u8, len: usize, out: *mut u64) -> bool,
    pub build_element: unsafe extern "C" fn(*mut HostContext, element: u64),
    /// A negative depth applies to the whole subtree.
    pub set_visible: unsafe extern "C" fn(*mut HostContext, element: u64, visible: bool, depth: i32),
    /// A null rect removes clipping.
    pub set_clip_rect: unsafe extern "C" fn(*mut HostContext, element: u64, clip: *const Rect),
    pub set_update: unsafe extern "C" fn(*mut HostContext, widget: u32, enabled: bool),

    // Geometry and text
    pub allocate_geometry:
        unsafe extern "C" fn(*mut HostContext, widget: u32, vertices: u32, indices: u32) -> bool,
    pub push_quad:
        unsafe extern "C" fn(*mut HostContext, widget: u32, rect: Rect, uv: TexCoords, color: Color) -> bool,
    pub create_text: unsafe extern "C" fn(
        *mut HostContext,
        widget: u32,
        text: *const u8,
        len: usize,
        color: Color,
        origin: u32,
        x: f32,
        y: f32,
    ) -> u32,
    pub measure_text:
        unsafe extern "C" fn(*mut HostContext, text: *const u8, len: usize, width: *mut i32, height: *mut i32),

    // Popups and pointer
    pub open_popup:
        unsafe extern "C" fn(*mut HostContext, roots: *const u64, len: usize, close_on: u32) -> u32,
    pub close_popup: unsafe extern "C" fn(*mut HostContext),
    pub steal_mouse: unsafe extern "C" fn(*mut HostContext, element: u64),
    pub free_mouse: unsafe extern "C" fn(*mut HostContext, element: u64),

    // Accessors of other elements
    pub query_number: QueryNumberEntry,
    pub query_string: QueryStringEntry,
    pub set_number: SetNumberEntry,
    pub set_string: SetStringEntry,
}

/// Borrow a string passed across the boundary. A null pointer reads as the
/// empty string only when `len` is 0.
///
/// # Safety
///
/// `ptr` must be null or point to `len` readable bytes that outlive `'a`.
pub unsafe fn read_str<'a>(ptr: *const u8, len: usize) -> Option<&'a str> {
    if ptr.is_null() {
        return (len == 0).then_some("");
    }
    std::str::from_utf8(std::slice::from_raw_parts(ptr, len)).ok()
}

/// Copy as much of `value` as fits into `buf` and return its full length.
///
/// # Safety
///
/// `buf` must be null (with `cap` 0) or point to `cap` writable bytes.
pub unsafe fn write_str(value: &str, buf: *mut u8, cap: usize) -> isize {
    let bytes = value.as_bytes();
    if !buf.is_null() {
        let written = bytes.len().min(cap);
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), buf, written);
    }
    bytes.len() as isize
}

/// Read a string returned through a caller buffer, growing the buffer once
/// when the first attempt reports a longer value.
pub(crate) fn read_returned_string(mut fill: impl FnMut(*mut u8, usize) -> isize) -> Option<String> {
    let mut buf = vec![0u8; 256];
    let mut len = fill(buf.as_mut_ptr(), buf.len());
    if len < 0 {
        return None;
    }
    if len as usize > buf.len() {
        buf.resize(len as usize, 0);
        len = fill(buf.as_mut_ptr(), buf.len());
        if len < 0 || len as usize > buf.len() {
            return None;
        }
    }
    buf.truncate(len as usize);
    String::from_utf8(buf).ok()
}

/// Store `value` through an out pointer, `false` when the pointer is null.
///
/// # Safety
///
/// `out` must be null or valid for writes.
pub(crate) unsafe fn store<T>(out: *mut T, value: T) -> bool {
    match out.as_mut() {
        Some(slot) => {
            *slot = value;
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strings_cross_as_pointer_and_length() {
        let text = "héllo";
        let read = unsafe { read_str(text.as_ptr(), text.len()) };
        assert_eq!(read, Some(text));
        assert_eq!(unsafe { read_str(std::ptr::null(), 0) }, Some(""));
        assert_eq!(unsafe { read_str(std::ptr::null(), 3) }, None);

        let invalid = [0xffu8, 0xfe];
        assert_eq!(unsafe { read_str(invalid.as_ptr(), invalid.len()) }, None);
    }

    #[test]
    fn test_returned_strings_grow_the_buffer() {
        let long = "x".repeat(1000);
        let mut calls = 0;
        let value = read_returned_string(|buf, cap| {
            calls += 1;
            unsafe { write_str(&long, buf, cap) }
        });
        assert_eq!(value.as_deref(), Some(long.as_str()));
        assert_eq!(calls, 2);

        assert_eq!(read_returned_string(|_, _| -1), None);
    }
}
