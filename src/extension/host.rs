//! Engine side of the native extension ABI.
//!
//! Native entry points are reached through trampolines with the same
//! signatures as in-process callbacks, so the engine dispatches both through
//! an [`ExtensionVTable`]. A trampoline looks up the entry of the element's
//! extension, wraps the current engine borrow in a context pointer and calls
//! the module. The module calls back through [`HOST_FUNCTIONS`].

use std::ffi::c_void;
use std::ptr;

use mlua::Table;

use super::abi::{
    read_returned_string, read_str, store, write_str, ChildEventEntry, DestroyEntry, HostContext,
    HostFunctions, NativeEntries, PointerEntry, SourceHandle, ABI_VERSION,
};
use super::{
    BuildChildrenFn, BuildLayoutFn, BuildWidgetFn, ChildEventFn, CountFn, ExtensionVTable, HoverFn,
    MeasureFn, ParseLayoutFn, ParseWidgetFn, PointerFn, PopupClosedFn, QueryNumberFn,
    QueryStringFn, ScrollFn, SetNumberFn, SetStringFn, UpdateFn,
};
use crate::element::{Color, ElementId, LayoutId, PopupMask, Rect, TexCoords, WidgetId};
use crate::gui::Gui;
use crate::popup::CloseOn;
use crate::scene::{child_tables, Attributes};
use crate::text::Origin;

/// The engine borrow behind a [`HostContext`] pointer.
enum HostCall<'a> {
    /// Read-only entry points: count, measure and queries.
    Shared(&'a Gui),
    Exclusive(&'a mut Gui),
}

impl HostCall<'_> {
    fn context(&mut self) -> *mut HostContext {
        (self as *mut Self).cast()
    }
}

unsafe fn engine<'a>(context: *mut HostContext) -> Option<&'a Gui> {
    match context.cast::<HostCall<'a>>().as_ref()? {
        HostCall::Shared(gui) => Some(*gui),
        HostCall::Exclusive(gui) => Some(&**gui),
    }
}

unsafe fn engine_mut<'a>(context: *mut HostContext, operation: &str) -> Option<&'a mut Gui> {
    match context.cast::<HostCall<'a>>().as_mut()? {
        HostCall::Exclusive(gui) => Some(&mut **gui),
        HostCall::Shared(_) => {
            log::error!(
                "Extension called {} from a read-only callback, ignoring",
                operation
            );
            None
        }
    }
}

/// A scene element being counted, measured or parsed.
struct SourceFrame<'a> {
    element: &'a Table,
    defaults: Option<&'a Table>,
}

impl SourceFrame<'_> {
    fn handle(&self) -> *const SourceHandle {
        (self as *const Self).cast()
    }

    fn attributes(&self) -> Attributes<'_> {
        Attributes::new(self.element, self.defaults)
    }

    fn child(&self, index: u32) -> Option<Table> {
        child_tables(self.element).into_iter().nth(index as usize)
    }
}

unsafe fn frame<'a>(handle: *const SourceHandle) -> Option<&'a SourceFrame<'a>> {
    handle.cast::<SourceFrame<'a>>().as_ref()
}

/// Private data installed by a native module. The module's `Destroy` entry
/// releases it when the element is torn down.
pub(crate) struct NativeData {
    pointer: *mut c_void,
    destroy: Option<DestroyEntry>,
}

impl Drop for NativeData {
    fn drop(&mut self) {
        if let Some(destroy) = self.destroy {
            // SAFETY: the pointer came from this module's `set_data` call and
            // is released exactly once.
            unsafe { destroy(self.pointer) }
        }
    }
}

fn entries_of(gui: &Gui, id: ElementId) -> Option<NativeEntries> {
    let element = gui.tree.element(id)?;
    gui.registry.get(element.extension())?.native()
}

fn entries_for(gui: &Gui, element: &Table) -> Option<NativeEntries> {
    gui.registry.get(gui.resolve_extension(element)?)?.native()
}

fn raw_ids(ids: &[ElementId]) -> Vec<u64> {
    ids.iter().map(|id| id.to_raw()).collect()
}

/// Capability table that forwards to `entries`.
pub(crate) fn native_vtable(entries: &NativeEntries) -> ExtensionVTable {
    ExtensionVTable {
        // Init gets the host table and is called directly.
        init: None,
        count: entries.count.map(|_| count as CountFn),
        measure: entries.measure.map(|_| measure as MeasureFn),
        parse_layout: entries.parse_layout.map(|_| parse_layout as ParseLayoutFn),
        parse_widget: entries.parse_widget.map(|_| parse_widget as ParseWidgetFn),
        build_layout: entries.build_layout.map(|_| build_layout as BuildLayoutFn),
        build_widget: entries.build_widget.map(|_| build_widget as BuildWidgetFn),
        build_children: entries.build_children.map(|_| build_children as BuildChildrenFn),
        // Private data releases itself through `NativeData`.
        destroy: None,
        on_enter: entries.on_enter.map(|_| on_enter as HoverFn),
        on_exit: entries.on_exit.map(|_| on_exit as HoverFn),
        on_click: entries.on_click.map(|_| on_click as PointerFn),
        on_release_inside: entries.on_release_inside.map(|_| on_release_inside as PointerFn),
        on_release_outside: entries.on_release_outside.map(|_| on_release_outside as PointerFn),
        on_scroll: entries.on_scroll.map(|_| on_scroll as ScrollFn),
        on_update: entries.on_update.map(|_| on_update as UpdateFn),
        on_popup_closed: entries.on_popup_closed.map(|_| on_popup_closed as PopupClosedFn),
        on_child_clicked: entries.on_child_clicked.map(|_| on_child_clicked as ChildEventFn),
        on_child_released: entries.on_child_released.map(|_| on_child_released as ChildEventFn),
        on_child_update: entries.on_child_update.map(|_| on_child_update as ChildEventFn),
        query_number: entries.query_number.map(|_| query_number as QueryNumberFn),
        query_string: entries.query_string.map(|_| query_string as QueryStringFn),
        set_number: entries.set_number.map(|_| set_number as SetNumberFn),
        set_string: entries.set_string.map(|_| set_string as SetStringFn),
    }
}

/// Run a module's `Init` with the host table.
pub(crate) fn init_native(entries: &NativeEntries, font_height: i32) {
    if let Some(init) = entries.init {
        // SAFETY: the host table is static and outlives every module.
        unsafe { init(font_height, &HOST_FUNCTIONS) }
    }
}

// Trampolines

fn count(gui: &Gui, element: &Table) -> usize {
    let Some(count) = entries_for(gui, element).and_then(|entries| entries.count) else {
        return 1;
    };
    let source = SourceFrame {
        element,
        defaults: None,
    };
    let mut call = HostCall::Shared(gui);
    unsafe { count(call.context(), source.handle()) as usize }
}

fn measure(gui: &Gui, element: &Table) -> (i32, i32) {
    let Some(measure) = entries_for(gui, element).and_then(|entries| entries.measure) else {
        return (-1, -1);
    };
    let source = SourceFrame {
        element,
        defaults: None,
    };
    let (mut width, mut height) = (-1, -1);
    let mut call = HostCall::Shared(gui);
    unsafe { measure(call.context(), source.handle(), &mut width, &mut height) };
    (width, height)
}

fn parse_layout(
    gui: &mut Gui,
    element: &Table,
    layout: LayoutId,
    first_child: WidgetId,
    defaults: Option<&Table>,
) -> usize {
    let Some(parse) = entries_of(gui, layout.into()).and_then(|entries| entries.parse_layout) else {
        return 0;
    };
    let source = SourceFrame { element, defaults };
    let mut call = HostCall::Exclusive(gui);
    unsafe {
        parse(
            call.context(),
            source.handle(),
            layout.to_raw(),
            first_child.to_raw(),
        ) as usize
    }
}

fn parse_widget(gui: &mut Gui, element: &Table, widget: WidgetId, defaults: Option<&Table>) -> usize {
    let Some(parse) = entries_of(gui, widget.into()).and_then(|entries| entries.parse_widget) else {
        return 0;
    };
    let source = SourceFrame { element, defaults };
    let mut call = HostCall::Exclusive(gui);
    unsafe { parse(call.context(), source.handle(), widget.to_raw()) as usize }
}

fn build_layout(gui: &mut Gui, layout: LayoutId, children: &[ElementId]) {
    if let Some(build) = entries_of(gui, layout.into()).and_then(|entries| entries.build_layout) {
        let children = raw_ids(children);
        let mut call = HostCall::Exclusive(gui);
        unsafe { build(call.context(), layout.to_raw(), children.as_ptr(), children.len()) }
    }
}

fn build_widget(gui: &mut Gui, widget: WidgetId) {
    if let Some(build) = entries_of(gui, widget.into()).and_then(|entries| entries.build_widget) {
        let mut call = HostCall::Exclusive(gui);
        unsafe { build(call.context(), widget.to_raw()) }
    }
}

fn build_children(gui: &mut Gui, widget: WidgetId, children: &[ElementId]) {
    if let Some(build) = entries_of(gui, widget.into()).and_then(|entries| entries.build_children) {
        let children = raw_ids(children);
        let mut call = HostCall::Exclusive(gui);
        unsafe { build(call.context(), widget.to_raw(), children.as_ptr(), children.len()) }
    }
}

fn hover(gui: &mut Gui, widget: WidgetId, exit: bool) {
    let entry = entries_of(gui, widget.into()).and_then(|entries| {
        if exit {
            entries.on_exit
        } else {
            entries.on_enter
        }
    });
    if let Some(entry) = entry {
        let mut call = HostCall::Exclusive(gui);
        unsafe { entry(call.context(), widget.to_raw()) }
    }
}

fn on_enter(gui: &mut Gui, widget: WidgetId) {
    hover(gui, widget, false)
}

fn on_exit(gui: &mut Gui, widget: WidgetId) {
    hover(gui, widget, true)
}

fn pointer(
    gui: &mut Gui,
    widget: WidgetId,
    x: i32,
    y: i32,
    select: fn(&NativeEntries) -> Option<PointerEntry>,
) -> bool {
    match entries_of(gui, widget.into()).as_ref().and_then(select) {
        Some(entry) => {
            let mut call = HostCall::Exclusive(gui);
            unsafe { entry(call.context(), widget.to_raw(), x, y) }
        }
        None => false,
    }
}

fn on_click(gui: &mut Gui, widget: WidgetId, x: i32, y: i32) -> bool {
    pointer(gui, widget, x, y, |entries| entries.on_click)
}

fn on_release_inside(gui: &mut Gui, widget: WidgetId, x: i32, y: i32) -> bool {
    pointer(gui, widget, x, y, |entries| entries.on_release_inside)
}

fn on_release_outside(gui: &mut Gui, widget: WidgetId, x: i32, y: i32) -> bool {
    pointer(gui, widget, x, y, |entries| entries.on_release_outside)
}

fn on_scroll(gui: &mut Gui, element: ElementId, dx: i32, dy: i32) -> bool {
    match entries_of(gui, element).and_then(|entries| entries.on_scroll) {
        Some(entry) => {
            let mut call = HostCall::Exclusive(gui);
            unsafe { entry(call.context(), element.to_raw(), dx, dy) }
        }
        None => false,
    }
}

fn on_update(gui: &mut Gui, widget: WidgetId, x: i32, y: i32) {
    if let Some(entry) = entries_of(gui, widget.into()).and_then(|entries| entries.on_update) {
        let mut call = HostCall::Exclusive(gui);
        unsafe { entry(call.context(), widget.to_raw(), x, y) }
    }
}

fn on_popup_closed(gui: &mut Gui, owner: WidgetId, mouse_down: bool) {
    if let Some(entry) = entries_of(gui, owner.into()).and_then(|entries| entries.on_popup_closed) {
        let mut call = HostCall::Exclusive(gui);
        unsafe { entry(call.context(), owner.to_raw(), mouse_down) }
    }
}

fn child_event(
    gui: &mut Gui,
    ancestor: ElementId,
    child: WidgetId,
    x: i32,
    y: i32,
    select: fn(&NativeEntries) -> Option<ChildEventEntry>,
) -> bool {
    match entries_of(gui, ancestor).as_ref().and_then(select) {
        Some(entry) => {
            let mut call = HostCall::Exclusive(gui);
            unsafe { entry(call.context(), ancestor.to_raw(), child.to_raw(), x, y) }
        }
        None => false,
    }
}

fn on_child_clicked(gui: &mut Gui, ancestor: ElementId, child: WidgetId, x: i32, y: i32) -> bool {
    child_event(gui, ancestor, child, x, y, |entries| entries.on_child_clicked)
}

fn on_child_released(gui: &mut Gui, ancestor: ElementId, child: WidgetId, x: i32, y: i32) -> bool {
    child_event(gui, ancestor, child, x, y, |entries| entries.on_child_released)
}

fn on_child_update(gui: &mut Gui, ancestor: ElementId, child: WidgetId, x: i32, y: i32) -> bool {
    child_event(gui, ancestor, child, x, y, |entries| entries.on_child_update)
}

fn query_number(gui: &Gui, element: ElementId, key: &str) -> Option<f32> {
    let entry = entries_of(gui, element)?.query_number?;
    let mut value = 0.0;
    let mut call = HostCall::Shared(gui);
    let found = unsafe { entry(call.context(), element.to_raw(), key.as_ptr(), key.len(), &mut value) };
    found.then_some(value)
}

fn query_string(gui: &Gui, element: ElementId, key: &str) -> Option<String> {
    let entry = entries_of(gui, element)?.query_string?;
    let mut call = HostCall::Shared(gui);
    let context = call.context();
    read_returned_string(|buf, cap| unsafe {
        entry(context, element.to_raw(), key.as_ptr(), key.len(), buf, cap)
    })
}

fn set_number(gui: &mut Gui, element: ElementId, key: &str, value: f32) -> bool {
    match entries_of(gui, element).and_then(|entries| entries.set_number) {
        Some(entry) => {
            let mut call = HostCall::Exclusive(gui);
            unsafe { entry(call.context(), element.to_raw(), key.as_ptr(), key.len(), value) }
        }
        None => false,
    }
}

fn set_string(gui: &mut Gui, element: ElementId, key: &str, value: &str) -> bool {
    match entries_of(gui, element).and_then(|entries| entries.set_string) {
        Some(entry) => {
            let mut call = HostCall::Exclusive(gui);
            unsafe {
                entry(
                    call.context(),
                    element.to_raw(),
                    key.as_ptr(),
                    key.len(),
                    value.as_ptr(),
                    value.len(),
                )
            }
        }
        None => false,
    }
}

// Host functions

/// Every engine service a native module can reach.
pub static HOST_FUNCTIONS: HostFunctions = HostFunctions {
    version: ABI_VERSION,
    message: host_message,
    attribute_number: host_attribute_number,
    attribute_string: host_attribute_string,
    attribute_boolean: host_attribute_boolean,
    attribute_color: host_attribute_color,
    child_count: host_child_count,
    count_child: host_count_child,
    measure_child: host_measure_child,
    parse_child: host_parse_child,
    set_data: host_set_data,
    data: host_data,
    bounds: host_bounds,
    set_bounds: host_set_bounds,
    named: host_named,
    build_element: host_build_element,
    set_visible: host_set_visible,
    set_clip_rect: host_set_clip_rect,
    set_update: host_set_update,
    allocate_geometry: host_allocate_geometry,
    push_quad: host_push_quad,
    create_text: host_create_text,
    measure_text: host_measure_text,
    open_popup: host_open_popup,
    close_popup: host_close_popup,
    steal_mouse: host_steal_mouse,
    free_mouse: host_free_mouse,
    query_number: host_query_number,
    query_string: host_query_string,
    set_number: host_set_number,
    set_string: host_set_string,
};

unsafe extern "C" fn host_message(context: *mut HostContext, text: *const u8, len: usize) {
    if let (Some(gui), Some(text)) = (engine(context), read_str(text, len)) {
        gui.message(text);
    }
}

unsafe extern "C" fn host_attribute_number(
    source: *const SourceHandle,
    key: *const u8,
    key_len: usize,
    out: *mut f32,
) -> bool {
    match (frame(source), read_str(key, key_len)) {
        (Some(source), Some(key)) => match source.attributes().number(key) {
            Some(value) => store(out, value),
            None => false,
        },
        _ => false,
    }
}

unsafe extern "C" fn host_attribute_string(
    source: *const SourceHandle,
    key: *const u8,
    key_len: usize,
    buf: *mut u8,
    cap: usize,
) -> isize {
    match (frame(source), read_str(key, key_len)) {
        (Some(source), Some(key)) => match source.attributes().string(key) {
            Some(value) => write_str(&value, buf, cap),
            None => -1,
        },
        _ => -1,
    }
}

unsafe extern "C" fn host_attribute_boolean(
    source: *const SourceHandle,
    key: *const u8,
    key_len: usize,
    out: *mut bool,
) -> bool {
    match (frame(source), read_str(key, key_len)) {
        (Some(source), Some(key)) => match source.attributes().boolean(key) {
            Some(value) => store(out, value),
            None => false,
        },
        _ => false,
    }
}

unsafe extern "C" fn host_attribute_color(
    source: *const SourceHandle,
    key: *const u8,
    key_len: usize,
    out: *mut Color,
) -> bool {
    match (frame(source), read_str(key, key_len)) {
        (Some(source), Some(key)) => match source.attributes().color(key) {
            Some(value) => store(out, value),
            None => false,
        },
        _ => false,
    }
}

unsafe extern "C" fn host_child_count(source: *const SourceHandle) -> u32 {
    frame(source).map_or(0, |source| child_tables(source.element).len() as u32)
}

unsafe extern "C" fn host_count_child(
    context: *mut HostContext,
    source: *const SourceHandle,
    index: u32,
) -> u32 {
    let (Some(gui), Some(source)) = (engine(context), frame(source)) else {
        return 0;
    };
    source.child(index).map_or(0, |child| gui.count(&child) as u32)
}

unsafe extern "C" fn host_measure_child(
    context: *mut HostContext,
    source: *const SourceHandle,
    index: u32,
    width: *mut i32,
    height: *mut i32,
) {
    let size = match (engine(context), frame(source)) {
        (Some(gui), Some(source)) => source
            .child(index)
            .map_or((-1, -1), |child| gui.measure(&child)),
        _ => (-1, -1),
    };
    store(width, size.0);
    store(height, size.1);
}

unsafe extern "C" fn host_parse_child(
    context: *mut HostContext,
    source: *const SourceHandle,
    index: u32,
    slot: u32,
) -> u32 {
    let (Some(gui), Some(source)) = (engine_mut(context, "parse_child"), frame(source)) else {
        return 0;
    };
    match source.child(index) {
        Some(child) => gui.parse(&child, WidgetId::from_raw(slot)) as u32,
        None => 0,
    }
}

unsafe extern "C" fn host_set_data(context: *mut HostContext, element: u64, data: *mut c_void) -> bool {
    let Some(gui) = engine_mut(context, "set_data") else {
        return false;
    };
    let id = ElementId::from_raw(element);
    if gui.element(id).is_none() {
        log::warn!("Ignoring data for missing element {:?}", id);
        return false;
    }
    let destroy = entries_of(gui, id).and_then(|entries| entries.destroy);
    gui.set_data(
        id,
        NativeData {
            pointer: data,
            destroy,
        },
    );
    true
}

unsafe extern "C" fn host_data(context: *mut HostContext, element: u64) -> *mut c_void {
    engine(context)
        .and_then(|gui| gui.data::<NativeData>(ElementId::from_raw(element)))
        .map_or(ptr::null_mut(), |data| data.pointer)
}

unsafe extern "C" fn host_bounds(context: *mut HostContext, element: u64, out: *mut Rect) -> bool {
    match engine(context).and_then(|gui| gui.bounds(ElementId::from_raw(element))) {
        Some(bounds) => store(out, bounds),
        None => false,
    }
}

unsafe extern "C" fn host_set_bounds(context: *mut HostContext, element: u64, bounds: Rect) {
    if let Some(gui) = engine_mut(context, "set_bounds") {
        gui.set_bounds(ElementId::from_raw(element), bounds);
    }
}

unsafe extern "C" fn host_named(
    context: *mut HostContext,
    name: *const u8,
    len: usize,
    out: *mut u64,
) -> bool {
    let (Some(gui), Some(name)) = (engine(context), read_str(name, len)) else {
        return false;
    };
    match gui.named(name) {
        Some(id) => store(out, id.to_raw()),
        None => false,
    }
}

unsafe extern "C" fn host_build_element(context: *mut HostContext, element: u64) {
    if let Some(gui) = engine_mut(context, "build_element") {
        gui.build_element(ElementId::from_raw(element));
    }
}

unsafe extern "C" fn host_set_visible(context: *mut HostContext, element: u64, visible: bool, depth: i32) {
    if let Some(gui) = engine_mut(context, "set_visible") {
        let depth = u32::try_from(depth).ok();
        gui.set_visible(ElementId::from_raw(element), visible, depth);
    }
}

unsafe extern "C" fn host_set_clip_rect(context: *mut HostContext, element: u64, clip: *const Rect) {
    if let Some(gui) = engine_mut(context, "set_clip_rect") {
        gui.set_clip_rect(ElementId::from_raw(element), clip.as_ref().copied());
    }
}

unsafe extern "C" fn host_set_update(context: *mut HostContext, widget: u32, enabled: bool) {
    if let Some(widget) = engine_mut(context, "set_update")
        .and_then(|gui| gui.widget_mut(WidgetId::from_raw(widget)))
    {
        widget.update = enabled;
    }
}

unsafe extern "C" fn host_allocate_geometry(
    context: *mut HostContext,
    widget: u32,
    vertices: u32,
    indices: u32,
) -> bool {
    engine_mut(context, "allocate_geometry")
        .and_then(|gui| gui.widget_mut(WidgetId::from_raw(widget)))
        .is_some_and(|widget| widget.allocate_geometry(vertices as usize, indices as usize))
}

unsafe extern "C" fn host_push_quad(
    context: *mut HostContext,
    widget: u32,
    rect: Rect,
    uv: TexCoords,
    color: Color,
) -> bool {
    engine_mut(context, "push_quad")
        .and_then(|gui| gui.widget_mut(WidgetId::from_raw(widget)))
        .is_some_and(|widget| widget.push_quad(rect, uv, color))
}

#[allow(clippy::too_many_arguments)]
unsafe extern "C" fn host_create_text(
    context: *mut HostContext,
    widget: u32,
    text: *const u8,
    len: usize,
    color: Color,
    origin: u32,
    x: f32,
    y: f32,
) -> u32 {
    let (Some(gui), Some(text)) = (engine_mut(context, "create_text"), read_str(text, len)) else {
        return 0;
    };
    let origin = Origin::from_bits_truncate(origin as u8);
    gui.create_aligned_text(WidgetId::from_raw(widget), text, color, origin, x, y) as u32
}

unsafe extern "C" fn host_measure_text(
    context: *mut HostContext,
    text: *const u8,
    len: usize,
    width: *mut i32,
    height: *mut i32,
) {
    let size = match (engine(context), read_str(text, len)) {
        (Some(gui), Some(text)) => gui.measure_text(text),
        _ => (0, 0),
    };
    store(width, size.0);
    store(height, size.1);
}

unsafe extern "C" fn host_open_popup(
    context: *mut HostContext,
    roots: *const u64,
    len: usize,
    close_on: u32,
) -> u32 {
    let Some(gui) = engine_mut(context, "open_popup") else {
        return 0;
    };
    let roots: Vec<ElementId> = if roots.is_null() {
        Vec::new()
    } else {
        std::slice::from_raw_parts(roots, len)
            .iter()
            .map(|raw| ElementId::from_raw(*raw))
            .collect()
    };
    let PopupMask(mask) = gui.open_popup(&roots, CloseOn::from_raw(close_on));
    mask
}

unsafe extern "C" fn host_close_popup(context: *mut HostContext) {
    if let Some(gui) = engine_mut(context, "close_popup") {
        gui.close_popup();
    }
}

unsafe extern "C" fn host_steal_mouse(context: *mut HostContext, element: u64) {
    if let Some(gui) = engine_mut(context, "steal_mouse") {
        gui.steal_mouse(ElementId::from_raw(element));
    }
}

unsafe extern "C" fn host_free_mouse(context: *mut HostContext, element: u64) {
    if let Some(gui) = engine_mut(context, "free_mouse") {
        gui.free_mouse(ElementId::from_raw(element));
    }
}

unsafe extern "C" fn host_query_number(
    context: *mut HostContext,
    element: u64,
    key: *const u8,
    key_len: usize,
    out: *mut f32,
) -> bool {
    let (Some(gui), Some(key)) = (engine(context), read_str(key, key_len)) else {
        return false;
    };
    match gui.query_number(ElementId::from_raw(element), key) {
        Some(value) => store(out, value),
        None => false,
    }
}

unsafe extern "C" fn host_query_string(
    context: *mut HostContext,
    element: u64,
    key: *const u8,
    key_len: usize,
    buf: *mut u8,
    cap: usize,
) -> isize {
    let (Some(gui), Some(key)) = (engine(context), read_str(key, key_len)) else {
        return -1;
    };
    match gui.query_string(ElementId::from_raw(element), key) {
        Some(value) => write_str(&value, buf, cap),
        None => -1,
    }
}

unsafe extern "C" fn host_set_number(
    context: *mut HostContext,
    element: u64,
    key: *const u8,
    key_len: usize,
    value: f32,
) -> bool {
    let (Some(gui), Some(key)) = (engine_mut(context, "set_number"), read_str(key, key_len)) else {
        return false;
    };
    gui.set_number(ElementId::from_raw(element), key, value)
}

unsafe extern "C" fn host_set_string(
    context: *mut HostContext,
    element: u64,
    key: *const u8,
    key_len: usize,
    value: *const u8,
    value_len: usize,
) -> bool {
    let (Some(gui), Some(key), Some(value)) = (
        engine_mut(context, "set_string"),
        read_str(key, key_len),
        read_str(value, value_len),
    ) else {
        return false;
    };
    gui.set_string(ElementId::from_raw(element), key, value)
}
