//! Element data model shared by the engine and every extension.
//!
//! The tree is made of two node variants:
//!
//! - [`Widget`]: a renderable node owning a fixed-size vertex/index buffer.
//!   Widgets live in one flat array sized before parsing starts, so a
//!   [`WidgetId`] is simply a slot in that array.
//! - [`Layout`]: a non-renderable node that only positions its children.
//!
//! Both share the attributes in [`Element`]: bounds, the owning extension,
//! the extension's private data, the ordered children and a non-owning parent
//! reference used for event bubbling.

use std::any::Any;

use bytemuck::{Pod, Zeroable};

use crate::extension::ExtensionId;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Build a color from `0xRRGGBB`.
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as u8,
            g: ((hex >> 8) & 0xFF) as u8,
            b: (hex & 0xFF) as u8,
            a: 255,
        }
    }

    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    pub fn inset(&self, amount: f32) -> Self {
        Self {
            x: self.x + amount,
            y: self.y + amount,
            width: (self.width - amount * 2.0).max(0.0),
            height: (self.height - amount * 2.0).max(0.0),
        }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }

    /// Point containment, inclusive on every edge.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.width == 0.0 && self.height == 0.0
    }
}

/// Texture coordinates of a quad.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TexCoords {
    pub u_min: f32,
    pub u_max: f32,
    pub v_min: f32,
    pub v_max: f32,
}

impl TexCoords {
    pub const fn new(u_min: f32, u_max: f32, v_min: f32, v_max: f32) -> Self {
        Self {
            u_min,
            u_max,
            v_min,
            v_max,
        }
    }

    /// Coordinates pointing at the opaque white texel used for flat colors.
    pub const SOLID: TexCoords = TexCoords::new(0.0, 0.0, 0.0, 0.0);
}

/// A single vertex as handed to the rendering backend.
///
/// Backends can upload the draw buffers with `bytemuck::cast_slice`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [u8; 4],
}

impl Vertex {
    pub fn new(x: f32, y: f32, u: f32, v: f32, color: Color) -> Self {
        Self {
            position: [x, y],
            uv: [u, v],
            color: color.to_array(),
        }
    }
}

/// Clip rectangle packed into 64 bits, 16 bits per component.
///
/// Packing keeps batching comparisons to a single integer compare. The zero
/// value means "no clipping". Components are clamped to the `u16` range, so
/// negative origins pack as 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ClipRect(u64);

impl ClipRect {
    pub const NONE: ClipRect = ClipRect(0);

    pub fn pack(rect: Rect) -> Self {
        let component = |value: f32| (value.clamp(0.0, u16::MAX as f32) as u64) & 0xFFFF;
        Self(
            component(rect.x)
                | component(rect.y) << 16
                | component(rect.width) << 32
                | component(rect.height) << 48,
        )
    }

    pub fn unpack(self) -> Rect {
        Rect::new(
            (self.0 & 0xFFFF) as f32,
            (self.0 >> 16 & 0xFFFF) as f32,
            (self.0 >> 32 & 0xFFFF) as f32,
            (self.0 >> 48 & 0xFFFF) as f32,
        )
    }

    pub fn bits(self) -> u64 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Whether a point survives this clip. Always true without clipping.
    pub fn admits(self, x: f32, y: f32) -> bool {
        self.is_none() || self.unpack().contains(x, y)
    }

    /// The clip as a rectangle, `None` when unclipped.
    pub fn rect(self) -> Option<Rect> {
        (!self.is_none()).then(|| self.unpack())
    }
}

/// Tag shared by every widget that belongs to one popup generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PopupMask(pub u32);

/// Slot of a widget in the flat widget array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetId(pub(crate) usize);

impl WidgetId {
    pub fn index(self) -> usize {
        self.0
    }

    /// The slot `count` places after this one.
    pub fn advance(self, count: usize) -> WidgetId {
        WidgetId(self.0 + count)
    }

    pub fn to_raw(self) -> u32 {
        self.0 as u32
    }

    pub fn from_raw(raw: u32) -> Self {
        WidgetId(raw as usize)
    }
}

/// Index of a layout in the layout storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayoutId(pub(crate) usize);

impl LayoutId {
    pub fn index(self) -> usize {
        self.0
    }

    pub fn to_raw(self) -> u32 {
        self.0 as u32
    }

    pub fn from_raw(raw: u32) -> Self {
        LayoutId(raw as usize)
    }
}

/// Reference to any node in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementId {
    Widget(WidgetId),
    Layout(LayoutId),
}

impl ElementId {
    const LAYOUT_TAG: u64 = 1 << 32;

    /// Encoding used across the native extension boundary: the slot or
    /// layout index in the low 32 bits, bit 32 set for layouts.
    pub fn to_raw(self) -> u64 {
        match self {
            ElementId::Widget(id) => id.to_raw() as u64,
            ElementId::Layout(id) => Self::LAYOUT_TAG | id.to_raw() as u64,
        }
    }

    pub fn from_raw(raw: u64) -> Self {
        let index = raw as u32;
        if raw & Self::LAYOUT_TAG != 0 {
            ElementId::Layout(LayoutId::from_raw(index))
        } else {
            ElementId::Widget(WidgetId::from_raw(index))
        }
    }

    pub fn as_widget(self) -> Option<WidgetId> {
        match self {
            ElementId::Widget(id) => Some(id),
            ElementId::Layout(_) => None,
        }
    }

    pub fn as_layout(self) -> Option<LayoutId> {
        match self {
            ElementId::Layout(id) => Some(id),
            ElementId::Widget(_) => None,
        }
    }

    pub fn is_widget(self) -> bool {
        matches!(self, ElementId::Widget(_))
    }
}

impl From<WidgetId> for ElementId {
    fn from(id: WidgetId) -> Self {
        ElementId::Widget(id)
    }
}

impl From<LayoutId> for ElementId {
    fn from(id: LayoutId) -> Self {
        ElementId::Layout(id)
    }
}

/// Attributes common to widgets and layouts.
pub struct Element {
    pub bounds: Rect,
    extension: ExtensionId,
    data: Option<Box<dyn Any>>,
    children: Vec<ElementId>,
    parent: Option<ElementId>,
}

impl Element {
    pub(crate) fn new(extension: ExtensionId, parent: Option<ElementId>) -> Self {
        Self {
            bounds: Rect::default(),
            extension,
            data: None,
            children: Vec::new(),
            parent,
        }
    }

    pub fn extension(&self) -> ExtensionId {
        self.extension
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    pub(crate) fn push_child(&mut self, child: ElementId) {
        self.children.push(child);
    }

    pub(crate) fn remove_child(&mut self, child: ElementId) {
        self.children.retain(|id| *id != child);
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Install the extension's private data, returning whatever was there.
    pub fn set_data(&mut self, data: Box<dyn Any>) -> Option<Box<dyn Any>> {
        self.data.replace(data)
    }

    pub fn data<T: 'static>(&self) -> Option<&T> {
        self.data.as_deref().and_then(|data| data.downcast_ref())
    }

    pub fn data_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.data.as_deref_mut().and_then(|data| data.downcast_mut())
    }

    pub(crate) fn take_data(&mut self) -> Option<Box<dyn Any>> {
        self.data.take()
    }
}

/// Write position inside a widget's geometry buffers during a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeometryCursor {
    pub vertex: usize,
    pub index: usize,
}

/// A renderable node.
pub struct Widget {
    pub element: Element,
    /// Whether the widget is drawn and hit-tested.
    pub visible: bool,
    /// Opt-in per-tick `OnUpdate` polling.
    pub update: bool,
    pub layer: i32,
    pub clip: ClipRect,
    /// Popup generation owning this widget, `None` when unscoped.
    pub mask: Option<PopupMask>,
    /// Geometry changed since the last batching pass.
    pub modified: bool,
    vertices: Box<[Vertex]>,
    indices: Box<[u32]>,
    allocated: bool,
    // Geometry may only be sized while the widget is being parsed.
    allocation_open: bool,
    cursor: GeometryCursor,
}

impl Widget {
    pub(crate) fn new(extension: ExtensionId, parent: Option<ElementId>) -> Self {
        Self {
            element: Element::new(extension, parent),
            visible: true,
            update: false,
            layer: 0,
            clip: ClipRect::NONE,
            mask: None,
            modified: false,
            vertices: Box::default(),
            indices: Box::default(),
            allocated: false,
            allocation_open: true,
            cursor: GeometryCursor::default(),
        }
    }

    /// An empty slot: hidden, owned by no extension.
    pub(crate) fn vacant() -> Self {
        Self {
            visible: false,
            ..Self::new(ExtensionId::VACANT, None)
        }
    }

    pub fn is_vacant(&self) -> bool {
        self.element.extension == ExtensionId::VACANT
    }

    pub fn bounds(&self) -> Rect {
        self.element.bounds
    }

    /// Size the geometry buffers. Buffers are sized exactly once, while the
    /// widget is being parsed; any other attempt is refused and returns
    /// `false`.
    pub fn allocate_geometry(&mut self, vertex_count: usize, index_count: usize) -> bool {
        if !self.allocation_open {
            log::warn!(
                "Refusing to allocate widget geometry outside of parsing ({} vertices, {} indices)",
                vertex_count,
                index_count
            );
            return false;
        }
        if self.allocated {
            log::warn!(
                "Refusing to resize widget geometry ({} vertices, {} indices already allocated)",
                self.vertices.len(),
                self.indices.len()
            );
            return false;
        }
        self.vertices = vec![Vertex::default(); vertex_count].into_boxed_slice();
        self.indices = vec![0; index_count].into_boxed_slice();
        self.allocated = true;
        true
    }

    /// Size the buffers for `count` quads (4 vertices, 6 indices each).
    pub fn allocate_quads(&mut self, count: usize) -> bool {
        self.allocate_geometry(count * 4, count * 6)
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Direct vertex access, e.g. to recolor without a rebuild. Marks the
    /// widget as modified.
    pub fn vertices_mut(&mut self) -> &mut [Vertex] {
        self.modified = true;
        &mut self.vertices
    }

    pub fn cursor(&self) -> GeometryCursor {
        self.cursor
    }

    /// End the parse phase of this widget. Geometry allocation is refused
    /// from now on.
    pub(crate) fn seal_geometry(&mut self) {
        self.allocation_open = false;
    }

    pub(crate) fn reset_cursor(&mut self) {
        self.cursor = GeometryCursor::default();
    }

    /// Append a quad at the write cursor. Indices are local to the widget.
    ///
    /// Returns `false` without writing when the buffers are full.
    pub fn push_quad(&mut self, rect: Rect, uv: TexCoords, color: Color) -> bool {
        let GeometryCursor { vertex, index } = self.cursor;
        if vertex + 4 > self.vertices.len() || index + 6 > self.indices.len() {
            log::warn!("Widget geometry buffer full, dropping quad");
            return false;
        }

        let Rect {
            x,
            y,
            width,
            height,
        } = rect;
        self.vertices[vertex] = Vertex::new(x, y, uv.u_min, uv.v_max, color);
        self.vertices[vertex + 1] = Vertex::new(x, y + height, uv.u_min, uv.v_min, color);
        self.vertices[vertex + 2] = Vertex::new(x + width, y + height, uv.u_max, uv.v_min, color);
        self.vertices[vertex + 3] = Vertex::new(x + width, y, uv.u_max, uv.v_max, color);

        let base = vertex as u32;
        for (slot, offset) in self.indices[index..index + 6]
            .iter_mut()
            .zip([0, 1, 3, 1, 2, 3])
        {
            *slot = base + offset;
        }

        self.cursor.vertex += 4;
        self.cursor.index += 6;
        self.modified = true;
        true
    }

    pub fn push_colored_quad(&mut self, rect: Rect, color: Color) -> bool {
        self.push_quad(rect, TexCoords::SOLID, color)
    }

    /// Recolor `count` vertices starting at `first`.
    pub fn recolor(&mut self, first: usize, count: usize, color: Color) {
        let end = (first + count).min(self.vertices.len());
        for vertex in &mut self.vertices[first.min(end)..end] {
            vertex.color = color.to_array();
        }
        self.modified = true;
    }
}

/// A non-renderable node that only arranges its children.
pub struct Layout {
    pub element: Element,
}

impl Layout {
    pub(crate) fn new(extension: ExtensionId, parent: Option<ElementId>) -> Self {
        Self {
            element: Element::new(extension, parent),
        }
    }

    pub fn bounds(&self) -> Rect {
        self.element.bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> Widget {
        Widget::new(ExtensionId(0), None)
    }

    #[test]
    fn test_clip_rect_pack_unpack() {
        let rect = Rect::new(10.0, 20.0, 300.0, 400.0);
        let packed = ClipRect::pack(rect);
        assert!(!packed.is_none());
        assert_eq!(packed.unpack(), rect);
        assert_eq!(packed, ClipRect::pack(rect));
        assert!(ClipRect::pack(Rect::default()).is_none());
    }

    #[test]
    fn test_clip_rect_admits() {
        assert!(ClipRect::NONE.admits(-50.0, 9000.0));
        let clip = ClipRect::pack(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(clip.admits(5.0, 5.0));
        assert!(!clip.admits(11.0, 5.0));
    }

    #[test]
    fn test_rect_contains_is_inclusive() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rect.contains(10.0, 10.0));
        assert!(rect.contains(0.0, 0.0));
        assert!(!rect.contains(10.1, 0.0));
    }

    #[test]
    fn test_geometry_allocated_once() {
        let mut widget = widget();
        assert!(widget.allocate_quads(2));
        assert!(!widget.allocate_quads(5));
        assert_eq!(widget.vertices().len(), 8);
        assert_eq!(widget.indices().len(), 12);
    }

    #[test]
    fn test_geometry_refused_after_parse() {
        let mut widget = widget();
        widget.seal_geometry();
        assert!(!widget.allocate_quads(1));
        assert!(widget.vertices().is_empty());
    }

    #[test]
    fn test_clip_rect_clamps_negative_components() {
        let packed = ClipRect::pack(Rect::new(-5.0, 10.0, 20.0, 70000.0));
        assert_eq!(packed.unpack(), Rect::new(0.0, 10.0, 20.0, 65535.0));
    }

    #[test]
    fn test_element_id_raw_encoding() {
        let widget = ElementId::Widget(WidgetId(7));
        let layout = ElementId::Layout(LayoutId(7));
        assert_ne!(widget.to_raw(), layout.to_raw());
        assert_eq!(ElementId::from_raw(widget.to_raw()), widget);
        assert_eq!(ElementId::from_raw(layout.to_raw()), layout);
    }

    #[test]
    fn test_push_quad_uses_local_indices() {
        let mut widget = widget();
        widget.allocate_quads(2);
        assert!(widget.push_colored_quad(Rect::new(0.0, 0.0, 1.0, 1.0), Color::WHITE));
        assert!(widget.push_colored_quad(Rect::new(1.0, 1.0, 1.0, 1.0), Color::BLACK));
        assert!(!widget.push_colored_quad(Rect::new(2.0, 2.0, 1.0, 1.0), Color::BLACK));

        assert_eq!(&widget.indices()[..6], &[0, 1, 3, 1, 2, 3]);
        assert_eq!(&widget.indices()[6..], &[4, 5, 7, 5, 6, 7]);
        assert_eq!(widget.vertices()[6].position, [2.0, 2.0]);
        assert!(widget.modified);
    }

    #[test]
    fn test_element_data_downcast() {
        let mut widget = widget();
        assert!(widget.element.set_data(Box::new(42_u32)).is_none());
        assert_eq!(widget.element.data::<u32>(), Some(&42));
        assert!(widget.element.data::<String>().is_none());
        *widget.element.data_mut::<u32>().unwrap() = 7;
        assert_eq!(widget.element.data::<u32>(), Some(&7));
    }
}
