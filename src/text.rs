//! Text geometry from glyph metrics.
//!
//! Rasterization happens elsewhere; the engine only needs each glyph's
//! atlas coordinates and metrics to lay text out as quads.

use std::collections::HashMap;

use bitflags::bitflags;

use crate::element::{Color, Rect, TexCoords, Vertex, WidgetId};
use crate::gui::Gui;
use crate::scene::Attributes;

bitflags! {
    /// Anchor point of a rectangle or a block of geometry.
    ///
    /// Both bits of an axis set means centered on that axis.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Origin: u8 {
        const TOP = 1;
        const BOTTOM = 2;
        const LEFT = 4;
        const RIGHT = 8;
        const CENTER_VERTICAL = Self::TOP.bits() | Self::BOTTOM.bits();
        const CENTER_HORIZONTAL = Self::LEFT.bits() | Self::RIGHT.bits();
        const CENTER = Self::CENTER_VERTICAL.bits() | Self::CENTER_HORIZONTAL.bits();
    }
}

impl Default for Origin {
    fn default() -> Self {
        Origin::TOP | Origin::LEFT
    }
}

impl Origin {
    /// Read `align_vertical` (`top`/`bottom`/`center`) and `align_horizontal`
    /// (`left`/`right`/`center`), starting from top left.
    pub fn from_attributes(attributes: &Attributes) -> Self {
        let mut origin = Origin::default();

        let vertical = attributes.choice(
            "align_vertical",
            &[
                ("top", Origin::TOP),
                ("bottom", Origin::BOTTOM),
                ("center", Origin::CENTER_VERTICAL),
            ],
        );
        if let Some(vertical) = vertical {
            origin = (origin & Origin::CENTER_HORIZONTAL) | vertical;
        }

        let horizontal = attributes.choice(
            "align_horizontal",
            &[
                ("left", Origin::LEFT),
                ("right", Origin::RIGHT),
                ("center", Origin::CENTER_HORIZONTAL),
            ],
        );
        if let Some(horizontal) = horizontal {
            origin = (origin & Origin::CENTER_VERTICAL) | horizontal;
        }

        origin
    }

    /// The anchor point of `rect`.
    pub fn anchor(self, rect: Rect) -> (f32, f32) {
        let horizontal = self & Origin::CENTER_HORIZONTAL;
        let x = if horizontal == Origin::CENTER_HORIZONTAL {
            rect.x + rect.width * 0.5
        } else if horizontal == Origin::RIGHT {
            rect.x + rect.width
        } else {
            rect.x
        };

        let vertical = self & Origin::CENTER_VERTICAL;
        let y = if vertical == Origin::CENTER_VERTICAL {
            rect.y + rect.height * 0.5
        } else if vertical == Origin::BOTTOM {
            rect.y + rect.height
        } else {
            rect.y
        };
        (x, y)
    }

    /// Translate `vertices` so that their bounding box's anchor lands on
    /// `(x, y)`.
    pub fn align(self, vertices: &mut [Vertex], x: f32, y: f32) {
        let Some(first) = vertices.first() else {
            return;
        };
        let [mut min_x, mut min_y] = first.position;
        let (mut max_x, mut max_y) = (min_x, min_y);
        for vertex in vertices.iter() {
            let [vx, vy] = vertex.position;
            min_x = min_x.min(vx);
            max_x = max_x.max(vx);
            min_y = min_y.min(vy);
            max_y = max_y.max(vy);
        }

        let bounds = Rect::new(min_x, min_y, max_x - min_x, max_y - min_y);
        let (anchor_x, anchor_y) = self.anchor(bounds);
        for vertex in vertices.iter_mut() {
            vertex.position[0] += x - anchor_x;
            vertex.position[1] += y - anchor_y;
        }
    }
}

/// Metrics of one glyph in the font atlas.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Glyph {
    pub uv: TexCoords,
    pub width: f32,
    pub height: f32,
    /// Horizontal bearing.
    pub x_offset: f32,
    /// Vertical bearing, from the baseline up to the glyph's top.
    pub y_offset: f32,
    pub x_advance: f32,
}

/// Glyph metrics for the font texture handed to the renderer.
#[derive(Debug, Clone, Default)]
pub struct GlyphAtlas {
    glyphs: HashMap<char, Glyph>,
    line_height: f32,
    ascent: f32,
}

impl GlyphAtlas {
    pub fn new(line_height: f32, ascent: f32) -> Self {
        Self {
            glyphs: HashMap::new(),
            line_height,
            ascent,
        }
    }

    /// An atlas where every printable ASCII character is a box of the same
    /// size. Handy for tests and for measuring without a font.
    pub fn monospace(advance: f32, height: f32) -> Self {
        let mut atlas = Self::new(height, 0.0);
        for character in ' '..='~' {
            atlas.insert(
                character,
                Glyph {
                    uv: TexCoords::SOLID,
                    width: advance,
                    height,
                    x_offset: 0.0,
                    y_offset: height,
                    x_advance: advance,
                },
            );
        }
        atlas
    }

    pub fn insert(&mut self, character: char, glyph: Glyph) {
        self.glyphs.insert(character, glyph);
    }

    /// Glyph for `character`, falling back to `?` for unknown characters.
    pub fn glyph(&self, character: char) -> Option<&Glyph> {
        self.glyphs
            .get(&character)
            .or_else(|| self.glyphs.get(&'?'))
    }

    /// Height reported to extensions at init.
    pub fn font_height(&self) -> i32 {
        (self.line_height + self.ascent) as i32
    }

    /// Width (sum of advances) and height (tallest glyph) of `text`.
    pub fn measure(&self, text: &str) -> (i32, i32) {
        let mut width = 0.0_f32;
        let mut height = 0.0_f32;
        for glyph in text.chars().filter_map(|character| self.glyph(character)) {
            width += glyph.x_advance;
            height = height.max(glyph.height);
        }
        (width as i32, height as i32)
    }
}

impl Gui {
    pub fn set_glyph_atlas(&mut self, atlas: GlyphAtlas) {
        self.glyphs = atlas;
    }

    pub fn glyph_atlas(&self) -> &GlyphAtlas {
        &self.glyphs
    }

    /// Font height extensions should lay text out with.
    pub fn font_height(&self) -> i32 {
        if self.glyphs.line_height > 0.0 {
            self.glyphs.font_height()
        } else {
            self.config.font_height
        }
    }

    pub fn measure_text(&self, text: &str) -> (i32, i32) {
        self.glyphs.measure(text)
    }

    /// Write `text` as one quad per glyph at the widget's write cursor, with
    /// the top left of the line at the origin. Returns the number of quads
    /// written.
    pub fn create_text(&mut self, widget: WidgetId, text: &str, color: Color) -> usize {
        let line_height = self.font_height() as f32;
        let Gui { tree, glyphs, .. } = self;
        let Some(widget) = tree.widget_mut(widget) else {
            return 0;
        };

        let mut x = 0.0;
        let mut written = 0;
        for glyph in text.chars().filter_map(|character| glyphs.glyph(character)) {
            let rect = Rect::new(
                x + glyph.x_offset,
                line_height - glyph.y_offset,
                glyph.width,
                glyph.height,
            );
            if !widget.push_quad(rect, glyph.uv, color) {
                break;
            }
            written += 1;
            x += glyph.x_advance;
        }
        written
    }

    /// [`create_text`](Self::create_text), then move the text so its
    /// `origin` anchor lands on `(x, y)`.
    pub fn create_aligned_text(
        &mut self,
        widget: WidgetId,
        text: &str,
        color: Color,
        origin: Origin,
        x: f32,
        y: f32,
    ) -> usize {
        let first = match self.tree.widget(widget) {
            Some(state) => state.cursor().vertex,
            None => return 0,
        };
        let written = self.create_text(widget, text, color);
        if let Some(state) = self.tree.widget_mut(widget) {
            let end = first + written * 4;
            origin.align(&mut state.vertices_mut()[first..end], x, y);
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::ExtensionId;
    use crate::gui::GuiConfig;

    fn vertex(x: f32, y: f32) -> Vertex {
        Vertex::new(x, y, 0.0, 0.0, Color::WHITE)
    }

    #[test]
    fn test_origin_anchor() {
        let rect = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(Origin::default().anchor(rect), (10.0, 20.0));
        assert_eq!(Origin::CENTER.anchor(rect), (60.0, 45.0));
        assert_eq!((Origin::BOTTOM | Origin::RIGHT).anchor(rect), (110.0, 70.0));
    }

    #[test]
    fn test_origin_from_attributes() {
        let lua = mlua::Lua::new();
        let element: mlua::Table = lua
            .load("return { align_vertical = 'center', align_horizontal = 'right' }")
            .eval()
            .unwrap();
        let origin = Origin::from_attributes(&Attributes::new(&element, None));
        assert_eq!(origin, Origin::CENTER_VERTICAL | Origin::RIGHT);
    }

    #[test]
    fn test_align_uses_bounding_box() {
        let mut vertices = [vertex(2.0, 2.0), vertex(6.0, 2.0), vertex(6.0, 4.0)];
        Origin::CENTER.align(&mut vertices, 0.0, 0.0);
        assert_eq!(vertices[0].position, [-2.0, -1.0]);
        assert_eq!(vertices[2].position, [2.0, 1.0]);
    }

    #[test]
    fn test_measure_uses_fallback_glyph() {
        let atlas = GlyphAtlas::monospace(8.0, 16.0);
        assert_eq!(atlas.measure("abc"), (24, 16));
        // Outside the atlas: falls back to '?'.
        assert_eq!(atlas.measure("é"), (8, 16));
        assert_eq!(GlyphAtlas::default().measure("abc"), (0, 0));
    }

    fn gui_with_widget() -> (Gui, WidgetId) {
        let mut gui = Gui::new(GuiConfig::default());
        gui.set_glyph_atlas(GlyphAtlas::monospace(8.0, 16.0));
        let widget = WidgetId(0);
        gui.tree.reserve_widgets(1);
        gui.tree.place_widget(widget, ExtensionId(0), None);
        gui.widget_mut(widget).unwrap().allocate_quads(4);
        (gui, widget)
    }

    #[test]
    fn test_create_text_writes_one_quad_per_glyph() {
        let (mut gui, widget) = gui_with_widget();

        assert_eq!(gui.create_text(widget, "ab", Color::BLACK), 2);
        let state = gui.widget(widget).unwrap();
        assert_eq!(state.cursor().vertex, 8);
        assert_eq!(state.vertices()[0].position, [0.0, 0.0]);
        assert_eq!(state.vertices()[4].position, [8.0, 0.0]);
        assert_eq!(state.vertices()[6].position, [16.0, 16.0]);
    }

    #[test]
    fn test_create_aligned_text_stops_when_full() {
        let (mut gui, widget) = gui_with_widget();

        assert_eq!(gui.create_text(widget, "ab", Color::BLACK), 2);
        let written = gui.create_aligned_text(widget, "cdef", Color::WHITE, Origin::CENTER, 50.0, 50.0);
        assert_eq!(written, 2);

        // Only the second run moved: "cd" is 16x16, centered on (50, 50).
        let state = gui.widget(widget).unwrap();
        assert_eq!(state.vertices()[0].position, [0.0, 0.0]);
        assert_eq!(state.vertices()[8].position, [42.0, 42.0]);
        assert_eq!(state.vertices()[14].position, [58.0, 58.0]);
    }
}
