//! Per-tick batching of widget geometry into draw lists.
//!
//! Visible widgets are grouped by (layer, clip rectangle). Each group becomes
//! one contiguous span in the shared vertex and index buffers, with indices
//! rewritten to be relative to the span's first vertex. Spans are ordered by
//! ascending layer; within a layer, by the first widget that used the clip.

use std::ops::Range;

use crate::element::{ClipRect, Rect, Vertex, Widget};
use crate::gui::Gui;

/// One batched span, drawn with a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawList {
    pub vertex_offset: usize,
    pub vertex_count: usize,
    pub index_offset: usize,
    pub index_count: usize,
    pub layer: i32,
    pub clip: ClipRect,
}

impl DrawList {
    /// Scissor rectangle, `None` when unclipped.
    pub fn clip_rect(&self) -> Option<Rect> {
        self.clip.rect()
    }

    pub fn vertex_range(&self) -> Range<usize> {
        self.vertex_offset..self.vertex_offset + self.vertex_count
    }

    pub fn index_range(&self) -> Range<usize> {
        self.index_offset..self.index_offset + self.index_count
    }
}

#[derive(Debug, Default)]
pub struct DrawListBatcher {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    lists: Vec<DrawList>,
}

impl DrawListBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Regroup the geometry of every visible widget. Clears the widgets'
    /// modified flags.
    pub fn rebuild(&mut self, widgets: &mut [Widget]) {
        self.vertices.clear();
        self.indices.clear();
        self.lists.clear();

        let mut groups: Vec<(i32, ClipRect)> = Vec::new();
        for widget in widgets.iter().filter(|widget| widget.visible) {
            let key = (widget.layer, widget.clip);
            if !groups.contains(&key) {
                groups.push(key);
            }
        }
        // Stable: clip order within a layer stays first-appearance order.
        groups.sort_by_key(|(layer, _)| *layer);

        for (layer, clip) in groups {
            let vertex_offset = self.vertices.len();
            let index_offset = self.indices.len();

            for widget in widgets
                .iter_mut()
                .filter(|widget| widget.visible && widget.layer == layer && widget.clip == clip)
            {
                let base = (self.vertices.len() - vertex_offset) as u32;
                self.vertices.extend_from_slice(widget.vertices());
                self.indices
                    .extend(widget.indices().iter().map(|index| index + base));
                widget.modified = false;
            }

            if self.indices.len() == index_offset {
                self.vertices.truncate(vertex_offset);
                continue;
            }

            self.lists.push(DrawList {
                vertex_offset,
                vertex_count: self.vertices.len() - vertex_offset,
                index_offset,
                index_count: self.indices.len() - index_offset,
                layer,
                clip,
            });
        }

        log::trace!(
            "Batched {} vertices and {} indices into {} draw lists",
            self.vertices.len(),
            self.indices.len(),
            self.lists.len()
        );
    }

    pub fn lists(&self) -> &[DrawList] {
        &self.lists
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub(crate) fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.lists.clear();
    }
}

impl Gui {
    /// Draw lists from the last [`update`](Gui::update).
    pub fn draw_lists(&self) -> &[DrawList] {
        self.batcher.lists()
    }

    pub fn draw_vertices(&self) -> &[Vertex] {
        self.batcher.vertices()
    }

    pub fn draw_indices(&self) -> &[u32] {
        self.batcher.indices()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Color;
    use crate::extension::ExtensionId;

    fn quad_widget(quads: usize) -> Widget {
        let mut widget = Widget::new(ExtensionId(0), None);
        widget.allocate_quads(quads);
        for i in 0..quads {
            widget.push_colored_quad(Rect::new(i as f32, 0.0, 1.0, 1.0), Color::WHITE);
        }
        widget
    }

    #[test]
    fn test_same_layer_and_clip_share_one_span() {
        let mut widgets = vec![quad_widget(1), quad_widget(2)];
        let mut batcher = DrawListBatcher::new();
        batcher.rebuild(&mut widgets);

        assert_eq!(batcher.lists().len(), 1);
        let list = batcher.lists()[0];
        assert_eq!(list.vertex_count, 12);
        assert_eq!(list.index_count, 18);
        // The second widget's indices are shifted past the first widget.
        assert_eq!(&batcher.indices()[6..12], &[4, 5, 7, 5, 6, 7]);
        assert!(widgets.iter().all(|widget| !widget.modified));
    }

    #[test]
    fn test_layers_split_and_order_spans() {
        let mut widgets = vec![quad_widget(1), quad_widget(1), quad_widget(1)];
        widgets[0].layer = 2;
        widgets[1].layer = 1;
        let mut batcher = DrawListBatcher::new();
        batcher.rebuild(&mut widgets);

        let layers: Vec<_> = batcher.lists().iter().map(|list| list.layer).collect();
        assert_eq!(layers, [0, 1, 2]);
        // Span-relative indices.
        for list in batcher.lists() {
            assert_eq!(&batcher.indices()[list.index_range()], &[0, 1, 3, 1, 2, 3]);
        }
        assert_eq!(batcher.lists()[2].vertex_offset, 8);
    }

    #[test]
    fn test_clip_rects_split_within_layer() {
        let mut widgets = vec![quad_widget(1), quad_widget(1), quad_widget(1)];
        let clip = ClipRect::pack(Rect::new(0.0, 0.0, 5.0, 5.0));
        widgets[1].clip = clip;
        let mut batcher = DrawListBatcher::new();
        batcher.rebuild(&mut widgets);

        assert_eq!(batcher.lists().len(), 2);
        assert!(batcher.lists()[0].clip_rect().is_none());
        assert_eq!(batcher.lists()[0].vertex_count, 8);
        assert_eq!(batcher.lists()[1].clip_rect(), Some(Rect::new(0.0, 0.0, 5.0, 5.0)));
    }

    #[test]
    fn test_hidden_and_empty_widgets_produce_no_spans() {
        let mut widgets = vec![quad_widget(1), Widget::new(ExtensionId(0), None)];
        widgets[0].visible = false;
        widgets[1].layer = 3;
        let mut batcher = DrawListBatcher::new();
        batcher.rebuild(&mut widgets);

        assert!(batcher.lists().is_empty());
        assert!(batcher.vertices().is_empty());
    }

    #[test]
    fn test_vertices_cast_to_bytes() {
        let mut widgets = vec![quad_widget(1)];
        let mut batcher = DrawListBatcher::new();
        batcher.rebuild(&mut widgets);

        let bytes: &[u8] = bytemuck::cast_slice(batcher.vertices());
        assert_eq!(bytes.len(), 4 * std::mem::size_of::<Vertex>());
    }
}
