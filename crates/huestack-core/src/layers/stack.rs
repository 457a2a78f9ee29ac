//! The layer stack compositor.
//!
//! Layers live in an arena indexed bottom (0, the base image) to top. Every
//! layer caches two buffers:
//! - `output`: its operation applied to the stack beneath it
//! - `merged`: the stack beneath it with `output` composited on top
//!
//! A single watermark records the lowest dirty layer. Marking layer `i`
//! dirty marks every layer above it too; recomputation starts at the
//! watermark and walks up, so layers beneath it are never touched.

use super::blend::{BlendMode, Composite};
use super::ops::LayerOp;
use crate::error::{Error, Result};
use crate::image::{Mask, PixelBuffer, Rect};
use crate::lut3d::Lut3D;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerState {
    Clean,
    Dirty,
}

/// One adjustment (or the base image) in a [`LayerStack`].
///
/// Compositing attributes are changed through the owning stack so the dirty
/// bookkeeping stays in sync; the builder methods are for layers that are
/// not yet in a stack.
#[derive(Debug, Clone)]
pub struct Layer {
    pub name: String,
    visible: bool,
    opacity: f32,
    blend_mode: BlendMode,
    mask: Option<Mask>,
    rect: Option<Rect>,
    op: LayerOp,
    output: Option<PixelBuffer>,
    merged: Option<PixelBuffer>,
    state: LayerState,
}

impl Layer {
    pub fn new(name: impl Into<String>, op: LayerOp) -> Self {
        Self {
            name: name.into(),
            visible: true,
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            mask: None,
            rect: None,
            op,
            output: None,
            merged: None,
            state: LayerState::Dirty,
        }
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_blend_mode(mut self, mode: BlendMode) -> Self {
        self.blend_mode = mode;
        self
    }

    pub fn with_mask(mut self, mask: Mask) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn with_rect(mut self, rect: Rect) -> Self {
        self.rect = Some(rect);
        self
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn mask(&self) -> Option<&Mask> {
        self.mask.as_ref()
    }

    pub fn rect(&self) -> Option<Rect> {
        self.rect
    }

    pub fn op(&self) -> &LayerOp {
        &self.op
    }

    /// Cached operation result; `None` before the first computation.
    pub fn output(&self) -> Option<&PixelBuffer> {
        self.output.as_ref()
    }

    /// Cached stack result up to and including this layer.
    pub fn merged(&self) -> Option<&PixelBuffer> {
        self.merged.as_ref()
    }

    pub fn state(&self) -> LayerState {
        self.state
    }

    fn composite(&self) -> Composite<'_> {
        Composite {
            mode: self.blend_mode,
            opacity: self.opacity,
            mask: self.mask.as_ref(),
            rect: self.rect,
        }
    }

    /// Recomputes both caches from `input`. On error nothing is overwritten.
    ///
    /// Invisible layers still run their operation but pass `input` through
    /// as their merged result.
    fn compute(&mut self, input: &PixelBuffer, is_base: bool) -> Result<()> {
        let output = self.op.execute(input)?;
        input.ensure_same_shape(&output)?;
        let merged = if is_base {
            output.clone()
        } else {
            let mut merged = input.clone();
            if self.visible {
                self.composite().apply(&mut merged, &output);
            }
            merged
        };
        self.output = Some(output);
        self.merged = Some(merged);
        self.state = LayerState::Clean;
        Ok(())
    }
}

/// Ordered, never-empty stack of layers over a base image.
#[derive(Debug, Clone)]
pub struct LayerStack {
    base: PixelBuffer,
    layers: Vec<Layer>,
    active: usize,
    dirty_from: Option<usize>,
}

impl LayerStack {
    /// New stack holding only the base image layer.
    pub fn new(base: PixelBuffer) -> Self {
        Self {
            base,
            layers: vec![Layer::new("Background", LayerOp::Source)],
            active: 0,
            dirty_from: Some(0),
        }
    }

    pub fn base(&self) -> &PixelBuffer {
        &self.base
    }

    /// Replaces the base image. The new image must have the same size.
    pub fn set_base(&mut self, base: PixelBuffer) -> Result<()> {
        self.base.ensure_same_shape(&base)?;
        self.base = base;
        self.mark_dirty(0)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Result<&Layer> {
        self.layers.get(index).ok_or_else(|| {
            Error::state(format!(
                "layer index {index} out of range (stack has {} layers)",
                self.layers.len()
            ))
        })
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn active_layer(&self) -> &Layer {
        &self.layers[self.active]
    }

    pub fn set_active(&mut self, index: usize) -> Result<()> {
        self.layer(index)?;
        self.active = index;
        Ok(())
    }

    /// Lowest dirty layer, `None` when every cache is valid.
    pub fn dirty_from(&self) -> Option<usize> {
        self.dirty_from
    }

    pub fn is_clean(&self) -> bool {
        self.dirty_from.is_none()
    }

    /// Appends a layer on top and makes it active. Returns its index.
    pub fn push(&mut self, layer: Layer) -> Result<usize> {
        let index = self.layers.len();
        self.insert(index, layer)?;
        Ok(index)
    }

    /// Inserts a layer at `index` (above the base) and makes it active.
    pub fn insert(&mut self, index: usize, mut layer: Layer) -> Result<()> {
        if index == 0 || index > self.layers.len() {
            return Err(Error::state(format!(
                "cannot insert a layer at index {index} (valid: 1..={})",
                self.layers.len()
            )));
        }
        self.check_layer(&layer)?;
        layer.output = None;
        layer.merged = None;
        layer.state = LayerState::Dirty;
        tracing::debug!("Inserting {} layer '{}' at {index}", layer.op.kind(), layer.name);
        self.layers.insert(index, layer);
        self.active = index;
        self.mark_dirty(index)
    }

    /// Removes and returns the layer at `index`. The base layer stays.
    pub fn remove(&mut self, index: usize) -> Result<Layer> {
        self.check_movable(index)?;
        let layer = self.layers.remove(index);
        if self.active > index || self.active >= self.layers.len() {
            self.active -= 1;
        }
        if index < self.layers.len() {
            self.mark_dirty(index)?;
        } else if self.dirty_from.is_some_and(|d| d >= self.layers.len()) {
            self.dirty_from = None;
        }
        tracing::debug!("Removed layer '{}' from {index}", layer.name);
        Ok(layer)
    }

    /// Moves the layer at `from` to position `to`. The base layer stays.
    pub fn move_layer(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_movable(from)?;
        self.check_movable(to)?;
        if from == to {
            return Ok(());
        }
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
        if self.active == from {
            self.active = to;
        } else if from < self.active && self.active <= to {
            self.active -= 1;
        } else if to <= self.active && self.active < from {
            self.active += 1;
        }
        self.mark_dirty(from.min(to))
    }

    pub fn set_op(&mut self, index: usize, op: LayerOp) -> Result<()> {
        self.check_op(index, &op)?;
        self.layers[index].op = op;
        self.mark_dirty(index)
    }

    /// Edits a layer's operation in place through `f`.
    ///
    /// `f` works on a copy, so a rejected edit leaves the layer untouched.
    pub fn update_op<F>(&mut self, index: usize, f: F) -> Result<()>
    where
        F: FnOnce(&mut LayerOp),
    {
        let mut op = self.layer(index)?.op.clone();
        f(&mut op);
        self.set_op(index, op)
    }

    pub fn set_opacity(&mut self, index: usize, opacity: f32) -> Result<()> {
        self.layer(index)?;
        Error::check_range("opacity", opacity as f64, 0.0, 1.0)?;
        self.layers[index].opacity = opacity;
        self.mark_dirty(index)
    }

    pub fn set_visible(&mut self, index: usize, visible: bool) -> Result<()> {
        self.layer(index)?;
        self.layers[index].visible = visible;
        self.mark_dirty(index)
    }

    pub fn set_blend_mode(&mut self, index: usize, mode: BlendMode) -> Result<()> {
        self.layer(index)?;
        self.layers[index].blend_mode = mode;
        self.mark_dirty(index)
    }

    pub fn set_mask(&mut self, index: usize, mask: Option<Mask>) -> Result<()> {
        self.layer(index)?;
        if let Some(mask) = &mask {
            mask.ensure_fits(&self.base)?;
        }
        self.layers[index].mask = mask;
        self.mark_dirty(index)
    }

    pub fn set_rect(&mut self, index: usize, rect: Option<Rect>) -> Result<()> {
        self.layer(index)?;
        self.layers[index].rect = rect;
        self.mark_dirty(index)
    }

    /// Invalidates layer `index` and every layer above it.
    pub fn mark_dirty(&mut self, index: usize) -> Result<()> {
        self.layer(index)?;
        for layer in &mut self.layers[index..] {
            layer.state = LayerState::Dirty;
        }
        let from = self.dirty_from.map_or(index, |d| d.min(index));
        if self.dirty_from != Some(from) {
            tracing::debug!("Stack dirty from layer {from}");
        }
        self.dirty_from = Some(from);
        Ok(())
    }

    /// Recomputes every dirty layer, bottom to top.
    ///
    /// If a layer fails, it keeps its previous caches, it and every layer
    /// above it stay dirty, the watermark points at it and the error is
    /// returned. Layers beneath the watermark are never touched.
    pub fn apply_to_stack(&mut self) -> Result<()> {
        let Some(start) = self.dirty_from else {
            return Ok(());
        };
        tracing::debug!(
            "Recomputing layers {start}..={}",
            self.layers.len() - 1
        );
        for i in start..self.layers.len() {
            let (below, rest) = self.layers.split_at_mut(i);
            let layer = &mut rest[0];
            let input = match below.last() {
                None => &self.base,
                Some(prev) => prev.merged.as_ref().ok_or_else(|| {
                    Error::state(format!("layer {} has no cached result", i - 1))
                })?,
            };
            if let Err(err) = layer.compute(input, i == 0) {
                tracing::warn!(
                    "{} layer '{}' at {i} failed: {err}",
                    layer.op.kind(),
                    layer.name
                );
                self.dirty_from = Some(i);
                return Err(err);
            }
        }
        self.dirty_from = None;
        Ok(())
    }

    /// Marks layer `index` dirty and recomputes from there.
    pub fn apply_from(&mut self, index: usize) -> Result<()> {
        self.mark_dirty(index)?;
        self.apply_to_stack()
    }

    /// Flattens the visible layers bottom to top over the base layer,
    /// honoring each layer's opacity, mask, blend mode and rectangle.
    pub fn merge_visible_layers(&self) -> Result<PixelBuffer> {
        if let Some(i) = self.dirty_from {
            return Err(Error::state(format!(
                "cannot merge: stack is dirty from layer {i}"
            )));
        }
        let mut acc = self.layers[0]
            .output
            .clone()
            .ok_or_else(|| Error::state("base layer has no cached output"))?;
        for layer in self.layers.iter().skip(1).filter(|l| l.visible) {
            let output = layer
                .output
                .as_ref()
                .ok_or_else(|| Error::state(format!("layer '{}' has no cached output", layer.name)))?;
            layer.composite().apply(&mut acc, output);
        }
        Ok(acc)
    }

    /// Recomputes dirty layers and returns the flattened image.
    pub fn render(&mut self) -> Result<PixelBuffer> {
        self.apply_to_stack()?;
        self.merge_visible_layers()
    }

    /// 3D LUT equivalent to the stack's color adjustments.
    ///
    /// The layers run over an identity Hald image instead of the base.
    /// Spatial layers (filters, segmentation) and masks/rectangles have no
    /// LUT equivalent and are skipped.
    pub fn bake_lut(&self, size: usize) -> Result<Lut3D> {
        Lut3D::from_image_transform(size, |hald| {
            let mut stack = LayerStack::new(hald.clone());
            for layer in self.layers.iter().skip(1) {
                if !layer.op.is_color_transform() {
                    tracing::warn!(
                        "Skipping {} layer '{}' while baking a LUT",
                        layer.op.kind(),
                        layer.name
                    );
                    continue;
                }
                let copy = Layer::new(layer.name.clone(), layer.op.clone())
                    .with_visible(layer.visible)
                    .with_opacity(layer.opacity)
                    .with_blend_mode(layer.blend_mode);
                stack.push(copy)?;
            }
            stack.render()
        })
    }

    fn check_layer(&self, layer: &Layer) -> Result<()> {
        if matches!(layer.op, LayerOp::Source) {
            return Err(Error::state("only the base layer can be a source layer"));
        }
        Error::check_range("opacity", layer.opacity as f64, 0.0, 1.0)?;
        if let Some(mask) = &layer.mask {
            mask.ensure_fits(&self.base)?;
        }
        Ok(())
    }

    fn check_op(&self, index: usize, op: &LayerOp) -> Result<()> {
        self.layer(index)?;
        match (index, op) {
            (0, LayerOp::Source) => Ok(()),
            (0, _) => Err(Error::state("the base layer must stay a source layer")),
            (_, LayerOp::Source) => Err(Error::state("only the base layer can be a source layer")),
            _ => Ok(()),
        }
    }

    fn check_movable(&self, index: usize) -> Result<()> {
        self.layer(index)?;
        if index == 0 {
            return Err(Error::state("the base layer cannot be removed or moved"));
        }
        Ok(())
    }
}
