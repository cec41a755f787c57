/// Draw collection and batching for the world layer.
///
/// Opaque commands sort by their draw key (pipeline, material, geometry,
/// range) and collapse into maximal equal-key runs; each run becomes one
/// batch that draws from a single instance-buffer allocation. Transparent
/// commands sort back-to-front by camera distance and never merge.

use glam::Mat4;
use rdst::{RadixKey, RadixSort};
use crate::renderer::{MaterialData, MeshInstanceHandle};

/// Sort/merge key of a draw command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawKey {
    pub pipeline: u32,
    pub material: u32,
    pub geometry: u32,
    /// Buffer-range id; forced to zero for opaques when multi-draw-indirect
    /// can merge across ranges
    pub range: u32,
}

/// One collected draw
#[derive(Debug, Clone, Copy)]
pub struct DrawCommand {
    pub key: DrawKey,
    pub mesh_index: u32,
    pub submesh_index: u32,
    /// Set on the instance path; invalid for mesh-slot draws
    pub instance: MeshInstanceHandle,
    pub model: Mat4,
    pub object_id: u32,
    /// Only meaningful for transparents
    pub camera_distance: f32,
    pub is_instance: bool,
}

impl RadixKey for DrawCommand {
    const LEVELS: usize = 16;

    #[inline]
    fn get_level(&self, level: usize) -> u8 {
        // Level 0 is the least significant byte: range, then geometry,
        // material, pipeline, yielding an ascending sort by
        // (pipeline, material, geometry, range)
        let word = match level / 4 {
            0 => self.key.range,
            1 => self.key.geometry,
            2 => self.key.material,
            _ => self.key.pipeline,
        };
        (word >> ((level % 4) * 8)) as u8
    }
}

/// A maximal run of equal-key opaque commands
#[derive(Debug, Clone, Copy)]
pub struct DrawBatch {
    pub first_command: usize,
    pub command_count: usize,
    /// Base slot in the instance buffer, assigned at allocation time
    pub first_instance: u32,
}

impl DrawBatch {
    /// Index range into the opaque command list
    pub fn range(&self) -> std::ops::Range<usize> {
        self.first_command..self.first_command + self.command_count
    }
}

/// The cutout rule: alpha-tested materials with an enabled, non-zero
/// diffuse texture render in the transparent pass. Cutouts are never
/// silently reclassified as opaque.
pub fn material_is_cutout(material: &MaterialData) -> bool {
    material.alpha_cutoff > 0.0
        && material.diffuse_enabled
        && material.diffuse_texture.is_valid()
}

/// Per-frame command collector.
pub struct DrawBatcher {
    opaque: Vec<DrawCommand>,
    transparent: Vec<DrawCommand>,
    batches: Vec<DrawBatch>,
}

impl DrawBatcher {
    pub fn new() -> Self {
        Self {
            opaque: Vec::new(),
            transparent: Vec::new(),
            batches: Vec::new(),
        }
    }

    /// Drop all collected commands and batches
    pub fn clear(&mut self) {
        self.opaque.clear();
        self.transparent.clear();
        self.batches.clear();
    }

    /// Collect an opaque command
    pub fn push_opaque(&mut self, command: DrawCommand) {
        self.opaque.push(command);
    }

    /// Collect a transparent command
    pub fn push_transparent(&mut self, command: DrawCommand) {
        self.transparent.push(command);
    }

    /// Sort both lists and produce opaque batches.
    ///
    /// Opaque: radix sort by key, then collapse maximal equal-key runs.
    /// Transparent: descending camera distance (farther draws first).
    pub fn build(&mut self) {
        self.batches.clear();

        self.opaque.radix_sort_unstable();
        let mut cursor = 0;
        while cursor < self.opaque.len() {
            let key = self.opaque[cursor].key;
            let mut end = cursor + 1;
            while end < self.opaque.len() && self.opaque[end].key == key {
                end += 1;
            }
            self.batches.push(DrawBatch {
                first_command: cursor,
                command_count: end - cursor,
                first_instance: 0,
            });
            cursor = end;
        }

        self.transparent.sort_by(|a, b| {
            b.camera_distance
                .partial_cmp(&a.camera_distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    /// Sorted opaque commands
    pub fn opaque(&self) -> &[DrawCommand] {
        &self.opaque
    }

    /// Sorted transparent commands
    pub fn transparent(&self) -> &[DrawCommand] {
        &self.transparent
    }

    /// Opaque batches (after `build`)
    pub fn batches(&self) -> &[DrawBatch] {
        &self.batches
    }

    /// Record a batch's allocated instance-buffer base
    pub fn set_batch_first_instance(&mut self, batch_index: usize, first_instance: u32) {
        if let Some(batch) = self.batches.get_mut(batch_index) {
            batch.first_instance = first_instance;
        }
    }
}

impl Default for DrawBatcher {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
