//! Renderer seam.
//!
//! The session owns exactly one [`RenderBackend`]. The wgpu implementations
//! live in [`crate::gpu`]. [`HeadlessBackend`] renders nothing but keeps the
//! same bookkeeping (size, pixel ratio, per-frame counts, resource release)
//! and is what the CPU-only tests drive.

use std::cell::Cell;
use std::rc::Rc;

use crate::builder::Environment;
use crate::camera::CameraState;
use crate::lighting::LightingRig;
use crate::scene_graph::SceneGraph;

/// Counters for the last rendered frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderInfo {
    /// Triangles drawn in the main pass.
    pub triangles: u64,
    pub draw_calls: u32,
    pub points: u64,
}

impl RenderInfo {
    /// Main-pass counts for every visible mesh of `scene`.
    pub fn measure(scene: &SceneGraph) -> Self {
        let mut info = RenderInfo::default();
        for item in scene.renderables() {
            info.triangles += item.mesh.geometry.triangle_count() as u64;
            info.points += item.mesh.geometry.point_count() as u64;
            info.draw_calls += 1;
        }
        info
    }
}

/// Everything a backend needs to draw one frame.
#[derive(Clone, Copy)]
pub struct FrameInputs<'a> {
    pub scene: &'a SceneGraph,
    pub camera: &'a CameraState,
    pub lights: &'a LightingRig,
    pub environment: &'a Environment,
}

pub trait RenderBackend {
    /// Resize the output in CSS pixels. The drawing buffer is `size * pixel_ratio`.
    fn set_size(&mut self, width: u32, height: u32);
    fn size(&self) -> (u32, u32);
    fn set_pixel_ratio(&mut self, ratio: f32);
    fn pixel_ratio(&self) -> f32;

    /// Largest 2D texture edge the device supports.
    fn max_texture_size(&self) -> u32 {
        u32::MAX
    }

    fn render(&mut self, frame: &FrameInputs<'_>) -> RenderInfo;

    /// Remove the output surface from the container.
    fn detach_output(&mut self);
    /// Free device resources. Idempotent.
    fn release(&mut self);
    fn is_released(&self) -> bool;
}

/// Drawing-buffer size for a CSS size and pixel ratio, at least 1×1.
pub fn physical_size(width: u32, height: u32, pixel_ratio: f32) -> (u32, u32) {
    let scale = |v: u32| ((v as f32 * pixel_ratio).round() as u32).max(1);
    (scale(width), scale(height))
}

// ============================================================================
// Resource tracking
// ============================================================================

/// Shared count of live backends, used to detect leaks across remounts.
#[derive(Debug, Clone, Default)]
pub struct ResourceTracker {
    live: Rc<Cell<usize>>,
    created: Rc<Cell<usize>>,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn acquire(&self) {
        self.live.set(self.live.get() + 1);
        self.created.set(self.created.get() + 1);
    }

    fn release(&self) {
        self.live.set(self.live.get().saturating_sub(1));
    }

    pub fn live(&self) -> usize {
        self.live.get()
    }

    pub fn created(&self) -> usize {
        self.created.get()
    }
}

// ============================================================================
// Headless backend
// ============================================================================

#[derive(Debug)]
pub struct HeadlessBackend {
    width: u32,
    height: u32,
    pixel_ratio: f32,
    attached: bool,
    released: bool,
    frames: u64,
    last: RenderInfo,
    tracker: ResourceTracker,
}

impl HeadlessBackend {
    pub fn new(width: u32, height: u32, pixel_ratio: f32, tracker: ResourceTracker) -> Self {
        tracker.acquire();
        Self {
            width,
            height,
            pixel_ratio,
            attached: true,
            released: false,
            frames: 0,
            last: RenderInfo::default(),
            tracker,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn last_info(&self) -> RenderInfo {
        self.last
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn physical_size(&self) -> (u32, u32) {
        physical_size(self.width, self.height, self.pixel_ratio)
    }
}

impl RenderBackend for HeadlessBackend {
    fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_pixel_ratio(&mut self, ratio: f32) {
        self.pixel_ratio = ratio;
    }

    fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    fn render(&mut self, frame: &FrameInputs<'_>) -> RenderInfo {
        if self.released {
            return RenderInfo::default();
        }
        self.frames += 1;
        self.last = RenderInfo::measure(frame.scene);
        self.last
    }

    fn detach_output(&mut self) {
        self.attached = false;
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.tracker.release();
        }
    }

    fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for HeadlessBackend {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SceneBuilder;

    #[test]
    fn test_release_is_idempotent() {
        let tracker = ResourceTracker::new();
        let mut backend = HeadlessBackend::new(800, 600, 1.0, tracker.clone());
        assert_eq!(tracker.live(), 1);
        backend.release();
        backend.release();
        assert_eq!(tracker.live(), 0);
        drop(backend);
        assert_eq!(tracker.live(), 0);
        assert_eq!(tracker.created(), 1);
    }

    #[test]
    fn test_physical_size() {
        assert_eq!(physical_size(800, 600, 1.5), (1200, 900));
        assert_eq!(physical_size(0, 0, 2.0), (1, 1));
    }

    #[test]
    fn test_measure_counts_points_and_triangles() {
        let scene = SceneBuilder::new(1, 60).build();
        let info = RenderInfo::measure(&scene.graph);
        assert_eq!(info.points, 60);
        assert!(info.triangles > 1000);
        assert_eq!(info.draw_calls as usize, scene.graph.renderables().len());
    }
}
