//! Embedding boundary.
//!
//! A [`Host`] is whatever owns the container: a browser page, a winit window
//! or a test harness. The session only talks to it through this trait, so
//! listener, frame and interval bookkeeping is visible to tests.

use std::collections::BTreeSet;

use crate::input::{ContainerRect, PointerEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntervalHandle(pub u64);

/// Event sources the session subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ListenerKind {
    /// Window resize.
    Resize,
    PointerMove,
    PointerEnter,
    PointerLeave,
    DoubleClick,
}

impl ListenerKind {
    pub const ALL: [ListenerKind; 5] = [
        ListenerKind::Resize,
        ListenerKind::PointerMove,
        ListenerKind::PointerEnter,
        ListenerKind::PointerLeave,
        ListenerKind::DoubleClick,
    ];
}

/// Events a host delivers to a mounted session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    Frame,
    Resize,
    Pointer(PointerEvent),
    IntervalTick,
}

pub trait Host {
    /// Current container bounds, or `None` when there is no container.
    fn container(&self) -> Option<ContainerRect>;
    fn device_pixel_ratio(&self) -> f32;

    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);

    fn add_listener(&mut self, kind: ListenerKind) -> ListenerHandle;
    fn remove_listener(&mut self, handle: ListenerHandle);

    fn start_interval(&mut self, period_ms: u32) -> IntervalHandle;
    fn clear_interval(&mut self, handle: IntervalHandle);

    /// Hover feedback: scale applied to the container.
    fn set_container_scale(&mut self, _scale: f32) {}

    /// Show the debug readout lines, or hide it with `None`.
    fn present_debug(&mut self, _lines: Option<Vec<String>>) {}

    /// Extra style class requested by the embedder.
    fn set_style_class(&mut self, _class: Option<&str>) {}
}

// ============================================================================
// Headless host
// ============================================================================

/// In-memory host. Records every registration so leaks are observable.
#[derive(Debug, Clone)]
pub struct HeadlessHost {
    pub rect: Option<ContainerRect>,
    pub dpr: f32,
    next_id: u64,
    pending_frames: BTreeSet<FrameHandle>,
    listeners: BTreeSet<ListenerHandle>,
    intervals: BTreeSet<IntervalHandle>,
    pub frames_requested: u64,
    pub frames_cancelled: u64,
    pub scale: f32,
    pub debug: Option<Vec<String>>,
    pub style_class: Option<String>,
}

impl HeadlessHost {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            rect: Some(ContainerRect::sized(width, height)),
            dpr: 1.0,
            next_id: 0,
            pending_frames: BTreeSet::new(),
            listeners: BTreeSet::new(),
            intervals: BTreeSet::new(),
            frames_requested: 0,
            frames_cancelled: 0,
            scale: 1.0,
            debug: None,
            style_class: None,
        }
    }

    /// Host with no container element.
    pub fn detached() -> Self {
        Self {
            rect: None,
            ..Self::new(0.0, 0.0)
        }
    }

    pub fn with_device_pixel_ratio(mut self, dpr: f32) -> Self {
        self.dpr = dpr;
        self
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn pending_frames(&self) -> usize {
        self.pending_frames.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }

    /// Consume the oldest frame request, as the host's frame callback would.
    pub fn take_frame(&mut self) -> Option<FrameHandle> {
        self.pending_frames.pop_first()
    }
}

impl Host for HeadlessHost {
    fn container(&self) -> Option<ContainerRect> {
        self.rect
    }

    fn device_pixel_ratio(&self) -> f32 {
        self.dpr
    }

    fn request_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next());
        self.pending_frames.insert(handle);
        self.frames_requested += 1;
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending_frames.remove(&handle) {
            self.frames_cancelled += 1;
        }
    }

    fn add_listener(&mut self, _kind: ListenerKind) -> ListenerHandle {
        let handle = ListenerHandle(self.next());
        self.listeners.insert(handle);
        handle
    }

    fn remove_listener(&mut self, handle: ListenerHandle) {
        self.listeners.remove(&handle);
    }

    fn start_interval(&mut self, _period_ms: u32) -> IntervalHandle {
        let handle = IntervalHandle(self.next());
        self.intervals.insert(handle);
        handle
    }

    fn clear_interval(&mut self, handle: IntervalHandle) {
        self.intervals.remove(&handle);
    }

    fn set_container_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    fn present_debug(&mut self, lines: Option<Vec<String>>) {
        self.debug = lines;
    }

    fn set_style_class(&mut self, class: Option<&str>) {
        self.style_class = class.map(str::to_string);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_bookkeeping() {
        let mut host = HeadlessHost::new(10.0, 10.0);
        let a = host.request_frame();
        let b = host.request_frame();
        assert_eq!(host.pending_frames(), 2);
        host.cancel_frame(b);
        assert_eq!(host.take_frame(), Some(a));
        assert_eq!(host.pending_frames(), 0);
        assert_eq!(host.frames_cancelled, 1);
    }

    #[test]
    fn test_listener_bookkeeping() {
        let mut host = HeadlessHost::new(10.0, 10.0);
        let handles: Vec<_> = ListenerKind::ALL.iter().map(|k| host.add_listener(*k)).collect();
        assert_eq!(host.listener_count(), 5);
        for h in handles {
            host.remove_listener(h);
        }
        assert_eq!(host.listener_count(), 0);
    }

    #[test]
    fn test_detached_has_no_container() {
        assert!(HeadlessHost::detached().container().is_none());
    }
}
