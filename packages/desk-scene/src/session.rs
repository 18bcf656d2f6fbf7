//! Mounted scene instance.
//!
//! A [`SceneSession`] owns everything one mount needs: scene graph, lights,
//! camera, renderer, interaction state and the render loop. It acquires host
//! registrations on mount and gives every one of them back in
//! [`SceneSession::unmount`], which also runs on drop.
//!
//! Teardown order:
//! 1. cancel the pending frame
//! 2. remove listeners
//! 3. detach the renderer output
//! 4. release renderer resources
//! 5. clear the debug interval

use std::rc::Rc;

use crate::backend::{FrameInputs, RenderBackend};
use crate::builder::{BuiltScene, SceneBuilder};
use crate::camera::{CameraController, CameraState};
use crate::config::SceneConfig;
use crate::debug_overlay::DebugInfo;
use crate::error::SceneError;
use crate::host::{FrameHandle, Host, HostEvent, IntervalHandle, ListenerHandle, ListenerKind};
use crate::input::{self, ContainerRect, InteractionState, PointerEvent};
use crate::lighting::LightingRig;
use crate::render_loop::{FrameStage, LoopState, PerformanceState, RenderLoop, TimeSource};

/// Period of the debug readout refresh.
pub const DEBUG_INTERVAL_MS: u32 = 1000;

/// Container scale while hovered.
pub const HOVER_SCALE: f32 = 1.05;

#[derive(Debug, Clone, Default)]
pub struct MountOptions {
    /// Extra style class for the container.
    pub class_name: Option<String>,
    pub config: SceneConfig,
    /// Seed material used when `config.seed` is `None`.
    pub seed_entropy: u64,
}

/// State a frame tick operates on. Kept apart from the loop so both can be borrowed at once.
struct SessionCore<H: Host, B: RenderBackend> {
    host: H,
    backend: B,
    scene: BuiltScene,
    lights: LightingRig,
    camera: CameraState,
    controller: CameraController,
    interaction: InteractionState,
    performance: PerformanceState,
    device_pixel_ratio: f32,
}

impl<H: Host, B: RenderBackend> FrameStage for SessionCore<H, B> {
    fn schedule_next(&mut self) -> FrameHandle {
        self.host.request_frame()
    }

    fn record_fps(&mut self, fps: u32) {
        self.performance.fps = fps;
    }

    fn pixel_ratio(&self) -> f32 {
        self.backend.pixel_ratio()
    }

    fn device_pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio
    }

    fn set_pixel_ratio(&mut self, ratio: f32) {
        self.backend.set_pixel_ratio(ratio);
        self.performance.pixel_ratio = ratio;
    }

    fn update_camera(&mut self, elapsed: f32) {
        self.controller
            .update(&mut self.camera, elapsed, self.interaction.hovered);
    }

    fn animate_lights(&mut self, elapsed: f32, rgb_time: f32) {
        self.lights.animate(elapsed, rgb_time);
    }

    fn render(&mut self) {
        let frame = FrameInputs {
            scene: &self.scene.graph,
            camera: &self.camera,
            lights: &self.lights,
            environment: &self.scene.environment,
        };
        let info = self.backend.render(&frame);
        self.performance.triangles = info.triangles;
    }
}

pub struct SceneSession<H: Host, B: RenderBackend> {
    core: SessionCore<H, B>,
    render_loop: RenderLoop,
    config: SceneConfig,
    class_name: Option<String>,
    listeners: Vec<(ListenerKind, ListenerHandle)>,
    interval: Option<IntervalHandle>,
    seed: u64,
    mounted: bool,
}

impl<H: Host, B: RenderBackend> SceneSession<H, B> {
    /// Build the world and start rendering into the host's container.
    ///
    /// Returns `Ok(None)` without doing any work when the host has no
    /// container. Renderer acquisition failures are returned as errors; at
    /// that point no host registration has been made yet.
    pub fn mount(
        mut host: H,
        options: MountOptions,
        backend_factory: impl FnOnce(&ContainerRect, f32) -> Result<B, SceneError>,
        time: Rc<dyn TimeSource>,
    ) -> Result<Option<Self>, SceneError> {
        let Some(rect) = host.container() else {
            log::warn!("no container to mount the desk scene into");
            return Ok(None);
        };

        let MountOptions {
            class_name,
            config,
            seed_entropy,
        } = options;

        let device_pixel_ratio = config.device_pixel_ratio(host.device_pixel_ratio());
        let pixel_ratio = device_pixel_ratio.min(config.resize_pixel_ratio_ceiling);
        let seed = config.resolve_seed(seed_entropy);

        let scene = SceneBuilder::new(seed, config.particle_count()).build();
        let mut lights = LightingRig::install(config.shadow_map_size);

        let backend = backend_factory(&rect, pixel_ratio)?;
        lights.clamp_shadow_map(backend.max_texture_size());

        host.set_style_class(class_name.as_deref());
        let listeners = ListenerKind::ALL
            .iter()
            .map(|kind| (*kind, host.add_listener(*kind)))
            .collect();
        let interval = Some(host.start_interval(DEBUG_INTERVAL_MS));

        let mut core = SessionCore {
            host,
            backend,
            scene,
            lights,
            camera: CameraState::new(rect.aspect()),
            controller: CameraController::new(config.camera.clone()),
            interaction: InteractionState::default(),
            performance: PerformanceState {
                pixel_ratio,
                ..PerformanceState::default()
            },
            device_pixel_ratio,
        };
        core.controller.update(&mut core.camera, 0.0, false);

        let mut render_loop = RenderLoop::new(config.quality.clone(), time);
        render_loop.start();

        log::info!(
            "mounted desk scene ({}x{} @ {}x, seed {})",
            rect.width,
            rect.height,
            pixel_ratio,
            seed
        );

        let mut session = Self {
            core,
            render_loop,
            config,
            class_name,
            listeners,
            interval,
            seed,
            mounted: true,
        };
        session.render_loop.tick(&mut session.core);
        Ok(Some(session))
    }

    /// Dispatch one host event. Ignored after unmount.
    pub fn handle(&mut self, event: HostEvent) {
        if !self.mounted {
            return;
        }
        match event {
            HostEvent::Frame => self.render_loop.tick(&mut self.core),
            HostEvent::Resize => self.on_resize(),
            HostEvent::Pointer(pointer) => self.on_pointer(pointer),
            HostEvent::IntervalTick => self.refresh_debug(),
        }
    }

    fn on_resize(&mut self) {
        let Some(rect) = self.core.host.container() else {
            return;
        };
        let Some(outcome) = input::resize(
            rect.width,
            rect.height,
            self.core.device_pixel_ratio,
            self.config.resize_pixel_ratio_ceiling,
        ) else {
            return;
        };
        self.core.camera.set_aspect(outcome.aspect);
        self.core.backend.set_size(outcome.width, outcome.height);
        self.core.backend.set_pixel_ratio(outcome.pixel_ratio);
        self.core.performance.pixel_ratio = outcome.pixel_ratio;
    }

    fn on_pointer(&mut self, event: PointerEvent) {
        let rect = self.core.host.container();
        if self.core.interaction.apply(event, rect.as_ref()) {
            let scale = self.container_scale();
            self.core.host.set_container_scale(scale);
        }
        if event == PointerEvent::DoubleClick {
            let lines = self.debug_lines();
            self.core.host.present_debug(lines);
        }
    }

    fn refresh_debug(&mut self) {
        if let Some(lines) = self.debug_lines() {
            self.core.host.present_debug(Some(lines));
        }
    }

    /// Release everything acquired by [`Self::mount`]. Idempotent.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;

        if let Some(frame) = self.render_loop.cancel() {
            self.core.host.cancel_frame(frame);
        }
        for (_, handle) in self.listeners.drain(..) {
            self.core.host.remove_listener(handle);
        }
        self.core.backend.detach_output();
        self.core.backend.release();
        if let Some(interval) = self.interval.take() {
            self.core.host.clear_interval(interval);
        }

        self.core.host.present_debug(None);
        self.core.host.set_style_class(None);
        self.core.scene.graph.clear();

        log::info!("unmounted desk scene after {} frames", self.render_loop.ticks());
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn is_loaded(&self) -> bool {
        self.mounted && !self.core.scene.graph.is_empty()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// 1.05 while hovered, 1.0 otherwise.
    pub fn container_scale(&self) -> f32 {
        if self.core.interaction.hovered {
            HOVER_SCALE
        } else {
            1.0
        }
    }

    pub fn debug_info(&self) -> DebugInfo {
        DebugInfo {
            fps: self.core.performance.fps,
            triangles: self.core.performance.triangles,
        }
    }

    /// Readout lines when the overlay is visible.
    pub fn debug_lines(&self) -> Option<Vec<String>> {
        self.core
            .interaction
            .debug_visible
            .then(|| self.debug_info().lines())
    }

    pub fn host(&self) -> &H {
        &self.core.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.core.host
    }

    pub fn backend(&self) -> &B {
        &self.core.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.core.backend
    }

    pub fn scene(&self) -> &BuiltScene {
        &self.core.scene
    }

    pub fn camera(&self) -> &CameraState {
        &self.core.camera
    }

    pub fn lights(&self) -> &LightingRig {
        &self.core.lights
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.core.interaction
    }

    pub fn performance(&self) -> &PerformanceState {
        &self.core.performance
    }

    pub fn loop_state(&self) -> LoopState {
        self.render_loop.state()
    }

    pub fn render_loop(&self) -> &RenderLoop {
        &self.render_loop
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl<H: Host, B: RenderBackend> Drop for SceneSession<H, B> {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{HeadlessBackend, ResourceTracker};
    use crate::host::HeadlessHost;
    use crate::render_loop::ManualTime;

    fn mount(
        host: HeadlessHost,
        tracker: &ResourceTracker,
        time: &ManualTime,
    ) -> Option<SceneSession<HeadlessHost, HeadlessBackend>> {
        let tracker = tracker.clone();
        let options = MountOptions {
            config: SceneConfig {
                seed: Some(7),
                ..SceneConfig::default()
            },
            ..MountOptions::default()
        };
        SceneSession::mount(
            host,
            options,
            move |rect, ratio| {
                Ok(HeadlessBackend::new(
                    rect.width as u32,
                    rect.height as u32,
                    ratio,
                    tracker,
                ))
            },
            Rc::new(time.clone()),
        )
        .unwrap()
    }

    #[test]
    fn test_mount_registers_and_renders_first_frame() {
        let tracker = ResourceTracker::new();
        let time = ManualTime::new();
        let session = mount(HeadlessHost::new(800.0, 600.0), &tracker, &time).unwrap();

        assert!(session.is_loaded());
        assert_eq!(session.loop_state(), LoopState::Running);
        assert_eq!(session.host().listener_count(), 5);
        assert_eq!(session.host().interval_count(), 1);
        assert_eq!(session.host().pending_frames(), 1);
        assert_eq!(session.backend().frames(), 1);
        assert!(session.performance().triangles > 0);
        assert_eq!(tracker.live(), 1);
    }

    #[test]
    fn test_missing_container_does_nothing() {
        let tracker = ResourceTracker::new();
        let time = ManualTime::new();
        assert!(mount(HeadlessHost::detached(), &tracker, &time).is_none());
        assert_eq!(tracker.created(), 0);
    }

    #[test]
    fn test_renderer_failure_is_returned() {
        let time = ManualTime::new();
        let result = SceneSession::<HeadlessHost, HeadlessBackend>::mount(
            HeadlessHost::new(100.0, 100.0),
            MountOptions::default(),
            |_, _| Err(SceneError::Renderer("no adapter".into())),
            Rc::new(time),
        );
        assert!(matches!(result, Err(SceneError::Renderer(_))));
    }

    #[test]
    fn test_unmount_releases_everything() {
        let tracker = ResourceTracker::new();
        let time = ManualTime::new();
        let mut session = mount(HeadlessHost::new(800.0, 600.0), &tracker, &time).unwrap();
        session.unmount();

        assert_eq!(session.loop_state(), LoopState::Cancelled);
        assert_eq!(session.host().pending_frames(), 0);
        assert_eq!(session.host().listener_count(), 0);
        assert_eq!(session.host().interval_count(), 0);
        assert!(session.backend().is_released());
        assert!(!session.backend().is_attached());
        assert!(!session.is_loaded());
        assert_eq!(tracker.live(), 0);

        // Late frame callbacks are ignored.
        session.handle(HostEvent::Frame);
        assert_eq!(session.backend().frames(), 1);
        session.unmount();
    }

    #[test]
    fn test_hover_scales_container() {
        let tracker = ResourceTracker::new();
        let time = ManualTime::new();
        let mut session = mount(HeadlessHost::new(800.0, 600.0), &tracker, &time).unwrap();
        session.handle(HostEvent::Pointer(PointerEvent::Enter));
        assert_eq!(session.container_scale(), HOVER_SCALE);
        assert_eq!(session.host().scale, HOVER_SCALE);
        session.handle(HostEvent::Pointer(PointerEvent::Leave));
        assert_eq!(session.host().scale, 1.0);
    }

    #[test]
    fn test_double_click_shows_debug() {
        let tracker = ResourceTracker::new();
        let time = ManualTime::new();
        let mut session = mount(HeadlessHost::new(800.0, 600.0), &tracker, &time).unwrap();
        session.handle(HostEvent::Pointer(PointerEvent::DoubleClick));
        let lines = session.host().debug.clone().unwrap();
        assert_eq!(lines[0], "FPS: 60");
        assert!(lines[1].starts_with("Triangles: "));
        session.handle(HostEvent::Pointer(PointerEvent::DoubleClick));
        assert!(session.host().debug.is_none());
    }

    #[test]
    fn test_resize_updates_backend() {
        let tracker = ResourceTracker::new();
        let time = ManualTime::new();
        let host = HeadlessHost::new(800.0, 600.0).with_device_pixel_ratio(3.0);
        let mut session = mount(host, &tracker, &time).unwrap();
        session.host_mut().rect = Some(ContainerRect::sized(1000.0, 500.0));
        session.handle(HostEvent::Resize);
        assert_eq!(session.backend().size(), (1000, 500));
        assert_eq!(session.backend().pixel_ratio(), 2.0);
        assert!((session.camera().aspect - 2.0).abs() < 1e-6);
    }
}
