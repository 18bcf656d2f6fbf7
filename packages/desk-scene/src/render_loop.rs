//! Per-frame driver.
//!
//! The loop is an explicit state machine (`Unstarted → Running → Cancelled`)
//! instead of a self-scheduling callback. The host delivers frame callbacks
//! and [`RenderLoop::tick`] runs one ordered step sequence against a
//! [`FrameStage`]. Time comes from an injected [`TimeSource`] so tests can
//! drive the loop with synthetic time.

use std::cell::Cell;
use std::rc::Rc;

use crate::config::QualityConfig;
use crate::host::FrameHandle;

// ============================================================================
// Time
// ============================================================================

/// Monotonic time in seconds.
pub trait TimeSource {
    fn now_secs(&self) -> f64;
}

/// Manually advanced time, shared by clone.
#[derive(Debug, Clone, Default)]
pub struct ManualTime {
    now: Rc<Cell<f64>>,
}

impl ManualTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, secs: f64) {
        self.now.set(secs);
    }

    pub fn advance(&self, secs: f64) {
        self.now.set(self.now.get() + secs);
    }
}

impl TimeSource for ManualTime {
    fn now_secs(&self) -> f64 {
        self.now.get()
    }
}

/// Wall-clock time from `std::time::Instant`.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone, Copy)]
pub struct InstantTime {
    origin: std::time::Instant,
}

#[cfg(not(target_arch = "wasm32"))]
impl Default for InstantTime {
    fn default() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl TimeSource for InstantTime {
    fn now_secs(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Render clock. Starts on its first tick, which reports a zero delta.
#[derive(Debug, Clone, Default)]
pub struct RenderClock {
    start: Option<f64>,
    last: f64,
}

impl RenderClock {
    /// Returns `(delta, elapsed)` in seconds.
    pub fn tick(&mut self, now: f64) -> (f32, f32) {
        let start = *self.start.get_or_insert(now);
        if self.last < start {
            self.last = start;
        }
        let delta = (now - self.last).max(0.0);
        self.last = now.max(self.last);
        (delta as f32, (self.last - start) as f32)
    }

    pub fn is_running(&self) -> bool {
        self.start.is_some()
    }
}

// ============================================================================
// FPS + quality
// ============================================================================

/// Frames-per-second counter sampled once per wall-clock second.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    frames: u32,
    last_sample: f64,
    fps: u32,
}

impl FpsCounter {
    pub const INITIAL_FPS: u32 = 60;

    pub fn new(now: f64) -> Self {
        Self {
            frames: 0,
            last_sample: now,
            fps: Self::INITIAL_FPS,
        }
    }

    /// Count one frame. Returns the new value when a sample was taken.
    pub fn frame(&mut self, now: f64) -> Option<u32> {
        self.frames += 1;
        let elapsed = now - self.last_sample;
        if elapsed < 1.0 {
            return None;
        }
        self.fps = (self.frames as f64 / elapsed).round() as u32;
        self.frames = 0;
        self.last_sample = now;
        Some(self.fps)
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }
}

/// Hysteretic two-threshold pixel-ratio controller.
#[derive(Debug, Clone)]
pub struct QualityController {
    config: QualityConfig,
    ticks: u32,
}

impl QualityController {
    pub fn new(config: QualityConfig) -> Self {
        Self {
            config: config.sanitized(),
            ticks: 0,
        }
    }

    /// Counts a tick. True every `check_interval_ticks` ticks.
    pub fn tick(&mut self) -> bool {
        self.ticks += 1;
        if self.ticks >= self.config.check_interval_ticks.max(1) {
            self.ticks = 0;
            true
        } else {
            false
        }
    }

    /// New pixel ratio if one is warranted.
    pub fn decide(&self, fps: u32, current: f32, device_pixel_ratio: f32) -> Option<f32> {
        let c = &self.config;
        let fps = fps as f32;
        if fps < c.low_fps && current > c.floor {
            Some(c.floor)
        } else if fps > c.high_fps && current < c.ceiling {
            let target = device_pixel_ratio.min(c.ceiling).max(c.floor);
            (target != current).then_some(target)
        } else {
            None
        }
    }
}

// ============================================================================
// Loop
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Unstarted,
    Running,
    Cancelled,
}

/// Figures read by the quality step and the debug overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceState {
    pub fps: u32,
    pub triangles: u64,
    pub pixel_ratio: f32,
}

impl Default for PerformanceState {
    fn default() -> Self {
        Self {
            fps: FpsCounter::INITIAL_FPS,
            triangles: 0,
            pixel_ratio: 1.0,
        }
    }
}

/// What a tick acts on. Implemented by the session.
pub trait FrameStage {
    fn schedule_next(&mut self) -> FrameHandle;
    fn record_fps(&mut self, fps: u32);
    fn pixel_ratio(&self) -> f32;
    fn device_pixel_ratio(&self) -> f32;
    fn set_pixel_ratio(&mut self, ratio: f32);
    fn update_camera(&mut self, elapsed: f32);
    fn animate_lights(&mut self, elapsed: f32, rgb_time: f32);
    fn render(&mut self);
}

pub struct RenderLoop {
    state: LoopState,
    time: Rc<dyn TimeSource>,
    clock: RenderClock,
    fps: FpsCounter,
    quality: QualityController,
    rgb_time: f32,
    elapsed: f32,
    pending: Option<FrameHandle>,
    ticks: u64,
}

impl RenderLoop {
    pub fn new(quality: QualityConfig, time: Rc<dyn TimeSource>) -> Self {
        let now = time.now_secs();
        Self {
            state: LoopState::Unstarted,
            time,
            clock: RenderClock::default(),
            fps: FpsCounter::new(now),
            quality: QualityController::new(quality),
            rgb_time: 0.0,
            elapsed: 0.0,
            pending: None,
            ticks: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// `Unstarted → Running`. Other states are left alone.
    pub fn start(&mut self) {
        if self.state == LoopState::Unstarted {
            self.fps = FpsCounter::new(self.time.now_secs());
            self.state = LoopState::Running;
        }
    }

    /// Enter the terminal state. Returns the frame request that must be cancelled.
    pub fn cancel(&mut self) -> Option<FrameHandle> {
        self.state = LoopState::Cancelled;
        self.pending.take()
    }

    /// Run one frame. Ignored unless running.
    pub fn tick(&mut self, stage: &mut impl FrameStage) {
        if self.state != LoopState::Running {
            return;
        }

        // 1. schedule
        self.pending = Some(stage.schedule_next());

        // 2. clock
        let now = self.time.now_secs();
        let (delta, elapsed) = self.clock.tick(now);
        self.rgb_time += delta;
        self.elapsed = elapsed;

        // 3. fps
        if let Some(fps) = self.fps.frame(now) {
            stage.record_fps(fps);
        }

        // 4. quality
        if self.quality.tick() {
            let current = stage.pixel_ratio();
            if let Some(ratio) = self.quality.decide(self.fps.fps(), current, stage.device_pixel_ratio()) {
                log::debug!("fps {}: pixel ratio {} -> {}", self.fps.fps(), current, ratio);
                stage.set_pixel_ratio(ratio);
            }
        }

        // 5-7
        stage.update_camera(elapsed);
        stage.animate_lights(elapsed, self.rgb_time);
        stage.render();

        self.ticks += 1;
    }

    pub fn fps(&self) -> u32 {
        self.fps.fps()
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn rgb_time(&self) -> f32 {
        self.rgb_time
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
        next_handle: u64,
        ratio: f32,
        device_ratio: f32,
        elapsed: Vec<f32>,
    }

    impl FrameStage for Recorder {
        fn schedule_next(&mut self) -> FrameHandle {
            self.calls.push("schedule");
            self.next_handle += 1;
            FrameHandle(self.next_handle)
        }
        fn record_fps(&mut self, _fps: u32) {
            self.calls.push("fps");
        }
        fn pixel_ratio(&self) -> f32 {
            self.ratio
        }
        fn device_pixel_ratio(&self) -> f32 {
            self.device_ratio
        }
        fn set_pixel_ratio(&mut self, ratio: f32) {
            self.calls.push("quality");
            self.ratio = ratio;
        }
        fn update_camera(&mut self, elapsed: f32) {
            self.calls.push("camera");
            self.elapsed.push(elapsed);
        }
        fn animate_lights(&mut self, _elapsed: f32, _rgb_time: f32) {
            self.calls.push("lights");
        }
        fn render(&mut self) {
            self.calls.push("render");
        }
    }

    fn recorder(ratio: f32, device_ratio: f32) -> Recorder {
        Recorder {
            ratio,
            device_ratio,
            ..Default::default()
        }
    }

    #[test]
    fn test_tick_order() {
        let time = ManualTime::new();
        let mut lp = RenderLoop::new(QualityConfig::default(), Rc::new(time.clone()));
        let mut stage = recorder(1.0, 1.0);
        lp.start();
        lp.tick(&mut stage);
        assert_eq!(stage.calls, vec!["schedule", "camera", "lights", "render"]);
        assert_eq!(stage.elapsed, vec![0.0]);
    }

    #[test]
    fn test_ticks_ignored_unless_running() {
        let time = ManualTime::new();
        let mut lp = RenderLoop::new(QualityConfig::default(), Rc::new(time));
        let mut stage = recorder(1.0, 1.0);
        lp.tick(&mut stage);
        assert!(stage.calls.is_empty());

        lp.start();
        lp.tick(&mut stage);
        assert_eq!(lp.cancel(), Some(FrameHandle(1)));
        assert_eq!(lp.state(), LoopState::Cancelled);
        stage.calls.clear();
        lp.tick(&mut stage);
        assert!(stage.calls.is_empty());

        // Terminal: start does not revive it.
        lp.start();
        assert_eq!(lp.state(), LoopState::Cancelled);
    }

    #[test]
    fn test_fps_sampled_once_per_second() {
        let mut fps = FpsCounter::new(0.0);
        for i in 1..30 {
            assert_eq!(fps.frame(i as f64 / 30.0), None);
        }
        assert_eq!(fps.frame(1.0), Some(30));
        assert_eq!(fps.fps(), 30);
    }

    #[test]
    fn test_clock_first_delta_is_zero() {
        let mut clock = RenderClock::default();
        assert_eq!(clock.tick(5.0), (0.0, 0.0));
        let (delta, elapsed) = clock.tick(5.5);
        assert!((delta - 0.5).abs() < 1e-6);
        assert!((elapsed - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_quality_drop_and_raise() {
        let q = QualityController::new(QualityConfig::default());
        assert_eq!(q.decide(20, 2.0, 2.0), Some(1.0));
        assert_eq!(q.decide(20, 1.0, 2.0), None);
        assert_eq!(q.decide(60, 1.0, 2.0), Some(1.5));
        assert_eq!(q.decide(60, 1.0, 1.25), Some(1.25));
        assert_eq!(q.decide(60, 1.5, 2.0), None);
        assert_eq!(q.decide(40, 2.0, 2.0), None);
    }

    #[test]
    fn test_floor_never_below_one() {
        let config = QualityConfig {
            floor: 0.25,
            ceiling: 0.5,
            ..QualityConfig::default()
        };
        let q = QualityController::new(config);
        assert_eq!(q.decide(10, 1.0, 1.0), None);
        assert_eq!(q.decide(10, 2.0, 2.0), Some(1.0));
        assert_eq!(q.decide(120, 1.0, 2.0), None);
    }

    #[test]
    fn test_low_fps_converges_to_floor() {
        let time = ManualTime::new();
        let mut lp = RenderLoop::new(QualityConfig::default(), Rc::new(time.clone()));
        let mut stage = recorder(2.0, 2.0);
        lp.start();
        // 20 fps for 10 seconds
        for _ in 0..200 {
            time.advance(0.05);
            lp.tick(&mut stage);
            assert!(stage.ratio >= 1.0);
        }
        assert_eq!(stage.ratio, 1.0);
    }

    #[test]
    fn test_high_fps_rises_without_overshoot() {
        let time = ManualTime::new();
        let mut lp = RenderLoop::new(QualityConfig::default(), Rc::new(time.clone()));
        let mut stage = recorder(1.0, 3.0);
        lp.start();
        for _ in 0..600 {
            time.advance(1.0 / 60.0);
            lp.tick(&mut stage);
            assert!(stage.ratio <= 1.5);
        }
        assert_eq!(stage.ratio, 1.5);
    }
}
