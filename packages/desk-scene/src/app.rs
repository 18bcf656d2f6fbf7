//! Native window host.
//!
//! Runs one [`SceneSession`] inside a winit window. Window events are only
//! forwarded while the session holds the matching listener registration, and
//! intervals are serviced from `AboutToWait`.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

use crate::config::SceneConfig;
use crate::gpu::surface::SurfaceBackend;
use crate::host::{FrameHandle, Host, HostEvent, IntervalHandle, ListenerHandle, ListenerKind};
use crate::input::{ContainerRect, PointerEvent};
use crate::render_loop::InstantTime;
use crate::session::{MountOptions, SceneSession};

/// Two presses closer than this count as a double-click.
const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(400);

const WINDOW_TITLE: &str = "Desk Scene";

#[derive(Debug, Default)]
struct DoubleClickDetector {
    last_press: Option<Instant>,
}

impl DoubleClickDetector {
    /// Record a press. Returns true when it completes a double-click.
    fn press(&mut self, now: Instant) -> bool {
        match self.last_press.take() {
            Some(previous) if now.duration_since(previous) <= DOUBLE_CLICK_WINDOW => true,
            _ => {
                self.last_press = Some(now);
                false
            }
        }
    }
}

struct Interval {
    period: Duration,
    next_due: Instant,
}

pub struct NativeHost {
    window: Arc<Window>,
    next_id: u64,
    pending_frame: Option<FrameHandle>,
    listeners: BTreeMap<ListenerHandle, ListenerKind>,
    intervals: BTreeMap<IntervalHandle, Interval>,
    scale: f32,
}

impl NativeHost {
    fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            next_id: 0,
            pending_frame: None,
            listeners: BTreeMap::new(),
            intervals: BTreeMap::new(),
            scale: 1.0,
        }
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn is_listening(&self, kind: ListenerKind) -> bool {
        self.listeners.values().any(|k| *k == kind)
    }

    fn take_frame(&mut self) -> Option<FrameHandle> {
        self.pending_frame.take()
    }

    /// Intervals whose period elapsed, rescheduled from `now`.
    fn due_intervals(&mut self, now: Instant) -> usize {
        let mut due = 0;
        for interval in self.intervals.values_mut() {
            if now >= interval.next_due {
                interval.next_due = now + interval.period;
                due += 1;
            }
        }
        due
    }

    fn next_wakeup(&self) -> Option<Instant> {
        self.intervals.values().map(|i| i.next_due).min()
    }

    fn scale_factor(&self) -> f32 {
        self.window.scale_factor() as f32
    }
}

impl Host for NativeHost {
    fn container(&self) -> Option<ContainerRect> {
        let size = self.window.inner_size();
        let scale = self.scale_factor().max(f32::EPSILON);
        Some(ContainerRect::sized(size.width as f32 / scale, size.height as f32 / scale))
    }

    fn device_pixel_ratio(&self) -> f32 {
        self.scale_factor()
    }

    fn request_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next());
        self.pending_frame = Some(handle);
        self.window.request_redraw();
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending_frame == Some(handle) {
            self.pending_frame = None;
        }
    }

    fn add_listener(&mut self, kind: ListenerKind) -> ListenerHandle {
        let handle = ListenerHandle(self.next());
        self.listeners.insert(handle, kind);
        handle
    }

    fn remove_listener(&mut self, handle: ListenerHandle) {
        self.listeners.remove(&handle);
    }

    fn start_interval(&mut self, period_ms: u32) -> IntervalHandle {
        let handle = IntervalHandle(self.next());
        let period = Duration::from_millis(period_ms as u64);
        self.intervals.insert(
            handle,
            Interval {
                period,
                next_due: Instant::now() + period,
            },
        );
        handle
    }

    fn clear_interval(&mut self, handle: IntervalHandle) {
        self.intervals.remove(&handle);
    }

    fn set_container_scale(&mut self, scale: f32) {
        if scale != self.scale {
            log::debug!("hover scale {}", scale);
            self.scale = scale;
        }
    }

    fn present_debug(&mut self, lines: Option<Vec<String>>) {
        let title = match lines {
            Some(lines) => format!("{} | {}", WINDOW_TITLE, lines.join(" | ")),
            None => WINDOW_TITLE.to_string(),
        };
        self.window.set_title(&title);
    }
}

type NativeSession = SceneSession<NativeHost, SurfaceBackend>;

fn seed_entropy() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| fold_nanos(d.as_nanos()))
        .unwrap_or_default()
}

/// Fold a 128-bit nanosecond count into 64 bits without dropping the high half.
fn fold_nanos(nanos: u128) -> u64 {
    nanos as u64 ^ (nanos >> 64) as u64
}

fn dispatch(session: &mut NativeSession, kind: ListenerKind, event: HostEvent) {
    if session.host().is_listening(kind) {
        session.handle(event);
    }
}

/// Open a window and run the scene until it is closed.
pub fn run(config: SceneConfig, width: u32, height: u32) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(width, height))
            .build(&event_loop)
            .context("failed to create window")?,
    );

    let instance = crate::gpu::create_instance();
    let surface = instance
        .create_surface(Arc::clone(&window))
        .context("failed to create surface")?;

    let options = MountOptions {
        class_name: None,
        config,
        seed_entropy: seed_entropy(),
    };
    let host = NativeHost::new(Arc::clone(&window));
    let mounted = SceneSession::mount(
        host,
        options,
        |rect, pixel_ratio| {
            pollster::block_on(SurfaceBackend::new(
                &instance,
                surface,
                rect.width.round() as u32,
                rect.height.round() as u32,
                pixel_ratio,
            ))
        },
        Rc::new(InstantTime::default()),
    )?;
    let Some(mut session) = mounted else {
        return Ok(());
    };

    let mut clicks = DoubleClickDetector::default();

    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { event, window_id } if window_id == window.id() => match event {
            WindowEvent::CloseRequested => {
                session.unmount();
                elwt.exit();
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                dispatch(&mut session, ListenerKind::Resize, HostEvent::Resize);
            }
            WindowEvent::CursorEntered { .. } => {
                dispatch(&mut session, ListenerKind::PointerEnter, HostEvent::Pointer(PointerEvent::Enter));
            }
            WindowEvent::CursorLeft { .. } => {
                dispatch(&mut session, ListenerKind::PointerLeave, HostEvent::Pointer(PointerEvent::Leave));
            }
            WindowEvent::CursorMoved { position, .. } => {
                let scale = window.scale_factor();
                let pointer = PointerEvent::Move {
                    client_x: (position.x / scale) as f32,
                    client_y: (position.y / scale) as f32,
                };
                dispatch(&mut session, ListenerKind::PointerMove, HostEvent::Pointer(pointer));
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                if clicks.press(Instant::now()) {
                    dispatch(
                        &mut session,
                        ListenerKind::DoubleClick,
                        HostEvent::Pointer(PointerEvent::DoubleClick),
                    );
                }
            }
            WindowEvent::RedrawRequested => {
                if session.host_mut().take_frame().is_some() {
                    session.handle(HostEvent::Frame);
                }
            }
            _ => {}
        },
        Event::AboutToWait => {
            let now = Instant::now();
            for _ in 0..session.host_mut().due_intervals(now) {
                session.handle(HostEvent::IntervalTick);
            }
            match session.host().next_wakeup() {
                Some(at) => elwt.set_control_flow(ControlFlow::WaitUntil(at)),
                None => elwt.set_control_flow(ControlFlow::Wait),
            }
        }
        _ => {}
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_nanos_keeps_high_bits() {
        assert_eq!(fold_nanos(42), 42);
        assert_ne!(fold_nanos(42 | (1u128 << 70)), fold_nanos(42));
        assert_eq!(fold_nanos(u128::from(u64::MAX) << 64), u64::MAX);
    }

    #[test]
    fn test_double_click_within_window() {
        let mut detector = DoubleClickDetector::default();
        let t0 = Instant::now();
        assert!(!detector.press(t0));
        assert!(detector.press(t0 + Duration::from_millis(250)));
        // A third press starts a new pair.
        assert!(!detector.press(t0 + Duration::from_millis(300)));
    }

    #[test]
    fn test_slow_clicks_are_not_double() {
        let mut detector = DoubleClickDetector::default();
        let t0 = Instant::now();
        assert!(!detector.press(t0));
        assert!(!detector.press(t0 + Duration::from_millis(900)));
        assert!(detector.press(t0 + Duration::from_millis(1000)));
    }
}
