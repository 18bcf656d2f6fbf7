//! Mount, drive and tear down a session against the headless host and backend.

use std::rc::Rc;

use desk_scene::backend::{HeadlessBackend, RenderBackend, ResourceTracker};
use desk_scene::camera::CameraController;
use desk_scene::config::SceneConfig;
use desk_scene::host::{HeadlessHost, HostEvent};
use desk_scene::input::PointerEvent;
use desk_scene::render_loop::{LoopState, ManualTime};
use desk_scene::{MountOptions, SceneSession};

type Session = SceneSession<HeadlessHost, HeadlessBackend>;

fn mount_with(host: HeadlessHost, config: SceneConfig, tracker: &ResourceTracker, time: &ManualTime) -> Session {
    let tracker = tracker.clone();
    let options = MountOptions {
        class_name: Some("profile-desk".to_string()),
        config,
        seed_entropy: 1,
    };
    SceneSession::mount(
        host,
        options,
        move |rect, ratio| Ok(HeadlessBackend::new(rect.width as u32, rect.height as u32, ratio, tracker)),
        Rc::new(time.clone()),
    )
    .unwrap()
    .expect("headless host always has a container")
}

fn seeded() -> SceneConfig {
    SceneConfig {
        seed: Some(42),
        ..SceneConfig::default()
    }
}

fn step(session: &mut Session, time: &ManualTime, dt: f64) {
    time.advance(dt);
    session.host_mut().take_frame();
    session.handle(HostEvent::Frame);
}

#[test]
fn test_baseline_camera_at_time_zero() {
    let tracker = ResourceTracker::new();
    let time = ManualTime::new();
    let session = mount_with(HeadlessHost::new(800.0, 600.0), seeded(), &tracker, &time);

    let camera = session.camera();
    let (angle, radius) = (0.05f32, 3.8f32);
    assert!((camera.position.x - angle.sin() * radius).abs() < 1e-5);
    assert!((camera.position.y - 1.9).abs() < 1e-5);
    assert!((camera.position.z - angle.cos() * radius).abs() < 1e-5);
    assert_eq!(camera.target.to_array(), [0.0, 1.85, 0.0]);
    assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-6);

    assert_eq!(session.loop_state(), LoopState::Running);
    assert_eq!(session.backend().frames(), 1);
    assert!(session.is_loaded());
    assert_eq!(session.host().style_class.as_deref(), Some("profile-desk"));
}

#[test]
fn test_camera_stays_on_orbit_while_running() {
    let tracker = ResourceTracker::new();
    let time = ManualTime::new();
    let mut session = mount_with(HeadlessHost::new(800.0, 600.0), seeded(), &tracker, &time);

    for i in 0..600 {
        step(&mut session, &time, 1.0 / 60.0);
        if i == 200 {
            session.handle(HostEvent::Pointer(PointerEvent::Enter));
        }
        if i == 400 {
            session.handle(HostEvent::Pointer(PointerEvent::Leave));
        }

        let p = session.camera().position;
        let horizontal = (p.x * p.x + p.z * p.z).sqrt();
        assert!((horizontal - 3.8).abs() < 1e-4, "radius {} at tick {}", horizontal, i);
        assert!(p.y >= 1.9 - 0.05 - 1e-5 && p.y <= 1.9 + 0.05 + 1e-5);
    }
}

#[test]
fn test_hover_speeds_rotation_by_half() {
    let controller = CameraController::default();
    let ratio = controller.rotation_speed(true) / controller.rotation_speed(false);
    assert!((ratio - 1.5).abs() < 1e-6);

    let calm = controller.angular_velocity(0.0, false);
    let hovered = controller.angular_velocity(0.0, true);
    assert!((hovered / calm - 1.5).abs() < 1e-5);
}

#[test]
fn test_quality_drops_then_recovers_without_overshoot() {
    let tracker = ResourceTracker::new();
    let time = ManualTime::new();
    let host = HeadlessHost::new(800.0, 600.0).with_device_pixel_ratio(2.0);
    let mut session = mount_with(host, seeded(), &tracker, &time);
    assert_eq!(session.performance().pixel_ratio, 2.0);

    // 20 fps
    for _ in 0..200 {
        step(&mut session, &time, 0.05);
        assert!(session.performance().pixel_ratio >= 1.0);
    }
    assert_eq!(session.performance().pixel_ratio, 1.0);
    assert_eq!(session.backend().pixel_ratio(), 1.0);

    // 120 fps
    for _ in 0..600 {
        step(&mut session, &time, 1.0 / 120.0);
        assert!(session.performance().pixel_ratio <= 1.5);
    }
    assert_eq!(session.performance().pixel_ratio, 1.5);
    assert_eq!(session.backend().pixel_ratio(), 1.5);
}

#[test]
fn test_raise_is_capped_by_device_pixel_ratio() {
    let tracker = ResourceTracker::new();
    let time = ManualTime::new();
    let host = HeadlessHost::new(800.0, 600.0).with_device_pixel_ratio(1.25);
    let mut session = mount_with(host, seeded(), &tracker, &time);

    for _ in 0..200 {
        step(&mut session, &time, 0.05);
    }
    assert_eq!(session.performance().pixel_ratio, 1.0);
    for _ in 0..600 {
        step(&mut session, &time, 1.0 / 120.0);
    }
    assert_eq!(session.performance().pixel_ratio, 1.25);
}

#[test]
fn test_unmount_stops_frames_and_listeners() {
    let tracker = ResourceTracker::new();
    let time = ManualTime::new();
    let mut session = mount_with(HeadlessHost::new(800.0, 600.0), seeded(), &tracker, &time);
    step(&mut session, &time, 0.016);
    let rendered = session.backend().frames();

    session.unmount();
    assert_eq!(session.loop_state(), LoopState::Cancelled);
    assert_eq!(session.host().pending_frames(), 0);
    assert_eq!(session.host().listener_count(), 0);
    assert_eq!(session.host().interval_count(), 0);
    assert!(session.backend().is_released());
    assert!(!session.backend().is_attached());
    assert!(!session.is_loaded());

    // A late frame callback must be a no-op.
    session.handle(HostEvent::Frame);
    session.handle(HostEvent::Resize);
    assert_eq!(session.backend().frames(), rendered);
    assert_eq!(session.host().pending_frames(), 0);
}

#[test]
fn test_repeated_mounts_do_not_leak() {
    let tracker = ResourceTracker::new();
    let time = ManualTime::new();

    for cycle in 1..=5 {
        let mut session = mount_with(HeadlessHost::new(640.0, 480.0), seeded(), &tracker, &time);
        for _ in 0..10 {
            step(&mut session, &time, 0.016);
        }
        assert_eq!(tracker.live(), 1);
        drop(session);
        assert_eq!(tracker.live(), 0, "leak after cycle {}", cycle);
        assert_eq!(tracker.created(), cycle);
    }
}

#[test]
fn test_missing_container_acquires_nothing() {
    let tracker = ResourceTracker::new();
    let time = ManualTime::new();
    let factory_tracker = tracker.clone();
    let mounted: Option<Session> = SceneSession::mount(
        HeadlessHost::detached(),
        MountOptions::default(),
        move |rect, ratio| {
            Ok(HeadlessBackend::new(
                rect.width as u32,
                rect.height as u32,
                ratio,
                factory_tracker,
            ))
        },
        Rc::new(time),
    )
    .unwrap();
    assert!(mounted.is_none());
    assert_eq!(tracker.created(), 0);
}

#[test]
fn test_debug_readout_toggles() {
    let tracker = ResourceTracker::new();
    let time = ManualTime::new();
    let mut session = mount_with(HeadlessHost::new(800.0, 600.0), seeded(), &tracker, &time);

    session.handle(HostEvent::Pointer(PointerEvent::DoubleClick));
    let lines = session.host().debug.clone().expect("readout visible");
    assert_eq!(lines[0], "FPS: 60");
    assert!(lines[1].starts_with("Triangles: "));
    assert_eq!(lines[2], "Double-click to hide");

    // Interval refresh keeps it current while visible.
    for _ in 0..100 {
        step(&mut session, &time, 1.0 / 45.0);
    }
    session.handle(HostEvent::IntervalTick);
    let lines = session.host().debug.clone().expect("readout visible");
    assert_eq!(lines[0], "FPS: 45");

    session.handle(HostEvent::Pointer(PointerEvent::DoubleClick));
    assert!(session.host().debug.is_none());
    session.handle(HostEvent::IntervalTick);
    assert!(session.host().debug.is_none());
}

#[test]
fn test_resize_ignores_empty_container() {
    let tracker = ResourceTracker::new();
    let time = ManualTime::new();
    let mut session = mount_with(HeadlessHost::new(800.0, 600.0), seeded(), &tracker, &time);

    session.host_mut().rect = Some(desk_scene::input::ContainerRect::sized(0.0, 0.0));
    session.handle(HostEvent::Resize);
    assert_eq!(session.backend().size(), (800, 600));

    session.host_mut().rect = Some(desk_scene::input::ContainerRect::sized(1000.0, 500.0));
    session.handle(HostEvent::Resize);
    assert_eq!(session.backend().size(), (1000, 500));
    assert!((session.camera().aspect - 2.0).abs() < 1e-6);
}
