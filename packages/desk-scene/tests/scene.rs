//! What a mounted session draws: world contents, animated lights, textures.

use std::rc::Rc;

use desk_scene::backend::{HeadlessBackend, ResourceTracker};
use desk_scene::config::{SceneConfig, MAX_PARTICLES};
use desk_scene::host::{HeadlessHost, HostEvent};
use desk_scene::lighting::{desk_intensity_at, monitor_intensity_at};
use desk_scene::props::PropKind;
use desk_scene::render_loop::ManualTime;
use desk_scene::rng::SceneRng;
use desk_scene::texture::SceneTextures;
use desk_scene::{MountOptions, SceneSession};

type Session = SceneSession<HeadlessHost, HeadlessBackend>;

fn mount(config: SceneConfig, seed_entropy: u64, time: &ManualTime) -> Session {
    let tracker = ResourceTracker::new();
    SceneSession::mount(
        HeadlessHost::new(800.0, 600.0),
        MountOptions {
            class_name: None,
            config,
            seed_entropy,
        },
        move |rect, ratio| Ok(HeadlessBackend::new(rect.width as u32, rect.height as u32, ratio, tracker)),
        Rc::new(time.clone()),
    )
    .unwrap()
    .unwrap()
}

#[test]
fn test_first_frame_reports_triangles() {
    let time = ManualTime::new();
    let session = mount(SceneConfig::default(), 7, &time);

    let info = session.backend().last_info();
    assert!(info.triangles > 0);
    assert!(info.draw_calls as usize >= PropKind::ALL.len());
    assert_eq!(session.performance().triangles, info.triangles);
    assert_eq!(session.debug_info().triangles, info.triangles);
}

#[test]
fn test_particle_count_is_clamped() {
    let time = ManualTime::new();
    let config = SceneConfig {
        particle_count: 5000,
        seed: Some(3),
        ..SceneConfig::default()
    };
    let session = mount(config, 0, &time);
    assert_eq!(session.backend().last_info().points, MAX_PARTICLES as u64);

    let config = SceneConfig {
        particle_count: 80,
        seed: Some(3),
        ..SceneConfig::default()
    };
    let session = mount(config, 0, &time);
    assert_eq!(session.backend().last_info().points, 80);
}

#[test]
fn test_fixed_seed_reproduces_world() {
    let time = ManualTime::new();
    let config = SceneConfig {
        seed: Some(1234),
        ..SceneConfig::default()
    };
    let a = mount(config.clone(), 1, &time);
    let b = mount(config, 2, &time);
    assert_eq!(a.seed(), b.seed());

    let wa: Vec<_> = a.scene().graph.renderables().iter().map(|r| r.world).collect();
    let wb: Vec<_> = b.scene().graph.renderables().iter().map(|r| r.world).collect();
    assert_eq!(wa, wb);
    assert_eq!(a.backend().last_info(), b.backend().last_info());
}

#[test]
fn test_unseeded_worlds_share_structure() {
    let time = ManualTime::new();
    let a = mount(SceneConfig::default(), 11, &time);
    let b = mount(SceneConfig::default(), 12, &time);
    assert_ne!(a.seed(), b.seed());
    assert_eq!(a.scene().graph.len(), b.scene().graph.len());
    assert_eq!(a.backend().last_info().triangles, b.backend().last_info().triangles);

    let books = a.scene().prop(PropKind::BookStack).unwrap();
    assert_eq!(a.scene().graph.children(books).len(), 4);
}

#[test]
fn test_lights_follow_the_clock() {
    let time = ManualTime::new();
    let mut session = mount(SceneConfig::default(), 0, &time);
    let rig = session.lights().clone();
    let first_keyboard = rig.get(rig.keyboard).unwrap().color;

    for _ in 0..30 {
        time.advance(1.0 / 30.0);
        session.host_mut().take_frame();
        session.handle(HostEvent::Frame);
    }

    let elapsed = session.render_loop().elapsed();
    let lights = session.lights();
    let monitor = lights.get(lights.monitor).unwrap();
    let desk = lights.get(lights.desk).unwrap();
    assert!((monitor.intensity - monitor_intensity_at(elapsed)).abs() < 1e-5);
    assert!((desk.intensity - desk_intensity_at(elapsed)).abs() < 1e-5);
    assert_ne!(lights.get(lights.keyboard).unwrap().color, first_keyboard);
    assert!(lights.shadow_caster().is_some());
}

#[test]
fn test_texture_recipes_are_structurally_stable() {
    let a = SceneTextures::generate(&mut SceneRng::new(1));
    let b = SceneTextures::generate(&mut SceneRng::new(99));
    for (ta, tb) in a.all().iter().zip(b.all().iter()) {
        assert_eq!(ta.label, tb.label);
        assert_eq!((ta.width(), ta.height()), (tb.width(), tb.height()));
        assert_eq!(ta.wrap, tb.wrap);
        assert_eq!(ta.repeat, tb.repeat);
    }
    // The code panel has no random input at all.
    assert_eq!(a.code.pixels(), b.code.pixels());
}
