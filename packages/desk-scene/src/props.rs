//! Prop constructors for the desk scene.
//!
//! Each constructor is a pure function of the shared [`PropFactory`] and
//! returns one owned [`SceneNode`] tree positioned in world space. Nothing is
//! attached here; [`crate::builder::SceneBuilder`] decides when props enter the
//! scene graph.
//!
//! Geometries and materials are interned by key in the factory, so identical
//! parts (desk legs, key caps with the same hue, leaves) share one `Arc`.

use std::collections::HashMap;
use std::f32::consts::{FRAC_PI_2, FRAC_PI_3, FRAC_PI_4, FRAC_PI_6, FRAC_PI_8, PI, TAU};
use std::sync::Arc;

use glam::Vec3;

use crate::color::Color;
use crate::geometry::Geometry;
use crate::material::Material;
use crate::rng::SceneRng;
use crate::scene_graph::SceneNode;
use crate::texture::SceneTextures;

/// Key rows as `(key count, z offset)`, back row first.
pub const KEY_ROWS: [(u32, f32); 4] = [(13, 0.3), (13, 0.15), (12, 0.0), (10, -0.15)];

/// Books bottom to top as `(thickness, cover colour)`.
pub const BOOKS: [(f32, u32); 4] = [
    (0.05, 0x8b0000),
    (0.06, 0x006400),
    (0.04, 0x4169e1),
    (0.05, 0xff8c00),
];

pub const LEAF_COUNT: usize = 8;
pub const RGB_STRIP_COUNT: usize = 4;
pub const GRILLE_BAR_COUNT: usize = 10;
pub const USB_PORT_COUNT: usize = 3;

/// Particle colour families with their selection weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleTone {
    Cool,
    Warm,
    Accent,
}

pub const PARTICLE_TONES: [(ParticleTone, f32); 3] = [
    (ParticleTone::Cool, 0.7),
    (ParticleTone::Warm, 0.2),
    (ParticleTone::Accent, 0.1),
];

impl ParticleTone {
    fn sample(self, rng: &mut SceneRng) -> [f32; 3] {
        match self {
            ParticleTone::Cool => [
                rng.range(0.2, 0.5),
                rng.range(0.4, 0.8),
                rng.range(0.8, 1.0),
            ],
            ParticleTone::Warm => [
                rng.range(0.9, 1.0),
                rng.range(0.5, 0.8),
                rng.range(0.2, 0.4),
            ],
            ParticleTone::Accent => [
                rng.range(0.8, 1.0),
                rng.range(0.2, 0.4),
                rng.range(0.6, 1.0),
            ],
        }
    }
}

/// Shared state for prop construction: randomness, textures and interned resources.
pub struct PropFactory {
    rng: SceneRng,
    textures: SceneTextures,
    geometries: HashMap<String, Arc<Geometry>>,
    materials: HashMap<String, Arc<Material>>,
    particle_count: usize,
}

impl PropFactory {
    /// Seeds the generator and synthesises every texture once.
    pub fn new(seed: u64, particle_count: usize) -> Self {
        let mut rng = SceneRng::new(seed);
        let textures = SceneTextures::generate(&mut rng);
        Self {
            rng,
            textures,
            geometries: HashMap::new(),
            materials: HashMap::new(),
            particle_count,
        }
    }

    pub fn textures(&self) -> &SceneTextures {
        &self.textures
    }

    pub fn rng(&mut self) -> &mut SceneRng {
        &mut self.rng
    }

    pub fn particle_count(&self) -> usize {
        self.particle_count
    }

    /// Interned geometry; `build` only runs the first time `key` is seen.
    pub fn geometry(&mut self, key: &str, build: impl FnOnce() -> Geometry) -> Arc<Geometry> {
        if let Some(g) = self.geometries.get(key) {
            return Arc::clone(g);
        }
        let g = Arc::new(build());
        self.geometries.insert(key.to_string(), Arc::clone(&g));
        g
    }

    /// Interned material; `build` only runs the first time `key` is seen.
    pub fn material(&mut self, key: &str, build: impl FnOnce(&SceneTextures) -> Material) -> Arc<Material> {
        if let Some(m) = self.materials.get(key) {
            return Arc::clone(m);
        }
        let m = Arc::new(build(&self.textures));
        self.materials.insert(key.to_string(), Arc::clone(&m));
        m
    }

    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    fn cuboid(&mut self, w: f32, h: f32, d: f32) -> Arc<Geometry> {
        self.geometry(&format!("box:{w}x{h}x{d}"), || Geometry::cuboid(w, h, d))
    }

    fn cylinder(&mut self, top: f32, bottom: f32, h: f32, segments: u32) -> Arc<Geometry> {
        self.geometry(&format!("cyl:{top}/{bottom}/{h}/{segments}"), || {
            Geometry::cylinder(top, bottom, h, segments, false)
        })
    }

    fn sphere(&mut self, r: f32) -> Arc<Geometry> {
        self.geometry(&format!("sphere:{r}"), || Geometry::sphere(r, 32, 16))
    }

    fn plane(&mut self, w: f32, h: f32) -> Arc<Geometry> {
        self.geometry(&format!("plane:{w}x{h}"), || Geometry::plane(w, h, 1, 1))
    }

    fn lambert(&mut self, hex: u32) -> Arc<Material> {
        self.material(&format!("lambert:{hex:06x}"), |_| Material::lambert(Color::from_hex(hex)))
    }

    fn glowing(&mut self, hex: u32, emissive: u32, intensity: f32) -> Arc<Material> {
        self.material(&format!("glow:{hex:06x}:{emissive:06x}:{intensity}"), |_| {
            Material::lambert(Color::from_hex(hex)).with_emissive(Color::from_hex(emissive), intensity)
        })
    }

    fn standard(&mut self, hex: u32, roughness: f32, metalness: f32) -> Arc<Material> {
        self.material(&format!("std:{hex:06x}:{roughness}:{metalness}"), |_| {
            Material::standard(Color::from_hex(hex), roughness, metalness)
        })
    }
}

/// Every prop the scene contains, in attachment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropKind {
    Desk,
    Monitor,
    Keyboard,
    Mouse,
    Speakers,
    CoffeeCup,
    Notebook,
    Pen,
    ComputerCase,
    Plant,
    BookStack,
    DeskLamp,
    Particles,
    Floor,
    Wall,
}

impl PropKind {
    pub const ALL: [PropKind; 15] = [
        PropKind::Desk,
        PropKind::Monitor,
        PropKind::Keyboard,
        PropKind::Mouse,
        PropKind::Speakers,
        PropKind::CoffeeCup,
        PropKind::Notebook,
        PropKind::Pen,
        PropKind::ComputerCase,
        PropKind::Plant,
        PropKind::BookStack,
        PropKind::DeskLamp,
        PropKind::Particles,
        PropKind::Floor,
        PropKind::Wall,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PropKind::Desk => "desk",
            PropKind::Monitor => "monitor",
            PropKind::Keyboard => "keyboard",
            PropKind::Mouse => "mouse",
            PropKind::Speakers => "speakers",
            PropKind::CoffeeCup => "coffee-cup",
            PropKind::Notebook => "notebook",
            PropKind::Pen => "pen",
            PropKind::ComputerCase => "computer-case",
            PropKind::Plant => "plant",
            PropKind::BookStack => "book-stack",
            PropKind::DeskLamp => "desk-lamp",
            PropKind::Particles => "particles",
            PropKind::Floor => "floor",
            PropKind::Wall => "wall",
        }
    }

    pub fn build(self, f: &mut PropFactory) -> SceneNode {
        match self {
            PropKind::Desk => desk(f),
            PropKind::Monitor => monitor(f),
            PropKind::Keyboard => keyboard(f),
            PropKind::Mouse => mouse(f),
            PropKind::Speakers => speakers(f),
            PropKind::CoffeeCup => coffee_cup(f),
            PropKind::Notebook => notebook(f),
            PropKind::Pen => pen(f),
            PropKind::ComputerCase => computer_case(f),
            PropKind::Plant => plant(f),
            PropKind::BookStack => book_stack(f),
            PropKind::DeskLamp => desk_lamp(f),
            PropKind::Particles => particles(f),
            PropKind::Floor => floor(f),
            PropKind::Wall => wall(f),
        }
    }
}

// ============================================================================
// Furniture
// ============================================================================

pub fn desk(f: &mut PropFactory) -> SceneNode {
    let top_geometry = f.cuboid(7.0, 0.3, 4.5);
    let top_material = f.material("desk-top", |t| {
        Material::standard(Color::from_hex(0x8b4513), 0.7, 0.1)
            .with_map(Arc::clone(&t.wood))
            .with_normal_map(Arc::clone(&t.wood_normal))
    });
    let mut group = SceneNode::group(PropKind::Desk.name()).with_child(
        SceneNode::mesh("top", top_geometry, top_material)
            .casts_shadow()
            .receives_shadow(),
    );

    let leg_geometry = f.cuboid(0.15, 1.8, 0.15);
    let leg_material = f.standard(0x654321, 0.8, 0.1);
    for (i, (x, z)) in [(-3.2, -2.0), (3.2, -2.0), (-3.2, 2.0), (3.2, 2.0)].into_iter().enumerate() {
        group.push(
            SceneNode::mesh(format!("leg-{i}"), Arc::clone(&leg_geometry), Arc::clone(&leg_material))
                .at(x, -0.9, z)
                .casts_shadow(),
        );
    }

    group
}

pub fn monitor(f: &mut PropFactory) -> SceneNode {
    let base = SceneNode::mesh("base", f.cylinder(0.5, 0.6, 0.15, 16), f.standard(0x2a2a2a, 0.3, 0.8))
        .at(0.0, 0.225, -0.1)
        .casts_shadow();

    let metal = f.standard(0x333333, 0.2, 0.9);
    let stand = SceneNode::mesh("stand", f.cylinder(0.08, 0.08, 1.0, 12), Arc::clone(&metal))
        .at(0.0, 0.8, -0.1)
        .casts_shadow();
    let arm = SceneNode::mesh("arm", f.cuboid(0.12, 0.04, 0.3), metal)
        .at(0.0, 1.68, -0.08)
        .casts_shadow();

    let bezel = SceneNode::mesh("bezel", f.cuboid(2.44, 1.64, 0.06), f.standard(0x23272a, 0.18, 0.7))
        .at(0.0, 1.7, 0.01)
        .casts_shadow();

    let screen_material = f.material("monitor-screen", |_| {
        Material::standard(Color::BLACK, 0.1, 0.85).with_emissive(Color::from_hex(0x001122), 0.08)
    });
    let screen = SceneNode::mesh("screen", f.cuboid(2.36, 1.56, 0.018), screen_material)
        .at(0.0, 1.7, 0.045)
        .casts_shadow();

    let code_material = f.material("monitor-code", |t| {
        Material::standard(Color::WHITE, 0.9, 0.0)
            .with_map(Arc::clone(&t.code))
            .with_emissive(Color::from_hex(0x002244), 0.25)
            .with_opacity(1.0)
    });
    let code = SceneNode::mesh("code", f.plane(2.28, 1.48), code_material).at(0.0, 1.7, 0.055);

    let logo_material = f.material("monitor-logo", |_| {
        Material::standard(Color::WHITE, 1.0, 0.0).with_emissive(Color::from_hex(0x111111), 0.2)
    });
    let logo = SceneNode::mesh("logo", f.plane(0.3, 0.1), logo_material).at(0.0, 1.0, 0.11);

    SceneNode::group(PropKind::Monitor.name())
        .at(0.0, 0.15, 1.2)
        .with_child(base)
        .with_child(stand)
        .with_child(arm)
        .with_child(bezel)
        .with_child(screen)
        .with_child(code)
        .with_child(logo)
}

pub fn keyboard(f: &mut PropFactory) -> SceneNode {
    let base_material = f.material("keyboard-base", |_| {
        Material::standard(Color::from_hex(0x1a1a1a), 0.6, 0.2).with_emissive(Color::from_hex(0x330033), 0.1)
    });
    let mut group = SceneNode::group(PropKind::Keyboard.name())
        .at(0.0, 0.21, 2.2)
        .with_child(SceneNode::mesh("base", f.cuboid(2.2, 0.12, 0.9), base_material).casts_shadow());

    let key_geometry = f.cuboid(0.13, 0.06, 0.13);
    for (row, (count, z)) in KEY_ROWS.into_iter().enumerate() {
        for col in 0..count {
            let hue = (col + row as u32 * 3) % 360;
            let material = f.material(&format!("key:{hue}"), |_| {
                Material::standard(Color::from_hex(0xf0f0f0), 0.3, 0.1)
                    .with_emissive(Color::from_hsl(hue as f32 / 360.0, 0.7, 0.3), 0.2)
            });
            let x = (col as f32 - count as f32 / 2.0 + 0.5) * 0.16;
            group.push(
                SceneNode::mesh(format!("key-{row}-{col}"), Arc::clone(&key_geometry), material)
                    .at(x, 0.09, z)
                    .casts_shadow(),
            );
        }
    }

    let space_material = f.material("spacebar", |_| {
        Material::standard(Color::from_hex(0xf0f0f0), 0.3, 0.1).with_emissive(Color::from_hex(0x0066ff), 0.2)
    });
    group.push(
        SceneNode::mesh("spacebar", f.cuboid(1.2, 0.06, 0.13), space_material)
            .at(0.0, 0.09, -0.35)
            .casts_shadow(),
    );

    group
}

pub fn mouse(f: &mut PropFactory) -> SceneNode {
    let body = SceneNode::mesh("body", f.cuboid(0.3, 0.05, 0.5), f.lambert(0x333333))
        .at(1.5, 0.125, 2.8)
        .casts_shadow();
    let wheel = SceneNode::mesh("wheel", f.cylinder(0.02, 0.02, 0.1, 8), f.lambert(0x555555))
        .at(1.5, 0.16, 2.9)
        .rotated(FRAC_PI_2, 0.0, 0.0)
        .casts_shadow();

    SceneNode::group(PropKind::Mouse.name()).with_child(body).with_child(wheel)
}

pub fn speakers(f: &mut PropFactory) -> SceneNode {
    let mut group = SceneNode::group(PropKind::Speakers.name());
    for (i, x) in [-2.5, 2.5].into_iter().enumerate() {
        let body = SceneNode::mesh("body", f.cuboid(0.4, 0.8, 0.3), f.lambert(0x1a1a1a)).casts_shadow();
        let cone = SceneNode::mesh("cone", f.cylinder(0.15, 0.15, 0.02, 16), f.lambert(0x333333))
            .at(0.0, 0.1, 0.16)
            .rotated(FRAC_PI_2, 0.0, 0.0);
        let led = SceneNode::mesh("led", f.sphere(0.02), f.glowing(0x00ff00, 0x004400, 0.5)).at(0.1, 0.3, 0.16);

        group.push(
            SceneNode::group(format!("speaker-{i}"))
                .at(x, 0.5, 0.5)
                .with_child(body)
                .with_child(cone)
                .with_child(led),
        );
    }
    group
}

// ============================================================================
// Desk clutter
// ============================================================================

pub fn coffee_cup(f: &mut PropFactory) -> SceneNode {
    let white = f.lambert(0xffffff);
    let cup = SceneNode::mesh("cup", f.cylinder(0.12, 0.1, 0.25, 16), Arc::clone(&white)).casts_shadow();
    let coffee = SceneNode::mesh("coffee", f.cylinder(0.11, 0.09, 0.02, 16), f.lambert(0x4a2c17)).at(0.0, 0.12, 0.0);
    let handle_geometry = f.geometry("torus:handle", || Geometry::torus(0.08, 0.02, 8, 16, PI));
    let handle = SceneNode::mesh("handle", handle_geometry, white)
        .at(0.15, 0.0, 0.0)
        .rotated(0.0, 0.0, FRAC_PI_2);

    SceneNode::group(PropKind::CoffeeCup.name())
        .at(-1.5, 0.225, 2.5)
        .with_child(cup)
        .with_child(coffee)
        .with_child(handle)
}

pub fn notebook(f: &mut PropFactory) -> SceneNode {
    let pages = SceneNode::mesh("pages", f.cuboid(0.6, 0.02, 0.8), f.lambert(0xffffff)).casts_shadow();
    let cover = SceneNode::mesh("cover", f.cuboid(0.62, 0.01, 0.82), f.lambert(0x2563eb))
        .at(0.0, 0.015, 0.0)
        .casts_shadow();

    SceneNode::group(PropKind::Notebook.name())
        .at(-1.8, 0.125, 0.5)
        .rotated(0.0, FRAC_PI_6, 0.0)
        .with_child(pages)
        .with_child(cover)
}

pub fn pen(f: &mut PropFactory) -> SceneNode {
    let barrel = SceneNode::mesh("barrel", f.cylinder(0.01, 0.01, 0.6, 8), f.lambert(0x2563eb))
        .at(-1.6, 0.15, 0.3)
        .rotated(0.0, 0.0, FRAC_PI_3)
        .casts_shadow();
    SceneNode::group(PropKind::Pen.name()).with_child(barrel)
}

pub fn plant(f: &mut PropFactory) -> SceneNode {
    let pot = SceneNode::mesh("pot", f.cylinder(0.25, 0.2, 0.3, 12), f.lambert(0x8b4513))
        .at(0.0, 0.15, 0.0)
        .casts_shadow();
    let soil = SceneNode::mesh("soil", f.cylinder(0.23, 0.23, 0.02, 12), f.lambert(0x4a3c1a)).at(0.0, 0.29, 0.0);
    let stem = SceneNode::mesh("stem", f.cylinder(0.02, 0.02, 0.8, 6), f.lambert(0x228b22)).at(0.0, 0.7, 0.0);

    let mut group = SceneNode::group(PropKind::Plant.name())
        .at(-2.2, 0.1, 1.5)
        .with_child(pot)
        .with_child(soil)
        .with_child(stem);

    // Leaves pivot at their base so the tilt fans them outwards.
    let leaf_geometry = f.geometry("leaf", || Geometry::plane(0.2, 0.4, 1, 1).translated(Vec3::new(0.0, 0.2, 0.0)));
    let leaf_material = f.material("leaf", |_| Material::lambert(Color::from_hex(0x228b22)).double_sided());
    for i in 0..LEAF_COUNT {
        let angle = i as f32 / LEAF_COUNT as f32 * TAU;
        let height = 0.8 + (i % 3) as f32 * 0.1;
        group.push(
            SceneNode::mesh(format!("leaf-{i}"), Arc::clone(&leaf_geometry), Arc::clone(&leaf_material))
                .at(angle.cos() * 0.15, height, angle.sin() * 0.15)
                .rotated(0.0, angle, FRAC_PI_6)
                .casts_shadow(),
        );
    }

    group
}

pub fn book_stack(f: &mut PropFactory) -> SceneNode {
    let mut group = SceneNode::group(PropKind::BookStack.name())
        .at(2.0, 0.12, 1.2)
        .rotated(0.0, FRAC_PI_8, 0.0);
    let spine_material = f.lambert(0xffffff);

    for (i, (thickness, cover)) in BOOKS.into_iter().enumerate() {
        let y = i as f32 * thickness + thickness / 2.0;
        let book = SceneNode::mesh("cover", f.cuboid(0.5, thickness, 0.8), f.lambert(cover)).casts_shadow();
        let spine = SceneNode::mesh("spine", f.cuboid(0.02, thickness * 0.8, 0.6), Arc::clone(&spine_material))
            .at(0.24, 0.0, 0.0);
        group.push(
            SceneNode::group(format!("book-{i}"))
                .at(0.0, y, 0.0)
                .with_child(book)
                .with_child(spine),
        );
    }

    group
}

pub fn desk_lamp(f: &mut PropFactory) -> SceneNode {
    let dark = f.lambert(0x2c2c2c);
    let base = SceneNode::mesh("base", f.cylinder(0.15, 0.2, 0.1, 12), Arc::clone(&dark))
        .at(0.0, 0.05, 0.0)
        .casts_shadow();
    let arm = SceneNode::mesh("arm", f.cylinder(0.02, 0.02, 1.2, 8), dark)
        .at(0.3, 0.8, 0.0)
        .rotated(0.0, 0.0, FRAC_PI_6)
        .casts_shadow();

    let shade_geometry = f.geometry("lamp-shade", || Geometry::cone(0.2, 0.3, 12, true));
    let shade_material = f.material("lamp-shade", |_| Material::lambert(Color::WHITE).double_sided());
    let shade = SceneNode::mesh("shade", shade_geometry, shade_material)
        .at(0.5, 1.3, 0.0)
        .rotated(0.0, 0.0, FRAC_PI_4)
        .casts_shadow();

    let bulb = SceneNode::mesh("bulb", f.sphere(0.05), f.glowing(0xffffaa, 0xffff88, 0.5)).at(0.5, 1.2, 0.0);

    SceneNode::group(PropKind::DeskLamp.name())
        .at(-1.5, 0.1, 0.8)
        .with_child(base)
        .with_child(arm)
        .with_child(shade)
        .with_child(bulb)
}

pub fn computer_case(f: &mut PropFactory) -> SceneNode {
    let body = SceneNode::mesh("body", f.cuboid(0.8, 1.6, 1.2), f.lambert(0x1a1a1a)).casts_shadow();

    let glass_material = f.material("case-glass", |_| Material::lambert(Color::from_hex(0x88ccff)).with_opacity(0.3));
    let glass = SceneNode::mesh("glass", f.cuboid(0.02, 1.4, 1.0), glass_material).at(-0.39, 0.0, 0.0);

    let led = SceneNode::mesh("power-led", f.sphere(0.03), f.glowing(0x0066ff, 0x002266, 0.8)).at(0.35, 0.6, 0.61);

    let mut group = SceneNode::group(PropKind::ComputerCase.name())
        .at(3.5, 0.9, 0.0)
        .with_child(body)
        .with_child(glass)
        .with_child(led);

    let strip_geometry = f.cuboid(0.6, 0.02, 0.02);
    let strip_material = f.glowing(0xff0080, 0x660033, 0.6);
    for i in 0..RGB_STRIP_COUNT {
        group.push(
            SceneNode::mesh(format!("strip-{i}"), Arc::clone(&strip_geometry), Arc::clone(&strip_material))
                .at(-0.3, 0.5 - i as f32 * 0.3, 0.4),
        );
    }

    let grille_geometry = f.cuboid(0.6, 0.02, 0.01);
    let grille_material = f.lambert(0x333333);
    for i in 0..GRILLE_BAR_COUNT {
        group.push(
            SceneNode::mesh(format!("grille-{i}"), Arc::clone(&grille_geometry), Arc::clone(&grille_material))
                .at(0.0, 0.4 - i as f32 * 0.08, 0.61),
        );
    }

    group.push(SceneNode::mesh("io-panel", f.cuboid(0.3, 0.1, 0.02), f.lambert(0x2a2a2a)).at(0.2, 0.7, 0.61));

    let usb_geometry = f.cuboid(0.04, 0.02, 0.01);
    let usb_material = f.lambert(0x000000);
    for i in 0..USB_PORT_COUNT {
        group.push(
            SceneNode::mesh(format!("usb-{i}"), Arc::clone(&usb_geometry), Arc::clone(&usb_material))
                .at(0.1 + i as f32 * 0.05, 0.7, 0.62),
        );
    }

    group
}

// ============================================================================
// Environment
// ============================================================================

/// Glowing dust: uniform positions in x,z in [-10, 10), y in [0, 8).
pub fn particles(f: &mut PropFactory) -> SceneNode {
    let count = f.particle_count();
    let mut positions = Vec::with_capacity(count);
    let mut colors = Vec::with_capacity(count);
    for _ in 0..count {
        let rng = f.rng();
        positions.push(Vec3::new(
            rng.range(-10.0, 10.0),
            rng.range(0.0, 8.0),
            rng.range(-10.0, 10.0),
        ));
        let tone = rng
            .pick_weighted(&PARTICLE_TONES)
            .copied()
            .unwrap_or(ParticleTone::Cool);
        colors.push(tone.sample(rng));
    }

    // Not interned: the cloud is unique and depends on the draw sequence.
    let geometry = Arc::new(Geometry::points(&positions, &colors));
    let material = f.material("particles", |_| Material::points(0.02).with_opacity(0.6));

    SceneNode::group(PropKind::Particles.name()).with_child(SceneNode::mesh("cloud", geometry, material))
}

/// Patterned translucent floor over a wood floor slightly below it.
pub fn floor(f: &mut PropFactory) -> SceneNode {
    let pattern_geometry = f.geometry("floor-pattern", || Geometry::plane(25.0, 25.0, 32, 32));
    let pattern_material = f.material("floor-pattern", |t| {
        Material::lambert(Color::WHITE)
            .with_map(Arc::clone(&t.floor_pattern))
            .with_opacity(0.8)
    });
    let pattern = SceneNode::mesh("pattern", pattern_geometry, pattern_material)
        .at(0.0, -0.1, 0.0)
        .rotated(-FRAC_PI_2, 0.0, 0.0)
        .receives_shadow();

    let wood_material = f.material("floor-wood", |t| {
        Material::standard(Color::from_hex(0x654321), 0.8, 0.1).with_map(Arc::clone(&t.floor_wood))
    });
    let wood = SceneNode::mesh("wood", f.plane(25.0, 25.0), wood_material)
        .at(0.0, -0.15, 0.0)
        .rotated(-FRAC_PI_2, 0.0, 0.0)
        .receives_shadow();

    SceneNode::group(PropKind::Floor.name()).with_child(pattern).with_child(wood)
}

pub fn wall(f: &mut PropFactory) -> SceneNode {
    let material = f.material("wall", |t| {
        Material::standard(Color::WHITE, 0.8, 0.0).with_map(Arc::clone(&t.wall))
    });
    let panel = SceneNode::mesh("panel", f.plane(25.0, 15.0), material)
        .at(0.0, 7.0, -5.0)
        .receives_shadow();
    SceneNode::group(PropKind::Wall.name()).with_child(panel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Topology;
    use crate::material::BlendMode;

    fn factory() -> PropFactory {
        PropFactory::new(1234, 50)
    }

    #[test]
    fn test_desk_has_four_legs() {
        let desk = desk(&mut factory());
        assert_eq!(desk.count_children("leg-"), 4);
        let top = desk.find("top").unwrap().mesh.as_ref().unwrap();
        assert!(top.cast_shadow && top.receive_shadow);
        assert!(top.material.map.is_some());
        assert!(top.material.normal_map.is_some());
    }

    #[test]
    fn test_desk_legs_share_material() {
        let desk = desk(&mut factory());
        let legs: Vec<_> = desk
            .children
            .iter()
            .filter(|c| c.name.starts_with("leg-"))
            .map(|c| c.mesh.as_ref().unwrap())
            .collect();
        for leg in &legs[1..] {
            assert!(Arc::ptr_eq(&leg.material, &legs[0].material));
            assert!(Arc::ptr_eq(&leg.geometry, &legs[0].geometry));
        }
    }

    #[test]
    fn test_keyboard_key_count() {
        let kb = keyboard(&mut factory());
        assert_eq!(kb.count_children("key-"), 48);
        assert!(kb.find("spacebar").is_some());
    }

    #[test]
    fn test_keys_with_same_hue_share_material() {
        let kb = keyboard(&mut factory());
        // hue = (col + row * 3) % 360: row 0 col 3 and row 1 col 0 both give 3
        let a = kb.find("key-0-3").unwrap().mesh.as_ref().unwrap();
        let b = kb.find("key-1-0").unwrap().mesh.as_ref().unwrap();
        assert!(Arc::ptr_eq(&a.material, &b.material));
        let c = kb.find("key-0-4").unwrap().mesh.as_ref().unwrap();
        assert!(!Arc::ptr_eq(&a.material, &c.material));
    }

    #[test]
    fn test_keyboard_rows_centered() {
        let kb = keyboard(&mut factory());
        let first = kb.find("key-0-0").unwrap().transform.position.x;
        let last = kb.find("key-0-12").unwrap().transform.position.x;
        assert!((first + last).abs() < 1e-5);
        assert!((first - (-0.96)).abs() < 1e-5);
    }

    #[test]
    fn test_speakers_pair() {
        let s = speakers(&mut factory());
        assert_eq!(s.count_children("speaker-"), 2);
        assert_eq!(s.children[0].transform.position.x, -2.5);
        assert_eq!(s.children[1].transform.position.x, 2.5);
    }

    #[test]
    fn test_plant_leaves() {
        let p = plant(&mut factory());
        assert_eq!(p.count_children("leaf-"), LEAF_COUNT);
        let leaf = p.find("leaf-0").unwrap().mesh.as_ref().unwrap();
        assert_eq!(leaf.material.side, crate::material::Side::Double);
    }

    #[test]
    fn test_book_stack() {
        let b = book_stack(&mut factory());
        assert_eq!(b.count_children("book-"), 4);
        for book in &b.children {
            assert!(book.find("spine").is_some());
        }
    }

    #[test]
    fn test_computer_case_details() {
        let c = computer_case(&mut factory());
        assert_eq!(c.count_children("strip-"), RGB_STRIP_COUNT);
        assert_eq!(c.count_children("grille-"), GRILLE_BAR_COUNT);
        assert_eq!(c.count_children("usb-"), USB_PORT_COUNT);
        let glass = c.find("glass").unwrap().mesh.as_ref().unwrap();
        assert_eq!(glass.material.blend_mode, BlendMode::AlphaBlend);
        assert!((glass.material.opacity - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_particles_within_bounds() {
        let mut f = PropFactory::new(77, 80);
        let node = particles(&mut f);
        let cloud = node.find("cloud").unwrap().mesh.as_ref().unwrap();
        assert_eq!(cloud.geometry.topology, Topology::Points);
        assert_eq!(cloud.geometry.point_count(), 80);
        for v in &cloud.geometry.vertices {
            let [x, y, z] = v.position;
            assert!((-10.0..10.0).contains(&x));
            assert!((0.0..8.0).contains(&y));
            assert!((-10.0..10.0).contains(&z));
        }
        assert_eq!(cloud.material.blend_mode, BlendMode::Additive);
        assert!((cloud.material.opacity - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_floor_layers() {
        let fl = floor(&mut factory());
        let pattern = fl.find("pattern").unwrap();
        let wood = fl.find("wood").unwrap();
        assert!(pattern.transform.position.y > wood.transform.position.y);
        assert!(pattern.mesh.as_ref().unwrap().receive_shadow);
        assert_eq!(pattern.mesh.as_ref().unwrap().geometry.triangle_count(), 2 * 32 * 32);
    }

    #[test]
    fn test_every_prop_is_a_named_group() {
        let mut f = factory();
        for kind in PropKind::ALL {
            let node = kind.build(&mut f);
            assert_eq!(node.name, kind.name());
            assert!(node.mesh_count() >= 1, "{} has no meshes", kind.name());
        }
    }

    #[test]
    fn test_geometry_interning() {
        let mut f = factory();
        let a = f.cuboid(1.0, 2.0, 3.0);
        let b = f.cuboid(1.0, 2.0, 3.0);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(f.geometry_count(), 1);
    }
}
