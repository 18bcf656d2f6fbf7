//! Light set of the desk scene.
//!
//! The rig installs a fixed set of lights once per mount:
//! - Ambient and hemisphere fill
//! - One shadow-casting key directional light (the lamp) with an orthographic frustum
//! - A shadow-free cool fill directional light
//! - Point lights tied to the monitor, the desk and the keyboard
//!
//! Lights are kept in the rig and addressed by [`LightId`] handles, so the
//! render loop can animate colour and intensity in place every frame.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::color::Color;

/// Maximum number of lights the GPU uniform block can hold.
pub const MAX_LIGHTS: usize = 8;

/// Rate of the keyboard hue cycle, in degrees per second of RGB time.
pub const KEYBOARD_HUE_RATE: f32 = 50.0;

// ============================================================================
// Light Types
// ============================================================================

/// Orthographic shadow frustum of a directional light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowConfig {
    /// Edge length of the square shadow map in texels.
    pub map_size: u32,
    /// Half width/height of the orthographic box.
    pub half_extent: f32,
    pub near: f32,
    pub far: f32,
}

impl ShadowConfig {
    pub fn new(map_size: u32) -> Self {
        Self {
            map_size: map_size.max(1),
            half_extent: 10.0,
            near: 0.1,
            far: 50.0,
        }
    }

    /// Clamp the map edge to what the device can allocate.
    pub fn clamp_map_size(&mut self, device_limit: u32) {
        self.map_size = self.map_size.clamp(1, device_limit.max(1));
    }

    pub fn projection(&self) -> Mat4 {
        let e = self.half_extent;
        Mat4::orthographic_rh(-e, e, -e, e, self.near, self.far)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Ambient,
    /// Sky colour is the light's colour; ground colour is stored here.
    Hemisphere { ground: Color },
    Directional {
        target: Vec3,
        shadow: Option<ShadowConfig>,
    },
    Point { range: f32, decay: f32 },
}

impl LightKind {
    fn gpu_tag(&self) -> f32 {
        match self {
            LightKind::Ambient => 0.0,
            LightKind::Hemisphere { .. } => 1.0,
            LightKind::Directional { .. } => 2.0,
            LightKind::Point { .. } => 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub label: &'static str,
    pub kind: LightKind,
    pub color: Color,
    pub intensity: f32,
    pub position: Vec3,
}

impl Light {
    pub fn ambient(label: &'static str, color: Color, intensity: f32) -> Self {
        Self {
            label,
            kind: LightKind::Ambient,
            color,
            intensity,
            position: Vec3::ZERO,
        }
    }

    pub fn hemisphere(label: &'static str, sky: Color, ground: Color, intensity: f32) -> Self {
        Self {
            label,
            kind: LightKind::Hemisphere { ground },
            color: sky,
            intensity,
            position: Vec3::Y,
        }
    }

    pub fn directional(label: &'static str, color: Color, intensity: f32, position: Vec3) -> Self {
        Self {
            label,
            kind: LightKind::Directional {
                target: Vec3::ZERO,
                shadow: None,
            },
            color,
            intensity,
            position,
        }
    }

    pub fn point(label: &'static str, color: Color, intensity: f32, position: Vec3, range: f32) -> Self {
        Self {
            label,
            kind: LightKind::Point { range, decay: 2.0 },
            color,
            intensity,
            position,
        }
    }

    pub fn with_shadow(mut self, shadow: ShadowConfig) -> Self {
        if let LightKind::Directional { shadow: s, .. } = &mut self.kind {
            *s = Some(shadow);
        }
        self
    }

    pub fn shadow(&self) -> Option<&ShadowConfig> {
        match &self.kind {
            LightKind::Directional { shadow, .. } => shadow.as_ref(),
            _ => None,
        }
    }

    pub fn casts_shadow(&self) -> bool {
        self.shadow().is_some()
    }

    /// Direction the light travels in, for directional lights.
    pub fn direction(&self) -> Option<Vec3> {
        match self.kind {
            LightKind::Directional { target, .. } => Some((target - self.position).normalize_or_zero()),
            _ => None,
        }
    }

    fn to_gpu(&self) -> GpuLight {
        let rgb = self.color.to_array();
        let (params, direction) = match self.kind {
            LightKind::Ambient => ([0.0; 4], [0.0; 4]),
            LightKind::Hemisphere { ground } => (ground.to_rgba(0.0), [0.0, 1.0, 0.0, 0.0]),
            LightKind::Directional { target, shadow } => {
                let d = (target - self.position).normalize_or_zero();
                let caster = if shadow.is_some() { 1.0 } else { 0.0 };
                ([0.0; 4], [d.x, d.y, d.z, caster])
            }
            LightKind::Point { range, decay } => ([range, decay, 0.0, 0.0], [0.0; 4]),
        };
        GpuLight {
            position: self.position.extend(self.kind.gpu_tag()).to_array(),
            color: [rgb[0], rgb[1], rgb[2], self.intensity],
            params,
            direction,
        }
    }
}

/// Handle into a [`LightingRig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LightId(pub usize);

// ============================================================================
// Animation curves
// ============================================================================

/// Monitor glow breathes slowly.
pub fn monitor_intensity_at(elapsed: f32) -> f32 {
    1.2 + (elapsed * 2.0).sin() * 0.2
}

/// Desk light flickers at a higher frequency.
pub fn desk_intensity_at(elapsed: f32) -> f32 {
    0.8 + (elapsed * 5.0).sin() * 0.1
}

/// Keyboard hue in degrees, cycling with accumulated RGB time.
pub fn keyboard_hue_at(rgb_time: f32) -> f32 {
    (rgb_time * KEYBOARD_HUE_RATE).rem_euclid(360.0)
}

// ============================================================================
// Rig
// ============================================================================

#[derive(Debug, Clone)]
pub struct LightingRig {
    lights: Vec<Light>,
    pub ambient: LightId,
    pub hemisphere: LightId,
    pub key: LightId,
    pub fill: LightId,
    pub monitor: LightId,
    pub desk: LightId,
    pub keyboard: LightId,
}

impl LightingRig {
    /// Install the fixed light set. `shadow_map_size` is the requested key-light map edge.
    pub fn install(shadow_map_size: u32) -> Self {
        let mut rig = Self {
            lights: Vec::with_capacity(MAX_LIGHTS),
            ambient: LightId(0),
            hemisphere: LightId(0),
            key: LightId(0),
            fill: LightId(0),
            monitor: LightId(0),
            desk: LightId(0),
            keyboard: LightId(0),
        };

        rig.ambient = rig.add(Light::ambient("ambient", Color::from_hex(0x404040), 0.8));
        rig.hemisphere = rig.add(Light::hemisphere(
            "hemisphere",
            Color::from_hex(0x87ceeb),
            Color::from_hex(0x3a2a1a),
            0.35,
        ));
        rig.key = rig.add(
            Light::directional("key", Color::from_hex(0xffa500), 2.5, Vec3::new(3.0, 6.0, 4.0))
                .with_shadow(ShadowConfig::new(shadow_map_size)),
        );
        rig.fill = rig.add(Light::directional(
            "fill",
            Color::from_hex(0x8888ff),
            0.4,
            Vec3::new(-4.0, 3.0, -2.0),
        ));
        rig.monitor = rig.add(Light::point(
            "monitor",
            Color::from_hex(0x4a90e2),
            2.0,
            Vec3::new(0.0, 2.5, 1.0),
            12.0,
        ));
        rig.desk = rig.add(Light::point(
            "desk",
            Color::from_hex(0xffaa44),
            1.5,
            Vec3::new(-2.0, 3.5, -1.0),
            10.0,
        ));
        rig.keyboard = rig.add(Light::point(
            "keyboard",
            Color::from_hex(0xff0080),
            1.2,
            Vec3::new(0.0, 1.0, 2.2),
            6.0,
        ));

        log::debug!("installed {} lights", rig.lights.len());
        rig
    }

    /// Add a light. A second shadow caster loses its shadow.
    pub fn add(&mut self, mut light: Light) -> LightId {
        if light.casts_shadow() && self.shadow_caster().is_some() {
            log::warn!(
                "light '{}' requested a shadow but one caster is already installed; shadow disabled",
                light.label
            );
            if let LightKind::Directional { shadow, .. } = &mut light.kind {
                *shadow = None;
            }
        }
        if self.lights.len() >= MAX_LIGHTS {
            log::warn!("light '{}' exceeds the {} light limit and will not be shaded", light.label, MAX_LIGHTS);
        }
        self.lights.push(light);
        LightId(self.lights.len() - 1)
    }

    pub fn get(&self, id: LightId) -> Option<&Light> {
        self.lights.get(id.0)
    }

    pub fn get_mut(&mut self, id: LightId) -> Option<&mut Light> {
        self.lights.get_mut(id.0)
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    /// Per-frame animation of the prop lights.
    pub fn animate(&mut self, elapsed: f32, rgb_time: f32) {
        if let Some(monitor) = self.get_mut(self.monitor) {
            monitor.intensity = monitor_intensity_at(elapsed);
        }
        if let Some(keyboard) = self.get_mut(self.keyboard) {
            keyboard.color = Color::from_hsl(keyboard_hue_at(rgb_time) / 360.0, 1.0, 0.5);
        }
        if let Some(desk) = self.get_mut(self.desk) {
            desk.intensity = desk_intensity_at(elapsed);
        }
    }

    pub fn shadow_caster(&self) -> Option<&Light> {
        self.lights.iter().find(|l| l.casts_shadow())
    }

    /// Clamp the caster's map edge to the device texture limit.
    pub fn clamp_shadow_map(&mut self, device_limit: u32) {
        for light in &mut self.lights {
            if let LightKind::Directional { shadow: Some(shadow), .. } = &mut light.kind {
                shadow.clamp_map_size(device_limit);
            }
        }
    }

    /// Light-space view-projection of the shadow caster.
    pub fn shadow_view_projection(&self) -> Option<Mat4> {
        let light = self.shadow_caster()?;
        let (target, shadow) = match light.kind {
            LightKind::Directional { target, shadow: Some(shadow) } => (target, shadow),
            _ => return None,
        };
        let up = if (light.position - target).normalize_or_zero().abs_diff_eq(Vec3::Y, 1e-4) {
            Vec3::Z
        } else {
            Vec3::Y
        };
        Some(shadow.projection() * Mat4::look_at_rh(light.position, target, up))
    }

    pub fn to_uniforms(&self) -> LightingUniforms {
        let mut uniforms = LightingUniforms::zeroed();
        for (slot, light) in uniforms.lights.iter_mut().zip(&self.lights) {
            *slot = light.to_gpu();
        }
        uniforms.count = self.lights.len().min(MAX_LIGHTS) as u32;
        uniforms
    }
}

// ============================================================================
// GPU Uniforms
// ============================================================================

/// One light as laid out in the uniform block. 64 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct GpuLight {
    /// xyz = position, w = kind (0 ambient, 1 hemisphere, 2 directional, 3 point).
    pub position: [f32; 4],
    /// rgb = colour, a = intensity.
    pub color: [f32; 4],
    /// Point: (range, decay). Hemisphere: ground colour.
    pub params: [f32; 4],
    /// Directional: xyz = travel direction, w = 1 if shadowed.
    pub direction: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct LightingUniforms {
    pub lights: [GpuLight; MAX_LIGHTS],
    pub count: u32,
    pub _padding: [u32; 3],
}
