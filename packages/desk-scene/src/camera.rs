//! Orbit-swing camera.
//!
//! The camera never completes a full orbit. It swings back and forth around a
//! base angle on a circle of fixed radius, bobs gently up and down, and is
//! always re-aimed at the monitor. The pose is a pure function of elapsed
//! render time and the hover flag.
//!
//! The pointer position is not an input here.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

// ============================================================================
// Orbit Parameters
// ============================================================================

/// Constants of the orbit-swing motion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitParams {
    /// Centre of the swing, in radians around +Y.
    pub base_angle: f32,
    /// Swing rate when not hovered.
    pub rotation_speed: f32,
    /// Rotation-speed multiplier while the pointer is over the container.
    pub hover_multiplier: f32,
    /// Peak deviation from `base_angle`, in radians.
    pub swing_amplitude: f32,
    /// Horizontal distance from the Y axis.
    pub radius: f32,
    pub base_height: f32,
    pub bob_frequency: f32,
    pub bob_amplitude: f32,
    /// Fixed aim point (screen centre).
    pub look_at: [f32; 3],
}

impl Default for OrbitParams {
    fn default() -> Self {
        Self {
            base_angle: 0.05,
            rotation_speed: 0.2,
            hover_multiplier: 1.5,
            swing_amplitude: 0.17,
            radius: 3.8,
            base_height: 1.9,
            bob_frequency: 0.3,
            bob_amplitude: 0.05,
            look_at: [0.0, 1.85, 0.0],
        }
    }
}

impl OrbitParams {
    pub fn target(&self) -> Vec3 {
        Vec3::from_array(self.look_at)
    }
}

// ============================================================================
// Camera State
// ============================================================================

/// The single perspective camera of a mounted scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
}

impl CameraState {
    pub fn new(aspect: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: 65.0,
            near: 0.1,
            far: 1000.0,
            aspect,
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Normalized direction from position to target.
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }
}

// ============================================================================
// Controller
// ============================================================================

/// Computes the camera pose each frame.
#[derive(Debug, Clone, Default)]
pub struct CameraController {
    params: OrbitParams,
}

impl CameraController {
    pub fn new(params: OrbitParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &OrbitParams {
        &self.params
    }

    pub fn rotation_speed(&self, hovered: bool) -> f32 {
        if hovered {
            self.params.rotation_speed * self.params.hover_multiplier
        } else {
            self.params.rotation_speed
        }
    }

    /// `base + sin(t * speed) * amplitude`
    pub fn angle_at(&self, elapsed: f32, hovered: bool) -> f32 {
        let p = &self.params;
        p.base_angle + (elapsed * self.rotation_speed(hovered)).sin() * p.swing_amplitude
    }

    /// Time derivative of [`Self::angle_at`].
    pub fn angular_velocity(&self, elapsed: f32, hovered: bool) -> f32 {
        let speed = self.rotation_speed(hovered);
        (elapsed * speed).cos() * speed * self.params.swing_amplitude
    }

    pub fn position_at(&self, elapsed: f32, hovered: bool) -> Vec3 {
        let p = &self.params;
        let angle = self.angle_at(elapsed, hovered);
        Vec3::new(
            angle.sin() * p.radius,
            p.base_height + (elapsed * p.bob_frequency).sin() * p.bob_amplitude,
            angle.cos() * p.radius,
        )
    }

    /// Move the camera and re-aim it at the fixed target.
    pub fn update(&self, camera: &mut CameraState, elapsed: f32, hovered: bool) {
        camera.position = self.position_at(elapsed, hovered);
        camera.target = self.params.target();
    }
}
