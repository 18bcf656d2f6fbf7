//! Surface descriptions for scene meshes.
//!
//! A [`Material`] is an immutable value shared between meshes via `Arc`. The
//! GPU backend derives its pipeline choice from [`Material::blend_mode`] and
//! feeds everything else into the per-draw uniforms.

use std::sync::Arc;

use crate::color::Color;
use crate::texture::Texture;

/// Blend modes for materials.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// No blending, fully opaque.
    #[default]
    Opaque,
    /// Standard alpha blending.
    AlphaBlend,
    /// Additive blending (for glows, particles).
    Additive,
}

impl BlendMode {
    /// Convert to wgpu blend state.
    pub fn to_blend_state(&self) -> wgpu::BlendState {
        match self {
            BlendMode::Opaque => wgpu::BlendState::REPLACE,
            BlendMode::AlphaBlend => wgpu::BlendState::ALPHA_BLENDING,
            BlendMode::Additive => wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            },
        }
    }

    /// Blended draws skip depth writes and run after opaque geometry.
    pub fn writes_depth(&self) -> bool {
        matches!(self, BlendMode::Opaque)
    }
}

/// Lighting model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shading {
    /// Roughness/metalness response with specular highlights.
    Standard { roughness: f32, metalness: f32 },
    /// Diffuse only.
    Lambert,
    /// Unlit points of a fixed world-space size.
    Points { size: f32 },
}

/// Which faces are drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Side {
    #[default]
    Front,
    Double,
}

#[derive(Clone, Debug)]
pub struct Material {
    pub color: Color,
    pub shading: Shading,
    pub emissive: Color,
    pub emissive_intensity: f32,
    pub map: Option<Arc<Texture>>,
    pub normal_map: Option<Arc<Texture>>,
    pub opacity: f32,
    pub side: Side,
    pub blend_mode: BlendMode,
    pub vertex_colors: bool,
}

impl Material {
    fn base(color: Color, shading: Shading) -> Self {
        Self {
            color,
            shading,
            emissive: Color::BLACK,
            emissive_intensity: 1.0,
            map: None,
            normal_map: None,
            opacity: 1.0,
            side: Side::Front,
            blend_mode: BlendMode::Opaque,
            vertex_colors: false,
        }
    }

    pub fn standard(color: Color, roughness: f32, metalness: f32) -> Self {
        Self::base(
            color,
            Shading::Standard {
                roughness: roughness.clamp(0.0, 1.0),
                metalness: metalness.clamp(0.0, 1.0),
            },
        )
    }

    pub fn lambert(color: Color) -> Self {
        Self::base(color, Shading::Lambert)
    }

    /// Additive point sprites coloured per vertex.
    pub fn points(size: f32) -> Self {
        Self {
            vertex_colors: true,
            blend_mode: BlendMode::Additive,
            ..Self::base(Color::WHITE, Shading::Points { size })
        }
    }

    pub fn with_emissive(mut self, color: Color, intensity: f32) -> Self {
        self.emissive = color;
        self.emissive_intensity = intensity;
        self
    }

    pub fn with_map(mut self, texture: Arc<Texture>) -> Self {
        self.map = Some(texture);
        self
    }

    pub fn with_normal_map(mut self, texture: Arc<Texture>) -> Self {
        self.normal_map = Some(texture);
        self
    }

    /// Set opacity and switch to alpha blending. Additive materials keep their blend mode.
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        if self.blend_mode == BlendMode::Opaque {
            self.blend_mode = BlendMode::AlphaBlend;
        }
        self
    }

    pub fn double_sided(mut self) -> Self {
        self.side = Side::Double;
        self
    }

    pub fn is_transparent(&self) -> bool {
        self.blend_mode != BlendMode::Opaque
    }

    /// Emissive colour premultiplied by its intensity.
    pub fn emissive_radiance(&self) -> Color {
        self.emissive.scaled(self.emissive_intensity)
    }
}
