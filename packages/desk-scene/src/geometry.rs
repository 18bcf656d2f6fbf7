//! Procedural mesh generators.
//!
//! Every generator returns an indexed triangle list (or a point list for
//! particle clouds) with per-vertex normals and UVs. Conventions: Y is up,
//! cylinders and cones stand along Y, planes lie in XY facing +Z, and UVs
//! run bottom-left (0,0) to top-right (1,1).

use std::f32::consts::{PI, TAU};

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    /// Per-vertex colour, only read by materials with vertex colours enabled.
    pub color: [f32; 3],
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, uv: [f32; 2]) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv,
            color: [1.0, 1.0, 1.0],
        }
    }
}

/// Primitive assembly for a geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    Triangles,
    Points,
}

/// Axis-aligned bounding box in local space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundingBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl BoundingBox {
    /// Compute bounding box from a set of vertices.
    pub fn from_vertices(vertices: &[Vertex]) -> Self {
        if vertices.is_empty() {
            return Self::default();
        }

        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];

        for v in vertices {
            for i in 0..3 {
                min[i] = min[i].min(v.position[i]);
                max[i] = max[i].max(v.position[i]);
            }
        }

        Self { min, max }
    }

    pub fn center(&self) -> Vec3 {
        (Vec3::from(self.min) + Vec3::from(self.max)) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        Vec3::from(self.max) - Vec3::from(self.min)
    }
}

/// CPU-side mesh data. Immutable once built and shared between nodes via `Arc`.
#[derive(Debug, Clone)]
pub struct Geometry {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub topology: Topology,
}

impl Geometry {
    fn triangles(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            indices,
            topology: Topology::Triangles,
        }
    }

    /// Box centred on the origin.
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let (hx, hy, hz) = (width * 0.5, height * 0.5, depth * 0.5);
        // (normal, u direction, v direction) with u x v == normal
        let faces = [
            (Vec3::X * hx, Vec3::NEG_Z * hz, Vec3::Y * hy),
            (Vec3::NEG_X * hx, Vec3::Z * hz, Vec3::Y * hy),
            (Vec3::Y * hy, Vec3::X * hx, Vec3::NEG_Z * hz),
            (Vec3::NEG_Y * hy, Vec3::X * hx, Vec3::Z * hz),
            (Vec3::Z * hz, Vec3::X * hx, Vec3::Y * hy),
            (Vec3::NEG_Z * hz, Vec3::NEG_X * hx, Vec3::Y * hy),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (center, u, v) in faces {
            let normal = center.normalize_or_zero();
            let base = vertices.len() as u32;
            vertices.push(Vertex::new(center - u - v, normal, [0.0, 0.0]));
            vertices.push(Vertex::new(center + u - v, normal, [1.0, 0.0]));
            vertices.push(Vertex::new(center + u + v, normal, [1.0, 1.0]));
            vertices.push(Vertex::new(center - u + v, normal, [0.0, 1.0]));
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::triangles(vertices, indices)
    }

    /// Cylinder (or truncated cone) along Y, centred on the origin.
    ///
    /// A zero radius collapses that end into an apex and skips its cap.
    pub fn cylinder(
        radius_top: f32,
        radius_bottom: f32,
        height: f32,
        radial_segments: u32,
        open_ended: bool,
    ) -> Self {
        let segments = radial_segments.max(3);
        let half = height * 0.5;
        let slope = if height != 0.0 {
            (radius_bottom - radius_top) / height
        } else {
            0.0
        };

        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        // Torso: row 0 is the top ring, row 1 the bottom ring.
        for row in 0..=1u32 {
            let v = row as f32;
            let radius = v * (radius_bottom - radius_top) + radius_top;
            let y = -v * height + half;
            for x in 0..=segments {
                let u = x as f32 / segments as f32;
                let theta = u * TAU;
                let (sin, cos) = theta.sin_cos();
                let normal = Vec3::new(sin, slope, cos).normalize_or_zero();
                vertices.push(Vertex::new(
                    Vec3::new(radius * sin, y, radius * cos),
                    normal,
                    [u, 1.0 - v],
                ));
            }
        }

        let row = segments + 1;
        for x in 0..segments {
            let a = x;
            let b = row + x;
            let c = row + x + 1;
            let d = x + 1;
            if radius_top > 0.0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if radius_bottom > 0.0 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }

        if !open_ended {
            if radius_top > 0.0 {
                push_cap(&mut vertices, &mut indices, radius_top, half, segments, true);
            }
            if radius_bottom > 0.0 {
                push_cap(&mut vertices, &mut indices, radius_bottom, -half, segments, false);
            }
        }

        Self::triangles(vertices, indices)
    }

    /// Cone along Y with its apex at the top.
    pub fn cone(radius: f32, height: f32, radial_segments: u32, open_ended: bool) -> Self {
        Self::cylinder(0.0, radius, height, radial_segments, open_ended)
    }

    /// UV sphere centred on the origin. Pole rows emit a single triangle per segment.
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let ws = width_segments.max(3);
        let hs = height_segments.max(2);

        let mut vertices = Vec::with_capacity(((ws + 1) * (hs + 1)) as usize);
        for iy in 0..=hs {
            let v = iy as f32 / hs as f32;
            for ix in 0..=ws {
                let u = ix as f32 / ws as f32;
                let position = Vec3::new(
                    -radius * (u * TAU).cos() * (v * PI).sin(),
                    radius * (v * PI).cos(),
                    radius * (u * TAU).sin() * (v * PI).sin(),
                );
                vertices.push(Vertex::new(position, position.normalize_or_zero(), [u, 1.0 - v]));
            }
        }

        let row = ws + 1;
        let mut indices = Vec::new();
        for iy in 0..hs {
            for ix in 0..ws {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;
                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != hs - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        Self::triangles(vertices, indices)
    }

    /// Torus in the XY plane. `arc` limits the sweep (PI gives a half ring).
    pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32, arc: f32) -> Self {
        let radial = radial_segments.max(3);
        let tubular = tubular_segments.max(3);

        let mut vertices = Vec::with_capacity(((radial + 1) * (tubular + 1)) as usize);
        for j in 0..=radial {
            let v = j as f32 / radial as f32 * TAU;
            for i in 0..=tubular {
                let u = i as f32 / tubular as f32 * arc;
                let position = Vec3::new(
                    (radius + tube * v.cos()) * u.cos(),
                    (radius + tube * v.cos()) * u.sin(),
                    tube * v.sin(),
                );
                let center = Vec3::new(radius * u.cos(), radius * u.sin(), 0.0);
                vertices.push(Vertex::new(
                    position,
                    (position - center).normalize_or_zero(),
                    [i as f32 / tubular as f32, j as f32 / radial as f32],
                ));
            }
        }

        let row = tubular + 1;
        let mut indices = Vec::with_capacity((radial * tubular * 6) as usize);
        for j in 1..=radial {
            for i in 1..=tubular {
                let a = row * j + i - 1;
                let b = row * (j - 1) + i - 1;
                let c = row * (j - 1) + i;
                let d = row * j + i;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        Self::triangles(vertices, indices)
    }

    /// Subdivided plane in XY facing +Z.
    pub fn plane(width: f32, height: f32, width_segments: u32, height_segments: u32) -> Self {
        let gx = width_segments.max(1);
        let gy = height_segments.max(1);
        let seg_w = width / gx as f32;
        let seg_h = height / gy as f32;

        let mut vertices = Vec::with_capacity(((gx + 1) * (gy + 1)) as usize);
        for iy in 0..=gy {
            let y = iy as f32 * seg_h - height * 0.5;
            for ix in 0..=gx {
                let x = ix as f32 * seg_w - width * 0.5;
                vertices.push(Vertex::new(
                    Vec3::new(x, -y, 0.0),
                    Vec3::Z,
                    [ix as f32 / gx as f32, 1.0 - iy as f32 / gy as f32],
                ));
            }
        }

        let row = gx + 1;
        let mut indices = Vec::with_capacity((gx * gy * 6) as usize);
        for iy in 0..gy {
            for ix in 0..gx {
                let a = ix + row * iy;
                let b = ix + row * (iy + 1);
                let c = ix + 1 + row * (iy + 1);
                let d = ix + 1 + row * iy;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        Self::triangles(vertices, indices)
    }

    /// Point cloud with per-point colours. Missing colours default to white.
    pub fn points(positions: &[Vec3], colors: &[[f32; 3]]) -> Self {
        let vertices = positions
            .iter()
            .enumerate()
            .map(|(i, p)| Vertex {
                position: p.to_array(),
                normal: [0.0, 1.0, 0.0],
                uv: [0.0, 0.0],
                color: colors.get(i).copied().unwrap_or([1.0, 1.0, 1.0]),
            })
            .collect::<Vec<_>>();
        let indices = (0..vertices.len() as u32).collect();

        Self {
            vertices,
            indices,
            topology: Topology::Points,
        }
    }

    /// Shift every vertex by `offset` (used to move a pivot to an edge).
    pub fn translated(mut self, offset: Vec3) -> Self {
        for v in &mut self.vertices {
            v.position = (Vec3::from(v.position) + offset).to_array();
        }
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Triangles drawn for this geometry; point clouds draw none.
    pub fn triangle_count(&self) -> usize {
        match self.topology {
            Topology::Triangles => self.indices.len() / 3,
            Topology::Points => 0,
        }
    }

    pub fn point_count(&self) -> usize {
        match self.topology {
            Topology::Triangles => 0,
            Topology::Points => self.vertices.len(),
        }
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_vertices(&self.vertices)
    }
}

fn push_cap(
    vertices: &mut Vec<Vertex>,
    indices: &mut Vec<u32>,
    radius: f32,
    y: f32,
    segments: u32,
    top: bool,
) {
    let normal = if top { Vec3::Y } else { Vec3::NEG_Y };
    let center = vertices.len() as u32;
    vertices.push(Vertex::new(Vec3::new(0.0, y, 0.0), normal, [0.5, 0.5]));

    let ring = vertices.len() as u32;
    for x in 0..=segments {
        let theta = x as f32 / segments as f32 * TAU;
        let (sin, cos) = theta.sin_cos();
        let flip = if top { 1.0 } else { -1.0 };
        vertices.push(Vertex::new(
            Vec3::new(radius * sin, y, radius * cos),
            normal,
            [cos * 0.5 * flip + 0.5, sin * 0.5 + 0.5],
        ));
    }

    for x in 0..segments {
        if top {
            indices.extend_from_slice(&[center, ring + x, ring + x + 1]);
        } else {
            indices.extend_from_slice(&[center, ring + x + 1, ring + x]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cuboid_counts_and_bounds() {
        let g = Geometry::cuboid(7.0, 0.3, 4.5);
        assert_eq!(g.vertex_count(), 24);
        assert_eq!(g.triangle_count(), 12);
        let b = g.bounds();
        assert!((b.size() - Vec3::new(7.0, 0.3, 4.5)).length() < 1e-5);
        assert!(b.center().length() < 1e-5);
    }

    #[test]
    fn test_cuboid_faces_wind_outward() {
        let g = Geometry::cuboid(1.0, 1.0, 1.0);
        for tri in g.indices.chunks(3) {
            let p = |i: u32| Vec3::from(g.vertices[i as usize].position);
            let n = (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]));
            let expected = Vec3::from(g.vertices[tri[0] as usize].normal);
            assert!(n.dot(expected) > 0.0);
        }
    }

    #[test]
    fn test_cylinder_with_caps() {
        let g = Geometry::cylinder(0.5, 0.6, 0.15, 16, false);
        // torso 2 * 16, two caps 16 each
        assert_eq!(g.triangle_count(), 64);
        let b = g.bounds();
        assert!((b.max[1] - 0.075).abs() < 1e-6);
        assert!((b.min[1] + 0.075).abs() < 1e-6);
    }

    #[test]
    fn test_open_cone_has_no_caps() {
        let g = Geometry::cone(0.3, 0.2, 12, true);
        // apex row is skipped, so one triangle per segment
        assert_eq!(g.triangle_count(), 12);
    }

    #[test]
    fn test_sphere_counts() {
        let g = Geometry::sphere(0.02, 32, 16);
        assert_eq!(g.vertex_count(), 33 * 17);
        assert_eq!(g.triangle_count(), 32 * (2 * 16 - 2));
        for v in &g.vertices {
            assert!((Vec3::from(v.position).length() - 0.02).abs() < 1e-5);
        }
    }

    #[test]
    fn test_half_torus() {
        let g = Geometry::torus(0.08, 0.02, 8, 16, PI);
        assert_eq!(g.triangle_count(), 2 * 8 * 16);
        // a half sweep from 0 to PI never dips below y = -tube
        assert!(g.bounds().min[1] >= -0.02 - 1e-5);
    }

    #[test]
    fn test_plane_segments() {
        let g = Geometry::plane(25.0, 25.0, 32, 32);
        assert_eq!(g.vertex_count(), 33 * 33);
        assert_eq!(g.triangle_count(), 2 * 32 * 32);
        assert!(g.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_translated_moves_bounds() {
        let g = Geometry::plane(0.2, 0.4, 1, 1).translated(Vec3::new(0.0, 0.2, 0.0));
        let b = g.bounds();
        assert!((b.min[1] - 0.0).abs() < 1e-6);
        assert!((b.max[1] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_points() {
        let positions = [Vec3::ZERO, Vec3::ONE];
        let g = Geometry::points(&positions, &[[0.2, 0.4, 0.8]]);
        assert_eq!(g.topology, Topology::Points);
        assert_eq!(g.point_count(), 2);
        assert_eq!(g.triangle_count(), 0);
        assert_eq!(g.vertices[0].color, [0.2, 0.4, 0.8]);
        assert_eq!(g.vertices[1].color, [1.0, 1.0, 1.0]);
    }
}
