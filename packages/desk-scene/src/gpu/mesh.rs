//! Vertex layout and GPU buffers for scene geometry.

use wgpu::util::DeviceExt;

use crate::geometry::{Geometry, Topology, Vertex};

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x3, // normal
        2 => Float32x2, // uv
        3 => Float32x3, // color
    ];

    /// Layout for per-vertex mesh data.
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    /// Same data read once per instance, for camera-facing point quads.
    pub fn instance_desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Vertices per point quad (two triangles).
pub const POINT_QUAD_VERTICES: u32 = 6;

/// Uploaded geometry.
pub struct GpuGeometry {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: Option<wgpu::Buffer>,
    pub num_indices: u32,
    pub num_vertices: u32,
    pub topology: Topology,
}

impl GpuGeometry {
    pub fn upload(device: &wgpu::Device, label: &str, geometry: &Geometry) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&geometry.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let indexed = geometry.topology == Topology::Triangles && !geometry.indices.is_empty();
        let index_buffer = indexed.then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&geometry.indices),
                usage: wgpu::BufferUsages::INDEX,
            })
        });

        Self {
            vertex_buffer,
            index_buffer,
            num_indices: geometry.indices.len() as u32,
            num_vertices: geometry.vertices.len() as u32,
            topology: geometry.topology,
        }
    }

    /// Issue the draw for this geometry. Pipeline and bind groups must already be set.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        match (self.topology, &self.index_buffer) {
            (Topology::Points, _) => pass.draw(0..POINT_QUAD_VERTICES, 0..self.num_vertices),
            (Topology::Triangles, Some(indices)) => {
                pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..self.num_indices, 0, 0..1);
            }
            (Topology::Triangles, None) => pass.draw(0..self.num_vertices, 0..1),
        }
    }
}
