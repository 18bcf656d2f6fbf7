//! Backend rendering into a texture that can be read back as an image.

use image::RgbaImage;

use crate::backend::{physical_size, FrameInputs, RenderBackend, RenderInfo};
use crate::error::SceneError;
use crate::gpu::renderer::SceneRenderer;

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Row pitch for buffer copies must be a multiple of this.
const ROW_ALIGNMENT: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

struct Target {
    width: u32,
    height: u32,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

pub struct OffscreenBackend {
    renderer: Option<SceneRenderer>,
    target: Option<Target>,
    width: u32,
    height: u32,
    pixel_ratio: f32,
    max_texture_size: u32,
}

impl OffscreenBackend {
    pub async fn new(width: u32, height: u32, pixel_ratio: f32) -> Result<Self, SceneError> {
        let instance = super::create_instance();
        let (_adapter, device, queue) = super::request_device(&instance, None).await?;
        let max_texture_size = device.limits().max_texture_dimension_2d;

        Ok(Self {
            renderer: Some(SceneRenderer::new(device, queue, TARGET_FORMAT)),
            target: None,
            width,
            height,
            pixel_ratio,
            max_texture_size,
        })
    }

    fn ensure_target(&mut self) -> Option<&Target> {
        let renderer = self.renderer.as_ref()?;
        let (width, height) = physical_size(self.width, self.height, self.pixel_ratio);
        let (width, height) = (width.min(self.max_texture_size), height.min(self.max_texture_size));

        let stale = self.target.as_ref().map_or(true, |t| (t.width, t.height) != (width, height));
        if stale {
            let texture = renderer.device().create_texture(&wgpu::TextureDescriptor {
                label: Some("Offscreen Target"),
                size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: TARGET_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            self.target = Some(Target { width, height, texture, view });
        }
        self.target.as_ref()
    }

    /// Read the most recently rendered frame back to the CPU.
    pub fn capture(&self) -> Result<RgbaImage, SceneError> {
        let (Some(renderer), Some(target)) = (&self.renderer, &self.target) else {
            return Err(SceneError::Readback("nothing has been rendered".to_string()));
        };
        let (width, height) = (target.width, target.height);

        let unpadded_bytes_per_row = 4 * width;
        let padding = (ROW_ALIGNMENT - unpadded_bytes_per_row % ROW_ALIGNMENT) % ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row + padding;

        let output_buffer = renderer.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: (padded_bytes_per_row * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = renderer
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Readback Encoder") });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &output_buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        );
        renderer.queue().submit(Some(encoder.finish()));

        let buffer_slice = output_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        renderer.device().poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| SceneError::Readback(e.to_string()))??;

        let data = buffer_slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((unpadded_bytes_per_row * height) as usize);
        for row in 0..height {
            let start = (row * padded_bytes_per_row) as usize;
            pixels.extend_from_slice(&data[start..start + unpadded_bytes_per_row as usize]);
        }
        drop(data);
        output_buffer.unmap();

        RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| SceneError::Readback("pixel buffer size mismatch".to_string()))
    }
}

impl RenderBackend for OffscreenBackend {
    fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_pixel_ratio(&mut self, ratio: f32) {
        self.pixel_ratio = ratio;
    }

    fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }

    fn render(&mut self, frame: &FrameInputs<'_>) -> RenderInfo {
        if self.ensure_target().is_none() {
            return RenderInfo::default();
        }
        match (&mut self.renderer, &self.target) {
            (Some(renderer), Some(target)) => renderer.render(&target.view, target.width, target.height, frame),
            _ => RenderInfo::default(),
        }
    }

    fn detach_output(&mut self) {}

    fn release(&mut self) {
        self.target = None;
        self.renderer = None;
    }

    fn is_released(&self) -> bool {
        self.renderer.is_none()
    }
}
