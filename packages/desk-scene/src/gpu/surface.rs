//! Backend presenting to a window or canvas surface.

use crate::backend::{physical_size, FrameInputs, RenderBackend, RenderInfo};
use crate::error::SceneError;
use crate::gpu::renderer::SceneRenderer;

struct SurfaceState {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    renderer: SceneRenderer,
}

pub struct SurfaceBackend {
    gpu: Option<SurfaceState>,
    width: u32,
    height: u32,
    pixel_ratio: f32,
    max_texture_size: u32,
    on_detach: Option<Box<dyn FnOnce()>>,
}

impl SurfaceBackend {
    /// Acquire a device compatible with `surface` and configure it for a
    /// `width` x `height` CSS-pixel output.
    pub async fn new(
        instance: &wgpu::Instance,
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
        pixel_ratio: f32,
    ) -> Result<Self, SceneError> {
        let (adapter, device, queue) = super::request_device(instance, Some(&surface)).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f: &wgpu::TextureFormat| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| SceneError::Surface("surface reports no formats".to_string()))?;
        let present_mode = surface_caps.present_modes.first().copied().unwrap_or(wgpu::PresentMode::Fifo);
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let max_texture_size = device.limits().max_texture_dimension_2d;
        let (physical_width, physical_height) = clamp_extent(physical_size(width, height, pixel_ratio), max_texture_size);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: physical_width,
            height: physical_height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let renderer = SceneRenderer::new(device, queue, surface_format);

        Ok(Self {
            gpu: Some(SurfaceState { surface, config, renderer }),
            width,
            height,
            pixel_ratio,
            max_texture_size,
            on_detach: None,
        })
    }

    /// Run `callback` once when the output is detached from its container.
    pub fn on_detach(mut self, callback: impl FnOnce() + 'static) -> Self {
        self.on_detach = Some(Box::new(callback));
        self
    }

    pub fn format(&self) -> Option<wgpu::TextureFormat> {
        self.gpu.as_ref().map(|g| g.config.format)
    }

    fn reconfigure(&mut self) {
        let (width, height) = clamp_extent(
            physical_size(self.width, self.height, self.pixel_ratio),
            self.max_texture_size,
        );
        if let Some(gpu) = &mut self.gpu {
            if gpu.config.width == width && gpu.config.height == height {
                return;
            }
            gpu.config.width = width;
            gpu.config.height = height;
            gpu.surface.configure(gpu.renderer.device(), &gpu.config);
        }
    }
}

fn clamp_extent((width, height): (u32, u32), limit: u32) -> (u32, u32) {
    (width.min(limit), height.min(limit))
}

impl RenderBackend for SurfaceBackend {
    fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.reconfigure();
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_pixel_ratio(&mut self, ratio: f32) {
        self.pixel_ratio = ratio;
        self.reconfigure();
    }

    fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }

    fn render(&mut self, frame: &FrameInputs<'_>) -> RenderInfo {
        let Some(gpu) = &mut self.gpu else {
            return RenderInfo::default();
        };

        match gpu.surface.get_current_texture() {
            Ok(output) => {
                let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
                let info = gpu.renderer.render(&view, gpu.config.width, gpu.config.height, frame);
                output.present();
                info
            }
            Err(wgpu::SurfaceError::Lost) => {
                gpu.surface.configure(gpu.renderer.device(), &gpu.config);
                RenderInfo::default()
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Surface out of memory");
                RenderInfo::default()
            }
            Err(e) => {
                log::warn!("Surface error: {:?}", e);
                RenderInfo::default()
            }
        }
    }

    fn detach_output(&mut self) {
        if let Some(callback) = self.on_detach.take() {
            callback();
        }
    }

    fn release(&mut self) {
        if let Some(mut gpu) = self.gpu.take() {
            gpu.renderer.clear_caches();
            log::debug!("Released surface backend");
        }
    }

    fn is_released(&self) -> bool {
        self.gpu.is_none()
    }
}

impl Drop for SurfaceBackend {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_extent() {
        assert_eq!(clamp_extent((4000, 1200), 2048), (2048, 1200));
        assert_eq!(clamp_extent((800, 600), 2048), (800, 600));
    }
}
