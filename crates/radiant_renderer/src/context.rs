//! GPU context: owns the `wgpu::Device`, `Queue` and optional `Surface`.
//!
//! [`GpuContext::new`] binds to a window surface; [`GpuContext::new_headless`]
//! has no surface and is used for off-screen rendering and tests.

use log::info;
use wgpu::{
    Adapter, Device, DeviceDescriptor, Instance, InstanceDescriptor, Queue, RequestAdapterOptions,
    Surface, SurfaceConfiguration, TextureFormat, TextureUsages,
};

use crate::error::RenderError;

/// Format used when there is no surface to ask.
pub const HEADLESS_FORMAT: TextureFormat = TextureFormat::Bgra8Unorm;

pub struct GpuContext {
    pub device: Device,
    pub queue: Queue,
    pub adapter: Adapter,
    /// Present only when rendering to a window.
    pub surface: Option<Surface<'static>>,
    pub surface_config: Option<SurfaceConfiguration>,
    /// Format pipelines and color views use. Never sRGB: the shader
    /// gamma-encodes its own output.
    pub surface_format: TextureFormat,
}

/// Prefers `Bgra8Unorm`, then any linear format, then whatever comes first.
pub fn select_surface_format(formats: &[TextureFormat]) -> Option<TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|f| *f == TextureFormat::Bgra8Unorm)
        .or_else(|| formats.iter().copied().find(|f| !f.is_srgb()))
        .or_else(|| formats.first().copied())
}

/// The linear view of `format`, listed in `view_formats` when it differs.
pub fn render_view_format(format: TextureFormat) -> (TextureFormat, Vec<TextureFormat>) {
    let view = format.remove_srgb_suffix();
    let view_formats = if view == format { vec![] } else { vec![view] };
    (view, view_formats)
}

impl GpuContext {
    pub async fn new_headless() -> Result<Self, RenderError> {
        let instance = Instance::new(&InstanceDescriptor::default());

        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("radiant-headless"),
                ..Default::default()
            })
            .await?;

        Ok(Self {
            device,
            queue,
            adapter,
            surface: None,
            surface_config: None,
            surface_format: HEADLESS_FORMAT,
        })
    }

    /// Creates a context presenting to `window`.
    ///
    /// The surface is configured immediately at `width` x `height`.
    pub async fn new<W>(window: W, width: u32, height: u32) -> Result<Self, RenderError>
    where
        W: wgpu::WasmNotSendSync + Into<wgpu::SurfaceTarget<'static>>,
    {
        let instance = Instance::new(&InstanceDescriptor::default());

        let surface = instance
            .create_surface(window)
            .map_err(|e| RenderError::Surface(e.to_string()))?;

        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("radiant-windowed"),
                ..Default::default()
            })
            .await?;

        let caps = surface.get_capabilities(&adapter);
        let format = select_surface_format(&caps.formats)
            .ok_or_else(|| RenderError::Surface("surface reports no supported formats".into()))?;
        let (view_format, view_formats) = render_view_format(format);

        let config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo, // VSync
            desired_maximum_frame_latency: 2,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats,
        };
        surface.configure(&device, &config);

        info!(
            "GPU ready: {} ({:?}), surface {:?} viewed as {:?} {}x{}",
            adapter.get_info().name,
            adapter.get_info().backend,
            format,
            view_format,
            config.width,
            config.height
        );

        Ok(Self {
            device,
            queue,
            adapter,
            surface: Some(surface),
            surface_config: Some(config),
            surface_format: view_format,
        })
    }

    /// Reconfigures the surface. No-op if headless or for a zero size.
    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(config) = &mut self.surface_config {
            if width == 0 || height == 0 {
                return;
            }
            config.width = width;
            config.height = height;
            if let Some(surface) = &self.surface {
                surface.configure(&self.device, config);
            }
        }
    }

    /// Reapplies the current configuration after the surface was lost.
    pub fn reconfigure(&self) {
        if let (Some(surface), Some(config)) = (&self.surface, &self.surface_config) {
            surface.configure(&self.device, config);
        }
    }

    /// Current surface dimensions, or `(0, 0)` if headless.
    pub fn surface_size(&self) -> (u32, u32) {
        self.surface_config
            .as_ref()
            .map(|c| (c.width, c.height))
            .unwrap_or((0, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_bgra8_unorm() {
        let formats = [
            TextureFormat::Bgra8UnormSrgb,
            TextureFormat::Rgba8Unorm,
            TextureFormat::Bgra8Unorm,
        ];
        assert_eq!(select_surface_format(&formats), Some(TextureFormat::Bgra8Unorm));
    }

    #[test]
    fn falls_back_to_linear_then_first() {
        let formats = [TextureFormat::Bgra8UnormSrgb, TextureFormat::Rgba8Unorm];
        assert_eq!(select_surface_format(&formats), Some(TextureFormat::Rgba8Unorm));

        let formats = [TextureFormat::Rgba8UnormSrgb];
        assert_eq!(select_surface_format(&formats), Some(TextureFormat::Rgba8UnormSrgb));

        assert_eq!(select_surface_format(&[]), None);
    }

    #[test]
    fn srgb_surfaces_are_viewed_linearly() {
        let (view, extra) = render_view_format(TextureFormat::Rgba8UnormSrgb);
        assert_eq!(view, TextureFormat::Rgba8Unorm);
        assert_eq!(extra, vec![TextureFormat::Rgba8Unorm]);

        let (view, extra) = render_view_format(TextureFormat::Bgra8Unorm);
        assert_eq!(view, TextureFormat::Bgra8Unorm);
        assert!(extra.is_empty());
    }

    #[test]
    fn headless_has_no_surface() {
        // May fail in CI without a GPU; skip in that case.
        if let Ok(ctx) = pollster::block_on(GpuContext::new_headless()) {
            assert_eq!(ctx.surface_size(), (0, 0));
            assert!(ctx.surface.is_none());
            assert_eq!(ctx.surface_format, HEADLESS_FORMAT);
        }
    }
}
