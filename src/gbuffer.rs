//! G-buffer frame targets for deferred shading.
//!
//! The geometry pass rasterizes world-space position, normal, and material
//! color into these offscreen targets; the light pass samples them and
//! accumulates shading; the overlay pass can present any of them for
//! debugging. All five attachments are allocated once at device-surface
//! resolution — resizing allocates a completely fresh set, never resizing
//! or reusing the old handles.
//!
//! To avoid a fifth color target, specular intensity/power are packed into
//! the otherwise-unused alpha channels of the position and normal targets.

use crate::gpu::GpuContext;
use std::sync::atomic::{AtomicU64, Ordering};

/// Format of the world-position target (specular intensity in alpha).
pub const POSITION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Format of the world-normal target (specular power in alpha).
pub const NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Format of the diffuse color target.
pub const DIFFUSE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
/// Format of the light-accumulation target (seeded with emissive color).
pub const ACCUMULATION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Format of the depth-stencil target.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// Symbolic name of one G-buffer attachment.
///
/// Renderable texture slots can reference attachments symbolically; the
/// renderer resolves them against its live G-buffer at draw time, so scene
/// content never holds concrete GPU handles into the G-buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GBufferAttachment {
    /// World-space position + packed specular intensity.
    Position,
    /// World-space normal + packed specular power.
    Normal,
    /// Diffuse surface color.
    Diffuse,
    /// Light accumulation (the image the overlay pass presents).
    Accumulation,
    /// Scene depth (sampled by the depth-overlay program).
    Depth,
}

fn next_generation() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// The deferred-shading frame targets.
pub struct GBuffer {
    width: u32,
    height: u32,
    generation: u64,
    #[allow(dead_code)]
    position: wgpu::Texture,
    position_view: wgpu::TextureView,
    #[allow(dead_code)]
    normal: wgpu::Texture,
    normal_view: wgpu::TextureView,
    #[allow(dead_code)]
    diffuse: wgpu::Texture,
    diffuse_view: wgpu::TextureView,
    #[allow(dead_code)]
    accumulation: wgpu::Texture,
    accumulation_view: wgpu::TextureView,
    #[allow(dead_code)]
    depth: wgpu::Texture,
    depth_stencil_view: wgpu::TextureView,
    depth_sample_view: wgpu::TextureView,
}

impl GBuffer {
    /// Allocates all five attachments at the given size.
    pub fn new(gpu: &GpuContext, width: u32, height: u32) -> Self {
        let position = gpu
            .device
            .create_texture(&target_descriptor("GBuffer Position", width, height, POSITION_FORMAT));
        let normal = gpu
            .device
            .create_texture(&target_descriptor("GBuffer Normal", width, height, NORMAL_FORMAT));
        let diffuse = gpu
            .device
            .create_texture(&target_descriptor("GBuffer Diffuse", width, height, DIFFUSE_FORMAT));
        let accumulation = gpu.device.create_texture(&target_descriptor(
            "GBuffer Accumulation",
            width,
            height,
            ACCUMULATION_FORMAT,
        ));
        let depth = gpu
            .device
            .create_texture(&target_descriptor("GBuffer Depth", width, height, DEPTH_FORMAT));

        let position_view = position.create_view(&wgpu::TextureViewDescriptor::default());
        let normal_view = normal.create_view(&wgpu::TextureViewDescriptor::default());
        let diffuse_view = diffuse.create_view(&wgpu::TextureViewDescriptor::default());
        let accumulation_view = accumulation.create_view(&wgpu::TextureViewDescriptor::default());
        let depth_stencil_view = depth.create_view(&wgpu::TextureViewDescriptor::default());
        let depth_sample_view = depth.create_view(&wgpu::TextureViewDescriptor {
            label: Some("GBuffer Depth (sample)"),
            aspect: wgpu::TextureAspect::DepthOnly,
            ..Default::default()
        });

        log::info!("allocated G-buffer at {}x{}", width, height);

        Self {
            width,
            height,
            generation: next_generation(),
            position,
            position_view,
            normal,
            normal_view,
            diffuse,
            diffuse_view,
            accumulation,
            accumulation_view,
            depth,
            depth_stencil_view,
            depth_sample_view,
        }
    }

    /// Width of every attachment in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height of every attachment in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Monotonic allocation generation, bumped for every fresh set of
    /// attachments. Bind groups cached against one generation are invalid
    /// for the next.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Resolves a symbolic attachment reference to a bindable view.
    ///
    /// Resolution is a pure lookup: for a given G-buffer, the same
    /// attachment always resolves to the same view, independent of draw
    /// order. `Depth` resolves to the depth-aspect view.
    pub fn attachment_view(&self, attachment: GBufferAttachment) -> &wgpu::TextureView {
        match attachment {
            GBufferAttachment::Position => &self.position_view,
            GBufferAttachment::Normal => &self.normal_view,
            GBufferAttachment::Diffuse => &self.diffuse_view,
            GBufferAttachment::Accumulation => &self.accumulation_view,
            GBufferAttachment::Depth => &self.depth_sample_view,
        }
    }

    /// The full depth-stencil view used as a render-pass attachment.
    pub fn depth_stencil_view(&self) -> &wgpu::TextureView {
        &self.depth_stencil_view
    }

    /// The geometry pass's color attachments, in shader output order.
    pub fn color_attachment_views(&self) -> [&wgpu::TextureView; 4] {
        [
            &self.position_view,
            &self.normal_view,
            &self.diffuse_view,
            &self.accumulation_view,
        ]
    }
}

/// Descriptor for one frame-target texture. Pure; shared by all five
/// attachments (the depth target differs only in format).
fn target_descriptor(
    label: &'static str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
) -> wgpu::TextureDescriptor<'static> {
    wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptors_match_requested_size() {
        for (format, label) in [
            (POSITION_FORMAT, "GBuffer Position"),
            (NORMAL_FORMAT, "GBuffer Normal"),
            (DIFFUSE_FORMAT, "GBuffer Diffuse"),
            (ACCUMULATION_FORMAT, "GBuffer Accumulation"),
            (DEPTH_FORMAT, "GBuffer Depth"),
        ] {
            let desc = target_descriptor(label, 1280, 720, format);
            assert_eq!(desc.size.width, 1280);
            assert_eq!(desc.size.height, 720);
            assert_eq!(desc.format, format);
            assert!(desc.usage.contains(wgpu::TextureUsages::RENDER_ATTACHMENT));
            assert!(desc.usage.contains(wgpu::TextureUsages::TEXTURE_BINDING));
        }
    }

    #[test]
    fn depth_format_carries_stencil() {
        assert_eq!(DEPTH_FORMAT, wgpu::TextureFormat::Depth24PlusStencil8);
    }

    #[test]
    fn generations_are_unique() {
        let a = next_generation();
        let b = next_generation();
        assert_ne!(a, b);
    }
}
