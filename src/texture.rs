//! GPU textures for renderable texture slots.
//!
//! A [`Texture`] is a literal device texture a renderable can bind, as
//! opposed to the symbolic G-buffer references resolved by the renderer (see
//! [`crate::renderable::TextureRef`]). Decoding of encoded images is split
//! from GPU upload so the pure half is unit-testable.

use crate::gpu::GpuContext;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque identity of a texture, used as a bind-group cache key component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

fn next_texture_id() -> TextureId {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    TextureId(COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// A GPU texture that can be bound to shaders.
#[derive(Debug)]
pub struct Texture {
    id: TextureId,
    #[allow(dead_code)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Texture {
    /// Create a texture from raw RGBA8 data.
    pub fn from_rgba(
        gpu: &GpuContext,
        data: &[u8],
        width: u32,
        height: u32,
        label: &str,
    ) -> Rc<Self> {
        use wgpu::util::DeviceExt;

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Rc::new(Self {
            id: next_texture_id(),
            texture,
            view,
            width,
            height,
        })
    }

    /// Load a texture from encoded image bytes (PNG, JPEG, ...).
    pub fn from_bytes(
        gpu: &GpuContext,
        bytes: &[u8],
        label: &str,
    ) -> Result<Rc<Self>, image::ImageError> {
        let (data, width, height) = decode_rgba(bytes)?;
        Ok(Self::from_rgba(gpu, &data, width, height, label))
    }

    /// Load a texture from an image file.
    pub fn from_file(gpu: &GpuContext, path: &str) -> Result<Rc<Self>, image::ImageError> {
        let img = image::open(path)?.to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self::from_rgba(gpu, &img, width, height, path))
    }

    /// The texture's stable identity.
    pub fn id(&self) -> TextureId {
        self.id
    }

    /// The view used to bind this texture to a shader.
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

/// Decodes encoded image bytes into tightly-packed RGBA8 pixels.
pub fn decode_rgba(bytes: &[u8]) -> Result<(Vec<u8>, u32, u32), image::ImageError> {
    let img = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = img.dimensions();
    Ok((img.into_raw(), width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_roundtrips_png() {
        // Encode a 2x2 RGBA image, then decode it through the texture path.
        let pixels: [u8; 16] = [
            255, 0, 0, 255, //
            0, 255, 0, 255, //
            0, 0, 255, 255, //
            255, 255, 255, 255,
        ];
        let mut encoded = Vec::new();
        image::write_buffer_with_format(
            &mut std::io::Cursor::new(&mut encoded),
            &pixels,
            2,
            2,
            image::ExtendedColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .unwrap();

        let (decoded, width, height) = decode_rgba(&encoded).unwrap();
        assert_eq!((width, height), (2, 2));
        assert_eq!(decoded, pixels);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_rgba(&[0u8; 16]).is_err());
    }
}
