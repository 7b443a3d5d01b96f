//! Per-draw uniform data and the dynamic-offset ring buffer that carries it.
//!
//! Every shader reads the same `DrawUniforms` block; the renderer fills one
//! instance per draw by resolving each uniform the program *declares*
//! against the current draw context, failing fast on any declared uniform
//! it cannot supply (the configuration-mismatch arm of the error taxonomy).
//!
//! Blocks are appended to a CPU staging arena at 256-byte alignment during
//! traversal and uploaded in a single `write_buffer` before encoding; the
//! GPU buffer grows (power of two) only when a frame records more draws
//! than ever before, so the steady state allocates nothing.

use crate::error::RenderError;
use crate::gpu::GpuContext;
use crate::lighting::LightKind;
use crate::material::Material;
use crate::shader::Uniform;
use glam::{Mat4, Vec3};

/// Alignment required for dynamic uniform buffer offsets.
pub(crate) const UNIFORM_ALIGNMENT: u64 = 256;

/// The shared per-draw uniform block. Field order matches the WGSL
/// `DrawUniforms` declaration in every shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct DrawUniforms {
    pub projection_view: [[f32; 4]; 4],
    pub world: [[f32; 4]; 4],
    pub inverse_world: [[f32; 4]; 4],
    pub camera_pos_local: [f32; 4],
    pub material_diffuse: [f32; 4],
    pub material_emissive: [f32; 4],
    pub material_specular: [f32; 4],
    /// rgb = color, a = intensity.
    pub light_color: [f32; 4],
    /// xyz = unit direction, w = ambient intensity.
    pub light_direction: [f32; 4],
}

/// Light parameters available while drawing a light volume.
#[derive(Clone, Copy, Debug)]
pub(crate) struct LightContext {
    pub color: Vec3,
    pub intensity: f32,
    pub ambient_intensity: f32,
    pub kind: LightKind,
}

/// Everything a draw can resolve uniforms against.
pub(crate) struct DrawContext<'a> {
    pub projection_view: Mat4,
    pub world: Mat4,
    pub camera_eye: Vec3,
    pub material: &'a Material,
    pub texture_count: usize,
    pub light: Option<LightContext>,
}

impl DrawUniforms {
    /// Resolves every uniform in `declared` against `ctx`, producing the
    /// filled block. Undeclared slots stay zeroed.
    ///
    /// # Errors
    ///
    /// `Configuration` if a declared uniform cannot be supplied: light
    /// parameters outside a light draw, the wrong light kind, or a texture
    /// sampler with no texture bound to its slot.
    pub fn resolve(declared: &[Uniform], ctx: &DrawContext) -> Result<Self, RenderError> {
        let mut out = Self::zeroed();
        // Computed at most once per draw, shared by the uniforms needing it.
        let inverse_world = ctx.world.inverse();

        for &uniform in declared {
            match uniform {
                Uniform::ProjectionView => {
                    out.projection_view = ctx.projection_view.to_cols_array_2d();
                }
                Uniform::World => {
                    out.world = ctx.world.to_cols_array_2d();
                }
                Uniform::InverseWorld => {
                    out.inverse_world = inverse_world.to_cols_array_2d();
                }
                Uniform::CameraPositionLocalSpace => {
                    let local = inverse_world.transform_point3(ctx.camera_eye);
                    out.camera_pos_local = [local.x, local.y, local.z, 1.0];
                }
                Uniform::TextureSampler0 | Uniform::TextureSampler1 | Uniform::TextureSampler2 => {
                    let slot = uniform.texture_slot().unwrap();
                    if slot >= ctx.texture_count {
                        return Err(RenderError::Configuration(format!(
                            "shader declares {:?} but only {} texture(s) are bound",
                            uniform, ctx.texture_count
                        )));
                    }
                }
                Uniform::MaterialDiffuseColor => {
                    let c = ctx.material.diffuse_color;
                    out.material_diffuse = [c.x, c.y, c.z, 1.0];
                }
                Uniform::MaterialEmissiveColor => {
                    let c = ctx.material.emissive_color;
                    out.material_emissive = [c.x, c.y, c.z, 1.0];
                }
                Uniform::MaterialSpecularIntensity => {
                    out.material_specular[0] = ctx.material.specular_intensity;
                }
                Uniform::MaterialSpecularPower => {
                    out.material_specular[1] = ctx.material.specular_power;
                }
                Uniform::LightDirectionalColor
                | Uniform::LightDirectionalIntensity
                | Uniform::LightDirectionalDirection => {
                    let light = expect_light(uniform, ctx)?;
                    let LightKind::Directional { direction } = light.kind else {
                        return Err(wrong_light_kind(uniform, "directional"));
                    };
                    out.light_color =
                        [light.color.x, light.color.y, light.color.z, light.intensity];
                    out.light_direction = [
                        direction.x,
                        direction.y,
                        direction.z,
                        light.ambient_intensity,
                    ];
                }
                Uniform::LightPointColor | Uniform::LightPointIntensity => {
                    let light = expect_light(uniform, ctx)?;
                    let LightKind::Point { .. } = light.kind else {
                        return Err(wrong_light_kind(uniform, "point"));
                    };
                    out.light_color =
                        [light.color.x, light.color.y, light.color.z, light.intensity];
                }
            }
        }

        Ok(out)
    }

    fn zeroed() -> Self {
        bytemuck::Zeroable::zeroed()
    }
}

fn expect_light<'a>(
    uniform: Uniform,
    ctx: &'a DrawContext,
) -> Result<&'a LightContext, RenderError> {
    ctx.light.as_ref().ok_or_else(|| {
        RenderError::Configuration(format!(
            "shader declares {:?} but the draw has no light bound",
            uniform
        ))
    })
}

fn wrong_light_kind(uniform: Uniform, expected: &str) -> RenderError {
    RenderError::Configuration(format!(
        "shader declares {:?} but the bound light is not {}",
        uniform, expected
    ))
}

/// Rounds `offset` up to the next multiple of `align` (a power of two).
pub(crate) fn align_to(offset: u64, align: u64) -> u64 {
    (offset + align - 1) & !(align - 1)
}

/// Appends `bytes` to the arena at [`UNIFORM_ALIGNMENT`], returning the
/// byte offset the slice starts at.
pub(crate) fn append_aligned(staging: &mut Vec<u8>, bytes: &[u8]) -> u64 {
    let offset = align_to(staging.len() as u64, UNIFORM_ALIGNMENT);
    staging.resize(offset as usize, 0);
    staging.extend_from_slice(bytes);
    offset
}

/// Growable GPU ring for the frame's `DrawUniforms` blocks, bound once with
/// a dynamic offset per draw.
pub(crate) struct UniformRing {
    buffer: wgpu::Buffer,
    capacity: u64,
    staging: Vec<u8>,
    layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
}

impl UniformRing {
    const INITIAL_CAPACITY: u64 = 64 * UNIFORM_ALIGNMENT * 2;

    pub fn new(gpu: &GpuContext) -> Self {
        let layout = gpu
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Draw Uniforms Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<DrawUniforms>() as u64,
                        ),
                    },
                    count: None,
                }],
            });

        let (buffer, bind_group) = Self::create_buffer(gpu, &layout, Self::INITIAL_CAPACITY);

        Self {
            buffer,
            capacity: Self::INITIAL_CAPACITY,
            staging: Vec::new(),
            layout,
            bind_group,
        }
    }

    fn create_buffer(
        gpu: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        capacity: u64,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Uniforms Ring"),
            size: capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw Uniforms Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniforms>() as u64),
                }),
            }],
        });

        (buffer, bind_group)
    }

    /// Resets the arena for a new frame.
    pub fn begin_frame(&mut self) {
        self.staging.clear();
    }

    /// Stages one block, returning its dynamic offset.
    pub fn push(&mut self, uniforms: &DrawUniforms) -> u32 {
        append_aligned(&mut self.staging, bytemuck::bytes_of(uniforms)) as u32
    }

    /// Uploads the staged arena, growing the GPU buffer if this frame
    /// recorded more draws than any before it.
    pub fn flush(&mut self, gpu: &GpuContext) {
        let needed = self.staging.len() as u64;
        if needed == 0 {
            return;
        }

        if needed > self.capacity {
            let mut capacity = self.capacity;
            while capacity < needed {
                capacity *= 2;
            }
            log::debug!("growing uniform ring to {} bytes", capacity);
            let (buffer, bind_group) = Self::create_buffer(gpu, &self.layout, capacity);
            self.buffer = buffer;
            self.bind_group = bind_group;
            self.capacity = capacity;
        }

        gpu.queue.write_buffer(&self.buffer, 0, &self.staging);
    }

    /// The bind group for group 0; bind with the offset returned by
    /// [`push`](Self::push).
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    /// The group-0 layout, shared by every pipeline.
    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Vec4Swizzles;

    fn base_context(material: &Material) -> DrawContext<'_> {
        DrawContext {
            projection_view: Mat4::perspective_rh(1.0, 1.5, 0.1, 100.0),
            world: Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
            camera_eye: Vec3::new(0.0, 0.0, 5.0),
            material,
            texture_count: 0,
            light: None,
        }
    }

    #[test]
    fn alignment_rounds_up_to_power_of_two_multiples() {
        assert_eq!(align_to(0, 256), 0);
        assert_eq!(align_to(1, 256), 256);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(288, 256), 512);
    }

    #[test]
    fn staged_blocks_land_on_aligned_offsets() {
        let mut staging = Vec::new();
        let block = [0u8; std::mem::size_of::<DrawUniforms>()];

        assert_eq!(append_aligned(&mut staging, &block), 0);
        assert_eq!(append_aligned(&mut staging, &block), 512);
        assert_eq!(append_aligned(&mut staging, &block), 1024);
    }

    #[test]
    fn geometry_uniforms_resolve_without_light() {
        let material = Material {
            diffuse_color: Vec3::new(0.5, 0.25, 1.0),
            emissive_color: Vec3::new(0.1, 0.0, 0.0),
            specular_intensity: 0.7,
            specular_power: 8.0,
        };
        let ctx = base_context(&material);

        let declared = [
            Uniform::ProjectionView,
            Uniform::World,
            Uniform::MaterialDiffuseColor,
            Uniform::MaterialEmissiveColor,
            Uniform::MaterialSpecularIntensity,
            Uniform::MaterialSpecularPower,
        ];
        let out = DrawUniforms::resolve(&declared, &ctx).unwrap();

        assert_eq!(out.material_diffuse, [0.5, 0.25, 1.0, 1.0]);
        assert_eq!(out.material_emissive, [0.1, 0.0, 0.0, 1.0]);
        assert_eq!(out.material_specular[0], 0.7);
        assert_eq!(out.material_specular[1], 8.0);
        assert_eq!(out.world, ctx.world.to_cols_array_2d());
        // Undeclared slots stay zeroed.
        assert_eq!(out.light_color, [0.0; 4]);
    }

    #[test]
    fn light_uniform_without_light_is_a_configuration_error() {
        let material = Material {
            diffuse_color: Vec3::ONE,
            emissive_color: Vec3::ZERO,
            specular_intensity: 0.0,
            specular_power: 0.0,
        };
        let ctx = base_context(&material);

        let err = DrawUniforms::resolve(&[Uniform::LightPointColor], &ctx).unwrap_err();
        assert!(matches!(err, RenderError::Configuration(_)));
    }

    #[test]
    fn wrong_light_kind_is_a_configuration_error() {
        let material = Material {
            diffuse_color: Vec3::ONE,
            emissive_color: Vec3::ZERO,
            specular_intensity: 0.0,
            specular_power: 0.0,
        };
        let mut ctx = base_context(&material);
        ctx.light = Some(LightContext {
            color: Vec3::ONE,
            intensity: 1.0,
            ambient_intensity: 0.0,
            kind: LightKind::point(2.0),
        });

        let err =
            DrawUniforms::resolve(&[Uniform::LightDirectionalDirection], &ctx).unwrap_err();
        assert!(matches!(err, RenderError::Configuration(_)));
    }

    #[test]
    fn sampler_beyond_bound_textures_is_a_configuration_error() {
        let material = Material {
            diffuse_color: Vec3::ONE,
            emissive_color: Vec3::ZERO,
            specular_intensity: 0.0,
            specular_power: 0.0,
        };
        let mut ctx = base_context(&material);
        ctx.texture_count = 1;

        assert!(DrawUniforms::resolve(&[Uniform::TextureSampler0], &ctx).is_ok());
        let err = DrawUniforms::resolve(&[Uniform::TextureSampler2], &ctx).unwrap_err();
        assert!(matches!(err, RenderError::Configuration(_)));
    }

    #[test]
    fn camera_position_transforms_into_local_space() {
        let material = Material {
            diffuse_color: Vec3::ONE,
            emissive_color: Vec3::ZERO,
            specular_intensity: 0.0,
            specular_power: 0.0,
        };
        let ctx = base_context(&material);

        let out =
            DrawUniforms::resolve(&[Uniform::CameraPositionLocalSpace], &ctx).unwrap();
        // World translates by (1, 2, 3); the eye at (0, 0, 5) lands at
        // (-1, -2, 2) in local space.
        let local = glam::Vec4::from_array(out.camera_pos_local).xyz();
        assert_relative_eq!(local.x, -1.0, epsilon = 1e-5);
        assert_relative_eq!(local.y, -2.0, epsilon = 1e-5);
        assert_relative_eq!(local.z, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn directional_light_packs_direction_and_ambient() {
        let material = Material {
            diffuse_color: Vec3::ONE,
            emissive_color: Vec3::ZERO,
            specular_intensity: 0.0,
            specular_power: 0.0,
        };
        let mut ctx = base_context(&material);
        ctx.light = Some(LightContext {
            color: Vec3::new(1.0, 0.5, 0.25),
            intensity: 0.3,
            ambient_intensity: 0.05,
            kind: LightKind::directional(Vec3::new(0.0, -2.0, 0.0)),
        });

        let out = DrawUniforms::resolve(
            &[
                Uniform::LightDirectionalColor,
                Uniform::LightDirectionalDirection,
                Uniform::LightDirectionalIntensity,
            ],
            &ctx,
        )
        .unwrap();

        assert_eq!(out.light_color, [1.0, 0.5, 0.25, 0.3]);
        assert_eq!(out.light_direction, [0.0, -1.0, 0.0, 0.05]);
    }
}
