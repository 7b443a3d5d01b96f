//! Pipeline state and bind-group construction for the three passes.
//!
//! wgpu bakes blend/depth/stencil/cull state into pipeline objects, so the
//! pass state machine's GPU toggles live here as per-variant pipeline
//! descriptors. Pipelines are cached by (program, mesh, variant) and bind
//! groups by (program, resolved texture slots); both caches fill on first
//! use and the texture cache is invalidated when the G-buffer is
//! reallocated.

use crate::error::RenderError;
use crate::gbuffer::{
    ACCUMULATION_FORMAT, DEPTH_FORMAT, DIFFUSE_FORMAT, GBuffer, NORMAL_FORMAT, POSITION_FORMAT,
};
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, MeshId};
use crate::renderable::{TextureRef, TextureSlotKey};
use crate::shader::{ShaderProgram, ShaderProgramId, TextureSampleKind};
use std::collections::HashMap;

/// Which pass-specific state a pipeline carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum PipelineVariant {
    /// Geometry pass: depth test + write, no blending, back-face culling,
    /// four G-buffer color targets.
    Geometry,
    /// Light-pass stencil marking: no color targets, read-only depth,
    /// two-sided wrap-around stencil ops.
    StencilMark,
    /// Light-pass shading: additive blend into the accumulation target,
    /// front-face culling, stencil-masked, depth ignored.
    LightShade,
    /// Overlay pass: surface target, no depth/stencil.
    Overlay,
}

/// Geometry pass depth state: standard test + write, stencil untouched.
pub(crate) fn geometry_depth_state() -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Stencil-mark state: depth read-only against the populated G-buffer,
/// stencil test ALWAYS, back faces increment-wrap and front faces
/// decrement-wrap when they fail the depth test.
///
/// The wrap arithmetic means a pixel ends with non-zero stencil exactly
/// when the camera's view ray enters the volume before hitting scene
/// geometry while the volume extends behind that geometry — i.e. the
/// volume intersects the visible surface at that pixel. A volume floating
/// entirely in front of geometry has both faces pass the depth test and
/// stays at 0; a volume fully occluded has both faces fail, and the +1
/// and −1 cancel. Marking on depth *fail* also keeps the algorithm
/// correct when the camera is inside the volume (front faces are clipped,
/// but an occluded back face alone still marks), which the oversized
/// directional volume relies on every frame.
pub(crate) fn stencil_mark_depth_state() -> wgpu::DepthStencilState {
    let face = |depth_fail_op| wgpu::StencilFaceState {
        compare: wgpu::CompareFunction::Always,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op,
        pass_op: wgpu::StencilOperation::Keep,
    };

    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: false,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: wgpu::StencilState {
            front: face(wgpu::StencilOperation::DecrementWrap),
            back: face(wgpu::StencilOperation::IncrementWrap),
            read_mask: 0xFF,
            write_mask: 0xFF,
        },
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Light-shade state: depth ignored, stencil NOTEQUAL against reference 0
/// so only marked pixels shade.
pub(crate) fn light_shade_depth_state() -> wgpu::DepthStencilState {
    let face = wgpu::StencilFaceState {
        compare: wgpu::CompareFunction::NotEqual,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op: wgpu::StencilOperation::Keep,
        pass_op: wgpu::StencilOperation::Keep,
    };

    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: false,
        depth_compare: wgpu::CompareFunction::Always,
        stencil: wgpu::StencilState {
            front: face,
            back: face,
            read_mask: 0xFF,
            write_mask: 0x00,
        },
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Additive accumulation blend: `one + one`, so overlapping light
/// contributions sum.
pub(crate) fn additive_blend() -> wgpu::BlendState {
    let component = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState {
        color: component,
        alpha: component,
    }
}

/// Per-variant face culling.
///
/// The shade pass culls *front* faces so the volume draws inside-out,
/// staying correct when the camera is inside the light volume; marking
/// draws both faces because the wrap arithmetic needs them.
pub(crate) fn cull_mode(variant: PipelineVariant) -> Option<wgpu::Face> {
    match variant {
        PipelineVariant::Geometry => Some(wgpu::Face::Back),
        PipelineVariant::StencilMark => None,
        PipelineVariant::LightShade => Some(wgpu::Face::Front),
        PipelineVariant::Overlay => None,
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: ShaderProgramId,
    mesh: MeshId,
    variant: PipelineVariant,
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct BindKey {
    program: ShaderProgramId,
    slots: Vec<TextureSlotKey>,
}

/// Caches pipelines, texture bind-group layouts, and texture bind groups.
pub(crate) struct PipelineCache {
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    texture_layouts: HashMap<(usize, TextureSampleKind), wgpu::BindGroupLayout>,
    bind_groups: HashMap<BindKey, wgpu::BindGroup>,
    sampler: wgpu::Sampler,
}

impl PipelineCache {
    pub fn new(gpu: &GpuContext) -> Self {
        // Nearest, non-filtering: G-buffer channels are unfilterable floats
        // and the original pipeline sampled everything NEAREST.
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Overlay Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            pipelines: HashMap::new(),
            texture_layouts: HashMap::new(),
            bind_groups: HashMap::new(),
            sampler,
        }
    }

    /// Drops cached texture bind groups (their views died with the old
    /// G-buffer).
    pub fn invalidate_texture_bindings(&mut self) {
        self.bind_groups.clear();
    }

    fn texture_layout(
        &mut self,
        gpu: &GpuContext,
        slot_count: usize,
        kind: TextureSampleKind,
    ) -> wgpu::BindGroupLayout {
        self.texture_layouts
            .entry((slot_count, kind))
            .or_insert_with(|| {
                let mut entries = Vec::with_capacity(slot_count * 2);
                for slot in 0..slot_count as u32 {
                    entries.push(wgpu::BindGroupLayoutEntry {
                        binding: slot * 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: match kind {
                                TextureSampleKind::Color => {
                                    wgpu::TextureSampleType::Float { filterable: false }
                                }
                                TextureSampleKind::Depth => wgpu::TextureSampleType::Depth,
                            },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    });
                    entries.push(wgpu::BindGroupLayoutEntry {
                        binding: slot * 2 + 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                        count: None,
                    });
                }

                gpu.device
                    .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                        label: Some("Texture Bind Group Layout"),
                        entries: &entries,
                    })
            })
            .clone()
    }

    /// Returns (building if necessary) the bind group for a program's
    /// texture slots resolved against the live G-buffer.
    pub fn texture_bind_group(
        &mut self,
        gpu: &GpuContext,
        gbuffer: &GBuffer,
        program: &ShaderProgram,
        textures: &[TextureRef],
    ) -> Option<wgpu::BindGroup> {
        let slot_count = program.declaration().texture_slot_count();
        if slot_count == 0 {
            return None;
        }

        let key = BindKey {
            program: program.id(),
            slots: textures.iter().map(TextureRef::slot_key).collect(),
        };

        if !self.bind_groups.contains_key(&key) {
            let layout = self.texture_layout(gpu, slot_count, program.declaration().sample_kind);

            let mut entries = Vec::with_capacity(slot_count * 2);
            for (slot, texture) in textures.iter().take(slot_count).enumerate() {
                entries.push(wgpu::BindGroupEntry {
                    binding: slot as u32 * 2,
                    resource: wgpu::BindingResource::TextureView(texture.resolve(gbuffer)),
                });
                entries.push(wgpu::BindGroupEntry {
                    binding: slot as u32 * 2 + 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                });
            }

            let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(program.label()),
                layout: &layout,
                entries: &entries,
            });
            self.bind_groups.insert(key.clone(), bind_group);
        }

        self.bind_groups.get(&key).cloned()
    }

    /// Returns (building if necessary) the pipeline for drawing `mesh` with
    /// `program` under `variant`'s pass state.
    pub fn pipeline(
        &mut self,
        gpu: &GpuContext,
        uniform_layout: &wgpu::BindGroupLayout,
        surface_format: wgpu::TextureFormat,
        variant: PipelineVariant,
        program: &ShaderProgram,
        mesh: &Mesh,
    ) -> Result<wgpu::RenderPipeline, RenderError> {
        let key = PipelineKey {
            program: program.id(),
            mesh: mesh.id(),
            variant,
        };

        if let Some(pipeline) = self.pipelines.get(&key) {
            return Ok(pipeline.clone());
        }

        let pipeline = self.build_pipeline(gpu, uniform_layout, surface_format, variant, program, mesh)?;
        log::debug!(
            "built {:?} pipeline for program \"{}\"",
            variant,
            program.label()
        );
        self.pipelines.insert(key, pipeline.clone());
        Ok(pipeline)
    }

    fn build_pipeline(
        &mut self,
        gpu: &GpuContext,
        uniform_layout: &wgpu::BindGroupLayout,
        surface_format: wgpu::TextureFormat,
        variant: PipelineVariant,
        program: &ShaderProgram,
        mesh: &Mesh,
    ) -> Result<wgpu::RenderPipeline, RenderError> {
        let declaration = program.declaration();

        // One vertex buffer slot per declared attribute; the shader
        // location is the attribute's index in the declared order. A mesh
        // missing a declared attribute is an authoring bug.
        let mut formats = Vec::with_capacity(declaration.attributes.len());
        for attribute in &declaration.attributes {
            let description = mesh.attribute(*attribute).ok_or_else(|| {
                RenderError::Configuration(format!(
                    "mesh is missing attribute {:?} required by shader \"{}\"",
                    attribute,
                    program.label()
                ))
            })?;
            formats.push((description.format, description.stride, description.offset));
        }

        let attribute_storage: Vec<[wgpu::VertexAttribute; 1]> = formats
            .iter()
            .enumerate()
            .map(|(location, (format, _, offset))| {
                [wgpu::VertexAttribute {
                    format: *format,
                    offset: *offset,
                    shader_location: location as u32,
                }]
            })
            .collect();

        let vertex_buffers: Vec<wgpu::VertexBufferLayout> = attribute_storage
            .iter()
            .zip(&formats)
            .map(|(attributes, (_, stride, _))| wgpu::VertexBufferLayout {
                array_stride: *stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes,
            })
            .collect();

        let slot_count = declaration.texture_slot_count();
        let texture_layout =
            (slot_count > 0).then(|| self.texture_layout(gpu, slot_count, declaration.sample_kind));

        let mut bind_group_layouts = vec![uniform_layout];
        if let Some(layout) = &texture_layout {
            bind_group_layouts.push(layout);
        }

        let layout = gpu
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(program.label()),
                bind_group_layouts: &bind_group_layouts,
                push_constant_ranges: &[],
            });

        let targets = color_targets(variant, surface_format);
        let fragment = program
            .fragment_entry()
            .map(|entry_point| wgpu::FragmentState {
                module: program.module(),
                entry_point: Some(entry_point),
                targets: &targets,
                compilation_options: Default::default(),
            });

        let depth_stencil = match variant {
            PipelineVariant::Geometry => Some(geometry_depth_state()),
            PipelineVariant::StencilMark => Some(stencil_mark_depth_state()),
            PipelineVariant::LightShade => Some(light_shade_depth_state()),
            PipelineVariant::Overlay => None,
        };

        Ok(gpu
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(program.label()),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: program.module(),
                    entry_point: Some("vs_main"),
                    buffers: &vertex_buffers,
                    compilation_options: Default::default(),
                },
                fragment,
                primitive: wgpu::PrimitiveState {
                    topology: mesh.index().topology,
                    cull_mode: cull_mode(variant),
                    front_face: wgpu::FrontFace::Ccw,
                    ..Default::default()
                },
                depth_stencil,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            }))
    }
}

fn color_targets(
    variant: PipelineVariant,
    surface_format: wgpu::TextureFormat,
) -> Vec<Option<wgpu::ColorTargetState>> {
    let target = |format, blend| {
        Some(wgpu::ColorTargetState {
            format,
            blend,
            write_mask: wgpu::ColorWrites::ALL,
        })
    };

    match variant {
        PipelineVariant::Geometry => vec![
            target(POSITION_FORMAT, None),
            target(NORMAL_FORMAT, None),
            target(DIFFUSE_FORMAT, None),
            target(ACCUMULATION_FORMAT, None),
        ],
        // Color writes are disabled by having no color targets at all; the
        // stencil-mark program has no fragment stage.
        PipelineVariant::StencilMark => vec![],
        PipelineVariant::LightShade => vec![target(ACCUMULATION_FORMAT, Some(additive_blend()))],
        PipelineVariant::Overlay => vec![target(surface_format, None)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Applies one stencil op to a stencil value, mirroring the GPU's
    /// 8-bit wrap-around arithmetic.
    fn apply(op: wgpu::StencilOperation, value: u8) -> u8 {
        match op {
            wgpu::StencilOperation::Keep => value,
            wgpu::StencilOperation::IncrementWrap => value.wrapping_add(1),
            wgpu::StencilOperation::DecrementWrap => value.wrapping_sub(1),
            _ => unreachable!("mark pass uses only keep/increment/decrement"),
        }
    }

    #[test]
    fn mark_state_uses_two_sided_wrap_ops() {
        let state = stencil_mark_depth_state();
        assert!(!state.depth_write_enabled);
        assert_eq!(state.depth_compare, wgpu::CompareFunction::Less);
        assert_eq!(state.stencil.front.compare, wgpu::CompareFunction::Always);
        assert_eq!(state.stencil.back.compare, wgpu::CompareFunction::Always);
        assert_eq!(
            state.stencil.front.depth_fail_op,
            wgpu::StencilOperation::DecrementWrap
        );
        assert_eq!(
            state.stencil.back.depth_fail_op,
            wgpu::StencilOperation::IncrementWrap
        );
    }

    #[test]
    fn volume_in_front_of_geometry_marks_nothing() {
        // Both faces pass the depth test and keep the stencil at 0:
        // NOTEQUAL 0 fails, the shading pass draws nothing, and a light
        // floating in empty space contributes nothing.
        let state = stencil_mark_depth_state();
        let mut stencil = 0u8;
        stencil = apply(state.stencil.back.pass_op, stencil);
        stencil = apply(state.stencil.front.pass_op, stencil);
        assert_eq!(stencil, 0);

        let shade = light_shade_depth_state();
        assert_eq!(shade.stencil.front.compare, wgpu::CompareFunction::NotEqual);
    }

    #[test]
    fn volume_intersecting_geometry_marks_pixels() {
        // Front face in front of geometry (depth pass → keep), back face
        // behind it (depth fail → increment): stencil ends non-zero and
        // the pixel shades.
        let state = stencil_mark_depth_state();
        let mut stencil = 0u8;
        stencil = apply(state.stencil.front.pass_op, stencil);
        stencil = apply(state.stencil.back.depth_fail_op, stencil);
        assert_ne!(stencil, 0);
    }

    #[test]
    fn occluded_volume_marks_nothing() {
        // Geometry in front of the whole volume: both faces fail the depth
        // test, the −1 and +1 wrap ops cancel.
        let state = stencil_mark_depth_state();
        let mut stencil = 0u8;
        stencil = apply(state.stencil.front.depth_fail_op, stencil);
        stencil = apply(state.stencil.back.depth_fail_op, stencil);
        assert_eq!(stencil, 0);
    }

    #[test]
    fn camera_inside_volume_still_marks() {
        // Front faces are clipped behind the camera; geometry inside the
        // volume occludes the back face, whose depth-fail increment marks
        // the pixel on its own. The oversized directional volume depends
        // on this every frame.
        let state = stencil_mark_depth_state();
        let stencil = apply(state.stencil.back.depth_fail_op, 0u8);
        assert_ne!(stencil, 0);
    }

    #[test]
    fn shade_state_ignores_depth_and_culls_front_faces() {
        let state = light_shade_depth_state();
        assert!(!state.depth_write_enabled);
        assert_eq!(state.depth_compare, wgpu::CompareFunction::Always);
        assert_eq!(state.stencil.write_mask, 0x00);

        // Drawn inside-out so a camera inside the volume still shades.
        assert_eq!(cull_mode(PipelineVariant::LightShade), Some(wgpu::Face::Front));
        assert_eq!(cull_mode(PipelineVariant::Geometry), Some(wgpu::Face::Back));
        assert_eq!(cull_mode(PipelineVariant::StencilMark), None);
    }

    #[test]
    fn light_shading_blends_additively() {
        let blend = additive_blend();
        assert_eq!(blend.color.src_factor, wgpu::BlendFactor::One);
        assert_eq!(blend.color.dst_factor, wgpu::BlendFactor::One);
        assert_eq!(blend.color.operation, wgpu::BlendOperation::Add);
    }

    #[test]
    fn geometry_pass_writes_four_targets_without_blending() {
        let targets = color_targets(PipelineVariant::Geometry, wgpu::TextureFormat::Bgra8UnormSrgb);
        assert_eq!(targets.len(), 4);
        for target in &targets {
            assert!(target.as_ref().unwrap().blend.is_none());
        }

        // The stencil-mark variant disables color writes entirely.
        assert!(color_targets(PipelineVariant::StencilMark, wgpu::TextureFormat::Bgra8UnormSrgb).is_empty());
    }
}
