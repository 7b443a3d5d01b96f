//! The deferred renderer.
//!
//! [`Renderer::render`] runs three full traversals of the same scene graph
//! — geometry, light, overlay — filtering renderables by queue tag, then
//! encodes and submits the frame:
//!
//! 1. **Geometry pass** — depth test + write, no blending, back-face
//!    culling; clears the G-buffer and rasterizes every `Opaque`
//!    renderable's position/normal/diffuse/emissive into it.
//! 2. **Light pass** — for every `Lighting` renderable, the stencil-masked
//!    light-volume algorithm: clear stencil, mark covered pixels with the
//!    two-sided wrap ops against the populated depth buffer, then shade
//!    with front-face culling, `NOTEQUAL 0` stencil, and additive blending
//!    into the accumulation target.
//! 3. **Overlay pass** — screen-space panels drawn straight to the
//!    surface, last, on top; typically a full-screen quad presenting the
//!    accumulation target plus picture-in-picture G-buffer views.
//!
//! Traversal state (world-matrix, camera, and shader stacks) lives in a
//! per-traversal [`FrameRecorder`], the visitor half of the renderer; it is
//! rebuilt every traversal and draws are recorded into per-pass lists that
//! the encoding step consumes. Pipelines and texture bind groups are
//! cached on first use, so after warm-up a steady-state frame creates no
//! GPU resources.

mod pass;
mod pipeline;
mod uniforms;

use crate::camera::Camera;
use crate::error::RenderError;
use crate::gbuffer::GBuffer;
use crate::gpu::GpuContext;
use crate::graph::{PassKind, SceneNode, SceneVisitor};
use crate::lighting::LightVolume;
use crate::mesh::Mesh;
use crate::renderable::{Renderable, RenderQueue};
use crate::shader::{ShaderLibrary, ShaderProgram};
use glam::{Mat4, Vec3};
use pass::{PassState, queue_for};
use pipeline::{PipelineCache, PipelineVariant};
use std::rc::Rc;
use uniforms::{DrawContext, DrawUniforms, LightContext, UniformRing};

/// Camera data snapshotted onto the camera stack.
#[derive(Clone, Copy)]
struct CameraState {
    projection_view: Mat4,
    eye: Vec3,
}

/// One fully-resolved draw: everything the encoder needs, nothing borrowed
/// from the scene graph.
struct RecordedDraw {
    pipeline: wgpu::RenderPipeline,
    program: Rc<ShaderProgram>,
    mesh: Rc<Mesh>,
    uniform_offset: u32,
    textures: Option<wgpu::BindGroup>,
}

/// A light volume's two recorded invocations: stencil mark, then shade.
struct RecordedLight {
    mark: RecordedDraw,
    shade: RecordedDraw,
}

/// The deferred renderer. Owns the G-buffer, the built-in shader library,
/// the pass state machine, and the pipeline/uniform machinery.
pub struct Renderer {
    shaders: ShaderLibrary,
    gbuffer: GBuffer,
    cache: PipelineCache,
    ring: UniformRing,
    pass_state: PassState,
    surface_format: wgpu::TextureFormat,
    frame_index: u64,
}

impl Renderer {
    /// Creates the renderer, allocating the G-buffer at the current
    /// device-surface size and compiling the built-in shader programs.
    pub fn new(gpu: &GpuContext) -> Self {
        Self {
            shaders: ShaderLibrary::new(gpu),
            gbuffer: GBuffer::new(gpu, gpu.width(), gpu.height()),
            cache: PipelineCache::new(gpu),
            ring: UniformRing::new(gpu),
            pass_state: PassState::default(),
            surface_format: gpu.config.format,
            frame_index: 0,
        }
    }

    /// The built-in shader programs, for scene construction.
    pub fn shaders(&self) -> &ShaderLibrary {
        &self.shaders
    }

    /// The live G-buffer.
    pub fn gbuffer(&self) -> &GBuffer {
        &self.gbuffer
    }

    /// External resize hook: reallocates every G-buffer attachment at the
    /// new size. The previous attachments are dropped, never resized, and
    /// bind groups cached against them are invalidated.
    pub fn resize(&mut self, gpu: &GpuContext, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.gbuffer = GBuffer::new(gpu, width, height);
        self.cache.invalidate_texture_bindings();
    }

    /// Renders one frame of the scene graph rooted at `root`.
    ///
    /// Runs the pass state machine `Idle → Geometry → Idle → Light → Idle →
    /// Overlay → Idle`, one full traversal per pass, then encodes, submits,
    /// and presents. Any error aborts the frame; none are retried.
    pub fn render(&mut self, gpu: &GpuContext, root: &dyn SceneNode) -> Result<(), RenderError> {
        let surface_texture = match gpu.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost or outdated; reconfiguring and skipping frame");
                gpu.reconfigure();
                return Ok(());
            }
            Err(error) => return Err(error.into()),
        };
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.ring.begin_frame();
        let uniform_layout = self.ring.layout().clone();

        let mut geometry_draws = Vec::new();
        let mut light_draws = Vec::new();
        let mut overlay_draws = Vec::new();

        for scheduled in [PassKind::Geometry, PassKind::Light, PassKind::Overlay] {
            let mut recorder = FrameRecorder {
                gpu,
                gbuffer: &self.gbuffer,
                shaders: &self.shaders,
                cache: &mut self.cache,
                ring: &mut self.ring,
                pass_state: &mut self.pass_state,
                uniform_layout: &uniform_layout,
                surface_format: self.surface_format,
                scheduled,
                world_stack: Vec::new(),
                camera_stack: Vec::new(),
                shader_stack: Vec::new(),
                geometry_draws: &mut geometry_draws,
                light_draws: &mut light_draws,
                overlay_draws: &mut overlay_draws,
            };

            root.accept(&mut recorder)?;

            debug_assert!(recorder.world_stack.is_empty());
            debug_assert!(recorder.camera_stack.is_empty());
            debug_assert!(recorder.shader_stack.is_empty());
            if let Some(active) = self.pass_state.active() {
                return Err(RenderError::PassOrdering(format!(
                    "{:?} pass left active after traversal",
                    active
                )));
            }
        }

        self.ring.flush(gpu);

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        self.encode_geometry_pass(&mut encoder, &geometry_draws)?;
        self.encode_light_passes(&mut encoder, &light_draws)?;
        self.encode_overlay_pass(&mut encoder, &surface_view, &overlay_draws)?;

        gpu.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();

        if self.frame_index == 0 {
            log::info!(
                "first frame: {} opaque, {} light, {} overlay draw(s)",
                geometry_draws.len(),
                light_draws.len(),
                overlay_draws.len()
            );
        }
        self.frame_index += 1;

        Ok(())
    }

    fn encode_geometry_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        draws: &[RecordedDraw],
    ) -> Result<(), RenderError> {
        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = self
            .gbuffer
            .color_attachment_views()
            .into_iter()
            .map(|view| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })
            })
            .collect();

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Geometry Pass"),
            color_attachments: &color_attachments,
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: self.gbuffer.depth_stencil_view(),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: wgpu::StoreOp::Store,
                }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        for draw in draws {
            issue_draw(&mut render_pass, draw, self.ring.bind_group())?;
        }

        Ok(())
    }

    fn encode_light_passes(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        draws: &[RecordedLight],
    ) -> Result<(), RenderError> {
        for light in draws {
            // Mark: no color targets, read-only depth, stencil cleared to 0
            // then incremented/decremented by the volume's back/front faces.
            {
                let mut mark_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Light Stencil Mark"),
                    color_attachments: &[],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: self.gbuffer.depth_stencil_view(),
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(0),
                            store: wgpu::StoreOp::Store,
                        }),
                    }),
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });

                issue_draw(&mut mark_pass, &light.mark, self.ring.bind_group())?;
            }

            // Shade: only pixels the mark left non-zero, blended additively
            // into the accumulation target.
            {
                let mut shade_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Light Shade"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: self
                            .gbuffer
                            .attachment_view(crate::gbuffer::GBufferAttachment::Accumulation),
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: self.gbuffer.depth_stencil_view(),
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        }),
                    }),
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });

                shade_pass.set_stencil_reference(0);
                issue_draw(&mut shade_pass, &light.shade, self.ring.bind_group())?;
            }
        }

        Ok(())
    }

    fn encode_overlay_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        draws: &[RecordedDraw],
    ) -> Result<(), RenderError> {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Overlay Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: surface_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        for draw in draws {
            issue_draw(&mut render_pass, draw, self.ring.bind_group())?;
        }

        Ok(())
    }
}

/// Binds a recorded draw's pipeline, uniform slice, textures, and vertex
/// streams (one slot per attribute the program declares), then draws.
fn issue_draw(
    render_pass: &mut wgpu::RenderPass,
    draw: &RecordedDraw,
    ring_bind_group: &wgpu::BindGroup,
) -> Result<(), RenderError> {
    render_pass.set_pipeline(&draw.pipeline);
    render_pass.set_bind_group(0, ring_bind_group, &[draw.uniform_offset]);
    if let Some(textures) = &draw.textures {
        render_pass.set_bind_group(1, textures, &[]);
    }

    for (slot, attribute) in draw.program.declaration().attributes.iter().enumerate() {
        let description = draw.mesh.attribute(*attribute).ok_or_else(|| {
            RenderError::Configuration(format!(
                "mesh is missing attribute {:?} required by shader \"{}\"",
                attribute,
                draw.program.label()
            ))
        })?;
        render_pass.set_vertex_buffer(slot as u32, description.buffer.slice(description.offset..));
    }

    let index = draw.mesh.index();
    render_pass.set_index_buffer(index.buffer.slice(index.offset..), index.format);
    render_pass.draw_indexed(0..index.count, 0, 0..1);

    Ok(())
}

/// The visitor half of the renderer: per-traversal stacks plus draw
/// recording. One recorder lives for exactly one traversal, so no matrix,
/// camera, or shader state can leak across passes or frames.
struct FrameRecorder<'a> {
    gpu: &'a GpuContext,
    gbuffer: &'a GBuffer,
    shaders: &'a ShaderLibrary,
    cache: &'a mut PipelineCache,
    ring: &'a mut UniformRing,
    pass_state: &'a mut PassState,
    uniform_layout: &'a wgpu::BindGroupLayout,
    surface_format: wgpu::TextureFormat,
    scheduled: PassKind,
    world_stack: Vec<Mat4>,
    camera_stack: Vec<CameraState>,
    shader_stack: Vec<Rc<ShaderProgram>>,
    geometry_draws: &'a mut Vec<RecordedDraw>,
    light_draws: &'a mut Vec<RecordedLight>,
    overlay_draws: &'a mut Vec<RecordedDraw>,
}

impl FrameRecorder<'_> {
    /// Product of the transform stack; identity at the root.
    fn current_world(&self) -> Mat4 {
        self.world_stack.last().copied().unwrap_or(Mat4::IDENTITY)
    }

    fn current_camera(&self) -> Result<CameraState, RenderError> {
        self.camera_stack.last().copied().ok_or_else(|| {
            RenderError::Configuration(
                "renderable drawn without a camera in scope".to_string(),
            )
        })
    }

    /// The shader stack's top overrides the renderable's own program.
    fn effective_program<'p>(&'p self, renderable: &'p Renderable) -> &'p Rc<ShaderProgram> {
        self.shader_stack.last().unwrap_or_else(|| renderable.shader())
    }

    fn record_draw(
        &mut self,
        renderable: &Renderable,
        program: &Rc<ShaderProgram>,
        variant: PipelineVariant,
        light: Option<LightContext>,
    ) -> Result<RecordedDraw, RenderError> {
        let camera = self.current_camera()?;
        let world = self.current_world() * renderable.local_transform_matrix();

        let context = DrawContext {
            projection_view: camera.projection_view,
            world,
            camera_eye: camera.eye,
            material: renderable.material(),
            texture_count: renderable.textures().len(),
            light,
        };
        let uniforms = DrawUniforms::resolve(&program.declaration().uniforms, &context)?;
        let uniform_offset = self.ring.push(&uniforms);

        let pipeline = self.cache.pipeline(
            self.gpu,
            self.uniform_layout,
            self.surface_format,
            variant,
            program,
            renderable.mesh(),
        )?;
        let textures =
            self.cache
                .texture_bind_group(self.gpu, self.gbuffer, program, renderable.textures());

        Ok(RecordedDraw {
            pipeline,
            program: program.clone(),
            mesh: renderable.mesh().clone(),
            uniform_offset,
            textures,
        })
    }
}

impl SceneVisitor for FrameRecorder<'_> {
    fn push_world_matrix(&mut self, matrix: Mat4) {
        self.world_stack.push(self.current_world() * matrix);
    }

    fn pop_world_matrix(&mut self) {
        self.world_stack.pop();
    }

    fn push_camera(&mut self, camera: &Camera) {
        self.camera_stack.push(CameraState {
            projection_view: camera.projection_view(),
            eye: camera.eye(),
        });
    }

    fn pop_camera(&mut self) {
        self.camera_stack.pop();
    }

    fn push_shader(&mut self, shader: &Rc<ShaderProgram>) {
        self.shader_stack.push(shader.clone());
    }

    fn pop_shader(&mut self) {
        self.shader_stack.pop();
    }

    fn begin_pass(&mut self, kind: PassKind) -> Result<(), RenderError> {
        // Only the boundary matching this traversal's scheduled pass
        // toggles the machine; other boundaries recurse transparently so
        // one subtree can serve several passes.
        if kind != self.scheduled {
            return Ok(());
        }
        self.pass_state.begin(kind)
    }

    fn end_pass(&mut self, kind: PassKind) -> Result<(), RenderError> {
        if kind != self.scheduled {
            return Ok(());
        }
        self.pass_state.end(kind)
    }

    fn draw_mesh(&mut self, renderable: &Renderable) -> Result<(), RenderError> {
        let Some(active) = self.pass_state.active() else {
            return Ok(());
        };
        if renderable.queue() != queue_for(active) {
            return Ok(());
        }

        match active {
            PassKind::Geometry => {
                let program = self.effective_program(renderable).clone();
                let draw =
                    self.record_draw(renderable, &program, PipelineVariant::Geometry, None)?;
                self.geometry_draws.push(draw);
                Ok(())
            }
            PassKind::Overlay => {
                let program = self.effective_program(renderable).clone();
                let draw =
                    self.record_draw(renderable, &program, PipelineVariant::Overlay, None)?;
                self.overlay_draws.push(draw);
                Ok(())
            }
            PassKind::Light => Err(RenderError::Configuration(
                "lighting-tagged renderable must be attached via a light node".to_string(),
            )),
        }
    }

    fn draw_light(&mut self, light: &LightVolume) -> Result<(), RenderError> {
        let renderable = light.renderable();
        if renderable.queue() != RenderQueue::Lighting {
            return Err(RenderError::Configuration(
                "light volume renderable must be tagged for the lighting queue".to_string(),
            ));
        }

        let Some(active) = self.pass_state.active() else {
            return Ok(());
        };
        if active != PassKind::Light {
            return Ok(());
        }

        // Light volumes always shade with their own kind-specific program;
        // the shader stack cannot meaningfully override them.
        let stencil_program = self.shaders.stencil.clone();
        let mark = self.record_draw(renderable, &stencil_program, PipelineVariant::StencilMark, None)?;

        let light_context = LightContext {
            color: light.color(),
            intensity: light.intensity(),
            ambient_intensity: light.ambient_intensity(),
            kind: light.kind(),
        };
        let shade_program = renderable.shader().clone();
        let shade = self.record_draw(
            renderable,
            &shade_program,
            PipelineVariant::LightShade,
            Some(light_context),
        )?;

        self.light_draws.push(RecordedLight { mark, shade });
        Ok(())
    }
}
