//! # Phaos
//!
//! **A deferred-shading 3D renderer driven by a hierarchical scene graph.**
//!
//! Build a tree of transform, camera, mesh, light, and pass-boundary
//! nodes; each frame the renderer re-walks the same tree three times —
//! geometry, light, overlay — filtering renderables by queue tag, and
//! bounds per-pixel lighting cost with stencil-masked light volumes.
//!
//! ## Quick Start
//!
//! ```no_run
//! use phaos::*;
//! use glam::{Mat4, Vec3};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! struct Spinner {
//!     root: Option<Box<dyn SceneNode>>,
//!     cube_transform: SharedMat4,
//! }
//!
//! impl Scene for Spinner {
//!     fn initialize(&mut self, gpu: &GpuContext, renderer: &Renderer) -> Result<(), RenderError> {
//!         let shaders = renderer.shaders();
//!         let cube = MeshNode::new(
//!             Renderable::new(
//!                 geometry::cube_mesh(gpu, 0.5),
//!                 Rc::clone(&self.cube_transform),
//!                 Material::default_ref(),
//!                 vec![],
//!                 shaders.geometry.clone(),
//!                 RenderQueue::Opaque,
//!             ),
//!             vec![],
//!         );
//!         let sun = LightNode::new(
//!             Rc::new(RefCell::new(LightVolume::directional(
//!                 gpu,
//!                 shaders,
//!                 Vec3::ONE,
//!                 Vec3::new(1.0, -1.0, -1.0),
//!                 0.8,
//!                 0.1,
//!             ))),
//!             vec![],
//!         );
//!
//!         let mut camera = Camera::new();
//!         camera.set_look_at(Vec3::new(0.0, 1.0, 3.0), Vec3::ZERO, Vec3::Y);
//!         let world = CameraNode::new(
//!             Rc::new(RefCell::new(camera)),
//!             vec![Box::new(cube), Box::new(sun)],
//!         );
//!
//!         self.root = Some(Box::new(GroupNode::new(vec![
//!             Box::new(PassBoundaryNode::geometry(vec![Box::new(
//!                 PassBoundaryNode::light(vec![Box::new(world)]),
//!             )])),
//!             Box::new(PassBoundaryNode::overlay(vec![
//!                 scene::debug_overlay(gpu, renderer),
//!             ])),
//!         ])));
//!         Ok(())
//!     }
//!
//!     fn graph_root(&self) -> &dyn SceneNode {
//!         self.root.as_deref().unwrap()
//!     }
//!
//!     fn update(&mut self, elapsed_ms: f32) {
//!         let mut t = self.cube_transform.borrow_mut();
//!         *t = *t * Mat4::from_rotation_y(elapsed_ms * 0.001);
//!     }
//! }
//!
//! fn main() {
//!     run(Box::new(Spinner {
//!         root: None,
//!         cube_transform: shared_mat4(Mat4::IDENTITY),
//!     }));
//! }
//! ```
//!
//! ## Architecture
//!
//! - One scene graph is the single source of truth for all three passes;
//!   pass-boundary nodes mark which subtree each pass consumes.
//! - All GPU resources are created during construction; a warmed-up frame
//!   only records state changes and draw calls.
//! - Configuration mistakes (mesh missing a shader attribute, unresolvable
//!   uniform, nested passes) are fatal [`RenderError`]s, not fallbacks.

mod app;
mod camera;
mod error;
mod gbuffer;
pub mod geometry;
mod gpu;
mod graph;
mod lighting;
mod material;
mod mesh;
mod renderable;
mod renderer;
pub mod scene;
mod shader;
mod texture;

pub use app::{AppConfig, run, run_with_config};
pub use camera::Camera;
pub use error::RenderError;
pub use gbuffer::{GBuffer, GBufferAttachment};
pub use gpu::GpuContext;
pub use graph::{
    CameraNode, GroupNode, LightNode, MeshNode, PassBoundaryNode, PassKind, SceneNode,
    SceneVisitor, ShaderBindingNode, TransformNode,
};
pub use lighting::{LightKind, LightVolume, lambert_factor, point_attenuation};
pub use material::{Material, MaterialBuilder};
pub use mesh::{IndexBufferDescription, Mesh, MeshData, MeshId, VertexBufferDescription};
pub use renderable::{Renderable, RenderQueue, SharedMat4, TextureRef, shared_mat4};
pub use renderer::Renderer;
pub use scene::Scene;
pub use shader::{
    ShaderDeclaration, ShaderLibrary, ShaderProgram, ShaderProgramId, TextureSampleKind, Uniform,
    VertexAttribute,
};
pub use texture::{Texture, TextureId, decode_rgba};

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
