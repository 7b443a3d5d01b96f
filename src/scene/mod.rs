//! Scene contract and overlay composition.
//!
//! A [`Scene`] owns a scene graph and the shared handles its animations
//! steer. The frame driver calls [`Scene::update`] with the elapsed
//! milliseconds, then hands [`Scene::graph_root`] to the renderer.

mod animation;

pub use animation::{
    BoundedTranslationAnimation, IntensityOscillator, LightIntensityAnimation, RotationAnimation,
    XYScaleAnimation,
};

use crate::camera::Camera;
use crate::error::RenderError;
use crate::gbuffer::GBufferAttachment;
use crate::geometry;
use crate::gpu::GpuContext;
use crate::graph::{CameraNode, GroupNode, MeshNode, SceneNode};
use crate::material::Material;
use crate::renderable::{Renderable, RenderQueue, TextureRef, shared_mat4};
use crate::renderer::Renderer;
use crate::shader::ShaderProgram;
use glam::Mat4;
use std::cell::RefCell;
use std::rc::Rc;

/// An animated scene composition.
pub trait Scene {
    /// Builds GPU resources and the scene graph. Called once, before the
    /// first frame.
    fn initialize(&mut self, gpu: &GpuContext, renderer: &Renderer) -> Result<(), RenderError>;

    /// The graph the renderer traverses each frame.
    fn graph_root(&self) -> &dyn SceneNode;

    /// Advances animations by `elapsed_ms` milliseconds of wall-clock time.
    fn update(&mut self, elapsed_ms: f32);
}

/// Builds the standard overlay subtree: an orthographic camera over a
/// full-screen quad presenting the accumulation target, plus
/// picture-in-picture panels along the bottom edge showing the position,
/// normal, and diffuse channels and the linearized depth buffer.
pub fn debug_overlay(gpu: &GpuContext, renderer: &Renderer) -> Box<dyn SceneNode> {
    let shaders = renderer.shaders();

    let overlay_quad = |mesh, attachment, program: &Rc<ShaderProgram>| {
        Box::new(MeshNode::new(
            Renderable::new(
                mesh,
                shared_mat4(Mat4::IDENTITY),
                Material::default_ref(),
                vec![TextureRef::Attachment(attachment)],
                program.clone(),
                RenderQueue::Overlay,
            ),
            vec![],
        )) as Box<dyn SceneNode>
    };

    // Drawn first so the debug panels land on top of it.
    let fullscreen = overlay_quad(
        geometry::quad_mesh(gpu, -1.0, 1.0, -1.0, 1.0),
        GBufferAttachment::Accumulation,
        &shaders.overlay,
    );

    let panel_width = 0.5;
    let panel_height = 0.5;
    let panels: [(GBufferAttachment, &Rc<ShaderProgram>); 4] = [
        (GBufferAttachment::Position, &shaders.overlay),
        (GBufferAttachment::Normal, &shaders.overlay),
        (GBufferAttachment::Diffuse, &shaders.overlay),
        (GBufferAttachment::Depth, &shaders.overlay_depth),
    ];

    let mut children: Vec<Box<dyn SceneNode>> = vec![fullscreen];
    for (index, (attachment, program)) in panels.into_iter().enumerate() {
        let left = -1.0 + panel_width * index as f32;
        children.push(overlay_quad(
            geometry::quad_mesh(gpu, left, left + panel_width, -1.0, -1.0 + panel_height),
            attachment,
            program,
        ));
    }

    let mut overlay_camera = Camera::new();
    overlay_camera.set_projection_orthographic(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0);

    Box::new(CameraNode::new(
        Rc::new(RefCell::new(overlay_camera)),
        vec![Box::new(GroupNode::new(children))],
    ))
}
