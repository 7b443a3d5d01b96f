//! The scene-graph visitor contract.

use crate::camera::Camera;
use crate::error::RenderError;
use crate::lighting::LightVolume;
use crate::renderable::Renderable;
use crate::shader::ShaderProgram;
use glam::Mat4;
use std::rc::Rc;

/// Which render pass a boundary node toggles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Geometry pass: rasterize opaque renderables into the G-buffer.
    Geometry,
    /// Light pass: accumulate stencil-masked light volumes.
    Light,
    /// Overlay pass: draw screen-space panels onto the surface.
    Overlay,
}

/// Receiver side of the scene-graph double dispatch.
///
/// Push/pop pairs follow strict stack discipline: every node that pushes
/// state pops it before `accept` returns, for every node type, including
/// nodes with zero children. Methods that can detect authoring errors
/// (pass nesting, mesh/shader mismatches) return `Result`; a traversal
/// aborts on the first error since all of them are fatal.
pub trait SceneVisitor {
    /// Pushes a local matrix; the current world transform becomes the
    /// product of the whole stack.
    fn push_world_matrix(&mut self, matrix: Mat4);
    /// Undoes the matching [`push_world_matrix`](Self::push_world_matrix).
    fn pop_world_matrix(&mut self);

    /// Pushes a camera; descendants inherit its projection-view matrix and
    /// eye position.
    fn push_camera(&mut self, camera: &Camera);
    /// Undoes the matching [`push_camera`](Self::push_camera).
    fn pop_camera(&mut self);

    /// Pushes a contextual shader-program override.
    fn push_shader(&mut self, shader: &Rc<ShaderProgram>);
    /// Undoes the matching [`push_shader`](Self::push_shader).
    fn pop_shader(&mut self);

    /// Enters a render pass. Entering a pass while another is active is a
    /// fatal pass-ordering violation.
    fn begin_pass(&mut self, kind: PassKind) -> Result<(), RenderError>;
    /// Leaves a render pass.
    fn end_pass(&mut self, kind: PassKind) -> Result<(), RenderError>;

    /// Offers a renderable for drawing under the current stacks. The
    /// visitor filters by queue tag and active pass.
    fn draw_mesh(&mut self, renderable: &Renderable) -> Result<(), RenderError>;
    /// Offers a light volume for drawing during the light pass.
    fn draw_light(&mut self, light: &LightVolume) -> Result<(), RenderError>;
}
