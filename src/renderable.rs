//! The immutable unit of drawing.
//!
//! A [`Renderable`] bundles everything the renderer consumes for one draw:
//! mesh, local transform, material, texture list, shader program, and a
//! [`RenderQueue`] tag deciding which pass draws it. The bundle itself is
//! immutable; the local transform is a [`SharedMat4`] so scene animations
//! can steer it through the same handle a graph node holds.
//!
//! Texture slots are either literal device textures or symbolic
//! [`GBufferAttachment`] references resolved against the renderer's live
//! G-buffer at draw time — light and overlay content can sample the same
//! G-buffer the geometry pass just wrote without ever holding its handles.

use crate::gbuffer::{GBuffer, GBufferAttachment};
use crate::material::Material;
use crate::mesh::Mesh;
use crate::shader::ShaderProgram;
use crate::texture::{Texture, TextureId};
use glam::Mat4;
use std::cell::RefCell;
use std::rc::Rc;

/// A shared, mutable 4×4 matrix. Graph nodes and animations hold clones of
/// the same handle; the traversal reads it once per frame.
pub type SharedMat4 = Rc<RefCell<Mat4>>;

/// Wraps a matrix for sharing between graph nodes and animations.
pub fn shared_mat4(matrix: Mat4) -> SharedMat4 {
    Rc::new(RefCell::new(matrix))
}

/// Which pass draws a renderable.
///
/// Every renderable carries exactly one tag; each per-pass traversal of the
/// scene graph filters on it, so the graph stays single-source-of-truth
/// across all three passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderQueue {
    /// Scene geometry, drawn by the geometry pass into the G-buffer.
    Opaque,
    /// Light volumes, drawn by the light pass with the stencil algorithm.
    Lighting,
    /// Screen-space panels, drawn last by the overlay pass.
    Overlay,
}

/// One texture slot of a renderable.
#[derive(Clone, Debug)]
pub enum TextureRef {
    /// A literal device texture.
    Device(Rc<Texture>),
    /// A symbolic reference into the renderer's G-buffer.
    Attachment(GBufferAttachment),
}

/// Cache identity of a resolved texture slot. Independent of draw order:
/// two slots with the same key resolve to the same view for a given
/// G-buffer allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureSlotKey {
    /// Literal texture, identified by its stable id.
    Device(TextureId),
    /// G-buffer attachment, identified symbolically.
    Attachment(GBufferAttachment),
}

impl TextureRef {
    /// Resolves this slot to a bindable view against the given G-buffer.
    pub fn resolve<'a>(&'a self, gbuffer: &'a GBuffer) -> &'a wgpu::TextureView {
        match self {
            TextureRef::Device(texture) => texture.view(),
            TextureRef::Attachment(attachment) => gbuffer.attachment_view(*attachment),
        }
    }

    /// The slot's cache identity.
    pub fn slot_key(&self) -> TextureSlotKey {
        match self {
            TextureRef::Device(texture) => TextureSlotKey::Device(texture.id()),
            TextureRef::Attachment(attachment) => TextureSlotKey::Attachment(*attachment),
        }
    }
}

/// The immutable bundle the renderer consumes.
pub struct Renderable {
    mesh: Rc<Mesh>,
    local_transform: SharedMat4,
    material: Rc<Material>,
    textures: Vec<TextureRef>,
    shader: Rc<ShaderProgram>,
    queue: RenderQueue,
}

impl Renderable {
    /// Assembles a renderable.
    ///
    /// The shader's declared attributes must be available on `mesh` and its
    /// declared uniforms must be resolvable for the queue it is drawn in;
    /// both are verified by the renderer at draw time and violations are
    /// fatal.
    pub fn new(
        mesh: Rc<Mesh>,
        local_transform: SharedMat4,
        material: Rc<Material>,
        textures: Vec<TextureRef>,
        shader: Rc<ShaderProgram>,
        queue: RenderQueue,
    ) -> Self {
        Self {
            mesh,
            local_transform,
            material,
            textures,
            shader,
            queue,
        }
    }

    /// The mesh geometry.
    pub fn mesh(&self) -> &Rc<Mesh> {
        &self.mesh
    }

    /// The shared local transform handle.
    pub fn local_transform(&self) -> &SharedMat4 {
        &self.local_transform
    }

    /// The current local transform value.
    pub fn local_transform_matrix(&self) -> Mat4 {
        *self.local_transform.borrow()
    }

    /// The surface material.
    pub fn material(&self) -> &Rc<Material> {
        &self.material
    }

    /// The texture slots, in `TextureSampler#` order.
    pub fn textures(&self) -> &[TextureRef] {
        &self.textures
    }

    /// The shader program.
    pub fn shader(&self) -> &Rc<ShaderProgram> {
        &self.shader
    }

    /// The queue tag.
    pub fn queue(&self) -> RenderQueue {
        self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_slot_keys_are_order_independent() {
        let a = TextureRef::Attachment(GBufferAttachment::Position);
        let b = TextureRef::Attachment(GBufferAttachment::Normal);

        let first = (a.slot_key(), b.slot_key());
        let second = (a.slot_key(), b.slot_key());
        assert_eq!(first, second);
        assert_ne!(a.slot_key(), b.slot_key());
    }

    #[test]
    fn shared_mat4_aliases_one_matrix() {
        let handle = shared_mat4(Mat4::IDENTITY);
        let alias = Rc::clone(&handle);
        *alias.borrow_mut() = Mat4::from_translation(glam::Vec3::X);
        assert_eq!(
            *handle.borrow(),
            Mat4::from_translation(glam::Vec3::X)
        );
    }
}
