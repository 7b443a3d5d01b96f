//! Concrete scene-graph node types.

use crate::camera::Camera;
use crate::error::RenderError;
use crate::graph::visitor::{PassKind, SceneVisitor};
use crate::lighting::LightVolume;
use crate::renderable::{Renderable, SharedMat4};
use crate::shader::ShaderProgram;
use std::cell::RefCell;
use std::rc::Rc;

/// A node in the scene graph.
///
/// Implementations apply their effect, visit children left to right, then
/// undo their effect. Traversal is synchronous and visits every node
/// exactly once.
pub trait SceneNode {
    /// Dispatches this node and its subtree to `visitor`.
    fn accept(&self, visitor: &mut dyn SceneVisitor) -> Result<(), RenderError>;
}

fn accept_children(
    children: &[Box<dyn SceneNode>],
    visitor: &mut dyn SceneVisitor,
) -> Result<(), RenderError> {
    for child in children {
        child.accept(visitor)?;
    }
    Ok(())
}

/// A pure grouping node with no effect of its own.
pub struct GroupNode {
    children: Vec<Box<dyn SceneNode>>,
}

impl GroupNode {
    /// Creates a group over `children`.
    pub fn new(children: Vec<Box<dyn SceneNode>>) -> Self {
        Self { children }
    }

    /// Appends a child after construction.
    pub fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }
}

impl SceneNode for GroupNode {
    fn accept(&self, visitor: &mut dyn SceneVisitor) -> Result<(), RenderError> {
        accept_children(&self.children, visitor)
    }
}

/// Pushes a matrix onto the world-transform stack around its subtree.
pub struct TransformNode {
    transform: SharedMat4,
    children: Vec<Box<dyn SceneNode>>,
}

impl TransformNode {
    /// Creates a transform node. Keep a clone of `transform` to animate it.
    pub fn new(transform: SharedMat4, children: Vec<Box<dyn SceneNode>>) -> Self {
        Self {
            transform,
            children,
        }
    }

    /// The shared transform handle.
    pub fn transform(&self) -> &SharedMat4 {
        &self.transform
    }
}

impl SceneNode for TransformNode {
    fn accept(&self, visitor: &mut dyn SceneVisitor) -> Result<(), RenderError> {
        visitor.push_world_matrix(*self.transform.borrow());
        let result = accept_children(&self.children, visitor);
        visitor.pop_world_matrix();
        result
    }
}

/// Pushes a camera onto the camera stack around its subtree, giving all
/// descendants a screen-space frame of reference.
pub struct CameraNode {
    camera: Rc<RefCell<Camera>>,
    children: Vec<Box<dyn SceneNode>>,
}

impl CameraNode {
    /// Creates a camera node. Keep a clone of `camera` to steer it.
    pub fn new(camera: Rc<RefCell<Camera>>, children: Vec<Box<dyn SceneNode>>) -> Self {
        Self { camera, children }
    }
}

impl SceneNode for CameraNode {
    fn accept(&self, visitor: &mut dyn SceneVisitor) -> Result<(), RenderError> {
        visitor.push_camera(&self.camera.borrow());
        let result = accept_children(&self.children, visitor);
        visitor.pop_camera();
        result
    }
}

/// Offers its renderable for drawing, then visits children.
pub struct MeshNode {
    renderable: Renderable,
    children: Vec<Box<dyn SceneNode>>,
}

impl MeshNode {
    /// Creates a mesh node.
    pub fn new(renderable: Renderable, children: Vec<Box<dyn SceneNode>>) -> Self {
        Self {
            renderable,
            children,
        }
    }

    /// The wrapped renderable.
    pub fn renderable(&self) -> &Renderable {
        &self.renderable
    }
}

impl SceneNode for MeshNode {
    fn accept(&self, visitor: &mut dyn SceneVisitor) -> Result<(), RenderError> {
        visitor.draw_mesh(&self.renderable)?;
        accept_children(&self.children, visitor)
    }
}

/// Offers its light volume for drawing, then visits children.
pub struct LightNode {
    volume: Rc<RefCell<LightVolume>>,
    children: Vec<Box<dyn SceneNode>>,
}

impl LightNode {
    /// Creates a light node. Keep a clone of `volume` to animate intensity.
    pub fn new(volume: Rc<RefCell<LightVolume>>, children: Vec<Box<dyn SceneNode>>) -> Self {
        Self { volume, children }
    }
}

impl SceneNode for LightNode {
    fn accept(&self, visitor: &mut dyn SceneVisitor) -> Result<(), RenderError> {
        visitor.draw_light(&self.volume.borrow())?;
        accept_children(&self.children, visitor)
    }
}

/// Pushes a contextual shader-program override around its subtree.
pub struct ShaderBindingNode {
    shader: Rc<ShaderProgram>,
    children: Vec<Box<dyn SceneNode>>,
}

impl ShaderBindingNode {
    /// Creates a shader-binding node.
    pub fn new(shader: Rc<ShaderProgram>, children: Vec<Box<dyn SceneNode>>) -> Self {
        Self { shader, children }
    }
}

impl SceneNode for ShaderBindingNode {
    fn accept(&self, visitor: &mut dyn SceneVisitor) -> Result<(), RenderError> {
        visitor.push_shader(&self.shader);
        let result = accept_children(&self.children, visitor);
        visitor.pop_shader();
        result
    }
}

/// Marks the subtree belonging to one render pass.
///
/// The renderer schedules one pass per traversal; only a boundary matching
/// the scheduled pass toggles the pass state machine, so a subtree wrapped
/// in nested boundaries of different kinds can serve several passes.
pub struct PassBoundaryNode {
    kind: PassKind,
    children: Vec<Box<dyn SceneNode>>,
}

impl PassBoundaryNode {
    /// Creates a boundary of the given kind.
    pub fn new(kind: PassKind, children: Vec<Box<dyn SceneNode>>) -> Self {
        Self { kind, children }
    }

    /// Geometry-pass boundary.
    pub fn geometry(children: Vec<Box<dyn SceneNode>>) -> Self {
        Self::new(PassKind::Geometry, children)
    }

    /// Light-pass boundary.
    pub fn light(children: Vec<Box<dyn SceneNode>>) -> Self {
        Self::new(PassKind::Light, children)
    }

    /// Overlay-pass boundary.
    pub fn overlay(children: Vec<Box<dyn SceneNode>>) -> Self {
        Self::new(PassKind::Overlay, children)
    }
}

impl SceneNode for PassBoundaryNode {
    fn accept(&self, visitor: &mut dyn SceneVisitor) -> Result<(), RenderError> {
        visitor.begin_pass(self.kind)?;
        let result = accept_children(&self.children, visitor);
        visitor.end_pass(self.kind)?;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderable::shared_mat4;
    use glam::{Mat4, Vec3};

    /// Visitor that records traversal events and tracks stack depths.
    #[derive(Default)]
    struct RecordingVisitor {
        events: Vec<String>,
        world_depth: usize,
        camera_depth: usize,
        shader_depth: usize,
        max_world_depth: usize,
    }

    impl SceneVisitor for RecordingVisitor {
        fn push_world_matrix(&mut self, matrix: Mat4) {
            self.world_depth += 1;
            self.max_world_depth = self.max_world_depth.max(self.world_depth);
            let t = matrix.w_axis;
            self.events.push(format!("push_world({},{},{})", t.x, t.y, t.z));
        }

        fn pop_world_matrix(&mut self) {
            self.world_depth -= 1;
            self.events.push("pop_world".into());
        }

        fn push_camera(&mut self, _camera: &Camera) {
            self.camera_depth += 1;
            self.events.push("push_camera".into());
        }

        fn pop_camera(&mut self) {
            self.camera_depth -= 1;
            self.events.push("pop_camera".into());
        }

        fn push_shader(&mut self, _shader: &Rc<ShaderProgram>) {
            self.shader_depth += 1;
            self.events.push("push_shader".into());
        }

        fn pop_shader(&mut self) {
            self.shader_depth -= 1;
            self.events.push("pop_shader".into());
        }

        fn begin_pass(&mut self, kind: PassKind) -> Result<(), RenderError> {
            self.events.push(format!("begin_pass({:?})", kind));
            Ok(())
        }

        fn end_pass(&mut self, kind: PassKind) -> Result<(), RenderError> {
            self.events.push(format!("end_pass({:?})", kind));
            Ok(())
        }

        fn draw_mesh(&mut self, _renderable: &Renderable) -> Result<(), RenderError> {
            self.events.push("draw_mesh".into());
            Ok(())
        }

        fn draw_light(&mut self, _light: &LightVolume) -> Result<(), RenderError> {
            self.events.push("draw_light".into());
            Ok(())
        }
    }

    fn transform(translation: Vec3, children: Vec<Box<dyn SceneNode>>) -> Box<dyn SceneNode> {
        Box::new(TransformNode::new(
            shared_mat4(Mat4::from_translation(translation)),
            children,
        ))
    }

    #[test]
    fn zero_child_nodes_balance_their_stacks() {
        let mut visitor = RecordingVisitor::default();

        transform(Vec3::ZERO, vec![])
            .accept(&mut visitor)
            .unwrap();
        CameraNode::new(Rc::new(RefCell::new(Camera::new())), vec![])
            .accept(&mut visitor)
            .unwrap();

        assert_eq!(visitor.world_depth, 0);
        assert_eq!(visitor.camera_depth, 0);
    }

    #[test]
    fn nested_transforms_balance_and_nest_depth_first() {
        let graph = transform(
            Vec3::new(1.0, 0.0, 0.0),
            vec![
                transform(Vec3::new(2.0, 0.0, 0.0), vec![]),
                transform(Vec3::new(3.0, 0.0, 0.0), vec![]),
            ],
        );

        let mut visitor = RecordingVisitor::default();
        graph.accept(&mut visitor).unwrap();

        assert_eq!(visitor.world_depth, 0);
        assert_eq!(visitor.max_world_depth, 2);
        assert_eq!(
            visitor.events,
            vec![
                "push_world(1,0,0)",
                "push_world(2,0,0)",
                "pop_world",
                "push_world(3,0,0)",
                "pop_world",
                "pop_world",
            ]
        );
    }

    #[test]
    fn children_visit_in_array_order() {
        let graph = GroupNode::new(vec![
            transform(Vec3::X, vec![]),
            transform(Vec3::Y, vec![]),
            transform(Vec3::Z, vec![]),
        ]);

        let mut visitor = RecordingVisitor::default();
        graph.accept(&mut visitor).unwrap();

        let pushes: Vec<&String> = visitor
            .events
            .iter()
            .filter(|e| e.starts_with("push_world"))
            .collect();
        assert_eq!(
            pushes,
            ["push_world(1,0,0)", "push_world(0,1,0)", "push_world(0,0,1)"]
        );
    }

    #[test]
    fn pass_boundary_wraps_subtree() {
        let graph = PassBoundaryNode::geometry(vec![transform(Vec3::ZERO, vec![])]);

        let mut visitor = RecordingVisitor::default();
        graph.accept(&mut visitor).unwrap();

        assert_eq!(visitor.events.first().unwrap(), "begin_pass(Geometry)");
        assert_eq!(visitor.events.last().unwrap(), "end_pass(Geometry)");
        assert_eq!(visitor.world_depth, 0);
    }

    #[test]
    fn transform_pops_even_when_a_child_fails() {
        /// A node that fails its own dispatch, simulating a configuration
        /// error mid-subtree.
        struct FailingNode;

        impl SceneNode for FailingNode {
            fn accept(&self, _visitor: &mut dyn SceneVisitor) -> Result<(), RenderError> {
                Err(RenderError::Configuration("missing attribute".into()))
            }
        }

        let graph = TransformNode::new(
            shared_mat4(Mat4::IDENTITY),
            vec![Box::new(FailingNode)],
        );
        let mut visitor = RecordingVisitor::default();

        assert!(graph.accept(&mut visitor).is_err());
        // The enclosing transform still popped its matrix on the error path.
        assert_eq!(visitor.world_depth, 0);
    }
}
