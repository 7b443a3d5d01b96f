//! Hierarchical scene graph.
//!
//! A scene is a tree of polymorphic nodes traversed depth-first with a
//! double-dispatch visitor. Each composite node applies its own effect
//! (push state, issue a draw, toggle a pass), recurses into its children in
//! array order, then undoes its effect before returning — a strict stack
//! discipline that guarantees state pushed by a subtree never leaks to its
//! siblings.
//!
//! The graph is built once during scene construction and owned by the
//! scene; the renderer re-walks the same tree once per pass with a queue
//! filter, so the tree stays single-source-of-truth across all three
//! passes.

mod node;
mod visitor;

pub use node::{
    CameraNode, GroupNode, LightNode, MeshNode, PassBoundaryNode, SceneNode, ShaderBindingNode,
    TransformNode,
};
pub use visitor::{PassKind, SceneVisitor};
