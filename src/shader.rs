//! Shader program registry.
//!
//! A [`ShaderProgram`] wraps a compiled WGSL module together with the
//! declarative [`ShaderDeclaration`] of the vertex attributes and uniforms
//! it exposes. The renderer never parses or generates shader text — it only
//! consumes compiled modules plus their declarations, binds mesh attributes
//! by declared order, and resolves each declared uniform against a fixed
//! enumeration. A declared uniform the renderer cannot supply for a given
//! draw is a fatal configuration error.
//!
//! [`ShaderLibrary`] builds the built-in program set used by the deferred
//! pipeline: G-buffer fill, directional/point light shading, the
//! position-only stencil-mark program, and the two overlay programs.

use crate::gpu::GpuContext;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Vertex attributes a shader can declare, in the mesh contract's
/// vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    /// Object-space vertex position (vec3).
    Position,
    /// Object-space vertex normal (vec3).
    Normal,
    /// Per-vertex color (vec3).
    Color,
    /// First texture coordinate set (vec2).
    TexCoord0,
}

/// The fixed uniform enumeration shaders declare against.
///
/// Values a shader declares but the renderer cannot resolve for the draw at
/// hand (for example [`Uniform::LightPointColor`] on an opaque geometry
/// draw) fail fast at draw time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Uniform {
    /// Combined projection × view matrix of the current camera.
    ProjectionView,
    /// World matrix of the current draw (transform stack × local transform).
    World,
    /// Inverse of the world matrix.
    InverseWorld,
    /// Camera eye position transformed into the draw's local space.
    CameraPositionLocalSpace,
    /// First bound texture.
    TextureSampler0,
    /// Second bound texture.
    TextureSampler1,
    /// Third bound texture.
    TextureSampler2,
    /// Material diffuse color.
    MaterialDiffuseColor,
    /// Material emissive color.
    MaterialEmissiveColor,
    /// Material specular intensity.
    MaterialSpecularIntensity,
    /// Material specular power.
    MaterialSpecularPower,
    /// Directional light color.
    LightDirectionalColor,
    /// Directional light direction (unit length, world space).
    LightDirectionalDirection,
    /// Directional light intensity.
    LightDirectionalIntensity,
    /// Point light color.
    LightPointColor,
    /// Point light intensity.
    LightPointIntensity,
}

impl Uniform {
    /// The texture slot index this uniform binds, if it is a sampler.
    pub fn texture_slot(self) -> Option<usize> {
        match self {
            Uniform::TextureSampler0 => Some(0),
            Uniform::TextureSampler1 => Some(1),
            Uniform::TextureSampler2 => Some(2),
            _ => None,
        }
    }

    /// Whether this uniform carries per-light data.
    pub fn needs_light(self) -> bool {
        matches!(
            self,
            Uniform::LightDirectionalColor
                | Uniform::LightDirectionalDirection
                | Uniform::LightDirectionalIntensity
                | Uniform::LightPointColor
                | Uniform::LightPointIntensity
        )
    }
}

/// How a program's texture bindings sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureSampleKind {
    /// Unfilterable float color data (G-buffer channels, plain textures).
    Color,
    /// Depth data (the G-buffer's depth attachment).
    Depth,
}

/// The declarative half of a shader program: the attributes and uniforms it
/// exposes, independent of any compiled module.
#[derive(Clone, Debug)]
pub struct ShaderDeclaration {
    /// Declared vertex attributes, in shader-location order.
    pub attributes: Vec<VertexAttribute>,
    /// Declared uniforms.
    pub uniforms: Vec<Uniform>,
    /// How declared texture samplers read their textures.
    pub sample_kind: TextureSampleKind,
}

impl ShaderDeclaration {
    /// Number of texture slots this declaration binds (the count of
    /// `TextureSampler#` uniforms).
    pub fn texture_slot_count(&self) -> usize {
        self.uniforms
            .iter()
            .filter(|u| u.texture_slot().is_some())
            .count()
    }

    /// Whether the given uniform is declared.
    pub fn declares(&self, uniform: Uniform) -> bool {
        self.uniforms.contains(&uniform)
    }

    /// Whether any declared uniform carries per-light data.
    pub fn needs_light(&self) -> bool {
        self.uniforms.iter().any(|u| u.needs_light())
    }
}

/// Opaque identity of a shader program, used as a pipeline-cache key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderProgramId(u64);

fn next_program_id() -> ShaderProgramId {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    ShaderProgramId(COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// A compiled shader program plus its declaration. Immutable once built.
#[derive(Debug)]
pub struct ShaderProgram {
    id: ShaderProgramId,
    label: String,
    module: wgpu::ShaderModule,
    declaration: ShaderDeclaration,
    fragment_entry: Option<&'static str>,
}

impl ShaderProgram {
    /// Compiles a WGSL source into a program with the given declaration.
    ///
    /// The vertex entry point is `vs_main`; the fragment entry point is
    /// `fs_main` unless `fragment_entry` is `None` (depth/stencil-only
    /// programs such as the stencil-mark shader).
    pub fn new(
        gpu: &GpuContext,
        label: &str,
        source: &str,
        declaration: ShaderDeclaration,
        fragment_entry: Option<&'static str>,
    ) -> Rc<Self> {
        let module = gpu
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        Rc::new(Self {
            id: next_program_id(),
            label: label.to_string(),
            module,
            declaration,
            fragment_entry,
        })
    }

    /// The program's stable identity.
    pub fn id(&self) -> ShaderProgramId {
        self.id
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The compiled module.
    pub fn module(&self) -> &wgpu::ShaderModule {
        &self.module
    }

    /// The declared attributes/uniforms.
    pub fn declaration(&self) -> &ShaderDeclaration {
        &self.declaration
    }

    /// Fragment entry point name, if the program has a fragment stage.
    pub fn fragment_entry(&self) -> Option<&'static str> {
        self.fragment_entry
    }
}

/// The built-in program set for the deferred pipeline.
pub struct ShaderLibrary {
    /// G-buffer fill program (geometry pass).
    pub geometry: Rc<ShaderProgram>,
    /// Directional light shading program.
    pub directional_light: Rc<ShaderProgram>,
    /// Point light shading program.
    pub point_light: Rc<ShaderProgram>,
    /// Position-only stencil-mark program (no fragment stage).
    pub stencil: Rc<ShaderProgram>,
    /// Overlay program sampling a color channel.
    pub overlay: Rc<ShaderProgram>,
    /// Overlay program linearizing the depth channel.
    pub overlay_depth: Rc<ShaderProgram>,
}

impl ShaderLibrary {
    /// Compiles the built-in programs.
    pub fn new(gpu: &GpuContext) -> Self {
        let geometry = ShaderProgram::new(
            gpu,
            "GBuffer Program",
            include_str!("shaders/gbuffer.wgsl"),
            ShaderDeclaration {
                attributes: vec![VertexAttribute::Position, VertexAttribute::Normal],
                uniforms: vec![
                    Uniform::ProjectionView,
                    Uniform::World,
                    Uniform::MaterialDiffuseColor,
                    Uniform::MaterialEmissiveColor,
                    Uniform::MaterialSpecularIntensity,
                    Uniform::MaterialSpecularPower,
                ],
                sample_kind: TextureSampleKind::Color,
            },
            Some("fs_main"),
        );

        let directional_light = ShaderProgram::new(
            gpu,
            "Directional Light Program",
            include_str!("shaders/light_directional.wgsl"),
            ShaderDeclaration {
                attributes: vec![VertexAttribute::Position],
                uniforms: vec![
                    Uniform::ProjectionView,
                    Uniform::World,
                    Uniform::TextureSampler0,
                    Uniform::TextureSampler1,
                    Uniform::TextureSampler2,
                    Uniform::LightDirectionalDirection,
                    Uniform::LightDirectionalColor,
                    Uniform::LightDirectionalIntensity,
                ],
                sample_kind: TextureSampleKind::Color,
            },
            Some("fs_main"),
        );

        let point_light = ShaderProgram::new(
            gpu,
            "Point Light Program",
            include_str!("shaders/light_point.wgsl"),
            ShaderDeclaration {
                attributes: vec![VertexAttribute::Position],
                uniforms: vec![
                    Uniform::ProjectionView,
                    Uniform::World,
                    Uniform::InverseWorld,
                    Uniform::CameraPositionLocalSpace,
                    Uniform::TextureSampler0,
                    Uniform::TextureSampler1,
                    Uniform::TextureSampler2,
                    Uniform::LightPointColor,
                    Uniform::LightPointIntensity,
                ],
                sample_kind: TextureSampleKind::Color,
            },
            Some("fs_main"),
        );

        let stencil = ShaderProgram::new(
            gpu,
            "Stencil Mark Program",
            include_str!("shaders/stencil.wgsl"),
            ShaderDeclaration {
                attributes: vec![VertexAttribute::Position],
                uniforms: vec![Uniform::ProjectionView, Uniform::World],
                sample_kind: TextureSampleKind::Color,
            },
            None,
        );

        let overlay = ShaderProgram::new(
            gpu,
            "Overlay Program",
            include_str!("shaders/overlay.wgsl"),
            ShaderDeclaration {
                attributes: vec![VertexAttribute::Position, VertexAttribute::TexCoord0],
                uniforms: vec![
                    Uniform::ProjectionView,
                    Uniform::World,
                    Uniform::TextureSampler0,
                ],
                sample_kind: TextureSampleKind::Color,
            },
            Some("fs_main"),
        );

        let overlay_depth = ShaderProgram::new(
            gpu,
            "Overlay Depth Program",
            include_str!("shaders/overlay_depth.wgsl"),
            ShaderDeclaration {
                attributes: vec![VertexAttribute::Position, VertexAttribute::TexCoord0],
                uniforms: vec![
                    Uniform::ProjectionView,
                    Uniform::World,
                    Uniform::TextureSampler0,
                ],
                sample_kind: TextureSampleKind::Depth,
            },
            Some("fs_main"),
        );

        Self {
            geometry,
            directional_light,
            point_light,
            stencil,
            overlay,
            overlay_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light_declaration() -> ShaderDeclaration {
        ShaderDeclaration {
            attributes: vec![VertexAttribute::Position],
            uniforms: vec![
                Uniform::ProjectionView,
                Uniform::World,
                Uniform::TextureSampler0,
                Uniform::TextureSampler1,
                Uniform::TextureSampler2,
                Uniform::LightPointColor,
                Uniform::LightPointIntensity,
            ],
            sample_kind: TextureSampleKind::Color,
        }
    }

    #[test]
    fn texture_slot_count_counts_samplers_only() {
        let decl = light_declaration();
        assert_eq!(decl.texture_slot_count(), 3);

        let no_textures = ShaderDeclaration {
            attributes: vec![VertexAttribute::Position],
            uniforms: vec![Uniform::ProjectionView, Uniform::World],
            sample_kind: TextureSampleKind::Color,
        };
        assert_eq!(no_textures.texture_slot_count(), 0);
    }

    #[test]
    fn light_uniforms_are_flagged() {
        let decl = light_declaration();
        assert!(decl.needs_light());
        assert!(Uniform::LightDirectionalDirection.needs_light());
        assert!(!Uniform::World.needs_light());
    }

    #[test]
    fn sampler_slots_are_stable() {
        assert_eq!(Uniform::TextureSampler0.texture_slot(), Some(0));
        assert_eq!(Uniform::TextureSampler1.texture_slot(), Some(1));
        assert_eq!(Uniform::TextureSampler2.texture_slot(), Some(2));
        assert_eq!(Uniform::MaterialDiffuseColor.texture_slot(), None);
    }
}
