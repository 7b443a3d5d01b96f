//! Light volumes for the deferred light pass.
//!
//! A [`LightVolume`] is a renderable (tagged [`RenderQueue::Lighting`])
//! whose mesh bounds the region the light can affect, plus the light's
//! shading parameters. The stencil algorithm restricts the lighting shader
//! to pixels where that volume intersects visible geometry.
//!
//! Directional lights use an oversized cube covering the whole scene —
//! their effect is directionally uniform, so a tight bound buys nothing.
//! Point lights use the unit sphere scaled to the falloff range; because the
//! scale is part of the volume's transform, light-local distances come out
//! pre-divided by the range and the shader's attenuation needs no per-pixel
//! division. The equivalent reciprocal, `one_div_range_sq`, is derived once
//! at construction and drives the CPU-side [`point_attenuation`] mirror.

use crate::gbuffer::GBufferAttachment;
use crate::geometry;
use crate::gpu::GpuContext;
use crate::material::Material;
use crate::renderable::{Renderable, RenderQueue, TextureRef, shared_mat4};
use crate::shader::ShaderLibrary;
use glam::{Mat4, Vec3};

/// Edge length multiplier for the directional light's cube volume.
const DIRECTIONAL_VOLUME_SCALE: f32 = 100.0;
/// Tessellation of the point-light sphere volume.
const POINT_VOLUME_SEGMENTS: u32 = 16;
const POINT_VOLUME_RINGS: u32 = 16;

/// Kind-specific light parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightKind {
    /// Directionally uniform light.
    Directional {
        /// Unit-length world-space direction the light travels.
        direction: Vec3,
    },
    /// Omnidirectional light with a finite falloff range.
    Point {
        /// `1 / range²`, derived once from the falloff radius.
        one_div_range_sq: f32,
    },
}

impl LightKind {
    /// Directional parameters; `direction` is normalized here, at
    /// construction, never at use.
    pub fn directional(direction: Vec3) -> Self {
        LightKind::Directional {
            direction: direction.normalize(),
        }
    }

    /// Point parameters for a falloff radius of `range`.
    pub fn point(range: f32) -> Self {
        LightKind::Point {
            one_div_range_sq: 1.0 / (range * range),
        }
    }
}

/// Lambertian factor `max(0, n · −direction)` — the CPU mirror of the
/// directional shader's diffuse term.
pub fn lambert_factor(normal: Vec3, direction: Vec3) -> f32 {
    normal.dot(-direction).max(0.0)
}

/// Point-light attenuation before the squared smooth falloff:
/// `max(0, 1 − d²·(1/range²))`. 1 at the light, 0 at the range boundary,
/// monotonically decreasing in between. The shader squares this value.
pub fn point_attenuation(one_div_range_sq: f32, distance: f32) -> f32 {
    (1.0 - distance * distance * one_div_range_sq).max(0.0)
}

/// A light volume: a `Lighting`-tagged renderable plus shading parameters.
///
/// `intensity` is the only mutable field — scene animations flicker it
/// through the `Rc<RefCell<LightVolume>>` handle a light node holds.
pub struct LightVolume {
    renderable: Renderable,
    color: Vec3,
    intensity: f32,
    ambient_intensity: f32,
    kind: LightKind,
}

impl LightVolume {
    /// Assembles a directional light: oversized cube volume, the
    /// directional shading program, and the three G-buffer inputs.
    pub fn directional(
        gpu: &GpuContext,
        shaders: &ShaderLibrary,
        color: Vec3,
        direction: Vec3,
        intensity: f32,
        ambient_intensity: f32,
    ) -> Self {
        let mesh = geometry::cube_mesh(gpu, 0.5);
        let renderable = Renderable::new(
            mesh,
            shared_mat4(Mat4::from_scale(Vec3::splat(DIRECTIONAL_VOLUME_SCALE))),
            Material::default_ref(),
            gbuffer_inputs(),
            shaders.directional_light.clone(),
            RenderQueue::Lighting,
        );

        Self {
            renderable,
            color,
            intensity,
            ambient_intensity,
            kind: LightKind::directional(direction),
        }
    }

    /// Assembles a point light: unit sphere scaled to `range`, the point
    /// shading program, and the three G-buffer inputs.
    ///
    /// Position the light by wrapping its node in a `TransformNode`; the
    /// volume's own transform carries only the range scale.
    pub fn point(
        gpu: &GpuContext,
        shaders: &ShaderLibrary,
        color: Vec3,
        intensity: f32,
        range: f32,
    ) -> Self {
        let mesh = geometry::sphere_mesh(gpu, POINT_VOLUME_SEGMENTS, POINT_VOLUME_RINGS);
        let renderable = Renderable::new(
            mesh,
            shared_mat4(Mat4::from_scale(Vec3::splat(range))),
            Material::default_ref(),
            gbuffer_inputs(),
            shaders.point_light.clone(),
            RenderQueue::Lighting,
        );

        Self {
            renderable,
            color,
            intensity,
            ambient_intensity: 0.0,
            kind: LightKind::point(range),
        }
    }

    /// The volume's renderable.
    pub fn renderable(&self) -> &Renderable {
        &self.renderable
    }

    /// Light color.
    pub fn color(&self) -> Vec3 {
        self.color
    }

    /// Current intensity.
    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Sets the intensity (used by flicker animations).
    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity;
    }

    /// Ambient contribution (directional lights only; zero otherwise).
    pub fn ambient_intensity(&self) -> f32 {
        self.ambient_intensity
    }

    /// Kind-specific parameters.
    pub fn kind(&self) -> LightKind {
        self.kind
    }

    /// CPU mirror of the shader's diffuse term for this light against a
    /// surface `normal` with white diffuse color: `color · intensity ·
    /// lambert + color · ambient` for directional lights.
    pub fn diffuse_term(&self, normal: Vec3) -> Vec3 {
        match self.kind {
            LightKind::Directional { direction } => {
                self.color * self.intensity * lambert_factor(normal, direction)
                    + self.color * self.ambient_intensity
            }
            LightKind::Point { .. } => self.color * self.intensity,
        }
    }
}

fn gbuffer_inputs() -> Vec<TextureRef> {
    vec![
        TextureRef::Attachment(GBufferAttachment::Position),
        TextureRef::Attachment(GBufferAttachment::Normal),
        TextureRef::Attachment(GBufferAttachment::Diffuse),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn directional_direction_is_normalized_at_construction() {
        for input in [
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(0.0, -123.0, 0.0),
            Vec3::new(0.001, 0.002, -0.003),
        ] {
            let LightKind::Directional { direction } = LightKind::directional(input) else {
                panic!("expected directional kind");
            };
            assert_relative_eq!(direction.length(), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn point_attenuation_boundaries() {
        let LightKind::Point { one_div_range_sq } = LightKind::point(4.0) else {
            panic!("expected point kind");
        };
        assert_relative_eq!(one_div_range_sq, 1.0 / 16.0);

        assert_relative_eq!(point_attenuation(one_div_range_sq, 0.0), 1.0);
        assert_relative_eq!(point_attenuation(one_div_range_sq, 4.0), 0.0);
        // Beyond the range the term clamps at zero instead of going negative.
        assert_eq!(point_attenuation(one_div_range_sq, 10.0), 0.0);
    }

    #[test]
    fn point_attenuation_is_monotonic() {
        let LightKind::Point { one_div_range_sq } = LightKind::point(2.5) else {
            panic!("expected point kind");
        };

        let mut previous = f32::INFINITY;
        for step in 0..=50 {
            let distance = 2.5 * step as f32 / 50.0;
            let value = point_attenuation(one_div_range_sq, distance);
            assert!(value <= previous);
            previous = value;
        }
    }

    #[test]
    fn lambert_factor_clamps_backfaces() {
        let direction = Vec3::new(0.0, 0.0, -1.0);
        // Surface facing the light head-on.
        assert_relative_eq!(lambert_factor(Vec3::Z, direction), 1.0);
        // Surface facing away.
        assert_eq!(lambert_factor(-Vec3::Z, direction), 0.0);
    }

    #[test]
    fn directional_intensity_scales_flat_plane_output() {
        // A 0.3-intensity white directional light over a camera-facing
        // plane (lambert factor 1) contributes exactly 0.3 per channel.
        let direction = Vec3::new(0.0, 0.0, -1.0);
        let factor = lambert_factor(Vec3::Z, direction);
        let term = Vec3::ONE * 0.3 * factor;
        assert_relative_eq!(term.x, 0.3);
        assert_relative_eq!(term.y, 0.3);
        assert_relative_eq!(term.z, 0.3);
    }
}
