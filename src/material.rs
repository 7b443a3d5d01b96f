//! Surface material properties.
//!
//! A [`Material`] is a plain value type describing how a surface responds to
//! light: its diffuse and emissive colors plus a specular intensity/power
//! pair. Materials are immutable once built and shared by reference
//! ([`Rc`]) when reused across renderables.
//!
//! # Example
//!
//! ```
//! use phaos::{Material, MaterialBuilder};
//! use glam::Vec3;
//!
//! let gold = MaterialBuilder::new()
//!     .with_diffuse_color(Vec3::new(1.0, 0.78, 0.1))
//!     .with_specular_intensity(0.8)
//!     .with_specular_power(16.0)
//!     .build();
//!
//! // The default material is a process-wide singleton.
//! let plain = Material::default_ref();
//! assert_eq!(plain.diffuse_color, Vec3::ONE);
//! ```

use glam::Vec3;
use std::rc::Rc;

/// How a surface responds to light.
///
/// Diffuse color is written to the G-buffer's diffuse target, emissive color
/// seeds the accumulation target, and the specular pair rides along in the
/// alpha channels of the position/normal targets.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    /// Base surface color under lighting.
    pub diffuse_color: Vec3,
    /// Color emitted regardless of lighting.
    pub emissive_color: Vec3,
    /// Strength of the specular highlight.
    pub specular_intensity: f32,
    /// Sharpness of the specular highlight (Phong exponent).
    pub specular_power: f32,
}

impl Material {
    /// Returns the shared default material: diffuse white, emissive black,
    /// no specular response.
    ///
    /// The singleton is constructed on first use and never mutated.
    pub fn default_ref() -> Rc<Material> {
        thread_local! {
            static DEFAULT: Rc<Material> = Rc::new(MaterialBuilder::new().build());
        }
        DEFAULT.with(Rc::clone)
    }
}

/// Fluent builder for [`Material`] values.
///
/// Unset properties fall back to the defaults used by the shared default
/// material.
#[derive(Clone, Debug)]
pub struct MaterialBuilder {
    diffuse_color: Vec3,
    emissive_color: Vec3,
    specular_intensity: f32,
    specular_power: f32,
}

impl MaterialBuilder {
    /// Creates a builder with default properties.
    pub fn new() -> Self {
        Self {
            diffuse_color: Vec3::ONE,
            emissive_color: Vec3::ZERO,
            specular_intensity: 0.0,
            specular_power: 0.0,
        }
    }

    /// Sets the diffuse color.
    pub fn with_diffuse_color(mut self, color: Vec3) -> Self {
        self.diffuse_color = color;
        self
    }

    /// Sets the emissive color.
    pub fn with_emissive_color(mut self, color: Vec3) -> Self {
        self.emissive_color = color;
        self
    }

    /// Sets the specular highlight strength.
    pub fn with_specular_intensity(mut self, intensity: f32) -> Self {
        self.specular_intensity = intensity;
        self
    }

    /// Sets the specular exponent.
    pub fn with_specular_power(mut self, power: f32) -> Self {
        self.specular_power = power;
        self
    }

    /// Builds the immutable material, wrapped for sharing.
    pub fn build_shared(self) -> Rc<Material> {
        Rc::new(self.build())
    }

    /// Builds the immutable material.
    pub fn build(self) -> Material {
        Material {
            diffuse_color: self.diffuse_color,
            emissive_color: self.emissive_color,
            specular_intensity: self.specular_intensity,
            specular_power: self.specular_power,
        }
    }
}

impl Default for MaterialBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_match_default_material() {
        let built = MaterialBuilder::new().build();
        assert_eq!(built, *Material::default_ref());
        assert_eq!(built.diffuse_color, Vec3::ONE);
        assert_eq!(built.emissive_color, Vec3::ZERO);
        assert_eq!(built.specular_intensity, 0.0);
        assert_eq!(built.specular_power, 0.0);
    }

    #[test]
    fn builder_sets_all_properties() {
        let m = MaterialBuilder::new()
            .with_diffuse_color(Vec3::new(0.2, 0.4, 0.6))
            .with_emissive_color(Vec3::new(0.1, 0.0, 0.0))
            .with_specular_intensity(0.5)
            .with_specular_power(32.0)
            .build();

        assert_eq!(m.diffuse_color, Vec3::new(0.2, 0.4, 0.6));
        assert_eq!(m.emissive_color, Vec3::new(0.1, 0.0, 0.0));
        assert_eq!(m.specular_intensity, 0.5);
        assert_eq!(m.specular_power, 32.0);
    }

    #[test]
    fn default_singleton_is_shared() {
        let a = Material::default_ref();
        let b = Material::default_ref();
        assert!(Rc::ptr_eq(&a, &b));
    }
}
