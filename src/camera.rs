//! View and projection state for scene cameras.
//!
//! A [`Camera`] combines a view matrix (set via [`Camera::set_look_at`]) with
//! a perspective or orthographic projection and keeps their product cached.
//! Camera nodes in the scene graph push the camera onto the renderer's
//! camera stack, giving every descendant renderable a screen-space frame of
//! reference.

use glam::{Mat4, Vec3};

const DEFAULT_FOV: f32 = 45.0 * std::f32::consts::PI / 180.0;
const DEFAULT_ASPECT: f32 = 4.0 / 3.0;
const DEFAULT_NEAR: f32 = 0.1;
const DEFAULT_FAR: f32 = 100.0;

/// View + projection state.
///
/// Starts out at the origin looking down −Z with a 45° perspective
/// projection at a 4:3 aspect ratio.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    view: Mat4,
    projection: Mat4,
    projection_view: Mat4,
    eye: Vec3,
}

impl Camera {
    /// Creates a camera with the default perspective projection and an
    /// identity view.
    pub fn new() -> Self {
        let mut camera = Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            projection_view: Mat4::IDENTITY,
            eye: Vec3::ZERO,
        };
        camera.set_projection_perspective(DEFAULT_FOV, DEFAULT_ASPECT, DEFAULT_NEAR, DEFAULT_FAR);
        camera
    }

    /// Sets a perspective projection (right-handed, 0..1 depth).
    pub fn set_projection_perspective(&mut self, fov_y: f32, aspect: f32, near: f32, far: f32) {
        self.projection = Mat4::perspective_rh(fov_y, aspect, near, far);
        self.update_projection_view();
    }

    /// Sets an orthographic projection (right-handed, 0..1 depth).
    ///
    /// Overlay cameras use this to place picture-in-picture panels in a
    /// fixed screen-space frame.
    pub fn set_projection_orthographic(
        &mut self,
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    ) {
        self.projection = Mat4::orthographic_rh(left, right, bottom, top, near, far);
        self.update_projection_view();
    }

    /// Points the camera at `target` from `eye`.
    pub fn set_look_at(&mut self, eye: Vec3, target: Vec3, up: Vec3) {
        self.view = Mat4::look_at_rh(eye, target, up);
        self.eye = eye;
        self.update_projection_view();
    }

    /// The combined projection × view matrix.
    pub fn projection_view(&self) -> Mat4 {
        self.projection_view
    }

    /// The eye position in world space, as last set by
    /// [`set_look_at`](Self::set_look_at).
    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    fn update_projection_view(&mut self) {
        self.projection_view = self.projection * self.view;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn projection_view_is_product() {
        let mut camera = Camera::new();
        camera.set_look_at(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO, Vec3::Y);

        let expected = camera.projection * camera.view;
        assert_eq!(camera.projection_view(), expected);
    }

    #[test]
    fn look_at_records_eye() {
        let mut camera = Camera::new();
        let eye = Vec3::new(1.0, 2.0, 3.0);
        camera.set_look_at(eye, Vec3::ZERO, Vec3::Y);
        assert_eq!(camera.eye(), eye);
    }

    #[test]
    fn default_view_is_identity() {
        let camera = Camera::new();
        let origin = camera.view.transform_point3(Vec3::new(0.5, -0.5, -2.0));
        assert_relative_eq!(origin.x, 0.5);
        assert_relative_eq!(origin.y, -0.5);
        assert_relative_eq!(origin.z, -2.0);
    }
}
