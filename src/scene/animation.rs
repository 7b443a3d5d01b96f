//! Reusable scene animations.
//!
//! Each animation holds a clone of the shared handle it steers (a
//! [`SharedMat4`] or a light volume) and advances by the frame's elapsed
//! milliseconds. Scenes own a list of them and tick them from
//! [`Scene::update`](crate::scene::Scene::update).

use crate::lighting::LightVolume;
use crate::renderable::SharedMat4;
use glam::{Mat4, Vec3};
use std::cell::RefCell;
use std::rc::Rc;

/// Spins a transform about the Y axis at a constant rate.
pub struct RotationAnimation {
    transform: SharedMat4,
    rotation_rate_rad_per_sec: f32,
}

impl RotationAnimation {
    /// Rotates `transform` by `rotation_rate_rad_per_sec` radians per
    /// second.
    pub fn new(transform: SharedMat4, rotation_rate_rad_per_sec: f32) -> Self {
        Self {
            transform,
            rotation_rate_rad_per_sec,
        }
    }

    /// Advances by `step_ms` milliseconds.
    pub fn update(&mut self, step_ms: f32) {
        let angle = self.rotation_rate_rad_per_sec * step_ms / 1000.0;
        let mut transform = self.transform.borrow_mut();
        *transform = *transform * Mat4::from_rotation_y(angle);
    }
}

/// Bounces a translation inside an axis-aligned XY box, reflecting the
/// velocity off each edge.
pub struct BoundedTranslationAnimation {
    transform: SharedMat4,
    left_bound: f32,
    right_bound: f32,
    top_bound: f32,
    bottom_bound: f32,
    position: Vec3,
    velocity: Vec3,
}

impl BoundedTranslationAnimation {
    /// Starts at `initial_position` moving with `initial_velocity` (units
    /// per second), confined to the given bounds.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transform: SharedMat4,
        left_bound: f32,
        right_bound: f32,
        top_bound: f32,
        bottom_bound: f32,
        initial_position: Vec3,
        initial_velocity: Vec3,
    ) -> Self {
        Self {
            transform,
            left_bound,
            right_bound,
            top_bound,
            bottom_bound,
            position: initial_position,
            velocity: initial_velocity,
        }
    }

    fn reflect(v: Vec3, normal: Vec3) -> Vec3 {
        v - normal * (2.0 * v.dot(normal))
    }

    /// Advances by `step_ms` milliseconds.
    pub fn update(&mut self, step_ms: f32) {
        let step = step_ms / 1000.0;
        let mut next = self.position + self.velocity * step;

        if next.y > self.top_bound && self.velocity.dot(Vec3::NEG_Y) < 0.0 {
            self.velocity = Self::reflect(self.velocity, Vec3::NEG_Y);
            next = self.position + self.velocity * step;
        }
        if next.y < self.bottom_bound && self.velocity.dot(Vec3::Y) < 0.0 {
            self.velocity = Self::reflect(self.velocity, Vec3::Y);
            next = self.position + self.velocity * step;
        }
        if next.x < self.left_bound && self.velocity.dot(Vec3::X) < 0.0 {
            self.velocity = Self::reflect(self.velocity, Vec3::X);
            next = self.position + self.velocity * step;
        }
        if next.x > self.right_bound && self.velocity.dot(Vec3::NEG_X) < 0.0 {
            self.velocity = Self::reflect(self.velocity, Vec3::NEG_X);
            next = self.position + self.velocity * step;
        }

        self.position = next;
        *self.transform.borrow_mut() = Mat4::from_translation(self.position);
    }
}

/// Pulses a transform's X/Y scale with phase-offset |cos|/|sin| waves.
pub struct XYScaleAnimation {
    transform: SharedMat4,
    min_scale: f32,
    max_scale: f32,
    period_ms: f32,
    time_ms: f32,
}

impl XYScaleAnimation {
    /// Oscillates between `min_scale` and `max_scale` over `period_sec`
    /// seconds per quarter cycle.
    pub fn new(transform: SharedMat4, min_scale: f32, max_scale: f32, period_sec: f32) -> Self {
        Self {
            transform,
            min_scale,
            max_scale,
            period_ms: period_sec * 1000.0 * 4.0,
            time_ms: 0.0,
        }
    }

    /// Advances by `step_ms` milliseconds.
    pub fn update(&mut self, step_ms: f32) {
        self.time_ms = (self.time_ms + step_ms) % self.period_ms;

        let angle = std::f32::consts::TAU * (self.time_ms / self.period_ms);
        let x_scale = self.min_scale + (self.max_scale - self.min_scale) * angle.cos().abs();
        let y_scale = self.min_scale + (self.max_scale - self.min_scale) * angle.sin().abs();

        *self.transform.borrow_mut() = Mat4::from_scale(Vec3::new(x_scale, y_scale, 1.0));
    }
}

/// Triangle-wave oscillator between a minimum and maximum value.
///
/// The pure core of [`LightIntensityAnimation`], separated so the waveform
/// is testable without a GPU-backed light volume.
pub struct IntensityOscillator {
    min: f32,
    max: f32,
    value: f32,
    direction: f32,
    rate_per_sec: f32,
}

impl IntensityOscillator {
    /// Oscillates in `[min, max]`, starting at `min + (max − min) ·
    /// phase`, rising first.
    pub fn new(min: f32, max: f32, phase: f32, rate_per_sec: f32) -> Self {
        Self {
            min,
            max,
            value: min + (max - min) * phase.clamp(0.0, 1.0),
            direction: 1.0,
            rate_per_sec,
        }
    }

    /// Current value.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Advances by `step_ms` milliseconds and returns the new value.
    pub fn step(&mut self, step_ms: f32) -> f32 {
        self.value += self.direction * step_ms / 1000.0 * self.rate_per_sec;

        if self.value > self.max {
            self.value = self.max;
            self.direction *= -1.0;
        }
        if self.value < self.min {
            self.value = self.min;
            self.direction *= -1.0;
        }

        self.value
    }
}

/// Flickers a light volume's intensity between `(1 − variance) · I` and
/// `I`, where `I` is the intensity the volume was built with.
pub struct LightIntensityAnimation {
    volume: Rc<RefCell<LightVolume>>,
    oscillator: IntensityOscillator,
}

impl LightIntensityAnimation {
    const RATE_PER_SEC: f32 = 0.3;

    /// Flickers `volume` with the given `variance` in `[0, 1]`; `phase`
    /// staggers lights built with the same parameters so they do not pulse
    /// in lockstep.
    pub fn new(volume: Rc<RefCell<LightVolume>>, variance: f32, phase: f32) -> Self {
        let max = volume.borrow().intensity();
        let min = (1.0 - variance) * max;
        let oscillator = IntensityOscillator::new(min, max, phase, Self::RATE_PER_SEC);
        volume.borrow_mut().set_intensity(oscillator.value());

        Self { volume, oscillator }
    }

    /// Advances by `step_ms` milliseconds.
    pub fn update(&mut self, step_ms: f32) {
        let value = self.oscillator.step(step_ms);
        self.volume.borrow_mut().set_intensity(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderable::shared_mat4;
    use approx::assert_relative_eq;

    #[test]
    fn rotation_accumulates_per_step() {
        let transform = shared_mat4(Mat4::IDENTITY);
        let mut animation = RotationAnimation::new(Rc::clone(&transform), std::f32::consts::PI);

        // Two half-second steps make a full half turn.
        animation.update(500.0);
        animation.update(500.0);

        let rotated = transform.borrow().transform_point3(Vec3::X);
        assert_relative_eq!(rotated.x, -1.0, epsilon = 1e-5);
        assert_relative_eq!(rotated.z.abs(), 0.0, epsilon = 1e-4);
    }

    #[test]
    fn bounded_translation_reflects_at_bounds() {
        let transform = shared_mat4(Mat4::IDENTITY);
        let mut animation = BoundedTranslationAnimation::new(
            Rc::clone(&transform),
            -10.0,
            1.0,
            10.0,
            -10.0,
            Vec3::ZERO,
            Vec3::new(2.0, 0.0, 0.0),
        );

        // After one second the point would be at x = 2, past the right
        // bound at 1: the velocity reflects and the point moves left.
        animation.update(1000.0);
        assert!(animation.velocity.x < 0.0);
        assert!(animation.position.x <= 1.0);

        let translation = transform.borrow().w_axis;
        assert_relative_eq!(translation.x, animation.position.x);
    }

    #[test]
    fn xy_scale_stays_within_range() {
        let transform = shared_mat4(Mat4::IDENTITY);
        let mut animation = XYScaleAnimation::new(Rc::clone(&transform), 0.5, 2.0, 1.0);

        for _ in 0..100 {
            animation.update(97.0);
            let matrix = *transform.borrow();
            let x_scale = matrix.x_axis.x;
            let y_scale = matrix.y_axis.y;
            assert!((0.5..=2.0).contains(&x_scale));
            assert!((0.5..=2.0).contains(&y_scale));
        }
    }

    #[test]
    fn oscillator_bounces_between_bounds() {
        let mut oscillator = IntensityOscillator::new(0.7, 1.0, 0.0, 0.3);
        assert_relative_eq!(oscillator.value(), 0.7);

        // Rises for one second (0.3/sec) up to the max.
        oscillator.step(1000.0);
        assert_relative_eq!(oscillator.value(), 1.0);
        // Overshoot clamps at the max and turns the wave around.
        oscillator.step(500.0);
        assert_relative_eq!(oscillator.value(), 1.0);
        oscillator.step(500.0);
        assert!(oscillator.value() < 1.0);
        assert!(oscillator.value() >= 0.7);
    }

    #[test]
    fn oscillator_phase_offsets_start_value() {
        let oscillator = IntensityOscillator::new(0.0, 2.0, 0.25, 0.3);
        assert_relative_eq!(oscillator.value(), 0.5);
    }
}
