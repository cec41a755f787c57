/// Fly-camera controller.
///
/// Accumulates yaw/pitch/position state from the world layer's input
/// processing and produces a view matrix. The controller is a passive
/// state machine: it never reads input devices itself.

use glam::{Mat4, Vec3};

/// Pitch is kept just shy of the poles to avoid a degenerate up vector
const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Yaw/pitch fly camera.
#[derive(Debug, Clone)]
pub struct CameraController {
    /// World-space eye position
    pub position: Vec3,
    yaw: f32,
    pitch: f32,
}

impl CameraController {
    /// Create a controller at `position`, looking down -Z
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            yaw: -std::f32::consts::FRAC_PI_2,
            pitch: 0.0,
        }
    }

    /// Current yaw in radians
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Current pitch in radians, clamped to just short of ±90°
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Apply a look delta (radians). Pitch is clamped at the poles.
    pub fn apply_look(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw += delta_yaw;
        self.pitch = (self.pitch + delta_pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Unit vector the camera is facing
    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize()
    }

    /// Unit vector to the camera's right
    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }

    /// Move along the camera's local axes.
    ///
    /// `axes` is (right, up, forward) in [-1, 1]; `distance` scales the
    /// normalized direction (typically speed * dt).
    pub fn advance(&mut self, axes: Vec3, distance: f32) {
        let direction = self.right() * axes.x + Vec3::Y * axes.y + self.forward() * axes.z;
        if direction.length_squared() > 0.0 {
            self.position += direction.normalize() * distance;
        }
    }

    /// Dolly along the view direction (mouse wheel zoom)
    pub fn zoom(&mut self, distance: f32) {
        self.position += self.forward() * distance;
    }

    /// Right-handed view matrix for the current state
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), Vec3::Y)
    }
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 2.0, 8.0))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_clamps_at_poles() {
        let mut camera = CameraController::new(Vec3::ZERO);
        camera.apply_look(0.0, 10.0);
        assert!(camera.pitch() < std::f32::consts::FRAC_PI_2);
        camera.apply_look(0.0, -20.0);
        assert!(camera.pitch() > -std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn test_advance_moves_along_forward() {
        let mut camera = CameraController::new(Vec3::ZERO);
        let forward = camera.forward();
        camera.advance(Vec3::new(0.0, 0.0, 1.0), 2.0);
        assert!((camera.position - forward * 2.0).length() < 1e-5);
    }

    #[test]
    fn test_advance_ignores_zero_axes() {
        let mut camera = CameraController::new(Vec3::ONE);
        camera.advance(Vec3::ZERO, 5.0);
        assert_eq!(camera.position, Vec3::ONE);
    }

    #[test]
    fn test_view_matrix_inverts_position() {
        let camera = CameraController::new(Vec3::new(3.0, 1.0, -2.0));
        let view = camera.view_matrix();
        // The eye position maps to the origin in view space
        let eye_in_view = view.transform_point3(camera.position);
        assert!(eye_in_view.length() < 1e-5);
    }
}
