/// Camera registry contract.
///
/// The registry owns the application's cameras; the core only needs to keep
/// their aspect in step with the surface being rendered to (window or
/// offscreen editor viewport).

/// Camera registry contract.
pub trait CameraRegistry: Send + Sync {
    /// Resize every camera's viewport (aspect follows)
    fn resize_all(&mut self, width: u32, height: u32);
}
