//! Error types for the Strata3D engine
//!
//! This module defines the error taxonomy used throughout the engine:
//! view-system registration and rendering failures, typed-message
//! validation, and scene/ECS errors.

use std::fmt;

/// Result type for Strata3D engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Strata3D engine errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Operation invoked before the owning subsystem was initialized
    NotInitialized,

    /// Null/invalid input, bad pass count, or missing required fields
    InvalidParameter(String),

    /// Registry or buffer capacity exhausted
    NoSlot(String),

    /// Stale or zero handle
    HandleInvalid(String),

    /// Backend reported failure constructing a renderpass, render target,
    /// pipeline, or texture
    ResourceCreationFailed(String),

    /// A pass names a renderpass that is not currently registered
    RenderpassUnavailable(String),

    /// Typed-message kind/version/payload mismatch (debug validation)
    MessageValidationFailed(String),

    /// The shadow layer did not respond; rendering continues without shadows
    ShadowDataUnavailable,

    /// Scene/ECS error
    Scene(SceneError),
}

/// Scene/ECS errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneError {
    /// Scene-local allocation failed
    AllocFailed,
    /// The ECS world could not be initialized
    WorldInitFailed,
    /// A component type could not be registered
    ComponentRegistrationFailed,
    /// The configured entity limit was reached
    EntityLimitReached,
    /// The entity handle is stale or was never allocated
    InvalidEntity,
    /// A mesh or geometry for a scene entity could not be created
    MeshLoadFailed,
    /// A component could not be added to an entity
    ComponentAddFailed,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::NotInitialized => write!(f, "Not initialized"),
            EngineError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            EngineError::NoSlot(msg) => write!(f, "No slot available: {}", msg),
            EngineError::HandleInvalid(msg) => write!(f, "Invalid handle: {}", msg),
            EngineError::ResourceCreationFailed(msg) => {
                write!(f, "Resource creation failed: {}", msg)
            }
            EngineError::RenderpassUnavailable(msg) => {
                write!(f, "Renderpass unavailable: {}", msg)
            }
            EngineError::MessageValidationFailed(msg) => {
                write!(f, "Message validation failed: {}", msg)
            }
            EngineError::ShadowDataUnavailable => write!(f, "Shadow data unavailable"),
            EngineError::Scene(err) => write!(f, "Scene error: {}", err),
        }
    }
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneError::AllocFailed => write!(f, "allocation failed"),
            SceneError::WorldInitFailed => write!(f, "world initialization failed"),
            SceneError::ComponentRegistrationFailed => {
                write!(f, "component registration failed")
            }
            SceneError::EntityLimitReached => write!(f, "entity limit reached"),
            SceneError::InvalidEntity => write!(f, "invalid entity"),
            SceneError::MeshLoadFailed => write!(f, "mesh load failed"),
            SceneError::ComponentAddFailed => write!(f, "component add failed"),
        }
    }
}

impl std::error::Error for EngineError {}
impl std::error::Error for SceneError {}

impl From<SceneError> for EngineError {
    fn from(err: SceneError) -> Self {
        EngineError::Scene(err)
    }
}

/// Construct an [`EngineError`] of the given kind with a formatted message.
///
/// # Example
///
/// ```ignore
/// return Err(engine_err!(InvalidParameter, "pass count {} exceeds {}", n, max));
/// ```
#[macro_export]
macro_rules! engine_err {
    ($kind:ident, $($arg:tt)*) => {
        $crate::error::EngineError::$kind(format!($($arg)*))
    };
}

/// Bail out of the current function with an [`EngineError`] of the given kind.
#[macro_export]
macro_rules! engine_bail {
    ($kind:ident, $($arg:tt)*) => {
        return Err($crate::engine_err!($kind, $($arg)*))
    };
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
