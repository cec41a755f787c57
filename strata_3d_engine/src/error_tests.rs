use super::*;

#[test]
fn test_display_not_initialized() {
    assert_eq!(EngineError::NotInitialized.to_string(), "Not initialized");
}

#[test]
fn test_display_with_context() {
    let err = EngineError::InvalidParameter("pass count 0".to_string());
    assert_eq!(err.to_string(), "Invalid parameter: pass count 0");

    let err = EngineError::RenderpassUnavailable("builtin.world".to_string());
    assert_eq!(err.to_string(), "Renderpass unavailable: builtin.world");
}

#[test]
fn test_display_scene_error() {
    let err = EngineError::Scene(SceneError::EntityLimitReached);
    assert_eq!(err.to_string(), "Scene error: entity limit reached");
}

#[test]
fn test_scene_error_converts() {
    fn fails() -> Result<()> {
        Err(SceneError::InvalidEntity)?
    }
    assert_eq!(fails(), Err(EngineError::Scene(SceneError::InvalidEntity)));
}

#[test]
fn test_engine_err_macro_formats() {
    let err = engine_err!(NoSlot, "layer table full ({} slots)", 16);
    assert_eq!(err, EngineError::NoSlot("layer table full (16 slots)".to_string()));
}

#[test]
fn test_engine_bail_macro_returns_early() {
    fn bails(fail: bool) -> Result<u32> {
        if fail {
            engine_bail!(HandleInvalid, "stale handle");
        }
        Ok(7)
    }
    assert_eq!(bails(false), Ok(7));
    assert_eq!(
        bails(true),
        Err(EngineError::HandleInvalid("stale handle".to_string()))
    );
}
