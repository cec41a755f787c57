use super::*;

// ============================================================================
// Tests: wire layout
// ============================================================================

#[test]
fn test_header_sizes_are_sixteen_bytes() {
    assert_eq!(std::mem::size_of::<MessageHeader>(), MESSAGE_HEADER_SIZE);
    assert_eq!(std::mem::size_of::<ResponseHeader>(), RESPONSE_HEADER_SIZE);
}

#[test]
fn test_kind_constants() {
    assert_eq!(MSG_UI_TEXT_CREATE, 100);
    assert_eq!(MSG_UI_TEXT_UPDATE, 101);
    assert_eq!(MSG_UI_TEXT_DESTROY, 102);
    assert_eq!(MSG_WORLD_TEXT_CREATE, 200);
    assert_eq!(MSG_WORLD_TEXT_UPDATE, 201);
    assert_eq!(MSG_WORLD_TEXT_SET_TRANSFORM, 202);
    assert_eq!(MSG_WORLD_TEXT_DESTROY, 203);
    assert_eq!(MSG_WORLD_TOGGLE_OFFSCREEN, 204);
    assert_eq!(MSG_WORLD_SET_OFFSCREEN_SIZE, 205);
    assert_eq!(MSG_EDITOR_GET_VIEWPORT_MAPPING, 300);
    assert_eq!(MSG_EDITOR_SET_VIEWPORT_FIT_MODE, 301);
    assert_eq!(MSG_EDITOR_SET_RENDER_SCALE, 302);
    assert_eq!(MSG_FLAG_EXPECTS_RESPONSE, 1);
    assert_eq!(MSG_FLAG_DEBUG_ONLY, 2);
}

#[test]
fn test_header_byte_layout() {
    let msg = Message::with_payload(
        MSG_WORLD_SET_OFFSCREEN_SIZE,
        &OffscreenSizePayload { width: 960, height: 540 },
    );
    let bytes = msg.as_bytes();

    // kind: u32 LE at offset 0
    assert_eq!(&bytes[0..4], &205u32.to_le_bytes());
    // version: u16 LE at offset 4
    assert_eq!(&bytes[4..6], &MESSAGE_VERSION.to_le_bytes());
    // payload_size: u16 LE at offset 6
    assert_eq!(&bytes[6..8], &8u16.to_le_bytes());
    // flags: u32 LE at offset 8
    assert_eq!(&bytes[8..12], &0u32.to_le_bytes());
    // payload begins at the header size
    assert_eq!(&bytes[MESSAGE_HEADER_SIZE..MESSAGE_HEADER_SIZE + 4], &960u32.to_le_bytes());
}

// ============================================================================
// Tests: message construction and payload access
// ============================================================================

#[test]
fn test_payload_roundtrip() {
    let payload = OffscreenSizePayload { width: 960, height: 540 };
    let msg = Message::with_payload(MSG_WORLD_SET_OFFSCREEN_SIZE, &payload);

    assert_eq!(msg.kind(), MSG_WORLD_SET_OFFSCREEN_SIZE);
    assert_eq!(msg.payload::<OffscreenSizePayload>(), Some(payload));
}

#[test]
fn test_payload_size_mismatch_returns_none() {
    let msg = Message::with_payload(
        MSG_WORLD_SET_OFFSCREEN_SIZE,
        &OffscreenSizePayload { width: 1, height: 2 },
    );
    assert!(msg.payload::<FitModePayload>().is_none());
}

#[test]
fn test_expect_response_sets_flag() {
    let msg = Message::new(MSG_EDITOR_GET_VIEWPORT_MAPPING).expect_response();
    assert_eq!(msg.flags() & MSG_FLAG_EXPECTS_RESPONSE, MSG_FLAG_EXPECTS_RESPONSE);
}

#[test]
fn test_empty_message_has_no_payload() {
    let msg = Message::new(MSG_WORLD_TOGGLE_OFFSCREEN);
    assert!(msg.payload_bytes().is_empty());
    assert_eq!(msg.header().payload_size, 0);
}

// ============================================================================
// Tests: validation
// ============================================================================

#[test]
fn test_validate_accepts_registered_kinds() {
    let msg = Message::with_payload(
        MSG_WORLD_SET_OFFSCREEN_SIZE,
        &OffscreenSizePayload { width: 1, height: 1 },
    );
    assert!(msg.validate().is_ok());

    let msg = Message::new(MSG_WORLD_TOGGLE_OFFSCREEN);
    assert!(msg.validate().is_ok());
}

#[test]
fn test_validate_rejects_unknown_kind() {
    let msg = Message::new(9999);
    assert!(msg.validate().is_err());
}

#[test]
fn test_validate_rejects_wrong_payload_size() {
    // FitModePayload (4 bytes) sent under a kind registered at 8 bytes
    let msg = Message::with_payload(MSG_WORLD_SET_OFFSCREEN_SIZE, &FitModePayload { fit_mode: 0 });
    assert!(msg.validate().is_err());
}

#[test]
fn test_metadata_matches_payload_structs() {
    let meta = message_meta(MSG_WORLD_TEXT_CREATE).unwrap();
    assert_eq!(meta.payload_size as usize, std::mem::size_of::<WorldTextCreatePayload>());
    assert_eq!(meta.version, MESSAGE_VERSION);

    let meta = message_meta(MSG_EDITOR_GET_VIEWPORT_MAPPING).unwrap();
    assert_eq!(meta.payload_size, 0);

    assert!(message_meta(777).is_none());
}

// ============================================================================
// Tests: response buffer
// ============================================================================

#[test]
fn test_response_roundtrip() {
    let mut rsp = ResponseBuffer::new(std::mem::size_of::<TextIdResponse>());
    assert!(!rsp.has_response());

    assert!(rsp.write(MSG_WORLD_TEXT_CREATE, 0, &TextIdResponse { text_id: 5 }));
    assert!(rsp.has_response());

    let header = rsp.header().unwrap();
    assert_eq!(header.kind, MSG_WORLD_TEXT_CREATE);
    assert_eq!(header.error, 0);
    assert_eq!(header.data_size as usize, std::mem::size_of::<TextIdResponse>());
    assert_eq!(rsp.body::<TextIdResponse>().unwrap().text_id, 5);
}

#[test]
fn test_response_single_writer() {
    let mut rsp = ResponseBuffer::new(16);
    assert!(rsp.write(MSG_WORLD_TEXT_CREATE, 0, &TextIdResponse { text_id: 1 }));
    // A second write (e.g. a behavior after the layer) is refused
    assert!(!rsp.write(MSG_WORLD_TEXT_CREATE, 0, &TextIdResponse { text_id: 2 }));
    assert_eq!(rsp.body::<TextIdResponse>().unwrap().text_id, 1);
}

#[test]
fn test_response_respects_capacity() {
    let mut rsp = ResponseBuffer::new(0);
    assert!(!rsp.write(MSG_WORLD_TEXT_CREATE, 0, &TextIdResponse { text_id: 1 }));
    assert!(rsp.write_empty(MSG_WORLD_TEXT_CREATE, 3));
    assert_eq!(rsp.error(), Some(3));
}

#[test]
fn test_response_error_code() {
    let mut rsp = ResponseBuffer::new(8);
    rsp.write_empty(MSG_WORLD_TEXT_DESTROY, 7);
    assert_eq!(rsp.error(), Some(7));
    assert!(rsp.body::<TextIdResponse>().is_none());
}

// ============================================================================
// Tests: text packing
// ============================================================================

#[test]
fn test_pack_unpack_text() {
    let (bytes, len) = pack_text("hello world");
    assert_eq!(len, 11);
    assert_eq!(unpack_text(&bytes, len), "hello world");
}

#[test]
fn test_pack_text_truncates_at_char_boundary() {
    // 61 two-byte chars = 122 bytes; must truncate to 120 on a boundary
    let text = "é".repeat(61);
    let (bytes, len) = pack_text(&text);
    assert!(len as usize <= TEXT_CONTENT_MAX);
    assert_eq!(len % 2, 0);
    let unpacked = unpack_text(&bytes, len);
    assert_eq!(unpacked, "é".repeat(60));
}

// ============================================================================
// Tests: shadow request helpers
// ============================================================================

#[test]
fn test_shadow_frame_request_shape() {
    let msg = shadow_frame_request(2);
    assert_eq!(msg.kind(), MSG_SHADOW_GET_FRAME_DATA);
    assert_ne!(msg.flags() & MSG_FLAG_EXPECTS_RESPONSE, 0);
    assert_eq!(msg.payload::<ShadowFrameQuery>().unwrap().image_index, 2);
    assert!(msg.validate().is_ok());
}
