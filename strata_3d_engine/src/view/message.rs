/// Typed message protocol between layers.
///
/// A message is a contiguous record beginning with a 16-byte header
/// followed by a plain-data payload; responses start with a 16-byte
/// response header. The layout is bit-exact so records could cross
/// process boundaries unchanged. Kind metadata (version + payload size)
/// is validated in debug builds before a handler runs.

use bytemuck::{Pod, Zeroable};
use crate::error::Result;
use crate::engine_err;
use crate::renderer::pipelines::ShadowFrameData;

// ===== MESSAGE KINDS =====

// UI layer: 100..
pub const MSG_UI_TEXT_CREATE: u32 = 100;
pub const MSG_UI_TEXT_UPDATE: u32 = 101;
pub const MSG_UI_TEXT_DESTROY: u32 = 102;
pub const MSG_UI_SET_OFFSCREEN_TARGETS: u32 = 103;

// World layer: 200..
pub const MSG_WORLD_TEXT_CREATE: u32 = 200;
pub const MSG_WORLD_TEXT_UPDATE: u32 = 201;
pub const MSG_WORLD_TEXT_SET_TRANSFORM: u32 = 202;
pub const MSG_WORLD_TEXT_DESTROY: u32 = 203;
pub const MSG_WORLD_TOGGLE_OFFSCREEN: u32 = 204;
pub const MSG_WORLD_SET_OFFSCREEN_SIZE: u32 = 205;

// Editor layer: 300..
pub const MSG_EDITOR_GET_VIEWPORT_MAPPING: u32 = 300;
pub const MSG_EDITOR_SET_VIEWPORT_FIT_MODE: u32 = 301;
pub const MSG_EDITOR_SET_RENDER_SCALE: u32 = 302;

// Shadow layer: 400..
pub const MSG_SHADOW_GET_FRAME_DATA: u32 = 400;

// Skybox layer: 500..
pub const MSG_SKYBOX_SET_OFFSCREEN_TARGETS: u32 = 500;

// ===== FLAGS =====

/// The caller provided a response buffer
pub const MSG_FLAG_EXPECTS_RESPONSE: u32 = 1;
/// The message only exists in debug builds
pub const MSG_FLAG_DEBUG_ONLY: u32 = 2;

/// Protocol version carried by every header
pub const MESSAGE_VERSION: u16 = 1;

/// Bytes occupied by [`MessageHeader`]
pub const MESSAGE_HEADER_SIZE: usize = 16;

/// Bytes occupied by [`ResponseHeader`]
pub const RESPONSE_HEADER_SIZE: usize = 16;

/// Maximum UTF-8 bytes carried in a text payload
pub const TEXT_CONTENT_MAX: usize = 120;

/// Maximum swapchain images an offscreen-targets payload can describe
pub const MAX_SWAPCHAIN_IMAGES: usize = 8;

// ===== HEADERS =====

/// Wire header at offset 0 of every message (16 bytes, little-endian fields)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct MessageHeader {
    pub kind: u32,
    pub version: u16,
    pub payload_size: u16,
    pub flags: u32,
    pub _reserved: u32,
}

/// Wire header at offset 0 of every response (16 bytes)
///
/// `error == 0` means success.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct ResponseHeader {
    pub kind: u32,
    pub version: u16,
    pub data_size: u16,
    pub error: u32,
    pub _reserved: u32,
}

// ===== PAYLOADS =====

/// `UI_TEXT_CREATE` payload; response is [`TextIdResponse`]
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct UiTextCreatePayload {
    pub text: [u8; TEXT_CONTENT_MAX],
    pub text_len: u32,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub color: [f32; 4],
}

/// `UI_TEXT_UPDATE` payload
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct UiTextUpdatePayload {
    pub text_id: u32,
    pub text_len: u32,
    pub text: [u8; TEXT_CONTENT_MAX],
    pub size: f32,
    pub color: [f32; 4],
}

/// `UI_TEXT_DESTROY` payload
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct UiTextDestroyPayload {
    pub text_id: u32,
}

/// Response body carrying an assigned text id
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TextIdResponse {
    pub text_id: u32,
}

/// `WORLD_TEXT_CREATE` payload; response is [`TextIdResponse`]
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct WorldTextCreatePayload {
    pub text: [u8; TEXT_CONTENT_MAX],
    pub text_len: u32,
    pub size: f32,
    pub color: [f32; 4],
    /// World transform, column-major
    pub transform: [f32; 16],
}

/// `WORLD_TEXT_UPDATE` payload
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct WorldTextUpdatePayload {
    pub slot: u32,
    pub text_len: u32,
    pub text: [u8; TEXT_CONTENT_MAX],
    pub size: f32,
    pub color: [f32; 4],
}

/// `WORLD_TEXT_SET_TRANSFORM` payload
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct WorldTextSetTransformPayload {
    pub slot: u32,
    pub _pad: [u32; 3],
    /// World transform, column-major
    pub transform: [f32; 16],
}

/// `WORLD_TEXT_DESTROY` payload
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct WorldTextDestroyPayload {
    pub slot: u32,
}

/// `WORLD_SET_OFFSCREEN_SIZE` payload
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct OffscreenSizePayload {
    pub width: u32,
    pub height: u32,
}

/// `UI_SET_OFFSCREEN_TARGETS` / `SKYBOX_SET_OFFSCREEN_TARGETS` payload.
///
/// Handles travel as raw `(id, generation)` pairs.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct OffscreenTargetsPayload {
    pub enabled: u32,
    pub width: u32,
    pub height: u32,
    pub image_count: u32,
    pub color_attachments: [[u32; 2]; MAX_SWAPCHAIN_IMAGES],
    pub renderpass: [u32; 2],
    pub _pad: [u32; 2],
}

/// `EDITOR_SET_VIEWPORT_FIT_MODE` payload
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct FitModePayload {
    pub fit_mode: u32,
}

/// `EDITOR_SET_RENDER_SCALE` payload
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct RenderScalePayload {
    pub scale: f32,
}

/// `EDITOR_GET_VIEWPORT_MAPPING` response body
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct ViewportMappingResponse {
    /// Panel rectangle as (x, y, width, height) in window pixels
    pub panel_rect: [i32; 4],
    /// Image rectangle as (x, y, width, height) in window pixels
    pub image_rect: [i32; 4],
    pub target_width: u32,
    pub target_height: u32,
    pub fit_mode: u32,
    pub _pad: u32,
}

/// `SHADOW_GET_FRAME_DATA` payload; response body is
/// [`ShadowFrameData`](crate::renderer::ShadowFrameData)
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ShadowFrameQuery {
    pub image_index: u32,
}

// ===== TEXT HELPERS =====

/// Pack a string into a fixed text field, truncating at a char boundary
pub fn pack_text(text: &str) -> ([u8; TEXT_CONTENT_MAX], u32) {
    let mut out = [0u8; TEXT_CONTENT_MAX];
    let mut len = text.len().min(TEXT_CONTENT_MAX);
    while len > 0 && !text.is_char_boundary(len) {
        len -= 1;
    }
    out[..len].copy_from_slice(&text.as_bytes()[..len]);
    (out, len as u32)
}

/// Recover a string from a fixed text field
pub fn unpack_text(bytes: &[u8; TEXT_CONTENT_MAX], len: u32) -> String {
    let len = (len as usize).min(TEXT_CONTENT_MAX);
    String::from_utf8_lossy(&bytes[..len]).into_owned()
}

// ===== KIND METADATA =====

/// Registered metadata for a message kind
#[derive(Debug, Clone, Copy)]
pub struct MessageMeta {
    pub kind: u32,
    pub version: u16,
    pub payload_size: u16,
}

const fn meta(kind: u32, payload_size: usize) -> MessageMeta {
    MessageMeta {
        kind,
        version: MESSAGE_VERSION,
        payload_size: payload_size as u16,
    }
}

static MESSAGE_METAS: &[MessageMeta] = &[
    meta(MSG_UI_TEXT_CREATE, std::mem::size_of::<UiTextCreatePayload>()),
    meta(MSG_UI_TEXT_UPDATE, std::mem::size_of::<UiTextUpdatePayload>()),
    meta(MSG_UI_TEXT_DESTROY, std::mem::size_of::<UiTextDestroyPayload>()),
    meta(MSG_UI_SET_OFFSCREEN_TARGETS, std::mem::size_of::<OffscreenTargetsPayload>()),
    meta(MSG_WORLD_TEXT_CREATE, std::mem::size_of::<WorldTextCreatePayload>()),
    meta(MSG_WORLD_TEXT_UPDATE, std::mem::size_of::<WorldTextUpdatePayload>()),
    meta(MSG_WORLD_TEXT_SET_TRANSFORM, std::mem::size_of::<WorldTextSetTransformPayload>()),
    meta(MSG_WORLD_TEXT_DESTROY, std::mem::size_of::<WorldTextDestroyPayload>()),
    meta(MSG_WORLD_TOGGLE_OFFSCREEN, 0),
    meta(MSG_WORLD_SET_OFFSCREEN_SIZE, std::mem::size_of::<OffscreenSizePayload>()),
    meta(MSG_EDITOR_GET_VIEWPORT_MAPPING, 0),
    meta(MSG_EDITOR_SET_VIEWPORT_FIT_MODE, std::mem::size_of::<FitModePayload>()),
    meta(MSG_EDITOR_SET_RENDER_SCALE, std::mem::size_of::<RenderScalePayload>()),
    meta(MSG_SHADOW_GET_FRAME_DATA, std::mem::size_of::<ShadowFrameQuery>()),
    meta(MSG_SKYBOX_SET_OFFSCREEN_TARGETS, std::mem::size_of::<OffscreenTargetsPayload>()),
];

/// Look up registered metadata for a kind
pub fn message_meta(kind: u32) -> Option<&'static MessageMeta> {
    MESSAGE_METAS.iter().find(|m| m.kind == kind)
}

// ===== MESSAGE =====

/// An owned wire message: header + payload in one buffer.
#[derive(Debug, Clone)]
pub struct Message {
    bytes: Vec<u8>,
}

impl Message {
    fn build(kind: u32, flags: u32, payload: &[u8]) -> Self {
        let version = message_meta(kind).map(|m| m.version).unwrap_or(MESSAGE_VERSION);
        let header = MessageHeader {
            kind,
            version,
            payload_size: payload.len() as u16,
            flags,
            _reserved: 0,
        };
        let mut bytes = Vec::with_capacity(MESSAGE_HEADER_SIZE + payload.len());
        bytes.extend_from_slice(bytemuck::bytes_of(&header));
        bytes.extend_from_slice(payload);
        Self { bytes }
    }

    /// Build a payload-less message
    pub fn new(kind: u32) -> Self {
        Self::build(kind, 0, &[])
    }

    /// Build a message carrying a plain-data payload
    pub fn with_payload<T: Pod>(kind: u32, payload: &T) -> Self {
        Self::build(kind, 0, bytemuck::bytes_of(payload))
    }

    /// Mark the message as expecting a response
    pub fn expect_response(mut self) -> Self {
        let mut header = self.header();
        header.flags |= MSG_FLAG_EXPECTS_RESPONSE;
        self.bytes[..MESSAGE_HEADER_SIZE].copy_from_slice(bytemuck::bytes_of(&header));
        self
    }

    /// The wire header
    pub fn header(&self) -> MessageHeader {
        bytemuck::pod_read_unaligned(&self.bytes[..MESSAGE_HEADER_SIZE])
    }

    /// Message kind
    pub fn kind(&self) -> u32 {
        self.header().kind
    }

    /// Message flags
    pub fn flags(&self) -> u32 {
        self.header().flags
    }

    /// Raw payload bytes (after the header)
    pub fn payload_bytes(&self) -> &[u8] {
        &self.bytes[MESSAGE_HEADER_SIZE..]
    }

    /// Read the payload as `T`, or None on size mismatch
    pub fn payload<T: Pod>(&self) -> Option<T> {
        let bytes = self.payload_bytes();
        if bytes.len() != std::mem::size_of::<T>() {
            return None;
        }
        Some(bytemuck::pod_read_unaligned(bytes))
    }

    /// Whole record, header included
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Check the header against registered kind metadata.
    ///
    /// Dispatch runs this in debug builds and refuses to invoke handlers
    /// on mismatch.
    pub fn validate(&self) -> Result<()> {
        let header = self.header();
        let Some(meta) = message_meta(header.kind) else {
            return Err(engine_err!(
                MessageValidationFailed,
                "kind {} has no registered metadata",
                header.kind
            ));
        };
        if header.version != meta.version {
            return Err(engine_err!(
                MessageValidationFailed,
                "kind {} version {} != registered {}",
                header.kind,
                header.version,
                meta.version
            ));
        }
        if header.payload_size != meta.payload_size
            || self.payload_bytes().len() != meta.payload_size as usize
        {
            return Err(engine_err!(
                MessageValidationFailed,
                "kind {} payload {} != registered {}",
                header.kind,
                header.payload_size,
                meta.payload_size
            ));
        }
        Ok(())
    }
}

// ===== RESPONSE BUFFER =====

/// Caller-provided buffer a handler writes a typed response into.
///
/// At most one response can be written; behaviors may only respond when
/// the layer itself did not.
#[derive(Debug)]
pub struct ResponseBuffer {
    bytes: Vec<u8>,
    capacity: usize,
}

impl ResponseBuffer {
    /// Create a buffer able to hold a header plus `body_capacity` bytes
    pub fn new(body_capacity: usize) -> Self {
        Self {
            bytes: Vec::new(),
            capacity: RESPONSE_HEADER_SIZE + body_capacity,
        }
    }

    /// Whether a handler has written a response
    pub fn has_response(&self) -> bool {
        !self.bytes.is_empty()
    }

    /// Total bytes written
    pub fn response_size(&self) -> usize {
        self.bytes.len()
    }

    fn write_bytes(&mut self, kind: u32, error: u32, body: &[u8]) -> bool {
        if self.has_response() {
            return false;
        }
        let total = RESPONSE_HEADER_SIZE + body.len();
        if total > self.capacity {
            return false;
        }
        let header = ResponseHeader {
            kind,
            version: MESSAGE_VERSION,
            data_size: body.len() as u16,
            error,
            _reserved: 0,
        };
        self.bytes.extend_from_slice(bytemuck::bytes_of(&header));
        self.bytes.extend_from_slice(body);
        true
    }

    /// Write a response with a plain-data body
    pub fn write<T: Pod>(&mut self, kind: u32, error: u32, body: &T) -> bool {
        self.write_bytes(kind, error, bytemuck::bytes_of(body))
    }

    /// Write a body-less response (status only)
    pub fn write_empty(&mut self, kind: u32, error: u32) -> bool {
        self.write_bytes(kind, error, &[])
    }

    /// The response header, if written
    pub fn header(&self) -> Option<ResponseHeader> {
        if self.bytes.len() < RESPONSE_HEADER_SIZE {
            return None;
        }
        Some(bytemuck::pod_read_unaligned(&self.bytes[..RESPONSE_HEADER_SIZE]))
    }

    /// The response error code, if written
    pub fn error(&self) -> Option<u32> {
        self.header().map(|h| h.error)
    }

    /// Read the response body as `T`
    pub fn body<T: Pod>(&self) -> Option<T> {
        let header = self.header()?;
        let body = &self.bytes[RESPONSE_HEADER_SIZE..];
        if header.data_size as usize != body.len() || body.len() != std::mem::size_of::<T>() {
            return None;
        }
        Some(bytemuck::pod_read_unaligned(body))
    }
}

/// Convenience: request shadow frame data as a prepared message
pub fn shadow_frame_request(image_index: u32) -> Message {
    Message::with_payload(MSG_SHADOW_GET_FRAME_DATA, &ShadowFrameQuery { image_index })
        .expect_response()
}

/// Convenience: a response buffer sized for shadow frame data
pub fn shadow_frame_response_buffer() -> ResponseBuffer {
    ResponseBuffer::new(std::mem::size_of::<ShadowFrameData>())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
