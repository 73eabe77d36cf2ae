//! Avatar Codec
//!
//! Encodes and decodes the proprietary binary avatar representation.
//!
//! ## Wire format
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  percent-encoded ( base64 ( binary avatar buffer ) )         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  [7]  header (reserved)                                      │
//! │  [1]  layer count, stored as 2*N + 1                         │
//! │  [3]  reserved                                               │
//! │  if N > 0:                                                   │
//! │    [6]  reserved preamble                                    │
//! │    N shape records:                                          │
//! │      [1]  shape kind id                                      │
//! │      [4]  scale   (f32, big-endian)                          │
//! │      [4]  angle   (f32, big-endian)                          │
//! │      [4]  x       (f32, big-endian)                          │
//! │      [4]  y       (f32, big-endian)                          │
//! │      [1]  flip-x flag (1 = true)                             │
//! │      [1]  flip-y flag (1 = true)                             │
//! │      [1]  reserved                                           │
//! │      [3]  RGB color (big-endian)                             │
//! │      [5]  gap between consecutive records (not after last)   │
//! │  [3]  base RGB color (big-endian)                            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The reserved regions have no known meaning. The encoder re-emits them as
//! fixed constants so the server-visible layout is byte-stable; the decoder
//! skips them without interpretation.
//!
//! The same avatar also travels as a JSON object (`layers` + `bc`) inside
//! create/join/host-sync command payloads; the serde derives below produce
//! exactly that shape.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Base color of the default avatar.
pub const DEFAULT_BASE_COLOR: u32 = 4_492_031;

/// Reserved 7-byte header.
const HEADER: [u8; 7] = [0; 7];
/// Reserved 3 bytes following the layer count.
const POST_COUNT: [u8; 3] = [0; 3];
/// Reserved 6-byte preamble before the first shape record.
const LAYERS_PREAMBLE: [u8; 6] = [0; 6];
/// Reserved byte between the flip flags and the layer color.
const LAYER_RESERVED: u8 = 0;
/// Reserved gap between consecutive shape records.
const LAYER_GAP: [u8; 5] = [0; 5];

/// Forgiving base64 engine for avatar strings: accepts missing or excess
/// padding and nonzero trailing bits, matching the decoder the server's own
/// clients use.
const WIRE_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// One shape layer of an avatar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeLayer {
    /// Shape kind id.
    #[serde(rename = "id")]
    pub shape_id: u8,
    /// Uniform scale factor.
    pub scale: f32,
    /// Rotation angle.
    pub angle: f32,
    /// Horizontal offset.
    pub x: f32,
    /// Vertical offset.
    pub y: f32,
    /// Mirrored horizontally.
    #[serde(rename = "flipX")]
    pub flip_x: bool,
    /// Mirrored vertically.
    #[serde(rename = "flipY")]
    pub flip_y: bool,
    /// RGB layer color.
    pub color: u32,
}

/// A player avatar: an ordered stack of shape layers over a base color.
///
/// Immutable value type; equality is structural.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Avatar {
    /// Shape layers, bottom to top.
    #[serde(default)]
    pub layers: Vec<ShapeLayer>,
    /// Base (background) RGB color.
    #[serde(rename = "bc", default = "default_base_color")]
    pub base_color: u32,
}

fn default_base_color() -> u32 {
    DEFAULT_BASE_COLOR
}

impl Default for Avatar {
    fn default() -> Self {
        Self::blank()
    }
}

/// Avatar codec failure. Decoding fails closed: no partial avatar is ever
/// produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AvatarError {
    /// The buffer ended before the declared shape count was satisfied.
    #[error("avatar buffer truncated at byte {offset}: {needed} more byte(s) needed")]
    Truncated {
        /// Byte offset the read started at.
        offset: usize,
        /// How many bytes the read still needed.
        needed: usize,
    },

    /// The string wrapper is not valid percent-encoded base64.
    #[error("avatar string is not valid percent-encoded base64")]
    InvalidEncoding,
}

impl Avatar {
    /// The blank avatar: no layers, default base color.
    pub fn blank() -> Self {
        Avatar {
            layers: Vec::new(),
            base_color: DEFAULT_BASE_COLOR,
        }
    }

    /// Decode an avatar from its percent-encoded base64 string form.
    pub fn from_wire(encoded: &str) -> Result<Avatar, AvatarError> {
        // `+` means space in this encoding; real plus signs arrive as %2B.
        let plus_replaced = encoded.replace('+', " ");
        let unquoted = urlencoding::decode(&plus_replaced)
            .map_err(|_| AvatarError::InvalidEncoding)?;
        // The upstream decoder discards anything outside the base64
        // alphabet (including the padding it re-appends blindly), so
        // normalize before the strict decode.
        let cleaned: String = unquoted
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '+' || *c == '/')
            .collect();
        let bytes = WIRE_BASE64
            .decode(cleaned.as_bytes())
            .map_err(|_| AvatarError::InvalidEncoding)?;
        Avatar::decode(&bytes)
    }

    /// Encode this avatar into its percent-encoded base64 string form.
    pub fn to_wire(&self) -> String {
        let b64 = WIRE_BASE64.encode(self.encode());
        urlencoding::encode(&b64).into_owned()
    }

    /// Decode an avatar from a raw binary buffer.
    pub fn decode(buf: &[u8]) -> Result<Avatar, AvatarError> {
        let mut r = Reader::new(buf);

        r.skip(HEADER.len())?;
        let declared = r.u8()?;
        // Stored as 2*N + 1; a zero byte floors to no layers.
        let layer_count = ((i32::from(declared) - 1).max(0) / 2) as usize;
        r.skip(POST_COUNT.len())?;

        let mut layers = Vec::with_capacity(layer_count);
        if layer_count > 0 {
            r.skip(LAYERS_PREAMBLE.len())?;
            for i in 0..layer_count {
                let shape_id = r.u8()?;
                let scale = r.f32_be()?;
                let angle = r.f32_be()?;
                let x = r.f32_be()?;
                let y = r.f32_be()?;
                let flip_x = r.u8()? == 1;
                let flip_y = r.u8()? == 1;
                r.skip(1)?;
                let color = r.u24_be()?;
                layers.push(ShapeLayer {
                    shape_id,
                    scale,
                    angle,
                    x,
                    y,
                    flip_x,
                    flip_y,
                    color,
                });
                if i != layer_count - 1 {
                    r.skip(LAYER_GAP.len())?;
                }
            }
        }

        let base_color = r.u24_be()?;
        Ok(Avatar { layers, base_color })
    }

    /// Encode this avatar into its raw binary buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&HEADER);
        out.push((self.layers.len() * 2 + 1) as u8);
        out.extend_from_slice(&POST_COUNT);
        if !self.layers.is_empty() {
            out.extend_from_slice(&LAYERS_PREAMBLE);
            for (i, layer) in self.layers.iter().enumerate() {
                out.push(layer.shape_id);
                out.extend_from_slice(&layer.scale.to_be_bytes());
                out.extend_from_slice(&layer.angle.to_be_bytes());
                out.extend_from_slice(&layer.x.to_be_bytes());
                out.extend_from_slice(&layer.y.to_be_bytes());
                out.push(u8::from(layer.flip_x));
                out.push(u8::from(layer.flip_y));
                out.push(LAYER_RESERVED);
                out.extend_from_slice(&u24_be(layer.color));
                if i != self.layers.len() - 1 {
                    out.extend_from_slice(&LAYER_GAP);
                }
            }
        }
        out.extend_from_slice(&u24_be(self.base_color));
        out
    }
}

fn u24_be(color: u32) -> [u8; 3] {
    let c = color & 0x00FF_FFFF;
    [(c >> 16) as u8, (c >> 8) as u8, c as u8]
}

/// Bounds-checked cursor over the avatar buffer.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], AvatarError> {
        let remaining = self.buf.len() - self.pos;
        if remaining < count {
            return Err(AvatarError::Truncated {
                offset: self.pos,
                needed: count - remaining,
            });
        }
        let slice = &self.buf[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    fn skip(&mut self, count: usize) -> Result<(), AvatarError> {
        self.take(count).map(|_| ())
    }

    fn u8(&mut self) -> Result<u8, AvatarError> {
        Ok(self.take(1)?[0])
    }

    fn f32_be(&mut self) -> Result<f32, AvatarError> {
        let b = self.take(4)?;
        Ok(f32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u24_be(&mut self) -> Result<u32, AvatarError> {
        let b = self.take(3)?;
        Ok(u32::from(b[0]) << 16 | u32::from(b[1]) << 8 | u32::from(b[2]))
    }
}
