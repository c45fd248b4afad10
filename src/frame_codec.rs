//! APA102 wire framing: frame geometry and per-pixel encoding.
//!
//! A frame for a chain of `N` pixels is laid out as:
//!
//! ```text
//! offset         length        content
//! 0              4             start marker, all zero
//! 4              4 * N         pixel records [0b111_bbbbb, B, G, R]
//! 4 + 4 * N      trailer_len   clock-latch filler
//! ```
//!
//! Each LED delays the clock by half a cycle, so the trailer must carry at least
//! `(N + 1) / 2` extra clock edges. [`trailer_length`] rounds that up to whole 32-bit words.
//!
//! Everything here is pure: no state, no allocation.

use crate::color::{self, Argb};

/// Bytes in the start marker.
pub const START_LEN: usize = 4;
/// Bytes in one pixel record.
pub const PIXEL_LEN: usize = 4;
/// Highest APA102 global brightness.
pub const BRIGHTNESS_MAX: u8 = 31;
/// Low 5 bits of the first record byte.
pub const BRIGHTNESS_MASK: u8 = 0x1f;
/// Fixed top 3 bits of the first record byte.
pub const BRIGHTNESS_MARKER: u8 = 0xe0;
/// Trailer filler byte.
pub const TRAILER_FILL: u8 = 0x00;

const SUB_FLOOR: u8 = 1;
const SUB2_TRIGGER: u8 = 32;
const INV2_TRIGGER: u8 = 1;

/// Rule for combining a new colour with the record already in the frame.
///
/// The brightness byte follows the copy rule (`0b111 << 5 | brightness`) in every mode except
/// [`Add`](Self::Add) and [`Sub`](Self::Sub), which blend the old and new 5-bit brightness
/// with the same saturating rule as the colour channels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelMode {
    /// Overwrite.
    #[default]
    Copy,
    /// Saturating add (colour max 255, brightness max 31).
    Add,
    /// Subtract with a floor of 1.
    Sub,
    /// Subtract with a floor of 1 when the old channel is above 32, otherwise overwrite.
    Sub2,
    /// Bitwise XOR of the colour channels.
    Xor,
    /// `255 - old` when the old channel is above 1, otherwise overwrite.
    Inv2,
}

/// Bytes of clock-latch trailer for `pixel_count` pixels: one bit per two LEDs (plus one),
/// rounded up to a positive multiple of 4 bytes.
#[must_use]
pub const fn trailer_length(pixel_count: usize) -> usize {
    let latch_bits = (pixel_count + 1).div_ceil(2);
    let latch_bytes = latch_bits.div_ceil(8);
    latch_bytes.div_ceil(4) * 4
}

/// Offset of the first trailer byte.
#[must_use]
pub const fn trailer_offset(pixel_count: usize) -> usize {
    START_LEN + pixel_count * PIXEL_LEN
}

/// Total bytes of one transmissible frame.
#[must_use]
pub const fn frame_length(pixel_count: usize) -> usize {
    trailer_offset(pixel_count) + trailer_length(pixel_count)
}

/// Offset of pixel `index`'s record, or `None` when `index` is outside the chain.
#[must_use]
pub const fn pixel_offset(index: usize, pixel_count: usize) -> Option<usize> {
    if index < pixel_count {
        Some(START_LEN + index * PIXEL_LEN)
    } else {
        None
    }
}

/// The requested brightness when `alpha` is a valid level (0-31), otherwise `default`.
#[must_use]
pub const fn pick_brightness(alpha: u8, default: u8) -> u8 {
    if alpha <= BRIGHTNESS_MAX {
        alpha
    } else {
        default & BRIGHTNESS_MASK
    }
}

/// First record byte for a brightness level (clamped to 31).
#[must_use]
pub const fn brightness_byte(level: u8) -> u8 {
    let level = if level > BRIGHTNESS_MAX {
        BRIGHTNESS_MAX
    } else {
        level
    };
    BRIGHTNESS_MARKER | level
}

/// Record of a dark pixel.
pub const OFF_RECORD: [u8; PIXEL_LEN] = [BRIGHTNESS_MARKER, 0, 0, 0];

/// Combine `argb` with the record `old` according to `mode`.
///
/// The whole record is computed before anything is written back, so callers can store it
/// in one step.
///
/// ```rust
/// use apa102_display::color::Argb;
/// use apa102_display::frame_codec::{PixelMode, encode_pixel};
///
/// // Alpha 0xff is not a valid level, so the default brightness (8) is used.
/// let record = encode_pixel([0xe0, 0, 0, 0], Argb(0xff11_2233), 8, PixelMode::Copy);
/// assert_eq!(record, [0xe8, 0x33, 0x22, 0x11]);
/// ```
#[must_use]
pub fn encode_pixel(
    old: [u8; PIXEL_LEN],
    argb: Argb,
    default_brightness: u8,
    mode: PixelMode,
) -> [u8; PIXEL_LEN] {
    let new_brightness = pick_brightness(argb.a(), default_brightness);
    let copied_brightness = BRIGHTNESS_MARKER | new_brightness;
    let old_brightness = old[0] & BRIGHTNESS_MASK;
    let [_, old_b, old_g, old_r] = old;
    let (b, g, r) = (argb.b(), argb.g(), argb.r());

    match mode {
        PixelMode::Copy => [copied_brightness, b, g, r],
        PixelMode::Add => [
            BRIGHTNESS_MARKER | color::add(old_brightness, new_brightness, BRIGHTNESS_MAX),
            color::add(old_b, b, u8::MAX),
            color::add(old_g, g, u8::MAX),
            color::add(old_r, r, u8::MAX),
        ],
        PixelMode::Sub => [
            BRIGHTNESS_MARKER | color::sub(old_brightness, new_brightness, SUB_FLOOR),
            color::sub(old_b, b, SUB_FLOOR),
            color::sub(old_g, g, SUB_FLOOR),
            color::sub(old_r, r, SUB_FLOOR),
        ],
        PixelMode::Sub2 => [
            copied_brightness,
            color::sub_above(old_b, b, SUB_FLOOR, SUB2_TRIGGER),
            color::sub_above(old_g, g, SUB_FLOOR, SUB2_TRIGGER),
            color::sub_above(old_r, r, SUB_FLOOR, SUB2_TRIGGER),
        ],
        PixelMode::Xor => [copied_brightness, old_b ^ b, old_g ^ g, old_r ^ r],
        PixelMode::Inv2 => [
            copied_brightness,
            color::invert_above(old_b, b, INV2_TRIGGER),
            color::invert_above(old_g, g, INV2_TRIGGER),
            color::invert_above(old_r, r, INV2_TRIGGER),
        ],
    }
}

/// Read a record back: alpha is the 5-bit brightness, R/G/B from bytes 3/2/1.
#[must_use]
pub const fn decode_pixel(record: [u8; PIXEL_LEN]) -> Argb {
    Argb::new(record[0] & BRIGHTNESS_MASK, record[3], record[2], record[1])
}

/// Write the start marker, `pixel_count` dark records and the trailer into `frame`.
///
/// # Panics
///
/// Panics if `frame` is not exactly [`frame_length`]`(pixel_count)` bytes.
pub fn write_quiescent(frame: &mut [u8], pixel_count: usize) {
    assert_eq!(
        frame.len(),
        frame_length(pixel_count),
        "frame length does not match pixel count"
    );
    let (start, rest) = frame.split_at_mut(START_LEN);
    start.fill(0);
    let (pixels, trailer) = rest.split_at_mut(pixel_count * PIXEL_LEN);
    for record in pixels.chunks_exact_mut(PIXEL_LEN) {
        record.copy_from_slice(&OFF_RECORD);
    }
    trailer.fill(TRAILER_FILL);
}

/// Read the record at `offset`.
///
/// # Panics
///
/// Panics if the record does not fit in `frame`.
#[must_use]
pub fn read_record(frame: &[u8], offset: usize) -> [u8; PIXEL_LEN] {
    let mut record = [0; PIXEL_LEN];
    record.copy_from_slice(&frame[offset..offset + PIXEL_LEN]);
    record
}

/// Store `record` at `offset`.
///
/// # Panics
///
/// Panics if the record does not fit in `frame`.
pub fn write_record(frame: &mut [u8], offset: usize, record: [u8; PIXEL_LEN]) {
    frame[offset..offset + PIXEL_LEN].copy_from_slice(&record);
}
