//! Pooled-buffer APA102 LED chain driver with a 2-D panel layer.
//!
//! The application edits one frame while a background thread streams earlier frames to the
//! bus, so drawing never waits on SPI unless every buffer is in use.
//!
//! # Glossary
//!
//! - **APA102:** addressable RGB LED with a 5-bit global brightness, clocked over SPI-style
//!   data and clock lines.
//! - **Frame:** the bytes for one full update of the chain: start marker, one 4-byte record
//!   per LED, trailer. See [`frame_codec`].
//! - **Pixel mode:** how a new colour combines with the record already in the frame. See
//!   [`frame_codec::PixelMode`].
//! - **Panel / anchor:** a rigid LED board wired zig-zag from one corner. See [`panel`].
//!
//! # Example
//!
//! ```rust
//! use apa102_display::color::Argb;
//! use apa102_display::frame_codec::PixelMode;
//! use apa102_display::pipeline::FramePipeline;
//! use apa102_display::transport::CaptureTransport;
//!
//! # fn main() -> apa102_display::Result<()> {
//! let capture = CaptureTransport::new();
//! let mut leds = FramePipeline::with_transport(4, 31, capture.clone())?;
//! for index in 0..4 {
//!     leds.begin_frame(true)?;
//!     leds.set_pixel(index, Argb(0xff00_ff00), PixelMode::Copy)?;
//!     leds.finish_frame()?;
//! }
//! leds.shutdown()?;
//! assert_eq!(capture.frame_count(), 4);
//! # Ok(())
//! # }
//! ```

pub mod bounded_queue;
pub mod color;
pub mod config;
pub mod display;
mod error;
pub mod frame_codec;
pub mod hex_dump;
pub mod larson;
pub mod panel;
pub mod pipeline;
pub mod transport;

// Re-export error types and result (used throughout)
pub use crate::error::{Error, Result};
