//! Scanner ("Larson") light sweep for LED strips.
//!
//! A bright head runs along the strip followed by a tail that fades out exponentially. The head
//! and tail colours drift between random palette colours while the scanner moves.
//!
//! Several scanners can render into the same frame; with [`PixelMode::Xor`] or
//! [`PixelMode::Add`] they blend where they cross.

use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::Rng;

use crate::color::{self, Argb, ColorChange};
use crate::frame_codec::PixelMode;
use crate::pipeline::FramePipeline;
use crate::transport::BusTransport;
use crate::{Error, Result};

/// Brightness of the head on the fall-off curve; the tail ends near 1% of it.
const HEAD_LEVEL: u32 = 1000;

/// How a [`Larson`] scanner looks and moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LarsonSettings {
    /// LEDs in the strip.
    pub pixels: usize,
    /// LEDs covered by head and tail.
    pub length: usize,
    /// Starting head position.
    pub position: i64,
    /// Initial direction (towards higher indices when `true`).
    pub forward: bool,
    /// Reverse at the ends instead of wrapping to the start.
    pub bidirectional: bool,
    /// LEDs moved per update.
    pub speed: i64,
    /// Initial head colour.
    pub color: Argb,
    /// Minimum time between two moves.
    pub frame_interval: Duration,
    /// How the scanner combines with what is already in the frame.
    pub mode: PixelMode,
}

impl Default for LarsonSettings {
    fn default() -> Self {
        Self {
            pixels: 146,
            length: 8,
            position: 0,
            forward: true,
            bidirectional: true,
            speed: 1,
            color: Argb(0xffff_0000),
            frame_interval: Duration::from_millis(25),
            mode: PixelMode::Copy,
        }
    }
}

/// A running scanner.
///
/// ```rust
/// use std::time::Duration;
/// use apa102_display::larson::{Larson, LarsonSettings};
///
/// # fn main() -> apa102_display::Result<()> {
/// let settings = LarsonSettings {
///     pixels: 10,
///     length: 3,
///     frame_interval: Duration::from_millis(10),
///     ..LarsonSettings::default()
/// };
/// let mut larson = Larson::with_seed(settings, 7)?;
///
/// assert!(larson.update(Duration::ZERO)); // first update always moves
/// assert_eq!(larson.position(), 1);
/// assert!(!larson.update(Duration::from_millis(5)));
/// assert!(larson.update(Duration::from_millis(10)));
/// assert_eq!(larson.position(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Larson<R = StdRng> {
    settings: LarsonSettings,
    position: i64,
    forward: bool,
    brightness: Vec<u32>,
    head: ColorChange,
    tail: ColorChange,
    last_update: Option<Duration>,
    rng: R,
}

impl Larson<StdRng> {
    /// Scanner with a deterministic colour sequence.
    ///
    /// # Errors
    ///
    /// As [`Larson::new`].
    pub fn with_seed(settings: LarsonSettings, seed: u64) -> Result<Self> {
        Self::new(settings, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Larson<R> {
    /// Start a scanner drawing its colours from `rng`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] when `pixels` or `length` is zero.
    pub fn new(settings: LarsonSettings, mut rng: R) -> Result<Self> {
        if settings.pixels == 0 || settings.length == 0 {
            return Err(Error::InvalidConfig("larson pixels and length must be positive"));
        }
        let steps = color_steps(settings.pixels);
        let head = ColorChange::new(settings.color, color::pick_random(&mut rng), steps);
        let tail = ColorChange::new(Argb::BLACK, color::pick_random(&mut rng), steps);
        Ok(Self {
            position: settings.position,
            forward: settings.forward,
            brightness: falloff(settings.length),
            head,
            tail,
            last_update: None,
            settings,
            rng,
        })
    }

    /// Move the scanner if at least `frame_interval` has passed since the last move.
    ///
    /// `elapsed` is time since any fixed starting point. Returns `true` when the scanner moved.
    pub fn update(&mut self, elapsed: Duration) -> bool {
        if let Some(last) = self.last_update {
            if elapsed.saturating_sub(last) < self.settings.frame_interval {
                return false;
            }
        }

        self.tail.update();
        if self.head.update() {
            self.next_colors();
        }

        let pixels = self.settings.pixels as i64;
        let length = self.settings.length as i64;
        if self.forward {
            self.position += self.settings.speed;
            if self.position - length > pixels {
                if self.settings.bidirectional {
                    self.forward = false;
                    self.position = pixels - 1;
                } else {
                    self.position = 0;
                }
            }
        } else {
            self.position -= self.settings.speed;
            if self.position + length < 0 {
                if self.settings.bidirectional {
                    self.forward = true;
                    self.position = 0;
                } else {
                    self.position = pixels - 1;
                }
            }
        }

        self.last_update = Some(elapsed);
        true
    }

    /// Draw head and tail into the checked-out frame. LEDs that fall off either end of the
    /// strip are skipped.
    ///
    /// # Errors
    ///
    /// [`Error::NoActiveFrame`] without a checked-out frame.
    pub fn render<T: BusTransport>(&self, pipeline: &mut FramePipeline<T>) -> Result<()> {
        if pipeline.active_frame().is_none() {
            return Err(Error::NoActiveFrame);
        }
        let step: i64 = if self.forward { -1 } else { 1 };
        let mut body = ColorChange::new(
            self.head.current(),
            self.tail.current(),
            self.settings.length as u32,
        );
        let mut last = (0, 0, 0);
        let mut pixel = self.position;
        for &level in &self.brightness {
            body.update();
            let color = body.current();
            let mut rgb = (
                scale(color.r(), level),
                scale(color.g(), level),
                scale(color.b(), level),
            );
            // Keep the faint end of the tail lit instead of letting it round to black.
            if rgb == (0, 0, 0) {
                rgb = last;
            } else {
                last = rgb;
            }

            if let Ok(index) = usize::try_from(pixel) {
                if index < pipeline.pixel_count() {
                    pipeline.set_pixel(
                        index,
                        Argb::new(0xff, rgb.0, rgb.1, rgb.2),
                        self.settings.mode,
                    )?;
                }
            }
            pixel += step;
        }
        Ok(())
    }

    /// Current head position (may be outside the strip while wrapping).
    #[must_use]
    pub const fn position(&self) -> i64 {
        self.position
    }

    /// `true` while moving towards higher indices.
    #[must_use]
    pub const fn is_forward(&self) -> bool {
        self.forward
    }

    /// Brightness of each LED from head to tail, out of 1000.
    #[must_use]
    pub fn falloff(&self) -> &[u32] {
        &self.brightness
    }

    /// Settings the scanner was started with.
    #[must_use]
    pub const fn settings(&self) -> &LarsonSettings {
        &self.settings
    }

    fn next_colors(&mut self) {
        let steps = color_steps(self.settings.pixels);
        self.head = ColorChange::new(self.head.stop(), color::pick_random(&mut self.rng), steps);
        self.tail = ColorChange::new(
            self.tail.current(),
            color::pick_random(&mut self.rng),
            steps,
        );
    }
}

// Colours change fully once every quarter of the strip.
fn color_steps(pixels: usize) -> u32 {
    u32::try_from(pixels / 4).unwrap_or(u32::MAX)
}

/// `round(1000 * 10^(-2 i / length))` for `i` in `0..length`.
fn falloff(length: usize) -> Vec<u32> {
    (0..length)
        .map(|i| {
            let exponent = 3.0 - 2.0 * (i as f64 / length as f64);
            10_f64.powf(exponent).round() as u32
        })
        .collect()
}

fn scale(channel: u8, level: u32) -> u8 {
    (u32::from(channel) * level / HEAD_LEVEL) as u8
}
