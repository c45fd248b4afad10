//! Colour values, saturating channel arithmetic and colour interpolation.
//!
//! [`Argb`] is the colour type used by the pixel API. The alpha byte carries the APA102
//! global brightness (0-31); any larger alpha means "use the chain's default brightness".
//!
//! The channel helpers ([`add`], [`sub`], [`sub_above`], [`invert_above`]) are the blend rules
//! behind [`PixelMode`](crate::frame_codec::PixelMode).

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use rand::Rng;
use smart_leds::RGB8;

/// Predefined RGB colour constants from the `smart_leds` crate.
#[doc(inline)]
pub use smart_leds::colors;

/// A colour packed as `0xAARRGGBB`.
///
/// ```rust
/// use apa102_display::color::Argb;
///
/// let color = Argb::new(0x1f, 0x11, 0x22, 0x33);
/// assert_eq!(color, Argb(0x1f11_2233));
/// assert_eq!((color.a(), color.r(), color.g(), color.b()), (0x1f, 0x11, 0x22, 0x33));
///
/// // Alpha above 31 selects the default brightness when the pixel is encoded.
/// let opaque = Argb::from(apa102_display::color::colors::RED);
/// assert_eq!(opaque, Argb(0xffff_0000));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Argb(pub u32);

impl Argb {
    /// All channels zero.
    pub const BLACK: Self = Self(0);
    /// Full white at default brightness.
    pub const WHITE: Self = Self(0xffff_ffff);

    /// Pack four channels.
    #[must_use]
    pub const fn new(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self(((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32))
    }

    /// Alpha (brightness request) channel.
    #[must_use]
    pub const fn a(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Red channel.
    #[must_use]
    pub const fn r(self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// Green channel.
    #[must_use]
    pub const fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Blue channel.
    #[must_use]
    pub const fn b(self) -> u8 {
        self.0 as u8
    }

    /// Same colour with a different alpha.
    #[must_use]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self::new(a, self.r(), self.g(), self.b())
    }
}

impl From<u32> for Argb {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Argb> for u32 {
    fn from(color: Argb) -> Self {
        color.0
    }
}

impl From<RGB8> for Argb {
    fn from(color: RGB8) -> Self {
        Self::new(0xff, color.r, color.g, color.b)
    }
}

impl From<Argb> for RGB8 {
    fn from(color: Argb) -> Self {
        Self::new(color.r(), color.g(), color.b())
    }
}

impl From<Rgb888> for Argb {
    fn from(color: Rgb888) -> Self {
        Self::new(0xff, color.r(), color.g(), color.b())
    }
}

impl From<Argb> for Rgb888 {
    fn from(color: Argb) -> Self {
        Self::new(color.r(), color.g(), color.b())
    }
}

/// `old + new`, saturating at `max`.
#[must_use]
pub fn add(old: u8, new: u8, max: u8) -> u8 {
    let sum = u16::from(old) + u16::from(new);
    if sum < u16::from(max) { sum as u8 } else { max }
}

/// `old - new`, never below `min`.
#[must_use]
pub fn sub(old: u8, new: u8, min: u8) -> u8 {
    let difference = i16::from(old) - i16::from(new);
    if difference > i16::from(min) {
        difference as u8
    } else {
        min
    }
}

/// [`sub`] when `old` is above `trigger`, otherwise `new` passes through.
#[must_use]
pub fn sub_above(old: u8, new: u8, min: u8, trigger: u8) -> u8 {
    if old > trigger { sub(old, new, min) } else { new }
}

/// `255 - old` when `old` is above `trigger`, otherwise `new` passes through.
#[must_use]
pub const fn invert_above(old: u8, new: u8, trigger: u8) -> u8 {
    if old > trigger { 255 - old } else { new }
}

/// The six saturated colours [`pick_random`] chooses from.
pub const RANDOM_PALETTE: [Argb; 6] = [
    Argb(0xffff_0000),
    Argb(0xff00_ff00),
    Argb(0xff00_00ff),
    Argb(0xffff_ff00),
    Argb(0xff00_ffff),
    Argb(0xffff_00ff),
];

/// Pick one of [`RANDOM_PALETTE`] uniformly.
pub fn pick_random<R: Rng + ?Sized>(rng: &mut R) -> Argb {
    RANDOM_PALETTE[rng.gen_range(0..RANDOM_PALETTE.len())]
}

/// Linear interpolation from `start` to `stop` in `steps` equal steps, one per
/// [`update`](Self::update), applied to all four channels independently.
///
/// ```rust
/// use apa102_display::color::{Argb, ColorChange};
///
/// let mut change = ColorChange::new(Argb(0xff00_0000), Argb(0xff00_0030), 4);
/// let mut seen = Vec::new();
/// loop {
///     let done = change.update();
///     seen.push(change.current().b());
///     if done {
///         break;
///     }
/// }
/// assert_eq!(seen, [0x00, 0x10, 0x20, 0x30]);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorChange {
    start: Argb,
    stop: Argb,
    steps: u32,
    step: u32,
    current: Argb,
    // B, G, R, A
    channel_diff: [i32; 4],
}

impl ColorChange {
    /// Minimum number of steps; fewer would never reach `stop`.
    pub const MIN_STEPS: u32 = 2;

    /// Start an interpolation. `steps` below [`Self::MIN_STEPS`] is raised to it.
    #[must_use]
    pub fn new(start: Argb, stop: Argb, steps: u32) -> Self {
        let mut channel_diff = [0; 4];
        for (channel, diff) in channel_diff.iter_mut().enumerate() {
            *diff = i32::from(channel_byte(stop, channel)) - i32::from(channel_byte(start, channel));
        }
        Self {
            start,
            stop,
            steps: steps.max(Self::MIN_STEPS),
            step: 0,
            current: start,
            channel_diff,
        }
    }

    /// Advance one step and refresh [`current`](Self::current).
    ///
    /// Returns `true` once the final step (`current == stop`) has been produced. Further calls
    /// keep returning `true` and reset `current` to `start`.
    pub fn update(&mut self) -> bool {
        if self.step < self.steps {
            let mut packed = 0_u32;
            for (channel, diff) in self.channel_diff.iter().enumerate() {
                let start = i64::from(channel_byte(self.start, channel));
                let offset =
                    i64::from(*diff) * i64::from(self.step) / (i64::from(self.steps) - 1);
                let value = (start + offset) as u32 & 0xff;
                packed |= value << (channel * 8);
            }
            self.step += 1;
            self.current = Argb(packed);
        } else {
            self.current = self.start;
        }
        self.step >= self.steps
    }

    /// Colour produced by the latest [`update`](Self::update) (initially `start`).
    #[must_use]
    pub const fn current(&self) -> Argb {
        self.current
    }

    /// First colour of the interpolation.
    #[must_use]
    pub const fn start(&self) -> Argb {
        self.start
    }

    /// Last colour of the interpolation.
    #[must_use]
    pub const fn stop(&self) -> Argb {
        self.stop
    }

    /// Number of steps from `start` to `stop` inclusive.
    #[must_use]
    pub const fn steps(&self) -> u32 {
        self.steps
    }
}

// channel 0 = B, 1 = G, 2 = R, 3 = A
const fn channel_byte(color: Argb, channel: usize) -> u8 {
    (color.0 >> (channel * 8)) as u8
}
