//! JSON configuration for LED chains and panel displays.
//!
//! Every field has a default, so `{}` is a valid [`ChainConfig`]:
//!
//! ```rust
//! use apa102_display::config::ChainConfig;
//!
//! # fn main() -> apa102_display::Result<()> {
//! let config = ChainConfig::from_json_str(r#"{ "pixel_count": 60, "brightness": 40 }"#)?;
//! assert_eq!(config.device, "/dev/spidev0.0");
//! assert_eq!(config.speed_hz, 20_000_000);
//! assert_eq!(config.pixel_count, 60);
//! assert_eq!(config.brightness, 31); // clamped
//! # Ok(())
//! # }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::frame_codec::BRIGHTNESS_MAX;
use crate::panel::{Panel, PanelLayout};
use crate::{Error, Result};

/// Default bus device.
pub const DEFAULT_DEVICE: &str = "/dev/spidev0.0";
/// Default maximum SPI clock.
pub const DEFAULT_SPEED_HZ: u32 = 20_000_000;
/// Default chain length.
pub const DEFAULT_PIXEL_COUNT: usize = 146;
/// Default global brightness (0-31).
pub const DEFAULT_BRIGHTNESS: u8 = 8;

/// A single LED strip on one bus.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChainConfig {
    /// Bus device path, e.g. `/dev/spidev0.0`.
    pub device: String,
    /// Maximum SPI clock in Hz.
    pub speed_hz: u32,
    /// Number of LEDs in the chain.
    pub pixel_count: usize,
    /// Default global brightness, 0-31.
    pub brightness: u8,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_owned(),
            speed_hz: DEFAULT_SPEED_HZ,
            pixel_count: DEFAULT_PIXEL_COUNT,
            brightness: DEFAULT_BRIGHTNESS,
        }
    }
}

impl ChainConfig {
    /// Parse and validate a JSON document. Brightness above 31 is clamped.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] on malformed JSON, [`Error::InvalidConfig`] when validation fails.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validated()
    }

    /// Read, parse and validate a JSON file.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the file cannot be read, otherwise as
    /// [`from_json_str`](Self::from_json_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("ChainConfig: loading {}", path.display());
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    /// Check the values and clamp the brightness.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] for an empty chain, a zero clock or an empty device path.
    pub fn validated(mut self) -> Result<Self> {
        if self.pixel_count == 0 {
            return Err(Error::InvalidConfig("pixel_count must be at least 1"));
        }
        check_bus(&self.device, self.speed_hz)?;
        self.brightness = self.brightness.min(BRIGHTNESS_MAX);
        Ok(self)
    }

    /// Open the configured `spidev` device.
    ///
    /// # Errors
    ///
    /// See [`SpidevTransport::open`](crate::transport::SpidevTransport::open).
    #[cfg(feature = "spidev")]
    pub fn open_spidev(&self) -> Result<crate::transport::SpidevTransport> {
        crate::transport::SpidevTransport::open(&self.device, self.speed_hz)
    }
}

/// Chained panels sharing one bus.
///
/// ```rust
/// use apa102_display::config::DisplayConfig;
/// use apa102_display::panel::Anchor;
///
/// # fn main() -> apa102_display::Result<()> {
/// let config = DisplayConfig::from_json_str(r#"{
///     "panels": [
///         { "name": "left",  "anchor": "top_left",    "position": { "x": 0, "y": 0 },  "size": { "width": 32, "height": 8 } },
///         { "name": "right", "anchor": "bottom_left", "position": { "x": 32, "y": 0 }, "size": { "width": 32, "height": 8 } }
///     ]
/// }"#)?;
/// assert_eq!(config.panels[1].anchor, Anchor::BottomLeft);
/// assert_eq!(config.chain_config().pixel_count, 512);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    /// Bus device path.
    pub device: String,
    /// Maximum SPI clock in Hz.
    pub speed_hz: u32,
    /// Default global brightness, 0-31.
    pub brightness: u8,
    /// Panels in chain order.
    pub panels: Vec<Panel>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_owned(),
            speed_hz: DEFAULT_SPEED_HZ,
            brightness: DEFAULT_BRIGHTNESS,
            panels: Vec::new(),
        }
    }
}

impl DisplayConfig {
    /// Parse and validate a JSON document. Brightness above 31 is clamped.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] on malformed JSON, [`Error::InvalidConfig`] when validation fails.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validated()
    }

    /// Read, parse and validate a JSON file.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the file cannot be read, otherwise as
    /// [`from_json_str`](Self::from_json_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("DisplayConfig: loading {}", path.display());
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    /// Check the values and clamp the brightness.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] for no panels, a zero-sized panel, a zero clock or an empty
    /// device path.
    pub fn validated(mut self) -> Result<Self> {
        self.layout()?;
        check_bus(&self.device, self.speed_hz)?;
        self.brightness = self.brightness.min(BRIGHTNESS_MAX);
        Ok(self)
    }

    /// Chain the panels.
    ///
    /// # Errors
    ///
    /// See [`PanelLayout::new`].
    pub fn layout(&self) -> Result<PanelLayout> {
        PanelLayout::new(self.panels.iter().cloned())
    }

    /// The equivalent single-strip configuration, sized to all panels together.
    #[must_use]
    pub fn chain_config(&self) -> ChainConfig {
        ChainConfig {
            device: self.device.clone(),
            speed_hz: self.speed_hz,
            pixel_count: self.panels.iter().map(Panel::pixel_count).sum(),
            brightness: self.brightness.min(BRIGHTNESS_MAX),
        }
    }
}

fn check_bus(device: &str, speed_hz: u32) -> Result<()> {
    if device.is_empty() {
        return Err(Error::InvalidConfig("device must not be empty"));
    }
    if speed_hz == 0 {
        return Err(Error::InvalidConfig("speed_hz must be positive"));
    }
    Ok(())
}
