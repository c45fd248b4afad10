//! A 2-D display made of chained LED panels on top of a [`FramePipeline`].
//!
//! [`Display`] forwards every frame operation to the pipeline and translates `(x, y)` to chain
//! indices with a [`PanelLayout`]. It is also an `embedded-graphics` [`DrawTarget`], so text
//! and shapes can be drawn straight into the checked-out frame.

use embedded_graphics::Pixel;
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::{DrawTarget, OriginDimensions, Size};

use crate::color::Argb;
use crate::config::{ChainConfig, DisplayConfig};
use crate::frame_codec::PixelMode;
use crate::panel::{PanelLayout, Position};
use crate::pipeline::FramePipeline;
use crate::transport::BusTransport;
use crate::{Error, Result};

/// Chained LED panels addressed by `(x, y)`.
///
/// # Example
///
/// ```rust
/// use apa102_display::color::Argb;
/// use apa102_display::display::Display;
/// use apa102_display::frame_codec::PixelMode;
/// use apa102_display::panel::{Anchor, Panel, PanelLayout};
/// use apa102_display::transport::CaptureTransport;
/// use embedded_graphics::{pixelcolor::Rgb888, prelude::*, primitives::{Line, PrimitiveStyle}};
///
/// # fn main() -> apa102_display::Result<()> {
/// let layout = PanelLayout::new(vec![Panel::new("M1", Anchor::TopLeft, 0, 0, 3, 2)])?;
/// let mut display = Display::init(layout, 31, || Ok(CaptureTransport::new()))?;
///
/// display.begin_frame(false)?;
/// display.set_pixel(0, 1, Argb(0xff10_2030), PixelMode::Copy)?;
/// assert_eq!(display.pipeline().get_pixel(5)?, Argb(0x1f10_2030));
///
/// // Draw the top row with embedded-graphics.
/// Line::new(Point::new(0, 0), Point::new(2, 0))
///     .into_styled(PrimitiveStyle::with_stroke(Rgb888::RED, 1))
///     .draw(&mut display)?;
/// assert_eq!(display.get_pixel(2, 0)?, Argb(0x1fff_0000));
///
/// display.finish_frame()?;
/// display.shutdown()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Display<T: BusTransport> {
    layout: PanelLayout,
    pipeline: FramePipeline<T>,
    origin: Position,
    size: Size,
}

impl<T: BusTransport> Display<T> {
    /// Size the chain from `layout`, open the bus with `open` and start streaming.
    ///
    /// # Errors
    ///
    /// Whatever [`FramePipeline::init`] reports.
    pub fn init<F>(layout: PanelLayout, brightness: u8, open: F) -> Result<Self>
    where
        F: FnOnce() -> Result<T>,
    {
        log::info!(
            "Display: {} panels, {} pixels",
            layout.panels().count(),
            layout.pixel_count()
        );
        let pipeline = FramePipeline::init(layout.pixel_count(), brightness, open)?;
        Ok(Self::from_parts(layout, pipeline))
    }

    /// Build the layout described by `config` and start streaming. `open` receives the
    /// equivalent [`ChainConfig`].
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] for a bad panel list, otherwise as [`init`](Self::init).
    pub fn from_config<F>(config: &DisplayConfig, open: F) -> Result<Self>
    where
        F: FnOnce(&ChainConfig) -> Result<T>,
    {
        let chain = config.chain_config();
        Self::init(config.layout()?, chain.brightness, || open(&chain))
    }

    /// Put a layout on top of a running pipeline.
    ///
    /// # Panics
    ///
    /// Panics if the pipeline's pixel count differs from the layout's.
    #[must_use]
    pub fn from_parts(layout: PanelLayout, pipeline: FramePipeline<T>) -> Self {
        assert_eq!(
            layout.pixel_count(),
            pipeline.pixel_count(),
            "layout and pipeline disagree on pixel count"
        );
        let (origin, extent) = layout.bounding_box();
        Self {
            layout,
            pipeline,
            origin,
            size: Size::new(extent.width, extent.height),
        }
    }

    /// See [`FramePipeline::begin_frame`].
    ///
    /// # Errors
    ///
    /// See [`FramePipeline::begin_frame`].
    pub fn begin_frame(&mut self, copy_previous: bool) -> Result<()> {
        self.pipeline.begin_frame(copy_previous)
    }

    /// See [`FramePipeline::finish_frame`].
    ///
    /// # Errors
    ///
    /// See [`FramePipeline::finish_frame`].
    pub fn finish_frame(&mut self) -> Result<()> {
        self.pipeline.finish_frame()
    }

    /// Combine `argb` into the LED at `(x, y)`.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfBounds`] when no panel covers `(x, y)`, otherwise as
    /// [`FramePipeline::set_pixel`].
    pub fn set_pixel(&mut self, x: i32, y: i32, argb: Argb, mode: PixelMode) -> Result<()> {
        let index = self.layout.locate(x, y).inspect_err(|_| {
            log::debug!("Display::set_pixel: no panel at ({x}, {y})");
        })?;
        self.pipeline.set_pixel(index, argb, mode)
    }

    /// Read the LED at `(x, y)`.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfBounds`] when no panel covers `(x, y)`, otherwise as
    /// [`FramePipeline::get_pixel`].
    pub fn get_pixel(&self, x: i32, y: i32) -> Result<Argb> {
        let index = self.layout.locate(x, y)?;
        self.pipeline.get_pixel(index)
    }

    /// See [`FramePipeline::clear`].
    ///
    /// # Errors
    ///
    /// See [`FramePipeline::clear`].
    pub fn clear(&mut self) -> Result<()> {
        self.pipeline.clear()
    }

    /// See [`FramePipeline::fill`].
    ///
    /// # Errors
    ///
    /// See [`FramePipeline::fill`].
    pub fn fill(&mut self, argb: Argb) -> Result<()> {
        self.pipeline.fill(argb)
    }

    /// See [`FramePipeline::set_brightness`].
    pub fn set_brightness(&mut self, level: u8) {
        self.pipeline.set_brightness(level);
    }

    /// See [`FramePipeline::shutdown`].
    ///
    /// # Errors
    ///
    /// See [`FramePipeline::shutdown`].
    pub fn shutdown(&mut self) -> Result<()> {
        self.pipeline.shutdown()
    }

    /// The panel layout.
    #[must_use]
    pub const fn layout(&self) -> &PanelLayout {
        &self.layout
    }

    /// The underlying 1-D pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &FramePipeline<T> {
        &self.pipeline
    }

    /// Mutable access to the underlying 1-D pipeline, e.g. for strip animations.
    pub fn pipeline_mut(&mut self) -> &mut FramePipeline<T> {
        &mut self.pipeline
    }
}

impl<T: BusTransport> OriginDimensions for Display<T> {
    fn size(&self) -> Size {
        self.size
    }
}

// Drawing coordinates are relative to the top-left of the panels' bounding box.
impl<T: BusTransport> DrawTarget for Display<T> {
    type Color = Rgb888;
    type Error = Error;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<()>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            let (Some(x), Some(y)) = (
                coord.x.checked_add(self.origin.x),
                coord.y.checked_add(self.origin.y),
            ) else {
                continue;
            };
            match self.set_pixel(x, y, Argb::from(color), PixelMode::Copy) {
                Ok(()) | Err(Error::OutOfBounds { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}
