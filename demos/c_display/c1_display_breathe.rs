//! Concentric rectangles on two stacked 32×8 panels, breathing through a sine brightness
//! table.
//!
//! Usage: `demo_c1_display_breathe [--dry-run] [CONFIG.json]`. Without a configuration file
//! the two panels sit at (0, 0) and (0, 8), both wired from the top-left corner.
#![allow(missing_docs)]

use std::thread;
use std::time::Duration;

use apa102_display::{
    Result,
    config::{ChainConfig, DisplayConfig},
    display::Display,
    panel::{Anchor, Panel},
    transport::{BusTransport, CaptureTransport},
};
use embedded_graphics::{
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
};

const BREATH: [u8; 91] = [
    1, 1, 1, 1, 1, 1, 1, 2, 2, 3, 4, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19,
    20, 21, 22, 23, 24, 25, 26, 27, 27, 28, 29, 29, 30, 30, 30, 31, 31, 31, 31, 31, 31, 31, 30,
    30, 30, 29, 29, 28, 27, 27, 26, 25, 24, 23, 22, 21, 20, 19, 18, 17, 16, 15, 14, 13, 12, 11,
    10, 9, 8, 7, 6, 5, 4, 4, 3, 2, 2, 1, 1, 1, 1, 1, 1, 1,
];

const RING_COLORS: [Rgb888; 8] = [
    Rgb888::RED,
    Rgb888::GREEN,
    Rgb888::BLUE,
    Rgb888::MAGENTA,
    Rgb888::YELLOW,
    Rgb888::CYAN,
    Rgb888::new(0x77, 0x77, 0x77),
    Rgb888::WHITE,
];

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = inner_main() {
        panic!("{err}");
    }
}

fn inner_main() -> Result<()> {
    let mut dry_run = false;
    let mut config_path = None;
    for arg in std::env::args().skip(1) {
        if arg == "--dry-run" {
            dry_run = true;
        } else {
            config_path = Some(arg);
        }
    }
    let config = match config_path {
        Some(path) => DisplayConfig::load(path)?,
        None => DisplayConfig {
            speed_hz: 10_000_000,
            panels: vec![
                Panel::new("1", Anchor::TopLeft, 0, 0, 32, 8),
                Panel::new("2", Anchor::TopLeft, 0, 8, 32, 8),
            ],
            ..DisplayConfig::default()
        }
        .validated()?,
    };

    if dry_run {
        let capture = CaptureTransport::new();
        let mut display = Display::from_config(&config, |_| Ok(capture.clone()))?;
        breathe(&mut display, Some(1), Duration::ZERO)?;
        display.shutdown()?;
        log::info!("{} frames captured", capture.frame_count());
    } else {
        let mut display = Display::from_config(&config, ChainConfig::open_spidev)?;
        breathe(&mut display, None, Duration::from_millis(10))?;
        display.shutdown()?;
    }
    Ok(())
}

fn breathe<T: BusTransport>(
    display: &mut Display<T>,
    cycles: Option<usize>,
    frame_delay: Duration,
) -> Result<()> {
    let mut cycle = 0;
    while cycles.is_none_or(|cycles| cycle < cycles) {
        for &brightness in &BREATH {
            display.set_brightness(brightness);
            display.begin_frame(false)?;
            draw_rings(display)?;
            display.finish_frame()?;
            thread::sleep(frame_delay);
        }
        cycle += 1;
        thread::sleep(frame_delay * 100);
    }
    Ok(())
}

// Rings two pixels apart, shrinking until they no longer enclose anything.
fn draw_rings<T: BusTransport>(display: &mut Display<T>) -> Result<()> {
    let mut ring = display.bounding_box();
    for color in RING_COLORS.iter().cycle() {
        if ring.size.width < 3 || ring.size.height < 3 {
            break;
        }
        ring.into_styled(PrimitiveStyle::with_stroke(*color, 1))
            .draw(display)?;
        ring = ring.offset(-2);
    }
    Ok(())
}
