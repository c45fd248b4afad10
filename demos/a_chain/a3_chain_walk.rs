//! Walk through the chain lighting each LED in a cycling primary or secondary colour. Every
//! frame carries the previous one forward, so the chain fills up.
//!
//! Usage: `demo_a3_chain_walk [--dry-run] [CONFIG.json]`
#![allow(missing_docs)]

use std::thread;
use std::time::Duration;

use apa102_display::{
    Result,
    color::Argb,
    config::ChainConfig,
    frame_codec::PixelMode,
    pipeline::FramePipeline,
    transport::{BusTransport, CaptureTransport},
};

const WALK_COLORS: [Argb; 7] = [
    Argb(0xffff_0000),
    Argb(0xff00_ff00),
    Argb(0xff00_00ff),
    Argb(0xffff_ff00),
    Argb(0xff00_ffff),
    Argb(0xffff_00ff),
    Argb(0xffff_ffff),
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
        Some(path) => ChainConfig::load(path)?,
        None => ChainConfig {
            pixel_count: 360,
            ..ChainConfig::default()
        },
    };

    if dry_run {
        let capture = CaptureTransport::new();
        let mut leds = FramePipeline::from_config(&config, |_| Ok(capture.clone()))?;
        chain_walk(&mut leds, Duration::ZERO)?;
        leds.shutdown()?;
        log::info!("{} frames captured", capture.frame_count());
    } else {
        let mut leds = FramePipeline::from_config(&config, ChainConfig::open_spidev)?;
        chain_walk(&mut leds, Duration::from_millis(10))?;
        leds.shutdown()?;
    }
    Ok(())
}

fn chain_walk<T: BusTransport>(leds: &mut FramePipeline<T>, delay: Duration) -> Result<()> {
    let brightness = leds.brightness();
    for (index, color) in (0..leds.pixel_count()).zip(WALK_COLORS.iter().cycle()) {
        leds.begin_frame(true)?;
        leds.set_pixel(index, color.with_alpha(brightness), PixelMode::Copy)?;
        leds.finish_frame()?;
        thread::sleep(delay);
    }
    log::info!(
        "walked {} LEDs, {} frames sent so far",
        leds.pixel_count(),
        leds.frames_sent()
    );
    Ok(())
}
