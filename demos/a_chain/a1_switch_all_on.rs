//! Light the chain one LED at a time until every LED is white.
//!
//! Usage: `demo_a1_switch_all_on [--dry-run] [PIXELS] [BRIGHTNESS]`
#![allow(missing_docs)]

use std::thread;
use std::time::Duration;

use apa102_display::{
    Result,
    color::Argb,
    config::ChainConfig,
    frame_codec::PixelMode,
    hex_dump::HexDump,
    pipeline::FramePipeline,
    transport::{BusTransport, CaptureTransport},
};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = inner_main() {
        panic!("{err}");
    }
}

fn inner_main() -> Result<()> {
    let mut dry_run = false;
    let mut numbers = Vec::new();
    for arg in std::env::args().skip(1) {
        if arg == "--dry-run" {
            dry_run = true;
        } else {
            numbers.push(arg.parse::<usize>().map_err(|_| {
                apa102_display::Error::InvalidConfig("arguments are [--dry-run] [PIXELS] [BRIGHTNESS]")
            })?);
        }
    }

    let mut config = ChainConfig {
        speed_hz: 10_000_000,
        pixel_count: 512,
        brightness: 31,
        ..ChainConfig::default()
    };
    if let Some(&pixel_count) = numbers.first() {
        config.pixel_count = pixel_count;
    }
    if let Some(&brightness) = numbers.get(1) {
        config.brightness = u8::try_from(brightness).unwrap_or(u8::MAX);
    }
    let config = config.validated()?;

    if dry_run {
        let capture = CaptureTransport::new();
        let mut leds = FramePipeline::from_config(&config, |_| Ok(capture.clone()))?;
        switch_all_on(&mut leds, Duration::ZERO)?;
        leds.shutdown()?;
        if let Some(frame) = capture.last_frame() {
            log::info!(
                "{} frames captured, last one:\n{}",
                capture.frame_count(),
                HexDump::new(&frame, 16)
            );
        }
    } else {
        let mut leds = FramePipeline::from_config(&config, ChainConfig::open_spidev)?;
        switch_all_on(&mut leds, Duration::from_millis(30))?;
        leds.shutdown()?;
    }
    Ok(())
}

fn switch_all_on<T: BusTransport>(leds: &mut FramePipeline<T>, delay: Duration) -> Result<()> {
    for index in 0..leds.pixel_count() {
        leds.begin_frame(true)?;
        leds.set_pixel(index, Argb::WHITE, PixelMode::Copy)?;
        leds.finish_frame()?;
        thread::sleep(delay);
    }
    Ok(())
}
