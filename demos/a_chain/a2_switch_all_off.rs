//! Send one dark frame to the whole chain.
//!
//! Usage: `demo_a2_switch_all_off [--dry-run] [PIXELS]`
#![allow(missing_docs)]

use apa102_display::{
    Error, Result,
    config::ChainConfig,
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
    let mut config = ChainConfig {
        speed_hz: 10_000_000,
        pixel_count: 512,
        brightness: 31,
        ..ChainConfig::default()
    };
    for arg in std::env::args().skip(1) {
        if arg == "--dry-run" {
            dry_run = true;
        } else {
            config.pixel_count = arg
                .parse()
                .map_err(|_| Error::InvalidConfig("arguments are [--dry-run] [PIXELS]"))?;
        }
    }
    let config = config.validated()?;

    if dry_run {
        let capture = CaptureTransport::new();
        let mut leds = FramePipeline::from_config(&config, |_| Ok(capture.clone()))?;
        switch_all_off(&mut leds)?;
        leds.shutdown()?;
        if let Some(frame) = capture.last_frame() {
            log::info!("sent:\n{}", HexDump::new(&frame, 16));
        }
    } else {
        let mut leds = FramePipeline::from_config(&config, ChainConfig::open_spidev)?;
        switch_all_off(&mut leds)?;
        leds.shutdown()?;
    }
    Ok(())
}

fn switch_all_off<T: BusTransport>(leds: &mut FramePipeline<T>) -> Result<()> {
    leds.begin_frame(false)?;
    leds.clear()?;
    leds.finish_frame()
}
