//! Three scanners sweeping a strip, blended with XOR where they cross.
//!
//! Usage: `demo_b1_larson [--dry-run] [SECONDS]`. A dry run lasts one second unless told
//! otherwise; a real run goes on until killed when no duration is given.
#![allow(missing_docs)]

use std::time::{Duration, Instant};

use apa102_display::{
    Error, Result,
    color::Argb,
    config::ChainConfig,
    frame_codec::PixelMode,
    larson::{Larson, LarsonSettings},
    pipeline::FramePipeline,
    transport::{BusTransport, CaptureTransport},
};

const PIXEL_COUNT: usize = 360;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = inner_main() {
        panic!("{err}");
    }
}

fn inner_main() -> Result<()> {
    let mut dry_run = false;
    let mut seconds = None;
    for arg in std::env::args().skip(1) {
        if arg == "--dry-run" {
            dry_run = true;
        } else {
            seconds = Some(
                arg.parse::<u64>()
                    .map_err(|_| Error::InvalidConfig("arguments are [--dry-run] [SECONDS]"))?,
            );
        }
    }

    let config = ChainConfig {
        pixel_count: PIXEL_COUNT,
        brightness: 31,
        ..ChainConfig::default()
    };
    if dry_run {
        let capture = CaptureTransport::new();
        let mut leds = FramePipeline::from_config(&config, |_| Ok(capture.clone()))?;
        run(&mut leds, Some(Duration::from_secs(seconds.unwrap_or(1))))?;
        leds.shutdown()?;
        log::info!("{} frames captured", capture.frame_count());
    } else {
        let mut leds = FramePipeline::from_config(&config, ChainConfig::open_spidev)?;
        run(&mut leds, seconds.map(Duration::from_secs))?;
        leds.shutdown()?;
    }
    Ok(())
}

fn run<T: BusTransport>(leds: &mut FramePipeline<T>, limit: Option<Duration>) -> Result<()> {
    let mut larsons = [
        LarsonSettings {
            pixels: PIXEL_COUNT,
            length: 200,
            position: 0,
            forward: true,
            bidirectional: false,
            speed: 1,
            color: Argb(0xffff_0000),
            frame_interval: Duration::from_millis(25),
            mode: PixelMode::Xor,
        },
        LarsonSettings {
            pixels: PIXEL_COUNT,
            length: 8,
            position: PIXEL_COUNT as i64 - 1,
            forward: false,
            bidirectional: false,
            speed: 1,
            color: Argb(0xff00_0077),
            frame_interval: Duration::from_millis(5),
            mode: PixelMode::Xor,
        },
        LarsonSettings {
            pixels: PIXEL_COUNT,
            length: 30,
            position: PIXEL_COUNT as i64 / 2,
            forward: true,
            bidirectional: true,
            speed: 2,
            color: Argb(0xff00_ff00),
            frame_interval: Duration::from_millis(10),
            mode: PixelMode::Xor,
        },
    ]
    .into_iter()
    .zip(1_u64..)
    .map(|(settings, seed)| Larson::with_seed(settings, seed))
    .collect::<Result<Vec<_>>>()?;

    let start = Instant::now();
    let mut frames = 0_u64;
    loop {
        let elapsed = start.elapsed();
        if limit.is_some_and(|limit| elapsed >= limit) {
            break;
        }
        leds.begin_frame(false)?;
        for larson in &mut larsons {
            larson.update(elapsed);
            larson.render(leds)?;
        }
        leds.finish_frame()?;
        frames += 1;
    }
    log::info!(
        "{frames} frames in {:.1} s ({} transfer failures)",
        start.elapsed().as_secs_f32(),
        leds.transfer_failures()
    );
    Ok(())
}
