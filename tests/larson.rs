#![allow(missing_docs)]
//! Host-level tests for the scanner animation.

use std::time::Duration;

use apa102_display::color::Argb;
use apa102_display::frame_codec::PixelMode;
use apa102_display::larson::{Larson, LarsonSettings};
use apa102_display::pipeline::FramePipeline;
use apa102_display::transport::CaptureTransport;
use apa102_display::{Error, Result};

const TICK: Duration = Duration::from_millis(10);

fn settings(pixels: usize, length: usize, bidirectional: bool) -> LarsonSettings {
    LarsonSettings {
        pixels,
        length,
        position: 0,
        forward: true,
        bidirectional,
        speed: 1,
        color: Argb(0xffff_0000),
        frame_interval: TICK,
        mode: PixelMode::Copy,
    }
}

fn step(larson: &mut Larson, ticks: u32, clock: &mut Duration) {
    for _ in 0..ticks {
        assert!(larson.update(*clock));
        *clock += TICK;
    }
}

#[test]
fn falloff_is_exponential_from_head_to_tail() -> Result<()> {
    let larson = Larson::with_seed(settings(20, 4, false), 1)?;
    assert_eq!(larson.falloff(), [1000, 316, 100, 32]);
    Ok(())
}

#[test]
fn updates_are_time_gated() -> Result<()> {
    let mut larson = Larson::with_seed(settings(20, 4, false), 1)?;
    assert!(larson.update(Duration::from_millis(100)));
    assert_eq!(larson.position(), 1);
    assert!(!larson.update(Duration::from_millis(109)));
    assert_eq!(larson.position(), 1);
    assert!(larson.update(Duration::from_millis(110)));
    assert_eq!(larson.position(), 2);
    Ok(())
}

#[test]
fn one_way_scanner_wraps_to_the_start() -> Result<()> {
    let mut larson = Larson::with_seed(settings(10, 3, false), 2)?;
    let mut clock = Duration::ZERO;
    step(&mut larson, 13, &mut clock);
    assert_eq!(larson.position(), 13);
    step(&mut larson, 1, &mut clock);
    assert_eq!(larson.position(), 0);
    assert!(larson.is_forward());
    Ok(())
}

#[test]
fn bidirectional_scanner_bounces() -> Result<()> {
    let mut larson = Larson::with_seed(settings(10, 3, true), 3)?;
    let mut clock = Duration::ZERO;
    step(&mut larson, 14, &mut clock);
    assert_eq!(larson.position(), 9);
    assert!(!larson.is_forward());

    // Back down until the tail has left the strip.
    step(&mut larson, 12, &mut clock);
    assert_eq!(larson.position(), -3);
    step(&mut larson, 1, &mut clock);
    assert_eq!(larson.position(), 0);
    assert!(larson.is_forward());
    Ok(())
}

#[test]
fn render_draws_head_and_fading_tail() -> Result<()> {
    let mut leds = FramePipeline::with_transport(6, 31, CaptureTransport::new())?;
    let larson = Larson::with_seed(
        LarsonSettings {
            position: 2,
            ..settings(6, 4, false)
        },
        4,
    )?;
    leds.begin_frame(false)?;
    larson.render(&mut leds)?;

    // Head colour fading towards a black tail: 255, 255*2/3*0.316, 255/3*0.1, then the
    // last lit colour repeats instead of going dark. Index -1 is skipped.
    assert_eq!(leds.get_pixel(2)?, Argb(0x1fff_0000));
    assert_eq!(leds.get_pixel(1)?, Argb(0x1f35_0000));
    assert_eq!(leds.get_pixel(0)?, Argb(0x1f08_0000));
    assert_eq!(leds.get_pixel(3)?, Argb::BLACK);
    Ok(())
}

#[test]
fn render_needs_a_frame() -> Result<()> {
    let mut leds = FramePipeline::with_transport(6, 31, CaptureTransport::new())?;
    let larson = Larson::with_seed(settings(6, 4, false), 5)?;
    assert!(matches!(larson.render(&mut leds), Err(Error::NoActiveFrame)));
    Ok(())
}

#[test]
fn xor_scanners_cancel_where_they_overlap() -> Result<()> {
    let mut leds = FramePipeline::with_transport(8, 31, CaptureTransport::new())?;
    let xor = LarsonSettings {
        position: 5,
        mode: PixelMode::Xor,
        ..settings(8, 2, false)
    };
    let first = Larson::with_seed(xor, 6)?;
    let second = Larson::with_seed(xor, 7)?;
    leds.begin_frame(false)?;
    first.render(&mut leds)?;
    second.render(&mut leds)?;
    assert_eq!(leds.get_pixel(5)?, Argb(0x1f00_0000));
    Ok(())
}

#[test]
fn empty_scanner_is_rejected() {
    assert!(matches!(
        Larson::with_seed(settings(0, 4, false), 1),
        Err(Error::InvalidConfig(_))
    ));
    assert!(matches!(
        Larson::with_seed(settings(10, 0, false), 1),
        Err(Error::InvalidConfig(_))
    ));
}
