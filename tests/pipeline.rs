#![allow(missing_docs)]
//! Host-level tests for the frame pipeline, using the in-memory capture transport.

use std::thread;
use std::time::{Duration, Instant};

use apa102_display::color::Argb;
use apa102_display::config::ChainConfig;
use apa102_display::frame_codec::PixelMode;
use apa102_display::pipeline::{FramePipeline, POOL_SIZE, PoolStatus};
use apa102_display::transport::CaptureTransport;
use apa102_display::{Error, Result};

const TIMEOUT: Duration = Duration::from_secs(5);

fn poll(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

#[test]
fn single_pixel_frame_matches_expected_bytes() -> Result<()> {
    let capture = CaptureTransport::new();
    let mut leds = FramePipeline::with_transport(3, 8, capture.clone())?;
    leds.begin_frame(false)?;
    leds.set_pixel(1, Argb(0xff11_2233), PixelMode::Copy)?;
    leds.finish_frame()?;
    leds.shutdown()?;

    assert_eq!(
        capture.frames(),
        [vec![
            0x00, 0x00, 0x00, 0x00, //
            0xe0, 0x00, 0x00, 0x00, //
            0xe8, 0x33, 0x22, 0x11, //
            0xe0, 0x00, 0x00, 0x00, //
            0x00, 0x00, 0x00, 0x00,
        ]]
    );
    Ok(())
}

#[test]
fn frames_reach_the_bus_in_finish_order() -> Result<()> {
    let capture = CaptureTransport::new();
    let mut leds = FramePipeline::with_transport(2, 31, capture.clone())?;
    for sequence in 0..50_u8 {
        leds.begin_frame(false)?;
        leds.set_pixel(0, Argb::new(0xff, 0, 0, sequence), PixelMode::Copy)?;
        leds.finish_frame()?;
    }
    leds.shutdown()?;

    let blues: Vec<u8> = capture.frames().iter().map(|frame| frame[5]).collect();
    assert_eq!(blues, (0..50).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn pool_buffers_are_conserved() -> Result<()> {
    let capture = CaptureTransport::new();
    capture.hold();
    let mut leds = FramePipeline::with_transport(4, 8, capture.clone())?;
    assert_eq!(
        leds.pool_status(),
        PoolStatus {
            free: POOL_SIZE,
            ..PoolStatus::default()
        }
    );

    for _ in 0..3 {
        leds.begin_frame(false)?;
        leds.finish_frame()?;
    }
    assert!(capture.wait_until(TIMEOUT, |_, _, pending| pending));
    assert!(poll(|| leds.pool_status().ready == 2));
    let status = leds.pool_status();
    assert_eq!(status.in_flight, 1);
    assert_eq!(status.free, POOL_SIZE - 3);
    assert_eq!(status.total(), POOL_SIZE);

    leds.begin_frame(true)?;
    let status = leds.pool_status();
    assert_eq!(status.checked_out, 1);
    assert_eq!(status.total(), POOL_SIZE);

    capture.release(3);
    assert!(capture.wait_for_frames(3, TIMEOUT));
    assert!(poll(|| leds.pool_status().free == POOL_SIZE - 1));
    assert_eq!(
        leds.pool_status(),
        PoolStatus {
            free: POOL_SIZE - 1,
            checked_out: 1,
            ..PoolStatus::default()
        }
    );

    capture.open_gate();
    leds.finish_frame()?;
    leds.shutdown()?;
    assert_eq!(capture.frame_count(), 4);
    Ok(())
}

#[test]
fn pool_status_adds_up_while_frames_stream() -> Result<()> {
    let capture = CaptureTransport::new();
    let mut leds = FramePipeline::with_transport(4, 8, capture.clone())?;
    for sequence in 0..20_000_u32 {
        leds.begin_frame(sequence % 2 == 0)?;
        assert_eq!(leds.pool_status().total(), POOL_SIZE, "after begin_frame {sequence}");
        leds.finish_frame()?;
        assert_eq!(leds.pool_status().total(), POOL_SIZE, "after finish_frame {sequence}");
    }
    leds.shutdown()?;
    assert_eq!(capture.frame_count(), 20_000);
    Ok(())
}

#[test]
fn begin_frame_waits_for_a_free_buffer() -> Result<()> {
    let capture = CaptureTransport::new();
    capture.hold();
    let mut leds = FramePipeline::with_transport(1, 8, capture.clone())?;
    for _ in 0..POOL_SIZE {
        leds.begin_frame(false)?;
        leds.finish_frame()?;
    }
    assert!(capture.wait_until(TIMEOUT, |_, _, pending| pending));
    assert!(poll(|| leds.pool_status().free == 0));

    let releaser = thread::spawn({
        let capture = capture.clone();
        move || {
            thread::sleep(Duration::from_millis(50));
            capture.open_gate();
        }
    });
    let started = Instant::now();
    leds.begin_frame(false)?;
    assert!(started.elapsed() >= Duration::from_millis(40));
    releaser.join().expect("releaser must not panic");

    leds.finish_frame()?;
    leds.shutdown()?;
    assert_eq!(capture.frame_count(), POOL_SIZE + 1);
    Ok(())
}

#[test]
fn failed_transfers_are_counted_and_buffers_recycled() -> Result<()> {
    let capture = CaptureTransport::new();
    capture.fail_next(2);
    let mut leds = FramePipeline::with_transport(2, 8, capture.clone())?;
    for _ in 0..POOL_SIZE * 3 {
        leds.begin_frame(false)?;
        leds.fill(Argb(0xff01_0101))?;
        leds.finish_frame()?;
    }
    assert!(poll(|| leds.frames_sent() + leds.transfer_failures() == (POOL_SIZE * 3) as u64));
    assert_eq!(leds.transfer_failures(), 2);
    assert_eq!(leds.frames_sent(), (POOL_SIZE * 3 - 2) as u64);
    assert_eq!(capture.failed_transfers(), 2);
    assert!(poll(|| leds.pool_status().free == POOL_SIZE));
    leds.shutdown()?;
    assert_eq!(capture.frame_count(), POOL_SIZE * 3 - 2);
    Ok(())
}

#[test]
fn pixel_operations_need_an_active_frame() -> Result<()> {
    let mut leds = FramePipeline::with_transport(3, 8, CaptureTransport::new())?;
    assert!(matches!(
        leds.set_pixel(0, Argb::WHITE, PixelMode::Copy),
        Err(Error::NoActiveFrame)
    ));
    assert!(matches!(leds.get_pixel(0), Err(Error::NoActiveFrame)));
    assert!(matches!(leds.clear(), Err(Error::NoActiveFrame)));
    assert!(matches!(leds.fill(Argb::WHITE), Err(Error::NoActiveFrame)));
    assert!(matches!(leds.finish_frame(), Err(Error::NoActiveFrame)));

    leds.begin_frame(false)?;
    leds.finish_frame()?;
    assert!(matches!(leds.get_pixel(0), Err(Error::NoActiveFrame)));
    Ok(())
}

#[test]
fn out_of_range_pixel_leaves_frame_untouched() -> Result<()> {
    let mut leds = FramePipeline::with_transport(3, 8, CaptureTransport::new())?;
    leds.begin_frame(false)?;
    let before = leds.active_frame().map(<[u8]>::to_vec);
    let err = leds
        .set_pixel(3, Argb::WHITE, PixelMode::Copy)
        .expect_err("index 3 is outside a 3-pixel chain");
    assert!(matches!(
        err,
        Error::PixelOutOfRange {
            index: 3,
            pixel_count: 3
        }
    ));
    assert!(matches!(leds.get_pixel(7), Err(Error::PixelOutOfRange { .. })));
    assert_eq!(leds.active_frame().map(<[u8]>::to_vec), before);

    // Still usable afterwards.
    leds.set_pixel(2, Argb(0x0100_0001), PixelMode::Copy)?;
    assert_eq!(leds.get_pixel(2)?, Argb(0x0100_0001));
    Ok(())
}

#[test]
fn set_brightness_rewrites_brightness_but_not_colour() -> Result<()> {
    let capture = CaptureTransport::new();
    let mut leds = FramePipeline::with_transport(5, 8, capture.clone())?;
    leds.set_brightness(2);
    leds.begin_frame(false)?;
    leds.fill(Argb(0xff10_2030))?;
    leds.set_pixel(4, Argb(0xff44_5566), PixelMode::Copy)?;
    assert_eq!(leds.get_pixel(0)?, Argb(0x0210_2030));

    leds.set_brightness(31);
    assert_eq!(leds.brightness(), 31);
    leds.finish_frame()?;
    leds.shutdown()?;

    let frame = capture.last_frame().expect("one frame was sent");
    let records: Vec<&[u8]> = frame[4..4 + 5 * 4].chunks(4).collect();
    assert_eq!(
        records,
        [
            &[0xff, 0x30, 0x20, 0x10][..],
            &[0xff, 0x30, 0x20, 0x10],
            &[0xff, 0x30, 0x20, 0x10],
            &[0xff, 0x30, 0x20, 0x10],
            &[0xff, 0x66, 0x55, 0x44],
        ]
    );
    Ok(())
}

#[test]
fn set_brightness_clamps_to_31() -> Result<()> {
    let mut leds = FramePipeline::with_transport(1, 200, CaptureTransport::new())?;
    assert_eq!(leds.brightness(), 31);
    leds.set_brightness(0);
    assert_eq!(leds.brightness(), 0);
    leds.set_brightness(99);
    assert_eq!(leds.brightness(), 31);
    Ok(())
}

#[test]
fn clear_turns_every_pixel_off() -> Result<()> {
    let mut leds = FramePipeline::with_transport(3, 8, CaptureTransport::new())?;
    leds.begin_frame(false)?;
    leds.fill(Argb::WHITE)?;
    leds.clear()?;
    for index in 0..3 {
        assert_eq!(leds.get_pixel(index)?, Argb::BLACK);
    }
    assert_eq!(leds.active_frame().map(|frame| frame[4]), Some(0xe0));
    Ok(())
}

#[test]
fn copy_previous_carries_pixels_forward() -> Result<()> {
    let capture = CaptureTransport::new();
    let mut leds = FramePipeline::with_transport(4, 8, capture.clone())?;

    // No previous frame yet: starts dark.
    leds.begin_frame(true)?;
    assert_eq!(leds.get_pixel(0)?, Argb::BLACK);
    leds.set_pixel(0, Argb(0x0300_00ff), PixelMode::Copy)?;
    leds.finish_frame()?;

    leds.begin_frame(true)?;
    assert_eq!(leds.get_pixel(0)?, Argb(0x0300_00ff));
    leds.set_pixel(1, Argb(0x0400_ff00), PixelMode::Copy)?;
    leds.finish_frame()?;

    leds.begin_frame(false)?;
    assert_eq!(leds.get_pixel(0)?, Argb::BLACK);
    assert_eq!(leds.get_pixel(1)?, Argb::BLACK);
    leds.finish_frame()?;
    leds.shutdown()?;

    let frames = capture.frames();
    assert_eq!(frames[1][4..12], [0xe3, 0xff, 0x00, 0x00, 0xe4, 0x00, 0xff, 0x00]);
    Ok(())
}

#[test]
fn begin_frame_twice_restarts_the_same_buffer() -> Result<()> {
    let mut leds = FramePipeline::with_transport(2, 8, CaptureTransport::new())?;
    leds.begin_frame(false)?;
    leds.set_pixel(0, Argb::WHITE, PixelMode::Copy)?;
    leds.begin_frame(false)?;
    assert_eq!(leds.get_pixel(0)?, Argb::BLACK);
    assert_eq!(leds.pool_status().free, POOL_SIZE - 1);
    assert_eq!(leds.pool_status().checked_out, 1);
    Ok(())
}

#[test]
fn shutdown_is_idempotent_and_closes_the_transport() -> Result<()> {
    let capture = CaptureTransport::new();
    let mut leds = FramePipeline::with_transport(2, 8, capture.clone())?;
    assert!(leds.is_running());
    leds.begin_frame(false)?;
    leds.finish_frame()?;
    leds.shutdown()?;

    assert!(!leds.is_running());
    assert!(capture.is_closed());
    assert_eq!(capture.frame_count(), 1);
    leds.shutdown()?;
    assert!(matches!(leds.begin_frame(false), Err(Error::PipelineStopped)));
    assert!(matches!(leds.finish_frame(), Err(Error::PipelineStopped)));
    assert_eq!(leds.pool_status(), PoolStatus::default());
    Ok(())
}

#[test]
fn dropping_the_pipeline_flushes_and_closes() -> Result<()> {
    let capture = CaptureTransport::new();
    {
        let mut leds = FramePipeline::with_transport(2, 8, capture.clone())?;
        for _ in 0..5 {
            leds.begin_frame(false)?;
            leds.finish_frame()?;
        }
    }
    assert!(capture.is_closed());
    assert_eq!(capture.frame_count(), 5);
    Ok(())
}

#[test]
fn init_reports_open_failure() {
    let result = FramePipeline::<CaptureTransport>::init(8, 8, || {
        Err(Error::TransportOpen {
            device: "/dev/spidev9.9".to_owned(),
            message: "No such file or directory".to_owned(),
        })
    });
    assert!(matches!(result, Err(Error::TransportOpen { .. })));
}

#[test]
fn init_rejects_empty_chain_without_opening() {
    let mut opened = false;
    let result = FramePipeline::init(0, 8, || {
        opened = true;
        Ok(CaptureTransport::new())
    });
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
    assert!(!opened);
}

#[test]
fn from_config_sizes_the_chain() -> Result<()> {
    let capture = CaptureTransport::new();
    let config = ChainConfig {
        pixel_count: 146,
        brightness: 12,
        ..ChainConfig::default()
    };
    let mut seen_device = String::new();
    let leds = FramePipeline::from_config(&config, |config| {
        seen_device.clone_from(&config.device);
        Ok(capture.clone())
    })?;
    assert_eq!(seen_device, "/dev/spidev0.0");
    assert_eq!(leds.pixel_count(), 146);
    assert_eq!(leds.brightness(), 12);
    assert_eq!(leds.frame_length(), 4 + 146 * 4 + 12);
    Ok(())
}
