//! Double-ended frame pipeline: the caller edits one frame while a background thread streams
//! earlier frames to the bus.
//!
//! See [`FramePipeline`] for the full picture.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crate::bounded_queue::BoundedQueue;
use crate::color::Argb;
use crate::config::ChainConfig;
use crate::frame_codec::{
    self, BRIGHTNESS_MAX, OFF_RECORD, PIXEL_LEN, PixelMode, START_LEN,
};
use crate::hex_dump::HexDump;
use crate::transport::BusTransport;
use crate::{Error, Result};

/// Number of frame buffers recycled between the producer and the transmitter.
pub const POOL_SIZE: usize = 8;

type FrameBuffer = Box<[u8]>;

// Shutdown travels through the same queue as frames so it is seen after every frame queued
// before it.
enum Message {
    Frame(FrameBuffer),
    Shutdown,
}

#[derive(Clone, Copy, Debug)]
enum Place {
    Free,
    Ready,
    CheckedOut,
    InFlight,
}

struct Shared {
    free: BoundedQueue<FrameBuffer>,
    ready: BoundedQueue<Message>,
    // Buffers per place; each hand-off updates both ends under this one lock.
    places: Mutex<PoolStatus>,
    frames_sent: AtomicU64,
    transfer_failures: AtomicU64,
}

impl Shared {
    fn moved(&self, from: Place, to: Place) {
        let mut places = self.places.lock().unwrap_or_else(PoisonError::into_inner);
        *places.count_mut(from) -= 1;
        *places.count_mut(to) += 1;
    }

    fn places(&self) -> PoolStatus {
        *self.places.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Where the pool's buffers are at one instant. While the pipeline runs the four counts
/// always add up to [`POOL_SIZE`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStatus {
    /// Buffers waiting in the free queue.
    pub free: usize,
    /// Finished frames waiting for the transmitter.
    pub ready: usize,
    /// 1 while the producer holds a frame between `begin_frame` and `finish_frame`.
    pub checked_out: usize,
    /// Frames the transmitter is currently writing to the bus.
    pub in_flight: usize,
}

impl PoolStatus {
    /// Sum of all four places.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.free + self.ready + self.checked_out + self.in_flight
    }

    fn count_mut(&mut self, place: Place) -> &mut usize {
        match place {
            Place::Free => &mut self.free,
            Place::Ready => &mut self.ready,
            Place::CheckedOut => &mut self.checked_out,
            Place::InFlight => &mut self.in_flight,
        }
    }
}

/// A fixed pool of APA102 frames cycling between the application and a transmitter thread.
///
/// Each buffer is in exactly one place at a time: the `free` queue, checked out by the
/// caller, the `ready` queue, or on the bus. Buffers move between these places by value, so
/// the bytes never need a lock.
///
/// ```text
///        begin_frame            finish_frame
/// free ─────────────► checked ─────────────► ready ──► transmitter ──► bus
///  ▲                    out                                   │
///  └──────────────────────────────────────────────────────────┘
/// ```
///
/// `begin_frame` blocks while all buffers are queued or on the bus, and `finish_frame` blocks
/// while `ready` is full, so a slow bus throttles the producer. Frames reach the bus in the
/// order they were finished.
///
/// A failed transfer is logged and counted ([`transfer_failures`](Self::transfer_failures));
/// the buffer still returns to `free` and the next frame replaces the dropped one.
///
/// # Example
///
/// ```rust
/// use apa102_display::color::Argb;
/// use apa102_display::frame_codec::PixelMode;
/// use apa102_display::pipeline::FramePipeline;
/// use apa102_display::transport::CaptureTransport;
/// # use std::time::Duration;
///
/// # fn main() -> apa102_display::Result<()> {
/// let capture = CaptureTransport::new();
/// let mut leds = FramePipeline::with_transport(3, 8, capture.clone())?;
///
/// leds.begin_frame(false)?;
/// leds.set_pixel(1, Argb(0xff11_2233), PixelMode::Copy)?;
/// leds.finish_frame()?;
/// leds.shutdown()?;
///
/// let frame = capture.last_frame().unwrap();
/// assert_eq!(frame[..16], [0, 0, 0, 0, 0xe0, 0, 0, 0, 0xe8, 0x33, 0x22, 0x11, 0xe0, 0, 0, 0]);
/// # Ok(())
/// # }
/// ```
pub struct FramePipeline<T: BusTransport> {
    pixel_count: usize,
    frame_length: usize,
    brightness: u8,
    shared: Option<Arc<Shared>>,
    transmitter: Option<JoinHandle<T>>,
    active: Option<FrameBuffer>,
    previous: FrameBuffer,
    has_previous: bool,
}

impl<T: BusTransport> FramePipeline<T> {
    /// Open the bus with `open`, allocate the pool and start the transmitter.
    ///
    /// # Errors
    ///
    /// Whatever `open` returns (typically [`Error::TransportOpen`] or
    /// [`Error::TransportConfig`]); nothing is left running in that case.
    /// [`Error::InvalidConfig`] when `pixel_count` is zero.
    pub fn init<F>(pixel_count: usize, brightness: u8, open: F) -> Result<Self>
    where
        F: FnOnce() -> Result<T>,
    {
        if pixel_count == 0 {
            return Err(Error::InvalidConfig("pixel count must be at least 1"));
        }
        let transport = open().inspect_err(|err| log::error!("FramePipeline::init: {err}"))?;
        Self::with_transport(pixel_count, brightness, transport)
    }

    /// Start a pipeline sized and lit as `config` says. `open` receives the configuration so
    /// it can pick the device and clock.
    ///
    /// # Errors
    ///
    /// As [`init`](Self::init).
    pub fn from_config<F>(config: &ChainConfig, open: F) -> Result<Self>
    where
        F: FnOnce(&ChainConfig) -> Result<T>,
    {
        Self::init(config.pixel_count, config.brightness, || open(config))
    }

    /// Start a pipeline over an already opened transport.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] when `pixel_count` is zero, [`Error::Io`] if the transmitter
    /// thread cannot be spawned.
    pub fn with_transport(pixel_count: usize, brightness: u8, transport: T) -> Result<Self> {
        if pixel_count == 0 {
            return Err(Error::InvalidConfig("pixel count must be at least 1"));
        }
        let frame_length = frame_codec::frame_length(pixel_count);
        let shared = Arc::new(Shared {
            free: BoundedQueue::new("free_frames", POOL_SIZE),
            ready: BoundedQueue::new("ready_frames", POOL_SIZE),
            places: Mutex::new(PoolStatus {
                free: POOL_SIZE,
                ..PoolStatus::default()
            }),
            frames_sent: AtomicU64::new(0),
            transfer_failures: AtomicU64::new(0),
        });
        for _ in 0..POOL_SIZE {
            shared.free.put(quiescent_frame(pixel_count), false)?;
        }

        let transmitter = thread::Builder::new()
            .name("apa102-transmitter".to_owned())
            .spawn({
                let shared = Arc::clone(&shared);
                move || transmit(&shared, transport)
            })?;

        log::info!(
            "FramePipeline: started ({pixel_count} pixels, {frame_length} bytes per frame, {POOL_SIZE} frames)"
        );
        Ok(Self {
            pixel_count,
            frame_length,
            brightness: brightness.min(BRIGHTNESS_MAX),
            shared: Some(shared),
            transmitter: Some(transmitter),
            active: None,
            previous: quiescent_frame(pixel_count),
            has_previous: false,
        })
    }

    /// Check out a frame for editing, waiting for a free buffer if necessary.
    ///
    /// With `copy_previous`, the frame starts as a copy of the last finished frame (if there
    /// was one); otherwise every pixel starts dark. Calling this while a frame is already
    /// checked out restarts that same frame.
    ///
    /// # Errors
    ///
    /// [`Error::PipelineStopped`] after [`shutdown`](Self::shutdown).
    pub fn begin_frame(&mut self, copy_previous: bool) -> Result<()> {
        let shared = Arc::clone(self.shared.as_ref().ok_or(Error::PipelineStopped)?);
        let mut frame = match self.active.take() {
            Some(frame) => frame,
            None => {
                if shared.free.is_empty() {
                    log::debug!("FramePipeline::begin_frame: waiting for a free frame");
                }
                let frame = shared.free.get(true)?;
                shared.moved(Place::Free, Place::CheckedOut);
                frame
            }
        };
        if copy_previous && self.has_previous {
            frame.copy_from_slice(&self.previous);
        } else {
            frame_codec::write_quiescent(&mut frame, self.pixel_count);
        }
        self.active = Some(frame);
        Ok(())
    }

    /// Queue the checked-out frame for transmission, waiting if the ready queue is full.
    ///
    /// The frame also becomes the "previous" frame for the next `begin_frame(true)`.
    ///
    /// # Errors
    ///
    /// [`Error::NoActiveFrame`] without a prior [`begin_frame`](Self::begin_frame),
    /// [`Error::PipelineStopped`] after [`shutdown`](Self::shutdown).
    pub fn finish_frame(&mut self) -> Result<()> {
        let shared = Arc::clone(self.shared.as_ref().ok_or(Error::PipelineStopped)?);
        let frame = self.active.take().ok_or(Error::NoActiveFrame)?;
        self.previous.copy_from_slice(&frame);
        self.has_previous = true;
        shared.ready.put(Message::Frame(frame), true)?;
        shared.moved(Place::CheckedOut, Place::Ready);
        log::trace!("FramePipeline::finish_frame: frame queued");
        Ok(())
    }

    /// Combine `argb` into pixel `index` of the checked-out frame using `mode`.
    ///
    /// Either all four record bytes are written or none.
    ///
    /// # Errors
    ///
    /// [`Error::NoActiveFrame`] or [`Error::PixelOutOfRange`].
    pub fn set_pixel(&mut self, index: usize, argb: Argb, mode: PixelMode) -> Result<()> {
        let brightness = self.brightness;
        let (frame, offset) = self.locate_record(index)?;
        let old = frame_codec::read_record(frame, offset);
        let new = frame_codec::encode_pixel(old, argb, brightness, mode);
        frame_codec::write_record(frame, offset, new);
        Ok(())
    }

    /// Read pixel `index` of the checked-out frame. Alpha holds the 5-bit brightness.
    ///
    /// # Errors
    ///
    /// [`Error::NoActiveFrame`] or [`Error::PixelOutOfRange`].
    pub fn get_pixel(&self, index: usize) -> Result<Argb> {
        let frame = self.active.as_deref().ok_or(Error::NoActiveFrame)?;
        let offset = frame_codec::pixel_offset(index, self.pixel_count).ok_or(
            Error::PixelOutOfRange {
                index,
                pixel_count: self.pixel_count,
            },
        )?;
        Ok(frame_codec::decode_pixel(frame_codec::read_record(
            frame, offset,
        )))
    }

    /// Turn every pixel of the checked-out frame off (colour zero, brightness bits zero).
    ///
    /// # Errors
    ///
    /// [`Error::NoActiveFrame`].
    pub fn clear(&mut self) -> Result<()> {
        for record in self.pixel_records_mut()? {
            record.copy_from_slice(&OFF_RECORD);
        }
        Ok(())
    }

    /// Set every pixel of the checked-out frame to `argb` ([`PixelMode::Copy`]).
    ///
    /// # Errors
    ///
    /// [`Error::NoActiveFrame`].
    pub fn fill(&mut self, argb: Argb) -> Result<()> {
        let brightness = self.brightness;
        for record in self.pixel_records_mut()? {
            let mut old = [0; PIXEL_LEN];
            old.copy_from_slice(record);
            record.copy_from_slice(&frame_codec::encode_pixel(
                old,
                argb,
                brightness,
                PixelMode::Copy,
            ));
        }
        Ok(())
    }

    /// Change the default brightness (clamped to 0-31) used by later encodes and, when a frame
    /// is checked out, rewrite the brightness of all its pixels. Colours are left alone.
    pub fn set_brightness(&mut self, level: u8) {
        self.brightness = level.min(BRIGHTNESS_MAX);
        let brightness_byte = frame_codec::brightness_byte(self.brightness);
        if let Ok(records) = self.pixel_records_mut() {
            for record in records {
                record[0] = brightness_byte;
            }
        }
    }

    /// Stop the transmitter after it has sent every queued frame, close the bus and release
    /// the pool. Does nothing when already stopped.
    ///
    /// # Errors
    ///
    /// [`Error::Transport`] if the transmitter thread panicked, or whatever closing the
    /// transport reports.
    pub fn shutdown(&mut self) -> Result<()> {
        let Some(shared) = self.shared.take() else {
            return Ok(());
        };
        self.active = None;
        shared.ready.put(Message::Shutdown, true)?;
        let result = match self.transmitter.take().map(JoinHandle::join) {
            Some(Ok(mut transport)) => transport.close(),
            Some(Err(_)) => Err(Error::Transport(
                "transmitter thread panicked".to_owned(),
            )),
            None => Ok(()),
        };
        log::info!(
            "FramePipeline: stopped after {} frames ({} failed transfers)",
            shared.frames_sent.load(Ordering::Relaxed),
            shared.transfer_failures.load(Ordering::Relaxed)
        );
        result
    }

    /// Number of LEDs in the chain.
    #[must_use]
    pub const fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    /// Bytes per frame on the wire.
    #[must_use]
    pub const fn frame_length(&self) -> usize {
        self.frame_length
    }

    /// Current default brightness (0-31).
    #[must_use]
    pub const fn brightness(&self) -> u8 {
        self.brightness
    }

    /// `true` until [`shutdown`](Self::shutdown).
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.shared.is_some()
    }

    /// Bytes of the checked-out frame, if any.
    #[must_use]
    pub fn active_frame(&self) -> Option<&[u8]> {
        self.active.as_deref()
    }

    /// Where the pool's buffers currently are. All zero after shutdown.
    #[must_use]
    pub fn pool_status(&self) -> PoolStatus {
        self.shared
            .as_ref()
            .map_or_else(PoolStatus::default, |shared| shared.places())
    }

    /// Frames the transmitter has written successfully.
    #[must_use]
    pub fn frames_sent(&self) -> u64 {
        self.shared
            .as_ref()
            .map_or(0, |shared| shared.frames_sent.load(Ordering::Relaxed))
    }

    /// Transfers that failed and were dropped.
    #[must_use]
    pub fn transfer_failures(&self) -> u64 {
        self.shared
            .as_ref()
            .map_or(0, |shared| shared.transfer_failures.load(Ordering::Relaxed))
    }

    fn locate_record(&mut self, index: usize) -> Result<(&mut [u8], usize)> {
        let pixel_count = self.pixel_count;
        let frame = self.active.as_deref_mut().ok_or(Error::NoActiveFrame)?;
        let offset = frame_codec::pixel_offset(index, pixel_count).ok_or(
            Error::PixelOutOfRange {
                index,
                pixel_count,
            },
        )?;
        Ok((frame, offset))
    }

    fn pixel_records_mut(&mut self) -> Result<core::slice::ChunksExactMut<'_, u8>> {
        let pixel_bytes = self.pixel_count * PIXEL_LEN;
        let frame = self.active.as_deref_mut().ok_or(Error::NoActiveFrame)?;
        Ok(frame[START_LEN..START_LEN + pixel_bytes].chunks_exact_mut(PIXEL_LEN))
    }
}

impl<T: BusTransport> Drop for FramePipeline<T> {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            log::warn!("FramePipeline::drop: {err}");
        }
    }
}

impl<T: BusTransport> core::fmt::Debug for FramePipeline<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FramePipeline")
            .field("pixel_count", &self.pixel_count)
            .field("frame_length", &self.frame_length)
            .field("brightness", &self.brightness)
            .field("running", &self.is_running())
            .field("pool", &self.pool_status())
            .finish_non_exhaustive()
    }
}

fn quiescent_frame(pixel_count: usize) -> FrameBuffer {
    let mut frame = vec![0; frame_codec::frame_length(pixel_count)].into_boxed_slice();
    frame_codec::write_quiescent(&mut frame, pixel_count);
    frame
}

// Runs on the transmitter thread; the transport never leaves it until shutdown hands it back.
fn transmit<T: BusTransport>(shared: &Shared, mut transport: T) -> T {
    log::debug!("transmitter: started");
    loop {
        let frame = match shared.ready.get(true) {
            Ok(Message::Frame(frame)) => {
                shared.moved(Place::Ready, Place::InFlight);
                frame
            }
            Ok(Message::Shutdown) => break,
            Err(err) => {
                log::error!("transmitter: {err}");
                break;
            }
        };

        match transport.transfer(&frame) {
            Ok(()) => {
                shared.frames_sent.fetch_add(1, Ordering::Relaxed);
                if log::log_enabled!(log::Level::Trace) {
                    log::trace!(
                        "transmitter: sent {} bytes\n{}",
                        frame.len(),
                        HexDump::new(&frame, 16)
                    );
                }
            }
            Err(err) => {
                shared.transfer_failures.fetch_add(1, Ordering::Relaxed);
                log::warn!("transmitter: frame dropped: {err}");
            }
        }
        if shared.free.put(frame, true).is_err() {
            log::error!("transmitter: free queue rejected a frame");
        } else {
            shared.moved(Place::InFlight, Place::Free);
        }
    }
    log::debug!("transmitter: stopped");
    transport
}
