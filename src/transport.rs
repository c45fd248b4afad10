//! Bus transports that move finished frames to the LED chain.
//!
//! The frame pipeline hands every transport to its transmitter thread, which is the only code
//! that ever touches it. Implementations therefore need `Send` but no internal locking.
//!
//! - [`HalTransport`] adapts any `embedded-hal` 1.0 [`SpiBus`].
//! - [`SpidevTransport`] drives a Linux `/dev/spidevB.C` device (feature `spidev`).
//! - [`CaptureTransport`] keeps every frame in memory, for tests and dry runs.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use embedded_hal::spi::{Error as _, SpiBus};

use crate::{Error, Result};

/// Synchronous byte sink for whole frames.
pub trait BusTransport: Send + 'static {
    /// Write all of `bytes` in one bus transaction.
    ///
    /// # Errors
    ///
    /// Fails if the transport is closed or the bus moved fewer bytes than requested.
    fn transfer(&mut self, bytes: &[u8]) -> Result<()>;

    /// Release the bus. Closing an already-closed transport succeeds.
    ///
    /// # Errors
    ///
    /// Implementation specific; the built-in transports never fail here.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// [`BusTransport`] over an `embedded-hal` SPI bus.
///
/// The bus must already be configured for APA102 (mode 3, 8-bit words, no chip select).
#[derive(Debug)]
pub struct HalTransport<S> {
    spi: Option<S>,
}

impl<S: SpiBus<u8>> HalTransport<S> {
    /// Wrap a configured bus.
    #[must_use]
    pub const fn new(spi: S) -> Self {
        Self { spi: Some(spi) }
    }

    /// Give the bus back, or `None` once closed.
    #[must_use]
    pub fn into_inner(self) -> Option<S> {
        self.spi
    }
}

impl<S: SpiBus<u8> + Send + 'static> BusTransport for HalTransport<S> {
    fn transfer(&mut self, bytes: &[u8]) -> Result<()> {
        let spi = self
            .spi
            .as_mut()
            .ok_or_else(|| Error::Transport("bus is closed".to_owned()))?;
        spi.write(bytes)
            .and_then(|()| spi.flush())
            .map_err(|err| Error::Transport(format!("{:?}", err.kind())))
    }

    fn close(&mut self) -> Result<()> {
        self.spi = None;
        Ok(())
    }
}

/// In-memory transport recording every frame it is given.
///
/// Clones share the same record, so a test can keep one clone while the pipeline owns another.
///
/// ```rust
/// use apa102_display::transport::{BusTransport, CaptureTransport};
///
/// let capture = CaptureTransport::new();
/// let mut transport = capture.clone();
/// transport.transfer(&[0, 0, 0, 0]).unwrap();
/// assert_eq!(capture.frames(), vec![vec![0, 0, 0, 0]]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct CaptureTransport {
    shared: Arc<CaptureShared>,
}

#[derive(Debug, Default)]
struct CaptureShared {
    state: Mutex<CaptureState>,
    changed: Condvar,
}

#[derive(Debug, Default)]
struct CaptureState {
    frames: Vec<Vec<u8>>,
    failures_to_inject: usize,
    failed_transfers: usize,
    closed: bool,
    gate: Option<usize>,
    in_transfer: bool,
}

impl CaptureTransport {
    /// Empty capture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies of all frames transferred so far, oldest first.
    #[must_use]
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.lock().frames.clone()
    }

    /// Number of frames transferred so far.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.lock().frames.len()
    }

    /// The most recent frame, if any.
    #[must_use]
    pub fn last_frame(&self) -> Option<Vec<u8>> {
        self.lock().frames.last().cloned()
    }

    /// Make the next `count` transfers fail without recording anything.
    pub fn fail_next(&self, count: usize) {
        self.lock().failures_to_inject = count;
    }

    /// Number of transfers that failed on purpose.
    #[must_use]
    pub fn failed_transfers(&self) -> usize {
        self.lock().failed_transfers
    }

    /// `true` once [`BusTransport::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Hold every transfer until [`release`](Self::release) allows it through.
    pub fn hold(&self) {
        self.lock().gate = Some(0);
    }

    /// Let `count` more held transfers complete. Without a prior [`hold`](Self::hold) this
    /// does nothing.
    pub fn release(&self, count: usize) {
        let mut state = self.lock();
        if let Some(allowed) = state.gate.as_mut() {
            *allowed += count;
        }
        drop(state);
        self.shared.changed.notify_all();
    }

    /// Stop holding transfers.
    pub fn open_gate(&self) {
        self.lock().gate = None;
        self.shared.changed.notify_all();
    }

    /// `true` while a held transfer is waiting inside [`BusTransport::transfer`].
    #[must_use]
    pub fn is_transfer_pending(&self) -> bool {
        self.lock().in_transfer
    }

    /// Wait until `predicate` holds on (frames recorded, failed transfers, held transfer
    /// pending) or `timeout` passes. Returns the final predicate value.
    pub fn wait_until(
        &self,
        timeout: Duration,
        mut predicate: impl FnMut(usize, usize, bool) -> bool,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if predicate(state.frames.len(), state.failed_transfers, state.in_transfer) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self
                .shared
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Wait until at least `count` frames have been recorded.
    pub fn wait_for_frames(&self, count: usize, timeout: Duration) -> bool {
        self.wait_until(timeout, |frames, _, _| frames >= count)
    }

    fn lock(&self) -> MutexGuard<'_, CaptureState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl BusTransport for CaptureTransport {
    fn transfer(&mut self, bytes: &[u8]) -> Result<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(Error::Transport("capture is closed".to_owned()));
        }
        state.in_transfer = true;
        self.shared.changed.notify_all();
        while state.gate == Some(0) {
            state = self
                .shared
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if let Some(allowed) = state.gate.as_mut() {
            *allowed -= 1;
        }
        state.in_transfer = false;

        let result = if state.failures_to_inject > 0 {
            state.failures_to_inject -= 1;
            state.failed_transfers += 1;
            Err(Error::Transfer {
                expected: bytes.len(),
                written: 0,
            })
        } else {
            state.frames.push(bytes.to_vec());
            Ok(())
        };
        drop(state);
        self.shared.changed.notify_all();
        result
    }

    fn close(&mut self) -> Result<()> {
        self.lock().closed = true;
        self.shared.changed.notify_all();
        Ok(())
    }
}

#[cfg(feature = "spidev")]
pub use self::linux::SpidevTransport;

#[cfg(feature = "spidev")]
mod linux {
    use std::fs::OpenOptions;

    use spidev::{SpiModeFlags, Spidev, SpidevOptions, SpidevTransfer};

    use super::BusTransport;
    use crate::{Error, Result};

    /// Linux `spidev` character device configured for APA102: clock idle high, data sampled
    /// on the trailing edge (mode 3), 8-bit words, no chip select.
    #[derive(Debug)]
    pub struct SpidevTransport {
        device: String,
        speed_hz: u32,
        spi: Option<Spidev>,
    }

    impl SpidevTransport {
        /// Open `device` write-only and configure it.
        ///
        /// # Errors
        ///
        /// [`Error::TransportOpen`] if the device cannot be opened,
        /// [`Error::TransportConfig`] if it rejects the mode, word size or speed.
        pub fn open(device: &str, speed_hz: u32) -> Result<Self> {
            let file = OpenOptions::new()
                .write(true)
                .open(device)
                .map_err(|err| Error::TransportOpen {
                    device: device.to_owned(),
                    message: err.to_string(),
                })?;
            let mut spi = Spidev::new(file);
            let options = SpidevOptions::new()
                .mode(SpiModeFlags::SPI_MODE_3 | SpiModeFlags::SPI_NO_CS)
                .bits_per_word(8)
                .max_speed_hz(speed_hz)
                .build();
            spi.configure(&options)
                .map_err(|err| Error::TransportConfig {
                    setting: "mode 3 / 8 bits per word / speed",
                    message: err.to_string(),
                })?;
            log::info!(
                "spidev: opened {device} at {:.3} MHz",
                f64::from(speed_hz) / 1_000_000.0
            );
            Ok(Self {
                device: device.to_owned(),
                speed_hz,
                spi: Some(spi),
            })
        }

        /// Device path given to [`open`](Self::open).
        #[must_use]
        pub fn device(&self) -> &str {
            &self.device
        }

        /// Configured maximum clock speed.
        #[must_use]
        pub const fn speed_hz(&self) -> u32 {
            self.speed_hz
        }
    }

    impl BusTransport for SpidevTransport {
        fn transfer(&mut self, bytes: &[u8]) -> Result<()> {
            let spi = self.spi.as_mut().ok_or_else(|| {
                Error::Transport(format!("{} is not open", self.device))
            })?;
            // One SPI_IOC_MESSAGE per frame; the kernel fails it rather than moving part of it.
            spi.transfer(&mut SpidevTransfer::write(bytes))
                .map_err(|err| Error::Transport(format!("{}: {err}", self.device)))
        }

        fn close(&mut self) -> Result<()> {
            if self.spi.take().is_some() {
                log::info!("spidev: closed {}", self.device);
            }
            Ok(())
        }
    }
}
