//! Crate-wide error type.

/// Result type used throughout this crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors reported by the frame pipeline, the panel addressing and the bus transports.
///
/// Usage errors ([`Error::NoActiveFrame`], [`Error::PixelOutOfRange`], [`Error::OutOfBounds`])
/// leave the pipeline fully usable. Transport errors that happen while frames stream in the
/// background never reach the producer; they are logged and counted instead.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
#[non_exhaustive]
pub enum Error {
    /// A pixel operation was attempted with no frame checked out.
    #[display("no frame is checked out (call begin_frame first)")]
    NoActiveFrame,

    /// Pixel index outside the configured chain.
    #[display("pixel {index} is outside the chain of {pixel_count} pixels")]
    PixelOutOfRange {
        /// Requested pixel index.
        index: usize,
        /// Number of pixels in the chain.
        pixel_count: usize,
    },

    /// 2-D coordinate not covered by any panel.
    #[display("({x}, {y}) is not covered by any panel")]
    OutOfBounds {
        /// Requested column.
        x: i32,
        /// Requested row.
        y: i32,
    },

    /// A non-blocking queue operation found the queue full (put) or empty (get).
    #[display("queue operation would block")]
    WouldBlock,

    /// The pipeline has already been shut down.
    #[display("frame pipeline is not running")]
    PipelineStopped,

    /// The bus device could not be opened.
    #[display("cannot open bus device {device}: {message}")]
    TransportOpen {
        /// Device identifier, e.g. `/dev/spidev0.0`.
        device: String,
        /// Underlying failure.
        message: String,
    },

    /// The bus device rejected a mode, word size or speed setting.
    #[display("cannot configure bus {setting}: {message}")]
    TransportConfig {
        /// Which setting failed.
        setting: &'static str,
        /// Underlying failure.
        message: String,
    },

    /// A transfer moved fewer bytes than requested.
    #[display("bus transfer wrote {written} of {expected} bytes")]
    Transfer {
        /// Bytes handed to the bus.
        expected: usize,
        /// Bytes the bus reported as moved.
        written: usize,
    },

    /// Any other transport failure.
    #[display("bus transport error: {_0}")]
    Transport(#[error(not(source))] String),

    /// Reading a configuration file failed.
    #[from]
    #[display("I/O error: {_0}")]
    Io(std::io::Error),

    /// A configuration document could not be parsed.
    #[from]
    #[display("configuration format error: {_0}")]
    Config(serde_json::Error),

    /// A configuration value is semantically invalid.
    #[display("invalid configuration: {_0}")]
    InvalidConfig(#[error(not(source))] &'static str),
}
