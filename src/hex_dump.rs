//! Hex formatting of frame bytes for logs.

use core::fmt;

/// Formats bytes as lowercase hex pairs, `per_line` to a line.
///
/// Lines are separated by `\n` with no trailing newline. `per_line == 0` puts everything on one
/// line.
///
/// ```rust
/// use apa102_display::hex_dump::HexDump;
///
/// let frame = [0x00, 0x00, 0x00, 0x00, 0xe8, 0x33, 0x22, 0x11, 0x00];
/// assert_eq!(
///     HexDump::new(&frame, 4).to_string(),
///     "00 00 00 00\ne8 33 22 11\n00"
/// );
/// ```
#[derive(Clone, Copy, Debug)]
pub struct HexDump<'a> {
    bytes: &'a [u8],
    per_line: usize,
}

impl<'a> HexDump<'a> {
    /// Wrap `bytes` for formatting.
    #[must_use]
    pub const fn new(bytes: &'a [u8], per_line: usize) -> Self {
        Self { bytes, per_line }
    }
}

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let per_line = if self.per_line == 0 {
            self.bytes.len().max(1)
        } else {
            self.per_line
        };
        for (line_index, line) in self.bytes.chunks(per_line).enumerate() {
            if line_index > 0 {
                f.write_str("\n")?;
            }
            for (byte_index, byte) in line.iter().enumerate() {
                if byte_index > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{byte:02x}")?;
            }
        }
        Ok(())
    }
}
