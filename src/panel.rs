//! 2-D addressing for chains of serpentine-wired LED panels (with examples).
//!
//! A [`PanelLayout`] lists rigid LED boards in the order they are chained. Each board is
//! placed on a shared `(x, y)` canvas and wired zig-zag from one of its corners, its
//! [`Anchor`]. [`PanelLayout::locate`] turns a canvas coordinate into the LED's position in
//! the chain.
//!
//! Coordinates use a screen-style convention: `(0, 0)` is the top-left corner,
//! `x` increases to the right, and `y` increases downward.
//!
//! ```text
//! Two 5×3 boards, M1 anchored top-left, M2 anchored bottom-left:
//!
//!   y\x     0   1   2   3   4      5   6   7   8   9
//!   0   in→ 0   1   2   3   4     17  18  23  24  29 → out
//!   1       9   8   7   6   5     16  19  22  25  28
//!   2      10  11  12  13  14 →   15  20  21  26  27
//! ```
//!
//! Overlapping panels are not rejected; the first panel in declaration order that contains a
//! coordinate wins.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Corner where the data line enters a panel, which fixes its serpentine direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// Rows, starting left-to-right along the top row.
    TopLeft,
    /// Columns, starting top-to-bottom down the rightmost column.
    TopRight,
    /// Rows, starting right-to-left along the bottom row.
    BottomRight,
    /// Columns, starting bottom-to-top up the leftmost column.
    BottomLeft,
}

impl Anchor {
    /// All four anchors.
    pub const ALL: [Self; 4] = [
        Self::TopLeft,
        Self::TopRight,
        Self::BottomRight,
        Self::BottomLeft,
    ];

    /// Position in the panel's own chain of the LED at panel-local `(zx, zy)`.
    ///
    /// `zx < width` and `zy < height` are the caller's responsibility.
    ///
    /// ```rust
    /// use apa102_display::panel::Anchor;
    ///
    /// // 3×2 top-left panel:
    /// //   0  1  2
    /// //   5  4  3
    /// assert_eq!(Anchor::TopLeft.serpentine_index(0, 1, 3, 2), 5);
    /// assert_eq!(Anchor::TopLeft.serpentine_index(2, 1, 3, 2), 3);
    /// ```
    #[must_use]
    pub const fn serpentine_index(self, zx: usize, zy: usize, width: usize, height: usize) -> usize {
        match self {
            Self::TopLeft => top_left(zx, zy, width),
            Self::TopRight => top_right(zx, zy, width, height),
            Self::BottomRight => bottom_right(zx, zy, width, height),
            Self::BottomLeft => bottom_left(zx, zy, height),
        }
    }
}

const fn top_left(zx: usize, zy: usize, width: usize) -> usize {
    let major = zy * width;
    let minor = if zy % 2 == 1 { width - 1 - zx } else { zx };
    major + minor
}

const fn bottom_right(zx: usize, zy: usize, width: usize, height: usize) -> usize {
    let row = height - 1 - zy;
    let major = row * width;
    let minor = if row % 2 == 0 { width - 1 - zx } else { zx };
    major + minor
}

const fn bottom_left(zx: usize, zy: usize, height: usize) -> usize {
    let major = zx * height;
    let minor = if zx % 2 == 0 { height - 1 - zy } else { zy };
    major + minor
}

const fn top_right(zx: usize, zy: usize, width: usize, height: usize) -> usize {
    let column = width - 1 - zx;
    let major = column * height;
    let minor = if column % 2 == 1 { height - 1 - zy } else { zy };
    major + minor
}

/// Top-left corner of a panel on the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

/// Panel dimensions in LEDs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PanelSize {
    /// LEDs per row.
    pub width: u32,
    /// LEDs per column.
    pub height: u32,
}

/// One rigid LED board: where it sits on the canvas and how it is wired.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Panel {
    /// Free-form label used in log messages.
    #[serde(default)]
    pub name: String,
    /// Corner where the data line enters.
    pub anchor: Anchor,
    /// Top-left corner on the canvas.
    pub position: Position,
    /// Width × height in LEDs.
    pub size: PanelSize,
}

impl Panel {
    /// Describe a panel.
    #[must_use]
    pub fn new(name: impl Into<String>, anchor: Anchor, x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            anchor,
            position: Position { x, y },
            size: PanelSize { width, height },
        }
    }

    /// Number of LEDs on the panel.
    #[must_use]
    pub const fn pixel_count(&self) -> usize {
        self.size.width as usize * self.size.height as usize
    }

    /// `true` when `(x, y)` falls inside the panel's rectangle.
    #[must_use]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.local(x, y).is_some()
    }

    /// Position in the panel's own chain of the LED at canvas `(x, y)`, if it is on this panel.
    #[must_use]
    pub fn led_index(&self, x: i32, y: i32) -> Option<usize> {
        let (zx, zy) = self.local(x, y)?;
        Some(self.anchor.serpentine_index(
            zx,
            zy,
            self.size.width as usize,
            self.size.height as usize,
        ))
    }

    fn local(&self, x: i32, y: i32) -> Option<(usize, usize)> {
        let zx = i64::from(x) - i64::from(self.position.x);
        let zy = i64::from(y) - i64::from(self.position.y);
        let inside = (0..i64::from(self.size.width)).contains(&zx)
            && (0..i64::from(self.size.height)).contains(&zy);
        inside.then_some((zx as usize, zy as usize))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ChainedPanel {
    panel: Panel,
    offset: usize,
}

/// Panels chained in declaration order; each panel's LEDs follow those of all earlier panels.
///
/// ```rust
/// use apa102_display::panel::{Anchor, Panel, PanelLayout};
///
/// # fn main() -> apa102_display::Result<()> {
/// let layout = PanelLayout::new(vec![
///     Panel::new("M1", Anchor::TopLeft, 0, 0, 5, 3),
///     Panel::new("M2", Anchor::BottomLeft, 5, 0, 5, 3),
/// ])?;
///
/// assert_eq!(layout.pixel_count(), 30);
/// assert_eq!(layout.locate(3, 1)?, 6);
/// assert_eq!(layout.locate(5, 2)?, 15);
/// assert!(layout.locate(10, 0).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PanelLayout {
    panels: Vec<ChainedPanel>,
    pixel_count: usize,
}

impl PanelLayout {
    /// Chain `panels` in the given order.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] if the list is empty or a panel has a zero dimension.
    pub fn new(panels: impl IntoIterator<Item = Panel>) -> Result<Self> {
        let mut chained = Vec::new();
        let mut offset = 0;
        for panel in panels {
            if panel.size.width == 0 || panel.size.height == 0 {
                return Err(Error::InvalidConfig("panel width and height must be positive"));
            }
            let pixel_count = panel.pixel_count();
            chained.push(ChainedPanel { panel, offset });
            offset += pixel_count;
        }
        if chained.is_empty() {
            return Err(Error::InvalidConfig("at least one panel is required"));
        }
        Ok(Self {
            panels: chained,
            pixel_count: offset,
        })
    }

    /// Total LEDs across all panels.
    #[must_use]
    pub const fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    /// Panels in chain order.
    pub fn panels(&self) -> impl Iterator<Item = &Panel> {
        self.panels.iter().map(|chained| &chained.panel)
    }

    /// Chain index of the first LED of the panel called `name`.
    #[must_use]
    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.panels
            .iter()
            .find(|chained| chained.panel.name == name)
            .map(|chained| chained.offset)
    }

    /// Chain index of the LED at canvas `(x, y)`.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfBounds`] when no panel covers `(x, y)`.
    pub fn locate(&self, x: i32, y: i32) -> Result<usize> {
        self.panels
            .iter()
            .find_map(|chained| {
                chained
                    .panel
                    .led_index(x, y)
                    .map(|index| chained.offset + index)
            })
            .ok_or(Error::OutOfBounds { x, y })
    }

    /// Smallest rectangle covering every panel, as (top-left, size).
    #[must_use]
    pub fn bounding_box(&self) -> (Position, PanelSize) {
        if self.panels.is_empty() {
            return (Position::default(), PanelSize { width: 0, height: 0 });
        }
        let mut min = (i64::MAX, i64::MAX);
        let mut max = (i64::MIN, i64::MIN);
        for ChainedPanel { panel, .. } in &self.panels {
            let left = i64::from(panel.position.x);
            let top = i64::from(panel.position.y);
            min = (min.0.min(left), min.1.min(top));
            max = (
                max.0.max(left + i64::from(panel.size.width)),
                max.1.max(top + i64::from(panel.size.height)),
            );
        }
        (
            Position {
                x: min.0 as i32,
                y: min.1 as i32,
            },
            PanelSize {
                width: (max.0 - min.0) as u32,
                height: (max.1 - min.1) as u32,
            },
        )
    }

    /// Canvas coordinate of every LED, indexed by chain position.
    ///
    /// Where panels overlap, an LED hidden behind an earlier panel keeps the coordinate it
    /// would have, even though [`locate`](Self::locate) never returns it.
    #[must_use]
    pub fn index_to_xy(&self) -> Vec<(i32, i32)> {
        let mut mapping = vec![(0, 0); self.pixel_count];
        for ChainedPanel { panel, offset } in &self.panels {
            let width = panel.size.width as usize;
            let height = panel.size.height as usize;
            for zy in 0..height {
                for zx in 0..width {
                    let index = offset + panel.anchor.serpentine_index(zx, zy, width, height);
                    mapping[index] = (
                        panel.position.x + zx as i32,
                        panel.position.y + zy as i32,
                    );
                }
            }
        }
        mapping
    }
}
