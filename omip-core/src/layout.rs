//! Panel layout and screen id mapping
//!
//! The panel shows a 3 x 6 grid of cells. Pushed images address either a
//! single cell or the whole display through their `screen_id`.

/// Grid rows
pub const GRID_ROWS: usize = 3;

/// Grid columns
pub const GRID_COLS: usize = 6;

/// Number of grid cells, and of image cache slots
pub const SLOT_COUNT: usize = GRID_ROWS * GRID_COLS;

/// Screen ids addressing the whole display
pub const SCREEN_FULL: u32 = 0;
pub const SCREEN_FULL_ALT: u32 = 100;

/// First screen id of the offset cell range (`1000 + cell`)
pub const SCREEN_CELL_OFFSET: u32 = 1000;

/// Where a pushed image should go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScreenTarget {
    /// One grid cell, cached in the slot of the same index
    Cell(usize),
    /// The whole display; never cached
    FullScreen,
    /// No known region; rendered once full screen, never cached
    Unmapped(u32),
}

impl ScreenTarget {
    /// Cache slot index, if the target has one
    pub fn slot(self) -> Option<usize> {
        match self {
            ScreenTarget::Cell(index) => Some(index),
            _ => None,
        }
    }
}

/// Resolve a `screen_id` to its target
///
/// `1..=17` are legacy direct cell indices, `1000..=1017` address cell
/// `screen_id - 1000`. Cell 0 is only reachable through the offset range
/// since screen id 0 means the whole display.
pub fn resolve_screen(screen_id: u32) -> ScreenTarget {
    match screen_id {
        SCREEN_FULL | SCREEN_FULL_ALT => ScreenTarget::FullScreen,
        id if (id as usize) < SLOT_COUNT => ScreenTarget::Cell(id as usize),
        id if id >= SCREEN_CELL_OFFSET && ((id - SCREEN_CELL_OFFSET) as usize) < SLOT_COUNT => {
            ScreenTarget::Cell((id - SCREEN_CELL_OFFSET) as usize)
        }
        id => ScreenTarget::Unmapped(id),
    }
}
