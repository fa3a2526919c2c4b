//! Rendering collaborator
//!
//! The core never touches pixels. It resolves where an image belongs and
//! hands the JPEG bytes to an [`ImageRenderer`] implemented by the board.

/// Pixel rectangle on the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Trait for the display side of the panel
///
/// Geometry comes from the renderer so the core stays independent of the
/// screen resolution.
pub trait ImageRenderer {
    type Error: core::fmt::Debug;

    /// Whole-display rectangle
    fn screen_rect(&self) -> Rect;

    /// Rectangle of grid cell `index` (row-major)
    fn cell_rect(&self, index: usize) -> Rect;

    /// Decode and draw a JPEG into `rect`
    fn draw_jpeg(&mut self, rect: Rect, jpeg: &[u8]) -> Result<(), Self::Error>;

    /// Blank `rect`
    fn clear_rect(&mut self, rect: Rect) -> Result<(), Self::Error>;
}
