//! Monotonic time source

/// Millisecond monotonic clock
///
/// The counter is allowed to wrap; consumers compare instants with
/// wrapping arithmetic.
pub trait Clock {
    /// Milliseconds since an arbitrary epoch (usually boot)
    fn now_ms(&self) -> u32;
}
