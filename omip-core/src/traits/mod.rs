//! Collaborator traits
//!
//! Link and clock traits live in `omip-hal`; the renderer is defined here
//! because its geometry is panel specific.

pub mod display;

pub use display::{ImageRenderer, Rect};
