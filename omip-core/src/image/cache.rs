//! Per-cell image cache

use alloc::vec::Vec;

use omip_protocol::ImageFormat;

use crate::layout::SLOT_COUNT;

/// A completed image kept for redraws
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedImage {
    pub format: ImageFormat,
    pub data: Vec<u8>,
}

/// One slot per grid cell, most recent image wins
#[derive(Debug)]
pub struct SlotCache {
    slots: [Option<CachedImage>; SLOT_COUNT],
}

impl Default for SlotCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotCache {
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
        }
    }

    pub fn get(&self, index: usize) -> Option<&CachedImage> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Store an image, returning the one it replaced
    ///
    /// Out-of-range indices are ignored and the image is handed back.
    pub fn store(
        &mut self,
        index: usize,
        image: CachedImage,
    ) -> Result<Option<CachedImage>, CachedImage> {
        match self.slots.get_mut(index) {
            Some(slot) => Ok(slot.replace(image)),
            None => Err(image),
        }
    }

    pub fn clear(&mut self, index: usize) -> Option<CachedImage> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    pub fn clear_all(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }

    /// Number of occupied slots
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Occupied slots with their index
    pub fn iter(&self) -> impl Iterator<Item = (usize, &CachedImage)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|image| (index, image)))
    }
}
