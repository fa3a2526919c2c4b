//! Pushed image handling
//!
//! [`ImageReceiver`] owns the reassembly buffer and the slot cache. It turns
//! each `FeedbackImage` chunk into a [`ChunkOutcome`] whose acknowledgement
//! the control loop writes back on the primary link.

pub mod cache;
pub mod coverage;
pub mod reassembly;

pub use cache::{CachedImage, SlotCache};
pub use reassembly::{
    ChunkProgress, CompletedImage, ImageError, ImageReassembler, ReassemblyState,
};

use omip_protocol::{Ack, FeedbackImage};

use crate::layout::{resolve_screen, ScreenTarget};
use crate::traits::{ImageRenderer, Rect};

/// What happened to one image chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChunkOutcome {
    /// Stored, waiting for more chunks
    Accepted,
    /// Image complete and handed to the renderer
    Completed(ScreenTarget),
    /// Clear directive applied
    Cleared(ScreenTarget),
    /// Transfer abandoned
    Rejected(ImageError),
}

impl ChunkOutcome {
    pub fn ack(&self) -> Ack {
        match self {
            ChunkOutcome::Rejected(_) => Ack::Error,
            _ => Ack::Ready,
        }
    }
}

/// Reassembly plus slot cache
#[derive(Debug)]
pub struct ImageReceiver {
    reassembler: ImageReassembler,
    cache: SlotCache,
}

impl ImageReceiver {
    pub fn new(max_image_size: u32) -> Self {
        Self {
            reassembler: ImageReassembler::new(max_image_size),
            cache: SlotCache::new(),
        }
    }

    pub fn state(&self) -> ReassemblyState {
        self.reassembler.state()
    }

    pub fn received_size(&self) -> u32 {
        self.reassembler.received_size()
    }

    pub fn cache(&self) -> &SlotCache {
        &self.cache
    }

    /// Drop cached images and any transfer in progress
    pub fn reset(&mut self) {
        self.reassembler.abort();
        self.cache.clear_all();
    }

    /// Process one chunk
    pub fn handle_chunk<R: ImageRenderer>(
        &mut self,
        chunk: &FeedbackImage,
        renderer: &mut R,
    ) -> ChunkOutcome {
        if chunk.chunk_offset == 0 && chunk.total_size == 0 {
            self.reassembler.abort();
            let target = resolve_screen(chunk.screen_id);
            self.clear(target, renderer);
            return ChunkOutcome::Cleared(target);
        }

        match self.reassembler.push(chunk) {
            Ok(ChunkProgress::Accepted) => {
                trace!(
                    "image chunk at {} stored ({}/{} bytes)",
                    chunk.chunk_offset,
                    self.reassembler.received_size(),
                    chunk.total_size
                );
                ChunkOutcome::Accepted
            }
            Ok(ChunkProgress::Complete(image)) => {
                let target = resolve_screen(image.screen_id);
                self.publish(target, image, renderer);
                ChunkOutcome::Completed(target)
            }
            Err(e) => {
                warn!("image chunk for screen {} rejected: {}", chunk.screen_id, e);
                ChunkOutcome::Rejected(e)
            }
        }
    }

    fn publish<R: ImageRenderer>(
        &mut self,
        target: ScreenTarget,
        image: CompletedImage,
        renderer: &mut R,
    ) {
        let rect = target_rect(target, renderer);
        if renderer.draw_jpeg(rect, &image.data).is_err() {
            error!("failed to draw image for screen {}", image.screen_id);
        }

        match target {
            ScreenTarget::Cell(index) => {
                debug!("cached {} byte image in slot {}", image.data.len(), index);
                let cached = CachedImage {
                    format: image.format,
                    data: image.data,
                };
                // Cell targets are always in range
                let _ = self.cache.store(index, cached);
            }
            ScreenTarget::FullScreen => {
                debug!("drew {} byte full screen image", image.data.len());
            }
            ScreenTarget::Unmapped(screen_id) => {
                warn!("screen {} has no slot, drawn without caching", screen_id);
            }
        }
    }

    fn clear<R: ImageRenderer>(&mut self, target: ScreenTarget, renderer: &mut R) {
        let rect = match target {
            ScreenTarget::Cell(index) => {
                self.cache.clear(index);
                renderer.cell_rect(index)
            }
            ScreenTarget::FullScreen => {
                self.cache.clear_all();
                renderer.screen_rect()
            }
            ScreenTarget::Unmapped(screen_id) => {
                debug!("ignoring clear for unmapped screen {}", screen_id);
                return;
            }
        };
        if renderer.clear_rect(rect).is_err() {
            error!("failed to clear screen region");
        }
    }
}

fn target_rect<R: ImageRenderer>(target: ScreenTarget, renderer: &R) -> Rect {
    match target {
        ScreenTarget::Cell(index) => renderer.cell_rect(index),
        ScreenTarget::FullScreen | ScreenTarget::Unmapped(_) => renderer.screen_rect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DrawCall, MockRenderer};
    use heapless::Vec as HVec;
    use omip_protocol::ImageFormat;

    fn chunk(screen_id: u32, total: u32, offset: u32, data: &[u8], last: bool) -> FeedbackImage {
        FeedbackImage {
            device_id: 0,
            screen_id,
            format: ImageFormat::Jpeg,
            total_size: total,
            chunk_offset: offset,
            chunk_data: HVec::from_slice(data).unwrap(),
            is_last_chunk: last,
        }
    }

    #[test]
    fn test_example_transfer_populates_slot() {
        let mut rx = ImageReceiver::new(1024);
        let mut renderer = MockRenderer::default();

        let first = rx.handle_chunk(&chunk(1004, 150, 0, &[7; 100], false), &mut renderer);
        assert_eq!(first, ChunkOutcome::Accepted);
        assert_eq!(first.ack(), Ack::Ready);

        let last = rx.handle_chunk(&chunk(1004, 150, 100, &[8; 50], true), &mut renderer);
        assert_eq!(last, ChunkOutcome::Completed(ScreenTarget::Cell(4)));
        assert_eq!(last.ack(), Ack::Ready);
        assert_eq!(rx.state(), ReassemblyState::Empty);

        let cached = rx.cache().get(4).unwrap();
        assert_eq!(cached.data.len(), 150);
        assert_eq!(
            renderer.calls,
            [DrawCall::Jpeg(MockRenderer::cell(4), 150)]
        );
    }

    #[test]
    fn test_full_screen_not_cached() {
        let mut rx = ImageReceiver::new(1024);
        let mut renderer = MockRenderer::default();
        let outcome = rx.handle_chunk(&chunk(100, 4, 0, &[1, 2, 3, 4], true), &mut renderer);
        assert_eq!(outcome, ChunkOutcome::Completed(ScreenTarget::FullScreen));
        assert_eq!(rx.cache().occupied(), 0);
        assert_eq!(renderer.calls, [DrawCall::Jpeg(MockRenderer::SCREEN, 4)]);
    }

    #[test]
    fn test_unmapped_drawn_once_uncached() {
        let mut rx = ImageReceiver::new(1024);
        let mut renderer = MockRenderer::default();
        let outcome = rx.handle_chunk(&chunk(555, 2, 0, &[1, 2], true), &mut renderer);
        assert_eq!(outcome, ChunkOutcome::Completed(ScreenTarget::Unmapped(555)));
        assert_eq!(outcome.ack(), Ack::Ready);
        assert_eq!(rx.cache().occupied(), 0);
        assert_eq!(renderer.calls, [DrawCall::Jpeg(MockRenderer::SCREEN, 2)]);
    }

    #[test]
    fn test_clear_cell() {
        let mut rx = ImageReceiver::new(1024);
        let mut renderer = MockRenderer::default();
        rx.handle_chunk(&chunk(3, 2, 0, &[1, 2], true), &mut renderer);
        assert!(rx.cache().get(3).is_some());

        let outcome = rx.handle_chunk(&chunk(3, 0, 0, &[], false), &mut renderer);
        assert_eq!(outcome, ChunkOutcome::Cleared(ScreenTarget::Cell(3)));
        assert_eq!(outcome.ack(), Ack::Ready);
        assert!(rx.cache().get(3).is_none());
        assert_eq!(renderer.calls.last(), Some(&DrawCall::Clear(MockRenderer::cell(3))));
        assert_eq!(rx.state(), ReassemblyState::Empty);
    }

    #[test]
    fn test_clear_full_screen_empties_cache() {
        let mut rx = ImageReceiver::new(1024);
        let mut renderer = MockRenderer::default();
        rx.handle_chunk(&chunk(1000, 1, 0, &[1], true), &mut renderer);
        rx.handle_chunk(&chunk(1017, 1, 0, &[1], true), &mut renderer);
        assert_eq!(rx.cache().occupied(), 2);

        let outcome = rx.handle_chunk(&chunk(0, 0, 0, &[], true), &mut renderer);
        assert_eq!(outcome, ChunkOutcome::Cleared(ScreenTarget::FullScreen));
        assert_eq!(rx.cache().occupied(), 0);
        assert_eq!(renderer.calls.last(), Some(&DrawCall::Clear(MockRenderer::SCREEN)));
    }

    #[test]
    fn test_clear_unmapped_is_noop() {
        let mut rx = ImageReceiver::new(1024);
        let mut renderer = MockRenderer::default();
        let outcome = rx.handle_chunk(&chunk(4242, 0, 0, &[], false), &mut renderer);
        assert_eq!(outcome, ChunkOutcome::Cleared(ScreenTarget::Unmapped(4242)));
        assert_eq!(outcome.ack(), Ack::Ready);
        assert!(renderer.calls.is_empty());
    }

    #[test]
    fn test_clear_abandons_transfer() {
        let mut rx = ImageReceiver::new(1024);
        let mut renderer = MockRenderer::default();
        rx.handle_chunk(&chunk(5, 10, 0, &[0; 5], false), &mut renderer);
        assert_eq!(rx.state(), ReassemblyState::Accumulating);

        rx.handle_chunk(&chunk(5, 0, 0, &[], false), &mut renderer);
        assert_eq!(rx.state(), ReassemblyState::Empty);
    }

    #[test]
    fn test_rejection_acks_error() {
        let mut rx = ImageReceiver::new(1024);
        let mut renderer = MockRenderer::default();
        rx.handle_chunk(&chunk(5, 10, 0, &[0; 5], false), &mut renderer);
        let outcome = rx.handle_chunk(&chunk(5, 10, 8, &[0; 5], false), &mut renderer);
        assert_eq!(outcome, ChunkOutcome::Rejected(ImageError::OffsetOverflow));
        assert_eq!(outcome.ack(), Ack::Error);
        assert_eq!(rx.state(), ReassemblyState::Empty);
        assert!(renderer.calls.is_empty());
    }

    #[test]
    fn test_render_failure_still_acks_ready() {
        let mut rx = ImageReceiver::new(1024);
        let mut renderer = MockRenderer {
            fail: true,
            ..MockRenderer::default()
        };
        let outcome = rx.handle_chunk(&chunk(1002, 2, 0, &[1, 2], true), &mut renderer);
        assert_eq!(outcome.ack(), Ack::Ready);
        assert!(rx.cache().get(2).is_some());
    }

    #[test]
    fn test_reset() {
        let mut rx = ImageReceiver::new(1024);
        let mut renderer = MockRenderer::default();
        rx.handle_chunk(&chunk(1002, 2, 0, &[1, 2], true), &mut renderer);
        rx.handle_chunk(&chunk(1003, 20, 0, &[1, 2], false), &mut renderer);
        rx.reset();
        assert_eq!(rx.cache().occupied(), 0);
        assert_eq!(rx.state(), ReassemblyState::Empty);
    }
}
