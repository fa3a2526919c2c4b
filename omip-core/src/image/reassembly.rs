//! Chunked image reassembly
//!
//! At most one transfer is in flight. A chunk at offset 0 starts a new
//! transfer and drops whatever was in progress before allocating. Every
//! rejection and every completion releases the buffer, so the reassembler is
//! back to [`ReassemblyState::Empty`] with nothing allocated.

use alloc::vec::Vec;
use core::fmt;

use omip_protocol::{FeedbackImage, ImageFormat};

use super::coverage;

/// Reassembly errors; each one abandons the transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ImageError {
    /// Continuation chunk with no transfer in progress
    NoTransfer,
    /// `total_size` differs from the transfer in progress, or is zero
    SizeMismatch,
    /// Chunk extends past `total_size`
    OffsetOverflow,
    /// Image larger than the configured limit, or out of memory
    AllocationFailed,
    /// Last chunk arrived with bytes still missing
    Incomplete,
    /// Image format cannot be rendered
    UnsupportedFormat,
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::NoTransfer => f.write_str("no image transfer in progress"),
            ImageError::SizeMismatch => f.write_str("image size mismatch"),
            ImageError::OffsetOverflow => f.write_str("chunk exceeds image size"),
            ImageError::AllocationFailed => f.write_str("image buffer allocation failed"),
            ImageError::Incomplete => f.write_str("image incomplete at last chunk"),
            ImageError::UnsupportedFormat => f.write_str("unsupported image format"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReassemblyState {
    Empty,
    Accumulating,
}

/// A fully received image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedImage {
    pub screen_id: u32,
    pub format: ImageFormat,
    pub data: Vec<u8>,
}

/// Result of an accepted chunk
#[derive(Debug, PartialEq, Eq)]
pub enum ChunkProgress {
    /// Stored; more chunks expected
    Accepted,
    /// Last chunk stored and the image validated
    Complete(CompletedImage),
}

#[derive(Debug)]
struct Transfer {
    /// Image bytes followed by the coverage bitmap
    buffer: Vec<u8>,
    total_size: u32,
    received_size: u32,
    /// Distinct bytes written
    covered: u32,
    screen_id: u32,
    format: ImageFormat,
}

/// Single-transfer reassembly state machine
#[derive(Debug)]
pub struct ImageReassembler {
    max_image_size: u32,
    transfer: Option<Transfer>,
}

impl ImageReassembler {
    pub const fn new(max_image_size: u32) -> Self {
        Self {
            max_image_size,
            transfer: None,
        }
    }

    pub fn state(&self) -> ReassemblyState {
        match self.transfer {
            Some(_) => ReassemblyState::Accumulating,
            None => ReassemblyState::Empty,
        }
    }

    /// Size announced by the transfer in progress
    pub fn total_size(&self) -> Option<u32> {
        self.transfer.as_ref().map(|t| t.total_size)
    }

    /// Highest byte offset written so far (0 when idle)
    pub fn received_size(&self) -> u32 {
        self.transfer.as_ref().map_or(0, |t| t.received_size)
    }

    /// Drop the transfer in progress, if any
    pub fn abort(&mut self) {
        self.transfer = None;
    }

    /// Feed one chunk
    ///
    /// Clear directives (`total_size == 0` at offset 0) are not images and
    /// must be handled by the caller.
    pub fn push(&mut self, chunk: &FeedbackImage) -> Result<ChunkProgress, ImageError> {
        if chunk.chunk_offset == 0 {
            // Release the old buffer before reserving the new one
            self.transfer = None;
            self.transfer = Some(self.start(chunk)?);
        }

        match self.write(chunk) {
            Ok(()) => {}
            Err(e) => return self.reject(e),
        }

        if !chunk.is_last_chunk {
            return Ok(ChunkProgress::Accepted);
        }

        let Some(mut transfer) = self.transfer.take() else {
            return Err(ImageError::NoTransfer);
        };
        if transfer.covered != transfer.total_size {
            return Err(ImageError::Incomplete);
        }
        if transfer.format != ImageFormat::Jpeg {
            return Err(ImageError::UnsupportedFormat);
        }

        // Drops the bitmap without reallocating
        transfer.buffer.truncate(transfer.total_size as usize);
        Ok(ChunkProgress::Complete(CompletedImage {
            screen_id: transfer.screen_id,
            format: transfer.format,
            data: transfer.buffer,
        }))
    }

    fn start(&self, chunk: &FeedbackImage) -> Result<Transfer, ImageError> {
        if chunk.total_size == 0 {
            return Err(ImageError::SizeMismatch);
        }
        if chunk.total_size > self.max_image_size {
            return Err(ImageError::AllocationFailed);
        }

        let size = chunk.total_size as usize;
        let reserved = size + coverage::bitmap_len(size);
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(reserved)
            .map_err(|_| ImageError::AllocationFailed)?;
        buffer.resize(reserved, 0);

        Ok(Transfer {
            buffer,
            total_size: chunk.total_size,
            received_size: 0,
            covered: 0,
            screen_id: chunk.screen_id,
            format: chunk.format,
        })
    }

    fn write(&mut self, chunk: &FeedbackImage) -> Result<(), ImageError> {
        let transfer = self.transfer.as_mut().ok_or(ImageError::NoTransfer)?;

        if chunk.total_size != transfer.total_size {
            return Err(ImageError::SizeMismatch);
        }
        let start = chunk.chunk_offset;
        let end = start
            .checked_add(chunk.chunk_data.len() as u32)
            .filter(|&end| end <= transfer.total_size)
            .ok_or(ImageError::OffsetOverflow)?;

        let (start, end) = (start as usize, end as usize);
        let (image, bitmap) = transfer.buffer.split_at_mut(transfer.total_size as usize);
        // Overlapping chunks: last write wins
        image[start..end].copy_from_slice(&chunk.chunk_data);
        transfer.covered += coverage::mark(bitmap, start, end) as u32;
        transfer.received_size = transfer.received_size.max(end as u32);
        Ok(())
    }

    fn reject<T>(&mut self, error: ImageError) -> Result<T, ImageError> {
        self.transfer = None;
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::Vec as HVec;
    use proptest::prelude::*;

    fn chunk(total: u32, offset: u32, data: &[u8], last: bool) -> FeedbackImage {
        FeedbackImage {
            device_id: 0,
            screen_id: 1003,
            format: ImageFormat::Jpeg,
            total_size: total,
            chunk_offset: offset,
            chunk_data: HVec::from_slice(data).unwrap(),
            is_last_chunk: last,
        }
    }

    #[test]
    fn test_two_chunk_image() {
        let mut r = ImageReassembler::new(1024);
        assert_eq!(
            r.push(&chunk(150, 0, &[0xAA; 100], false)),
            Ok(ChunkProgress::Accepted)
        );
        assert_eq!(r.state(), ReassemblyState::Accumulating);
        assert_eq!(r.received_size(), 100);

        let done = r.push(&chunk(150, 100, &[0xBB; 50], true)).unwrap();
        let ChunkProgress::Complete(image) = done else {
            panic!("expected completion");
        };
        assert_eq!(image.data.len(), 150);
        assert!(image.data[..100].iter().all(|&b| b == 0xAA));
        assert!(image.data[100..].iter().all(|&b| b == 0xBB));
        assert_eq!(image.screen_id, 1003);
        assert_eq!(r.state(), ReassemblyState::Empty);
    }

    #[test]
    fn test_single_chunk_image() {
        let mut r = ImageReassembler::new(1024);
        let done = r.push(&chunk(3, 0, &[1, 2, 3], true)).unwrap();
        assert!(matches!(done, ChunkProgress::Complete(ref img) if img.data == [1, 2, 3]));
    }

    #[test]
    fn test_overflowing_chunk_rejected() {
        let mut r = ImageReassembler::new(1024);
        r.push(&chunk(100, 0, &[0; 60], false)).unwrap();
        assert_eq!(
            r.push(&chunk(100, 60, &[0; 41], false)),
            Err(ImageError::OffsetOverflow)
        );
        assert_eq!(r.state(), ReassemblyState::Empty);
    }

    #[test]
    fn test_first_chunk_overflow_rejected() {
        let mut r = ImageReassembler::new(1024);
        assert_eq!(
            r.push(&chunk(10, 0, &[0; 11], false)),
            Err(ImageError::OffsetOverflow)
        );
        assert_eq!(r.state(), ReassemblyState::Empty);
    }

    #[test]
    fn test_offset_wraparound_rejected() {
        let mut r = ImageReassembler::new(1024);
        r.push(&chunk(100, 0, &[0; 10], false)).unwrap();
        assert_eq!(
            r.push(&chunk(100, u32::MAX - 2, &[0; 10], false)),
            Err(ImageError::OffsetOverflow)
        );
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let mut r = ImageReassembler::new(1024);
        r.push(&chunk(100, 0, &[0; 10], false)).unwrap();
        assert_eq!(
            r.push(&chunk(120, 10, &[0; 10], false)),
            Err(ImageError::SizeMismatch)
        );
        assert_eq!(r.state(), ReassemblyState::Empty);
    }

    #[test]
    fn test_continuation_without_start() {
        let mut r = ImageReassembler::new(1024);
        assert_eq!(
            r.push(&chunk(100, 10, &[0; 10], false)),
            Err(ImageError::NoTransfer)
        );
    }

    #[test]
    fn test_limit_is_allocation_failure() {
        let mut r = ImageReassembler::new(64);
        assert_eq!(
            r.push(&chunk(65, 0, &[0; 10], false)),
            Err(ImageError::AllocationFailed)
        );
        assert_eq!(r.state(), ReassemblyState::Empty);
    }

    #[test]
    fn test_missing_bytes_incomplete() {
        let mut r = ImageReassembler::new(1024);
        r.push(&chunk(30, 0, &[0; 10], false)).unwrap();
        assert_eq!(
            r.push(&chunk(30, 20, &[0; 10], true)),
            Err(ImageError::Incomplete)
        );
        assert_eq!(r.state(), ReassemblyState::Empty);
    }

    #[test]
    fn test_unsupported_format() {
        let mut r = ImageReassembler::new(1024);
        let mut first = chunk(4, 0, &[1, 2, 3, 4], true);
        first.format = ImageFormat::Unknown(7);
        assert_eq!(r.push(&first), Err(ImageError::UnsupportedFormat));
        assert_eq!(r.state(), ReassemblyState::Empty);
    }

    #[test]
    fn test_supersession_discards_old_transfer() {
        let mut r = ImageReassembler::new(1024);
        r.push(&chunk(200, 0, &[0x11; 100], false)).unwrap();

        // New image restarts before the first one finished
        r.push(&chunk(20, 0, &[0x22; 10], false)).unwrap();
        assert_eq!(r.total_size(), Some(20));
        assert_eq!(r.received_size(), 10);

        let done = r.push(&chunk(20, 10, &[0x33; 10], true)).unwrap();
        let ChunkProgress::Complete(image) = done else {
            panic!("expected completion");
        };
        assert_eq!(&image.data[..10], &[0x22; 10]);
        assert_eq!(&image.data[10..], &[0x33; 10]);
    }

    #[test]
    fn test_overlap_last_write_wins() {
        let mut r = ImageReassembler::new(1024);
        r.push(&chunk(10, 0, &[1; 8], false)).unwrap();
        let done = r.push(&chunk(10, 4, &[2; 6], true)).unwrap();
        let ChunkProgress::Complete(image) = done else {
            panic!("expected completion");
        };
        assert_eq!(image.data, [1, 1, 1, 1, 2, 2, 2, 2, 2, 2]);
    }

    #[test]
    fn test_zero_size_is_not_an_image() {
        let mut r = ImageReassembler::new(1024);
        assert_eq!(
            r.push(&chunk(0, 0, &[], true)),
            Err(ImageError::SizeMismatch)
        );
    }

    #[test]
    fn test_abort() {
        let mut r = ImageReassembler::new(1024);
        r.push(&chunk(100, 0, &[0; 10], false)).unwrap();
        r.abort();
        assert_eq!(r.state(), ReassemblyState::Empty);
        assert_eq!(r.received_size(), 0);
    }

    #[test]
    fn test_interleaved_chunks_leave_many_gaps() {
        let image: std::vec::Vec<u8> = (0..400u32).map(|i| (i * 7) as u8).collect();
        let mut order: std::vec::Vec<usize> = vec![0];
        order.extend((2..40).step_by(2));
        order.extend((1..40).step_by(2));

        let mut r = ImageReassembler::new(4096);
        let mut outcome = None;
        for (n, &i) in order.iter().enumerate() {
            let offset = i * 10;
            let data = &image[offset..offset + 10];
            let progress = r.push(&chunk(400, offset as u32, data, n + 1 == order.len()));
            if n + 1 < order.len() {
                assert_eq!(progress, Ok(ChunkProgress::Accepted));
            }
            outcome = Some(progress);
        }

        match outcome {
            Some(Ok(ChunkProgress::Complete(done))) => assert_eq!(done.data, image),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    proptest! {
        #[test]
        fn prop_out_of_order_chunks_complete(
            image in proptest::collection::vec(any::<u8>(), 1..2000),
            chunk_size in 1usize..=32,
            order_seed in any::<u64>(),
        ) {
            let total = image.len() as u32;
            let mut pieces: std::vec::Vec<(u32, &[u8])> = image
                .chunks(chunk_size)
                .enumerate()
                .map(|(i, data)| ((i * chunk_size) as u32, data))
                .collect();

            // The offset-0 chunk opens the transfer; the rest arrive shuffled
            let rest = &mut pieces[1..];
            let mut seed = order_seed;
            for i in (1..rest.len()).rev() {
                seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let j = (seed >> 33) as usize % (i + 1);
                rest.swap(i, j);
            }

            let mut r = ImageReassembler::new(4096);
            let count = pieces.len();
            let mut outcome = None;
            for (n, (offset, data)) in pieces.iter().enumerate() {
                let last = n + 1 == count;
                outcome = Some(r.push(&chunk(total, *offset, data, last)));
            }

            match outcome {
                Some(Ok(ChunkProgress::Complete(done))) => prop_assert_eq!(done.data, image),
                other => prop_assert!(false, "unexpected outcome {:?}", other),
            }
            prop_assert_eq!(r.state(), ReassemblyState::Empty);
        }
    }
}
