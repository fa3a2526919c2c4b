//! Test doubles for the link, clock and renderer traits

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use omip_hal::{Clock, MessageLink, UartRx, UartTx};

use crate::layout::GRID_COLS;
use crate::traits::{ImageRenderer, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError;

/// Shared millisecond counter
#[derive(Debug, Clone, Default)]
pub struct MockClock(Rc<Cell<u32>>);

impl MockClock {
    pub fn advance(&self, ms: u32) {
        self.0.set(self.0.get().wrapping_add(ms));
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u32 {
        self.0.get()
    }
}

#[derive(Debug, Default)]
pub struct UartState {
    pub rx: VecDeque<u8>,
    pub tx: Vec<u8>,
    pub fail_tx: bool,
    pub fail_rx: bool,
}

/// UART whose buffers stay reachable after it is moved into the device
#[derive(Debug, Clone, Default)]
pub struct MockUart(pub Rc<RefCell<UartState>>);

impl MockUart {
    pub fn receive(&self, bytes: &[u8]) {
        self.0.borrow_mut().rx.extend(bytes.iter().copied());
    }

    pub fn take_tx(&self) -> Vec<u8> {
        std::mem::take(&mut self.0.borrow_mut().tx)
    }

    pub fn pending_rx(&self) -> usize {
        self.0.borrow().rx.len()
    }
}

impl UartTx for MockUart {
    type Error = MockError;

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), MockError> {
        let mut state = self.0.borrow_mut();
        if state.fail_tx {
            return Err(MockError);
        }
        state.tx.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), MockError> {
        Ok(())
    }
}

impl UartRx for MockUart {
    type Error = MockError;

    fn try_read_byte(&mut self) -> Result<Option<u8>, MockError> {
        let mut state = self.0.borrow_mut();
        if state.fail_rx {
            return Err(MockError);
        }
        Ok(state.rx.pop_front())
    }
}

#[derive(Debug, Default)]
pub struct LinkState {
    pub sent: Vec<Vec<u8>>,
    pub advertising_starts: usize,
    pub fail: bool,
}

/// Secondary link recording every notification
#[derive(Debug, Clone, Default)]
pub struct MockLink(pub Rc<RefCell<LinkState>>);

impl MockLink {
    pub fn take_sent(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.0.borrow_mut().sent)
    }

    pub fn advertising_starts(&self) -> usize {
        self.0.borrow().advertising_starts
    }
}

impl MessageLink for MockLink {
    type Error = MockError;

    fn notify(&mut self, message: &[u8]) -> Result<(), MockError> {
        let mut state = self.0.borrow_mut();
        if state.fail {
            return Err(MockError);
        }
        state.sent.push(message.to_vec());
        Ok(())
    }

    fn start_advertising(&mut self) -> Result<(), MockError> {
        self.0.borrow_mut().advertising_starts += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCall {
    /// Rect and JPEG length
    Jpeg(Rect, usize),
    Clear(Rect),
}

/// 480x240 panel with 80x80 cells
#[derive(Debug, Default)]
pub struct MockRenderer {
    pub calls: Vec<DrawCall>,
    pub fail: bool,
}

impl MockRenderer {
    pub const SCREEN: Rect = Rect::new(0, 0, 480, 240);

    pub fn cell(index: usize) -> Rect {
        let row = (index / GRID_COLS) as u16;
        let col = (index % GRID_COLS) as u16;
        Rect::new(col * 80, row * 80, 80, 80)
    }
}

impl ImageRenderer for MockRenderer {
    type Error = MockError;

    fn screen_rect(&self) -> Rect {
        Self::SCREEN
    }

    fn cell_rect(&self, index: usize) -> Rect {
        Self::cell(index)
    }

    fn draw_jpeg(&mut self, rect: Rect, jpeg: &[u8]) -> Result<(), MockError> {
        self.calls.push(DrawCall::Jpeg(rect, jpeg.len()));
        if self.fail {
            return Err(MockError);
        }
        Ok(())
    }

    fn clear_rect(&mut self, rect: Rect) -> Result<(), MockError> {
        self.calls.push(DrawCall::Clear(rect));
        if self.fail {
            return Err(MockError);
        }
        Ok(())
    }
}
