//! Input events reported to the host

use core::fmt;

use heapless::Vec;
use omip_protocol::{AnalogInput, DigitalInput, Envelope};

use crate::capability::{PORT_SLIDER, PORT_SWIPE_LEFT, PORT_SWIPE_RIGHT};
use crate::layout::SLOT_COUNT;

/// Events produced by the touch and gesture collaborator
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputEvent {
    /// Grid cell touched
    CellPressed(u8),
    /// Grid cell released
    CellReleased(u8),
    /// Slider position changed (0.0 - 1.0)
    SliderMoved(f32),
    SwipeLeft,
    SwipeRight,
}

/// Errors turning an input event into reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportError {
    /// Cell index outside the grid
    UnknownCell(u8),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::UnknownCell(index) => write!(f, "no grid cell {}", index),
        }
    }
}

/// Envelopes reporting one event (a gesture pulse produces two)
pub type Reports = Vec<Envelope, 2>;

impl InputEvent {
    /// Map the event onto catalog ports
    pub fn to_envelopes(self, device_id: u32) -> Result<Reports, ReportError> {
        let digital = |port_id: u32, state: bool| {
            Envelope::DigitalInput(DigitalInput {
                device_id,
                port_id,
                state,
            })
        };

        let mut reports = Reports::new();
        match self {
            InputEvent::CellPressed(index) | InputEvent::CellReleased(index) => {
                if index as usize >= SLOT_COUNT {
                    return Err(ReportError::UnknownCell(index));
                }
                let pressed = matches!(self, InputEvent::CellPressed(_));
                let _ = reports.push(digital(index as u32, pressed));
            }
            InputEvent::SliderMoved(value) => {
                let _ = reports.push(Envelope::AnalogInput(AnalogInput {
                    device_id,
                    port_id: PORT_SLIDER,
                    value,
                }));
            }
            InputEvent::SwipeLeft | InputEvent::SwipeRight => {
                let port_id = if self == InputEvent::SwipeLeft {
                    PORT_SWIPE_LEFT
                } else {
                    PORT_SWIPE_RIGHT
                };
                // Pulses have no steady state: report the edge and reset it
                let _ = reports.push(digital(port_id, true));
                let _ = reports.push(digital(port_id, false));
            }
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digital(port_id: u32, state: bool) -> Envelope {
        Envelope::DigitalInput(DigitalInput {
            device_id: 1,
            port_id,
            state,
        })
    }

    #[test]
    fn test_cell_press_and_release() {
        let pressed = InputEvent::CellPressed(5).to_envelopes(1).unwrap();
        assert_eq!(&pressed[..], &[digital(5, true)]);

        let released = InputEvent::CellReleased(17).to_envelopes(1).unwrap();
        assert_eq!(&released[..], &[digital(17, false)]);
    }

    #[test]
    fn test_unknown_cell() {
        assert_eq!(
            InputEvent::CellPressed(18).to_envelopes(1),
            Err(ReportError::UnknownCell(18))
        );
    }

    #[test]
    fn test_slider() {
        let reports = InputEvent::SliderMoved(0.25).to_envelopes(3).unwrap();
        assert_eq!(
            &reports[..],
            &[Envelope::AnalogInput(AnalogInput {
                device_id: 3,
                port_id: 18,
                value: 0.25,
            })]
        );
    }

    #[test]
    fn test_swipe_is_a_pulse() {
        let left = InputEvent::SwipeLeft.to_envelopes(1).unwrap();
        assert_eq!(&left[..], &[digital(19, true), digital(19, false)]);

        let right = InputEvent::SwipeRight.to_envelopes(1).unwrap();
        assert_eq!(&right[..], &[digital(20, true), digital(20, false)]);
    }
}
