use std::ops::RangeInclusive;

use crate::types::Frame;

/// Gimbal pitch range, in degrees, considered to point straight down.
pub const NADIR_PITCH_WINDOW: RangeInclusive<f64> = -91.0..=-89.0;

/// Keep/drop decision for a candidate frame, taken before it is decoded.
pub trait FrameSelector: Send {
    fn select(&self, frame: &Frame) -> bool;
}

impl<F> FrameSelector for F
where
    F: Fn(&Frame) -> bool + Send,
{
    fn select(&self, frame: &Frame) -> bool {
        self(frame)
    }
}

pub struct AllFrames;

impl FrameSelector for AllFrames {
    fn select(&self, _frame: &Frame) -> bool {
        true
    }
}

/// Keeps frames whose gimbal pitch lies inside `pitch_window`.
pub struct FacingDown {
    pub pitch_window: RangeInclusive<f64>,
}

impl Default for FacingDown {
    fn default() -> Self {
        Self {
            pitch_window: NADIR_PITCH_WINDOW,
        }
    }
}

impl FrameSelector for FacingDown {
    fn select(&self, frame: &Frame) -> bool {
        self.pitch_window.contains(&frame.camera.gimbal.pitch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Selection {
    #[default]
    All,
    FacingDown,
}

impl Selection {
    pub fn selector(self) -> Box<dyn FrameSelector> {
        match self {
            Selection::All => Box::new(AllFrames),
            Selection::FacingDown => Box::new(FacingDown::default()),
        }
    }
}
