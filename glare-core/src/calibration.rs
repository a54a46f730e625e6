use crate::stimulus::Side;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Screen position in centimetres, origin at the fixation point, y up.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const CENTER: Position = Position { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Symmetric stimulus eccentricity established by the positioning phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationState {
    pub x_offset: f32,
    pub y_offset: f32,
}

impl CalibrationState {
    pub const fn new(x_offset: f32, y_offset: f32) -> Self {
        Self { x_offset, y_offset }
    }

    /// Finite offsets with a non-negative horizontal displacement.
    pub fn is_valid(&self) -> bool {
        self.x_offset.is_finite() && self.y_offset.is_finite() && self.x_offset >= 0.0
    }

    /// Derives the mirrored left/right pair. Must be recomputed whenever the
    /// calibration is overwritten.
    pub fn layout(&self) -> StimulusLayout {
        StimulusLayout::mirrored(self.x_offset, self.y_offset)
    }
}

/// Derived left/right placement pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StimulusLayout {
    pub left: Position,
    pub right: Position,
}

impl StimulusLayout {
    pub fn mirrored(x: f32, y: f32) -> Self {
        Self {
            left: Position::new(-x, y),
            right: Position::new(x, y),
        }
    }

    pub fn position(&self, side: Side) -> Position {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_mirrors_horizontal_offset() {
        let layout = CalibrationState::new(12.0, 5.0).layout();
        assert_eq!(layout.position(Side::Left), Position::new(-12.0, 5.0));
        assert_eq!(layout.position(Side::Right), Position::new(12.0, 5.0));
    }

    #[test]
    fn rejects_non_finite_or_negative_offsets() {
        assert!(CalibrationState::new(0.0, -3.0).is_valid());
        assert!(!CalibrationState::new(-1.0, 0.0).is_valid());
        assert!(!CalibrationState::new(f32::NAN, 0.0).is_valid());
    }
}
