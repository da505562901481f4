//! Traffic direction between the two endpoints.

use std::fmt;

/// Which way a packet travels between the Icon (controller) and the Frame
/// (device).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    IconToFrame,
    FrameToIcon,
}

impl Direction {
    /// Both directions, in a stable order.
    pub const ALL: [Direction; 2] = [Direction::IconToFrame, Direction::FrameToIcon];

    /// The opposite direction.
    pub fn reverse(self) -> Self {
        match self {
            Direction::IconToFrame => Direction::FrameToIcon,
            Direction::FrameToIcon => Direction::IconToFrame,
        }
    }

    /// Short human-readable label.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::IconToFrame => "Icon->Frame",
            Direction::FrameToIcon => "Frame->Icon",
        }
    }

    /// Array index used by per-direction state tables.
    pub fn index(self) -> usize {
        match self {
            Direction::IconToFrame => 0,
            Direction::FrameToIcon => 1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
