use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ParseError;

/// A basic rover movement command.
///
/// Several spellings are accepted on the wire (`f`/`forward`,
/// `tl`/`turnleft`/`turn_left`, …); the canonical form used when sending is
/// the long one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RobotCommand {
    Forward,
    Reverse,
    TurnLeft,
    TurnRight,
}

impl RobotCommand {
    /// The canonical wire spelling.
    pub fn as_wire(&self) -> &'static str {
        match self {
            RobotCommand::Forward => "forward",
            RobotCommand::Reverse => "reverse",
            RobotCommand::TurnLeft => "turnleft",
            RobotCommand::TurnRight => "turnright",
        }
    }
}

impl fmt::Display for RobotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl FromStr for RobotCommand {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "f" | "forward" => Ok(RobotCommand::Forward),
            "r" | "reverse" => Ok(RobotCommand::Reverse),
            "tl" | "turnleft" | "turn_left" => Ok(RobotCommand::TurnLeft),
            "tr" | "turnright" | "turn_right" => Ok(RobotCommand::TurnRight),
            other => Err(ParseError::Unrecognized(other.to_string())),
        }
    }
}
