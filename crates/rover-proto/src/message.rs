use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ParseError, RobotCommand};

/// Grid bounds for rover pose reports. The arena is 20×20 cells.
pub const GRID_MAX: i32 = 19;

/// A compass direction the rover can face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::North => "North",
            Direction::East => "East",
            Direction::South => "South",
            Direction::West => "West",
        };
        f.write_str(s)
    }
}

impl FromStr for Direction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "n" | "north" => Ok(Direction::North),
            "e" | "east" => Ok(Direction::East),
            "s" | "south" => Ok(Direction::South),
            "w" | "west" => Ok(Direction::West),
            other => Err(ParseError::UnknownDirection(other.to_string())),
        }
    }
}

/// A rover pose report: `ROBOT,<x>,<y>,<direction>`.
///
/// Coordinates outside the 20×20 grid are rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotUpdate {
    pub x: i32,
    pub y: i32,
    pub direction: Direction,
}

impl RobotUpdate {
    fn parse_fields(fields: &[&str]) -> Result<Self, ParseError> {
        if fields.len() < 4 {
            return Err(ParseError::Malformed {
                kind: "ROBOT",
                reason: format!("expected 4 fields, got {}", fields.len()),
            });
        }
        let x = parse_coord("ROBOT", fields[1])?;
        let y = parse_coord("ROBOT", fields[2])?;
        if !(0..=GRID_MAX).contains(&x) || !(0..=GRID_MAX).contains(&y) {
            return Err(ParseError::CoordinateOutOfRange { x, y });
        }
        let direction = fields[3].parse()?;
        Ok(RobotUpdate { x, y, direction })
    }
}

/// A target assignment report: `TARGET,<obstacle number>,<target id>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetUpdate {
    pub obstacle: u32,
    pub target_id: String,
}

impl TargetUpdate {
    fn parse_fields(fields: &[&str]) -> Result<Self, ParseError> {
        if fields.len() < 3 {
            return Err(ParseError::Malformed {
                kind: "TARGET",
                reason: format!("expected 3 fields, got {}", fields.len()),
            });
        }
        let obstacle = fields[1]
            .trim()
            .parse()
            .map_err(|_| ParseError::Malformed {
                kind: "TARGET",
                reason: format!("bad obstacle number: {}", fields[1].trim()),
            })?;
        Ok(TargetUpdate {
            obstacle,
            target_id: fields[2].trim().to_string(),
        })
    }
}

fn parse_coord(kind: &'static str, field: &str) -> Result<i32, ParseError> {
    field.trim().parse().map_err(|_| ParseError::Malformed {
        kind,
        reason: format!("bad coordinate: {}", field.trim()),
    })
}

/// An obstacle update the controller sends to the rover.
///
/// Wire forms: `POSITION <id> <x> <y>` and `DIRECTION <id> <direction>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleUpdate {
    Position { id: u32, x: i32, y: i32 },
    Facing { id: u32, direction: Direction },
}

impl fmt::Display for ObstacleUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObstacleUpdate::Position { id, x, y } => write!(f, "POSITION {id} {x} {y}"),
            ObstacleUpdate::Facing { id, direction } => write!(f, "DIRECTION {id} {direction}"),
        }
    }
}

/// A parsed inbound line from the rover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Robot(RobotUpdate),
    Target(TargetUpdate),
    Command(RobotCommand),
    /// Free-form status line (not part of the structured grammar).
    Status(String),
}

impl Inbound {
    /// Parse one newline-delimited segment received over the link.
    ///
    /// Structured messages (`ROBOT`, `TARGET`) and movement commands are
    /// recognized; anything else is returned as [`Inbound::Status`] so the
    /// caller can decide whether it is worth showing (see
    /// [`crate::is_noteworthy`]). Structured prefixes with malformed bodies
    /// are errors, not status lines.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Err(ParseError::Unrecognized(String::new()));
        }

        let upper = trimmed.to_ascii_uppercase();
        if upper.starts_with("ROBOT") {
            let fields: Vec<&str> = trimmed.split(',').map(str::trim).collect();
            return RobotUpdate::parse_fields(&fields).map(Inbound::Robot);
        }
        if upper.starts_with("TARGET") {
            let fields: Vec<&str> = trimmed.split(',').map(str::trim).collect();
            return TargetUpdate::parse_fields(&fields).map(Inbound::Target);
        }
        if let Ok(cmd) = trimmed.parse::<RobotCommand>() {
            return Ok(Inbound::Command(cmd));
        }
        Ok(Inbound::Status(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_robot_update() {
        let parsed = Inbound::parse("ROBOT, 5, 12, N").unwrap();
        assert_eq!(
            parsed,
            Inbound::Robot(RobotUpdate {
                x: 5,
                y: 12,
                direction: Direction::North,
            })
        );
    }

    #[test]
    fn robot_update_rejects_out_of_range() {
        let err = Inbound::parse("ROBOT,20,3,E").unwrap_err();
        assert_eq!(err, ParseError::CoordinateOutOfRange { x: 20, y: 3 });
        let err = Inbound::parse("ROBOT,3,-1,E").unwrap_err();
        assert_eq!(err, ParseError::CoordinateOutOfRange { x: 3, y: -1 });
    }

    #[test]
    fn robot_update_rejects_short_message() {
        assert!(Inbound::parse("ROBOT,3,4").is_err());
    }

    #[test]
    fn parses_target_update() {
        let parsed = Inbound::parse("TARGET, 7, 23").unwrap();
        assert_eq!(
            parsed,
            Inbound::Target(TargetUpdate {
                obstacle: 7,
                target_id: "23".into(),
            })
        );
    }

    #[test]
    fn parses_movement_command() {
        assert_eq!(
            Inbound::parse("tl").unwrap(),
            Inbound::Command(RobotCommand::TurnLeft)
        );
    }

    #[test]
    fn falls_back_to_status() {
        assert_eq!(
            Inbound::parse("mission complete").unwrap(),
            Inbound::Status("mission complete".into())
        );
    }

    #[test]
    fn direction_spellings() {
        assert_eq!("n".parse::<Direction>().unwrap(), Direction::North);
        assert_eq!("West".parse::<Direction>().unwrap(), Direction::West);
        assert!("up".parse::<Direction>().is_err());
    }

    #[test]
    fn obstacle_update_wire_forms() {
        let pos = ObstacleUpdate::Position { id: 3, x: 10, y: 4 };
        assert_eq!(pos.to_string(), "POSITION 3 10 4");

        let dir = ObstacleUpdate::Facing {
            id: 3,
            direction: Direction::South,
        };
        assert_eq!(dir.to_string(), "DIRECTION 3 South");
    }
}
