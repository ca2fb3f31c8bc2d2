//! Deck topology: slot grid, adjacency and footprints.
//!
//! Slots are addressed by name (`"1"`..`"12"` on an OT-2, `"A1"`..`"D4"` on a Flex)
//! and mapped onto a grid where row 0 is the front of the deck and column 0 is
//! the left edge. North is towards the back of the robot.

use bevy_math::bounding::Aabb2d;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Outer footprint of a standard labware slot, in mm.
pub const SLOT_SIZE: Vec2 = Vec2::new(127.76, 85.48);

/// Addressable area used for tip drops and blow-outs in the OT-2 fixed trash.
pub const FIXED_TRASH_AREA: &str = "fixedTrash";

/// The robot a protocol is compiled for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RobotType {
    #[serde(rename = "OT-2 Standard")]
    Ot2,
    #[default]
    #[serde(rename = "OT-3 Standard")]
    Flex,
}

impl RobotType {
    fn grid(self) -> (u8, u8) {
        // (rows, columns)
        match self {
            Self::Ot2 => (4, 3),
            Self::Flex => (4, 4),
        }
    }

    fn slot_pitch(self) -> Vec2 {
        match self {
            Self::Ot2 => Vec2::new(132.5, 90.5),
            Self::Flex => Vec2::new(164.0, 107.0),
        }
    }

    /// Every slot name on this robot's deck.
    pub fn slots(self) -> Vec<String> {
        let (rows, cols) = self.grid();
        let mut slots = Vec::with_capacity((rows * cols) as usize);
        for row in 0..rows {
            for column in 0..cols {
                if let Some(name) = slot_name(self, SlotPosition { row, column }) {
                    slots.push(name);
                }
            }
        }
        slots
    }
}

/// Grid coordinate of a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotPosition {
    /// 0 is the front row.
    pub row: u8,
    /// 0 is the left column.
    pub column: u8,
}

/// Compass direction on the deck as seen from the front of the robot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Self::North, Self::South, Self::East, Self::West];
}

/// Parses a slot name into its grid position.
pub fn slot_position(robot: RobotType, slot: &str) -> Option<SlotPosition> {
    match robot {
        RobotType::Ot2 => {
            let n: u8 = slot.parse().ok()?;
            if !(1..=12).contains(&n) {
                return None;
            }
            Some(SlotPosition {
                row: (n - 1) / 3,
                column: (n - 1) % 3,
            })
        }
        RobotType::Flex => {
            let mut chars = slot.chars();
            let letter = chars.next()?;
            let digit = chars.next()?.to_digit(10)? as u8;
            if chars.next().is_some() || !('A'..='D').contains(&letter) || !(1..=4).contains(&digit) {
                return None;
            }
            Some(SlotPosition {
                row: 3 - (letter as u8 - b'A'),
                column: digit - 1,
            })
        }
    }
}

/// Inverse of [`slot_position`].
pub fn slot_name(robot: RobotType, pos: SlotPosition) -> Option<String> {
    let (rows, cols) = robot.grid();
    if pos.row >= rows || pos.column >= cols {
        return None;
    }
    Some(match robot {
        RobotType::Ot2 => (pos.row * 3 + pos.column + 1).to_string(),
        RobotType::Flex => format!("{}{}", (b'A' + (3 - pos.row)) as char, pos.column + 1),
    })
}

/// The slot one step away in `direction`, if it exists.
pub fn adjacent_slot(robot: RobotType, slot: &str, direction: Direction) -> Option<String> {
    let pos = slot_position(robot, slot)?;
    let next = match direction {
        Direction::North => SlotPosition {
            row: pos.row + 1,
            ..pos
        },
        Direction::South => SlotPosition {
            row: pos.row.checked_sub(1)?,
            ..pos
        },
        Direction::East => SlotPosition {
            column: pos.column + 1,
            ..pos
        },
        Direction::West => SlotPosition {
            column: pos.column.checked_sub(1)?,
            ..pos
        },
    };
    slot_name(robot, next)
}

/// Column 4 of a Flex deck is staging-area only; pipettes cannot reach it.
pub fn is_column_4(robot: RobotType, slot: &str) -> bool {
    robot == RobotType::Flex && slot_position(robot, slot).is_some_and(|p| p.column == 3)
}

/// Front-left corner of a slot in deck coordinates.
pub fn slot_origin(robot: RobotType, slot: &str) -> Option<Vec2> {
    let pos = slot_position(robot, slot)?;
    Some(Vec2::new(pos.column as f32, pos.row as f32) * robot.slot_pitch())
}

/// Axis-aligned footprint of a slot in deck coordinates.
pub fn slot_footprint(robot: RobotType, slot: &str) -> Option<Aabb2d> {
    let origin = slot_origin(robot, slot)?;
    let half = SLOT_SIZE / 2.0;
    Some(Aabb2d::new(origin + half, half))
}

/// Addressable area of a trash bin placed in `slot`.
pub fn trash_bin_area(robot: RobotType, slot: &str) -> String {
    match robot {
        RobotType::Ot2 => FIXED_TRASH_AREA.to_string(),
        RobotType::Flex => format!("movableTrash{slot}"),
    }
}

/// Addressable area a pipette moves to over the waste chute.
pub fn waste_chute_area(channels: u8) -> &'static str {
    if channels == 96 {
        "96ChannelWasteChute"
    } else {
        "1and8ChannelWasteChute"
    }
}
