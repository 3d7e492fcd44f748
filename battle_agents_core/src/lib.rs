use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub mod action;
pub mod agent;
pub mod config;
pub mod error;
pub mod geometry;
pub mod map;
pub mod observation;
pub mod observer;

use crate::{action::Direction, error::IdentityError};

/// Represents a 2D coordinate inside an observation window.
///
/// `x` is the column and `y` the row, matching [`map::Grid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Signed displacement between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Offset {
    pub dx: isize,
    pub dy: isize,
}

impl Offset {
    /// Returns the displacement that takes `from` to `to`.
    pub fn between(from: Position, to: Position) -> Self {
        Offset {
            dx: to.x as isize - from.x as isize,
            dy: to.y as isize - from.y as isize,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.dx == 0 && self.dy == 0
    }

    pub fn squared_length(&self) -> usize {
        let dx = self.dx.unsigned_abs();
        let dy = self.dy.unsigned_abs();
        dx * dx + dy * dy
    }

    pub fn length(&self) -> f64 {
        (self.squared_length() as f64).sqrt()
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:+}, {:+})", self.dx, self.dy)
    }
}

/// The two opposing sides of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    /// Direction that leads toward the opposing side of the field.
    ///
    /// Red spawns on the left half of the map and blue on the right.
    pub fn advance_direction(self) -> Direction {
        match self {
            Team::Red => Direction::Right,
            Team::Blue => Direction::Left,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Team::Red => "red",
            Team::Blue => "blue",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of combat unit. Determines the action catalog and attack range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitType {
    Melee,
    Ranged,
}

impl UnitType {
    /// Number of discrete actions the environment accepts for this unit type.
    pub const fn action_count(self) -> usize {
        match self {
            UnitType::Melee => 9,
            UnitType::Ranged => 25,
        }
    }

    /// Maximum attack distance, also the longest straight move.
    pub const fn range(self) -> usize {
        match self {
            UnitType::Melee => 1,
            UnitType::Ranged => 2,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            UnitType::Melee => "melee",
            UnitType::Ranged => "ranged",
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable identity of a simulated unit, parsed from its environment name
/// (`redmelee_3`, `blueranged_0`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentIdentity {
    pub team: Team,
    pub unit_type: UnitType,
    pub number: usize,
}

impl AgentIdentity {
    pub fn new(team: Team, unit_type: UnitType, number: usize) -> Self {
        Self {
            team,
            unit_type,
            number,
        }
    }
}

impl fmt::Display for AgentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}_{}", self.team, self.unit_type, self.number)
    }
}

impl FromStr for AgentIdentity {
    type Err = IdentityError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let (team, rest) = if let Some(rest) = name.strip_prefix("red") {
            (Team::Red, rest)
        } else if let Some(rest) = name.strip_prefix("blue") {
            (Team::Blue, rest)
        } else {
            return Err(IdentityError::UnknownTeam(name.to_string()));
        };

        // The environment names blue melee units `bluemele_N`.
        let (unit_type, slot) = if let Some(slot) = rest
            .strip_prefix("melee_")
            .or_else(|| rest.strip_prefix("mele_"))
        {
            (UnitType::Melee, slot)
        } else if let Some(slot) = rest.strip_prefix("ranged_") {
            (UnitType::Ranged, slot)
        } else {
            return Err(IdentityError::UnknownUnitType(name.to_string()));
        };

        if slot.is_empty() || !slot.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IdentityError::InvalidSlot(name.to_string()));
        }
        let number = slot
            .parse()
            .map_err(|_| IdentityError::InvalidSlot(name.to_string()))?;

        Ok(AgentIdentity::new(team, unit_type, number))
    }
}
