//! Action catalogs of the battle environment.
//!
//! Each unit type has its own fixed, ordered set of discrete actions. The
//! environment only understands the integer index of an action, so every
//! catalog enum keeps its variants in environment order and encodes through
//! [`MeleeAction::index`] / [`RangedAction::index`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Offset, Team, UnitType};

/// Cardinal direction on the observation grid. Up is toward row 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Whether an action displaces the unit or strikes a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    Move,
    Attack,
}

/// Actions of a melee unit, in environment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeleeAction {
    MoveUp,
    MoveLeft,
    DoNothing,
    MoveRight,
    MoveDown,
    AttackUp,
    AttackLeft,
    AttackRight,
    AttackDown,
}

impl MeleeAction {
    pub const ALL: [MeleeAction; 9] = [
        MeleeAction::MoveUp,
        MeleeAction::MoveLeft,
        MeleeAction::DoNothing,
        MeleeAction::MoveRight,
        MeleeAction::MoveDown,
        MeleeAction::AttackUp,
        MeleeAction::AttackLeft,
        MeleeAction::AttackRight,
        MeleeAction::AttackDown,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Melee units only act on adjacent cells, so every direction has
    /// exactly one move and one attack.
    pub fn compose(intent: Intent, direction: Direction) -> Self {
        match (intent, direction) {
            (Intent::Move, Direction::Up) => MeleeAction::MoveUp,
            (Intent::Move, Direction::Down) => MeleeAction::MoveDown,
            (Intent::Move, Direction::Left) => MeleeAction::MoveLeft,
            (Intent::Move, Direction::Right) => MeleeAction::MoveRight,
            (Intent::Attack, Direction::Up) => MeleeAction::AttackUp,
            (Intent::Attack, Direction::Down) => MeleeAction::AttackDown,
            (Intent::Attack, Direction::Left) => MeleeAction::AttackLeft,
            (Intent::Attack, Direction::Right) => MeleeAction::AttackRight,
        }
    }

    /// `None` for the idle action.
    pub fn intent(self) -> Option<Intent> {
        match self {
            MeleeAction::DoNothing => None,
            MeleeAction::MoveUp
            | MeleeAction::MoveLeft
            | MeleeAction::MoveRight
            | MeleeAction::MoveDown => Some(Intent::Move),
            _ => Some(Intent::Attack),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MeleeAction::MoveUp => "MOVE_UP",
            MeleeAction::MoveLeft => "MOVE_LEFT",
            MeleeAction::DoNothing => "DO_NOTHING",
            MeleeAction::MoveRight => "MOVE_RIGHT",
            MeleeAction::MoveDown => "MOVE_DOWN",
            MeleeAction::AttackUp => "ATTACK_UP",
            MeleeAction::AttackLeft => "ATTACK_LEFT",
            MeleeAction::AttackRight => "ATTACK_RIGHT",
            MeleeAction::AttackDown => "ATTACK_DOWN",
        }
    }
}

/// Displacement shape of a ranged action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RangedStep {
    Single(Direction),
    Double(Direction),
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl RangedStep {
    /// Straight step of `magnitude` cells. Ranged units reach at most two
    /// cells, longer magnitudes are clamped to a double step.
    pub fn straight(direction: Direction, magnitude: usize) -> Self {
        if magnitude >= 2 {
            RangedStep::Double(direction)
        } else {
            RangedStep::Single(direction)
        }
    }
}

/// Actions of a ranged unit, in environment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RangedAction {
    MoveUpUp,
    MoveUpLeft,
    MoveUp,
    MoveUpRight,
    MoveLeftLeft,
    MoveLeft,
    DoNothing,
    MoveRight,
    MoveRightRight,
    MoveDownLeft,
    MoveDown,
    MoveDownRight,
    MoveDownDown,
    AttackUpUp,
    AttackUpLeft,
    AttackUp,
    AttackUpRight,
    AttackLeftLeft,
    AttackLeft,
    AttackRight,
    AttackRightRight,
    AttackDownLeft,
    AttackDown,
    AttackDownRight,
    AttackDownDown,
}

impl RangedAction {
    pub const ALL: [RangedAction; 25] = [
        RangedAction::MoveUpUp,
        RangedAction::MoveUpLeft,
        RangedAction::MoveUp,
        RangedAction::MoveUpRight,
        RangedAction::MoveLeftLeft,
        RangedAction::MoveLeft,
        RangedAction::DoNothing,
        RangedAction::MoveRight,
        RangedAction::MoveRightRight,
        RangedAction::MoveDownLeft,
        RangedAction::MoveDown,
        RangedAction::MoveDownRight,
        RangedAction::MoveDownDown,
        RangedAction::AttackUpUp,
        RangedAction::AttackUpLeft,
        RangedAction::AttackUp,
        RangedAction::AttackUpRight,
        RangedAction::AttackLeftLeft,
        RangedAction::AttackLeft,
        RangedAction::AttackRight,
        RangedAction::AttackRightRight,
        RangedAction::AttackDownLeft,
        RangedAction::AttackDown,
        RangedAction::AttackDownRight,
        RangedAction::AttackDownDown,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Every step shape exists both as a move and as an attack, so any
    /// composition lands in the catalog.
    pub fn compose(intent: Intent, step: RangedStep) -> Self {
        use Direction::*;
        use RangedAction::*;

        let (move_action, attack_action) = match step {
            RangedStep::Single(Up) => (MoveUp, AttackUp),
            RangedStep::Single(Down) => (MoveDown, AttackDown),
            RangedStep::Single(Left) => (MoveLeft, AttackLeft),
            RangedStep::Single(Right) => (MoveRight, AttackRight),
            RangedStep::Double(Up) => (MoveUpUp, AttackUpUp),
            RangedStep::Double(Down) => (MoveDownDown, AttackDownDown),
            RangedStep::Double(Left) => (MoveLeftLeft, AttackLeftLeft),
            RangedStep::Double(Right) => (MoveRightRight, AttackRightRight),
            RangedStep::UpLeft => (MoveUpLeft, AttackUpLeft),
            RangedStep::UpRight => (MoveUpRight, AttackUpRight),
            RangedStep::DownLeft => (MoveDownLeft, AttackDownLeft),
            RangedStep::DownRight => (MoveDownRight, AttackDownRight),
        };
        match intent {
            Intent::Move => move_action,
            Intent::Attack => attack_action,
        }
    }

    /// `None` for the idle action.
    pub fn intent(self) -> Option<Intent> {
        use RangedAction::*;

        match self {
            DoNothing => None,
            MoveUpUp | MoveUpLeft | MoveUp | MoveUpRight | MoveLeftLeft | MoveLeft | MoveRight
            | MoveRightRight | MoveDownLeft | MoveDown | MoveDownRight | MoveDownDown => {
                Some(Intent::Move)
            }
            _ => Some(Intent::Attack),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RangedAction::MoveUpUp => "MOVE_UP_UP",
            RangedAction::MoveUpLeft => "MOVE_UP_LEFT",
            RangedAction::MoveUp => "MOVE_UP",
            RangedAction::MoveUpRight => "MOVE_UP_RIGHT",
            RangedAction::MoveLeftLeft => "MOVE_LEFT_LEFT",
            RangedAction::MoveLeft => "MOVE_LEFT",
            RangedAction::DoNothing => "DO_NOTHING",
            RangedAction::MoveRight => "MOVE_RIGHT",
            RangedAction::MoveRightRight => "MOVE_RIGHT_RIGHT",
            RangedAction::MoveDownLeft => "MOVE_DOWN_LEFT",
            RangedAction::MoveDown => "MOVE_DOWN",
            RangedAction::MoveDownRight => "MOVE_DOWN_RIGHT",
            RangedAction::MoveDownDown => "MOVE_DOWN_DOWN",
            RangedAction::AttackUpUp => "ATTACK_UP_UP",
            RangedAction::AttackUpLeft => "ATTACK_UP_LEFT",
            RangedAction::AttackUp => "ATTACK_UP",
            RangedAction::AttackUpRight => "ATTACK_UP_RIGHT",
            RangedAction::AttackLeftLeft => "ATTACK_LEFT_LEFT",
            RangedAction::AttackLeft => "ATTACK_LEFT",
            RangedAction::AttackRight => "ATTACK_RIGHT",
            RangedAction::AttackRightRight => "ATTACK_RIGHT_RIGHT",
            RangedAction::AttackDownLeft => "ATTACK_DOWN_LEFT",
            RangedAction::AttackDown => "ATTACK_DOWN",
            RangedAction::AttackDownRight => "ATTACK_DOWN_RIGHT",
            RangedAction::AttackDownDown => "ATTACK_DOWN_DOWN",
        }
    }
}

/// An action from the catalog of either unit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Melee(MeleeAction),
    Ranged(RangedAction),
}

impl Action {
    /// Index understood by the environment.
    pub fn index(self) -> usize {
        match self {
            Action::Melee(action) => action.index(),
            Action::Ranged(action) => action.index(),
        }
    }

    /// Decodes an environment index. Returns `None` outside
    /// `[0, unit_type.action_count())`.
    pub fn decode(unit_type: UnitType, index: usize) -> Option<Self> {
        match unit_type {
            UnitType::Melee => MeleeAction::from_index(index).map(Action::Melee),
            UnitType::Ranged => RangedAction::from_index(index).map(Action::Ranged),
        }
    }

    pub fn unit_type(self) -> UnitType {
        match self {
            Action::Melee(_) => UnitType::Melee,
            Action::Ranged(_) => UnitType::Ranged,
        }
    }

    pub fn idle(unit_type: UnitType) -> Self {
        match unit_type {
            UnitType::Melee => Action::Melee(MeleeAction::DoNothing),
            UnitType::Ranged => Action::Ranged(RangedAction::DoNothing),
        }
    }

    pub fn intent(self) -> Option<Intent> {
        match self {
            Action::Melee(action) => action.intent(),
            Action::Ranged(action) => action.intent(),
        }
    }

    pub fn is_idle(self) -> bool {
        self.intent().is_none()
    }

    /// Action that moves or attacks toward a target `offset` cells away.
    ///
    /// Melee units pick a single axis, the one with the larger absolute
    /// offset; on ties the horizontal axis wins. Ranged units step
    /// diagonally when both axes are nonzero and otherwise take a straight
    /// step of `min(|offset|, range)` cells.
    ///
    /// Returns `None` for a zero offset, which has no direction.
    pub fn engage(unit_type: UnitType, intent: Intent, offset: Offset) -> Option<Self> {
        if offset.is_zero() {
            return None;
        }
        let Offset { dx, dy } = offset;
        let horizontal = if dx < 0 {
            Direction::Left
        } else {
            Direction::Right
        };
        let vertical = if dy < 0 {
            Direction::Up
        } else {
            Direction::Down
        };

        let action = match unit_type {
            UnitType::Melee => {
                let direction = if dy.unsigned_abs() > dx.unsigned_abs() {
                    vertical
                } else {
                    horizontal
                };
                Action::Melee(MeleeAction::compose(intent, direction))
            }
            UnitType::Ranged => {
                let range = unit_type.range();
                let step = match (dx, dy) {
                    (0, dy) => RangedStep::straight(vertical, dy.unsigned_abs().min(range)),
                    (dx, 0) => RangedStep::straight(horizontal, dx.unsigned_abs().min(range)),
                    (dx, dy) => match (dx < 0, dy < 0) {
                        (true, true) => RangedStep::UpLeft,
                        (false, true) => RangedStep::UpRight,
                        (true, false) => RangedStep::DownLeft,
                        (false, false) => RangedStep::DownRight,
                    },
                };
                Action::Ranged(RangedAction::compose(intent, step))
            }
        };
        Some(action)
    }

    /// Move toward the opposing side, as far as the unit's range allows.
    pub fn advance(unit_type: UnitType, team: Team) -> Self {
        let direction = team.advance_direction();
        match unit_type {
            UnitType::Melee => Action::Melee(MeleeAction::compose(Intent::Move, direction)),
            UnitType::Ranged => Action::Ranged(RangedAction::compose(
                Intent::Move,
                RangedStep::straight(direction, unit_type.range()),
            )),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Melee(action) => write!(f, "MELEE_{}", action.name()),
            Action::Ranged(action) => write!(f, "RANGED_{}", action.name()),
        }
    }
}
