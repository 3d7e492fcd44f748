use crate::Position;

/// Errors raised when an agent name cannot be turned into an identity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("agent name '{0}' does not start with a known team (red or blue)")]
    UnknownTeam(String),
    #[error("agent name '{0}' does not name a known unit type (melee or ranged)")]
    UnknownUnitType(String),
    #[error("agent name '{0}' does not end with a numeric slot")]
    InvalidSlot(String),
}

/// Errors raised while building an observation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObservationError {
    #[error("observation holds {found} values, expected {expected} (height * width * channels)")]
    ShapeMismatch { expected: usize, found: usize },
    #[error("observation shape {height}x{width}x{channels} overflows the addressable size")]
    TooLarge {
        height: usize,
        width: usize,
        channels: usize,
    },
    #[error("channel {channel} is {width}x{height}, expected {expected_width}x{expected_height}")]
    ChannelSize {
        channel: usize,
        width: usize,
        height: usize,
        expected_width: usize,
        expected_height: usize,
    },
    #[error("observation has no channels")]
    NoChannels,
    #[error("observation text is empty")]
    Empty,
    #[error("inconsistent width at row {row}: expected {expected}, found {found}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown observation token '{token}' at ({x}, {y})")]
    UnknownToken { token: String, x: usize, y: usize },
}

/// Errors raised by a policy while choosing an action.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecisionError {
    #[error("agent {0} was asked for an action before receiving any observation")]
    NoPerception(String),
    #[error("enemy channel {channel} is missing, the observation has {channels} channels")]
    MissingChannel { channel: usize, channels: usize },
    #[error("enemy reported at the reference position {target}, no direction can reach it")]
    TargetOnReference { target: Position },
}
