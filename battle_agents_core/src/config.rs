use serde::{Deserialize, Serialize};

use crate::Position;

/// Cell an agent occupies in its own 13x13 egocentric view.
pub const DEFAULT_REFERENCE_POSITION: Position = Position { x: 6, y: 6 };

/// Enemy presence channel of a regular observation.
pub const ENEMY_CHANNEL: usize = 3;
/// Enemy presence channel when the environment adds a minimap layer.
pub const MINIMAP_ENEMY_CHANNEL: usize = 4;

/// Settings shared by the agents of one episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// The environment was created with `minimap_mode`, which shifts the
    /// enemy presence channel by one.
    pub minimap_mode: bool,
    /// Where the acting agent sits inside its observation.
    pub reference_position: Position,
}

impl AgentConfig {
    pub fn enemy_channel(&self) -> usize {
        if self.minimap_mode {
            MINIMAP_ENEMY_CHANNEL
        } else {
            ENEMY_CHANNEL
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            minimap_mode: false,
            reference_position: DEFAULT_REFERENCE_POSITION,
        }
    }
}
