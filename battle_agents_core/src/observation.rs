use serde::{Deserialize, Serialize};

use crate::{Position, config::AgentConfig, error::ObservationError, map::Grid};

/// Channel carrying obstacles in observations built from text.
pub const OBSTACLE_CHANNEL: usize = 0;
/// Channel carrying the agent's own team in observations built from text.
pub const ALLY_CHANNEL: usize = 1;

/// An egocentric view of the battlefield: `height x width` cells, each with
/// one value per channel.
///
/// Channels are stored as separate [`Grid`] layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    width: usize,
    height: usize,
    channels: Vec<Grid<f32>>,
}

impl Observation {
    /// Builds an observation from a flat buffer in height, width, channel
    /// order, the layout the environment hands out.
    pub fn from_hwc(
        height: usize,
        width: usize,
        channel_count: usize,
        values: Vec<f32>,
    ) -> Result<Self, ObservationError> {
        let expected = height
            .checked_mul(width)
            .and_then(|cells| cells.checked_mul(channel_count))
            .ok_or(ObservationError::TooLarge {
                height,
                width,
                channels: channel_count,
            })?;
        if values.len() != expected {
            return Err(ObservationError::ShapeMismatch {
                expected,
                found: values.len(),
            });
        }
        if channel_count == 0 {
            return Err(ObservationError::NoChannels);
        }

        let channels = (0..channel_count)
            .map(|c| {
                Grid::from_generator(width, height, |x, y| {
                    values[(y * width + x) * channel_count + c]
                })
            })
            .collect();

        Ok(Observation {
            width,
            height,
            channels,
        })
    }

    /// Builds an observation from equally sized channel layers.
    pub fn from_channels(channels: Vec<Grid<f32>>) -> Result<Self, ObservationError> {
        let first = channels.first().ok_or(ObservationError::NoChannels)?;
        let (width, height) = (first.width(), first.height());

        for (channel, grid) in channels.iter().enumerate() {
            if grid.width() != width || grid.height() != height {
                return Err(ObservationError::ChannelSize {
                    channel,
                    width: grid.width(),
                    height: grid.height(),
                    expected_width: width,
                    expected_height: height,
                });
            }
        }

        Ok(Observation {
            width,
            height,
            channels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, index: usize) -> Option<&Grid<f32>> {
        self.channels.get(index)
    }

    pub fn channels(&self) -> &[Grid<f32>] {
        &self.channels
    }

    /// Positions of every cell equal to 1 in `channel`, in row-major order.
    ///
    /// Returns `None` if the observation has no such channel.
    pub fn enemy_positions(&self, channel: usize) -> Option<Vec<Position>> {
        let grid = self.channel(channel)?;
        Some(
            grid.enumerate()
                .filter(|(_, value)| **value == 1.0)
                .map(|(position, _)| position)
                .collect(),
        )
    }
}

/// Loads an observation from a whitespace separated token grid.
///
/// Tokens: `.` empty, `#` obstacle, `A` ally, `E` enemy. The observation
/// gets enough channels to hold the enemy channel selected by `config`.
pub fn load_observation_from_string(
    text: &str,
    config: &AgentConfig,
) -> Result<Observation, ObservationError> {
    let lines: Vec<&str> = text.trim().lines().collect();
    if lines.is_empty() {
        return Err(ObservationError::Empty);
    }

    let mut rows: Vec<Vec<&str>> = Vec::with_capacity(lines.len());
    for (y, line) in lines.iter().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if let Some(first) = rows.first() {
            if tokens.len() != first.len() {
                return Err(ObservationError::RaggedRow {
                    row: y,
                    expected: first.len(),
                    found: tokens.len(),
                });
            }
        } else if tokens.is_empty() {
            return Err(ObservationError::Empty);
        }
        rows.push(tokens);
    }

    let height = rows.len();
    let width = rows[0].len();
    let enemy_channel = config.enemy_channel();
    let mut channels: Vec<Grid<f32>> = vec![Grid::new(width, height); enemy_channel + 1];

    for (y, row) in rows.iter().enumerate() {
        for (x, token) in row.iter().enumerate() {
            let channel = match *token {
                "." => continue,
                "#" => OBSTACLE_CHANNEL,
                "A" => ALLY_CHANNEL,
                "E" => enemy_channel,
                unknown => {
                    return Err(ObservationError::UnknownToken {
                        token: unknown.to_string(),
                        x,
                        y,
                    });
                }
            };
            channels[channel][Position::new(x, y)] = 1.0;
        }
    }

    Observation::from_channels(channels)
}
