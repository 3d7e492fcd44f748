use tracing::Level;

use crate::{AgentIdentity, Offset, Position, action::Action, agent::Perception};

/// Why a policy settled on its action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    /// Sampled uniformly from the catalog.
    Random,
    /// The policy always idles.
    Idle,
    /// Moving toward or attacking the closest visible enemy.
    Engage,
    /// No enemy in view, heading for the opposing side.
    Advance,
}

/// Trait for observing agent decisions as they are made.
///
/// Every callback has an empty default so observers only implement what
/// they care about.
pub trait DecisionObserver: Send {
    /// Called when a live agent starts deciding on a fresh perception.
    fn on_perception(&mut self, _agent: &AgentIdentity, _perception: &Perception) {}

    /// Called with every enemy found in the observation, possibly none.
    fn on_enemies_located(&mut self, _agent: &AgentIdentity, _enemies: &[Position]) {}

    /// Called when the closest enemy has been picked as the target.
    fn on_target_selected(
        &mut self,
        _agent: &AgentIdentity,
        _target: Position,
        _offset: Offset,
        _distance: f64,
    ) {
    }

    /// Called once an action has been chosen.
    fn on_action_selected(
        &mut self,
        _agent: &AgentIdentity,
        _action: Action,
        _reason: DecisionReason,
    ) {
    }

    /// Called instead of deciding when the unit is done.
    fn on_unit_done(&mut self, _agent: &AgentIdentity) {}
}

/// Reports decisions as `tracing` events.
///
/// Channel dumps are only rendered when `TRACE` is enabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl DecisionObserver for TracingObserver {
    fn on_perception(&mut self, agent: &AgentIdentity, perception: &Perception) {
        let observation = &perception.observation;
        tracing::debug!(
            %agent,
            reward = perception.reward,
            height = observation.height(),
            width = observation.width(),
            channels = observation.channel_count(),
            "perception received"
        );

        if tracing::enabled!(Level::TRACE) {
            for (index, channel) in observation.channels().iter().enumerate() {
                let dump: Vec<String> = channel
                    .rows()
                    .map(|row| {
                        row.iter()
                            .map(|v| format!("{v:.0}"))
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .collect();
                tracing::trace!(%agent, channel = index, "\n{}", dump.join("\n"));
            }
        }
    }

    fn on_enemies_located(&mut self, agent: &AgentIdentity, enemies: &[Position]) {
        tracing::debug!(%agent, count = enemies.len(), ?enemies, "enemies located");
    }

    fn on_target_selected(
        &mut self,
        agent: &AgentIdentity,
        target: Position,
        offset: Offset,
        distance: f64,
    ) {
        tracing::debug!(%agent, %target, %offset, distance, "closest enemy selected");
    }

    fn on_action_selected(
        &mut self,
        agent: &AgentIdentity,
        action: Action,
        reason: DecisionReason,
    ) {
        tracing::debug!(
            %agent,
            %action,
            index = action.index(),
            ?reason,
            "action chosen"
        );
    }

    fn on_unit_done(&mut self, agent: &AgentIdentity) {
        tracing::debug!(%agent, "unit is done, returning no action");
    }
}

/// Fans every callback out to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Box<dyn DecisionObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Box<dyn DecisionObserver>>) -> Self {
        Self { observers }
    }

    pub fn push(&mut self, observer: Box<dyn DecisionObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl DecisionObserver for CompositeObserver {
    fn on_perception(&mut self, agent: &AgentIdentity, perception: &Perception) {
        for observer in &mut self.observers {
            observer.on_perception(agent, perception);
        }
    }

    fn on_enemies_located(&mut self, agent: &AgentIdentity, enemies: &[Position]) {
        for observer in &mut self.observers {
            observer.on_enemies_located(agent, enemies);
        }
    }

    fn on_target_selected(
        &mut self,
        agent: &AgentIdentity,
        target: Position,
        offset: Offset,
        distance: f64,
    ) {
        for observer in &mut self.observers {
            observer.on_target_selected(agent, target, offset, distance);
        }
    }

    fn on_action_selected(
        &mut self,
        agent: &AgentIdentity,
        action: Action,
        reason: DecisionReason,
    ) {
        for observer in &mut self.observers {
            observer.on_action_selected(agent, action, reason);
        }
    }

    fn on_unit_done(&mut self, agent: &AgentIdentity) {
        for observer in &mut self.observers {
            observer.on_unit_done(agent);
        }
    }
}
