use std::collections::HashMap;

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{
    AgentIdentity, Offset,
    action::{Action, Intent},
    config::AgentConfig,
    error::{DecisionError, IdentityError},
    geometry::{closest_index, euclidean_distance},
    observation::Observation,
    observer::{CompositeObserver, DecisionObserver, DecisionReason},
};

/// Auxiliary per-tick data handed out by the environment.
pub type Info = HashMap<String, String>;

/// Everything the environment tells an agent about one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Perception {
    pub observation: Observation,
    pub reward: f32,
    /// The unit is dead or the episode is over.
    pub done: bool,
    pub info: Info,
}

impl Perception {
    pub fn new(observation: Observation, reward: f32, done: bool) -> Self {
        Self {
            observation,
            reward,
            done,
            info: Info::new(),
        }
    }

    pub fn with_info(mut self, info: Info) -> Self {
        self.info = info;
        self
    }
}

/// Trait defining the behavior of an agent.
///
/// The environment calls [`Agent::see`] once per tick and then asks for
/// [`Agent::action`]. An action of `None` means the unit is done.
pub trait Agent: Send {
    fn identity(&self) -> &AgentIdentity;

    /// Replaces the agent's perception with the latest tick.
    fn see(&mut self, perception: Perception);

    /// The perception delivered by the last [`Agent::see`], if any.
    fn perception(&self) -> Option<&Perception>;

    /// Chooses an action for the current perception.
    fn action(&mut self) -> Result<Option<Action>, DecisionError>;

    /// Adds an observer notified of every decision. Observers attached
    /// earlier keep receiving callbacks.
    fn attach_observer(&mut self, observer: Box<dyn DecisionObserver>);
}

/// State common to every policy: who the agent is and what it last saw.
struct AgentState {
    identity: AgentIdentity,
    perception: Option<Perception>,
    observer: Option<Box<dyn DecisionObserver>>,
}

impl AgentState {
    fn new(identity: AgentIdentity) -> Self {
        Self {
            identity,
            perception: None,
            observer: None,
        }
    }

    /// An agent that has not seen anything yet is not done.
    fn is_done(&self) -> bool {
        self.perception.as_ref().is_some_and(|p| p.done)
    }

    fn notify(&mut self, f: impl FnOnce(&mut dyn DecisionObserver, &AgentIdentity)) {
        if let Some(observer) = self.observer.as_deref_mut() {
            f(observer, &self.identity);
        }
    }

    /// Shared prologue: reports done units and fresh perceptions.
    /// Returns `false` when the unit is done and must not act.
    fn begin_decision(&mut self) -> bool {
        if self.is_done() {
            self.notify(|o, id| o.on_unit_done(id));
            return false;
        }
        if let (Some(observer), Some(perception)) =
            (self.observer.as_deref_mut(), self.perception.as_ref())
        {
            observer.on_perception(&self.identity, perception);
        }
        true
    }

    fn attach(&mut self, observer: Box<dyn DecisionObserver>) {
        self.observer = Some(match self.observer.take() {
            None => observer,
            Some(existing) => Box::new(CompositeObserver::new(vec![existing, observer])),
        });
    }

    fn conclude(&mut self, action: Action, reason: DecisionReason) -> Option<Action> {
        self.notify(|o, id| o.on_action_selected(id, action, reason));
        Some(action)
    }
}

impl std::fmt::Debug for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentState")
            .field("identity", &self.identity)
            .field("perception", &self.perception)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

macro_rules! delegate_agent_state {
    () => {
        fn identity(&self) -> &AgentIdentity {
            &self.state.identity
        }

        fn see(&mut self, perception: Perception) {
            self.state.perception = Some(perception);
        }

        fn perception(&self) -> Option<&Perception> {
            self.state.perception.as_ref()
        }

        fn attach_observer(&mut self, observer: Box<dyn DecisionObserver>) {
            self.state.attach(observer);
        }
    };
}

/// Picks a uniformly random action from its catalog.
#[derive(Debug)]
pub struct RandomAgent<R = StdRng> {
    state: AgentState,
    rng: R,
}

impl RandomAgent {
    pub fn new(identity: AgentIdentity, seed: u64) -> Self {
        Self::with_rng(identity, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomAgent<R> {
    pub fn with_rng(identity: AgentIdentity, rng: R) -> Self {
        Self {
            state: AgentState::new(identity),
            rng,
        }
    }
}

impl<R: Rng + Send> Agent for RandomAgent<R> {
    delegate_agent_state!();

    fn action(&mut self) -> Result<Option<Action>, DecisionError> {
        if !self.state.begin_decision() {
            return Ok(None);
        }
        let unit_type = self.state.identity.unit_type;
        let index = self.rng.random_range(0..unit_type.action_count());
        Ok(Action::decode(unit_type, index)
            .and_then(|action| self.state.conclude(action, DecisionReason::Random)))
    }
}

/// Always idles.
#[derive(Debug)]
pub struct DoNothingAgent {
    state: AgentState,
}

impl DoNothingAgent {
    pub fn new(identity: AgentIdentity) -> Self {
        Self {
            state: AgentState::new(identity),
        }
    }
}

impl Agent for DoNothingAgent {
    delegate_agent_state!();

    fn action(&mut self) -> Result<Option<Action>, DecisionError> {
        if !self.state.begin_decision() {
            return Ok(None);
        }
        let action = Action::idle(self.state.identity.unit_type);
        Ok(self.state.conclude(action, DecisionReason::Idle))
    }
}

/// Attacks the closest visible enemy when it is in range and moves toward
/// it otherwise. With no enemy in view it advances toward the opposing side.
#[derive(Debug)]
pub struct GreedyAgent {
    state: AgentState,
    config: AgentConfig,
}

impl GreedyAgent {
    pub fn new(identity: AgentIdentity, config: AgentConfig) -> Self {
        Self {
            state: AgentState::new(identity),
            config,
        }
    }
}

impl Agent for GreedyAgent {
    delegate_agent_state!();

    fn action(&mut self) -> Result<Option<Action>, DecisionError> {
        let channel = self.config.enemy_channel();
        let enemies = match self.state.perception.as_ref() {
            None => return Err(DecisionError::NoPerception(self.state.identity.to_string())),
            Some(perception) => {
                let observation = &perception.observation;
                observation
                    .enemy_positions(channel)
                    .ok_or(DecisionError::MissingChannel {
                        channel,
                        channels: observation.channel_count(),
                    })
            }
        };
        if !self.state.begin_decision() {
            return Ok(None);
        }
        let enemies = enemies?;
        self.state.notify(|o, id| o.on_enemies_located(id, &enemies));

        let reference = self.config.reference_position;
        let unit_type = self.state.identity.unit_type;

        let Some(closest) = closest_index(reference, &enemies) else {
            let action = Action::advance(unit_type, self.state.identity.team);
            return Ok(self.state.conclude(action, DecisionReason::Advance));
        };

        let target = enemies[closest];
        let offset = Offset::between(reference, target);
        let distance = euclidean_distance(reference, &target)[0];
        self.state.notify(|o, id| o.on_target_selected(id, target, offset, distance));

        let intent = if distance <= unit_type.range() as f64 {
            Intent::Attack
        } else {
            Intent::Move
        };
        let action = Action::engage(unit_type, intent, offset)
            .ok_or(DecisionError::TargetOnReference { target })?;
        Ok(self.state.conclude(action, DecisionReason::Engage))
    }
}

/// Selects which policy drives a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    Random,
    DoNothing,
    Greedy,
}

impl AgentKind {
    /// Builds an agent for the unit called `name`. `seed` only matters for
    /// [`AgentKind::Random`].
    pub fn build(
        self,
        name: &str,
        config: &AgentConfig,
        seed: u64,
    ) -> Result<Box<dyn Agent>, IdentityError> {
        let identity: AgentIdentity = name.parse()?;
        let agent: Box<dyn Agent> = match self {
            AgentKind::Random => Box::new(RandomAgent::new(identity, seed)),
            AgentKind::DoNothing => Box::new(DoNothingAgent::new(identity)),
            AgentKind::Greedy => Box::new(GreedyAgent::new(identity, config.clone())),
        };
        Ok(agent)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{
        Position, Team, UnitType,
        action::{MeleeAction, RangedAction},
        observation::load_observation_from_string,
    };

    /// 13x13 view with enemies at the given (x, y) cells.
    fn view(enemies: &[(usize, usize)]) -> Observation {
        let text: String = (0..13)
            .map(|y| {
                (0..13)
                    .map(|x| if enemies.contains(&(x, y)) { "E" } else { "." })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n");
        load_observation_from_string(&text, &AgentConfig::default()).unwrap()
    }

    fn greedy(name: &str, enemies: &[(usize, usize)]) -> Result<Option<Action>, DecisionError> {
        let mut agent = GreedyAgent::new(name.parse().unwrap(), AgentConfig::default());
        agent.see(Perception::new(view(enemies), 0.0, false));
        agent.action()
    }

    type Events = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        events: Events,
    }

    impl Recorder {
        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl DecisionObserver for Recorder {
        fn on_enemies_located(&mut self, _agent: &AgentIdentity, enemies: &[Position]) {
            self.push(format!("enemies {}", enemies.len()));
        }

        fn on_target_selected(
            &mut self,
            _agent: &AgentIdentity,
            target: Position,
            _offset: Offset,
            _distance: f64,
        ) {
            self.push(format!("target {target}"));
        }

        fn on_action_selected(
            &mut self,
            agent: &AgentIdentity,
            action: Action,
            reason: DecisionReason,
        ) {
            self.push(format!("{agent} {action} {reason:?}"));
        }

        fn on_unit_done(&mut self, agent: &AgentIdentity) {
            self.push(format!("{agent} done"));
        }
    }

    fn assert_send<T: Send>() {}

    #[test]
    fn random_agent_stays_in_catalog() {
        for name in ["redmelee_0", "blueranged_1"] {
            let identity: AgentIdentity = name.parse().unwrap();
            let count = identity.unit_type.action_count();
            let mut agent = RandomAgent::new(identity, 42);
            agent.see(Perception::new(view(&[]), 0.0, false));
            for _ in 0..200 {
                let action = agent.action().unwrap().unwrap();
                assert!(action.index() < count);
            }
        }
    }

    #[test]
    fn random_agent_is_reproducible_with_seed() {
        let draw = |seed| {
            let mut agent = RandomAgent::new("blueranged_2".parse().unwrap(), seed);
            (0..20)
                .map(|_| agent.action().unwrap().unwrap().index())
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(3), draw(3));
    }

    #[test]
    fn done_units_return_no_action() {
        for name in ["redmelee_0", "redranged_0", "bluemele_1", "blueranged_4"] {
            let identity: AgentIdentity = name.parse().unwrap();
            let done = || Perception::new(view(&[(7, 6)]), -1.0, true);

            let mut random = RandomAgent::new(identity.clone(), 0);
            random.see(done());
            assert_eq!(random.action(), Ok(None));

            let mut idle = DoNothingAgent::new(identity.clone());
            idle.see(done());
            assert_eq!(idle.action(), Ok(None));

            let mut greedy = GreedyAgent::new(identity, AgentConfig::default());
            greedy.see(done());
            assert_eq!(greedy.action(), Ok(None));
        }
    }

    #[test]
    fn do_nothing_agent_idles_per_unit_type() {
        let mut melee = DoNothingAgent::new("redmelee_0".parse().unwrap());
        let mut ranged = DoNothingAgent::new("redranged_0".parse().unwrap());
        let melee_action = melee.action().unwrap().unwrap();
        let ranged_action = ranged.action().unwrap().unwrap();

        assert_ne!(melee_action.index(), ranged_action.index());
        assert_eq!(
            Action::decode(UnitType::Melee, melee_action.index()),
            Some(Action::Melee(MeleeAction::DoNothing))
        );
        assert_eq!(
            Action::decode(UnitType::Ranged, ranged_action.index()),
            Some(Action::Ranged(RangedAction::DoNothing))
        );
    }

    #[test]
    fn greedy_without_enemies_advances_by_range() {
        assert_eq!(
            greedy("redranged_0", &[]),
            Ok(Some(Action::Ranged(RangedAction::MoveRightRight)))
        );
        assert_eq!(
            greedy("blueranged_0", &[]),
            Ok(Some(Action::Ranged(RangedAction::MoveLeftLeft)))
        );
        assert_eq!(
            greedy("redmelee_0", &[]),
            Ok(Some(Action::Melee(MeleeAction::MoveRight)))
        );
        assert_eq!(
            greedy("bluemele_0", &[]),
            Ok(Some(Action::Melee(MeleeAction::MoveLeft)))
        );
        assert_eq!(
            greedy("redranged_0", &[]).unwrap().unwrap().index(),
            RangedAction::MoveRightRight.index()
        );
    }

    #[test]
    fn greedy_attacks_at_exactly_range() {
        // melee range 1: enemy directly below
        assert_eq!(
            greedy("redmelee_0", &[(6, 7)]),
            Ok(Some(Action::Melee(MeleeAction::AttackDown)))
        );
        // ranged range 2: enemy two cells up
        assert_eq!(
            greedy("blueranged_0", &[(6, 4)]),
            Ok(Some(Action::Ranged(RangedAction::AttackUpUp)))
        );
        // just outside range: move instead
        assert_eq!(
            greedy("blueranged_0", &[(6, 3)]),
            Ok(Some(Action::Ranged(RangedAction::MoveUpUp)))
        );
        assert_eq!(
            greedy("redmelee_0", &[(7, 7)]),
            Ok(Some(Action::Melee(MeleeAction::MoveRight)))
        );
    }

    #[test]
    fn greedy_ranged_diagonals_follow_distance() {
        // sqrt(2) is within range 2
        assert_eq!(
            greedy("redranged_0", &[(7, 7)]),
            Ok(Some(Action::Ranged(RangedAction::AttackDownRight)))
        );
        assert_eq!(
            greedy("blueranged_1", &[(5, 5)]),
            Ok(Some(Action::Ranged(RangedAction::AttackUpLeft)))
        );
        // sqrt(5) is out of range, still a diagonal step
        assert_eq!(
            greedy("redranged_0", &[(8, 7)]),
            Ok(Some(Action::Ranged(RangedAction::MoveDownRight)))
        );
        assert_eq!(
            greedy("blueranged_1", &[(4, 7)]),
            Ok(Some(Action::Ranged(RangedAction::MoveDownLeft)))
        );
    }

    #[test]
    fn greedy_targets_closest_enemy() {
        // far enemy first in row-major order, close one on the left
        assert_eq!(
            greedy("redranged_0", &[(12, 0), (5, 5)]),
            Ok(Some(Action::Ranged(RangedAction::AttackUpLeft)))
        );
        assert_eq!(
            greedy("redmelee_0", &[(0, 6), (6, 10)]),
            Ok(Some(Action::Melee(MeleeAction::MoveDown)))
        );
    }

    #[test]
    fn greedy_uses_configured_reference_and_channel() {
        let config = AgentConfig {
            minimap_mode: true,
            reference_position: Position::new(0, 0),
        };
        let text = "E . .\n. . .\n. . E";
        let observation = load_observation_from_string(text, &config).unwrap();

        let mut agent = GreedyAgent::new("redmelee_0".parse().unwrap(), config);
        agent.see(Perception::new(observation.clone(), 0.0, false));
        assert_eq!(
            agent.action(),
            Err(DecisionError::TargetOnReference {
                target: Position::new(0, 0)
            })
        );

        let mut agent = GreedyAgent::new(
            "redmelee_0".parse().unwrap(),
            AgentConfig {
                minimap_mode: true,
                reference_position: Position::new(1, 1),
            },
        );
        agent.see(Perception::new(observation, 0.0, false));
        // both enemies are diagonal, the first found wins, tie goes horizontal
        assert_eq!(agent.action(), Ok(Some(Action::Melee(MeleeAction::MoveLeft))));
    }

    #[test]
    fn greedy_reports_missing_channel_and_perception() {
        let mut agent = GreedyAgent::new("redmelee_0".parse().unwrap(), AgentConfig::default());
        assert_eq!(
            agent.action(),
            Err(DecisionError::NoPerception("redmelee_0".to_string()))
        );

        let thin = Observation::from_hwc(1, 1, 2, vec![0.0, 0.0]).unwrap();
        agent.see(Perception::new(thin, 0.0, false));
        assert_eq!(
            agent.action(),
            Err(DecisionError::MissingChannel {
                channel: 3,
                channels: 2
            })
        );
    }

    #[test]
    fn greedy_melee_never_idles() {
        for x in 0..13 {
            for y in 0..13 {
                if (x, y) == (6, 6) {
                    continue;
                }
                let action = greedy("bluemelee_3", &[(x, y)]).unwrap().unwrap();
                assert!(!action.is_idle());
                assert_eq!(action.unit_type(), UnitType::Melee);
            }
        }
    }

    #[test]
    fn observer_sees_the_decision() {
        let events = Events::default();
        let mut agent = GreedyAgent::new("redranged_0".parse().unwrap(), AgentConfig::default());
        agent.attach_observer(Box::new(Recorder {
            events: Arc::clone(&events),
        }));

        agent.see(Perception::new(view(&[(9, 6)]), 0.0, false));
        agent.action().unwrap();
        agent.see(Perception::new(view(&[]), 0.0, true));
        agent.action().unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                "enemies 1".to_string(),
                "target (9, 6)".to_string(),
                "redranged_0 RANGED_MOVE_RIGHT_RIGHT Engage".to_string(),
                "redranged_0 done".to_string(),
            ]
        );
    }

    #[test]
    fn attached_observers_all_hear_decisions() {
        let first = Events::default();
        let second = Events::default();
        let mut agent = DoNothingAgent::new("blueranged_2".parse().unwrap());
        agent.attach_observer(Box::new(Recorder {
            events: Arc::clone(&first),
        }));
        agent.attach_observer(Box::new(Recorder {
            events: Arc::clone(&second),
        }));
        agent.action().unwrap();

        let expected = vec!["blueranged_2 RANGED_DO_NOTHING Idle".to_string()];
        assert_eq!(*first.lock().unwrap(), expected);
        assert_eq!(*second.lock().unwrap(), expected);
    }

    #[test]
    fn agents_can_move_across_threads() {
        assert_send::<RandomAgent>();
        assert_send::<DoNothingAgent>();
        assert_send::<GreedyAgent>();
        assert_send::<Box<dyn Agent>>();

        let mut agent = AgentKind::Greedy
            .build("redmelee_0", &AgentConfig::default(), 0)
            .unwrap();
        agent.see(Perception::new(view(&[(6, 5)]), 0.0, false));
        let action = std::thread::spawn(move || agent.action())
            .join()
            .unwrap();
        assert_eq!(action, Ok(Some(Action::Melee(MeleeAction::AttackUp))));
    }

    #[test]
    fn kind_builds_agents_from_names() {
        let config = AgentConfig::default();
        let agent = AgentKind::Greedy.build("bluemele_7", &config, 0).unwrap();
        assert_eq!(
            agent.identity(),
            &AgentIdentity::new(Team::Blue, UnitType::Melee, 7)
        );
        assert!(AgentKind::Random.build("purplemelee_0", &config, 0).is_err());
    }

    #[test]
    fn perception_keeps_info() {
        let mut info = Info::new();
        info.insert("kills".to_string(), "2".to_string());
        let mut agent = DoNothingAgent::new("redmelee_1".parse().unwrap());
        agent.see(Perception::new(view(&[]), 0.5, false).with_info(info.clone()));
        assert_eq!(agent.perception().map(|p| &p.info), Some(&info));
    }
}
