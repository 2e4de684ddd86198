// host.rs - The world scripts run against, and the native script host
//
// A frame is: run every update system (init systems dispatched after each),
// roll the input over, then drop entities destroyed during the frame. The
// first failing callback puts the host into a crashed state; later frames are
// refused until the script is reloaded.

use crate::js::ScriptError;
use kindle_asset::{spawn_world, DataError, GameData, TemplateError, Templates, WorldData};
use kindle_core::ecs::{
    ComponentId, Entity, Registry, RegistryError, SystemContext, SystemFailure,
    SystemRegistrationError, Systems, TickStats,
};
use kindle_core::math::Random;
use kindle_core::time::SimulationTime;
use kindle_services::{Input, Key};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("script has crashed: {0}")]
    Crashed(String),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Registration(#[from] SystemRegistrationError),
    #[error(transparent)]
    Script(#[from] ScriptError),
}

/// Everything a script reads and writes: entities, input and templates.
#[derive(Default)]
pub struct World {
    pub registry: Registry,
    pub input: Input,
    pub templates: Templates,
    pub time: SimulationTime,
    /// Seeds every random stream a script creates.
    pub random: Random,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the game's inputs and declare its templates by name.
    pub fn from_game(game: &GameData) -> Self {
        let mut world = Self::new();
        world.random = Random::from_seed(game.seed);
        for bind in &game.binds {
            world.input.add_named(bind.name.clone(), &bind.key);
        }
        world.templates.declare(game);
        world
    }

    pub fn create_from_template(&mut self, name: &str) -> Result<Entity, TemplateError> {
        self.templates.create(name, &mut self.registry)
    }

    /// Finish a frame. Returns the number of entities removed.
    pub fn end_frame(&mut self, dt: f32) -> usize {
        self.input.advance_frame();
        self.time.advance_tick(dt);
        self.registry.remove_removed()
    }

    /// Current state of every bound key.
    pub fn key_states(&self) -> Vec<(Key, f32)> {
        let mut states: Vec<(Key, f32)> = Vec::new();
        for bind in self.input.iter() {
            if bind.key != Key::Unbound && !states.iter().any(|(k, _)| *k == bind.key) {
                states.push((bind.key, bind.state.state));
            }
        }
        states
    }

    pub fn summary(&self) -> WorldSummary {
        WorldSummary {
            frame: self.time.tick_count(),
            entities: self.registry.entity_count(),
            components: self
                .registry
                .component_types()
                .map(|ty| (ty.name.clone(), self.registry.count(ty.id)))
                .collect(),
        }
    }
}

impl SystemContext for World {
    fn take_created(&mut self) -> Vec<Entity> {
        self.registry.take_created()
    }

    fn has_components(&self, entity: Entity, components: &[ComponentId]) -> bool {
        self.registry.has_components(entity, components)
    }
}

/// Entity counts at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldSummary {
    pub frame: u64,
    pub entities: usize,
    pub components: Vec<(String, usize)>,
}

impl fmt::Display for WorldSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame {}: {} entities", self.frame, self.entities)?;
        for (name, count) in &self.components {
            write!(f, ", {name}={count}")?;
        }
        Ok(())
    }
}

/// A loaded script that can be stepped frame by frame.
pub trait Simulation {
    /// Run one frame of `dt` seconds.
    fn frame(&mut self, dt: f32) -> Result<TickStats, HostError>;

    /// Access the world between frames.
    fn with_world<R>(&mut self, f: impl FnOnce(&mut World) -> R) -> R;

    /// Description of the failure that stopped the script, if any.
    fn crashed(&self) -> Option<&str>;
}

/// What a native callback gets: the world plus the script's own state.
pub struct ScriptEnv<S> {
    pub world: World,
    pub state: S,
}

impl<S> SystemContext for ScriptEnv<S> {
    fn take_created(&mut self) -> Vec<Entity> {
        self.world.take_created()
    }

    fn has_components(&self, entity: Entity, components: &[ComponentId]) -> bool {
        self.world.has_components(entity, components)
    }
}

/// Hosts a script written as Rust callbacks.
pub struct NativeHost<S> {
    env: ScriptEnv<S>,
    systems: Systems<ScriptEnv<S>>,
    crashed: Option<String>,
}

impl<S> NativeHost<S> {
    /// Load a native script: bind the game, let `script` register its
    /// components and systems, then resolve templates and spawn the world.
    pub fn load<F>(game: &GameData, world_data: &WorldData, script: F) -> Result<Self, HostError>
    where
        F: FnOnce(&mut World, &mut Systems<ScriptEnv<S>>) -> Result<S, HostError>,
    {
        let mut world = World::from_game(game);
        let mut systems = Systems::new();
        let state = script(&mut world, &mut systems)?;
        world.templates.resolve(game, &world.registry);

        let mut host = Self {
            env: ScriptEnv { world, state },
            systems,
            crashed: None,
        };
        spawn_world(world_data, &host.env.world.templates, &mut host.env.world.registry)?;
        let failures = host.systems.run_inits(&mut host.env);
        host.record_failure(failures.first());
        tracing::info!(
            title = %game.title,
            systems = host.systems.len(),
            entities = host.env.world.registry.entity_count(),
            "loaded native script"
        );
        Ok(host)
    }

    pub fn world(&self) -> &World {
        &self.env.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.env.world
    }

    pub fn state(&self) -> &S {
        &self.env.state
    }

    pub fn systems(&self) -> &Systems<ScriptEnv<S>> {
        &self.systems
    }

    fn record_failure(&mut self, failure: Option<&SystemFailure>) {
        if let (None, Some(failure)) = (&self.crashed, failure) {
            tracing::error!("script crashed: {failure}");
            self.crashed = Some(failure.to_string());
        }
    }
}

impl<S> Simulation for NativeHost<S> {
    fn frame(&mut self, dt: f32) -> Result<TickStats, HostError> {
        if let Some(failure) = &self.crashed {
            return Err(HostError::Crashed(failure.clone()));
        }
        let stats = self.systems.update(&mut self.env, dt);
        self.env.world.end_frame(dt);
        self.record_failure(stats.first_failure());
        Ok(stats)
    }

    fn with_world<R>(&mut self, f: impl FnOnce(&mut World) -> R) -> R {
        f(&mut self.env.world)
    }

    fn crashed(&self) -> Option<&str> {
        self.crashed.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kindle_core::ecs::{ComponentInit, SystemError};
    use kindle_core::glam::Vec2;

    fn game() -> GameData {
        GameData::from_json(
            r#"{
                "title": "test",
                "binds": [{"name": "fire", "key": "space"}, {"name": "alt fire", "key": "space"}],
                "templates": [{"name": "ball", "components": [
                    {"position": {"x": 1, "y": 2}},
                    {"custom": {"name": "Ball"}}
                ]}]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn load_spawns_world_and_runs_inits() {
        let world_data = WorldData::from_json(r#"{"objects": [{"template": "ball"}]}"#).unwrap();
        let host = NativeHost::load(&game(), &world_data, |world, systems| {
            let ball = world.registry.register("Ball", ComponentInit::Empty)?;
            systems.on_init("count balls", &[ball], |env: &mut ScriptEnv<u32>, _e| {
                env.state += 1;
                Ok(())
            })?;
            Ok(0)
        })
        .unwrap();

        assert_eq!(*host.state(), 1);
        let ball = host.world().registry.component_id("Ball").unwrap();
        let balls = host.world().registry.entities(&[ball]);
        assert_eq!(host.world().registry.position2(balls[0]), Some(&Vec2::new(1.0, 2.0)));
    }

    #[test]
    fn frame_rolls_input_and_removes_destroyed() {
        let world_data = WorldData::from_json(r#"{"objects": [{"template": "ball"}]}"#).unwrap();
        let mut host = NativeHost::load(&game(), &world_data, |world, systems| {
            let ball = world.registry.register("Ball", ComponentInit::Empty)?;
            systems.add_update("pop", move |env: &mut ScriptEnv<()>, _dt| {
                if env.world.input.state("fire").just_pressed() {
                    for e in env.world.registry.entities(&[ball]) {
                        env.world.registry.destroy(e);
                    }
                }
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();

        host.frame(0.1).unwrap();
        assert_eq!(host.world().registry.entity_count(), 1);

        host.with_world(|world| world.input.set_key_state(Key::Space, 1.0));
        host.frame(0.1).unwrap();
        assert_eq!(host.world().registry.entity_count(), 0);
        assert_eq!(host.world().input.state("fire").last_state, 1.0);
        assert_eq!(host.world().time.tick_count(), 2);
        assert_eq!(host.world().key_states(), vec![(Key::Space, 1.0)]);
    }

    #[test]
    fn first_failure_crashes_host() {
        let mut host = NativeHost::load(&game(), &WorldData::default(), |_world, systems| {
            systems.add_update("broken", |_env: &mut ScriptEnv<()>, _dt| {
                Err(SystemError::Script("boom".to_string()))
            })?;
            Ok(())
        })
        .unwrap();

        let stats = host.frame(0.1).unwrap();
        assert_eq!(stats.failures.len(), 1);
        assert_eq!(host.crashed(), Some("failed to update in broken: boom"));
        assert!(matches!(host.frame(0.1), Err(HostError::Crashed(_))));
    }

    #[test]
    fn summary_counts_components() {
        let mut world = World::from_game(&game());
        let e = world.registry.create();
        world.registry.set_position2(e, Vec2::ZERO).unwrap();
        let summary = world.summary();
        assert_eq!(summary.entities, 1);
        assert_eq!(summary.to_string(), "frame 0: 1 entities, Position2=1");
    }
}
