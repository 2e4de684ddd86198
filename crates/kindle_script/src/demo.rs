//! The shooter demo as a native script.
//!
//! Same behavior as `demos/shooter/main.js`: the player moves with the arrow
//! bindings, `fire` spawns a `shot` that flies up and times out, and the
//! script barks once per second.

use crate::host::{HostError, ScriptEnv, World};
use kindle_asset::TemplateError;
use kindle_core::ecs::{ComponentId, ComponentInit, Fields, SystemError, Systems};
use kindle_core::time::IntervalTimer;

pub const PLAYER_SPEED: f32 = 150.0;
pub const SHOT_SPEED: f64 = 250.0;
pub const BARK_PERIOD: f32 = 1.0;

/// Component type ids the shooter looks up once at load.
#[derive(Debug, Clone, Copy)]
pub struct ShooterTypes {
    pub pos2: ComponentId,
    pub player: ComponentId,
    pub move_up: ComponentId,
    pub time_out: ComponentId,
}

#[derive(Debug)]
pub struct ShooterState {
    pub types: ShooterTypes,
    pub bark: IntervalTimer,
    pub barks: u32,
    pub shots_fired: u32,
}

/// Register the shooter's component types and systems.
pub fn load_shooter(
    world: &mut World,
    systems: &mut Systems<ScriptEnv<ShooterState>>,
) -> Result<ShooterState, HostError> {
    tracing::info!(target: "script", "Hello world");

    let registry = &mut world.registry;
    let types = ShooterTypes {
        pos2: registry.position2_id(),
        player: registry.register("Player", ComponentInit::Empty)?,
        move_up: registry.register(
            "MoveUp",
            ComponentInit::native(|args| {
                let mut speed = args.number("speed");
                if speed == 0.0 {
                    speed = SHOT_SPEED;
                }
                Fields::new().with("speed", speed)
            }),
        )?,
        time_out: registry.register(
            "TimeOut",
            ComponentInit::native(|args| Fields::new().with("time", args.number("time"))),
        )?,
    };

    systems.add_update("bark", bark)?;
    systems.add_update("move player", move_player)?;
    systems.add_update("move up", move_up)?;
    systems.add_update("time out", time_out)?;
    systems.on_init("player ready", &[types.pos2, types.player], player_ready)?;

    Ok(ShooterState {
        types,
        bark: IntervalTimer::new(BARK_PERIOD),
        barks: 0,
        shots_fired: 0,
    })
}

fn bark(env: &mut ScriptEnv<ShooterState>, dt: f32) -> Result<(), SystemError> {
    for _ in 0..env.state.bark.tick(dt) {
        env.state.barks += 1;
        tracing::info!(target: "script", "Bark!");
    }
    Ok(())
}

fn move_player(env: &mut ScriptEnv<ShooterState>, dt: f32) -> Result<(), SystemError> {
    let types = env.state.types;
    let input = &env.world.input;
    let vertical = input.state("up").state - input.state("down").state;
    let horizontal = input.state("right").state - input.state("left").state;
    let fire = input.state("fire").just_pressed();

    for entity in env.world.registry.entities(&[types.pos2, types.player]) {
        let Some(pos) = env.world.registry.position2_mut(entity) else {
            continue;
        };
        pos.x += dt * PLAYER_SPEED * horizontal;
        pos.y += dt * PLAYER_SPEED * vertical;
        let origin = *pos;

        if fire {
            match env.world.create_from_template("shot") {
                Ok(shot) => {
                    env.world.registry.set_position2(shot, origin)?;
                    env.state.shots_fired += 1;
                }
                Err(TemplateError::Unknown { .. }) => tracing::info!(target: "script", "no shot"),
                Err(TemplateError::Registry(err)) => return Err(err.into()),
            }
        }
    }
    Ok(())
}

fn move_up(env: &mut ScriptEnv<ShooterState>, dt: f32) -> Result<(), SystemError> {
    let types = env.state.types;
    let registry = &mut env.world.registry;
    for entity in registry.entities(&[types.pos2, types.move_up]) {
        let speed = registry
            .fields(entity, types.move_up)
            .and_then(|f| f.number("speed"))
            .unwrap_or(0.0);
        if let Some(pos) = registry.position2_mut(entity) {
            pos.y += dt * speed as f32;
        }
    }
    Ok(())
}

fn time_out(env: &mut ScriptEnv<ShooterState>, dt: f32) -> Result<(), SystemError> {
    let types = env.state.types;
    let registry = &mut env.world.registry;
    for entity in registry.entities(&[types.time_out]) {
        let fields = registry.fields_or_insert(entity, types.time_out)?;
        let left = fields.number("time").unwrap_or(0.0) - dt as f64;
        fields.set("time", left);
        if left <= 0.0 {
            registry.destroy(entity);
        }
    }
    Ok(())
}

fn player_ready(
    env: &mut ScriptEnv<ShooterState>,
    entity: kindle_core::ecs::Entity,
) -> Result<(), SystemError> {
    if let Some(pos) = env.world.registry.position2(entity) {
        tracing::info!(target: "script", %entity, x = pos.x, y = pos.y, "player ready");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{NativeHost, Simulation};
    use kindle_asset::{GameData, WorldData};
    use kindle_core::glam::Vec2;
    use kindle_core::math::approx_eq;
    use kindle_services::Key;

    const GAME: &str = include_str!("../../../demos/shooter/game.json");
    const WORLD: &str = include_str!("../../../demos/shooter/world.json");

    fn shooter() -> NativeHost<ShooterState> {
        let game = GameData::from_json(GAME).unwrap();
        let world = WorldData::from_json(WORLD).unwrap();
        NativeHost::load(&game, &world, load_shooter).unwrap()
    }

    fn player_pos(host: &NativeHost<ShooterState>) -> Vec2 {
        let types = host.state().types;
        let registry = &host.world().registry;
        let players = registry.entities(&[types.pos2, types.player]);
        *registry.position2(players[0]).unwrap()
    }

    #[test]
    fn bark_fires_once_per_second() {
        let mut host = shooter();
        host.frame(0.6).unwrap();
        assert_eq!(host.state().barks, 0);
        host.frame(0.6).unwrap();
        assert_eq!(host.state().barks, 1);
        assert!((host.state().bark.remainder() - 0.2).abs() < 1e-5);
    }

    #[test]
    fn player_moves_with_input() {
        let mut host = shooter();
        let start = player_pos(&host);

        host.with_world(|world| world.input.set_key_state(Key::Right, 1.0));
        host.frame(0.5).unwrap();
        host.frame(0.5).unwrap();
        assert!(approx_eq(player_pos(&host), start + Vec2::new(150.0, 0.0), 1e-3));

        host.with_world(|world| {
            world.input.set_key_state(Key::Right, 0.0);
            world.input.set_key_state(Key::Up, 1.0);
        });
        host.frame(0.1).unwrap();
        assert!(approx_eq(player_pos(&host), start + Vec2::new(150.0, 15.0), 1e-3));
    }

    #[test]
    fn fire_spawns_shot_that_flies_and_times_out() {
        let mut host = shooter();
        let start = player_pos(&host);
        let types = host.state().types;

        host.with_world(|world| world.input.set_key_state(Key::Space, 1.0));
        host.frame(0.1).unwrap();
        // Holding fire does not fire again.
        host.frame(0.1).unwrap();
        assert_eq!(host.state().shots_fired, 1);

        let registry = &host.world().registry;
        let shots = registry.entities(&[types.pos2, types.move_up]);
        assert_eq!(shots.len(), 1);
        let pos = *registry.position2(shots[0]).unwrap();
        assert!(approx_eq(pos, start + Vec2::new(0.0, 50.0), 1e-3));
        let time = registry.fields(shots[0], types.time_out).unwrap().number("time").unwrap();
        assert!((time - 2.8).abs() < 1e-5);

        for _ in 0..30 {
            host.frame(0.1).unwrap();
        }
        assert!(host.world().registry.entities(&[types.time_out]).is_empty());
        assert!(host.crashed().is_none());
    }

    #[test]
    fn missing_shot_template_is_not_fatal() {
        let mut game = GameData::from_json(GAME).unwrap();
        game.templates.retain(|t| t.name != "shot");
        let world = WorldData::from_json(WORLD).unwrap();
        let mut host = NativeHost::load(&game, &world, load_shooter).unwrap();

        host.with_world(|world| world.input.set_key_state(Key::Space, 1.0));
        host.frame(0.1).unwrap();
        assert_eq!(host.state().shots_fired, 0);
        assert!(host.crashed().is_none());
    }
}
