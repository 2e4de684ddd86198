//! The shooter demo, run as JavaScript and as native Rust on the same input.

use kindle_asset::{GameData, WorldData};
use kindle_core::glam::Vec2;
use kindle_core::math::approx_eq;
use kindle_script::demo::{load_shooter, ShooterState};
use kindle_script::{JsHost, NativeHost, Simulation};
use kindle_services::InputRecording;
use std::path::PathBuf;

const DT: f32 = 1.0 / 60.0;

fn demo_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos/shooter")
}

fn load_data() -> (GameData, WorldData) {
    let dir = demo_dir();
    (
        GameData::load(&dir.join("game.json")).unwrap(),
        WorldData::load(&dir.join("world.json")).unwrap(),
    )
}

fn run<H: Simulation>(host: &mut H, recording: &InputRecording, frames: u64) {
    for frame in 0..frames {
        host.with_world(|world| recording.apply(frame, &mut world.input));
        host.frame(DT).unwrap();
    }
}

/// Player position and live shot count.
fn snapshot<H: Simulation>(host: &mut H) -> (Vec2, usize) {
    host.with_world(|world| {
        let registry = &world.registry;
        let pos2 = registry.position2_id();
        let player = registry.component_id("Player").unwrap();
        let move_up = registry.component_id("MoveUp").unwrap();
        let players = registry.entities(&[pos2, player]);
        assert_eq!(players.len(), 1);
        (
            *registry.position2(players[0]).unwrap(),
            registry.entities(&[pos2, move_up]).len(),
        )
    })
}

#[test]
fn js_script_loads_and_spawns_player() {
    let (game, world) = load_data();
    let mut host = JsHost::load_file(&game, &world, &demo_dir().join("main.js")).unwrap();
    assert_eq!(
        host.systems().update_names().collect::<Vec<_>>(),
        vec!["bark", "move player", "move up", "time out"]
    );
    let (player, shots) = snapshot(&mut host);
    assert_eq!(player, Vec2::new(0.0, -100.0));
    assert_eq!(shots, 0);
}

#[test]
fn js_and_native_agree_on_replay() {
    let (game, world) = load_data();
    let recording = InputRecording::load(&demo_dir().join("replay.json")).unwrap();

    let mut js = JsHost::load_file(&game, &world, &demo_dir().join("main.js")).unwrap();
    let mut native: NativeHost<ShooterState> =
        NativeHost::load(&game, &world, load_shooter).unwrap();

    // Both shots are still in flight at frame 100.
    run(&mut js, &recording, 100);
    run(&mut native, &recording, 100);

    let (js_player, js_shots) = snapshot(&mut js);
    let (native_player, native_shots) = snapshot(&mut native);
    assert!(
        approx_eq(js_player, native_player, 1e-2),
        "{js_player} != {native_player}"
    );
    assert_eq!(js_shots, 2);
    assert_eq!(native_shots, 2);
    assert_eq!(native.state().shots_fired, 2);
    assert!(js.crashed().is_none());

    // Right for 30 frames, then up for 15.
    assert!(approx_eq(native_player, Vec2::new(75.0, -62.5), 1e-2));

    // Three seconds later every shot has timed out.
    run(&mut js, &InputRecording::new(), 200);
    run(&mut native, &InputRecording::new(), 200);
    assert_eq!(snapshot(&mut js).1, 0);
    assert_eq!(snapshot(&mut native).1, 0);
}

#[test]
fn js_bark_counter_matches_interval_timer() {
    let (game, world) = load_data();
    let mut js = JsHost::load_file(&game, &world, &demo_dir().join("main.js")).unwrap();
    let mut native: NativeHost<ShooterState> =
        NativeHost::load(&game, &world, load_shooter).unwrap();

    for dt in [0.6, 0.6, 0.5, 0.5] {
        js.frame(dt).unwrap();
        native.frame(dt).unwrap();
    }
    assert_eq!(native.state().barks, 2);
    js.eval("if (bark !== 2) { throw new Error('bark is ' + bark); }")
        .unwrap();
}
