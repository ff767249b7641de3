//! Headless симуляция CoopGame
//!
//! Два бота с default loadout'ом и бочка: прогоняет полный цикл
//! input → выстрел → reload → урон без рендера.

use bevy::math::Vec3;
use coop_gameplay::simulation::{spawn_barrel, spawn_player};
use coop_gameplay::{create_headless_app, Attributes, Bot, Loadout};

fn main() {
    let seed = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(42);
    println!("Starting CoopGame headless simulation (seed: {})", seed);

    let mut app = create_headless_app(seed);

    let world = app.world_mut();
    let (alpha, _) = spawn_player(world, "Alpha");
    let (bravo, _) = spawn_player(world, "Bravo");
    world.entity_mut(alpha).insert(Bot::default());
    world.entity_mut(bravo).insert(Bot::default());
    spawn_barrel(world, Vec3::new(0.0, 0.0, -300.0));

    // Запускаем 1000 тиков симуляции
    for tick in 0..1000 {
        app.update();

        if tick % 100 == 0 {
            let world = app.world_mut();
            let mut characters = world.query::<(&Attributes, &Loadout)>();
            for (index, (attributes, loadout)) in characters.iter(world).enumerate() {
                println!(
                    "Tick {}: player {} hp {:.0}/{:.0}, slot {}",
                    tick, index, attributes.current_hp, attributes.max_hp, loadout.current_slot()
                );
            }
        }
    }

    println!("Simulation complete!");
}
