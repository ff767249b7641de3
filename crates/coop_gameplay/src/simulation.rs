//! Headless симуляция: детерминированный RNG, боты и stand-in host.
//!
//! Без движка некому делать raycast'ы и симулировать гранаты. Stand-in host
//! отвечает на `ShotFired`/`ExplosionRequested` случайными (но seeded)
//! попаданиями, поэтому полный цикл "input → выстрел → урон → смерть"
//! прогоняется и в тестах, и в headless бинарнике.

use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::attributes::{Attributes, Dead, ExplosiveHazard};
use crate::config::GameplayConfig;
use crate::hud::WeaponStatusView;
use crate::loadout::{InputAction, Loadout, SpawnLoadoutIntent, WeaponInput, LOADOUT_SLOTS};
use crate::weapon::{
    ExplosionHits, ExplosionRequested, RaycastHit, ShotFired, ShotPayload, SurfaceType, WeaponAction,
};
use crate::{init_logger, GameplayPlugin, GameplaySet, GameplayTick};

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции (gameplay + боты + stand-in host)
///
/// Время не зависит от wall clock: каждый `app.update()` = ровно один fixed tick
/// (первый update только инициализирует часы).
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins((MinimalPlugins, GameplayPlugin));

    let tick = Duration::from_secs_f64(1.0 / app.world().resource::<GameplayConfig>().tick_rate_hz);
    app.insert_resource(TimeUpdateStrategy::ManualDuration(tick))
        .insert_resource(DeterministicRng::new(seed))
        .add_systems(
            GameplayTick,
            (drive_bots, simulate_host)
                .chain()
                .in_set(GameplaySet::Drive),
        );

    app
}

/// Snapshot мира для сравнения детерминизма
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    let mut snapshot = Vec::new();

    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    // Сортируем по Entity ID для детерминизма
    entities.sort_by_key(|(entity, _)| entity.index());

    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}

/// Спавнит персонажа с default loadout'ом и HUD view
pub fn spawn_player(world: &mut World, name: &str) -> (Entity, Entity) {
    let character = world
        .spawn((Name::new(name.to_string()), Attributes::default(), Loadout::new()))
        .id();
    let hud = world.spawn(WeaponStatusView::new(character)).id();

    world.send_event(SpawnLoadoutIntent {
        character,
        weapons: Vec::new(),
    });

    (character, hud)
}

/// Бочка в точке `position`
pub fn spawn_barrel(world: &mut World, position: Vec3) -> Entity {
    world
        .spawn((
            Name::new("Boom Barrel"),
            Attributes::new(20.0, 0.0),
            ExplosiveHazard::default(),
            Transform::from_translation(position),
        ))
        .id()
}

// ============================================================================
// Bots
// ============================================================================

/// Бот: каждый tick случайно жмёт кнопки своего персонажа
#[derive(Component, Debug, Clone, PartialEq)]
pub struct Bot {
    /// Вероятность нажать/отпустить огонь за tick
    pub trigger_chance: f32,
    pub reload_chance: f32,
    pub switch_chance: f32,
    pub aim_chance: f32,
    firing: bool,
    aiming: bool,
}

impl Default for Bot {
    fn default() -> Self {
        Self {
            trigger_chance: 0.05,
            reload_chance: 0.01,
            switch_chance: 0.005,
            aim_chance: 0.01,
            firing: false,
            aiming: false,
        }
    }
}

impl Bot {
    fn next_actions(&mut self, rng: &mut ChaCha8Rng) -> Vec<InputAction> {
        let mut actions = Vec::new();

        if rng.gen::<f32>() < self.trigger_chance {
            self.firing = !self.firing;
            actions.push(
                if self.firing {
                    WeaponAction::PrimaryPressed
                } else {
                    WeaponAction::PrimaryReleased
                }
                .into(),
            );
        }

        if rng.gen::<f32>() < self.aim_chance {
            self.aiming = !self.aiming;
            actions.push(
                if self.aiming {
                    WeaponAction::SecondaryPressed
                } else {
                    WeaponAction::SecondaryReleased
                }
                .into(),
            );
        }

        if rng.gen::<f32>() < self.reload_chance {
            actions.push(WeaponAction::ReloadPressed.into());
        }

        if rng.gen::<f32>() < self.switch_chance {
            let slot = rng.gen_range(1..=LOADOUT_SLOTS as u8);
            // Switch отпускает кнопки (CancelOngoingActions)
            self.firing = false;
            self.aiming = false;
            actions.push(InputAction::SwitchSlot(slot));
        }

        actions
    }
}

/// Система: боты → WeaponInput (в порядке Entity index)
pub fn drive_bots(
    mut rng: ResMut<DeterministicRng>,
    mut bots: Query<(Entity, &mut Bot), Without<Dead>>,
    mut inputs: EventWriter<WeaponInput>,
) {
    let mut ordered: Vec<_> = bots.iter_mut().collect();
    ordered.sort_by_key(|(entity, _)| entity.index());

    for (character, mut bot) in ordered {
        for action in bot.next_actions(&mut rng.rng) {
            inputs.write(WeaponInput { character, action });
        }
    }
}

// ============================================================================
// Stand-in host
// ============================================================================

fn random_surface(rng: &mut ChaCha8Rng) -> SurfaceType {
    match rng.gen_range(0..10) {
        0 => SurfaceType::Vulnerable,
        1..=6 => SurfaceType::Flesh,
        _ => SurfaceType::Other,
    }
}

/// Система: "физика" хоста. ShotFired / ExplosionRequested → результаты.
pub fn simulate_host(
    mut rng: ResMut<DeterministicRng>,
    mut shots: EventReader<ShotFired>,
    mut requests: EventReader<ExplosionRequested>,
    targets: Query<(Entity, Option<&Transform>), (With<Attributes>, Without<Dead>)>,
    transforms: Query<&Transform>,
    mut raycasts: EventWriter<RaycastHit>,
    mut explosions: EventWriter<ExplosionHits>,
) {
    let mut candidates: Vec<(Entity, Vec3)> = targets
        .iter()
        .map(|(entity, transform)| (entity, transform.map_or(Vec3::ZERO, |t| t.translation)))
        .collect();
    candidates.sort_by_key(|(entity, _)| entity.index());

    for shot in shots.read() {
        let others: Vec<(Entity, Vec3)> = candidates
            .iter()
            .copied()
            .filter(|(entity, _)| *entity != shot.shooter)
            .collect();

        match shot.payload {
            ShotPayload::Raycast { damage, range } => {
                let hit = others.choose(&mut rng.rng).copied().filter(|_| rng.rng.gen_bool(0.6));
                let (target, surface, impact_point) = match hit {
                    Some((entity, position)) => (Some(entity), random_surface(&mut rng.rng), position),
                    None => (None, SurfaceType::Other, Vec3::NEG_Z * range),
                };

                raycasts.write(RaycastHit {
                    shooter: shot.shooter,
                    weapon: shot.weapon,
                    target,
                    surface,
                    impact_point,
                    base_damage: damage,
                });
            }
            ShotPayload::Projectile(projectile) => {
                let victims: Vec<Entity> = others
                    .iter()
                    .filter(|_| rng.rng.gen_bool(0.3))
                    .map(|(entity, _)| *entity)
                    .collect();

                explosions.write(ExplosionHits {
                    source: shot.weapon,
                    instigator: Some(shot.shooter),
                    center: Vec3::NEG_Z * projectile.speed * projectile.fuse_time,
                    radius: projectile.explosion_radius,
                    base_damage: projectile.damage,
                    victims,
                });
            }
        }
    }

    for request in requests.read() {
        // Источник (бочка) уже помечен Dead, позицию берём напрямую
        let center = transforms
            .get(request.source)
            .map_or(Vec3::ZERO, |t| t.translation);

        let victims: Vec<Entity> = candidates
            .iter()
            .filter(|(entity, position)| {
                *entity != request.source && position.distance(center) <= request.radius
            })
            .map(|(entity, _)| *entity)
            .collect();

        explosions.write(ExplosionHits {
            source: request.source,
            instigator: request.instigator,
            center,
            radius: request.radius,
            base_damage: request.base_damage,
            victims,
        });
    }
}
