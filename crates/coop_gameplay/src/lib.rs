//! CoopGame gameplay core
//!
//! ECS-правила кооперативного шутера на Bevy 0.16 (strategic layer):
//! оружие, патроны/перезарядка, loadout, здоровье, HUD observers.
//!
//! HYBRID ARCHITECTURE:
//! - ECS = правила (можно ли стрелять, сколько патронов, кто умер)
//! - Host = физика, raycast, снаряды, рендер (общается событиями)
//!
//! # Tick
//!
//! ```text
//! FixedUpdate (60Hz) → run_gameplay_tick
//!   → TimerManager::queue_advance(dt)
//!   → GameplayTick: Drive → Input → Timers → Host → Damage → Reactions → Hud
//! ```

use bevy::ecs::schedule::ScheduleLabel;
use bevy::prelude::*;

pub mod ammo;
pub mod attributes;
pub mod config;
pub mod hud;
pub mod loadout;
pub mod logger;
pub mod simulation;
pub mod timers;
pub mod weapon;

pub use ammo::{
    AmmoNotification, AmmoState, AmmoSystem, MagazineReload, PassiveReload, PerBulletReload,
    ReloadCancelTrigger, ReloadKind, ReloadOutcome, ReloadPhase, ReloadStrategy, WeaponNotification,
};
pub use attributes::{
    Attributes, AttributesInitialized, DamageType, Dead, EntityDied, ExplosiveHazard, HealthChanged,
    PointDamage, RadialDamage,
};
pub use config::{ConfigError, GameplayConfig, WeaponDefinition, WeaponDefinitions};
pub use hud::{ObserverNotification, ReloadIndicator, WeaponObservers, WeaponStatusView};
pub use loadout::{
    InputAction, Loadout, LoadoutInfo, LoadoutSlotInfo, LoadoutSpawned, RespawnIntent,
    SpawnLoadoutIntent, WeaponChanged, WeaponInput, LOADOUT_SLOTS,
};
pub use logger::{init_logger, log, log_error, log_info, log_warning, LogLevel};
pub use simulation::{create_headless_app, world_snapshot, Bot, DeterministicRng};
pub use timers::{TimerHandle, TimerManager, TimerService, TimerTask};
pub use weapon::{
    EffectKind, ExplosionHits, ExplosionRequested, FireMode, FiringConfig, FiringController,
    ProjectileSpec, RaycastHit, ShotFired, ShotPayload, SurfaceType, Weapon, WeaponAction,
    WeaponEffect, WeaponKind,
};

/// Schedule одного gameplay tick'а (запускается из FixedUpdate)
#[derive(ScheduleLabel, Debug, Clone, PartialEq, Eq, Hash)]
pub struct GameplayTick;

/// Фазы tick'а (выполняются строго по порядку)
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameplaySet {
    /// Источники input'а и результаты хоста (боты, stand-in host)
    Drive,
    Input,
    Timers,
    /// RaycastHit / ExplosionHits → урон
    Host,
    Damage,
    /// Смерть, взрывы бочек, стартовые атрибуты
    Reactions,
    Hud,
}

/// Главный plugin геймплея
pub struct GameplayPlugin;

impl Plugin for GameplayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GameplayConfig>()
            .init_resource::<WeaponDefinitions>()
            .init_resource::<TimerManager>();

        let config = app.world().resource::<GameplayConfig>().clone();
        config.apply_logging();
        if let Err(err) = config.validate(app.world().resource::<WeaponDefinitions>()) {
            log_error(&format!("GameplayConfig: {}", err));
        }

        app.insert_resource(Time::<Fixed>::from_hz(config.tick_rate_hz))
            // Weapon
            .add_event::<WeaponNotification>()
            .add_event::<ShotFired>()
            .add_event::<WeaponEffect>()
            .add_event::<RaycastHit>()
            .add_event::<ExplosionRequested>()
            .add_event::<ExplosionHits>()
            // Attributes
            .add_event::<PointDamage>()
            .add_event::<RadialDamage>()
            .add_event::<HealthChanged>()
            .add_event::<EntityDied>()
            .add_event::<AttributesInitialized>()
            // Loadout
            .add_event::<SpawnLoadoutIntent>()
            .add_event::<WeaponInput>()
            .add_event::<WeaponChanged>()
            .add_event::<LoadoutSpawned>()
            .add_event::<RespawnIntent>()
            // HUD
            .add_event::<ObserverNotification>();

        app.init_schedule(GameplayTick)
            .configure_sets(
                GameplayTick,
                (
                    GameplaySet::Drive,
                    GameplaySet::Input,
                    GameplaySet::Timers,
                    GameplaySet::Host,
                    GameplaySet::Damage,
                    GameplaySet::Reactions,
                    GameplaySet::Hud,
                )
                    .chain(),
            )
            .add_systems(
                GameplayTick,
                (
                    (
                        loadout::process_loadout_spawns,
                        loadout::process_respawns,
                        loadout::process_weapon_input,
                    )
                        .chain()
                        .in_set(GameplaySet::Input),
                    (
                        weapon::systems::release_removed_weapon_timers,
                        weapon::systems::dispatch_due_timers,
                    )
                        .chain()
                        .in_set(GameplaySet::Timers),
                    (
                        weapon::systems::resolve_raycast_hits,
                        weapon::systems::resolve_explosion_hits,
                    )
                        .chain()
                        .in_set(GameplaySet::Host),
                    attributes::apply_damage_events.in_set(GameplaySet::Damage),
                    (
                        attributes::broadcast_initial_attributes,
                        loadout::interrupt_weapons_on_death,
                        attributes::detonate_explosive_hazards,
                    )
                        .chain()
                        .in_set(GameplaySet::Reactions),
                    (
                        hud::rebind_status_views,
                        hud::route_weapon_notifications,
                        hud::update_status_views,
                        hud::track_view_health,
                    )
                        .chain()
                        .in_set(GameplaySet::Hud),
                ),
            )
            .add_systems(FixedUpdate, run_gameplay_tick);
    }
}

/// Exclusive система FixedUpdate: открывает окно таймеров и гоняет GameplayTick
pub fn run_gameplay_tick(world: &mut World) {
    let dt = world.resource::<Time<Fixed>>().delta_secs();
    advance_gameplay(world, dt);
}

/// Один gameplay tick на `dt` секунд (тесты зовут напрямую, без FixedUpdate)
pub fn advance_gameplay(world: &mut World, dt: f32) {
    world.resource_mut::<TimerManager>().queue_advance(dt);
    world.run_schedule(GameplayTick);
}
