//! Weapon flow integration test
//!
//! Полный цикл через GameplayPlugin: loadout spawn → input → выстрел →
//! ответ хоста → урон → HUD. Хост здесь играет сам тест (пишет RaycastHit /
//! ExplosionHits руками), поэтому результат точный.

use bevy::prelude::*;
use coop_gameplay::simulation::{spawn_barrel, spawn_player};
use coop_gameplay::*;

const DT: f32 = 1.0 / 60.0;

/// Helper: GameplayPlugin без бот/хост систем, время двигаем руками
fn create_gameplay_app() -> App {
    let mut app = App::new();
    app.add_plugins(GameplayPlugin);
    app
}

fn tick(app: &mut App) {
    advance_gameplay(app.world_mut(), DT);
}

fn collect<E: Event + Clone>(app: &App) -> Vec<E> {
    let events = app.world().resource::<Events<E>>();
    let mut cursor = events.get_cursor();
    cursor.read(events).cloned().collect()
}

fn current_weapon(app: &App, character: Entity) -> Entity {
    app.world()
        .get::<Loadout>(character)
        .and_then(Loadout::current)
        .expect("character has an active weapon")
}

fn view(app: &App, hud: Entity) -> &WeaponStatusView {
    app.world().get::<WeaponStatusView>(hud).expect("hud view")
}

fn press(app: &mut App, character: Entity, action: impl Into<InputAction>) {
    app.world_mut().send_event(WeaponInput::new(character, action));
}

#[test]
fn test_spawn_binds_hud_to_first_weapon() {
    let mut app = create_gameplay_app();
    let (player, hud) = spawn_player(app.world_mut(), "Alpha");
    tick(&mut app);

    let rifle = current_weapon(&app, player);
    let view = view(&app, hud);

    assert_eq!(view.weapon, Some(rifle));
    assert_eq!(view.slot, 1);
    assert_eq!(view.bullets, 30);
    assert_eq!(view.max_hp, 100.0);
    assert_eq!(view.current_hp, 100.0);

    let info = view.loadout.as_ref().expect("loadout info delivered");
    assert_eq!(info.slots[0].short_name, "Rifle");
    assert!(info.slots.iter().all(|slot| slot.equipped));

    let observers = app.world().get::<WeaponObservers>(rifle).unwrap();
    assert!(observers.contains(hud));
}

#[test]
fn test_shot_hit_damages_target_and_updates_huds() {
    let mut app = create_gameplay_app();
    let (shooter, shooter_hud) = spawn_player(app.world_mut(), "Shooter");
    let (target, target_hud) = spawn_player(app.world_mut(), "Target");
    tick(&mut app);

    press(&mut app, shooter, WeaponAction::PrimaryPressed);
    tick(&mut app);
    press(&mut app, shooter, WeaponAction::PrimaryReleased);
    tick(&mut app);

    let shots = collect::<ShotFired>(&app);
    assert_eq!(shots.len(), 1, "one tick of automatic fire = one shot");
    let shot = &shots[0];
    assert_eq!(shot.shooter, shooter);
    assert_eq!(shot.weapon, current_weapon(&app, shooter));
    assert_eq!(view(&app, shooter_hud).bullets, 29);

    // Хост: trace попал в уязвимое место
    let ShotPayload::Raycast { damage, .. } = shot.payload else {
        panic!("rifle fires raycasts");
    };
    app.world_mut().send_event(RaycastHit {
        shooter,
        weapon: shot.weapon,
        target: Some(target),
        surface: SurfaceType::Vulnerable,
        impact_point: Vec3::ZERO,
        base_damage: damage,
    });
    tick(&mut app);

    let expected_hp = 100.0 - damage * 2.0;
    let attributes = app.world().get::<Attributes>(target).unwrap();
    assert_eq!(attributes.current_hp, expected_hp);
    assert_eq!(view(&app, target_hud).current_hp, expected_hp);

    let changed = collect::<HealthChanged>(&app);
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].instigator, Some(shooter));
    assert_eq!(changed[0].causer, shot.weapon);
    assert_eq!(changed[0].damage_type, DamageType::Bullet);
    assert_eq!(changed[0].delta, expected_hp - damage * 2.0);

    let effects = collect::<WeaponEffect>(&app);
    assert!(effects
        .iter()
        .any(|e| matches!(e.kind, EffectKind::Impact { surface: SurfaceType::Vulnerable, .. })));
}

#[test]
fn test_switch_rebinds_hud_and_drops_stale_notifications() {
    let mut app = create_gameplay_app();
    let (player, hud) = spawn_player(app.world_mut(), "Alpha");
    tick(&mut app);
    let rifle = current_weapon(&app, player);

    press(&mut app, player, WeaponAction::ReloadPressed);
    tick(&mut app);
    assert_eq!(view(&app, hud).reload, ReloadIndicator::Starting { delay: 1.5 });

    press(&mut app, player, InputAction::SwitchSlot(2));
    tick(&mut app);

    let shotgun = current_weapon(&app, player);
    assert_ne!(rifle, shotgun);

    let view = view(&app, hud);
    assert_eq!(view.weapon, Some(shotgun));
    assert_eq!(view.slot, 2);
    assert_eq!(view.bullets, 6);
    assert_eq!(view.reload, ReloadIndicator::Idle);

    assert!(!app.world().get::<WeaponObservers>(rifle).unwrap().contains(hud));
    assert!(app.world().get::<WeaponObservers>(shotgun).unwrap().contains(hud));

    // Cancel старого reload'а никому не доставлен
    let routed = collect::<ObserverNotification>(&app);
    assert!(!routed
        .iter()
        .any(|n| n.weapon == rifle && n.notification.is_reload_completed()));
}

#[test]
fn test_despawned_weapon_releases_its_timers() {
    let mut app = create_gameplay_app();
    let (player, _) = spawn_player(app.world_mut(), "Alpha");
    tick(&mut app);
    let rifle = current_weapon(&app, player);

    press(&mut app, player, WeaponAction::ReloadPressed);
    tick(&mut app);
    assert_eq!(app.world().resource::<TimerManager>().active_count_for(rifle), 1);

    app.world_mut().despawn(rifle);
    tick(&mut app);

    assert_eq!(app.world().resource::<TimerManager>().active_count_for(rifle), 0);
}

#[test]
fn test_death_interrupts_reload_and_blocks_input() {
    let mut app = create_gameplay_app();
    let (player, hud) = spawn_player(app.world_mut(), "Alpha");
    tick(&mut app);
    let rifle = current_weapon(&app, player);

    press(&mut app, player, WeaponAction::ReloadPressed);
    tick(&mut app);

    app.world_mut().send_event(PointDamage {
        target: player,
        amount: 500.0,
        damage_type: DamageType::Generic,
        instigator: None,
        causer: Entity::PLACEHOLDER,
    });
    tick(&mut app);

    assert!(app.world().get::<Dead>(player).is_some());
    assert!(!app.world().get::<AmmoSystem>(rifle).unwrap().is_reloading());
    assert_eq!(view(&app, hud).reload, ReloadIndicator::Idle);
    assert_eq!(view(&app, hud).current_hp, 0.0);
    assert_eq!(collect::<EntityDied>(&app).len(), 1);

    press(&mut app, player, WeaponAction::PrimaryPressed);
    tick(&mut app);
    assert!(collect::<ShotFired>(&app).is_empty());
}

#[test]
fn test_barrel_explosion_hurts_nearby_player() {
    let mut app = create_gameplay_app();
    let (player, _) = spawn_player(app.world_mut(), "Alpha");
    let barrel = spawn_barrel(app.world_mut(), Vec3::new(100.0, 0.0, 0.0));
    tick(&mut app);

    app.world_mut().send_event(PointDamage {
        target: barrel,
        amount: 25.0,
        damage_type: DamageType::Bullet,
        instigator: Some(player),
        causer: Entity::PLACEHOLDER,
    });
    tick(&mut app);

    let requests = collect::<ExplosionRequested>(&app);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].source, barrel);
    assert_eq!(requests[0].instigator, Some(player));

    // Хост: игрок внутри радиуса
    app.world_mut().send_event(ExplosionHits {
        source: barrel,
        instigator: requests[0].instigator,
        center: Vec3::new(100.0, 0.0, 0.0),
        radius: requests[0].radius,
        base_damage: requests[0].base_damage,
        victims: vec![player],
    });
    tick(&mut app);

    let changed: Vec<_> = collect::<HealthChanged>(&app)
        .into_iter()
        .filter(|c| c.entity == player)
        .collect();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].damage_type, DamageType::Explosion);
    assert_eq!(changed[0].causer, barrel);

    // Эффект взрыва бочки ровно один (от детонации)
    let explosions = collect::<WeaponEffect>(&app)
        .into_iter()
        .filter(|e| e.source == barrel && matches!(e.kind, EffectKind::Explosion { .. }))
        .count();
    assert_eq!(explosions, 1);
}

/// Test: боты + stand-in host, HUD всегда зеркалит текущее оружие
#[test]
fn test_bots_run_1000_ticks_with_consistent_huds() {
    let mut app = create_headless_app(42);

    let world = app.world_mut();
    let (alpha, alpha_hud) = spawn_player(world, "Alpha");
    let (bravo, bravo_hud) = spawn_player(world, "Bravo");
    world.entity_mut(alpha).insert(Bot::default());
    world.entity_mut(bravo).insert(Bot::default());
    spawn_barrel(world, Vec3::new(0.0, 0.0, -300.0));

    for tick in 0..1000 {
        app.update();

        if tick % 50 != 0 {
            continue;
        }

        for (character, hud) in [(alpha, alpha_hud), (bravo, bravo_hud)] {
            let world = app.world();
            let Some(current) = world.get::<Loadout>(character).and_then(Loadout::current) else {
                continue;
            };
            let ammo = world.get::<AmmoSystem>(current).unwrap();
            let view = world.get::<WeaponStatusView>(hud).unwrap();
            let attributes = world.get::<Attributes>(character).unwrap();

            assert_eq!(view.weapon, Some(current), "tick {}: HUD bound to wrong weapon", tick);
            assert_eq!(view.bullets, ammo.bullets_active(), "tick {}: HUD bullets out of sync", tick);
            assert!(ammo.bullets_active() <= ammo.maximum_bullets());
            assert!(attributes.current_hp >= 0.0 && attributes.current_hp <= attributes.max_hp);
        }
    }
}
