//! Tests for loadout slots, spawn, switching and respawn.

#[cfg(test)]
mod tests {
    use bevy::prelude::*;

    use super::super::*;
    use crate::ammo::{AmmoNotification, AmmoSystem, ReloadCancelTrigger, ReloadOutcome, WeaponNotification};
    use crate::attributes::{Attributes, DamageType, Dead, HealthChanged, PointDamage};
    use crate::config::WeaponDefinitions;
use crate::hud::WeaponStatusView;
    use crate::weapon::{FiringController, Weapon, WeaponAction};
    use crate::{advance_gameplay, GameplayPlugin};

    const DT: f32 = 1.0 / 60.0;

    fn gameplay_app() -> App {
        let mut app = App::new();
        app.add_plugins(GameplayPlugin);
        app
    }

    fn collect<E: Event + Clone>(app: &App) -> Vec<E> {
        let events = app.world().resource::<Events<E>>();
        let mut cursor = events.get_cursor();
        cursor.read(events).cloned().collect()
    }

    fn tick(app: &mut App) {
        advance_gameplay(app.world_mut(), DT);
    }

    fn advance(app: &mut App, seconds: f32) {
        advance_gameplay(app.world_mut(), seconds);
    }

    fn spawn_character(app: &mut App, weapons: &[&str]) -> Entity {
        let world = app.world_mut();
        let character = world
            .spawn((Name::new("Tester"), Attributes::default(), Loadout::new()))
            .id();
        world.send_event(SpawnLoadoutIntent {
            character,
            weapons: weapons.iter().map(|id| id.to_string()).collect(),
        });
        tick(app);
        character
    }

    fn loadout(app: &App, character: Entity) -> Loadout {
        app.world()
            .get::<Loadout>(character)
            .cloned()
            .expect("character has Loadout")
    }

    fn weapon(app: &App, entity: Entity) -> &Weapon {
        app.world().get::<Weapon>(entity).expect("weapon entity")
    }

    fn ammo(app: &App, entity: Entity) -> &AmmoSystem {
        app.world().get::<AmmoSystem>(entity).expect("weapon has ammo")
    }

    fn input(app: &mut App, character: Entity, action: impl Into<InputAction>) {
        app.world_mut().send_event(WeaponInput::new(character, action));
    }

    fn slot(weapon: u32, id: &str) -> LoadoutSlot {
        LoadoutSlot {
            weapon: Entity::from_raw(weapon),
            definition_id: id.to_string(),
            short_name: id.to_uppercase(),
        }
    }

    // ========================================================================
    // Loadout component
    // ========================================================================

    #[test]
    fn test_slots_are_numbered_from_one() {
        let mut loadout = Loadout::new();

        assert_eq!(loadout.add_weapon(slot(10, "a")), Some(1));
        assert_eq!(loadout.add_weapon(slot(11, "b")), Some(2));
        assert_eq!(loadout.add_weapon(slot(12, "c")), Some(3));
        assert_eq!(loadout.add_weapon(slot(13, "d")), None);
        assert!(loadout.is_full());

        assert_eq!(loadout.weapon_in_slot(1), Some(Entity::from_raw(10)));
        assert_eq!(loadout.weapon_in_slot(3), Some(Entity::from_raw(12)));
        assert!(loadout.slot(0).is_none());
        assert!(loadout.slot(4).is_none());
        assert_eq!(loadout.current_slot(), 0);
    }

    #[test]
    fn test_info_marks_empty_slots_generic() {
        let mut loadout = Loadout::new();
        loadout.add_weapon(slot(10, "rifle"));

        let info = loadout.info();

        assert!(info.slots[0].equipped);
        assert_eq!(info.slots[0].short_name, "RIFLE");
        assert!(!info.slots[1].equipped);
        assert_eq!(info.slots[2].short_name, "Generic");
        assert_eq!(
            info.slots.iter().map(|s| s.slot).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(loadout.contains_definition("rifle"));
        assert!(!loadout.contains_definition("shotgun"));
    }

    // ========================================================================
    // Spawn
    // ========================================================================

    #[test]
    fn test_default_loadout_activates_first_weapon() {
        let mut app = gameplay_app();
        let character = spawn_character(&mut app, &[]);

        let loadout = loadout(&app, character);
        assert!(loadout.is_full());
        assert_eq!(loadout.current_slot(), 1);

        let first = loadout.weapon_in_slot(1).unwrap();
        assert_eq!(loadout.current(), Some(first));
        assert!(weapon(&app, first).is_active() && weapon(&app, first).is_visible());
        for idx in 2..=3 {
            let other = loadout.weapon_in_slot(idx).unwrap();
            assert!(!weapon(&app, other).is_active());
            assert!(!weapon(&app, other).is_visible());
            assert_eq!(weapon(&app, other).owner, Some(character));
        }

        let changed = collect::<WeaponChanged>(&app);
        assert_eq!(
            changed,
            vec![WeaponChanged {
                character,
                previous: None,
                current: first,
                slot: 1,
            }]
        );

        let spawned = collect::<LoadoutSpawned>(&app);
        assert_eq!(spawned.len(), 1);
        let definitions = WeaponDefinitions::default();
        for (descriptor, id) in spawned[0].info.slots.iter().zip(["assault_rifle", "shotgun", "grenade_launcher"]) {
            assert!(descriptor.equipped);
            assert_eq!(descriptor.short_name, definitions.get(id).unwrap().short_name);
        }
    }

    #[test]
    fn test_spawn_replays_status_of_first_weapon() {
        let mut app = gameplay_app();
        let character = spawn_character(&mut app, &["shotgun"]);
        let shotgun = loadout(&app, character).current().unwrap();

        let notifications = collect::<WeaponNotification>(&app);
        assert!(notifications.iter().any(|n| n.weapon == shotgun
            && matches!(n.notification, AmmoNotification::AmmoChanged { bullets: 6, .. })));
    }

    #[test]
    fn test_unknown_and_duplicate_ids_are_rejected() {
        let mut app = gameplay_app();
        let character = spawn_character(
            &mut app,
            &["shotgun", "no_such_gun", "shotgun", "energy_pistol", "burst_carbine", "assault_rifle"],
        );

        let loadout = loadout(&app, character);
        let ids: Vec<_> = (1..=3)
            .map(|idx| loadout.slot(idx).unwrap().definition_id.clone())
            .collect();
        assert_eq!(ids, vec!["shotgun", "energy_pistol", "burst_carbine"]);

        let mut weapons = app.world_mut().query::<&Weapon>();
        assert_eq!(weapons.iter(app.world()).count(), 3);
    }

    #[test]
    fn test_spawn_without_loadout_component_is_skipped() {
        let mut app = gameplay_app();
        let character = app.world_mut().spawn(Attributes::default()).id();
        app.world_mut().send_event(SpawnLoadoutIntent {
            character,
            weapons: Vec::new(),
        });
        tick(&mut app);

        let mut weapons = app.world_mut().query::<&Weapon>();
        assert_eq!(weapons.iter(app.world()).count(), 0);
        assert!(collect::<LoadoutSpawned>(&app).is_empty());
    }

    // ========================================================================
    // Switch
    // ========================================================================

    #[test]
    fn test_switch_slot_swaps_active_weapon() {
        let mut app = gameplay_app();
        let character = spawn_character(&mut app, &[]);
        let rifle = loadout(&app, character).weapon_in_slot(1).unwrap();
        let shotgun = loadout(&app, character).weapon_in_slot(2).unwrap();

        input(&mut app, character, InputAction::SwitchSlot(2));
        tick(&mut app);

        assert_eq!(loadout(&app, character).current(), Some(shotgun));
        assert_eq!(loadout(&app, character).current_slot(), 2);
        assert!(!weapon(&app, rifle).is_active());
        assert!(weapon(&app, shotgun).is_active());

        let changed = collect::<WeaponChanged>(&app);
        assert_eq!(
            changed.last(),
            Some(&WeaponChanged {
                character,
                previous: Some(rifle),
                current: shotgun,
                slot: 2,
            })
        );
    }

    #[test]
    fn test_switch_to_current_or_empty_slot_is_noop() {
        let mut app = gameplay_app();
        let character = spawn_character(&mut app, &["assault_rifle"]);

        input(&mut app, character, InputAction::SwitchSlot(1));
        input(&mut app, character, InputAction::SwitchSlot(3));
        input(&mut app, character, InputAction::SwitchSlot(0));
        tick(&mut app);

        assert_eq!(loadout(&app, character).current_slot(), 1);
        assert_eq!(collect::<WeaponChanged>(&app).len(), 1, "only the spawn event");
    }

    #[test]
    fn test_inputs_apply_in_arrival_order() {
        let mut app = gameplay_app();
        let character = spawn_character(&mut app, &[]);
        let rifle = loadout(&app, character).weapon_in_slot(1).unwrap();
        let shotgun = loadout(&app, character).weapon_in_slot(2).unwrap();

        // Fire на rifle, потом switch: switch отпускает курок rifle
        input(&mut app, character, WeaponAction::PrimaryPressed);
        input(&mut app, character, InputAction::SwitchSlot(2));
        input(&mut app, character, WeaponAction::SecondaryPressed);
        tick(&mut app);

        let rifle_firing = app.world().get::<FiringController>(rifle).unwrap();
        assert!(!rifle_firing.is_firing());
        assert!(!weapon(&app, rifle).is_zoomed());
        assert!(weapon(&app, shotgun).is_zoomed(), "zoom went to the new weapon");
    }

    #[test]
    fn test_switch_cancels_reload_of_previous_weapon() {
        let mut app = gameplay_app();
        let character = spawn_character(&mut app, &[]);
        let rifle = loadout(&app, character).weapon_in_slot(1).unwrap();

        input(&mut app, character, WeaponAction::ReloadPressed);
        tick(&mut app);
        assert!(ammo(&app, rifle).is_reloading());

        input(&mut app, character, InputAction::SwitchSlot(3));
        tick(&mut app);

        assert!(!ammo(&app, rifle).is_reloading());
        assert!(collect::<WeaponNotification>(&app).iter().any(|n| n.weapon == rifle
            && n.notification
                == AmmoNotification::ReloadCompleted {
                    trigger: ReloadCancelTrigger::WeaponSwitch,
                    outcome: ReloadOutcome::Cancelled,
                }));
    }

    // ========================================================================
    // Death / Respawn
    // ========================================================================

    fn kill(app: &mut App, character: Entity) {
        app.world_mut().send_event(PointDamage {
            target: character,
            amount: 1000.0,
            damage_type: DamageType::Generic,
            instigator: None,
            causer: Entity::PLACEHOLDER,
        });
        tick(app);
    }

    #[test]
    fn test_dead_character_ignores_input() {
        let mut app = gameplay_app();
        let character = spawn_character(&mut app, &[]);
        let rifle = loadout(&app, character).current().unwrap();
        kill(&mut app, character);
        assert!(app.world().get::<Dead>(character).is_some());

        input(&mut app, character, WeaponAction::ReloadPressed);
        input(&mut app, character, InputAction::SwitchSlot(2));
        tick(&mut app);

        assert!(!ammo(&app, rifle).is_reloading());
        assert_eq!(loadout(&app, character).current(), Some(rifle));
    }

    #[test]
    fn test_death_interrupts_current_weapon() {
        let mut app = gameplay_app();
        let character = spawn_character(&mut app, &[]);
        let rifle = loadout(&app, character).current().unwrap();

        input(&mut app, character, WeaponAction::ReloadPressed);
        tick(&mut app);
        assert!(ammo(&app, rifle).is_reloading());

        kill(&mut app, character);

        assert!(!ammo(&app, rifle).is_reloading());
        assert!(collect::<WeaponNotification>(&app).iter().any(|n| n.weapon == rifle
            && n.notification
                == AmmoNotification::ReloadCompleted {
                    trigger: ReloadCancelTrigger::External,
                    outcome: ReloadOutcome::Cancelled,
                }));
    }

    #[test]
    fn test_respawn_revives_and_resets_lifetime_counters() {
        let mut app = gameplay_app();
        let character = spawn_character(&mut app, &[]);
        let hud = app.world_mut().spawn(WeaponStatusView::new(character)).id();
        let rifle = loadout(&app, character).current().unwrap();

        // Полная перезарядка: второй магазин за жизнь
        input(&mut app, character, WeaponAction::ReloadPressed);
        tick(&mut app);
        advance(&mut app, 2.5);
        assert!(!ammo(&app, rifle).is_reloading());
        assert_eq!(ammo(&app, rifle).state().magazines_expended, 2);

        kill(&mut app, character);
        assert_eq!(app.world().get::<WeaponStatusView>(hud).unwrap().current_hp, 0.0);

        app.world_mut().send_event(RespawnIntent { character });
        tick(&mut app);

        assert!(app.world().get::<Dead>(character).is_none());
        assert_eq!(app.world().get::<Attributes>(character).unwrap().current_hp, 100.0);
        assert_eq!(app.world().get::<WeaponStatusView>(hud).unwrap().current_hp, 100.0);

        let healed = collect::<HealthChanged>(&app);
        let healed = healed.last().expect("respawn reports health");
        assert_eq!(healed.entity, character);
        assert_eq!(healed.delta, 100.0);
        assert_eq!(healed.instigator, None);
        assert_eq!(ammo(&app, rifle).state().magazines_expended, 1);
        assert_eq!(ammo(&app, rifle).bullets_active(), 30);
    }
}
