//! Loadout systems (GameplayTick)
//!
//! # Systems
//!
//! - `process_loadout_spawns`: SpawnLoadoutIntent → weapon entities, первое активно
//! - `process_weapon_input`: WeaponInput → текущее оружие / switch слота
//! - `interrupt_weapons_on_death`: EntityDied → cancel текущего оружия (External)
//! - `process_respawns`: RespawnIntent → revive + reset lifetime лимитов

use bevy::prelude::*;

use crate::attributes::{Attributes, DamageType, Dead, EntityDied, HealthChanged};
use crate::ammo::ReloadCancelTrigger;
use crate::config::{GameplayConfig, WeaponDefinitions};
use crate::logger::{log, log_error, log_warning};
use crate::timers::TimerManager;
use crate::weapon::{WeaponCtx, WeaponEventWriters, WeaponOutbox, WeaponParts, WeaponQuery};

use super::{
    InputAction, Loadout, LoadoutSlot, LoadoutSpawned, RespawnIntent, SpawnLoadoutIntent,
    WeaponChanged, WeaponInput,
};

// ============================================================================
// Loadout Spawn
// ============================================================================

/// Process loadout spawn intents
///
/// Компоненты оружия собираются локально (activate/deactivate прямо на них),
/// а в мир попадают через Commands уже в итоговом состоянии.
pub fn process_loadout_spawns(
    mut commands: Commands,
    mut intents: EventReader<SpawnLoadoutIntent>,
    mut characters: Query<&mut Loadout>,
    definitions: Res<WeaponDefinitions>,
    config: Res<GameplayConfig>,
    mut timers: ResMut<TimerManager>,
    mut writers: WeaponEventWriters,
    mut changed: EventWriter<WeaponChanged>,
    mut spawned: EventWriter<LoadoutSpawned>,
) {
    let mut outbox = WeaponOutbox::new();

    for intent in intents.read() {
        let Ok(mut loadout) = characters.get_mut(intent.character) else {
            log_error(&format!("Entity {:?} missing Loadout", intent.character));
            continue;
        };

        let requested = if intent.weapons.is_empty() {
            &config.default_loadout
        } else {
            &intent.weapons
        };

        let mut initial: Option<(Entity, u8)> = None;

        for id in requested {
            if loadout.is_full() {
                log_warning(&format!(
                    "Loadout of {:?} is full, '{}' rejected",
                    intent.character, id
                ));
                break;
            }

            let Some(definition) = definitions.get(id) else {
                log_error(&format!("WeaponDefinition not found: {:?}", id));
                continue;
            };

            if loadout.contains_definition(id) {
                log_warning(&format!(
                    "Loadout of {:?} already holds '{}', duplicate rejected",
                    intent.character, id
                ));
                continue;
            }

            let entity = commands.spawn_empty().id();
            let (mut weapon, mut firing, mut ammo, observers) = definition.instantiate(intent.character);

            let Some(slot) = loadout.add_weapon(LoadoutSlot {
                weapon: entity,
                definition_id: id.clone(),
                short_name: weapon.short_name.clone(),
            }) else {
                commands.entity(entity).despawn();
                break;
            };

            {
                let mut parts = WeaponParts::new(&mut weapon, Some(&mut firing), Some(&mut ammo));
                let mut ctx = WeaponCtx::new(entity, &mut *timers, &mut outbox);

                if loadout.current().is_none() {
                    if parts.activate(&mut ctx) {
                        loadout.set_current(entity, slot);
                        initial = Some((entity, slot));
                        changed.write(WeaponChanged {
                            character: intent.character,
                            previous: None,
                            current: entity,
                            slot,
                        });
                        parts.replay_status(&mut ctx);
                    }
                } else {
                    parts.deactivate(&mut ctx);
                }
            }

            commands.entity(entity).insert((
                Name::new(definition.full_name.clone()),
                weapon,
                firing,
                ammo,
                observers,
            ));
        }

        if let Some((current, slot)) = initial {
            spawned.write(LoadoutSpawned {
                character: intent.character,
                info: loadout.info(),
                current,
                slot,
            });
            log(&format!(
                "🎒 Loadout spawned for {:?}: {} weapons, slot {} active",
                intent.character,
                loadout.weapons().count(),
                slot
            ));
        }
    }

    outbox.flush(&mut writers);
}

// ============================================================================
// Weapon Input
// ============================================================================

/// Process weapon input (строго в порядке поступления)
pub fn process_weapon_input(
    mut inputs: EventReader<WeaponInput>,
    mut characters: Query<(&mut Loadout, Has<Dead>)>,
    mut weapons: Query<WeaponQuery>,
    mut timers: ResMut<TimerManager>,
    mut writers: WeaponEventWriters,
    mut changed: EventWriter<WeaponChanged>,
) {
    let mut outbox = WeaponOutbox::new();

    for input in inputs.read() {
        let Ok((mut loadout, dead)) = characters.get_mut(input.character) else {
            log_warning(&format!("Input for {:?} without Loadout, skipped", input.character));
            continue;
        };

        if dead {
            continue;
        }

        match input.action {
            InputAction::Weapon(action) => {
                let Some(current) = loadout.current() else {
                    continue;
                };
                let Ok((weapon, firing, ammo)) = weapons.get_mut(current) else {
                    log_error(&format!("Current weapon {:?} of {:?} is gone", current, input.character));
                    continue;
                };

                let mut parts = WeaponParts::from_mut(weapon, firing, ammo);
                let mut ctx = WeaponCtx::new(current, &mut *timers, &mut outbox);
                parts.handle_action(action, &mut ctx);
            }
            InputAction::SwitchSlot(slot) => {
                if let Some(event) = switch_weapon(
                    input.character,
                    &mut loadout,
                    slot,
                    &mut weapons,
                    &mut timers,
                    &mut outbox,
                ) {
                    changed.write(event);
                }
            }
        }
    }

    outbox.flush(&mut writers);
}

/// Deactivate(old) → Activate(new) → replay → automatic actions.
/// Текущий или пустой слот = no-op.
fn switch_weapon(
    character: Entity,
    loadout: &mut Loadout,
    slot: u8,
    weapons: &mut Query<WeaponQuery>,
    timers: &mut TimerManager,
    outbox: &mut WeaponOutbox,
) -> Option<WeaponChanged> {
    let target = loadout.weapon_in_slot(slot)?;
    let previous = loadout.current()?;
    if previous == target {
        return None;
    }

    let Ok([(old_weapon, old_firing, old_ammo), (new_weapon, new_firing, new_ammo)]) =
        weapons.get_many_mut([previous, target])
    else {
        log_error(&format!("Weapon switch {:?} → {:?}: entity missing", previous, target));
        return None;
    };

    let deactivated = {
        let mut old = WeaponParts::from_mut(old_weapon, old_firing, old_ammo);
        old.deactivate(&mut WeaponCtx::new(previous, &mut *timers, &mut *outbox))
    };

    let mut new = WeaponParts::from_mut(new_weapon, new_firing, new_ammo);
    let mut ctx = WeaponCtx::new(target, &mut *timers, &mut *outbox);
    let activated = new.activate(&mut ctx);
    loadout.set_current(target, slot);

    if !(deactivated && activated) {
        log_error(&format!("Weapon switch to slot {} failed for {:?}", slot, character));
        return None;
    }

    new.replay_status(&mut ctx);
    new.trigger_automatic_actions(&mut ctx);
    log(&format!("🔁 {:?} switched to slot {} ({})", character, slot, new.weapon.short_name));

    Some(WeaponChanged {
        character,
        previous: Some(previous),
        current: target,
        slot,
    })
}

// ============================================================================
// Death / Respawn
// ============================================================================

/// Смерть: reload прерывается, кнопки "отпускаются"
pub fn interrupt_weapons_on_death(
    mut died: EventReader<EntityDied>,
    characters: Query<&Loadout>,
    mut weapons: Query<WeaponQuery>,
    mut timers: ResMut<TimerManager>,
    mut writers: WeaponEventWriters,
) {
    let mut outbox = WeaponOutbox::new();

    for event in died.read() {
        // Бочки и манекены без оружия
        let Ok(loadout) = characters.get(event.entity) else {
            continue;
        };
        let Some(current) = loadout.current() else {
            continue;
        };
        let Ok((weapon, firing, ammo)) = weapons.get_mut(current) else {
            continue;
        };

        let mut parts = WeaponParts::from_mut(weapon, firing, ammo);
        let mut ctx = WeaponCtx::new(current, &mut *timers, &mut outbox);
        parts.cancel_ongoing_actions(ReloadCancelTrigger::External, &mut ctx);
    }

    outbox.flush(&mut writers);
}

/// Respawn: полные HP (HealthChanged для HUD), полные магазины, lifetime лимиты с нуля
pub fn process_respawns(
    mut commands: Commands,
    mut intents: EventReader<RespawnIntent>,
    mut characters: Query<(&Loadout, Option<&mut Attributes>)>,
    mut weapons: Query<WeaponQuery>,
    mut timers: ResMut<TimerManager>,
    mut writers: WeaponEventWriters,
    mut health_changed: EventWriter<HealthChanged>,
) {
    let mut outbox = WeaponOutbox::new();

    for intent in intents.read() {
        let Ok((loadout, attributes)) = characters.get_mut(intent.character) else {
            log_error(&format!("Entity {:?} missing Loadout", intent.character));
            continue;
        };

        if let Some(mut attributes) = attributes {
            let restored = attributes.revive();
            health_changed.write(HealthChanged {
                entity: intent.character,
                current_hp: attributes.current_hp,
                delta: restored,
                damage_type: DamageType::Generic,
                instigator: None,
                causer: intent.character,
            });
        }
        commands.entity(intent.character).remove::<Dead>();

        for entity in loadout.weapons() {
            let Ok((_, _, Some(ammo))) = weapons.get_mut(entity) else {
                continue;
            };
            let mut ctx = WeaponCtx::new(entity, &mut *timers, &mut outbox);
            ammo.into_inner().reset_lifetime_counters(&mut ctx);
        }

        log(&format!("♻️ {:?} respawned", intent.character));
    }

    outbox.flush(&mut writers);
}
