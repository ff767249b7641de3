//! Weapon systems (GameplayTick)
//!
//! - `release_removed_weapon_timers`: снимает таймеры деспавнутого оружия
//! - `dispatch_due_timers`: выдаёт сработавшие таймеры оружию, по одному
//! - `resolve_raycast_hits`: RaycastHit (host) → PointDamage + impact/tracer
//! - `resolve_explosion_hits`: ExplosionHits (host) → RadialDamage + explosion VFX

use bevy::prelude::*;

use crate::attributes::{DamageType, ExplosiveHazard, PointDamage, RadialDamage};
use crate::config::GameplayConfig;
use crate::logger::{log, log_warning};
use crate::timers::{TimerManager, TimerService, TimerTask};

use super::{
    EffectKind, ExplosionHits, RaycastHit, Weapon, WeaponCtx, WeaponEffect, WeaponEventWriters,
    WeaponOutbox, WeaponParts, WeaponQuery,
};

/// Система: деспавнутое оружие больше не получает таймеры
pub fn release_removed_weapon_timers(
    mut removed: RemovedComponents<Weapon>,
    mut timers: ResMut<TimerManager>,
) {
    for weapon in removed.read() {
        let released = timers.cancel_owned_by(weapon);
        if released > 0 {
            log(&format!("🧹 Weapon {:?} removed, {} timers released", weapon, released));
        }
    }
}

/// Система: прогоняет все таймеры, срок которых наступил в текущем tick'е.
///
/// Задачи идут строго по одной, поэтому callback может отменить следующую
/// задачу (например, cancel reload'а из fire tick'а) до её срабатывания.
pub fn dispatch_due_timers(
    mut commands: Commands,
    mut timers: ResMut<TimerManager>,
    mut weapons: Query<WeaponQuery>,
    existing: Query<Entity>,
    mut writers: WeaponEventWriters,
) {
    let mut outbox = WeaponOutbox::new();

    while let Some(due) = timers.pop_due() {
        if due.task == TimerTask::Despawn {
            if existing.contains(due.owner) {
                commands.entity(due.owner).despawn();
            }
            continue;
        }

        let Ok((weapon, firing, ammo)) = weapons.get_mut(due.owner) else {
            log_warning(&format!(
                "Timer {:?} owner {:?} is not a weapon, cancelling",
                due.task, due.owner
            ));
            timers.cancel(due.handle);
            continue;
        };

        let mut parts = WeaponParts::from_mut(weapon, firing, ammo);
        let mut ctx = WeaponCtx::new(due.owner, &mut *timers, &mut outbox);
        parts.on_timer(&due, &mut ctx);
    }

    timers.finish_advance();
    outbox.flush(&mut writers);
}

/// Система: результат raycast'а от хоста → урон по поверхности
pub fn resolve_raycast_hits(
    mut hits: EventReader<RaycastHit>,
    mut damage: EventWriter<PointDamage>,
    mut effects: EventWriter<WeaponEffect>,
) {
    for hit in hits.read() {
        if let Some(target) = hit.target {
            let amount = hit.base_damage * hit.surface.damage_multiplier();
            if amount > 0.0 {
                damage.write(PointDamage {
                    target,
                    amount,
                    damage_type: DamageType::Bullet,
                    instigator: Some(hit.shooter),
                    causer: hit.weapon,
                });
            }
        }

        effects.write(WeaponEffect {
            source: hit.weapon,
            kind: EffectKind::Impact {
                surface: hit.surface,
                point: hit.impact_point,
            },
        });
        effects.write(WeaponEffect {
            source: hit.weapon,
            kind: EffectKind::Tracer {
                end: hit.impact_point,
            },
        });
    }
}

/// Система: взрыв (снаряд или бочка) → radial урон по всем задетым
///
/// Эффект бочки уже показан при детонации, здесь только снаряды.
pub fn resolve_explosion_hits(
    mut hits: EventReader<ExplosionHits>,
    mut damage: EventWriter<RadialDamage>,
    mut effects: EventWriter<WeaponEffect>,
    hazards: Query<(), With<ExplosiveHazard>>,
    config: Res<GameplayConfig>,
) {
    for hit in hits.read() {
        if !hazards.contains(hit.source) {
            effects.write(WeaponEffect {
                source: hit.source,
                kind: EffectKind::Explosion {
                    center: hit.center,
                    radius: hit.radius,
                    debug_sphere: config.debug_weapon_drawing,
                },
            });
        }

        if hit.victims.is_empty() {
            continue;
        }

        damage.write(RadialDamage {
            victims: hit.victims.clone(),
            amount: hit.base_damage,
            damage_type: DamageType::Explosion,
            instigator: hit.instigator,
            causer: hit.source,
        });
    }
}
