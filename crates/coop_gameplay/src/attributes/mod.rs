//! Health/Attributes: HP/ATP персонажей и разрушаемых объектов.
//!
//! Урон приходит событиями (`PointDamage` от raycast'а, `RadialDamage` от
//! взрыва), применяется с clamp'ом в `[0, max_hp]` и рассылается как
//! `HealthChanged`. Первое обнуление HP = `EntityDied` + маркер `Dead`.
//!
//! `ExplosiveHazard` (бочка) слушает `HealthChanged` и взрывается ровно один раз.

use bevy::prelude::*;

use crate::config::GameplayConfig;
use crate::logger::{log, log_warning};
use crate::timers::{TimerManager, TimerService, TimerTask};
use crate::weapon::{EffectKind, ExplosionRequested, WeaponEffect};

#[cfg(test)]
mod attributes_tests;

pub const DEFAULT_MAX_HP: f32 = 100.0;

/// Тип урона (для реакций хоста: звук, decals)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum DamageType {
    Bullet,
    Explosion,
    Generic,
}

/// HP + ATP
#[derive(Component, Debug, Clone, PartialEq)]
pub struct Attributes {
    pub current_hp: f32,
    pub max_hp: f32,
    pub current_atp: f32,
    pub max_atp: f32,
    /// Latch: смерть сообщается один раз
    died: bool,
}

impl Default for Attributes {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HP, 0.0)
    }
}

/// Результат применения урона
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageOutcome {
    pub current_hp: f32,
    pub delta: f32,
    /// HP впервые дошло до 0
    pub died: bool,
}

impl Attributes {
    /// Стартует с полными HP/ATP
    pub fn new(max_hp: f32, max_atp: f32) -> Self {
        Self {
            current_hp: max_hp,
            max_hp,
            current_atp: max_atp,
            max_atp,
            died: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.current_hp > 0.0
    }

    pub fn has_died(&self) -> bool {
        self.died
    }

    /// Respawn: полные HP/ATP, смерть снова может быть сообщена.
    /// Возвращает, сколько HP восстановлено.
    pub fn revive(&mut self) -> f32 {
        let restored = self.max_hp - self.current_hp;
        self.current_hp = self.max_hp;
        self.current_atp = self.max_atp;
        self.died = false;
        restored
    }

    /// Отрицательный урон = лечение. Ноль ничего не меняет (None).
    pub fn apply_damage(&mut self, amount: f32) -> Option<DamageOutcome> {
        if amount == 0.0 {
            return None;
        }

        self.current_hp = (self.current_hp - amount).clamp(0.0, self.max_hp);
        // Формула сохранена как есть: hp_after - amount
        let delta = self.current_hp - amount;

        let died = !self.died && self.current_hp <= 0.0;
        if died {
            self.died = true;
        }

        Some(DamageOutcome {
            current_hp: self.current_hp,
            delta,
            died,
        })
    }
}

/// Маркер: entity мёртв. Оружие больше не принимает input.
#[derive(Component, Debug)]
pub struct Dead;

// ============================================================================
// Events
// ============================================================================

/// Event: урон в одну точку (raycast)
#[derive(Event, Debug, Clone, PartialEq)]
pub struct PointDamage {
    pub target: Entity,
    pub amount: f32,
    pub damage_type: DamageType,
    pub instigator: Option<Entity>,
    pub causer: Entity,
}

/// Event: radial урон по всем, кого задел взрыв
#[derive(Event, Debug, Clone, PartialEq)]
pub struct RadialDamage {
    pub victims: Vec<Entity>,
    pub amount: f32,
    pub damage_type: DamageType,
    pub instigator: Option<Entity>,
    pub causer: Entity,
}

/// Event: HP изменилось
#[derive(Event, Debug, Clone, PartialEq)]
pub struct HealthChanged {
    pub entity: Entity,
    pub current_hp: f32,
    pub delta: f32,
    pub damage_type: DamageType,
    pub instigator: Option<Entity>,
    pub causer: Entity,
}

/// Event: entity умер (HP впервые = 0)
#[derive(Event, Debug, Clone, PartialEq)]
pub struct EntityDied {
    pub entity: Entity,
    pub killer: Option<Entity>,
}

/// Event: стартовые параметры для HUD (на spawn)
#[derive(Event, Debug, Clone, PartialEq)]
pub struct AttributesInitialized {
    pub entity: Entity,
    pub max_hp: f32,
    pub max_atp: f32,
}

// ============================================================================
// ExplosiveHazard
// ============================================================================

/// Взрывоопасный объект (бочка). Требует `Attributes` на той же entity.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct ExplosiveHazard {
    pub radius: f32,
    pub damage: f32,
    pub knockback: f32,
    /// Через сколько секунд после взрыва entity деспавнится
    pub lifespan: f32,
    armed: bool,
}

impl Default for ExplosiveHazard {
    fn default() -> Self {
        Self {
            radius: 500.0,
            damage: 100.0,
            knockback: 50_000.0,
            lifespan: 10.0,
            armed: true,
        }
    }
}

impl ExplosiveHazard {
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Снимает latch. true = взрыв должен произойти сейчас.
    pub fn try_detonate(&mut self, current_hp: f32) -> bool {
        if self.armed && current_hp <= 0.0 {
            self.armed = false;
            return true;
        }
        false
    }
}

// ============================================================================
// Systems
// ============================================================================

/// Система: рассылает стартовые HP/ATP новым entity
pub fn broadcast_initial_attributes(
    spawned: Query<(Entity, &Attributes), Added<Attributes>>,
    mut initialized: EventWriter<AttributesInitialized>,
) {
    for (entity, attributes) in spawned.iter() {
        initialized.write(AttributesInitialized {
            entity,
            max_hp: attributes.max_hp,
            max_atp: attributes.max_atp,
        });
    }
}

/// Система: PointDamage + RadialDamage → Attributes
///
/// Point урон применяется раньше radial в пределах одного tick'а.
pub fn apply_damage_events(
    mut commands: Commands,
    mut point: EventReader<PointDamage>,
    mut radial: EventReader<RadialDamage>,
    mut targets: Query<&mut Attributes>,
    mut health_changed: EventWriter<HealthChanged>,
    mut died: EventWriter<EntityDied>,
) {
    let hits = point
        .read()
        .map(|hit| (hit.target, hit.amount, hit.damage_type, hit.instigator, hit.causer))
        .chain(radial.read().flat_map(|hit| {
            hit.victims
                .iter()
                .map(move |victim| (*victim, hit.amount, hit.damage_type, hit.instigator, hit.causer))
        }));

    for (target, amount, damage_type, instigator, causer) in hits {
        let Ok(mut attributes) = targets.get_mut(target) else {
            log_warning(&format!("Damage target {:?} has no Attributes, skipped", target));
            continue;
        };

        let Some(outcome) = attributes.apply_damage(amount) else {
            continue;
        };

        health_changed.write(HealthChanged {
            entity: target,
            current_hp: outcome.current_hp,
            delta: outcome.delta,
            damage_type,
            instigator,
            causer,
        });

        if outcome.died {
            died.write(EntityDied {
                entity: target,
                killer: instigator,
            });
            commands.entity(target).insert(Dead);
            log(&format!("💀 Entity {:?} killed by {:?}", target, instigator));
        }
    }
}

/// Система: бочка с HP <= 0 взрывается (один раз) и деспавнится через lifespan
pub fn detonate_explosive_hazards(
    mut health_changed: EventReader<HealthChanged>,
    mut hazards: Query<(&mut ExplosiveHazard, Option<&Transform>)>,
    mut timers: ResMut<TimerManager>,
    mut explosions: EventWriter<ExplosionRequested>,
    mut effects: EventWriter<WeaponEffect>,
    config: Res<GameplayConfig>,
) {
    for change in health_changed.read() {
        let Ok((mut hazard, transform)) = hazards.get_mut(change.entity) else {
            continue;
        };

        if !hazard.try_detonate(change.current_hp) {
            continue;
        }

        explosions.write(ExplosionRequested {
            source: change.entity,
            instigator: change.instigator,
            base_damage: hazard.damage,
            radius: hazard.radius,
            knockback: hazard.knockback,
        });
        effects.write(WeaponEffect {
            source: change.entity,
            kind: EffectKind::Explosion {
                center: transform.map_or(Vec3::ZERO, |t| t.translation),
                radius: hazard.radius,
                debug_sphere: config.debug_weapon_drawing,
            },
        });

        timers.schedule(change.entity, TimerTask::Despawn, hazard.lifespan, None);
        log(&format!("💥 Hazard {:?} exploded (instigator {:?})", change.entity, change.instigator));
    }
}
