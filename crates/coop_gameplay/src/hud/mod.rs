//! HUD observers: явный реестр подписчиков оружия + status view.
//!
//! Вместо динамических делегатов: оружие держит список observer entity
//! (`WeaponObservers`), `route_weapon_notifications` размножает каждую
//! `WeaponNotification` в `ObserverNotification` для каждого подписчика.
//!
//! `WeaponStatusView` (HUD entity, привязан к персонажу) при смене оружия
//! отписывается от старого и подписывается на новое.

use bevy::prelude::*;

use crate::ammo::{AmmoNotification, WeaponNotification};
use crate::attributes::{AttributesInitialized, HealthChanged};
use crate::loadout::{LoadoutInfo, LoadoutSpawned, WeaponChanged};
use crate::logger::log_warning;

/// Подписчики notifications конкретного оружия
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct WeaponObservers {
    observers: Vec<Entity>,
}

impl WeaponObservers {
    /// false = уже подписан или placeholder
    pub fn subscribe(&mut self, observer: Entity) -> bool {
        if observer == Entity::PLACEHOLDER {
            log_warning("Refusing to subscribe placeholder observer");
            return false;
        }
        if self.observers.contains(&observer) {
            return false;
        }
        self.observers.push(observer);
        true
    }

    /// Отписка отсутствующего observer'а = no-op
    pub fn unsubscribe(&mut self, observer: Entity) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| *o != observer);
        self.observers.len() != before
    }

    pub fn contains(&self, observer: Entity) -> bool {
        self.observers.contains(&observer)
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.observers.iter().copied()
    }
}

/// Event: notification, доставленная конкретному observer'у
#[derive(Event, Debug, Clone, PartialEq)]
pub struct ObserverNotification {
    pub observer: Entity,
    pub weapon: Entity,
    pub notification: AmmoNotification,
}

/// Что показывает индикатор перезарядки
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ReloadIndicator {
    #[default]
    Idle,
    Starting { delay: f32 },
    Cycling { delay: f32 },
    WindDown { winddown: f32 },
}

/// Модель HUD одного персонажа
#[derive(Component, Debug, Clone, PartialEq)]
pub struct WeaponStatusView {
    pub character: Entity,
    pub weapon: Option<Entity>,
    pub slot: u8,
    pub bullets: u32,
    /// -1 = без лимита
    pub available_reloads: i32,
    pub reload: ReloadIndicator,
    pub loadout: Option<LoadoutInfo>,
    pub current_hp: f32,
    pub max_hp: f32,
}

impl WeaponStatusView {
    pub fn new(character: Entity) -> Self {
        Self {
            character,
            weapon: None,
            slot: 0,
            bullets: 0,
            available_reloads: 0,
            reload: ReloadIndicator::Idle,
            loadout: None,
            current_hp: 0.0,
            max_hp: 0.0,
        }
    }

    pub fn apply(&mut self, notification: &AmmoNotification) {
        match *notification {
            AmmoNotification::AmmoChanged {
                bullets,
                available_reloads,
            } => {
                self.bullets = bullets;
                self.available_reloads = available_reloads;
            }
            AmmoNotification::BulletsAdded { .. } => {}
            AmmoNotification::ReloadStarted { delay } => {
                self.reload = ReloadIndicator::Starting { delay };
            }
            AmmoNotification::ReloadCycleStarted { delay, .. } => {
                self.reload = ReloadIndicator::Cycling { delay };
            }
            AmmoNotification::ReloadStopped { winddown } => {
                self.reload = ReloadIndicator::WindDown { winddown };
            }
            AmmoNotification::ReloadCompleted { .. } => {
                self.reload = ReloadIndicator::Idle;
            }
        }
    }
}

// ============================================================================
// Systems
// ============================================================================

/// Система: WeaponChanged → перепривязка view к новому оружию
pub fn rebind_status_views(
    mut changed: EventReader<WeaponChanged>,
    mut spawned: EventReader<LoadoutSpawned>,
    mut views: Query<(Entity, &mut WeaponStatusView)>,
    mut observers: Query<&mut WeaponObservers>,
) {
    for event in changed.read() {
        for (view_entity, mut view) in views.iter_mut() {
            if view.character != event.character {
                continue;
            }

            if let Some(previous) = event.previous.or(view.weapon) {
                if let Ok(mut old) = observers.get_mut(previous) {
                    old.unsubscribe(view_entity);
                }
            }

            match observers.get_mut(event.current) {
                Ok(mut new) => {
                    new.subscribe(view_entity);
                }
                Err(_) => log_warning(&format!("Weapon {:?} has no WeaponObservers", event.current)),
            }

            view.weapon = Some(event.current);
            view.slot = event.slot;
            view.reload = ReloadIndicator::Idle;
        }
    }

    for event in spawned.read() {
        for (_, mut view) in views.iter_mut() {
            if view.character == event.character {
                view.loadout = Some(event.info.clone());
            }
        }
    }
}

/// Система: WeaponNotification → ObserverNotification для каждого подписчика
pub fn route_weapon_notifications(
    mut notifications: EventReader<WeaponNotification>,
    observers: Query<&WeaponObservers>,
    mut routed: EventWriter<ObserverNotification>,
) {
    for event in notifications.read() {
        let Ok(subscribers) = observers.get(event.weapon) else {
            continue;
        };

        for observer in subscribers.iter() {
            routed.write(ObserverNotification {
                observer,
                weapon: event.weapon,
                notification: event.notification,
            });
        }
    }
}

/// Система: ObserverNotification → WeaponStatusView
pub fn update_status_views(
    mut routed: EventReader<ObserverNotification>,
    mut views: Query<&mut WeaponStatusView>,
) {
    for event in routed.read() {
        let Ok(mut view) = views.get_mut(event.observer) else {
            continue;
        };

        // Поздние notifications от оружия, с которого уже переключились
        if view.weapon != Some(event.weapon) {
            continue;
        }

        view.apply(&event.notification);
    }
}

/// Система: HP персонажа → view
pub fn track_view_health(
    mut initialized: EventReader<AttributesInitialized>,
    mut health: EventReader<HealthChanged>,
    mut views: Query<&mut WeaponStatusView>,
) {
    for event in initialized.read() {
        for mut view in views.iter_mut().filter(|v| v.character == event.entity) {
            view.max_hp = event.max_hp;
            view.current_hp = event.max_hp;
        }
    }

    for event in health.read() {
        for mut view in views.iter_mut().filter(|v| v.character == event.entity) {
            view.current_hp = event.current_hp;
        }
    }
}
