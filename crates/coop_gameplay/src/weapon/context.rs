//! Контекст одного weapon step'а.
//!
//! Core логика (ammo, firing, activation) не трогает EventWriter'ы напрямую:
//! всё, что она хочет сообщить наружу, складывается в `WeaponOutbox`, а
//! система в конце шага сбрасывает outbox в Bevy events. Это позволяет
//! тестировать state machine без App.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use crate::ammo::{AmmoNotification, WeaponNotification};
use crate::timers::TimerService;

use super::events::{EffectKind, ShotFired, WeaponEffect};

/// Накопитель исходящих событий оружия (в порядке возникновения)
#[derive(Debug, Default, Clone)]
pub struct WeaponOutbox {
    pub notifications: Vec<WeaponNotification>,
    pub shots: Vec<ShotFired>,
    pub effects: Vec<WeaponEffect>,
}

impl WeaponOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty() && self.shots.is_empty() && self.effects.is_empty()
    }

    /// Notifications конкретного оружия (удобно в тестах)
    pub fn notifications_for(&self, weapon: Entity) -> impl Iterator<Item = &AmmoNotification> {
        self.notifications
            .iter()
            .filter(move |n| n.weapon == weapon)
            .map(|n| &n.notification)
    }

    pub fn clear(&mut self) {
        self.notifications.clear();
        self.shots.clear();
        self.effects.clear();
    }

    pub fn flush(&mut self, writers: &mut WeaponEventWriters) {
        for notification in self.notifications.drain(..) {
            writers.notifications.write(notification);
        }
        for shot in self.shots.drain(..) {
            writers.shots.write(shot);
        }
        for effect in self.effects.drain(..) {
            writers.effects.write(effect);
        }
    }
}

/// Все writer'ы, в которые сбрасывается `WeaponOutbox`
#[derive(SystemParam)]
pub struct WeaponEventWriters<'w> {
    pub notifications: EventWriter<'w, WeaponNotification>,
    pub shots: EventWriter<'w, ShotFired>,
    pub effects: EventWriter<'w, WeaponEffect>,
}

/// Capability bundle, который получает каждая операция оружия
pub struct WeaponCtx<'a> {
    pub weapon: Entity,
    pub timers: &'a mut dyn TimerService,
    pub outbox: &'a mut WeaponOutbox,
}

impl<'a> WeaponCtx<'a> {
    pub fn new(weapon: Entity, timers: &'a mut dyn TimerService, outbox: &'a mut WeaponOutbox) -> Self {
        Self {
            weapon,
            timers,
            outbox,
        }
    }

    pub fn now(&self) -> f32 {
        self.timers.now()
    }

    pub fn notify(&mut self, notification: AmmoNotification) {
        self.outbox.notifications.push(WeaponNotification {
            weapon: self.weapon,
            notification,
        });
    }

    pub fn effect(&mut self, kind: EffectKind) {
        self.outbox.effects.push(WeaponEffect {
            source: self.weapon,
            kind,
        });
    }

    pub fn shot(&mut self, shot: ShotFired) {
        self.outbox.shots.push(shot);
    }
}
