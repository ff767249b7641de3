//! Weapon module: activation lifecycle, firing cadence, host events.
//!
//! Weapon = отдельная entity с компонентами:
//! - `Weapon`: identity, owner, kind, active/visible флаги
//! - `FiringController`: cadence (automatic/manual/burst)
//! - `AmmoSystem`: патроны + reload state machine
//! - `WeaponObservers`: подписчики HUD
//!
//! ECS решает правила (можно ли стрелять, сколько патронов), хост выполняет
//! raycast / полёт снаряда и возвращает результат событием.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ammo::{AmmoSystem, ReloadCancelTrigger};
use crate::logger::{log, log_warning};
use crate::timers::{DueTimer, TimerTask};

pub mod context;
pub mod events;
pub mod firing;
pub mod systems;

pub use context::{WeaponCtx, WeaponEventWriters, WeaponOutbox};
pub use events::{
    EffectKind, ExplosionHits, ExplosionRequested, ProjectileSpec, RaycastHit, ShotFired,
    ShotPayload, SurfaceType, WeaponEffect,
};
pub use firing::{FireMode, FiringConfig, FiringController, WeaponRuntimeState};


/// Дальность trace по умолчанию
pub const DEFAULT_TRACE_RANGE: f32 = 10_000.0;

fn default_trace_range() -> f32 {
    DEFAULT_TRACE_RANGE
}

/// Как оружие наносит урон
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WeaponKind {
    /// Мгновенный trace (винтовка, пистолет). Вторичное действие = zoom.
    Raycast {
        shot_damage: f32,
        #[serde(default = "default_trace_range")]
        range: f32,
    },
    /// Бросок снаряда, который взрывается (гранатомёт)
    Throwing {
        #[serde(default)]
        projectile: ProjectileSpec,
    },
}

impl WeaponKind {
    pub fn supports_zoom(&self) -> bool {
        matches!(self, WeaponKind::Raycast { .. })
    }
}

/// Weapon identity + activation state
#[derive(Component, Debug, Clone, PartialEq)]
pub struct Weapon {
    pub definition_id: String,
    pub full_name: String,
    pub short_name: String,
    /// Персонаж, держащий оружие (shooter для ShotFired)
    pub owner: Option<Entity>,
    pub kind: WeaponKind,
    active: bool,
    visible: bool,
    zoomed: bool,
}

impl Weapon {
    /// Новое оружие неактивно и скрыто
    pub fn new(definition_id: impl Into<String>, kind: WeaponKind) -> Self {
        Self {
            definition_id: definition_id.into(),
            full_name: "Generic Weapon".to_string(),
            short_name: "Generic".to_string(),
            owner: None,
            kind,
            active: false,
            visible: false,
            zoomed: false,
        }
    }

    pub fn with_names(mut self, full_name: impl Into<String>, short_name: impl Into<String>) -> Self {
        self.full_name = full_name.into();
        self.short_name = short_name.into();
        self
    }

    pub fn with_owner(mut self, owner: Entity) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_zoomed(&self) -> bool {
        self.zoomed
    }

    /// Отправляет выстрел хосту. false = некому стрелять (нет owner'а).
    pub fn perform_shot(&self, bullets: u32, ctx: &mut WeaponCtx) -> bool {
        let Some(shooter) = self.owner else {
            log_warning(&format!("Weapon {:?} ({}) has no owner, shot dropped", ctx.weapon, self.short_name));
            return false;
        };

        let payload = match self.kind {
            WeaponKind::Raycast { shot_damage, range } => ShotPayload::Raycast {
                damage: shot_damage,
                range,
            },
            WeaponKind::Throwing { projectile } => ShotPayload::Projectile(projectile),
        };

        ctx.shot(ShotFired {
            shooter,
            weapon: ctx.weapon,
            payload,
            bullets,
        });
        true
    }
}

/// Действие игрока над текущим оружием
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeaponAction {
    PrimaryPressed,
    PrimaryReleased,
    SecondaryPressed,
    SecondaryReleased,
    ReloadPressed,
}

/// Query data для всех систем, работающих с оружием целиком
pub type WeaponQuery = (
    &'static mut Weapon,
    Option<&'static mut FiringController>,
    Option<&'static mut AmmoSystem>,
);

/// Мутабельный вид на компоненты одной weapon entity
pub struct WeaponParts<'p> {
    pub weapon: &'p mut Weapon,
    pub firing: Option<&'p mut FiringController>,
    pub ammo: Option<&'p mut AmmoSystem>,
}

impl<'p> WeaponParts<'p> {
    pub fn new(
        weapon: &'p mut Weapon,
        firing: Option<&'p mut FiringController>,
        ammo: Option<&'p mut AmmoSystem>,
    ) -> Self {
        Self { weapon, firing, ammo }
    }

    /// Из элемента `WeaponQuery`
    pub fn from_mut(
        weapon: Mut<'p, Weapon>,
        firing: Option<Mut<'p, FiringController>>,
        ammo: Option<Mut<'p, AmmoSystem>>,
    ) -> Self {
        Self::new(
            weapon.into_inner(),
            firing.map(Mut::into_inner),
            ammo.map(Mut::into_inner),
        )
    }

    /// Inactive → Active (burst/busy сбрасываются). Успех только если оба post-condition выполнены.
    pub fn activate(&mut self, ctx: &mut WeaponCtx) -> bool {
        self.weapon.active = true;
        if !self.weapon.visible {
            self.weapon.visible = true;
            ctx.effect(EffectKind::Visibility { visible: true });
        }
        if let Some(firing) = self.firing.as_deref_mut() {
            firing.reset_runtime();
        }

        let success = self.weapon.active && self.weapon.visible;
        if success {
            log(&format!("🔫 Weapon {:?} ({}) activated", ctx.weapon, self.weapon.short_name));
        }
        success
    }

    /// Active → Inactive + CancelOngoingActions. Повторный вызов безопасен.
    pub fn deactivate(&mut self, ctx: &mut WeaponCtx) -> bool {
        self.weapon.active = false;
        if self.weapon.visible {
            self.weapon.visible = false;
            ctx.effect(EffectKind::Visibility { visible: false });
        }

        self.cancel_ongoing_actions(ReloadCancelTrigger::WeaponSwitch, ctx);
        if let Some(firing) = self.firing.as_deref_mut() {
            firing.reset_runtime();
        }

        !self.weapon.active && !self.weapon.visible
    }

    pub fn cancel_ongoing_actions(&mut self, trigger: ReloadCancelTrigger, ctx: &mut WeaponCtx) {
        match self.firing.as_deref_mut() {
            Some(firing) => firing.cancel_ongoing_actions(self.ammo.as_deref_mut(), trigger, ctx),
            None => {
                if let Some(ammo) = self.ammo.as_deref_mut() {
                    ammo.request_cancel(trigger, ctx);
                }
            }
        }
        self.release_secondary(ctx);
    }

    pub fn handle_action(&mut self, action: WeaponAction, ctx: &mut WeaponCtx) {
        match action {
            WeaponAction::PrimaryPressed => {
                if let Some(firing) = self.firing.as_deref_mut() {
                    firing.primary_pressed(self.weapon, self.ammo.as_deref_mut(), ctx);
                }
            }
            WeaponAction::PrimaryReleased => {
                if let Some(firing) = self.firing.as_deref_mut() {
                    firing.primary_released(ctx);
                }
            }
            WeaponAction::SecondaryPressed => self.press_secondary(ctx),
            WeaponAction::SecondaryReleased => self.release_secondary(ctx),
            WeaponAction::ReloadPressed => {
                if let Some(firing) = self.firing.as_deref_mut() {
                    firing.reload_pressed(self.ammo.as_deref_mut(), ctx);
                }
            }
        }
    }

    /// Replay состояния для новых observer'ов
    pub fn replay_status(&self, ctx: &mut WeaponCtx) {
        if let Some(ammo) = self.ammo.as_deref() {
            ammo.replay_status(ctx);
        }
    }

    pub fn trigger_automatic_actions(&mut self, ctx: &mut WeaponCtx) {
        if let Some(ammo) = self.ammo.as_deref_mut() {
            ammo.activate_automatic_properties(ctx);
        }
    }

    /// Routing сработавшего таймера в нужную подсистему
    pub fn on_timer(&mut self, due: &DueTimer, ctx: &mut WeaponCtx) {
        match due.task {
            TimerTask::Reload(timer) => {
                if let Some(ammo) = self.ammo.as_deref_mut() {
                    ammo.on_timer(due, timer, ctx);
                }
            }
            TimerTask::Firing(timer) => {
                if let Some(firing) = self.firing.as_deref_mut() {
                    firing.on_timer(due, timer, self.weapon, self.ammo.as_deref_mut(), ctx);
                }
            }
            TimerTask::Despawn => {}
        }
    }

    fn press_secondary(&mut self, ctx: &mut WeaponCtx) {
        if !self.weapon.active || !self.weapon.kind.supports_zoom() || self.weapon.zoomed {
            return;
        }
        self.weapon.zoomed = true;
        ctx.effect(EffectKind::Zoom { enabled: true });
    }

    fn release_secondary(&mut self, ctx: &mut WeaponCtx) {
        if !self.weapon.zoomed {
            return;
        }
        self.weapon.zoomed = false;
        ctx.effect(EffectKind::Zoom { enabled: false });
    }
}
