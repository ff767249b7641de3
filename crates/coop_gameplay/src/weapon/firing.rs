//! Firing cadence (automatic / manual / burst).
//!
//! FiringController решает КОГДА стрелять, AmmoSystem решает МОЖНО ли.
//!
//! # Flow
//!
//! ```text
//! press → Automatic/Burst: repeating Fire timer (первый тик через delay)
//!       → Manual: fire сразу + блок до ResetBlock
//! Fire tick → ammo.consume() ok → ShotFired + эффекты
//!           → consume fail / blocked → reload trigger (fallback: cancel)
//! release → стоп Fire timer, снять busy флаг
//! ```

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ammo::{AmmoSystem, ReloadCancelTrigger};
use crate::logger::log_error;
use crate::timers::{clear_timer, is_slot_active, DueTimer, FiringTimer, TimerHandle, TimerTask};

use super::events::EffectKind;
use super::{Weapon, WeaponCtx};

/// Режим стрельбы
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FireMode {
    Automatic { rate_of_fire: f32 },
    Manual { cooldown: f32 },
    Burst { shots_per_burst: u32, rate_of_fire: f32, cooldown: f32 },
}

impl FireMode {
    pub fn automatic() -> Self {
        FireMode::Automatic { rate_of_fire: 10.0 }
    }

    pub fn manual() -> Self {
        FireMode::Manual { cooldown: 2.0 }
    }

    pub fn burst() -> Self {
        FireMode::Burst {
            shots_per_burst: 5,
            rate_of_fire: 10.0,
            cooldown: 1.0,
        }
    }

    /// Интервал между выстрелами repeating таймера (manual: нет)
    pub fn time_between_shots(&self) -> Option<f32> {
        match *self {
            FireMode::Automatic { rate_of_fire } | FireMode::Burst { rate_of_fire, .. } => {
                Some(1.0 / rate_of_fire.max(f32::EPSILON))
            }
            FireMode::Manual { .. } => None,
        }
    }
}

fn default_bullets_per_attack() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiringConfig {
    #[serde(flatten)]
    pub mode: FireMode,
    #[serde(default = "default_bullets_per_attack")]
    pub bullets_per_attack: u32,
    /// Можно ли стрелять, если патронов меньше `bullets_per_attack`
    #[serde(default)]
    pub partial_fire: bool,
    /// Пустой/заблокированный выстрел запускает reload
    #[serde(default = "default_true")]
    pub reload_on_blocked_fire: bool,
}

impl Default for FiringConfig {
    fn default() -> Self {
        Self {
            mode: FireMode::automatic(),
            bullets_per_attack: default_bullets_per_attack(),
            partial_fire: false,
            reload_on_blocked_fire: true,
        }
    }
}

/// Runtime state стрельбы (принадлежит оружию)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeaponRuntimeState {
    /// None = ещё не стреляло (первый выстрел без задержки)
    pub last_fire_time: Option<f32>,
    pub burst_count: u32,
    pub fire_blocked: bool,
    /// Оружие занято стрельбой → magazine/per-bullet reload не стартует
    pub weapon_busy: bool,
}

#[derive(Component, Debug, Clone, PartialEq)]
pub struct FiringController {
    pub config: FiringConfig,
    pub runtime: WeaponRuntimeState,
    shot_timer: Option<TimerHandle>,
    cooldown_timer: Option<TimerHandle>,
}

impl FiringController {
    pub fn new(config: FiringConfig) -> Self {
        Self {
            config,
            runtime: WeaponRuntimeState::default(),
            shot_timer: None,
            cooldown_timer: None,
        }
    }

    pub fn is_firing(&self) -> bool {
        self.shot_timer.is_some()
    }

    pub fn is_blocked(&self) -> bool {
        self.runtime.fire_blocked
    }

    pub fn primary_pressed(&mut self, weapon: &Weapon, ammo: Option<&mut AmmoSystem>, ctx: &mut WeaponCtx) {
        if !weapon.is_active() {
            log_error(&format!(
                "Weapon {:?} ({}): fire pressed while inactive",
                ctx.weapon, weapon.short_name
            ));
            return;
        }

        match self.config.mode {
            FireMode::Automatic { .. } | FireMode::Burst { .. } => {
                let interval = self.config.mode.time_between_shots().unwrap_or(0.0);
                let now = ctx.now();
                let delay = self
                    .runtime
                    .last_fire_time
                    .map_or(0.0, |last| (last + interval - now).max(0.0));

                clear_timer(ctx.timers, &mut self.shot_timer);
                self.shot_timer = Some(ctx.timers.schedule(
                    ctx.weapon,
                    TimerTask::Firing(FiringTimer::Fire),
                    delay,
                    Some(interval),
                ));
            }
            FireMode::Manual { cooldown } => {
                self.fire(weapon, ammo, ctx);
                self.runtime.fire_blocked = true;
                if !is_slot_active(ctx.timers, self.cooldown_timer) {
                    self.cooldown_timer = Some(ctx.timers.schedule(
                        ctx.weapon,
                        TimerTask::Firing(FiringTimer::ResetBlock),
                        cooldown,
                        None,
                    ));
                }
            }
        }
    }

    pub fn primary_released(&mut self, ctx: &mut WeaponCtx) {
        match self.config.mode {
            FireMode::Automatic { .. } | FireMode::Burst { .. } => {
                clear_timer(ctx.timers, &mut self.shot_timer);
                self.runtime.weapon_busy = false;
            }
            // Cooldown manual'а живёт своей жизнью
            FireMode::Manual { .. } => {
                self.runtime.weapon_busy = false;
            }
        }
    }

    /// Reload кнопка работает как toggle: старт, иначе cancel
    pub fn reload_pressed(&mut self, ammo: Option<&mut AmmoSystem>, ctx: &mut WeaponCtx) {
        let Some(ammo) = ammo else {
            return;
        };

        if !ammo.trigger_reload(self.runtime.weapon_busy, ReloadCancelTrigger::ReloadKey, ctx) {
            ammo.request_cancel(ReloadCancelTrigger::ReloadKey, ctx);
        }
    }

    /// Deactivation / смерть: cancel reload + эмуляция отпускания кнопки.
    /// Повторный вызов ничего не меняет.
    pub fn cancel_ongoing_actions(
        &mut self,
        ammo: Option<&mut AmmoSystem>,
        trigger: ReloadCancelTrigger,
        ctx: &mut WeaponCtx,
    ) {
        if let Some(ammo) = ammo {
            ammo.request_cancel(trigger, ctx);
        }
        self.primary_released(ctx);
    }

    /// Сброс при активации/деактивации (таймер cooldown'а не трогаем)
    pub fn reset_runtime(&mut self) {
        self.runtime.burst_count = 0;
        self.runtime.weapon_busy = false;
    }

    pub fn on_timer(
        &mut self,
        due: &DueTimer,
        timer: FiringTimer,
        weapon: &Weapon,
        ammo: Option<&mut AmmoSystem>,
        ctx: &mut WeaponCtx,
    ) {
        match timer {
            FiringTimer::Fire if self.shot_timer == Some(due.handle) => {
                self.fire(weapon, ammo, ctx);
            }
            FiringTimer::ResetBlock if self.cooldown_timer == Some(due.handle) => {
                self.cooldown_timer = None;
                self.runtime.fire_blocked = false;
                self.runtime.burst_count = 0;
            }
            _ => {}
        }
    }

    /// Один выстрел (tick repeating таймера или manual press)
    fn fire(&mut self, weapon: &Weapon, mut ammo: Option<&mut AmmoSystem>, ctx: &mut WeaponCtx) {
        let consumed = if self.runtime.fire_blocked {
            None
        } else {
            ammo.as_deref_mut().and_then(|ammo| {
                ammo.consume(self.config.partial_fire, self.config.bullets_per_attack, ctx)
            })
        };

        let Some(bullets) = consumed else {
            if self.config.reload_on_blocked_fire {
                self.runtime.weapon_busy = false;
                if let Some(ammo) = ammo {
                    if !ammo.trigger_reload(self.runtime.weapon_busy, ReloadCancelTrigger::WeaponAction, ctx) {
                        ammo.request_cancel(ReloadCancelTrigger::WeaponAction, ctx);
                    }
                }
            }
            return;
        };

        self.runtime.weapon_busy = true;
        let success = weapon.perform_shot(bullets, ctx);
        ctx.effect(EffectKind::CameraShake);
        self.runtime.last_fire_time = Some(ctx.now());
        ctx.effect(EffectKind::MuzzleFlash);

        if let FireMode::Burst {
            shots_per_burst,
            cooldown,
            ..
        } = self.config.mode
        {
            if success {
                self.runtime.burst_count += 1;
            }
            if self.runtime.burst_count >= shots_per_burst {
                self.runtime.fire_blocked = true;
                self.runtime.burst_count = 0;
                clear_timer(ctx.timers, &mut self.cooldown_timer);
                self.cooldown_timer = Some(ctx.timers.schedule(
                    ctx.weapon,
                    TimerTask::Firing(FiringTimer::ResetBlock),
                    cooldown,
                    None,
                ));
            }
        }
    }
}
