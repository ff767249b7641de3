//! Per-bullet reload: порционная перезарядка (дробовик).
//!
//! Idle → InitialDelay → Cycling → (мгновенно Idle | WindDown → Idle)
//!
//! - Каждый цикл добавляет до `bullets_per_reload` патронов (не больше ёмкости
//!   и остатка lifetime лимита).
//! - Выстрел прерывает reload, но только после первого завершённого цикла,
//!   и с wind-down штрафом. Повторный cancel во время wind-down игнорируется.
//! - Weapon switch / external прерывают мгновенно.
//! - Кнопка reload reload не прерывает.

use serde::{Deserialize, Serialize};

use crate::timers::{ReloadTimer, TimerTask};
use crate::weapon::WeaponCtx;

use super::{
    ammo_changed, log_reload, AmmoNotification, AmmoState, ReloadCancelTrigger, ReloadOutcome,
    ReloadPhase,
};

/// Минимум завершённых циклов, после которого выстрел может прервать reload
pub const MIN_CYCLES_BEFORE_CANCEL: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerBulletReload {
    pub max_capacity: u32,
    pub bullets_per_reload: u32,
    pub initial_delay: f32,
    pub cycle_duration: f32,
    /// Wind-down после принятого cancel'а
    pub reload_end_time: f32,
    /// None = патроны не ограничены
    #[serde(default)]
    pub bullets_per_life: Option<u32>,
}

impl PerBulletReload {
    pub fn available_reloads(&self, state: &AmmoState) -> i32 {
        match self.bullets_per_life {
            Some(cap) if state.bullets_expended > cap => 0,
            Some(cap) => (cap - state.bullets_expended) as i32,
            None => -1,
        }
    }

    /// Остаток lifetime лимита (None = без лимита)
    fn remaining_life(&self, state: &AmmoState) -> Option<u32> {
        self.bullets_per_life
            .map(|cap| cap.saturating_sub(state.bullets_expended))
    }
}

pub(crate) fn trigger(
    cfg: &PerBulletReload,
    state: &mut AmmoState,
    weapon_busy: bool,
    ctx: &mut WeaponCtx,
) -> bool {
    let life_allows = cfg
        .remaining_life(state)
        .is_none_or(|remaining| remaining >= cfg.bullets_per_reload);

    let admitted = !state.is_reloading()
        && !weapon_busy
        && state.bullets_active < cfg.max_capacity
        && life_allows;

    if !admitted {
        return false;
    }

    let handle = ctx.timers.schedule(
        ctx.weapon,
        TimerTask::Reload(ReloadTimer::InitialDelay),
        cfg.initial_delay,
        None,
    );
    state.phase = ReloadPhase::InitialDelay(handle);
    state.reload_cycles = 0;
    ctx.notify(AmmoNotification::ReloadStarted {
        delay: cfg.initial_delay,
    });
    log_reload(ctx, "per-bullet reload started");
    true
}

pub(crate) fn on_delay_finished(cfg: &PerBulletReload, state: &mut AmmoState, ctx: &mut WeaponCtx) {
    let handle = ctx.timers.schedule(
        ctx.weapon,
        TimerTask::Reload(ReloadTimer::BulletsIn),
        cfg.cycle_duration,
        Some(cfg.cycle_duration),
    );
    state.phase = ReloadPhase::Cycling(handle);
    ctx.notify(AmmoNotification::ReloadCycleStarted {
        delay: cfg.cycle_duration,
        bullets: cfg.bullets_per_reload,
    });
}

pub(crate) fn on_bullets_in(cfg: &PerBulletReload, state: &mut AmmoState, ctx: &mut WeaponCtx) {
    let space = cfg.max_capacity.saturating_sub(state.bullets_active);
    let added = cfg
        .bullets_per_reload
        .min(space)
        .min(cfg.remaining_life(state).unwrap_or(u32::MAX));

    state.bullets_active += added;
    state.bullets_expended += added;
    state.reload_cycles += 1;

    ctx.notify(ammo_changed(state, cfg.available_reloads(state)));
    if added > 0 {
        ctx.notify(AmmoNotification::BulletsAdded { count: added });
    }

    let life_exhausted = cfg.remaining_life(state) == Some(0);
    if life_exhausted || state.bullets_active >= cfg.max_capacity {
        request_cancel(cfg, state, ReloadCancelTrigger::LimitReached, ctx);
    } else {
        ctx.notify(AmmoNotification::ReloadCycleStarted {
            delay: cfg.cycle_duration,
            bullets: cfg.bullets_per_reload,
        });
    }
}

pub(crate) fn on_winddown_finished(_cfg: &PerBulletReload, state: &mut AmmoState, ctx: &mut WeaponCtx) {
    let trigger = match state.phase {
        ReloadPhase::WindDown { trigger, .. } => trigger,
        _ => ReloadCancelTrigger::LimitReached,
    };

    state.phase = ReloadPhase::Idle;
    state.reload_cycles = 0;
    ctx.notify(AmmoNotification::ReloadCompleted {
        trigger,
        outcome: ReloadOutcome::Finished,
    });
    log_reload(ctx, "✅ per-bullet reload complete");
}

pub(crate) fn request_cancel(
    cfg: &PerBulletReload,
    state: &mut AmmoState,
    cancel: ReloadCancelTrigger,
    ctx: &mut WeaponCtx,
) -> bool {
    if !state.is_reloading() {
        return false;
    }

    match cancel {
        ReloadCancelTrigger::WeaponSwitch | ReloadCancelTrigger::External => {
            state.clear_phase(ctx);
            state.reload_cycles = 0;
            ctx.notify(AmmoNotification::ReloadCompleted {
                trigger: cancel,
                outcome: ReloadOutcome::Cancelled,
            });
            log_reload(ctx, &format!("per-bullet reload dropped ({:?})", cancel));
            true
        }
        ReloadCancelTrigger::WeaponAction | ReloadCancelTrigger::LimitReached => {
            if state.reload_cycles < MIN_CYCLES_BEFORE_CANCEL {
                log_reload(ctx, "cancel rejected: no reload cycle completed yet");
                return false;
            }

            // Уже в wind-down: latch стоит, повторный запрос no-op
            if matches!(state.phase, ReloadPhase::WindDown { .. }) {
                return false;
            }

            state.clear_phase(ctx);
            let handle = ctx.timers.schedule(
                ctx.weapon,
                TimerTask::Reload(ReloadTimer::Completion),
                cfg.reload_end_time,
                None,
            );
            state.phase = ReloadPhase::WindDown {
                timer: handle,
                trigger: cancel,
            };
            ctx.notify(AmmoNotification::ReloadStopped {
                winddown: cfg.reload_end_time,
            });
            true
        }
        ReloadCancelTrigger::Invalid
        | ReloadCancelTrigger::ReloadKey
        | ReloadCancelTrigger::GenericPassive => false,
    }
}
