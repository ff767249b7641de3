//! Passive reload: авто-регенерация.
//!
//! Idle → InitialDelay → Cycling → Idle. Каждый цикл добавляет один патрон.
//! Стрельбу не блокирует, кнопкой reload не запускается. После cancel'а
//! (кроме weapon switch и limit reached) регенерация сразу перезапускается.

use serde::{Deserialize, Serialize};

use crate::timers::{ReloadTimer, TimerTask};
use crate::weapon::WeaponCtx;

use super::{
    ammo_changed, log_reload, AmmoNotification, AmmoState, ReloadCancelTrigger, ReloadOutcome,
    ReloadPhase,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassiveReload {
    pub max_capacity: u32,
    /// Пауза после последнего выстрела до начала регенерации
    pub initial_delay: f32,
    /// Один патрон за `cycle_duration` секунд
    pub cycle_duration: f32,
}

const UNLIMITED: i32 = -1;

pub(crate) fn trigger(
    cfg: &PassiveReload,
    state: &mut AmmoState,
    trigger: ReloadCancelTrigger,
    ctx: &mut WeaponCtx,
) -> bool {
    let admitted = !state.is_reloading()
        && state.bullets_active < cfg.max_capacity
        && trigger != ReloadCancelTrigger::ReloadKey;

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
    // Observer'ы сбрасывают старый индикатор до нового старта
    ctx.notify(AmmoNotification::ReloadCompleted {
        trigger,
        outcome: ReloadOutcome::Cancelled,
    });
    ctx.notify(AmmoNotification::ReloadStarted {
        delay: cfg.initial_delay,
    });
    true
}

pub(crate) fn on_delay_finished(cfg: &PassiveReload, state: &mut AmmoState, ctx: &mut WeaponCtx) {
    let handle = ctx.timers.schedule(
        ctx.weapon,
        TimerTask::Reload(ReloadTimer::BulletsIn),
        cfg.cycle_duration,
        Some(cfg.cycle_duration),
    );
    state.phase = ReloadPhase::Cycling(handle);
    ctx.notify(AmmoNotification::ReloadCycleStarted {
        delay: cfg.cycle_duration,
        bullets: 1,
    });
}

pub(crate) fn on_bullets_in(cfg: &PassiveReload, state: &mut AmmoState, ctx: &mut WeaponCtx) {
    let added = u32::from(state.bullets_active < cfg.max_capacity);
    state.bullets_active += added;

    ctx.notify(ammo_changed(state, UNLIMITED));
    if added > 0 {
        ctx.notify(AmmoNotification::BulletsAdded { count: added });
    }

    if state.bullets_active >= cfg.max_capacity {
        request_cancel(cfg, state, ReloadCancelTrigger::LimitReached, ctx);
    } else {
        ctx.notify(AmmoNotification::ReloadCycleStarted {
            delay: cfg.cycle_duration,
            bullets: 1,
        });
    }
}

pub(crate) fn request_cancel(
    cfg: &PassiveReload,
    state: &mut AmmoState,
    cancel: ReloadCancelTrigger,
    ctx: &mut WeaponCtx,
) -> bool {
    let admitted = state.is_reloading()
        && match cancel {
            ReloadCancelTrigger::WeaponAction => state.bullets_active > 0,
            ReloadCancelTrigger::LimitReached
            | ReloadCancelTrigger::WeaponSwitch
            | ReloadCancelTrigger::External => true,
            ReloadCancelTrigger::Invalid
            | ReloadCancelTrigger::ReloadKey
            | ReloadCancelTrigger::GenericPassive => false,
        };

    if admitted {
        state.clear_phase(ctx);
        let outcome = if cancel == ReloadCancelTrigger::LimitReached {
            ReloadOutcome::Finished
        } else {
            ReloadOutcome::Cancelled
        };
        ctx.notify(AmmoNotification::ReloadCompleted {
            trigger: cancel,
            outcome,
        });
    }

    // Один перезапуск на запрос. Повторный вход невозможен:
    // trigger() не вызывает cancel, а полный магазин не проходит admission.
    let retrigger = !matches!(
        cancel,
        ReloadCancelTrigger::WeaponSwitch | ReloadCancelTrigger::LimitReached
    );
    if retrigger && !state.is_reloading() && trigger(cfg, state, ReloadCancelTrigger::GenericPassive, ctx) {
        log_reload(ctx, &format!("passive regen restarted after {:?}", cancel));
    }

    admitted
}
