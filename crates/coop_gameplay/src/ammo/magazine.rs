//! Magazine reload: полная замена магазина.
//!
//! Idle → BulletsIn → WindDown → Idle.
//! Cancel всегда мгновенный (без wind-down штрафа).

use serde::{Deserialize, Serialize};

use crate::timers::{ReloadTimer, TimerTask};
use crate::weapon::WeaponCtx;

use super::{
    ammo_changed, log_reload, AmmoNotification, AmmoState, ReloadCancelTrigger, ReloadOutcome,
    ReloadPhase,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagazineReload {
    pub bullets_per_magazine: u32,
    /// Через сколько секунд после начала патроны оказываются в оружии
    pub bullets_in_time: f32,
    /// Сколько оружие ещё недоступно после bullets-in
    pub winddown_time: f32,
    /// Можно ли прервать reload повторным нажатием кнопки reload
    #[serde(default)]
    pub cancellable: bool,
    /// None = магазины не ограничены
    #[serde(default)]
    pub magazines_per_life: Option<u32>,
}

impl MagazineReload {
    pub fn available_reloads(&self, state: &AmmoState) -> i32 {
        match self.magazines_per_life {
            Some(cap) => (cap as i32 - state.magazines_expended as i32).max(0),
            None => -1,
        }
    }

    pub fn has_magazine(&self, state: &AmmoState) -> bool {
        self.magazines_per_life
            .is_none_or(|cap| state.magazines_expended < cap)
    }
}

pub(crate) fn trigger(
    cfg: &MagazineReload,
    state: &mut AmmoState,
    weapon_busy: bool,
    ctx: &mut WeaponCtx,
) -> bool {
    // Фаза Idle = ни одного reload таймера
    if state.is_reloading() || weapon_busy || !cfg.has_magazine(state) {
        return false;
    }

    let handle = ctx.timers.schedule(
        ctx.weapon,
        TimerTask::Reload(ReloadTimer::BulletsIn),
        cfg.bullets_in_time,
        None,
    );
    state.phase = ReloadPhase::BulletsIn(handle);
    ctx.notify(AmmoNotification::ReloadStarted {
        delay: cfg.bullets_in_time,
    });
    log_reload(ctx, "magazine reload started");
    true
}

pub(crate) fn on_bullets_in(cfg: &MagazineReload, state: &mut AmmoState, ctx: &mut WeaponCtx) {
    state.magazines_expended += 1;
    state.bullets_active = cfg.bullets_per_magazine;

    let handle = ctx.timers.schedule(
        ctx.weapon,
        TimerTask::Reload(ReloadTimer::Completion),
        cfg.winddown_time,
        None,
    );
    state.phase = ReloadPhase::WindDown {
        timer: handle,
        trigger: ReloadCancelTrigger::LimitReached,
    };

    ctx.notify(ammo_changed(state, cfg.available_reloads(state)));
    ctx.notify(AmmoNotification::ReloadStopped {
        winddown: cfg.winddown_time,
    });
}

pub(crate) fn on_complete(_cfg: &MagazineReload, state: &mut AmmoState, ctx: &mut WeaponCtx) {
    state.phase = ReloadPhase::Idle;
    ctx.notify(AmmoNotification::ReloadCompleted {
        trigger: ReloadCancelTrigger::LimitReached,
        outcome: ReloadOutcome::Finished,
    });
    log_reload(ctx, "✅ magazine reload complete");
}

pub(crate) fn request_cancel(
    cfg: &MagazineReload,
    state: &mut AmmoState,
    cancel: ReloadCancelTrigger,
    ctx: &mut WeaponCtx,
) -> bool {
    let admitted = state.is_reloading()
        && match cancel {
            ReloadCancelTrigger::ReloadKey => cfg.cancellable,
            ReloadCancelTrigger::WeaponSwitch | ReloadCancelTrigger::External => true,
            ReloadCancelTrigger::Invalid
            | ReloadCancelTrigger::WeaponAction
            | ReloadCancelTrigger::LimitReached
            | ReloadCancelTrigger::GenericPassive => false,
        };

    if !admitted {
        return false;
    }

    state.clear_phase(ctx);
    ctx.notify(AmmoNotification::ReloadCompleted {
        trigger: cancel,
        outcome: ReloadOutcome::Cancelled,
    });
    log_reload(ctx, &format!("magazine reload cancelled ({:?})", cancel));
    true
}
