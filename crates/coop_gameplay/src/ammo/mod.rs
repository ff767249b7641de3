//! Ammo/Reload state machine.
//!
//! Каждое оружие владеет `AmmoSystem`: счётчик патронов, lifetime лимиты и
//! reload процесс с асинхронными фазами (delay → bullets-in → wind-down).
//!
//! # Strategies
//!
//! - **Passive**: авто-регенерация по одному патрону за цикл, не блокирует стрельбу
//! - **Magazine**: полная замена магазина после `bullets_in_time` + wind-down
//! - **PerBullet**: порциями по `bullets_per_reload`, отменяется выстрелом (с wind-down)
//! - **None**: нет capability (все операции no-op)
//!
//! Стратегии это tagged union (`ReloadStrategy`), dispatch через `match`.
//!
//! # Инварианты
//!
//! - `bullets_active <= maximum_bullets()` (saturating арифметика)
//! - `ReloadPhase` держит максимум один timer handle → одна reload попытка
//! - каждое изменение патронов сопровождается `AmmoChanged` в том же шаге

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::logger::{log, log_error, log_warning};
use crate::timers::{clear_timer, DueTimer, ReloadTimer, TimerHandle};
use crate::weapon::WeaponCtx;

pub mod magazine;
pub mod notifications;
pub mod passive;
pub mod per_bullet;

pub use magazine::MagazineReload;
pub use notifications::{AmmoNotification, ReloadOutcome, WeaponNotification};
pub use passive::PassiveReload;
pub use per_bullet::PerBulletReload;


/// Почему запрошен reload cancel (или reload trigger)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Reflect)]
pub enum ReloadCancelTrigger {
    Invalid,
    /// Стрельба (в т.ч. попытка стрелять с пустым магазином)
    WeaponAction,
    /// Явное нажатие кнопки reload
    ReloadKey,
    /// Внутренний: ёмкость или lifetime лимит достигнут
    LimitReached,
    WeaponSwitch,
    /// Внешняя сила (смерть, respawn, скрипт)
    External,
    /// Авто-триггер passive регенерации
    GenericPassive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum ReloadKind {
    None,
    Passive,
    Magazine,
    PerBullet,
}

/// Конфигурация reload стратегии (часть weapon definition)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReloadStrategy {
    #[default]
    None,
    Passive(PassiveReload),
    Magazine(MagazineReload),
    PerBullet(PerBulletReload),
}

/// Текущая фаза reload попытки. Каждая активная фаза владеет ровно одним таймером.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReloadPhase {
    #[default]
    Idle,
    /// Passive/PerBullet: ожидание перед первым циклом
    InitialDelay(TimerHandle),
    /// Passive/PerBullet: повторяющийся таймер добавления патронов
    Cycling(TimerHandle),
    /// Magazine: ожидание вставки магазина
    BulletsIn(TimerHandle),
    /// Патроны на месте (или cancel принят), оружие ещё недоступно
    WindDown {
        timer: TimerHandle,
        trigger: ReloadCancelTrigger,
    },
}

impl ReloadPhase {
    pub fn is_idle(&self) -> bool {
        matches!(self, ReloadPhase::Idle)
    }

    pub fn handle(&self) -> Option<TimerHandle> {
        match *self {
            ReloadPhase::Idle => None,
            ReloadPhase::InitialDelay(handle)
            | ReloadPhase::Cycling(handle)
            | ReloadPhase::BulletsIn(handle)
            | ReloadPhase::WindDown { timer: handle, .. } => Some(handle),
        }
    }
}

/// Мутабельное состояние ammo (принадлежит одному оружию)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AmmoState {
    pub bullets_active: u32,
    pub phase: ReloadPhase,
    /// Lifetime счётчики (сбрасываются только на respawn)
    pub magazines_expended: u32,
    pub bullets_expended: u32,
    /// Циклы текущей per-bullet попытки (gate для раннего cancel)
    pub reload_cycles: u32,
}

impl AmmoState {
    pub fn is_reloading(&self) -> bool {
        !self.phase.is_idle()
    }

    /// Отменяет таймер текущей фазы и возвращает в Idle
    pub(crate) fn clear_phase(&mut self, ctx: &mut WeaponCtx) {
        let mut slot = self.phase.handle();
        clear_timer(ctx.timers, &mut slot);
        self.phase = ReloadPhase::Idle;
    }
}

/// Ammo subsystem оружия
#[derive(Component, Debug, Clone, PartialEq)]
pub struct AmmoSystem {
    strategy: ReloadStrategy,
    state: AmmoState,
}

impl AmmoSystem {
    /// Оружие создаётся с полным боезапасом.
    /// Magazine считает вставленный магазин израсходованным,
    /// PerBullet считает заряженные патроны израсходованными.
    pub fn new(strategy: ReloadStrategy) -> Self {
        let mut ammo = Self {
            strategy,
            state: AmmoState::default(),
        };
        ammo.refill();
        ammo
    }

    fn refill(&mut self) {
        let maximum = self.maximum_bullets();
        self.state.bullets_active = maximum;
        self.state.reload_cycles = 0;
        self.state.magazines_expended = 0;
        self.state.bullets_expended = 0;

        match &self.strategy {
            ReloadStrategy::Magazine(_) => self.state.magazines_expended = 1,
            ReloadStrategy::PerBullet(_) => self.state.bullets_expended = maximum,
            ReloadStrategy::Passive(_) | ReloadStrategy::None => {}
        }
    }

    pub fn strategy(&self) -> &ReloadStrategy {
        &self.strategy
    }

    pub fn state(&self) -> &AmmoState {
        &self.state
    }

    pub fn bullets_active(&self) -> u32 {
        self.state.bullets_active
    }

    pub fn is_reloading(&self) -> bool {
        self.state.is_reloading()
    }

    pub fn phase(&self) -> ReloadPhase {
        self.state.phase
    }

    /// PerBullet: принят cancel, идёт wind-down
    pub fn reload_cancel_requested(&self) -> bool {
        matches!(self.strategy, ReloadStrategy::PerBullet(_))
            && matches!(self.state.phase, ReloadPhase::WindDown { .. })
    }

    pub fn maximum_bullets(&self) -> u32 {
        match &self.strategy {
            ReloadStrategy::None => 0,
            ReloadStrategy::Passive(cfg) => cfg.max_capacity,
            ReloadStrategy::Magazine(cfg) => cfg.bullets_per_magazine,
            ReloadStrategy::PerBullet(cfg) => cfg.max_capacity,
        }
    }

    pub fn reload_kind(&self) -> ReloadKind {
        match &self.strategy {
            ReloadStrategy::None => ReloadKind::None,
            ReloadStrategy::Passive(_) => ReloadKind::Passive,
            ReloadStrategy::Magazine(_) => ReloadKind::Magazine,
            ReloadStrategy::PerBullet(_) => ReloadKind::PerBullet,
        }
    }

    /// `-1` = без лимита
    pub fn available_reloads(&self) -> i32 {
        match &self.strategy {
            ReloadStrategy::None => 0,
            ReloadStrategy::Passive(_) => -1,
            ReloadStrategy::Magazine(cfg) => cfg.available_reloads(&self.state),
            ReloadStrategy::PerBullet(cfg) => cfg.available_reloads(&self.state),
        }
    }

    pub fn can_fire(&self, partial_allowed: bool, requested: u32) -> bool {
        let active = self.state.bullets_active;
        let enough = (partial_allowed && active > 0) || active >= requested;

        let blocked_by_reload = match &self.strategy {
            ReloadStrategy::Magazine(_) | ReloadStrategy::PerBullet(_) => self.state.is_reloading(),
            ReloadStrategy::Passive(_) | ReloadStrategy::None => false,
        };

        // None: нет capability, стрелять нечем
        let capable = !matches!(self.strategy, ReloadStrategy::None);

        capable && enough && !blocked_by_reload
    }

    /// Списывает патроны. `None` = стрелять нельзя (состояние не тронуто).
    ///
    /// Побочно всегда пробует cancel reload'а с `WeaponAction`.
    pub fn consume(&mut self, partial_allowed: bool, requested: u32, ctx: &mut WeaponCtx) -> Option<u32> {
        if !self.can_fire(partial_allowed, requested) {
            return None;
        }

        let consumed = requested.min(self.state.bullets_active);
        self.state.bullets_active = self.state.bullets_active.saturating_sub(consumed);

        self.request_cancel(ReloadCancelTrigger::WeaponAction, ctx);
        self.notify_ammo_changed(ctx);

        Some(consumed)
    }

    pub fn trigger_reload(&mut self, weapon_busy: bool, trigger: ReloadCancelTrigger, ctx: &mut WeaponCtx) -> bool {
        match &self.strategy {
            ReloadStrategy::None => {
                log_error(&format!("Weapon {:?}: no reload system configured", ctx.weapon));
                false
            }
            ReloadStrategy::Passive(cfg) => passive::trigger(cfg, &mut self.state, trigger, ctx),
            ReloadStrategy::Magazine(cfg) => magazine::trigger(cfg, &mut self.state, weapon_busy, ctx),
            ReloadStrategy::PerBullet(cfg) => per_bullet::trigger(cfg, &mut self.state, weapon_busy, ctx),
        }
    }

    pub fn request_cancel(&mut self, trigger: ReloadCancelTrigger, ctx: &mut WeaponCtx) -> bool {
        match &self.strategy {
            ReloadStrategy::None => {
                log_error(&format!("Weapon {:?}: no reload system configured", ctx.weapon));
                false
            }
            ReloadStrategy::Passive(cfg) => passive::request_cancel(cfg, &mut self.state, trigger, ctx),
            ReloadStrategy::Magazine(cfg) => magazine::request_cancel(cfg, &mut self.state, trigger, ctx),
            ReloadStrategy::PerBullet(cfg) => per_bullet::request_cancel(cfg, &mut self.state, trigger, ctx),
        }
    }

    /// Повторно рассылает текущее состояние (bootstrap observer'ов после switch)
    pub fn replay_status(&self, ctx: &mut WeaponCtx) {
        self.notify_ammo_changed(ctx);
    }

    /// Поведение при активации оружия (passive сразу начинает регенерацию)
    pub fn activate_automatic_properties(&mut self, ctx: &mut WeaponCtx) {
        if let ReloadStrategy::Passive(cfg) = &self.strategy {
            passive::trigger(cfg, &mut self.state, ReloadCancelTrigger::GenericPassive, ctx);
        }
    }

    /// Respawn: прерывает reload, заполняет оружие и сбрасывает lifetime счётчики
    pub fn reset_lifetime_counters(&mut self, ctx: &mut WeaponCtx) {
        if self.state.is_reloading() {
            self.state.clear_phase(ctx);
            ctx.notify(AmmoNotification::ReloadCompleted {
                trigger: ReloadCancelTrigger::External,
                outcome: ReloadOutcome::Cancelled,
            });
        }

        self.refill();
        self.notify_ammo_changed(ctx);
    }

    /// Callback reload таймера (вызывается dispatcher'ом)
    pub fn on_timer(&mut self, due: &DueTimer, timer: ReloadTimer, ctx: &mut WeaponCtx) {
        if self.state.phase.handle() != Some(due.handle) {
            log_warning(&format!(
                "Weapon {:?}: stale reload timer {:?} in phase {:?}",
                ctx.weapon, timer, self.state.phase
            ));
            return;
        }

        match (&self.strategy, timer) {
            (ReloadStrategy::Passive(cfg), ReloadTimer::InitialDelay) => {
                passive::on_delay_finished(cfg, &mut self.state, ctx)
            }
            (ReloadStrategy::Passive(cfg), ReloadTimer::BulletsIn) => {
                passive::on_bullets_in(cfg, &mut self.state, ctx)
            }
            (ReloadStrategy::Magazine(cfg), ReloadTimer::BulletsIn) => {
                magazine::on_bullets_in(cfg, &mut self.state, ctx)
            }
            (ReloadStrategy::Magazine(cfg), ReloadTimer::Completion) => {
                magazine::on_complete(cfg, &mut self.state, ctx)
            }
            (ReloadStrategy::PerBullet(cfg), ReloadTimer::InitialDelay) => {
                per_bullet::on_delay_finished(cfg, &mut self.state, ctx)
            }
            (ReloadStrategy::PerBullet(cfg), ReloadTimer::BulletsIn) => {
                per_bullet::on_bullets_in(cfg, &mut self.state, ctx)
            }
            (ReloadStrategy::PerBullet(cfg), ReloadTimer::Completion) => {
                per_bullet::on_winddown_finished(cfg, &mut self.state, ctx)
            }
            (_, timer) => {
                log_error(&format!(
                    "Weapon {:?}: timer {:?} does not belong to {:?} reload",
                    ctx.weapon,
                    timer,
                    self.reload_kind()
                ));
            }
        }
    }

    fn notify_ammo_changed(&self, ctx: &mut WeaponCtx) {
        ctx.notify(AmmoNotification::AmmoChanged {
            bullets: self.state.bullets_active,
            available_reloads: self.available_reloads(),
        });
    }
}

/// `AmmoChanged` изнутри стратегии (когда `AmmoSystem` недоступен целиком)
pub(crate) fn ammo_changed(state: &AmmoState, available_reloads: i32) -> AmmoNotification {
    AmmoNotification::AmmoChanged {
        bullets: state.bullets_active,
        available_reloads,
    }
}

pub(crate) fn log_reload(ctx: &WeaponCtx, message: &str) {
    log(&format!("🔄 Weapon {:?}: {}", ctx.weapon, message));
}
