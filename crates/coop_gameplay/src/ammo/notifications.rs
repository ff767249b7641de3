//! Ammo notifications (ECS → HUD/observers)

use bevy::prelude::*;

use super::ReloadCancelTrigger;

/// Чем закончилась reload попытка
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum ReloadOutcome {
    /// Все фазы отработали (включая wind-down)
    Finished,
    /// Прервана cancel-запросом
    Cancelled,
}

/// Типизированное изменение состояния ammo
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AmmoNotification {
    /// `available_reloads = -1` → без лимита
    AmmoChanged { bullets: u32, available_reloads: i32 },
    BulletsAdded { count: u32 },
    ReloadStarted { delay: f32 },
    ReloadCycleStarted { delay: f32, bullets: u32 },
    /// Патроны уже на месте, начался wind-down
    ReloadStopped { winddown: f32 },
    ReloadCompleted {
        trigger: ReloadCancelTrigger,
        outcome: ReloadOutcome,
    },
}

impl AmmoNotification {
    pub fn is_reload_completed(&self) -> bool {
        matches!(self, AmmoNotification::ReloadCompleted { .. })
    }
}

/// Event: notification конкретного оружия
#[derive(Event, Debug, Clone, PartialEq)]
pub struct WeaponNotification {
    pub weapon: Entity,
    pub notification: AmmoNotification,
}
