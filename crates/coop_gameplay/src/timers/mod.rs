//! Timer/Scheduler service.
//!
//! Все отложенные фазы геймплея (reload delay, bullets-in, wind-down, fire
//! cadence, cooldown'ы) регистрируются здесь как задачи с токеном
//! `TimerHandle`. Оружие хранит только токены, внутренности таймеров живут
//! в арене `TimerManager`.
//!
//! # Flow
//!
//! ```text
//! FixedUpdate tick (dt)
//!   → TimerManager::queue_advance(dt)
//!   → dispatch_due_timers: while let Some(due) = pop_due() { callback }
//!   → TimerManager::finish_advance()
//! ```
//!
//! Задачи выдаются по одной в порядке `(fire_at, seq)`, поэтому callback
//! может отменить соседний таймер и тот гарантированно не сработает.

use bevy::prelude::*;

/// Минимальный период повторяющейся задачи (защита от бесконечного цикла)
pub const MIN_REPEAT_PERIOD: f32 = 0.001;

/// Токен запланированной задачи.
///
/// Generation растёт при каждой отмене/срабатывании слота, поэтому старый
/// токен никогда не указывает на чужую задачу.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    index: u32,
    generation: u32,
}

/// Фазы reload state machine, привязанные к таймеру
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReloadTimer {
    InitialDelay,
    BulletsIn,
    Completion,
}

/// Таймеры firing cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FiringTimer {
    /// Очередной выстрел automatic/burst
    Fire,
    /// Снятие блокировки после manual/burst cooldown
    ResetBlock,
}

/// Что делать, когда таймер сработал
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerTask {
    Reload(ReloadTimer),
    Firing(FiringTimer),
    /// Деспавн owner'а (lifespan после взрыва)
    Despawn,
}

/// Сработавшая задача, которую dispatcher должен обработать
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DueTimer {
    pub handle: TimerHandle,
    pub owner: Entity,
    pub task: TimerTask,
    pub fired_at: f32,
}

/// Capability, которую core получает вместо глобального движкового таймера
pub trait TimerService {
    /// Текущее время симуляции (секунды)
    fn now(&self) -> f32;

    /// Планирует задачу через `delay` секунд.
    /// `repeat_every = Some(period)` делает задачу повторяющейся.
    fn schedule(
        &mut self,
        owner: Entity,
        task: TimerTask,
        delay: f32,
        repeat_every: Option<f32>,
    ) -> TimerHandle;

    /// Возвращает true если задача была активна
    fn cancel(&mut self, handle: TimerHandle) -> bool;

    fn is_active(&self, handle: TimerHandle) -> bool;
}

/// Отменяет таймер в слоте (если есть) и очищает слот
pub fn clear_timer(timers: &mut dyn TimerService, slot: &mut Option<TimerHandle>) {
    if let Some(handle) = slot.take() {
        timers.cancel(handle);
    }
}

pub fn is_slot_active(timers: &dyn TimerService, slot: Option<TimerHandle>) -> bool {
    slot.is_some_and(|handle| timers.is_active(handle))
}

#[derive(Debug, Clone, Copy)]
struct ScheduledTask {
    owner: Entity,
    task: TimerTask,
    fire_at: f32,
    period: Option<f32>,
    seq: u64,
}

#[derive(Debug)]
struct TimerSlot {
    generation: u32,
    entry: Option<ScheduledTask>,
}

/// Арена таймеров (Resource)
#[derive(Resource, Debug, Default)]
pub struct TimerManager {
    now: f32,
    /// До какого момента текущий tick имеет право выдавать задачи
    horizon: f32,
    next_seq: u64,
    slots: Vec<TimerSlot>,
    free: Vec<u32>,
}

impl TimerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Количество активных задач (для тестов и debug overlay)
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.entry.is_some()).count()
    }

    /// Количество активных задач конкретного owner'а
    pub fn active_count_for(&self, owner: Entity) -> usize {
        self.slots
            .iter()
            .filter_map(|slot| slot.entry.as_ref())
            .filter(|entry| entry.owner == owner)
            .count()
    }

    /// Открывает окно `[now, now + dt]` для `pop_due`
    pub fn queue_advance(&mut self, dt: f32) {
        self.horizon = self.horizon.max(self.now) + dt.max(0.0);
    }

    /// Закрывает tick: время доходит до горизонта
    pub fn finish_advance(&mut self) {
        self.now = self.now.max(self.horizon);
    }

    /// Выдаёт самую раннюю задачу, срок которой наступил в текущем окне.
    ///
    /// One-shot задача освобождается до возврата (is_active == false внутри
    /// callback'а), повторяющаяся сразу перепланируется на следующий период.
    pub fn pop_due(&mut self) -> Option<DueTimer> {
        let (index, _) = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.entry.map(|entry| (index, entry)))
            .filter(|(_, entry)| entry.fire_at <= self.horizon)
            .min_by(|(_, a), (_, b)| {
                a.fire_at
                    .total_cmp(&b.fire_at)
                    .then_with(|| a.seq.cmp(&b.seq))
            })?;

        let seq = self.bump_seq();
        let slot = &mut self.slots[index];
        let entry = slot.entry?;
        let handle = TimerHandle {
            index: index as u32,
            generation: slot.generation,
        };

        self.now = self.now.max(entry.fire_at);

        match entry.period {
            Some(period) => {
                slot.entry = Some(ScheduledTask {
                    fire_at: entry.fire_at + period,
                    seq,
                    ..entry
                });
            }
            None => {
                slot.entry = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }

        Some(DueTimer {
            handle,
            owner: entry.owner,
            task: entry.task,
            fired_at: entry.fire_at,
        })
    }

    /// Отменяет все задачи owner'а (см. `release_removed_weapon_timers`)
    pub fn cancel_owned_by(&mut self, owner: Entity) -> usize {
        let handles: Vec<TimerHandle> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.entry.is_some_and(|entry| entry.owner == owner))
            .map(|(index, slot)| TimerHandle {
                index: index as u32,
                generation: slot.generation,
            })
            .collect();

        handles
            .into_iter()
            .filter(|handle| self.cancel(*handle))
            .count()
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn slot(&self, handle: TimerHandle) -> Option<&TimerSlot> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
    }
}

impl TimerService for TimerManager {
    fn now(&self) -> f32 {
        self.now
    }

    fn schedule(
        &mut self,
        owner: Entity,
        task: TimerTask,
        delay: f32,
        repeat_every: Option<f32>,
    ) -> TimerHandle {
        let seq = self.bump_seq();
        let entry = ScheduledTask {
            owner,
            task,
            fire_at: self.now + delay.max(0.0),
            period: repeat_every.map(|period| period.max(MIN_REPEAT_PERIOD)),
            seq,
        };

        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some(entry);
                TimerHandle {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(TimerSlot {
                    generation: 0,
                    entry: Some(entry),
                });
                TimerHandle {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        }
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        if !self.is_active(handle) {
            return false;
        }

        let slot = &mut self.slots[handle.index as usize];
        slot.entry = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        true
    }

    fn is_active(&self, handle: TimerHandle) -> bool {
        self.slot(handle).is_some_and(|slot| slot.entry.is_some())
    }
}
