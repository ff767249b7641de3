//! Loadout: три слота оружия персонажа.
//!
//! - `Loadout` (на персонаже): слоты, текущее оружие и его слот
//! - `SpawnLoadoutIntent` → weapon entities из `WeaponDefinitions`
//! - `WeaponInput` → текущее оружие (или switch слота)
//! - `RespawnIntent` → reset lifetime счётчиков + revive
//!
//! Слоты нумеруются с 1 (как на клавиатуре), 0 = "нет текущего".

use bevy::prelude::*;

use crate::weapon::WeaponAction;

pub mod systems;

pub use systems::{
    interrupt_weapons_on_death, process_loadout_spawns, process_respawns, process_weapon_input,
};

#[cfg(test)]
mod loadout_tests;

pub const LOADOUT_SLOTS: usize = 3;

/// Занятый слот
#[derive(Debug, Clone, PartialEq)]
pub struct LoadoutSlot {
    pub weapon: Entity,
    pub definition_id: String,
    pub short_name: String,
}

/// Оружие персонажа
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct Loadout {
    slots: [Option<LoadoutSlot>; LOADOUT_SLOTS],
    current: Option<Entity>,
    current_slot: u8,
}

impl Loadout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Слот 1..=3
    pub fn slot(&self, slot: u8) -> Option<&LoadoutSlot> {
        let index = usize::from(slot).checked_sub(1)?;
        self.slots.get(index)?.as_ref()
    }

    pub fn weapon_in_slot(&self, slot: u8) -> Option<Entity> {
        self.slot(slot).map(|s| s.weapon)
    }

    pub fn current(&self) -> Option<Entity> {
        self.current
    }

    /// 0 = нет текущего оружия
    pub fn current_slot(&self) -> u8 {
        self.current_slot
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub fn contains_definition(&self, definition_id: &str) -> bool {
        self.slots
            .iter()
            .flatten()
            .any(|slot| slot.definition_id == definition_id)
    }

    pub fn weapons(&self) -> impl Iterator<Item = Entity> + '_ {
        self.slots.iter().flatten().map(|slot| slot.weapon)
    }

    /// Кладёт оружие в первый свободный слот, возвращает его номер
    pub fn add_weapon(&mut self, slot: LoadoutSlot) -> Option<u8> {
        let index = self.slots.iter().position(Option::is_none)?;
        self.slots[index] = Some(slot);
        Some(index as u8 + 1)
    }

    pub(crate) fn set_current(&mut self, weapon: Entity, slot: u8) {
        self.current = Some(weapon);
        self.current_slot = slot;
    }

    /// Snapshot для HUD
    pub fn info(&self) -> LoadoutInfo {
        let mut info = LoadoutInfo::default();
        for (descriptor, slot) in info.slots.iter_mut().zip(self.slots.iter()) {
            if let Some(slot) = slot {
                descriptor.equipped = true;
                descriptor.short_name = slot.short_name.clone();
            }
        }
        info
    }
}

/// Описание слота для HUD
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadoutSlotInfo {
    pub equipped: bool,
    pub short_name: String,
    pub slot: u8,
}

/// Read-only snapshot loadout'а (строится один раз после spawn)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadoutInfo {
    pub slots: [LoadoutSlotInfo; LOADOUT_SLOTS],
}

impl Default for LoadoutInfo {
    fn default() -> Self {
        let empty = |slot: u8| LoadoutSlotInfo {
            equipped: false,
            short_name: "Generic".to_string(),
            slot,
        };
        Self {
            slots: [empty(1), empty(2), empty(3)],
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// Intent: выдать персонажу оружие. Пустой список = `GameplayConfig::default_loadout`.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct SpawnLoadoutIntent {
    pub character: Entity,
    pub weapons: Vec<String>,
}

/// Input действие персонажа
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    Weapon(WeaponAction),
    /// Слот 1..=3
    SwitchSlot(u8),
}

impl From<WeaponAction> for InputAction {
    fn from(action: WeaponAction) -> Self {
        InputAction::Weapon(action)
    }
}

/// Event: input от хоста (обрабатывается строго по порядку поступления)
#[derive(Event, Debug, Clone, PartialEq)]
pub struct WeaponInput {
    pub character: Entity,
    pub action: InputAction,
}

impl WeaponInput {
    pub fn new(character: Entity, action: impl Into<InputAction>) -> Self {
        Self {
            character,
            action: action.into(),
        }
    }
}

/// Event: текущее оружие сменилось (HUD перепривязывается)
#[derive(Event, Debug, Clone, PartialEq)]
pub struct WeaponChanged {
    pub character: Entity,
    pub previous: Option<Entity>,
    pub current: Entity,
    pub slot: u8,
}

/// Event: loadout выдан
#[derive(Event, Debug, Clone, PartialEq)]
pub struct LoadoutSpawned {
    pub character: Entity,
    pub info: LoadoutInfo,
    pub current: Entity,
    pub slot: u8,
}

/// Intent: респавн персонажа (revive + reset lifetime лимитов оружия)
#[derive(Event, Debug, Clone, PartialEq)]
pub struct RespawnIntent {
    pub character: Entity,
}
