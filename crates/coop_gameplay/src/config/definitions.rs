//! Weapon definitions (blueprints).
//!
//! **WeaponDefinition**: статический шаблон оружия (id, имена, kind, firing, reload).
//! - Хранится в `WeaponDefinitions` resource (HashMap lookup по id)
//! - `instantiate()` создаёт runtime компоненты для weapon entity
//! - Defaults hardcoded в `WeaponDefinitions::default()`, внешние наборы из JSON
//!
//! Диапазоны значений проверяются при загрузке (`validate`).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ammo::{
    AmmoSystem, MagazineReload, PassiveReload, PerBulletReload, ReloadStrategy,
};
use crate::hud::WeaponObservers;
use crate::weapon::{FireMode, FiringConfig, FiringController, ProjectileSpec, Weapon, WeaponKind};

use super::ConfigError;

fn default_full_name() -> String {
    "Generic Weapon".to_string()
}

fn default_short_name() -> String {
    "Generic".to_string()
}

/// Blueprint оружия
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponDefinition {
    pub id: String,
    #[serde(default = "default_full_name")]
    pub full_name: String,
    #[serde(default = "default_short_name")]
    pub short_name: String,
    pub kind: WeaponKind,
    #[serde(default)]
    pub firing: FiringConfig,
    #[serde(default)]
    pub reload: ReloadStrategy,
}

// ============================================================================
// Presets
// ============================================================================

impl WeaponDefinition {
    /// Автомат: automatic + magazine
    pub fn assault_rifle() -> Self {
        Self {
            id: "assault_rifle".to_string(),
            full_name: "Assault Rifle".to_string(),
            short_name: "Rifle".to_string(),
            kind: WeaponKind::Raycast {
                shot_damage: 20.0,
                range: crate::weapon::DEFAULT_TRACE_RANGE,
            },
            firing: FiringConfig {
                mode: FireMode::automatic(),
                ..Default::default()
            },
            reload: ReloadStrategy::Magazine(MagazineReload {
                bullets_per_magazine: 30,
                bullets_in_time: 1.5,
                winddown_time: 0.5,
                cancellable: true,
                magazines_per_life: Some(6),
            }),
        }
    }

    /// Дробовик: manual + per-bullet
    pub fn shotgun() -> Self {
        Self {
            id: "shotgun".to_string(),
            full_name: "Pump Shotgun".to_string(),
            short_name: "Shotgun".to_string(),
            kind: WeaponKind::Raycast {
                shot_damage: 60.0,
                range: 2_000.0,
            },
            firing: FiringConfig {
                mode: FireMode::Manual { cooldown: 0.75 },
                ..Default::default()
            },
            reload: ReloadStrategy::PerBullet(PerBulletReload {
                max_capacity: 6,
                bullets_per_reload: 1,
                initial_delay: 0.5,
                cycle_duration: 0.5,
                reload_end_time: 0.25,
                bullets_per_life: Some(48),
            }),
        }
    }

    /// Burst карабин: burst + magazine без лимита
    pub fn burst_carbine() -> Self {
        Self {
            id: "burst_carbine".to_string(),
            full_name: "Burst Carbine".to_string(),
            short_name: "Carbine".to_string(),
            kind: WeaponKind::Raycast {
                shot_damage: 15.0,
                range: crate::weapon::DEFAULT_TRACE_RANGE,
            },
            firing: FiringConfig {
                mode: FireMode::burst(),
                ..Default::default()
            },
            reload: ReloadStrategy::Magazine(MagazineReload {
                bullets_per_magazine: 25,
                bullets_in_time: 1.25,
                winddown_time: 0.25,
                cancellable: false,
                magazines_per_life: None,
            }),
        }
    }

    /// Гранатомёт: manual + passive регенерация
    pub fn grenade_launcher() -> Self {
        Self {
            id: "grenade_launcher".to_string(),
            full_name: "Grenade Launcher".to_string(),
            short_name: "Launcher".to_string(),
            kind: WeaponKind::Throwing {
                projectile: ProjectileSpec::default(),
            },
            firing: FiringConfig {
                mode: FireMode::Manual { cooldown: 1.0 },
                ..Default::default()
            },
            reload: ReloadStrategy::Passive(PassiveReload {
                max_capacity: 3,
                initial_delay: 2.0,
                cycle_duration: 4.0,
            }),
        }
    }

    /// Энергетический пистолет: automatic + passive
    pub fn energy_pistol() -> Self {
        Self {
            id: "energy_pistol".to_string(),
            full_name: "Energy Pistol".to_string(),
            short_name: "Pistol".to_string(),
            kind: WeaponKind::Raycast {
                shot_damage: 10.0,
                range: crate::weapon::DEFAULT_TRACE_RANGE,
            },
            firing: FiringConfig {
                mode: FireMode::Automatic { rate_of_fire: 4.0 },
                ..Default::default()
            },
            reload: ReloadStrategy::Passive(PassiveReload {
                max_capacity: 12,
                initial_delay: 1.0,
                cycle_duration: 0.25,
            }),
        }
    }

    /// Runtime компоненты для weapon entity (оружие создаётся неактивным)
    pub fn instantiate(&self, owner: Entity) -> (Weapon, FiringController, AmmoSystem, WeaponObservers) {
        let weapon = Weapon::new(self.id.clone(), self.kind)
            .with_names(self.full_name.clone(), self.short_name.clone())
            .with_owner(owner);

        (
            weapon,
            FiringController::new(self.firing.clone()),
            AmmoSystem::new(self.reload.clone()),
            WeaponObservers::default(),
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let check = |field: &'static str, value: f64, min: f64, max: f64| {
            if (min..=max).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::OutOfRange {
                    weapon: self.id.clone(),
                    field,
                    value,
                    min,
                    max,
                })
            }
        };

        match self.firing.mode {
            FireMode::Automatic { rate_of_fire } => check("rate_of_fire", rate_of_fire.into(), 0.01, 100.0)?,
            FireMode::Manual { cooldown } => check("cooldown", cooldown.into(), 0.0, 60.0)?,
            FireMode::Burst {
                shots_per_burst,
                rate_of_fire,
                cooldown,
            } => {
                check("shots_per_burst", shots_per_burst.into(), 1.0, 100.0)?;
                check("rate_of_fire", rate_of_fire.into(), 0.01, 100.0)?;
                check("cooldown", cooldown.into(), 0.0, 60.0)?;
            }
        }
        check("bullets_per_attack", self.firing.bullets_per_attack.into(), 1.0, 100.0)?;

        match &self.reload {
            ReloadStrategy::None => {}
            ReloadStrategy::Passive(cfg) => {
                check("max_capacity", cfg.max_capacity.into(), 1.0, 255.0)?;
                check("initial_delay", cfg.initial_delay.into(), 0.01, 300.0)?;
                check("cycle_duration", cfg.cycle_duration.into(), 0.01, 300.0)?;
            }
            ReloadStrategy::Magazine(cfg) => {
                check("bullets_per_magazine", cfg.bullets_per_magazine.into(), 1.0, 1000.0)?;
                check("bullets_in_time", cfg.bullets_in_time.into(), 0.01, 30.0)?;
                check("winddown_time", cfg.winddown_time.into(), 0.01, 30.0)?;
                if let Some(cap) = cfg.magazines_per_life {
                    check("magazines_per_life", cap.into(), 1.0, 100.0)?;
                }
            }
            ReloadStrategy::PerBullet(cfg) => {
                check("max_capacity", cfg.max_capacity.into(), 1.0, 255.0)?;
                check("bullets_per_reload", cfg.bullets_per_reload.into(), 1.0, 10.0)?;
                check("initial_delay", cfg.initial_delay.into(), 0.01, 10.0)?;
                check("cycle_duration", cfg.cycle_duration.into(), 0.01, 10.0)?;
                check("reload_end_time", cfg.reload_end_time.into(), 0.01, 10.0)?;
                if let Some(cap) = cfg.bullets_per_life {
                    check("bullets_per_life", cap.into(), 1.0, 10_000.0)?;
                }
            }
        }

        Ok(())
    }
}

// ============================================================================
// WeaponDefinitions Resource
// ============================================================================

/// Реестр шаблонов оружия (Resource)
#[derive(Resource, Debug, Clone)]
pub struct WeaponDefinitions {
    definitions: HashMap<String, WeaponDefinition>,
}

impl WeaponDefinitions {
    pub fn new() -> Self {
        Self {
            definitions: HashMap::new(),
        }
    }

    /// Добавляет провалидированный шаблон. Дубликат id = ошибка.
    pub fn add(&mut self, definition: WeaponDefinition) -> Result<(), ConfigError> {
        definition.validate()?;
        if self.definitions.contains_key(&definition.id) {
            return Err(ConfigError::Duplicate(definition.id));
        }
        self.definitions.insert(definition.id.clone(), definition);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&WeaponDefinition> {
        self.definitions.get(id)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Ids в стабильном порядке (для детерминированного выбора)
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// JSON массив шаблонов → реестр (без hardcoded defaults)
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let parsed: Vec<WeaponDefinition> = serde_json::from_str(json)?;
        let mut defs = Self::new();
        for definition in parsed {
            defs.add(definition)?;
        }
        Ok(defs)
    }
}

impl Default for WeaponDefinitions {
    /// Hardcoded defaults (базовый арсенал)
    fn default() -> Self {
        let mut definitions = HashMap::new();
        for definition in [
            WeaponDefinition::assault_rifle(),
            WeaponDefinition::shotgun(),
            WeaponDefinition::burst_carbine(),
            WeaponDefinition::grenade_launcher(),
            WeaponDefinition::energy_pistol(),
        ] {
            definitions.insert(definition.id.clone(), definition);
        }
        Self { definitions }
    }
}
